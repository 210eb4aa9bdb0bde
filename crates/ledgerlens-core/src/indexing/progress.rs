//! Progress reporting for indexing runs.
//!
//! A chunk moves through three states during a run: encoded into all three
//! representations (or rejected), buffered in the pending batch, then written
//! to the store when the batch is upserted.

use instant::Instant;

/// Snapshot of an indexing run, handed to progress callbacks after each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexingProgress {
    /// Chunks in this run
    pub chunks_total: usize,
    /// Chunks with all three representations
    pub chunks_encoded: usize,
    /// Chunks rejected because an encoding failed
    pub chunks_rejected: usize,
    /// Points upserted into the collection so far
    pub points_written: usize,
    pub elapsed_ms: u64,
}

impl IndexingProgress {
    /// Progress before the first chunk is encoded.
    pub fn started(chunks_total: usize) -> Self {
        Self {
            chunks_total,
            ..Self::default()
        }
    }

    /// Chunks handled so far, encoded or rejected.
    pub fn chunks_completed(&self) -> usize {
        self.chunks_encoded + self.chunks_rejected
    }

    /// Encoded points still waiting for the next batch upsert.
    pub fn points_buffered(&self) -> usize {
        self.chunks_encoded.saturating_sub(self.points_written)
    }

    /// Returns the completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.chunks_total == 0 {
            0.0
        } else {
            (self.chunks_completed() as f64 / self.chunks_total as f64) * 100.0
        }
    }

    /// True once every chunk is handled and nothing is left to upsert.
    pub fn is_complete(&self) -> bool {
        self.chunks_completed() >= self.chunks_total && self.points_buffered() == 0
    }

    /// Estimated encoding time remaining in milliseconds, extrapolated from
    /// the average time per handled chunk.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        let completed = self.chunks_completed();
        if completed == 0 || completed >= self.chunks_total {
            return None;
        }
        let remaining = (self.chunks_total - completed) as u64;
        Some(remaining * self.elapsed_ms / completed as u64)
    }
}

/// Wall-clock timer for a run.
pub(crate) struct ProgressTimer {
    start: Instant,
}

impl ProgressTimer {
    pub(crate) fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
