//! Configuration and path resolution for the CLI.
//!
//! Settings resolve in order: command-line flags, environment variables
//! (optionally loaded from `.env`), a TOML config file, then defaults.
//!
//! Model files are searched for in:
//! - `$LEDGERLENS_MODEL_DIR` (or `model_dir` in the config file)
//! - Workspace `assets/models/` directory (development)
//! - Executable-relative `../assets/models/` (bundled distribution)

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use ledgerlens_core::config::{RetrievalConfig, COLLECTION_NAME, MAX_CHUNK_TOKENS};
use ledgerlens_core::embedding::AssetLoader;
use ledgerlens_core::error::AssetError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Dense model directory name under the model root
pub const DENSE_MODEL_DIR: &str = "all-MiniLM-L6-v2";
/// Late-interaction model directory name under the model root
pub const COLBERT_MODEL_DIR: &str = "colbertv2.0";

const CONFIG_FILENAME: &str = "config.json";
const WEIGHTS_FILENAME: &str = "model.safetensors";
const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Database file name for the embedded backend
const DATABASE_FILENAME: &str = "ledgerlens.redb";

/// Config file looked up in the working and config directories
const SETTINGS_FILENAME: &str = "ledgerlens.toml";

const MODEL_DIR_ENV: &str = "LEDGERLENS_MODEL_DIR";
const EDGAR_IDENTITY_ENV: &str = "LEDGERLENS_EDGAR_IDENTITY";
const QDRANT_URL_ENV: &str = "QDRANT_URL";
const QDRANT_API_KEY_ENV: &str = "QDRANT_API_KEY";

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded on-disk store in the data directory
    Redb,
    /// Remote Qdrant server at `QDRANT_URL`
    Qdrant,
}

/// Contents of `ledgerlens.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub backend: Option<Backend>,
    pub collection: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub edgar_identity: Option<String>,
    pub hashed: Option<bool>,
    pub max_chunk_tokens: Option<usize>,
    pub retrieval: Option<RetrievalConfig>,
}

/// Values read from the environment.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub model_dir: Option<PathBuf>,
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub edgar_identity: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            model_dir: var(MODEL_DIR_ENV).map(PathBuf::from),
            qdrant_url: var(QDRANT_URL_ENV),
            qdrant_api_key: var(QDRANT_API_KEY_ENV),
            edgar_identity: var(EDGAR_IDENTITY_ENV),
        }
    }
}

/// Global command-line flags that override everything else.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub backend: Option<Backend>,
    pub collection: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub hashed: bool,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: Backend,
    pub collection: String,
    pub data_dir: PathBuf,
    pub model_dir: Option<PathBuf>,
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub edgar_identity: Option<String>,
    pub hashed: bool,
    pub max_chunk_tokens: usize,
    pub retrieval: RetrievalConfig,
}

impl Settings {
    /// Resolves settings from flags, the environment, and the config file.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let file = load_file_config(overrides.config.as_deref())?;
        Self::merge(overrides, &EnvConfig::from_env(), file)
    }

    /// Merges the three sources. Without an explicit backend, Qdrant is used
    /// when a server URL is configured and redb otherwise.
    pub fn merge(overrides: &Overrides, env: &EnvConfig, file: FileConfig) -> Result<Self> {
        let qdrant_url = env.qdrant_url.clone().or(file.qdrant_url);
        let backend = overrides.backend.or(file.backend).unwrap_or(if qdrant_url.is_some() {
            Backend::Qdrant
        } else {
            Backend::Redb
        });

        if backend == Backend::Qdrant && qdrant_url.is_none() {
            return Err(anyhow!(
                "The qdrant backend needs a server URL: set ${} or qdrant_url in {}",
                QDRANT_URL_ENV,
                SETTINGS_FILENAME
            ));
        }

        let data_dir = match overrides.data_dir.clone().or(file.data_dir) {
            Some(dir) => dir,
            None => default_data_dir()?,
        };

        Ok(Self {
            backend,
            collection: overrides
                .collection
                .clone()
                .or(file.collection)
                .unwrap_or_else(|| COLLECTION_NAME.to_string()),
            data_dir,
            model_dir: env.model_dir.clone().or(file.model_dir),
            qdrant_url,
            qdrant_api_key: env.qdrant_api_key.clone().or(file.qdrant_api_key),
            edgar_identity: env.edgar_identity.clone().or(file.edgar_identity),
            hashed: overrides.hashed || file.hashed.unwrap_or(false),
            max_chunk_tokens: file.max_chunk_tokens.unwrap_or(MAX_CHUNK_TOKENS),
            retrieval: file.retrieval.unwrap_or_default(),
        })
    }

    /// Path of the embedded database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILENAME)
    }
}

/// Reads the config file.
///
/// An explicit path must exist; otherwise `./ledgerlens.toml` and the
/// platform config directory are tried, and a missing file means defaults.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(SETTINGS_FILENAME);
            let platform = project_dirs().map(|dirs| dirs.config_dir().join(SETTINGS_FILENAME));
            std::iter::once(local)
                .chain(platform)
                .find(|candidate| candidate.exists())
        }
    };

    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "ledgerlens", "LedgerLens")
}

/// Returns the platform data directory:
/// - macOS: `~/Library/Application Support/dev.ledgerlens.LedgerLens/`
/// - Linux: `~/.local/share/ledgerlens/`
/// - Windows: `%APPDATA%\ledgerlens\LedgerLens\data\`
pub fn default_data_dir() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

/// Finds the directory holding one model's files.
pub fn find_model_dir(configured: Option<&Path>, model: &str) -> Result<PathBuf> {
    let has_model = |root: &Path| root.join(model).join(WEIGHTS_FILENAME).exists();

    // 1. Environment variable or config file
    if let Some(root) = configured {
        if has_model(root) {
            return Ok(root.join(model));
        }
    }

    // 2. Workspace assets (development)
    // CARGO_MANIFEST_DIR points to crates/ledgerlens-cli
    let workspace_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .map(|p| p.join("assets/models"));
    if let Some(root) = workspace_path.as_deref() {
        if has_model(root) {
            return Ok(root.join(model));
        }
    }

    // 3. Relative to executable (distribution)
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        for root in [exe_dir.join("../assets/models"), exe_dir.join("assets/models")] {
            if has_model(&root) {
                return Ok(root.join(model));
            }
        }
    }

    Err(anyhow!(
        "Model '{}' not found. Download it into <models>/{} ({}, {}, {}) and set ${}, \
         or pass --hashed to run with hashed encoders.",
        model,
        model,
        CONFIG_FILENAME,
        WEIGHTS_FILENAME,
        TOKENIZER_FILENAME,
        MODEL_DIR_ENV
    ))
}

/// Loads model files from a directory on disk.
pub struct FileAssetLoader {
    dir: PathBuf,
}

impl FileAssetLoader {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Err(AssetError::NotFound(path.display().to_string()));
        }
        std::fs::read(&path)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait::async_trait(?Send)]
impl AssetLoader for FileAssetLoader {
    async fn load_config_bytes(&self) -> Result<Vec<u8>, AssetError> {
        self.read(CONFIG_FILENAME)
    }

    async fn load_model_bytes(&self) -> Result<Vec<u8>, AssetError> {
        self.read(WEIGHTS_FILENAME)
    }

    async fn load_tokenizer_bytes(&self) -> Result<Vec<u8>, AssetError> {
        self.read(TOKENIZER_FILENAME)
    }
}
