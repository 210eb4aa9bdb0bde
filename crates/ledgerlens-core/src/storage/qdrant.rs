//! Qdrant vector store over the REST API.
//!
//! Plans are translated into Qdrant's nested `prefetch` query: each plan node
//! becomes one query level, recall nodes query a named vector space, fuse
//! nodes become `{"rrf": {"k": k}}`, and the rerank node queries the
//! multivector space with the `max_sim` comparator.

use super::{StoreError, VectorStore};
use crate::config::{CollectionSchema, Metric, SpaceConfig};
use crate::embedding::{Representation, RepresentationKind};
use crate::search::{Candidate, ChunkId, FusionMethod, IndexRecord, Payload, PlanNode, QueryPlan};
use reqwest::{header, Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Request timeout for every call to the server.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    points: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: ChunkId,
    score: f32,
    payload: Option<Payload>,
}

/// Remote Qdrant store.
///
/// Collections created through this store remember their schema so that
/// plans can name the right vector spaces; other collections are assumed to
/// use the reference space names.
///
/// # Example
///
/// ```ignore
/// let store = QdrantStore::new(&std::env::var("QDRANT_URL")?, std::env::var("QDRANT_API_KEY").ok())?;
/// store.provision(&CollectionSchema::default(), ProvisionPolicy::Recreate).await?;
/// ```
pub struct QdrantStore {
    client: Client,
    base_url: Url,
    schemas: RwLock<HashMap<String, CollectionSchema>>,
}

impl QdrantStore {
    /// Creates a client for the server at `url`, authenticating with
    /// `api_key` when given.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, StoreError> {
        let base_url = Url::parse(url)
            .map_err(|e| StoreError::Unavailable(format!("Invalid Qdrant URL '{}': {}", url, e)))?;

        let mut headers = header::HeaderMap::new();
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let value = header::HeaderValue::from_str(&key).map_err(|e| {
                StoreError::Unavailable(format!("Invalid API key header value: {}", e))
            })?;
            headers.insert("api-key", value);
        }

        let client = Client::builder()
            .user_agent(concat!("ledgerlens/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        info!("Using Qdrant at {}", base_url);
        Ok(Self {
            client,
            base_url,
            schemas: RwLock::new(HashMap::new()),
        })
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(path)
            .map_err(|e| StoreError::Unavailable(format!("Invalid request path '{}': {}", path, e)))
    }

    fn schema_for(&self, collection: &str) -> Result<CollectionSchema, StoreError> {
        let schemas = self
            .schemas
            .read()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        Ok(schemas
            .get(collection)
            .cloned()
            .unwrap_or_else(|| CollectionSchema::named(collection)))
    }

    /// Sends one request and decodes `result` from the response envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        collection: &str,
    ) -> Result<T, StoreError> {
        let mut request = self.client.request(method, self.url(path)?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text, collection));
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            StoreError::SerializationError(format!("Failed to decode Qdrant response: {}", e))
        })?;
        Ok(envelope.result)
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_connect() || e.is_timeout() {
        StoreError::Unavailable(format!("Qdrant unreachable: {}", e))
    } else {
        StoreError::DatabaseError(format!("Qdrant request failed: {}", e))
    }
}

fn status_error(status: StatusCode, body: &str, collection: &str) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::CollectionNotFound(collection.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::Unavailable(format!("Qdrant rejected credentials ({})", status))
        }
        s if s.is_server_error() => {
            StoreError::Unavailable(format!("Qdrant returned {}: {}", status, body))
        }
        _ => StoreError::DatabaseError(format!("Qdrant returned {}: {}", status, body)),
    }
}

// =============================================================================
// Request translation
// =============================================================================

fn vector_json(representation: &Representation) -> Value {
    match representation {
        Representation::Dense(v) => json!(v),
        Representation::Sparse(s) => json!({ "indices": s.indices, "values": s.values }),
        Representation::LateInteraction(tokens) => json!(tokens),
    }
}

fn space_params(space: &SpaceConfig) -> Value {
    match space.metric {
        Metric::Cosine => json!({ "size": space.dim, "distance": "Cosine" }),
        Metric::Dot => json!({ "size": space.dim, "distance": "Dot" }),
        Metric::MaxSim => json!({
            "size": space.dim,
            "distance": "Cosine",
            "multivector_config": { "comparator": "max_sim" }
        }),
    }
}

/// Builds the collection-creation body for a schema.
pub(crate) fn collection_request(schema: &CollectionSchema) -> Value {
    let mut vectors = serde_json::Map::new();
    vectors.insert(schema.dense.name.clone(), space_params(&schema.dense));
    vectors.insert(
        schema.late_interaction.name.clone(),
        space_params(&schema.late_interaction),
    );

    let mut sparse = serde_json::Map::new();
    sparse.insert(schema.sparse.name.clone(), json!({}));

    json!({ "vectors": vectors, "sparse_vectors": sparse })
}

fn point_json(schema: &CollectionSchema, record: &IndexRecord) -> Value {
    let mut vector = serde_json::Map::new();
    for kind in RepresentationKind::ALL {
        vector.insert(
            schema.space(kind).name.clone(),
            vector_json(&record.vectors.get(kind)),
        );
    }
    json!({
        "id": record.id,
        "vector": vector,
        "payload": record.payload,
    })
}

fn node_json(schema: &CollectionSchema, node: &PlanNode) -> Value {
    match node {
        PlanNode::Recall {
            using,
            query,
            limit,
        } => json!({
            "query": vector_json(query),
            "using": schema.space(*using).name,
            "limit": limit,
        }),
        PlanNode::Fuse {
            inputs,
            method,
            limit,
        } => {
            let FusionMethod::Rrf { k } = method;
            json!({
                "prefetch": inputs.iter().map(|n| node_json(schema, n)).collect::<Vec<_>>(),
                "query": { "rrf": { "k": k } },
                "limit": limit,
            })
        }
        PlanNode::Rerank {
            input,
            using,
            query,
            limit,
        } => json!({
            "prefetch": [node_json(schema, input)],
            "query": vector_json(query),
            "using": schema.space(*using).name,
            "limit": limit,
        }),
    }
}

/// Translates a plan into a Qdrant `points/query` request body.
pub fn plan_to_request(plan: &QueryPlan, schema: &CollectionSchema) -> Value {
    let mut body = node_json(schema, &plan.root);
    if let Value::Object(map) = &mut body {
        map.insert("with_payload".to_string(), Value::Bool(true));
    }
    body
}

#[async_trait::async_trait(?Send)]
impl VectorStore for QdrantStore {
    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        let result: ExistsResult = self
            .call(
                Method::GET,
                &format!("collections/{}/exists", name),
                None,
                name,
            )
            .await?;
        Ok(result.exists)
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError> {
        if !self.collection_exists(&schema.name).await? {
            let body = collection_request(schema);
            let _: Value = self
                .call(
                    Method::PUT,
                    &format!("collections/{}", schema.name),
                    Some(&body),
                    &schema.name,
                )
                .await?;
            info!("Created Qdrant collection '{}'", schema.name);
        }

        let mut schemas = self
            .schemas
            .write()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        schemas.insert(schema.name.clone(), schema.clone());
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let result: Result<Value, StoreError> = self
            .call(Method::DELETE, &format!("collections/{}", name), None, name)
            .await;
        match result {
            Ok(_) | Err(StoreError::CollectionNotFound(_)) => {
                debug!("Deleted Qdrant collection '{}'", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip_all, fields(collection = collection, records = records.len()))]
    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<(), StoreError> {
        let schema = self.schema_for(collection)?;
        let points: Vec<Value> = records.iter().map(|r| point_json(&schema, r)).collect();
        let body = json!({ "points": points });

        let _: Value = self
            .call(
                Method::PUT,
                &format!("collections/{}/points?wait=true", collection),
                Some(&body),
                collection,
            )
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        plan: &QueryPlan,
    ) -> Result<Vec<Candidate>, StoreError> {
        let schema = self.schema_for(collection)?;
        let body = plan_to_request(plan, &schema);

        let result: QueryResult = self
            .call(
                Method::POST,
                &format!("collections/{}/points/query", collection),
                Some(&body),
                collection,
            )
            .await?;

        result
            .points
            .into_iter()
            .map(|p| {
                let payload = p.payload.ok_or_else(|| {
                    StoreError::SerializationError(format!("Point {} has no payload", p.id))
                })?;
                Ok(Candidate {
                    id: p.id,
                    score: p.score,
                    payload,
                })
            })
            .collect()
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let result: CountResult = self
            .call(
                Method::POST,
                &format!("collections/{}/points/count", collection),
                Some(&json!({ "exact": true })),
                collection,
            )
            .await?;
        Ok(result.count)
    }
}
