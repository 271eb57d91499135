//! Qdrant over its REST API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use super::backend::VectorBackend;
use super::filter::{FieldKey, FieldKind, Filter};
use super::types::{BackendQuery, Payload, Point, ScoredPoint, VectorStoreError};
use crate::config::VectorStoreConfig;

/// Page size for scroll requests.
const SCROLL_PAGE: usize = 256;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
    #[serde(default)]
    payload_schema: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Debug, Deserialize)]
struct VectorParams {
    size: usize,
}

#[derive(Debug, Deserialize)]
struct WirePoint {
    id: Uuid,
    #[serde(default)]
    score: f32,
    payload: Payload,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

impl From<WirePoint> for ScoredPoint {
    fn from(p: WirePoint) -> Self {
        Self {
            id: p.id,
            score: p.score,
            payload: p.payload,
            vector: p.vector,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScrollPage {
    points: Vec<WirePoint>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct QdrantBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, collection: &str, suffix: &str) -> String {
        format!("{}/collections/{collection}{suffix}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<T, VectorStoreError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VectorStoreError::Backend {
                operation,
                status: status.as_u16(),
                message,
            });
        }
        let body: ApiResponse<T> = response.json().await?;
        Ok(body.result)
    }

    async fn collection_info(
        &self,
        collection: &str,
    ) -> Result<Option<CollectionInfo>, VectorStoreError> {
        let response = self
            .request(reqwest::Method::GET, self.url(collection, ""))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(VectorStoreError::Backend {
                operation: "get collection",
                status,
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body: ApiResponse<CollectionInfo> = response.json().await?;
        Ok(Some(body.result))
    }
}

/// Qdrant payload schema for a field.
fn field_schema(field: FieldKey) -> &'static str {
    match field.kind() {
        FieldKind::Keyword => "keyword",
        FieldKind::Integer => "integer",
        FieldKind::Bool => "bool",
        FieldKind::Datetime => "datetime",
    }
}

fn search_body(query: &BackendQuery, vector: &[f32]) -> Value {
    let mut body = json!({
        "vector": vector,
        "limit": query.limit,
        "with_payload": true,
        "with_vector": query.with_vector,
    });
    if !query.filter.is_empty() {
        body["filter"] = query.filter.to_qdrant();
    }
    if let Some(threshold) = query.threshold {
        body["score_threshold"] = json!(threshold);
    }
    body
}

fn scroll_body(filter: &Filter, limit: usize, offset: Option<&Value>, with_vector: bool) -> Value {
    let mut body = json!({
        "limit": limit,
        "with_payload": true,
        "with_vector": with_vector,
    });
    if !filter.is_empty() {
        body["filter"] = filter.to_qdrant();
    }
    if let Some(offset) = offset {
        body["offset"] = offset.clone();
    }
    body
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<bool, VectorStoreError> {
        if let Some(info) = self.collection_info(collection).await? {
            let actual = info.config.params.vectors.size;
            if actual != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: dimension,
                    actual,
                });
            }
            return Ok(false);
        }
        let body = json!({ "vectors": { "size": dimension, "distance": "Cosine" } });
        let _: Value = self
            .send(
                self.request(reqwest::Method::PUT, self.url(collection, ""))
                    .json(&body),
                "create collection",
            )
            .await
            .map_err(|e| VectorStoreError::CollectionUnavailable {
                name: collection.to_string(),
                reason: e.to_string(),
            })?;
        debug!(collection, dimension, "created qdrant collection");
        Ok(true)
    }

    async fn indexed_fields(&self, collection: &str) -> Result<Vec<String>, VectorStoreError> {
        let info = self.collection_info(collection).await?.ok_or_else(|| {
            VectorStoreError::CollectionUnavailable {
                name: collection.to_string(),
                reason: "collection does not exist".to_string(),
            }
        })?;
        let mut fields: Vec<String> = info.payload_schema.into_keys().collect();
        fields.sort();
        Ok(fields)
    }

    async fn create_index(
        &self,
        collection: &str,
        field: FieldKey,
    ) -> Result<(), VectorStoreError> {
        let body = json!({ "field_name": field.path(), "field_schema": field_schema(field) });
        let _: Value = self
            .send(
                self.request(reqwest::Method::PUT, self.url(collection, "/index?wait=true"))
                    .json(&body),
                "create payload index",
            )
            .await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), VectorStoreError> {
        let points: Vec<Value> = points
            .into_iter()
            .map(|p| {
                Ok(json!({
                    "id": p.id.to_string(),
                    "vector": p.vector,
                    "payload": serde_json::to_value(&p.payload)?,
                }))
            })
            .collect::<Result<_, serde_json::Error>>()?;
        let _: Value = self
            .send(
                self.request(reqwest::Method::PUT, self.url(collection, "/points?wait=true"))
                    .json(&json!({ "points": points })),
                "upsert",
            )
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &BackendQuery,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let Some(vector) = &query.vector else {
            let page: ScrollPage = self
                .send(
                    self.request(reqwest::Method::POST, self.url(collection, "/points/scroll"))
                        .json(&scroll_body(&query.filter, query.limit, None, query.with_vector)),
                    "scroll",
                )
                .await?;
            return Ok(page.points.into_iter().map(ScoredPoint::from).collect());
        };
        let hits: Vec<WirePoint> = self
            .send(
                self.request(reqwest::Method::POST, self.url(collection, "/points/search"))
                    .json(&search_body(query, vector)),
                "search",
            )
            .await?;
        Ok(hits.into_iter().map(ScoredPoint::from).collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: &Filter,
        with_vector: bool,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let mut out = Vec::new();
        let mut offset: Option<Value> = None;
        loop {
            let page: ScrollPage = self
                .send(
                    self.request(reqwest::Method::POST, self.url(collection, "/points/scroll"))
                        .json(&scroll_body(filter, SCROLL_PAGE, offset.as_ref(), with_vector)),
                    "scroll",
                )
                .await?;
            out.extend(page.points.into_iter().map(ScoredPoint::from));
            match page.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }
        Ok(out)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), VectorStoreError> {
        let _: Value = self
            .send(
                self.request(
                    reqwest::Method::POST,
                    self.url(collection, "/points/delete?wait=true"),
                )
                .json(&json!({ "filter": filter.to_qdrant() })),
                "delete",
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingType;

    #[test]
    fn test_search_body() {
        let query = BackendQuery {
            vector: None,
            filter: Filter::by_type(EmbeddingType::SecurityPattern),
            limit: 5,
            threshold: Some(0.4),
            with_vector: false,
        };
        let body = search_body(&query, &[0.1, 0.2]);
        assert_eq!(body["limit"], 5);
        assert_eq!(body["with_payload"], true);
        assert_eq!(body["filter"]["must"][0]["key"], "type");
        assert_eq!(body["filter"]["must"][0]["match"]["value"], "SECURITY_PATTERN");
        assert!((body["score_threshold"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_scroll_body_omits_empty_filter() {
        let body = scroll_body(&Filter::new(), 10, Some(&json!("abc")), true);
        assert!(body.get("filter").is_none());
        assert_eq!(body["offset"], "abc");
        assert_eq!(body["with_vector"], true);
    }

    #[test]
    fn test_field_schemas() {
        assert_eq!(field_schema(FieldKey::FileId), "keyword");
        assert_eq!(field_schema(FieldKey::SecurityRelevance), "integer");
        assert_eq!(field_schema(FieldKey::TrustBoundary), "bool");
        assert_eq!(field_schema(FieldKey::CreatedAt), "datetime");
    }

    #[test]
    fn test_wire_point_parsing() {
        let raw = json!({
            "id": "4f5a1c1e-8d0e-4c51-9a55-2b4f0d1f9b11",
            "score": 0.87,
            "payload": {
                "embeddingId": "abc:semantic_code",
                "fileId": "abc",
                "type": "SEMANTIC_CODE",
                "metadata": {
                    "fileName": "a.ts",
                    "functionName": null,
                    "securityRelevance": 4,
                    "businessCriticality": 0,
                    "complexity": 3,
                    "trustBoundary": false
                },
                "createdAt": "2025-01-01T00:00:00Z"
            }
        });
        let point: ScoredPoint = serde_json::from_value::<WirePoint>(raw).unwrap().into();
        assert!((point.score - 0.87).abs() < 1e-6);
        assert_eq!(point.payload.embedding_type, EmbeddingType::SemanticCode);
        assert!(point.vector.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_connection_error() {
        let config = VectorStoreConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..VectorStoreConfig::default()
        };
        let backend = QdrantBackend::new(&config).unwrap();
        let result = backend.ensure_collection("codesight_test", 8).await;
        assert!(matches!(result, Err(VectorStoreError::Connection { .. })));
    }
}
