//! Azure AI Search vector index client.
//!
//! Documents follow the `id` / `content` / `<vector field>` / `metadata`
//! layout, where `metadata` is a JSON string such as `{"source":"rules.pdf"}`.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use brandguard_shared::{BrandGuardError, Result, SearchConfig};

use crate::ingest::Chunk;

const VECTOR_PROFILE: &str = "brandguard-profile";
const VECTOR_ALGORITHM: &str = "brandguard-hnsw";

/// A rule document returned by similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDocument {
    pub content: String,
    /// File the chunk was ingested from, when recorded.
    pub source: Option<String>,
    pub score: f64,
}

/// Client for one search index.
pub struct SearchIndex {
    client: Client,
    endpoint: String,
    index_name: String,
    api_version: String,
    vector_field: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    value: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "@search.score", default)]
    score: f64,
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: Option<String>,
}

#[derive(Deserialize)]
struct IndexResponse {
    value: Vec<IndexResult>,
}

#[derive(Deserialize)]
struct IndexResult {
    key: String,
    status: bool,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

impl SearchIndex {
    pub fn new(config: &SearchConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("BrandGuardian/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| BrandGuardError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            index_name: config.index_name.clone(),
            api_version: config.api_version.clone(),
            vector_field: config.vector_field.clone(),
            api_key,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn url(&self, suffix: &str) -> String {
        format!(
            "{}/indexes/{}{suffix}?api-version={}",
            self.endpoint, self.index_name, self.api_version
        )
    }

    /// Return up to `k` documents nearest to `vector`, most relevant first.
    #[instrument(skip_all, fields(index = %self.index_name, k = k))]
    pub async fn vector_search(&self, vector: Vec<f32>, k: usize) -> Result<Vec<RuleDocument>> {
        let body = json!({
            "select": "content,metadata",
            "top": k,
            "vectorQueries": [{
                "kind": "vector",
                "vector": vector,
                "k": k,
                "fields": self.vector_field,
            }],
        });

        let response = self
            .client
            .post(self.url("/docs/search"))
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BrandGuardError::Network(format!("search request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrandGuardError::Retrieval(format!(
                "search request failed: HTTP {status}: {body}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| BrandGuardError::parse(format!("search response: {e}")))?;

        let documents: Vec<RuleDocument> = parsed
            .value
            .into_iter()
            .take(k)
            .map(|hit| RuleDocument {
                source: hit.metadata.as_deref().and_then(metadata_source),
                content: hit.content,
                score: hit.score,
            })
            .collect();

        debug!(hits = documents.len(), "vector search complete");
        Ok(documents)
    }

    /// Create the index if it does not exist. Returns `true` if it was created.
    pub async fn ensure_index(&self, dimensions: usize) -> Result<bool> {
        let response = self
            .client
            .get(self.url(""))
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| BrandGuardError::Network(format!("index lookup: {e}")))?;

        match response.status() {
            s if s.is_success() => return Ok(false),
            StatusCode::NOT_FOUND => {}
            s => {
                let body = response.text().await.unwrap_or_default();
                return Err(BrandGuardError::Retrieval(format!(
                    "index lookup failed: HTTP {s}: {body}"
                )));
            }
        }

        let definition = json!({
            "name": self.index_name,
            "fields": [
                { "name": "id", "type": "Edm.String", "key": true, "filterable": true },
                { "name": "content", "type": "Edm.String", "searchable": true },
                {
                    "name": self.vector_field,
                    "type": "Collection(Edm.Single)",
                    "searchable": true,
                    "dimensions": dimensions,
                    "vectorSearchProfile": VECTOR_PROFILE,
                },
                { "name": "metadata", "type": "Edm.String", "searchable": true },
            ],
            "vectorSearch": {
                "algorithms": [{ "name": VECTOR_ALGORITHM, "kind": "hnsw" }],
                "profiles": [{ "name": VECTOR_PROFILE, "algorithm": VECTOR_ALGORITHM }],
            },
        });

        let response = self
            .client
            .put(self.url(""))
            .header("api-key", &self.api_key)
            .json(&definition)
            .send()
            .await
            .map_err(|e| BrandGuardError::Network(format!("index creation: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrandGuardError::Retrieval(format!(
                "index creation failed: HTTP {status}: {body}"
            )));
        }

        info!(index = %self.index_name, dimensions, "created search index");
        Ok(true)
    }

    /// Merge-or-upload chunks with their embeddings. Returns the number stored.
    pub async fn upload(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize> {
        if chunks.len() != vectors.len() {
            return Err(BrandGuardError::validation(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let documents: Vec<Value> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let mut doc = json!({
                    "@search.action": "mergeOrUpload",
                    "id": chunk.id,
                    "content": chunk.content,
                    "metadata": json!({ "source": chunk.source }).to_string(),
                });
                doc[self.vector_field.as_str()] = json!(vector);
                doc
            })
            .collect();

        let response = self
            .client
            .post(self.url("/docs/index"))
            .header("api-key", &self.api_key)
            .json(&json!({ "value": documents }))
            .send()
            .await
            .map_err(|e| BrandGuardError::Network(format!("index upload: {e}")))?;

        // 207 signals partial success; per-document status is in the body.
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrandGuardError::Retrieval(format!(
                "index upload failed: HTTP {status}: {body}"
            )));
        }

        let parsed: IndexResponse = response
            .json()
            .await
            .map_err(|e| BrandGuardError::parse(format!("index upload response: {e}")))?;

        let failures: Vec<String> = parsed
            .value
            .iter()
            .filter(|r| !r.status)
            .map(|r| {
                format!(
                    "{}: {}",
                    r.key,
                    r.error_message.as_deref().unwrap_or("unknown error")
                )
            })
            .collect();

        if !failures.is_empty() {
            return Err(BrandGuardError::Retrieval(format!(
                "{} of {} documents rejected: {}",
                failures.len(),
                parsed.value.len(),
                failures.join("; ")
            )));
        }

        Ok(parsed.value.len())
    }
}

/// Read `source` out of a JSON metadata string.
fn metadata_source(metadata: &str) -> Option<String> {
    serde_json::from_str::<Value>(metadata)
        .ok()?
        .get("source")?
        .as_str()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index_for(server: &MockServer) -> SearchIndex {
        let config = SearchConfig {
            endpoint: server.uri(),
            index_name: "brand-rules".into(),
            ..Default::default()
        };
        SearchIndex::new(&config, "search-key".into()).unwrap()
    }

    #[test]
    fn metadata_source_parsing() {
        assert_eq!(
            metadata_source(r#"{"source":"ftc-guides.pdf","page":3}"#),
            Some("ftc-guides.pdf".into())
        );
        assert_eq!(metadata_source("not json"), None);
        assert_eq!(metadata_source("{}"), None);
    }

    #[tokio::test]
    async fn vector_search_keeps_relevance_order_and_limit() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/indexes/brand-rules/docs/search"))
            .and(body_partial_json(json!({ "top": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "@search.score": 0.91, "content": "No medical claims.", "metadata": "{\"source\":\"a.pdf\"}" },
                    { "@search.score": 0.55, "content": "Disclose sponsorships." },
                    { "@search.score": 0.10, "content": "Extra hit beyond k." }
                ]
            })))
            .mount(&server)
            .await;

        let docs = index_for(&server)
            .vector_search(vec![0.1, 0.2], 2)
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "No medical claims.");
        assert_eq!(docs[0].source.as_deref(), Some("a.pdf"));
        assert_eq!(docs[1].content, "Disclose sponsorships.");
        assert!(docs[1].source.is_none());
    }

    #[tokio::test]
    async fn ensure_index_creates_missing_index() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/indexes/brand-rules"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/indexes/brand-rules"))
            .and(body_partial_json(json!({ "name": "brand-rules" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        assert!(index_for(&server).ensure_index(3).await.unwrap());
    }

    #[tokio::test]
    async fn upload_reports_rejected_documents() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/indexes/brand-rules/docs/index"))
            .respond_with(ResponseTemplate::new(207).set_body_json(json!({
                "value": [
                    { "key": "a", "status": true, "statusCode": 200 },
                    { "key": "b", "status": false, "statusCode": 400, "errorMessage": "bad vector" }
                ]
            })))
            .mount(&server)
            .await;

        let chunks = vec![
            Chunk {
                id: "a".into(),
                content: "one".into(),
                source: "r.md".into(),
                chunk_index: 0,
            },
            Chunk {
                id: "b".into(),
                content: "two".into(),
                source: "r.md".into(),
                chunk_index: 1,
            },
        ];
        let err = index_for(&server)
            .upload(&chunks, &[vec![0.0], vec![1.0]])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 of 2 documents rejected"));
        assert!(err.to_string().contains("bad vector"));
    }
}
