//! Azure OpenAI embeddings client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use brandguard_shared::{AzureOpenAiConfig, BrandGuardError, Result};

/// Embeds text with an Azure OpenAI embedding deployment.
pub struct AzureEmbeddings {
    client: Client,
    url: String,
    api_key: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl AzureEmbeddings {
    pub fn new(config: &AzureOpenAiConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("BrandGuardian/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| BrandGuardError::Network(format!("failed to build HTTP client: {e}")))?;

        let url = format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.embedding_deployment,
            config.api_version
        );

        Ok(Self {
            client,
            url,
            api_key,
        })
    }

    /// Embed a batch of texts. Output order matches input order.
    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = inputs.len(), "requesting embeddings");

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input: inputs })
            .send()
            .await
            .map_err(|e| BrandGuardError::Network(format!("embedding request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrandGuardError::Retrieval(format!(
                "embedding request failed: HTTP {status}: {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| BrandGuardError::parse(format!("embedding response: {e}")))?;

        if parsed.data.len() != inputs.len() {
            return Err(BrandGuardError::Retrieval(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| BrandGuardError::Retrieval("no embedding returned".into()))
    }
}
