//! Top-K rule retrieval for the compliance stage.

use async_trait::async_trait;
use tracing::{debug, instrument};

use brandguard_shared::Result;

use crate::embeddings::AzureEmbeddings;
use crate::search::SearchIndex;

/// Looks up the rule documents most relevant to a piece of video content.
#[async_trait]
pub trait RuleRetriever: Send + Sync {
    /// Return at most `k` document texts, most relevant first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>>;
}

/// Embeds the query with Azure OpenAI and searches the Azure AI Search index.
pub struct AzureSearchRetriever {
    embeddings: AzureEmbeddings,
    index: SearchIndex,
}

impl AzureSearchRetriever {
    pub fn new(embeddings: AzureEmbeddings, index: SearchIndex) -> Self {
        Self { embeddings, index }
    }
}

#[async_trait]
impl RuleRetriever for AzureSearchRetriever {
    #[instrument(skip_all, fields(index = %self.index.index_name(), k = k))]
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let vector = self.embeddings.embed_query(query).await?;
        let documents = self.index.vector_search(vector, k).await?;

        for doc in &documents {
            debug!(
                source = doc.source.as_deref().unwrap_or("unknown"),
                score = doc.score,
                "retrieved rule chunk"
            );
        }

        Ok(documents.into_iter().map(|d| d.content).collect())
    }
}
