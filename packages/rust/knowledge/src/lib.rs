//! Regulatory knowledge base: semantic retrieval and offline ingestion.
//!
//! This crate provides:
//! - [`RuleRetriever`]: the top-K rule lookup consumed by the compliance stage
//! - [`AzureEmbeddings`] / [`SearchIndex`]: Azure OpenAI embeddings and
//!   Azure AI Search vector index clients
//! - [`splitter`]: overlapping fixed-size text chunking
//! - [`ingest`]: document loading, chunking, and index upload

pub mod embeddings;
pub mod ingest;
pub mod retriever;
pub mod search;
pub mod splitter;

pub use embeddings::AzureEmbeddings;
pub use ingest::{
    Chunk, IngestOptions, IngestProgress, IngestReport, SilentIngestProgress, SourceDocument,
    ingest_folder,
};
pub use retriever::{AzureSearchRetriever, RuleRetriever};
pub use search::{RuleDocument, SearchIndex};
pub use splitter::{ChunkOptions, split_text};
