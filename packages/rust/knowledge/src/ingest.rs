//! Offline ingestion of regulatory documents into the search index.
//!
//! Loads every `.pdf`, `.md` and `.txt` file in a folder, splits the text
//! into overlapping chunks, embeds them and merge-uploads them in batches.
//! A document that fails to load is reported and skipped.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use brandguard_shared::{BrandGuardError, IngestConfig, Result};

use crate::embeddings::AzureEmbeddings;
use crate::search::SearchIndex;
use crate::splitter::{ChunkOptions, split_text};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "md", "txt"];

/// Plain text loaded from one file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// File name the text came from.
    pub source: String,
    pub text: String,
}

/// One chunk ready to embed and index.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Stable id derived from the source name and chunk position.
    pub id: String,
    pub content: String,
    pub source: String,
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub chunking: ChunkOptions,
    /// Chunks per embedding and upload request.
    pub batch_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkOptions::default(),
            batch_size: 100,
        }
    }
}

impl IngestOptions {
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(BrandGuardError::validation("batch_size must be positive"));
        }
        Ok(Self {
            chunking: ChunkOptions::new(config.chunk_size, config.chunk_overlap)?,
            batch_size: config.batch_size,
        })
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub documents_found: usize,
    pub documents_loaded: usize,
    pub chunks_indexed: usize,
    /// `(file name, reason)` for each skipped document.
    pub failed: Vec<(String, String)>,
}

/// Progress callback for ingestion.
pub trait IngestProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Task-level progress within the current phase.
    fn task_progress(&self, current: usize, total: usize, detail: &str);
}

/// No-op ingestion progress.
pub struct SilentIngestProgress;

impl IngestProgress for SilentIngestProgress {
    fn phase(&self, _name: &str) {}
    fn task_progress(&self, _current: usize, _total: usize, _detail: &str) {}
}

/// List supported documents in `dir`, sorted by path. Not recursive.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BrandGuardError::validation(format!(
            "data directory not found: {}",
            dir.display()
        )));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| BrandGuardError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| BrandGuardError::io(dir, e))?.path();
        if path.is_file() && is_supported(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load the text of one document. PDFs are extracted on a blocking thread.
pub async fn load_document(path: &Path) -> Result<SourceDocument> {
    let source = source_name(path);
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
            .await
            .map_err(|e| BrandGuardError::parse(format!("PDF extraction aborted: {e}")))?
            .map_err(|e| BrandGuardError::parse(format!("PDF extraction failed: {e}")))?
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BrandGuardError::io(path, e))?
    };

    Ok(SourceDocument { source, text })
}

/// Split a document into chunks tagged with its source.
pub fn chunk_document(doc: &SourceDocument, opts: &ChunkOptions) -> Vec<Chunk> {
    split_text(&doc.text, opts)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| Chunk {
            id: chunk_id(&doc.source, chunk_index),
            content,
            source: doc.source.clone(),
            chunk_index,
        })
        .collect()
}

/// Re-ingesting the same file overwrites its chunks instead of duplicating them.
fn chunk_id(source: &str, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b":");
    hasher.update(index.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Run the full ingestion pipeline over `dir`.
///
/// 1. Discover supported documents
/// 2. Load and chunk each one, skipping failures
/// 3. Create the index if needed
/// 4. Embed and upload chunks in batches
#[instrument(skip_all, fields(dir = %dir.display(), index = %index.index_name()))]
pub async fn ingest_folder(
    dir: &Path,
    opts: &IngestOptions,
    embeddings: &AzureEmbeddings,
    index: &SearchIndex,
    progress: &dyn IngestProgress,
) -> Result<IngestReport> {
    progress.phase("Discovering documents");
    let paths = discover_documents(dir)?;
    let mut report = IngestReport {
        documents_found: paths.len(),
        ..Default::default()
    };

    if paths.is_empty() {
        warn!("no PDF, Markdown or text documents found");
        return Ok(report);
    }
    info!(count = paths.len(), "found documents");

    progress.phase("Loading documents");
    let mut chunks = Vec::new();
    for (i, path) in paths.iter().enumerate() {
        let name = source_name(path);
        progress.task_progress(i + 1, paths.len(), &name);

        match load_document(path).await {
            Ok(doc) => {
                let doc_chunks = chunk_document(&doc, &opts.chunking);
                debug!(source = %name, chunks = doc_chunks.len(), "loaded document");
                report.documents_loaded += 1;
                chunks.extend(doc_chunks);
            }
            Err(e) => {
                warn!(source = %name, error = %e, "skipping document");
                report.failed.push((name, e.to_string()));
            }
        }
    }

    if chunks.is_empty() {
        warn!("documents produced no text to index");
        return Ok(report);
    }

    progress.phase("Indexing chunks");
    let batch_size = opts.batch_size.max(1);
    let total = chunks.len();
    let mut index_ready = false;

    for batch in chunks.chunks(batch_size) {
        let inputs: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embeddings.embed(&inputs).await?;

        if !index_ready {
            let dimensions = vectors.first().map(Vec::len).unwrap_or_default();
            if index.ensure_index(dimensions).await? {
                info!(dimensions, "created index");
            }
            index_ready = true;
        }

        report.chunks_indexed += index.upload(batch, &vectors).await?;
        progress.task_progress(report.chunks_indexed, total, "uploaded");
    }

    info!(
        documents = report.documents_loaded,
        chunks = report.chunks_indexed,
        skipped = report.failed.len(),
        "ingestion complete"
    );
    Ok(report)
}
