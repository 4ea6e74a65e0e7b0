//! Video-intelligence collaborator: turns a video reference into text.
//!
//! This crate provides:
//! - [`VideoIntelligence`]: the fetch → submit → poll → extract contract
//!   consumed by the extraction stage
//! - [`LocalMedia`]: a locally staged video file, deleted on drop
//! - [`AzureVideoIndexer`]: implementation backed by `yt-dlp` and the
//!   Azure Video Indexer REST API

pub mod client;
pub mod download;
pub mod insights;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use brandguard_shared::{BrandGuardError, Result, VideoMetadata};

pub use client::AzureVideoIndexer;
pub use download::download_video;
pub use insights::extract_insights;

// ---------------------------------------------------------------------------
// Collaborator contract
// ---------------------------------------------------------------------------

/// Processing state of a submitted video.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Still being processed; `progress` is a service-provided hint like "42%".
    Processing { progress: Option<String> },
    /// Finished; carries the raw processing result.
    Completed(serde_json::Value),
    /// Terminal failure with the service's explanation.
    Failed(String),
}

/// Normalized text and metadata extracted from a processed video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoExtraction {
    pub transcript: String,
    /// On-screen text in order of appearance.
    pub ocr_text: Vec<String>,
    pub video_metadata: VideoMetadata,
}

/// External service that converts a video into transcript, OCR and metadata.
#[async_trait]
pub trait VideoIntelligence: Send + Sync {
    /// Download the referenced video to a local, self-deleting file.
    async fn fetch(&self, url: &str) -> Result<LocalMedia>;

    /// Upload local media for processing; returns the service job id.
    async fn submit(&self, media: &LocalMedia, name: &str) -> Result<String>;

    /// Query the processing status of a submitted job.
    async fn poll(&self, job_id: &str) -> Result<JobStatus>;

    /// Normalize a completed processing result.
    fn extract(&self, result: &serde_json::Value) -> Result<VideoExtraction>;
}

// ---------------------------------------------------------------------------
// LocalMedia
// ---------------------------------------------------------------------------

/// A video file staged in a private temporary directory.
///
/// The directory and everything in it is removed when the handle is dropped.
#[derive(Debug)]
pub struct LocalMedia {
    dir: tempfile::TempDir,
    path: PathBuf,
}

impl LocalMedia {
    /// Reserve a path named `file_name` inside a fresh temporary directory.
    /// The file itself is not created.
    pub fn staged(file_name: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("brandguard-")
            .tempdir()
            .map_err(|e| BrandGuardError::io(std::env::temp_dir(), e))?;
        let path = dir.path().join(file_name);
        Ok(Self { dir, path })
    }

    /// Location of the media file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The temporary directory owning the media file.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// File name used when uploading.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string())
    }
}
