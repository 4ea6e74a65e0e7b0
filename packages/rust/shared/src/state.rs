//! The audit record threaded through the pipeline, and its merge contract.
//!
//! Every stage reads an [`AuditState`] and returns a [`StatePatch`] holding
//! only the fields it changed. [`AuditState::merge`] folds the patch in:
//! scalar fields are last-writer-wins, accumulating fields ([`AppendOnly`])
//! concatenate. A stage therefore cannot clobber findings or diagnostics
//! recorded by an earlier stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AuditStatus, ComplianceIssue};

// ---------------------------------------------------------------------------
// AppendOnly
// ---------------------------------------------------------------------------

/// A sequence that can only grow. Insertion order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppendOnly<T>(Vec<T>);

impl<T> AppendOnly<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append `items` after the existing entries.
    pub fn append(&mut self, items: impl IntoIterator<Item = T>) {
        self.0.extend(items);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for AppendOnly<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Deref for AppendOnly<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> FromIterator<T> for AppendOnly<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// AuditState
// ---------------------------------------------------------------------------

/// Scalar video metadata such as duration, resolution, or fps.
///
/// Ordered so that serialized states are byte-stable.
pub type VideoMetadata = BTreeMap<String, serde_json::Value>;

/// The single record threaded through the audit pipeline.
///
/// Created once per audit request and never shared between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditState {
    video_url: String,
    video_id: String,
    #[serde(default)]
    video_metadata: VideoMetadata,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    ocr_text: Vec<String>,
    #[serde(default)]
    compliance_results: AppendOnly<ComplianceIssue>,
    #[serde(default)]
    errors: AppendOnly<String>,
    #[serde(default)]
    final_status: AuditStatus,
    #[serde(default)]
    final_report: Option<String>,
}

impl AuditState {
    /// Seed a fresh state holding only the input reference and its identifier.
    pub fn new(video_url: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            video_id: video_id.into(),
            video_metadata: VideoMetadata::new(),
            transcript: None,
            ocr_text: Vec::new(),
            compliance_results: AppendOnly::new(),
            errors: AppendOnly::new(),
            final_status: AuditStatus::Unknown,
            final_report: None,
        }
    }

    /// Fold a stage's partial output into this state.
    ///
    /// Fields absent from `patch` are left untouched; scalar fields present in
    /// `patch` overwrite; `compliance_results` and `errors` are appended.
    pub fn merge(mut self, patch: StatePatch) -> Self {
        if let Some(metadata) = patch.video_metadata {
            self.video_metadata = metadata;
        }
        if let Some(transcript) = patch.transcript {
            self.transcript = Some(transcript);
        }
        if let Some(ocr_text) = patch.ocr_text {
            self.ocr_text = ocr_text;
        }
        if let Some(status) = patch.final_status {
            self.final_status = status;
        }
        if let Some(report) = patch.final_report {
            self.final_report = Some(report);
        }
        self.compliance_results.append(patch.compliance_results);
        self.errors.append(patch.errors);
        self
    }

    pub fn video_url(&self) -> &str {
        &self.video_url
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn video_metadata(&self) -> &VideoMetadata {
        &self.video_metadata
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    /// True when no usable transcript has been extracted.
    pub fn transcript_missing(&self) -> bool {
        self.transcript.as_deref().is_none_or(str::is_empty)
    }

    pub fn ocr_text(&self) -> &[String] {
        &self.ocr_text
    }

    pub fn compliance_results(&self) -> &[ComplianceIssue] {
        &self.compliance_results
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn final_status(&self) -> AuditStatus {
        self.final_status
    }

    pub fn final_report(&self) -> Option<&str> {
        self.final_report.as_deref()
    }
}

// ---------------------------------------------------------------------------
// StatePatch
// ---------------------------------------------------------------------------

/// The subset of [`AuditState`] fields a stage chose to set on one run.
///
/// `None` means "leave untouched"; an empty accumulating list means
/// "nothing to append". The input fields (`video_url`, `video_id`) are
/// immutable once seeded and have no patch counterpart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub video_metadata: Option<VideoMetadata>,
    pub transcript: Option<String>,
    pub ocr_text: Option<Vec<String>>,
    pub compliance_results: Vec<ComplianceIssue>,
    pub errors: Vec<String>,
    pub final_status: Option<AuditStatus>,
    pub final_report: Option<String>,
}
