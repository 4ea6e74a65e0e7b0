//! Audit pipeline for Brand Guardian.
//!
//! This crate wires the video-intelligence, retrieval and generative-model
//! collaborators into a fixed two-stage workflow:
//! `START → Extraction → Compliance → END`.
//!
//! - [`extraction`] turns a video reference into transcript, OCR and metadata
//! - [`compliance`] audits that content against retrieved rules
//! - [`workflow`] runs both stages and merges their patches into the state

pub mod compliance;
pub mod extraction;
pub mod parse;
pub mod prompt;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use compliance::{ComplianceStage, SKIP_MESSAGE};
pub use extraction::{ExtractionStage, PollPolicy, validate_video_url};
pub use parse::{ModelVerdict, parse_verdict};
pub use workflow::{AuditWorkflow, SilentObserver, Stage, WorkflowObserver};
