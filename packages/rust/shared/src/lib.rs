//! Shared state model, error model, and configuration for Brand Guardian.
//!
//! This crate is the foundation depended on by all other Brand Guardian crates.
//! It provides:
//! - [`BrandGuardError`]: the unified error type
//! - The audit record ([`AuditState`], [`StatePatch`]) and its merge contract
//! - Domain values ([`ComplianceIssue`], [`Severity`], [`AuditStatus`])
//! - Configuration ([`AppConfig`], config loading, required-variable checks)

pub mod config;
pub mod error;
pub mod state;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AzureOpenAiConfig, AppConfig, IngestConfig, PipelineConfig, SearchConfig, VideoIndexerConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, require_vars,
    resolve_secret,
};
pub use error::{BrandGuardError, Result};
pub use state::{AppendOnly, AuditState, StatePatch, VideoMetadata};
pub use types::{AuditStatus, ComplianceIssue, Severity};
