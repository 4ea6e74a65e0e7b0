//! The one error type shared by every Brand Guardian library crate.
//!
//! Stages never return these to callers: they turn them into strings in the
//! audit state's `errors` list. Only setup paths (config, ingestion, the
//! server) propagate them, and the binary reports those through `color-eyre`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BrandGuardError {
    /// A required setting is missing or the config file is unreadable.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure or non-success status from an Azure endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// A response body, document or model verdict that could not be read.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Input that was read fine but breaks a rule, such as a non-YouTube URL
    /// or a PASS verdict that still lists issues.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Download, upload or indexing of the video went wrong.
    #[error("video error: {0}")]
    Video(String),

    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BrandGuardError>;

impl BrandGuardError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Attach the offending path to an I/O failure.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_error_strings_name_the_failing_step() {
        assert_eq!(
            BrandGuardError::Video("video processing failed: Quarantined".into()).to_string(),
            "video error: video processing failed: Quarantined"
        );
        assert_eq!(
            BrandGuardError::validation("status PASS with 2 issues").to_string(),
            "validation error: status PASS with 2 issues"
        );
        assert_eq!(
            BrandGuardError::Model("HTTP 429".into()).to_string(),
            "model error: HTTP 429"
        );
    }

    #[test]
    fn io_error_keeps_the_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = BrandGuardError::io("data/brand-guide.pdf", source);
        let text = err.to_string();
        assert!(text.contains("brand-guide.pdf"));
        assert!(text.contains("no such file"));
    }
}
