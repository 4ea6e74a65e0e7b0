//! Domain values produced by an audit.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// How serious a single compliance finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditStatus
// ---------------------------------------------------------------------------

/// Overall verdict of an audit.
///
/// `Unknown` is the seeded value before any stage has written a verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Pass,
    Fail,
    #[default]
    Unknown,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ComplianceIssue
// ---------------------------------------------------------------------------

/// A single rule violation reported by the auditor model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    /// Violation category, e.g. "Claim Violation".
    pub category: String,
    pub severity: Severity,
    /// Explanation of the violation.
    pub description: String,
    /// Position in the video, when the model supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_uses_uppercase_wire_names() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, r#""CRITICAL""#);
        let parsed: Severity = serde_json::from_str(r#""LOW""#).unwrap();
        assert_eq!(parsed, Severity::Low);
        assert!(serde_json::from_str::<Severity>(r#""SEVERE""#).is_err());
    }

    #[test]
    fn status_defaults_to_unknown() {
        assert_eq!(AuditStatus::default(), AuditStatus::Unknown);
        assert_eq!(AuditStatus::Fail.to_string(), "FAIL");
    }

    #[test]
    fn issue_without_timestamp_omits_field() {
        let issue = ComplianceIssue {
            category: "Claim Violation".into(),
            severity: Severity::High,
            description: "Unsubstantiated claim".into(),
            timestamp: None,
        };
        let json = serde_json::to_string(&issue).unwrap();
        assert!(!json.contains("timestamp"));

        let parsed: ComplianceIssue = serde_json::from_str(
            r#"{"category":"Claim Violation","severity":"HIGH","description":"x"}"#,
        )
        .unwrap();
        assert!(parsed.timestamp.is_none());
    }
}
