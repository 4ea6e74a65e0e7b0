//! Strict parsing of the model's verdict.
//!
//! Model output is untrusted text. Parsing is two steps: strip the first
//! fenced code block if there is one, then decode the JSON against a fixed
//! schema. Anything that does not fit is an error; nothing is coerced.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use brandguard_shared::{AuditStatus, BrandGuardError, ComplianceIssue, Result};

pub const DEFAULT_REPORT: &str = "No report generated";

const FENCE: &str = "```";

/// A decoded and validated audit verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVerdict {
    pub compliance_results: Vec<ComplianceIssue>,
    pub status: AuditStatus,
    pub final_report: String,
}

/// Only `PASS` and `FAIL` are valid verdicts.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum VerdictStatus {
    Pass,
    #[default]
    Fail,
}

impl From<VerdictStatus> for AuditStatus {
    fn from(status: VerdictStatus) -> Self {
        match status {
            VerdictStatus::Pass => AuditStatus::Pass,
            VerdictStatus::Fail => AuditStatus::Fail,
        }
    }
}

#[derive(Deserialize)]
struct RawVerdict {
    #[serde(default)]
    compliance_results: Vec<ComplianceIssue>,
    #[serde(default)]
    status: VerdictStatus,
    #[serde(default = "default_report")]
    final_report: String,
}

fn default_report() -> String {
    DEFAULT_REPORT.to_string()
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_+-]*(.*?)```").expect("fence pattern is valid")
    })
}

/// Return the JSON payload: the first fenced region if the text has a fence,
/// otherwise the whole text, trimmed either way.
pub fn extract_payload(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    if !trimmed.contains(FENCE) {
        return Ok(trimmed);
    }

    fence_pattern()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| BrandGuardError::parse("model response has an unterminated code fence"))
}

/// Parse and validate a raw model response.
pub fn parse_verdict(raw: &str) -> Result<ModelVerdict> {
    let payload = extract_payload(raw)?;
    if payload.is_empty() {
        return Err(BrandGuardError::parse("model response is empty"));
    }

    let parsed: RawVerdict = serde_json::from_str(payload)
        .map_err(|e| BrandGuardError::parse(format!("model response is not valid verdict JSON: {e}")))?;

    let status = AuditStatus::from(parsed.status);
    if status == AuditStatus::Pass && !parsed.compliance_results.is_empty() {
        return Err(BrandGuardError::validation(format!(
            "model returned PASS with {} compliance issue(s)",
            parsed.compliance_results.len()
        )));
    }

    Ok(ModelVerdict {
        compliance_results: parsed.compliance_results,
        status,
        final_report: parsed.final_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandguard_shared::Severity;

    const BARE: &str = r#"{
        "compliance_results": [
            {"category": "Claim Violation", "severity": "CRITICAL", "description": "Claims to cure all diseases."}
        ],
        "status": "FAIL",
        "final_report": "One critical medical claim."
    }"#;

    #[test]
    fn fenced_and_bare_parse_identically() {
        let bare = parse_verdict(BARE).unwrap();
        let tagged = parse_verdict(&format!("```json\n{BARE}\n```")).unwrap();
        let untagged = parse_verdict(&format!("```\n{BARE}\n```")).unwrap();
        let chatty = parse_verdict(&format!("Here is my audit:\n```json{BARE}```\nThanks.")).unwrap();

        assert_eq!(bare, tagged);
        assert_eq!(bare, untagged);
        assert_eq!(bare, chatty);
        assert_eq!(bare.status, AuditStatus::Fail);
        assert_eq!(bare.compliance_results[0].severity, Severity::Critical);
    }

    #[test]
    fn first_fenced_block_wins() {
        let raw = "```json\n{\"status\":\"PASS\"}\n```\nor maybe\n```json\n{\"status\":\"FAIL\"}\n```";
        assert_eq!(parse_verdict(raw).unwrap().status, AuditStatus::Pass);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let verdict = parse_verdict("{}").unwrap();
        assert!(verdict.compliance_results.is_empty());
        assert_eq!(verdict.status, AuditStatus::Fail);
        assert_eq!(verdict.final_report, DEFAULT_REPORT);
    }

    #[test]
    fn pass_with_issues_is_rejected() {
        let raw = r#"{"status":"PASS","compliance_results":[{"category":"c","severity":"LOW","description":"d"}]}"#;
        let err = parse_verdict(raw).unwrap_err();
        assert!(matches!(err, BrandGuardError::Validation { .. }));
    }

    #[test]
    fn pass_without_issues_is_accepted() {
        let verdict =
            parse_verdict(r#"{"status":"PASS","compliance_results":[],"final_report":"Clean."}"#).unwrap();
        assert_eq!(verdict.status, AuditStatus::Pass);
        assert_eq!(verdict.final_report, "Clean.");
    }

    #[test]
    fn schema_violations_are_rejected() {
        for raw in [
            r#"{"status":"MAYBE"}"#,
            r#"{"status":"UNKNOWN"}"#,
            r#"{"compliance_results":[{"category":"c","severity":"SEVERE","description":"d"}]}"#,
            r#"{"compliance_results":[{"category":"c","severity":"LOW"}]}"#,
            r#"{"compliance_results":{}}"#,
            r#"["not","an","object"]"#,
        ] {
            assert!(parse_verdict(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!(parse_verdict("I could not decide.").is_err());
        assert!(parse_verdict("").is_err());
        assert!(parse_verdict("```json\n{\"status\":\"PASS\"}").is_err());
        assert!(parse_verdict("```json\n```").is_err());
    }
}
