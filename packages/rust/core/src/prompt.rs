//! Prompt construction for the compliance audit.

use brandguard_shared::VideoMetadata;

/// Text the rule search runs against: the transcript, then the OCR snippets.
pub fn build_context(transcript: &str, ocr_text: &[String]) -> String {
    if ocr_text.is_empty() {
        transcript.to_string()
    } else {
        format!("{transcript} {}", ocr_text.join(" "))
    }
}

/// System instruction carrying the retrieved rules and the output contract.
pub fn system_prompt(retrieved_rules: &str) -> String {
    format!(
        r#"You are a senior brand compliance auditor.

OFFICIAL REGULATORY RULES:
{retrieved_rules}

INSTRUCTIONS:
1. Analyze the transcript and on-screen text (OCR) provided by the user.
2. Identify violations of the rules above. Judge only against these rules.
3. Return strictly JSON in the following format and nothing else:
{{
    "compliance_results": [
        {{
            "category": "Claim Violation",
            "severity": "CRITICAL",
            "description": "Explanation of the violation."
        }}
    ],
    "status": "FAIL",
    "final_report": "Summary of the findings."
}}

"severity" must be one of CRITICAL, HIGH, MEDIUM or LOW.
If no violations are found, set "status" to "PASS" and "compliance_results" to []."#
    )
}

/// User message with the video metadata, transcript and OCR text verbatim.
pub fn user_message(metadata: &VideoMetadata, transcript: &str, ocr_text: &[String]) -> String {
    let metadata = serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string());
    let ocr = serde_json::to_string(ocr_text).unwrap_or_else(|_| "[]".to_string());
    format!("VIDEO_METADATA: {metadata}\nTRANSCRIPT: {transcript}\nON-SCREEN TEXT (OCR): {ocr}")
}
