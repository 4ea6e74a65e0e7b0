//! Compliance stage: retrieval-augmented audit of the extracted content.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use brandguard_knowledge::RuleRetriever;
use brandguard_llm::ComplianceModel;
use brandguard_shared::{AuditState, AuditStatus, BrandGuardError, StatePatch};

use crate::parse::parse_verdict;
use crate::prompt::{build_context, system_prompt, user_message};

/// Report recorded when there is no transcript to audit.
pub const SKIP_MESSAGE: &str = "Audit skipped because video processing failed (No transcript).";

const RULE_SEPARATOR: &str = "\n\n";

pub struct ComplianceStage {
    retriever: Arc<dyn RuleRetriever>,
    model: Arc<dyn ComplianceModel>,
    top_k: usize,
}

impl ComplianceStage {
    pub fn new(
        retriever: Arc<dyn RuleRetriever>,
        model: Arc<dyn ComplianceModel>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            model,
            top_k,
        }
    }

    /// Run the stage. Never fails: retrieval, model and parse errors become a
    /// `FAIL` patch with an error entry.
    #[instrument(skip_all, fields(video_id = %state.video_id(), top_k = self.top_k))]
    pub async fn run(&self, state: &AuditState) -> StatePatch {
        let transcript = match state.transcript() {
            Some(t) if !t.is_empty() => t,
            _ => {
                warn!("no transcript available, skipping audit");
                return StatePatch {
                    final_status: Some(AuditStatus::Fail),
                    final_report: Some(SKIP_MESSAGE.to_string()),
                    ..Default::default()
                };
            }
        };

        let context = build_context(transcript, state.ocr_text());
        let rules = match self.retriever.search(&context, self.top_k).await {
            Ok(rules) => rules,
            Err(e) => {
                error!(error = %e, "rule retrieval failed");
                return failure(e);
            }
        };
        info!(rules = rules.len(), "retrieved rule documents");

        let system = system_prompt(&rules.join(RULE_SEPARATOR));
        let user = user_message(state.video_metadata(), transcript, state.ocr_text());

        let raw = match self.model.complete(&system, &user).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, raw_response = "None", "compliance model call failed");
                return failure(e);
            }
        };

        match parse_verdict(&raw) {
            Ok(verdict) => {
                info!(
                    status = %verdict.status,
                    issues = verdict.compliance_results.len(),
                    "audit verdict parsed"
                );
                StatePatch {
                    compliance_results: verdict.compliance_results,
                    final_status: Some(verdict.status),
                    final_report: Some(verdict.final_report),
                    ..Default::default()
                }
            }
            Err(e) => {
                error!(error = %e, raw_response = %raw, "model response rejected");
                failure(e)
            }
        }
    }
}

fn failure(e: BrandGuardError) -> StatePatch {
    StatePatch {
        errors: vec![e.to_string()],
        final_status: Some(AuditStatus::Fail),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::DEFAULT_REPORT;
    use crate::test_support::{StubModel, StubRetriever};
    use brandguard_shared::Severity;

    fn stage(retriever: &Arc<StubRetriever>, model: &Arc<StubModel>) -> ComplianceStage {
        ComplianceStage::new(retriever.clone(), model.clone(), 3)
    }

    fn extracted(transcript: &str, ocr: &[&str]) -> AuditState {
        AuditState::new("https://youtu.be/abc123", "vid_1").merge(StatePatch {
            transcript: Some(transcript.to_string()),
            ocr_text: Some(ocr.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn missing_or_empty_transcript_short_circuits() {
        let retriever = Arc::new(StubRetriever::returning(&["rule"]));
        let model = Arc::new(StubModel::replying("{}"));
        let stage = stage(&retriever, &model);

        let never_extracted = AuditState::new("https://youtu.be/abc123", "vid_1");
        for state in [never_extracted, extracted("", &["OCR only"])] {
            let patch = stage.run(&state).await;
            assert_eq!(patch.final_status, Some(AuditStatus::Fail));
            assert_eq!(patch.final_report.as_deref(), Some(SKIP_MESSAGE));
            assert!(patch.errors.is_empty());
            assert!(patch.compliance_results.is_empty());
        }

        assert_eq!(retriever.calls(), 0);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn retrieves_rules_and_prompts_model_once() {
        let retriever = Arc::new(StubRetriever::returning(&[
            "Rule 1: no medical claims.",
            "Rule 2: disclose sponsorships.",
        ]));
        let model = Arc::new(StubModel::replying(
            r#"{"status":"PASS","compliance_results":[],"final_report":"Clean."}"#,
        ));

        let patch = stage(&retriever, &model)
            .run(&extracted("Great taste.", &["NEW", "FLAVOR"]))
            .await;

        assert_eq!(patch.final_status, Some(AuditStatus::Pass));
        assert_eq!(patch.final_report.as_deref(), Some("Clean."));
        assert!(patch.errors.is_empty());

        assert_eq!(
            retriever.queries(),
            vec![("Great taste. NEW FLAVOR".to_string(), 3)]
        );
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        let (system, user) = &prompts[0];
        assert!(system.contains("Rule 1: no medical claims.\n\nRule 2: disclose sponsorships."));
        assert!(user.contains("TRANSCRIPT: Great taste."));
        assert!(user.contains(r#"["NEW","FLAVOR"]"#));
    }

    #[tokio::test]
    async fn violations_are_returned_as_issues() {
        let retriever = Arc::new(StubRetriever::returning(&["No cure claims."]));
        let model = Arc::new(StubModel::replying(
            "```json\n{\"compliance_results\":[{\"category\":\"Claim Violation\",\"severity\":\"HIGH\",\"description\":\"Cure claim.\"}],\"status\":\"FAIL\"}\n```",
        ));

        let patch = stage(&retriever, &model).run(&extracted("It cures colds.", &[])).await;

        assert_eq!(patch.final_status, Some(AuditStatus::Fail));
        assert_eq!(patch.compliance_results.len(), 1);
        assert_eq!(patch.compliance_results[0].severity, Severity::High);
        assert_eq!(patch.final_report.as_deref(), Some(DEFAULT_REPORT));
    }

    #[tokio::test]
    async fn malformed_response_fails_without_retry() {
        let retriever = Arc::new(StubRetriever::returning(&["rule"]));
        let model = Arc::new(StubModel::replying("Sorry, I cannot help with that."));

        let patch = stage(&retriever, &model).run(&extracted("Buy now.", &[])).await;

        assert_eq!(patch.final_status, Some(AuditStatus::Fail));
        assert_eq!(patch.errors.len(), 1);
        assert!(patch.errors[0].contains("parse error"));
        assert!(patch.final_report.is_none());
        assert!(patch.transcript.is_none());
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn pass_with_issues_fails_closed() {
        let retriever = Arc::new(StubRetriever::returning(&["rule"]));
        let model = Arc::new(StubModel::replying(
            r#"{"status":"PASS","compliance_results":[{"category":"c","severity":"LOW","description":"d"}]}"#,
        ));

        let patch = stage(&retriever, &model).run(&extracted("Buy now.", &[])).await;

        assert_eq!(patch.final_status, Some(AuditStatus::Fail));
        assert!(patch.compliance_results.is_empty());
        assert!(patch.errors[0].contains("PASS with 1 compliance issue"));
    }

    #[tokio::test]
    async fn collaborator_errors_become_failures() {
        let retriever = Arc::new(StubRetriever::failing());
        let model = Arc::new(StubModel::replying("{}"));
        let patch = stage(&retriever, &model).run(&extracted("Buy now.", &[])).await;
        assert_eq!(patch.final_status, Some(AuditStatus::Fail));
        assert!(patch.errors[0].contains("search service unavailable"));
        assert_eq!(model.calls(), 0);

        let retriever = Arc::new(StubRetriever::returning(&["rule"]));
        let model = Arc::new(StubModel::failing("rate limited"));
        let patch = stage(&retriever, &model).run(&extracted("Buy now.", &[])).await;
        assert_eq!(patch.final_status, Some(AuditStatus::Fail));
        assert!(patch.errors[0].contains("rate limited"));
        assert_eq!(model.calls(), 1);
    }
}
