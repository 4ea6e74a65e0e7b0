//! The audit workflow: `START → Extraction → Compliance → END`.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use brandguard_indexer::VideoIntelligence;
use brandguard_knowledge::RuleRetriever;
use brandguard_llm::ComplianceModel;
use brandguard_shared::{AuditState, PipelineConfig};

use crate::compliance::ComplianceStage;
use crate::extraction::{ExtractionStage, PollPolicy};

/// A node of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Compliance,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Compliance => "compliance",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress callback for workflow runs.
pub trait WorkflowObserver: Send + Sync {
    /// Called before a stage runs.
    fn stage_started(&self, stage: Stage);
    /// Called with the merged state after a stage finishes.
    fn stage_finished(&self, stage: Stage, state: &AuditState);
}

/// No-op workflow observer.
pub struct SilentObserver;

impl WorkflowObserver for SilentObserver {
    fn stage_started(&self, _stage: Stage) {}
    fn stage_finished(&self, _stage: Stage, _state: &AuditState) {}
}

/// Runs the two audit stages in order, merging each stage's patch.
///
/// Built once at startup and shared across requests; it holds no per-request
/// state.
pub struct AuditWorkflow {
    extraction: ExtractionStage,
    compliance: ComplianceStage,
    observer: Arc<dyn WorkflowObserver>,
}

impl AuditWorkflow {
    pub fn new(extraction: ExtractionStage, compliance: ComplianceStage) -> Self {
        Self {
            extraction,
            compliance,
            observer: Arc::new(SilentObserver),
        }
    }

    /// Wire both stages from their collaborators and the pipeline settings.
    pub fn from_collaborators(
        video: Arc<dyn VideoIntelligence>,
        retriever: Arc<dyn RuleRetriever>,
        model: Arc<dyn ComplianceModel>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(
            ExtractionStage::new(video, PollPolicy::from_config(config)),
            ComplianceStage::new(retriever, model, config.top_k),
        )
    }

    pub fn with_observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run the audit to completion.
    pub async fn run(&self, initial: AuditState) -> AuditState {
        self.run_with_cancel(initial, &CancellationToken::new()).await
    }

    /// Run the audit, abandoning the extraction wait if `cancel` fires.
    /// The compliance stage still runs and short-circuits on the empty
    /// transcript, so the result is always a complete state.
    #[instrument(skip_all, fields(video_id = %initial.video_id()))]
    pub async fn run_with_cancel(
        &self,
        initial: AuditState,
        cancel: &CancellationToken,
    ) -> AuditState {
        let start = Instant::now();

        self.observer.stage_started(Stage::Extraction);
        let patch = self.extraction.run(&initial, cancel).await;
        let state = initial.merge(patch);
        self.observer.stage_finished(Stage::Extraction, &state);

        self.observer.stage_started(Stage::Compliance);
        let patch = self.compliance.run(&state).await;
        let state = state.merge(patch);
        self.observer.stage_finished(Stage::Compliance, &state);

        info!(
            status = %state.final_status(),
            issues = state.compliance_results().len(),
            errors = state.errors().len(),
            elapsed = ?start.elapsed(),
            "audit complete"
        );
        state
    }
}
