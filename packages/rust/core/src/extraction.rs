//! Extraction stage: video reference → transcript, OCR text and metadata.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use url::Url;

use brandguard_indexer::{JobStatus, VideoExtraction, VideoIntelligence};
use brandguard_shared::{AuditState, AuditStatus, BrandGuardError, PipelineConfig, Result, StatePatch};

const YOUTUBE_HOSTS: [&str; 4] = ["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];

/// How often and for how long to wait on video processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    /// Bound on the download plus upload, before polling starts.
    pub transfer_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl PollPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            timeout: Duration::from_secs(config.poll_timeout_secs),
            transfer_timeout: Duration::from_secs(config.transfer_timeout_secs),
        }
    }
}

/// Accept only http(s) links to a recognized YouTube host.
pub fn validate_video_url(raw: &str) -> Result<Url> {
    let unsupported = || {
        BrandGuardError::validation(format!(
            "unsupported video reference '{raw}': please provide a valid YouTube URL"
        ))
    };

    let url = Url::parse(raw.trim()).map_err(|_| unsupported())?;
    let scheme_ok = matches!(url.scheme(), "http" | "https");
    let host_ok = url
        .host_str()
        .is_some_and(|host| YOUTUBE_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)));

    if scheme_ok && host_ok {
        Ok(url)
    } else {
        Err(unsupported())
    }
}

/// Fetches, submits and waits on the video, then normalizes the result.
pub struct ExtractionStage {
    video: Arc<dyn VideoIntelligence>,
    policy: PollPolicy,
}

impl ExtractionStage {
    pub fn new(video: Arc<dyn VideoIntelligence>, policy: PollPolicy) -> Self {
        Self { video, policy }
    }

    /// Run the stage. Never fails: errors come back as a terminal `FAIL` patch
    /// with an empty transcript so the compliance stage short-circuits.
    #[instrument(skip_all, fields(video_id = %state.video_id()))]
    pub async fn run(&self, state: &AuditState, cancel: &CancellationToken) -> StatePatch {
        info!(url = %state.video_url(), "extracting video content");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BrandGuardError::Video("audit cancelled".into())),
            result = self.extract(state) => result,
        };

        match outcome {
            Ok(extraction) => {
                info!(
                    transcript_chars = extraction.transcript.len(),
                    ocr_lines = extraction.ocr_text.len(),
                    "extraction completed"
                );
                StatePatch {
                    transcript: Some(extraction.transcript),
                    ocr_text: Some(extraction.ocr_text),
                    video_metadata: Some(extraction.video_metadata),
                    ..Default::default()
                }
            }
            Err(e) => {
                error!(error = %e, "video extraction failed");
                StatePatch {
                    errors: vec![e.to_string()],
                    final_status: Some(AuditStatus::Fail),
                    transcript: Some(String::new()),
                    ocr_text: Some(Vec::new()),
                    ..Default::default()
                }
            }
        }
    }

    async fn extract(&self, state: &AuditState) -> Result<VideoExtraction> {
        let url = validate_video_url(state.video_url())?;

        let transfer = async {
            let media = self.video.fetch(url.as_str()).await?;
            debug!(path = %media.path().display(), "video downloaded");
            self.video.submit(&media, state.video_id()).await
            // `media` is dropped here, deleting the local copy.
        };
        let job_id = tokio::time::timeout(self.policy.transfer_timeout, transfer)
            .await
            .map_err(|_| {
                BrandGuardError::Video(format!(
                    "video transfer did not finish within {}s",
                    self.policy.transfer_timeout.as_secs()
                ))
            })??;
        info!(job_id = %job_id, "video submitted for processing");

        let result = self.wait_for_completion(&job_id).await?;
        self.video.extract(&result)
    }

    async fn wait_for_completion(&self, job_id: &str) -> Result<serde_json::Value> {
        let poll_loop = async {
            loop {
                match self.video.poll(job_id).await? {
                    JobStatus::Completed(result) => return Ok(result),
                    JobStatus::Failed(reason) => return Err(BrandGuardError::Video(reason)),
                    JobStatus::Processing { progress } => {
                        debug!(
                            job_id,
                            progress = progress.as_deref().unwrap_or("unknown"),
                            "video still processing"
                        );
                        tokio::time::sleep(self.policy.interval).await;
                    }
                }
            }
        };

        tokio::time::timeout(self.policy.timeout, poll_loop)
            .await
            .map_err(|_| {
                BrandGuardError::Video(format!(
                    "video processing did not finish within {}s",
                    self.policy.timeout.as_secs()
                ))
            })?
    }
}
