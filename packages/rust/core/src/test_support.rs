//! In-process collaborator stubs with call counters.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use brandguard_indexer::{JobStatus, LocalMedia, VideoExtraction, VideoIntelligence};
use brandguard_knowledge::RuleRetriever;
use brandguard_llm::ComplianceModel;
use brandguard_shared::{BrandGuardError, Result, VideoMetadata};

pub struct StubVideo {
    extraction: VideoExtraction,
    processing_polls: usize,
    final_status: JobStatus,
    submit_error: Option<String>,
    fetch_stalls: bool,
    fetch_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    media_seen_during_poll: AtomicBool,
    staged_dirs: Mutex<Vec<PathBuf>>,
    submitted_names: Mutex<Vec<String>>,
}

impl StubVideo {
    pub fn with_transcript(transcript: &str) -> Self {
        let mut metadata = VideoMetadata::new();
        metadata.insert("platform".into(), json!("youtube"));
        metadata.insert("duration".into(), json!(42));

        Self {
            extraction: VideoExtraction {
                transcript: transcript.to_string(),
                ocr_text: vec!["SALE 50% OFF".to_string()],
                video_metadata: metadata,
            },
            processing_polls: 0,
            final_status: JobStatus::Completed(json!({ "state": "Processed" })),
            submit_error: None,
            fetch_stalls: false,
            fetch_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            media_seen_during_poll: AtomicBool::new(false),
            staged_dirs: Mutex::new(Vec::new()),
            submitted_names: Mutex::new(Vec::new()),
        }
    }

    /// Report `Processing` for the first `polls` polls.
    pub fn processing_for(mut self, polls: usize) -> Self {
        self.processing_polls = polls;
        self
    }

    pub fn with_final_status(mut self, status: JobStatus) -> Self {
        self.final_status = status;
        self
    }

    pub fn failing_submit(mut self, message: &str) -> Self {
        self.submit_error = Some(message.to_string());
        self
    }

    /// `fetch` never resolves, like a downloader stuck on a dead network.
    pub fn stalled_fetch(mut self) -> Self {
        self.fetch_stalls = true;
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn media_seen_during_poll(&self) -> bool {
        self.media_seen_during_poll.load(Ordering::SeqCst)
    }

    pub fn staged_dirs(&self) -> Vec<PathBuf> {
        self.staged_dirs.lock().unwrap().clone()
    }

    pub fn submitted_names(&self) -> Vec<String> {
        self.submitted_names.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoIntelligence for StubVideo {
    async fn fetch(&self, _url: &str) -> Result<LocalMedia> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fetch_stalls {
            std::future::pending::<()>().await;
        }
        let media = LocalMedia::staged("video.mp4")?;
        std::fs::write(media.path(), b"fake video").map_err(|e| BrandGuardError::io(media.path(), e))?;
        self.staged_dirs.lock().unwrap().push(media.dir().to_path_buf());
        Ok(media)
    }

    async fn submit(&self, media: &LocalMedia, name: &str) -> Result<String> {
        assert!(media.path().exists(), "media must exist during upload");
        self.submitted_names.lock().unwrap().push(name.to_string());
        match &self.submit_error {
            Some(message) => Err(BrandGuardError::Video(message.clone())),
            None => Ok("job-1".to_string()),
        }
    }

    async fn poll(&self, _job_id: &str) -> Result<JobStatus> {
        let n = self.poll_calls.fetch_add(1, Ordering::SeqCst);
        if self.staged_dirs().iter().any(|d| d.exists()) {
            self.media_seen_during_poll.store(true, Ordering::SeqCst);
        }
        if n < self.processing_polls {
            Ok(JobStatus::Processing {
                progress: Some(format!("{}%", (n * 10).min(99))),
            })
        } else {
            Ok(self.final_status.clone())
        }
    }

    fn extract(&self, _result: &serde_json::Value) -> Result<VideoExtraction> {
        Ok(self.extraction.clone())
    }
}

pub struct StubRetriever {
    rules: Vec<String>,
    fail: bool,
    calls: AtomicUsize,
    queries: Mutex<Vec<(String, usize)>>,
}

impl StubRetriever {
    pub fn returning(rules: &[&str]) -> Self {
        Self {
            rules: rules.iter().map(|r| r.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RuleRetriever for StubRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push((query.to_string(), k));
        if self.fail {
            return Err(BrandGuardError::Retrieval("search service unavailable".into()));
        }
        Ok(self.rules.iter().take(k).cloned().collect())
    }
}

pub struct StubModel {
    response: std::result::Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, String)>>,
}

impl StubModel {
    pub fn replying(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(system, user)` pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComplianceModel for StubModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        self.response
            .clone()
            .map_err(BrandGuardError::Model)
    }
}
