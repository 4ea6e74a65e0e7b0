//! Azure Video Indexer REST client.
//!
//! Uses the classic API-key flow: an account access token is obtained with
//! the subscription key, then passed as `accessToken` on upload and index
//! requests.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use brandguard_shared::{BrandGuardError, Result, VideoIndexerConfig};

use crate::{JobStatus, LocalMedia, VideoExtraction, VideoIntelligence};

/// Header carrying the API subscription key.
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Access tokens live for one hour; refresh a little early.
const TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

/// Uploads can be large; allow generous request time.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Video Indexer implementation of [`VideoIntelligence`].
pub struct AzureVideoIndexer {
    client: Client,
    endpoint: String,
    location: String,
    account_id: String,
    api_key: String,
    downloader: String,
    token: Mutex<Option<(String, Instant)>>,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

impl AzureVideoIndexer {
    /// Create a client for the configured account.
    pub fn new(config: &VideoIndexerConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("BrandGuardian/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BrandGuardError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            location: config.location.clone(),
            account_id: config.account_id.clone(),
            api_key,
            downloader: config.downloader.clone(),
            token: Mutex::new(None),
        })
    }

    fn account_url(&self, suffix: &str) -> String {
        format!(
            "{}/{}/Accounts/{}/{suffix}",
            self.endpoint, self.location, self.account_id
        )
    }

    /// Return a cached account access token, fetching a new one when stale.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some((token, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < TOKEN_TTL {
                return Ok(token.clone());
            }
        }

        let url = format!(
            "{}/Auth/{}/Accounts/{}/AccessToken",
            self.endpoint, self.location, self.account_id
        );
        debug!(%url, "requesting video indexer access token");

        let response = self
            .client
            .get(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .query(&[("allowEdit", "true")])
            .send()
            .await
            .map_err(|e| BrandGuardError::Network(format!("access token request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrandGuardError::Video(format!(
                "access token request failed: HTTP {status}: {body}"
            )));
        }

        let token: String = response
            .json()
            .await
            .map_err(|e| BrandGuardError::parse(format!("access token response: {e}")))?;

        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }
}

#[async_trait]
impl VideoIntelligence for AzureVideoIndexer {
    async fn fetch(&self, url: &str) -> Result<LocalMedia> {
        crate::download::download_video(&self.downloader, url).await
    }

    #[instrument(skip_all, fields(name = %name))]
    async fn submit(&self, media: &LocalMedia, name: &str) -> Result<String> {
        let bytes = tokio::fs::read(media.path())
            .await
            .map_err(|e| BrandGuardError::io(media.path(), e))?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(media.file_name())
            .mime_str("video/mp4")
            .map_err(|e| BrandGuardError::Video(format!("invalid upload part: {e}")))?;
        let form = Form::new().part("file", part);

        let token = self.access_token().await?;
        info!(bytes = size, "uploading video for indexing");

        let response = self
            .client
            .post(self.account_url("Videos"))
            .query(&[
                ("name", name),
                ("privacy", "Private"),
                ("accessToken", token.as_str()),
            ])
            .multipart(form)
            .send()
            .await
            .map_err(|e| BrandGuardError::Network(format!("video upload: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrandGuardError::Video(format!(
                "video upload failed: HTTP {status}: {body}"
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| BrandGuardError::parse(format!("upload response: {e}")))?;

        info!(job_id = %uploaded.id, "video uploaded");
        Ok(uploaded.id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobStatus> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(self.account_url(&format!("Videos/{job_id}/Index")))
            .query(&[("accessToken", token.as_str())])
            .send()
            .await
            .map_err(|e| BrandGuardError::Network(format!("index request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrandGuardError::Video(format!(
                "index request failed: HTTP {status}: {body}"
            )));
        }

        let index: Value = response
            .json()
            .await
            .map_err(|e| BrandGuardError::parse(format!("index response: {e}")))?;

        Ok(job_status(index))
    }

    fn extract(&self, result: &Value) -> Result<VideoExtraction> {
        crate::insights::extract_insights(result)
    }
}

/// Map an index document's `state` onto [`JobStatus`].
fn job_status(index: Value) -> JobStatus {
    let state = index
        .get("state")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match state.as_str() {
        "Processed" => JobStatus::Completed(index),
        "Failed" | "Quarantined" => {
            let reason = index
                .pointer("/videos/0/failureMessage")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("no failure message");
            warn!(state = %state, reason, "video processing failed");
            JobStatus::Failed(format!("video processing {}: {reason}", state.to_lowercase()))
        }
        _ => JobStatus::Processing {
            progress: index
                .pointer("/videos/0/processingProgress")
                .and_then(Value::as_str)
                .map(String::from),
        },
    }
}
