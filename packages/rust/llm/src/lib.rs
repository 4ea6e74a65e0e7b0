//! Chat-completion client for the compliance model.
//!
//! [`ComplianceModel`] is the single seam the compliance stage talks to;
//! [`AzureChatClient`] implements it against an Azure OpenAI chat deployment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use brandguard_shared::{AzureOpenAiConfig, BrandGuardError, Result};

/// A generative model that turns a system and user prompt into raw text.
#[async_trait]
pub trait ComplianceModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Azure OpenAI chat completions with deterministic sampling.
pub struct AzureChatClient {
    client: Client,
    url: String,
    api_key: String,
    deployment: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl AzureChatClient {
    pub fn new(config: &AzureOpenAiConfig, api_key: String) -> Result<Self> {
        Self::with_timeout(config, api_key, 120)
    }

    pub fn with_timeout(
        config: &AzureOpenAiConfig,
        api_key: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("BrandGuardian/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BrandGuardError::Network(format!("failed to build HTTP client: {e}")))?;

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            config.endpoint.trim_end_matches('/'),
            config.chat_deployment,
            config.api_version
        );

        Ok(Self {
            client,
            url,
            api_key,
            deployment: config.chat_deployment.clone(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl ComplianceModel for AzureChatClient {
    #[instrument(skip_all, fields(deployment = %self.deployment))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = ChatRequest {
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrandGuardError::Model(format!(
                        "request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    BrandGuardError::Network(format!("chat request: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrandGuardError::Model(format!(
                "chat completion failed: HTTP {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BrandGuardError::parse(format!("chat response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BrandGuardError::Model("chat response had no content".into()))?;

        debug!(chars = content.len(), "model responded");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AzureChatClient {
        let config = AzureOpenAiConfig {
            endpoint: format!("{}/", server.uri()),
            ..Default::default()
        };
        AzureChatClient::new(&config, "secret".into()).unwrap()
    }

    #[tokio::test]
    async fn complete_sends_both_prompts_at_zero_temperature() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o/chat/completions"))
            .and(query_param("api-version", "2024-02-01"))
            .and(header("api-key", "secret"))
            .and(body_partial_json(json!({
                "temperature": 0.0,
                "messages": [
                    { "role": "system", "content": "be strict" },
                    { "role": "user", "content": "audit this" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"status\":\"PASS\"}" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server)
            .complete("be strict", "audit this")
            .await
            .unwrap();
        assert_eq!(text, "{\"status\":\"PASS\"}");
    }

    #[tokio::test]
    async fn http_error_is_a_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(err, BrandGuardError::Model(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn empty_choices_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("s", "u").await.unwrap_err();
        assert!(err.to_string().contains("no content"));
    }
}
