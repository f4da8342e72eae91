//! OpenAI-compatible chat-completions client.
//!
//! Speaks the `/chat/completions` wire format shared by OpenRouter, OpenAI
//! and Anthropic's compatibility endpoint. Transient failures (HTTP 429,
//! 5xx, connect errors and timeouts) are retried with backoff inside a single
//! `complete` call.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Settings;
use crate::error::CompletionError;

use super::prompt::truncate_chars;
use super::provider::{ApiCredential, CompletionProvider, CompletionRequest, ResponseFormat};
use super::retry::retry_with_backoff;

/// Longest error body kept in a `CompletionError::Status`.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl From<ResponseFormat> for WireResponseFormat {
    fn from(format: ResponseFormat) -> Self {
        match format {
            ResponseFormat::JsonObject => WireResponseFormat { kind: "json_object" },
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP completion provider.
pub struct CompletionClient {
    http: reqwest::Client,
    default_credential: Option<ApiCredential>,
    default_base_url: String,
    timeout: Duration,
}

impl CompletionClient {
    /// Build a client from settings. The hosted key may be absent when every
    /// request will carry its own credential.
    pub fn new(settings: &Settings) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(settings.completion_timeout)
            .build()
            .map_err(CompletionError::ClientBuild)?;

        Ok(Self {
            http,
            default_credential: settings.api_key.clone().map(|api_key| ApiCredential {
                api_key,
                base_url: settings.base_url.clone(),
            }),
            default_base_url: settings.base_url.clone(),
            timeout: settings.completion_timeout,
        })
    }

    /// Base URL used for requests without a credential override.
    pub fn base_url(&self) -> &str {
        &self.default_base_url
    }

    async fn send_once(
        &self,
        credential: &ApiCredential,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", credential.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.response_format.map(WireResponseFormat::from),
        };

        debug!(model = %request.model, url = %url, "Sending completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&credential.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: truncate_chars(&text, MAX_ERROR_BODY_CHARS).to_string(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }

    fn map_transport_error(&self, error: reqwest::Error) -> CompletionError {
        if error.is_timeout() {
            CompletionError::Timeout(self.timeout.as_secs())
        } else {
            CompletionError::Request(error)
        }
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let credential = request
            .credential
            .as_ref()
            .or(self.default_credential.as_ref())
            .ok_or(CompletionError::MissingApiKey)?;

        retry_with_backoff(
            || self.send_once(credential, &request),
            CompletionError::is_transient,
            |e| CompletionError::RetriesExhausted(Box::new(e)),
        )
        .await
    }
}
