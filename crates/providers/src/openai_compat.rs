//! OpenAI-compatible completion client.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any endpoint exposing
//! `/chat/completions`. The agent persona is sent as the leading system
//! message. Errors are mapped onto [`ProviderError`] and never retried here.

use async_trait::async_trait;
use boardroom_core::error::ProviderError;
use boardroom_core::provider::{CompletionRequest, CompletionService, PromptMessage, PromptRole};
use boardroom_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: build_client(120)?,
        })
    }

    /// Create an OpenRouter client.
    pub fn openrouter(api_key: impl Into<String>) -> Result<Self> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an Ollama client. Ollama does not check the key.
    pub fn ollama(base_url: Option<&str>) -> Result<Self> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
        )
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self> {
        self.client = build_client(secs)?;
        Ok(self)
    }

    fn to_api_messages(persona: &str, messages: &[PromptMessage]) -> Vec<ApiMessage> {
        let system = (!persona.is_empty()).then(|| ApiMessage {
            role: "system".into(),
            content: persona.to_string(),
        });

        system
            .into_iter()
            .chain(messages.iter().map(|m| ApiMessage {
                role: match m.role {
                    PromptRole::System => "system".into(),
                    PromptRole::User => "user".into(),
                    PromptRole::Assistant => "assistant".into(),
                },
                content: m.content.clone(),
            }))
            .collect()
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))
}

#[async_trait]
impl CompletionService for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> std::result::Result<String, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "{} has no API key",
                self.name
            )));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = ApiRequest {
            model: &request.model,
            messages: Self::to_api_messages(&request.persona, &request.messages),
            temperature: request.temperature,
            stream: false,
        };

        debug!(provider = %self.name, model = %request.model, messages = body.messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Completion service returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        extract_text(api_response)
    }
}

fn extract_text(response: ApiResponse) -> std::result::Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))
}

// --- Wire types ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openrouter_constructor() {
        let provider = OpenAiCompatProvider::openrouter("sk-test").unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("x", "http://localhost:8080/v1/", "k").unwrap();
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn persona_becomes_system_message() {
        let messages = vec![
            PromptMessage::new(PromptRole::User, "Hello"),
            PromptMessage::new(PromptRole::Assistant, "Hi"),
        ];
        let api = OpenAiCompatProvider::to_api_messages("You are the CEO.", &messages);
        assert_eq!(api.len(), 3);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[0].content, "You are the CEO.");
        assert_eq!(api[2].role, "assistant");
    }

    #[test]
    fn empty_persona_is_omitted() {
        let messages = vec![PromptMessage::new(PromptRole::User, "Hello")];
        let api = OpenAiCompatProvider::to_api_messages("", &messages);
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].role, "user");
    }

    #[test]
    fn response_text_extraction() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"TOOL: list_files {}"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "TOOL: list_files {}");

        let parsed: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_text(parsed),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn empty_key_fails_before_network() {
        let provider = OpenAiCompatProvider::new("x", "http://127.0.0.1:9", "").unwrap();
        let err = provider
            .complete(CompletionRequest {
                model: "m".into(),
                persona: String::new(),
                messages: vec![],
                temperature: 0.0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
