use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::ratelimit::{RateLimitSnapshot, RateLimitStore, retry_wait};

pub const DEFAULT_ENDPOINT: &str = "https://models.inference.ai.azure.com/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Worst-case latency per call; callers must not assume sub-second responses.
pub const REQUEST_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the host for `response_format: json_object`.
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.1,
            json_mode: false,
        }
    }
}

/// One successful gateway round trip.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub rate_limits: RateLimitSnapshot,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Client for a hosted chat-completion API.
///
/// Clones share the underlying connection pool and the injected
/// [`RateLimitStore`], so every caller sees the same quota telemetry.
#[derive(Clone)]
pub struct LlmClient {
    endpoint: String,
    api_key: String,
    http: reqwest::Client,
    limits: RateLimitStore,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl LlmClient {
    pub fn new(config: LlmConfig, limits: RateLimitStore) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: config.endpoint,
            api_key: config.api_key,
            http,
            limits,
        }
    }

    pub fn rate_limits(&self) -> RateLimitSnapshot {
        self.limits.snapshot()
    }

    /// Send one chat completion request.
    ///
    /// Rate-limit headers are folded into the store on every response,
    /// success or failure. No retries: a 429 or transport failure surfaces
    /// once and the caller decides what to do with it.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, LlmError> {
        let mut payload = json!({
            "messages": messages,
            "model": options.model,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });
        if options.json_mode {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        debug!(model = %options.model, json_mode = options.json_mode, "sending completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(LlmError::Transport)?;

        self.limits.apply_headers(response.headers());

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let (wait, wait_secs) = retry_wait(response.headers());
            warn!(%wait, "model host rate limited the request");
            return Err(LlmError::RateLimited { wait, wait_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "model host returned an error");
            return Err(LlmError::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse =
            response.json().await.map_err(LlmError::Transport)?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Gateway {
                status: status.as_u16(),
                body: "completion contained no choices".to_string(),
            })?;

        Ok(Completion {
            text,
            rate_limits: self.limits.snapshot(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_host_defaults() {
        let options = CompletionOptions::default();
        assert_eq!(options.model, "gpt-4o-mini");
        assert_eq!(options.max_tokens, 1000);
        assert!(!options.json_mode);
    }

    #[test]
    fn message_constructors_tag_roles() {
        assert_eq!(ChatMessage::system("a").role, "system");
        assert_eq!(ChatMessage::user("b").role, "user");
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_transport_error() {
        // Nothing listens on this port; the connection is refused immediately.
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: "test-key".to_string(),
            timeout_secs: 1,
        };
        let client = LlmClient::new(config, RateLimitStore::new());
        let err = client
            .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Transport(_)));
    }
}
