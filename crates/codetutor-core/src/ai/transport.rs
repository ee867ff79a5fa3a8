// SPDX-License-Identifier: Apache-2.0

//! Upstream transport: one HTTP call, no retry.
//!
//! [`Transport`] is the seam between adapters and the network. The real
//! implementation, [`HttpTransport`], speaks the three wire conventions in
//! the registry; tests substitute a scripted transport.
//!
//! Errors are returned as `anyhow::Error` wrapping either a
//! [`GatewayError`] or a `reqwest::Error`, so the adapter's retry policy can
//! classify them with [`crate::retry::is_retryable_anyhow`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use super::prompts::Prompt;
use super::registry::{ProviderConfig, ProviderKind, WireFormat};
use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, GeminiContent,
    GeminiGenerationConfig, GeminiPart, GeminiRequest, GeminiResponse, HuggingFaceParameters,
    HuggingFaceRequest,
};
use crate::error::GatewayError;
use crate::utils::truncate;

/// Maximum characters of an upstream error body kept in error messages.
const MAX_ERROR_BODY: usize = 300;

/// Everything a transport needs to make one call.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamRequest<'a> {
    /// Registry entry of the target provider.
    pub provider: &'static ProviderConfig,
    /// Model to use.
    pub model: &'a str,
    /// API key.
    pub api_key: &'a SecretString,
    /// Maximum output tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Rendered prompt.
    pub prompt: &'a Prompt,
}

/// Sends one request upstream and returns the generated text.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a single call.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the upstream answers with a
    /// non-success status, or the body carries no text.
    async fn send(&self, request: UpstreamRequest<'_>) -> Result<String>;
}

/// Real HTTP transport over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Creates a transport whose client times out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("codetutor/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    fn build(&self, request: &UpstreamRequest<'_>) -> RequestBuilder {
        let provider = request.provider;
        let key = request.api_key.expose_secret();

        match provider.wire_format {
            WireFormat::OpenAiChat => {
                let mut builder = self
                    .http
                    .post(provider.api_url)
                    .bearer_auth(key)
                    .json(&chat_body(request));
                if provider.kind == ProviderKind::OpenRouter {
                    builder = builder
                        .header("HTTP-Referer", "https://github.com/codetutor/codetutor")
                        .header("X-Title", "codetutor");
                }
                builder
            }
            WireFormat::GeminiGenerate => self
                .http
                .post(format!("{}/{}:generateContent", provider.api_url, request.model))
                .header("x-goog-api-key", key)
                .json(&gemini_body(request)),
            WireFormat::HuggingFaceInference => self
                .http
                .post(format!("{}/{}", provider.api_url, request.model))
                .bearer_auth(key)
                .json(&huggingface_body(request)),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: UpstreamRequest<'_>) -> Result<String> {
        let name = request.provider.name;
        debug!(provider = name, model = request.model, "Sending upstream request");

        let response = self
            .build(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {name} API"))?;

        let response = check_status(request.provider, response).await?;
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read {name} API response"))?;

        debug!(provider = name, bytes = body.len(), "Received upstream response");
        parse_body(request.provider, &body)
    }
}

/// Maps a non-success HTTP status to a [`GatewayError`].
async fn check_status(provider: &ProviderConfig, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let name = provider.name.to_string();
    match status.as_u16() {
        401 | 403 => Err(GatewayError::InvalidCredential {
            provider: name,
            env_var: provider.api_key_env.to_string(),
        }
        .into()),
        429 => {
            warn!(provider = provider.name, "Rate limited by upstream API");
            // Retry-After in seconds, 0 if absent
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(0);
            debug!(retry_after, "Parsed Retry-After header");
            Err(GatewayError::RateLimited {
                provider: name,
                retry_after,
            }
            .into())
        }
        code => {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::Upstream {
                provider: name,
                status: code,
                message: error_message(&body),
            }
            .into())
        }
    }
}

/// Extracts a readable message from an error body, falling back to the raw
/// text.
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        let error = v.get("error")?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_string)
    });
    truncate(from_json.as_deref().unwrap_or(body).trim(), MAX_ERROR_BODY)
}

/// Chat-completions body.
#[must_use]
pub fn chat_body(request: &UpstreamRequest<'_>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: request.model.to_string(),
        messages: vec![
            ChatMessage::system(request.prompt.system.clone()),
            ChatMessage::user(request.prompt.user.clone()),
        ],
        max_tokens: Some(request.max_tokens),
        temperature: Some(request.temperature),
    }
}

/// Gemini `generateContent` body.
#[must_use]
pub fn gemini_body(request: &UpstreamRequest<'_>) -> GeminiRequest {
    GeminiRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: request.prompt.system.clone(),
            }],
        },
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: request.prompt.user.clone(),
            }],
        }],
        generation_config: GeminiGenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
        },
    }
}

/// Hugging Face text-generation body, using the instruct template.
#[must_use]
pub fn huggingface_body(request: &UpstreamRequest<'_>) -> HuggingFaceRequest {
    HuggingFaceRequest {
        inputs: format!("<s>[INST] {} [/INST]", request.prompt.combined()),
        parameters: HuggingFaceParameters {
            max_new_tokens: request.max_tokens,
            temperature: request.temperature,
            return_full_text: false,
        },
    }
}

fn decode<T: serde::de::DeserializeOwned>(provider: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| -> anyhow::Error {
        if e.is_eof() {
            // truncated body; retryable
            GatewayError::EmptyResponse {
                provider: provider.to_string(),
            }
            .into()
        } else {
            GatewayError::Provider {
                provider: provider.to_string(),
                message: format!("invalid response: {e}"),
            }
            .into()
        }
    })
}

fn non_empty(provider: &str, text: Option<String>) -> Result<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(GatewayError::EmptyResponse {
            provider: provider.to_string(),
        }
        .into()),
    }
}

/// Extracts generated text from a successful response body.
///
/// # Errors
///
/// Returns [`GatewayError::EmptyResponse`] for empty or truncated bodies and
/// [`GatewayError::Provider`] for malformed ones.
pub fn parse_body(provider: &ProviderConfig, body: &str) -> Result<String> {
    let name = provider.name;
    match provider.wire_format {
        WireFormat::OpenAiChat => {
            let response: ChatCompletionResponse = decode(name, body)?;
            let text = response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content);
            non_empty(name, text)
        }
        WireFormat::GeminiGenerate => {
            let response: GeminiResponse = decode(name, body)?;
            let text = response.candidates.into_iter().next().map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            });
            non_empty(name, text)
        }
        WireFormat::HuggingFaceInference => {
            let value: Value = decode(name, body)?;
            if let Some(error) = value.get("error").and_then(Value::as_str) {
                return Err(GatewayError::Provider {
                    provider: name.to_string(),
                    message: truncate(error, MAX_ERROR_BODY),
                }
                .into());
            }
            let generation = match &value {
                Value::Array(items) => items.first(),
                Value::Object(_) => Some(&value),
                _ => None,
            };
            let text = generation
                .and_then(|g| g.get("generated_text"))
                .and_then(Value::as_str)
                .map(str::to_string);
            non_empty(name, text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::registry::get_provider;

    fn provider(name: &str) -> &'static ProviderConfig {
        get_provider(name).expect("provider exists")
    }

    fn gateway_error(err: &anyhow::Error) -> &GatewayError {
        err.downcast_ref::<GatewayError>()
            .expect("should be a GatewayError")
    }

    #[test]
    fn test_request_bodies() {
        let key = SecretString::from("k".to_string());
        let prompt = Prompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        };
        let request = UpstreamRequest {
            provider: provider("groq"),
            model: "m",
            api_key: &key,
            max_tokens: 64,
            temperature: 0.2,
            prompt: &prompt,
        };

        let chat = serde_json::to_value(chat_body(&request)).expect("serialize");
        assert_eq!(chat["model"], "m");
        assert_eq!(chat["messages"][0]["role"], "system");
        assert_eq!(chat["messages"][1]["content"], "usr");
        assert_eq!(chat["max_tokens"], 64);

        let gemini = serde_json::to_value(gemini_body(&request)).expect("serialize");
        assert_eq!(gemini["contents"][0]["role"], "user");
        assert_eq!(gemini["contents"][0]["parts"][0]["text"], "usr");
        assert_eq!(gemini["systemInstruction"]["parts"][0]["text"], "sys");

        let hf = serde_json::to_value(huggingface_body(&request)).expect("serialize");
        assert_eq!(hf["inputs"], "<s>[INST] sys\n\nusr [/INST]");
        assert_eq!(hf["parameters"]["return_full_text"], false);
        assert_eq!(hf["parameters"]["max_new_tokens"], 64);
    }

    #[test]
    fn test_parse_chat_body() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello  "}}]}"#;
        assert_eq!(parse_body(provider("groq"), body).expect("text"), "Hello");
    }

    #[test]
    fn test_parse_chat_null_content_is_empty() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let err = parse_body(provider("openrouter"), body).expect_err("empty");
        assert!(matches!(gateway_error(&err), GatewayError::EmptyResponse { .. }));
    }

    #[test]
    fn test_parse_gemini_body_joins_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"A"},{"text":"B"}]}}]}"#;
        assert_eq!(parse_body(provider("gemini"), body).expect("text"), "AB");
    }

    #[test]
    fn test_parse_gemini_no_candidates() {
        let err = parse_body(provider("gemini"), r#"{"candidates":[]}"#).expect_err("empty");
        assert!(matches!(gateway_error(&err), GatewayError::EmptyResponse { .. }));
    }

    #[test]
    fn test_parse_huggingface_shapes() {
        let hf = provider("huggingface");
        assert_eq!(
            parse_body(hf, r#"[{"generated_text":"answer"}]"#).expect("text"),
            "answer"
        );
        assert_eq!(
            parse_body(hf, r#"{"generated_text":"single"}"#).expect("text"),
            "single"
        );
        let err = parse_body(hf, r#"{"error":"Model is loading"}"#).expect_err("error");
        assert_eq!(err.to_string(), "huggingface: Model is loading");
    }

    #[test]
    fn test_truncated_body_is_retryable() {
        let err = parse_body(provider("groq"), r#"{"choices":[{"mess"#).expect_err("eof");
        assert!(crate::retry::is_retryable_anyhow(&err));
    }

    #[test]
    fn test_malformed_body_is_not_retryable() {
        let err = parse_body(provider("groq"), "<html>oops</html>").expect_err("bad");
        assert!(matches!(gateway_error(&err), GatewayError::Provider { .. }));
        assert!(!crate::retry::is_retryable_anyhow(&err));
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"error":{"message":"model overloaded","code":503}}"#),
            "model overloaded"
        );
        assert_eq!(error_message(r#"{"error":"flat"}"#), "flat");
        assert_eq!(error_message("  plain text  "), "plain text");
        assert!(error_message(&"x".repeat(1000)).chars().count() <= MAX_ERROR_BODY);
    }
}
