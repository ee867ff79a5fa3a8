// SPDX-License-Identifier: Apache-2.0

//! AI request/response types.
//!
//! The first half holds the gateway's own value types (requests, results,
//! provider status). The second half holds the wire shapes of the three
//! upstream conventions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::registry::ProviderKind;
use crate::analysis::CodeIssue;
use crate::config::TaskType;
use crate::error::GatewayError;

/// Tone requested for an explanation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationMode {
    /// Balanced explanation.
    #[default]
    Default,
    /// Assume no prior knowledge; lean on analogies.
    Beginner,
    /// Go deeper into how and why.
    Detailed,
    /// Keep it short.
    Concise,
}

impl ExplanationMode {
    /// Parses a mode leniently. Unknown values map to [`ExplanationMode::Default`].
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// Lowercase mode name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Beginner => "beginner",
            Self::Detailed => "detailed",
            Self::Concise => "concise",
        }
    }
}

impl FromStr for ExplanationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" => Ok(Self::Default),
            "beginner" => Ok(Self::Beginner),
            "detailed" => Ok(Self::Detailed),
            "concise" => Ok(Self::Concise),
            other => Err(format!("Unknown explanation mode: {other}")),
        }
    }
}

impl fmt::Display for ExplanationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which provider(s) a request may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderChoice {
    /// Race every eligible provider.
    #[default]
    Auto,
    /// Try this provider first, then fall through to the race.
    Named(ProviderKind),
}

impl ProviderChoice {
    /// Parses `"auto"` or a provider name. Unknown names degrade to
    /// [`ProviderChoice::Auto`] with a warning.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return Self::Auto;
        }
        match trimmed.parse::<ProviderKind>() {
            Ok(kind) => Self::Named(kind),
            Err(e) => {
                warn!(requested = trimmed, error = %e, "Unknown provider, using auto");
                Self::Auto
            }
        }
    }
}

impl From<Option<ProviderKind>> for ProviderChoice {
    fn from(kind: Option<ProviderKind>) -> Self {
        kind.map_or(Self::Auto, Self::Named)
    }
}

impl fmt::Display for ProviderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Named(kind) => write!(f, "{kind}"),
        }
    }
}

/// One task for one adapter.
#[derive(Debug, Clone, bon::Builder)]
pub struct CompletionRequest {
    /// What to do.
    pub task: TaskType,
    /// Code (explain, feedback) or question (answer).
    #[builder(into)]
    pub input: String,
    /// Programming language tag.
    #[builder(into, default = "python".to_string())]
    pub language: String,
    /// Requested tone.
    #[builder(default)]
    pub mode: ExplanationMode,
    /// Program output, for feedback.
    #[builder(into)]
    pub output: Option<String>,
    /// Error message, for feedback.
    #[builder(into)]
    pub error: Option<String>,
    /// Analyzer findings, for feedback.
    #[builder(default)]
    pub issues: Vec<CodeIssue>,
}

/// A provider that failed during a request, with its rendered error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    /// Provider name.
    pub provider: String,
    /// Error message, prefixed with the provider name.
    pub error: String,
}

impl ProviderFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(provider: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            error: error.into(),
        }
    }

    /// Records a gateway error against `provider`.
    #[must_use]
    pub fn from_error(provider: &str, error: &GatewayError) -> Self {
        Self::new(provider, error.to_string())
    }
}

/// The gateway's answer to a request.
///
/// `provider` is `"fallback"` when the text came from the offline builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    /// Markdown explanation.
    pub explanation: String,
    /// Provider that produced the text.
    pub provider: String,
    /// Programming concepts detected in the input.
    pub concepts: Vec<String>,
    /// Short example per concept.
    pub examples: Vec<String>,
    /// Set when broken code was routed to feedback.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error_analysis: bool,
    /// Why the result is degraded, when it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Every provider failure seen while serving the request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ProviderFailure>,
    /// Latency of the winning adapter call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Provider name used for offline results.
pub const FALLBACK_PROVIDER: &str = "fallback";

impl CompletionResult {
    /// Whether this result came from the offline builder.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.provider == FALLBACK_PROVIDER
    }
}

/// Availability of one provider, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    /// Provider name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Whether a credential is present and the provider is enabled.
    pub configured: bool,
    /// Current health.
    pub healthy: bool,
    /// Whether the local quota applies.
    pub quota_limited: bool,
}

// --- OpenAI-compatible chat completions (Groq, OpenRouter) ---

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Message content. Some providers send `null` for empty completions.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

/// Request body for chat completions.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens in response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Temperature for response randomness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Response from chat completions.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// List of choices (usually just one).
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// A single choice in the chat completion response.
#[derive(Debug, Deserialize)]
pub struct Choice {
    /// The generated message.
    pub message: ChatMessage,
}

// --- Gemini generateContent ---

/// A text part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiPart {
    /// Text content.
    #[serde(default)]
    pub text: String,
}

/// A turn of content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Author role; omitted for system instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Text parts.
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Sampling settings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    /// Maximum output tokens.
    pub max_output_tokens: u32,
    /// Temperature.
    pub temperature: f32,
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// System instruction.
    pub system_instruction: GeminiContent,
    /// Conversation turns.
    pub contents: Vec<GeminiContent>,
    /// Sampling settings.
    pub generation_config: GeminiGenerationConfig,
}

/// A response candidate.
#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    /// Generated content.
    #[serde(default)]
    pub content: GeminiContent,
}

/// Response from `generateContent`.
#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    /// Candidates (usually one).
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

// --- Hugging Face text generation ---

/// Generation parameters.
#[derive(Debug, Serialize)]
pub struct HuggingFaceParameters {
    /// Maximum new tokens.
    pub max_new_tokens: u32,
    /// Temperature.
    pub temperature: f32,
    /// Whether to echo the prompt.
    pub return_full_text: bool,
}

/// Request body for a text-generation model.
#[derive(Debug, Serialize)]
pub struct HuggingFaceRequest {
    /// Full prompt text.
    pub inputs: String,
    /// Generation parameters.
    pub parameters: HuggingFaceParameters,
}

/// One generated sequence.
#[derive(Debug, Deserialize)]
pub struct HuggingFaceGeneration {
    /// Generated text.
    #[serde(default)]
    pub generated_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_lenient() {
        assert_eq!(ExplanationMode::parse_lenient("Beginner"), ExplanationMode::Beginner);
        assert_eq!(ExplanationMode::parse_lenient(""), ExplanationMode::Default);
        assert_eq!(ExplanationMode::parse_lenient("eli5"), ExplanationMode::Default);
        assert!("eli5".parse::<ExplanationMode>().is_err());
    }

    #[test]
    fn test_provider_choice_parse_lenient() {
        assert_eq!(ProviderChoice::parse_lenient("auto"), ProviderChoice::Auto);
        assert_eq!(ProviderChoice::parse_lenient("AUTO"), ProviderChoice::Auto);
        assert_eq!(
            ProviderChoice::parse_lenient("Groq"),
            ProviderChoice::Named(ProviderKind::Groq)
        );
        assert_eq!(ProviderChoice::parse_lenient("nope"), ProviderChoice::Auto);
        assert_eq!(ProviderChoice::Named(ProviderKind::Gemini).to_string(), "gemini");
    }

    #[test]
    fn test_completion_result_serializes_camel_case() {
        let result = CompletionResult {
            explanation: "text".to_string(),
            provider: "groq".to_string(),
            concepts: vec!["loops".to_string()],
            examples: vec![],
            is_error_analysis: true,
            warning: None,
            errors: vec![],
            duration_ms: Some(42),
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["isErrorAnalysis"], true);
        assert_eq!(json["durationMs"], 42);
        assert!(json.get("warning").is_none());
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_completion_result_omits_false_error_analysis() {
        let result = CompletionResult {
            explanation: String::new(),
            provider: FALLBACK_PROVIDER.to_string(),
            concepts: vec![],
            examples: vec![],
            is_error_analysis: false,
            warning: Some("offline".to_string()),
            errors: vec![ProviderFailure::new("groq", "groq: boom")],
            duration_ms: None,
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert!(json.get("isErrorAnalysis").is_none());
        assert_eq!(json["errors"][0]["provider"], "groq");
        assert!(result.is_fallback());
    }

    #[test]
    fn test_request_builder_defaults() {
        let request = CompletionRequest::builder()
            .task(TaskType::Answer)
            .input("What is a loop?")
            .build();
        assert_eq!(request.language, "python");
        assert_eq!(request.mode, ExplanationMode::Default);
        assert!(request.output.is_none());
        assert!(request.issues.is_empty());
    }

    #[test]
    fn test_gemini_request_shape() {
        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: "sys".to_string(),
                }],
            },
            contents: vec![],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: 10,
                temperature: 0.5,
            },
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 10);
    }
}
