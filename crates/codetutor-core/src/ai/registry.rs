// SPDX-License-Identifier: Apache-2.0

//! Static registry of the upstream providers the gateway can race.
//!
//! Each provider is a variant of the closed [`ProviderKind`] enum; the table
//! below carries its metadata (endpoint, credential variable, default model,
//! wire format, probing priority and whether it sits behind a local quota).
//!
//! # Examples
//!
//! ```
//! use codetutor_core::ai::registry::{ProviderKind, all_providers, get_provider};
//!
//! let provider = get_provider("gemini").unwrap();
//! assert_eq!(provider.kind, ProviderKind::Gemini);
//! assert!(provider.quota_limited);
//! assert_eq!(all_providers().len(), 4);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The upstream providers known to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini via the native `generateContent` endpoint.
    Gemini,
    /// Groq via its OpenAI-compatible endpoint.
    Groq,
    /// `OpenRouter` via its OpenAI-compatible endpoint.
    OpenRouter,
    /// Hugging Face Inference API text generation.
    HuggingFace,
}

impl ProviderKind {
    /// Every provider, in declaration order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Gemini,
        ProviderKind::Groq,
        ProviderKind::OpenRouter,
        ProviderKind::HuggingFace,
    ];

    /// Registry entry for this provider.
    #[must_use]
    pub fn config(self) -> &'static ProviderConfig {
        match self {
            Self::Gemini => &PROVIDERS[0],
            Self::Groq => &PROVIDERS[1],
            Self::OpenRouter => &PROVIDERS[2],
            Self::HuggingFace => &PROVIDERS[3],
        }
    }

    /// Lowercase identifier used in configs, logs and results.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.config().name
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "hf" | "hugging-face" | "hugging_face" => Ok(Self::HuggingFace),
            "google" => Ok(Self::Gemini),
            other => get_provider(other)
                .map(|p| p.kind)
                .ok_or_else(|| format!("Unknown AI provider: {s}")),
        }
    }
}

/// Request/response convention spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `POST /chat/completions` with `messages`.
    OpenAiChat,
    /// `POST /models/{model}:generateContent` with `contents`.
    GeminiGenerate,
    /// `POST /models/{model}` with `inputs` and `parameters`.
    HuggingFaceInference,
}

/// Configuration for an AI provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Variant this entry describes.
    pub kind: ProviderKind,

    /// Provider identifier (lowercase, used in config files)
    pub name: &'static str,

    /// Human-readable provider name for UI display
    pub display_name: &'static str,

    /// API base URL for this provider
    pub api_url: &'static str,

    /// Environment variable name for API key
    pub api_key_env: &'static str,

    /// Model used when the config does not override it
    pub default_model: &'static str,

    /// Wire format of the upstream API
    pub wire_format: WireFormat,

    /// Probing order when building the candidate list (lower first)
    pub priority: u8,

    /// Whether the local request quota applies to this provider
    pub quota_limited: bool,
}

/// Static registry of all supported AI providers, indexed by `ProviderKind`.
pub static PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        kind: ProviderKind::Gemini,
        name: "gemini",
        display_name: "Google Gemini",
        api_url: "https://generativelanguage.googleapis.com/v1beta/models",
        api_key_env: "GEMINI_API_KEY",
        default_model: "gemini-2.0-flash",
        wire_format: WireFormat::GeminiGenerate,
        priority: 1,
        quota_limited: true,
    },
    ProviderConfig {
        kind: ProviderKind::Groq,
        name: "groq",
        display_name: "Groq",
        api_url: "https://api.groq.com/openai/v1/chat/completions",
        api_key_env: "GROQ_API_KEY",
        default_model: "llama-3.3-70b-versatile",
        wire_format: WireFormat::OpenAiChat,
        priority: 0,
        quota_limited: false,
    },
    ProviderConfig {
        kind: ProviderKind::OpenRouter,
        name: "openrouter",
        display_name: "OpenRouter",
        api_url: "https://openrouter.ai/api/v1/chat/completions",
        api_key_env: "OPENROUTER_API_KEY",
        default_model: "mistralai/devstral-2512:free",
        wire_format: WireFormat::OpenAiChat,
        priority: 3,
        quota_limited: false,
    },
    ProviderConfig {
        kind: ProviderKind::HuggingFace,
        name: "huggingface",
        display_name: "Hugging Face",
        api_url: "https://api-inference.huggingface.co/models",
        api_key_env: "HUGGINGFACE_API_KEY",
        default_model: "mistralai/Mistral-7B-Instruct-v0.3",
        wire_format: WireFormat::HuggingFaceInference,
        priority: 2,
        quota_limited: false,
    },
];

/// Retrieves a provider configuration by name (case-sensitive, lowercase).
#[must_use]
pub fn get_provider(name: &str) -> Option<&'static ProviderConfig> {
    PROVIDERS.iter().find(|p| p.name == name)
}

/// Returns all available providers.
#[must_use]
pub fn all_providers() -> &'static [ProviderConfig] {
    PROVIDERS
}

/// Returns every provider sorted by probing priority.
#[must_use]
pub fn providers_by_priority() -> Vec<&'static ProviderConfig> {
    let mut providers: Vec<_> = PROVIDERS.iter().collect();
    providers.sort_by_key(|p| p.priority);
    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_config_roundtrip() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.config().kind, kind);
        }
    }

    #[test]
    fn test_get_provider_unknown() {
        assert!(get_provider("anthropic").is_none());
        assert!(get_provider("Gemini").is_none());
    }

    #[test]
    fn test_from_str_is_case_insensitive_with_aliases() {
        assert_eq!("Gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!("hf".parse::<ProviderKind>(), Ok(ProviderKind::HuggingFace));
        assert_eq!(
            " OpenRouter ".parse::<ProviderKind>(),
            Ok(ProviderKind::OpenRouter)
        );
        assert!("mystery".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_only_gemini_is_quota_limited() {
        let limited: Vec<_> = PROVIDERS
            .iter()
            .filter(|p| p.quota_limited)
            .map(|p| p.name)
            .collect();
        assert_eq!(limited, vec!["gemini"]);
    }

    #[test]
    fn test_priority_order() {
        let names: Vec<_> = providers_by_priority().iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["groq", "gemini", "huggingface", "openrouter"]);
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(ProviderKind::HuggingFace.to_string(), "huggingface");
    }
}
