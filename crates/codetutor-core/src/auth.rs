// SPDX-License-Identifier: Apache-2.0

//! Credential lookup abstraction for provider API keys.
//!
//! The gateway never reads secrets directly; it asks a [`CredentialProvider`].
//! Hosts plug in their own source (environment, secret store, test fixture).

use std::collections::HashMap;

use secrecy::SecretString;
use tracing::debug;

use crate::ai::registry::ProviderKind;

/// Provides API keys for the upstream AI providers.
///
/// Implementations should return `None` if no key is available, including
/// when the configured value is empty.
pub trait CredentialProvider: Send + Sync {
    /// Retrieves the API key for `kind`.
    fn api_key(&self, kind: ProviderKind) -> Option<SecretString>;

    /// Whether a key is available for `kind`.
    fn is_configured(&self, kind: ProviderKind) -> bool {
        self.api_key(kind).is_some()
    }
}

/// Resolves keys from environment variables.
///
/// - Gemini: `GEMINI_API_KEY`
/// - Groq: `GROQ_API_KEY`
/// - `OpenRouter`: `OPENROUTER_API_KEY`
/// - Hugging Face: `HUGGINGFACE_API_KEY`, then `HF_TOKEN`
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl EnvCredentials {
    fn read(var: &str) -> Option<SecretString> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Some(SecretString::from(key)),
            _ => None,
        }
    }
}

impl CredentialProvider for EnvCredentials {
    fn api_key(&self, kind: ProviderKind) -> Option<SecretString> {
        let key = Self::read(kind.config().api_key_env).or_else(|| match kind {
            ProviderKind::HuggingFace => Self::read("HF_TOKEN"),
            _ => None,
        });
        if key.is_some() {
            debug!(provider = %kind, "Resolved API key from environment variable");
        } else {
            debug!(provider = %kind, "No API key found in environment");
        }
        key
    }
}

/// Fixed set of keys, for embedding hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    keys: HashMap<ProviderKind, SecretString>,
}

impl StaticCredentials {
    /// Creates an empty credential set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key for `kind`. Empty keys are ignored.
    #[must_use]
    pub fn with_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.trim().is_empty() {
            self.keys.insert(kind, SecretString::from(key));
        }
        self
    }

    /// Adds the same placeholder key for every provider.
    #[must_use]
    pub fn all(key: impl Into<String>) -> Self {
        let key = key.into();
        ProviderKind::ALL
            .into_iter()
            .fold(Self::new(), |creds, kind| creds.with_key(kind, key.clone()))
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_key(&self, kind: ProviderKind) -> Option<SecretString> {
        self.keys.get(&kind).cloned()
    }
}
