// SPDX-License-Identifier: Apache-2.0

//! Error types for the codetutor gateway.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! Every provider-scoped variant renders with the provider name first, so the
//! aggregated `{provider, error}` list stays readable on its own.

use thiserror::Error;

/// Errors that can occur while talking to AI providers.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The provider's API key is not configured.
    #[error("{provider}: API key not configured (set {env_var})")]
    MissingCredential {
        /// Name of the provider (e.g., `gemini`).
        provider: String,
        /// Environment variable that holds the key.
        env_var: String,
    },

    /// The provider failed recently and is inside its health TTL.
    #[error("{provider}: provider marked unhealthy, skipping until health check expires")]
    Unhealthy {
        /// Name of the provider.
        provider: String,
    },

    /// The local request budget for a quota-limited provider is spent.
    #[error("{provider}: local request quota exhausted, try again shortly")]
    QuotaExceeded {
        /// Name of the provider.
        provider: String,
    },

    /// The upstream API answered with HTTP 429.
    #[error("{provider}: rate limit exceeded upstream, retry after {retry_after}s")]
    RateLimited {
        /// Name of the provider.
        provider: String,
        /// Number of seconds to wait before retrying (0 if unknown).
        retry_after: u64,
    },

    /// The upstream API rejected the API key.
    #[error("{provider}: invalid API key, check {env_var}")]
    InvalidCredential {
        /// Name of the provider.
        provider: String,
        /// Environment variable that holds the key.
        env_var: String,
    },

    /// Any other non-success HTTP status.
    #[error("{provider}: API error (HTTP {status}): {message}")]
    Upstream {
        /// Name of the provider.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The upstream answered successfully but returned no text.
    #[error("{provider}: empty response from model")]
    EmptyResponse {
        /// Name of the provider.
        provider: String,
    },

    /// The call did not settle within the orchestrator's time box.
    #[error("{provider}: timed out after {timeout_ms}ms")]
    Timeout {
        /// Name of the provider.
        provider: String,
        /// Time box that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Catch-all for provider failures that carry only a message.
    #[error("{provider}: {message}")]
    Provider {
        /// Name of the provider.
        provider: String,
        /// Error message from the provider.
        message: String,
    },

    /// Configuration file or environment error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Network/HTTP error from reqwest.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl GatewayError {
    /// Returns the provider this error belongs to, if any.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::MissingCredential { provider, .. }
            | Self::Unhealthy { provider }
            | Self::QuotaExceeded { provider }
            | Self::RateLimited { provider, .. }
            | Self::InvalidCredential { provider, .. }
            | Self::Upstream { provider, .. }
            | Self::EmptyResponse { provider }
            | Self::Timeout { provider, .. }
            | Self::Provider { provider, .. } => Some(provider),
            Self::Config { .. } | Self::Network(_) => None,
        }
    }

    /// Whether this error was raised by a local pre-check, before any network
    /// call was made.
    #[must_use]
    pub fn is_precheck(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. } | Self::Unhealthy { .. } | Self::QuotaExceeded { .. }
        )
    }
}

impl From<config::ConfigError> for GatewayError {
    fn from(err: config::ConfigError) -> Self {
        GatewayError::Config {
            message: err.to_string(),
        }
    }
}
