// SPDX-License-Identifier: Apache-2.0

//! CLI-specific error formatting with user-friendly hints.
//!
//! Downcasts `anyhow::Error` to `GatewayError` and adds hints for the error
//! kinds a user can act on. Structured error data stays in the library;
//! presentation lives here.

use std::fmt::Write;

use anyhow::Error;
use codetutor_core::error::GatewayError;

/// Formats an error for CLI display with helpful hints.
///
/// If the error is not a `GatewayError`, returns the full error chain.
pub fn format_error(error: &Error) -> String {
    let Some(gateway_err) = error.downcast_ref::<GatewayError>() else {
        return format!("{error:#}");
    };

    match gateway_err {
        GatewayError::MissingCredential { env_var, .. } => {
            format!("{gateway_err}\n\nTip: Export {env_var} with your API key.")
        }
        GatewayError::InvalidCredential { env_var, .. } => {
            format!("{gateway_err}\n\nTip: Check that {env_var} holds a current API key.")
        }
        GatewayError::RateLimited {
            provider,
            retry_after,
        } => format_rate_limited_error(provider, *retry_after),
        GatewayError::QuotaExceeded { .. } | GatewayError::Unhealthy { .. } => {
            format!("{gateway_err}\n\nTip: Try again shortly or pass --provider auto.")
        }
        GatewayError::Upstream { .. }
        | GatewayError::EmptyResponse { .. }
        | GatewayError::Timeout { .. }
        | GatewayError::Provider { .. } => {
            format!(
                "{gateway_err}\n\nTip: This may be a temporary issue with the AI provider. Try again in a moment."
            )
        }
        GatewayError::Config { .. } => {
            format!(
                "{gateway_err}\n\nTip: Check your config file at {}",
                codetutor_core::config::config_file_path().display()
            )
        }
        GatewayError::Network(_) => {
            format!("{gateway_err}\n\nTip: Check your internet connection and try again.")
        }
    }
}

/// Formats a rate limit error with provider-specific hints.
fn format_rate_limited_error(provider: &str, retry_after: u64) -> String {
    let mut msg = format!("Rate limit exceeded on {provider}");
    if retry_after > 0 {
        let _ = write!(msg, ", retry after {retry_after}s");
    }

    msg.push_str("\n\nTip: You've hit the rate limit for this provider.");
    if retry_after > 0 {
        let _ = write!(msg, "\n- Wait at least {retry_after} seconds before retrying.");
    }
    if provider == "openrouter" {
        msg.push_str("\n- Free OpenRouter models have tight limits; see https://openrouter.ai/docs/limits");
    }
    msg.push_str("\n- Or pass --provider auto to let another provider answer.");

    msg
}
