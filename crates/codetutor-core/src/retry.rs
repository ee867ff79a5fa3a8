// SPDX-License-Identifier: Apache-2.0

//! Retry logic with exponential backoff for transient provider failures.
//!
//! Provides helpers to detect retryable errors and configure exponential backoff
//! with jitter for adapter HTTP calls.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::RetryConfig;
use crate::error::GatewayError;

/// Determines if an HTTP status code is retryable.
///
/// Retryable status codes are:
/// - 429 (Too Many Requests / Rate Limited)
/// - 500 (Internal Server Error)
/// - 502 (Bad Gateway)
/// - 503 (Service Unavailable)
/// - 504 (Gateway Timeout)
#[must_use]
pub fn is_retryable_http(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Determines if a gateway error is transient.
#[must_use]
pub fn is_retryable_gateway(e: &GatewayError) -> bool {
    match e {
        GatewayError::RateLimited { .. } | GatewayError::EmptyResponse { .. } => true,
        GatewayError::Upstream { status, .. } => is_retryable_http(*status),
        GatewayError::Network(req_err) => is_retryable_reqwest(req_err),
        _ => false,
    }
}

fn is_retryable_reqwest(e: &reqwest::Error) -> bool {
    if e.is_timeout() || e.is_connect() {
        return true;
    }
    e.status().is_some_and(|s| is_retryable_http(s.as_u16()))
}

/// Determines if an anyhow error is retryable.
///
/// Checks the error chain for a reqwest network error or a transient
/// `GatewayError` variant.
#[must_use]
pub fn is_retryable_anyhow(e: &anyhow::Error) -> bool {
    if let Some(req_err) = e.downcast_ref::<reqwest::Error>() {
        return is_retryable_reqwest(req_err);
    }

    if let Some(gw_err) = e.downcast_ref::<GatewayError>() {
        return is_retryable_gateway(gw_err);
    }

    false
}

/// Creates a configured exponential backoff builder for adapter retries.
///
/// Delay for attempt `n` is `base_delay * 2^n` with jitter; the number of
/// retries is capped so a failing upstream is not hammered.
#[must_use]
pub fn retry_backoff(config: &RetryConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_factor(2.0)
        .with_min_delay(Duration::from_millis(config.base_delay_ms))
        .with_max_times(config.max_retries)
        .with_jitter()
}
