// SPDX-License-Identifier: Apache-2.0

//! Provider health and local quota bookkeeping.
//!
//! Health works like a time-boxed circuit breaker: a failure opens the circuit
//! for one TTL, a success closes it, and a stale record counts as closed.
//! Providers with no record are assumed healthy.
//!
//! Quota-limited providers additionally carry a [`RateLimitState`] enforcing a
//! minimum gap between attempts and a per-window cap. Attempts are recorded
//! before dispatch so concurrent races cannot burst past the budget.
//!
//! Both maps sit behind `std::sync::Mutex`; the lock is never held across an
//! `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::registry::all_providers;
use crate::clock::{Clock, SystemClock};
use crate::config::{GatewayConfig, QuotaConfig};

/// Longest configurable span (100 years). Larger settings are clamped.
pub const MAX_SPAN_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Seconds from configuration as a `Duration`, clamped to [`MAX_SPAN_SECS`].
fn span_from_secs(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).map_or(MAX_SPAN_SECS, |s| s.min(MAX_SPAN_SECS)))
}

/// Milliseconds from configuration as a `Duration`, clamped like
/// [`span_from_secs`].
fn span_from_millis(millis: u64) -> Duration {
    let max = MAX_SPAN_SECS * 1000;
    Duration::milliseconds(i64::try_from(millis).map_or(max, |ms| ms.min(max)))
}

/// `now + span`, saturating at the latest representable instant.
fn saturating_add(now: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    now.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Last recorded outcome for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    /// Provider name.
    pub provider: String,
    /// Whether the last call succeeded.
    pub is_healthy: bool,
    /// When the outcome was recorded.
    pub last_checked_at: DateTime<Utc>,
}

/// Request budget for one quota-limited provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    /// Maximum attempts per window.
    pub max_per_window: u32,
    /// Window length.
    pub window: Duration,
    /// Minimum gap between attempts.
    pub min_interval: Duration,
}

impl From<QuotaConfig> for QuotaPolicy {
    fn from(config: QuotaConfig) -> Self {
        Self {
            max_per_window: config.max_per_window,
            window: span_from_secs(config.window_seconds),
            min_interval: span_from_millis(config.min_interval_ms),
        }
    }
}

/// Rolling quota counters for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitState {
    /// When the previous attempt was stamped.
    pub last_request_at: Option<DateTime<Utc>>,
    /// Attempts in the current window.
    pub request_count_in_window: u32,
    /// When the current window ends.
    pub window_reset_at: DateTime<Utc>,
    /// Cap per window.
    pub max_per_window: u32,
    /// Minimum gap between attempts, in milliseconds.
    pub min_interval_ms: i64,
    #[serde(skip)]
    window: Duration,
}

impl RateLimitState {
    fn new(policy: QuotaPolicy, now: DateTime<Utc>) -> Self {
        Self {
            last_request_at: None,
            request_count_in_window: 0,
            window_reset_at: saturating_add(now, policy.window),
            max_per_window: policy.max_per_window,
            min_interval_ms: policy.min_interval.num_milliseconds(),
            window: policy.window,
        }
    }

    fn roll_window(&mut self, now: DateTime<Utc>) {
        if now > self.window_reset_at {
            self.request_count_in_window = 0;
            self.window_reset_at = saturating_add(now, self.window);
        }
    }

    fn allows(&self, now: DateTime<Utc>) -> bool {
        let interval_ok = self.last_request_at.is_none_or(|last| {
            now.signed_duration_since(last) >= Duration::milliseconds(self.min_interval_ms)
        });
        interval_ok && self.request_count_in_window < self.max_per_window
    }

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.last_request_at = Some(now);
        self.request_count_in_window = self.request_count_in_window.saturating_add(1);
    }
}

/// Process-wide provider health and quota registry.
///
/// Constructed once and shared by `Arc` with the gateway and its adapters.
#[derive(Debug)]
pub struct HealthRegistry {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    health: Mutex<HashMap<String, ProviderHealth>>,
    quotas: Mutex<HashMap<String, RateLimitState>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HealthRegistry {
    /// Creates an empty registry with the given TTL and clock.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            ttl,
            health: Mutex::new(HashMap::new()),
            quotas: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a registry backed by the system clock.
    #[must_use]
    pub fn with_system_clock(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    /// Creates a registry from gateway settings, registering the configured
    /// quota for every quota-limited provider in the provider registry.
    #[must_use]
    pub fn from_config(config: &GatewayConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl = span_from_secs(config.health_ttl_seconds);
        all_providers()
            .iter()
            .filter(|p| p.quota_limited)
            .fold(Self::new(ttl, clock), |registry, p| {
                registry.with_quota(p.name, QuotaPolicy::from(config.quota))
            })
    }

    /// Registers a quota policy for `provider`, replacing any existing state.
    #[must_use]
    pub fn with_quota(self, provider: &str, policy: QuotaPolicy) -> Self {
        let now = self.clock.now();
        lock(&self.quotas).insert(provider.to_string(), RateLimitState::new(policy, now));
        self
    }

    /// Health TTL in effect.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// True if no record exists, the record is older than the TTL, or the
    /// record says healthy.
    #[must_use]
    pub fn is_healthy(&self, provider: &str) -> bool {
        let now = self.clock.now();
        lock(&self.health).get(provider).is_none_or(|record| {
            record.is_healthy || now.signed_duration_since(record.last_checked_at) >= self.ttl
        })
    }

    /// Records the outcome of a call, stamped with the current time.
    pub fn mark_health(&self, provider: &str, is_healthy: bool) {
        let now = self.clock.now();
        let previous = lock(&self.health).insert(
            provider.to_string(),
            ProviderHealth {
                provider: provider.to_string(),
                is_healthy,
                last_checked_at: now,
            },
        );
        let was_healthy = previous.is_none_or(|p| p.is_healthy);
        if was_healthy != is_healthy {
            info!(provider, is_healthy, "Provider health changed");
        } else {
            debug!(provider, is_healthy, "Provider health recorded");
        }
    }

    /// Clears the health record for one provider.
    pub fn reset(&self, provider: &str) {
        if lock(&self.health).remove(provider).is_some() {
            info!(provider, "Provider health reset");
        }
    }

    /// Clears every health record. Quota counters are left alone so a reset
    /// cannot be used to burst past an upstream quota.
    pub fn reset_all(&self) {
        lock(&self.health).clear();
        info!("All provider health records reset");
    }

    /// Whether a quota-limited provider may be called now. Providers without
    /// a quota policy always may. Rolls an elapsed window forward.
    #[must_use]
    pub fn can_proceed(&self, provider: &str) -> bool {
        let now = self.clock.now();
        let mut quotas = lock(&self.quotas);
        match quotas.get_mut(provider) {
            Some(state) => {
                state.roll_window(now);
                state.allows(now)
            }
            None => true,
        }
    }

    /// Stamps an attempt against the provider's quota. Call before dispatch.
    pub fn record_attempt(&self, provider: &str) {
        let now = self.clock.now();
        if let Some(state) = lock(&self.quotas).get_mut(provider) {
            state.roll_window(now);
            state.stamp(now);
        }
    }

    /// Checks and stamps the quota under a single lock acquisition.
    ///
    /// Returns `false` without stamping when the budget is spent.
    #[must_use]
    pub fn try_acquire(&self, provider: &str) -> bool {
        let now = self.clock.now();
        let mut quotas = lock(&self.quotas);
        let Some(state) = quotas.get_mut(provider) else {
            return true;
        };
        state.roll_window(now);
        if state.allows(now) {
            state.stamp(now);
            true
        } else {
            debug!(
                provider,
                count = state.request_count_in_window,
                max = state.max_per_window,
                "Quota check rejected attempt"
            );
            false
        }
    }

    /// Current quota counters for `provider`, if it is quota-limited.
    #[must_use]
    pub fn quota_state(&self, provider: &str) -> Option<RateLimitState> {
        lock(&self.quotas).get(provider).cloned()
    }

    /// Every stored health record, sorted by provider name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ProviderHealth> {
        let mut records: Vec<_> = lock(&self.health).values().cloned().collect();
        records.sort_by(|a, b| a.provider.cmp(&b.provider));
        records
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default(), Arc::new(SystemClock))
    }
}
