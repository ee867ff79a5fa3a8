// SPDX-License-Identifier: Apache-2.0

//! Uniform adapter contract over every upstream provider.
//!
//! An [`Adapter`] owns one [`ProviderKind`] and turns a [`CompletionRequest`]
//! into a [`CompletionResult`]:
//!
//! 1. cheap pre-checks with no network I/O (credential, health, quota);
//! 2. prompt construction;
//! 3. the transport call, retried with exponential backoff on transient
//!    failures;
//! 4. health bookkeeping for the outcome.
//!
//! Pre-check failures leave the health record alone: a missing key or a spent
//! local budget says nothing about the upstream.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use backon::Retryable;
use secrecy::SecretString;
use tracing::{debug, instrument, warn};

use super::concepts;
use super::health::HealthRegistry;
use super::prompts::build_prompt;
use super::registry::{ProviderConfig, ProviderKind};
use super::transport::{Transport, UpstreamRequest};
use super::types::{CompletionRequest, CompletionResult};
use crate::auth::CredentialProvider;
use crate::config::{ProviderSettings, RetryConfig};
use crate::error::GatewayError;
use crate::retry::{is_retryable_anyhow, retry_backoff};

/// One provider behind the shared adapter contract.
pub struct Adapter {
    kind: ProviderKind,
    settings: ProviderSettings,
    credentials: Arc<dyn CredentialProvider>,
    transport: Arc<dyn Transport>,
    health: Arc<HealthRegistry>,
    retry: RetryConfig,
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("kind", &self.kind)
            .field("model", &self.model())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Adapter {
    /// Creates an adapter.
    #[must_use]
    pub fn new(
        kind: ProviderKind,
        settings: ProviderSettings,
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn Transport>,
        health: Arc<HealthRegistry>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            kind,
            settings,
            credentials,
            transport,
            health,
            retry,
        }
    }

    /// Provider variant.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Registry entry.
    #[must_use]
    pub fn provider(&self) -> &'static ProviderConfig {
        self.kind.config()
    }

    /// Model in use: the configured override or the registry default.
    #[must_use]
    pub fn model(&self) -> &str {
        self.settings
            .model
            .as_deref()
            .unwrap_or(self.provider().default_model)
    }

    /// Whether the provider is enabled and has a credential.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.settings.enabled && self.credentials.is_configured(self.kind)
    }

    /// Whether the race should include this adapter right now.
    ///
    /// Does not consume quota; [`Adapter::call`] does that.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        let name = self.name();
        self.is_configured()
            && self.health.is_healthy(name)
            && (!self.provider().quota_limited || self.health.can_proceed(name))
    }

    /// Records a call that did not settle within the orchestrator's time box.
    pub fn record_timeout(&self) {
        self.health.mark_health(self.name(), false);
    }

    /// Runs the local pre-checks and returns the API key.
    ///
    /// For quota-limited providers the attempt is stamped here, before
    /// dispatch.
    fn precheck(&self) -> Result<SecretString, GatewayError> {
        let name = self.name();
        let provider = self.provider();

        let api_key = self
            .credentials
            .api_key(self.kind)
            .filter(|_| self.settings.enabled)
            .ok_or_else(|| GatewayError::MissingCredential {
                provider: name.to_string(),
                env_var: provider.api_key_env.to_string(),
            })?;

        if !self.health.is_healthy(name) {
            return Err(GatewayError::Unhealthy {
                provider: name.to_string(),
            });
        }

        if provider.quota_limited && !self.health.try_acquire(name) {
            return Err(GatewayError::QuotaExceeded {
                provider: name.to_string(),
            });
        }

        Ok(api_key)
    }

    /// Serves one request.
    ///
    /// # Errors
    ///
    /// Returns a pre-check error without touching the network, or the
    /// upstream failure after retries are exhausted. Every error renders with
    /// the provider name first.
    #[instrument(skip_all, fields(provider = self.name(), task = request.task.as_str()))]
    pub async fn call(&self, request: &CompletionRequest) -> Result<CompletionResult, GatewayError> {
        let api_key = self.precheck().inspect_err(|e| debug!(error = %e, "Pre-check failed"))?;

        let prompt = build_prompt(request);
        let upstream = UpstreamRequest {
            provider: self.provider(),
            model: self.model(),
            api_key: &api_key,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            prompt: &prompt,
        };
        let transport = &self.transport;

        // Start timing outside the retry loop so the total includes retries
        let start = Instant::now();

        let outcome = (|| async move { transport.send(upstream).await })
            .retry(retry_backoff(&self.retry))
            .when(is_retryable_anyhow)
            .notify(|err, dur| warn!(error = %err, delay = ?dur, "Retrying after error"))
            .await;

        match outcome {
            Ok(explanation) => {
                self.health.mark_health(self.name(), true);

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;
                debug!(duration_ms, "Provider call succeeded");

                let found = concepts::extract(&request.input, &request.language);
                Ok(CompletionResult {
                    explanation,
                    provider: self.name().to_string(),
                    concepts: found.concepts,
                    examples: found.examples,
                    is_error_analysis: false,
                    warning: None,
                    errors: Vec::new(),
                    duration_ms: Some(duration_ms),
                })
            }
            Err(err) => {
                self.health.mark_health(self.name(), false);
                let err = into_gateway_error(self.name(), err);
                warn!(error = %err, "Provider call failed");
                Err(err)
            }
        }
    }
}

/// Recovers the typed error from the transport's `anyhow` chain, or wraps
/// the rendered chain as a provider error.
fn into_gateway_error(provider: &str, err: anyhow::Error) -> GatewayError {
    match err.downcast::<GatewayError>() {
        Ok(GatewayError::Network(e)) => GatewayError::Provider {
            provider: provider.to_string(),
            message: format!("network error: {e}"),
        },
        Ok(typed) => typed,
        Err(err) => GatewayError::Provider {
            provider: provider.to_string(),
            message: format!("{err:#}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::auth::StaticCredentials;
    use crate::clock::ManualClock;
    use crate::config::{QuotaConfig, TaskType};
    use crate::ai::health::QuotaPolicy;

    /// Replays the scripted failures first, then succeeds. `Some(status)`
    /// fails with that HTTP status, `None` with an untyped error.
    struct Scripted {
        calls: AtomicUsize,
        failures: Vec<Option<u16>>,
    }

    impl Scripted {
        fn new(failures: Vec<Option<u16>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, request: UpstreamRequest<'_>) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let name = request.provider.name;
            match self.failures.get(n) {
                Some(Some(status)) => Err(GatewayError::Upstream {
                    provider: name.to_string(),
                    status: *status,
                    message: "overloaded".to_string(),
                }
                .into()),
                Some(None) => Err(anyhow::anyhow!("connection reset")
                    .context(format!("Failed to send request to {name} API"))),
                None => Ok(format!("answer from {name}")),
            }
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
        }
    }

    fn registry() -> Arc<HealthRegistry> {
        Arc::new(HealthRegistry::new(
            Duration::minutes(5),
            Arc::new(ManualClock::default()),
        ))
    }

    fn adapter(
        kind: ProviderKind,
        transport: Arc<Scripted>,
        health: Arc<HealthRegistry>,
        credentials: StaticCredentials,
    ) -> Adapter {
        Adapter::new(
            kind,
            ProviderSettings::default(),
            Arc::new(credentials),
            transport,
            health,
            fast_retry(),
        )
    }

    fn request() -> CompletionRequest {
        CompletionRequest::builder()
            .task(TaskType::Explain)
            .input("for i in range(3):\n    print(i)")
            .build()
    }

    #[tokio::test]
    async fn test_success_marks_healthy_and_fills_concepts() {
        let transport = Scripted::new(vec![]);
        let health = registry();
        let adapter = adapter(
            ProviderKind::Groq,
            transport.clone(),
            health.clone(),
            StaticCredentials::all("k"),
        );

        let result = adapter.call(&request()).await.expect("should succeed");
        assert_eq!(result.provider, "groq");
        assert_eq!(result.explanation, "answer from groq");
        assert!(result.concepts.contains(&"Loops".to_string()));
        assert!(result.duration_ms.is_some());
        assert_eq!(health.snapshot().len(), 1);
        assert!(health.snapshot()[0].is_healthy);
    }

    #[tokio::test]
    async fn test_missing_credential_skips_network_and_health() {
        let transport = Scripted::new(vec![]);
        let health = registry();
        let adapter = adapter(
            ProviderKind::Groq,
            transport.clone(),
            health.clone(),
            StaticCredentials::new(),
        );

        let err = adapter.call(&request()).await.expect_err("no key");
        assert!(matches!(err, GatewayError::MissingCredential { .. }));
        assert!(err.to_string().starts_with("groq: "));
        assert_eq!(transport.calls(), 0);
        assert!(health.snapshot().is_empty());
        assert!(!adapter.is_eligible());
    }

    #[tokio::test]
    async fn test_unhealthy_precheck() {
        let transport = Scripted::new(vec![]);
        let health = registry();
        health.mark_health("groq", false);
        let adapter = adapter(
            ProviderKind::Groq,
            transport.clone(),
            health,
            StaticCredentials::all("k"),
        );

        let err = adapter.call(&request()).await.expect_err("unhealthy");
        assert!(matches!(err, GatewayError::Unhealthy { .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_disabled_provider_counts_as_unconfigured() {
        let transport = Scripted::new(vec![]);
        let adapter = Adapter::new(
            ProviderKind::Groq,
            ProviderSettings {
                enabled: false,
                ..ProviderSettings::default()
            },
            Arc::new(StaticCredentials::all("k")),
            transport.clone(),
            registry(),
            fast_retry(),
        );
        assert!(!adapter.is_configured());
        let err = adapter.call(&request()).await.expect_err("disabled");
        assert!(matches!(err, GatewayError::MissingCredential { .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let transport = Scripted::new(vec![Some(503), Some(503)]);
        let health = registry();
        let adapter = adapter(
            ProviderKind::Groq,
            transport.clone(),
            health.clone(),
            StaticCredentials::all("k"),
        );

        let result = adapter.call(&request()).await.expect("third attempt succeeds");
        assert_eq!(result.provider, "groq");
        assert_eq!(transport.calls(), 3);
        assert!(health.is_healthy("groq"));
    }

    #[tokio::test]
    async fn test_retries_are_capped() {
        let transport = Scripted::new(vec![Some(503); 4]);
        let health = registry();
        let adapter = adapter(
            ProviderKind::Groq,
            transport.clone(),
            health.clone(),
            StaticCredentials::all("k"),
        );

        let err = adapter.call(&request()).await.expect_err("exhausted");
        assert!(matches!(err, GatewayError::Upstream { status: 503, .. }));
        assert_eq!(transport.calls(), 3);
        assert!(!health.is_healthy("groq"));
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let transport = Scripted::new(vec![Some(400)]);
        let health = registry();
        let adapter = adapter(
            ProviderKind::Groq,
            transport.clone(),
            health.clone(),
            StaticCredentials::all("k"),
        );

        let err = adapter.call(&request()).await.expect_err("bad request");
        assert_eq!(err.to_string(), "groq: API error (HTTP 400): overloaded");
        assert_eq!(transport.calls(), 1);
        assert!(!health.is_healthy("groq"));
    }

    #[tokio::test]
    async fn test_untyped_failure_keeps_context_chain() {
        let transport = Scripted::new(vec![None]);
        let adapter = adapter(
            ProviderKind::Groq,
            transport,
            registry(),
            StaticCredentials::all("k"),
        );

        let err = adapter.call(&request()).await.expect_err("failure");
        assert_eq!(
            err.to_string(),
            "groq: Failed to send request to groq API: connection reset"
        );
    }

    #[tokio::test]
    async fn test_quota_stamped_once_per_call() {
        let transport = Scripted::new(vec![Some(503)]);
        let health = Arc::new(
            HealthRegistry::new(Duration::minutes(5), Arc::new(ManualClock::default())).with_quota(
                "gemini",
                QuotaPolicy::from(QuotaConfig {
                    max_per_window: 1,
                    window_seconds: 60,
                    min_interval_ms: 0,
                }),
            ),
        );
        let adapter = adapter(
            ProviderKind::Gemini,
            transport.clone(),
            health.clone(),
            StaticCredentials::all("k"),
        );

        adapter.call(&request()).await.expect("retry succeeds");
        assert_eq!(transport.calls(), 2);
        assert_eq!(
            health.quota_state("gemini").map(|s| s.request_count_in_window),
            Some(1)
        );

        let err = adapter.call(&request()).await.expect_err("quota spent");
        assert!(matches!(err, GatewayError::QuotaExceeded { .. }));
        assert_eq!(transport.calls(), 2);
        assert!(health.is_healthy("gemini"));
    }

    #[test]
    fn test_model_override() {
        let adapter = Adapter::new(
            ProviderKind::Groq,
            ProviderSettings {
                model: Some("llama-3.1-8b-instant".to_string()),
                ..ProviderSettings::default()
            },
            Arc::new(StaticCredentials::new()),
            Scripted::new(vec![]),
            registry(),
            fast_retry(),
        );
        assert_eq!(adapter.model(), "llama-3.1-8b-instant");
        assert_eq!(adapter.name(), "groq");
    }
}
