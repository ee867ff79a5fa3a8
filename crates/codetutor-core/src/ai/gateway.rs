// SPDX-License-Identifier: Apache-2.0

//! Completion orchestrator.
//!
//! [`CompletionGateway`] is the single entry point callers use. For each
//! request it picks the eligible adapters, races them concurrently under a
//! per-task time box, returns the first success, and degrades to the offline
//! feedback builder when every provider fails or none is eligible. It never
//! returns an error.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{Instrument, Span, debug, info, instrument, warn};
use uuid::Uuid;

use super::adapter::Adapter;
use super::concepts;
use super::health::HealthRegistry;
use super::registry::{ProviderKind, providers_by_priority};
use super::transport::{HttpTransport, Transport};
use super::types::{
    CompletionRequest, CompletionResult, ExplanationMode, FALLBACK_PROVIDER, ProviderChoice,
    ProviderFailure, ProviderStatus,
};
use crate::analysis::{Analyzer, AnalyzerConfig, build_answer_fallback, build_fallback_with};
use crate::auth::CredentialProvider;
use crate::clock::SystemClock;
use crate::config::{AppConfig, TaskType};
use crate::error::GatewayError;
use crate::utils::clip_to_bytes;

const NO_PROVIDERS_WARNING: &str =
    "No AI provider is available right now. Showing offline feedback instead.";
const ALL_FAILED_WARNING: &str = "Every AI provider failed. Showing offline feedback instead.";

/// Multi-provider completion gateway.
pub struct CompletionGateway {
    config: AppConfig,
    adapters: Vec<Arc<Adapter>>,
    health: Arc<HealthRegistry>,
    credentials: Arc<dyn CredentialProvider>,
    analyzer: Analyzer,
}

#[bon::bon]
impl CompletionGateway {
    /// Assembles a gateway from its collaborators.
    ///
    /// `health` defaults to a registry built from `config` on the system
    /// clock.
    #[builder]
    pub fn new(
        #[builder(default)] config: AppConfig,
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn Transport>,
        health: Option<Arc<HealthRegistry>>,
    ) -> Self {
        let health = health
            .unwrap_or_else(|| Arc::new(HealthRegistry::from_config(&config.gateway, Arc::new(SystemClock))));

        let adapters = providers_by_priority()
            .into_iter()
            .map(|provider| {
                Arc::new(Adapter::new(
                    provider.kind,
                    config.providers.get(provider.kind).clone(),
                    Arc::clone(&credentials),
                    Arc::clone(&transport),
                    Arc::clone(&health),
                    config.gateway.retry.clone(),
                ))
            })
            .collect();

        let analyzer = Analyzer::with_config(AnalyzerConfig {
            usage_scan: config.analyzer.usage_scan,
            max_source_bytes: config.gateway.max_source_bytes,
        });

        Self {
            config,
            adapters,
            health,
            credentials,
            analyzer,
        }
    }
}

impl CompletionGateway {
    /// Builds a gateway that talks to the real provider APIs.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the HTTP client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, GatewayError> {
        let transport = HttpTransport::new(Duration::from_secs(config.gateway.http_timeout_seconds))
            .map_err(|e| GatewayError::Config {
                message: format!("{e:#}"),
            })?;

        Ok(Self::builder()
            .config(config.clone())
            .credentials(credentials)
            .transport(Arc::new(transport))
            .build())
    }

    /// Shared health and quota registry.
    #[must_use]
    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Explains `code`.
    ///
    /// Code the static analyzer flags is routed to feedback instead, and the
    /// result is marked as an error analysis.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4(), task = "explain", %provider))]
    pub async fn explain_code(
        &self,
        code: &str,
        language: &str,
        provider: ProviderChoice,
        mode: ExplanationMode,
    ) -> CompletionResult {
        let code = self.clip(code);
        let report = self.analyzer.analyze(code, language);

        if !report.is_clean() {
            info!(
                issues = report.issues.len(),
                "Analyzer flagged the code, routing to feedback"
            );
            let request = CompletionRequest::builder()
                .task(TaskType::Feedback)
                .input(code)
                .language(language)
                .mode(mode)
                .issues(report.issues)
                .build();
            let mut result = self
                .complete(request, provider, |errors| {
                    build_fallback_with(&self.analyzer, code, language, None, errors)
                })
                .await;
            result.is_error_analysis = true;
            return result;
        }

        let request = CompletionRequest::builder()
            .task(TaskType::Explain)
            .input(code)
            .language(language)
            .mode(mode)
            .build();
        self.complete(request, provider, |errors| {
            build_fallback_with(&self.analyzer, code, language, None, errors)
        })
        .await
    }

    /// Answers a free-form programming question.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4(), task = "answer", %provider))]
    pub async fn answer_question(
        &self,
        question: &str,
        language: &str,
        provider: ProviderChoice,
        mode: ExplanationMode,
    ) -> CompletionResult {
        let question = self.clip(question);
        let request = CompletionRequest::builder()
            .task(TaskType::Answer)
            .input(question)
            .language(language)
            .mode(mode)
            .build();
        self.complete(request, provider, |errors| {
            build_answer_fallback(question, errors)
        })
        .await
    }

    /// Diagnoses a failed run of Python `code` and returns the feedback text.
    pub async fn generate_feedback(
        &self,
        code: &str,
        output: Option<&str>,
        error: Option<&str>,
        provider: ProviderChoice,
    ) -> String {
        self.feedback_completion(code, "python", output, error, provider, ExplanationMode::Default)
            .await
            .explanation
    }

    /// Diagnoses a failed run of `code`, returning the full result.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4(), task = "feedback", %provider))]
    pub async fn feedback_completion(
        &self,
        code: &str,
        language: &str,
        output: Option<&str>,
        error: Option<&str>,
        provider: ProviderChoice,
        mode: ExplanationMode,
    ) -> CompletionResult {
        let code = self.clip(code);
        let report = self.analyzer.analyze(code, language);
        let request = CompletionRequest::builder()
            .task(TaskType::Feedback)
            .input(code)
            .language(language)
            .mode(mode)
            .maybe_output(output)
            .maybe_error(error)
            .issues(report.issues)
            .build();
        self.complete(request, provider, |errors| {
            build_fallback_with(&self.analyzer, code, language, error, errors)
        })
        .await
    }

    /// Every known provider in priority order with its current availability.
    #[must_use]
    pub fn available_providers(&self) -> Vec<ProviderStatus> {
        self.adapters
            .iter()
            .map(|adapter| {
                let provider = adapter.provider();
                ProviderStatus {
                    name: provider.name.to_string(),
                    display_name: provider.display_name.to_string(),
                    configured: adapter.is_configured(),
                    healthy: self.health.is_healthy(provider.name),
                    quota_limited: provider.quota_limited,
                }
            })
            .collect()
    }

    /// Clears health for one provider, or for all of them with `None`.
    ///
    /// Names are matched case-insensitively and accept the usual aliases.
    pub fn reset_provider_health(&self, provider: Option<&str>) {
        match provider {
            None => self.health.reset_all(),
            Some(name) => match name.parse::<ProviderKind>() {
                Ok(kind) => self.health.reset(kind.name()),
                Err(_) => self.health.reset(name),
            },
        }
    }

    /// Whether any provider has a credential, regardless of health.
    #[must_use]
    pub fn has_configured_provider(&self) -> bool {
        ProviderKind::ALL
            .iter()
            .any(|&kind| self.credentials.is_configured(kind))
    }

    fn clip<'a>(&self, text: &'a str) -> &'a str {
        clip_to_bytes(text, self.config.gateway.max_source_bytes)
    }

    fn adapter(&self, kind: ProviderKind) -> Option<&Arc<Adapter>> {
        self.adapters.iter().find(|a| a.kind() == kind)
    }

    /// Serves one request: optional named attempt, then the race, then the
    /// fallback.
    async fn complete<F>(
        &self,
        request: CompletionRequest,
        choice: ProviderChoice,
        fallback: F,
    ) -> CompletionResult
    where
        F: FnOnce(&[ProviderFailure]) -> String,
    {
        let request = Arc::new(request);
        let timeout = self.config.gateway.timeout_for(request.task);
        let mut failures = Vec::new();
        let mut tried = None;

        if let ProviderChoice::Named(kind) = choice {
            if let Some(adapter) = self.adapter(kind) {
                tried = Some(kind);
                match call_timed(Arc::clone(adapter), Arc::clone(&request), timeout).await {
                    Ok(result) => return result,
                    Err(err) => {
                        warn!(error = %err, "Requested provider failed, racing the rest");
                        failures.push(ProviderFailure::from_error(kind.name(), &err));
                    }
                }
            }
        }

        let candidates: Vec<_> = self
            .adapters
            .iter()
            .filter(|a| Some(a.kind()) != tried && a.is_eligible())
            .cloned()
            .collect();

        if candidates.is_empty() {
            warn!("No eligible provider");
            return self.fallback_result(&request, fallback, failures, NO_PROVIDERS_WARNING);
        }

        debug!(
            candidates = ?candidates.iter().map(|a| a.name()).collect::<Vec<_>>(),
            "Racing providers"
        );

        match race(candidates, &request, timeout, &mut failures).await {
            Some(mut result) => {
                if !failures.is_empty() {
                    result.warning = Some(format!(
                        "Answered by {} after {} provider(s) failed.",
                        result.provider,
                        failures.len()
                    ));
                    result.errors = failures;
                }
                result
            }
            None => {
                warn!(failures = failures.len(), "Every provider failed");
                self.fallback_result(&request, fallback, failures, ALL_FAILED_WARNING)
            }
        }
    }

    fn fallback_result<F>(
        &self,
        request: &CompletionRequest,
        fallback: F,
        failures: Vec<ProviderFailure>,
        warning: &str,
    ) -> CompletionResult
    where
        F: FnOnce(&[ProviderFailure]) -> String,
    {
        let found = concepts::extract(&request.input, &request.language);
        CompletionResult {
            explanation: fallback(&failures),
            provider: FALLBACK_PROVIDER.to_string(),
            concepts: found.concepts,
            examples: found.examples,
            is_error_analysis: false,
            warning: Some(warning.to_string()),
            errors: failures,
            duration_ms: None,
        }
    }
}

/// Runs one adapter under the time box. A call that overruns is recorded as
/// unhealthy.
async fn call_timed(
    adapter: Arc<Adapter>,
    request: Arc<CompletionRequest>,
    timeout: Duration,
) -> Result<CompletionResult, GatewayError> {
    if let Ok(outcome) = tokio::time::timeout(timeout, adapter.call(&request)).await {
        outcome
    } else {
        adapter.record_timeout();
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = timeout.as_millis() as u64;
        Err(GatewayError::Timeout {
            provider: adapter.name().to_string(),
            timeout_ms,
        })
    }
}

/// Starts every candidate at once and returns the first success.
///
/// Failures observed before the winner are appended to `failures`. Calls
/// still in flight when the winner arrives keep running on a detached task so
/// their outcomes still reach the health registry.
async fn race(
    candidates: Vec<Arc<Adapter>>,
    request: &Arc<CompletionRequest>,
    timeout: Duration,
    failures: &mut Vec<ProviderFailure>,
) -> Option<CompletionResult> {
    let mut pending: FuturesUnordered<_> = candidates
        .into_iter()
        .map(|adapter| {
            let request = Arc::clone(request);
            async move {
                let name = adapter.name();
                (name, call_timed(adapter, request, timeout).await)
            }
        })
        .collect();

    let mut winner = None;
    while let Some((name, outcome)) = pending.next().await {
        match outcome {
            Ok(result) => {
                info!(provider = name, duration_ms = ?result.duration_ms, "Provider won the race");
                winner = Some(result);
                break;
            }
            Err(err) => {
                debug!(provider = name, error = %err, "Provider lost the race");
                failures.push(ProviderFailure::from_error(name, &err));
            }
        }
    }

    if winner.is_some() && !pending.is_empty() {
        tokio::spawn(
            async move {
                while let Some((name, outcome)) = pending.next().await {
                    match outcome {
                        Ok(_) => debug!(provider = name, "Late success discarded"),
                        Err(err) => debug!(provider = name, error = %err, "Late failure recorded"),
                    }
                }
            }
            .instrument(Span::current()),
        );
    }

    winner
}
