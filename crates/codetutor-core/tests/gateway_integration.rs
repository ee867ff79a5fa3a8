// SPDX-License-Identifier: Apache-2.0

//! Integration tests for `CompletionGateway` against a scripted transport.
//!
//! Tokio time is paused so provider latencies and time boxes resolve
//! instantly and in a fixed order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use codetutor_core::ai::UpstreamRequest;
use codetutor_core::{
    AppConfig, CompletionGateway, ExplanationMode, GatewayConfig, GatewayError, HealthRegistry,
    ManualClock, ProviderChoice, ProviderKind, QuotaConfig, RetryConfig, StaticCredentials,
    Transport,
};

#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// Answers after the given delay in milliseconds.
    Succeed(u64),
    /// Fails immediately with the given HTTP status.
    Fail(u16),
    /// Never answers within any time box.
    Hang,
}

/// Transport that replays a fixed behavior per provider and counts calls.
#[derive(Default)]
struct ScriptedTransport {
    behaviors: HashMap<&'static str, Behavior>,
    calls: Mutex<HashMap<&'static str, usize>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(behaviors: &[(ProviderKind, Behavior)]) -> Arc<Self> {
        Arc::new(Self {
            behaviors: behaviors.iter().map(|&(k, b)| (k.name(), b)).collect(),
            ..Self::default()
        })
    }

    fn calls(&self, kind: ProviderKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(kind.name())
            .copied()
            .unwrap_or(0)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: UpstreamRequest<'_>) -> Result<String> {
        let name = request.provider.name;
        *self.calls.lock().unwrap().entry(name).or_default() += 1;
        self.prompts.lock().unwrap().push(request.prompt.user.clone());

        match self.behaviors.get(name).copied().unwrap_or(Behavior::Fail(500)) {
            Behavior::Succeed(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(format!("## Overview\n\n{name} explains it."))
            }
            Behavior::Fail(status) => Err(GatewayError::Upstream {
                provider: name.to_string(),
                status,
                message: "scripted failure".to_string(),
            }
            .into()),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

fn config() -> AppConfig {
    AppConfig {
        gateway: GatewayConfig {
            retry: RetryConfig {
                max_retries: 2,
                base_delay_ms: 1,
            },
            quota: QuotaConfig {
                max_per_window: 3,
                window_seconds: 60,
                min_interval_ms: 0,
            },
            ..GatewayConfig::default()
        },
        ..AppConfig::default()
    }
}

fn keys(kinds: &[ProviderKind]) -> StaticCredentials {
    kinds
        .iter()
        .fold(StaticCredentials::new(), |creds, &kind| creds.with_key(kind, "test-key"))
}

struct Harness {
    gateway: CompletionGateway,
    transport: Arc<ScriptedTransport>,
    clock: Arc<ManualClock>,
}

fn harness(behaviors: &[(ProviderKind, Behavior)]) -> Harness {
    let config = config();
    let clock = Arc::new(ManualClock::default());
    let health = Arc::new(HealthRegistry::from_config(&config.gateway, clock.clone()));
    let transport = ScriptedTransport::new(behaviors);
    let configured: Vec<_> = behaviors.iter().map(|&(kind, _)| kind).collect();

    let gateway = CompletionGateway::builder()
        .config(config)
        .credentials(Arc::new(keys(&configured)))
        .transport(transport.clone())
        .health(health)
        .build();

    Harness {
        gateway,
        transport,
        clock,
    }
}

#[tokio::test(start_paused = true)]
async fn test_race_returns_fastest_and_records_both() {
    let h = harness(&[
        (ProviderKind::Groq, Behavior::Succeed(500)),
        (ProviderKind::Gemini, Behavior::Succeed(50)),
    ]);

    let result = h
        .gateway
        .answer_question(
            "What is a loop?",
            "python",
            ProviderChoice::Auto,
            ExplanationMode::Default,
        )
        .await;

    assert_eq!(result.provider, "gemini");
    assert!(result.errors.is_empty());
    assert!(result.warning.is_none());

    // The slower call finishes on the drain task.
    tokio::time::sleep(Duration::from_secs(1)).await;

    let health = h.gateway.health().snapshot();
    let names: Vec<_> = health.iter().map(|r| r.provider.as_str()).collect();
    assert_eq!(names, vec!["gemini", "groq"]);
    assert!(health.iter().all(|r| r.is_healthy));
    assert_eq!(h.transport.calls(ProviderKind::Groq), 1);
}

#[tokio::test(start_paused = true)]
async fn test_total_failure_degrades_to_fallback() {
    let h = harness(&[
        (ProviderKind::Groq, Behavior::Fail(400)),
        (ProviderKind::Gemini, Behavior::Fail(401)),
        (ProviderKind::OpenRouter, Behavior::Fail(503)),
        (ProviderKind::HuggingFace, Behavior::Fail(404)),
    ]);

    let result = h
        .gateway
        .explain_code(
            "name = 'Ana'\nprint(name)",
            "python",
            ProviderChoice::Auto,
            ExplanationMode::Default,
        )
        .await;

    assert!(result.is_fallback());
    assert_eq!(result.errors.len(), 4);
    assert!(!result.explanation.is_empty());
    assert!(result.explanation.contains("Providers that could not answer"));
    assert!(
        result
            .errors
            .iter()
            .any(|f| f.provider == "gemini" && f.error.contains("HTTP 401"))
    );

    // 503 is transient, so openrouter used its retries.
    assert_eq!(h.transport.calls(ProviderKind::OpenRouter), 3);
    assert_eq!(h.transport.calls(ProviderKind::Groq), 1);

    for status in h.gateway.available_providers() {
        assert!(!status.healthy, "{} should be unhealthy", status.name);
    }
}

#[tokio::test(start_paused = true)]
async fn test_unhealthy_provider_recovers_after_ttl() {
    let h = harness(&[(ProviderKind::Groq, Behavior::Fail(400))]);

    let first = h
        .gateway
        .answer_question("Why?", "python", ProviderChoice::Auto, ExplanationMode::Default)
        .await;
    assert!(first.is_fallback());
    assert_eq!(first.errors.len(), 1);

    // Inside the TTL the provider is skipped without a network call.
    let second = h
        .gateway
        .answer_question("Why?", "python", ProviderChoice::Auto, ExplanationMode::Default)
        .await;
    assert!(second.is_fallback());
    assert!(second.errors.is_empty());
    assert_eq!(h.transport.calls(ProviderKind::Groq), 1);

    h.clock.advance(chrono::Duration::seconds(301));
    assert!(h.gateway.health().is_healthy("groq"));

    h.gateway
        .answer_question("Why?", "python", ProviderChoice::Auto, ExplanationMode::Default)
        .await;
    assert_eq!(h.transport.calls(ProviderKind::Groq), 2);
}

#[tokio::test(start_paused = true)]
async fn test_quota_rejects_call_before_network() {
    let h = harness(&[(ProviderKind::Gemini, Behavior::Succeed(0))]);

    for _ in 0..3 {
        let result = h
            .gateway
            .answer_question("Hi?", "python", ProviderChoice::Auto, ExplanationMode::Default)
            .await;
        assert_eq!(result.provider, "gemini");
    }

    let over = h
        .gateway
        .answer_question(
            "Hi?",
            "python",
            ProviderChoice::Named(ProviderKind::Gemini),
            ExplanationMode::Default,
        )
        .await;

    assert!(over.is_fallback());
    assert_eq!(over.errors.len(), 1);
    assert!(over.errors[0].error.contains("quota"));
    assert_eq!(h.transport.calls(ProviderKind::Gemini), 3);
    assert!(h.gateway.health().is_healthy("gemini"));

    h.clock.advance(chrono::Duration::seconds(61));
    let fresh = h
        .gateway
        .answer_question("Hi?", "python", ProviderChoice::Auto, ExplanationMode::Default)
        .await;
    assert_eq!(fresh.provider, "gemini");
    assert_eq!(h.transport.calls(ProviderKind::Gemini), 4);
}

#[tokio::test(start_paused = true)]
async fn test_feedback_always_has_corrected_code() {
    let h = harness(&[]);

    let text = h
        .gateway
        .generate_feedback(
            "print(x)",
            None,
            Some("NameError: name 'x' is not defined"),
            ProviderChoice::Auto,
        )
        .await;

    assert!(text.contains("```"));
    assert!(text.contains('x'));
    assert!(text.contains("## Corrected Code"));
}

#[tokio::test(start_paused = true)]
async fn test_clean_code_is_explained_by_provider() {
    let h = harness(&[(ProviderKind::Groq, Behavior::Succeed(10))]);

    let result = h
        .gateway
        .explain_code(
            "print('hi')",
            "python",
            ProviderChoice::Auto,
            ExplanationMode::Default,
        )
        .await;

    assert_eq!(result.provider, "groq");
    assert!(!result.explanation.is_empty());
    assert!(!result.is_error_analysis);
    assert_eq!(result.concepts, vec!["Output"]);
    assert_eq!(result.examples.len(), 1);
    assert!(result.duration_ms.is_some());
    assert!(h.transport.last_prompt().contains("Explain what this python code does"));
}

#[tokio::test(start_paused = true)]
async fn test_broken_code_is_routed_to_feedback() {
    let h = harness(&[(ProviderKind::Groq, Behavior::Succeed(10))]);

    let result = h
        .gateway
        .explain_code(
            "print(x)\nx = 5",
            "python",
            ProviderChoice::Auto,
            ExplanationMode::Default,
        )
        .await;

    assert_eq!(result.provider, "groq");
    assert!(result.is_error_analysis);
    let prompt = h.transport.last_prompt();
    assert!(prompt.contains("## What Went Wrong"));
    assert!(prompt.contains("- line 1:"));
}

#[tokio::test(start_paused = true)]
async fn test_named_provider_failure_falls_through_to_race() {
    let h = harness(&[
        (ProviderKind::OpenRouter, Behavior::Fail(400)),
        (ProviderKind::Groq, Behavior::Succeed(10)),
    ]);

    let result = h
        .gateway
        .answer_question(
            "What is a dict?",
            "python",
            ProviderChoice::Named(ProviderKind::OpenRouter),
            ExplanationMode::Default,
        )
        .await;

    assert_eq!(result.provider, "groq");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].provider, "openrouter");
    assert!(result.warning.is_some());
    assert_eq!(h.transport.calls(ProviderKind::OpenRouter), 1);
    assert!(!h.gateway.health().is_healthy("openrouter"));
}

#[tokio::test(start_paused = true)]
async fn test_named_provider_wins_without_race() {
    let h = harness(&[
        (ProviderKind::HuggingFace, Behavior::Succeed(200)),
        (ProviderKind::Groq, Behavior::Succeed(10)),
    ]);

    let result = h
        .gateway
        .answer_question(
            "What is a dict?",
            "python",
            ProviderChoice::Named(ProviderKind::HuggingFace),
            ExplanationMode::Default,
        )
        .await;

    assert_eq!(result.provider, "huggingface");
    assert_eq!(h.transport.calls(ProviderKind::Groq), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_times_out() {
    let h = harness(&[
        (ProviderKind::Gemini, Behavior::Hang),
        (ProviderKind::Groq, Behavior::Fail(400)),
    ]);

    let result = h
        .gateway
        .answer_question("Why?", "python", ProviderChoice::Auto, ExplanationMode::Default)
        .await;

    assert!(result.is_fallback());
    assert_eq!(result.errors.len(), 2);
    let gemini = result
        .errors
        .iter()
        .find(|f| f.provider == "gemini")
        .expect("gemini failure recorded");
    assert_eq!(gemini.error, "gemini: timed out after 12000ms");
    assert!(!h.gateway.health().is_healthy("gemini"));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_provider_is_never_called() {
    let mut config = config();
    config.providers.groq.enabled = false;
    let transport = ScriptedTransport::new(&[(ProviderKind::Groq, Behavior::Succeed(0))]);
    let gateway = CompletionGateway::builder()
        .config(config)
        .credentials(Arc::new(StaticCredentials::all("test-key")))
        .transport(transport.clone())
        .build();

    let result = gateway
        .answer_question("Hi?", "python", ProviderChoice::Auto, ExplanationMode::Default)
        .await;

    assert_ne!(result.provider, "groq");
    assert_eq!(transport.calls(ProviderKind::Groq), 0);
    let groq = gateway
        .available_providers()
        .into_iter()
        .find(|s| s.name == "groq")
        .expect("groq listed");
    assert!(!groq.configured);
}
