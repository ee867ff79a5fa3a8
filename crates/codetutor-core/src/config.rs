// SPDX-License-Identifier: Apache-2.0

//! Configuration management for the codetutor gateway.
//!
//! Provides layered configuration from files and environment variables.
//! Uses XDG-compliant paths with environment variable support.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables (prefix: `CODETUTOR_`)
//! 2. Config file: `~/.config/codetutor/config.toml`
//! 3. Built-in defaults
//!
//! # Examples
//!
//! ```bash
//! # Shorten the health TTL via environment variable
//! CODETUTOR_GATEWAY__HEALTH_TTL_SECONDS=60 codetutor providers
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ai::registry::ProviderKind;
use crate::analysis::UsageScanPolicy;
use crate::error::GatewayError;

/// Task type for prompt selection and time boxing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Explain a piece of code.
    Explain,
    /// Answer a free-form programming question.
    Answer,
    /// Diagnose an error and suggest a fix.
    Feedback,
}

impl TaskType {
    /// Lowercase task name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explain => "explain",
            Self::Answer => "answer",
            Self::Feedback => "feedback",
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Orchestrator settings (timeouts, health, retry, quota).
    pub gateway: GatewayConfig,
    /// Static analyzer settings.
    pub analyzer: AnalyzerSettings,
    /// Per-provider overrides.
    pub providers: ProvidersConfig,
}

/// Orchestrator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Per-adapter time box for explain requests, in seconds.
    pub explain_timeout_seconds: u64,
    /// Per-adapter time box for answer requests, in seconds.
    pub answer_timeout_seconds: u64,
    /// Per-adapter time box for feedback requests, in seconds.
    pub feedback_timeout_seconds: u64,
    /// How long a recorded health outcome stays authoritative.
    pub health_ttl_seconds: u64,
    /// Transport-level HTTP timeout, in seconds.
    pub http_timeout_seconds: u64,
    /// Source text beyond this many bytes is not analyzed or sent upstream.
    pub max_source_bytes: usize,
    /// Adapter retry policy.
    pub retry: RetryConfig,
    /// Request budget applied to quota-limited providers.
    pub quota: QuotaConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            explain_timeout_seconds: 12,
            answer_timeout_seconds: 12,
            feedback_timeout_seconds: 15,
            health_ttl_seconds: 300,
            http_timeout_seconds: 30,
            max_source_bytes: 100 * 1024,
            retry: RetryConfig::default(),
            quota: QuotaConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Returns the per-adapter time box for a task.
    #[must_use]
    pub fn timeout_for(&self, task: TaskType) -> Duration {
        let secs = match task {
            TaskType::Explain => self.explain_timeout_seconds,
            TaskType::Answer => self.answer_timeout_seconds,
            TaskType::Feedback => self.feedback_timeout_seconds,
        };
        Duration::from_secs(secs)
    }
}

/// Adapter retry policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
        }
    }
}

/// Request budget for quota-limited providers.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Maximum attempts per window.
    pub max_per_window: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
    /// Minimum gap between two attempts, in milliseconds.
    pub min_interval_ms: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_per_window: 15,
            window_seconds: 60,
            min_interval_ms: 1000,
        }
    }
}

/// Static analyzer settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    /// Which identifiers the usage-before-definition scan may flag.
    pub usage_scan: UsageScanPolicy,
}

/// Settings for a single provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Model override; the registry default is used when unset.
    pub model: Option<String>,
    /// Maximum tokens for API responses.
    pub max_tokens: u32,
    /// Temperature for API requests (0.0-1.0).
    pub temperature: f32,
    /// Set to false to keep the provider out of every race.
    pub enabled: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1024,
            temperature: 0.4,
            enabled: true,
        }
    }
}

/// Per-provider overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Google Gemini.
    pub gemini: ProviderSettings,
    /// Groq.
    pub groq: ProviderSettings,
    /// `OpenRouter`.
    pub openrouter: ProviderSettings,
    /// Hugging Face Inference API.
    pub huggingface: ProviderSettings,
}

impl ProvidersConfig {
    /// Returns the settings for a provider.
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Groq => &self.groq,
            ProviderKind::OpenRouter => &self.openrouter,
            ProviderKind::HuggingFace => &self.huggingface,
        }
    }
}

/// Returns the codetutor configuration directory.
///
/// Respects the `XDG_CONFIG_HOME` environment variable if set,
/// otherwise defaults to `~/.config/codetutor`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join("codetutor");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("codetutor")
}

/// Returns the path to the configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Load application configuration from the default file location and the
/// environment.
///
/// Environment variables use the prefix `CODETUTOR_` and double underscore
/// for nested keys (e.g., `CODETUTOR_GATEWAY__RETRY__MAX_RETRIES`).
///
/// # Errors
///
/// Returns `GatewayError::Config` if the config file exists but is invalid.
pub fn load_config() -> Result<AppConfig, GatewayError> {
    load_config_from(&config_file_path())
}

/// Load application configuration from an explicit file path plus the
/// environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<AppConfig, GatewayError> {
    let config = Config::builder()
        .add_source(File::with_name(path.to_string_lossy().as_ref()).required(false))
        .add_source(
            Environment::with_prefix("CODETUTOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    Ok(app_config)
}
