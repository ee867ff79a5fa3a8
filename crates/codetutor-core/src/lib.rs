// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # Codetutor Core
//!
//! Core library for codetutor - a multi-provider AI completion gateway for
//! programming tutoring.
//!
//! This crate provides reusable components for:
//! - Static analysis of beginner Python code
//! - Offline feedback when no AI provider can answer
//! - Provider health and quota tracking
//! - Concurrent completion across Gemini, Groq, `OpenRouter` and Hugging Face
//! - Configuration management
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use codetutor_core::{
//!     CompletionGateway, EnvCredentials, ExplanationMode, ProviderChoice, load_config,
//! };
//!
//! # async fn example() -> codetutor_core::Result<()> {
//! let config = load_config()?;
//! let gateway = CompletionGateway::from_config(&config, Arc::new(EnvCredentials))?;
//!
//! let result = gateway
//!     .explain_code(
//!         "for i in range(3):\n    print(i)",
//!         "python",
//!         ProviderChoice::Auto,
//!         ExplanationMode::Beginner,
//!     )
//!     .await;
//! println!("{} (via {})", result.explanation, result.provider);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ai`] - Provider registry, adapters and the completion gateway
//! - [`analysis`] - Static analyzer, error parser and offline feedback
//! - [`auth`] - API key lookup
//! - [`clock`] - Injectable time source
//! - [`config`] - Configuration loading and paths
//! - [`error`] - Error types

// ============================================================================
// Error Handling
// ============================================================================

pub use error::GatewayError;

/// Convenience Result type for codetutor operations.
///
/// This is equivalent to `std::result::Result<T, GatewayError>`.
pub type Result<T> = std::result::Result<T, GatewayError>;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    AnalyzerSettings, AppConfig, GatewayConfig, ProviderSettings, ProvidersConfig, QuotaConfig,
    RetryConfig, TaskType, config_dir, config_file_path, load_config, load_config_from,
};

// ============================================================================
// Credentials and Time
// ============================================================================

pub use auth::{CredentialProvider, EnvCredentials, StaticCredentials};
pub use clock::{Clock, ManualClock, SystemClock};

// ============================================================================
// Static Analysis and Offline Feedback
// ============================================================================

pub use analysis::{
    AnalysisReport, Analyzer, AnalyzerConfig, CodeIssue, ErrorKind, IssueKind, ParsedError,
    Suggestion, UsageScanPolicy, analyze, build_answer_fallback, build_fallback,
    build_fallback_with, parse_error,
};

// ============================================================================
// Completion Gateway
// ============================================================================

pub use ai::{
    CompletionGateway, CompletionRequest, CompletionResult, ExplanationMode, FALLBACK_PROVIDER,
    HealthRegistry, ProviderChoice, ProviderFailure, ProviderKind, ProviderStatus, Transport,
};

// ============================================================================
// Retry Logic
// ============================================================================

pub use retry::{is_retryable_anyhow, is_retryable_http, retry_backoff};

// ============================================================================
// Modules
// ============================================================================

pub mod ai;
pub mod analysis;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod retry;
pub mod utils;
