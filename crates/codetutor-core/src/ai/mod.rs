// SPDX-License-Identifier: Apache-2.0

//! AI provider integration.
//!
//! Provides the provider registry, the health and quota registry, prompt
//! construction, the HTTP transport for the three wire formats, the
//! per-provider adapter, and the [`CompletionGateway`] that races them.

pub mod adapter;
pub mod concepts;
pub mod gateway;
pub mod health;
pub mod prompts;
pub mod registry;
pub mod transport;
pub mod types;

pub use adapter::Adapter;
pub use gateway::CompletionGateway;
pub use health::{HealthRegistry, ProviderHealth, QuotaPolicy, RateLimitState};
pub use registry::{
    ProviderConfig, ProviderKind, WireFormat, all_providers, get_provider, providers_by_priority,
};
pub use transport::{HttpTransport, Transport, UpstreamRequest};
pub use types::{
    CompletionRequest, CompletionResult, ExplanationMode, FALLBACK_PROVIDER, ProviderChoice,
    ProviderFailure, ProviderStatus,
};
