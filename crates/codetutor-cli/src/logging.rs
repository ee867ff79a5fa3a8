// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the codetutor CLI.
//!
//! Uses `tracing` with `tracing-subscriber` for structured logging to stderr.
//! Log level can be controlled via the `RUST_LOG` environment variable.
//!
//! # Examples
//!
//! ```bash
//! # Default: warnings only
//! codetutor ask "What is a list?"
//!
//! # See which providers raced and which won
//! RUST_LOG=codetutor=debug codetutor ask "What is a list?"
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::OutputFormat;

/// Initialize the logging subsystem.
///
/// Structured output formats keep stderr quiet unless `RUST_LOG` is set.
/// `verbose` raises the default to debug for codetutor crates.
///
/// Race outcomes are emitted as structured fields (`request_id`, `provider`,
/// `duration_ms`), so they can be filtered:
///
/// ```bash
/// RUST_LOG=codetutor=info codetutor explain main.py 2>&1 | grep "won the race"
/// ```
pub fn init_logging(format: OutputFormat, verbose: bool) {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let default_filter = match (format, verbose) {
        (OutputFormat::Text, true) => "codetutor=debug,reqwest=error",
        _ => "codetutor=warn,reqwest=error",
    };
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .expect("valid default filter directives");

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
