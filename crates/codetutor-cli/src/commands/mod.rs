// SPDX-License-Identifier: Apache-2.0

//! Command handlers for the codetutor CLI.

pub mod providers;
pub mod tutor;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use codetutor_core::{AppConfig, CompletionGateway, EnvCredentials, ProviderChoice};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::cli::{Commands, OutputContext};
use crate::output;

/// Creates a styled spinner (only if interactive).
fn maybe_spinner(ctx: &OutputContext, message: &str) -> Option<ProgressBar> {
    if ctx.is_interactive() {
        let s = ProgressBar::new_spinner();
        s.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("Invalid spinner template"),
        );
        s.set_message(message.to_string());
        s.enable_steady_tick(Duration::from_millis(100));
        Some(s)
    } else {
        None
    }
}

/// Dispatch to the appropriate command handler.
pub async fn run(
    command: Commands,
    provider: ProviderChoice,
    ctx: OutputContext,
    config: &AppConfig,
) -> Result<()> {
    let gateway = CompletionGateway::from_config(config, Arc::new(EnvCredentials))?;
    debug!(%provider, "Gateway ready");

    match command {
        Commands::Explain {
            file,
            language,
            mode,
        } => {
            let code = tutor::read_source(&file)?;
            let spinner = maybe_spinner(&ctx, "Explaining...");
            let result = gateway
                .explain_code(&code, &language, provider, mode.into())
                .await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }
            output::render(&result, &ctx)
        }

        Commands::Ask {
            question,
            language,
            mode,
        } => {
            let spinner = maybe_spinner(&ctx, "Thinking...");
            let result = gateway
                .answer_question(&question, &language, provider, mode.into())
                .await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }
            output::render(&result, &ctx)
        }

        Commands::Feedback {
            file,
            error,
            program_output,
            language,
            mode,
        } => {
            let code = tutor::read_source(&file)?;
            let spinner = maybe_spinner(&ctx, "Looking for the problem...");
            let result = gateway
                .feedback_completion(
                    &code,
                    &language,
                    program_output.as_deref(),
                    error.as_deref(),
                    provider,
                    mode.into(),
                )
                .await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }
            output::render(&result, &ctx)
        }

        Commands::Providers => {
            let result = providers::run(&gateway);
            output::render(&result, &ctx)
        }
    }
}
