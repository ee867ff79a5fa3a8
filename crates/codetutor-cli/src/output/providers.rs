// SPDX-License-Identifier: Apache-2.0

//! Provider availability table.

use std::io::{self, Write};

use codetutor_core::ProviderStatus;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use console::style;
use serde::Serialize;

use super::Renderable;
use crate::cli::OutputContext;

/// Result of the `providers` command.
#[derive(Serialize)]
#[serde(transparent)]
pub struct ProvidersResult {
    /// Providers in priority order.
    pub providers: Vec<ProviderStatus>,
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

impl Renderable for ProvidersResult {
    fn render_text(&self, w: &mut dyn Write, ctx: &OutputContext) -> io::Result<()> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Provider", "Name", "Configured", "Healthy", "Quota-limited"]);

        for provider in &self.providers {
            table.add_row(vec![
                provider.display_name.as_str(),
                provider.name.as_str(),
                yes_no(provider.configured),
                yes_no(provider.healthy),
                yes_no(provider.quota_limited),
            ]);
        }
        writeln!(w, "{table}")?;

        if !ctx.quiet && !self.providers.iter().any(|p| p.configured) {
            writeln!(w)?;
            writeln!(
                w,
                "{}",
                style("No provider is configured. Answers will come from offline feedback.")
                    .yellow()
            )?;
            writeln!(
                w,
                "{}",
                style("Set GEMINI_API_KEY, GROQ_API_KEY, OPENROUTER_API_KEY or HUGGINGFACE_API_KEY.")
                    .dim()
            )?;
        }
        Ok(())
    }
}
