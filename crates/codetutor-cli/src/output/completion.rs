// SPDX-License-Identifier: Apache-2.0

//! Text rendering for completion results.

use std::io::{self, Write};

use codetutor_core::CompletionResult;
use console::style;

use super::Renderable;
use crate::cli::OutputContext;

impl Renderable for CompletionResult {
    fn render_text(&self, w: &mut dyn Write, ctx: &OutputContext) -> io::Result<()> {
        if let Some(warning) = self.warning.as_deref().filter(|_| !ctx.quiet) {
            writeln!(w, "{}", style(warning).yellow())?;
            writeln!(w)?;
        }
        if self.is_error_analysis && !ctx.quiet {
            writeln!(
                w,
                "{}",
                style("Possible problems found, so here is feedback instead of an explanation.")
                    .cyan()
            )?;
            writeln!(w)?;
        }

        writeln!(w, "{}", self.explanation.trim_end())?;

        if !self.concepts.is_empty() {
            writeln!(w)?;
            writeln!(
                w,
                "{}  {}",
                style("concepts:").dim(),
                self.concepts
                    .iter()
                    .map(|c| style(c).cyan().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
        }

        if ctx.verbose {
            let timing = self
                .duration_ms
                .map(|ms| format!(" in {ms}ms"))
                .unwrap_or_default();
            writeln!(
                w,
                "{}  {}{timing}",
                style("provider:").dim(),
                style(&self.provider).bold()
            )?;
            for failure in &self.errors {
                writeln!(w, "  {} {}", style("-").red(), failure.error)?;
            }
        }
        Ok(())
    }
}
