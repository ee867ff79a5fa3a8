// SPDX-License-Identifier: Apache-2.0

//! Command-line interface definition for codetutor.
//!
//! Uses clap's derive API for declarative CLI parsing.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use codetutor_core::{ExplanationMode, ProviderChoice};

/// Output format for CLI results.
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors (default)
    #[default]
    Text,
    /// JSON output for programmatic consumption
    Json,
}

/// Global output configuration passed to commands.
#[derive(Clone)]
pub struct OutputContext {
    /// Output format (text, json)
    pub format: OutputFormat,
    /// Suppress non-essential output (spinners, warnings)
    pub quiet: bool,
    /// Enable verbose output (provider failures, timings)
    pub verbose: bool,
    /// Whether stdout is a terminal (TTY)
    pub is_tty: bool,
}

impl OutputContext {
    /// Creates an `OutputContext` from CLI arguments.
    pub fn from_cli(format: OutputFormat, quiet: bool, verbose: bool) -> Self {
        Self {
            format,
            quiet,
            verbose,
            is_tty: std::io::stdout().is_terminal(),
        }
    }

    /// Returns true if interactive elements (spinners, colors) should be shown.
    pub fn is_interactive(&self) -> bool {
        self.is_tty && !self.quiet && matches!(self.format, OutputFormat::Text)
    }
}

/// Explanation tone.
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum ModeArg {
    /// Clear explanation for a first-year student
    #[default]
    Default,
    /// Assumes no programming background
    Beginner,
    /// In depth, with pitfalls and a second example
    Detailed,
    /// Short answer with one example
    Concise,
}

impl From<ModeArg> for ExplanationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Default => Self::Default,
            ModeArg::Beginner => Self::Beginner,
            ModeArg::Detailed => Self::Detailed,
            ModeArg::Concise => Self::Concise,
        }
    }
}

/// Codetutor - AI programming tutor.
///
/// Explains code, answers questions and diagnoses errors using whichever AI
/// provider answers first, with offline feedback when none can.
#[derive(Parser)]
#[command(name = "codetutor")]
#[command(version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Output format (text, json)
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    pub output: OutputFormat,

    /// Suppress non-essential output (spinners, warnings)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug-level logging, provider failures)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Provider to try first ("auto" races every available provider)
    #[arg(long, global = true, default_value = "auto")]
    pub provider: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Provider selection; unknown names fall back to auto.
    pub fn provider_choice(&self) -> ProviderChoice {
        ProviderChoice::parse_lenient(&self.provider)
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Explain what a piece of code does
    Explain {
        /// Source file to explain ("-" reads stdin)
        file: PathBuf,

        /// Programming language of the source
        #[arg(long, short = 'l', default_value = "python")]
        language: String,

        /// Explanation tone
        #[arg(long, short = 'm', value_enum, default_value = "default")]
        mode: ModeArg,
    },

    /// Ask a programming question
    Ask {
        /// The question
        question: String,

        /// Programming language the question is about
        #[arg(long, short = 'l', default_value = "python")]
        language: String,

        /// Explanation tone
        #[arg(long, short = 'm', value_enum, default_value = "default")]
        mode: ModeArg,
    },

    /// Get feedback on code that failed to run
    Feedback {
        /// Source file that failed ("-" reads stdin)
        file: PathBuf,

        /// Error message the program produced
        #[arg(long, short = 'e')]
        error: Option<String>,

        /// Output the program printed before failing
        #[arg(long)]
        program_output: Option<String>,

        /// Programming language of the source
        #[arg(long, short = 'l', default_value = "python")]
        language: String,

        /// Explanation tone
        #[arg(long, short = 'm', value_enum, default_value = "default")]
        mode: ModeArg,
    },

    /// Show configured providers and their availability
    Providers,
}
