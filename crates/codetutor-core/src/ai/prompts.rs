// SPDX-License-Identifier: Apache-2.0

//! Prompt construction for the three tasks.
//!
//! Every provider gets the same system instruction and task prompt; only the
//! wire shape differs.

use std::fmt::Write;

use super::types::{CompletionRequest, ExplanationMode};
use crate::analysis::CodeIssue;
use crate::config::TaskType;
use crate::utils::truncate_with_suffix;

/// Maximum characters of user input placed in a prompt.
pub const MAX_INPUT_CHARS: usize = 12_000;

/// Maximum characters of program output placed in a feedback prompt.
pub const MAX_OUTPUT_CHARS: usize = 2_000;

const TRUNCATION_SUFFIX: &str = "\n... [truncated]";

/// Shared system instruction.
pub const SYSTEM_INSTRUCTION: &str = "You are a patient programming tutor for beginners. \
Explain ideas in plain language, use everyday analogies, and back every point with a short, \
runnable code example. Use markdown headings and fenced code blocks tagged with the language. \
Never invent APIs. If something is ambiguous, say so.";

/// A rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System instruction.
    pub system: String,
    /// Task prompt.
    pub user: String,
}

impl Prompt {
    /// System and user text joined, for providers without a system role.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

fn tone(mode: ExplanationMode) -> &'static str {
    match mode {
        ExplanationMode::Default => "Aim for a clear explanation a first-year student can follow.",
        ExplanationMode::Beginner => {
            "Assume the reader has never programmed before. Define every term and use an analogy for each idea."
        }
        ExplanationMode::Detailed => {
            "Go in depth: cover how it works step by step, common pitfalls, and a second example."
        }
        ExplanationMode::Concise => "Keep it under 150 words with one short example.",
    }
}

fn clip(text: &str, max: usize) -> String {
    truncate_with_suffix(text, max, TRUNCATION_SUFFIX)
}

fn explain_prompt(request: &CompletionRequest) -> String {
    format!(
        "Explain what this {lang} code does.\n\n\
Structure your answer as:\n\
## Overview\n## Step by Step\n## Key Concepts\n## Try It Yourself\n\n\
{tone}\n\n```{lang}\n{code}\n```",
        lang = request.language,
        tone = tone(request.mode),
        code = clip(&request.input, MAX_INPUT_CHARS),
    )
}

fn answer_prompt(request: &CompletionRequest) -> String {
    format!(
        "Answer this {lang} programming question.\n\n\
Question: {question}\n\n\
Start with a one-sentence answer, then explain with an analogy, then show a code example \
in a fenced {lang} block. {tone}",
        lang = request.language,
        question = clip(&request.input, MAX_INPUT_CHARS),
        tone = tone(request.mode),
    )
}

fn render_findings(issues: &[CodeIssue]) -> String {
    let mut out = String::new();
    for issue in issues {
        let _ = writeln!(out, "- line {}: {}", issue.line, issue.message);
    }
    out
}

fn feedback_prompt(request: &CompletionRequest) -> String {
    let lang = &request.language;
    let mut prompt = format!(
        "A student ran this {lang} code and needs help.\n\n```{lang}\n{}\n```\n",
        clip(&request.input, MAX_INPUT_CHARS)
    );

    if let Some(output) = request.output.as_deref().filter(|o| !o.trim().is_empty()) {
        let _ = write!(prompt, "\nProgram output:\n```\n{}\n```\n", clip(output, MAX_OUTPUT_CHARS));
    }
    if let Some(error) = request.error.as_deref().filter(|e| !e.trim().is_empty()) {
        let _ = write!(prompt, "\nError message:\n```\n{}\n```\n", clip(error, MAX_OUTPUT_CHARS));
    }
    if !request.issues.is_empty() {
        let _ = write!(
            prompt,
            "\nA static check flagged these possible problems:\n{}",
            render_findings(&request.issues)
        );
    }

    let _ = write!(
        prompt,
        "\nRespond with exactly these sections:\n\
## What Went Wrong\nName the error type explicitly (for example NameError or SyntaxError) and the line.\n\
## Why\nExplain the cause in beginner terms.\n\
## How to Fix\nNumbered steps.\n\
## Corrected Code\nThe full corrected program in a fenced {lang} code block.\n\n{}",
        tone(request.mode)
    );
    prompt
}

/// Builds the prompt for a request.
#[must_use]
pub fn build_prompt(request: &CompletionRequest) -> Prompt {
    let user = match request.task {
        TaskType::Explain => explain_prompt(request),
        TaskType::Answer => answer_prompt(request),
        TaskType::Feedback => feedback_prompt(request),
    };
    Prompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user,
    }
}
