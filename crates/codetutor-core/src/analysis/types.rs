// SPDX-License-Identifier: Apache-2.0

//! Static analysis types and data structures.

use serde::{Deserialize, Serialize};

/// Category of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// An identifier is used before any line defines it.
    UndefinedVariable,
    /// A line-level syntax smell (unbalanced parentheses, missing colon).
    SyntaxError,
}

impl IssueKind {
    /// Snake-case name used in rendered output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UndefinedVariable => "undefined_variable",
            Self::SyntaxError => "syntax_error",
        }
    }
}

/// A single issue found by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeIssue {
    /// Issue category.
    #[serde(rename = "type")]
    pub kind: IssueKind,
    /// Line number (1-indexed).
    pub line: usize,
    /// Offending identifier, for undefined-variable issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Human-readable description.
    pub message: String,
}

/// A human-readable hint tied to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Line number (1-indexed).
    pub line: usize,
    /// What to try.
    pub message: String,
}

/// Result of analyzing one source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Issues, ordered by line.
    pub issues: Vec<CodeIssue>,
    /// One suggestion per issue, in the same order.
    pub suggestions: Vec<Suggestion>,
}

impl AnalysisReport {
    /// True if nothing was flagged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Which identifiers the usage-before-definition scan may flag.
///
/// The `print(...)` argument rule always runs; this only widens or narrows
/// the general per-line scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageScanPolicy {
    /// Identifiers that start uppercase or appear inside `print(...)`.
    #[default]
    UppercaseOrPrint,
    /// Only identifiers inside `print(...)`.
    PrintOnly,
    /// Every identifier. Noisy.
    All,
}

/// Analyzer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Usage-scan threshold.
    pub usage_scan: UsageScanPolicy,
    /// Input beyond this many bytes is ignored.
    pub max_source_bytes: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            usage_scan: UsageScanPolicy::default(),
            max_source_bytes: 100 * 1024,
        }
    }
}
