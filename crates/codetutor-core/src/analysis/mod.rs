// SPDX-License-Identifier: Apache-2.0

//! Offline code analysis.
//!
//! A heuristic Python issue analyzer, an error-message parser and the
//! templated feedback used when no AI provider is reachable. Nothing in this
//! module does I/O.

pub mod analyzer;
pub mod error_parser;
pub mod fallback;
pub mod types;

pub use analyzer::{Analyzer, analyze};
pub use error_parser::{ErrorKind, ParsedError, parse_error};
pub use fallback::{build_answer_fallback, build_fallback, build_fallback_with, render_issues};
pub use types::{
    AnalysisReport, AnalyzerConfig, CodeIssue, IssueKind, Suggestion, UsageScanPolicy,
};
