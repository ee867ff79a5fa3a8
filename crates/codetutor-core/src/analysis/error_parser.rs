// SPDX-License-Identifier: Apache-2.0

//! Best-effort extraction of structure from interpreter error messages.
//!
//! Recognizes `NameError`, `TypeError`, `SyntaxError` and any other
//! `<Type>Error: <message>` line, the variable in `name 'x' is not defined`,
//! and the first `line N` mention. Unusual formats simply yield less
//! structure; nothing here fails.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static ERROR_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:[A-Z][A-Za-z]*)?(?:Error|Exception))\b(?::[ \t]*([^\r\n]*))?")
        .expect("error type regex must compile")
});
static UNDEFINED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:name ['"]([^'"]+)['"]|\b([^\W\d]\w*)) is not defined"#)
        .expect("undefined name regex must compile")
});
static LINE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bline (\d+)").expect("line regex must compile"));

/// Category of a parsed error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "name")]
pub enum ErrorKind {
    /// `NameError`
    Name,
    /// `TypeError`
    Type,
    /// `SyntaxError`
    Syntax,
    /// Any other `<Type>Error`, with its type name.
    Other(String),
    /// No error type found in the text.
    Unrecognized,
}

impl ErrorKind {
    /// Type name as it appears in the message.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Name => "NameError",
            Self::Type => "TypeError",
            Self::Syntax => "SyntaxError",
            Self::Other(name) => name,
            Self::Unrecognized => "Error",
        }
    }
}

/// Structure extracted from an error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedError {
    /// Error category.
    pub kind: ErrorKind,
    /// Variable named by the error, if any.
    pub variable: Option<String>,
    /// Line number mentioned in the error, if any.
    pub line: Option<usize>,
    /// The message text after the type name, or the whole input trimmed.
    pub message: String,
}

/// Parses an error message.
///
/// When a traceback contains several error types, the last one wins since
/// that is the one actually raised.
///
/// # Examples
///
/// ```
/// use codetutor_core::analysis::{parse_error, ErrorKind};
///
/// let parsed = parse_error("File \"main.py\", line 3\nNameError: name 'total' is not defined");
/// assert_eq!(parsed.kind, ErrorKind::Name);
/// assert_eq!(parsed.variable.as_deref(), Some("total"));
/// assert_eq!(parsed.line, Some(3));
/// ```
#[must_use]
pub fn parse_error(message: &str) -> ParsedError {
    let typed = ERROR_TYPE.captures_iter(message).last();

    let (kind, detail) = match typed {
        Some(caps) => {
            let kind = match &caps[1] {
                "NameError" => ErrorKind::Name,
                "TypeError" => ErrorKind::Type,
                "SyntaxError" => ErrorKind::Syntax,
                other => ErrorKind::Other(other.to_string()),
            };
            let detail = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| message.trim());
            (kind, detail)
        }
        None => (ErrorKind::Unrecognized, message.trim()),
    };

    let variable = UNDEFINED_NAME
        .captures(message)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
        // "name is not defined" with the name itself missing
        .filter(|name| *name != "name")
        .map(str::to_string);

    let line = LINE_NUMBER
        .captures(message)
        .and_then(|caps| caps[1].parse().ok());

    ParsedError {
        kind,
        variable,
        line,
        message: detail.to_string(),
    }
}
