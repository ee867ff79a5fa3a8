// SPDX-License-Identifier: Apache-2.0

//! Line-based static issue analyzer.
//!
//! Scans source text for common beginner mistakes without executing it:
//! identifiers used before any line defines them, unbalanced parentheses on
//! `print` lines, and control-flow headers missing their trailing colon.
//!
//! This is heuristic pattern matching, not data-flow analysis. Variables
//! defined conditionally or in another scope are not tracked, so results are
//! suggestions and may contain false positives and false negatives.
//!
//! Only Python has rules. Any other language yields an empty report.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::types::{
    AnalysisReport, AnalyzerConfig, CodeIssue, IssueKind, Suggestion, UsageScanPolicy,
};
use crate::utils::clip_to_bytes;

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "case", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "match", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const BUILTINS: &[&str] = &[
    "abs", "all", "any", "ascii", "bin", "bool", "breakpoint", "bytearray", "bytes", "callable",
    "chr", "classmethod", "compile", "complex", "delattr", "dict", "dir", "divmod", "enumerate",
    "eval", "exec", "exit", "filter", "float", "format", "frozenset", "getattr", "globals",
    "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance", "issubclass", "iter",
    "len", "list", "locals", "map", "max", "memoryview", "min", "next", "object", "oct", "open",
    "ord", "pow", "print", "property", "quit", "range", "repr", "reversed", "round", "set",
    "setattr", "slice", "sorted", "staticmethod", "str", "sum", "super", "tuple", "type", "vars",
    "zip", "self", "cls", "Ellipsis", "NotImplemented", "BaseException", "Exception",
    "ArithmeticError", "AssertionError", "AttributeError", "EOFError", "FileExistsError",
    "FileNotFoundError", "ImportError", "IndexError", "IOError", "KeyError",
    "KeyboardInterrupt", "LookupError", "MemoryError", "ModuleNotFoundError", "NameError",
    "NotImplementedError", "OSError", "OverflowError", "PermissionError", "RecursionError",
    "RuntimeError", "StopIteration", "SyntaxError", "SystemExit", "TimeoutError",
    "ConnectionError", "TypeError", "UnboundLocalError", "UnicodeDecodeError",
    "UnicodeEncodeError", "ValueError", "ZeroDivisionError", "Warning", "UserWarning",
    "DeprecationWarning", "__name__", "__file__", "__doc__",
];

static RESERVED: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| KEYWORDS.iter().chain(BUILTINS).copied().collect());

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("analyzer regex must compile")
}

// `[^\W\d]` is a Unicode letter or underscore, so `año` is one name.
static IDENT: LazyLock<Regex> = LazyLock::new(|| regex(r"\b[^\W\d]\w*\b"));
static BARE_IDENT: LazyLock<Regex> = LazyLock::new(|| regex(r"^[^\W\d]\w*$"));
static PRINT_CALL: LazyLock<Regex> = LazyLock::new(|| regex(r"\bprint\s*\("));
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"^\s*\(?\s*(\*?[^\W\d]\w*(?:\s*,\s*\*?[^\W\d]\w*)*)\s*,?\s*\)?\s*(?::[^=]*)?(?:\*\*|//|>>|<<|[-+*/%&|^@])?=(?:[^=]|$)",
    )
});
static WALRUS: LazyLock<Regex> = LazyLock::new(|| regex(r"([^\W\d]\w*)\s*:="));
static FOR_TARGET: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\bfor\s+((?:[^\W\d]|\()[\w\s,()*]*?)\s+in\b"));
static DEF: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*(?:async\s+)?def\s+([^\W\d]\w*)\s*\(([^)]*)"));
static CLASS: LazyLock<Regex> = LazyLock::new(|| regex(r"^\s*class\s+([^\W\d]\w*)"));
static IMPORT: LazyLock<Regex> = LazyLock::new(|| regex(r"^\s*import\s+(.+)$"));
static FROM_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*from\s+\S+\s+import\s+(.+)$"));
static AS_ALIAS: LazyLock<Regex> = LazyLock::new(|| regex(r"\bas\s+\(?([^\W\d]\w*)"));
static LAMBDA: LazyLock<Regex> = LazyLock::new(|| regex(r"\blambda\s*([^:]*):"));
static SCOPE_DECL: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*(?:global|nonlocal)\s+(.+)$"));
static CONTROL_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^(?:async\s+)?(if|elif|else|for|while|def|class|try|except|finally|with)\b")
});

/// Open string delimiter carried between lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
    TripleSingle,
    TripleDouble,
}

impl Quote {
    fn delimiter(self) -> &'static [u8] {
        match self {
            Self::Single => b"'",
            Self::Double => b"\"",
            Self::TripleSingle => b"'''",
            Self::TripleDouble => b"\"\"\"",
        }
    }

    fn is_triple(self) -> bool {
        matches!(self, Self::TripleSingle | Self::TripleDouble)
    }
}

/// Blanks string contents and comments with spaces.
///
/// The result has the same byte length as `line`, so offsets found in the
/// mask can be used to slice the original. Quote characters and code outside
/// strings (including non-ASCII identifiers) are kept as written.
fn mask_line(line: &str, open: &mut Option<Quote>) -> String {
    mask_with_comment(line, open).0
}

/// [`mask_line`], also returning the byte offset of a trailing comment.
fn mask_with_comment(line: &str, open: &mut Option<Quote>) -> (String, Option<usize>) {
    let bytes = line.as_bytes();
    let mut out = vec![b' '; bytes.len()];
    let mut comment = None;
    let mut i = 0;

    while i < bytes.len() {
        match *open {
            Some(quote) => {
                let delim = quote.delimiter();
                if bytes[i] == b'\\' {
                    i += 2;
                } else if bytes[i..].starts_with(delim) {
                    out[i..i + delim.len()].copy_from_slice(delim);
                    i += delim.len();
                    *open = None;
                } else {
                    i += 1;
                }
            }
            None => {
                let b = bytes[i];
                if b == b'#' {
                    comment = Some(i);
                    break;
                }
                if b == b'\'' || b == b'"' {
                    let quote = match (b, bytes[i..].starts_with(&[b, b, b])) {
                        (b'\'', true) => Quote::TripleSingle,
                        (b'\'', false) => Quote::Single,
                        (_, true) => Quote::TripleDouble,
                        (_, false) => Quote::Double,
                    };
                    let delim = quote.delimiter();
                    out[i..i + delim.len()].copy_from_slice(delim);
                    i += delim.len();
                    *open = Some(quote);
                    continue;
                }
                out[i] = b;
                i += 1;
            }
        }
    }

    // Plain quotes never span lines.
    if open.is_some_and(|q| !q.is_triple()) {
        *open = None;
    }

    // Multi-byte characters are copied whole or blanked whole, so the mask
    // stays valid UTF-8.
    let masked = String::from_utf8(out)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned());
    (masked, comment)
}

/// Byte offset where the code on a single line ends: before a trailing
/// comment and the whitespace leading up to it.
pub(crate) fn code_end(line: &str) -> usize {
    let (_, comment) = mask_with_comment(line, &mut None);
    line[..comment.unwrap_or(line.len())].trim_end().len()
}

/// Count of `(` minus count of `)` on a single line, ignoring strings and
/// comments.
pub(crate) fn paren_delta(line: &str) -> isize {
    let masked = mask_line(line, &mut None);
    let opens = masked.matches('(').count();
    let closes = masked.matches(')').count();
    opens.cast_signed() - closes.cast_signed()
}

fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    IDENT.find_iter(text).map(|m| m.as_str())
}

fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name) || (name.starts_with("__") && name.ends_with("__"))
}

/// Names bound by a masked line.
fn definitions(masked: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let add_all = |text: &str, names: &mut HashSet<String>| {
        for ident in identifiers(text).filter(|i| !is_reserved(i)) {
            names.insert(ident.to_string());
        }
    };

    if let Some(caps) = ASSIGNMENT.captures(masked) {
        add_all(&caps[1], &mut names);
    }
    for caps in WALRUS.captures_iter(masked) {
        names.insert(caps[1].to_string());
    }
    for caps in FOR_TARGET.captures_iter(masked) {
        add_all(&caps[1], &mut names);
    }
    if let Some(caps) = DEF.captures(masked) {
        names.insert(caps[1].to_string());
        for param in caps[2].split(',') {
            let param = param.trim().trim_start_matches('*');
            let param = param.split([':', '=']).next().unwrap_or_default().trim();
            if BARE_IDENT.is_match(param) {
                names.insert(param.to_string());
            }
        }
    }
    if let Some(caps) = CLASS.captures(masked) {
        names.insert(caps[1].to_string());
    }
    let imported = IMPORT
        .captures(masked)
        .or_else(|| FROM_IMPORT.captures(masked))
        .map(|caps| caps[1].to_string());
    if let Some(list) = imported {
        for part in list.split(',') {
            let part = part.trim_matches(|c: char| c.is_whitespace() || c == '(' || c == ')');
            let bound = match part.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => part.split('.').next().unwrap_or_default(),
            };
            if BARE_IDENT.is_match(bound) {
                names.insert(bound.to_string());
            }
        }
    }
    for caps in AS_ALIAS.captures_iter(masked) {
        names.insert(caps[1].to_string());
    }
    for caps in LAMBDA.captures_iter(masked) {
        add_all(&caps[1], &mut names);
    }
    if let Some(caps) = SCOPE_DECL.captures(masked) {
        add_all(&caps[1], &mut names);
    }

    names
}

/// Byte offset of the `)` closing the `(` at `open`, or the end of the line.
fn matching_paren(masked: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    for (offset, &b) in masked[open..].iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return open + offset;
                }
            }
            _ => {}
        }
    }
    masked.len()
}

/// Argument spans (`start..end`) of every `print(...)` call on the line.
fn print_spans(masked: &str) -> Vec<(usize, usize)> {
    PRINT_CALL
        .find_iter(masked)
        .map(|m| {
            let open = m.end() - 1;
            (open + 1, matching_paren(masked.as_bytes(), open))
        })
        .collect()
}

fn prev_non_space(masked: &[u8], before: usize) -> Option<u8> {
    masked[..before].iter().rev().copied().find(|b| *b != b' ')
}

fn next_non_space(masked: &[u8], from: usize) -> Option<(usize, u8)> {
    masked[from..]
        .iter()
        .copied()
        .enumerate()
        .find(|(_, b)| *b != b' ')
        .map(|(i, b)| (from + i, b))
}

/// Whether a control header has a `:` outside any brackets.
fn has_top_level_colon(masked: &str) -> bool {
    let mut depth = 0i32;
    for b in masked.bytes() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b':' if depth <= 0 => return true,
            _ => {}
        }
    }
    false
}

fn is_python(language: &str) -> bool {
    matches!(
        language.trim().to_ascii_lowercase().as_str(),
        "python" | "py" | "python3"
    )
}

/// Static issue analyzer.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

/// Per-analysis mutable state.
struct Scan {
    policy: UsageScanPolicy,
    defined: HashSet<String>,
    reported: HashSet<(String, usize)>,
    issues: Vec<CodeIssue>,
}

impl Scan {
    fn flag_undefined(&mut self, name: &str, line: usize, message: String) {
        if self.reported.insert((name.to_string(), line)) {
            self.issues.push(CodeIssue {
                kind: IssueKind::UndefinedVariable,
                line,
                variable: Some(name.to_string()),
                message,
            });
        }
    }

    fn flag_syntax(&mut self, line: usize, message: String) {
        self.issues.push(CodeIssue {
            kind: IssueKind::SyntaxError,
            line,
            variable: None,
            message,
        });
    }

    fn is_known(&self, name: &str, line_defs: &HashSet<String>) -> bool {
        is_reserved(name) || self.defined.contains(name) || line_defs.contains(name)
    }

    fn check_print_arguments(
        &mut self,
        raw: &str,
        spans: &[(usize, usize)],
        line: usize,
        line_defs: &HashSet<String>,
    ) {
        for &(start, end) in spans {
            let Some(argument) = raw.get(start..end).map(str::trim) else {
                continue;
            };
            if BARE_IDENT.is_match(argument) && !self.is_known(argument, line_defs) {
                self.flag_undefined(
                    argument,
                    line,
                    format!("'{argument}' is printed on line {line} but is never defined before it"),
                );
            }
        }
    }

    fn check_usages(
        &mut self,
        masked: &str,
        spans: &[(usize, usize)],
        line: usize,
        line_defs: &HashSet<String>,
    ) {
        let bytes = masked.as_bytes();
        for m in IDENT.find_iter(masked) {
            let name = m.as_str();
            if self.is_known(name, line_defs) || prev_non_space(bytes, m.start()) == Some(b'.') {
                continue;
            }
            match next_non_space(bytes, m.end()) {
                // call, keyword argument, or string prefix
                Some((_, b'(' | b'\'' | b'"')) => continue,
                Some((at, b'=')) if bytes.get(at + 1) != Some(&b'=') => continue,
                _ => {}
            }

            let in_print = spans
                .iter()
                .any(|&(start, end)| m.start() >= start && m.start() < end);
            let flag = match self.policy {
                UsageScanPolicy::UppercaseOrPrint => {
                    in_print || name.starts_with(char::is_uppercase)
                }
                UsageScanPolicy::PrintOnly => in_print,
                UsageScanPolicy::All => true,
            };
            if flag {
                self.flag_undefined(
                    name,
                    line,
                    format!("'{name}' is used on line {line} before it is defined"),
                );
            }
        }
    }

    fn check_syntax(&mut self, masked: &str, line: usize) {
        let opens = masked.matches('(').count();
        let closes = masked.matches(')').count();

        if masked.contains("print") && opens != closes {
            self.flag_syntax(
                line,
                format!("Unbalanced parentheses on line {line}: {opens} '(' but {closes} ')'"),
            );
        }

        let code = masked.trim();
        if let Some(caps) = CONTROL_HEADER.captures(code) {
            let continued = code.ends_with('\\') || opens > closes;
            if !continued && !code.ends_with(':') && !has_top_level_colon(code) {
                self.flag_syntax(
                    line,
                    format!("'{}' statement on line {line} is missing a ':' at the end", &caps[1]),
                );
            }
        }
    }
}

impl Analyzer {
    /// Creates an analyzer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an analyzer with custom settings.
    #[must_use]
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Settings in effect.
    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyzes `source` written in `language`.
    ///
    /// Deterministic and side-effect free. Issues are ordered by line and a
    /// variable is never reported twice on the same line.
    #[must_use]
    pub fn analyze(&self, source: &str, language: &str) -> AnalysisReport {
        if !is_python(language) {
            debug!(language, "No analyzer rules for language");
            return AnalysisReport::default();
        }

        let source = clip_to_bytes(source, self.config.max_source_bytes);
        let mut scan = Scan {
            policy: self.config.usage_scan,
            defined: HashSet::new(),
            reported: HashSet::new(),
            issues: Vec::new(),
        };
        let mut open_quote = None;

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let started_in_string = open_quote.is_some();
            let masked = mask_line(raw, &mut open_quote);
            if masked.trim().is_empty() {
                continue;
            }

            let line_defs = definitions(&masked);
            let is_import = IMPORT.is_match(&masked) || FROM_IMPORT.is_match(&masked);
            let spans = print_spans(&masked);

            scan.check_print_arguments(raw, &spans, line, &line_defs);
            if !is_import {
                scan.check_usages(&masked, &spans, line, &line_defs);
            }
            if !started_in_string {
                scan.check_syntax(&masked, line);
            }

            scan.defined.extend(line_defs);
        }

        scan.issues.sort_by_key(|issue| issue.line);
        let suggestions = scan.issues.iter().map(suggest).collect();

        AnalysisReport {
            issues: scan.issues,
            suggestions,
        }
    }
}

fn suggest(issue: &CodeIssue) -> Suggestion {
    let message = match (issue.kind, issue.variable.as_deref()) {
        (IssueKind::UndefinedVariable, Some(name)) => format!(
            "Define `{name}` before line {} (for example `{name} = ...`), or put it in quotes if you meant the text \"{name}\".",
            issue.line
        ),
        (IssueKind::UndefinedVariable, None) => {
            format!("Check the names used on line {}.", issue.line)
        }
        (IssueKind::SyntaxError, _) if issue.message.contains("parentheses") => format!(
            "Make sure every '(' on line {} has a matching ')'.",
            issue.line
        ),
        (IssueKind::SyntaxError, _) => {
            format!("Add a ':' at the end of line {}.", issue.line)
        }
    };
    Suggestion {
        line: issue.line,
        message,
    }
}

/// Analyzes `source` with default settings.
///
/// # Examples
///
/// ```
/// use codetutor_core::analysis::{analyze, IssueKind};
///
/// let report = analyze("print(x)\nx = 5", "python");
/// assert_eq!(report.issues.len(), 1);
/// assert_eq!(report.issues[0].kind, IssueKind::UndefinedVariable);
/// assert_eq!(report.issues[0].line, 1);
/// ```
#[must_use]
pub fn analyze(source: &str, language: &str) -> AnalysisReport {
    Analyzer::new().analyze(source, language)
}
