// SPDX-License-Identifier: Apache-2.0

//! Deterministic, templated feedback used when no provider answers.
//!
//! Every output ends with a disclaimer so callers can tell templated text
//! apart from model output.

use std::fmt::Write;

use super::analyzer::{Analyzer, code_end, paren_delta};
use super::error_parser::{ErrorKind, ParsedError, parse_error};
use super::types::{CodeIssue, IssueKind, Suggestion};
use crate::ai::types::ProviderFailure;
use crate::utils::truncate;

const DISCLAIMER: &str = "This response was generated automatically by the offline analyzer, \
not by an AI tutor. It follows fixed templates and may miss context.";

/// Builds fallback feedback for Python source.
///
/// See [`build_fallback_with`] for other languages or analyzer settings.
///
/// # Examples
///
/// ```
/// use codetutor_core::analysis::build_fallback;
///
/// let text = build_fallback("print(x)", Some("NameError: name 'x' is not defined"), &[]);
/// assert!(text.contains("```python"));
/// assert!(text.contains("`x`"));
/// ```
#[must_use]
pub fn build_fallback(
    code: &str,
    error_message: Option<&str>,
    upstream_errors: &[ProviderFailure],
) -> String {
    build_fallback_with(&Analyzer::new(), code, "python", error_message, upstream_errors)
}

/// Builds fallback feedback.
///
/// With an error message, renders the four-part template for its error type.
/// Without one, renders analyzer findings, or general tips when the code
/// looks fine. The disclaimer is always appended.
#[must_use]
pub fn build_fallback_with(
    analyzer: &Analyzer,
    code: &str,
    language: &str,
    error_message: Option<&str>,
    upstream_errors: &[ProviderFailure],
) -> String {
    let error_message = error_message.map(str::trim).filter(|m| !m.is_empty());

    let body = match error_message {
        Some(message) => render_error(&parse_error(message), code, language),
        None => {
            let report = analyzer.analyze(code, language);
            if report.is_clean() {
                render_clean(language)
            } else {
                let mut out = render_issues(&report.issues, &report.suggestions);
                let fixed = apply_fixes(code, &report.issues);
                if fixed != code {
                    let _ = write!(out, "\n## Corrected Code\n\n{}", fence(language, &fixed));
                }
                out
            }
        }
    };

    format!("{body}\n{}", disclaimer(upstream_errors))
}

/// Offline guidance for a question no provider could answer.
#[must_use]
pub fn build_answer_fallback(question: &str, upstream_errors: &[ProviderFailure]) -> String {
    let question = truncate(question.trim(), 200);
    format!(
        "## Study Guide\n\n\
No AI tutor could answer \"{question}\" right now. While you wait, these steps usually help:\n\n\
1. Break the question into the smallest piece you can test on its own.\n\
2. Write a tiny experiment in the interpreter and print intermediate values.\n\
3. Read the official documentation for the function or keyword involved.\n\
4. If you get an error, copy its last line; it names the error type and the cause.\n\n\
Try asking again in a few minutes.\n\n{}",
        disclaimer(upstream_errors)
    )
}

/// Renders analyzer findings as a numbered markdown list.
#[must_use]
pub fn render_issues(issues: &[CodeIssue], suggestions: &[Suggestion]) -> String {
    let mut out = format!(
        "## Issues Found\n\nThe analyzer spotted {} possible problem{} in your code:\n\n",
        issues.len(),
        if issues.len() == 1 { "" } else { "s" }
    );

    for (index, issue) in issues.iter().enumerate() {
        let label = match issue.kind {
            IssueKind::UndefinedVariable => "undefined variable",
            IssueKind::SyntaxError => "syntax",
        };
        let _ = writeln!(
            out,
            "{}. **Line {}** ({label}): {}",
            index + 1,
            issue.line,
            issue.message
        );
        if let Some(suggestion) = suggestions.get(index).filter(|s| s.line == issue.line) {
            let _ = writeln!(out, "   - Try: {}", suggestion.message);
        }
    }

    out
}

fn disclaimer(upstream_errors: &[ProviderFailure]) -> String {
    let mut out = format!("---\n\n> **Note:** {DISCLAIMER}\n");
    if !upstream_errors.is_empty() {
        out.push_str(">\n> Providers that could not answer:\n");
        for failure in upstream_errors {
            let _ = writeln!(out, "> - {}: {}", failure.provider, failure.error);
        }
    }
    out
}

fn fence(language: &str, code: &str) -> String {
    let tag = language.trim().to_ascii_lowercase();
    format!("```{tag}\n{}\n```\n", code.trim_end())
}

fn line_note(parsed: &ParsedError) -> String {
    parsed
        .line
        .map(|n| format!(" on line {n}"))
        .unwrap_or_default()
}

fn render_error(parsed: &ParsedError, code: &str, language: &str) -> String {
    let (what, why, how, corrected) = match &parsed.kind {
        ErrorKind::Name => name_error(parsed, code),
        ErrorKind::Type => type_error(parsed),
        ErrorKind::Syntax => syntax_error(parsed, code, language),
        ErrorKind::Other(_) | ErrorKind::Unrecognized => other_error(parsed, code),
    };

    format!(
        "## What Went Wrong\n\n{what}\n\n## Why\n\n{why}\n\n## How to Fix\n\n{how}\n\n## Corrected Code\n\n{}",
        fence(language, &corrected)
    )
}

fn name_error(parsed: &ParsedError, code: &str) -> (String, String, String, String) {
    let Some(name) = parsed.variable.as_deref() else {
        return unnamed_name_error(parsed, code);
    };
    let what = format!(
        "Python stopped{} because it found `{name}`, but nothing with that name exists yet.",
        line_note(parsed)
    );
    let why = format!(
        "Python reads your program from top to bottom. A variable has to be given a value \
before the line that uses it. Without quotes, `{name}` is treated as a variable name; \
with quotes, \"{name}\" is just text."
    );
    let how = format!(
        "1. If `{name}` is a variable, assign it a value above the line that uses it.\n\
2. If you meant the word itself, wrap it in quotes: `\"{name}\"`.\n\
3. Check the spelling and capitalization; `{name}` and `{}` are different names.",
        flip_case(name)
    );

    let corrected = if code.trim().is_empty() || !mentions(code, name) {
        format!("{name} = \"hello\"  # define it first\nprint({name})")
    } else {
        insert_definitions(code, &[(name, first_mention(code, name))])
    };

    (what, why, how, corrected)
}

/// A `NameError` whose message does not say which name was missing.
fn unnamed_name_error(parsed: &ParsedError, code: &str) -> (String, String, String, String) {
    let what = format!(
        "Python stopped{} because the program uses a name that does not exist yet.",
        line_note(parsed)
    );
    let why = "Python reads your program from top to bottom. A variable has to be given a \
value before the line that uses it, and words without quotes are treated as variable names."
        .to_string();
    let how = "1. Find the line the error points to and list the names it uses.\n\
2. Make sure each one is assigned a value above that line.\n\
3. Check spelling and capitalization, and put quotes around words meant as text."
        .to_string();

    let undefined: Vec<(String, usize)> = Analyzer::new()
        .analyze(code, "python")
        .issues
        .into_iter()
        .filter(|i| i.kind == IssueKind::UndefinedVariable)
        .filter_map(|i| i.variable.map(|v| (v, i.line)))
        .collect();
    let corrected = if code.trim().is_empty() {
        "message = \"hello\"  # define it first\nprint(message)".to_string()
    } else if undefined.is_empty() {
        code.to_string()
    } else {
        let targets: Vec<(&str, usize)> =
            undefined.iter().map(|(v, line)| (v.as_str(), *line)).collect();
        insert_definitions(code, &targets)
    };

    (what, why, how, corrected)
}

fn type_error(parsed: &ParsedError) -> (String, String, String, String) {
    let what = format!(
        "An operation{} received a value of the wrong type: {}",
        line_note(parsed),
        parsed.message
    );
    let why = "Python does not convert between types for you. Joining text with a number, \
for example `\"Age: \" + 5`, fails because one side is a `str` and the other an `int`. \
Remember that `input()` always returns text."
        .to_string();
    let how = "1. Convert values explicitly with `str()`, `int()` or `float()`.\n\
2. Prefer f-strings when mixing text and numbers: `f\"Age: {age}\"`.\n\
3. Print `type(value)` to see what you actually have."
        .to_string();
    let corrected = "age = 5\nprint(\"Age: \" + str(age))\nprint(f\"Age: {age}\")".to_string();
    (what, why, how, corrected)
}

fn syntax_error(parsed: &ParsedError, code: &str, language: &str) -> (String, String, String, String) {
    let what = format!(
        "Python could not read your program{}: {}",
        line_note(parsed),
        parsed.message
    );
    let why = "Syntax errors are found before anything runs. Python needs every block header \
to end with a colon and every bracket or quote to be closed."
        .to_string();
    let how = "Check these, starting at the reported line and the one above it:\n\n\
- [ ] `if`, `elif`, `else`, `for`, `while`, `def`, `class`, `try` and `except` lines end with `:`\n\
- [ ] every `(`, `[` and `{` has a matching closing bracket\n\
- [ ] every quote is closed\n\
- [ ] comparisons use `==`, assignments use `=`\n\
- [ ] the block under a header is indented"
        .to_string();

    let issues = Analyzer::new().analyze(code, language).issues;
    let fixed = apply_fixes(code, &issues);
    let corrected = if fixed != code && !fixed.trim().is_empty() {
        fixed
    } else {
        "if score > 50:\n    print(\"You passed!\")".to_string()
    };

    (what, why, how, corrected)
}

fn other_error(parsed: &ParsedError, code: &str) -> (String, String, String, String) {
    let label = parsed.kind.label();
    let what = format!("Your program raised a `{label}`{}: {}", line_note(parsed), parsed.message);
    let why = "The last line of an error message names the problem and the lines above it \
show where it happened. Read it from the bottom up."
        .to_string();
    let how = "1. Find the line the message points to.\n\
2. Print the values used on that line just before it runs.\n\
3. Compare them with what you expected and adjust the code."
        .to_string();

    let corrected = match parsed.line {
        Some(target) if !code.trim().is_empty() => code
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i + 1 == target {
                    format!("{line}  # <- check this line")
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ if !code.trim().is_empty() => code.to_string(),
        _ => "value = 10\nprint(value)".to_string(),
    };

    (what, why, how, corrected)
}

fn render_clean(language: &str) -> String {
    format!(
        "## Looks Fine\n\n\
The offline analyzer did not spot any common {language} mistakes in this code.\n\n\
General tips:\n\n\
- Give variables descriptive names.\n\
- Test small pieces as you go and print intermediate values.\n\
- Read error messages from the bottom up.\n"
    )
}

fn flip_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => first.to_lowercase().chain(chars).collect(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_word_at(line: &str, start: usize, name: &str) -> bool {
    let before = line[..start].chars().next_back();
    let after = line[start + name.len()..].chars().next();
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
}

fn line_mentions(line: &str, name: &str) -> bool {
    line.match_indices(name)
        .any(|(start, _)| is_word_at(line, start, name))
}

fn mentions(code: &str, name: &str) -> bool {
    code.lines().any(|line| line_mentions(line, name))
}

fn first_mention(code: &str, name: &str) -> usize {
    code.lines()
        .position(|line| line_mentions(line, name))
        .map_or(1, |i| i + 1)
}

/// Inserts `name = ...` above the given 1-indexed lines, matching indentation.
fn insert_definitions(code: &str, targets: &[(&str, usize)]) -> String {
    let mut out = Vec::new();
    for (index, line) in code.lines().enumerate() {
        let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
        for (name, _) in targets.iter().filter(|(_, at)| *at == index + 1) {
            out.push(format!("{indent}{name} = ...  # give {name} a value before using it"));
        }
        out.push(line.to_string());
    }
    out.join("\n")
}

/// Inserts `fix` where the code on `line` ends, keeping any trailing comment.
fn insert_before_comment(line: &str, fix: &str) -> String {
    let (code, rest) = line.split_at(code_end(line));
    if rest.trim().is_empty() {
        format!("{code}{fix}")
    } else {
        format!("{code}{fix}{rest}")
    }
}

/// Applies the obvious mechanical fix for each issue.
fn apply_fixes(code: &str, issues: &[CodeIssue]) -> String {
    let mut seen = Vec::new();
    let targets: Vec<(&str, usize)> = issues
        .iter()
        .filter(|i| i.kind == IssueKind::UndefinedVariable)
        .filter_map(|i| i.variable.as_deref().map(|v| (v, i.line)))
        .filter(|(v, _)| {
            if seen.contains(v) {
                false
            } else {
                seen.push(*v);
                true
            }
        })
        .collect();

    let patched: Vec<String> = code
        .lines()
        .enumerate()
        .map(|(index, line)| {
            let number = index + 1;
            let mut line = line.to_string();
            for issue in issues
                .iter()
                .filter(|i| i.line == number && i.kind == IssueKind::SyntaxError)
            {
                let fix = if issue.message.contains("missing a ':'") {
                    ":".to_string()
                } else {
                    ")".repeat(paren_delta(&line).max(0).unsigned_abs())
                };
                line = insert_before_comment(&line, &fix);
            }
            line
        })
        .collect();

    insert_definitions(&patched.join("\n"), &targets)
}
