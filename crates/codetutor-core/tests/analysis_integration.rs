// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the static analyzer and offline feedback using
//! fixture programs.

use codetutor_core::{IssueKind, analyze, build_fallback, parse_error};

const USE_BEFORE_DEFINITION: &str =
    include_str!("../../../tests/python_fixtures/broken/use_before_definition.py");
const MISSING_COLON: &str = include_str!("../../../tests/python_fixtures/broken/missing_colon.py");
const UNBALANCED_PRINT: &str =
    include_str!("../../../tests/python_fixtures/broken/unbalanced_print.py");
const UPPERCASE_TYPO: &str = include_str!("../../../tests/python_fixtures/broken/uppercase_typo.py");
const LOOPS_AND_FUNCTIONS: &str =
    include_str!("../../../tests/python_fixtures/clean/loops_and_functions.py");
const CLASSES_AND_IMPORTS: &str =
    include_str!("../../../tests/python_fixtures/clean/classes_and_imports.py");

#[test]
fn test_use_before_definition_fixture() {
    let report = analyze(USE_BEFORE_DEFINITION, "python");
    assert_eq!(report.issues.len(), 1, "Findings: {:#?}", report.issues);
    let issue = &report.issues[0];
    assert_eq!(issue.kind, IssueKind::UndefinedVariable);
    assert_eq!(issue.line, 1);
    assert_eq!(issue.variable.as_deref(), Some("total"));
}

#[test]
fn test_missing_colon_fixture() {
    let report = analyze(MISSING_COLON, "python");
    assert_eq!(report.issues.len(), 1, "Findings: {:#?}", report.issues);
    assert_eq!(report.issues[0].kind, IssueKind::SyntaxError);
    assert_eq!(report.issues[0].line, 2);
}

#[test]
fn test_unbalanced_print_fixture() {
    let report = analyze(UNBALANCED_PRINT, "python");
    assert!(
        report
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::SyntaxError && i.line == 3),
        "Findings: {:#?}",
        report.issues
    );
}

#[test]
fn test_uppercase_typo_fixture() {
    let report = analyze(UPPERCASE_TYPO, "python");
    let variables: Vec<_> = report
        .issues
        .iter()
        .filter_map(|i| i.variable.as_deref())
        .collect();
    assert_eq!(variables, vec!["Score"]);
}

#[test]
fn test_clean_fixtures_have_no_findings() {
    for (name, source) in [
        ("loops_and_functions.py", LOOPS_AND_FUNCTIONS),
        ("classes_and_imports.py", CLASSES_AND_IMPORTS),
    ] {
        let report = analyze(source, "python");
        assert!(
            report.is_clean(),
            "{name} should produce zero findings, but got: {:#?}",
            report.issues
        );
    }
}

#[test]
fn test_analysis_is_repeatable() {
    for source in [USE_BEFORE_DEFINITION, MISSING_COLON, UNBALANCED_PRINT, UPPERCASE_TYPO] {
        assert_eq!(analyze(source, "python"), analyze(source, "python"));
    }
}

#[test]
fn test_quoted_text_is_not_a_variable() {
    assert!(analyze(r#"print("X")"#, "python").is_clean());

    let report = analyze("print(X)", "python");
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].kind, IssueKind::UndefinedVariable);
    assert_eq!(report.issues[0].variable.as_deref(), Some("X"));
}

#[test]
fn test_print_then_assign_flags_line_one() {
    let report = analyze("print(x)\nx = 5", "python");
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].line, 1);
    assert_eq!(report.issues[0].variable.as_deref(), Some("x"));
}

#[test]
fn test_fallback_for_fixture_error() {
    let error = "Traceback (most recent call last):\n  File \"main.py\", line 1, in <module>\n    print(total)\nNameError: name 'total' is not defined";
    let parsed = parse_error(error);
    assert_eq!(parsed.variable.as_deref(), Some("total"));
    assert_eq!(parsed.line, Some(1));

    let text = build_fallback(USE_BEFORE_DEFINITION, Some(error), &[]);
    assert!(text.contains("NameError"));
    assert!(text.contains("```python"));
    assert!(text.contains("total = ..."));
}

#[test]
fn test_fallback_without_error_uses_analyzer_findings() {
    let text = build_fallback(MISSING_COLON, None, &[]);
    assert!(text.contains("**Line 2**"), "{text}");
    assert!(text.contains("```python"));
}
