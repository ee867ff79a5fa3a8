// SPDX-License-Identifier: Apache-2.0

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

const KEY_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "GROQ_API_KEY",
    "OPENROUTER_API_KEY",
    "HUGGINGFACE_API_KEY",
    "HF_TOKEN",
];

/// A command with no provider credentials and no user config file, so every
/// answer comes from the offline builder without touching the network.
fn offline() -> Command {
    let mut cmd = cargo_bin_cmd!("codetutor");
    for var in KEY_VARS {
        cmd.env_remove(var);
    }
    cmd.env("XDG_CONFIG_HOME", "/nonexistent/codetutor-test-config")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("codetutor");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("codetutor"));
}

#[test]
fn test_help_contains_all_commands() {
    let mut cmd = cargo_bin_cmd!("codetutor");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("explain"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("feedback"))
        .stdout(predicate::str::contains("providers"));
}

#[test]
fn test_providers_json_output() {
    let output = offline()
        .arg("providers")
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("providers --output json should produce valid JSON");
    let providers = json.as_array().expect("providers JSON should be an array");

    let names: Vec<_> = providers
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names, vec!["groq", "gemini", "huggingface", "openrouter"]);
    assert!(providers.iter().all(|p| p["configured"] == false));
}

#[test]
fn test_providers_text_hint() {
    offline()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("Gemini"))
        .stdout(predicate::str::contains("No provider is configured"));
}

#[test]
fn test_offline_feedback_from_stdin() {
    offline()
        .arg("feedback")
        .arg("-")
        .arg("--error")
        .arg("NameError: name 'x' is not defined")
        .write_stdin("print(x)\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("## Corrected Code"))
        .stdout(predicate::str::contains("x = ..."));
}

#[test]
fn test_offline_explain_routes_broken_code_json() {
    let output = offline()
        .arg("explain")
        .arg("-")
        .arg("--output")
        .arg("json")
        .write_stdin("print(x)\nx = 5\n")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["provider"], "fallback");
    assert_eq!(json["isErrorAnalysis"], true);
    assert!(json["warning"].is_string());
    assert!(json["explanation"].as_str().unwrap().contains("**Line 1**"));
}

#[test]
fn test_offline_ask() {
    offline()
        .arg("ask")
        .arg("What is a list comprehension?")
        .arg("--mode")
        .arg("beginner")
        .assert()
        .success()
        .stdout(predicate::str::contains("Study Guide"));
}

#[test]
fn test_unknown_provider_falls_back_to_auto() {
    offline()
        .arg("ask")
        .arg("Why?")
        .arg("--provider")
        .arg("nonexistent")
        .arg("--output")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"provider\": \"fallback\""));
}

#[test]
fn test_missing_file_fails_with_path() {
    offline()
        .arg("explain")
        .arg("does/not/exist.py")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does/not/exist.py"));
}
