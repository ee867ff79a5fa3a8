// SPDX-License-Identifier: Apache-2.0

//! Keyword-based concept detection.
//!
//! Concepts and examples attached to a result are derived locally from the
//! input text, not from the upstream response, so every provider (and the
//! fallback) reports them the same way.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum concepts reported per result.
pub const MAX_CONCEPTS: usize = 5;

struct ConceptRule {
    name: &'static str,
    example: &'static str,
    pattern: Regex,
}

fn rules(table: &[(&'static str, &'static str, &str)]) -> Vec<ConceptRule> {
    table
        .iter()
        .map(|&(name, example, pattern)| ConceptRule {
            name,
            example,
            pattern: Regex::new(pattern).expect("concept regex must compile"),
        })
        .collect()
}

static PYTHON: LazyLock<Vec<ConceptRule>> = LazyLock::new(|| {
    rules(&[
        (
            "List comprehensions",
            "squares = [n * n for n in range(5)]",
            r"\[[^\]]*\bfor\b[^\]]*\bin\b|(?i)\blist comprehension",
        ),
        ("Functions", "def greet(name):\n    return f\"Hello, {name}!\"", r"\bdef\s+\w+|(?i)\bfunctions?\b"),
        ("Classes", "class Dog:\n    def __init__(self, name):\n        self.name = name", r"\bclass\s+\w+|(?i)\bclass(es)?\b|\bobjects?\b"),
        ("Loops", "for i in range(3):\n    print(i)", r"\bfor\s+\w+.*\bin\b|\bwhile\b|(?i)\bloops?\b"),
        ("Conditionals", "if age >= 18:\n    print(\"adult\")\nelse:\n    print(\"minor\")", r"\bif\b|\belif\b|(?i)\bconditions?\b"),
        ("Exceptions", "try:\n    int(\"x\")\nexcept ValueError:\n    print(\"not a number\")", r"\btry\s*:|\bexcept\b|\braise\b|(?i)\bexceptions?\b|\berrors?\b"),
        ("Dictionaries", "ages = {\"ana\": 20}\nprint(ages[\"ana\"])", r"\{\s*['\x22\w]+\s*:|\bdict\(|(?i)\bdictionar(y|ies)\b"),
        ("Lists", "fruits = [\"apple\", \"pear\"]\nfruits.append(\"fig\")", r"=\s*\[|\.append\(|(?i)\blists?\b"),
        ("String formatting", "name = \"Ana\"\nprint(f\"Hi {name}\")", r#"\bf["']|\.format\(|(?i)\bf-?strings?\b"#),
        ("Modules and imports", "import math\nprint(math.sqrt(16))", r"^\s*(from\s+\S+\s+)?import\s|(?i)\bmodules?\b"),
        ("User input", "name = input(\"Name? \")", r"\binput\("),
        ("Variables", "count = 0\ncount = count + 1", r"(?m)^\s*[A-Za-z_]\w*\s*=[^=]|(?i)\bvariables?\b"),
        ("Output", "print(\"Hello, world!\")", r"\bprint\("),
    ])
});

static JAVASCRIPT: LazyLock<Vec<ConceptRule>> = LazyLock::new(|| {
    rules(&[
        ("Async and promises", "const data = await fetch(url).then(r => r.json());", r"\basync\b|\bawait\b|\bPromise\b|\.then\("),
        ("Arrow functions", "const add = (a, b) => a + b;", r"=>"),
        ("Functions", "function greet(name) {\n  return `Hello, ${name}!`;\n}", r"\bfunction\b|(?i)\bfunctions?\b"),
        ("Classes", "class Dog {\n  constructor(name) { this.name = name; }\n}", r"\bclass\s+\w+|(?i)\bclass(es)?\b"),
        ("Loops", "for (let i = 0; i < 3; i++) {\n  console.log(i);\n}", r"\bfor\s*\(|\bwhile\s*\(|\.forEach\(|(?i)\bloops?\b"),
        ("Conditionals", "if (age >= 18) {\n  console.log(\"adult\");\n}", r"\bif\s*\(|\?.*:|(?i)\bconditions?\b"),
        ("Error handling", "try {\n  JSON.parse(text);\n} catch (err) {\n  console.error(err);\n}", r"\btry\s*\{|\bcatch\b|\bthrow\b"),
        ("Arrays", "const fruits = [\"apple\", \"pear\"];\nfruits.push(\"fig\");", r"=\s*\[|\.push\(|\.map\(|\.filter\(|(?i)\barrays?\b"),
        ("Objects", "const user = { name: \"Ana\", age: 20 };", r"=\s*\{|(?i)\bobjects?\b"),
        ("Template literals", "console.log(`Hi ${name}`);", r"`[^`]*\$\{"),
        ("Variables", "let count = 0;\ncount += 1;", r"\b(let|const|var)\s+\w+|(?i)\bvariables?\b"),
        ("Output", "console.log(\"Hello, world!\");", r"\bconsole\.log\("),
    ])
});

static GENERIC: LazyLock<Vec<ConceptRule>> = LazyLock::new(|| {
    rules(&[
        ("Functions", "A function groups steps under a name so you can reuse them.", r"(?i)\b(def|function|fn|func)\b"),
        ("Classes", "A class bundles data with the code that works on it.", r"(?i)\b(class|struct)\b"),
        ("Loops", "A loop repeats a block of code.", r"(?i)\b(for|while|loop)\b"),
        ("Conditionals", "A conditional runs code only when a test is true.", r"(?i)\b(if|else|switch|match)\b"),
        ("Error handling", "Error handling lets a program recover when something fails.", r"(?i)\b(try|catch|except|throw|raise)\b"),
    ])
});

fn table_for(language: &str) -> &'static [ConceptRule] {
    match language.trim().to_ascii_lowercase().as_str() {
        "python" | "py" | "python3" => &PYTHON,
        "javascript" | "js" | "typescript" | "ts" | "node" => &JAVASCRIPT,
        _ => &GENERIC,
    }
}

/// Concepts detected in a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Concepts {
    /// Concept names, most specific first.
    pub concepts: Vec<String>,
    /// One short example per concept, same order.
    pub examples: Vec<String>,
}

/// Detects up to [`MAX_CONCEPTS`] concepts in `text`.
///
/// # Examples
///
/// ```
/// use codetutor_core::ai::concepts::extract;
///
/// let found = extract("for i in range(3):\n    print(i)", "python");
/// assert!(found.concepts.contains(&"Loops".to_string()));
/// assert_eq!(found.concepts.len(), found.examples.len());
/// ```
#[must_use]
pub fn extract(text: &str, language: &str) -> Concepts {
    let mut found = Concepts::default();
    for rule in table_for(language) {
        if found.concepts.len() == MAX_CONCEPTS {
            break;
        }
        if rule.pattern.is_match(text) {
            found.concepts.push(rule.name.to_string());
            found.examples.push(rule.example.to_string());
        }
    }
    found
}
