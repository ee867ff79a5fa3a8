// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: 2026 Codetutor Contributors

#![no_main]

use codetutor_core::{analyze, build_fallback};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        let report = analyze(source, "python");
        for issue in &report.issues {
            assert!(issue.line >= 1);
        }
        let _ = build_fallback(source, None, &[]);
    }
});
