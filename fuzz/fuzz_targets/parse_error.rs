// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: 2026 Codetutor Contributors

#![no_main]

use codetutor_core::{build_fallback, parse_error};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = std::str::from_utf8(data) {
        let _ = parse_error(message);
        let _ = build_fallback("print(x)", Some(message), &[]);
    }
});
