// SPDX-License-Identifier: Apache-2.0

//! Input handling for the explain and feedback commands.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Reads source code from `path`, or from stdin when `path` is `-`.
pub fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("Failed to read source from stdin")?;
        return Ok(code);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
