// SPDX-License-Identifier: Apache-2.0

//! Text utility functions shared by the analyzer, prompts and transport.

/// Truncates text to a maximum length with a custom suffix.
///
/// Uses character count (not byte count) to safely handle multi-byte UTF-8.
/// The suffix is included in the max length calculation.
///
/// # Examples
///
/// ```
/// use codetutor_core::utils::truncate_with_suffix;
///
/// let text = "This is a very long string that needs truncation";
/// let result = truncate_with_suffix(text, 20, "... [more]");
/// assert!(result.ends_with("... [more]"));
/// assert!(result.chars().count() <= 20);
/// ```
#[must_use]
pub fn truncate_with_suffix(text: &str, max_len: usize, suffix: &str) -> String {
    let char_count = text.chars().count();
    if char_count <= max_len {
        text.to_string()
    } else {
        let suffix_len = suffix.chars().count();
        let truncate_at = max_len.saturating_sub(suffix_len);
        let truncated: String = text.chars().take(truncate_at).collect();
        format!("{truncated}{suffix}")
    }
}

/// Truncates text to a maximum length with default ellipsis suffix "...".
///
/// # Examples
///
/// ```
/// use codetutor_core::utils::truncate;
///
/// assert_eq!(truncate("Hello", 10), "Hello");
///
/// let long = "This is a very long title that exceeds the limit";
/// let result = truncate(long, 20);
/// assert!(result.ends_with("..."));
/// assert!(result.chars().count() <= 20);
/// ```
#[must_use]
pub fn truncate(text: &str, max_len: usize) -> String {
    truncate_with_suffix(text, max_len, "...")
}

/// Returns the longest prefix of `text` that fits in `max_bytes` without
/// splitting a UTF-8 character.
///
/// # Examples
///
/// ```
/// use codetutor_core::utils::clip_to_bytes;
///
/// assert_eq!(clip_to_bytes("héllo", 2), "h");
/// assert_eq!(clip_to_bytes("abc", 10), "abc");
/// ```
#[must_use]
pub fn clip_to_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Whether `text` contains a fenced code block (an opening and a closing
/// triple backtick).
#[must_use]
pub fn has_fenced_block(text: &str) -> bool {
    text.matches("```").count() >= 2
}
