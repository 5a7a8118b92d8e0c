//! Text normalization for synthesis and fingerprinting.
//!
//! Pure functions, no I/O.

use regex::Regex;
use std::sync::LazyLock;

static RE_MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Canonical form of a sentence for synthesis and cache keying.
///
/// Trims and collapses internal whitespace runs to a single space, so that
/// spreadsheet artifacts (trailing tabs, double spaces) do not produce
/// distinct cache entries for the same spoken content.
pub fn normalize(text: &str) -> String {
    RE_MULTI_SPACE.replace_all(text.trim(), " ").into_owned()
}

/// Whether text is worth sending to the synthesis backend.
///
/// Empty and whitespace-only strings are not; neither is pure punctuation.
pub fn is_speakable(text: &str) -> bool {
    text.chars().any(|c| c.is_alphanumeric())
}
