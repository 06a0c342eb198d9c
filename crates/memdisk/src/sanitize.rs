//! Output sanitizer
//!
//! Strips bracketed control markers (`[MEMORY: ...]`, `[OPERATION: ...]`)
//! that models sometimes echo from their instructions. Markers may span
//! lines; the shortest match is removed.

use regex::Regex;
use std::sync::LazyLock;

static MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)\[(?:MEMORY|OPERATION):.*?\]").ok());

/// Remove control markers and trim. Never fails; applying it twice gives the
/// same result as applying it once.
pub fn sanitize(text: &str) -> String {
    let Some(marker) = MARKER.as_ref() else {
        return text.trim().to_string();
    };
    let mut current = text.to_string();
    loop {
        let next = marker.replace_all(&current, "");
        if next == current {
            break;
        }
        current = next.into_owned();
    }
    current.trim().to_string()
}
