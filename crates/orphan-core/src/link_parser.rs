
use crate::link_name::LinkName;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

// Compile regex once, reuse across calls.
// Lazy: a link ends at the first `]]`. Single brackets inside are kept, and a
// link never spans lines.
static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[(.*?)\]\]").unwrap()
});

/// Normalize the raw text between `[[` and `]]`.
///
/// Splits at the first `|` and discards the alias, then trims. Returns `None`
/// when nothing is left.
pub fn normalize_link_target(raw: &str) -> Option<&str> {
    let target = match raw.find('|') {
        Some(pipe_idx) => &raw[..pipe_idx],
        None => raw,
    };
    let trimmed = target.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Extract the set of link names referenced by `markdown`.
///
/// Matches are non-overlapping and scanned left to right. Malformed markers are
/// skipped silently.
pub fn extract_link_names(markdown: &str) -> HashSet<LinkName> {
    WIKILINK_RE
        .captures_iter(markdown)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| normalize_link_target(m.as_str()))
        .map(LinkName::from)
        .collect()
}
