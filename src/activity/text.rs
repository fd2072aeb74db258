//! Display-length helpers

/// Marker appended to truncated text (a single character)
pub const ELLIPSIS: char = '…';

/// Truncate to at most `max_chars` characters (not bytes), ending with
/// [`ELLIPSIS`] when anything was cut
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Replace every run of whitespace (including newlines) with one space
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace, then truncate
pub fn clean_label(s: &str, max_chars: usize) -> String {
    truncate_chars(&collapse_whitespace(s), max_chars)
}
