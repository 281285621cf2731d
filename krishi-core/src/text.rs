//! Character-based text helpers.
//!
//! The workflow's size limits (sufficiency floor, grading prefix, context
//! cap, history line cap) are counted in characters, not bytes, so questions
//! and documents in Indic scripts are measured the same as ASCII.

/// Number of characters (Unicode scalar values) in `s`.
pub fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// Truncate `s` to at most `max` characters, always cutting on a char
/// boundary. Returns a borrowed slice when no truncation is needed.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
