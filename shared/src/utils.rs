//! # Shared Utility Functions
//!
//! Display helpers for conversation cards.
//!
//! - [`preview`] - Collapse a message to one line and cut it with an ellipsis
//! - [`initials`] - Up to two initials for an avatar placeholder
//!
//! ```rust
//! use shared::utils::preview;
//!
//! assert_eq!(preview("see you\nat the contest", 13), "see you at...");
//! ```

/// Collapse whitespace (including newlines) to single spaces and cut the
/// result to at most `max_chars` characters, ending with `...` when cut.
///
/// Counts `char`s, so multi-byte text is never split inside a code point.
///
/// ```rust
/// use shared::utils::preview;
///
/// assert_eq!(preview("short", 10), "short");
/// assert_eq!(preview("a  b\tc", 10), "a b c");
/// assert_eq!(preview("héllo wörld", 8), "héllo...");
/// ```
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    // Leave room for the ellipsis; tiny limits just get the ellipsis
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = collapsed.chars().take(keep).collect();
    let trimmed_len = cut.trim_end().len();
    cut.truncate(trimmed_len);
    format!("{}...", cut)
}

/// Up to two uppercase initials from a display name.
///
/// ```rust
/// use shared::utils::initials;
///
/// assert_eq!(initials("Ada Lovelace"), "AL");
/// assert_eq!(initials("grace"), "G");
/// assert_eq!(initials("  "), "?");
/// ```
pub fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();

    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}
