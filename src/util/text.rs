//! Sanitising of player-supplied text

pub const MAX_DISPLAY_NAME_LENGTH: usize = 20;
pub const MAX_CHAT_LENGTH: usize = 120;

/// Collapse whitespace, strip control characters and cap the length.
/// Returns `None` when nothing printable is left.
pub fn sanitize_line(text: &str, max_chars: usize) -> Option<String> {
    let cleaned = text
        .split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.chars().take(max_chars).collect())
}

pub fn sanitize_display_name(name: &str, fallback: &str) -> String {
    sanitize_line(name, MAX_DISPLAY_NAME_LENGTH).unwrap_or_else(|| fallback.to_string())
}
