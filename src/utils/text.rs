//! Text Helpers

/// Truncate a string to at most `max_chars` characters, appending an
/// ellipsis when anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}…", truncated.trim_end())
}

/// First line of a buffer, capped at `max_chars`. Used for the short
/// display line of in-progress thought steps.
pub fn first_line_capped(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    truncate_chars(line, max_chars)
}
