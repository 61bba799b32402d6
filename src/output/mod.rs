// Output formatting: chat notifications and terminal display.

pub mod notification;
pub mod terminal;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Unlike byte slicing (`&text[..120]`), this respects UTF-8 character boundaries
/// and will never panic on multi-byte characters like emoji or accented letters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Upper bound on an upstream error body quoted in an error message.
const ERROR_BODY_MAX_CHARS: usize = 200;

/// Error bodies can be whole HTML pages; keep log lines readable.
pub fn truncate_error_body(body: &str) -> String {
    truncate_chars(body.trim(), ERROR_BODY_MAX_CHARS)
}
