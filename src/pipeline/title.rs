const FALLBACK_TITLE: &str = "Telegram Update";
const MAX_TITLE_CHARS: usize = 80;

/// Derive a post title from the message text: whitespace collapsed to single
/// spaces, at most 80 characters with an ellipsis when cut.
pub fn build_title(message: &str) -> String {
    let normalized = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    if normalized.chars().count() <= MAX_TITLE_CHARS {
        return normalized;
    }

    let truncated: String = normalized.chars().take(MAX_TITLE_CHARS - 1).collect();
    format!("{}…", truncated.trim_end())
}
