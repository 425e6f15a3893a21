/// Result of a truncation operation
#[derive(Debug, Clone, PartialEq)]
pub struct TruncateResult {
    pub content: String,
    pub truncated: bool,
}

/// Keep at most `max_chars` characters of `content`, marking the cut
pub fn truncate_text_by_chars(content: String, max_chars: usize) -> TruncateResult {
    let total_chars = content.chars().count();
    if total_chars <= max_chars {
        return TruncateResult {
            content,
            truncated: false,
        };
    }

    let mut result: String = content.chars().take(max_chars).collect();
    result.push_str(&format!(
        "\n\n---\ntruncated [{}/{} chars]",
        max_chars, total_chars
    ));

    TruncateResult {
        content: result,
        truncated: true,
    }
}
