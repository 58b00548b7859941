//! Normalization of raw generation-service output into clean Markdown.
//!
//! Providers wrap output in varying envelopes: code fences around the whole
//! document, explanatory chatter before the first heading, stray whitespace.
//! Each rule here is pure and applied in a fixed order.

#[derive(Debug, Clone, thiserror::Error)]
pub enum NormalizeError {
    #[error("response text was empty after normalization")]
    Empty,
}

/// Run the full rule chain over a raw response.
pub fn normalize(raw: &str) -> Result<String, NormalizeError> {
    let text = strip_code_fence(raw);
    let text = trim_preamble(&text);
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(NormalizeError::Empty);
    }
    Ok(text)
}

/// Remove an enclosing ``` or ```lang fence wrapping the whole response.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return text.to_string();
    }
    // Drop the opening fence line (``` or ```markdown).
    let without_open = match trimmed.find('\n') {
        Some(newline) => &trimmed[newline + 1..],
        None => return String::new(),
    };
    let without_close = without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open);
    without_close.to_string()
}

/// If the text contains a Markdown heading but does not start with one, drop
/// everything before the first `#`. Models sometimes prefix the document
/// with a sentence of commentary.
pub fn trim_preamble(text: &str) -> String {
    if text.trim_start().starts_with('#') {
        return text.to_string();
    }
    match text.find('#') {
        Some(start) => text[start..].to_string(),
        None => text.to_string(),
    }
}
