//! Escaping of free-text form fields before they are embedded in HTML-formatted
//! bot messages.

/// Escape `<` and `>` so user input cannot inject markup into an HTML-mode message.
///
/// Absent or empty input yields an empty string. No other character is touched, so
/// `&` and quotes pass through unchanged.
pub fn sanitize(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
