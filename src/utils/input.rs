//! Input utilities for terminal applications

/// Normalize pasted or typed text before it enters an input buffer.
///
/// - CRLF and lone CR become LF
/// - tabs become 4 spaces
/// - other control characters are dropped
pub fn sanitize_text_input(text: &str) -> String {
    let mut sanitized = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                sanitized.push('\n');
            }
            '\t' => sanitized.push_str("    "),
            '\n' => sanitized.push('\n'),
            _ if !c.is_control() => sanitized.push(c),
            _ => {}
        }
    }

    sanitized
}

/// Same as [`sanitize_text_input`] but for single-line prompts: line breaks are dropped.
pub fn sanitize_single_line(text: &str) -> String {
    sanitize_text_input(text).replace('\n', "")
}
