//! Logging utilities for sanitizing multi-line message strings so logs stay single-line.
//! Escapes control characters that otherwise break log readability.

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Truncates very long strings (over `max_preview`) with an ellipsis to cap log noise.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 300; // generous for debug; adjust if needed
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                // Represent other control chars as hex \xNN
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

// UTF-8 safe truncation for log display. Ensures we do not slice inside a multi-byte char.
// If the input exceeds max_bytes, returns an escaped, truncated string with an ellipsis appended.
// Otherwise returns the escaped original string.
pub fn truncate_for_log(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return escape_log(input);
    }
    // Reserve 3 bytes for the ellipsis
    let reserve = 3usize;
    let cut_target = max_bytes.saturating_sub(reserve);
    let mut cut = cut_target;
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = escape_log(&input[..cut]);
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::{escape_log, truncate_for_log};

    #[test]
    fn escapes_newlines() {
        let s = "Line1\nLine2\r\tEnd";
        let esc = escape_log(s);
        assert_eq!(esc, "Line1\\nLine2\\r\\tEnd");
    }

    #[test]
    fn truncate_does_not_split_multibyte() {
        // Shift_JIS era text: "こ" is 3 bytes in UTF-8. max 10, reserve 3 => cut at 7,
        // inside the second kana without the boundary retreat.
        let s = "abcdeこんにちは";
        let out = truncate_for_log(s, 10);
        assert!(out.ends_with("..."));
        assert!(out.is_char_boundary(out.len()));
    }

    #[test]
    fn no_truncation_when_within_limit() {
        let out = truncate_for_log("hello", 10);
        assert_eq!(out, "hello");
    }
}
