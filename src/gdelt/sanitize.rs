//! Textual repair of DOC API responses before JSON decoding.
//!
//! The service is known to emit stray backslashes, `\'` escapes, unescaped
//! quotes inside titles and raw control characters. [`sanitize_json`] walks
//! the text once, tracking whether it is inside a string literal, and
//! rewrites only what would make a JSON decoder reject the document.

/// Repair known encoding defects in a JSON document.
///
/// Inside string literals:
/// - a backslash not starting a valid escape becomes `\\`
/// - `\'` becomes `'`
/// - a `"` not followed by `,` `:` `}` `]` or end of input becomes `\"`
/// - control characters below U+0020 become `\u00XX`
///
/// Text outside string literals is copied unchanged.
pub fn sanitize_json(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 16);
    let mut chars = raw.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => {
                let next_significant = chars.clone().find(|n| !n.is_whitespace());
                if matches!(next_significant, None | Some(',' | ':' | '}' | ']')) {
                    in_string = false;
                    out.push('"');
                } else {
                    out.push_str("\\\"");
                }
            }
            '\\' => match chars.peek().copied() {
                Some('\'') => {
                    chars.next();
                    out.push('\'');
                }
                Some(n @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't')) => {
                    chars.next();
                    out.push('\\');
                    out.push(n);
                }
                Some('u') if is_unicode_escape(chars.clone().skip(1).take(4)) => {
                    chars.next();
                    out.push_str("\\u");
                }
                _ => out.push_str("\\\\"),
            },
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn is_unicode_escape(mut digits: impl Iterator<Item = char>) -> bool {
    (0..4).all(|_| digits.next().is_some_and(|d| d.is_ascii_hexdigit()))
}
