//! Content normalization helpers.
//!
//! Small, independent primitives shared by the parser and the model:
//! unfolding, quoting, comment extraction and header-name handling.

/// Characters that may never appear in a header name.
const ILLEGAL_NAME_CHARS: &str = ":;(),<>=@?[]{}&\"\\";

/// Removes RFC 5322 line folding.
///
/// Every line break (`\r\n`, `\n` or a lone `\r`) followed by a run of spaces
/// or tabs is removed, and the text on both sides is joined with no
/// separator. Line breaks that are not followed by whitespace are kept.
///
/// ```
/// assert_eq!(headerkit::unfold("a\n         b"), "ab");
/// ```
#[must_use]
pub fn unfold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['\r', '\n']) {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);

        let after_break = tail
            .strip_prefix("\r\n")
            .or_else(|| tail.strip_prefix('\n'))
            .or_else(|| tail.strip_prefix('\r'))
            .unwrap_or(tail);
        let continued = after_break.trim_start_matches([' ', '\t']);

        if continued.len() < after_break.len() {
            rest = continued;
        } else {
            // Bare line break: keep it verbatim.
            out.push_str(&tail[..tail.len() - after_break.len()]);
            rest = after_break;
        }
    }

    out.push_str(rest);
    out
}

/// Returns true if `text` is wrapped in a pair of double quotes.
#[must_use]
pub fn is_quoted(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('"') && text.ends_with('"')
}

/// Wraps `text` in double quotes unless it already is.
///
/// ```
/// assert_eq!(headerkit::quote("hello"), "\"hello\"");
/// assert_eq!(headerkit::quote("\"hello\""), "\"hello\"");
/// assert_eq!(headerkit::quote("\"hello"), "\"\"hello\"");
/// ```
#[must_use]
pub fn quote(text: &str) -> String {
    if is_quoted(text) {
        text.to_string()
    } else {
        format!("\"{text}\"")
    }
}

/// Strips one pair of surrounding double quotes, if both are present.
///
/// ```
/// assert_eq!(headerkit::unquote("\"hello\""), "hello");
/// assert_eq!(headerkit::unquote("\"hello"), "\"hello");
/// assert_eq!(headerkit::unquote("\"\""), "");
/// ```
#[must_use]
pub fn unquote(text: &str) -> &str {
    if is_quoted(text) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Replaces escaped double quotes (`\"`) with plain ones.
#[must_use]
pub fn unescape_double_quote(text: &str) -> String {
    text.replace("\\\"", "\"")
}

/// Escapes every double quote with a backslash, without double-escaping.
#[must_use]
pub fn escape_double_quote(text: &str) -> String {
    unescape_double_quote(text).replace('"', "\\\"")
}

/// Extracts the inner text of every top-level parenthesized comment.
///
/// Nested parentheses stay verbatim inside the enclosing comment, parentheses
/// inside double quotes are not comments, and an unterminated comment runs to
/// the end of the input. Empty comments are skipped.
///
/// ```
/// let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.9; rv:50.0) Gecko/20100101 (hello)";
/// assert_eq!(
///     headerkit::extract_comments(ua),
///     vec!["Macintosh; Intel Mac OS X 10.9; rv:50.0", "hello"]
/// );
/// ```
#[must_use]
pub fn extract_comments(text: &str) -> Vec<&str> {
    let mut comments = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if in_quote && depth == 0 {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quote = false;
            }
            continue;
        }

        match c {
            '"' if depth == 0 => in_quote = true,
            '(' => {
                if depth == 0 {
                    start = index + 1;
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 && index > start {
                    comments.push(&text[start..index]);
                }
            }
            _ => {}
        }
    }

    if depth > 0 && start < text.len() {
        comments.push(&text[start..]);
    }

    comments
}

/// Normalizes a header name or attribute key: lowercase, `-` becomes `_`.
///
/// ```
/// assert_eq!(headerkit::normalize_name("X-content-Type"), "x_content_type");
/// ```
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Compares two names under [`normalize_name`] without allocating.
#[must_use]
pub fn names_match(a: &str, b: &str) -> bool {
    let fold = |c: char| if c == '-' { '_' } else { c.to_ascii_lowercase() };
    a.len() == b.len() && a.chars().map(fold).eq(b.chars().map(fold))
}

/// Capitalizes each dash-separated word of a header name.
///
/// ```
/// assert_eq!(headerkit::prettify_name("x-hEllo-wORLD"), "X-Hello-World");
/// assert_eq!(headerkit::prettify_name("content_type"), "Content-Type");
/// ```
#[must_use]
pub fn prettify_name(name: &str) -> String {
    name.replace('_', "-")
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Checks that `name` is a usable header name.
///
/// A legal name is non-empty visible ASCII without whitespace and without any
/// of the separator characters `: ; ( ) , < > = @ ? [ ] { } & " \`.
#[must_use]
pub fn is_legal_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !ILLEGAL_NAME_CHARS.contains(c))
}

/// Detects content holding a JSON object or list, which is never comma-split.
#[must_use]
pub fn is_json_like(content: &str) -> bool {
    let content = content.trim();
    (content.starts_with('{') && content.ends_with('}'))
        || (content.starts_with('[') && content.ends_with(']'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::manual_string_new)]
mod tests {
    use super::*;

    #[test]
    fn test_unfold() {
        assert_eq!(unfold("a\n         b"), "ab");
        assert_eq!(unfold("a\r\n b"), "ab");
        assert_eq!(unfold("a\r\n\t\tb"), "ab");
        assert_eq!(unfold("a\r\n       b\r\n c"), "abc");
        assert_eq!(
            unfold("___utmvbtouVBFmB=gZg\r\n    XbNOjalT: Lte; path=/"),
            "___utmvbtouVBFmB=gZgXbNOjalT: Lte; path=/"
        );
    }

    #[test]
    fn test_unfold_keeps_bare_line_breaks() {
        assert_eq!(unfold("a\r\nb"), "a\r\nb");
        assert_eq!(unfold("a\nb"), "a\nb");
        assert_eq!(unfold("no folding"), "no folding");
        assert_eq!(unfold(""), "");
        assert_eq!(unfold("trailing\r\n"), "trailing\r\n");
    }

    #[test]
    fn test_quote_unquote() {
        assert_eq!(quote("hello"), "\"hello\"");
        assert_eq!(quote("\"hello\""), "\"hello\"");
        assert_eq!(quote("\"hello"), "\"\"hello\"");
        assert_eq!(unquote("\"hello\""), "hello");
        assert_eq!(unquote("\"hello"), "\"hello");
        assert_eq!(unquote("\"a\""), "a");
        assert_eq!(unquote("\"\""), "");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn test_escape_double_quote() {
        assert_eq!(unescape_double_quote(r#"UTF\"-8"#), r#"UTF"-8"#);
        assert_eq!(unescape_double_quote(r#"UTF"-8"#), r#"UTF"-8"#);
        assert_eq!(escape_double_quote(r#"UTF\"-8"#), r#"UTF\"-8"#);
        assert_eq!(escape_double_quote(r#"UTF"-8"#), r#"UTF\"-8"#);
    }

    #[test]
    fn test_extract_comments() {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.9; rv:50.0) Gecko/20100101 Firefox/50.0 (hello) llll (abc)";
        assert_eq!(
            extract_comments(ua),
            vec!["Macintosh; Intel Mac OS X 10.9; rv:50.0", "hello", "abc"]
        );
    }

    #[test]
    fn test_extract_nested_comments() {
        assert_eq!(extract_comments("a (b (c) d) e"), vec!["b (c) d"]);
        assert_eq!(extract_comments("x \"(not a comment)\" (yes)"), vec!["yes"]);
        assert_eq!(extract_comments("() (open"), vec!["open"]);
        assert!(extract_comments("nothing here").is_empty());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Content-Type"), "content_type");
        assert_eq!(normalize_name("X-content-type"), "x_content_type");
        assert!(names_match("Content-Type", "content_type"));
        assert!(names_match("CONTENT_TYPE", "content-type"));
        assert!(!names_match("content-type", "content-typ"));
    }

    #[test]
    fn test_prettify_name() {
        assert_eq!(prettify_name("x-hEllo-wORLD"), "X-Hello-World");
        assert_eq!(prettify_name("server"), "Server");
        assert_eq!(prettify_name("contEnt-TYPE"), "Content-Type");
        assert_eq!(prettify_name("content_type"), "Content-Type");
    }

    #[test]
    fn test_is_legal_header_name() {
        assert!(is_legal_header_name("hello"));
        assert!(is_legal_header_name("Content-Type"));
        assert!(is_legal_header_name("Hello-World/"));
        assert!(!is_legal_header_name(""));
        assert!(!is_legal_header_name(":hello"));
        assert!(!is_legal_header_name("Hello;"));
        assert!(!is_legal_header_name("Hello\rWorld"));
        assert!(!is_legal_header_name("Hello \tWorld"));
        assert!(!is_legal_header_name("Hello World\""));
        assert!(!is_legal_header_name("\x07"));
        assert!(!is_legal_header_name("caf\u{e9}"));
    }

    #[test]
    fn test_is_json_like() {
        assert!(is_json_like(" {\"a\": 1, \"b\": 2} "));
        assert!(is_json_like("[1, 2]"));
        assert!(!is_json_like("text/html, */*"));
    }
}
