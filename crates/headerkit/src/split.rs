//! Quoting-aware splitting of header content.
//!
//! Header values are split in two passes: first on top-level commas, which
//! separate logically distinct entries squashed onto one line, then on
//! semicolons, which separate the members of a single entry. In both passes a
//! delimiter only counts when it appears outside of:
//!
//! - a double-quoted span (`"46,43"`), where `\"` does not close the span,
//! - a parenthesized comment (`(Macintosh; Intel Mac OS X 10.9)`),
//! - a bracketed span (`[::1]`),
//! - for commas only, the comma right after a weekday abbreviation in an
//!   HTTP date (`Wed, 15-Apr-2020 21:27:31 GMT`).
//!
//! Unterminated spans are closed by the end of the input, so the scan never
//! fails.

/// Weekday abbreviations that may precede a comma inside an HTTP date.
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Nesting state carried through a single left-to-right scan.
#[derive(Debug, Default, Clone, Copy)]
struct ScanState {
    in_quote: bool,
    escaped: bool,
    paren_depth: usize,
    bracket_depth: usize,
}

impl ScanState {
    /// Feeds one character, returning true if it sits at the top level and is
    /// not itself a structural character.
    fn feed(&mut self, c: char) -> bool {
        if self.in_quote {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_quote = false;
            }
            return false;
        }

        match c {
            '"' => self.in_quote = true,
            '(' => self.paren_depth += 1,
            ')' => self.paren_depth = self.paren_depth.saturating_sub(1),
            '[' => self.bracket_depth += 1,
            ']' => self.bracket_depth = self.bracket_depth.saturating_sub(1),
            _ => return self.paren_depth == 0 && self.bracket_depth == 0,
        }

        false
    }
}

/// Splits `text` on `delimiter`, ignoring delimiters inside quoted,
/// parenthesized or bracketed spans.
///
/// When the delimiter is a comma, a comma directly following a weekday
/// abbreviation is kept, so HTTP dates stay whole. Each segment is trimmed.
/// Empty segments produced by consecutive delimiters are kept, segments made
/// only of whitespace are dropped, and empty input yields no segment at all.
///
/// ```
/// use headerkit::split_respecting_quotes;
///
/// assert_eq!(
///     split_respecting_quotes("text/html; charset=UTF-8", ';'),
///     vec!["text/html", "charset=UTF-8"]
/// );
/// ```
#[must_use]
pub fn split_respecting_quotes(text: &str, delimiter: char) -> Vec<&str> {
    let mut segments = Vec::new();

    if text.is_empty() {
        return segments;
    }

    let mut state = ScanState::default();
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if !state.feed(c) || c != delimiter {
            continue;
        }

        if delimiter == ',' && follows_weekday(&text[..index]) {
            continue;
        }

        push_segment(&mut segments, &text[start..index]);
        start = index + c.len_utf8();
    }

    push_segment(&mut segments, &text[start..]);

    segments
}

/// Splits a header value into its comma-separated entries.
#[must_use]
pub fn split_entries(text: &str) -> Vec<&str> {
    split_respecting_quotes(text, ',')
}

/// Splits a single entry into its semicolon-separated members.
#[must_use]
pub fn split_members(text: &str) -> Vec<&str> {
    split_respecting_quotes(text, ';')
}

fn push_segment<'a>(segments: &mut Vec<&'a str>, raw: &'a str) {
    if raw.is_empty() {
        segments.push(raw);
        return;
    }

    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed);
    }
}

/// Checks whether `prefix` ends with a standalone weekday abbreviation.
fn follows_weekday(prefix: &str) -> bool {
    WEEKDAYS.iter().any(|day| {
        prefix.strip_suffix(day).is_some_and(|before| {
            before
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_ascii_alphanumeric())
        })
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::needless_collect,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_split_alt_svc_on_comma() {
        let value = r#"quic=":443"; ma=2592000; v="46,43", h3-Q050=":443"; ma=2592000"#;
        assert_eq!(
            split_respecting_quotes(value, ','),
            vec![r#"quic=":443"; ma=2592000; v="46,43""#, r#"h3-Q050=":443"; ma=2592000"#]
        );
    }

    #[test]
    fn test_split_keeps_dates_whole() {
        let value = "Wed, 15-Apr-2020 21:27:31 GMT, Fri, 01-Jan-2038 00:00:00 GMT";
        assert_eq!(
            split_entries(value),
            vec!["Wed, 15-Apr-2020 21:27:31 GMT", "Fri, 01-Jan-2038 00:00:00 GMT"]
        );
    }

    #[test]
    fn test_split_cookie_with_expiry() {
        let value = "1P_JAR=2020-03-16-21; expires=Wed, 15-Apr-2020 21:27:31 GMT; path=/";
        assert_eq!(split_entries(value), vec![value]);
        assert_eq!(
            split_members(value),
            vec!["1P_JAR=2020-03-16-21", "expires=Wed, 15-Apr-2020 21:27:31 GMT", "path=/"]
        );
    }

    #[test]
    fn test_weekday_needs_word_boundary() {
        assert_eq!(split_entries("salmon, trout"), vec!["salmon", "trout"]);
        assert_eq!(split_entries("Mon, 1 Jan"), vec!["Mon, 1 Jan"]);
    }

    #[test]
    fn test_weekday_exception_only_for_comma() {
        assert_eq!(split_respecting_quotes("Wed;x", ';'), vec!["Wed", "x"]);
    }

    #[test]
    fn test_split_ignores_comments() {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.9; rv:50.0) Gecko/20100101 Firefox/50.0";
        assert_eq!(split_members(ua), vec![ua]);
    }

    #[test]
    fn test_split_nested_comments_and_brackets() {
        assert_eq!(
            split_members("a (b; (c; d); e); f"),
            vec!["a (b; (c; d); e)", "f"]
        );
        assert_eq!(split_entries("for=[::1], for=x"), vec!["for=[::1]", "for=x"]);
        assert_eq!(split_entries("[a,b],c"), vec!["[a,b]", "c"]);
    }

    #[test]
    fn test_split_escaped_quote() {
        assert_eq!(
            split_members(r#"text/html; charset="UTF-\"8;"; x"#),
            vec!["text/html", r#"charset="UTF-\"8;""#, "x"]
        );
    }

    #[test]
    fn test_split_unterminated_spans() {
        assert_eq!(split_members(r#"a; b="c; d"#), vec!["a", r#"b="c; d"#]);
        assert_eq!(split_members("a; (b; c"), vec!["a", "(b; c"]);
        assert_eq!(split_members("a); b"), vec!["a)", "b"]);
    }

    #[test]
    fn test_split_edge_cases() {
        assert!(split_members("").is_empty());
        assert!(split_members("   ").is_empty());
        assert_eq!(split_members("single"), vec!["single"]);
        assert_eq!(split_members("a;;b"), vec!["a", "", "b"]);
        assert_eq!(split_members("a; ;b"), vec!["a", "b"]);
        assert_eq!(split_members("a;"), vec!["a", ""]);
        assert_eq!(split_members("  spaced  out ; y"), vec!["spaced  out", "y"]);
    }

    #[test]
    fn test_split_accept() {
        assert_eq!(
            split_entries("text/html, application/xhtml+xml, application/xml;q=0.9, */*;q=0.8"),
            vec!["text/html", "application/xhtml+xml", "application/xml;q=0.9", "*/*;q=0.8"]
        );
    }

    #[test]
    fn test_split_multibyte() {
        assert_eq!(split_entries("死の, 漢字"), vec!["死の", "漢字"]);
    }
}
