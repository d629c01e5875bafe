//! Parsing of raw header blocks into the [`Headers`] model.
//!
//! Parsing never fails. Lines that cannot be headers are skipped and logged at
//! debug level; the rest becomes an ordered list of headers, with
//! comma-joined values exploded into one header per entry.

use std::borrow::Cow;

use crate::attributes::Member;
use crate::encoding::{decode_encoded_words, extract_header_block};
use crate::header::Header;
use crate::headers::Headers;
use crate::normalize::{is_json_like, is_legal_header_name, names_match};
use crate::options::ParseOptions;
use crate::split::{split_entries, split_members};

/// The one header whose value is never split on commas.
const UNSPLIT_HEADER: &str = "subject";

/// Splits a raw header value into entries, then each entry into members.
///
/// JSON-like values are kept as a single entry holding a single member.
///
/// ```
/// let entries = headerkit::tokenize_entries("text/html, application/xml;q=0.9");
/// let members: Vec<Vec<&str>> = entries
///     .iter()
///     .map(|entry| entry.iter().map(|m| m.as_str()).collect())
///     .collect();
/// assert_eq!(members, vec![vec!["text/html"], vec!["application/xml", "q=0.9"]]);
/// ```
#[must_use]
pub fn tokenize_entries(raw_value: &str) -> Vec<Vec<Member<'_>>> {
    if is_json_like(raw_value) {
        return vec![vec![Member::new(raw_value.trim())]];
    }

    split_entries(raw_value)
        .into_iter()
        .map(|entry| split_members(entry).into_iter().map(Member::new).collect())
        .collect()
}

/// Parses a header block with the default options.
///
/// ```
/// let headers = headerkit::parse("Content-Type: text/html; charset=UTF-8\r\nVary: Accept");
/// assert_eq!(headers.len(), 2);
/// assert_eq!(headers.to_dict().get("vary"), Some("Accept"));
/// ```
#[must_use]
pub fn parse(text: &str) -> Headers {
    parse_with(text, &ParseOptions::default())
}

/// Parses a header block.
///
/// Lines are separated by CRLF, LF or a lone CR. A line starting with a space
/// or tab continues the previous header; the raw content keeps the folding.
/// A blank line after the first header ends the block. Status and request
/// lines, lines without a colon and lines with an illegal name are skipped.
#[must_use]
pub fn parse_with(text: &str, options: &ParseOptions) -> Headers {
    let mut headers = Headers::with_shape(options.output_shape);

    for field in raw_fields(text, options.skip_leading_non_headers) {
        let value = if options.decode_encoded_words {
            decode_encoded_words(field.value)
        } else {
            Cow::Borrowed(field.value)
        };

        for entry in split_header_value(field.name, &value, options.split_entries) {
            headers.push(Header::from_parts(
                field.name.to_string(),
                entry.to_string(),
                options.output_shape,
            ));
        }
    }

    tracing::trace!(count = headers.len(), "parsed header block");
    headers
}

/// Parses the header block at the start of a raw byte payload with the
/// default options. The body, if any, is ignored.
#[must_use]
pub fn parse_bytes(payload: &[u8]) -> Headers {
    parse_bytes_with(payload, &ParseOptions::default())
}

/// Parses the header block at the start of a raw byte payload.
#[must_use]
pub fn parse_bytes_with(payload: &[u8], options: &ParseOptions) -> Headers {
    let block = extract_header_block(payload);
    if !block.fully_decoded {
        tracing::debug!(
            body_len = block.body.len(),
            "header block truncated at last decodable line"
        );
    }
    parse_with(block.headers, options)
}

/// Splits a value into the contents of the headers it stands for.
///
/// Yields the whole value when splitting is disabled, when the name is
/// `Subject` or when the value looks like JSON. Otherwise empty entries are
/// dropped, and a value with no entry at all is kept as is.
pub(crate) fn split_header_value<'a>(name: &str, value: &'a str, split: bool) -> Vec<&'a str> {
    if !split || names_match(name, UNSPLIT_HEADER) || is_json_like(value) {
        return vec![value];
    }

    let entries: Vec<&str> = split_entries(value)
        .into_iter()
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.is_empty() {
        vec![value]
    } else {
        entries
    }
}

/// A header line with its continuation lines, before any decoding.
#[derive(Debug)]
struct RawField<'a> {
    name: &'a str,
    value: &'a str,
}

/// Groups lines into fields, keeping each value as a slice of `text` so
/// folding survives.
fn raw_fields(text: &str, skip_leading: bool) -> Vec<RawField<'_>> {
    let mut fields = Vec::new();
    // (name, value start, value end) of the field being accumulated.
    let mut current: Option<(&str, usize, usize)> = None;
    let mut seen_header = false;
    let mut offset = 0;

    for line in split_lines(text) {
        let start = offset;
        offset += line.len();
        let content = line.trim_end_matches(['\r', '\n']);
        let end = start + content.len();

        if content.trim().is_empty() {
            if seen_header || !skip_leading {
                break;
            }
            continue;
        }

        if content.starts_with([' ', '\t']) {
            match current.as_mut() {
                Some((_, _, value_end)) => *value_end = end,
                None => tracing::debug!(line = content, "skipping orphan continuation line"),
            }
            continue;
        }

        if let Some(field) = current.take() {
            fields.push(finish_field(text, field));
        }

        match content.split_once(':') {
            Some((name, _)) if is_legal_header_name(name) => {
                seen_header = true;
                current = Some((name, start + name.len() + 1, end));
            }
            _ if !seen_header && !skip_leading => break,
            _ => {
                tracing::debug!(line = content, "skipping non-header line");
            }
        }
    }

    if let Some(field) = current {
        fields.push(finish_field(text, field));
    }

    fields
}

fn finish_field<'a>(text: &'a str, (name, start, end): (&'a str, usize, usize)) -> RawField<'a> {
    RawField {
        name,
        value: text[start..end].trim(),
    }
}

/// Splits after each `\r\n`, `\n` or lone `\r`, keeping the terminators.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest.find(['\r', '\n']).map_or(rest.len(), |pos| {
            if rest[pos..].starts_with("\r\n") {
                pos + 2
            } else {
                pos + 1
            }
        });
        let (line, tail) = rest.split_at(end);
        rest = tail;
        Some(line)
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
    use crate::options::{OneOrMany, OutputShape};

    #[test]
    fn test_split_lines() {
        let lines: Vec<_> = split_lines("a\r\nb\nc\rd").collect();
        assert_eq!(lines, vec!["a\r\n", "b\n", "c\r", "d"]);
        assert_eq!(split_lines("").count(), 0);
    }

    #[test]
    fn test_tokenize_entries() {
        let entries = tokenize_entries(r#"quic=":443"; ma=2592000; v="46,43", h3=":443""#);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].len(), 3);
        assert_eq!(entries[0][2].as_str(), r#"v="46,43""#);

        let entries = tokenize_entries(r#"{"a": 1, "b": 2}"#);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].len(), 1);
    }

    #[test]
    fn test_parse_explodes_commas() {
        let headers = parse("Accept: text/html, application/xhtml+xml, application/xml;q=0.9, */*;q=0.8");
        assert_eq!(headers.len(), 4);
        assert_eq!(headers[2].get("q"), Some(OneOrMany::One("0.9".into())));
    }

    #[test]
    fn test_parse_subject_not_split() {
        let headers = parse("Subject: Hello, world\r\nTo: a@b.c, d@e.f");
        assert_eq!(headers.get_all("subject").len(), 1);
        assert_eq!(headers.get_all("subject")[0].content(), "Hello, world");
        assert_eq!(headers.get_all("to").len(), 2);
    }

    #[test]
    fn test_parse_split_disabled() {
        let options = ParseOptions::new().with_split_entries(false);
        let headers = parse_with("Accept: text/html, */*", &options);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_parse_drops_empty_entries() {
        let headers = parse("Vary: Accept,, Origin,");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_parse_skips_leading_lines() {
        let headers = parse("HTTP/1.1 200 OK\r\n\r\nServer: nginx\r\nnot a header\r\nVia: 1.1 proxy");
        assert_eq!(headers.keys(), vec!["Server", "Via"]);

        let strict = ParseOptions::new().with_skip_leading_non_headers(false);
        assert!(parse_with("\r\nServer: nginx", &strict).is_empty());
        assert!(parse_with("HTTP/1.1 200 OK\r\nServer: nginx", &strict).is_empty());
    }

    #[test]
    fn test_parse_skips_illegal_names() {
        let headers = parse("Host: a\r\nBad Name: x\r\n(oops): y\r\nVia: b");
        assert_eq!(headers.keys(), vec!["Host", "Via"]);
    }

    #[test]
    fn test_parse_stops_at_blank_line() {
        let headers = parse("Host: a\r\n\r\nBody: not a header");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_parse_keeps_folding() {
        let headers = parse("Set-Cookie: id=a3fWa;\r\n    Path=/\r\nHost: a");
        let cookie = &headers[0];
        assert_eq!(cookie.raw_content(), "id=a3fWa;\r\n    Path=/");
        assert_eq!(cookie.get("path"), Some(OneOrMany::One("/".into())));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_parse_mixed_line_endings() {
        let headers = parse("A: 1\nB: 2\rC: 3\r\nD: 4");
        assert_eq!(headers.keys(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_parse_decodes_encoded_words() {
        let headers = parse("Subject: =?iso-8859-1?q?p=F6stal?=");
        assert_eq!(headers[0].content(), "p\u{f6}stal");

        let raw = ParseOptions::new().with_encoded_words(false);
        let headers = parse_with("Subject: =?iso-8859-1?q?p=F6stal?=", &raw);
        assert_eq!(headers[0].content(), "=?iso-8859-1?q?p=F6stal?=");
    }

    #[test]
    fn test_parse_empty_value() {
        let headers = parse("X-Empty:\r\nHost: a");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].raw_content(), "");
        assert!(headers[0].is_empty());
    }

    #[test]
    fn test_parse_output_shape() {
        let options = ParseOptions::new().with_output_shape(OutputShape::AlwaysMany);
        let headers = parse_with("Host: a", &options);
        assert!(matches!(headers.get("host"), Some(OneOrMany::Many(v)) if v.len() == 1));
    }

    #[test]
    fn test_parse_bytes_ignores_body() {
        let headers = parse_bytes(b"Host: a\r\nVia: b\r\n\r\n\xff\xfe binary");
        assert_eq!(headers.keys(), vec!["Host", "Via"]);
    }

    #[test]
    fn test_split_header_value() {
        assert_eq!(split_header_value("Accept", "a, b", true), vec!["a", "b"]);
        assert_eq!(split_header_value("Accept", "a, b", false), vec!["a, b"]);
        assert_eq!(split_header_value("SUBJECT", "a, b", true), vec!["a, b"]);
        assert_eq!(split_header_value("X", "[1, 2]", true), vec!["[1, 2]"]);
        assert_eq!(split_header_value("X", "a,", true), vec!["a"]);
        assert_eq!(split_header_value("X", "", true), vec![""]);
    }
}
