//! Decoding of raw header input.
//!
//! Supports RFC 2047 encoded words in header values and the separation of a
//! raw byte buffer into its decodable header block and an opaque body.

use std::borrow::Cow;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;

use crate::normalize::is_legal_header_name;

/// Base64 engine accepting encoded words with or without padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Windows-1252 code points for bytes 0x80..=0x9F (undefined slots map to
/// the C1 control of the same value).
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{81}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{8D}', '\u{017D}', '\u{8F}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{9D}', '\u{017E}', '\u{0178}',
];

/// Decodes every RFC 2047 encoded word in `text`.
///
/// Format: `=?charset?encoding?encoded-text?=`, with `B` (Base64) or `Q`
/// (quoted-printable with `_` for space) encodings. Whitespace separating two
/// adjacent encoded words is dropped. A token that cannot be decoded, because
/// of an unknown charset or a malformed payload, is kept verbatim; its
/// siblings are decoded independently.
///
/// ```
/// use headerkit::decode_encoded_words;
///
/// assert_eq!(decode_encoded_words("=?iso-8859-1?q?p=F6stal?="), "pöstal");
/// assert_eq!(decode_encoded_words("Hello =?UTF-8?B?V29ybGQ=?=!"), "Hello World!");
/// ```
#[must_use]
pub fn decode_encoded_words(text: &str) -> Cow<'_, str> {
    if !text.contains("=?") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut previous_decoded = false;

    while let Some(start) = rest.find("=?") {
        let (literal, candidate) = rest.split_at(start);

        if let Some((decoded, consumed)) = decode_one(candidate) {
            if !(previous_decoded && literal.chars().all(char::is_whitespace)) {
                out.push_str(literal);
            }
            out.push_str(&decoded);
            rest = &candidate[consumed..];
            previous_decoded = true;
        } else {
            if looks_like_encoded_word(candidate) {
                tracing::debug!(token = candidate, "keeping undecodable encoded word");
            }
            out.push_str(literal);
            out.push_str("=?");
            rest = &candidate[2..];
            previous_decoded = false;
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Decodes the encoded word at the start of `candidate`.
///
/// Returns the decoded text and the number of bytes consumed.
fn decode_one(candidate: &str) -> Option<(String, usize)> {
    let body = candidate.strip_prefix("=?")?;
    let (charset, after_charset) = body.split_once('?')?;
    let encoding = after_charset.chars().next()?;
    let payload_and_rest = after_charset.get(1..)?.strip_prefix('?')?;
    let end = payload_and_rest.find("?=")?;
    let payload = &payload_and_rest[..end];

    if charset.is_empty()
        || charset.contains(char::is_whitespace)
        || payload.contains(char::is_whitespace)
    {
        return None;
    }

    let bytes = match encoding.to_ascii_uppercase() {
        'B' => LENIENT_BASE64.decode(payload).ok()?,
        'Q' => decode_q(payload)?,
        _ => return None,
    };

    let decoded = decode_charset(&bytes, charset)?;
    // "=?" + charset + "?" + encoding + "?" + payload + "?="
    let consumed = 2 + charset.len() + 3 + end + 2;

    Some((decoded, consumed))
}

/// Cheap check used only to decide whether a failed decode is worth logging.
fn looks_like_encoded_word(candidate: &str) -> bool {
    candidate
        .get(2..)
        .is_some_and(|rest| rest.contains("?=") && rest.matches('?').count() >= 3)
}

/// Decodes a `Q` payload: `_` is a space, `=XX` a hex byte.
fn decode_q(payload: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len());
    let mut bytes = payload.bytes();

    while let Some(byte) = bytes.next() {
        match byte {
            b'_' => out.push(b' '),
            b'=' => {
                let high = hex_value(bytes.next()?)?;
                let low = hex_value(bytes.next()?)?;
                out.push((high << 4) | low);
            }
            _ => out.push(byte),
        }
    }

    Some(out)
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Converts decoded payload bytes to text using the declared charset.
fn decode_charset(bytes: &[u8], charset: &str) -> Option<String> {
    // RFC 2231 language suffix: "utf-8*en"
    let charset = charset.split('*').next().unwrap_or(charset).to_ascii_lowercase();

    match charset.as_str() {
        "utf-8" | "utf8" => String::from_utf8(bytes.to_vec()).ok(),
        "us-ascii" | "ascii" => bytes
            .is_ascii()
            .then(|| bytes.iter().map(|&b| char::from(b)).collect()),
        "iso-8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1" => {
            Some(bytes.iter().map(|&b| char::from(b)).collect())
        }
        "windows-1252" | "cp1252" => Some(
            bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
                    _ => char::from(b),
                })
                .collect(),
        ),
        _ => None,
    }
}

/// A raw buffer split into its decoded header block and the remaining bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBlock<'a> {
    /// Decoded header lines, each with its line terminator.
    pub headers: &'a str,
    /// Undecoded remainder: the body after the blank line, or everything from
    /// the first line that failed to decode.
    pub body: &'a [u8],
    /// False if decoding stopped early on invalid UTF-8.
    pub fully_decoded: bool,
}

/// Separates the UTF-8 decodable header block of `payload` from its body.
///
/// The block ends at the first blank line (`\r\n\r\n` or `\n\n`) that follows
/// at least one header-looking line, so status lines and proxy preambles
/// before the headers stay in the block. If a line inside the block is not
/// valid UTF-8, the block retreats to the end of the last complete line that
/// decoded, and every byte from there on is returned undecoded. No byte is
/// ever dropped, except the blank separator line itself.
///
/// ```
/// let raw = "Host: developer.mozilla.org\r\nX-Hello-World: 死の漢字\r\n\r\nThat IS totally random.";
/// let block = headerkit::extract_header_block(raw.as_bytes());
///
/// assert_eq!(block.headers, "Host: developer.mozilla.org\r\nX-Hello-World: 死の漢字\r\n");
/// assert_eq!(block.body, b"That IS totally random.");
/// ```
#[must_use]
pub fn extract_header_block(payload: &[u8]) -> HeaderBlock<'_> {
    let (block_end, body_start) = find_block_end(payload);
    let window = &payload[..block_end];

    match std::str::from_utf8(window) {
        Ok(headers) => HeaderBlock {
            headers,
            body: &payload[body_start..],
            fully_decoded: true,
        },
        Err(err) => {
            let valid = &window[..err.valid_up_to()];
            let good = valid
                .iter()
                .rposition(|&b| b == b'\n')
                .map_or(0, |index| index + 1);

            tracing::debug!(
                invalid_at = err.valid_up_to(),
                retreat_to = good,
                "header block is not valid UTF-8, keeping remainder undecoded"
            );

            HeaderBlock {
                headers: std::str::from_utf8(&valid[..good]).unwrap_or_default(),
                body: &payload[good..],
                fully_decoded: false,
            }
        }
    }
}

/// Returns (end of the header lines, start of the body).
fn find_block_end(payload: &[u8]) -> (usize, usize) {
    let mut seen_header = false;
    let mut pos = 0;

    while pos < payload.len() {
        let line_end = payload[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(payload.len(), |index| pos + index + 1);
        let line = &payload[pos..line_end];

        if line == b"\r\n" || line == b"\n" {
            if seen_header {
                return (pos, line_end);
            }
        } else if !seen_header {
            seen_header = looks_like_header_line(line);
        }

        pos = line_end;
    }

    (payload.len(), payload.len())
}

fn looks_like_header_line(line: &[u8]) -> bool {
    line.iter()
        .position(|&b| b == b':')
        .and_then(|colon| std::str::from_utf8(&line[..colon]).ok())
        .is_some_and(is_legal_header_name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::unreadable_literal)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_b_and_q() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SGVsbG8=?="), "Hello");
        assert_eq!(decode_encoded_words("=?UTF-8?B?SGVsbG8?="), "Hello");
        assert_eq!(decode_encoded_words("=?UTF-8?Q?Hello_World?="), "Hello World");
        assert_eq!(decode_encoded_words("=?utf-8?Q?H=C3=A9llo?="), "Héllo");
        assert_eq!(decode_encoded_words("=?utf-8?B?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_encoded_words("=?iso-8859-1?q?p=F6stal?="), "pöstal");
        assert_eq!(decode_encoded_words("=?windows-1252?Q?=80_5?="), "€ 5");
    }

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(decode_encoded_words("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_adjacent_words_drop_whitespace() {
        assert_eq!(
            decode_encoded_words("=?UTF-8?Q?Hello?= =?UTF-8?Q?_World?="),
            "Hello World"
        );
        assert_eq!(
            decode_encoded_words("Re: =?UTF-8?Q?a?= and =?UTF-8?Q?b?="),
            "Re: a and b"
        );
    }

    #[test]
    fn test_undecodable_tokens_kept() {
        assert_eq!(
            decode_encoded_words("=?x-unknown?Q?abc?= =?UTF-8?Q?ok?="),
            "=?x-unknown?Q?abc?= ok"
        );
        assert_eq!(decode_encoded_words("=?UTF-8?Q?bad=Z1?="), "=?UTF-8?Q?bad=Z1?=");
        assert_eq!(decode_encoded_words("=?UTF-8?X?abc?="), "=?UTF-8?X?abc?=");
        assert_eq!(decode_encoded_words("=?UTF-8?B?/w==?="), "=?UTF-8?B?/w==?=");
        assert_eq!(decode_encoded_words("a=?b"), "a=?b");
        assert_eq!(decode_encoded_words("x =? y ?= z"), "x =? y ?= z");
    }

    #[test]
    fn test_extract_block_no_body() {
        let raw = "Host: developer.mozilla.org\r\nX-Hello-World: 死の漢字\r\n\r\n";
        let block = extract_header_block(raw.as_bytes());
        assert_eq!(
            block.headers,
            "Host: developer.mozilla.org\r\nX-Hello-World: 死の漢字\r\n"
        );
        assert!(block.body.is_empty());
        assert!(block.fully_decoded);
    }

    #[test]
    fn test_extract_block_lf_only() {
        let block = extract_header_block(b"A: 1\nB: 2\n\nbody\n\nmore");
        assert_eq!(block.headers, "A: 1\nB: 2\n");
        assert_eq!(block.body, b"body\n\nmore");
    }

    #[test]
    fn test_extract_block_without_separator() {
        let block = extract_header_block(b"A: 1\r\nB: 2");
        assert_eq!(block.headers, "A: 1\r\nB: 2");
        assert!(block.body.is_empty());
        assert!(block.fully_decoded);
    }

    #[test]
    fn test_extract_block_keeps_preamble() {
        let raw = b"HTTP/1.1 200 Connection established\r\n\r\nHTTP/2 200\r\ndate: x\r\n\r\nbody";
        let block = extract_header_block(raw);
        assert_eq!(
            block.headers,
            "HTTP/1.1 200 Connection established\r\n\r\nHTTP/2 200\r\ndate: x\r\n"
        );
        assert_eq!(block.body, b"body");
    }

    #[test]
    fn test_extract_block_truncated_multibyte() {
        let mut raw = b"Host: example.org\r\nX-Name: caf".to_vec();
        raw.extend_from_slice(&[0xE6, 0xAD]);
        raw.extend_from_slice(b"\r\n\r\nbody");

        let block = extract_header_block(&raw);
        assert_eq!(block.headers, "Host: example.org\r\n");
        assert!(!block.fully_decoded);
        assert_eq!(block.headers.len() + block.body.len(), raw.len());
        assert!(block.body.starts_with(b"X-Name: caf\xE6\xAD"));
    }

    #[test]
    fn test_extract_block_binary_body_untouched() {
        let mut raw = b"Content-Type: image/png\r\n\r\n".to_vec();
        raw.extend_from_slice(&[0x89, 0x50, 0x4E, 0x47, 0xFF]);

        let block = extract_header_block(&raw);
        assert!(block.fully_decoded);
        assert_eq!(block.headers, "Content-Type: image/png\r\n");
        assert_eq!(block.body, &[0x89, 0x50, 0x4E, 0x47, 0xFF]);
    }

    #[test]
    fn test_extract_block_invalid_first_line() {
        let block = extract_header_block(&[0xFF, b':', b' ', b'x']);
        assert_eq!(block.headers, "");
        assert_eq!(block.body, &[0xFF, b':', b' ', b'x']);
    }
}
