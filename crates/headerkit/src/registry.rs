//! Metadata for well-known header names.
//!
//! The table is pure data: the parser never consults it. The model uses it to
//! decide which headers serialize onto a single comma-joined line, and callers
//! can use it to validate values of a known kind.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::header::Header;
use crate::normalize::names_match;

/// Where a header is expected to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by clients.
    Request,
    /// Sent by servers.
    Response,
    /// Valid either way, or in mail messages.
    Both,
}

/// Shape of a header's value, as far as validation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free-form tokens and parameters.
    Token,
    /// An HTTP or mail date.
    Date,
    /// A `type/subtype` media type with optional parameters.
    MediaType,
    /// A non-negative decimal integer.
    Integer,
}

/// Static description of a well-known header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSpec {
    /// Canonical spelling.
    pub name: &'static str,
    /// Occurrences are merged onto one comma-joined line when serialized.
    pub squash: bool,
    /// Where the header is expected.
    pub direction: Direction,
    /// Kind of value carried.
    pub value_kind: ValueKind,
}

const fn spec(
    name: &'static str,
    squash: bool,
    direction: Direction,
    value_kind: ValueKind,
) -> HeaderSpec {
    HeaderSpec {
        name,
        squash,
        direction,
        value_kind,
    }
}

use Direction::{Both, Request, Response};
use ValueKind::{Date, Integer, MediaType, Token};

static REGISTRY: &[HeaderSpec] = &[
    spec("Accept", true, Request, Token),
    spec("Accept-Charset", false, Request, Token),
    spec("Accept-Encoding", true, Request, Token),
    spec("Accept-Language", true, Request, Token),
    spec("Age", false, Response, Integer),
    spec("Allow", true, Response, Token),
    spec("Alt-Svc", true, Response, Token),
    spec("Authorization", false, Request, Token),
    spec("Cache-Control", true, Both, Token),
    spec("Connection", false, Both, Token),
    spec("Content-Disposition", false, Both, Token),
    spec("Content-Encoding", true, Both, Token),
    spec("Content-Length", false, Both, Integer),
    spec("Content-Security-Policy", false, Response, Token),
    spec("Content-Type", false, Both, MediaType),
    spec("Cookie", false, Request, Token),
    spec("Date", false, Both, Date),
    spec("ETag", false, Response, Token),
    spec("Expires", false, Response, Date),
    spec("From", false, Both, Token),
    spec("Host", false, Request, Token),
    spec("If-Match", true, Request, Token),
    spec("If-Modified-Since", false, Request, Date),
    spec("If-None-Match", true, Request, Token),
    spec("If-Unmodified-Since", false, Request, Date),
    spec("Keep-Alive", true, Both, Token),
    spec("Last-Modified", false, Response, Date),
    spec("Location", false, Response, Token),
    spec("Referer", false, Request, Token),
    spec("Referrer-Policy", true, Response, Token),
    spec("Retry-After", false, Response, Token),
    spec("Server", false, Response, Token),
    spec("Set-Cookie", false, Response, Token),
    spec("Strict-Transport-Security", false, Response, Token),
    spec("Subject", false, Both, Token),
    spec("Transfer-Encoding", true, Both, Token),
    spec("User-Agent", false, Request, Token),
    spec("Vary", true, Response, Token),
    spec("Via", false, Both, Token),
    spec("WWW-Authenticate", true, Response, Token),
    spec("X-Content-Type-Options", false, Response, Token),
    spec("X-Frame-Options", false, Response, Token),
];

/// Looks up a header by name, ignoring case and `-`/`_` differences.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static HeaderSpec> {
    REGISTRY.iter().find(|spec| names_match(spec.name, name))
}

/// Returns true if occurrences of `name` serialize onto one line.
#[must_use]
pub fn is_squashed(name: &str) -> bool {
    lookup(name).is_some_and(|spec| spec.squash)
}

/// Where a well-known header is expected to appear; `None` for unknown names.
///
/// ```
/// use headerkit::registry::{self, Direction};
///
/// assert_eq!(registry::direction("user-agent"), Some(Direction::Request));
/// assert_eq!(registry::direction("X-Custom"), None);
/// ```
#[must_use]
pub fn direction(name: &str) -> Option<Direction> {
    lookup(name).map(|spec| spec.direction)
}

/// Checks a header's value against the kind registered for its name.
///
/// Unknown headers and free-form kinds always validate.
#[must_use]
pub fn validate(header: &Header) -> bool {
    let Some(spec) = header.spec() else {
        return true;
    };

    let content = header.unfolded_content();
    match spec.value_kind {
        Token => true,
        Date => parse_date(&content).is_some(),
        Integer => !content.is_empty() && content.bytes().all(|b| b.is_ascii_digit()),
        MediaType => header
            .attrs()
            .first()
            .and_then(|media| media.split_once('/'))
            .is_some_and(|(kind, sub)| !kind.is_empty() && !sub.is_empty()),
    }
}

/// Parses the date formats found in HTTP and mail headers.
///
/// Accepts RFC 2822 (`Wed, 21 Oct 2015 07:28:00 GMT`), the cookie form
/// (`Wed, 15-Apr-2020 21:27:31 GMT`) and the C `asctime` form
/// (`Sun Nov  6 08:49:37 1994`, taken as UTC).
#[must_use]
pub fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();

    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date);
    }

    ["%a, %d-%b-%Y %H:%M:%S GMT", "%a, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_lookup_ignores_case_and_separators() {
        let spec = lookup("content_type").unwrap();
        assert_eq!(spec.name, "Content-Type");
        assert_eq!(spec.value_kind, ValueKind::MediaType);
        assert_eq!(lookup("WWW-AUTHENTICATE").unwrap().direction, Direction::Response);
        assert!(lookup("X-Custom").is_none());
    }

    #[test]
    fn test_direction() {
        assert_eq!(direction("Host"), Some(Direction::Request));
        assert_eq!(direction("set_cookie"), Some(Direction::Response));
        assert_eq!(direction("Cache-Control"), Some(Direction::Both));
        assert_eq!(direction("X-Request-Id"), None);
    }

    #[test]
    fn test_squash_flags() {
        assert!(is_squashed("accept"));
        assert!(is_squashed("Cache-Control"));
        assert!(is_squashed("vary"));
        assert!(!is_squashed("Set-Cookie"));
        assert!(!is_squashed("X-Custom"));
    }

    #[test]
    fn test_parse_date_formats() {
        let date = parse_date("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2015, 10, 21));

        let date = parse_date("Wed, 15-Apr-2020 21:27:31 GMT").unwrap();
        assert_eq!((date.year(), date.hour(), date.second()), (2020, 21, 31));

        let date = parse_date("Sun Nov  6 08:49:37 1994").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (1994, 11, 6));

        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn test_validate() {
        let date = Header::new("Date", "Tue, 17 Mar 2020 08:29:37 GMT").unwrap();
        assert!(validate(&date));

        let bad_date = Header::new("Expires", "yesterday").unwrap();
        assert!(!validate(&bad_date));

        let media = Header::new("Content-Type", "text/html; charset=UTF-8").unwrap();
        assert!(validate(&media));

        let bad_media = Header::new("Content-Type", "html").unwrap();
        assert!(!validate(&bad_media));

        let length = Header::new("Content-Length", "123").unwrap();
        assert!(validate(&length));
        assert!(!validate(&Header::new("Content-Length", "12a").unwrap()));

        assert!(validate(&Header::new("X-Anything", "goes").unwrap()));
    }
}
