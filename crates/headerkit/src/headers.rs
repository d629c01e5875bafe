//! Ordered collection of headers.

use std::convert::Infallible;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::normalize::{is_legal_header_name, names_match, normalize_name};
use crate::options::{OneOrMany, OutputShape};
use crate::parser::{self, split_header_value};
use crate::registry;

/// What [`Headers::index`] searches for.
#[derive(Debug, Clone, Copy)]
pub enum Needle<'a> {
    /// First header with this name.
    Name(&'a str),
    /// First header equal to this one.
    Header(&'a Header),
}

impl<'a> From<&'a str> for Needle<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for Needle<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a Header> for Needle<'a> {
    fn from(header: &'a Header) -> Self {
        Self::Header(header)
    }
}

/// An ordered, possibly repeating list of headers.
///
/// Order is the order of appearance; a name may occur any number of times.
/// Name lookups ignore case and treat `-` and `_` as the same character.
///
/// ```
/// let headers = headerkit::parse("Accept: text/html, */*;q=0.8\r\nHost: example.com");
/// assert_eq!(headers.len(), 3);
/// assert!(headers.has_many("accept"));
/// assert_eq!(headers.get_all("host")[0].content(), "example.com");
/// ```
#[derive(Debug, Clone)]
pub struct Headers {
    headers: Vec<Header>,
    shape: OutputShape,
}

impl Default for Headers {
    fn default() -> Self {
        Self::with_shape(OutputShape::global())
    }
}

impl Headers {
    /// Creates an empty collection using the process-wide output shape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection with an explicit output shape.
    #[must_use]
    pub const fn with_shape(shape: OutputShape) -> Self {
        Self {
            headers: Vec::new(),
            shape,
        }
    }

    /// The output shape used by [`get`](Self::get).
    #[must_use]
    pub const fn shape(&self) -> OutputShape {
        self.shape
    }

    /// Number of headers, repeated names counted individually.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there is no header.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterates over headers in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.headers.iter()
    }

    /// Iterates mutably over headers in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Header> {
        self.headers.iter_mut()
    }

    /// Distinct header names in first-occurrence order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for header in &self.headers {
            if !keys.iter().any(|k| names_match(k, header.name())) {
                keys.push(header.name());
            }
        }
        keys
    }

    /// `(name, content)` pairs in order, content unquoted when single.
    #[must_use]
    pub fn items(&self) -> Vec<(&str, &str)> {
        self.headers
            .iter()
            .map(|h| (h.name(), h.content()))
            .collect()
    }

    /// Headers named `name`: one or several depending on the count and on
    /// the collection's [`OutputShape`].
    #[must_use]
    pub fn get(&self, name: &str) -> Option<OneOrMany<&Header>> {
        OneOrMany::from_vec(self.get_all(name), self.shape)
    }

    /// Every header named `name`, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&Header> {
        self.headers
            .iter()
            .filter(|h| names_match(h.name(), name))
            .collect()
    }

    /// Returns true if a header is named `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.headers.iter().any(|h| names_match(h.name(), name))
    }

    /// Returns true if `name` occurs more than once.
    #[must_use]
    pub fn has_many(&self, name: &str) -> bool {
        self.headers
            .iter()
            .filter(|h| names_match(h.name(), name))
            .nth(1)
            .is_some()
    }

    /// Returns true if an equal header is present.
    #[must_use]
    pub fn contains(&self, header: &Header) -> bool {
        self.headers.contains(header)
    }

    /// Position of the first header matching `needle` within
    /// `[start, end)`; `end` defaults to the length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing in the range matches.
    pub fn index<'a>(
        &self,
        needle: impl Into<Needle<'a>>,
        start: usize,
        end: Option<usize>,
    ) -> Result<usize> {
        let needle = needle.into();
        let end = end.unwrap_or(self.headers.len()).min(self.headers.len());

        (start..end)
            .find(|&i| match needle {
                Needle::Name(name) => names_match(self.headers[i].name(), name),
                Needle::Header(header) => &self.headers[i] == header,
            })
            .ok_or_else(|| {
                let what = match needle {
                    Needle::Name(name) => format!("header {name:?}"),
                    Needle::Header(header) => format!("header {:?}", header.to_text()),
                };
                Error::NotFound(format!("{what} in range {start}..{end}"))
            })
    }

    /// Appends a header.
    pub fn push(&mut self, header: Header) {
        self.headers.push(header);
    }

    /// Inserts a header before `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is past the end.
    pub fn insert(&mut self, index: usize, header: Header) -> Result<()> {
        if index > self.headers.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.headers.len(),
            });
        }
        self.headers.insert(index, header);
        Ok(())
    }

    /// Replaces every header named `name` with the given value.
    ///
    /// A comma-joined value becomes one header per entry, except for
    /// `Subject` and JSON-like values. New headers are appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `name` is not a legal header name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        if !is_legal_header_name(name) {
            return Err(Error::MalformedInput(format!(
                "illegal header name {name:?}"
            )));
        }

        self.remove(name);
        let shape = self.shape;
        self.headers.extend(
            split_header_value(name, value, true)
                .into_iter()
                .map(|entry| Header::from_parts(name.to_string(), entry.to_string(), shape)),
        );
        Ok(())
    }

    /// Removes every header named `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|h| !names_match(h.name(), name));
        before - self.headers.len()
    }

    /// Removes the first header equal to `header`.
    pub fn remove_header(&mut self, header: &Header) -> bool {
        self.headers
            .iter()
            .position(|h| h == header)
            .map(|i| self.headers.remove(i))
            .is_some()
    }

    /// Removes and returns the last header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the collection is empty.
    pub fn pop(&mut self) -> Result<Header> {
        self.headers
            .pop()
            .ok_or_else(|| Error::NotFound("header to pop".to_string()))
    }

    /// Removes and returns the header at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is past the end.
    pub fn pop_at(&mut self, index: usize) -> Result<Header> {
        if index >= self.headers.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.headers.len(),
            });
        }
        Ok(self.headers.remove(index))
    }

    /// Removes and returns every header named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no header has that name.
    pub fn pop_named(&mut self, name: &str) -> Result<OneOrMany<Header>> {
        let (popped, kept): (Vec<Header>, Vec<Header>) = std::mem::take(&mut self.headers)
            .into_iter()
            .partition(|h| names_match(h.name(), name));
        self.headers = kept;

        OneOrMany::from_vec(popped, self.shape)
            .ok_or_else(|| Error::NotFound(format!("header {name:?}")))
    }

    /// A copy with the order reversed.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            headers: self.headers.iter().rev().cloned().collect(),
            shape: self.shape,
        }
    }

    /// Projects onto a name-to-content map.
    ///
    /// Keys follow first-occurrence order; repeated names have their
    /// contents joined with `", "`.
    #[must_use]
    pub fn to_dict(&self) -> HeaderMap {
        let mut map = HeaderMap::default();
        for header in &self.headers {
            map.append(header.name(), header.content());
        }
        map
    }

    /// Serializes to CRLF-separated `Name: content` lines, without a
    /// trailing line break.
    ///
    /// Headers registered as squashable (`Accept`, `Cache-Control`, ...) are
    /// merged onto a single comma-joined line at their first occurrence,
    /// unless the joined line would split back into different entries (an
    /// empty value, or one ending in a weekday such as `x-Sun`). Such a kind
    /// keeps one line per header.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.headers.len());
        // Squash kinds seen so far, and whether they were merged.
        let mut kinds: Vec<(&str, bool)> = Vec::new();

        for header in &self.headers {
            let name = header.name();
            if registry::is_squashed(name) {
                match kinds.iter().find(|(kind, _)| names_match(kind, name)) {
                    Some((_, true)) => continue,
                    Some((_, false)) => {}
                    None => {
                        let contents: Vec<&str> = self
                            .headers
                            .iter()
                            .filter(|h| names_match(h.name(), name))
                            .map(Header::raw_content)
                            .collect();
                        if let Some(joined) = merge_contents(name, &contents) {
                            kinds.push((name, true));
                            lines.push(format!("{name}: {joined}"));
                            continue;
                        }
                        kinds.push((name, false));
                    }
                }
            }
            lines.push(header.to_text());
        }

        lines.join("\r\n")
    }
}

/// Joins the contents of one squash kind, or returns `None` if parsing the
/// joined value would not give back the same entries.
fn merge_contents(name: &str, contents: &[&str]) -> Option<String> {
    let joined = contents.join(", ");
    let expected: Vec<&str> = contents
        .iter()
        .copied()
        .flat_map(|content| split_header_value(name, content, true))
        .collect();

    (split_header_value(name, &joined, true) == expected).then_some(joined)
}

impl PartialEq for Headers {
    /// Collections are equal when they hold the same headers in any order.
    fn eq(&self, other: &Self) -> bool {
        if self.headers.len() != other.headers.len() {
            return false;
        }

        let mut used = vec![false; other.headers.len()];
        self.headers.iter().all(|a| {
            let found = other
                .headers
                .iter()
                .enumerate()
                .position(|(i, b)| !used[i] && a == b);
            found.is_some_and(|i| {
                used[i] = true;
                true
            })
        })
    }
}

impl Eq for Headers {}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl FromStr for Headers {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(parser::parse(s))
    }
}

impl Index<usize> for Headers {
    type Output = Header;

    fn index(&self, index: usize) -> &Self::Output {
        &self.headers[index]
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl Extend<Header> for Headers {
    fn extend<I: IntoIterator<Item = Header>>(&mut self, iter: I) {
        self.headers.extend(iter);
    }
}

impl IntoIterator for Headers {
    type Item = Header;
    type IntoIter = std::vec::IntoIter<Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.into_iter()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

/// Name-to-content projection of a [`Headers`] collection.
///
/// Lookups use normalized names; the displayed name is the first
/// occurrence's spelling with `_` turned into `-`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: IndexMap<String, (String, String)>,
}

impl HeaderMap {
    fn append(&mut self, name: &str, content: &str) {
        self.entries
            .entry(normalize_name(name))
            .and_modify(|(_, joined)| {
                joined.push_str(", ");
                joined.push_str(content);
            })
            .or_insert_with(|| (name.replace('_', "-"), content.to_string()));
    }

    /// Joined content for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&normalize_name(name))
            .map(|(_, content)| content.as_str())
    }

    /// Returns true if `name` is present.
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_name(name))
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Displayed names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(name, _)| name.as_str())
    }

    /// `(name, content)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, content)| (name.as_str(), content.as_str()))
    }
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

    fn header(name: &str, content: &str) -> Header {
        Header::with_shape(name, content, OutputShape::Flexible).unwrap()
    }

    fn sample() -> Headers {
        [
            header("Host", "developer.mozilla.org"),
            header("Accept", "text/html"),
            header("Set-Cookie", "a=1"),
            header("Accept", "*/*;q=0.8"),
            header("Set-Cookie", "b=2"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_keys_and_items() {
        let headers = sample();
        assert_eq!(headers.keys(), vec!["Host", "Accept", "Set-Cookie"]);
        assert_eq!(headers.items()[1], ("Accept", "text/html"));
        assert_eq!(headers.len(), 5);
    }

    #[test]
    fn test_get_one_or_many() {
        let headers = sample();
        assert!(matches!(headers.get("host"), Some(OneOrMany::One(h)) if h.content() == "developer.mozilla.org"));
        assert!(matches!(headers.get("set_cookie"), Some(OneOrMany::Many(v)) if v.len() == 2));
        assert!(headers.get("x-missing").is_none());
        assert!(headers.has("SET-COOKIE"));
        assert!(headers.has_many("accept"));
        assert!(!headers.has_many("host"));
    }

    #[test]
    fn test_get_always_many() {
        let mut headers = Headers::with_shape(OutputShape::AlwaysMany);
        headers.push(header("Host", "example.com"));
        assert!(matches!(headers.get("host"), Some(OneOrMany::Many(v)) if v.len() == 1));
    }

    #[test]
    fn test_index() {
        let headers = sample();
        assert_eq!(headers.index("accept", 0, None).unwrap(), 1);
        assert_eq!(headers.index("accept", 2, None).unwrap(), 3);
        assert!(headers.index("accept", 4, None).unwrap_err().is_not_found());
        assert!(headers.index("accept", 0, Some(1)).is_err());

        let target = header("set-cookie", "b=2");
        assert_eq!(headers.index(&target, 0, None).unwrap(), 4);
        assert!(headers.index("accept", 3, Some(100)).is_ok());
    }

    #[test]
    fn test_insert_and_push() {
        let mut headers = sample();
        headers.insert(0, header("Date", "Tue, 17 Mar 2020 08:29:37 GMT")).unwrap();
        assert_eq!(headers[0].name(), "Date");
        assert!(matches!(
            headers.insert(10, header("X", "y")),
            Err(Error::IndexOutOfRange { index: 10, len: 6 })
        ));
        headers.push(header("X-Last", "1"));
        assert_eq!(headers[6].name(), "X-Last");
    }

    #[test]
    fn test_set_replaces_and_explodes() {
        let mut headers = sample();
        headers.set("accept", "application/json, text/plain").unwrap();
        assert_eq!(headers.get_all("Accept").len(), 2);
        assert_eq!(headers.get_all("Accept")[0].content(), "application/json");
        assert_eq!(headers.len(), 5);

        headers.set("Subject", "Hello, world").unwrap();
        assert_eq!(headers.get_all("subject").len(), 1);

        assert!(matches!(
            headers.set("bad name", "x"),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_remove_and_pop() {
        let mut headers = sample();
        assert_eq!(headers.remove("accept"), 2);
        assert_eq!(headers.remove("accept"), 0);
        assert!(!headers.has("accept"));

        assert_eq!(headers.pop().unwrap().content(), "b=2");
        assert_eq!(headers.pop_at(0).unwrap().name(), "Host");
        assert!(headers.pop_at(5).is_err());

        assert!(headers.remove_header(&header("set-cookie", "a=1")));
        assert!(headers.is_empty());
        assert!(headers.pop().is_err());
    }

    #[test]
    fn test_pop_named() {
        let mut headers = sample();
        let popped = headers.pop_named("Set-Cookie").unwrap();
        assert_eq!(popped.len(), 2);
        assert_eq!(headers.len(), 3);
        assert!(!headers.has("set-cookie"));

        assert!(matches!(headers.pop_named("host").unwrap(), OneOrMany::One(_)));
        assert!(headers.pop_named("host").unwrap_err().is_not_found());
    }

    #[test]
    fn test_to_dict_joins_repeated_names() {
        let headers = sample();
        let dict = headers.to_dict();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.get("accept"), Some("text/html, */*;q=0.8"));
        assert_eq!(dict.get("set_cookie"), Some("a=1, b=2"));
        assert!(dict.contains_key("HOST"));
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["Host", "Accept", "Set-Cookie"]);
    }

    #[test]
    fn test_to_text_squashes_registered_names() {
        let headers = sample();
        assert_eq!(
            headers.to_text(),
            "Host: developer.mozilla.org\r\n\
             Accept: text/html, */*;q=0.8\r\n\
             Set-Cookie: a=1\r\n\
             Set-Cookie: b=2"
        );
        assert_eq!(headers.to_string(), headers.to_text());
        assert_eq!(Headers::new().to_text(), "");
    }

    #[test]
    fn test_to_text_keeps_empty_squashed_values_apart() {
        let parsed = parser::parse("Vary:\r\nVary: Accept");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.to_text(), "Vary: \r\nVary: Accept");
        assert_eq!(parser::parse(&parsed.to_text()), parsed);
    }

    #[test]
    fn test_to_text_does_not_merge_after_weekday() {
        let parsed = parser::parse("Accept-Language: x-Sun\r\nHost: a\r\nAccept-Language: en");
        assert_eq!(parsed.len(), 3);
        assert_eq!(
            parsed.to_text(),
            "Accept-Language: x-Sun\r\nHost: a\r\nAccept-Language: en"
        );
        assert_eq!(parser::parse(&parsed.to_text()), parsed);

        let merged = parser::parse("Accept-Language: fr\r\nHost: a\r\nAccept-Language: en");
        assert_eq!(merged.to_text(), "Accept-Language: fr, en\r\nHost: a");
    }

    #[test]
    fn test_equality_ignores_order() {
        let headers = sample();
        assert_eq!(headers, headers.reversed());
        assert_eq!(headers.reversed()[0].content(), "b=2");

        let mut fewer = sample();
        fewer.pop().unwrap();
        assert_ne!(headers, fewer);
    }

    #[test]
    fn test_contains_and_iteration() {
        let headers = sample();
        assert!(headers.contains(&header("HOST", "developer.mozilla.org")));
        assert_eq!(headers.iter().count(), 5);
        assert_eq!((&headers).into_iter().filter(|h| h.name() == "Accept").count(), 2);

        let mut extended = Headers::new();
        extended.extend(headers.clone());
        assert_eq!(extended, headers);
    }

    #[test]
    fn test_iter_mut() {
        let mut headers = sample();
        for h in headers.iter_mut().filter(|h| h.name() == "Set-Cookie") {
            h.set("Path", "/");
        }
        assert_eq!(headers[2].raw_content(), "a=1; Path=/");
    }

    #[test]
    fn test_from_str() {
        let headers: Headers = "Host: example.com\r\nAccept: */*".parse().unwrap();
        assert_eq!(headers.len(), 2);
    }
}
