//! Ordered, case-insensitive, multi-valued attribute storage.
//!
//! Every header entry is broken into members separated by `;`. A member is
//! either bare (`text/html`, `Secure`) or a `key=value` attribute
//! (`charset=UTF-8`). The [`AttributeStore`] keeps them in their original
//! order, allows a key to repeat, and looks keys up case-insensitively with
//! `-` and `_` treated as the same character.

use std::fmt;

use crate::error::{Error, Result};
use crate::normalize::{escape_double_quote, names_match, unescape_double_quote, unquote};
use crate::options::{OneOrMany, OutputShape};
use crate::split::split_respecting_quotes;

/// A raw member of a header entry, as produced by the splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member<'a>(&'a str);

impl<'a> Member<'a> {
    /// Wraps raw member text.
    #[must_use]
    pub const fn new(raw: &'a str) -> Self {
        Self(raw)
    }

    /// Returns the raw member text.
    #[must_use]
    pub const fn as_str(&self) -> &'a str {
        self.0
    }

    /// Splits the member into a key and an optional value.
    ///
    /// Returns `None` for an empty member. The split happens on the first
    /// `=`; the member stays bare when the value part is empty or made only
    /// of `=` (Base64 padding look-alikes), or when the key contains a space.
    /// Values are unquoted and unescaped.
    #[must_use]
    pub fn into_pair(self) -> Option<(String, Option<String>)> {
        let raw = self.0;

        if raw.is_empty() {
            return None;
        }

        if let Some((key, value)) = raw.split_once('=') {
            let looks_like_padding = value.is_empty() || value.chars().all(|c| c == '=');
            if !looks_like_padding && !key.contains(' ') {
                return Some((
                    key.to_string(),
                    Some(unescape_double_quote(unquote(value))),
                ));
            }
        }

        Some((unquote(raw).to_string(), None))
    }
}

impl<'a> From<&'a str> for Member<'a> {
    fn from(raw: &'a str) -> Self {
        Self(raw)
    }
}

/// One entry of an attribute store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    key: String,
    value: Option<String>,
}

impl Attribute {
    /// Creates an attribute; a `None` value makes it a bare member.
    #[must_use]
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// The key as written.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns true for a bare member.
    #[must_use]
    pub const fn is_bare(&self) -> bool {
        self.value.is_none()
    }

    /// Splits into key and value.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<String>) {
        (self.key, self.value)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            None if self.key.is_empty() => f.write_str("\"\""),
            None if bare_needs_quoting(&self.key) => {
                write!(f, "\"{}\"", escape_double_quote(&self.key))
            }
            None => f.write_str(&self.key),
            Some(value) if value_needs_quoting(value) => {
                write!(f, "{}=\"{}\"", self.key, escape_double_quote(value))
            }
            Some(value) => write!(f, "{}={value}", self.key),
        }
    }
}

/// Which entries of a key [`AttributeStore::remove`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueFilter<'a> {
    /// Every entry of the key.
    #[default]
    Any,
    /// Only entries carrying a value.
    Valued,
    /// Only bare entries.
    Bare,
    /// Only entries whose value equals the given text.
    Equals(&'a str),
}

impl ValueFilter<'_> {
    fn accepts(self, value: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Valued => value.is_some(),
            Self::Bare => value.is_none(),
            Self::Equals(expected) => value == Some(expected),
        }
    }
}

/// Ordered association list of keys to optional values.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    entries: Vec<Attribute>,
    shape: OutputShape,
}

impl AttributeStore {
    /// Creates an empty store using the process-wide output shape.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shape(OutputShape::global())
    }

    /// Creates an empty store with an explicit output shape.
    #[must_use]
    pub const fn with_shape(shape: OutputShape) -> Self {
        Self {
            entries: Vec::new(),
            shape,
        }
    }

    /// Builds a store from split members, skipping empty ones.
    #[must_use]
    pub fn from_members(members: &[Member<'_>], shape: OutputShape) -> Self {
        let mut store = Self::with_shape(shape);
        store.entries.extend(
            members
                .iter()
                .filter_map(|member| member.into_pair())
                .map(|(key, value)| Attribute { key, value }),
        );
        store
    }

    /// The output shape used by [`get`](Self::get).
    #[must_use]
    pub const fn shape(&self) -> OutputShape {
        self.shape
    }

    /// Number of entries, repeated keys counted individually.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|a| (a.key(), a.value()))
    }

    /// Returns the entry at `index`.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<(&str, Option<&str>)> {
        self.entries.get(index).map(|a| (a.key(), a.value()))
    }

    /// Inserts a pair before `index`, or appends when `index` is `None` or
    /// past the end. Keys are not required to be unique.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>, index: Option<usize>) {
        let attribute = Attribute::new(key, value);
        match index {
            Some(index) if index < self.entries.len() => self.entries.insert(index, attribute),
            _ => self.entries.push(attribute),
        }
    }

    /// Returns true if any entry, bare or valued, has this key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|a| names_match(&a.key, key))
    }

    /// Returns true if an entry has this key and exactly this value.
    #[must_use]
    pub fn contains_pair(&self, key: &str, value: &str) -> bool {
        self.entries
            .iter()
            .any(|a| names_match(&a.key, key) && a.value() == Some(value))
    }

    /// Returns the values of `key`.
    ///
    /// Bare entries are ignored: `None` if the key has no value at all, one
    /// value or an ordered sequence depending on the count and on the store's
    /// [`OutputShape`].
    #[must_use]
    pub fn get(&self, key: &str) -> Option<OneOrMany<&str>> {
        OneOrMany::from_vec(self.get_all(key), self.shape)
    }

    /// Returns every value of `key`, in order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|a| names_match(&a.key, key))
            .filter_map(Attribute::value)
            .collect()
    }

    /// Returns true if `key` carries more than one value.
    #[must_use]
    pub fn has_many(&self, key: &str) -> bool {
        self.get_all(key).len() > 1
    }

    /// Removes the entries of `key` accepted by `filter`.
    ///
    /// Removing a key that is not present does nothing. Returns the number of
    /// removed entries.
    pub fn remove(&mut self, key: &str, filter: ValueFilter<'_>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|a| !(names_match(&a.key, key) && filter.accepts(a.value())));
        before - self.entries.len()
    }

    /// Removes and returns the entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is past the end.
    pub fn remove_at(&mut self, index: usize) -> Result<Attribute> {
        if index >= self.entries.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    /// Distinct keys in first-occurrence order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.distinct_keys(|_| true)
    }

    /// Distinct keys having at least one value, in first-occurrence order.
    #[must_use]
    pub fn valued_keys(&self) -> Vec<&str> {
        self.distinct_keys(|a| !a.is_bare())
    }

    fn distinct_keys(&self, keep: impl Fn(&Attribute) -> bool) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for attribute in self.entries.iter().filter(|a| keep(a)) {
            if !keys.iter().any(|k| names_match(k, &attribute.key)) {
                keys.push(&attribute.key);
            }
        }
        keys
    }
}

impl PartialEq for AttributeStore {
    /// Stores are equal when they hold the same pairs, in any order, keys
    /// compared case-insensitively.
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }

        let mut used = vec![false; other.entries.len()];
        self.entries.iter().all(|a| {
            let found = other.entries.iter().enumerate().position(|(i, b)| {
                !used[i] && names_match(&a.key, &b.key) && a.value == b.value
            });
            found.is_some_and(|i| {
                used[i] = true;
                true
            })
        })
    }
}

impl Eq for AttributeStore {}

impl fmt::Display for AttributeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, attribute) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{attribute}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a AttributeStore {
    type Item = (&'a str, Option<&'a str>);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Builds an attribute store from split members with the process-wide shape.
#[must_use]
pub fn build_attribute_store(members: &[Member<'_>]) -> AttributeStore {
    AttributeStore::from_members(members, OutputShape::global())
}

/// Values are quoted when they would not survive re-splitting unquoted.
fn value_needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value.chars().all(|c| c == '=')
        || value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "\";,()<>@:\\[]?{}".contains(c))
}

fn bare_needs_quoting(key: &str) -> bool {
    split_respecting_quotes(key, ';').len() != 1
        || split_respecting_quotes(key, ',').len() != 1
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
    use crate::split::split_members;

    fn store(content: &str) -> AttributeStore {
        let members: Vec<Member<'_>> = split_members(content).into_iter().map(Member::new).collect();
        AttributeStore::from_members(&members, OutputShape::Flexible)
    }

    #[test]
    fn test_member_into_pair() {
        assert_eq!(
            Member::new("charset=UTF-8").into_pair(),
            Some(("charset".to_string(), Some("UTF-8".to_string())))
        );
        assert_eq!(
            Member::new("text/html").into_pair(),
            Some(("text/html".to_string(), None))
        );
        assert_eq!(
            Member::new(r#"v="46,43""#).into_pair(),
            Some(("v".to_string(), Some("46,43".to_string())))
        );
        assert_eq!(Member::new("").into_pair(), None);
    }

    #[test]
    fn test_member_padding_stays_bare() {
        assert_eq!(
            Member::new("dXNlcjpwYXNz==").into_pair(),
            Some(("dXNlcjpwYXNz==".to_string(), None))
        );
        assert_eq!(
            Member::new("Basic abc=def").into_pair(),
            Some(("Basic abc=def".to_string(), None))
        );
        assert_eq!(
            Member::new("NID=200=IGp").into_pair(),
            Some(("NID".to_string(), Some("200=IGp".to_string())))
        );
    }

    #[test]
    fn test_get_case_insensitive() {
        let attrs = store("application/json; Charset=UTF-8; format=flowed");
        assert_eq!(attrs.get("charset"), Some(OneOrMany::One("UTF-8")));
        assert_eq!(attrs.get("CHARSET"), attrs.get("charset"));
        assert_eq!(attrs.get("application/json"), None);
        assert!(attrs.contains("application/json"));
        assert_eq!(attrs.get("missing"), None);
    }

    #[test]
    fn test_get_dash_underscore_folding() {
        let attrs = store("max-age=0; report_to=x");
        assert_eq!(attrs.get("max_age"), Some(OneOrMany::One("0")));
        assert_eq!(attrs.get("Report-To"), Some(OneOrMany::One("x")));
    }

    #[test]
    fn test_get_one_to_many() {
        let attrs = store("charset=UTF-8; charset=ASCII; format=flowed");
        assert_eq!(attrs.get("charset"), Some(OneOrMany::Many(vec!["UTF-8", "ASCII"])));
        assert!(attrs.has_many("charset"));
        assert!(!attrs.has_many("format"));
    }

    #[test]
    fn test_get_always_many() {
        let members = [Member::new("charset=UTF-8")];
        let attrs = AttributeStore::from_members(&members, OutputShape::AlwaysMany);
        assert_eq!(attrs.get("charset"), Some(OneOrMany::Many(vec!["UTF-8"])));
    }

    #[test]
    fn test_insert_positions() {
        let mut attrs = store("text/html; charset=UTF-8");
        attrs.insert("charset", None, None);
        assert_eq!(attrs.to_string(), "text/html; charset=UTF-8; charset");

        let mut attrs = store("text/html; charset");
        attrs.insert("charset", Some("UTF-8".into()), Some(1));
        assert_eq!(attrs.to_string(), "text/html; charset=UTF-8; charset");

        attrs.insert("hello", None, Some(0));
        assert_eq!(attrs.entry(0), Some(("hello", None)));
        attrs.insert("tail", None, Some(99));
        assert_eq!(attrs.entry(attrs.len() - 1), Some(("tail", None)));
    }

    #[test]
    fn test_remove_variants() {
        let mut attrs = store("text/html; charset=UTF-8; charset");
        assert_eq!(attrs.remove("charset", ValueFilter::Bare), 1);
        assert_eq!(attrs.to_string(), "text/html; charset=UTF-8");

        let mut attrs = store("text/html; charset=UTF-8; charset");
        assert_eq!(attrs.remove("Charset", ValueFilter::Any), 2);
        assert_eq!(attrs.to_string(), "text/html");

        let mut attrs = store("q=1; q=2; q=1");
        assert_eq!(attrs.remove("q", ValueFilter::Equals("1")), 2);
        assert_eq!(attrs.to_string(), "q=2");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut attrs = store("text/html; charset=UTF-8");
        let before = attrs.clone();
        assert_eq!(attrs.remove("boundary", ValueFilter::Any), 0);
        assert_eq!(attrs, before);
        assert_eq!(attrs.to_string(), "text/html; charset=UTF-8");
    }

    #[test]
    fn test_remove_leaves_no_orphan_separator() {
        let mut attrs = store("text/html; charset=UTF-8;    format=flowed");
        attrs.remove("charset", ValueFilter::Any);
        assert_eq!(attrs.to_string(), "text/html; format=flowed");

        attrs.remove("format", ValueFilter::Any);
        assert_eq!(attrs.to_string(), "text/html");
    }

    #[test]
    fn test_remove_at() {
        let mut attrs = store("a; b=k; h; h; z=0; y=000");
        let removed = attrs.remove_at(1).unwrap();
        assert_eq!(removed.key(), "b");
        assert_eq!(removed.value(), Some("k"));
        assert_eq!(
            attrs.remove_at(10),
            Err(Error::IndexOutOfRange { index: 10, len: 5 })
        );
    }

    #[test]
    fn test_keys_and_valued_keys() {
        let attrs = store("text/html; charset=UTF-8; Charset=ASCII; secure; format=flowed");
        assert_eq!(attrs.keys(), vec!["text/html", "charset", "secure", "format"]);
        assert_eq!(attrs.valued_keys(), vec!["charset", "format"]);
    }

    #[test]
    fn test_equality_ignores_order_and_case() {
        let a = store("a; p=8a; a; XX");
        let b = store("p=8a; a; a; XX");
        let c = store("p=8a; a; A; Xx");
        let d = store("p=8a; a; A; Xx; XX=a");
        let e = store("p=8A; a; A; Xx");

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, d);
        assert_ne!(a, e);
    }

    #[test]
    fn test_display_quotes_when_needed() {
        let attrs = store(r#"text/html; charset="UTF-\"8""#);
        assert_eq!(attrs.get("charset"), Some(OneOrMany::One("UTF-\"8")));
        assert_eq!(attrs.to_string(), r#"text/html; charset="UTF-\"8""#);

        let attrs = store(r#"quic=":443"; ma=2592000; v="46,43""#);
        assert_eq!(attrs.to_string(), r#"quic=":443"; ma=2592000; v="46,43""#);

        let mut attrs = AttributeStore::with_shape(OutputShape::Flexible);
        attrs.insert("expires", Some("Wed, 15-Apr-2020 21:27:31 GMT".into()), None);
        attrs.insert("a;b", None, None);
        attrs.insert("", None, None);
        attrs.insert("empty", Some(String::new()), None);
        assert_eq!(
            attrs.to_string(),
            r#"expires="Wed, 15-Apr-2020 21:27:31 GMT"; "a;b"; ""; empty="""#
        );
    }

    #[test]
    fn test_display_reparses_to_same_store() {
        let original = store(r#"form-data; name="a b"; filename="x;y.txt"; flag; k=="#);
        let reparsed = store(&original.to_string());
        assert_eq!(original, reparsed);
        assert_eq!(reparsed.to_string(), original.to_string());
    }

    #[test]
    fn test_build_attribute_store() {
        let members = [Member::from("text/html"), Member::from("charset=UTF-8"), Member::from("")];
        let attrs = build_attribute_store(&members);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get_all("charset"), vec!["UTF-8"]);
    }

    #[test]
    fn test_iteration_order() {
        let attrs = store("z; a=1; m");
        let pairs: Vec<_> = attrs.iter().collect();
        assert_eq!(pairs, vec![("z", None), ("a", Some("1")), ("m", None)]);
        assert_eq!((&attrs).into_iter().count(), 3);
    }
}
