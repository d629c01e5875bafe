//! A single named header and its parsed attributes.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::attributes::{AttributeStore, Member, ValueFilter};
use crate::error::{Error, Result};
use crate::normalize::{
    extract_comments, is_json_like, is_legal_header_name, names_match, normalize_name,
    prettify_name, unfold, unquote,
};
use crate::options::{OneOrMany, OutputShape};
use crate::registry::{self, HeaderSpec};
use crate::split::{split_members, split_respecting_quotes};

/// A header: a name, its raw content, and the attributes parsed from it.
///
/// The raw content is kept as received, folding included. Any mutation of the
/// attributes regenerates the content from the attribute store so both views
/// stay consistent.
///
/// ```
/// use headerkit::{Header, OneOrMany};
///
/// let header = Header::new("Content-Type", "text/html; charset=UTF-8")?;
/// assert_eq!(header.normalized_name(), "content_type");
/// assert!(header.has("text/html"));
/// assert_eq!(header.get("charset"), Some(OneOrMany::One("UTF-8".to_string())));
/// # Ok::<(), headerkit::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Header {
    name: String,
    content: String,
    attrs: AttributeStore,
}

impl Header {
    /// Creates a header using the process-wide output shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `name` is not a legal header name.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        Self::with_shape(name, content, OutputShape::global())
    }

    /// Creates a header with an explicit output shape for attribute lookups.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if `name` is not a legal header name.
    pub fn with_shape(
        name: impl Into<String>,
        content: impl Into<String>,
        shape: OutputShape,
    ) -> Result<Self> {
        let name = name.into();
        if !is_legal_header_name(&name) {
            return Err(Error::MalformedInput(format!(
                "illegal header name {name:?}"
            )));
        }
        Ok(Self::from_parts(name, content.into(), shape))
    }

    /// Builds a header whose name is already known to be legal.
    pub(crate) fn from_parts(name: String, content: String, shape: OutputShape) -> Self {
        let attrs = if is_json_like(&content) {
            json_attributes(&content, shape).unwrap_or_else(|| {
                let mut attrs = AttributeStore::with_shape(shape);
                attrs.insert(content.trim(), None, None);
                attrs
            })
        } else {
            let members: Vec<Member<'_>> =
                split_members(&content).into_iter().map(Member::new).collect();
            AttributeStore::from_members(&members, shape)
        };

        Self {
            name,
            content,
            attrs,
        }
    }

    /// The name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name lowercased with `-` turned into `_`.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// The name with each dash-separated word capitalized.
    #[must_use]
    pub fn pretty_name(&self) -> String {
        prettify_name(&self.name)
    }

    /// The content exactly as stored, folding and quotes included.
    #[must_use]
    pub fn raw_content(&self) -> &str {
        &self.content
    }

    /// The content, unquoted when it holds a single member.
    #[must_use]
    pub fn content(&self) -> &str {
        if self.attrs.len() == 1 {
            unquote(self.content.trim())
        } else {
            &self.content
        }
    }

    /// The content with line folding removed.
    #[must_use]
    pub fn unfolded_content(&self) -> String {
        unfold(self.content())
    }

    /// Text of every top-level parenthesized comment in the content.
    #[must_use]
    pub fn comments(&self) -> Vec<&str> {
        extract_comments(&self.content)
    }

    /// The underlying attribute store.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeStore {
        &self.attrs
    }

    /// Member and attribute keys in order, repeated keys included.
    #[must_use]
    pub fn attrs(&self) -> Vec<&str> {
        self.attrs.iter().map(|(key, _)| key).collect()
    }

    /// Distinct keys carrying a value, in order.
    #[must_use]
    pub fn valued_attrs(&self) -> Vec<&str> {
        self.attrs.valued_keys()
    }

    /// Number of members and attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns true if the content holds no member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Returns the `(key, value)` pair at `index`.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<(&str, Option<&str>)> {
        self.attrs.entry(index)
    }

    /// Iterates over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.attrs.iter()
    }

    /// Values of an attribute, unfolded.
    ///
    /// Bare members have no value, so asking for one returns `None`.
    #[must_use]
    pub fn get(&self, attr: &str) -> Option<OneOrMany<String>> {
        OneOrMany::from_vec(self.get_all(attr), self.attrs.shape())
    }

    /// Every value of an attribute, unfolded, in order.
    #[must_use]
    pub fn get_all(&self, attr: &str) -> Vec<String> {
        self.attrs.get_all(attr).into_iter().map(unfold).collect()
    }

    /// Returns true if `attr` is a member or attribute key, or one of the
    /// whitespace-separated words of the content (`Bearer` in
    /// `Bearer abc123`).
    #[must_use]
    pub fn has(&self, attr: &str) -> bool {
        self.attrs.contains(attr)
            || split_respecting_quotes(&self.unfolded_content(), ' ')
                .iter()
                .any(|word| names_match(word, attr))
    }

    /// Returns true if `attr` carries more than one value.
    #[must_use]
    pub fn has_many(&self, attr: &str) -> bool {
        self.attrs.has_many(attr)
    }

    /// Returns true if `text` is the whole content or one of its keys.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.content() == text || self.attrs.contains(text)
    }

    /// Inserts a member (`value` is `None`) or attribute before `index`.
    pub fn insert(&mut self, index: usize, key: impl Into<String>, value: Option<String>) {
        self.attrs.insert(key, value, Some(index));
        self.sync_content();
    }

    /// Appends a bare member.
    pub fn add_member(&mut self, member: impl Into<String>) {
        self.attrs.insert(member, None, None);
        self.sync_content();
    }

    /// Removes every bare occurrence of `member`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no bare member has that name.
    pub fn remove_member(&mut self, member: &str) -> Result<()> {
        if self.attrs.remove(member, ValueFilter::Bare) == 0 {
            return Err(Error::NotFound(format!(
                "member {member:?} in header {}",
                self.name
            )));
        }
        self.sync_content();
        Ok(())
    }

    /// Sets an attribute, replacing every previous occurrence of the key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.attrs.remove(key, ValueFilter::Any);
        self.attrs.insert(key, Some(value.into()), None);
        self.sync_content();
    }

    /// Removes every valued occurrence of an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the attribute has no value.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        if self.attrs.remove(key, ValueFilter::Valued) == 0 {
            return Err(Error::NotFound(format!(
                "attribute {key:?} in header {}",
                self.name
            )));
        }
        self.sync_content();
        Ok(())
    }

    /// Removes and returns the last member or attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the header is empty.
    pub fn pop(&mut self) -> Result<(String, Option<String>)> {
        let Some(last) = self.attrs.len().checked_sub(1) else {
            return Err(Error::NotFound(format!("member to pop in header {}", self.name)));
        };
        self.pop_at(last)
    }

    /// Removes and returns the member or attribute at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is past the end.
    pub fn pop_at(&mut self, index: usize) -> Result<(String, Option<String>)> {
        let removed = self.attrs.remove_at(index)?;
        self.sync_content();
        Ok(removed.into_parts())
    }

    /// Removes every occurrence of `key` and returns its values, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `key` is absent.
    pub fn pop_key(&mut self, key: &str) -> Result<(String, Option<OneOrMany<String>>)> {
        if !self.attrs.contains(key) {
            return Err(Error::NotFound(format!(
                "attribute {key:?} in header {}",
                self.name
            )));
        }
        let values = self.get(key);
        self.attrs.remove(key, ValueFilter::Any);
        self.sync_content();
        Ok((key.to_string(), values))
    }

    /// Serializes as `Name: content`.
    #[must_use]
    pub fn to_text(&self) -> String {
        format!("{}: {}", self.name, self.content)
    }

    /// Registry entry for this header's name, if it is a well-known one.
    #[must_use]
    pub fn spec(&self) -> Option<&'static HeaderSpec> {
        registry::lookup(&self.name)
    }

    /// Parses the content as a date.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        registry::parse_date(&self.unfolded_content())
    }

    fn sync_content(&mut self) {
        self.content = self.attrs.to_string();
    }
}

/// Attributes of JSON content: object keys become attributes (a `null` value
/// gives a bare member) and list items become members.
///
/// Returns `None` when the content does not decode to an object or a list.
fn json_attributes(content: &str, shape: OutputShape) -> Option<AttributeStore> {
    let payload = match serde_json::from_str::<Value>(content) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::debug!(%err, "undecodable JSON content kept as one member");
            return None;
        }
    };

    let mut attrs = AttributeStore::with_shape(shape);
    match payload {
        Value::Object(map) => {
            for (key, value) in map {
                attrs.insert(key, json_scalar(value), None);
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(text) => {
                        if let Some((key, value)) = Member::new(&text).into_pair() {
                            attrs.insert(key, value, None);
                        }
                    }
                    other => attrs.insert(other.to_string(), None, None),
                }
            }
        }
        _ => return None,
    }
    Some(attrs)
}

fn json_scalar(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

impl PartialEq for Header {
    /// Headers are equal when their names match case-insensitively and their
    /// attributes hold the same pairs in any order.
    fn eq(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name) && self.attrs == other.attrs
    }
}

impl Eq for Header {}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.content)
    }
}

impl<'a> IntoIterator for &'a Header {
    type Item = (&'a str, Option<&'a str>);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
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
    use chrono::Datelike;

    fn header(name: &str, content: &str) -> Header {
        Header::with_shape(name, content, OutputShape::Flexible).unwrap()
    }

    #[test]
    fn test_new_rejects_illegal_names() {
        assert!(matches!(
            Header::new("Bad Name", "x"),
            Err(Error::MalformedInput(_))
        ));
        assert!(Header::new("", "x").is_err());
        assert!(Header::new("X-Ok", "").is_ok());
    }

    #[test]
    fn test_names() {
        let h = header("x-hEllo-wORLD", "1");
        assert_eq!(h.name(), "x-hEllo-wORLD");
        assert_eq!(h.normalized_name(), "x_hello_world");
        assert_eq!(h.pretty_name(), "X-Hello-World");
    }

    #[test]
    fn test_content_type_attributes() {
        let h = header("Content-Type", "text/html; charset=UTF-8");
        assert_eq!(h.attrs(), vec!["text/html", "charset"]);
        assert_eq!(h.valued_attrs(), vec!["charset"]);
        assert!(h.has("charset"));
        assert!(h.has("text/html"));
        assert!(!h.has("boundary"));
        assert_eq!(h.get("charset"), Some(OneOrMany::One("UTF-8".into())));
        assert_eq!(h.get("text/html"), None);
        assert_eq!(h.content(), "text/html; charset=UTF-8");
    }

    #[test]
    fn test_content_unquoted_when_single() {
        let h = header("ETag", "\"33a64df551425fcc55e4d42a148795d9f25f89d4\"");
        assert_eq!(h.content(), "33a64df551425fcc55e4d42a148795d9f25f89d4");
        assert_eq!(h.raw_content(), "\"33a64df551425fcc55e4d42a148795d9f25f89d4\"");
    }

    #[test]
    fn test_has_matches_words() {
        let h = header("Authorization", "Bearer mysupersecrettoken");
        assert!(h.has("Bearer"));
        assert!(h.has("bearer"));
        assert!(!h.has("Basic"));
        assert!(h.matches("Bearer mysupersecrettoken"));
        assert!(h.matches("bearer mysupersecrettoken"));
    }

    #[test]
    fn test_get_unfolds_values() {
        let h = header("Set-Cookie", "id=a3fWa\r\n  b; Path=/");
        assert_eq!(h.get("id"), Some(OneOrMany::One("a3fWab".into())));
        assert_eq!(h.raw_content(), "id=a3fWa\r\n  b; Path=/");
    }

    #[test]
    fn test_multi_valued_attribute() {
        let h = header("Content-Type", "text/html; charset=UTF-8; charset=ASCII");
        assert!(h.has_many("charset"));
        assert_eq!(
            h.get("charset"),
            Some(OneOrMany::Many(vec!["UTF-8".into(), "ASCII".into()]))
        );

        let h = Header::with_shape("Content-Type", "charset=UTF-8", OutputShape::AlwaysMany)
            .unwrap();
        assert_eq!(h.get("charset"), Some(OneOrMany::Many(vec!["UTF-8".into()])));
    }

    #[test]
    fn test_comments() {
        let h = header(
            "User-Agent",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.9; rv:50.0) Gecko/20100101 Firefox/50.0",
        );
        assert_eq!(h.comments(), vec!["Macintosh; Intel Mac OS X 10.9; rv:50.0"]);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_add_and_remove_member() {
        let mut h = header("Content-Type", "charset=utf-8");
        h.add_member("text/html");
        assert_eq!(h.raw_content(), "charset=utf-8; text/html");
        assert!(h.has("text/html"));

        h.remove_member("text/html").unwrap();
        assert_eq!(h.raw_content(), "charset=utf-8");
        assert!(h.remove_member("text/html").unwrap_err().is_not_found());
    }

    #[test]
    fn test_set_replaces_previous_values() {
        let mut h = header("Content-Type", "text/html; charset=UTF-8; charset");
        h.set("charset", "ASCII");
        assert_eq!(h.raw_content(), "text/html; charset=ASCII");

        h.set("format", "a b");
        assert_eq!(h.raw_content(), "text/html; charset=ASCII; format=\"a b\"");
        assert_eq!(h.get("format"), Some(OneOrMany::One("a b".into())));
    }

    #[test]
    fn test_delete_only_valued() {
        let mut h = header("Content-Type", "text/html; charset=UTF-8; charset");
        h.delete("charset").unwrap();
        assert_eq!(h.raw_content(), "text/html; charset");
        assert!(h.has("charset"));
        assert!(matches!(h.delete("charset"), Err(Error::NotFound(_))));
        assert!(h.delete("absent").is_err());
    }

    #[test]
    fn test_insert_at_index() {
        let mut h = header("Content-Type", "text/html; format=flowed");
        h.insert(1, "charset", Some("UTF-8".into()));
        assert_eq!(h.raw_content(), "text/html; charset=UTF-8; format=flowed");
        h.insert(0, "first", None);
        assert_eq!(h.entry(0), Some(("first", None)));
    }

    #[test]
    fn test_pop_variants() {
        let mut h = header("Content-Type", "text/html; charset=UTF-8; format=flowed");
        assert_eq!(h.pop().unwrap(), ("format".into(), Some("flowed".into())));
        assert_eq!(h.pop_at(0).unwrap(), ("text/html".into(), None));
        assert_eq!(h.raw_content(), "charset=UTF-8");

        let (key, values) = h.pop_key("Charset").unwrap();
        assert_eq!(key, "Charset");
        assert_eq!(values, Some(OneOrMany::One("UTF-8".into())));
        assert!(h.is_empty());
        assert_eq!(h.raw_content(), "");

        assert!(h.pop().is_err());
        assert!(matches!(h.pop_at(3), Err(Error::IndexOutOfRange { index: 3, len: 0 })));
        assert!(h.pop_key("charset").is_err());
    }

    #[test]
    fn test_attrs_keep_order_and_case() {
        let h = header("Content-Type", "aA; bc=k; hA; h; h; zZzZ=0");
        assert_eq!(h.attrs(), vec!["aA", "bc", "hA", "h", "h", "zZzZ"]);
        assert_eq!(h.valued_attrs(), vec!["bc", "zZzZ"]);

        let mut h = header("Content-Type", "a; b=k; h; h; z=0");
        h.insert(2, "ppp", Some("nt".into()));
        assert_eq!(h.attrs(), vec!["a", "b", "ppp", "h", "h", "z"]);
        assert_eq!(h.pop_at(3).unwrap(), ("h".into(), None));
        assert_eq!(h.attrs(), vec!["a", "b", "ppp", "h", "z"]);
    }

    #[test]
    fn test_pop_key_bare_member() {
        let mut h = header("Cache-Control", "no-cache; max-age=0");
        assert_eq!(h.pop_key("no-cache").unwrap(), ("no-cache".into(), None));
        assert_eq!(h.raw_content(), "max-age=0");
    }

    #[test]
    fn test_equality() {
        let a = header("Content-Type", "text/html; charset=UTF-8");
        let b = header("content-type", "charset=UTF-8; text/html");
        let c = header("content_type", "text/html; charset=utf-8");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, header("X-Content-Type", "text/html; charset=UTF-8"));
    }

    #[test]
    fn test_json_object_keys_become_attributes() {
        let h = header("X-Json", r#"{"a": "1", "b": null, "n": 2, "c": "x;y"}"#);
        assert_eq!(h.attrs(), vec!["a", "b", "n", "c"]);
        assert_eq!(h.get("a"), Some(OneOrMany::One("1".into())));
        assert_eq!(h.get("n"), Some(OneOrMany::One("2".into())));
        assert_eq!(h.get("c"), Some(OneOrMany::One("x;y".into())));
        assert_eq!(h.get("b"), None);
        assert!(h.has("b"));
        assert_eq!(h.raw_content(), r#"{"a": "1", "b": null, "n": 2, "c": "x;y"}"#);
    }

    #[test]
    fn test_json_list_items_become_members() {
        let h = header("X-Json", r#"["gzip", "q=0.5", 3]"#);
        assert_eq!(h.attrs(), vec!["gzip", "q", "3"]);
        assert_eq!(h.get("q"), Some(OneOrMany::One("0.5".into())));
    }

    #[test]
    fn test_invalid_json_content_is_opaque() {
        let h = header("X-Json", "{not json, at all}");
        assert_eq!(h.len(), 1);
        assert_eq!(h.content(), "{not json, at all}");
    }

    #[test]
    fn test_to_text_and_display() {
        let h = header("Host", "developer.mozilla.org");
        assert_eq!(h.to_text(), "Host: developer.mozilla.org");
        assert_eq!(h.to_string(), h.to_text());
    }

    #[test]
    fn test_iteration() {
        let h = header("Content-Type", "text/html; charset=UTF-8");
        let pairs: Vec<_> = h.iter().collect();
        assert_eq!(pairs, vec![("text/html", None), ("charset", Some("UTF-8"))]);
        assert_eq!((&h).into_iter().count(), 2);
    }

    #[test]
    fn test_spec_and_date() {
        let h = header("date", "Tue, 17 Mar 2020 08:29:37 GMT");
        assert_eq!(h.spec().unwrap().name, "Date");
        assert_eq!(h.date().unwrap().year(), 2020);
        assert!(header("X-Custom", "1").spec().is_none());
    }
}
