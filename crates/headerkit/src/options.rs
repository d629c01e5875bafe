//! Parse configuration and the single-or-many return shape.

use std::sync::OnceLock;

/// Process-wide default shape, installed at most once.
static GLOBAL_SHAPE: OnceLock<OutputShape> = OnceLock::new();

/// How lookups that may match several entries report their result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OutputShape {
    /// A single match is returned as [`OneOrMany::One`], several as
    /// [`OneOrMany::Many`].
    #[default]
    Flexible,
    /// Every match set is returned as [`OneOrMany::Many`], even a single one.
    AlwaysMany,
}

impl OutputShape {
    /// Installs the process-wide default shape.
    ///
    /// Meant to be called once at startup, before any parsing happens. The
    /// value cannot be changed afterwards.
    ///
    /// # Errors
    ///
    /// Returns the already installed shape if one was set before.
    pub fn install(shape: Self) -> std::result::Result<(), Self> {
        GLOBAL_SHAPE.set(shape).map_err(|_| Self::global())
    }

    /// Returns the process-wide default shape (`Flexible` unless installed).
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_SHAPE.get().copied().unwrap_or_default()
    }
}

/// Either a single value or an ordered sequence of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    /// Exactly one match.
    One(T),
    /// Several matches, or any number under [`OutputShape::AlwaysMany`].
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Builds the shape for `values`, or `None` when `values` is empty.
    #[must_use]
    pub fn from_vec(mut values: Vec<T>, shape: OutputShape) -> Option<Self> {
        match (values.len(), shape) {
            (0, _) => None,
            (1, OutputShape::Flexible) => values.pop().map(Self::One),
            _ => Some(Self::Many(values)),
        }
    }

    /// Returns true when this holds more than one value.
    #[must_use]
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(v) if v.len() > 1)
    }

    /// Number of values held.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(v) => v.len(),
        }
    }

    /// Returns true if no value is held (only possible for an empty `Many`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the first value.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        match self {
            Self::One(v) => Some(v),
            Self::Many(v) => v.first(),
        }
    }

    /// Flattens into a vector regardless of shape.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }

    /// Maps every held value.
    #[must_use]
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> OneOrMany<U> {
        match self {
            Self::One(v) => OneOrMany::One(f(v)),
            Self::Many(v) => OneOrMany::Many(v.into_iter().map(f).collect()),
        }
    }
}

impl<T> IntoIterator for OneOrMany<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

/// Options controlling how a header block is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[allow(clippy::struct_excessive_bools)]
pub struct ParseOptions {
    /// Return shape for multi-valued lookups on the parsed model.
    pub output_shape: OutputShape,
    /// Decode RFC 2047 encoded words found in header values.
    pub decode_encoded_words: bool,
    /// Explode comma-joined values into distinct headers.
    pub split_entries: bool,
    /// Ignore status/request lines and blank lines before the first header.
    pub skip_leading_non_headers: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            output_shape: OutputShape::global(),
            decode_encoded_words: true,
            split_entries: true,
            skip_leading_non_headers: true,
        }
    }
}

impl ParseOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output shape.
    #[must_use]
    pub const fn with_output_shape(mut self, shape: OutputShape) -> Self {
        self.output_shape = shape;
        self
    }

    /// Enables or disables RFC 2047 decoding.
    #[must_use]
    pub const fn with_encoded_words(mut self, decode: bool) -> Self {
        self.decode_encoded_words = decode;
        self
    }

    /// Enables or disables comma explosion into distinct headers.
    #[must_use]
    pub const fn with_split_entries(mut self, split: bool) -> Self {
        self.split_entries = split;
        self
    }

    /// Enables or disables skipping of leading non-header lines.
    #[must_use]
    pub const fn with_skip_leading_non_headers(mut self, skip: bool) -> Self {
        self.skip_leading_non_headers = skip;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_one_or_many_flexible() {
        assert_eq!(OneOrMany::<u8>::from_vec(vec![], OutputShape::Flexible), None);
        assert_eq!(
            OneOrMany::from_vec(vec![1], OutputShape::Flexible),
            Some(OneOrMany::One(1))
        );
        assert_eq!(
            OneOrMany::from_vec(vec![1, 2], OutputShape::Flexible),
            Some(OneOrMany::Many(vec![1, 2]))
        );
    }

    #[test]
    fn test_one_or_many_always_many() {
        let single = OneOrMany::from_vec(vec!["a"], OutputShape::AlwaysMany).unwrap();
        assert_eq!(single, OneOrMany::Many(vec!["a"]));
        assert!(!single.is_many());
        assert_eq!(single.len(), 1);
        assert_eq!(single.first(), Some(&"a"));
    }

    #[test]
    fn test_one_or_many_map_and_iter() {
        let values = OneOrMany::Many(vec!["a", "b"]).map(str::to_uppercase);
        assert_eq!(values.into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .with_output_shape(OutputShape::AlwaysMany)
            .with_encoded_words(false)
            .with_split_entries(false)
            .with_skip_leading_non_headers(false);

        assert_eq!(options.output_shape, OutputShape::AlwaysMany);
        assert!(!options.decode_encoded_words);
        assert!(!options.split_entries);
        assert!(!options.skip_leading_non_headers);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_parse_options_serde() {
        let options: ParseOptions =
            serde_json::from_str(r#"{"output_shape": "always_many"}"#).unwrap();
        assert_eq!(options.output_shape, OutputShape::AlwaysMany);
        assert!(options.decode_encoded_words);
    }
}
