//! Error types for header operations.

/// Result type alias for header operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Header error types.
///
/// Parsing itself never fails on malformed content; these errors are reserved
/// for constructing a header with an illegal name and for lookups that must
/// either produce a value or report its absence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Input rejected at construction, such as an illegal header name.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A lookup that guarantees a result found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Positional access past the end of a collection.
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Length of the collection at the time of the call.
        len: usize,
    },
}

impl Error {
    /// Returns true for both flavours of "nothing there".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::IndexOutOfRange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MalformedInput("illegal header name \"a:b\"".into());
        assert_eq!(err.to_string(), "Malformed input: illegal header name \"a:b\"");

        let err = Error::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Index 4 out of range for length 2");
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(Error::IndexOutOfRange { index: 0, len: 0 }.is_not_found());
        assert!(!Error::MalformedInput("x".into()).is_not_found());
    }
}
