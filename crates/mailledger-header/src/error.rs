//! Error types for header parsing and folding.

/// Result type alias for header operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers.
///
/// Malformed header values never produce an `Error`; they are recorded as
/// [`Defect`](crate::Defect)s on the parse tree instead. Errors only signal
/// caller misuse.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid folding policy.
    #[error("Invalid policy: {0}")]
    Policy(String),

    /// Invalid encoded word.
    #[error("Invalid encoded word: {0}")]
    InvalidEncodedWord(String),

    /// A mandatory grammar production did not match.
    #[error(transparent)]
    Parse(#[from] HeaderParseError),
}

/// Backtracking signal raised when a grammar production does not match.
///
/// Parser functions return this to let an enclosing alternative try the next
/// production. It only escapes the parser as the single error synthesized when
/// every alternative of a mandatory production has failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HeaderParseError {
    message: String,
}

impl HeaderParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Shorthand for the common "expected X but found Y" message.
    #[must_use]
    pub fn expected(what: &str, found: &str) -> Self {
        Self::new(format!("expected {what} but found '{found}'"))
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_message() {
        let err = HeaderParseError::expected("atom", "<x>");
        assert_eq!(err.to_string(), "expected atom but found '<x>'");
    }

    #[test]
    fn test_error_from_parse_error() {
        let err: Error = HeaderParseError::new("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
