//! Folding policy configuration.

use crate::error::{Error, Result};

/// Default maximum line length from RFC 5322 section 2.1.1.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 78;

/// Shortest line that still fits the widest encoded-word chrome
/// (`=?unknown-8bit?q?` plus `?=`) and one encoded character.
const MIN_LINE_LENGTH: usize = "=?unknown-8bit?q??=".len() + 4;

/// Controls how parse trees are folded into physical lines.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Policy {
    /// Maximum line length including the line separator. Zero means unlimited.
    pub max_line_length: usize,
    /// Line separator appended to every folded line.
    pub linesep: String,
    /// Emit non-ASCII text verbatim instead of as RFC 2047 encoded words.
    pub utf8: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            linesep: "\n".to_string(),
            utf8: false,
        }
    }
}

impl Policy {
    /// Policy for SMTP transport: 78 columns, CRLF line endings.
    #[must_use]
    pub fn smtp() -> Self {
        Self {
            linesep: "\r\n".to_string(),
            ..Self::default()
        }
    }

    /// Policy for SMTPUTF8 transport: like [`Policy::smtp`] but without
    /// encoded words.
    #[must_use]
    pub fn smtp_utf8() -> Self {
        Self {
            utf8: true,
            ..Self::smtp()
        }
    }

    /// Creates a policy builder.
    #[must_use]
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::new()
    }

    /// Returns the room left for line content once the separator is
    /// accounted for.
    #[must_use]
    pub fn effective_max_len(&self) -> usize {
        if self.max_line_length == 0 {
            usize::MAX
        } else {
            self.max_line_length.saturating_sub(self.linesep.len())
        }
    }
}

/// Builder for [`Policy`].
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    max_line_length: usize,
    linesep: String,
    utf8: bool,
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyBuilder {
    /// Creates a builder starting from the default policy.
    #[must_use]
    pub fn new() -> Self {
        let policy = Policy::default();
        Self {
            max_line_length: policy.max_line_length,
            linesep: policy.linesep,
            utf8: policy.utf8,
        }
    }

    /// Sets the maximum line length. Zero disables folding.
    #[must_use]
    pub const fn max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Sets the line separator.
    #[must_use]
    pub fn linesep(mut self, linesep: impl Into<String>) -> Self {
        self.linesep = linesep.into();
        self
    }

    /// Enables or disables verbatim UTF-8 output.
    #[must_use]
    pub const fn utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    /// Builds the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Policy`] if the line separator is not one of `\n`,
    /// `\r\n` or `\r`, or if the line length cannot hold an encoded word.
    pub fn build(self) -> Result<Policy> {
        if !matches!(self.linesep.as_str(), "\n" | "\r\n" | "\r") {
            return Err(Error::Policy(format!(
                "unsupported line separator {:?}",
                self.linesep
            )));
        }
        let minimum = MIN_LINE_LENGTH + self.linesep.len();
        if self.max_line_length != 0 && self.max_line_length < minimum {
            return Err(Error::Policy(format!(
                "max_line_length {} is too small to fit an encoded word (minimum {minimum})",
                self.max_line_length
            )));
        }
        Ok(Policy {
            max_line_length: self.max_line_length,
            linesep: self.linesep,
            utf8: self.utf8,
        })
    }
}
