//! Non-fatal anomalies recorded while leniently parsing header values.

use std::fmt;

/// Placeholder character injected by charset decoders for undecodable bytes.
pub const UNDECODABLE_PLACEHOLDER: char = '\u{FFFD}';

/// Classification of a [`Defect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DefectKind {
    /// Header is syntactically invalid.
    InvalidHeader,
    /// Header uses obsolete RFC 5322 syntax.
    ObsoleteHeader,
    /// Token contains ASCII non-printable characters.
    NonPrintable,
    /// Text contains bytes that could not be decoded.
    UndecodableBytes,
    /// Local part of an address contains non-ASCII characters.
    NonAsciiLocalPart,
    /// A required header value is missing.
    HeaderMissingRequiredValue,
    /// Unknown charset in an encoded word.
    Charset,
    /// Base64 encoded word had incorrect padding.
    InvalidBase64Padding,
    /// Base64 encoded word contained characters outside the alphabet.
    InvalidBase64Characters,
    /// Base64 encoded word had an impossible length.
    InvalidBase64Length,
}

impl DefectKind {
    /// Returns true for kinds that make a construct invalid rather than merely
    /// obsolete or cosmetically wrong.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        matches!(
            self,
            Self::InvalidHeader | Self::NonPrintable | Self::HeaderMissingRequiredValue
        )
    }
}

/// A classified, non-fatal anomaly attached to a parse tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Defect {
    /// Defect classification.
    pub kind: DefectKind,
    /// Human-readable description.
    pub message: String,
}

impl Defect {
    /// Creates a new defect.
    #[must_use]
    pub fn new(kind: DefectKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an [`DefectKind::InvalidHeader`] defect.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(DefectKind::InvalidHeader, message)
    }

    /// Creates an [`DefectKind::ObsoleteHeader`] defect.
    #[must_use]
    pub fn obsolete(message: impl Into<String>) -> Self {
        Self::new(DefectKind::ObsoleteHeader, message)
    }

    /// Creates an [`DefectKind::HeaderMissingRequiredValue`] defect.
    #[must_use]
    pub fn missing(message: impl Into<String>) -> Self {
        Self::new(DefectKind::HeaderMissingRequiredValue, message)
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Returns true if `text` carries decoder placeholder characters.
#[must_use]
pub fn has_undecodable(text: &str) -> bool {
    text.contains(UNDECODABLE_PLACEHOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_undecodable() {
        assert!(!has_undecodable("plain"));
        assert!(has_undecodable("bad \u{FFFD} byte"));
    }

    #[test]
    fn test_defect_display() {
        let defect = Defect::invalid("missing '>'");
        assert_eq!(defect.to_string(), "InvalidHeader: missing '>'");
    }

    #[test]
    fn test_is_invalid() {
        assert!(DefectKind::InvalidHeader.is_invalid());
        assert!(!DefectKind::ObsoleteHeader.is_invalid());
    }
}
