//! MIME views over the parse tree: parameters, content type, disposition.

use super::{ListKind, ParameterInfo, TerminalKind, Token, TokenList};
use crate::rfc2231::{self, ParameterMap};

impl TokenList {
    /// RFC 2231 details of a parameter node.
    #[must_use]
    pub const fn parameter_info(&self) -> Option<&ParameterInfo> {
        match &self.kind {
            ListKind::Parameter(info) | ListKind::InvalidParameter(info) => Some(info),
            _ => None,
        }
    }

    /// Section number of a parameter, zero when not sectioned.
    #[must_use]
    pub fn section_number(&self) -> u32 {
        self.parameter_info().map_or(0, |info| info.section_number)
    }

    /// Value with surrounding CFWS and quoting removed.
    #[must_use]
    pub fn stripped_value(&self) -> String {
        match self.kind {
            ListKind::Value => {
                let inner = self
                    .children
                    .iter()
                    .find(|c| !c.list_kind().is_some_and(ListKind::is_cfws));
                match inner {
                    Some(Token::List(list))
                        if matches!(list.kind, ListKind::QuotedString | ListKind::Attribute) =>
                    {
                        list.stripped_value()
                    }
                    _ => self.value(),
                }
            }
            ListKind::QuotedString => self
                .child(|k| matches!(k, ListKind::BareQuotedString { .. }))
                .map(TokenList::content)
                .unwrap_or_default(),
            ListKind::Attribute => self
                .children
                .iter()
                .filter_map(Token::as_terminal)
                .filter(|t| {
                    matches!(t.kind, TerminalKind::Attrtext | TerminalKind::ExtendedAttrtext)
                })
                .map(|t| t.text.as_str())
                .collect(),
            _ => self.value(),
        }
    }

    /// Name of a parameter, as written.
    #[must_use]
    pub fn param_name(&self) -> Option<String> {
        self.parameter_info()?;
        match self.first()? {
            Token::List(attr) if attr.kind == ListKind::Attribute => Some(attr.stripped_value()),
            _ => None,
        }
    }

    /// Raw value of a parameter with quoting and any RFC 2231
    /// `charset'lang'` prefix removed. Percent escapes are left intact.
    #[must_use]
    pub fn param_value(&self) -> String {
        let Some(info) = self.parameter_info() else {
            return String::new();
        };
        let value = self
            .children
            .iter()
            .rev()
            .filter_map(Token::as_list)
            .find(|l| l.kind == ListKind::Value);
        let Some(value) = value else {
            return String::new();
        };
        let stripped = value.stripped_value();
        match info.quoted_value_offset {
            Some(offset) => stripped.get(offset..).unwrap_or_default().to_string(),
            None => stripped,
        }
    }

    /// The parameter list of a parameterized header value.
    #[must_use]
    pub fn mime_parameters(&self) -> Option<&Self> {
        match self.kind {
            ListKind::MimeParameters => Some(self),
            ListKind::ContentType { .. } | ListKind::ContentDisposition { .. } => {
                self.child(|k| *k == ListKind::MimeParameters)
            }
            _ => None,
        }
    }

    /// Main type of a content type, `text` if it could not be parsed.
    #[must_use]
    pub fn maintype(&self) -> Option<&str> {
        match &self.kind {
            ListKind::ContentType { maintype, .. } => Some(maintype),
            _ => None,
        }
    }

    /// Subtype of a content type, `plain` if it could not be parsed.
    #[must_use]
    pub fn subtype(&self) -> Option<&str> {
        match &self.kind {
            ListKind::ContentType { subtype, .. } => Some(subtype),
            _ => None,
        }
    }

    /// `maintype/subtype` of a content type.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        Some(format!("{}/{}", self.maintype()?, self.subtype()?))
    }

    /// Disposition of a content disposition.
    #[must_use]
    pub fn disposition(&self) -> Option<&str> {
        match &self.kind {
            ListKind::ContentDisposition { disposition } => disposition.as_deref(),
            _ => None,
        }
    }

    /// Encoding named by a content transfer encoding.
    #[must_use]
    pub fn cte(&self) -> Option<&str> {
        match &self.kind {
            ListKind::ContentTransferEncoding { cte } => Some(cte),
            _ => None,
        }
    }

    /// `(major, minor)` of a MIME version.
    #[must_use]
    pub const fn version(&self) -> Option<(Option<u32>, Option<u32>)> {
        match self.kind {
            ListKind::MimeVersion { major, minor } => Some((major, minor)),
            _ => None,
        }
    }
}

/// Parameter access shared by the parameterized MIME headers.
pub trait ParameterizedHeader {
    /// Parameters with RFC 2231 continuations merged and decoded.
    fn params(&self) -> ParameterMap;

    /// Looks up one parameter by case-insensitive name.
    fn param(&self, name: &str) -> Option<String> {
        self.params().get(name).map(str::to_string)
    }
}

impl ParameterizedHeader for TokenList {
    fn params(&self) -> ParameterMap {
        self.mime_parameters()
            .map(rfc2231::reassemble)
            .unwrap_or_default()
    }
}
