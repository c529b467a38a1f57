//! Grammar tags for leaf tokens and composite nodes.

/// Lexical role of a [`Terminal`](super::Terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalKind {
    /// Folding whitespace. Renders raw, has the semantic value of one space.
    Fws,
    /// Whitespace between two encoded words. Renders as nothing but still
    /// marks a fold point.
    EwFws,
    /// Atom text.
    Atext,
    /// Unstructured visible text.
    Vtext,
    /// Quoted-string or domain-literal content with quoted pairs removed.
    Ptext,
    /// Comment content with quoted pairs removed.
    Ctext,
    /// RFC 2045 token text.
    Ttext,
    /// RFC 2231 attribute text.
    Attrtext,
    /// RFC 2231 extended attribute text, may contain `%` escapes.
    ExtendedAttrtext,
    /// `.` separating atoms.
    Dot,
    /// `,` separating list elements.
    ListSeparator,
    /// `@` inside an obsolete route.
    RouteComponentMarker,
    /// `@` between local part and domain.
    AddressAt,
    /// `<` opening an angle-addr.
    AngleAddrStart,
    /// `>` closing an angle-addr.
    AngleAddrEnd,
    /// `[` opening a domain literal.
    DomainLiteralStart,
    /// `]` closing a domain literal.
    DomainLiteralEnd,
    /// `:` after a group display name.
    GroupDisplayNameTerminator,
    /// `;` closing a group.
    GroupTerminator,
    /// `:` closing an obsolete route.
    EndOfObsRoute,
    /// `<` opening a msg-id.
    MsgIdStart,
    /// `>` closing a msg-id.
    MsgIdEnd,
    /// `[` opening a no-fold literal.
    NoFoldLiteralStart,
    /// `]` closing a no-fold literal.
    NoFoldLiteralEnd,
    /// `/` between MIME type and subtype.
    ContentTypeSeparator,
    /// `;` between MIME parameters.
    ParameterSeparator,
    /// `=` between parameter name and value.
    ParameterValueSeparator,
    /// `*` introducing an RFC 2231 section number.
    SectionMarker,
    /// `*` marking an RFC 2231 extended value.
    ExtendedParameterMarker,
    /// `'` delimiting RFC 2231 charset and language.
    Rfc2231Delimiter,
    /// Decimal digits.
    Digits,
    /// `.` in a MIME-Version value.
    VersionSeparator,
    /// Unparsed text kept for completeness.
    Xtext,
    /// A special character found where it is not allowed.
    MisplacedSpecial,
    /// A double quote inside an invalid value.
    DQuote,
    /// Header field name.
    HeaderName,
    /// `:` after a header field name.
    HeaderSeparator,
}

impl TerminalKind {
    /// Returns true for whitespace-bearing kinds.
    #[must_use]
    pub const fn is_whitespace(self) -> bool {
        matches!(self, Self::Fws | Self::EwFws)
    }

    /// Returns the grammar name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fws | Self::EwFws => "fws",
            Self::Atext => "atext",
            Self::Vtext => "vtext",
            Self::Ptext => "ptext",
            Self::Ctext => "ctext",
            Self::Ttext => "ttext",
            Self::Attrtext => "attrtext",
            Self::ExtendedAttrtext => "extended-attrtext",
            Self::Dot => "dot",
            Self::ListSeparator => "list-separator",
            Self::RouteComponentMarker => "route-component-marker",
            Self::AddressAt => "address-at-symbol",
            Self::AngleAddrStart => "angle-addr-start",
            Self::AngleAddrEnd => "angle-addr-end",
            Self::DomainLiteralStart => "domain-literal-start",
            Self::DomainLiteralEnd => "domain-literal-end",
            Self::GroupDisplayNameTerminator => "group-display-name-terminator",
            Self::GroupTerminator => "group-terminator",
            Self::EndOfObsRoute => "end-of-obs-route-marker",
            Self::MsgIdStart => "msg-id-start",
            Self::MsgIdEnd => "msg-id-end",
            Self::NoFoldLiteralStart => "no-fold-literal-start",
            Self::NoFoldLiteralEnd => "no-fold-literal-end",
            Self::ContentTypeSeparator => "content-type-separator",
            Self::ParameterSeparator => "parameter-separator",
            Self::ParameterValueSeparator => "parameter-value-separator",
            Self::SectionMarker => "section-marker",
            Self::ExtendedParameterMarker => "extended-parameter-marker",
            Self::Rfc2231Delimiter => "rfc2231-delimiter",
            Self::Digits => "digits",
            Self::VersionSeparator => "version-separator",
            Self::Xtext => "xtext",
            Self::MisplacedSpecial => "misplaced-special",
            Self::DQuote => "dquote",
            Self::HeaderName => "header-name",
            Self::HeaderSeparator => "header-sep",
        }
    }
}

/// RFC 2231 details recorded on a parsed parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Parameter name carried an RFC 2231 section number.
    pub sectioned: bool,
    /// Section number, zero when not sectioned.
    pub section_number: u32,
    /// Parameter name carried the extended-value `*` marker.
    pub extended: bool,
    /// Charset declared by an initial extended value.
    pub charset: Option<String>,
    /// Language declared by an initial extended value.
    pub lang: Option<String>,
    /// Byte offset of the encoded text inside a quoted extended value.
    pub quoted_value_offset: Option<usize>,
}

/// Grammar production represented by a [`TokenList`](super::TokenList).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    /// Anonymous grouping produced while splitting nodes.
    Fragment,
    /// Unstructured header text.
    Unstructured,
    /// RFC 5322 phrase.
    Phrase,
    /// Comments and folding whitespace.
    Cfws,
    /// Parenthesized comment.
    Comment {
        /// Closing parenthesis was present.
        closed: bool,
    },
    /// Atom with surrounding CFWS.
    Atom,
    /// RFC 2045 token with surrounding CFWS.
    Token,
    /// RFC 2047 encoded word; children hold the decoded text.
    EncodedWord {
        /// Charset named by the word.
        charset: String,
        /// RFC 2231 language tag.
        lang: String,
    },
    /// Quoted string with surrounding CFWS.
    QuotedString,
    /// Quoted string content.
    BareQuotedString {
        /// Closing quote was present.
        closed: bool,
    },
    /// Dot-atom with surrounding CFWS.
    DotAtom,
    /// Dot-atom text.
    DotAtomText,
    /// List of addresses.
    AddressList,
    /// Group or mailbox.
    Address,
    /// List of mailboxes.
    MailboxList,
    /// Mailboxes inside a group.
    GroupList,
    /// Named group of mailboxes.
    AddressGroup,
    /// Display name plus angle-addr.
    NameAddr,
    /// `<addr-spec>`.
    AngleAddr,
    /// Obsolete source route.
    ObsRoute,
    /// Valid mailbox.
    Mailbox,
    /// Mailbox with invalid syntax; raw text is preserved.
    InvalidMailbox,
    /// Address domain.
    Domain,
    /// `[...]` domain literal.
    DomainLiteral,
    /// `local-part@domain`.
    AddrSpec,
    /// Address local part.
    LocalPart,
    /// Obsolete local part.
    ObsLocalPart {
        /// Obsolete but otherwise well formed.
        valid: bool,
    },
    /// Display name of a mailbox or group.
    DisplayName,
    /// `<id-left@id-right>`.
    MsgId,
    /// Message-ID header value.
    MessageId,
    /// Unparseable Message-ID header value.
    InvalidMessageId,
    /// `[...]` id-right of a msg-id.
    NoFoldLiteral,
    /// MIME-Version header value.
    MimeVersion {
        /// Major version number.
        major: Option<u32>,
        /// Minor version number.
        minor: Option<u32>,
    },
    /// MIME parameter.
    Parameter(ParameterInfo),
    /// MIME parameter with invalid syntax.
    InvalidParameter(ParameterInfo),
    /// Parameter name.
    Attribute,
    /// RFC 2231 section marker and number.
    Section {
        /// Section number.
        number: u32,
    },
    /// Parameter value.
    Value,
    /// `;`-separated parameter list.
    MimeParameters,
    /// Content-Type header value.
    ContentType {
        /// Lowercase main type.
        maintype: String,
        /// Lowercase subtype.
        subtype: String,
    },
    /// Content-Disposition header value.
    ContentDisposition {
        /// Lowercase disposition, if present.
        disposition: Option<String>,
    },
    /// Content-Transfer-Encoding header value.
    ContentTransferEncoding {
        /// Lowercase encoding name.
        cte: String,
    },
    /// Complete header: label and value.
    Header,
}

impl ListKind {
    /// Returns the grammar name of this production.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fragment => "token-list",
            Self::Unstructured => "unstructured",
            Self::Phrase => "phrase",
            Self::Cfws => "cfws",
            Self::Comment { .. } => "comment",
            Self::Atom => "atom",
            Self::Token => "token",
            Self::EncodedWord { .. } => "encoded-word",
            Self::QuotedString => "quoted-string",
            Self::BareQuotedString { .. } => "bare-quoted-string",
            Self::DotAtom => "dot-atom",
            Self::DotAtomText => "dot-atom-text",
            Self::AddressList => "address-list",
            Self::Address => "address",
            Self::MailboxList => "mailbox-list",
            Self::GroupList => "group-list",
            Self::AddressGroup => "group",
            Self::NameAddr => "name-addr",
            Self::AngleAddr => "angle-addr",
            Self::ObsRoute => "obs-route",
            Self::Mailbox => "mailbox",
            Self::InvalidMailbox => "invalid-mailbox",
            Self::Domain => "domain",
            Self::DomainLiteral => "domain-literal",
            Self::AddrSpec => "addr-spec",
            Self::LocalPart => "local-part",
            Self::ObsLocalPart { valid: true } => "obs-local-part",
            Self::ObsLocalPart { valid: false } => "invalid-obs-local-part",
            Self::DisplayName => "display-name",
            Self::MsgId => "msg-id",
            Self::MessageId => "message-id",
            Self::InvalidMessageId => "invalid-message-id",
            Self::NoFoldLiteral => "no-fold-literal",
            Self::MimeVersion { .. } => "mime-version",
            Self::Parameter(_) => "parameter",
            Self::InvalidParameter(_) => "invalid-parameter",
            Self::Attribute => "attribute",
            Self::Section { .. } => "section",
            Self::Value => "value",
            Self::MimeParameters => "mime-parameters",
            Self::ContentType { .. } => "content-type",
            Self::ContentDisposition { .. } => "content-disposition",
            Self::ContentTransferEncoding { .. } => "content-transfer-encoding",
            Self::Header => "header",
        }
    }

    /// Returns true for whitespace-valued productions.
    #[must_use]
    pub const fn is_cfws(&self) -> bool {
        matches!(self, Self::Cfws)
    }

    /// Returns true for comments.
    #[must_use]
    pub const fn is_comment(&self) -> bool {
        matches!(self, Self::Comment { .. })
    }
}
