//! Parse tree produced by the header grammar.
//!
//! A tree is made of [`Terminal`] leaves and [`TokenList`] nodes tagged with
//! the grammar production they represent. Rendering a node reproduces the
//! text it consumed; [`Token::value`] gives its semantic value with
//! whitespace collapsed and comments dropped.

mod address;
mod kind;
mod mime;

pub use kind::{ListKind, ParameterInfo, TerminalKind};
pub use mime::ParameterizedHeader;

use crate::defect::{Defect, DefectKind, has_undecodable};
use crate::encoding::encode_word;
use crate::parser::lexical::{is_wsp, quote_comment_text, quote_string};
use crate::policy::Policy;
use std::fmt;

/// A leaf token: a run of text with its lexical role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    /// Lexical role.
    pub kind: TerminalKind,
    /// Text as it appeared in the input, with quoted pairs removed.
    pub text: String,
    /// Problems local to this token.
    pub defects: Vec<Defect>,
}

impl Terminal {
    /// Creates a terminal, flagging non-printable and undecodable characters.
    #[must_use]
    pub fn new(kind: TerminalKind, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut defects = Vec::new();

        if !kind.is_whitespace() {
            let non_printable = |c: char| {
                if kind == TerminalKind::Xtext {
                    c.is_ascii_control() && !is_wsp(c)
                } else {
                    c.is_ascii_control() || c == ' '
                }
            };
            if text.chars().any(non_printable) {
                defects.push(Defect::new(
                    DefectKind::NonPrintable,
                    format!("Non-printable character(s) in {text:?}"),
                ));
            }
        }
        if has_undecodable(&text) {
            defects.push(Defect::new(
                DefectKind::UndecodableBytes,
                "Undecodable bytes in header text",
            ));
        }

        Self {
            kind,
            text,
            defects,
        }
    }

    /// Creates a folding whitespace terminal.
    #[must_use]
    pub fn fws(text: impl Into<String>) -> Self {
        Self::new(TerminalKind::Fws, text)
    }

    /// Returns the rendered form.
    #[must_use]
    pub fn render(&self) -> &str {
        match self.kind {
            TerminalKind::EwFws => "",
            _ => &self.text,
        }
    }

    /// Returns the semantic value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self.kind {
            TerminalKind::Fws => " ",
            TerminalKind::EwFws => "",
            _ => &self.text,
        }
    }
}

/// A composite parse tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenList {
    /// Grammar production.
    pub kind: ListKind,
    /// Ordered children.
    pub children: Vec<Token>,
    /// Problems attached to this node.
    pub defects: Vec<Defect>,
}

/// A node of the parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Leaf token.
    Terminal(Terminal),
    /// Composite node.
    List(TokenList),
}

impl From<Terminal> for Token {
    fn from(terminal: Terminal) -> Self {
        Self::Terminal(terminal)
    }
}

impl From<TokenList> for Token {
    fn from(list: TokenList) -> Self {
        Self::List(list)
    }
}

impl TokenList {
    /// Creates an empty node.
    #[must_use]
    pub const fn new(kind: ListKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            defects: Vec::new(),
        }
    }

    /// Creates a node with the given children.
    #[must_use]
    pub const fn with_children(kind: ListKind, children: Vec<Token>) -> Self {
        Self {
            kind,
            children,
            defects: Vec::new(),
        }
    }

    /// Appends a child.
    pub fn push(&mut self, token: impl Into<Token>) {
        self.children.push(token.into());
    }

    /// Returns true if the node has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns the first child.
    #[must_use]
    pub fn first(&self) -> Option<&Token> {
        self.children.first()
    }

    /// Returns the last child.
    #[must_use]
    pub fn last(&self) -> Option<&Token> {
        self.children.last()
    }

    /// Returns the first child that is a list of the given production.
    #[must_use]
    pub fn child(&self, matches: impl Fn(&ListKind) -> bool) -> Option<&Self> {
        self.children
            .iter()
            .filter_map(Token::as_list)
            .find(|list| matches(&list.kind))
    }

    /// Returns true if the node renders as a single indivisible unit.
    #[must_use]
    pub const fn is_atomic(&self) -> bool {
        matches!(
            self.kind,
            ListKind::Comment { .. }
                | ListKind::BareQuotedString { .. }
                | ListKind::EncodedWord { .. }
        )
    }

    /// Reproduces the text this node consumed.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self.kind {
            ListKind::Comment { closed } => {
                out.push('(');
                for child in &self.children {
                    match child {
                        Token::Terminal(t) if t.kind == TerminalKind::Ctext => {
                            out.push_str(&quote_comment_text(&t.text));
                        }
                        other => other.render_into(out),
                    }
                }
                if closed {
                    out.push(')');
                }
            }
            ListKind::BareQuotedString { closed } => {
                let quoted = quote_string(&self.content());
                if closed {
                    out.push_str(&quoted);
                } else {
                    out.push_str(&quoted[..quoted.len() - 1]);
                }
            }
            _ => {
                for child in &self.children {
                    child.render_into(out);
                }
            }
        }
    }

    /// Concatenated raw text of the children, without quoting.
    pub(crate) fn content(&self) -> String {
        self.children.iter().map(Token::render).collect()
    }

    /// Returns the semantic value.
    #[must_use]
    pub fn value(&self) -> String {
        match self.kind {
            ListKind::Cfws | ListKind::Comment { .. } => " ".to_string(),
            ListKind::BareQuotedString { .. } => self.content(),
            ListKind::DisplayName => address::display_name_value(self),
            ListKind::LocalPart => address::local_part_value(self),
            ListKind::AddrSpec => address::addr_spec_value(self),
            _ => self.children.iter().map(Token::value).collect(),
        }
    }

    /// Returns the text of a comment, without its parentheses.
    #[must_use]
    pub fn comment_content(&self) -> Option<String> {
        self.kind.is_comment().then(|| {
            self.children
                .iter()
                .map(|child| match child {
                    Token::Terminal(t) => t.text.clone(),
                    Token::List(list) => list.render(),
                })
                .collect()
        })
    }

    /// Returns this node's defects followed by those of every descendant.
    #[must_use]
    pub fn all_defects(&self) -> Vec<&Defect> {
        let mut defects: Vec<&Defect> = self.defects.iter().collect();
        for child in &self.children {
            defects.extend(child.all_defects());
        }
        defects
    }

    /// Returns the content of every comment in this subtree.
    #[must_use]
    pub fn comments(&self) -> Vec<String> {
        if let Some(content) = self.comment_content() {
            return vec![content];
        }
        self.children.iter().flat_map(Token::comments).collect()
    }

    /// Returns true if the rendered form begins with folding whitespace.
    #[must_use]
    pub fn startswith_fws(&self) -> bool {
        !self.is_atomic() && self.first().is_some_and(Token::startswith_fws)
    }

    /// Returns true if the subtree contains a fold point.
    #[must_use]
    pub fn has_fws(&self) -> bool {
        !self.is_atomic() && self.children.iter().any(Token::has_fws)
    }

    /// Returns true if the node begins with a comment.
    #[must_use]
    pub fn has_leading_comment(&self) -> bool {
        match self.kind {
            ListKind::Comment { .. } => true,
            ListKind::Cfws => self
                .children
                .iter()
                .any(|c| c.list_kind().is_some_and(ListKind::is_comment)),
            _ => self.first().is_some_and(Token::has_leading_comment),
        }
    }

    /// Removes and returns leading folding whitespace.
    pub fn pop_leading_fws(&mut self) -> Option<Token> {
        if self.is_atomic() {
            return None;
        }
        match self.children.first_mut()? {
            Token::Terminal(t) if t.kind.is_whitespace() => Some(self.children.remove(0)),
            Token::Terminal(_) => None,
            Token::List(list) => list.pop_leading_fws(),
        }
    }

    /// Removes and returns a trailing CFWS node.
    pub fn pop_trailing_ws(&mut self) -> Option<Token> {
        if self.is_atomic() {
            return None;
        }
        match self.children.last_mut()? {
            Token::List(list) if list.kind.is_cfws() => self.children.pop(),
            Token::List(list) => list.pop_trailing_ws(),
            Token::Terminal(_) => None,
        }
    }

    /// Splits this node into independently foldable units.
    ///
    /// Units break before children that start with folding whitespace and
    /// after trailing CFWS. Rendering the units in order reproduces the
    /// node. When no split point exists the children are returned as-is; a
    /// childless node is its own single unit, so its defects are kept.
    #[must_use]
    pub fn parts(&self) -> Vec<Token> {
        if self.children.is_empty() {
            return vec![self.clone().into()];
        }
        let mut parts = Vec::new();
        let mut chunk: Vec<Token> = Vec::new();

        for child in &self.children {
            let mut child = child.clone();
            if child.startswith_fws() && !chunk.is_empty() {
                parts.push(self.wrap(std::mem::take(&mut chunk)));
            }
            let trailing = child.pop_trailing_ws();
            chunk.push(child);
            if let Some(ws) = trailing {
                parts.push(self.wrap(std::mem::take(&mut chunk)));
                parts.push(ws);
            }
        }
        if !chunk.is_empty() {
            parts.push(self.wrap(chunk));
        }

        if parts.len() == 1
            && let Token::List(list) = &parts[0]
            && list.kind == self.kind
        {
            parts = list.children.clone();
        }
        if let Some(first) = parts.first_mut() {
            first.defects_mut().extend(self.defects.iter().cloned());
        }
        parts
    }

    fn wrap(&self, mut chunk: Vec<Token>) -> Token {
        if chunk.len() == 1 {
            chunk.remove(0)
        } else {
            Self::with_children(self.kind.clone(), chunk).into()
        }
    }

    /// Renders the node as 7-bit text, replacing non-ASCII runs with
    /// encoded words in `charset`.
    ///
    /// In unstructured text and phrases adjacent encoded runs are merged
    /// when the merged word is no longer than the separate words.
    #[must_use]
    pub fn cte_encode(&self, charset: &str) -> String {
        match self.kind {
            ListKind::Unstructured | ListKind::Phrase | ListKind::DisplayName => {
                self.cte_encode_coalesced(charset)
            }
            ListKind::Comment { closed } => {
                let inner: String = self.children.iter().map(|c| c.cte_encode(charset)).collect();
                format!("({inner}{}", if closed { ")" } else { "" })
            }
            ListKind::BareQuotedString { .. } => {
                let rendered = self.render();
                if rendered.is_ascii() {
                    rendered
                } else {
                    encode_word(&self.content(), charset, None)
                }
            }
            _ => self.children.iter().map(|c| c.cte_encode(charset)).collect(),
        }
    }

    fn cte_encode_coalesced(&self, charset: &str) -> String {
        let phrase = !matches!(self.kind, ListKind::Unstructured);
        let mut out: Vec<String> = Vec::new();
        // Start index in `out` and source text of the current encoded run.
        let mut run: Option<(usize, String)> = None;
        let mut gap = String::new();

        for child in &self.children {
            let rendered = child.render();
            if rendered.is_ascii() {
                if child.is_whitespace() && run.is_some() {
                    gap.push_str(&rendered);
                } else {
                    run = None;
                    gap.clear();
                }
                out.push(rendered);
                continue;
            }
            if phrase && !child.comments().is_empty() {
                run = None;
                gap.clear();
                out.push(child.cte_encode(charset));
                continue;
            }

            let text = child.ew_source_text();
            let separate = encode_word(&text, charset, None);
            if let Some((start, source)) = run.take() {
                let merged_source = format!("{source}{gap}{text}");
                let merged = encode_word(&merged_source, charset, None);
                let apart: usize =
                    out[start..].iter().map(String::len).sum::<usize>() + separate.len();
                if merged.len() <= apart {
                    out.truncate(start);
                    out.push(merged);
                    run = Some((start, merged_source));
                    gap.clear();
                    continue;
                }
            }
            gap.clear();
            run = Some((out.len(), text));
            out.push(separate);
        }
        out.concat()
    }

    /// Folds the node into lines according to `policy`.
    #[must_use]
    pub fn fold(&self, policy: &Policy) -> String {
        crate::fold::fold(&Token::List(self.clone()), policy)
    }

    /// Returns an indented dump of the tree, for debugging.
    #[must_use]
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, 0);
        out
    }

    fn pretty_into(&self, out: &mut String, depth: usize) {
        let indent = "    ".repeat(depth);
        out.push_str(&format!("{indent}{}(\n", self.kind.name()));
        for child in &self.children {
            match child {
                Token::List(list) => list.pretty_into(out, depth + 1),
                Token::Terminal(t) => {
                    out.push_str(&format!("{indent}    {:?}/{}\n", t.text, t.kind.name()));
                }
            }
        }
        out.push_str(&indent);
        out.push(')');
        if !self.defects.is_empty() {
            out.push_str(&format!(" Defects: {:?}", self.defects));
        }
        out.push('\n');
    }
}

impl Token {
    /// Returns the list node, if this is one.
    #[must_use]
    pub const fn as_list(&self) -> Option<&TokenList> {
        match self {
            Self::List(list) => Some(list),
            Self::Terminal(_) => None,
        }
    }

    /// Returns the terminal, if this is one.
    #[must_use]
    pub const fn as_terminal(&self) -> Option<&Terminal> {
        match self {
            Self::Terminal(t) => Some(t),
            Self::List(_) => None,
        }
    }

    /// Returns the production of a list node.
    #[must_use]
    pub const fn list_kind(&self) -> Option<&ListKind> {
        match self {
            Self::List(list) => Some(&list.kind),
            Self::Terminal(_) => None,
        }
    }

    /// Returns the lexical role of a terminal.
    #[must_use]
    pub const fn terminal_kind(&self) -> Option<TerminalKind> {
        match self {
            Self::Terminal(t) => Some(t.kind),
            Self::List(_) => None,
        }
    }

    /// Returns true for whitespace terminals and CFWS nodes.
    #[must_use]
    pub fn is_whitespace(&self) -> bool {
        match self {
            Self::Terminal(t) => t.kind.is_whitespace(),
            Self::List(list) => list.kind.is_cfws(),
        }
    }

    /// Reproduces the text this token consumed.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Self::Terminal(t) => out.push_str(t.render()),
            Self::List(list) => list.render_into(out),
        }
    }

    /// Returns the semantic value.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Terminal(t) => t.value().to_string(),
            Self::List(list) => list.value(),
        }
    }

    /// Returns this token's own defects.
    #[must_use]
    pub fn defects(&self) -> &[Defect] {
        match self {
            Self::Terminal(t) => &t.defects,
            Self::List(list) => &list.defects,
        }
    }

    pub(crate) const fn defects_mut(&mut self) -> &mut Vec<Defect> {
        match self {
            Self::Terminal(t) => &mut t.defects,
            Self::List(list) => &mut list.defects,
        }
    }

    /// Returns this token's defects followed by those of every descendant.
    #[must_use]
    pub fn all_defects(&self) -> Vec<&Defect> {
        match self {
            Self::Terminal(t) => t.defects.iter().collect(),
            Self::List(list) => list.all_defects(),
        }
    }

    /// Returns true if this subtree carries a defect of `kind`.
    #[must_use]
    pub fn has_defect(&self, kind: DefectKind) -> bool {
        self.all_defects().iter().any(|d| d.kind == kind)
    }

    /// Returns the content of every comment in this subtree.
    #[must_use]
    pub fn comments(&self) -> Vec<String> {
        match self {
            Self::Terminal(_) => Vec::new(),
            Self::List(list) => list.comments(),
        }
    }

    /// Returns true if the rendered form begins with folding whitespace.
    #[must_use]
    pub fn startswith_fws(&self) -> bool {
        match self {
            Self::Terminal(t) => t.kind.is_whitespace(),
            Self::List(list) => list.startswith_fws(),
        }
    }

    /// Returns true if the subtree contains a fold point.
    #[must_use]
    pub fn has_fws(&self) -> bool {
        match self {
            Self::Terminal(t) => t.kind.is_whitespace(),
            Self::List(list) => list.has_fws(),
        }
    }

    /// Returns true if the token begins with a comment.
    #[must_use]
    pub fn has_leading_comment(&self) -> bool {
        match self {
            Self::Terminal(_) => false,
            Self::List(list) => list.has_leading_comment(),
        }
    }

    /// Removes and returns leading folding whitespace.
    pub fn pop_leading_fws(&mut self) -> Option<Self> {
        match self {
            Self::Terminal(_) => None,
            Self::List(list) => list.pop_leading_fws(),
        }
    }

    /// Removes and returns a trailing CFWS node.
    pub fn pop_trailing_ws(&mut self) -> Option<Self> {
        match self {
            Self::Terminal(_) => None,
            Self::List(list) => list.pop_trailing_ws(),
        }
    }

    /// Splits the token into independently foldable units.
    #[must_use]
    pub fn parts(&self) -> Vec<Self> {
        match self {
            Self::Terminal(_) => vec![self.clone()],
            Self::List(list) => list.parts(),
        }
    }

    /// Renders the token as 7-bit text. See [`TokenList::cte_encode`].
    #[must_use]
    pub fn cte_encode(&self, charset: &str) -> String {
        match self {
            Self::Terminal(t) => {
                let rendered = t.render();
                if rendered.is_ascii() {
                    rendered.to_string()
                } else {
                    encode_word(rendered, charset, None)
                }
            }
            Self::List(list) => list.cte_encode(charset),
        }
    }

    /// Text to place inside an encoded word standing for this token.
    ///
    /// Quoted strings contribute their unquoted content, since quotes are
    /// not recognized inside encoded words.
    pub(crate) fn ew_source_text(&self) -> String {
        match self {
            Self::Terminal(t) => t.render().to_string(),
            Self::List(list) => match list.kind {
                ListKind::BareQuotedString { .. } => list.content(),
                _ => list.children.iter().map(Self::ew_source_text).collect(),
            },
        }
    }

    /// Folds the token into lines according to `policy`.
    #[must_use]
    pub fn fold(&self, policy: &Policy) -> String {
        crate::fold::fold(self, policy)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Display for TokenList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
