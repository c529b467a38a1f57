//! Folding of parse trees into length-bounded header lines.
//!
//! Folding walks the tree unit by unit (see [`TokenList::parts`]) and keeps
//! an accumulator of finished lines plus the pieces of the current line.
//! Whitespace in front of a unit is held back as a pending separator so a
//! line break can absorb it. Non-ASCII text is replaced by RFC 2047 encoded
//! words where the grammar allows them; adjacent encoded words on the same
//! line are merged when the merged word still fits.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::defect::{DefectKind, has_undecodable};
use crate::encoding::{UNKNOWN_8BIT, encode_word, encoded_len};
use crate::parser::lexical::{is_special, is_wsp};
use crate::policy::{DEFAULT_MAX_LINE_LENGTH, Policy};
use crate::rfc2231;
use crate::token::{ListKind, TerminalKind, Token, TokenList};

/// Characters kept literally in RFC 2231 extended values.
const PARAM_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// How the content of a node may be rewritten while folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldStrategy {
    /// Structured content: text is never replaced by encoded words.
    Generic,
    /// Unstructured text: any run may become an encoded word.
    Unstructured,
    /// Phrases and display names: like `Unstructured`, but comments are
    /// encoded in place and decoded words holding specials are re-encoded.
    Phrase,
}

/// Strategy for the children of a node of `kind`.
const fn strategy_for(kind: &ListKind, inherited: FoldStrategy) -> FoldStrategy {
    match kind {
        ListKind::Unstructured => FoldStrategy::Unstructured,
        ListKind::Phrase | ListKind::DisplayName => FoldStrategy::Phrase,
        ListKind::Header
        | ListKind::AddrSpec
        | ListKind::AngleAddr
        | ListKind::LocalPart
        | ListKind::ObsLocalPart { .. }
        | ListKind::Domain
        | ListKind::DomainLiteral
        | ListKind::ObsRoute
        | ListKind::MsgId
        | ListKind::NoFoldLiteral
        | ListKind::Token
        | ListKind::Attribute
        | ListKind::Section { .. }
        | ListKind::Value
        | ListKind::Parameter(_)
        | ListKind::InvalidParameter(_)
        | ListKind::MimeParameters
        | ListKind::ContentType { .. }
        | ListKind::ContentDisposition { .. }
        | ListKind::ContentTransferEncoding { .. }
        | ListKind::MimeVersion { .. } => FoldStrategy::Generic,
        _ => inherited,
    }
}

/// Returns true if `token` may be replaced by an encoded word.
fn ew_allowed(token: &Token, strategy: FoldStrategy) -> bool {
    match token {
        Token::List(list) if list.kind.is_comment() || list.kind.is_cfws() => true,
        _ if strategy == FoldStrategy::Generic => false,
        Token::List(_) => true,
        Token::Terminal(t) => matches!(
            t.kind,
            TerminalKind::Vtext
                | TerminalKind::Atext
                | TerminalKind::Ptext
                | TerminalKind::Ctext
                | TerminalKind::Fws
                | TerminalKind::EwFws
                | TerminalKind::Xtext
                | TerminalKind::Dot
        ),
    }
}

/// Returns true if the subtree holds a decoded encoded word whose text
/// would change meaning if written out literally in a phrase.
fn has_special_ew(token: &Token) -> bool {
    match token {
        Token::Terminal(_) => false,
        Token::List(list) if matches!(list.kind, ListKind::EncodedWord { .. }) => {
            list.render().chars().any(is_special)
        }
        Token::List(list) => list.children.iter().any(has_special_ew),
    }
}

/// Returns true if a phrase or display name inside `token` holds a decoded
/// encoded word with specials. Such a subtree is descended into until the
/// phrase itself is reached, where the word is encoded again.
fn has_special_phrase_ew(token: &Token) -> bool {
    match token {
        Token::Terminal(_) => false,
        Token::List(list) if matches!(list.kind, ListKind::Phrase | ListKind::DisplayName) => {
            has_special_ew(token)
        }
        Token::List(list) => list.children.iter().any(has_special_phrase_ew),
    }
}

fn contains_mime_parameters(list: &TokenList) -> bool {
    list.children.iter().any(|child| match child {
        Token::List(inner) => {
            inner.kind == ListKind::MimeParameters || contains_mime_parameters(inner)
        }
        Token::Terminal(_) => false,
    })
}

fn width(text: &str) -> usize {
    text.chars().count()
}

/// Byte length of the longest prefix of `text` whose encoded form is at
/// most `avail` characters long.
fn longest_prefix(text: &str, avail: usize, measure: impl Fn(&str) -> usize) -> usize {
    if measure(text) <= avail {
        return text.len();
    }
    let mut best = 0;
    for (idx, c) in text.char_indices() {
        let end = idx + c.len_utf8();
        if measure(&text[..end]) > avail {
            break;
        }
        best = end;
    }
    best
}

fn first_char_len(text: &str) -> usize {
    text.chars().next().map_or(0, char::len_utf8)
}

/// The encoded word ending the current line, kept so the next encoded run
/// can be merged into it.
#[derive(Debug)]
struct EwRun {
    /// Index of the word in the current line's pieces.
    start: usize,
    /// Decoded text of the word.
    source: String,
    charset: String,
}

/// Accumulator for folded output.
#[derive(Debug)]
struct Folded<'p> {
    policy: &'p Policy,
    maxlen: usize,
    done: Vec<String>,
    current: Vec<String>,
    len: usize,
    pending: Option<String>,
    first_line: bool,
    last_ew: Option<EwRun>,
}

impl<'p> Folded<'p> {
    fn new(policy: &'p Policy) -> Self {
        Self {
            policy,
            maxlen: policy.effective_max_len(),
            done: Vec::new(),
            current: Vec::new(),
            len: 0,
            pending: None,
            first_line: true,
            last_ew: None,
        }
    }

    fn push(&mut self, text: String) {
        self.len += width(&text);
        self.current.push(text);
    }

    fn flush_pending(&mut self) {
        if let Some(ws) = self.pending.take() {
            self.push(ws);
        }
    }

    fn add_pending(&mut self, ws: &str) {
        if ws.is_empty() {
            return;
        }
        self.pending.get_or_insert_with(String::new).push_str(ws);
    }

    fn pending_len(&self) -> usize {
        self.pending.as_deref().map_or(0, width)
    }

    /// Ends the current line.
    fn newline(&mut self) {
        if self.current.is_empty() {
            return;
        }
        self.done.push(self.current.concat());
        self.current.clear();
        self.len = 0;
        self.first_line = false;
        self.last_ew = None;
    }

    /// Removes one trailing whitespace character from the current line.
    fn steal_trailing_wsp(&mut self) -> Option<String> {
        let last = self.current.last_mut()?;
        let c = last.chars().next_back().filter(|c| is_wsp(*c))?;
        last.pop();
        self.len -= 1;
        Some(c.to_string())
    }

    fn can_break(&self) -> bool {
        !self.current.is_empty()
            && (self.pending.is_some()
                || self
                    .current
                    .last()
                    .is_some_and(|piece| piece.ends_with(is_wsp)))
    }

    /// Starts a continuation line led by the pending whitespace.
    ///
    /// A long separator is trimmed to one character: any run of folding
    /// whitespace has the same meaning.
    fn break_line(&mut self, text_width: usize) {
        let lead = self
            .pending
            .take()
            .or_else(|| self.steal_trailing_wsp())
            .unwrap_or_else(|| " ".to_string());
        self.newline();
        let lead = if width(&lead) + text_width > self.maxlen {
            lead.chars().take(1).collect()
        } else {
            lead
        };
        self.pending = Some(lead);
    }

    fn append_if_fits(&mut self, text: &str) -> bool {
        let text_width = width(text);
        if self.len + self.pending_len() + text_width <= self.maxlen {
            self.flush_pending();
            self.push(text.to_string());
            return true;
        }
        if self.pending_len() > 1
            && !self.current.is_empty()
            && self.len + 1 + text_width <= self.maxlen
        {
            self.pending = self.pending.as_deref().map(|ws| ws.chars().take(1).collect());
            self.flush_pending();
            self.push(text.to_string());
            return true;
        }
        false
    }

    fn charset_for(&self, token: &Token, text: &str) -> &'static str {
        if self.policy.utf8 {
            "utf-8"
        } else if token.has_defect(DefectKind::UndecodableBytes) {
            UNKNOWN_8BIT
        } else if text.is_ascii() {
            "us-ascii"
        } else {
            "utf-8"
        }
    }

    fn needs_encoding(&self, token: &Token, text: &str, strategy: FoldStrategy) -> bool {
        (!self.policy.utf8 && !text.is_ascii())
            || text.contains(['\r', '\n'])
            || (strategy == FoldStrategy::Phrase && has_special_ew(token))
            || has_special_phrase_ew(token)
    }

    fn fold_parts(&mut self, list: &TokenList, strategy: FoldStrategy) {
        for part in list.parts() {
            let strategy = match &part {
                Token::List(inner) => strategy_for(&inner.kind, strategy),
                Token::Terminal(_) => strategy,
            };
            self.fold_unit(part, strategy);
        }
    }

    fn fold_unit(&mut self, part: Token, strategy: FoldStrategy) {
        if let Token::List(list) = &part {
            if list.kind == ListKind::MimeParameters {
                self.mime_parameters(list);
                return;
            }
            if contains_mime_parameters(list) {
                self.fold_parts(list, strategy);
                return;
            }
        }

        let text = part.render();
        if part.is_whitespace() && part.comments().is_empty() {
            self.add_pending(&text);
            return;
        }

        if self.needs_encoding(&part, &text, strategy) {
            let charset = self.charset_for(&part, &text);
            match &part {
                Token::List(list) if list.kind.is_comment() => {
                    let charset = if charset == "us-ascii" { "utf-8" } else { charset };
                    let encoded = list.cte_encode(charset);
                    self.place(part, encoded, strategy);
                    return;
                }
                Token::List(list) if !list.is_atomic() => {
                    self.fold_parts(list, strategy);
                    return;
                }
                _ if ew_allowed(&part, strategy) => {
                    self.push_encoded(&part.ew_source_text(), charset);
                    return;
                }
                _ => {}
            }
        }
        self.place(part, text, strategy);
    }

    /// Places text that is not an encoded word.
    fn place(&mut self, mut part: Token, text: String, strategy: FoldStrategy) {
        if self.append_if_fits(&text) {
            self.last_ew = None;
            return;
        }

        let text = match part.pop_leading_fws() {
            Some(ws) => {
                self.add_pending(&ws.render());
                part.render()
            }
            None => text,
        };
        let text_width = width(&text);
        if self.can_break() && 1 + text_width <= self.maxlen {
            self.break_line(text_width);
            self.flush_pending();
            self.push(text);
            return;
        }

        if let Token::List(list) = &part
            && !list.is_atomic()
            && list.has_fws()
        {
            self.fold_parts(list, strategy);
            return;
        }

        // Unbreakable: give it a line of its own if the line can end here.
        if self.can_break() {
            self.break_line(text_width);
        }
        self.flush_pending();
        self.push(text);
        self.last_ew = None;
    }

    /// Emits `source` as one or more encoded words.
    fn push_encoded(&mut self, source: &str, charset: &str) {
        let charset = if charset == "us-ascii" { "utf-8" } else { charset };
        let mut source = source.to_string();

        if let Some(run) = self.last_ew.take() {
            let gap = self.pending.clone().unwrap_or_default();
            if run.charset == charset {
                let merged_source = format!("{}{gap}{source}", run.source);
                let merged = encode_word(&merged_source, charset, None);
                let prefix: usize = self.current[..run.start].iter().map(|p| width(p)).sum();
                if prefix + width(&merged) <= self.maxlen {
                    self.current.truncate(run.start);
                    self.len = prefix;
                    self.pending = None;
                    self.push(merged);
                    self.last_ew = Some(EwRun {
                        start: run.start,
                        source: merged_source,
                        charset: charset.to_string(),
                    });
                    return;
                }
            }
            // Whitespace between encoded words is dropped by decoders.
            source = format!("{gap}{source}");
            self.pending.get_or_insert_with(|| " ".to_string());
        }

        let measure = |text: &str| encoded_len(text, charset);
        let mut rest = source.as_str();
        while !rest.is_empty() {
            let avail = self.maxlen.saturating_sub(self.len + self.pending_len());
            let mut take = longest_prefix(rest, avail, measure);
            if take == 0 {
                if !self.current.is_empty() && (self.pending.is_some() || self.last_ew.is_some()) {
                    self.break_line(0);
                    continue;
                }
                take = first_char_len(rest);
            }
            if self.current.is_empty() && !self.first_line && self.pending.is_none() {
                self.pending = Some(" ".to_string());
            }
            let (chunk, tail) = rest.split_at(take);
            self.flush_pending();
            let start = self.current.len();
            self.push(encode_word(chunk, charset, None));
            self.last_ew = Some(EwRun {
                start,
                source: chunk.to_string(),
                charset: charset.to_string(),
            });
            rest = tail;
            if !rest.is_empty() {
                self.pending = Some(" ".to_string());
            }
        }
    }

    /// Writes parameters from their decoded values, using RFC 2231
    /// encoding and continuations where needed.
    fn mime_parameters(&mut self, list: &TokenList) {
        self.pending = None;
        self.last_ew = None;
        let base = if self.policy.utf8 { "utf-8" } else { "us-ascii" };

        for (name, value) in rfc2231::reassemble(list).iter() {
            if !self.current.is_empty() && !self.current.concat().trim_end().ends_with(';') {
                self.push(";".to_string());
            }
            let required = !self.policy.utf8 && !value.is_ascii();
            let charset = if !required {
                base
            } else if has_undecodable(value) {
                UNKNOWN_8BIT
            } else {
                "utf-8"
            };
            let param = if required {
                format!("{name}*={charset}''{}", utf8_percent_encode(value, PARAM_SAFE))
            } else {
                format!("{name}={}", crate::parser::lexical::quote_string(value))
            };

            let param_width = width(&param);
            if self.len + param_width + 1 < self.maxlen {
                self.push(format!(" {param}"));
                continue;
            }
            if param_width + 2 <= self.maxlen {
                self.newline();
                self.push(format!(" {param}"));
                continue;
            }
            self.parameter_sections(name, value, charset);
        }
    }

    fn parameter_sections(&mut self, name: &str, value: &str, charset: &str) {
        let mut maxlen = self.maxlen;
        let mut extra = format!("{charset}''");
        let mut rest = value;
        let mut section = 0_u32;

        while !rest.is_empty() {
            let chrome = name.len() + section.to_string().len() + 3 + extra.len();
            if maxlen <= chrome + 3 {
                maxlen = DEFAULT_MAX_LINE_LENGTH - self.policy.linesep.len();
            }
            let maxchars = maxlen.saturating_sub(chrome + 2);
            let measure = |text: &str| utf8_percent_encode(text, PARAM_SAFE).to_string().len();
            let mut take = longest_prefix(rest, maxchars, measure);
            if take == 0 {
                take = first_char_len(rest);
            }
            let (chunk, tail) = rest.split_at(take);
            self.newline();
            self.push(format!(
                " {name}*{section}*={extra}{}",
                utf8_percent_encode(chunk, PARAM_SAFE)
            ));
            extra.clear();
            section += 1;
            rest = tail;
            if !rest.is_empty() {
                self.push(";".to_string());
            }
        }
    }

    fn finish(mut self) -> String {
        if let Some(ws) = self.pending.take()
            && self.len + width(&ws) <= self.maxlen
        {
            self.push(ws);
        }
        self.newline();
        let linesep = &self.policy.linesep;
        let mut out = self.done.join(linesep);
        out.push_str(linesep);
        out
    }
}

/// Folds `root` into lines no longer than the policy's maximum where the
/// content allows, each ended by the policy's line separator.
pub(crate) fn fold(root: &Token, policy: &Policy) -> String {
    let mut folded = Folded::new(policy);
    match root {
        Token::List(list) if list.kind == ListKind::MimeParameters => folded.mime_parameters(list),
        Token::List(list) => {
            folded.fold_parts(list, strategy_for(&list.kind, FoldStrategy::Generic));
        }
        Token::Terminal(_) => folded.fold_unit(root.clone(), FoldStrategy::Generic),
    }
    let lines = folded.done.len() + 1;
    let out = folded.finish();
    tracing::trace!(lines, "folded header value");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::encoding::decode_encoded_word;
    use crate::parser::primitives::unstructured;

    fn policy(max: usize) -> Policy {
        Policy::builder().max_line_length(max).build().unwrap()
    }

    fn decoded_words(folded: &str) -> String {
        folded
            .split_whitespace()
            .map(|word| decode_encoded_word(word).unwrap().text)
            .collect()
    }

    #[test]
    fn test_short_value_unchanged() {
        let tree = unstructured("Hello world");
        assert_eq!(tree.fold(&Policy::default()), "Hello world\n");
    }

    #[test]
    fn test_breaks_at_whitespace() {
        let tree = unstructured("aaaaaaaaaa bbbbbbbbbb cccccccccc dddddddddd");
        let folded = tree.fold(&policy(25));
        assert_eq!(folded, "aaaaaaaaaa bbbbbbbbbb\n cccccccccc dddddddddd\n");
    }

    #[test]
    fn test_crlf_policy() {
        let tree = unstructured("aaaaaaaaaa bbbbbbbbbb cccccccccc");
        let policy = Policy::builder().max_line_length(25).linesep("\r\n").build().unwrap();
        assert_eq!(tree.fold(&policy), "aaaaaaaaaa bbbbbbbbbb\r\n cccccccccc\r\n");
    }

    #[test]
    fn test_non_ascii_word_encoded() {
        let tree = unstructured("Café au lait");
        assert_eq!(tree.fold(&Policy::default()), "=?utf-8?q?Caf=C3=A9?= au lait\n");
    }

    #[test]
    fn test_adjacent_non_ascii_words_merge() {
        let folded = unstructured("é é").fold(&Policy::default());
        assert_eq!(folded, "=?utf-8?b?w6kgw6k=?=\n");
        assert_eq!(decoded_words(&folded), "é é");
    }

    #[test]
    fn test_utf8_policy_keeps_text() {
        let tree = unstructured("Café au lait");
        assert_eq!(tree.fold(&Policy::smtp_utf8()), "Café au lait\r\n");
    }

    #[test]
    fn test_long_non_ascii_run_is_split() {
        let text = "é".repeat(60);
        let folded = unstructured(&text).fold(&Policy::default());
        let lines: Vec<_> = folded.lines().collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= 78));
        assert_eq!(decoded_words(&folded), text);
    }

    #[test]
    fn test_unbreakable_word_overflows() {
        let word = "x".repeat(40);
        let folded = unstructured(&format!("a {word}")).fold(&policy(30));
        assert_eq!(folded, format!("a\n {word}\n"));
    }

    #[test]
    fn test_unlimited_line_length() {
        let text = "word ".repeat(40);
        let tree = unstructured(text.trim_end());
        assert_eq!(tree.fold(&policy(0)).lines().count(), 1);
    }
}
