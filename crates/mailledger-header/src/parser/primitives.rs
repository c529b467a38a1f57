//! RFC 5322 lexical productions shared by the structured grammars:
//! whitespace, comments, quoted strings, atoms, words and phrases, plus
//! RFC 2047 encoded words and unstructured text.

use super::lexical::{
    is_atom_end, is_cfws_leader, is_phrase_end, is_special, is_wsp, ptext_to_endchars,
    split_leading, split_run, starts_with,
};
use super::{PResult, alt, single};
use crate::defect::Defect;
use crate::encoding::decode_encoded_word;
use crate::error::HeaderParseError;
use crate::token::{ListKind, Terminal, TerminalKind, Token, TokenList};

/// `FWS`: a run of whitespace.
///
/// # Errors
///
/// Fails if `value` does not start with whitespace.
pub fn fws(value: &str) -> PResult<'_, Terminal> {
    let (ws, rest) = split_leading(value, char::is_whitespace);
    if ws.is_empty() {
        return Err(HeaderParseError::expected("whitespace", value));
    }
    Ok((Terminal::fws(ws), rest))
}

/// `ctext` and quoted pairs inside a comment.
fn qp_ctext(value: &str) -> PResult<'_, Terminal> {
    let (text, rest, _) = ptext_to_endchars(value, |c| matches!(c, '(' | ')'));
    if rest.len() == value.len() {
        return Err(HeaderParseError::expected("ctext", value));
    }
    Ok((Terminal::new(TerminalKind::Ctext, text), rest))
}

/// `qcontent`: text and quoted pairs inside a quoted string.
fn qcontent(value: &str) -> PResult<'_, Terminal> {
    let (text, rest, _) = ptext_to_endchars(value, |c| c == '"');
    if rest.len() == value.len() {
        return Err(HeaderParseError::expected("qcontent", value));
    }
    Ok((Terminal::new(TerminalKind::Ptext, text), rest))
}

/// `atext`: the longest run of atom characters.
///
/// # Errors
///
/// Fails if `value` starts with a special or whitespace.
pub fn atext(value: &str) -> PResult<'_, Terminal> {
    let (text, rest) = split_run(value, is_atom_end);
    if text.is_empty() {
        return Err(HeaderParseError::expected("atext", value));
    }
    Ok((Terminal::new(TerminalKind::Atext, text), rest))
}

/// `comment`: parenthesized text with nested comments.
///
/// An unterminated comment consumes the rest of the input and is flagged.
///
/// # Errors
///
/// Fails if `value` does not start with `(`.
pub fn comment(value: &str) -> PResult<'_, TokenList> {
    let Some(mut value) = value.strip_prefix('(') else {
        return Err(HeaderParseError::expected("'('", value));
    };
    let mut list = TokenList::new(ListKind::Comment { closed: true });

    while !value.is_empty() && !value.starts_with(')') {
        if starts_with(value, is_wsp) {
            let (ws, rest) = fws(value)?;
            list.push(ws);
            value = rest;
        } else if value.starts_with('(') {
            let (nested, rest) = comment(value)?;
            list.push(nested);
            value = rest;
        } else {
            let (text, rest) = qp_ctext(value)?;
            list.push(text);
            value = rest;
        }
    }

    match value.strip_prefix(')') {
        Some(rest) => Ok((list, rest)),
        None => {
            list.kind = ListKind::Comment { closed: false };
            list.defects.push(Defect::invalid("end of header inside comment"));
            Ok((list, value))
        }
    }
}

/// `CFWS`: any mix of comments and folding whitespace.
///
/// # Errors
///
/// Fails if `value` does not start with whitespace or `(`.
pub fn cfws(value: &str) -> PResult<'_, TokenList> {
    if !starts_with(value, is_cfws_leader) {
        return Err(HeaderParseError::expected("cfws", value));
    }
    let mut cfws = TokenList::new(ListKind::Cfws);
    let mut value = value;
    while starts_with(value, is_cfws_leader) {
        if starts_with(value, is_wsp) {
            let (token, rest) = fws(value)?;
            cfws.push(token);
            value = rest;
        } else {
            let (token, rest) = comment(value)?;
            cfws.push(token);
            value = rest;
        }
    }
    Ok((cfws, value))
}

/// Parses CFWS if `value` starts with it.
pub(crate) fn opt_cfws(value: &str) -> (Option<TokenList>, &str) {
    match cfws(value) {
        Ok((token, rest)) => (Some(token), rest),
        Err(_) => (None, value),
    }
}

/// Appends CFWS to `list` if `value` starts with it.
pub(crate) fn trailing_cfws<'a>(list: &mut TokenList, value: &'a str) -> &'a str {
    let (token, rest) = opt_cfws(value);
    if let Some(token) = token {
        list.push(token);
    }
    rest
}

/// Content of a quoted string, without surrounding CFWS.
///
/// Encoded words inside the quotes are decoded and flagged. An unterminated
/// string consumes the rest of the input and is flagged.
///
/// # Errors
///
/// Fails if `value` does not start with `"`.
pub fn bare_quoted_string(value: &str) -> PResult<'_, TokenList> {
    let Some(mut value) = value.strip_prefix('"') else {
        return Err(HeaderParseError::expected("'\"'", value));
    };
    let mut bare = TokenList::new(ListKind::BareQuotedString { closed: true });

    while !value.is_empty() && !value.starts_with('"') {
        if starts_with(value, is_wsp) {
            let (token, rest) = fws(value)?;
            bare.push(token);
            value = rest;
            continue;
        }
        if value.starts_with("=?")
            && let Ok((word, rest)) = encoded_word(value, TerminalKind::Ptext)
        {
            bare.defects.push(Defect::invalid("encoded word inside quoted string"));
            collapse_ew_gap(&mut bare);
            bare.push(word);
            value = rest;
            continue;
        }
        let (token, rest) = qcontent(value)?;
        bare.push(token);
        value = rest;
    }

    match value.strip_prefix('"') {
        Some(rest) => Ok((bare, rest)),
        None => {
            bare.kind = ListKind::BareQuotedString { closed: false };
            bare.defects.push(Defect::invalid("end of header inside quoted string"));
            Ok((bare, value))
        }
    }
}

/// Turns whitespace between two encoded words into an empty separator.
fn collapse_ew_gap(list: &mut TokenList) {
    let count = list.children.len();
    if count < 2 {
        return;
    }
    let after_ew = matches!(
        list.children[count - 2].list_kind(),
        Some(ListKind::EncodedWord { .. })
    );
    if let Token::Terminal(last) = &mut list.children[count - 1]
        && last.kind == TerminalKind::Fws
        && after_ew
    {
        last.kind = TerminalKind::EwFws;
    }
}

/// `quoted-string`: `[CFWS] DQUOTE *qcontent DQUOTE [CFWS]`.
///
/// # Errors
///
/// Fails if no `"` follows the optional leading CFWS.
pub fn quoted_string(value: &str) -> PResult<'_, TokenList> {
    let mut quoted = TokenList::new(ListKind::QuotedString);
    let (leader, value) = opt_cfws(value);
    if let Some(leader) = leader {
        quoted.push(leader);
    }
    let (bare, value) = bare_quoted_string(value)?;
    quoted.push(bare);
    let value = trailing_cfws(&mut quoted, value);
    Ok((quoted, value))
}

/// `encoded-word`: `=?charset?cte?text?=` decoded into terminals of `kind`.
///
/// # Errors
///
/// Fails if `value` is not an encoded word or the word cannot be decoded.
pub fn encoded_word(value: &str, kind: TerminalKind) -> PResult<'_, TokenList> {
    let Some(body) = value.strip_prefix("=?") else {
        return Err(HeaderParseError::expected("encoded word", value));
    };
    let Some(close) = body.find("?=") else {
        return Err(HeaderParseError::expected("encoded word", value));
    };

    // `?=` directly followed by two hex digits is a Q escape of `=`, unless
    // the encoded text has already started.
    let mut end = close;
    let mut rest = &body[close + 2..];
    let after = rest.as_bytes();
    if after.len() > 1
        && after[0].is_ascii_hexdigit()
        && after[1].is_ascii_hexdigit()
        && body[..close].matches('?').count() < 2
    {
        match rest.find("?=") {
            Some(next) => {
                end = close + 2 + next;
                rest = &rest[next + 2..];
            }
            None => {
                end = body.len();
                rest = "";
            }
        }
    }

    let inner = &body[..end];
    let consumed = &value[..value.len() - rest.len()];
    let decoded = decode_encoded_word(&format!("=?{inner}?=")).map_err(|_| {
        HeaderParseError::new(format!("encoded word format invalid: '{consumed}'"))
    })?;

    let mut word = TokenList::new(ListKind::EncodedWord {
        charset: decoded.charset,
        lang: decoded.lang,
    });
    if inner.split_whitespace().count() > 1 {
        word.defects.push(Defect::invalid("whitespace inside encoded word"));
    }
    word.defects.extend(decoded.defects);

    let mut text = decoded.text.as_str();
    while !text.is_empty() {
        if starts_with(text, is_wsp) {
            let (ws, remainder) = split_leading(text, is_wsp);
            word.push(Terminal::fws(ws));
            text = remainder;
        } else {
            let (chars, remainder) = split_run(text, is_wsp);
            word.push(Terminal::new(kind, chars));
            text = remainder;
        }
    }

    if !rest.is_empty() && !starts_with(rest, is_wsp) {
        word.defects.push(Defect::invalid("missing trailing whitespace after encoded-word"));
    }
    Ok((word, rest))
}

/// Returns true if `text` contains something shaped like an encoded word.
fn contains_encoded_word(text: &str) -> bool {
    text.match_indices("=?").any(|(idx, _)| {
        let candidate = &text[idx + 2..];
        let Some((_, after_charset)) = candidate.split_once('?') else {
            return false;
        };
        let mut chars = after_charset.chars();
        matches!(chars.next(), Some('q' | 'Q' | 'b' | 'B'))
            && chars.next() == Some('?')
            && chars.as_str().contains("?=")
    })
}

/// `unstructured`: free text with embedded encoded words.
///
/// Never fails; every character of `value` ends up in the result.
#[must_use]
pub fn unstructured(value: &str) -> TokenList {
    let mut list = TokenList::new(ListKind::Unstructured);
    let mut value = value;

    while !value.is_empty() {
        if let Ok((ws, rest)) = fws(value) {
            list.push(ws);
            value = rest;
            continue;
        }

        let mut valid_ew = true;
        if value.starts_with("=?") {
            match encoded_word(value, TerminalKind::Vtext) {
                Ok((word, rest)) => {
                    let after_ws = list
                        .last()
                        .is_none_or(|t| t.terminal_kind() == Some(TerminalKind::Fws));
                    if after_ws {
                        collapse_ew_gap(&mut list);
                    } else {
                        list.defects
                            .push(Defect::invalid("missing whitespace before encoded word"));
                    }
                    list.push(word);
                    value = rest;
                    continue;
                }
                Err(err) => {
                    tracing::trace!(error = %err, "text kept literally");
                    valid_ew = !err.message().starts_with("encoded word format invalid");
                }
            }
        }

        let (mut text, mut rest) = split_run(value, char::is_whitespace);
        // Split before an encoded word glued to the end of a run; the missing
        // whitespace is flagged on the next iteration.
        if valid_ew
            && contains_encoded_word(text)
            && let Some(idx) = value.find("=?").filter(|&idx| idx > 0)
        {
            (text, rest) = value.split_at(idx);
        }
        list.push(Terminal::new(TerminalKind::Vtext, text));
        value = rest;
    }
    list
}

/// `atom`: `[CFWS] 1*atext [CFWS]`, or an encoded word in place of the atext.
///
/// # Errors
///
/// Fails if no atext follows the optional leading CFWS.
pub fn atom(value: &str) -> PResult<'_, TokenList> {
    let mut atom = TokenList::new(ListKind::Atom);
    let (leader, value) = opt_cfws(value);
    if let Some(leader) = leader {
        atom.push(leader);
    }
    if starts_with(value, is_atom_end) {
        return Err(HeaderParseError::expected("atom", value));
    }

    let value = match encoded_word(value, TerminalKind::Vtext) {
        Ok((word, rest)) if value.starts_with("=?") => {
            atom.push(word);
            rest
        }
        _ => {
            let (text, rest) = atext(value)?;
            atom.push(text);
            rest
        }
    };
    let value = trailing_cfws(&mut atom, value);
    Ok((atom, value))
}

/// `dot-atom-text`: `1*atext *("." 1*atext)`.
///
/// # Errors
///
/// Fails on a leading, trailing or missing atom.
pub fn dot_atom_text(value: &str) -> PResult<'_, TokenList> {
    if value.is_empty() || starts_with(value, is_atom_end) {
        return Err(HeaderParseError::new(format!(
            "expected atom at a start of dot-atom-text but found '{value}'"
        )));
    }
    let mut text = TokenList::new(ListKind::DotAtomText);
    let mut value = value;
    let mut ends_with_dot = false;

    while !value.is_empty() && !starts_with(value, is_atom_end) {
        let (token, rest) = atext(value)?;
        text.push(token);
        value = rest;
        ends_with_dot = false;
        if let Some(rest) = value.strip_prefix('.') {
            text.push(Terminal::new(TerminalKind::Dot, "."));
            value = rest;
            ends_with_dot = true;
        }
    }

    if ends_with_dot {
        return Err(HeaderParseError::new(format!(
            "expected atom at end of dot-atom-text but found '.{value}'"
        )));
    }
    Ok((text, value))
}

/// `dot-atom`: `[CFWS] dot-atom-text [CFWS]`, or an encoded word in place of
/// the dot-atom-text.
///
/// # Errors
///
/// Fails if the dot-atom-text is malformed.
pub fn dot_atom(value: &str) -> PResult<'_, TokenList> {
    let mut dot_atom = TokenList::new(ListKind::DotAtom);
    let (leader, value) = opt_cfws(value);
    if let Some(leader) = leader {
        dot_atom.push(leader);
    }

    let value = match encoded_word(value, TerminalKind::Vtext) {
        Ok((word, rest)) if value.starts_with("=?") => {
            dot_atom.push(word);
            rest
        }
        _ => {
            let (text, rest) = dot_atom_text(value)?;
            dot_atom.push(text);
            rest
        }
    };
    let value = trailing_cfws(&mut dot_atom, value);
    Ok((dot_atom, value))
}

/// `word`: `atom / quoted-string`. Leading CFWS is folded into the word.
///
/// # Errors
///
/// Fails if neither an atom nor a quoted string follows the CFWS.
pub fn word(value: &str) -> PResult<'_, TokenList> {
    let (leader, value) = opt_cfws(value);
    if value.is_empty() {
        return Err(HeaderParseError::new(
            "expected 'atom' or 'quoted-string' but found nothing",
        ));
    }
    if value.starts_with('"') {
        let (token, rest) = quoted_string(value)?;
        return Ok((super::with_leader(token, leader), rest));
    }
    if starts_with(value, is_special) {
        return Err(HeaderParseError::expected("'atom' or 'quoted-string'", value));
    }
    let (token, rest) = atom(value)?;
    Ok((super::with_leader(token, leader), rest))
}

/// `phrase`: `1*word / obs-phrase`.
///
/// Periods and bare comments between words are accepted as obsolete syntax.
///
/// # Errors
///
/// Fails if nothing phrase-like could be consumed.
pub fn phrase(value: &str) -> PResult<'_, TokenList> {
    let mut phrase = TokenList::new(ListKind::Phrase);
    let start_len = value.len();
    let mut value = value;

    match word(value) {
        Ok((token, rest)) => {
            phrase.push(token);
            value = rest;
        }
        Err(_) => phrase.defects.push(Defect::invalid("phrase does not start with word")),
    }

    while !value.is_empty() && !starts_with(value, is_phrase_end) {
        if value.starts_with('.') {
            let (dot, rest) = single(value, TerminalKind::Dot);
            phrase.push(dot);
            phrase.defects.push(Defect::obsolete("period in 'phrase'"));
            value = rest;
            continue;
        }
        let (token, rest) = alt(value, "word or cfws", &[&word, &cfws])?;
        if token.kind.is_cfws() {
            phrase.defects.push(Defect::obsolete("comment found without atom"));
        }
        phrase.push(token);
        value = rest;
    }

    if value.len() == start_len {
        return Err(HeaderParseError::expected("phrase", value));
    }
    Ok((phrase, value))
}

/// Consumes one character as a misplaced special.
pub(crate) fn misplaced_special(value: &str) -> (Terminal, &str) {
    single(value, TerminalKind::MisplacedSpecial)
}

/// Consumes up to one of `endchars`, as phrases and misplaced specials.
///
/// Used to keep text that matches no production.
pub(crate) fn junk(
    kind: ListKind,
    value: &str,
    endchars: impl Fn(char) -> bool,
) -> (TokenList, &str) {
    let mut list = TokenList::new(kind);
    let mut value = value;
    while !value.is_empty() && !starts_with(value, &endchars) {
        if starts_with(value, is_phrase_end) {
            let (special, rest) = misplaced_special(value);
            list.push(special);
            value = rest;
            continue;
        }
        match phrase(value) {
            Ok((token, rest)) => {
                list.push(token);
                value = rest;
            }
            Err(_) => {
                let (special, rest) = misplaced_special(value);
                list.push(special);
                value = rest;
            }
        }
    }
    (list, value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::defect::DefectKind;

    #[test]
    fn test_fws_collapses_value() {
        let (ws, rest) = fws(" \t x").unwrap();
        assert_eq!(ws.render(), " \t ");
        assert_eq!(ws.value(), " ");
        assert_eq!(rest, "x");
        assert!(fws("x").is_err());
    }

    #[test]
    fn test_nested_comment() {
        let (comment, rest) = comment(r"(a (b) \) c) tail").unwrap();
        assert_eq!(comment.render(), r"(a (b) \) c)");
        assert_eq!(comment.comments(), vec!["a (b) ) c".to_string()]);
        assert_eq!(comment.value(), " ");
        assert_eq!(rest, " tail");
    }

    #[test]
    fn test_unterminated_comment() {
        let (comment, rest) = comment("(never closed").unwrap();
        assert_eq!(rest, "");
        assert_eq!(comment.render(), "(never closed");
        assert_eq!(comment.defects[0].kind, DefectKind::InvalidHeader);
    }

    #[test]
    fn test_quoted_string() {
        let (quoted, rest) = quoted_string(r#" "a \"b\" c" x"#).unwrap();
        assert_eq!(quoted.render(), r#" "a \"b\" c" "#);
        assert_eq!(quoted.stripped_value(), r#"a "b" c"#);
        assert_eq!(rest, "x");
    }

    #[test]
    fn test_unterminated_quoted_string() {
        let (quoted, rest) = quoted_string("\"abc@example.com").unwrap();
        assert_eq!(rest, "");
        assert_eq!(quoted.render(), "\"abc@example.com");
        assert!(quoted.all_defects().iter().any(|d| d.kind == DefectKind::InvalidHeader));
    }

    #[test]
    fn test_encoded_word() {
        let (word, rest) =
            encoded_word("=?utf-8?q?caf=C3=A9_au_lait?= tail", TerminalKind::Vtext).unwrap();
        assert_eq!(word.render(), "café au lait");
        assert_eq!(rest, " tail");
        assert!(word.defects.is_empty());
    }

    #[test]
    fn test_encoded_word_with_escaped_equals() {
        let (word, rest) = encoded_word("=?utf-8?q?=3D?=", TerminalKind::Vtext).unwrap();
        assert_eq!(word.render(), "=");
        assert_eq!(rest, "");
    }

    #[test]
    fn test_unstructured_round_trip() {
        let text = "  Hello,   world (not a comment)\t";
        assert_eq!(unstructured(text).render(), text);
    }

    #[test]
    fn test_unstructured_adjacent_encoded_words() {
        let list = unstructured("=?utf-8?q?caf=C3=A9?= =?utf-8?q?_bar?= baz");
        assert_eq!(list.render(), "café bar baz");
        assert!(list.defects.is_empty());
    }

    #[test]
    fn test_unstructured_splits_glued_encoded_word() {
        let list = unstructured("abc=?utf-8?q?d?=");
        assert_eq!(list.value(), "abcd");
        assert_eq!(list.defects[0].message, "missing whitespace before encoded word");
    }

    #[test]
    fn test_unstructured_invalid_encoded_word_is_text() {
        let list = unstructured("=?utf-8?x?abc?=");
        assert_eq!(list.render(), "=?utf-8?x?abc?=");
    }

    #[test]
    fn test_atom_with_cfws() {
        let (atom, rest) = atom(" (c) foo (d) <x>").unwrap();
        assert_eq!(atom.render(), " (c) foo (d) ");
        assert_eq!(atom.value(), " foo ");
        assert_eq!(rest, "<x>");
    }

    #[test]
    fn test_dot_atom_text() {
        let (text, rest) = dot_atom_text("a.b.c@d").unwrap();
        assert_eq!(text.render(), "a.b.c");
        assert_eq!(rest, "@d");
        assert!(dot_atom_text("a.@d").is_err());
        assert!(dot_atom_text(".a").is_err());
    }

    #[test]
    fn test_phrase_obsolete_period() {
        let (phrase, rest) = phrase("John Q. Public <jqp@example.com>").unwrap();
        assert_eq!(phrase.render(), "John Q. Public ");
        assert_eq!(rest, "<jqp@example.com>");
        assert_eq!(phrase.defects[0].kind, DefectKind::ObsoleteHeader);
    }

    #[test]
    fn test_phrase_requires_progress() {
        assert!(phrase("<a@b>").is_err());
    }
}
