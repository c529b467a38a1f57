//! Recursive-descent grammar for RFC 5322, RFC 2045 and RFC 2231 header
//! values.
//!
//! Every production is a function from the remaining input to the parsed
//! node and the new remaining input. A production either consumes a
//! non-empty prefix or returns [`HeaderParseError`]; that error is a
//! backtracking signal that enclosing productions catch, usually through
//! [`alt`], to try the next alternative. Malformed but recognizable input is
//! accepted and recorded as [`Defect`](crate::Defect)s on the returned node.

pub mod address;
pub mod lexical;
pub mod mime;
pub mod primitives;

use crate::error::HeaderParseError;
use crate::token::{Terminal, TerminalKind, TokenList};

/// Result of a production: the node and the unconsumed input.
pub type PResult<'a, T> = Result<(T, &'a str), HeaderParseError>;

/// A production yielding a parse tree node.
pub type Production<'a, 'f> = &'f dyn Fn(&'a str) -> PResult<'a, TokenList>;

/// Tries `alternatives` in order and returns the first success.
///
/// # Errors
///
/// When every alternative fails, returns a single
/// `expected {what} but found '...'` error.
pub fn alt<'a>(
    value: &'a str,
    what: &str,
    alternatives: &[Production<'a, '_>],
) -> PResult<'a, TokenList> {
    for alternative in alternatives {
        if let Ok(found) = alternative(value) {
            return Ok(found);
        }
    }
    Err(HeaderParseError::expected(what, value))
}

/// Consumes a single character as a terminal of `kind`.
pub(crate) fn single(value: &str, kind: TerminalKind) -> (Terminal, &str) {
    let len = value.chars().next().map_or(0, char::len_utf8);
    let (head, rest) = value.split_at(len);
    (Terminal::new(kind, head), rest)
}

/// Prepends `leader` to the children of `list`.
pub(crate) fn with_leader(mut list: TokenList, leader: Option<TokenList>) -> TokenList {
    if let Some(leader) = leader {
        list.children.insert(0, leader.into());
    }
    list
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::primitives::{atom, quoted_string};

    #[test]
    fn test_alt_first_success_wins() {
        let (token, rest) = alt("foo bar", "word", &[&quoted_string, &atom]).unwrap();
        assert_eq!(token.render(), "foo ");
        assert_eq!(rest, "bar");
    }

    #[test]
    fn test_alt_reports_single_error() {
        let err = alt("<x>", "word", &[&quoted_string, &atom]).unwrap_err();
        assert_eq!(err.message(), "expected word but found '<x>'");
    }

    #[test]
    fn test_single() {
        let (terminal, rest) = single("élan", TerminalKind::Xtext);
        assert_eq!(terminal.text, "é");
        assert_eq!(rest, "lan");
    }
}
