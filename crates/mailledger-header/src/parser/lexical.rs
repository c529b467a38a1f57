//! Character classes that decide where RFC 5322 and RFC 2045 tokens end.

/// Folding whitespace characters.
pub const WSP: &[char] = &[' ', '\t'];

/// Characters that may start CFWS.
pub const CFWS_LEADER: &[char] = &[' ', '\t', '('];

/// RFC 5322 specials.
pub const SPECIALS: &[char] = &['(', ')', '<', '>', '@', ',', ':', ';', '.', '\\', '"', '[', ']'];

/// Returns true for folding whitespace.
#[must_use]
pub fn is_wsp(c: char) -> bool {
    WSP.contains(&c)
}

/// Returns true for characters that may start CFWS.
#[must_use]
pub fn is_cfws_leader(c: char) -> bool {
    CFWS_LEADER.contains(&c)
}

/// Returns true for RFC 5322 specials.
#[must_use]
pub fn is_special(c: char) -> bool {
    SPECIALS.contains(&c)
}

/// Ends an atom: specials and whitespace.
#[must_use]
pub fn is_atom_end(c: char) -> bool {
    is_special(c) || is_wsp(c)
}

/// Ends a dot-atom: like [`is_atom_end`] but `.` continues the token.
#[must_use]
pub fn is_dot_atom_end(c: char) -> bool {
    c != '.' && is_atom_end(c)
}

/// Ends a phrase. `.`, `"` and `(` do not, to support obs-phrase.
#[must_use]
pub fn is_phrase_end(c: char) -> bool {
    is_special(c) && !matches!(c, '.' | '"' | '(')
}

/// RFC 2045 tspecials.
#[must_use]
pub fn is_tspecial(c: char) -> bool {
    (is_special(c) || matches!(c, '/' | '?' | '=')) && c != '.'
}

/// Ends an RFC 2045 token.
#[must_use]
pub fn is_token_end(c: char) -> bool {
    is_tspecial(c) || is_wsp(c)
}

/// Ends an RFC 2231 attribute.
#[must_use]
pub fn is_attribute_end(c: char) -> bool {
    is_tspecial(c) || matches!(c, '*' | '\'' | '%') || is_wsp(c)
}

/// Ends an RFC 2231 extended attribute value, where `%` escapes are allowed.
#[must_use]
pub fn is_extended_attribute_end(c: char) -> bool {
    c != '%' && is_attribute_end(c)
}

/// Returns the longest prefix of `value` containing no `end` characters,
/// together with the rest.
pub fn split_run(value: &str, end: impl Fn(char) -> bool) -> (&str, &str) {
    let idx = value.find(end).unwrap_or(value.len());
    value.split_at(idx)
}

/// Splits leading characters matching `pred` from `value`.
pub fn split_leading(value: &str, pred: impl Fn(char) -> bool) -> (&str, &str) {
    let idx = value.find(|c| !pred(c)).unwrap_or(value.len());
    value.split_at(idx)
}

/// Returns the first character of `value`, if any.
#[must_use]
pub fn first(value: &str) -> Option<char> {
    value.chars().next()
}

/// Returns true if `value` starts with a character matching `pred`.
pub fn starts_with(value: &str, pred: impl Fn(char) -> bool) -> bool {
    first(value).is_some_and(pred)
}

/// Strips the first character of `value`.
#[must_use]
pub fn rest(value: &str) -> &str {
    let mut chars = value.chars();
    chars.next();
    chars.as_str()
}

/// Wraps `value` in double quotes, escaping backslashes and quotes.
#[must_use]
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Escapes the characters that are not allowed bare inside a comment.
#[must_use]
pub fn quote_comment_text(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '(' | ')') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted
}

/// Scans printable text and quoted pairs up to `end` or whitespace.
///
/// Quoted pairs are unescaped. Returns the unescaped text, the remaining
/// input, and whether any quoted pair was decoded.
pub fn ptext_to_endchars(value: &str, end: impl Fn(char) -> bool) -> (String, &str, bool) {
    let mut text = String::new();
    let mut escape = false;
    let mut had_qp = false;

    for (pos, c) in value.char_indices() {
        if escape {
            escape = false;
            had_qp = true;
            text.push(c);
            continue;
        }
        if c == '\\' {
            escape = true;
            continue;
        }
        if end(c) || is_wsp(c) {
            return (text, &value[pos..], had_qp);
        }
        text.push(c);
    }

    (text, "", had_qp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_membership() {
        assert!(is_atom_end('.'));
        assert!(!is_dot_atom_end('.'));
        assert!(!is_phrase_end('"'));
        assert!(is_phrase_end('<'));
        assert!(is_token_end('/'));
        assert!(!is_token_end('.'));
        assert!(is_attribute_end('*'));
        assert!(!is_extended_attribute_end('%'));
    }

    #[test]
    fn test_split_run() {
        assert_eq!(split_run("abc def", is_atom_end), ("abc", " def"));
        assert_eq!(split_run("abc", is_atom_end), ("abc", ""));
        assert_eq!(split_run("<abc", is_atom_end), ("", "<abc"));
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn test_ptext_to_endchars() {
        let (text, rest, had_qp) = ptext_to_endchars(r#"a\"b" tail"#, |c| c == '"');
        assert_eq!(text, "a\"b");
        assert_eq!(rest, "\" tail");
        assert!(had_qp);

        let (text, rest, had_qp) = ptext_to_endchars(r"x\\y z", |c| c == ']');
        assert_eq!(text, r"x\y");
        assert_eq!(rest, " z");
        assert!(had_qp);
    }
}
