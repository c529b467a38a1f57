//! RFC 2045 tokens and RFC 2231 parameters.
//!
//! Parameters are parsed one at a time; merging `name*0`, `name*1`, ...
//! continuations into one value happens afterwards in
//! [`rfc2231`](crate::rfc2231).

use super::lexical::{
    is_attribute_end, is_extended_attribute_end, is_token_end, split_leading, split_run,
};
use super::primitives::{junk, opt_cfws, quoted_string, trailing_cfws};
use super::{PResult, with_leader};
use crate::defect::Defect;
use crate::error::HeaderParseError;
use crate::rfc2231;
use crate::token::{ListKind, ParameterInfo, Terminal, TerminalKind, Token, TokenList};

fn text_run<'a>(
    value: &'a str,
    end: impl Fn(char) -> bool,
    kind: TerminalKind,
    what: &str,
) -> PResult<'a, Terminal> {
    let (text, rest) = split_run(value, end);
    if text.is_empty() {
        return Err(HeaderParseError::expected(what, value));
    }
    Ok((Terminal::new(kind, text), rest))
}

/// `ttext`: a run of token characters.
///
/// # Errors
///
/// Fails if `value` starts with a tspecial or whitespace.
pub fn ttext(value: &str) -> PResult<'_, Terminal> {
    text_run(value, is_token_end, TerminalKind::Ttext, "ttext")
}

/// `attrtext`: token characters other than `*`, `'` and `%`.
///
/// # Errors
///
/// Fails if `value` starts with an attribute-ending character.
pub fn attrtext(value: &str) -> PResult<'_, Terminal> {
    text_run(value, is_attribute_end, TerminalKind::Attrtext, "attrtext")
}

/// `attrtext` that also accepts `%` escapes.
///
/// # Errors
///
/// Fails if `value` starts with an attribute-ending character other than `%`.
pub fn extended_attrtext(value: &str) -> PResult<'_, Terminal> {
    text_run(
        value,
        is_extended_attribute_end,
        TerminalKind::ExtendedAttrtext,
        "extended-attrtext",
    )
}

fn padded<'a>(
    kind: ListKind,
    value: &'a str,
    text: impl Fn(&'a str) -> PResult<'a, Terminal>,
) -> PResult<'a, TokenList> {
    let mut list = TokenList::new(kind);
    let value = trailing_cfws(&mut list, value);
    let (terminal, value) = text(value)?;
    list.push(terminal);
    let value = trailing_cfws(&mut list, value);
    Ok((list, value))
}

/// `token`: `[CFWS] 1*ttext [CFWS]`.
///
/// # Errors
///
/// Fails if no token characters follow the optional CFWS.
pub fn token(value: &str) -> PResult<'_, TokenList> {
    padded(ListKind::Token, value, ttext)
}

/// `attribute`: `[CFWS] 1*attrtext [CFWS]`.
///
/// # Errors
///
/// Fails if no attribute characters follow the optional CFWS.
pub fn attribute(value: &str) -> PResult<'_, TokenList> {
    padded(ListKind::Attribute, value, attrtext)
}

/// `extended-attribute`: `[CFWS] 1*extended-attrtext [CFWS]`.
///
/// # Errors
///
/// Fails if no attribute characters follow the optional CFWS.
pub fn extended_attribute(value: &str) -> PResult<'_, TokenList> {
    padded(ListKind::Attribute, value, extended_attrtext)
}

/// `section`: `"*" 1*DIGIT`.
///
/// # Errors
///
/// Fails without a leading `*` followed by digits, or when the number does
/// not fit in `u32`.
pub fn section(value: &str) -> PResult<'_, TokenList> {
    let Some(rest) = value.strip_prefix('*') else {
        return Err(HeaderParseError::expected("section", value));
    };
    let (digits, rest) = split_leading(rest, |c| c.is_ascii_digit());
    if digits.is_empty() {
        return Err(HeaderParseError::expected("section number", rest));
    }
    let number = digits.parse().map_err(|_| {
        HeaderParseError::new(format!("section number '{digits}' is out of range"))
    })?;

    let mut section = TokenList::new(ListKind::Section { number });
    section.push(Terminal::new(TerminalKind::SectionMarker, "*"));
    if digits.len() > 1 && digits.starts_with('0') {
        section
            .defects
            .push(Defect::invalid("section number has an invalid leading 0"));
    }
    section.push(Terminal::new(TerminalKind::Digits, digits));
    Ok((section, rest))
}

/// `value`: `quoted-string / extended-attribute`.
///
/// # Errors
///
/// Fails at end of input, or when neither alternative matches.
pub fn value(value: &str) -> PResult<'_, TokenList> {
    if value.is_empty() {
        return Err(HeaderParseError::new("expected value but found end of string"));
    }
    let (leader, value) = opt_cfws(value);
    if value.is_empty() {
        return Err(HeaderParseError::new("expected value but found only CFWS"));
    }
    let (token, value) = if value.starts_with('"') {
        quoted_string(value)?
    } else {
        extended_attribute(value)?
    };
    let token = with_leader(token, leader);
    Ok((TokenList::with_children(ListKind::Value, vec![token.into()]), value))
}

/// Splits `charset'lang'` off an initial extended value, returning the
/// charset, the language and the offset of the encoded text.
fn initial_prefix(text: &str) -> Option<(&str, &str, usize)> {
    let (charset, rest) = split_run(text, is_attribute_end);
    let rest = rest.strip_prefix('\'')?;
    let (lang, rest) = split_run(rest, is_attribute_end);
    let rest = rest.strip_prefix('\'')?;
    Some((charset, lang, text.len() - rest.len()))
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

/// An extended value written as a quoted string, which RFC 2231 forbids
/// but mailers produce anyway.
fn quoted_extended<'a>(
    param: &mut TokenList,
    info: &mut ParameterInfo,
    value: &'a str,
) -> Result<&'a str, HeaderParseError> {
    let (qstring, rest) = quoted_string(value)?;
    let inner = qstring.stripped_value();
    let prefix = if info.section_number == 0 {
        initial_prefix(&inner)
    } else {
        None
    };
    let semi_valid = if info.section_number == 0 {
        prefix.is_some()
    } else {
        !inner.is_empty() && split_run(&inner, is_extended_attribute_end).1.is_empty()
    };

    if semi_valid {
        param.defects.push(Defect::invalid(
            "Quoted string value for extended parameter is invalid",
        ));
        if let Some((charset, lang, offset)) = prefix {
            info.charset = non_empty(charset);
            info.lang = non_empty(lang);
            info.quoted_value_offset = Some(offset);
        }
    } else {
        param.defects.push(Defect::invalid(
            "Parameter marked as extended but appears to have a quoted string value that is non-encoded",
        ));
        info.extended = false;
    }
    param.push(TokenList::with_children(ListKind::Value, vec![qstring.into()]));
    Ok(rest)
}

/// Moves the children of an initial value's charset into `param`.
fn push_charset(param: &mut TokenList, info: &mut ParameterInfo, token: TokenList) {
    for child in token.children {
        match child {
            Token::List(attr) if attr.kind == ListKind::Attribute => {
                info.charset = non_empty(&attr.stripped_value());
                for part in attr.children {
                    match part {
                        Token::Terminal(mut text)
                            if text.kind == TerminalKind::ExtendedAttrtext =>
                        {
                            text.kind = TerminalKind::Attrtext;
                            param.push(text);
                        }
                        other => param.push(other),
                    }
                }
            }
            other => param.push(other),
        }
    }
}

fn expect_delimiter<'a>(
    param: &mut TokenList,
    value: &'a str,
) -> Result<&'a str, HeaderParseError> {
    let Some(rest) = value.strip_prefix('\'') else {
        return Err(HeaderParseError::new(format!(
            "expected RFC 2231 char/lang encoding delimiter, but found '{value}'"
        )));
    };
    param.push(Terminal::new(TerminalKind::Rfc2231Delimiter, "'"));
    Ok(rest)
}

fn parameter_body<'a>(
    param: &mut TokenList,
    info: &mut ParameterInfo,
    value: &'a str,
) -> Result<&'a str, HeaderParseError> {
    let (name, mut value) = attribute(value)?;
    if value.is_empty() || value.starts_with(';') {
        param.defects.push(Defect::invalid(format!(
            "Parameter contains name ({}) but no value",
            name.render()
        )));
        param.push(name);
        return Ok(value);
    }
    param.push(name);

    if value.starts_with('*') {
        if let Ok((section, rest)) = section(value) {
            if let ListKind::Section { number } = section.kind {
                info.section_number = number;
            }
            info.sectioned = true;
            param.push(section);
            value = rest;
        }
        if value.is_empty() {
            return Err(HeaderParseError::new("Incomplete parameter"));
        }
        if let Some(rest) = value.strip_prefix('*') {
            param.push(Terminal::new(TerminalKind::ExtendedParameterMarker, "*"));
            info.extended = true;
            value = rest;
        }
    }

    let Some(rest) = value.strip_prefix('=') else {
        return Err(HeaderParseError::new("Parameter not followed by '='"));
    };
    param.push(Terminal::new(TerminalKind::ParameterValueSeparator, "="));
    let value = trailing_cfws(param, rest);

    if info.extended && value.starts_with('"') {
        return quoted_extended(param, info, value);
    }

    let (token, value) = if value.starts_with('\'') {
        (None, value)
    } else {
        let (token, rest) = self::value(value)?;
        (Some(token), rest)
    };

    if !info.extended || info.section_number > 0 {
        if !value.starts_with('\'') {
            param.children.extend(token.map(Token::from));
            return Ok(value);
        }
        param.defects.push(Defect::invalid(
            "Apparent initial-extended-value but attribute was not marked as extended or was not initial section",
        ));
    }

    if value.is_empty() || value.starts_with(';') {
        param
            .defects
            .push(Defect::invalid("Missing required charset/lang delimiters"));
        param.children.extend(token.map(Token::from));
        return Ok(value);
    }

    if let Some(token) = token {
        push_charset(param, info, token);
    }
    let mut value = expect_delimiter(param, value)?;
    if !value.starts_with('\'') {
        let (lang, rest) = attrtext(value)?;
        info.lang = Some(lang.text.clone());
        param.push(lang);
        value = rest;
    }
    let value = expect_delimiter(param, value)?;

    if value.is_empty() || value.starts_with(';') {
        param.push(TokenList::new(ListKind::Value));
        return Ok(value);
    }
    let (token, value) = self::value(value)?;
    param.push(token);
    Ok(value)
}

/// `parameter`: `attribute [section] ["*"] "=" value`, including the RFC
/// 2231 `charset'lang'` prefix of an initial extended value.
///
/// # Errors
///
/// Fails if no attribute can be parsed, or the attribute is followed by
/// something other than a section, `*`, `=` or the end of the parameter.
pub fn parameter(value: &str) -> PResult<'_, TokenList> {
    let mut param = TokenList::new(ListKind::Parameter(ParameterInfo::default()));
    let mut info = ParameterInfo::default();
    let rest = parameter_body(&mut param, &mut info, value)?;
    param.kind = ListKind::Parameter(info);
    Ok((param, rest))
}

/// Text that is not a parameter, kept verbatim up to the next `;`.
#[must_use]
pub fn invalid_parameter(value: &str) -> (TokenList, &str) {
    junk(ListKind::InvalidParameter(ParameterInfo::default()), value, |c| c == ';')
}

/// `mime-parameters`: `parameter *(";" parameter)`.
///
/// Never fails; unparseable entries become invalid parameters. Problems
/// found while merging sections (duplicate names, gaps in the numbering,
/// undecodable bytes) are recorded on the returned node.
#[must_use]
pub fn mime_parameters(value: &str) -> TokenList {
    let mut params = TokenList::new(ListKind::MimeParameters);
    let mut value = value;

    while !value.is_empty() {
        match parameter(value) {
            Ok((param, rest)) => {
                params.push(param);
                value = rest;
            }
            Err(_) => {
                let (leader, rest) = opt_cfws(value);
                value = rest;
                if value.is_empty() {
                    params.children.extend(leader.map(Token::from));
                    break;
                }
                if value.starts_with(';') {
                    params.children.extend(leader.map(Token::from));
                    params
                        .defects
                        .push(Defect::invalid("parameter entry with no content"));
                } else {
                    let (token, rest) = invalid_parameter(value);
                    params
                        .defects
                        .push(Defect::invalid(format!("invalid parameter {:?}", token.render())));
                    params.push(with_leader(token, leader));
                    value = rest;
                }
            }
        }

        if !value.is_empty() && !value.starts_with(';') {
            let (extra, rest) = invalid_parameter(value);
            params.defects.push(Defect::invalid(format!(
                "parameter with invalid trailing text {:?}",
                extra.render()
            )));
            match params.children.last_mut() {
                Some(Token::List(last)) if last.parameter_info().is_some() => {
                    let info = last.parameter_info().cloned().unwrap_or_default();
                    last.kind = ListKind::InvalidParameter(info);
                    last.children.extend(extra.children);
                }
                _ => params.push(extra),
            }
            value = rest;
        }

        if let Some(rest) = value.strip_prefix(';') {
            params.push(Terminal::new(TerminalKind::ParameterSeparator, ";"));
            value = rest;
        }
    }
    let merged = rfc2231::reassemble(&params);
    params.defects.extend(merged.into_defects());
    params
}

/// Skips junk up to the first `;` and parses the parameters after it into
/// `list`.
pub fn find_mime_parameters(list: &mut TokenList, value: &str) {
    let (skipped, value) = junk(ListKind::Fragment, value, |c| c == ';');
    list.children.extend(skipped.children);
    if let Some(rest) = value.strip_prefix(';') {
        list.push(Terminal::new(TerminalKind::ParameterSeparator, ";"));
        list.push(mime_parameters(rest));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::defect::DefectKind;

    fn info(param: &TokenList) -> &ParameterInfo {
        param.parameter_info().unwrap()
    }

    #[test]
    fn test_token() {
        let (token, rest) = token(" text /plain").unwrap();
        assert_eq!(token.render(), " text ");
        assert_eq!(token.value().trim(), "text");
        assert_eq!(rest, "/plain");
        assert!(super::token("/plain").is_err());
    }

    #[test]
    fn test_section_leading_zero() {
        let (section, rest) = section("*01=").unwrap();
        assert_eq!(section.kind, ListKind::Section { number: 1 });
        assert_eq!(rest, "=");
        assert_eq!(section.defects.len(), 1);
    }

    #[test]
    fn test_simple_parameter() {
        let (param, rest) = parameter("charset=\"utf-8\"; format=flowed").unwrap();
        assert_eq!(rest, "; format=flowed");
        assert_eq!(param.render(), "charset=\"utf-8\"");
        assert_eq!(param.param_name().as_deref(), Some("charset"));
        assert_eq!(param.param_value(), "utf-8");
        assert!(!info(&param).extended);
        assert!(param.all_defects().is_empty());
    }

    #[test]
    fn test_sectioned_parameter() {
        let (param, _) = parameter("title*1=\"bar\"").unwrap();
        let info = info(&param);
        assert!(info.sectioned);
        assert_eq!(info.section_number, 1);
        assert_eq!(param.param_value(), "bar");
    }

    #[test]
    fn test_initial_extended_parameter() {
        let text = "title*0*=us-ascii'en'foo%20bar";
        let (param, rest) = parameter(text).unwrap();
        assert_eq!(rest, "");
        assert_eq!(param.render(), text);
        let info = info(&param);
        assert!(info.extended);
        assert_eq!(info.charset.as_deref(), Some("us-ascii"));
        assert_eq!(info.lang.as_deref(), Some("en"));
        assert_eq!(param.param_value(), "foo%20bar");
    }

    #[test]
    fn test_extended_parameter_without_language() {
        let (param, _) = parameter("name*=utf-8''%E2%82%AC").unwrap();
        assert_eq!(info(&param).charset.as_deref(), Some("utf-8"));
        assert_eq!(info(&param).lang, None);
        assert_eq!(param.param_value(), "%E2%82%AC");
    }

    #[test]
    fn test_quoted_extended_value() {
        let (param, _) = parameter("name*=\"utf-8''a%20b\"").unwrap();
        assert_eq!(info(&param).charset.as_deref(), Some("utf-8"));
        assert!(info(&param).extended);
        assert_eq!(param.param_value(), "a%20b");
        assert_eq!(param.defects.len(), 1);
    }

    #[test]
    fn test_quoted_extended_value_not_encoded() {
        let (param, _) = parameter("name*=\"plain text\"").unwrap();
        assert!(!info(&param).extended);
        assert_eq!(param.param_value(), "plain text");
        assert_eq!(param.defects[0].kind, DefectKind::InvalidHeader);
    }

    #[test]
    fn test_parameter_without_value() {
        let (param, rest) = parameter("name; x=y").unwrap();
        assert_eq!(rest, "; x=y");
        assert!(param.defects[0].message.contains("but no value"));
    }

    #[test]
    fn test_mime_parameters() {
        let params = mime_parameters(" charset=utf-8; format=flowed");
        assert_eq!(params.render(), " charset=utf-8; format=flowed");
        let names: Vec<_> = params
            .children
            .iter()
            .filter_map(Token::as_list)
            .filter_map(TokenList::param_name)
            .collect();
        assert_eq!(names, vec!["charset", "format"]);
        assert!(params.all_defects().is_empty());
    }

    #[test]
    fn test_mime_parameters_recovers_from_junk() {
        let params = mime_parameters("a=1 junk; @@; b=2");
        assert_eq!(params.render(), "a=1 junk; @@; b=2");
        let first = params.first().and_then(Token::as_list).unwrap();
        assert!(matches!(first.kind, ListKind::InvalidParameter(_)));
        assert_eq!(first.param_value(), "1");
        assert_eq!(params.defects.len(), 2);
    }

    #[test]
    fn test_mime_parameters_records_merge_defects() {
        for value in ["t*0*=utf-8''a; t*2*=b", "a=1; a=2", "n*=utf-8''%FF"] {
            let params = mime_parameters(value);
            assert_eq!(params.render(), value);
            assert_eq!(params.defects.len(), 1, "{value}");
        }
        let params = mime_parameters("n*=utf-8''%FF");
        assert_eq!(params.defects[0].kind, DefectKind::UndecodableBytes);
    }

    #[test]
    fn test_find_mime_parameters() {
        let mut list = TokenList::new(ListKind::Fragment);
        find_mime_parameters(&mut list, "garbage; a=b");
        assert_eq!(list.render(), "garbage; a=b");
        assert!(list.child(|k| *k == ListKind::MimeParameters).is_some());
    }
}
