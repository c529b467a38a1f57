//! RFC 5322 address productions (section 3.4) and `msg-id` (section 3.6.4).

use super::lexical::{is_cfws_leader, is_phrase_end, is_wsp, ptext_to_endchars, starts_with};
use super::primitives::{
    atom, cfws, dot_atom, dot_atom_text, fws, junk, opt_cfws, phrase, trailing_cfws, word,
};
use super::{PResult, alt, with_leader};
use crate::defect::{Defect, DefectKind};
use crate::error::HeaderParseError;
use crate::token::{ListKind, Terminal, TerminalKind, Token, TokenList};

fn punct(kind: TerminalKind, text: &str) -> Terminal {
    Terminal::new(kind, text)
}

/// `obs-local-part`: `word *("." word)`, accepting CFWS and stray
/// backslashes with defects.
///
/// # Errors
///
/// Fails if nothing could be consumed.
pub fn obs_local_part(value: &str) -> PResult<'_, TokenList> {
    let mut list = TokenList::new(ListKind::ObsLocalPart { valid: true });
    let mut value = value;
    let mut last_non_ws_was_dot = false;

    while !value.is_empty() && (value.starts_with('\\') || !starts_with(value, is_phrase_end)) {
        if let Some(rest) = value.strip_prefix('.') {
            if last_non_ws_was_dot {
                list.defects.push(Defect::invalid("invalid repeated '.'"));
            }
            list.push(punct(TerminalKind::Dot, "."));
            last_non_ws_was_dot = true;
            value = rest;
            continue;
        }
        if let Some(rest) = value.strip_prefix('\\') {
            list.push(punct(TerminalKind::MisplacedSpecial, "\\"));
            list.defects.push(Defect::invalid(
                "'\\' character outside of quoted-string/ccontent",
            ));
            last_non_ws_was_dot = false;
            value = rest;
            continue;
        }
        if list.last().is_some_and(|t| t.terminal_kind() != Some(TerminalKind::Dot)) {
            list.defects.push(Defect::invalid("missing '.' between words"));
        }
        let (token, rest) = match word(value) {
            Ok(found) => {
                last_non_ws_was_dot = false;
                found
            }
            Err(err) if !starts_with(value, is_cfws_leader) => return Err(err),
            Err(_) => cfws(value)?,
        };
        list.push(token);
        value = rest;
    }

    if list.is_empty() {
        return Err(HeaderParseError::expected("obs-local-part", value));
    }

    let kinds: Vec<Option<TerminalKind>> = list.children.iter().map(Token::terminal_kind).collect();
    let is_dot = |idx: usize| kinds.get(idx).copied().flatten() == Some(TerminalKind::Dot);
    let is_cfws = |idx: usize| {
        list.children
            .get(idx)
            .and_then(Token::list_kind)
            .is_some_and(ListKind::is_cfws)
    };
    let count = kinds.len();
    if is_dot(0) || (is_cfws(0) && count > 1 && is_dot(1)) {
        list.defects.push(Defect::invalid("Invalid leading '.' in local part"));
    }
    if is_dot(count - 1) || (is_cfws(count - 1) && count > 1 && is_dot(count - 2)) {
        list.defects.push(Defect::invalid("Invalid trailing '.' in local part"));
    }
    if !list.defects.is_empty() {
        list.kind = ListKind::ObsLocalPart { valid: false };
    }
    Ok((list, value))
}

/// `local-part`: `dot-atom / quoted-string / obs-local-part`.
///
/// # Errors
///
/// Fails if `value` starts with something that cannot begin a local part.
pub fn local_part(value: &str) -> PResult<'_, TokenList> {
    let start = value;
    let mut local = TokenList::new(ListKind::LocalPart);
    let (leader, value) = opt_cfws(value);
    if value.is_empty() {
        return Err(HeaderParseError::expected("local-part", value));
    }

    let (token, mut value) = match alt(value, "local-part", &[&dot_atom, &word]) {
        Ok(found) => found,
        Err(err) if !value.starts_with('\\') && starts_with(value, is_phrase_end) => {
            return Err(err);
        }
        Err(_) => (TokenList::new(ListKind::Fragment), value),
    };
    local.push(with_leader(token, leader));

    if !value.is_empty() && (value.starts_with('\\') || !starts_with(value, is_phrase_end)) {
        let (obs, rest) = obs_local_part(start)?;
        if obs.kind == (ListKind::ObsLocalPart { valid: false }) {
            local.defects.push(Defect::invalid(
                "local-part is not dot-atom, quoted-string, or obs-local-part",
            ));
        } else {
            local.defects.push(Defect::obsolete(
                "local-part is not a dot-atom (contains CFWS)",
            ));
        }
        local.children = vec![obs.into()];
        value = rest;
    }

    if !local.value().is_ascii() {
        local.defects.push(Defect::new(
            DefectKind::NonAsciiLocalPart,
            "local-part contains non-ASCII characters",
        ));
    }
    Ok((local, value))
}

/// `dtext` inside a domain literal; quoted pairs are obsolete.
fn dtext(value: &str) -> (Terminal, &str) {
    let (text, rest, had_qp) = ptext_to_endchars(value, |c| matches!(c, '[' | ']'));
    let mut terminal = Terminal::new(TerminalKind::Ptext, text);
    if had_qp {
        terminal
            .defects
            .push(Defect::obsolete("quoted printable found in domain-literal"));
    }
    (terminal, rest)
}

/// `domain-literal`: `[CFWS] "[" *([FWS] dtext) [FWS] "]" [CFWS]`.
///
/// # Errors
///
/// Fails if no `[` follows the optional CFWS, or if the literal holds text
/// after its dtext.
pub fn domain_literal(value: &str) -> PResult<'_, TokenList> {
    let mut literal = TokenList::new(ListKind::DomainLiteral);
    let value = trailing_cfws(&mut literal, value);
    let Some(mut value) = value.strip_prefix('[') else {
        return Err(HeaderParseError::new(format!(
            "expected '[' at start of domain-literal but found '{value}'"
        )));
    };
    literal.push(punct(TerminalKind::DomainLiteralStart, "["));

    let early_end = |literal: &mut TokenList, value: &str| {
        if value.is_empty() {
            literal.defects.push(Defect::invalid("end of input inside domain-literal"));
            true
        } else {
            false
        }
    };

    if early_end(&mut literal, value) {
        return Ok((literal, value));
    }
    if let Ok((ws, rest)) = fws(value) {
        literal.push(ws);
        value = rest;
    }
    let (text, rest) = dtext(value);
    literal.push(text);
    value = rest;
    if early_end(&mut literal, value) {
        return Ok((literal, value));
    }
    if starts_with(value, is_wsp)
        && let Ok((ws, rest)) = fws(value)
    {
        literal.push(ws);
        value = rest;
    }
    if early_end(&mut literal, value) {
        return Ok((literal, value));
    }
    let Some(value) = value.strip_prefix(']') else {
        return Err(HeaderParseError::new(format!(
            "expected ']' at end of domain-literal but found '{value}'"
        )));
    };
    literal.push(punct(TerminalKind::DomainLiteralEnd, "]"));
    let value = trailing_cfws(&mut literal, value);
    Ok((literal, value))
}

/// `domain`: `dot-atom / domain-literal / obs-domain`.
///
/// # Errors
///
/// Fails if no domain can be parsed or the domain is followed by `@`.
pub fn domain(value: &str) -> PResult<'_, TokenList> {
    let mut domain = TokenList::new(ListKind::Domain);
    let (leader, value) = opt_cfws(value);
    if value.is_empty() {
        return Err(HeaderParseError::expected("domain", value));
    }
    if value.starts_with('[') {
        let (literal, rest) = domain_literal(value)?;
        domain.push(with_leader(literal, leader));
        return Ok((domain, rest));
    }

    let (token, mut value) = alt(value, "domain", &[&dot_atom, &atom])?;
    if value.starts_with('@') {
        return Err(HeaderParseError::new("Invalid Domain"));
    }
    domain.push(with_leader(token, leader));

    if value.starts_with('.') {
        domain
            .defects
            .push(Defect::obsolete("domain is not a dot-atom (contains CFWS)"));
        if let Some(Token::List(first)) = domain.children.first()
            && first.kind == ListKind::DotAtom
        {
            domain.children = first.children.clone();
        }
        while let Some(rest) = value.strip_prefix('.') {
            domain.push(punct(TerminalKind::Dot, "."));
            let (token, rest) = atom(rest)?;
            domain.push(token);
            value = rest;
        }
    }
    Ok((domain, value))
}

/// `addr-spec`: `local-part "@" domain`.
///
/// A missing domain is flagged rather than rejected.
///
/// # Errors
///
/// Fails if no local part can be parsed.
pub fn addr_spec(value: &str) -> PResult<'_, TokenList> {
    let mut spec = TokenList::new(ListKind::AddrSpec);
    let (local, value) = local_part(value)?;
    spec.push(local);
    let Some(value) = value.strip_prefix('@') else {
        spec.defects.push(Defect::invalid("addr-spec local part with no domain"));
        return Ok((spec, value));
    };
    spec.push(punct(TerminalKind::AddressAt, "@"));
    let (domain, value) = domain(value)?;
    spec.push(domain);
    Ok((spec, value))
}

/// `obs-route`: `obs-domain-list ":"`.
///
/// # Errors
///
/// Fails if the route is not terminated by `:`.
pub fn obs_route(value: &str) -> PResult<'_, TokenList> {
    let mut route = TokenList::new(ListKind::ObsRoute);
    let mut value = value;

    while value.starts_with(',') || starts_with(value, is_cfws_leader) {
        if let Some(rest) = value.strip_prefix(',') {
            route.push(punct(TerminalKind::ListSeparator, ","));
            value = rest;
        } else {
            value = trailing_cfws(&mut route, value);
        }
    }
    let Some(rest) = value.strip_prefix('@') else {
        return Err(HeaderParseError::expected("obs-route domain", value));
    };
    route.push(punct(TerminalKind::RouteComponentMarker, "@"));
    let (token, rest) = domain(rest)?;
    route.push(token);
    value = rest;

    while let Some(rest) = value.strip_prefix(',') {
        route.push(punct(TerminalKind::ListSeparator, ","));
        value = trailing_cfws(&mut route, rest);
        if let Some(rest) = value.strip_prefix('@') {
            route.push(punct(TerminalKind::RouteComponentMarker, "@"));
            let (token, rest) = domain(rest)?;
            route.push(token);
            value = rest;
        }
    }

    if value.is_empty() {
        return Err(HeaderParseError::new("end of header while parsing obs-route"));
    }
    let Some(value) = value.strip_prefix(':') else {
        return Err(HeaderParseError::new(format!(
            "expected ':' marking end of obs-route but found '{value}'"
        )));
    };
    route.push(punct(TerminalKind::EndOfObsRoute, ":"));
    Ok((route, value))
}

/// `angle-addr`: `[CFWS] "<" [obs-route] addr-spec ">" [CFWS]`.
///
/// `<>` is accepted with a defect.
///
/// # Errors
///
/// Fails if no `<` follows the optional CFWS or the content is neither an
/// addr-spec nor an obsolete route.
pub fn angle_addr(value: &str) -> PResult<'_, TokenList> {
    let mut angle = TokenList::new(ListKind::AngleAddr);
    let value = trailing_cfws(&mut angle, value);
    let Some(value) = value.strip_prefix('<') else {
        return Err(HeaderParseError::expected("angle-addr", value));
    };
    angle.push(punct(TerminalKind::AngleAddrStart, "<"));

    if let Some(rest) = value.strip_prefix('>') {
        angle.push(punct(TerminalKind::AngleAddrEnd, ">"));
        angle.defects.push(Defect::invalid("null addr-spec in angle-addr"));
        return Ok((angle, rest));
    }

    let mut value = match addr_spec(value) {
        Ok((spec, rest)) => {
            angle.push(spec);
            rest
        }
        Err(_) => {
            let (route, rest) = obs_route(value).map_err(|_| {
                HeaderParseError::expected("addr-spec or obs-route", value)
            })?;
            angle.push(route);
            angle.defects.push(Defect::obsolete(
                "obsolete route specification in angle-addr",
            ));
            let (spec, rest) = addr_spec(rest)?;
            angle.push(spec);
            rest
        }
    };

    if let Some(rest) = value.strip_prefix('>') {
        angle.push(punct(TerminalKind::AngleAddrEnd, ">"));
        value = rest;
    } else {
        angle.defects.push(Defect::invalid("missing trailing '>' on angle-addr"));
    }
    let value = trailing_cfws(&mut angle, value);
    Ok((angle, value))
}

/// `display-name`: a phrase.
///
/// # Errors
///
/// Fails if no phrase can be parsed.
pub fn display_name(value: &str) -> PResult<'_, TokenList> {
    let (mut phrase, value) = phrase(value)?;
    phrase.kind = ListKind::DisplayName;
    Ok((phrase, value))
}

/// `name-addr`: `[display-name] angle-addr`.
///
/// # Errors
///
/// Fails if no angle-addr follows the optional display name.
pub fn name_addr(value: &str) -> PResult<'_, TokenList> {
    let mut name_addr = TokenList::new(ListKind::NameAddr);
    if value.is_empty() {
        return Err(HeaderParseError::expected("name-addr", value));
    }
    let (mut leader, value) = opt_cfws(value);
    if value.is_empty() {
        return Err(HeaderParseError::expected("name-addr", value));
    }

    let mut value = value;
    if !value.starts_with('<') {
        if starts_with(value, is_phrase_end) {
            return Err(HeaderParseError::expected("name-addr", value));
        }
        let (mut name, rest) = display_name(value)?;
        if rest.is_empty() {
            return Err(HeaderParseError::expected("name-addr", &name.render()));
        }
        if let Some(leader) = leader.take() {
            match name.children.first_mut() {
                Some(Token::List(first)) => first.children.insert(0, leader.into()),
                _ => name.children.insert(0, leader.into()),
            }
        }
        name_addr.push(name);
        value = rest;
    }

    let (angle, value) = angle_addr(value)?;
    name_addr.push(with_leader(angle, leader));
    Ok((name_addr, value))
}

fn has_invalid_defect(token: &TokenList) -> bool {
    token.all_defects().iter().any(|d| d.kind.is_invalid())
}

/// `mailbox`: `name-addr / addr-spec`.
///
/// A mailbox whose parse recorded an invalid defect is tagged
/// [`ListKind::InvalidMailbox`] but keeps its structure.
///
/// # Errors
///
/// Fails if neither alternative matches.
pub fn mailbox(value: &str) -> PResult<'_, TokenList> {
    let (token, value) = alt(value, "mailbox", &[&name_addr, &addr_spec])?;
    let kind = if has_invalid_defect(&token) {
        tracing::trace!(mailbox = %token, "mailbox has invalid syntax");
        ListKind::InvalidMailbox
    } else {
        ListKind::Mailbox
    };
    Ok((TokenList::with_children(kind, vec![token.into()]), value))
}

/// Text that is not a mailbox, kept verbatim up to one of `endchars`.
pub fn invalid_mailbox(value: &str, endchars: impl Fn(char) -> bool) -> (TokenList, &str) {
    junk(ListKind::InvalidMailbox, value, endchars)
}

/// Marks the last element of a list as invalid and absorbs trailing text
/// into it.
fn absorb_trailing<'a>(
    list: &mut TokenList,
    value: &'a str,
    endchars: impl Fn(char) -> bool,
    wrap: impl Fn(TokenList) -> TokenList,
) -> &'a str {
    let (extra, value) = invalid_mailbox(value, endchars);
    let target = match list.children.last_mut() {
        Some(Token::List(last)) if last.kind == ListKind::Address => last.children.first_mut(),
        Some(last) => Some(last),
        None => None,
    };
    match target {
        Some(Token::List(mailbox)) if !mailbox.kind.is_cfws() => {
            if mailbox.kind == ListKind::Mailbox {
                mailbox.kind = ListKind::InvalidMailbox;
            }
            mailbox.children.extend(extra.children);
        }
        _ => list.push(wrap(extra)),
    }
    value
}

/// `mailbox-list`: `mailbox *("," mailbox)`, stopping at `;`.
///
/// Empty elements and unparseable mailboxes are kept with defects.
#[must_use]
pub fn mailbox_list(value: &str) -> (TokenList, &str) {
    let mut list = TokenList::new(ListKind::MailboxList);
    let mut value = value;
    let ends = |c: char| matches!(c, ',' | ';');

    while !value.is_empty() && !value.starts_with(';') {
        match mailbox(value) {
            Ok((token, rest)) => {
                list.push(token);
                value = rest;
            }
            Err(_) => {
                let (leader, rest) = opt_cfws(value);
                value = rest;
                if leader.is_some() && (value.is_empty() || starts_with(value, ends)) {
                    list.children.extend(leader.map(Token::from));
                    list.defects.push(Defect::obsolete("empty element in mailbox-list"));
                } else if leader.is_none() && value.starts_with(',') {
                    list.defects.push(Defect::obsolete("empty element in mailbox-list"));
                } else {
                    let (token, rest) = invalid_mailbox(value, ends);
                    list.push(with_leader(token, leader));
                    list.defects.push(Defect::invalid("invalid mailbox in mailbox-list"));
                    value = rest;
                }
            }
        }
        if !value.is_empty() && !starts_with(value, ends) {
            value = absorb_trailing(&mut list, value, ends, |extra| extra);
            list.defects.push(Defect::invalid("invalid mailbox in mailbox-list"));
        }
        if let Some(rest) = value.strip_prefix(',') {
            list.push(punct(TerminalKind::ListSeparator, ","));
            value = rest;
        }
    }
    (list, value)
}

/// `group-list`: `mailbox-list / CFWS / obs-group-list`.
#[must_use]
pub fn group_list(value: &str) -> (TokenList, &str) {
    let mut list = TokenList::new(ListKind::GroupList);
    if value.is_empty() {
        list.defects.push(Defect::invalid("end of header before group-list"));
        return (list, value);
    }
    let (leader, value) = opt_cfws(value);
    if let Some(leader) = &leader {
        if value.is_empty() {
            list.defects.push(Defect::invalid("end of header in group-list"));
            list.push(leader.clone());
            return (list, value);
        }
        if value.starts_with(';') {
            list.push(leader.clone());
            return (list, value);
        }
    }

    let (mailboxes, value) = mailbox_list(value);
    if mailboxes.all_mailboxes().is_empty() {
        list.children.extend(leader.map(Token::from));
        list.children.extend(mailboxes.children);
        list.defects.push(Defect::obsolete("group-list with empty entries"));
        return (list, value);
    }
    list.push(with_leader(mailboxes, leader));
    (list, value)
}

/// `group`: `display-name ":" [group-list] ";" [CFWS]`.
///
/// # Errors
///
/// Fails if the display name is not followed by `:`, or the group list is
/// followed by something other than `;`.
pub fn group(value: &str) -> PResult<'_, TokenList> {
    let mut group = TokenList::new(ListKind::AddressGroup);
    let (name, value) = if value.starts_with(':') {
        let mut name = TokenList::new(ListKind::DisplayName);
        name.defects.push(Defect::invalid("phrase does not start with word"));
        (name, value)
    } else {
        display_name(value)?
    };
    let Some(value) = value.strip_prefix(':') else {
        return Err(HeaderParseError::new(format!(
            "expected ':' at end of group display name but found '{value}'"
        )));
    };
    group.push(name);
    group.push(punct(TerminalKind::GroupDisplayNameTerminator, ":"));

    if let Some(rest) = value.strip_prefix(';') {
        group.push(punct(TerminalKind::GroupTerminator, ";"));
        let rest = trailing_cfws(&mut group, rest);
        return Ok((group, rest));
    }

    let (list, value) = group_list(value);
    group.push(list);
    let value = if value.is_empty() {
        group.defects.push(Defect::invalid("end of header in group"));
        value
    } else if let Some(rest) = value.strip_prefix(';') {
        group.push(punct(TerminalKind::GroupTerminator, ";"));
        rest
    } else {
        return Err(HeaderParseError::new(format!(
            "expected ';' at end of group but found {value}"
        )));
    };
    let value = trailing_cfws(&mut group, value);
    Ok((group, value))
}

/// `address`: `mailbox / group`.
///
/// # Errors
///
/// Fails if neither a group nor a mailbox matches.
pub fn address(value: &str) -> PResult<'_, TokenList> {
    let (token, value) = alt(value, "address", &[&group, &mailbox])?;
    Ok((wrap_address(token), value))
}

fn wrap_address(token: TokenList) -> TokenList {
    TokenList::with_children(ListKind::Address, vec![token.into()])
}

/// `address-list`: `address *("," address)`.
///
/// Never fails: empty elements and unparseable addresses are kept with
/// defects, and text after an address is absorbed into it.
#[must_use]
pub fn address_list(value: &str) -> TokenList {
    let mut list = TokenList::new(ListKind::AddressList);
    let mut value = value;
    let ends = |c: char| c == ',';

    while !value.is_empty() {
        match address(value) {
            Ok((token, rest)) => {
                list.push(token);
                value = rest;
            }
            Err(_) => {
                let (leader, rest) = opt_cfws(value);
                value = rest;
                if leader.is_some() && (value.is_empty() || value.starts_with(',')) {
                    list.children.extend(leader.map(Token::from));
                    list.defects.push(Defect::obsolete("address-list entry with no content"));
                } else if leader.is_none() && value.starts_with(',') {
                    list.defects.push(Defect::obsolete("empty element in address-list"));
                } else {
                    let (token, rest) = invalid_mailbox(value, ends);
                    tracing::debug!(text = %token, "unparseable address kept as invalid mailbox");
                    list.push(wrap_address(with_leader(token, leader)));
                    list.defects.push(Defect::invalid("invalid address in address-list"));
                    value = rest;
                }
            }
        }
        if !value.is_empty() && !value.starts_with(',') {
            value = absorb_trailing(&mut list, value, ends, wrap_address);
            list.defects.push(Defect::invalid("invalid address in address-list"));
        }
        if let Some(rest) = value.strip_prefix(',') {
            list.push(punct(TerminalKind::ListSeparator, ","));
            value = rest;
        }
    }
    list
}

/// `no-fold-literal`: `"[" *dtext "]"`.
///
/// # Errors
///
/// Fails unless `value` is a bracketed literal.
pub fn no_fold_literal(value: &str) -> PResult<'_, TokenList> {
    let Some(value) = value.strip_prefix('[') else {
        return Err(HeaderParseError::new(format!(
            "expected '[' at the start of no-fold-literal but found '{value}'"
        )));
    };
    let mut literal = TokenList::new(ListKind::NoFoldLiteral);
    literal.push(punct(TerminalKind::NoFoldLiteralStart, "["));
    let (text, value) = dtext(value);
    literal.push(text);
    let Some(value) = value.strip_prefix(']') else {
        return Err(HeaderParseError::new(format!(
            "expected ']' at the end of no-fold-literal but found '{value}'"
        )));
    };
    literal.push(punct(TerminalKind::NoFoldLiteralEnd, "]"));
    Ok((literal, value))
}

/// `msg-id`: `[CFWS] "<" id-left "@" id-right ">" [CFWS]`.
///
/// Obsolete id-left and id-right forms are accepted with defects.
///
/// # Errors
///
/// Fails if no `<` follows the optional CFWS, or the id-left or id-right
/// cannot be parsed.
pub fn msg_id(value: &str) -> PResult<'_, TokenList> {
    let mut id = TokenList::new(ListKind::MsgId);
    let value = trailing_cfws(&mut id, value);
    let Some(value) = value.strip_prefix('<') else {
        return Err(HeaderParseError::expected("msg-id", value));
    };
    id.push(punct(TerminalKind::MsgIdStart, "<"));

    let (left, value) = match dot_atom_text(value) {
        Ok(found) => found,
        Err(_) => {
            let found = obs_local_part(value).map_err(|_| {
                HeaderParseError::expected("dot-atom-text or obs-id-left", value)
            })?;
            id.defects.push(Defect::obsolete("obsolete id-left in msg-id"));
            found
        }
    };
    id.push(left);

    let Some(value) = value.strip_prefix('@') else {
        id.defects.push(Defect::invalid("msg-id with no id-right"));
        if let Some(rest) = value.strip_prefix('>') {
            id.push(punct(TerminalKind::MsgIdEnd, ">"));
            return Ok((id, rest));
        }
        return Ok((id, value));
    };
    id.push(punct(TerminalKind::AddressAt, "@"));

    let (right, value) = match alt(value, "id-right", &[&dot_atom_text, &no_fold_literal]) {
        Ok(found) => found,
        Err(_) => {
            let found = domain(value).map_err(|_| {
                HeaderParseError::expected("dot-atom-text, no-fold-literal or obs-id-right", value)
            })?;
            id.defects.push(Defect::obsolete("obsolete id-right in msg-id"));
            found
        }
    };
    id.push(right);

    let value = if let Some(rest) = value.strip_prefix('>') {
        id.push(punct(TerminalKind::MsgIdEnd, ">"));
        rest
    } else {
        id.defects.push(Defect::invalid("missing trailing '>' on msg-id"));
        value
    };
    let value = trailing_cfws(&mut id, value);
    Ok((id, value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn only_mailbox(value: &str) -> TokenList {
        let (mailbox, rest) = mailbox(value).unwrap();
        assert_eq!(rest, "");
        assert_eq!(mailbox.render(), value);
        mailbox
    }

    #[test]
    fn test_addr_spec() {
        let (spec, rest) = addr_spec("dinsdale@example.com").unwrap();
        assert_eq!(rest, "");
        assert_eq!(spec.local_part().as_deref(), Some("dinsdale"));
        assert_eq!(spec.domain().as_deref(), Some("example.com"));
        assert_eq!(spec.addr_spec().as_deref(), Some("dinsdale@example.com"));
        assert!(spec.all_defects().is_empty());
    }

    #[test]
    fn test_addr_spec_quoted_local_part() {
        let (spec, _) = addr_spec("\"Fred Bloggs\"@example.com").unwrap();
        assert_eq!(spec.local_part().as_deref(), Some("Fred Bloggs"));
        assert_eq!(spec.addr_spec().as_deref(), Some("\"Fred Bloggs\"@example.com"));
    }

    #[test]
    fn test_obs_local_part_with_cfws() {
        let (spec, _) = addr_spec("john . doe@example.com").unwrap();
        assert_eq!(spec.local_part().as_deref(), Some("john.doe"));
        assert!(spec.all_defects().iter().any(|d| d.kind == DefectKind::ObsoleteHeader));
    }

    #[test]
    fn test_repeated_dot_is_invalid() {
        let (spec, _) = addr_spec("john..doe@example.com").unwrap();
        assert!(spec.all_defects().iter().any(|d| d.kind == DefectKind::InvalidHeader));
    }

    #[test]
    fn test_non_ascii_local_part() {
        let (spec, _) = addr_spec("jöhn@example.com").unwrap();
        assert!(spec.all_defects().iter().any(|d| d.kind == DefectKind::NonAsciiLocalPart));
    }

    #[test]
    fn test_domain_literal() {
        let (spec, _) = addr_spec("user@[192.168.0.1]").unwrap();
        assert_eq!(spec.domain().as_deref(), Some("[192.168.0.1]"));
        let literal = spec
            .child(|k| *k == ListKind::Domain)
            .and_then(|d| d.child(|k| *k == ListKind::DomainLiteral))
            .unwrap();
        assert_eq!(literal.ip().as_deref(), Some("192.168.0.1"));
    }

    #[test]
    fn test_unterminated_domain_literal() {
        let (spec, rest) = addr_spec("user@[1.2.3.4").unwrap();
        assert_eq!(rest, "");
        assert_eq!(spec.render(), "user@[1.2.3.4");
        assert!(spec.all_defects().iter().any(|d| d.kind == DefectKind::InvalidHeader));
    }

    #[test]
    fn test_name_addr() {
        let mailbox = only_mailbox("Fred Bloggs <fred@example.com>");
        assert_eq!(mailbox.kind, ListKind::Mailbox);
        assert_eq!(mailbox.display_name().as_deref(), Some("Fred Bloggs"));
        assert_eq!(mailbox.addr_spec().as_deref(), Some("fred@example.com"));
    }

    #[test]
    fn test_quoted_display_name() {
        let mailbox = only_mailbox("\"Bloggs, Fred\" <fred@example.com>");
        assert_eq!(mailbox.display_name().as_deref(), Some("Bloggs, Fred"));
        let name = mailbox
            .child(|k| *k == ListKind::NameAddr)
            .and_then(|n| n.child(|k| *k == ListKind::DisplayName))
            .unwrap();
        assert_eq!(name.value(), "\"Bloggs, Fred\" ");
    }

    #[test]
    fn test_obsolete_route() {
        let mailbox = only_mailbox("<@example.org,@example.net:fred@example.com>");
        assert_eq!(
            mailbox.route(),
            Some(vec!["example.org".to_string(), "example.net".to_string()])
        );
        assert_eq!(mailbox.addr_spec().as_deref(), Some("fred@example.com"));
    }

    #[test]
    fn test_null_angle_addr() {
        let (angle, _) = angle_addr("<>").unwrap();
        assert_eq!(angle.addr_spec().as_deref(), Some("<>"));
        assert!(angle.defects.iter().any(|d| d.kind == DefectKind::InvalidHeader));
    }

    #[test]
    fn test_missing_angle_bracket_is_invalid_mailbox() {
        let (mailbox, rest) = mailbox("Fred <fred@example.com").unwrap();
        assert_eq!(rest, "");
        assert_eq!(mailbox.kind, ListKind::InvalidMailbox);
        assert_eq!(mailbox.render(), "Fred <fred@example.com");
        assert_eq!(mailbox.addr_spec().as_deref(), Some("fred@example.com"));
    }

    #[test]
    fn test_unterminated_quoted_local_part() {
        let (mailbox, rest) = mailbox("\"abc@example.com").unwrap();
        assert_eq!(rest, "");
        assert_eq!(mailbox.kind, ListKind::InvalidMailbox);
        assert_eq!(mailbox.local_part().as_deref(), Some("abc@example.com"));
        assert_eq!(mailbox.domain(), None);
    }

    #[test]
    fn test_group() {
        let (group, rest) = group("Friends: a@example.com, Bob <b@example.com>;").unwrap();
        assert_eq!(rest, "");
        assert_eq!(group.display_name().as_deref(), Some("Friends"));
        let addrs: Vec<_> = group.mailboxes().iter().filter_map(|m| m.addr_spec()).collect();
        assert_eq!(addrs, vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_empty_group() {
        let (group, rest) = group("undisclosed-recipients:;").unwrap();
        assert_eq!(rest, "");
        assert!(group.mailboxes().is_empty());
        assert!(group.all_defects().is_empty());
    }

    #[test]
    fn test_address_list() {
        let list = address_list("\"A, B\" <a@b.com>, c@d.com");
        assert_eq!(list.render(), "\"A, B\" <a@b.com>, c@d.com");
        let mailboxes = list.mailboxes();
        assert_eq!(mailboxes.len(), 2);
        assert_eq!(mailboxes[0].display_name().as_deref(), Some("A, B"));
        assert_eq!(mailboxes[0].local_part().as_deref(), Some("a"));
        assert_eq!(mailboxes[0].domain().as_deref(), Some("b.com"));
        assert_eq!(mailboxes[1].display_name(), None);
        assert_eq!(mailboxes[1].local_part().as_deref(), Some("c"));
        assert_eq!(mailboxes[1].domain().as_deref(), Some("d.com"));
    }

    #[test]
    fn test_address_list_empty_elements() {
        let list = address_list("a@b.com,, c@d.com");
        assert_eq!(list.mailboxes().len(), 2);
        assert!(list.defects.iter().any(|d| d.kind == DefectKind::ObsoleteHeader));
    }

    #[test]
    fn test_address_list_keeps_garbage() {
        let list = address_list("a@b.com, <<>>, c@d.com");
        assert_eq!(list.render(), "a@b.com, <<>>, c@d.com");
        assert_eq!(list.mailboxes().len(), 2);
        assert_eq!(list.all_mailboxes().len(), 3);
    }

    #[test]
    fn test_trailing_text_after_address() {
        let list = address_list("a@b.com junk, c@d.com");
        assert_eq!(list.render(), "a@b.com junk, c@d.com");
        let all = list.all_mailboxes();
        assert_eq!(all[0].kind, ListKind::InvalidMailbox);
        assert_eq!(all[0].addr_spec().as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_msg_id() {
        let (id, rest) = msg_id("<1234@example.com>").unwrap();
        assert_eq!(rest, "");
        assert!(id.all_defects().is_empty());
        assert_eq!(id.render(), "<1234@example.com>");
    }

    #[test]
    fn test_msg_id_no_fold_literal() {
        let (id, _) = msg_id("<abc@[127.0.0.1]>").unwrap();
        assert!(id.all_defects().is_empty());
    }

    #[test]
    fn test_msg_id_without_right() {
        let (id, rest) = msg_id("<abc>").unwrap();
        assert_eq!(rest, "");
        assert!(id.defects.iter().any(|d| d.message == "msg-id with no id-right"));
    }
}
