//! Header-level entry points.
//!
//! Each facade runs the top-level production for one kind of header and
//! adds the structural defects that only make sense for a whole value.
//! None of them fail: malformed input always yields a tree, with defects.

use crate::defect::Defect;
use crate::parser::address::{address_list, mailbox_list, msg_id};
use crate::parser::lexical::{is_cfws_leader, split_run, starts_with};
use crate::parser::mime::{find_mime_parameters, mime_parameters, token};
use crate::parser::primitives::{cfws, junk, unstructured};
use crate::policy::Policy;
use crate::token::{ListKind, Terminal, TerminalKind, Token, TokenList};

/// Headers whose value is an address list.
const ADDRESS_HEADERS: &[&str] = &[
    "from",
    "to",
    "cc",
    "bcc",
    "sender",
    "reply-to",
    "resent-from",
    "resent-to",
    "resent-cc",
    "resent-bcc",
    "resent-sender",
];

/// Parses free text, decoding any encoded words.
#[must_use]
pub fn parse_unstructured(value: &str) -> TokenList {
    tracing::trace!(value, "parsing unstructured header");
    unstructured(value)
}

/// Parses an address list (`To`, `Cc`, ...).
#[must_use]
pub fn parse_address_list(value: &str) -> TokenList {
    tracing::trace!(value, "parsing address list");
    address_list(value)
}

/// Parses a mailbox list (`From` in strict RFC 5322 form).
#[must_use]
pub fn parse_mailbox_list(value: &str) -> TokenList {
    tracing::trace!(value, "parsing mailbox list");
    let (mut list, rest) = mailbox_list(value);
    if !rest.is_empty() {
        list.defects.push(Defect::invalid(format!(
            "unexpected text after mailbox-list: {rest:?}"
        )));
        list.push(Terminal::new(TerminalKind::Xtext, rest));
    }
    list
}

/// Parses a `Content-Type` value.
///
/// A value that cannot be read as `maintype/subtype` is treated as
/// `text/plain`, as RFC 2045 requires. Parameters are still collected.
#[must_use]
pub fn parse_content_type(value: &str) -> TokenList {
    tracing::trace!(value, "parsing content type");
    let mut ctype = TokenList::new(ListKind::ContentType {
        maintype: "text".to_string(),
        subtype: "plain".to_string(),
    });
    if value.is_empty() {
        ctype
            .defects
            .push(Defect::missing("Missing content type specification"));
        return ctype;
    }

    let Ok((maintype, value)) = token(value) else {
        ctype.defects.push(Defect::invalid(format!(
            "Expected content maintype but found {value:?}"
        )));
        find_mime_parameters(&mut ctype, value);
        return ctype;
    };
    let maintype_value = maintype.value().trim().to_ascii_lowercase();
    ctype.push(maintype);

    let Some(value) = value.strip_prefix('/') else {
        ctype.defects.push(Defect::invalid("Invalid content type"));
        find_mime_parameters(&mut ctype, value);
        return ctype;
    };
    ctype.push(Terminal::new(TerminalKind::ContentTypeSeparator, "/"));

    let Ok((subtype, value)) = token(value) else {
        ctype.defects.push(Defect::invalid(format!(
            "Expected content subtype but found {value:?}"
        )));
        find_mime_parameters(&mut ctype, value);
        return ctype;
    };
    let subtype_value = subtype.value().trim().to_ascii_lowercase();
    ctype.push(subtype);

    if !value.is_empty() && !value.starts_with(';') {
        ctype.defects.push(Defect::invalid(format!(
            "Only parameters are valid after content type, but found {value:?}"
        )));
        tracing::debug!(value, "content type treated as text/plain");
        find_mime_parameters(&mut ctype, value);
        return ctype;
    }

    ctype.kind = ListKind::ContentType {
        maintype: maintype_value,
        subtype: subtype_value,
    };
    if let Some(rest) = value.strip_prefix(';') {
        ctype.push(Terminal::new(TerminalKind::ParameterSeparator, ";"));
        ctype.push(mime_parameters(rest));
    }
    ctype
}

/// Parses a `Content-Disposition` value.
#[must_use]
pub fn parse_content_disposition(value: &str) -> TokenList {
    tracing::trace!(value, "parsing content disposition");
    let mut disp = TokenList::new(ListKind::ContentDisposition { disposition: None });
    if value.is_empty() {
        disp.defects
            .push(Defect::missing("Missing content disposition"));
        return disp;
    }

    let Ok((kind, value)) = token(value) else {
        disp.defects.push(Defect::invalid(format!(
            "Expected content disposition but found {value:?}"
        )));
        find_mime_parameters(&mut disp, value);
        return disp;
    };
    disp.kind = ListKind::ContentDisposition {
        disposition: Some(kind.value().trim().to_ascii_lowercase()),
    };
    disp.push(kind);

    if value.is_empty() {
        return disp;
    }
    if let Some(rest) = value.strip_prefix(';') {
        disp.push(Terminal::new(TerminalKind::ParameterSeparator, ";"));
        disp.push(mime_parameters(rest));
    } else {
        disp.defects.push(Defect::invalid(format!(
            "Only parameters are valid after content disposition, but found {value:?}"
        )));
        find_mime_parameters(&mut disp, value);
    }
    disp
}

/// Parses a `Content-Transfer-Encoding` value. Defaults to `7bit`.
#[must_use]
pub fn parse_content_transfer_encoding(value: &str) -> TokenList {
    tracing::trace!(value, "parsing content transfer encoding");
    let mut cte = TokenList::new(ListKind::ContentTransferEncoding {
        cte: "7bit".to_string(),
    });
    if value.is_empty() {
        cte.defects
            .push(Defect::missing("Missing content transfer encoding"));
        return cte;
    }

    let value = match token(value) {
        Ok((encoding, rest)) => {
            cte.kind = ListKind::ContentTransferEncoding {
                cte: encoding.value().trim().to_ascii_lowercase(),
            };
            cte.push(encoding);
            rest
        }
        Err(_) => {
            cte.defects.push(Defect::invalid(format!(
                "Expected content transfer encoding but found {value:?}"
            )));
            value
        }
    };

    if !value.is_empty() {
        cte.defects.push(Defect::invalid(
            "Extra text after content transfer encoding",
        ));
        let (extra, _) = junk(ListKind::Fragment, value, |_| false);
        cte.children.extend(extra.children);
    }
    cte
}

/// Consumes a version component: everything up to `stop`.
///
/// Returns the parsed number, or `None` with an `Xtext` terminal when the
/// text is not a decimal number that fits in a `u32`.
fn version_number(
    list: &mut TokenList,
    value: &str,
    stop: impl Fn(char) -> bool,
    which: &str,
) -> Option<u32> {
    let (digits, _) = split_run(value, stop);
    if digits.is_empty() {
        list.defects.push(Defect::invalid(format!(
            "Expected MIME {which} version number but found {value:?}"
        )));
        return None;
    }
    let number = digits
        .bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| digits.parse::<u32>().ok())
        .flatten();
    match number {
        Some(number) => {
            list.push(Terminal::new(TerminalKind::Digits, digits));
            Some(number)
        }
        None => {
            list.defects.push(Defect::invalid(format!(
                "Expected MIME {which} version number but found {digits:?}"
            )));
            list.push(Terminal::new(TerminalKind::Xtext, digits));
            None
        }
    }
}

fn push_cfws<'a>(list: &mut TokenList, value: &'a str) -> &'a str {
    if !starts_with(value, is_cfws_leader) {
        return value;
    }
    match cfws(value) {
        Ok((token, rest)) => {
            list.push(token);
            rest
        }
        Err(_) => value,
    }
}

/// Parses a `MIME-Version` value (`1.0`).
#[must_use]
pub fn parse_mime_version(value: &str) -> TokenList {
    tracing::trace!(value, "parsing mime version");
    let mut version = TokenList::new(ListKind::MimeVersion {
        major: None,
        minor: None,
    });
    if value.is_empty() {
        version
            .defects
            .push(Defect::missing("Missing MIME version number (eg: 1.0)"));
        return version;
    }

    let value = push_cfws(&mut version, value);
    if value.is_empty() {
        version.defects.push(Defect::missing(
            "Expected MIME version number but found only CFWS",
        ));
        return version;
    }

    let major = version_number(
        &mut version,
        value,
        |c| c == '.' || is_cfws_leader(c),
        "major",
    );
    let (_, value) = split_run(value, |c| c == '.' || is_cfws_leader(c));
    let value = push_cfws(&mut version, value);

    let Some(value) = value.strip_prefix('.') else {
        if major.is_some() {
            version.defects.push(Defect::invalid(
                "Incomplete MIME version; found only major number",
            ));
        }
        if !value.is_empty() {
            version.push(Terminal::new(TerminalKind::Xtext, value));
        }
        version.kind = ListKind::MimeVersion { major, minor: None };
        return version;
    };
    version.push(Terminal::new(TerminalKind::VersionSeparator, "."));
    let value = push_cfws(&mut version, value);
    if value.is_empty() {
        if major.is_some() {
            version.defects.push(Defect::invalid(
                "Incomplete MIME version; found only major number",
            ));
        }
        version.kind = ListKind::MimeVersion { major, minor: None };
        return version;
    }

    let minor = version_number(&mut version, value, is_cfws_leader, "minor");
    let (_, value) = split_run(value, is_cfws_leader);
    let value = push_cfws(&mut version, value);
    if !value.is_empty() {
        version
            .defects
            .push(Defect::invalid("Excess non-CFWS text after MIME version"));
        version.push(Terminal::new(TerminalKind::Xtext, value));
    }
    version.kind = ListKind::MimeVersion { major, minor };
    version
}

/// Parses a bare parameter list (`a=b; c=d`).
#[must_use]
pub fn parse_mime_parameters(value: &str) -> TokenList {
    tracing::trace!(value, "parsing mime parameters");
    mime_parameters(value)
}

/// Parses a `Message-ID` value.
///
/// An unparseable value is kept as unstructured text inside an
/// invalid-message-id node.
#[must_use]
pub fn parse_message_id(value: &str) -> TokenList {
    tracing::trace!(value, "parsing message id");
    match msg_id(value) {
        Ok((id, rest)) => {
            let mut message_id = TokenList::with_children(ListKind::MessageId, vec![id.into()]);
            if !rest.is_empty() {
                message_id
                    .defects
                    .push(Defect::invalid(format!("Unexpected {rest:?}")));
                message_id.push(unstructured(rest));
            }
            message_id
        }
        Err(err) => {
            tracing::debug!(error = %err, "message id kept as unstructured text");
            let mut invalid = TokenList::with_children(
                ListKind::InvalidMessageId,
                vec![unstructured(value).into()],
            );
            if value.is_empty() {
                invalid.defects.push(Defect::missing("Missing msg-id"));
            } else {
                invalid
                    .defects
                    .push(Defect::invalid(format!("Invalid msg-id: {}", err.message())));
            }
            invalid
        }
    }
}

/// Parses `value` with the grammar appropriate for the header `name`.
///
/// Unknown headers are parsed as unstructured text.
#[must_use]
pub fn parse_header_value(name: &str, value: &str) -> TokenList {
    let name = name.trim().to_ascii_lowercase();
    match name.as_str() {
        n if ADDRESS_HEADERS.contains(&n) => parse_address_list(value),
        "content-type" => parse_content_type(value),
        "content-disposition" => parse_content_disposition(value),
        "content-transfer-encoding" => parse_content_transfer_encoding(value),
        "mime-version" => parse_mime_version(value),
        "message-id" | "resent-message-id" => parse_message_id(value),
        _ => parse_unstructured(value),
    }
}

/// Parses `value` for the header `name` and folds `Name: value` into
/// lines according to `policy`.
///
/// Leading whitespace of `value` is replaced by the single space after the
/// colon.
#[must_use]
pub fn fold_header(name: &str, value: &str, policy: &Policy) -> String {
    let parsed = parse_header_value(name, value.trim_start());
    let header = TokenList::with_children(
        ListKind::Header,
        vec![
            Terminal::new(TerminalKind::HeaderName, name).into(),
            Terminal::new(TerminalKind::HeaderSeparator, ":").into(),
            TokenList::with_children(ListKind::Cfws, vec![Terminal::fws(" ").into()]).into(),
            parsed.into(),
        ],
    );
    Token::List(header).fold(policy)
}
