//! Address views over the parse tree.
//!
//! Mailboxes, groups and address lists are not separate types; these
//! accessors read them from [`TokenList`] nodes of the matching production.

use super::{ListKind, Token, TokenList};
use crate::parser::lexical::{is_dot_atom_end, quote_string};

const fn is_address_node(kind: &ListKind) -> bool {
    matches!(kind, ListKind::NameAddr | ListKind::AddrSpec)
}

/// Value of a node with CFWS removed from its front and/or back edge.
fn edge_stripped_value(list: &TokenList, front: bool, back: bool) -> String {
    let count = list.children.len();
    let mut out = String::new();
    for (idx, child) in list.children.iter().enumerate() {
        let at_front = front && idx == 0;
        let at_back = back && idx + 1 == count;
        match child {
            Token::List(inner) if inner.kind.is_cfws() && (at_front || at_back) => {}
            Token::List(inner) if at_front || at_back => {
                out.push_str(&edge_stripped_value(inner, at_front, at_back));
            }
            other => out.push_str(&other.value()),
        }
    }
    out
}

fn starts_with_cfws(list: &TokenList) -> bool {
    match list.first() {
        Some(Token::List(first)) => {
            first.kind.is_cfws()
                || first
                    .first()
                    .and_then(Token::list_kind)
                    .is_some_and(ListKind::is_cfws)
        }
        _ => false,
    }
}

fn ends_with_cfws(list: &TokenList) -> bool {
    match list.last() {
        Some(Token::List(last)) => {
            last.kind.is_cfws()
                || last
                    .last()
                    .and_then(Token::list_kind)
                    .is_some_and(ListKind::is_cfws)
        }
        _ => false,
    }
}

/// A display name is re-quoted when it holds a quoted string or is defective.
pub(super) fn display_name_value(list: &TokenList) -> String {
    let quote = !list.defects.is_empty()
        || list
            .children
            .iter()
            .any(|c| c.list_kind() == Some(&ListKind::QuotedString));
    if list.is_empty() || !quote {
        return list.children.iter().map(Token::value).collect();
    }

    let pre = if starts_with_cfws(list) { " " } else { "" };
    let post = if ends_with_cfws(list) { " " } else { "" };
    format!("{pre}{}{post}", quote_string(&edge_stripped_value(list, true, true)))
}

pub(super) fn local_part_value(list: &TokenList) -> String {
    match list.first() {
        Some(Token::List(inner)) if inner.kind == ListKind::QuotedString => inner
            .children
            .iter()
            .map(|c| match c {
                Token::List(bare) if matches!(bare.kind, ListKind::BareQuotedString { .. }) => {
                    bare.render()
                }
                other => other.value(),
            })
            .collect(),
        Some(first) => first.value(),
        None => String::new(),
    }
}

pub(super) fn addr_spec_value(list: &TokenList) -> String {
    match list.children.as_slice() {
        [local, at, domain, ..] => format!(
            "{}{}{}",
            local.value().trim_end(),
            at.value(),
            domain.value().trim_start()
        ),
        [local, ..] => local.value(),
        [] => String::new(),
    }
}

/// Local part with CFWS stripped around words and dots.
fn local_part_text(list: &TokenList) -> String {
    let Some(Token::List(inner)) = list.first() else {
        return list.first().map(Token::value).unwrap_or_default();
    };
    inner
        .children
        .iter()
        .filter(|c| !c.list_kind().is_some_and(ListKind::is_cfws))
        .map(|c| match c {
            Token::List(word) => edge_stripped_value(word, true, true),
            Token::Terminal(t) => t.value().to_string(),
        })
        .collect()
}

impl TokenList {
    fn address_child(&self) -> Option<&Self> {
        self.child(is_address_node)
    }

    /// Display name of a mailbox, name-addr, group or display-name node.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        match self.kind {
            ListKind::DisplayName | ListKind::Phrase => Some(edge_stripped_value(self, true, true)),
            ListKind::NameAddr => {
                if self.len() < 2 {
                    return None;
                }
                self.child(|k| *k == ListKind::DisplayName)?.display_name()
            }
            ListKind::Mailbox | ListKind::InvalidMailbox => {
                self.child(|k| *k == ListKind::NameAddr)?.display_name()
            }
            ListKind::AddressGroup => self.child(|k| *k == ListKind::DisplayName)?.display_name(),
            ListKind::Address => self.first()?.as_list()?.display_name(),
            _ => None,
        }
    }

    /// Local part of an address-bearing node.
    #[must_use]
    pub fn local_part(&self) -> Option<String> {
        match self.kind {
            ListKind::LocalPart => Some(local_part_text(self)),
            ListKind::AddrSpec => self.child(|k| *k == ListKind::LocalPart)?.local_part(),
            ListKind::AngleAddr => self.child(|k| *k == ListKind::AddrSpec)?.local_part(),
            ListKind::NameAddr => self.child(|k| *k == ListKind::AngleAddr)?.local_part(),
            ListKind::Mailbox | ListKind::InvalidMailbox => self.address_child()?.local_part(),
            _ => None,
        }
    }

    /// Domain of an address-bearing node, with whitespace removed.
    #[must_use]
    pub fn domain(&self) -> Option<String> {
        match self.kind {
            ListKind::Domain | ListKind::DomainLiteral => {
                Some(self.value().split_whitespace().collect())
            }
            ListKind::AddrSpec => {
                if self.len() < 3 {
                    return None;
                }
                self.last()?.as_list()?.domain()
            }
            ListKind::AngleAddr => self.child(|k| *k == ListKind::AddrSpec)?.domain(),
            ListKind::NameAddr => self.child(|k| *k == ListKind::AngleAddr)?.domain(),
            ListKind::Mailbox | ListKind::InvalidMailbox => self.address_child()?.domain(),
            _ => None,
        }
    }

    /// Obsolete source route domains, if the address carries one.
    #[must_use]
    pub fn route(&self) -> Option<Vec<String>> {
        match self.kind {
            ListKind::ObsRoute => Some(
                self.children
                    .iter()
                    .filter_map(Token::as_list)
                    .filter_map(Self::domain)
                    .collect(),
            ),
            ListKind::AngleAddr => self.child(|k| *k == ListKind::ObsRoute)?.route(),
            ListKind::NameAddr => self.child(|k| *k == ListKind::AngleAddr)?.route(),
            ListKind::Mailbox | ListKind::InvalidMailbox => {
                self.child(|k| *k == ListKind::NameAddr)?.route()
            }
            _ => None,
        }
    }

    /// `local@domain`, quoting the local part when it is not a dot-atom.
    ///
    /// An angle-addr without an address yields `<>`.
    #[must_use]
    pub fn addr_spec(&self) -> Option<String> {
        match self.kind {
            ListKind::AddrSpec => {
                let local = self.local_part().unwrap_or_default();
                let local = if local.chars().any(is_dot_atom_end) {
                    quote_string(&local)
                } else {
                    local
                };
                Some(match self.domain() {
                    Some(domain) => format!("{local}@{domain}"),
                    None => local,
                })
            }
            ListKind::AngleAddr => {
                let Some(spec) = self.child(|k| *k == ListKind::AddrSpec) else {
                    return Some("<>".to_string());
                };
                let local = spec.local_part().unwrap_or_default();
                let addr = spec.addr_spec()?;
                if local.is_empty() {
                    Some(format!("{}{addr}", quote_string(&local)))
                } else {
                    Some(addr)
                }
            }
            ListKind::NameAddr => self.child(|k| *k == ListKind::AngleAddr)?.addr_spec(),
            ListKind::Mailbox | ListKind::InvalidMailbox => self.address_child()?.addr_spec(),
            _ => None,
        }
    }

    /// Literal text of a domain literal, without brackets.
    #[must_use]
    pub fn ip(&self) -> Option<String> {
        if self.kind != ListKind::DomainLiteral {
            return None;
        }
        self.children
            .iter()
            .filter_map(Token::as_terminal)
            .find(|t| t.kind == super::TerminalKind::Ptext)
            .map(|t| t.text.clone())
    }

    /// Addresses of an address list.
    #[must_use]
    pub fn addresses(&self) -> Vec<&Self> {
        if self.kind != ListKind::AddressList {
            return Vec::new();
        }
        self.children
            .iter()
            .filter_map(Token::as_list)
            .filter(|l| l.kind == ListKind::Address)
            .collect()
    }

    /// Valid mailboxes reachable from this node.
    #[must_use]
    pub fn mailboxes(&self) -> Vec<&Self> {
        self.collect_mailboxes(false)
    }

    /// Valid and invalid mailboxes reachable from this node.
    #[must_use]
    pub fn all_mailboxes(&self) -> Vec<&Self> {
        self.collect_mailboxes(true)
    }

    fn collect_mailboxes(&self, include_invalid: bool) -> Vec<&Self> {
        let wanted = |l: &&Self| {
            l.kind == ListKind::Mailbox || (include_invalid && l.kind == ListKind::InvalidMailbox)
        };
        match self.kind {
            ListKind::Mailbox => vec![self],
            ListKind::InvalidMailbox if include_invalid => vec![self],
            ListKind::MailboxList => self
                .children
                .iter()
                .filter_map(Token::as_list)
                .filter(wanted)
                .collect(),
            ListKind::GroupList => self
                .child(|k| *k == ListKind::MailboxList)
                .map(|list| list.collect_mailboxes(include_invalid))
                .unwrap_or_default(),
            ListKind::AddressGroup => self
                .child(|k| *k == ListKind::GroupList)
                .map(|list| list.collect_mailboxes(include_invalid))
                .unwrap_or_default(),
            ListKind::Address => self
                .first()
                .and_then(Token::as_list)
                .map(|inner| inner.collect_mailboxes(include_invalid))
                .unwrap_or_default(),
            ListKind::AddressList => self
                .addresses()
                .into_iter()
                .flat_map(|address| address.collect_mailboxes(include_invalid))
                .collect(),
            _ => Vec::new(),
        }
    }
}
