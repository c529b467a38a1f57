//! # mailledger-header
//!
//! Lenient parsing and folding of email header values.
//!
//! This crate turns one unfolded header value into a typed parse tree and
//! back into wire-ready folded lines.
//!
//! ## Features
//!
//! - **RFC 5322**: address lists, mailboxes, groups, message IDs, with the
//!   obsolete syntax accepted and flagged
//! - **RFC 2047**: encoded words are decoded while parsing and produced
//!   again while folding
//! - **RFC 2045 / RFC 2231**: content type, disposition and parameters,
//!   including continuations and charset-tagged values
//! - **Defects, not errors**: malformed input never aborts a parse; every
//!   anomaly is recorded on the node where it was found
//!
//! ## Example
//!
//! ```
//! use mailledger_header::{Policy, fold_header, parse_address_list};
//!
//! let list = parse_address_list("\"A, B\" <a@b.com>, c@d.com");
//! let mailboxes = list.mailboxes();
//! assert_eq!(mailboxes.len(), 2);
//! assert_eq!(mailboxes[0].display_name().as_deref(), Some("A, B"));
//! assert_eq!(mailboxes[1].domain().as_deref(), Some("d.com"));
//!
//! let folded = fold_header("Subject", "Café au lait", &Policy::default());
//! assert_eq!(folded, "Subject: =?utf-8?q?Caf=C3=A9?= au lait\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod defect;
pub mod encoding;
pub mod error;
pub mod fold;
pub mod header;
pub mod parser;
pub mod policy;
pub mod rfc2231;
pub mod token;

pub use defect::{Defect, DefectKind};
pub use error::{Error, HeaderParseError, Result};
pub use fold::FoldStrategy;
pub use header::{
    fold_header, parse_address_list, parse_content_disposition, parse_content_transfer_encoding,
    parse_content_type, parse_header_value, parse_mailbox_list, parse_message_id,
    parse_mime_parameters, parse_mime_version, parse_unstructured,
};
pub use policy::{Policy, PolicyBuilder};
pub use rfc2231::ParameterMap;
pub use token::{
    ListKind, ParameterInfo, ParameterizedHeader, Terminal, TerminalKind, Token, TokenList,
};
