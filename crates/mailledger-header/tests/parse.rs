//! Integration tests for header value parsing.
//!
//! These exercise the public facades end to end: parse, inspect the tree
//! through its accessors, and check the defects recorded for bad input.

use mailledger_header::{
    DefectKind, ListKind, ParameterizedHeader, parse_address_list, parse_content_disposition,
    parse_content_type, parse_header_value, parse_mailbox_list, parse_message_id,
    parse_mime_parameters, parse_mime_version, parse_unstructured,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Routes library logs to the test output; set `RUST_LOG` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

#[test]
fn test_address_list_two_mailboxes() {
    let value = "\"A, B\" <a@b.com>, c@d.com";
    let list = parse_address_list(value);
    assert_eq!(list.render(), value);
    assert!(list.all_defects().is_empty());

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
fn test_address_list_with_group() {
    let value = "Team: x@y.org, z@y.org;, solo@example.com";
    let list = parse_address_list(value);
    assert_eq!(list.render(), value);
    assert_eq!(list.addresses().len(), 2);
    assert_eq!(list.mailboxes().len(), 3);
    assert_eq!(list.addresses()[0].display_name().as_deref(), Some("Team"));
}

#[test]
fn test_unterminated_quoted_local_part() {
    let value = "\"unterminated@example.com";
    let list = parse_address_list(value);
    assert_eq!(list.render(), value);
    assert!(!list.all_defects().is_empty());

    let mailboxes = list.all_mailboxes();
    assert_eq!(mailboxes.len(), 1);
    assert!(mailboxes[0].local_part().is_some());
}

#[test]
fn test_invalid_address_is_kept() {
    init_tracing();
    let value = "@@@, ok@example.com";
    let list = parse_address_list(value);
    assert_eq!(list.render(), value);
    assert_eq!(list.mailboxes().len(), 1);
    assert_eq!(list.all_mailboxes().len(), 2);
    assert!(list.all_defects().iter().any(|d| d.kind.is_invalid()));
}

#[test]
fn test_obsolete_route() {
    let list = parse_address_list("<@relay.example:joe@example.com>");
    let mailboxes = list.mailboxes();
    assert_eq!(mailboxes.len(), 1);
    assert_eq!(mailboxes[0].route(), Some(vec!["relay.example".to_string()]));
    assert_eq!(mailboxes[0].addr_spec().as_deref(), Some("joe@example.com"));
    assert!(
        list.all_defects()
            .iter()
            .any(|d| d.kind == DefectKind::ObsoleteHeader)
    );
}

#[test]
fn test_mailbox_list() {
    let list = parse_mailbox_list("Joe <joe@example.com>, (comment) jane@example.com");
    assert!(list.all_defects().is_empty());
    assert_eq!(list.mailboxes().len(), 2);
    assert_eq!(list.comments(), vec!["comment"]);
}

#[test]
fn test_unstructured_encoded_words() {
    let list = parse_unstructured("=?utf-8?q?caf=C3=A9?= =?utf-8?q?_au_lait?=");
    assert_eq!(list.value(), "café au lait");
    assert!(list.all_defects().is_empty());
}

#[test]
fn test_unstructured_unknown_charset() {
    init_tracing();
    let list = parse_unstructured("=?x-unknown?q?abc?=");
    assert_eq!(list.value(), "abc");
    assert!(
        list.all_defects()
            .iter()
            .any(|d| d.kind == DefectKind::Charset)
    );
}

#[test]
fn test_unstructured_round_trip() {
    for value in ["", "plain", "  padded  text\t", "a (not a comment) b", "x=?y"] {
        assert_eq!(parse_unstructured(value).render(), value);
    }
}

#[test]
fn test_content_type_parameters() {
    let ctype = parse_content_type(
        "multipart/mixed; boundary=\"----=_Part_0\"; title*0=\"foo\"; title*1=\"bar\"",
    );
    assert_eq!(ctype.content_type().as_deref(), Some("multipart/mixed"));
    assert_eq!(ctype.param("boundary").as_deref(), Some("----=_Part_0"));
    assert_eq!(ctype.param("title").as_deref(), Some("foobar"));
}

#[test]
fn test_rfc2231_extended_value() {
    let params = parse_mime_parameters("title*0*=us-ascii'en'foo%20bar").params();
    assert_eq!(params.get("title"), Some("foo bar"));
    assert!(params.defects().is_empty());
}

#[test]
fn test_rfc2231_continuation_with_charset() {
    let disp = parse_content_disposition(
        "attachment; filename*0*=utf-8''%E6%97%A5%E6%9C%AC; filename*1*=%E8%AA%9E.txt",
    );
    assert_eq!(disp.disposition(), Some("attachment"));
    assert_eq!(disp.param("filename").as_deref(), Some("日本語.txt"));
}

#[test]
fn test_parameter_merge_defects_reach_tree() {
    for value in [
        "attachment; t*0*=utf-8''a; t*2*=b",
        "attachment; a=1; a=2",
        "attachment; n*=utf-8''%FF",
    ] {
        let disp = parse_content_disposition(value);
        assert_eq!(disp.render(), value);
        assert_eq!(disp.params().defects().len(), 1, "{value}");
        assert_eq!(disp.all_defects().len(), 1, "{value}");
    }
}

#[test]
fn test_parameter_junk_does_not_abort() {
    let params = parse_mime_parameters("a=1; @@; b=2");
    let map = params.params();
    assert_eq!(map.get("a"), Some("1"));
    assert_eq!(map.get("b"), Some("2"));
    assert!(!params.all_defects().is_empty());
}

#[test]
fn test_malformed_values_never_fail() {
    init_tracing();
    for (name, value) in [
        ("To", "<<<"),
        ("Content-Type", "/"),
        ("Content-Disposition", ";;"),
        ("Content-Transfer-Encoding", "@"),
        ("MIME-Version", "one.two"),
        ("Message-ID", "<@>"),
    ] {
        let parsed = parse_header_value(name, value);
        assert_eq!(parsed.render(), value, "{name}");
        assert!(!parsed.all_defects().is_empty(), "{name}: {value}");
    }
}

#[test]
fn test_mime_version_with_comments() {
    let version = parse_mime_version("1.(minor)0");
    assert_eq!(version.version(), Some((Some(1), Some(0))));
    assert_eq!(version.comments(), vec!["minor"]);
}

#[test]
fn test_message_id_obsolete_left() {
    let id = parse_message_id("<\"quoted\"@example.com>");
    assert_eq!(id.kind, ListKind::MessageId);
    assert!(
        id.all_defects()
            .iter()
            .any(|d| d.kind == DefectKind::ObsoleteHeader)
    );
}
