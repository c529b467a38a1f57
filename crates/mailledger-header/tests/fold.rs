//! Integration tests for header folding.

use mailledger_header::{
    ParameterizedHeader, Policy, fold_header, parse_address_list, parse_content_disposition,
    parse_unstructured,
};
use proptest::prelude::*;

fn policy(max: usize) -> Policy {
    Policy::builder().max_line_length(max).build().unwrap()
}

/// Physical lines with their terminators.
fn wire_lines(folded: &str) -> impl Iterator<Item = &str> {
    folded.split_inclusive('\n')
}

/// Joins continuation lines back into one logical line.
fn unfold(folded: &str) -> String {
    folded.trim_end_matches('\n').replace("\n ", " ")
}

#[test]
fn test_subject_folds_at_spaces() {
    let value = "This is a rather long subject line that needs to be folded somewhere";
    let folded = fold_header("Subject", value, &policy(40));
    assert!(folded.lines().count() > 1);
    for line in wire_lines(&folded) {
        assert!(line.chars().count() <= 40, "{line:?}");
    }
    assert_eq!(unfold(&folded), format!("Subject: {value}"));
}

#[test]
fn test_crlf_counts_against_line_length() {
    let policy = Policy::builder()
        .max_line_length(40)
        .linesep("\r\n")
        .build()
        .unwrap();
    let value = "x".repeat(31);
    let folded = fold_header("Subject", &format!("{value} {value}"), &policy);
    assert!(folded.lines().count() > 1);
    for line in wire_lines(&folded) {
        assert!(line.chars().count() <= 40, "{line:?}");
    }
}

#[test]
fn test_smtp_policy_uses_crlf() {
    let folded = fold_header("Subject", "hello", &Policy::smtp());
    assert_eq!(folded, "Subject: hello\r\n");
}

#[test]
fn test_non_ascii_subject_round_trip() {
    let value = "Grüße aus Köln, und viele weitere Grüße an alle Freunde in München";
    let folded = fold_header("Subject", value, &Policy::default());
    assert!(folded.is_ascii());
    for line in wire_lines(&folded) {
        assert!(line.chars().count() <= 78, "{line:?}");
    }
    let unfolded = unfold(&folded);
    let body = unfolded.strip_prefix("Subject: ").unwrap();
    assert_eq!(parse_unstructured(body).value(), value);
}

#[test]
fn test_display_name_with_special_is_quoted() {
    let list = parse_address_list("\"Doe, Jane\" <jane@example.com>");
    assert_eq!(
        list.fold(&Policy::default()),
        "\"Doe, Jane\" <jane@example.com>\n"
    );
}

#[test]
fn test_non_ascii_display_name_encoded() {
    let folded = fold_header("From", "José <jose@example.com>", &Policy::default());
    assert_eq!(folded, "From: =?utf-8?q?Jos=C3=A9?= <jose@example.com>\n");
}

#[test]
fn test_display_name_specials_stay_encoded() {
    for (value, name) in [
        ("=?utf-8?q?A=2C_B?= <a@b.com>", "A, B"),
        ("=?utf-8?q?Jo=3Ce?= <a@b.com>", "Jo<e"),
    ] {
        let folded = fold_header("To", value, &policy(40));
        let reparsed = parse_address_list(unfold(&folded).strip_prefix("To: ").unwrap());
        let mailboxes = reparsed.mailboxes();
        assert_eq!(mailboxes.len(), 1, "{folded:?}");
        assert_eq!(mailboxes[0].display_name().as_deref(), Some(name));
        assert_eq!(mailboxes[0].addr_spec().as_deref(), Some("a@b.com"));
        assert!(reparsed.all_defects().is_empty(), "{folded:?}");
    }
}

#[test]
fn test_content_type_parameters_refolded() {
    let folded = fold_header(
        "Content-Type",
        "text/plain; charset=utf-8",
        &Policy::default(),
    );
    assert_eq!(folded, "Content-Type: text/plain; charset=\"utf-8\"\n");
}

#[test]
fn test_non_ascii_parameter_uses_rfc2231() {
    let folded = fold_header(
        "Content-Disposition",
        "attachment; filename=\"café.txt\"",
        &Policy::default(),
    );
    assert_eq!(
        folded,
        "Content-Disposition: attachment; filename*=utf-8''caf%C3%A9.txt\n"
    );
}

#[test]
fn test_long_parameter_split_into_sections() {
    let name = "x".repeat(120);
    let disp = parse_content_disposition(&format!("attachment; filename=\"{name}\""));
    let folded = disp.fold(&policy(60));
    let lines: Vec<_> = folded.lines().collect();
    assert!(lines.len() > 2);
    assert!(lines[1].starts_with(" filename*0*=us-ascii''"));

    let reparsed = parse_content_disposition(&unfold(&folded));
    assert_eq!(reparsed.param("filename"), Some(name));
}

proptest! {
    #[test]
    fn prop_fold_respects_line_length(
        words in prop::collection::vec("[a-z]{1,10}", 1..30),
        max in 24_usize..100,
    ) {
        let text = words.join(" ");
        let folded = parse_unstructured(&text).fold(&policy(max));
        for line in wire_lines(&folded) {
            prop_assert!(line.chars().count() <= max, "{:?} > {}", line, max);
        }
    }

    #[test]
    fn prop_unfold_restores_ascii_text(
        words in prop::collection::vec("[a-zA-Z0-9!#.,]{1,10}", 1..30),
        max in 24_usize..100,
    ) {
        let text = words.join(" ");
        let folded = parse_unstructured(&text).fold(&policy(max));
        prop_assert_eq!(unfold(&folded), text);
    }

    #[test]
    fn prop_unstructured_render_is_lossless(text in "[ -~\t]{0,80}") {
        prop_assume!(!text.contains("=?"));
        prop_assert_eq!(parse_unstructured(&text).render(), text);
    }

    #[test]
    fn prop_address_list_render_is_lossless(
        addrs in prop::collection::vec("[a-z]{1,8}@[a-z]{1,8}\\.(com|org)", 1..6),
    ) {
        let text = addrs.join(", ");
        let list = parse_address_list(&text);
        prop_assert_eq!(list.render(), text);
        prop_assert_eq!(list.mailboxes().len(), addrs.len());
    }

    #[test]
    fn prop_non_ascii_fold_decodes_to_original(
        words in prop::collection::vec(
            prop::sample::select(vec!["日本語", "Grüße", "ελληνικά", "café", "naïve"]),
            1..20,
        ),
        max in 40_usize..100,
    ) {
        let text = words.join(" ");
        let folded = parse_unstructured(&text).fold(&policy(max));
        prop_assert!(folded.is_ascii());
        for line in wire_lines(&folded) {
            prop_assert!(line.chars().count() <= max, "{:?} > {}", line, max);
        }
        prop_assert_eq!(parse_unstructured(&unfold(&folded)).value(), text);
    }
}
