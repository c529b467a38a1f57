//! RFC 2047 encoded-word codec.
//!
//! Supports Base64 (`B`) and Quoted-Printable (`Q`) encoded words in any
//! charset known to `encoding_rs`. Decoding is lenient: recoverable problems
//! are reported as [`Defect`]s alongside the decoded text.

use crate::defect::{Defect, DefectKind};
use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use encoding_rs::Encoding;
use std::fmt::Write as _;

/// Charset label used for text carrying undecodable bytes.
pub const UNKNOWN_8BIT: &str = "unknown-8bit";

/// Base64 engine that tolerates missing padding and stray trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Result of decoding one encoded word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedWord {
    /// Decoded text.
    pub text: String,
    /// Charset named by the encoded word.
    pub charset: String,
    /// RFC 2231 language tag, empty if absent.
    pub lang: String,
    /// Problems found while decoding.
    pub defects: Vec<Defect>,
}

/// Decodes a single RFC 2047 encoded word.
///
/// Format: `=?charset[*lang]?encoding?encoded-text?=`
///
/// # Errors
///
/// Returns [`Error::InvalidEncodedWord`] if `word` is not shaped like an
/// encoded word or names an unknown content transfer encoding.
pub fn decode_encoded_word(word: &str) -> Result<DecodedWord> {
    let inner = word
        .strip_prefix("=?")
        .and_then(|rest| rest.strip_suffix("?="))
        .ok_or_else(|| Error::InvalidEncodedWord(word.to_string()))?;

    let parts: Vec<&str> = inner.split('?').collect();
    let [charset_spec, cte, payload] = parts.as_slice() else {
        return Err(Error::InvalidEncodedWord(word.to_string()));
    };

    let (charset, lang) = charset_spec
        .split_once('*')
        .unwrap_or((charset_spec, ""));

    let (bytes, mut defects) = match cte.to_ascii_lowercase().as_str() {
        "q" => (decode_q(payload), Vec::new()),
        "b" => decode_b(payload),
        _ => return Err(Error::InvalidEncodedWord(word.to_string())),
    };

    let text = decode_charset(&bytes, charset, &mut defects);
    Ok(DecodedWord {
        text,
        charset: charset.to_string(),
        lang: lang.to_string(),
        defects,
    })
}

/// Decodes `bytes` using the named charset.
///
/// `us-ascii` and unknown charsets decode as UTF-8 with replacement
/// characters; unknown ones also add a [`DefectKind::Charset`] defect unless
/// the charset is `unknown-8bit`. Malformed sequences add a
/// [`DefectKind::UndecodableBytes`] defect.
pub fn decode_charset(bytes: &[u8], charset: &str, defects: &mut Vec<Defect>) -> String {
    let label = charset.trim();
    let ascii = label.eq_ignore_ascii_case("us-ascii") || label.eq_ignore_ascii_case("ascii");

    let (text, had_errors) = match Encoding::for_label(label.as_bytes()).filter(|_| !ascii) {
        Some(encoding) => {
            let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
            (text.into_owned(), had_errors)
        }
        None => {
            if !ascii && !label.eq_ignore_ascii_case(UNKNOWN_8BIT) {
                defects.push(Defect::new(
                    DefectKind::Charset,
                    format!("Unknown charset '{charset}'; decoded as unknown bytes"),
                ));
            }
            let had_errors = std::str::from_utf8(bytes).is_err();
            (String::from_utf8_lossy(bytes).into_owned(), had_errors)
        }
    };

    if had_errors {
        defects.push(Defect::new(
            DefectKind::UndecodableBytes,
            format!("Bytes not decodable using '{charset}' charset"),
        ));
    }
    text
}

/// Decodes the Q encoding: `_` is a space, `=XX` is a hex byte.
fn decode_q(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => result.push(b' '),
            b'=' if i + 2 < bytes.len() && is_hex_pair(bytes[i + 1], bytes[i + 2]) => {
                result.push((hex_value(bytes[i + 1]) << 4) | hex_value(bytes[i + 2]));
                i += 2;
            }
            byte => result.push(byte),
        }
        i += 1;
    }

    result
}

const fn is_hex_pair(hi: u8, lo: u8) -> bool {
    hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
}

const fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Decodes the B encoding, recording padding and alphabet problems.
fn decode_b(payload: &str) -> (Vec<u8>, Vec<Defect>) {
    let mut defects = Vec::new();

    let cleaned: String = payload
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect();
    if cleaned.len() != payload.len() {
        defects.push(Defect::new(
            DefectKind::InvalidBase64Characters,
            "Base64 encoded word contains invalid characters",
        ));
    }

    let data = cleaned.trim_end_matches('=');
    if data.contains('=') || data.len() % 4 == 1 {
        defects.push(Defect::new(
            DefectKind::InvalidBase64Length,
            "Base64 encoded word has an invalid length",
        ));
        return (payload.as_bytes().to_vec(), defects);
    }
    if cleaned.len() % 4 != 0 {
        defects.push(Defect::new(
            DefectKind::InvalidBase64Padding,
            "Base64 encoded word has incorrect padding",
        ));
    }

    match LENIENT.decode(data) {
        Ok(bytes) => (bytes, defects),
        Err(_) => {
            defects.push(Defect::new(
                DefectKind::InvalidBase64Length,
                "Base64 encoded word could not be decoded",
            ));
            (payload.as_bytes().to_vec(), defects)
        }
    }
}

/// Characters the Q encoding may emit literally (RFC 2047 section 5 rule 3).
const fn is_q_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'!' | b'*' | b'+' | b'/')
}

fn q_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .map(|&b| if is_q_safe(b) || b == b' ' { 1 } else { 3 })
        .sum()
}

const fn b_len(bytes: &[u8]) -> usize {
    bytes.len().div_ceil(3) * 4
}

fn encode_q(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(q_len(bytes));
    for &byte in bytes {
        if is_q_safe(byte) {
            result.push(byte as char);
        } else if byte == b' ' {
            result.push('_');
        } else {
            let _ = write!(result, "={byte:02X}");
        }
    }
    result
}

/// Converts `text` to bytes in the named charset.
///
/// `utf-8`, `us-ascii` and `unknown-8bit` all use the UTF-8 representation.
fn charset_bytes(text: &str, charset: &str) -> Vec<u8> {
    match Encoding::for_label(charset.as_bytes()) {
        Some(encoding)
            if encoding != encoding_rs::UTF_8 && !charset.eq_ignore_ascii_case("us-ascii") =>
        {
            let (bytes, _, _) = encoding.encode(text);
            bytes.into_owned()
        }
        _ => text.as_bytes().to_vec(),
    }
}

/// Encodes `text` as a single RFC 2047 encoded word.
///
/// Picks the Q encoding unless Base64 is at least five characters shorter.
#[must_use]
pub fn encode_word(text: &str, charset: &str, lang: Option<&str>) -> String {
    let bytes = charset_bytes(text, charset);
    let lang = lang.filter(|l| !l.is_empty()).map(|l| format!("*{l}")).unwrap_or_default();

    if q_len(&bytes) < b_len(&bytes) + 5 {
        format!("=?{charset}{lang}?q?{}?=", encode_q(&bytes))
    } else {
        format!("=?{charset}{lang}?b?{}?=", STANDARD.encode(&bytes))
    }
}

/// Returns the length of the encoded word [`encode_word`] would produce.
#[must_use]
pub fn encoded_len(text: &str, charset: &str) -> usize {
    let bytes = charset_bytes(text, charset);
    let (q, b) = (q_len(&bytes), b_len(&bytes));
    chrome_len(charset) + if q < b + 5 { q } else { b }
}

/// Returns the fixed overhead of an encoded word in `charset`.
#[must_use]
pub const fn chrome_len(charset: &str) -> usize {
    charset.len() + 7
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_q() {
        let word = decode_encoded_word("=?utf-8?q?H=C3=A9llo_World?=").unwrap();
        assert_eq!(word.text, "Héllo World");
        assert_eq!(word.charset, "utf-8");
        assert!(word.defects.is_empty());
    }

    #[test]
    fn test_decode_b() {
        let word = decode_encoded_word("=?UTF-8?B?SMOpbGxv?=").unwrap();
        assert_eq!(word.text, "Héllo");
    }

    #[test]
    fn test_decode_lang() {
        let word = decode_encoded_word("=?us-ascii*en?q?hi?=").unwrap();
        assert_eq!(word.text, "hi");
        assert_eq!(word.lang, "en");
    }

    #[test]
    fn test_decode_latin1() {
        let word = decode_encoded_word("=?iso-8859-1?q?caf=E9?=").unwrap();
        assert_eq!(word.text, "café");
    }

    #[test]
    fn test_decode_missing_padding() {
        let word = decode_encoded_word("=?utf-8?b?SMOpbGxv?=").unwrap();
        assert!(word.defects.is_empty());

        let word = decode_encoded_word("=?utf-8?b?YQ?=").unwrap();
        assert_eq!(word.text, "a");
        assert_eq!(word.defects[0].kind, DefectKind::InvalidBase64Padding);
    }

    #[test]
    fn test_decode_bad_length() {
        let word = decode_encoded_word("=?utf-8?b?abcde?=").unwrap();
        assert_eq!(word.defects[0].kind, DefectKind::InvalidBase64Length);
    }

    #[test]
    fn test_decode_unknown_charset() {
        let word = decode_encoded_word("=?x-klingon?q?abc?=").unwrap();
        assert_eq!(word.text, "abc");
        assert_eq!(word.defects[0].kind, DefectKind::Charset);

        let word = decode_encoded_word("=?unknown-8bit?q?abc?=").unwrap();
        assert!(word.defects.is_empty());
    }

    #[test]
    fn test_decode_undecodable() {
        let word = decode_encoded_word("=?utf-8?q?a=FFb?=").unwrap();
        assert_eq!(word.text, "a\u{FFFD}b");
        assert_eq!(word.defects[0].kind, DefectKind::UndecodableBytes);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode_encoded_word("=?utf-8?q?abc").is_err());
        assert!(decode_encoded_word("=?utf-8?x?abc?=").is_err());
        assert!(decode_encoded_word("=?utf-8?q?a?b?=").is_err());
    }

    #[test]
    fn test_encode_prefers_q_for_mostly_ascii() {
        assert_eq!(encode_word("Héllo", "utf-8", None), "=?utf-8?q?H=C3=A9llo?=");
    }

    #[test]
    fn test_encode_prefers_b_for_non_ascii() {
        let encoded = encode_word("日本語のテキスト", "utf-8", None);
        assert!(encoded.starts_with("=?utf-8?b?"));
        assert_eq!(decode_encoded_word(&encoded).unwrap().text, "日本語のテキスト");
    }

    #[test]
    fn test_encoded_len_matches() {
        for text in ["Héllo wörld", "日本語", "plain"] {
            assert_eq!(encoded_len(text, "utf-8"), encode_word(text, "utf-8", None).len());
        }
    }
}
