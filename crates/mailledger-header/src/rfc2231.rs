//! RFC 2231 parameter reassembly.
//!
//! A long or non-ASCII parameter may be split into numbered sections
//! (`name*0`, `name*1`, ...), each optionally percent-encoded. The parser
//! keeps the sections as separate nodes; [`reassemble`] merges them into
//! one decoded value per parameter name.

use percent_encoding::percent_decode_str;

use crate::defect::Defect;
use crate::encoding::decode_charset;
use crate::token::{Token, TokenList};

/// Decoded parameters of a MIME header, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    params: Vec<(String, String)>,
    defects: Vec<Defect>,
}

impl ParameterMap {
    /// Looks up a parameter by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over `(name, value)` pairs. Names are lowercase.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Problems found while merging sections.
    #[must_use]
    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    pub(crate) fn into_defects(self) -> Vec<Defect> {
        self.defects
    }
}

/// Merges the parameters of a `mime-parameters` node.
///
/// Sections are ordered by number. Duplicate plain parameters keep the
/// first occurrence. If any section of a parameter is extended, the
/// concatenated bytes are decoded with the charset of the first section,
/// US-ASCII when none was given.
pub(crate) fn reassemble(list: &TokenList) -> ParameterMap {
    let mut groups: Vec<(String, Vec<&TokenList>)> = Vec::new();
    for param in list
        .children
        .iter()
        .filter_map(Token::as_list)
        .filter(|l| l.parameter_info().is_some())
    {
        let Some(name) = param.param_name() else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        match groups.iter_mut().find(|(key, _)| *key == name) {
            Some((_, sections)) => sections.push(param),
            None => groups.push((name, vec![param])),
        }
    }

    let mut map = ParameterMap::default();
    for (name, mut sections) in groups {
        sections.sort_by_key(|param| param.section_number());
        let Some(first) = sections.first().and_then(|p| p.parameter_info()).cloned() else {
            continue;
        };
        let charset = first.charset;
        if !first.extended && sections.get(1).is_some_and(|p| p.section_number() == 0) {
            map.defects.push(Defect::invalid(format!(
                "duplicate parameter name '{name}'; duplicate(s) ignored"
            )));
            sections.truncate(1);
        }

        let mut bytes = Vec::new();
        let mut extended = false;
        let mut expected = 0;
        for param in sections {
            let Some(info) = param.parameter_info() else {
                continue;
            };
            if info.section_number != expected {
                if !info.extended {
                    map.defects.push(Defect::invalid(format!(
                        "duplicate parameter name '{name}'; duplicate ignored"
                    )));
                    continue;
                }
                map.defects.push(Defect::invalid(format!(
                    "inconsistent RFC 2231 parameter numbering for '{name}'"
                )));
            }
            expected += 1;

            let value = param.param_value();
            if info.extended {
                extended = true;
                bytes.extend(percent_decode_str(&value));
            } else {
                bytes.extend_from_slice(value.as_bytes());
            }
        }

        let value = if extended {
            let charset = charset.as_deref().unwrap_or("us-ascii");
            decode_charset(&bytes, charset, &mut map.defects)
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };
        tracing::trace!(%name, %value, "reassembled parameter");
        map.params.push((name, value));
    }
    map
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::defect::DefectKind;
    use crate::parser::mime::mime_parameters;

    fn params(value: &str) -> ParameterMap {
        reassemble(&mime_parameters(value))
    }

    #[test]
    fn test_plain_parameters() {
        let map = params(" charset=\"utf-8\"; Format=flowed");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("charset"), Some("utf-8"));
        assert_eq!(map.get("FORMAT"), Some("flowed"));
        let names: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["charset", "format"]);
    }

    #[test]
    fn test_sections_are_joined() {
        let map = params("title*0=\"foo\"; title*1=\"bar\"");
        assert_eq!(map.get("title"), Some("foobar"));
        assert!(map.defects().is_empty());
    }

    #[test]
    fn test_sections_out_of_order() {
        let map = params("title*1=\"bar\"; title*0=\"foo\"");
        assert_eq!(map.get("title"), Some("foobar"));
    }

    #[test]
    fn test_extended_value_decoded() {
        let map = params("title*0*=us-ascii'en'foo%20bar");
        assert_eq!(map.get("title"), Some("foo bar"));
    }

    #[test]
    fn test_mixed_sections() {
        let map = params("name*0*=utf-8''caf%C3%A9; name*1=\" au lait\"");
        assert_eq!(map.get("name"), Some("café au lait"));
    }

    #[test]
    fn test_latin1_charset() {
        let map = params("name*=iso-8859-1''caf%E9");
        assert_eq!(map.get("name"), Some("café"));
    }

    #[test]
    fn test_duplicate_parameter() {
        let map = params("a=1; a=2");
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.defects().len(), 1);
    }

    #[test]
    fn test_gap_in_numbering() {
        let map = params("t*0*=utf-8''a; t*2*=b");
        assert_eq!(map.get("t"), Some("ab"));
        assert!(map.defects()[0].message.contains("inconsistent"));
    }

    #[test]
    fn test_unknown_charset() {
        let map = params("t*=x-nonsense''abc");
        assert_eq!(map.get("t"), Some("abc"));
        assert!(map.defects().iter().any(|d| d.kind == DefectKind::Charset));
    }
}
