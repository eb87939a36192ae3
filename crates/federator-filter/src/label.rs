//! Security-label header grammar: segments separated by `,`, each
//! `key[=|:]value`, whitespace trimmed, keys and values normalised to
//! upper case, empty segments ignored, segments with neither `=` nor
//! `:` raise [`LabelError`].

use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("security label segment `{0}` has neither `=` nor `:`")]
    MalformedSegment(String),
}

/// Parses a `Security-Label` header value into a case-insensitive
/// (upper-cased) `key -> value` map.
pub fn parse_security_label(header: &str) -> Result<HashMap<String, String>, LabelError> {
    let mut map = HashMap::new();
    for raw_segment in header.split(',') {
        let segment = raw_segment.trim();
        if segment.is_empty() {
            continue;
        }
        let split_at = segment
            .find(['=', ':'])
            .ok_or_else(|| LabelError::MalformedSegment(segment.to_string()))?;
        let (key, value) = segment.split_at(split_at);
        let value = &value[1..];
        map.insert(key.trim().to_uppercase(), value.trim().to_uppercase());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_segments() {
        let map = parse_security_label("nationality=UK, clearance:TOP SECRET").unwrap();
        assert_eq!(map.get("NATIONALITY").unwrap(), "UK");
        assert_eq!(map.get("CLEARANCE").unwrap(), "TOP SECRET");
    }

    #[test]
    fn is_case_insensitive_on_keys_and_values() {
        let map = parse_security_label("Nationality=uk").unwrap();
        assert_eq!(map.get("NATIONALITY").unwrap(), "UK");
    }

    #[test]
    fn ignores_empty_segments() {
        let map = parse_security_label(",nationality=UK,,").unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn malformed_segment_is_an_error() {
        let err = parse_security_label("nationality=UK,garbage").unwrap_err();
        assert!(matches!(err, LabelError::MalformedSegment(s) if s == "garbage"));
    }

    #[test]
    fn trims_whitespace_around_key_and_value() {
        let map = parse_security_label(" nationality = UK ").unwrap();
        assert_eq!(map.get("NATIONALITY").unwrap(), "UK");
    }
}
