//! The attribute filter: matches a consumer's declared entitlement
//! attributes against an event's security-label header.
//!
//! Filter selection is a fixed registry of known filter variants keyed
//! by a configuration string rather than reflective class-by-name
//! loading. [`FilterRegistry`] is that registry; today it has a single
//! variant, [`HeaderAttributeFilter`], a single header-attribute-filter
//! design.

use std::sync::Arc;

use federator_types::AttributesDTO;

use crate::label::parse_security_label;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("no filter registered for key `{0}`")]
    UnknownFilter(String),
}

/// A consumer entitlement filter: decides whether a single event may
/// be forwarded to a consumer, given the consumer's declared
/// attributes and the event's raw security-label header value (if
/// any).
pub trait AttributeFilter: Send + Sync {
    fn allows(&self, security_label_header: Option<&str>, attributes: &[AttributesDTO]) -> bool;
}

/// AND-semantics across attributes:
/// 1. empty/null attribute list allows;
/// 2. malformed security label is a skip (deny), not an allow;
/// 3. missing attribute name/value in the filter definition denies;
/// 4. any single mismatch denies the whole event.
pub struct HeaderAttributeFilter;

impl AttributeFilter for HeaderAttributeFilter {
    fn allows(&self, security_label_header: Option<&str>, attributes: &[AttributesDTO]) -> bool {
        if attributes.is_empty() {
            return true;
        }
        let Some(header) = security_label_header else {
            return false;
        };
        let Ok(label) = parse_security_label(header) else {
            tracing::debug!("security label parse failure, denying event");
            return false;
        };
        attributes.iter().all(|attribute| {
            let name = attribute.name.trim();
            let value = attribute.value.trim();
            if name.is_empty() || value.is_empty() {
                return false;
            }
            label
                .get(&name.to_uppercase())
                .map(|actual| actual.eq_ignore_ascii_case(&value.to_uppercase()))
                .unwrap_or(false)
        })
    }
}

/// Fixed enum of known filter variants, keyed by a configuration
/// string, rather than reflective class-by-name loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRegistry {
    HeaderAttribute,
}

impl FilterRegistry {
    pub fn from_config_key(key: &str) -> Result<Self, FilterError> {
        match key {
            "header-attribute" => Ok(FilterRegistry::HeaderAttribute),
            other => Err(FilterError::UnknownFilter(other.to_string())),
        }
    }

    pub fn build(self) -> Arc<dyn AttributeFilter> {
        match self {
            FilterRegistry::HeaderAttribute => Arc::new(HeaderAttributeFilter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str, value: &str) -> AttributesDTO {
        AttributesDTO {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn empty_attribute_list_always_allows() {
        let filter = HeaderAttributeFilter;
        assert!(filter.allows(None, &[]));
        assert!(filter.allows(Some("garbage"), &[]));
    }

    #[test]
    fn missing_header_denies_when_attributes_present() {
        let filter = HeaderAttributeFilter;
        assert!(!filter.allows(None, &[attr("nationality", "UK")]));
    }

    #[test]
    fn single_event_with_no_configured_attributes_passes_through() {
        let filter = HeaderAttributeFilter;
        assert!(filter.allows(Some("nationality=UK"), &[]));
    }

    #[test]
    fn attribute_mismatch_is_denied() {
        let filter = HeaderAttributeFilter;
        assert!(!filter.allows(Some("nationality=UK"), &[attr("nationality", "FR")]));
    }

    #[test]
    fn matches_case_insensitively() {
        let filter = HeaderAttributeFilter;
        assert!(filter.allows(Some("Nationality=uk"), &[attr("NATIONALITY", "UK")]));
    }

    #[test]
    fn malformed_label_denies() {
        let filter = HeaderAttributeFilter;
        assert!(!filter.allows(Some("garbage"), &[attr("nationality", "UK")]));
    }

    #[test]
    fn blank_attribute_definition_denies() {
        let filter = HeaderAttributeFilter;
        assert!(!filter.allows(Some("nationality=UK"), &[attr("", "UK")]));
    }

    #[test]
    fn all_attributes_must_match() {
        let filter = HeaderAttributeFilter;
        let attrs = vec![attr("nationality", "UK"), attr("clearance", "SECRET")];
        assert!(!filter.allows(Some("nationality=UK"), &attrs));
        assert!(filter.allows(Some("nationality=UK,clearance=SECRET"), &attrs));
    }

    #[test]
    fn registry_resolves_known_key() {
        let registry = FilterRegistry::from_config_key("header-attribute").unwrap();
        assert_eq!(registry, FilterRegistry::HeaderAttribute);
        let _filter = registry.build();
    }

    #[test]
    fn registry_rejects_unknown_key() {
        assert!(FilterRegistry::from_config_key("some-reflective-class").is_err());
    }
}
