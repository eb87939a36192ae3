//! Pure per-message decision logic for the message conductor, kept
//! free of `rdkafka` types so it is testable without a broker.

use federator_filter::AttributeFilter;
use federator_proto::{EventFrame, Header};
use federator_types::AttributesDTO;

/// Header carrying the event's security label.
pub const SECURITY_LABEL_HEADER: &str = "Security-Label";

#[derive(Debug, thiserror::Error)]
#[error("header `{name}` is not valid UTF-8")]
pub struct HeaderDecodeError {
    pub name: String,
}

/// One already-decoded Kafka record header.
pub struct RawHeader {
    pub name: String,
    pub value: Option<Vec<u8>>,
}

/// Outcome of processing one polled Kafka record: a frame to send, an
/// explicit filter drop (offset still advances), or a transform
/// failure (offset must not advance).
pub enum Decision {
    Send(EventFrame),
    FilteredOut,
}

/// Decodes headers, applies the attribute filter and builds the
/// outbound `EventFrame`.
///
/// A header allow-listed for forwarding or consulted for the security
/// label that is not valid UTF-8 is a transformer error: the caller
/// must log it, skip the message, and must not advance the offset past
/// it.
pub fn process_message(
    topic: &str,
    offset: i64,
    key: Option<Vec<u8>>,
    value: Option<Vec<u8>>,
    raw_headers: Vec<RawHeader>,
    filter: &dyn AttributeFilter,
    attributes: &[AttributesDTO],
    shared_header_allowlist: &[String],
) -> Result<Decision, HeaderDecodeError> {
    let mut security_label: Option<String> = None;
    let mut shared_headers = Vec::new();

    for raw in raw_headers {
        let is_security_label = raw.name.eq_ignore_ascii_case(SECURITY_LABEL_HEADER);
        let is_shared = shared_header_allowlist
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&raw.name));
        if !is_security_label && !is_shared {
            continue;
        }
        let value = match &raw.value {
            None => String::new(),
            Some(bytes) => String::from_utf8(bytes.clone())
                .map_err(|_| HeaderDecodeError { name: raw.name.clone() })?,
        };
        if is_security_label {
            security_label = Some(value.clone());
        }
        if is_shared {
            shared_headers.push(Header {
                name: raw.name,
                value,
            });
        }
    }

    if !filter.allows(security_label.as_deref(), attributes) {
        return Ok(Decision::FilteredOut);
    }

    Ok(Decision::Send(EventFrame {
        topic: topic.to_string(),
        offset,
        key: key.unwrap_or_default(),
        value: value.unwrap_or_default(),
        shared_headers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use federator_filter::HeaderAttributeFilter;

    fn header(name: &str, value: &str) -> RawHeader {
        RawHeader {
            name: name.to_string(),
            value: Some(value.as_bytes().to_vec()),
        }
    }

    #[test]
    fn event_with_empty_attribute_list_passes_through() {
        let filter = HeaderAttributeFilter;
        let decision = process_message(
            "T",
            42,
            Some(b"k".to_vec()),
            Some(vec![0x01, 0x02]),
            vec![header("Security-Label", "nationality=UK")],
            &filter,
            &[],
            &["Security-Label".to_string()],
        )
        .unwrap();
        match decision {
            Decision::Send(frame) => {
                assert_eq!(frame.topic, "T");
                assert_eq!(frame.offset, 42);
                assert_eq!(frame.shared_headers.len(), 1);
            }
            Decision::FilteredOut => panic!("expected the event to pass through"),
        }
    }

    #[test]
    fn mismatched_attribute_is_filtered_out_not_an_error() {
        let filter = HeaderAttributeFilter;
        let attrs = vec![AttributesDTO {
            name: "nationality".into(),
            value: "FR".into(),
        }];
        let decision = process_message(
            "T",
            1,
            None,
            None,
            vec![header("Security-Label", "nationality=UK")],
            &filter,
            &attrs,
            &[],
        )
        .unwrap();
        assert!(matches!(decision, Decision::FilteredOut));
    }

    #[test]
    fn non_utf8_allow_listed_header_is_a_decode_error() {
        let filter = HeaderAttributeFilter;
        let raw = RawHeader {
            name: "X-Trace".into(),
            value: Some(vec![0xff, 0xfe]),
        };
        let err = process_message("T", 1, None, None, vec![raw], &filter, &[], &["X-Trace".to_string()])
            .unwrap_err();
        assert_eq!(err.name, "X-Trace");
    }

    #[test]
    fn header_not_in_allowlist_is_dropped_from_shared_headers() {
        let filter = HeaderAttributeFilter;
        let decision = process_message(
            "T",
            1,
            None,
            None,
            vec![header("Irrelevant", "x")],
            &filter,
            &[],
            &["Security-Label".to_string()],
        )
        .unwrap();
        match decision {
            Decision::Send(frame) => assert!(frame.shared_headers.is_empty()),
            Decision::FilteredOut => panic!("no attributes configured, should pass through"),
        }
    }
}
