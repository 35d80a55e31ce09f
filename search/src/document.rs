use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// Number of characters of a failure message used when querying. Storage
/// keeps the full message; only queries are truncated.
pub const QUERY_MESSAGE_CHARS: usize = 1024;

/// A subtest field that distinguishes "the row carried no subtest at all"
/// from "the row carried an explicit null subtest". A plain
/// `Option<String>` cannot represent both, and both shapes must round-trip
/// through the index unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Subtest {
    /// The source row had no subtest field. Serialized as no key at all.
    #[default]
    Absent,
    /// The field was present, possibly as an explicit null.
    Present(Option<String>),
}

impl Subtest {
    pub fn is_absent(&self) -> bool {
        matches!(self, Subtest::Absent)
    }

    /// The subtest name, when one is actually set.
    pub fn as_option(&self) -> Option<&str> {
        match self {
            Subtest::Present(Some(name)) => Some(name),
            _ => None,
        }
    }
}

impl Serialize for Subtest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // `Absent` is skipped by the containing struct; if a caller
            // serializes it directly anyway, null is the closest rendering.
            Subtest::Absent => serializer.serialize_none(),
            Subtest::Present(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Subtest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the key is present; a missing key takes the
        // `Absent` default on the containing struct.
        Option::<String>::deserialize(deserializer).map(Subtest::Present)
    }
}

/// The document shape stored in the `failure-lines` index. Projected from a
/// persisted failure line; never mutated in place, re-indexing replaces the
/// document by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: i64,
    pub job_guid: String,
    pub test: String,
    #[serde(default, skip_serializing_if = "Subtest::is_absent")]
    pub subtest: Subtest,
    pub status: String,
    pub expected: String,
    pub message: String,
    pub best_classification: Option<i64>,
    pub best_is_verified: bool,
}

/// First [`QUERY_MESSAGE_CHARS`] characters of a message, respecting char
/// boundaries.
pub fn query_excerpt(message: &str) -> &str {
    match message.char_indices().nth(QUERY_MESSAGE_CHARS) {
        Some((index, _)) => &message[..index],
        None => message,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn document(subtest: Subtest) -> SearchDocument {
        SearchDocument {
            id: 1,
            job_guid: "guid-1".to_string(),
            test: "layout/test_frobnicate.html".to_string(),
            subtest,
            status: "FAIL".to_string(),
            expected: "PASS".to_string(),
            message: "assertion failed".to_string(),
            best_classification: None,
            best_is_verified: false,
        }
    }

    #[test]
    fn absent_subtest_serializes_without_key() {
        let value = serde_json::to_value(document(Subtest::Absent)).unwrap();
        assert!(value.as_object().unwrap().get("subtest").is_none());
    }

    #[test]
    fn null_subtest_serializes_as_explicit_null() {
        let value = serde_json::to_value(document(Subtest::Present(None))).unwrap();
        assert_eq!(value["subtest"], serde_json::Value::Null);
    }

    #[test]
    fn subtest_round_trips_all_three_shapes() {
        for subtest in [
            Subtest::Absent,
            Subtest::Present(None),
            Subtest::Present(Some("step 3".to_string())),
        ] {
            let original = document(subtest);
            let encoded = serde_json::to_value(&original).unwrap();
            let decoded: SearchDocument = serde_json::from_value(encoded).unwrap();
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn missing_key_deserializes_as_absent() {
        let decoded: SearchDocument = serde_json::from_value(json!({
            "id": 2,
            "job_guid": "guid-2",
            "test": "t",
            "status": "FAIL",
            "expected": "PASS",
            "message": "m",
            "best_classification": null,
            "best_is_verified": true,
        }))
        .unwrap();
        assert_eq!(decoded.subtest, Subtest::Absent);
    }

    #[test]
    fn query_excerpt_truncates_long_messages() {
        let message = "x".repeat(QUERY_MESSAGE_CHARS + 100);
        assert_eq!(query_excerpt(&message).len(), QUERY_MESSAGE_CHARS);

        let short = "assertion failed";
        assert_eq!(query_excerpt(short), short);
    }

    #[test]
    fn query_excerpt_respects_char_boundaries() {
        let message = "\u{00e9}".repeat(QUERY_MESSAGE_CHARS + 5);
        let excerpt = query_excerpt(&message);
        assert_eq!(excerpt.chars().count(), QUERY_MESSAGE_CHARS);
    }
}
