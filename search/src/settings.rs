use serde_json::Value;
use serde_json::json;

/// The one logical index this crate manages.
pub const INDEX_NAME: &str = "failure-lines";

/// The single document type stored in [`INDEX_NAME`].
pub const DOC_TYPE: &str = "failure-line";

/// Tokenizer pattern for log messages: hex-address runs and any
/// non-alphanumeric or digit run are token boundaries, leaving alphabetic
/// word tokens that are stable across per-run pointer values and numeric
/// noise in stack traces. Treat this pattern as bit-exact; a standard
/// word-break tokenizer silently degrades match quality.
pub const MESSAGE_TOKENIZER_PATTERN: &str = r"0x[0-9a-fA-F]+|[\W0-9]+?";

/// Index settings and mapping for the failure-line index. `message` is the
/// only analyzed field (at both index and search time); every other scalar
/// field is indexed as an exact token. Reinitializing with these settings is
/// idempotent.
pub fn index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "analysis": {
                "tokenizer": {
                    "message_tokenizer": {
                        "type": "pattern",
                        "pattern": MESSAGE_TOKENIZER_PATTERN,
                    },
                },
                "analyzer": {
                    "message_analyzer": {
                        "type": "custom",
                        "tokenizer": "message_tokenizer",
                        "filter": [],
                    },
                },
            },
        },
        "mappings": {
            "failure-line": {
                "properties": {
                    "job_guid": {"type": "keyword"},
                    "test": {"type": "keyword"},
                    "subtest": {"type": "keyword"},
                    "status": {"type": "keyword"},
                    "expected": {"type": "keyword"},
                    "message": {
                        "type": "text",
                        "analyzer": "message_analyzer",
                        "search_analyzer": "message_analyzer",
                    },
                    "best_classification": {"type": "integer"},
                    "best_is_verified": {"type": "boolean"},
                },
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_are_stable_across_calls() {
        // reinit idempotence hinges on the settings being deterministic.
        assert_eq!(index_settings(), index_settings());
    }

    #[test]
    fn message_is_the_only_analyzed_field() {
        let settings = index_settings();
        let properties = settings["mappings"][DOC_TYPE]["properties"]
            .as_object()
            .map(Clone::clone)
            .unwrap_or_default();
        for (field, mapping) in &properties {
            if field == "message" {
                assert_eq!(mapping["analyzer"], "message_analyzer");
            } else {
                assert!(mapping.get("analyzer").is_none(), "{field} must be exact");
            }
        }
    }
}
