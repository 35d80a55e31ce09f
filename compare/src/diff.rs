use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// One difference between the local and staging sides of a JSON-shaped
/// tree. The `path` is the dotted concatenation of object keys plus `[i]`
/// for array indices; the root has an empty path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Difference {
    MissingInLocal {
        path: String,
        staging_value: Value,
    },
    MissingInStaging {
        path: String,
        local_value: Value,
    },
    ValueDifference {
        path: String,
        local_value: Value,
        staging_value: Value,
    },
    ListLengthDifference {
        path: String,
        local_length: usize,
        staging_length: usize,
    },
}

impl Difference {
    pub fn path(&self) -> &str {
        match self {
            Difference::MissingInLocal { path, .. }
            | Difference::MissingInStaging { path, .. }
            | Difference::ValueDifference { path, .. }
            | Difference::ListLengthDifference { path, .. } => path,
        }
    }
}

/// Deterministic deep diff over two JSON-shaped values. Object keys are
/// visited in sorted order and array indices ascending, so the emitted
/// list is reproducible across runs. Returns an empty list iff the values
/// are equal.
pub fn diff(local: &Value, staging: &Value) -> Vec<Difference> {
    let mut differences = Vec::new();
    diff_at(local, staging, "", &mut differences);
    differences
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn diff_at(local: &Value, staging: &Value, path: &str, out: &mut Vec<Difference>) {
    match (local, staging) {
        (Value::Object(local_map), Value::Object(staging_map)) => {
            let local_keys: BTreeSet<&String> = local_map.keys().collect();
            let staging_keys: BTreeSet<&String> = staging_map.keys().collect();
            for key in staging_keys.difference(&local_keys) {
                out.push(Difference::MissingInLocal {
                    path: join_path(path, key),
                    staging_value: staging_map[*key].clone(),
                });
            }
            for key in local_keys.difference(&staging_keys) {
                out.push(Difference::MissingInStaging {
                    path: join_path(path, key),
                    local_value: local_map[*key].clone(),
                });
            }
            for key in local_keys.intersection(&staging_keys) {
                diff_at(
                    &local_map[*key],
                    &staging_map[*key],
                    &join_path(path, key),
                    out,
                );
            }
        }
        (Value::Array(local_items), Value::Array(staging_items)) => {
            if local_items.len() != staging_items.len() {
                out.push(Difference::ListLengthDifference {
                    path: path.to_string(),
                    local_length: local_items.len(),
                    staging_length: staging_items.len(),
                });
            }
            // Pairwise up to the shorter length.
            for (index, (local_item, staging_item)) in
                local_items.iter().zip(staging_items).enumerate()
            {
                diff_at(local_item, staging_item, &format!("{path}[{index}]"), out);
            }
        }
        _ => {
            if local != staging {
                out.push(Difference::ValueDifference {
                    path: path.to_string(),
                    local_value: local.clone(),
                    staging_value: staging.clone(),
                });
            }
        }
    }
}
