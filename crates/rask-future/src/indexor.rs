// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `Indexor<T>`: a deferred projection of a key path out of a task's result
//! (spec.md §4.4).

use crate::FutureId;
use rask_errors::{Error, Result};
use serde_json::Value;

/// The variant-specific state of an `Indexor`. `parent` is always the root
/// `Task` — composing `indexor[key]` extends `keys` but keeps pointing at
/// the same root, never chains through intermediate indexors.
#[derive(Debug, Clone)]
pub struct IndexorRecord {
    pub parent: FutureId,
    pub keys: Vec<String>,
    pub hashid: String,
}

/// `"@" + parent_hashid + "/" + keys.join("/")`. Equal to its own `spec` —
/// an indexor never serialises its parent's spec, to avoid cycles.
pub fn indexor_hashid(parent_hashid: &str, keys: &[String]) -> String {
    let mut parts = Vec::with_capacity(1 + keys.len());
    parts.push(format!("@{parent_hashid}"));
    parts.extend(keys.iter().cloned());
    parts.join("/")
}

impl IndexorRecord {
    pub fn new(parent: FutureId, parent_hashid: &str, keys: Vec<String>) -> Self {
        let hashid = indexor_hashid(parent_hashid, &keys);
        IndexorRecord { parent, keys, hashid }
    }
}

/// Walk `value` by `keys`, indexing into arrays (by parsed numeric key) or
/// objects (by string key) at each step.
pub fn walk_keys(value: Value, keys: &[String]) -> Result<Value> {
    let mut current = value;
    for key in keys {
        current = match current {
            Value::Array(items) => {
                let idx: usize = key
                    .parse()
                    .map_err(|_| Error::CompositeError(format!("expected array index, got {key:?}")))?;
                items
                    .into_iter()
                    .nth(idx)
                    .ok_or_else(|| Error::CompositeError(format!("index {idx} out of bounds")))?
            }
            Value::Object(mut map) => map
                .remove(key)
                .ok_or_else(|| Error::CompositeError(format!("missing key {key:?}")))?,
            other => {
                return Err(Error::CompositeError(format!(
                    "cannot index into {other:?} with key {key:?}"
                )))
            }
        };
    }
    Ok(current)
}
