// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Composite walker / canonical JSON codec (comp.codec).
//!
//! Two symmetric operations over JSON-like values: `canonical_json` turns a
//! `serde_json::Value` into a canonical string (sorted keys, no
//! insignificant whitespace — free by construction, since `serde_json`'s
//! `Map` is a `BTreeMap` unless the `preserve_order` feature is enabled, and
//! this workspace never enables it), and `decode_tagged` walks a parsed
//! value back, replacing every object tagged as a known future variant with
//! whatever a caller-supplied resolver returns for it.
//!
//! The actual "which values are futures, and what's their tape" bookkeeping
//! lives one layer up in `rask-future`, which owns the concrete `Task`/
//! `Indexor` types this crate only ever sees as `{"<tag>": {"hashid": h}}`.

use rask_errors::{Error, Result};
use serde_json::{Map, Value};

/// The object key used to tag an embedded `Task` handle.
pub const TASK_TAG: &str = "Task";
/// The object key used to tag an embedded `Indexor` handle.
pub const INDEXOR_TAG: &str = "Indexor";

/// Serialise `value` to its canonical JSON string: sorted object keys, no
/// trailing or insignificant whitespace.
pub fn canonical_json(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::CompositeError(e.to_string()))
}

/// Parse a canonical (or any valid) JSON string into a `Value`.
pub fn parse(json_str: &str) -> Result<Value> {
    serde_json::from_str(json_str).map_err(|e| Error::CompositeError(e.to_string()))
}

/// Build the tagged payload `{"<tag>": {"hashid": hashid}}` used to embed a
/// future handle inside a composite value.
pub fn tag_payload(tag: &str, hashid: &str) -> Value {
    let mut inner = Map::new();
    inner.insert("hashid".to_string(), Value::String(hashid.to_string()));
    let mut outer = Map::new();
    outer.insert(tag.to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// If `value` is a tagged future handle (`{"Task": {"hashid": h}}` or
/// `{"Indexor": {"hashid": h}}`), return its tag and hashid.
pub fn as_tagged(value: &Value) -> Option<(&str, &str)> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    let (tag, payload) = obj.iter().next()?;
    if tag != TASK_TAG && tag != INDEXOR_TAG {
        return None;
    }
    let hashid = payload.as_object()?.get("hashid")?.as_str()?;
    Some((tag.as_str(), hashid))
}

/// Parse `json_str` and replace every tagged future handle with whatever
/// `resolve(tag, hashid)` returns for it, recursing into untagged
/// containers. Fails with [`Error::CompositeError`] on malformed JSON or if
/// `resolve` fails.
pub fn decode_tagged(
    json_str: &str,
    resolve: &mut dyn FnMut(&str, &str) -> Result<Value>,
) -> Result<Value> {
    let value = parse(json_str)?;
    substitute(value, resolve)
}

fn substitute(value: Value, resolve: &mut dyn FnMut(&str, &str) -> Result<Value>) -> Result<Value> {
    if let Some((tag, hashid)) = as_tagged(&value) {
        return resolve(tag, hashid);
    }
    match value {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(substitute(item, resolve)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k, substitute(v, resolve)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}

/// Walk `value`, collecting the `(tag, hashid)` of every tagged future
/// handle it contains, in depth-first encounter order. Used by `Template`
/// construction to build its tape.
pub fn collect_tagged(value: &Value, out: &mut Vec<(String, String)>) {
    if let Some((tag, hashid)) = as_tagged(value) {
        out.push((tag.to_string(), hashid.to_string()));
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                collect_tagged(item, out);
            }
        }
        Value::Object(map) => {
            for v in map.values() {
                collect_tagged(v, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys() {
        let v = json!({"b": 1, "a": 2});
        assert_eq!(canonical_json(&v).unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn tag_roundtrip() {
        let tagged = tag_payload(TASK_TAG, "deadbeef");
        assert_eq!(as_tagged(&tagged), Some((TASK_TAG, "deadbeef")));
    }

    #[test]
    fn untagged_object_is_not_tagged() {
        let v = json!({"Task": {"hashid": "x"}, "extra": 1});
        assert_eq!(as_tagged(&v), None);
    }

    #[test]
    fn decode_tagged_replaces_nested_handles() {
        let json_str = r#"{"x":{"Task":{"hashid":"h1"}},"ys":[{"Indexor":{"hashid":"h2"}}]}"#;
        let out = decode_tagged(json_str, &mut |tag, hashid| {
            Ok(Value::String(format!("{tag}:{hashid}")))
        })
        .unwrap();
        assert_eq!(out, json!({"x": "Task:h1", "ys": ["Indexor:h2"]}));
    }

    #[test]
    fn collect_tagged_finds_all_handles_in_order() {
        let v = json!({"a": {"Task": {"hashid": "h1"}}, "b": [{"Indexor": {"hashid": "h2"}}]});
        let mut out = Vec::new();
        collect_tagged(&v, &mut out);
        assert_eq!(
            out,
            vec![
                ("Task".to_string(), "h1".to_string()),
                ("Indexor".to_string(), "h2".to_string()),
            ]
        );
    }
}
