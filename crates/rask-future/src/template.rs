// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `Template<T>`: a future whose result is a composite obtained by
//! substituting embedded futures into a fixed JSON skeleton (spec.md §4.5).

use crate::FutureId;
use rask_errors::Result;
use rask_hash::hash_text;
use serde_json::Value;

/// The variant-specific state of a `Template`.
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    /// The canonical JSON string encoded from the source object, with every
    /// embedded future replaced by its tagged handle.
    pub jsonstr: String,
    /// The futures embedded in `jsonstr`, deduplicated, in first-seen order.
    /// Doubles as this template's `pending` parents.
    pub futures: Vec<FutureId>,
    pub hashid: String,
}

/// `"{}"` + `hash_text(jsonstr)`.
pub fn template_hashid(jsonstr: &str) -> String {
    format!("{{}}{}", hash_text(jsonstr))
}

impl TemplateRecord {
    pub fn new(jsonstr: String, futures: Vec<FutureId>) -> Self {
        let hashid = template_hashid(&jsonstr);
        TemplateRecord { jsonstr, futures, hashid }
    }

    pub fn has_futures(&self) -> bool {
        !self.futures.is_empty()
    }
}

/// Decode `jsonstr`, replacing each tagged future handle with whatever
/// `resolve(tag, hashid)` returns for it. `resolve` is supplied by
/// `Session`, since resolving a hashid to a result requires arena access
/// this crate does not have.
pub fn substitute(
    jsonstr: &str,
    resolve: &mut dyn FnMut(&str, &str) -> Result<Value>,
) -> Result<Value> {
    rask_codec::decode_tagged(jsonstr, resolve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashid_has_brace_prefix() {
        let h = template_hashid(r#"{"a":1}"#);
        assert!(h.starts_with("{}"));
    }

    #[test]
    fn substitute_roundtrips_plain_value() {
        let out = substitute("[1,2,3]", &mut |_, _| unreachable!()).unwrap();
        assert_eq!(out, serde_json::json!([1, 2, 3]));
    }
}
