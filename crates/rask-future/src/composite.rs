// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The user-facing "arbitrary JSON-serialisable value with embedded
//! futures" shape (spec.md §4.1). Rust has no runtime duck typing, so unlike
//! the Python original (which walks `obj.__dict__`/registered classes at
//! encode time), callers build a `Composite` tree explicitly, embedding
//! `FutureId` placeholders wherever a `Task`/`Indexor` belongs.

use crate::FutureId;
use rask_errors::Result;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// A JSON-like value that may embed future handles.
#[derive(Debug, Clone, PartialEq)]
pub enum Composite {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Composite>),
    Map(BTreeMap<String, Composite>),
    /// A hole to be filled by the named future's result once it is done.
    Future(FutureId),
}

impl From<bool> for Composite {
    fn from(v: bool) -> Self {
        Composite::Bool(v)
    }
}

impl From<i64> for Composite {
    fn from(v: i64) -> Self {
        Composite::Number(v.into())
    }
}

impl From<f64> for Composite {
    fn from(v: f64) -> Self {
        Number::from_f64(v).map(Composite::Number).unwrap_or(Composite::Null)
    }
}

impl From<String> for Composite {
    fn from(v: String) -> Self {
        Composite::String(v)
    }
}

impl From<&str> for Composite {
    fn from(v: &str) -> Self {
        Composite::String(v.to_string())
    }
}

impl From<Vec<Composite>> for Composite {
    fn from(v: Vec<Composite>) -> Self {
        Composite::List(v)
    }
}

impl From<BTreeMap<String, Composite>> for Composite {
    fn from(v: BTreeMap<String, Composite>) -> Self {
        Composite::Map(v)
    }
}

impl From<FutureId> for Composite {
    fn from(v: FutureId) -> Self {
        Composite::Future(v)
    }
}

/// Encode `value` to canonical JSON, replacing every embedded future with
/// its tagged handle via `lookup`, and return `(jsonstr, tape)` where `tape`
/// is the set of futures encountered, deduplicated, in first-seen order.
///
/// This is `Template.from_object` (spec.md §4.1/§4.3): every `Task`/
/// `Indexor` argument (or composite-embedded future) is walked exactly once
/// into the tape, which becomes the new `Template`'s `pending` set.
pub fn encode_composite(
    value: &Composite,
    lookup: &mut dyn FnMut(FutureId) -> (&'static str, String),
) -> Result<(String, Vec<FutureId>)> {
    let mut tape = Vec::new();
    let json_value = to_json(value, lookup, &mut tape);
    let jsonstr = rask_codec::canonical_json(&json_value)?;

    let mut seen = BTreeSet::new();
    let mut deduped = Vec::with_capacity(tape.len());
    for id in tape {
        if seen.insert(id) {
            deduped.push(id);
        }
    }
    Ok((jsonstr, deduped))
}

/// Gather every `FutureId` embedded in `value`, in tree order (duplicates
/// included). Pure and session-independent, so a caller can build an owned
/// hashid lookup table for `encode_composite` without holding any borrow
/// across the call — `encode_composite`'s `lookup` closure lives in a
/// different crate than `Session`, so it cannot rely on same-function
/// disjoint-field borrows the way a method on `Session` itself could.
pub fn collect_future_ids(value: &Composite, out: &mut Vec<FutureId>) {
    match value {
        Composite::Null | Composite::Bool(_) | Composite::Number(_) | Composite::String(_) => {}
        Composite::List(items) => {
            for item in items {
                collect_future_ids(item, out);
            }
        }
        Composite::Map(map) => {
            for v in map.values() {
                collect_future_ids(v, out);
            }
        }
        Composite::Future(id) => out.push(*id),
    }
}

fn to_json(
    value: &Composite,
    lookup: &mut dyn FnMut(FutureId) -> (&'static str, String),
    tape: &mut Vec<FutureId>,
) -> Value {
    match value {
        Composite::Null => Value::Null,
        Composite::Bool(b) => Value::Bool(*b),
        Composite::Number(n) => Value::Number(n.clone()),
        Composite::String(s) => Value::String(s.clone()),
        Composite::List(items) => {
            Value::Array(items.iter().map(|v| to_json(v, lookup, tape)).collect())
        }
        Composite::Map(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), to_json(v, lookup, tape));
            }
            Value::Object(out)
        }
        Composite::Future(id) => {
            tape.push(*id);
            let (tag, hashid) = lookup(*id);
            rask_codec::tag_payload(tag, &hashid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_collects_tape_and_sorts_keys() {
        let mut map = BTreeMap::new();
        map.insert("x".to_string(), Composite::Future(FutureId(1)));
        map.insert("ys".to_string(), Composite::List(vec![Composite::Future(FutureId(2))]));
        let value = Composite::Map(map);

        let (jsonstr, tape) =
            encode_composite(&value, &mut |id| ("Task", format!("h{}", id.0))).unwrap();

        assert_eq!(tape, vec![FutureId(1), FutureId(2)]);
        assert!(jsonstr.contains("\"hashid\":\"h1\""));
        assert!(jsonstr.contains("\"hashid\":\"h2\""));
    }

    #[test]
    fn encode_dedupes_repeated_future() {
        let value = Composite::List(vec![
            Composite::Future(FutureId(7)),
            Composite::Future(FutureId(7)),
        ]);
        let (_jsonstr, tape) = encode_composite(&value, &mut |id| ("Task", format!("h{}", id.0))).unwrap();
        assert_eq!(tape, vec![FutureId(7)]);
    }

    #[test]
    fn collect_future_ids_walks_nested_structures() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Composite::Future(FutureId(1)));
        map.insert(
            "b".to_string(),
            Composite::List(vec![Composite::Future(FutureId(2)), Composite::Future(FutureId(1))]),
        );
        let value = Composite::Map(map);

        let mut out = Vec::new();
        collect_future_ids(&value, &mut out);
        assert_eq!(out, vec![FutureId(1), FutureId(2), FutureId(1)]);
    }
}
