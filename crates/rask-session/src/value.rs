// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The session-level counterpart of `rask_future::Composite`: the same
//! "arbitrary JSON-ish value with embedded futures" shape, but embedding a
//! session-tagged [`AnyHandle`] instead of a bare `FutureId`, so a handle
//! from a foreign session is caught at the API boundary instead of silently
//! aliasing an unrelated arena slot.

use crate::handles::{AnyHandle, IndexorHandle, TaskHandle, TemplateHandle};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A composite value a caller passes to `create_task`/`eval`.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeArg {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<CompositeArg>),
    Map(BTreeMap<String, CompositeArg>),
    Future(AnyHandle),
}

impl From<Value> for CompositeArg {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => CompositeArg::Null,
            Value::Bool(b) => CompositeArg::Bool(b),
            Value::Number(n) => CompositeArg::Number(n),
            Value::String(s) => CompositeArg::String(s),
            Value::Array(items) => CompositeArg::List(items.into_iter().map(CompositeArg::from).collect()),
            Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k, CompositeArg::from(v));
                }
                CompositeArg::Map(out)
            }
        }
    }
}

impl From<bool> for CompositeArg {
    fn from(v: bool) -> Self {
        CompositeArg::Bool(v)
    }
}

impl From<i64> for CompositeArg {
    fn from(v: i64) -> Self {
        CompositeArg::Number(v.into())
    }
}

impl From<String> for CompositeArg {
    fn from(v: String) -> Self {
        CompositeArg::String(v)
    }
}

impl From<&str> for CompositeArg {
    fn from(v: &str) -> Self {
        CompositeArg::String(v.to_string())
    }
}

impl From<Vec<CompositeArg>> for CompositeArg {
    fn from(v: Vec<CompositeArg>) -> Self {
        CompositeArg::List(v)
    }
}

impl From<AnyHandle> for CompositeArg {
    fn from(v: AnyHandle) -> Self {
        CompositeArg::Future(v)
    }
}

impl From<TaskHandle> for CompositeArg {
    fn from(v: TaskHandle) -> Self {
        CompositeArg::Future(v.into())
    }
}

impl From<TemplateHandle> for CompositeArg {
    fn from(v: TemplateHandle) -> Self {
        CompositeArg::Future(v.into())
    }
}

impl From<IndexorHandle> for CompositeArg {
    fn from(v: IndexorHandle) -> Self {
        CompositeArg::Future(v.into())
    }
}

/// One argument to `create_task`, or the root value given to `eval`: either
/// a future already known to the session, or a value (possibly embedding
/// further futures) to be promoted into one.
#[derive(Debug, Clone)]
pub enum Arg {
    Future(AnyHandle),
    Value(CompositeArg),
}

impl From<AnyHandle> for Arg {
    fn from(v: AnyHandle) -> Self {
        Arg::Future(v)
    }
}

impl From<TaskHandle> for Arg {
    fn from(v: TaskHandle) -> Self {
        Arg::Future(v.into())
    }
}

impl From<TemplateHandle> for Arg {
    fn from(v: TemplateHandle) -> Self {
        Arg::Future(v.into())
    }
}

impl From<IndexorHandle> for Arg {
    fn from(v: IndexorHandle) -> Self {
        Arg::Future(v.into())
    }
}

impl From<CompositeArg> for Arg {
    fn from(v: CompositeArg) -> Self {
        Arg::Value(v)
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(CompositeArg::from(v))
    }
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Value(CompositeArg::from(v))
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Value(CompositeArg::from(v))
    }
}

/// Convert a future-free `Composite` to a plain `Value`. Panics (via
/// `unreachable!`) if a `Future` node is present — callers must only use this
/// after confirming (via `collect_future_ids`) that the tree is future-free.
pub fn composite_to_plain_value(c: &rask_future::Composite) -> Value {
    use rask_future::Composite;
    match c {
        Composite::Null => Value::Null,
        Composite::Bool(b) => Value::Bool(*b),
        Composite::Number(n) => Value::Number(n.clone()),
        Composite::String(s) => Value::String(s.clone()),
        Composite::List(items) => Value::Array(items.iter().map(composite_to_plain_value).collect()),
        Composite::Map(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), composite_to_plain_value(v));
            }
            Value::Object(out)
        }
        Composite::Future(_) => unreachable!("composite_to_plain_value called on a tree with embedded futures"),
    }
}
