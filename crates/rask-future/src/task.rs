// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `Task<T>`: a deferred rule invocation, identified by the hash of its
//! function identity and its argument hashids (spec.md §4.3).

use crate::FutureId;
use rask_hash::hash_text;
use serde_json::Value;

/// The variant-specific state of a `Task`.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    /// `fullname(func)` — the caller-supplied stable name used in `spec`.
    /// Rust has no runtime qualname introspection (unlike the Python
    /// original's `f'{module}:{qualname}'`), so this is provided explicitly
    /// by `Rule::new` and is expected to be portable across processes
    /// running the same build of the user's rules.
    pub func_name: String,
    /// Each argument, already promoted to a `HashedFuture` (a plain value
    /// becomes a `Template` of itself before a `Task` is ever constructed).
    pub args: Vec<FutureId>,
    pub hashid: String,
    pub spec: String,
    pub default: Option<Value>,
    pub label: Option<String>,
    /// Tasks created *during* this task's own execution (via `Session::record`).
    pub children: Vec<FutureId>,
    /// Set iff the task returned a future and is in `HAS_RUN`, awaiting it.
    pub future_result: Option<FutureId>,
    /// True once `task.func` has been invoked; never reset. Distinguishes
    /// `HAS_RUN` (ready, has_run, result not yet set) from a task that
    /// simply hasn't been scheduled yet.
    pub has_run: bool,
}

/// Compute `(spec, hashid)` for a task from its function name and its
/// arguments' hashids, per spec.md's invariant 1:
/// `hash(t) = hash_text(canonical_json([fullname(t.func), *arg_hashids]))`.
pub fn task_spec(func_name: &str, arg_hashids: &[String]) -> rask_errors::Result<(String, String)> {
    let mut items = Vec::with_capacity(1 + arg_hashids.len());
    items.push(Value::String(func_name.to_string()));
    items.extend(arg_hashids.iter().cloned().map(Value::String));
    let spec = rask_codec::canonical_json(&Value::Array(items))?;
    let hashid = hash_text(&spec).to_string();
    Ok((spec, hashid))
}

impl TaskRecord {
    pub fn new(
        func_name: String,
        args: Vec<FutureId>,
        arg_hashids: &[String],
        default: Option<Value>,
        label: Option<String>,
    ) -> rask_errors::Result<Self> {
        let (spec, hashid) = task_spec(&func_name, arg_hashids)?;
        Ok(TaskRecord {
            func_name,
            args,
            hashid,
            spec,
            default,
            label,
            children: Vec::new(),
            future_result: None,
            has_run: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_is_stable_for_equal_inputs() {
        let (spec1, h1) = task_spec("mymod:fib", &["sha1:aaa".into(), "sha1:bbb".into()]).unwrap();
        let (spec2, h2) = task_spec("mymod:fib", &["sha1:aaa".into(), "sha1:bbb".into()]).unwrap();
        assert_eq!(spec1, spec2);
        assert_eq!(h1, h2);
    }

    #[test]
    fn spec_distinguishes_function_and_args() {
        let (_, h1) = task_spec("mymod:fib", &["sha1:aaa".into()]).unwrap();
        let (_, h2) = task_spec("mymod:other", &["sha1:aaa".into()]).unwrap();
        let (_, h3) = task_spec("mymod:fib", &["sha1:zzz".into()]).unwrap();
        assert_ne!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn spec_is_canonical_json_array() {
        let (spec, _) = task_spec("f", &["sha1:a".into(), "sha1:b".into()]).unwrap();
        assert_eq!(spec, r#"["f","sha1:a","sha1:b"]"#);
    }
}
