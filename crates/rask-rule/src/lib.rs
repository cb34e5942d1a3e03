// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `Rule` binding (spec.md §4.7): a thin wrapper that turns a plain function
//! into a task factory bound to the active session.
//!
//! The Python original's `@rule`/`@rule(label=..., default=...)` decorator
//! has no direct Rust equivalent (no `*args`/`**kwargs`, no runtime
//! `__module__`/`__qualname__`), so this crate offers the same two
//! ingredients — a stable function identity plus fixed `label`/`default` —
//! through a builder instead of a decorator: `Rule::new(fullname, body)`,
//! optionally chained with `.label(..)`/`.default(..)`, then called with
//! `.call(args)`. `fullname` is supplied by the caller (SPEC_FULL.md §6
//! supplement resolves the missing runtime introspection this way) and must
//! be stable across processes running the same build of the user's rules —
//! it is embedded verbatim as the first element of every task's `spec`.

use rask_errors::Result;
use rask_session::{Arg, RuleFn, Session, TaskHandle};
use serde_json::Value;
use std::rc::Rc;

/// A rule: a function identity plus fixed `default`/`label`, bound to
/// whichever `Session` is active when it is called.
#[derive(Clone)]
pub struct Rule {
    func_name: &'static str,
    body: RuleFn,
    default: Option<Value>,
    label: Option<String>,
}

impl Rule {
    /// Wrap `body` as a rule identified by `func_name`. `func_name` becomes
    /// `fullname(func)` in every task's `spec` (spec.md §4.3) — two `Rule`s
    /// with the same `func_name` are indistinguishable to the hasher, so
    /// callers should pick one as unique as a Python `module:qualname`
    /// (e.g. `concat!(module_path!(), "::fib")`).
    pub fn new(
        func_name: &'static str,
        body: impl Fn(&[Value]) -> Result<rask_session::RuleOutcome> + 'static,
    ) -> Self {
        Rule { func_name, body: Rc::new(body), default: None, label: None }
    }

    /// Fix the `default` value used to synthesise placeholder results for
    /// tasks created by this rule (spec.md §3/§9 Open Question (c): advisory
    /// only, consulted by `result(default)`/`eval` when an argument or root
    /// is not yet done and a default was requested).
    #[must_use]
    pub fn default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Fix a human-readable label, carried for introspection only — never
    /// part of a task's `hashid`/`spec` (spec.md §3 supplement).
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// `Rule.__call__` (spec.md §4.7): delegates to
    /// `Session::active().create_task(...)`. Fails with `NoActiveSession` if
    /// no session is active on the current thread.
    pub fn call(&self, args: impl IntoIterator<Item = impl Into<Arg>>) -> Result<TaskHandle> {
        let session = Session::active()?;
        let args: Vec<Arg> = args.into_iter().map(Into::into).collect();
        session.create_task(self.func_name, self.body.clone(), args, self.default.clone(), self.label.clone())
    }
}
