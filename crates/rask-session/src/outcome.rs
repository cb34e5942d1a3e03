// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! What a rule body hands back to `Session::run_task` (spec.md §4.3's
//! two-phase completion): a plain value, an already-known future to chain
//! onto, or a composite embedding further futures.

use crate::handles::AnyHandle;
use crate::value::CompositeArg;
use rask_errors::Result;
use serde_json::Value;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum RuleOutcome {
    Value(Value),
    Future(AnyHandle),
    Composite(CompositeArg),
}

impl From<Value> for RuleOutcome {
    fn from(v: Value) -> Self {
        RuleOutcome::Value(v)
    }
}

impl From<AnyHandle> for RuleOutcome {
    fn from(v: AnyHandle) -> Self {
        RuleOutcome::Future(v)
    }
}

impl From<CompositeArg> for RuleOutcome {
    fn from(v: CompositeArg) -> Self {
        RuleOutcome::Composite(v)
    }
}

/// A rule body: effective argument values in, a classification of what the
/// task produced out. Held by `Rc` (not `Box`) since one `Rule` may be bound
/// to many distinct tasks (once per distinct argument hashid), each needing
/// its own clone of the same callable for later execution by `eval`.
pub type RuleFn = Rc<dyn Fn(&[Value]) -> Result<RuleOutcome>>;
