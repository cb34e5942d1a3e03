// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `Session`: the scoped, thread-local registry and eval driver (spec.md
//! §4.6/§5/§9 "per-thread active session is a process-wide scoped
//! acquisition").

use crate::handles::{AnyHandle, IndexorHandle, TaskHandle};
use crate::inner::{NormalizedRoot, SessionInner};
use crate::outcome::{RuleFn, RuleOutcome};
use crate::value::Arg;
use rask_errors::{Error, Result};
use rask_future::{FutureId, FutureState};
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static ACTIVE: RefCell<Option<Session>> = const { RefCell::new(None) };
}

/// A scoped handle to one task graph. Cloning a `Session` is cheap (it's an
/// `Rc`) and every clone refers to the same underlying registry.
#[derive(Clone)]
pub struct Session(Rc<RefCell<SessionInner>>);

impl Session {
    /// Enter a new session scope on the current thread. Panics if a session
    /// is already active on this thread — nested entry is a caller bug, not
    /// a recoverable condition (SPEC_FULL.md §5).
    #[must_use = "dropping the guard immediately exits the session scope"]
    pub fn enter() -> ActiveGuard {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let session = Session(Rc::new(RefCell::new(SessionInner::new(id))));
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            assert!(active.is_none(), "a session is already active on this thread");
            *active = Some(session);
        });
        ActiveGuard { _private: () }
    }

    /// The session active on the current thread, or `NoActiveSession` if
    /// none (spec.md §4.7: calling a `Rule` outside a session scope).
    pub fn active() -> Result<Session> {
        ACTIVE.with(|active| active.borrow().clone()).ok_or(Error::NoActiveSession)
    }

    /// Construct or look up a task by function identity and arguments
    /// (spec.md §4.6 `create_task`). `func_name` should be the stable
    /// `fullname(func)` a `Rule` carries (SPEC_FULL.md §6 supplement).
    pub fn create_task(
        &self,
        func_name: &'static str,
        rule_fn: RuleFn,
        args: Vec<Arg>,
        default: Option<Value>,
        label: Option<String>,
    ) -> Result<TaskHandle> {
        self.0.borrow_mut().create_task(func_name, rule_fn, args, default, label)
    }

    /// `Task[key]` (spec.md §4.3).
    pub fn index_task(&self, task: &TaskHandle, key: impl Into<String>) -> IndexorHandle {
        self.0.borrow_mut().index_task(task, key.into())
    }

    /// `Indexor[key]` (spec.md §4.4): composes, sharing the same root task.
    pub fn index_indexor(&self, indexor: &IndexorHandle, key: impl Into<String>) -> IndexorHandle {
        self.0.borrow_mut().index_indexor(indexor, key.into())
    }

    /// The observable state machine of spec.md §3 (`Task.state`, §6).
    pub fn state(&self, task: &TaskHandle) -> FutureState {
        self.0.borrow().state_of(task.id())
    }

    /// `Task.has_run()` (spec.md §6): true once the task's function has been
    /// invoked, regardless of whether it is done or merely `HAS_RUN`.
    pub fn has_run(&self, task: &TaskHandle) -> bool {
        self.0.borrow().task_has_run(task.id())
    }

    /// The human-readable label a task was created with, if any
    /// (SPEC_FULL.md §3 supplement).
    pub fn label(&self, task: &TaskHandle) -> Option<String> {
        self.0.borrow().task_label(task.id())
    }

    /// `Task.future_result()` (spec.md §4.3/§6): the future this task is
    /// chained onto while `HAS_RUN`. Errors `TaskHasNotRun` before the task
    /// has run, `TaskIsDone` once its final result has been set.
    pub fn future_result(&self, task: &TaskHandle) -> Result<AnyHandle> {
        self.0.borrow().task_future_result(task.id())
    }

    /// Store a value under `key` in the side table external runners consult
    /// (SPEC_FULL.md §6 supplement, modeling `caf2/runners.py`'s
    /// `storage.get('scheduler')`). The core never reads this itself.
    pub fn set_storage(&self, key: impl Into<String>, value: impl Any) {
        self.0.borrow_mut().storage_insert(key.into(), Box::new(value));
    }

    /// Borrow a previously stored value back out as `T`, or `None` if absent
    /// or of a different type.
    pub fn with_storage<T: Any, R>(&self, key: &str, f: impl FnOnce(Option<&T>) -> R) -> R {
        let inner = self.0.borrow();
        f(inner.storage_get(key).and_then(|v| v.downcast_ref::<T>()))
    }

    /// The driver (spec.md §4.6 `eval`): normalise `value` to a root future
    /// (or a plain immediate value), schedule every reachable not-yet-run
    /// task, and run tasks in FIFO readiness order until the root is done.
    #[tracing::instrument(skip(self, value))]
    pub fn eval(&self, value: impl Into<Arg>) -> Result<Value> {
        let root = {
            let mut inner = self.0.borrow_mut();
            inner.normalize_root(value.into())?
        };
        let root = match root {
            NormalizedRoot::Immediate(v) => return Ok(v),
            NormalizedRoot::Future(id) => id,
        };
        tracing::info!(root = %root, "eval starting");
        self.drive(root)?;
        let value = self.0.borrow().result_of(root)?;
        tracing::info!(root = %root, "eval finished");
        Ok(value)
    }

    fn drive(&self, root: FutureId) -> Result<()> {
        self.0.borrow_mut().seed_schedule(root);
        loop {
            let next = self.0.borrow_mut().pop_scheduled();
            let Some(task) = next else { break };
            self.run_task(task)?;
            self.0.borrow_mut().reseed_from_future_result(task);
        }
        Ok(())
    }

    /// `run_task` (spec.md §4.6): always invoked by `drive` on a task that
    /// is ready and not done. Drops its borrow of `SessionInner` before
    /// calling the rule body, since rule bodies re-enter through
    /// `Session::active()`/`create_task` on the very same `RefCell`.
    fn run_task(&self, task: FutureId) -> Result<()> {
        let (rule_fn, arg_ids, default, prior_tape) = {
            let mut inner = self.0.borrow_mut();
            let rule_fn = inner.rule_fn_for(task);
            let (arg_ids, default) = inner.task_args_and_default(task);
            let prior_tape = inner.begin_task_recording();
            (rule_fn, arg_ids, default, prior_tape)
        };

        let arg_values: Result<Vec<Value>> = {
            let inner = self.0.borrow();
            arg_ids.iter().map(|id| inner.effective_arg(*id, default.as_ref())).collect()
        };
        let arg_values = arg_values?;

        tracing::info!(task = %task, "running task");
        let outcome = rule_fn(&arg_values);

        let mut inner = self.0.borrow_mut();
        inner.finish_task_recording(task, prior_tape);

        // spec.md §4.6: "If the task is no longer ready after running ...
        // return the raw result without committing — the scheduler will
        // retry." Structurally unreachable in this design (a task's own
        // `pending` is derived solely from its fixed argument list, which
        // never regrows after construction), kept for parity with the
        // algorithm as specified.
        if !inner.is_ready(task) {
            return outcome.map(|_| ());
        }

        match outcome? {
            RuleOutcome::Value(v) => inner.commit_value(task, v),
            RuleOutcome::Future(h) => {
                let future = inner.check_handle(&h)?;
                inner.commit_future(task, future);
            }
            RuleOutcome::Composite(c) => inner.commit_composite(task, c)?,
        }
        tracing::info!(task = %task, "task done");
        Ok(())
    }
}

/// RAII guard for an active session scope. Dropping it (including via panic
/// unwinding) clears the thread-local, so a session is never left dangling
/// active after the scope that created it ends.
pub struct ActiveGuard {
    _private: (),
}

impl ActiveGuard {
    /// The session this guard holds active, for convenience when the caller
    /// doesn't want to go through `Session::active()`.
    pub fn session(&self) -> Session {
        Session::active().expect("the guard's own session is active for its lifetime")
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            *active.borrow_mut() = None;
        });
    }
}
