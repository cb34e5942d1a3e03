// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The generic future kernel: pending/registered bookkeeping shared by all
//! three hashed-future variants.

use crate::FutureId;
use serde_json::Value;
use std::collections::BTreeSet;

/// Derived observable state (spec.md §3). Not stored directly — always
/// computed from `Kernel` + variant state via `FutureRecord::state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureState {
    Unregistered,
    Pending,
    Ready,
    HasRun,
    Done,
}

/// A one-shot listener fired exactly once, from the closed set of actions
/// the scheduler needs. Spec.md describes `ready_callbacks`/`done_callbacks`
/// as "ordered lists of one-shot observers"; this workspace never needs an
/// open-ended observer (the only listeners the engine ever registers are
/// "schedule this task" and "chain this future's result into that task"), so
/// a closed enum replaces `Box<dyn FnOnce>` — no heap allocation, no
/// dynamic dispatch, and `Session::dispatch_*` is the single place that
/// interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    /// Enqueue this future (always a `Task`) on the scheduler's FIFO queue.
    Schedule,
    /// This future is a `Template` whose `pending` just emptied: substitute
    /// its embedded futures' results into its JSON skeleton and set its
    /// result (`Session::resolve_template`). Mirrors the Python original's
    /// `Template.__init__` registering its own resolution as a ready
    /// callback on itself.
    ResolveTemplate,
    /// This future is an `Indexor` whose parent just became ready: walk its
    /// key path against the parent's result and set its result
    /// (`Session::resolve_indexor`). Same self-registration pattern as
    /// `ResolveTemplate`.
    ResolveIndexor,
    /// Copy this future's result into the named task's result once done.
    ChainInto(FutureId),
}

/// The attributes every `Future<T>` carries (spec.md §3).
#[derive(Debug, Clone)]
pub struct Kernel {
    pub pending: BTreeSet<FutureId>,
    pub children: Vec<FutureId>,
    pub result: Option<Value>,
    pub ready_callbacks: Vec<Callback>,
    pub done_callbacks: Vec<Callback>,
    pub registered: bool,
}

impl Kernel {
    pub fn new(pending: impl IntoIterator<Item = FutureId>) -> Self {
        Kernel {
            pending: pending.into_iter().collect(),
            children: Vec::new(),
            result: None,
            ready_callbacks: Vec::new(),
            done_callbacks: Vec::new(),
            registered: false,
        }
    }
}
