// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Future kernel and hashed future variants (fut.kernel, fut.hashed).
//!
//! This crate is the pure data model: `FutureId`-indexed records and the
//! state machine that derives `FutureState` from them. It does not own an
//! arena — that's `rask-session::Session`, which is the only thing that
//! mutates these records, per the arena + stable-index design in spec.md §9
//! ("an arena + stable-index design avoids ownership ambiguity"). Indices,
//! not references, are what callbacks and children point at.

mod composite;
mod indexor;
mod kernel;
mod task;
mod template;

pub use composite::{collect_future_ids, encode_composite, Composite};
pub use indexor::{indexor_hashid, walk_keys, IndexorRecord};
pub use kernel::{Callback, FutureState, Kernel};
pub use task::{task_spec, TaskRecord};
pub use template::{substitute, template_hashid, TemplateRecord};

use serde_json::Value;

/// A stable, arena-local index identifying one future. Cheap to copy, never
/// reused within a session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FutureId(pub u32);

impl std::fmt::Display for FutureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The three concrete hashed-future variants (spec.md §3).
#[derive(Debug, Clone)]
pub enum FutureKind {
    Task(TaskRecord),
    Template(TemplateRecord),
    Indexor(IndexorRecord),
}

impl FutureKind {
    /// The content-derived hashid, stable for the lifetime of the future.
    pub fn hashid(&self) -> &str {
        match self {
            FutureKind::Task(t) => &t.hashid,
            FutureKind::Template(t) => &t.hashid,
            FutureKind::Indexor(t) => &t.hashid,
        }
    }

    /// The canonical string the hashid was taken of (for `Indexor`, equal to
    /// its own hashid — it never serialises its parent's spec, to avoid
    /// cycles).
    pub fn spec(&self) -> &str {
        match self {
            FutureKind::Task(t) => &t.spec,
            FutureKind::Template(t) => &t.jsonstr,
            FutureKind::Indexor(t) => &t.hashid,
        }
    }

    /// The futures this one directly depends on (its parents).
    pub fn parents(&self) -> &[FutureId] {
        match self {
            FutureKind::Task(t) => &t.args,
            FutureKind::Template(t) => &t.futures,
            FutureKind::Indexor(t) => std::slice::from_ref(&t.parent),
        }
    }
}

/// One slot in the session's future arena: the generic kernel state plus the
/// variant-specific record.
#[derive(Debug, Clone)]
pub struct FutureRecord {
    pub kernel: Kernel,
    pub kind: FutureKind,
}

impl FutureRecord {
    pub fn new(kind: FutureKind, pending: impl IntoIterator<Item = FutureId>) -> Self {
        FutureRecord {
            kernel: Kernel::new(pending),
            kind,
        }
    }

    pub fn is_done(&self) -> bool {
        self.kernel.result.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.kernel.pending.is_empty()
    }

    /// The observable state machine of spec.md §3.
    pub fn state(&self) -> FutureState {
        if self.is_done() {
            return FutureState::Done;
        }
        if self.is_ready() {
            if let FutureKind::Task(t) = &self.kind {
                if t.has_run {
                    return FutureState::HasRun;
                }
            }
            return FutureState::Ready;
        }
        if self.kernel.registered {
            FutureState::Pending
        } else {
            FutureState::Unregistered
        }
    }

    /// `default_result` for the base future kernel: the default, unchanged.
    /// `Task` overrides this (delegating through `future_result` when set) —
    /// see `rask-session::Session::default_result`, which needs arena access
    /// `Task` alone does not have.
    pub fn result(&self) -> Option<&Value> {
        self.kernel.result.as_ref()
    }
}
