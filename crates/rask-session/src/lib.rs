// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `Session`: the scoped task registry and `eval` driver (spec.md §4.6).
//!
//! This is the crate a caller actually depends on: it owns the future arena
//! (`rask_future`), the dedup table, the scoped thread-local active session,
//! and the FIFO scheduler that drives a graph to completion. `rask-rule`
//! builds on top of [`Session::create_task`] to give callers an ergonomic
//! `#[rule]`-style binding; this crate only exposes the primitive.

mod handles;
mod inner;
mod outcome;
mod session;
mod value;

pub use handles::{AnyHandle, IndexorHandle, TaskHandle, TemplateHandle};
pub use outcome::{RuleFn, RuleOutcome};
pub use session::{ActiveGuard, Session};
pub use value::{composite_to_plain_value, Arg, CompositeArg};

pub use rask_errors::{Error, Result};
pub use rask_future::FutureState;
