// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The closed error taxonomy of the task-graph engine.
//!
//! Every failure in `rask-future` and `rask-session` is one of these
//! variants. Nothing here retries or recovers on its own; callers match on
//! `Error` and decide.

use thiserror::Error;

/// A domain error raised synchronously by the future kernel, the composite
/// codec, or the session.
#[derive(Debug, Error)]
pub enum Error {
    /// `result()` was called without a default on a future that has not
    /// finished.
    #[error("future not done: {0}")]
    FutureNotDone(String),

    /// `future_result()` was called on a task that has not run yet.
    #[error("task has not run: {0}")]
    TaskHasNotRun(String),

    /// `future_result()` was called on a task whose final result is already
    /// set.
    #[error("task is done: {0}")]
    TaskIsDone(String),

    /// A `Rule` was called with no session active on the current thread.
    #[error("no active session")]
    NoActiveSession,

    /// A task argument (or a future reachable inside a composite argument)
    /// is not known to the session it is being created in.
    #[error("argument not in session: {0}")]
    ArgNotInSession(String),

    /// The external function-source hashing service failed. Surfaced
    /// verbatim; the core never constructs this variant itself, since
    /// `hash_function` is an external collaborator (spec.md §6).
    #[error("hashing error: {0}")]
    HashingError(String),

    /// The composite walker could not canonically represent a value (e.g.
    /// non-UTF8 bytes, a map with non-string keys, or NaN/Infinity floats).
    #[error("composite error: {0}")]
    CompositeError(String),
}

/// Convenience alias used throughout the engine crates.
pub type Result<T> = std::result::Result<T, Error>;
