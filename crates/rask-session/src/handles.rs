// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Cheap, cloneable handles a caller holds onto a future registered with a
//! `Session`. Each caches its `hashid` so introspection doesn't need to
//! re-borrow the session.

use rask_future::FutureId;

macro_rules! handle {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub(crate) id: FutureId,
            pub(crate) hashid: String,
            /// The owning session's id, so a handle from a different
            /// `Session` is rejected as `ArgNotInSession` instead of
            /// silently aliasing an unrelated arena slot (`FutureId` alone
            /// carries no session identity).
            pub(crate) session_id: u64,
        }

        impl $name {
            pub fn id(&self) -> FutureId {
                self.id
            }

            pub fn hashid(&self) -> &str {
                &self.hashid
            }

            pub fn session_id(&self) -> u64 {
                self.session_id
            }
        }
    };
}

handle!(TaskHandle);
handle!(TemplateHandle);
handle!(IndexorHandle);

/// Any one of the three hashed-future handle kinds, used where a value
/// could be bound to a task argument, an `eval` root, or a rule's return
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyHandle {
    Task(TaskHandle),
    Template(TemplateHandle),
    Indexor(IndexorHandle),
}

impl AnyHandle {
    pub fn id(&self) -> FutureId {
        match self {
            AnyHandle::Task(h) => h.id,
            AnyHandle::Template(h) => h.id,
            AnyHandle::Indexor(h) => h.id,
        }
    }

    pub fn hashid(&self) -> &str {
        match self {
            AnyHandle::Task(h) => &h.hashid,
            AnyHandle::Template(h) => &h.hashid,
            AnyHandle::Indexor(h) => &h.hashid,
        }
    }

    pub fn session_id(&self) -> u64 {
        match self {
            AnyHandle::Task(h) => h.session_id,
            AnyHandle::Template(h) => h.session_id,
            AnyHandle::Indexor(h) => h.session_id,
        }
    }
}

impl From<TaskHandle> for AnyHandle {
    fn from(h: TaskHandle) -> Self {
        AnyHandle::Task(h)
    }
}

impl From<TemplateHandle> for AnyHandle {
    fn from(h: TemplateHandle) -> Self {
        AnyHandle::Template(h)
    }
}

impl From<IndexorHandle> for AnyHandle {
    fn from(h: IndexorHandle) -> Self {
        AnyHandle::Indexor(h)
    }
}
