// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Stable content hashing for the task graph (comp.hasher).
//!
//! A `Hash` is a short tag plus a hex digest. `hash_text` is the only
//! producer implemented here; `hash_function` (function-source hashing) is
//! an external collaborator and is not implemented by this crate — see
//! spec.md §6.

use sha1::{Digest, Sha1};
use std::fmt;

/// A tagged content hash: `<tag>:<hex digest>`.
///
/// The tag exists so that future hashing algorithms can be introduced
/// without ambiguity between old and new digests sharing the same prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash {
    tag: &'static str,
    digest: String,
}

impl Hash {
    /// The algorithm tag, e.g. `"sha1"`.
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// The hex digest, without the tag prefix.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.digest)
    }
}

/// SHA-1 hex digest of a byte string, tagged `"sha1"`.
pub fn hash_text(bytes: impl AsRef<[u8]>) -> Hash {
    let mut hasher = Sha1::new();
    hasher.update(bytes.as_ref());
    let digest = hasher.finalize();
    Hash {
        tag: "sha1",
        digest: hex_encode(&digest),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{:02x}", b).expect("writing to a String never fails");
    }
    out
}
