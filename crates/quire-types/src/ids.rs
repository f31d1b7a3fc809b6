//! Typed identifiers for chapters and blocks.
//!
//! Both ids are assigned by the server and are opaque on this side of the
//! wire: we never parse or generate them, only compare and display them. The
//! `short()` form is for log lines and human-facing UI, never for lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A chapter identifier (server-assigned, opaque).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(String);

/// A block identifier (server-assigned, opaque).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_opaque_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Wrap a server-provided id.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// The raw id string as the server sent it.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// At most the first 8 characters. For display only, never lookup.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
            }

            /// Whether the id is the empty string (never valid server-side).
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.0)
            }
        }
    };
}

impl_opaque_id!(ChapterId, "ChapterId");
impl_opaque_id!(BlockId, "BlockId");
