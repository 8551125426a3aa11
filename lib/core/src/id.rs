//! Prefixed ULID tokens.
//!
//! Node ids inside workflow documents and generation run ids are ULIDs
//! rendered as `<prefix>_<ulid>`. They are unique without coordination and
//! sort by creation time, which keeps repaired documents stable to diff.

use serde::{Serialize, Serializer};
use std::fmt;
use ulid::Ulid;

macro_rules! prefixed_ulid {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Ulid);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", Self::PREFIX, self.0)
            }
        }

        // Serialized exactly as displayed, so logs and JSON agree.
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

prefixed_ulid!(
    /// Token written into a node's `id` field.
    NodeId,
    "node"
);

prefixed_ulid!(
    /// One run of the generation pipeline, for log correlation.
    GenerationId,
    "gen"
);
