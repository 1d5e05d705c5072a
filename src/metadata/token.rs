//! Typed arena ids for module graph definitions.
//!
//! Every definition owned by a [`crate::metadata::graph::ModuleGraph`] lives in a
//! per-kind arena and is addressed by a stable index. The ids defined here are
//! newtype wrappers around those indices: cheap to copy, impossible to confuse
//! across kinds, and stable for the lifetime of the owning graph. References
//! between definitions are expressed through these ids instead of owning
//! pointers, which keeps cyclic shapes (nested-type back-pointers, generic
//! self-references, override chains) representable without ownership cycles.
//!
//! # Key Types
//! - [`TypeId`] - Index of a type definition
//! - [`FieldId`], [`MethodId`], [`EventId`], [`PropertyId`] - Member definition indices
//!
//! An id is only meaningful together with the graph that issued it; indexing a
//! different graph with it is a logic error the arena accessors surface as
//! [`crate::Error::TypeNotFound`].

use std::fmt;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident, $tag:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Create an id from a raw arena index.
            #[must_use]
            pub fn new(index: u32) -> Self {
                Self(index)
            }

            /// The raw arena index this id wraps.
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, ":0x{:08X}"), self.0)
            }
        }
    };
}

define_id!(
    /// Stable index of a type definition within its owning graph.
    TypeId,
    "type"
);
define_id!(
    /// Stable index of a field definition within its owning graph.
    FieldId,
    "field"
);
define_id!(
    /// Stable index of a method definition within its owning graph.
    MethodId,
    "method"
);
define_id!(
    /// Stable index of an event definition within its owning graph.
    EventId,
    "event"
);
define_id!(
    /// Stable index of a property definition within its owning graph.
    PropertyId,
    "property"
);
