//! Type system of the module graph: owned definitions and symbolic mentions.
//!
//! The merge engine distinguishes sharply between a *definition* (a type owned by
//! some graph, with members and contents) and a *reference* (a mention of a type,
//! possibly unresolved, possibly external). This module provides both halves:
//!
//! # Key Components
//! - [`TypeDef`] - an owned type definition ([`types`])
//! - [`TypeRef`] - the closed mention enumeration with composite wrappers ([`refs`])
//! - [`MethodRef`] / [`FieldRef`] - member mentions
//! - [`TypeVisibility`] / [`TypeModifiers`] - attribute flag groups
//!
//! Definitions address each other through stable arena ids; mentions carry a
//! scope claim and a structural shape instead, and are rewritten (never shared)
//! when their target changes identity during a merge.

mod refs;
mod types;

pub use refs::{
    ArrayDimension, CallingConvention, FieldRef, MethodRef, NamedFieldRef, NamedMethodRef,
    NamedTypeRef, TypeRef, TypeRefScope,
};
pub use types::{
    GenericParam, TypeDef, TypeLayout, TypeModifiers, TypeVisibility, TYPE_VISIBILITY_MASK,
};
