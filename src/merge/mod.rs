//! The metadata merge and reference-rewriting engine.
//!
//! Merging unions the type systems of N input graphs into one output graph,
//! rewrites every cross-module mention so the result is self-contained,
//! resolves name collisions, and leaves a graph the external writer can
//! serialize. The engine is split along its dependency order:
//!
//! # Key Components
//!
//! - [`compare`] - structural equality of types, signatures and attributes
//! - [`platform`] - platform-baseline scope rewriting ([`PlatformFixer`])
//! - [`dedup`] - the identity mapper and duplicate policy ([`IdentityMapper`])
//! - [`import`] - the cloning algorithm ([`ImportEngine`])
//! - [`fixup`] - the second-pass reference fixator ([`ReferenceFixer`])
//! - [`session`] - orchestration ([`MergeSession`]) and [`MergeOptions`]
//!
//! # Pipeline
//!
//! ```text
//! load inputs (parallel) -> import primary -> import secondaries -> fix references -> serialize
//! ```
//!
//! The merge proper is single-threaded and deterministic; see
//! [`session::MergeSession`] for the scheduling and failure model.

pub mod compare;
pub mod dedup;
pub mod fixup;
pub mod import;
pub mod options;
pub mod platform;
pub mod session;

pub use dedup::{IdentityMapper, RenameRecord};
pub use fixup::ReferenceFixer;
pub use import::{ImportContext, ImportEngine};
pub use options::{AttributePolicy, MergeOptions};
pub use platform::PlatformFixer;
pub use session::MergeSession;
