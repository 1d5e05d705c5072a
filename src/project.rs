//! Seams to the external collaborators of a merge.
//!
//! The merge engine consumes and produces in-memory module graphs only. Turning
//! bytes into a graph and a graph back into bytes, and locating external
//! dependencies on disk, are capabilities the embedder provides through the
//! traits in this module. All I/O happens behind these seams, either before the
//! merge proper starts (input loading) or memoized during it (platform
//! resolution); no merge component blocks on I/O directly.
//!
//! # Key Components
//! - [`GraphLoader`] - bytes to [`ModuleGraph`]
//! - [`GraphWriter`] - [`ModuleGraph`] to bytes
//! - [`AssemblyResolver`] - locate an external dependency by identity

use crate::{
    metadata::{graph::ModuleGraph, identity::AssemblyIdentity},
    Result,
};

/// Turns the raw bytes of a compiled module into its object graph.
///
/// Implementations must be [`Sync`]: the session loads inputs in parallel,
/// one task per input file, with no shared mutable state during load.
///
/// # Errors
/// [`crate::Error::Malformed`] when the bytes are not a valid module.
pub trait GraphLoader: Sync {
    /// Load a module graph from raw bytes.
    fn load(&self, bytes: &[u8]) -> Result<ModuleGraph>;
}

/// Serializes a populated module graph into a binary image.
///
/// # Errors
/// [`crate::Error::Write`] when the graph cannot be serialized (e.g. invalid
/// signing key material).
pub trait GraphWriter {
    /// Serialize the graph into its binary form.
    fn serialize(&self, graph: &ModuleGraph) -> Result<Vec<u8>>;
}

/// Locates an external dependency on disk and loads its graph.
///
/// Used by the platform fixer to load platform-baseline copies of referenced
/// assemblies. Results are memoized by the caller, so implementations may
/// perform disk I/O on every call.
///
/// # Errors
/// [`crate::Error::UnresolvedReference`] when no matching assembly is found.
pub trait AssemblyResolver {
    /// Resolve an assembly identity to its module graph.
    fn resolve(&self, identity: &AssemblyIdentity) -> Result<ModuleGraph>;
}
