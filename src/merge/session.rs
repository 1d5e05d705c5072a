//! The merge session: orchestration of one complete merge run.
//!
//! A session sequences the pipeline: load inputs (parallel, memory-mapped) ->
//! create the empty output graph -> import the primary module -> import each
//! secondary module with the internalization policy -> fix references ->
//! hand the populated graph to the writer. The merge proper is single-threaded
//! and deterministic: collision tie-breaks and diagnostic ordering follow the
//! fixed traversal order (primary first, then secondaries in input order,
//! depth-first through nested types). Only input loading fans out across
//! worker threads, one task per input file, joined before the merge begins.
//!
//! A fatal error aborts the run and the output graph is dropped; nothing is
//! ever partially serialized. The identity mapper and the platform fixer's
//! resolver cache live and die with the session call, keeping repeated
//! in-process merges isolated.

use std::collections::HashSet;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::{
    merge::{
        dedup::{IdentityMapper, RenameRecord},
        fixup::ReferenceFixer,
        import::ImportEngine,
        platform::PlatformFixer,
        AttributePolicy, MergeOptions,
    },
    metadata::{
        diagnostics::Diagnostics,
        graph::ModuleGraph,
        identity::AssemblyIdentity,
    },
    project::{AssemblyResolver, GraphLoader, GraphWriter},
    Result,
};

/// Runs merges and carries their options, diagnostics and displacement ledger.
///
/// # Examples
///
/// ```rust,no_run
/// use dotfuse::merge::{MergeSession, MergeOptions};
/// # fn inputs() -> Vec<dotfuse::metadata::graph::ModuleGraph> { Vec::new() }
///
/// let mut session = MergeSession::new(MergeOptions::default().with_internalize(true));
/// let output = session.merge_graphs(inputs())?;
/// for entry in session.diagnostics().iter() {
///     eprintln!("[{}] {}", entry.severity, entry.message);
/// }
/// # let _ = output;
/// # Ok::<(), dotfuse::Error>(())
/// ```
pub struct MergeSession {
    options: MergeOptions,
    diagnostics: Diagnostics,
    renames: Vec<RenameRecord>,
}

impl MergeSession {
    /// Create a session with the given options.
    #[must_use]
    pub fn new(options: MergeOptions) -> Self {
        MergeSession {
            options,
            diagnostics: Diagnostics::new(),
            renames: Vec::new(),
        }
    }

    /// The diagnostic stream collected so far.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Displacement renames of the last merge, in merge order. Deterministic
    /// for a given ordered input list.
    #[must_use]
    pub fn renames(&self) -> &[RenameRecord] {
        &self.renames
    }

    /// Merge pre-loaded graphs. The first input is the primary module: it
    /// contributes the output name and version and is never internalized.
    ///
    /// # Errors
    /// [`crate::Error::Empty`] without inputs; [`crate::Error::DuplicateType`]
    /// on an unresolvable public collision.
    pub fn merge_graphs(&mut self, inputs: Vec<ModuleGraph>) -> Result<ModuleGraph> {
        self.merge_graphs_with_resolver(inputs, None)
    }

    /// Merge pre-loaded graphs with an assembly resolver backing the platform
    /// fixer. The resolver is only consulted when the options carry a target
    /// platform.
    pub fn merge_graphs_with_resolver(
        &mut self,
        inputs: Vec<ModuleGraph>,
        resolver: Option<&dyn AssemblyResolver>,
    ) -> Result<ModuleGraph> {
        if inputs.is_empty() {
            return Err(crate::Error::Empty);
        }

        let primary = &inputs[0];
        let output_name = self
            .options
            .output_name
            .clone()
            .unwrap_or_else(|| primary.assembly.identity.name.clone());
        let mut identity = AssemblyIdentity::new(&output_name, primary.assembly.identity.version);
        identity.culture = primary.assembly.identity.culture.clone();
        identity.public_key_token = primary.assembly.identity.public_key_token;
        let mut output = ModuleGraph::new(identity);
        output.assembly.flags = primary.assembly.flags;

        let mut mapper = IdentityMapper::new();
        let platform_resolver = if self.options.target_platform.is_some() {
            resolver
        } else {
            None
        };
        let fixer = PlatformFixer::new(platform_resolver, &self.diagnostics);

        for (index, source) in inputs.iter().enumerate() {
            let is_primary = index == 0;
            let mut engine = ImportEngine::new(
                source,
                &mut output,
                &mut mapper,
                &fixer,
                &self.options,
                &self.diagnostics,
                self.options.internalize,
                is_primary,
            );
            engine.run()?;
            let copy_manifest = match self.options.attribute_policy {
                AttributePolicy::Primary => is_primary,
                AttributePolicy::FromInput(chosen) => chosen == index,
                AttributePolicy::Union => true,
            };
            if copy_manifest {
                engine
                    .import_assembly_metadata(self.options.attribute_policy == AttributePolicy::Union);
            }
            if is_primary {
                engine.import_entry_point();
            }
        }

        let merged_scopes: HashSet<String> = inputs
            .iter()
            .map(|input| input.scope_name().to_string())
            .collect();
        let reference_fixer = ReferenceFixer::new(&mapper, &self.diagnostics, merged_scopes);
        reference_fixer.fix_references(&mut output);

        self.renames = mapper.renames().to_vec();
        Ok(output)
    }

    /// Load the given module files in parallel and merge them. The files are
    /// memory-mapped and handed to the loader; all loads complete before the
    /// merge proper begins.
    ///
    /// # Errors
    /// Any load failure aborts the whole run before output state exists.
    pub fn merge_paths(
        &mut self,
        paths: &[PathBuf],
        loader: &dyn GraphLoader,
    ) -> Result<ModuleGraph> {
        if paths.is_empty() {
            return Err(crate::Error::Empty);
        }
        let loaded: Vec<Result<ModuleGraph>> = paths
            .par_iter()
            .map(|path| {
                let file = std::fs::File::open(path)?;
                // SAFETY: the mapping is read-only and lives only for the load.
                let mapped = unsafe { memmap2::Mmap::map(&file)? };
                if mapped.is_empty() {
                    return Err(crate::Error::Empty);
                }
                loader.load(&mapped)
            })
            .collect();

        let mut inputs = Vec::with_capacity(loaded.len());
        for result in loaded {
            inputs.push(result?);
        }
        self.merge_graphs(inputs)
    }

    /// Merge and serialize in one step; the output graph is handed to the
    /// writer exactly once.
    pub fn merge_and_write(
        &mut self,
        inputs: Vec<ModuleGraph>,
        writer: &dyn GraphWriter,
    ) -> Result<Vec<u8>> {
        let output = self.merge_graphs(inputs)?;
        writer.serialize(&output)
    }
}
