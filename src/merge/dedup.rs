//! The identity mapper: single source of truth for merge deduplication.
//!
//! The mapper owns the bijection from source identity keys (`(scope-name,
//! full-name)`) to the type definitions that now represent them in the output
//! graph. It is consulted before any other resolution strategy, tracks which
//! scope placed each output definition (for collision messages), and owns the
//! one mutation the merge ever applies to already-placed data: displacing an
//! occupant's name on collision.
//!
//! # Key Components
//! - [`IdentityMapper`] - the key-to-definition map plus origin tracking
//! - [`RenameRecord`] - one entry of the displacement ledger
//!
//! The "most recently imported type wins the canonical name" tie-break is
//! enforced here and in the import engine's decision step only; flipping the
//! policy would be a local change.
//!
//! Storage follows the registry layout: a lock-free ordered map for the
//! primary key index and a concurrent map for the secondary origin index. The
//! ordered iteration keeps ledger dumps deterministic.

use std::collections::HashMap;

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    merge::MergeOptions,
    metadata::{
        graph::ModuleGraph,
        identity::IdentityKey,
        token::TypeId,
        typesystem::TypeDef,
    },
};

/// Compiler-generated and cross-cutting type names that are always mergeable.
///
/// These are emitted per-module by compilers and exist in near-identical form
/// in every input; unioning them is the only sensible outcome.
const WELL_KNOWN_DUPLICATES: &[&str] = &[
    "<Module>",
    "<PrivateImplementationDetails>",
    "Microsoft.CodeAnalysis.EmbeddedAttribute",
    "System.Runtime.CompilerServices.ExtensionAttribute",
    "System.Runtime.CompilerServices.IsReadOnlyAttribute",
    "System.Runtime.CompilerServices.IsByRefLikeAttribute",
    "System.Runtime.CompilerServices.IsUnmanagedAttribute",
    "System.Runtime.CompilerServices.NullableAttribute",
    "System.Runtime.CompilerServices.NullableContextAttribute",
    "System.Runtime.CompilerServices.NativeIntegerAttribute",
    "System.Runtime.CompilerServices.RefSafetyRulesAttribute",
    "System.Runtime.CompilerServices.ScopedRefAttribute",
];

/// One displacement: an already-placed definition lost the canonical name to a
/// more recently imported type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRecord {
    /// Full name the occupant held before displacement
    pub old_name: String,
    /// Full name assigned to the displaced occupant
    pub new_name: String,
    /// Scope that originally placed the displaced occupant
    pub origin: String,
}

/// Records the one-to-one mapping from source identity keys to output
/// definitions, and the policy for allowed duplicates.
#[derive(Debug, Default)]
pub struct IdentityMapper {
    map: SkipMap<IdentityKey, TypeId>,
    /// scope-name -> module file name, for collision messages
    origins: DashMap<String, String>,
    /// output definition -> scope that placed it
    placed: HashMap<TypeId, String>,
    renames: Vec<RenameRecord>,
}

impl IdentityMapper {
    /// Create an empty mapper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an input module so collision messages can name its file.
    pub fn register_module(&self, scope_name: &str, module_name: &str) {
        self.origins
            .insert(scope_name.to_string(), module_name.to_string());
    }

    /// Record that the source type behind `key` is represented by `id` in the
    /// output graph. The first scope to place `id` is remembered as its origin.
    pub fn store_mapping(&mut self, key: IdentityKey, id: TypeId) {
        self.placed.entry(id).or_insert_with(|| key.scope.clone());
        self.map.insert(key, id);
    }

    /// The fast path: translate an identity key to the output definition that
    /// represents it, if the type has already been imported.
    #[must_use]
    pub fn lookup(&self, key: &IdentityKey) -> Option<TypeId> {
        self.map.get(key).map(|entry| *entry.value())
    }

    /// Module file name of a scope, for diagnostics; falls back to the scope
    /// name itself for scopes that were never registered.
    #[must_use]
    pub fn module_of_scope(&self, scope_name: &str) -> String {
        self.origins
            .get(scope_name)
            .map_or_else(|| scope_name.to_string(), |entry| entry.value().clone())
    }

    /// Scope that placed an output definition, if the mapper has seen it.
    #[must_use]
    pub fn origin_of(&self, id: TypeId) -> Option<&str> {
        self.placed.get(&id).map(String::as_str)
    }

    /// Whether duplicates of this type merge instead of colliding: the fixed
    /// well-known set, the caller's allowlist (full name or namespace prefix),
    /// or union-merge mode for public types.
    #[must_use]
    pub fn is_allowed_duplicate(
        &self,
        def: &TypeDef,
        full_name: &str,
        options: &MergeOptions,
    ) -> bool {
        if WELL_KNOWN_DUPLICATES.contains(&full_name) {
            return true;
        }
        if options
            .allow_duplicates
            .iter()
            .any(|allowed| allowed == full_name)
        {
            return true;
        }
        if options
            .allow_duplicate_namespaces
            .iter()
            .any(|prefix| full_name.starts_with(prefix.as_str()))
        {
            return true;
        }
        options.union_merge && def.is_public()
    }

    /// Displace the occupant of a name slot: rename it to a disambiguated name
    /// derived from its originating module, falling back to a numbered
    /// disambiguator when that name is itself already taken.
    ///
    /// The occupant's identity-key entries keep pointing at it - only its
    /// output-graph name changes, so references from its own originating
    /// module still resolve to it.
    pub fn displace(&mut self, graph: &mut ModuleGraph, id: TypeId) -> RenameRecord {
        let old_full = graph.full_name(id);
        let origin = self
            .origin_of(id)
            .unwrap_or("displaced")
            .replace('.', "_");

        let prefix = match graph.type_def(id).enclosing {
            Some(parent) => format!("{}/", graph.full_name(parent)),
            None => {
                let namespace = &graph.type_def(id).namespace;
                if namespace.is_empty() {
                    String::new()
                } else {
                    format!("{namespace}.")
                }
            }
        };

        let base = format!("{}_{}", graph.type_def(id).name, origin);
        let mut candidate = base.clone();
        let mut counter = 0usize;
        while graph.lookup(&format!("{prefix}{candidate}")).is_some() {
            counter += 1;
            candidate = format!("{base}_{counter}");
        }

        graph.rename_type(id, &candidate);
        let record = RenameRecord {
            old_name: old_full,
            new_name: graph.full_name(id),
            origin: self.origin_of(id).unwrap_or("displaced").to_string(),
        };
        self.renames.push(record.clone());
        record
    }

    /// The displacement ledger, in merge order.
    #[must_use]
    pub fn renames(&self) -> &[RenameRecord] {
        &self.renames
    }

    /// All mappings in key order; deterministic across reruns.
    pub fn iter_mappings(&self) -> impl Iterator<Item = (IdentityKey, TypeId)> + '_ {
        self.map
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        identity::{AssemblyIdentity, AssemblyVersion},
        typesystem::TypeVisibility,
    };

    fn graph() -> ModuleGraph {
        ModuleGraph::new(AssemblyIdentity::new("Merged", AssemblyVersion::new(1, 0, 0, 0)))
    }

    #[test]
    fn test_store_and_lookup() {
        let mut graph = graph();
        let id = graph.add_type(TypeDef::new("Ns", "A", 0)).unwrap();
        let mut mapper = IdentityMapper::new();
        let key = IdentityKey::new("LibA", "Ns.A");
        mapper.store_mapping(key.clone(), id);

        assert_eq!(mapper.lookup(&key), Some(id));
        assert_eq!(mapper.lookup(&IdentityKey::new("LibB", "Ns.A")), None);
        assert_eq!(mapper.origin_of(id), Some("LibA"));
    }

    #[test]
    fn test_well_known_duplicates() {
        let mapper = IdentityMapper::new();
        let options = MergeOptions::default();
        let module_type = TypeDef::new("", "<Module>", 0);
        assert!(mapper.is_allowed_duplicate(&module_type, "<Module>", &options));

        let helper = TypeDef::new("Ns", "Helper", 0);
        assert!(!mapper.is_allowed_duplicate(&helper, "Ns.Helper", &options));
    }

    #[test]
    fn test_allowlist_and_union() {
        let mapper = IdentityMapper::new();
        let helper = TypeDef::new("Ns", "Helper", TypeVisibility::PUBLIC.bits());

        let by_name = MergeOptions::default().allow_duplicate("Ns.Helper");
        assert!(mapper.is_allowed_duplicate(&helper, "Ns.Helper", &by_name));

        let by_namespace = MergeOptions::default().allow_duplicate_namespace("Ns.");
        assert!(mapper.is_allowed_duplicate(&helper, "Ns.Helper", &by_namespace));

        let union = MergeOptions::default().with_union_merge(true);
        assert!(mapper.is_allowed_duplicate(&helper, "Ns.Helper", &union));

        let internal = TypeDef::new("Ns", "Helper", 0);
        assert!(!mapper.is_allowed_duplicate(&internal, "Ns.Helper", &union));
    }

    #[test]
    fn test_displace_renames_occupant() {
        let mut graph = graph();
        let id = graph.add_type(TypeDef::new("Ns", "Helper", 0)).unwrap();
        let mut mapper = IdentityMapper::new();
        mapper.store_mapping(IdentityKey::new("LibA", "Ns.Helper"), id);

        let record = mapper.displace(&mut graph, id);
        assert_eq!(record.old_name, "Ns.Helper");
        assert_eq!(record.new_name, "Ns.Helper_LibA");
        assert_eq!(graph.lookup("Ns.Helper"), None);
        assert_eq!(graph.lookup("Ns.Helper_LibA"), Some(id));

        // The source key still resolves to the displaced definition.
        assert_eq!(mapper.lookup(&IdentityKey::new("LibA", "Ns.Helper")), Some(id));
        assert_eq!(mapper.renames().len(), 1);
    }

    #[test]
    fn test_displace_falls_back_to_counter() {
        let mut graph = graph();
        let taken = graph.add_type(TypeDef::new("Ns", "Helper_LibA", 0)).unwrap();
        let _ = taken;
        let id = graph.add_type(TypeDef::new("Ns", "Helper", 0)).unwrap();
        let mut mapper = IdentityMapper::new();
        mapper.store_mapping(IdentityKey::new("LibA", "Ns.Helper"), id);

        let record = mapper.displace(&mut graph, id);
        assert_eq!(record.new_name, "Ns.Helper_LibA_1");
    }
}
