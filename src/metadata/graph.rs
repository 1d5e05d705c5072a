//! The module graph: an owned forest of type definitions plus module-level tables.
//!
//! One graph per input module, and exactly one output graph that the merge
//! engine populates. Definitions live in per-kind arenas addressed by the typed
//! ids from [`crate::metadata::token`]; cross-definition links (nested types,
//! member ownership, accessor links) are ids into the same graph, while
//! everything that may cross module boundaries is a symbolic mention.
//!
//! # Key Components
//! - [`ModuleGraph`] - arenas, name index, manifest tables
//! - [`AssemblyInfo`] - the assembly manifest (identity, attributes, security)
//! - [`ExportedType`] - an entry of the exported-type table
//! - [`DataBlob`] - an embedded resource blob
//!
//! The full-name index is maintained by [`ModuleGraph::add_type`] and
//! [`ModuleGraph::rename_type`]; nested paths render ECMA-style
//! (`Ns.Outer/Inner`). Renaming a type re-keys its whole nested subtree.

use std::collections::HashMap;

use crate::metadata::{
    attributes::{CustomAttribute, SecurityDeclaration},
    identity::{AssemblyIdentity, ReferenceScope},
    members::{EventDef, FieldDef, PropertyDef},
    method::MethodDef,
    token::{EventId, FieldId, MethodId, PropertyId, TypeId},
    typesystem::{MethodRef, TypeDef, TypeRef},
};

/// The assembly manifest of a module graph.
#[derive(Debug, Clone)]
pub struct AssemblyInfo {
    /// Identity of the assembly
    pub identity: AssemblyIdentity,
    /// Raw ECMA-335 assembly flags
    pub flags: u32,
    /// Assembly-level custom attributes
    pub custom_attributes: Vec<CustomAttribute>,
    /// Assembly-level security declarations
    pub security: Vec<SecurityDeclaration>,
}

/// An entry of the exported-type table: a type this assembly forwards to
/// another scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedType {
    /// Namespace of the forwarded type
    pub namespace: String,
    /// Simple name of the forwarded type
    pub name: String,
    /// Scope the type is forwarded to
    pub scope: ReferenceScope,
    /// Raw ECMA-335 exported-type flags
    pub flags: u32,
}

impl ExportedType {
    /// `Namespace.Name` of the forwarded type.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// An embedded data blob (manifest resource).
#[derive(Debug, Clone)]
pub struct DataBlob {
    /// Resource name
    pub name: String,
    /// Raw ECMA-335 manifest-resource flags
    pub flags: u32,
    /// Raw resource bytes
    pub data: Vec<u8>,
}

/// The in-memory object model of one compiled module.
///
/// Input graphs are read-only during a merge; the output graph is built
/// incrementally by the import engine and rewritten by the reference fixator,
/// then handed to the external writer exactly once.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    /// The assembly manifest
    pub assembly: AssemblyInfo,
    /// File name of the module (e.g. "MyLib.dll")
    pub module_name: String,
    /// External assemblies this module references
    pub assembly_refs: Vec<AssemblyIdentity>,
    /// External modules this module references (P/Invoke targets)
    pub module_refs: Vec<String>,
    /// Types forwarded to other scopes
    pub exported_types: Vec<ExportedType>,
    /// Embedded resource blobs
    pub resources: Vec<DataBlob>,
    /// Entry point, if the module is executable
    pub entry_point: Option<MethodRef>,

    types: Vec<TypeDef>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    events: Vec<EventDef>,
    properties: Vec<PropertyDef>,
    field_owners: Vec<TypeId>,
    method_owners: Vec<TypeId>,
    top_level: Vec<TypeId>,
    name_index: HashMap<String, TypeId>,
}

impl ModuleGraph {
    /// Create an empty graph for the given assembly identity.
    ///
    /// The module file name defaults to `"{name}.dll"`.
    #[must_use]
    pub fn new(identity: AssemblyIdentity) -> Self {
        let module_name = format!("{}.dll", identity.name);
        ModuleGraph {
            assembly: AssemblyInfo {
                identity,
                flags: 0,
                custom_attributes: Vec::new(),
                security: Vec::new(),
            },
            module_name,
            assembly_refs: Vec::new(),
            module_refs: Vec::new(),
            exported_types: Vec::new(),
            resources: Vec::new(),
            entry_point: None,
            types: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            events: Vec::new(),
            properties: Vec::new(),
            field_owners: Vec::new(),
            method_owners: Vec::new(),
            top_level: Vec::new(),
            name_index: HashMap::new(),
        }
    }

    /// Name of the scope this graph's definitions originate from.
    #[must_use]
    pub fn scope_name(&self) -> &str {
        &self.assembly.identity.name
    }

    /// Add a type definition, indexing it by full name.
    ///
    /// If `def.enclosing` is set, the new id is appended to the enclosing
    /// type's nested list.
    ///
    /// # Errors
    /// Returns an error when a definition with the same (namespace, name,
    /// enclosing) already exists - the uniqueness invariant of a module.
    pub fn add_type(&mut self, def: TypeDef) -> crate::Result<TypeId> {
        let id = TypeId::new(u32::try_from(self.types.len()).map_err(|_| {
            crate::Error::Error("type arena exhausted".to_string())
        })?);
        let enclosing = def.enclosing;
        let full_name = match enclosing {
            Some(parent) => format!("{}/{}", self.full_name(parent), def.name),
            None => def.simple_full_name(),
        };
        if self.name_index.contains_key(&full_name) {
            return Err(crate::Error::Error(format!(
                "type {full_name} already defined in {}",
                self.module_name
            )));
        }
        self.types.push(def);
        self.name_index.insert(full_name, id);
        match enclosing {
            Some(parent) => self.types[parent.index()].nested.push(id),
            None => self.top_level.push(id),
        }
        Ok(id)
    }

    /// Add a field to `owner`'s field list.
    pub fn add_field(&mut self, owner: TypeId, def: FieldDef) -> FieldId {
        let id = FieldId::new(self.fields.len() as u32);
        self.fields.push(def);
        self.field_owners.push(owner);
        self.types[owner.index()].fields.push(id);
        id
    }

    /// Add a method to `owner`'s method list.
    pub fn add_method(&mut self, owner: TypeId, def: MethodDef) -> MethodId {
        let id = MethodId::new(self.methods.len() as u32);
        self.methods.push(def);
        self.method_owners.push(owner);
        self.types[owner.index()].methods.push(id);
        id
    }

    /// Declaring type of a field.
    #[must_use]
    pub fn field_owner(&self, id: FieldId) -> TypeId {
        self.field_owners[id.index()]
    }

    /// Declaring type of a method.
    #[must_use]
    pub fn method_owner(&self, id: MethodId) -> TypeId {
        self.method_owners[id.index()]
    }

    /// Add an event to `owner`'s event list.
    pub fn add_event(&mut self, owner: TypeId, def: EventDef) -> EventId {
        let id = EventId::new(self.events.len() as u32);
        self.events.push(def);
        self.types[owner.index()].events.push(id);
        id
    }

    /// Add a property to `owner`'s property list.
    pub fn add_property(&mut self, owner: TypeId, def: PropertyDef) -> PropertyId {
        let id = PropertyId::new(self.properties.len() as u32);
        self.properties.push(def);
        self.types[owner.index()].properties.push(id);
        id
    }

    /// Access a type definition.
    #[must_use]
    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.index()]
    }

    /// Mutably access a type definition.
    pub fn type_def_mut(&mut self, id: TypeId) -> &mut TypeDef {
        &mut self.types[id.index()]
    }

    /// Access a field definition.
    #[must_use]
    pub fn field_def(&self, id: FieldId) -> &FieldDef {
        &self.fields[id.index()]
    }

    /// Mutably access a field definition.
    pub fn field_def_mut(&mut self, id: FieldId) -> &mut FieldDef {
        &mut self.fields[id.index()]
    }

    /// Access a method definition.
    #[must_use]
    pub fn method_def(&self, id: MethodId) -> &MethodDef {
        &self.methods[id.index()]
    }

    /// Mutably access a method definition.
    pub fn method_def_mut(&mut self, id: MethodId) -> &mut MethodDef {
        &mut self.methods[id.index()]
    }

    /// Access an event definition.
    #[must_use]
    pub fn event_def(&self, id: EventId) -> &EventDef {
        &self.events[id.index()]
    }

    /// Mutably access an event definition.
    pub fn event_def_mut(&mut self, id: EventId) -> &mut EventDef {
        &mut self.events[id.index()]
    }

    /// Access a property definition.
    #[must_use]
    pub fn property_def(&self, id: PropertyId) -> &PropertyDef {
        &self.properties[id.index()]
    }

    /// Mutably access a property definition.
    pub fn property_def_mut(&mut self, id: PropertyId) -> &mut PropertyDef {
        &mut self.properties[id.index()]
    }

    /// Full name of a definition with its nested path (`Ns.Outer/Inner`).
    #[must_use]
    pub fn full_name(&self, id: TypeId) -> String {
        let def = self.type_def(id);
        match def.enclosing {
            Some(parent) => format!("{}/{}", self.full_name(parent), def.name),
            None => def.simple_full_name(),
        }
    }

    /// Look a definition up by full name.
    #[must_use]
    pub fn lookup(&self, full_name: &str) -> Option<TypeId> {
        self.name_index.get(full_name).copied()
    }

    /// Top-level definitions in declaration order - the deterministic
    /// traversal order of the merge.
    #[must_use]
    pub fn top_level_types(&self) -> &[TypeId] {
        &self.top_level
    }

    /// All type ids in arena order.
    pub fn type_ids(&self) -> impl Iterator<Item = TypeId> {
        (0..self.types.len() as u32).map(TypeId::new)
    }

    /// All method ids in arena order.
    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> {
        (0..self.methods.len() as u32).map(MethodId::new)
    }

    /// All field ids in arena order.
    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> {
        (0..self.fields.len() as u32).map(FieldId::new)
    }

    /// All event ids in arena order.
    pub fn event_ids(&self) -> impl Iterator<Item = EventId> {
        (0..self.events.len() as u32).map(EventId::new)
    }

    /// All property ids in arena order.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> {
        (0..self.properties.len() as u32).map(PropertyId::new)
    }

    /// Number of type definitions.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Rename a definition, re-keying it and its whole nested subtree in the
    /// full-name index. Namespace and enclosing relationship are unchanged.
    pub fn rename_type(&mut self, id: TypeId, new_name: &str) {
        let mut subtree = Vec::new();
        self.collect_subtree(id, &mut subtree);
        for member in &subtree {
            let old_key = self.full_name(*member);
            self.name_index.remove(&old_key);
        }
        self.types[id.index()].name = new_name.to_string();
        for member in subtree {
            let new_key = self.full_name(member);
            self.name_index.insert(new_key, member);
        }
    }

    fn collect_subtree(&self, id: TypeId, out: &mut Vec<TypeId>) {
        out.push(id);
        for nested in &self.type_def(id).nested {
            self.collect_subtree(*nested, out);
        }
    }

    /// Append an assembly reference unless one with the same name exists.
    pub fn add_assembly_ref(&mut self, identity: AssemblyIdentity) {
        if !self
            .assembly_refs
            .iter()
            .any(|existing| existing.name == identity.name)
        {
            self.assembly_refs.push(identity);
        }
    }

    /// Append a module reference unless one with the same name exists.
    pub fn add_module_ref(&mut self, name: &str) {
        if !self.module_refs.iter().any(|existing| existing == name) {
            self.module_refs.push(name.to_string());
        }
    }

    /// Append a resource blob; returns `false` when the name is already taken
    /// and the blob was not added.
    pub fn add_resource(&mut self, blob: DataBlob) -> bool {
        if self
            .resources
            .iter()
            .any(|existing| existing.name == blob.name)
        {
            return false;
        }
        self.resources.push(blob);
        true
    }

    /// A symbolic mention of one of this graph's own definitions, as seen from
    /// another graph: scope claims this assembly, nested path preserved.
    #[must_use]
    pub fn make_named_ref(&self, id: TypeId) -> TypeRef {
        let def = self.type_def(id);
        match def.enclosing {
            Some(parent) => TypeRef::nested(self.make_named_ref(parent), &def.name),
            None => TypeRef::named(
                ReferenceScope::Assembly(self.assembly.identity.clone()),
                &def.namespace,
                &def.name,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::identity::AssemblyVersion;
    use crate::metadata::typesystem::TypeVisibility;

    fn graph() -> ModuleGraph {
        ModuleGraph::new(AssemblyIdentity::new("TestLib", AssemblyVersion::new(1, 0, 0, 0)))
    }

    #[test]
    fn test_add_and_lookup() {
        let mut graph = graph();
        let id = graph
            .add_type(TypeDef::new("Ns", "A", TypeVisibility::PUBLIC.bits()))
            .unwrap();
        assert_eq!(graph.lookup("Ns.A"), Some(id));
        assert_eq!(graph.full_name(id), "Ns.A");
        assert_eq!(graph.top_level_types(), &[id]);
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut graph = graph();
        graph.add_type(TypeDef::new("Ns", "A", 0)).unwrap();
        assert!(graph.add_type(TypeDef::new("Ns", "A", 0)).is_err());
    }

    #[test]
    fn test_nested_full_name() {
        let mut graph = graph();
        let outer = graph.add_type(TypeDef::new("Ns", "Outer", 0)).unwrap();
        let mut inner = TypeDef::new("", "Inner", TypeVisibility::NESTED_PRIVATE.bits());
        inner.enclosing = Some(outer);
        let inner = graph.add_type(inner).unwrap();

        assert_eq!(graph.full_name(inner), "Ns.Outer/Inner");
        assert_eq!(graph.lookup("Ns.Outer/Inner"), Some(inner));
        assert_eq!(graph.type_def(outer).nested, vec![inner]);
        assert!(!graph.top_level_types().contains(&inner));
    }

    #[test]
    fn test_rename_rekeys_subtree() {
        let mut graph = graph();
        let outer = graph.add_type(TypeDef::new("Ns", "Outer", 0)).unwrap();
        let mut inner = TypeDef::new("", "Inner", 0);
        inner.enclosing = Some(outer);
        let inner = graph.add_type(inner).unwrap();

        graph.rename_type(outer, "Outer_LibB");
        assert_eq!(graph.lookup("Ns.Outer"), None);
        assert_eq!(graph.lookup("Ns.Outer/Inner"), None);
        assert_eq!(graph.lookup("Ns.Outer_LibB"), Some(outer));
        assert_eq!(graph.lookup("Ns.Outer_LibB/Inner"), Some(inner));
    }

    #[test]
    fn test_reference_dedup() {
        let mut graph = graph();
        graph.add_assembly_ref(AssemblyIdentity::new("mscorlib", AssemblyVersion::new(4, 0, 0, 0)));
        graph.add_assembly_ref(AssemblyIdentity::new("mscorlib", AssemblyVersion::new(2, 0, 0, 0)));
        assert_eq!(graph.assembly_refs.len(), 1);

        graph.add_module_ref("kernel32.dll");
        graph.add_module_ref("kernel32.dll");
        assert_eq!(graph.module_refs.len(), 1);
    }

    #[test]
    fn test_make_named_ref_preserves_nesting() {
        let mut graph = graph();
        let outer = graph.add_type(TypeDef::new("Ns", "Outer", 0)).unwrap();
        let mut inner = TypeDef::new("", "Inner", 0);
        inner.enclosing = Some(outer);
        let inner = graph.add_type(inner).unwrap();

        match graph.make_named_ref(inner) {
            TypeRef::Named(named) => {
                assert_eq!(named.full_name().as_deref(), Some("Ns.Outer/Inner"));
                assert_eq!(named.scope_name(), Some("TestLib"));
            }
            other => panic!("expected named mention, got {other:?}"),
        }
    }
}
