//! Type definitions: the owned nodes of a module graph.
//!
//! A [`TypeDef`] owns its members by id, its generic parameters and attributes by
//! value, and mentions everything else through [`TypeRef`]s. Raw ECMA-335 attribute
//! flags are stored verbatim; typed accessors extract the visibility and modifier
//! groups the merge engine actually inspects.
//!
//! # Key Types
//! - [`TypeDef`] - a type definition and its owned members
//! - [`TypeVisibility`] / [`TypeModifiers`] - extracted attribute flag groups
//! - [`GenericParam`] - a generic parameter with constraints and attributes
//! - [`TypeLayout`] - explicit packing/size layout info

use bitflags::bitflags;

use crate::metadata::{
    attributes::{CustomAttribute, SecurityDeclaration},
    token::{EventId, FieldId, MethodId, PropertyId, TypeId},
    typesystem::TypeRef,
};

/// Bitmask for visibility extraction from raw type attributes
pub const TYPE_VISIBILITY_MASK: u32 = 0x0000_0007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Type visibility flags
    pub struct TypeVisibility: u32 {
        /// Not visible outside the assembly
        const NOT_PUBLIC = 0x0000_0000;
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested, visible wherever the enclosing type is
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested, visible only to the enclosing type
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested, visible to sub-types of the enclosing type
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested, visible within the assembly
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested, visible to sub-types within the assembly
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested, visible to sub-types or within the assembly
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
    }
}

impl TypeVisibility {
    /// Extract visibility from raw type attributes
    #[must_use]
    pub fn from_type_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & TYPE_VISIBILITY_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Type semantics and modifier flags
    pub struct TypeModifiers: u32 {
        /// Type is an interface, otherwise a class
        const INTERFACE = 0x0000_0020;
        /// Type cannot be instantiated
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
        /// Type name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Type is imported
        const IMPORT = 0x0000_1000;
        /// Type can be serialized
        const SERIALIZABLE = 0x0000_2000;
        /// CLI provides special behavior, depending upon the name of the type
        const RT_SPECIAL_NAME = 0x0000_0800;
        /// Initialize the type before first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// Type has security associated with it
        const HAS_SECURITY = 0x0004_0000;
    }
}

impl TypeModifiers {
    /// Extract modifiers from raw type attributes
    #[must_use]
    pub fn from_type_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !TYPE_VISIBILITY_MASK)
    }
}

/// Explicit layout information for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLayout {
    /// Field packing alignment
    pub packing_size: u16,
    /// Total size of the type in bytes
    pub class_size: u32,
}

/// A generic parameter declared by a type or method.
///
/// Generic parameters are owned by their declaring definition; mentions of them
/// inside signatures are positional ([`TypeRef::GenericParam`]), so cloning a
/// declaration never invalidates the mentions.
#[derive(Debug, Clone, Default)]
pub struct GenericParam {
    /// Parameter name (e.g. "T")
    pub name: String,
    /// Raw variance/constraint attribute flags
    pub flags: u16,
    /// Constraint type mentions
    pub constraints: Vec<TypeRef>,
    /// Custom attributes applied to the parameter
    pub custom_attributes: Vec<CustomAttribute>,
}

impl GenericParam {
    /// Create a named parameter with no constraints.
    #[must_use]
    pub fn new(name: &str) -> Self {
        GenericParam {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// A type definition owned by a module graph.
///
/// Identified by (namespace, name, enclosing type or none); within one graph
/// that triple is unique among definitions - the invariant the merge engine
/// exists to preserve across the union of its inputs.
#[derive(Debug, Clone, Default)]
pub struct TypeDef {
    /// Namespace; empty for nested types and the module type
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Raw ECMA-335 type attributes
    pub flags: u32,
    /// Base type mention, `None` for interfaces and `System.Object` itself
    pub base: Option<TypeRef>,
    /// Implemented interface mentions
    pub interfaces: Vec<TypeRef>,
    /// Enclosing type for nested definitions
    pub enclosing: Option<TypeId>,
    /// Nested type definitions, in declaration order
    pub nested: Vec<TypeId>,
    /// Generic parameters, in declaration order
    pub generic_params: Vec<GenericParam>,
    /// Owned fields
    pub fields: Vec<FieldId>,
    /// Owned methods
    pub methods: Vec<MethodId>,
    /// Owned events
    pub events: Vec<EventId>,
    /// Owned properties
    pub properties: Vec<PropertyId>,
    /// Explicit layout, if any
    pub layout: Option<TypeLayout>,
    /// Custom attributes applied to the type
    pub custom_attributes: Vec<CustomAttribute>,
    /// Declarative security attached to the type
    pub security: Vec<SecurityDeclaration>,
}

impl TypeDef {
    /// Create an empty definition with the given identity and raw flags.
    #[must_use]
    pub fn new(namespace: &str, name: &str, flags: u32) -> Self {
        TypeDef {
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags,
            ..Default::default()
        }
    }

    /// Extracted visibility group of the raw flags.
    #[must_use]
    pub fn visibility(&self) -> TypeVisibility {
        TypeVisibility::from_type_flags(self.flags)
    }

    /// Overwrite the visibility group, leaving all other flags untouched.
    pub fn set_visibility(&mut self, visibility: TypeVisibility) {
        self.flags = (self.flags & !TYPE_VISIBILITY_MASK) | visibility.bits();
    }

    /// Returns `true` for `Public` and `NestedPublic` definitions.
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(
            self.visibility(),
            TypeVisibility::PUBLIC | TypeVisibility::NESTED_PUBLIC
        )
    }

    /// Returns `true` when the definition is nested inside another type.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.enclosing.is_some()
    }

    /// Returns `true` for interface definitions.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        TypeModifiers::from_type_flags(self.flags).contains(TypeModifiers::INTERFACE)
    }

    /// Reduce visibility after merging: `Public` becomes `NotPublic`,
    /// `NestedPublic` becomes `NestedAssembly`. Other visibilities are
    /// already assembly-local and stay as they are.
    pub fn internalize(&mut self) {
        match self.visibility() {
            TypeVisibility::PUBLIC => self.set_visibility(TypeVisibility::NOT_PUBLIC),
            TypeVisibility::NESTED_PUBLIC => self.set_visibility(TypeVisibility::NESTED_ASSEMBLY),
            _ => {}
        }
    }

    /// `Namespace.Name` without the nesting chain; use
    /// [`crate::metadata::graph::ModuleGraph::full_name`] for the full path.
    #[must_use]
    pub fn simple_full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}
