//! # dotfuse Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! from the dotfuse library. Import this module to get quick access to the
//! essential types for merging .NET modules.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotfuse operations
pub use crate::Error;

/// The result type used throughout dotfuse
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Orchestrates a complete merge run
pub use crate::merge::{MergeOptions, MergeSession};

/// Merge engine components for fine-grained use
pub use crate::merge::{
    AttributePolicy, IdentityMapper, ImportContext, ImportEngine, PlatformFixer, ReferenceFixer,
    RenameRecord,
};

// ================================================================================================
// Object Model
// ================================================================================================

/// The module graph and its manifest tables
pub use crate::metadata::graph::{AssemblyInfo, DataBlob, ExportedType, ModuleGraph};

/// Typed arena ids
pub use crate::metadata::token::{EventId, FieldId, MethodId, PropertyId, TypeId};

/// Assembly identities and reference scopes
pub use crate::metadata::identity::{
    AssemblyIdentity, AssemblyVersion, IdentityKey, ReferenceScope,
};

/// Type definitions and mentions
pub use crate::metadata::typesystem::{
    ArrayDimension, CallingConvention, FieldRef, GenericParam, MethodRef, NamedFieldRef,
    NamedMethodRef, NamedTypeRef, TypeDef, TypeModifiers, TypeRef, TypeRefScope, TypeVisibility,
};

/// Member definitions
pub use crate::metadata::members::{EventDef, FieldDef, PropertyDef};

/// Method definitions and bodies
pub use crate::metadata::method::{
    ExceptionHandler, HandlerKind, Immediate, Instruction, LocalVariable, MethodAccessFlags,
    MethodBody, MethodDef, MethodModifiers, MethodVtableFlags, Operand, ParamDef, PInvokeInfo,
};

/// Custom attributes and security
pub use crate::metadata::attributes::{
    CaArgument, CaNamedArgument, CaValue, CustomAttribute, SecurityAttribute, SecurityDeclaration,
};

/// Diagnostics
pub use crate::metadata::diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics,
};

// ================================================================================================
// Construction and External Seams
// ================================================================================================

/// Programmatic graph construction
pub use crate::build::{BodyBuilder, ClassBuilder, MethodBuilder, ModuleGraphBuilder};

/// External collaborator traits
pub use crate::project::{AssemblyResolver, GraphLoader, GraphWriter};
