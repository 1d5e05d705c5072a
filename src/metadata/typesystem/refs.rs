//! Symbolic references between definitions: mentions, not owners.
//!
//! A reference names a type, method or field that may live in the same graph, in
//! another merged input, or in an external assembly. References are plain values
//! forming a closed tagged enumeration; every import/fix-up routine dispatches
//! exhaustively over the variants, which the compiler verifies. Composite shapes
//! (array, pointer, byref, pinned, sentinel, modifier, generic instance) wrap
//! element references and are always rebuilt around a changed element, never
//! mutated in place, because the wrapper kinds are structurally distinct.
//!
//! # Key Types
//! - [`TypeRef`] - a type mention, resolved ([`TypeRef::Definition`]) or symbolic
//! - [`NamedTypeRef`] - scope + namespace + name payload of a symbolic mention
//! - [`MethodRef`] / [`FieldRef`] - member mentions carrying their declaring type
//! - [`ArrayDimension`] - per-dimension size/bound data for general arrays
//!
//! Resolution state is part of the value: [`TypeRef::Definition`] denotes an entry
//! in the owning graph's arena, everything else is a mention the reference fixator
//! may still rewrite.

use crate::metadata::{
    identity::ReferenceScope,
    token::{FieldId, MethodId, TypeId},
};

/// A single dimension of a general (non-vector) array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArrayDimension {
    /// The size of this dimension, if bounded
    pub size: Option<u32>,
    /// The lower bound of this dimension (lowest index that can be used to access an element)
    pub lower_bound: Option<u32>,
}

/// The scope portion of a named type mention.
///
/// Nested-type mentions do not carry an assembly scope of their own; they point
/// at their enclosing type's mention, which the fixator resolves first.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRefScope {
    /// Top-level mention, resolved against the named assembly/module scope.
    Scope(ReferenceScope),
    /// Nested mention; the wrapped reference names the enclosing type.
    Nested(Box<TypeRef>),
}

/// Scope + namespace + name payload of a symbolic type mention.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTypeRef {
    /// Where the mentioned type nominally lives.
    pub scope: TypeRefScope,
    /// Namespace of the mentioned type; empty for nested mentions.
    pub namespace: String,
    /// Simple name of the mentioned type.
    pub name: String,
}

impl NamedTypeRef {
    /// The scope name of the outermost enclosing mention.
    ///
    /// Returns `None` when an enclosing link is already resolved to a
    /// definition (the scope claim no longer applies).
    #[must_use]
    pub fn scope_name(&self) -> Option<&str> {
        match &self.scope {
            TypeRefScope::Scope(scope) => Some(scope.name()),
            TypeRefScope::Nested(enclosing) => match enclosing.as_ref() {
                TypeRef::Named(named) => named.scope_name(),
                _ => None,
            },
        }
    }

    /// Full name with the nested path rendered ECMA-style (`Ns.Outer/Inner`).
    ///
    /// Returns `None` when an enclosing link is not a named mention; rendering
    /// those requires the owning graph.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match &self.scope {
            TypeRefScope::Scope(_) => {
                if self.namespace.is_empty() {
                    Some(self.name.clone())
                } else {
                    Some(format!("{}.{}", self.namespace, self.name))
                }
            }
            TypeRefScope::Nested(enclosing) => match enclosing.as_ref() {
                TypeRef::Named(named) => {
                    named.full_name().map(|outer| format!("{}/{}", outer, self.name))
                }
                _ => None,
            },
        }
    }
}

/// A type mention.
///
/// `Definition` is the resolved form: an index into the owning graph's type
/// arena. All other variants are symbolic and subject to rewriting by the
/// import engine and the reference fixator.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// Resolved mention of a definition in the owning graph.
    Definition(TypeId),
    /// Symbolic mention by scope and name.
    Named(Box<NamedTypeRef>),
    /// Positional generic parameter (`!n` for type, `!!n` for method parameters).
    GenericParam {
        /// Index in the declaring generic parameter list
        index: u32,
        /// Whether it's a method parameter (true) or type parameter (false)
        method: bool,
    },
    /// Array of an element type.
    Array {
        /// The element type
        element: Box<TypeRef>,
        /// The rank (number of dimensions)
        rank: u32,
        /// Details about each dimension
        dimensions: Vec<ArrayDimension>,
    },
    /// Unmanaged pointer to an element type.
    Pointer(Box<TypeRef>),
    /// Managed by-reference to an element type.
    ByRef(Box<TypeRef>),
    /// Pinned local wrapper.
    Pinned(Box<TypeRef>),
    /// Vararg sentinel wrapper.
    Sentinel(Box<TypeRef>),
    /// Custom-modified element type.
    Modified {
        /// Required (`modreq`) or optional (`modopt`) modifier
        required: bool,
        /// The modifier type
        modifier: Box<TypeRef>,
        /// The modified element type
        element: Box<TypeRef>,
    },
    /// Generic instantiation of an open type.
    GenericInstance {
        /// The open generic type being instantiated
        element: Box<TypeRef>,
        /// The type arguments
        args: Vec<TypeRef>,
    },
}

impl TypeRef {
    /// Symbolic mention of a top-level type in the given scope.
    #[must_use]
    pub fn named(scope: ReferenceScope, namespace: &str, name: &str) -> Self {
        TypeRef::Named(Box::new(NamedTypeRef {
            scope: TypeRefScope::Scope(scope),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }))
    }

    /// Symbolic mention of a type nested inside `enclosing`.
    #[must_use]
    pub fn nested(enclosing: TypeRef, name: &str) -> Self {
        TypeRef::Named(Box::new(NamedTypeRef {
            scope: TypeRefScope::Nested(Box::new(enclosing)),
            namespace: String::new(),
            name: name.to_string(),
        }))
    }

    /// Single-dimensional zero-based array of `element`.
    #[must_use]
    pub fn vector(element: TypeRef) -> Self {
        TypeRef::Array {
            element: Box::new(element),
            rank: 1,
            dimensions: vec![ArrayDimension::default()],
        }
    }

    /// Returns the definition id if this mention is resolved.
    #[must_use]
    pub fn as_definition(&self) -> Option<TypeId> {
        match self {
            TypeRef::Definition(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns `true` for a resolved mention.
    #[must_use]
    pub fn is_definition(&self) -> bool {
        matches!(self, TypeRef::Definition(_))
    }
}

/// Calling convention of a method signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingConvention {
    /// Standard managed call
    #[default]
    Default,
    /// Managed vararg call
    VarArg,
}

/// Signature payload of a symbolic method mention.
///
/// Carries the full shape (declaring type, return type, parameter types,
/// generic arity) so structural matching can rebind the mention to a cloned
/// definition after the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedMethodRef {
    /// The type declaring the mentioned method.
    pub declaring: TypeRef,
    /// Method name.
    pub name: String,
    /// Whether the method has an implicit `this` parameter.
    pub has_this: bool,
    /// Calling convention.
    pub call_conv: CallingConvention,
    /// Number of generic parameters the mentioned method declares.
    pub generic_arity: u32,
    /// Return type.
    pub return_type: TypeRef,
    /// Parameter types in order.
    pub params: Vec<TypeRef>,
}

/// A method mention, resolved or symbolic.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodRef {
    /// Resolved mention of a method definition in the owning graph.
    Definition(MethodId),
    /// Symbolic mention by declaring type, name and signature.
    Named(Box<NamedMethodRef>),
}

impl MethodRef {
    /// Returns the definition id if this mention is resolved.
    #[must_use]
    pub fn as_definition(&self) -> Option<MethodId> {
        match self {
            MethodRef::Definition(id) => Some(*id),
            MethodRef::Named(_) => None,
        }
    }
}

/// Payload of a symbolic field mention.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFieldRef {
    /// The type declaring the mentioned field.
    pub declaring: TypeRef,
    /// Field name.
    pub name: String,
    /// Field type.
    pub field_type: TypeRef,
}

/// A field mention, resolved or symbolic.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    /// Resolved mention of a field definition in the owning graph.
    Definition(FieldId),
    /// Symbolic mention by declaring type, name and field type.
    Named(Box<NamedFieldRef>),
}

impl FieldRef {
    /// Returns the definition id if this mention is resolved.
    #[must_use]
    pub fn as_definition(&self) -> Option<FieldId> {
        match self {
            FieldRef::Definition(id) => Some(*id),
            FieldRef::Named(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::identity::{AssemblyIdentity, AssemblyVersion};

    fn corlib() -> ReferenceScope {
        ReferenceScope::Assembly(AssemblyIdentity::new(
            "mscorlib",
            AssemblyVersion::new(4, 0, 0, 0),
        ))
    }

    #[test]
    fn test_named_full_name() {
        let object = TypeRef::named(corlib(), "System", "Object");
        match &object {
            TypeRef::Named(named) => {
                assert_eq!(named.full_name().as_deref(), Some("System.Object"));
                assert_eq!(named.scope_name(), Some("mscorlib"));
            }
            _ => panic!("Expected Named variant"),
        }
    }

    #[test]
    fn test_nested_full_name() {
        let outer = TypeRef::named(corlib(), "System", "Environment");
        let inner = TypeRef::nested(outer, "SpecialFolder");
        match &inner {
            TypeRef::Named(named) => {
                assert_eq!(
                    named.full_name().as_deref(),
                    Some("System.Environment/SpecialFolder")
                );
                assert_eq!(named.scope_name(), Some("mscorlib"));
            }
            _ => panic!("Expected Named variant"),
        }
    }

    #[test]
    fn test_nested_over_definition_has_no_name() {
        let inner = TypeRef::nested(TypeRef::Definition(TypeId::new(3)), "Inner");
        match &inner {
            TypeRef::Named(named) => {
                assert_eq!(named.full_name(), None);
                assert_eq!(named.scope_name(), None);
            }
            _ => panic!("Expected Named variant"),
        }
    }

    #[test]
    fn test_vector_shape() {
        let array = TypeRef::vector(TypeRef::named(corlib(), "System", "Int32"));
        match array {
            TypeRef::Array {
                rank, dimensions, ..
            } => {
                assert_eq!(rank, 1);
                assert_eq!(dimensions.len(), 1);
                assert_eq!(dimensions[0], ArrayDimension::default());
            }
            _ => panic!("Expected Array variant"),
        }
    }

    #[test]
    fn test_as_definition() {
        assert_eq!(
            TypeRef::Definition(TypeId::new(7)).as_definition(),
            Some(TypeId::new(7))
        );
        assert_eq!(
            TypeRef::named(corlib(), "System", "Object").as_definition(),
            None
        );
    }
}
