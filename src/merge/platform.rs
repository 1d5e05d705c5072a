//! Platform baseline fix-up of external reference scopes.
//!
//! When the merged output targets a different runtime baseline than (some of)
//! its inputs, every reference into an external assembly is retargeted to the
//! platform-specific copy of that assembly. The fixer resolves each assembly
//! once through the session's [`crate::project::AssemblyResolver`] and caches
//! the result by assembly name; composite wrappers and member signatures are
//! rebuilt recursively around fixed elements.
//!
//! The fixer is a no-op when no platform baseline is configured, degrades to a
//! no-op (with a diagnostic) for assemblies the resolver cannot locate, and is
//! idempotent: fixing an already-fixed reference returns it unchanged.

use dashmap::DashMap;

use crate::{
    metadata::{
        diagnostics::{DiagnosticCategory, Diagnostics},
        identity::{AssemblyIdentity, ReferenceScope},
        typesystem::{
            FieldRef, MethodRef, NamedFieldRef, NamedMethodRef, NamedTypeRef, TypeRef,
            TypeRefScope,
        },
    },
    project::AssemblyResolver,
};

/// Rewrites external assembly scopes to a configured platform baseline.
///
/// Owned by one merge session; the resolver cache is constructed and torn down
/// with it, keeping repeated in-process merges isolated.
pub struct PlatformFixer<'a> {
    resolver: Option<&'a dyn AssemblyResolver>,
    diagnostics: &'a Diagnostics,
    /// assembly name -> platform identity; `None` caches a failed resolution
    cache: DashMap<String, Option<AssemblyIdentity>>,
}

impl<'a> PlatformFixer<'a> {
    /// Create a fixer backed by the given resolver. Passing `None` produces
    /// the disabled fixer used when no platform baseline is configured.
    #[must_use]
    pub fn new(resolver: Option<&'a dyn AssemblyResolver>, diagnostics: &'a Diagnostics) -> Self {
        PlatformFixer {
            resolver,
            diagnostics,
            cache: DashMap::new(),
        }
    }

    /// Whether a platform baseline is configured at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.resolver.is_some()
    }

    /// The platform identity for an assembly name, resolved once and cached.
    fn platform_identity(&self, identity: &AssemblyIdentity) -> Option<AssemblyIdentity> {
        let resolver = self.resolver?;
        if let Some(cached) = self.cache.get(&identity.name) {
            return cached.value().clone();
        }
        let resolved = match resolver.resolve(identity) {
            Ok(graph) => Some(graph.assembly.identity.clone()),
            Err(_) => {
                self.diagnostics.warning(
                    DiagnosticCategory::PlatformFix,
                    format!(
                        "no platform copy of {} found, reference left untouched",
                        identity.name
                    ),
                );
                None
            }
        };
        self.cache.insert(identity.name.clone(), resolved.clone());
        resolved
    }

    /// Fix a type mention against the platform baseline.
    ///
    /// Wrappers are rebuilt around the fixed element; a nested mention fixes
    /// its enclosing mention first. Definitions and generic parameters are
    /// returned unchanged.
    #[must_use]
    pub fn fix_type(&self, reference: &TypeRef) -> TypeRef {
        if !self.is_active() {
            return reference.clone();
        }
        match reference {
            TypeRef::Definition(_) | TypeRef::GenericParam { .. } => reference.clone(),
            TypeRef::Named(named) => {
                let scope = match &named.scope {
                    TypeRefScope::Scope(ReferenceScope::Assembly(identity)) => {
                        match self.platform_identity(identity) {
                            Some(platform) if platform != *identity => {
                                TypeRefScope::Scope(ReferenceScope::Assembly(platform))
                            }
                            _ => named.scope.clone(),
                        }
                    }
                    TypeRefScope::Scope(_) => named.scope.clone(),
                    TypeRefScope::Nested(enclosing) => {
                        TypeRefScope::Nested(Box::new(self.fix_type(enclosing)))
                    }
                };
                TypeRef::Named(Box::new(NamedTypeRef {
                    scope,
                    namespace: named.namespace.clone(),
                    name: named.name.clone(),
                }))
            }
            TypeRef::Array {
                element,
                rank,
                dimensions,
            } => TypeRef::Array {
                element: Box::new(self.fix_type(element)),
                rank: *rank,
                dimensions: dimensions.clone(),
            },
            TypeRef::Pointer(element) => TypeRef::Pointer(Box::new(self.fix_type(element))),
            TypeRef::ByRef(element) => TypeRef::ByRef(Box::new(self.fix_type(element))),
            TypeRef::Pinned(element) => TypeRef::Pinned(Box::new(self.fix_type(element))),
            TypeRef::Sentinel(element) => TypeRef::Sentinel(Box::new(self.fix_type(element))),
            TypeRef::Modified {
                required,
                modifier,
                element,
            } => TypeRef::Modified {
                required: *required,
                modifier: Box::new(self.fix_type(modifier)),
                element: Box::new(self.fix_type(element)),
            },
            TypeRef::GenericInstance { element, args } => TypeRef::GenericInstance {
                element: Box::new(self.fix_type(element)),
                args: args.iter().map(|arg| self.fix_type(arg)).collect(),
            },
        }
    }

    /// Fix a method mention, rebuilding its full signature (declaring type,
    /// return type, parameter types) through the type fixer.
    #[must_use]
    pub fn fix_method_ref(&self, reference: &MethodRef) -> MethodRef {
        match reference {
            MethodRef::Definition(_) => reference.clone(),
            MethodRef::Named(named) => {
                if !self.is_active() {
                    return reference.clone();
                }
                MethodRef::Named(Box::new(NamedMethodRef {
                    declaring: self.fix_type(&named.declaring),
                    name: named.name.clone(),
                    has_this: named.has_this,
                    call_conv: named.call_conv,
                    generic_arity: named.generic_arity,
                    return_type: self.fix_type(&named.return_type),
                    params: named.params.iter().map(|param| self.fix_type(param)).collect(),
                }))
            }
        }
    }

    /// Fix a field mention, rebuilding its declaring type and field type.
    #[must_use]
    pub fn fix_field_ref(&self, reference: &FieldRef) -> FieldRef {
        match reference {
            FieldRef::Definition(_) => reference.clone(),
            FieldRef::Named(named) => {
                if !self.is_active() {
                    return reference.clone();
                }
                FieldRef::Named(Box::new(NamedFieldRef {
                    declaring: self.fix_type(&named.declaring),
                    name: named.name.clone(),
                    field_type: self.fix_type(&named.field_type),
                }))
            }
        }
    }
}
