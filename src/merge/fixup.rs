//! The reference fixator: second pass tying every surviving mention to an
//! output definition.
//!
//! Runs strictly after the import engine has populated the output graph. Every
//! definition is visited once; each reachable mention (base types, interfaces,
//! member types, parameter/return/local types, instruction operands, generic
//! constraints, attribute argument types, security attribute types, the
//! exported-type table, the entry point) is rewritten:
//!
//! - a mention that already denotes a definition is returned unchanged;
//! - composite wrappers are rebuilt, same kind, around the fixed element;
//! - a nested mention fixes its enclosing mention first, then re-looks the
//!   nested definition up by name inside it;
//! - otherwise the identity map is consulted (so mentions into displaced
//!   definitions keep following their source identity), then the output
//!   module's full-name index; unresolved mentions stay external.
//!
//! Method/field mentions whose declaring type resolved to a definition are
//! bound to a structurally equal member. Virtual methods are then corrected to
//! the accessibility of their deepest resolvable ancestor override target, and
//! assembly-reference entries naming merged inputs are removed - their symbols
//! are satisfied internally now.
//!
//! Definitions address each other by arena index, so the traversal itself
//! cannot cycle; the only guarded walk is the base-type chain of the
//! accessibility correction, which a malformed input could make circular.

use std::collections::HashSet;

use crate::{
    merge::{compare, dedup::IdentityMapper},
    metadata::{
        attributes::{
            CaArgument, CaNamedArgument, CaValue, CustomAttribute, SecurityAttribute,
            SecurityDeclaration,
        },
        diagnostics::{DiagnosticCategory, Diagnostics},
        graph::ModuleGraph,
        identity::IdentityKey,
        method::body::{HandlerKind, Operand},
        token::MethodId,
        typesystem::{
            FieldRef, GenericParam, MethodRef, NamedFieldRef, NamedMethodRef, NamedTypeRef,
            TypeRef, TypeRefScope,
        },
    },
};

/// Rewrites all mentions in a populated output graph to point at its own
/// definitions wherever they resolve.
pub struct ReferenceFixer<'a> {
    mapper: &'a IdentityMapper,
    diagnostics: &'a Diagnostics,
    /// Scope names of the merged input modules.
    merged_scopes: HashSet<String>,
}

impl<'a> ReferenceFixer<'a> {
    /// Create a fixer for a merge whose inputs had the given scope names.
    #[must_use]
    pub fn new(
        mapper: &'a IdentityMapper,
        diagnostics: &'a Diagnostics,
        merged_scopes: HashSet<String>,
    ) -> Self {
        ReferenceFixer {
            mapper,
            diagnostics,
            merged_scopes,
        }
    }

    /// Fix every reachable mention in the graph, correct virtual-method
    /// accessibility, retire satisfied exported types and prune assembly
    /// references to merged inputs.
    pub fn fix_references(&self, graph: &mut ModuleGraph) {
        for tid in graph.type_ids().collect::<Vec<_>>() {
            let mut def = graph.type_def(tid).clone();
            def.base = def.base.as_ref().map(|base| self.fix_type_ref(graph, base));
            def.interfaces = def
                .interfaces
                .iter()
                .map(|interface| self.fix_type_ref(graph, interface))
                .collect();
            def.generic_params = self.fix_generic_params(graph, &def.generic_params);
            def.custom_attributes = self.fix_custom_attributes(graph, &def.custom_attributes);
            def.security = self.fix_security(graph, &def.security);
            *graph.type_def_mut(tid) = def;
        }

        for fid in graph.field_ids().collect::<Vec<_>>() {
            let mut def = graph.field_def(fid).clone();
            def.field_type = self.fix_type_ref(graph, &def.field_type);
            def.constant = def.constant.map(|value| self.fix_ca_value(graph, value));
            def.custom_attributes = self.fix_custom_attributes(graph, &def.custom_attributes);
            *graph.field_def_mut(fid) = def;
        }

        for mid in graph.method_ids().collect::<Vec<_>>() {
            let mut def = graph.method_def(mid).clone();
            def.return_type = self.fix_type_ref(graph, &def.return_type);
            for param in &mut def.params {
                param.param_type = self.fix_type_ref(graph, &param.param_type);
            }
            def.generic_params = self.fix_generic_params(graph, &def.generic_params);
            def.overrides = def
                .overrides
                .iter()
                .map(|target| self.fix_method_ref(graph, target))
                .collect();
            def.custom_attributes = self.fix_custom_attributes(graph, &def.custom_attributes);
            def.security = self.fix_security(graph, &def.security);
            if let Some(body) = &mut def.body {
                for local in &mut body.locals {
                    local.var_type = self.fix_type_ref(graph, &local.var_type);
                }
                for instruction in &mut body.instructions {
                    instruction.operand = match &instruction.operand {
                        Operand::Field(field) => Operand::Field(self.fix_field_ref(graph, field)),
                        Operand::Method(method) => {
                            Operand::Method(self.fix_method_ref(graph, method))
                        }
                        Operand::Type(ty) => Operand::Type(self.fix_type_ref(graph, ty)),
                        other => other.clone(),
                    };
                }
                for handler in &mut body.handlers {
                    if let HandlerKind::Catch { catch_type } = &handler.kind {
                        handler.kind = HandlerKind::Catch {
                            catch_type: self.fix_type_ref(graph, catch_type),
                        };
                    }
                }
            }
            *graph.method_def_mut(mid) = def;
        }

        for eid in graph.event_ids().collect::<Vec<_>>() {
            let mut def = graph.event_def(eid).clone();
            def.event_type = self.fix_type_ref(graph, &def.event_type);
            def.custom_attributes = self.fix_custom_attributes(graph, &def.custom_attributes);
            *graph.event_def_mut(eid) = def;
        }

        for pid in graph.property_ids().collect::<Vec<_>>() {
            let mut def = graph.property_def(pid).clone();
            def.property_type = self.fix_type_ref(graph, &def.property_type);
            def.custom_attributes = self.fix_custom_attributes(graph, &def.custom_attributes);
            *graph.property_def_mut(pid) = def;
        }

        let manifest_attributes =
            self.fix_custom_attributes(graph, &graph.assembly.custom_attributes);
        graph.assembly.custom_attributes = manifest_attributes;
        let manifest_security = self.fix_security(graph, &graph.assembly.security);
        graph.assembly.security = manifest_security;

        let entry = graph
            .entry_point
            .clone()
            .map(|entry| self.fix_method_ref(graph, &entry));
        graph.entry_point = entry;

        self.retire_exported_types(graph);
        self.correct_virtual_accessibility(graph);
        self.prune_assembly_refs(graph);
    }

    /// Fix one type mention against the output graph.
    pub fn fix_type_ref(&self, graph: &ModuleGraph, reference: &TypeRef) -> TypeRef {
        match reference {
            // Already resolved; generic parameters are positional and their
            // constraints are fixed once at the declaring definition.
            TypeRef::Definition(_) | TypeRef::GenericParam { .. } => reference.clone(),
            TypeRef::Named(named) => match &named.scope {
                TypeRefScope::Nested(enclosing) => {
                    let fixed_enclosing = self.fix_type_ref(graph, enclosing);
                    if let Some(enclosing_tid) = fixed_enclosing.as_definition() {
                        let nested = graph
                            .type_def(enclosing_tid)
                            .nested
                            .iter()
                            .copied()
                            .find(|&candidate| graph.type_def(candidate).name == named.name);
                        if let Some(nested_tid) = nested {
                            return TypeRef::Definition(nested_tid);
                        }
                    }
                    TypeRef::Named(Box::new(NamedTypeRef {
                        scope: TypeRefScope::Nested(Box::new(fixed_enclosing)),
                        namespace: named.namespace.clone(),
                        name: named.name.clone(),
                    }))
                }
                TypeRefScope::Scope(scope) => {
                    let full_name = if named.namespace.is_empty() {
                        named.name.clone()
                    } else {
                        format!("{}.{}", named.namespace, named.name)
                    };
                    // Identity map first: a mention into a merged input must
                    // follow its source identity even if the definition has
                    // since been displaced to another name.
                    if let Some(tid) = self
                        .mapper
                        .lookup(&IdentityKey::new(scope.name(), &full_name))
                    {
                        return TypeRef::Definition(tid);
                    }
                    if let Some(tid) = graph.lookup(&full_name) {
                        return TypeRef::Definition(tid);
                    }
                    reference.clone()
                }
            },
            TypeRef::Array {
                element,
                rank,
                dimensions,
            } => TypeRef::Array {
                element: Box::new(self.fix_type_ref(graph, element)),
                rank: *rank,
                dimensions: dimensions.clone(),
            },
            TypeRef::Pointer(element) => {
                TypeRef::Pointer(Box::new(self.fix_type_ref(graph, element)))
            }
            TypeRef::ByRef(element) => TypeRef::ByRef(Box::new(self.fix_type_ref(graph, element))),
            TypeRef::Pinned(element) => {
                TypeRef::Pinned(Box::new(self.fix_type_ref(graph, element)))
            }
            TypeRef::Sentinel(element) => {
                TypeRef::Sentinel(Box::new(self.fix_type_ref(graph, element)))
            }
            TypeRef::Modified {
                required,
                modifier,
                element,
            } => TypeRef::Modified {
                required: *required,
                modifier: Box::new(self.fix_type_ref(graph, modifier)),
                element: Box::new(self.fix_type_ref(graph, element)),
            },
            TypeRef::GenericInstance { element, args } => TypeRef::GenericInstance {
                element: Box::new(self.fix_type_ref(graph, element)),
                args: args
                    .iter()
                    .map(|arg| self.fix_type_ref(graph, arg))
                    .collect(),
            },
        }
    }

    /// Fix a method mention; once the declaring type denotes a definition, the
    /// mention is bound to a structurally equal method definition.
    pub fn fix_method_ref(&self, graph: &ModuleGraph, reference: &MethodRef) -> MethodRef {
        let MethodRef::Named(named) = reference else {
            return reference.clone();
        };
        let fixed = NamedMethodRef {
            declaring: self.fix_type_ref(graph, &named.declaring),
            name: named.name.clone(),
            has_this: named.has_this,
            call_conv: named.call_conv,
            generic_arity: named.generic_arity,
            return_type: self.fix_type_ref(graph, &named.return_type),
            params: named
                .params
                .iter()
                .map(|param| self.fix_type_ref(graph, param))
                .collect(),
        };
        if let Some(declaring) = fixed.declaring.as_definition() {
            if let Some(found) = compare::find_method_for_ref(graph, declaring, &fixed) {
                return MethodRef::Definition(found);
            }
            self.diagnostics.warning(
                DiagnosticCategory::ReferenceFix,
                format!(
                    "no member of {} matches {}, mention left symbolic",
                    graph.full_name(declaring),
                    fixed.name
                ),
            );
        }
        MethodRef::Named(Box::new(fixed))
    }

    /// Fix a field mention; see [`ReferenceFixer::fix_method_ref`].
    pub fn fix_field_ref(&self, graph: &ModuleGraph, reference: &FieldRef) -> FieldRef {
        let FieldRef::Named(named) = reference else {
            return reference.clone();
        };
        let fixed = NamedFieldRef {
            declaring: self.fix_type_ref(graph, &named.declaring),
            name: named.name.clone(),
            field_type: self.fix_type_ref(graph, &named.field_type),
        };
        if let Some(declaring) = fixed.declaring.as_definition() {
            if let Some(found) = compare::find_field(graph, declaring, &fixed.name) {
                return FieldRef::Definition(found);
            }
            self.diagnostics.warning(
                DiagnosticCategory::ReferenceFix,
                format!(
                    "no field of {} named {}, mention left symbolic",
                    graph.full_name(declaring),
                    fixed.name
                ),
            );
        }
        FieldRef::Named(Box::new(fixed))
    }

    fn fix_generic_params(
        &self,
        graph: &ModuleGraph,
        params: &[GenericParam],
    ) -> Vec<GenericParam> {
        params
            .iter()
            .map(|param| GenericParam {
                name: param.name.clone(),
                flags: param.flags,
                constraints: param
                    .constraints
                    .iter()
                    .map(|constraint| self.fix_type_ref(graph, constraint))
                    .collect(),
                custom_attributes: self.fix_custom_attributes(graph, &param.custom_attributes),
            })
            .collect()
    }

    fn fix_custom_attributes(
        &self,
        graph: &ModuleGraph,
        attributes: &[CustomAttribute],
    ) -> Vec<CustomAttribute> {
        attributes
            .iter()
            .map(|attribute| CustomAttribute {
                constructor: self.fix_method_ref(graph, &attribute.constructor),
                fixed_args: attribute
                    .fixed_args
                    .iter()
                    .map(|argument| self.fix_ca_argument(graph, argument))
                    .collect(),
                named_args: attribute
                    .named_args
                    .iter()
                    .map(|argument| self.fix_ca_named_argument(graph, argument))
                    .collect(),
            })
            .collect()
    }

    fn fix_ca_argument(&self, graph: &ModuleGraph, argument: &CaArgument) -> CaArgument {
        CaArgument {
            arg_type: self.fix_type_ref(graph, &argument.arg_type),
            value: self.fix_ca_value(graph, argument.value.clone()),
        }
    }

    fn fix_ca_named_argument(
        &self,
        graph: &ModuleGraph,
        argument: &CaNamedArgument,
    ) -> CaNamedArgument {
        CaNamedArgument {
            is_field: argument.is_field,
            name: argument.name.clone(),
            argument: self.fix_ca_argument(graph, &argument.argument),
        }
    }

    fn fix_ca_value(&self, graph: &ModuleGraph, value: CaValue) -> CaValue {
        match value {
            CaValue::Type(ty) => CaValue::Type(self.fix_type_ref(graph, &ty)),
            CaValue::Enum { enum_type, value } => CaValue::Enum {
                enum_type: self.fix_type_ref(graph, &enum_type),
                value,
            },
            CaValue::Array(Some(elements)) => CaValue::Array(Some(
                elements
                    .iter()
                    .map(|element| self.fix_ca_argument(graph, element))
                    .collect(),
            )),
            other => other,
        }
    }

    fn fix_security(
        &self,
        graph: &ModuleGraph,
        declarations: &[SecurityDeclaration],
    ) -> Vec<SecurityDeclaration> {
        declarations
            .iter()
            .map(|declaration| SecurityDeclaration {
                action: declaration.action,
                attributes: declaration
                    .attributes
                    .iter()
                    .map(|attribute| SecurityAttribute {
                        attribute_type: self.fix_type_ref(graph, &attribute.attribute_type),
                        named_args: attribute
                            .named_args
                            .iter()
                            .map(|argument| self.fix_ca_named_argument(graph, argument))
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Drop exported-type entries whose target is now defined inside the
    /// output module.
    fn retire_exported_types(&self, graph: &mut ModuleGraph) {
        let exported = std::mem::take(&mut graph.exported_types);
        let mut kept = Vec::with_capacity(exported.len());
        for entry in exported {
            if graph.lookup(&entry.full_name()).is_some() {
                self.diagnostics.info(
                    DiagnosticCategory::AssemblyRef,
                    format!(
                        "exported type {} is now defined internally, entry dropped",
                        entry.full_name()
                    ),
                );
            } else {
                kept.push(entry);
            }
        }
        graph.exported_types = kept;
    }

    /// For every virtual method, find the deepest ancestor override target
    /// that resolves to a definition inside the output module; if that
    /// ancestor's accessibility differs, overwrite the method's accessibility
    /// to match it. A public abstract member must not end up shadowed by an
    /// internal override after internalization, and vice versa.
    fn correct_virtual_accessibility(&self, graph: &mut ModuleGraph) {
        for mid in graph.method_ids().collect::<Vec<_>>() {
            let def = graph.method_def(mid).clone();
            if !def.is_virtual() {
                continue;
            }
            let owner = graph.method_owner(mid);

            let mut deepest: Option<MethodId> = None;
            let mut visited = HashSet::new();
            visited.insert(owner);
            let mut current = graph.type_def(owner).base.clone();
            while let Some(base_ref) = current {
                let Some(base_tid) = base_ref.as_definition() else {
                    break;
                };
                // Cycle guard: a malformed input could close the base chain.
                if !visited.insert(base_tid) {
                    break;
                }
                let ancestor = graph
                    .type_def(base_tid)
                    .methods
                    .iter()
                    .copied()
                    .find(|&candidate| {
                        let candidate_def = graph.method_def(candidate);
                        candidate_def.is_virtual()
                            && compare::methods_equal(graph, candidate_def, graph, &def)
                    });
                if let Some(found) = ancestor {
                    deepest = Some(found);
                }
                current = graph.type_def(base_tid).base.clone();
            }

            if let Some(ancestor) = deepest {
                let ancestor_access = graph.method_def(ancestor).access;
                if def.access != ancestor_access {
                    self.diagnostics.info(
                        DiagnosticCategory::ReferenceFix,
                        format!(
                            "accessibility of {}::{} corrected to match its override ancestor",
                            graph.full_name(owner),
                            def.name
                        ),
                    );
                    graph.method_def_mut(mid).access = ancestor_access;
                }
            }
        }
    }

    /// Remove assembly-reference entries naming merged inputs; their symbols
    /// are satisfied internally now.
    fn prune_assembly_refs(&self, graph: &mut ModuleGraph) {
        let before = graph.assembly_refs.len();
        graph
            .assembly_refs
            .retain(|reference| !self.merged_scopes.contains(&reference.name));
        let removed = before - graph.assembly_refs.len();
        if removed > 0 {
            self.diagnostics.info(
                DiagnosticCategory::AssemblyRef,
                format!("{removed} assembly reference(s) to merged inputs removed"),
            );
        }
    }
}
