//! Structural comparison of types, signatures and attributes.
//!
//! Everything here compares by full name plus shape - array rank, wrapper
//! kinds, generic-instance argument lists, generic-parameter position - and
//! never by object identity, so definitions and mentions from different graphs
//! compare meaningfully. The comparer backs three merge policies:
//!
//! - the per-member skip-duplicate rule of the import engine (fields, events
//!   and properties match by name; methods by name + parameter count + full
//!   rendered signature),
//! - the deepest-ancestor override search of the accessibility correction,
//! - rebinding accessor and member links after cloning.

use crate::metadata::{
    attributes::CustomAttribute,
    graph::ModuleGraph,
    method::MethodDef,
    token::{FieldId, MethodId, TypeId},
    typesystem::{MethodRef, NamedMethodRef, TypeRef, TypeRefScope},
};

/// Render a type mention to its canonical display form.
///
/// Definitions and named mentions render as their full name with the nested
/// path (`Ns.Outer/Inner`); composite shapes wrap the element rendering the
/// conventional way (`T[]`, `T*`, `T&`, `T<A,B>`, `!n`, `!!n`). Scopes are
/// deliberately not part of the rendering: two mentions of the same shape are
/// structurally equal no matter which module they claim to come from.
#[must_use]
pub fn render_type(graph: &ModuleGraph, reference: &TypeRef) -> String {
    match reference {
        TypeRef::Definition(id) => graph.full_name(*id),
        TypeRef::Named(named) => {
            let simple = if named.namespace.is_empty() {
                named.name.clone()
            } else {
                format!("{}.{}", named.namespace, named.name)
            };
            match &named.scope {
                TypeRefScope::Scope(_) => simple,
                TypeRefScope::Nested(enclosing) => {
                    format!("{}/{}", render_type(graph, enclosing), named.name)
                }
            }
        }
        TypeRef::GenericParam { index, method } => {
            if *method {
                format!("!!{index}")
            } else {
                format!("!{index}")
            }
        }
        TypeRef::Array {
            element,
            rank,
            ..
        } => {
            let commas = ",".repeat(rank.saturating_sub(1) as usize);
            format!("{}[{}]", render_type(graph, element), commas)
        }
        TypeRef::Pointer(element) => format!("{}*", render_type(graph, element)),
        TypeRef::ByRef(element) => format!("{}&", render_type(graph, element)),
        TypeRef::Pinned(element) => format!("{} pinned", render_type(graph, element)),
        TypeRef::Sentinel(element) => format!("{} sentinel", render_type(graph, element)),
        TypeRef::Modified {
            required,
            modifier,
            element,
        } => {
            let keyword = if *required { "modreq" } else { "modopt" };
            format!(
                "{} {}({})",
                render_type(graph, element),
                keyword,
                render_type(graph, modifier)
            )
        }
        TypeRef::GenericInstance { element, args } => {
            let rendered: Vec<String> = args.iter().map(|arg| render_type(graph, arg)).collect();
            format!("{}<{}>", render_type(graph, element), rendered.join(","))
        }
    }
}

/// Render a method mention for diagnostics and signature matching.
#[must_use]
pub fn render_method_ref(graph: &ModuleGraph, reference: &MethodRef) -> String {
    match reference {
        MethodRef::Definition(id) => {
            let def = graph.method_def(*id);
            render_method_sig(graph, def)
        }
        MethodRef::Named(named) => {
            let params: Vec<String> = named
                .params
                .iter()
                .map(|param| render_type(graph, param))
                .collect();
            format!(
                "{} {}::{}({})",
                render_type(graph, &named.return_type),
                render_type(graph, &named.declaring),
                named.name,
                params.join(",")
            )
        }
    }
}

/// Render a method definition's signature (without its declaring type).
#[must_use]
pub fn render_method_sig(graph: &ModuleGraph, def: &MethodDef) -> String {
    let params: Vec<String> = def
        .params
        .iter()
        .map(|param| render_type(graph, &param.param_type))
        .collect();
    let arity = if def.generic_params.is_empty() {
        String::new()
    } else {
        format!("`{}", def.generic_params.len())
    };
    format!(
        "{} {}{}({})",
        render_type(graph, &def.return_type),
        def.name,
        arity,
        params.join(",")
    )
}

/// Structural equality of two type mentions, possibly from different graphs.
#[must_use]
pub fn types_equal(
    graph_a: &ModuleGraph,
    a: &TypeRef,
    graph_b: &ModuleGraph,
    b: &TypeRef,
) -> bool {
    match (a, b) {
        (
            TypeRef::Array {
                element: ea,
                rank: ra,
                ..
            },
            TypeRef::Array {
                element: eb,
                rank: rb,
                ..
            },
        ) => ra == rb && types_equal(graph_a, ea, graph_b, eb),
        (TypeRef::Pointer(ea), TypeRef::Pointer(eb))
        | (TypeRef::ByRef(ea), TypeRef::ByRef(eb))
        | (TypeRef::Pinned(ea), TypeRef::Pinned(eb))
        | (TypeRef::Sentinel(ea), TypeRef::Sentinel(eb)) => {
            types_equal(graph_a, ea, graph_b, eb)
        }
        (
            TypeRef::Modified {
                required: ra,
                modifier: ma,
                element: ea,
            },
            TypeRef::Modified {
                required: rb,
                modifier: mb,
                element: eb,
            },
        ) => {
            ra == rb
                && types_equal(graph_a, ma, graph_b, mb)
                && types_equal(graph_a, ea, graph_b, eb)
        }
        (
            TypeRef::GenericInstance {
                element: ea,
                args: aa,
            },
            TypeRef::GenericInstance {
                element: eb,
                args: ab,
            },
        ) => {
            aa.len() == ab.len()
                && types_equal(graph_a, ea, graph_b, eb)
                && aa
                    .iter()
                    .zip(ab.iter())
                    .all(|(x, y)| types_equal(graph_a, x, graph_b, y))
        }
        (
            TypeRef::GenericParam {
                index: ia,
                method: ma,
            },
            TypeRef::GenericParam {
                index: ib,
                method: mb,
            },
        ) => ia == ib && ma == mb,
        (
            TypeRef::Definition(_) | TypeRef::Named(_),
            TypeRef::Definition(_) | TypeRef::Named(_),
        ) => render_type(graph_a, a) == render_type(graph_b, b),
        _ => false,
    }
}

/// Structural equality of two parameter type lists.
#[must_use]
pub fn params_equal(
    graph_a: &ModuleGraph,
    a: &[TypeRef],
    graph_b: &ModuleGraph,
    b: &[TypeRef],
) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| types_equal(graph_a, x, graph_b, y))
}

/// Structural equality of two method definitions, possibly from different graphs.
///
/// Matches the skip-duplicate policy: name, generic arity, `this` convention,
/// parameter types and return type must all agree.
#[must_use]
pub fn methods_equal(
    graph_a: &ModuleGraph,
    a: &MethodDef,
    graph_b: &ModuleGraph,
    b: &MethodDef,
) -> bool {
    a.name == b.name
        && a.generic_params.len() == b.generic_params.len()
        && a.has_this() == b.has_this()
        && a.params.len() == b.params.len()
        && a.params
            .iter()
            .zip(b.params.iter())
            .all(|(x, y)| types_equal(graph_a, &x.param_type, graph_b, &y.param_type))
        && types_equal(graph_a, &a.return_type, graph_b, &b.return_type)
}

/// Whether a method definition structurally matches a symbolic method mention.
#[must_use]
pub fn method_matches_ref(
    graph_def: &ModuleGraph,
    def: &MethodDef,
    graph_ref: &ModuleGraph,
    reference: &NamedMethodRef,
) -> bool {
    def.name == reference.name
        && def.generic_params.len() as u32 == reference.generic_arity
        && def.has_this() == reference.has_this
        && def.params.len() == reference.params.len()
        && def
            .params
            .iter()
            .zip(reference.params.iter())
            .all(|(x, y)| types_equal(graph_def, &x.param_type, graph_ref, y))
        && types_equal(graph_def, &def.return_type, graph_ref, &reference.return_type)
}

/// Structural equality of two custom attribute applications.
///
/// Constructors must resolve to the same declaring type and the fixed argument
/// lists must be value-equal. Used to deduplicate assembly-level attributes in
/// the additive copy mode.
#[must_use]
pub fn attributes_equal(
    graph_a: &ModuleGraph,
    a: &CustomAttribute,
    graph_b: &ModuleGraph,
    b: &CustomAttribute,
) -> bool {
    render_method_ref(graph_a, &a.constructor) == render_method_ref(graph_b, &b.constructor)
        && a.fixed_args == b.fixed_args
}

/// Find a method of `owner` structurally equal to `def` (from another graph).
#[must_use]
pub fn find_matching_method(
    graph: &ModuleGraph,
    owner: TypeId,
    other_graph: &ModuleGraph,
    def: &MethodDef,
) -> Option<MethodId> {
    graph
        .type_def(owner)
        .methods
        .iter()
        .copied()
        .find(|candidate| methods_equal(graph, graph.method_def(*candidate), other_graph, def))
}

/// Find a method of `owner` structurally matching a symbolic mention.
#[must_use]
pub fn find_method_for_ref(
    graph: &ModuleGraph,
    owner: TypeId,
    reference: &NamedMethodRef,
) -> Option<MethodId> {
    graph
        .type_def(owner)
        .methods
        .iter()
        .copied()
        .find(|candidate| method_matches_ref(graph, graph.method_def(*candidate), graph, reference))
}

/// Find a field of `owner` by name.
#[must_use]
pub fn find_field(graph: &ModuleGraph, owner: TypeId, name: &str) -> Option<FieldId> {
    graph
        .type_def(owner)
        .fields
        .iter()
        .copied()
        .find(|candidate| graph.field_def(*candidate).name == name)
}

/// Find a method of `owner` by name alone; used to rebind same-named accessor
/// links after cloning into an already-merged type.
#[must_use]
pub fn find_method_by_name(graph: &ModuleGraph, owner: TypeId, name: &str) -> Option<MethodId> {
    graph
        .type_def(owner)
        .methods
        .iter()
        .copied()
        .find(|candidate| graph.method_def(*candidate).name == name)
}
