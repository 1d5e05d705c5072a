//! Integration tests for the engine's structural guarantees.
//!
//! These tests assert the properties the merge is specified against:
//! uniqueness of output names, deterministic collision renames across reruns,
//! reference closure after the fix-up pass, positional correspondence of
//! cloned branch targets, and idempotent platform fix-up.

use std::collections::HashSet;
use std::path::PathBuf;

use dotfuse::{build::corlib_type, prelude::*, Result};

fn int32() -> TypeRef {
    corlib_type("System", "Int32")
}

fn module_with_job(assembly: &str) -> Result<ModuleGraph> {
    let mut graph = ModuleGraphBuilder::new(assembly).build();
    ClassBuilder::new("<Module>").build(&mut graph)?;
    ClassBuilder::new("Job")
        .namespace("Core")
        .field("state", int32())
        .build(&mut graph)?;
    Ok(graph)
}

/// No two top-level definitions of the output graph share a full name, even
/// when every input declares the same internal type and the module type.
#[test]
fn test_output_top_level_names_unique() -> Result<()> {
    let inputs = vec![
        module_with_job("LibA")?,
        module_with_job("LibB")?,
        module_with_job("LibC")?,
    ];
    let mut session = MergeSession::new(MergeOptions::default());
    let output = session.merge_graphs(inputs)?;

    let mut seen = HashSet::new();
    for &tid in output.top_level_types() {
        let name = output.full_name(tid);
        assert!(seen.insert(name.clone()), "duplicate top-level name {name}");
    }
    assert!(output.lookup("Core.Job").is_some());
    assert!(output.lookup("Core.Job_LibA").is_some());
    assert!(output.lookup("Core.Job_LibB").is_some());
    Ok(())
}

/// Re-running the merge over an identically ordered input list assigns the
/// same displacement renames, in the same order.
#[test]
fn test_rerun_produces_identical_renames() -> Result<()> {
    let inputs = || -> Result<Vec<ModuleGraph>> {
        Ok(vec![
            module_with_job("LibA")?,
            module_with_job("LibB")?,
            module_with_job("LibC")?,
        ])
    };

    let mut first = MergeSession::new(MergeOptions::default());
    let out_first = first.merge_graphs(inputs()?)?;
    let mut second = MergeSession::new(MergeOptions::default());
    let out_second = second.merge_graphs(inputs()?)?;

    assert_eq!(first.renames(), second.renames());
    let names = |graph: &ModuleGraph| -> Vec<String> {
        graph
            .top_level_types()
            .iter()
            .map(|&tid| graph.full_name(tid))
            .collect()
    };
    assert_eq!(names(&out_first), names(&out_second));
    Ok(())
}

fn check_type_ref(merged: &[&str], reference: &TypeRef) {
    match reference {
        TypeRef::Definition(_) | TypeRef::GenericParam { .. } => {}
        TypeRef::Named(named) => {
            if let Some(scope) = named.scope_name() {
                assert!(
                    !merged.contains(&scope),
                    "mention into merged input {scope} survived fix-up: {named:?}"
                );
            }
        }
        TypeRef::Array { element, .. }
        | TypeRef::Pointer(element)
        | TypeRef::ByRef(element)
        | TypeRef::Pinned(element)
        | TypeRef::Sentinel(element) => check_type_ref(merged, element),
        TypeRef::Modified {
            modifier, element, ..
        } => {
            check_type_ref(merged, modifier);
            check_type_ref(merged, element);
        }
        TypeRef::GenericInstance { element, args } => {
            check_type_ref(merged, element);
            for arg in args {
                check_type_ref(merged, arg);
            }
        }
    }
}

fn check_method_ref(merged: &[&str], reference: &MethodRef) {
    if let MethodRef::Named(named) = reference {
        check_type_ref(merged, &named.declaring);
        check_type_ref(merged, &named.return_type);
        for param in &named.params {
            check_type_ref(merged, param);
        }
    }
}

fn check_field_ref(merged: &[&str], reference: &FieldRef) {
    if let FieldRef::Named(named) = reference {
        check_type_ref(merged, &named.declaring);
        check_type_ref(merged, &named.field_type);
    }
}

fn assert_reference_closure(graph: &ModuleGraph, merged: &[&str]) {
    for tid in graph.type_ids() {
        let def = graph.type_def(tid);
        if let Some(base) = &def.base {
            check_type_ref(merged, base);
        }
        for interface in &def.interfaces {
            check_type_ref(merged, interface);
        }
        for param in &def.generic_params {
            for constraint in &param.constraints {
                check_type_ref(merged, constraint);
            }
        }
    }
    for fid in graph.field_ids() {
        check_type_ref(merged, &graph.field_def(fid).field_type);
    }
    for mid in graph.method_ids() {
        let def = graph.method_def(mid);
        check_type_ref(merged, &def.return_type);
        for param in &def.params {
            check_type_ref(merged, &param.param_type);
        }
        for target in &def.overrides {
            check_method_ref(merged, target);
        }
        if let Some(body) = &def.body {
            for local in &body.locals {
                check_type_ref(merged, &local.var_type);
            }
            for instruction in &body.instructions {
                match &instruction.operand {
                    Operand::Type(ty) => check_type_ref(merged, ty),
                    Operand::Method(method) => check_method_ref(merged, method),
                    Operand::Field(field) => check_field_ref(merged, field),
                    _ => {}
                }
            }
        }
    }
}

/// After the fix-up pass every reachable mention either resolves to an output
/// definition or names an assembly that was not one of the merged inputs, and
/// assembly references to merged inputs are gone. The inputs reference each
/// other in both directions to exercise forward resolution through the second
/// pass.
#[test]
fn test_reference_closure_after_fixup() -> Result<()> {
    let mscorlib = AssemblyIdentity::new("mscorlib", AssemblyVersion::new(4, 0, 0, 0));
    let lib_a_scope = ReferenceScope::Assembly(AssemblyIdentity::new(
        "LibA",
        AssemblyVersion::new(1, 0, 0, 0),
    ));
    let lib_b_scope = ReferenceScope::Assembly(AssemblyIdentity::new(
        "LibB",
        AssemblyVersion::new(1, 0, 0, 0),
    ));

    // LibA's Store mentions LibB's Client, which does not exist yet when
    // LibA is imported; only the fix-up pass can resolve it.
    let mut lib_a = ModuleGraphBuilder::new("LibA")
        .assembly_ref(mscorlib.clone())
        .build();
    ClassBuilder::new("Store")
        .namespace("Data")
        .public()
        .field("value", int32())
        .field(
            "client",
            TypeRef::named(lib_b_scope.clone(), "App", "Client"),
        )
        .method("Get", |method| {
            method
                .public()
                .static_()
                .returns(int32())
                .body(|body| body.ldc_i4(0).ret())
        })
        .build(&mut lib_a)?;

    let mut lib_b = ModuleGraphBuilder::new("LibB")
        .assembly_ref(mscorlib.clone())
        .assembly_ref(AssemblyIdentity::new("LibA", AssemblyVersion::new(1, 0, 0, 0)))
        .build();
    let store_ref = TypeRef::named(lib_a_scope.clone(), "Data", "Store");
    ClassBuilder::new("Client")
        .namespace("App")
        .public()
        .field("store", store_ref.clone())
        .method("Fetch", |method| {
            method
                .public()
                .returns(int32())
                .body(|body| {
                    body.call(MethodRef::Named(Box::new(NamedMethodRef {
                        declaring: store_ref.clone(),
                        name: "Get".to_string(),
                        has_this: false,
                        call_conv: CallingConvention::Default,
                        generic_arity: 0,
                        return_type: int32(),
                        params: Vec::new(),
                    })))
                    .ldfld(FieldRef::Named(Box::new(NamedFieldRef {
                        declaring: store_ref.clone(),
                        name: "value".to_string(),
                        field_type: int32(),
                    })))
                    .ret()
                })
        })
        .build(&mut lib_b)?;

    let mut session = MergeSession::new(MergeOptions::default());
    let output = session.merge_graphs(vec![lib_a, lib_b])?;

    assert_reference_closure(&output, &["LibA", "LibB"]);

    // Forward mention resolved by the second pass.
    let store = output.lookup("Data.Store").unwrap();
    let client = output.lookup("App.Client").unwrap();
    let client_field = output.type_def(store).fields[1];
    assert_eq!(
        output.field_def(client_field).field_type.as_definition(),
        Some(client)
    );

    // Assembly references to merged inputs are pruned; external ones stay.
    assert!(output.assembly_refs.iter().all(|r| r.name != "LibA"));
    assert!(output.assembly_refs.iter().any(|r| r.name == "mscorlib"));
    Ok(())
}

/// Mentions that captured a definition before it was displaced keep following
/// it to its new name through the identity map.
#[test]
fn test_mentions_follow_displaced_definitions() -> Result<()> {
    let mut lib_a = ModuleGraphBuilder::new("LibA").build();
    ClassBuilder::new("Helper")
        .namespace("Util")
        .field("fromA", int32())
        .build(&mut lib_a)?;
    let mut lib_b = ModuleGraphBuilder::new("LibB").build();
    ClassBuilder::new("Helper")
        .namespace("Util")
        .field("fromB", int32())
        .build(&mut lib_b)?;
    let mut lib_c = ModuleGraphBuilder::new("LibC").build();
    ClassBuilder::new("Consumer")
        .namespace("Util")
        .public()
        .field(
            "held",
            TypeRef::named(
                ReferenceScope::Assembly(AssemblyIdentity::new(
                    "LibA",
                    AssemblyVersion::new(1, 0, 0, 0),
                )),
                "Util",
                "Helper",
            ),
        )
        .build(&mut lib_c)?;

    let mut session = MergeSession::new(MergeOptions::default());
    let output = session.merge_graphs(vec![lib_a, lib_b, lib_c])?;

    let consumer = output.lookup("Util.Consumer").unwrap();
    let held = output.type_def(consumer).fields[0];
    let target = output
        .field_def(held)
        .field_type
        .as_definition()
        .expect("resolved through the identity map");
    assert_eq!(output.full_name(target), "Util.Helper_LibA");
    Ok(())
}

/// Every cloned body's branch targets equal the source body's, including
/// targets inside protected regions, and handler boundaries are unchanged.
#[test]
fn test_branch_targets_positionally_preserved() -> Result<()> {
    let mut lib = ModuleGraphBuilder::new("Flow").build();
    ClassBuilder::new("Guarded")
        .namespace("Flow")
        .public()
        .method("Run", |method| {
            method.public().body(|body| {
                body.nop()
                    .ldstr("work")
                    .leave(5)
                    .nop()
                    .leave(5)
                    .ret()
                    .catch_handler(corlib_type("System", "Exception"), 0, 3, 3, 5)
            })
        })
        .method("Loop", |method| {
            method.public().body(|body| {
                body.ldc_i4(10).brtrue(0).ret()
            })
        })
        .build(&mut lib)?;

    let source = lib.clone();
    let mut session = MergeSession::new(MergeOptions::default());
    let output = session.merge_graphs(vec![lib])?;

    let src_tid = source.lookup("Flow.Guarded").unwrap();
    let out_tid = output.lookup("Flow.Guarded").unwrap();
    for (src_mid, out_mid) in source
        .type_def(src_tid)
        .methods
        .iter()
        .zip(&output.type_def(out_tid).methods)
    {
        let src_body = source.method_def(*src_mid).body.as_ref().unwrap();
        let out_body = output.method_def(*out_mid).body.as_ref().unwrap();
        assert!(!src_body.branch_targets().is_empty());
        assert_eq!(src_body.branch_targets(), out_body.branch_targets());
        for (src_handler, out_handler) in src_body.handlers.iter().zip(&out_body.handlers) {
            assert_eq!(src_handler.try_start, out_handler.try_start);
            assert_eq!(src_handler.try_end, out_handler.try_end);
            assert_eq!(src_handler.handler_start, out_handler.handler_start);
            assert_eq!(src_handler.handler_end, out_handler.handler_end);
        }
    }
    Ok(())
}

/// Maps every assembly to a 4.0 platform copy.
struct PlatformResolver;

impl AssemblyResolver for PlatformResolver {
    fn resolve(&self, identity: &AssemblyIdentity) -> Result<ModuleGraph> {
        let mut platform =
            AssemblyIdentity::new(&identity.name, AssemblyVersion::new(4, 0, 0, 0));
        platform.public_key_token = Some([0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89]);
        Ok(ModuleGraph::new(platform))
    }
}

/// `fix(fix(r)) == fix(r)` for a wrapped external mention.
#[test]
fn test_platform_fix_idempotent() {
    let diagnostics = Diagnostics::new();
    let resolver = PlatformResolver;
    let fixer = PlatformFixer::new(Some(&resolver), &diagnostics);

    let reference = TypeRef::vector(TypeRef::named(
        ReferenceScope::Assembly(AssemblyIdentity::new(
            "mscorlib",
            AssemblyVersion::new(2, 0, 0, 0),
        )),
        "System",
        "Object",
    ));
    let once = fixer.fix_type(&reference);
    assert_ne!(once, reference);
    assert_eq!(fixer.fix_type(&once), once);
}

/// A merge with a target platform retargets external scopes through the
/// resolver; mentions the resolver cannot satisfy stay untouched.
#[test]
fn test_session_retargets_external_scopes() -> Result<()> {
    let mut lib = ModuleGraphBuilder::new("App").build();
    ClassBuilder::new("Holder")
        .namespace("App")
        .public()
        .field(
            "data",
            TypeRef::named(
                ReferenceScope::Assembly(AssemblyIdentity::new(
                    "mscorlib",
                    AssemblyVersion::new(2, 0, 0, 0),
                )),
                "System",
                "String",
            ),
        )
        .build(&mut lib)?;

    let options = MergeOptions::default().with_target_platform(PathBuf::from("platform/v4"));
    let mut session = MergeSession::new(options);
    let resolver = PlatformResolver;
    let output = session.merge_graphs_with_resolver(vec![lib], Some(&resolver))?;

    let holder = output.lookup("App.Holder").unwrap();
    let field = output.type_def(holder).fields[0];
    match &output.field_def(field).field_type {
        TypeRef::Named(named) => match &named.scope {
            TypeRefScope::Scope(ReferenceScope::Assembly(identity)) => {
                assert_eq!(identity.version, AssemblyVersion::new(4, 0, 0, 0));
            }
            other => panic!("expected assembly scope, got {other:?}"),
        },
        other => panic!("expected external mention, got {other:?}"),
    }
    Ok(())
}
