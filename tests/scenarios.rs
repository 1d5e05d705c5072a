//! Integration tests for the documented merge scenarios.
//!
//! Each test builds its input graphs through the builder API, runs a complete
//! merge session and asserts on the populated output graph: collision
//! displacement, well-known duplicate unioning, override accessibility
//! correction and positional body cloning.

use dotfuse::{build::corlib_type, prelude::*, Result};

fn helper_module(assembly: &str, field: &str) -> Result<ModuleGraph> {
    let mut graph = ModuleGraphBuilder::new(assembly).build();
    ClassBuilder::new("Helper")
        .namespace("Util")
        .field(field, corlib_type("System", "Int32"))
        .build(&mut graph)?;
    Ok(graph)
}

/// Two modules each declare an internal `Util.Helper`; internalization is on
/// for the secondary. The most recently imported type wins the canonical name,
/// the earlier occupant is renamed after its originating module, and both keep
/// their members.
#[test]
fn test_internal_helper_collision_renames_earlier_occupant() -> Result<()> {
    let lib_a = helper_module("LibA", "fromA")?;
    let lib_b = helper_module("LibB", "fromB")?;

    let mut session = MergeSession::new(MergeOptions::default().with_internalize(true));
    let output = session.merge_graphs(vec![lib_a, lib_b])?;

    let canonical = output.lookup("Util.Helper").expect("canonical name kept");
    let displaced = output.lookup("Util.Helper_LibA").expect("occupant renamed");

    let canonical_field = output.type_def(canonical).fields[0];
    assert_eq!(output.field_def(canonical_field).name, "fromB");
    let displaced_field = output.type_def(displaced).fields[0];
    assert_eq!(output.field_def(displaced_field).name, "fromA");

    assert_eq!(session.renames().len(), 1);
    let record = &session.renames()[0];
    assert_eq!(record.old_name, "Util.Helper");
    assert_eq!(record.new_name, "Util.Helper_LibA");
    assert_eq!(record.origin, "LibA");
    Ok(())
}

fn module_with_marker(assembly: &str, user_type: &str) -> Result<ModuleGraph> {
    let mut graph = ModuleGraphBuilder::new(assembly).build();
    let marker = ClassBuilder::new("ExtensionAttribute")
        .namespace("System.Runtime.CompilerServices")
        .sealed()
        .base(corlib_type("System", "Attribute"))
        .method(".ctor", |method| method.public().body(|body| body.ret()))
        .build(&mut graph)?;
    let ctor = MethodRef::Named(Box::new(NamedMethodRef {
        declaring: graph.make_named_ref(marker),
        name: ".ctor".to_string(),
        has_this: true,
        call_conv: CallingConvention::Default,
        generic_arity: 0,
        return_type: corlib_type("System", "Void"),
        params: Vec::new(),
    }));
    ClassBuilder::new(user_type)
        .namespace("Api")
        .public()
        .attribute(CustomAttribute::marker(ctor))
        .build(&mut graph)?;
    Ok(graph)
}

/// Two secondary modules embed the same compiler marker attribute. The
/// well-known duplicate policy merges them into one definition; attribute
/// applications from both modules end up referencing that single definition
/// and no duplicate error is raised.
#[test]
fn test_well_known_marker_type_merges_once() -> Result<()> {
    let mut primary = ModuleGraphBuilder::new("App").build();
    ClassBuilder::new("Program")
        .namespace("App")
        .public()
        .build(&mut primary)?;

    let lib_b = module_with_marker("LibB", "FromB")?;
    let lib_c = module_with_marker("LibC", "FromC")?;

    let mut session = MergeSession::new(MergeOptions::default());
    let output = session.merge_graphs(vec![primary, lib_b, lib_c])?;

    let marker = output
        .lookup("System.Runtime.CompilerServices.ExtensionAttribute")
        .expect("one merged definition");
    assert!(output
        .lookup("System.Runtime.CompilerServices.ExtensionAttribute_LibB")
        .is_none());
    assert_eq!(output.type_def(marker).methods.len(), 1);

    let ctor = output.type_def(marker).methods[0];
    for user in ["Api.FromB", "Api.FromC"] {
        let tid = output.lookup(user).expect("user type merged");
        let attribute = &output.type_def(tid).custom_attributes[0];
        assert_eq!(attribute.constructor.as_definition(), Some(ctor));
    }
    Ok(())
}

/// A public virtual method is overridden as internal in a secondary module.
/// Once both end up in the same output module, the override's accessibility is
/// corrected to match its ancestor's.
#[test]
fn test_override_accessibility_corrected_to_ancestor() -> Result<()> {
    let mut core = ModuleGraphBuilder::new("Core").build();
    ClassBuilder::new("Base")
        .namespace("Widgets")
        .public()
        .method("Render", |method| {
            method.public().new_slot().body(|body| body.ret())
        })
        .build(&mut core)?;

    let mut ext = ModuleGraphBuilder::new("Ext").build();
    ClassBuilder::new("Derived")
        .namespace("Widgets")
        .public()
        .base(TypeRef::named(
            ReferenceScope::Assembly(AssemblyIdentity::new(
                "Core",
                AssemblyVersion::new(1, 0, 0, 0),
            )),
            "Widgets",
            "Base",
        ))
        .method("Render", |method| {
            method.assembly().virtual_().body(|body| body.ret())
        })
        .build(&mut ext)?;

    let mut session = MergeSession::new(MergeOptions::default().with_internalize(true));
    let output = session.merge_graphs(vec![core, ext])?;

    let derived = output.lookup("Widgets.Derived").expect("merged");
    let base = output.lookup("Widgets.Base").expect("merged");
    assert_eq!(
        output.type_def(derived).base.as_ref().and_then(TypeRef::as_definition),
        Some(base)
    );

    let render = output.type_def(derived).methods[0];
    assert_eq!(output.method_def(render).access, MethodAccessFlags::PUBLIC);
    Ok(())
}

/// A `switch` with four targets pointing at four distinct later instructions
/// survives cloning with every target at the positionally corresponding index.
#[test]
fn test_switch_targets_survive_cloning_positionally() -> Result<()> {
    let mut lib = ModuleGraphBuilder::new("Flow").build();
    ClassBuilder::new("Dispatcher")
        .namespace("Flow")
        .public()
        .method("Dispatch", |method| {
            method
                .public()
                .parameter("selector", corlib_type("System", "Int32"))
                .body(|body| {
                    body.ldarg(1)
                        .switch(vec![3, 5, 7, 9])
                        .br(11)
                        .ldc_i4(0)
                        .br(11)
                        .ldc_i4(1)
                        .br(11)
                        .ldc_i4(2)
                        .br(11)
                        .ldc_i4(3)
                        .br(11)
                        .ret()
                })
        })
        .build(&mut lib)?;
    let source_tid = lib.lookup("Flow.Dispatcher").unwrap();
    let source_mid = lib.type_def(source_tid).methods[0];
    let source_body = lib.method_def(source_mid).body.clone().unwrap();

    let mut session = MergeSession::new(MergeOptions::default());
    let output = session.merge_graphs(vec![lib])?;

    let tid = output.lookup("Flow.Dispatcher").unwrap();
    let mid = output.type_def(tid).methods[0];
    let cloned = output.method_def(mid).body.as_ref().unwrap();

    assert_eq!(cloned.instructions.len(), source_body.instructions.len());
    match &cloned.instructions[1].operand {
        Operand::Switch(targets) => assert_eq!(targets, &vec![3, 5, 7, 9]),
        other => panic!("expected switch operand, got {other:?}"),
    }
    assert_eq!(cloned.branch_targets(), source_body.branch_targets());
    Ok(())
}
