//! Integration tests for the orchestration layer: options, failure semantics
//! and the loader/writer/resolver seams.

use std::path::PathBuf;

use dotfuse::{build::corlib_type, merge::compare, prelude::*, Error, Result};

fn int32() -> TypeRef {
    corlib_type("System", "Int32")
}

fn public_thing(assembly: &str) -> Result<ModuleGraph> {
    let mut graph = ModuleGraphBuilder::new(assembly).build();
    ClassBuilder::new("Thing")
        .namespace("Api")
        .public()
        .build(&mut graph)?;
    Ok(graph)
}

/// Two public definitions of the same name without any duplicate allowance
/// abort the merge, naming both originating modules.
#[test]
fn test_duplicate_public_type_aborts() -> Result<()> {
    let mut session = MergeSession::new(MergeOptions::default());
    match session.merge_graphs(vec![public_thing("LibA")?, public_thing("LibB")?]) {
        Err(Error::DuplicateType {
            name,
            existing_module,
            incoming_module,
        }) => {
            assert_eq!(name, "Api.Thing");
            assert_eq!(existing_module, "LibA.dll");
            assert_eq!(incoming_module, "LibB.dll");
        }
        other => panic!("expected duplicate-type error, got {other:?}"),
    }
    Ok(())
}

/// The same collision resolves once internalization applies to the incoming
/// type: the primary occupant is displaced but keeps its visibility, the
/// incoming clone takes the name internalized.
#[test]
fn test_internalization_turns_collision_into_displacement() -> Result<()> {
    let mut session = MergeSession::new(MergeOptions::default().with_internalize(true));
    let output = session.merge_graphs(vec![public_thing("LibA")?, public_thing("LibB")?])?;

    let canonical = output.lookup("Api.Thing").expect("canonical kept");
    assert_eq!(
        output.type_def(canonical).visibility(),
        TypeVisibility::NOT_PUBLIC
    );
    let displaced = output.lookup("Api.Thing_LibA").expect("occupant renamed");
    assert_eq!(
        output.type_def(displaced).visibility(),
        TypeVisibility::PUBLIC
    );
    Ok(())
}

/// Internalization exclusion patterns keep matching secondary types public.
#[test]
fn test_internalize_exclusion_pattern() -> Result<()> {
    let mut primary = ModuleGraphBuilder::new("App").build();
    ClassBuilder::new("Program")
        .namespace("App")
        .public()
        .build(&mut primary)?;

    let mut lib = ModuleGraphBuilder::new("Lib").build();
    ClassBuilder::new("Surface")
        .namespace("Api")
        .public()
        .build(&mut lib)?;
    ClassBuilder::new("Worker")
        .namespace("Impl")
        .public()
        .build(&mut lib)?;

    let options = MergeOptions::default()
        .with_internalize(true)
        .exclude_from_internalize("Api.");
    let mut session = MergeSession::new(options);
    let output = session.merge_graphs(vec![primary, lib])?;

    let surface = output.lookup("Api.Surface").unwrap();
    assert_eq!(output.type_def(surface).visibility(), TypeVisibility::PUBLIC);
    let worker = output.lookup("Impl.Worker").unwrap();
    assert_eq!(
        output.type_def(worker).visibility(),
        TypeVisibility::NOT_PUBLIC
    );
    Ok(())
}

/// Nested types are never internalized, regardless of the enclosing type's
/// policy outcome.
#[test]
fn test_nested_types_not_internalized() -> Result<()> {
    let mut primary = ModuleGraphBuilder::new("App").build();
    ClassBuilder::new("Program")
        .namespace("App")
        .public()
        .build(&mut primary)?;

    let mut lib = ModuleGraphBuilder::new("Lib").build();
    ClassBuilder::new("Outer")
        .namespace("Ns")
        .public()
        .nested("Inner", |nested| {
            nested.visibility(TypeVisibility::NESTED_PUBLIC)
        })
        .build(&mut lib)?;

    let mut session = MergeSession::new(MergeOptions::default().with_internalize(true));
    let output = session.merge_graphs(vec![primary, lib])?;

    let outer = output.lookup("Ns.Outer").unwrap();
    assert_eq!(
        output.type_def(outer).visibility(),
        TypeVisibility::NOT_PUBLIC
    );
    let inner = output.lookup("Ns.Outer/Inner").unwrap();
    assert_eq!(
        output.type_def(inner).visibility(),
        TypeVisibility::NESTED_PUBLIC
    );
    Ok(())
}

/// The caller's allowlist turns a public collision into a member-wise merge.
#[test]
fn test_allow_duplicate_list_merges() -> Result<()> {
    let options = MergeOptions::default().allow_duplicate("Api.Thing");
    let mut session = MergeSession::new(options);
    let output = session.merge_graphs(vec![public_thing("LibA")?, public_thing("LibB")?])?;

    assert!(output.lookup("Api.Thing").is_some());
    assert!(output.lookup("Api.Thing_LibA").is_none());
    assert!(session.renames().is_empty());
    Ok(())
}

fn dto_module(assembly: &str, extra_field: &str) -> Result<ModuleGraph> {
    let mut graph = ModuleGraphBuilder::new(assembly).build();
    ClassBuilder::new("Dto")
        .namespace("Models")
        .public()
        .field("id", int32())
        .field(extra_field, corlib_type("System", "String"))
        .build(&mut graph)?;
    Ok(graph)
}

/// Union-merge mode merges public duplicates member-wise: shared members are
/// skipped with a diagnostic, new ones are added.
#[test]
fn test_union_merge_unions_members() -> Result<()> {
    let mut session = MergeSession::new(MergeOptions::default().with_union_merge(true));
    let output = session.merge_graphs(vec![
        dto_module("LibA", "createdA")?,
        dto_module("LibB", "createdB")?,
    ])?;

    let dto = output.lookup("Models.Dto").expect("single definition");
    let field_names: Vec<&str> = output
        .type_def(dto)
        .fields
        .iter()
        .map(|&fid| output.field_def(fid).name.as_str())
        .collect();
    assert_eq!(field_names, ["id", "createdA", "createdB"]);
    assert!(session.diagnostics().warning_count() >= 1);
    Ok(())
}

/// An empty input list is rejected before any output state exists.
#[test]
fn test_empty_inputs_rejected() {
    let mut session = MergeSession::new(MergeOptions::default());
    assert!(matches!(session.merge_graphs(vec![]), Err(Error::Empty)));
}

fn marker(attribute_type: &str) -> CustomAttribute {
    CustomAttribute::marker(MethodRef::Named(Box::new(NamedMethodRef {
        declaring: corlib_type("System", attribute_type),
        name: ".ctor".to_string(),
        has_this: true,
        call_conv: CallingConvention::Default,
        generic_arity: 0,
        return_type: corlib_type("System", "Void"),
        params: Vec::new(),
    })))
}

fn attributed_inputs() -> Vec<ModuleGraph> {
    let primary = ModuleGraphBuilder::new("App")
        .attribute(marker("ObsoleteAttribute"))
        .build();
    let secondary = ModuleGraphBuilder::new("Lib")
        .attribute(marker("ObsoleteAttribute"))
        .attribute(marker("CLSCompliantAttribute"))
        .build();
    vec![primary, secondary]
}

/// Assembly-level attributes come from the primary module by default, from a
/// chosen input with `FromInput`, and from all inputs deduplicated with
/// `Union`.
#[test]
fn test_assembly_attribute_policies() -> Result<()> {
    let mut primary_only = MergeSession::new(MergeOptions::default());
    let output = primary_only.merge_graphs(attributed_inputs())?;
    assert_eq!(output.assembly.custom_attributes.len(), 1);

    let mut from_secondary = MergeSession::new(
        MergeOptions::default().with_attribute_policy(AttributePolicy::FromInput(1)),
    );
    let output = from_secondary.merge_graphs(attributed_inputs())?;
    assert_eq!(output.assembly.custom_attributes.len(), 2);
    let rendered =
        compare::render_method_ref(&output, &output.assembly.custom_attributes[1].constructor);
    assert!(rendered.contains("CLSCompliantAttribute"));

    let mut union = MergeSession::new(
        MergeOptions::default().with_attribute_policy(AttributePolicy::Union),
    );
    let output = union.merge_graphs(attributed_inputs())?;
    // The shared Obsolete application deduplicates.
    assert_eq!(output.assembly.custom_attributes.len(), 2);
    Ok(())
}

/// The primary module's entry point is carried over and re-pointed at the
/// cloned method definition.
#[test]
fn test_entry_point_rebound_to_clone() -> Result<()> {
    let mut app = ModuleGraphBuilder::new("App").build();
    let program = ClassBuilder::new("Program")
        .namespace("Cli")
        .public()
        .method("Main", |method| {
            method.public().static_().body(|body| body.ret())
        })
        .build(&mut app)?;
    app.entry_point = Some(MethodRef::Named(Box::new(NamedMethodRef {
        declaring: app.make_named_ref(program),
        name: "Main".to_string(),
        has_this: false,
        call_conv: CallingConvention::Default,
        generic_arity: 0,
        return_type: corlib_type("System", "Void"),
        params: Vec::new(),
    })));

    let mut session = MergeSession::new(MergeOptions::default());
    let output = session.merge_graphs(vec![app])?;

    let program = output.lookup("Cli.Program").unwrap();
    let main = output.type_def(program).methods[0];
    let entry = output.entry_point.as_ref().expect("entry point carried");
    assert_eq!(entry.as_definition(), Some(main));
    Ok(())
}

/// Same-named resource blobs keep the first copy; distinct names union.
#[test]
fn test_resources_unioned_by_name() -> Result<()> {
    let lib_a = ModuleGraphBuilder::new("LibA")
        .resource("strings.resources", vec![1])
        .build();
    let lib_b = ModuleGraphBuilder::new("LibB")
        .resource("strings.resources", vec![2])
        .resource("icons.resources", vec![3])
        .build();

    let mut session = MergeSession::new(MergeOptions::default());
    let output = session.merge_graphs(vec![lib_a, lib_b])?;

    assert_eq!(output.resources.len(), 2);
    assert_eq!(output.resources[0].name, "strings.resources");
    assert_eq!(output.resources[0].data, vec![1]);
    assert_eq!(output.resources[1].name, "icons.resources");
    assert!(session.diagnostics().warning_count() >= 1);
    Ok(())
}

/// Interprets input bytes as the module's assembly name.
struct NameLoader;

impl GraphLoader for NameLoader {
    fn load(&self, bytes: &[u8]) -> Result<ModuleGraph> {
        let name = std::str::from_utf8(bytes).map_err(|_| Error::Malformed {
            message: "module name is not UTF-8".to_string(),
            file: file!(),
            line: line!(),
        })?;
        let mut graph = ModuleGraphBuilder::new(name.trim()).build();
        ClassBuilder::new("Entry")
            .namespace(name.trim())
            .public()
            .build(&mut graph)?;
        Ok(graph)
    }
}

/// `merge_paths` memory-maps every input, loads them in parallel and merges
/// in the given order; the first path is the primary module.
#[test]
fn test_merge_paths_loads_all_inputs() -> Result<()> {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR"));
    let path_a = dir.join("dotfuse_primary.bin");
    let path_b = dir.join("dotfuse_secondary.bin");
    std::fs::write(&path_a, b"PrimaryLib")?;
    std::fs::write(&path_b, b"SecondaryLib")?;

    let mut session = MergeSession::new(MergeOptions::default());
    let output = session.merge_paths(&[path_a, path_b], &NameLoader)?;

    assert_eq!(output.assembly.identity.name, "PrimaryLib");
    assert!(output.lookup("PrimaryLib.Entry").is_some());
    assert!(output.lookup("SecondaryLib.Entry").is_some());
    Ok(())
}

/// A missing input file fails the whole run before any output state exists.
#[test]
fn test_merge_paths_missing_file_is_fatal() {
    let mut session = MergeSession::new(MergeOptions::default());
    let result = session.merge_paths(&[PathBuf::from("/nonexistent/input.dll")], &NameLoader);
    assert!(matches!(result, Err(Error::FileError(_))));
}

/// Serializes a graph to a single byte carrying its type count.
struct CountingWriter;

impl GraphWriter for CountingWriter {
    fn serialize(&self, graph: &ModuleGraph) -> Result<Vec<u8>> {
        Ok(vec![u8::try_from(graph.type_count()).unwrap_or(u8::MAX)])
    }
}

/// Rejects every graph, standing in for a writer without key material.
struct UnsignedWriter;

impl GraphWriter for UnsignedWriter {
    fn serialize(&self, _graph: &ModuleGraph) -> Result<Vec<u8>> {
        Err(Error::Write("missing signing key".to_string()))
    }
}

/// `merge_and_write` hands the populated graph to the writer exactly once;
/// writer failures surface as `Error::Write`.
#[test]
fn test_merge_and_write() -> Result<()> {
    let bytes = MergeSession::new(MergeOptions::default())
        .merge_and_write(vec![public_thing("LibA")?], &CountingWriter)?;
    assert_eq!(bytes, vec![1]);

    let result = MergeSession::new(MergeOptions::default())
        .merge_and_write(vec![public_thing("LibA")?], &UnsignedWriter);
    assert!(matches!(result, Err(Error::Write(_))));
    Ok(())
}
