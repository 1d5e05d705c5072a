//! Programmatic construction of module graphs.
//!
//! The builders are how tests and embedders create input graphs without the
//! binary loader: a [`ModuleGraphBuilder`] produces the empty graph, then
//! [`ClassBuilder`] instances populate it. Methods and bodies nest through
//! closures.
//!
//! # Examples
//!
//! ```rust
//! use dotfuse::build::{ClassBuilder, ModuleGraphBuilder};
//! use dotfuse::metadata::typesystem::TypeRef;
//! use dotfuse::metadata::identity::{AssemblyIdentity, AssemblyVersion, ReferenceScope};
//!
//! let corlib = ReferenceScope::Assembly(AssemblyIdentity::new(
//!     "mscorlib",
//!     AssemblyVersion::new(4, 0, 0, 0),
//! ));
//! let int32 = TypeRef::named(corlib.clone(), "System", "Int32");
//!
//! let mut graph = ModuleGraphBuilder::new("MyLib").build();
//! ClassBuilder::new("Counter")
//!     .namespace("MyApp")
//!     .public()
//!     .field("count", int32.clone())
//!     .method("Increment", |method| {
//!         method.public().body(|body| body.ret())
//!     })
//!     .build(&mut graph)?;
//! # Ok::<(), dotfuse::Error>(())
//! ```

use crate::metadata::{
    attributes::CustomAttribute,
    graph::{DataBlob, ModuleGraph},
    identity::{AssemblyIdentity, AssemblyVersion, ReferenceScope},
    members::{EventDef, FieldDef, FieldAccessFlags, FieldModifiers, PropertyDef},
    method::{
        body::{ExceptionHandler, HandlerKind, Immediate, Instruction, MethodBody, Operand},
        LocalVariable, MethodAccessFlags, MethodDef, MethodModifiers, MethodVtableFlags, ParamDef,
    },
    token::{MethodId, TypeId},
    typesystem::{
        FieldRef, GenericParam, MethodRef, TypeDef, TypeModifiers, TypeRef, TypeVisibility,
    },
};

/// Builds an empty module graph with its manifest data.
pub struct ModuleGraphBuilder {
    identity: AssemblyIdentity,
    module_name: Option<String>,
    assembly_refs: Vec<AssemblyIdentity>,
    attributes: Vec<CustomAttribute>,
    resources: Vec<DataBlob>,
}

impl ModuleGraphBuilder {
    /// Start a graph for an assembly with the given simple name, version 1.0.0.0.
    #[must_use]
    pub fn new(name: &str) -> Self {
        ModuleGraphBuilder {
            identity: AssemblyIdentity::new(name, AssemblyVersion::new(1, 0, 0, 0)),
            module_name: None,
            assembly_refs: Vec::new(),
            attributes: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Set the assembly version.
    #[must_use]
    pub fn version(mut self, major: u16, minor: u16, build: u16, revision: u16) -> Self {
        self.identity.version = AssemblyVersion::new(major, minor, build, revision);
        self
    }

    /// Override the module file name.
    #[must_use]
    pub fn module_name(mut self, name: &str) -> Self {
        self.module_name = Some(name.to_string());
        self
    }

    /// Add an assembly reference.
    #[must_use]
    pub fn assembly_ref(mut self, identity: AssemblyIdentity) -> Self {
        self.assembly_refs.push(identity);
        self
    }

    /// Add an assembly-level custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Embed a resource blob.
    #[must_use]
    pub fn resource(mut self, name: &str, data: Vec<u8>) -> Self {
        self.resources.push(DataBlob {
            name: name.to_string(),
            flags: 0,
            data,
        });
        self
    }

    /// Produce the graph. Types are added afterwards through [`ClassBuilder`].
    #[must_use]
    pub fn build(self) -> ModuleGraph {
        let mut graph = ModuleGraph::new(self.identity);
        if let Some(name) = self.module_name {
            graph.module_name = name;
        }
        for reference in self.assembly_refs {
            graph.add_assembly_ref(reference);
        }
        graph.assembly.custom_attributes = self.attributes;
        for resource in self.resources {
            let _ = graph.add_resource(resource);
        }
        graph
    }
}

/// Convenience constructor for mentions of runtime types.
#[must_use]
pub fn corlib_type(namespace: &str, name: &str) -> TypeRef {
    TypeRef::named(
        ReferenceScope::Assembly(AssemblyIdentity::new(
            "mscorlib",
            AssemblyVersion::new(4, 0, 0, 0),
        )),
        namespace,
        name,
    )
}

/// Builds one type definition (optionally with nested types) into a graph.
pub struct ClassBuilder {
    namespace: String,
    name: String,
    flags: u32,
    base: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    generic_params: Vec<GenericParam>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    events: Vec<(String, TypeRef)>,
    properties: Vec<(String, TypeRef)>,
    attributes: Vec<CustomAttribute>,
    nested: Vec<ClassBuilder>,
}

impl ClassBuilder {
    /// Start a class with the given simple name; not public until marked so.
    #[must_use]
    pub fn new(name: &str) -> Self {
        ClassBuilder {
            namespace: String::new(),
            name: name.to_string(),
            flags: TypeVisibility::NOT_PUBLIC.bits(),
            base: Some(corlib_type("System", "Object")),
            interfaces: Vec::new(),
            generic_params: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            events: Vec::new(),
            properties: Vec::new(),
            attributes: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Set the namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Mark the type public.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.set_visibility(TypeVisibility::PUBLIC);
        self
    }

    /// Mark the type assembly-internal (the default).
    #[must_use]
    pub fn internal(mut self) -> Self {
        self.set_visibility(TypeVisibility::NOT_PUBLIC);
        self
    }

    /// Set an explicit visibility, e.g. for nested types.
    #[must_use]
    pub fn visibility(mut self, visibility: TypeVisibility) -> Self {
        self.set_visibility(visibility);
        self
    }

    fn set_visibility(&mut self, visibility: TypeVisibility) {
        self.flags = (self.flags & !crate::metadata::typesystem::TYPE_VISIBILITY_MASK)
            | visibility.bits();
    }

    /// Mark the type sealed.
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.flags |= TypeModifiers::SEALED.bits();
        self
    }

    /// Turn the type into an interface (abstract, no base).
    #[must_use]
    pub fn interface(mut self) -> Self {
        self.flags |= TypeModifiers::INTERFACE.bits() | TypeModifiers::ABSTRACT.bits();
        self.base = None;
        self
    }

    /// Set the base type mention.
    #[must_use]
    pub fn base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    /// Add an implemented interface mention.
    #[must_use]
    pub fn implements(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Declare a generic parameter.
    #[must_use]
    pub fn generic_param(mut self, name: &str) -> Self {
        self.generic_params.push(GenericParam::new(name));
        self
    }

    /// Add a private instance field.
    #[must_use]
    pub fn field(mut self, name: &str, field_type: TypeRef) -> Self {
        self.fields.push(FieldDef::new(
            name,
            FieldAccessFlags::PRIVATE.bits(),
            field_type,
        ));
        self
    }

    /// Add a private static field.
    #[must_use]
    pub fn static_field(mut self, name: &str, field_type: TypeRef) -> Self {
        self.fields.push(FieldDef::new(
            name,
            FieldAccessFlags::PRIVATE.bits() | FieldModifiers::STATIC.bits(),
            field_type,
        ));
        self
    }

    /// Add a method through a builder closure.
    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        configure: impl FnOnce(MethodBuilder) -> MethodBuilder,
    ) -> Self {
        let builder = configure(MethodBuilder::new(name));
        self.methods.push(builder.into_def());
        self
    }

    /// Add an event; `add_{name}`/`remove_{name}` methods are linked as its
    /// accessors when present.
    #[must_use]
    pub fn event(mut self, name: &str, handler_type: TypeRef) -> Self {
        self.events.push((name.to_string(), handler_type));
        self
    }

    /// Add a property; `get_{name}`/`set_{name}` methods are linked as its
    /// accessors when present.
    #[must_use]
    pub fn property(mut self, name: &str, property_type: TypeRef) -> Self {
        self.properties.push((name.to_string(), property_type));
        self
    }

    /// Apply a custom attribute to the type.
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a nested type through a builder closure.
    #[must_use]
    pub fn nested(
        mut self,
        name: &str,
        configure: impl FnOnce(ClassBuilder) -> ClassBuilder,
    ) -> Self {
        let builder = configure(
            ClassBuilder::new(name).visibility(TypeVisibility::NESTED_PRIVATE),
        );
        self.nested.push(builder);
        self
    }

    /// Materialize the type (and its nested types) into the graph.
    ///
    /// # Errors
    /// Propagates the graph's uniqueness error when the (namespace, name,
    /// enclosing) slot is already taken.
    pub fn build(self, graph: &mut ModuleGraph) -> crate::Result<TypeId> {
        self.build_into(graph, None)
    }

    fn build_into(
        self,
        graph: &mut ModuleGraph,
        enclosing: Option<TypeId>,
    ) -> crate::Result<TypeId> {
        let mut def = TypeDef::new(&self.namespace, &self.name, self.flags);
        def.enclosing = enclosing;
        def.base = self.base;
        def.interfaces = self.interfaces;
        def.generic_params = self.generic_params;
        def.custom_attributes = self.attributes;
        let id = graph.add_type(def)?;

        for field in self.fields {
            graph.add_field(id, field);
        }
        let mut method_ids: Vec<(String, MethodId)> = Vec::new();
        for method in self.methods {
            let name = method.name.clone();
            let mid = graph.add_method(id, method);
            method_ids.push((name, mid));
        }
        let find = |needle: String| -> Option<MethodId> {
            method_ids
                .iter()
                .find(|(name, _)| *name == needle)
                .map(|(_, mid)| *mid)
        };

        for (name, handler_type) in self.events {
            let mut event = EventDef::new(&name, handler_type);
            event.add = find(format!("add_{name}"));
            event.remove = find(format!("remove_{name}"));
            graph.add_event(id, event);
        }
        for (name, property_type) in self.properties {
            let mut property = PropertyDef::new(&name, property_type);
            property.getter = find(format!("get_{name}"));
            property.setter = find(format!("set_{name}"));
            graph.add_property(id, property);
        }

        for nested in self.nested {
            nested.build_into(graph, Some(id))?;
        }
        Ok(id)
    }
}

/// Builds one method definition.
pub struct MethodBuilder {
    def: MethodDef,
}

impl MethodBuilder {
    fn new(name: &str) -> Self {
        MethodBuilder {
            def: MethodDef::new(
                name,
                MethodAccessFlags::PRIVATE,
                corlib_type("System", "Void"),
            ),
        }
    }

    /// Public accessibility.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.def.access = MethodAccessFlags::PUBLIC;
        self
    }

    /// Private accessibility.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.def.access = MethodAccessFlags::PRIVATE;
        self
    }

    /// Assembly-internal accessibility.
    #[must_use]
    pub fn assembly(mut self) -> Self {
        self.def.access = MethodAccessFlags::ASSEM;
        self
    }

    /// Family (protected) accessibility.
    #[must_use]
    pub fn family(mut self) -> Self {
        self.def.access = MethodAccessFlags::FAMILY;
        self
    }

    /// Mark the method static.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.def.modifiers |= MethodModifiers::STATIC;
        self
    }

    /// Mark the method virtual.
    #[must_use]
    pub fn virtual_(mut self) -> Self {
        self.def.modifiers |= MethodModifiers::VIRTUAL;
        self
    }

    /// Mark the method virtual with a fresh vtable slot.
    #[must_use]
    pub fn new_slot(mut self) -> Self {
        self.def.modifiers |= MethodModifiers::VIRTUAL;
        self.def.vtable = MethodVtableFlags::NEW_SLOT;
        self
    }

    /// Mark the method abstract (virtual, no body).
    #[must_use]
    pub fn abstract_(mut self) -> Self {
        self.def.modifiers |= MethodModifiers::VIRTUAL | MethodModifiers::ABSTRACT;
        self
    }

    /// Declare a parameter.
    #[must_use]
    pub fn parameter(mut self, name: &str, param_type: TypeRef) -> Self {
        self.def.params.push(ParamDef::new(name, param_type));
        self
    }

    /// Set the return type (defaults to `System.Void`).
    #[must_use]
    pub fn returns(mut self, return_type: TypeRef) -> Self {
        self.def.return_type = return_type;
        self
    }

    /// Declare a generic parameter.
    #[must_use]
    pub fn generic_param(mut self, name: &str) -> Self {
        self.def.generic_params.push(GenericParam::new(name));
        self
    }

    /// Add an explicit override target.
    #[must_use]
    pub fn override_of(mut self, target: MethodRef) -> Self {
        self.def.overrides.push(target);
        self
    }

    /// Apply a custom attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: CustomAttribute) -> Self {
        self.def.custom_attributes.push(attribute);
        self
    }

    /// Provide a body through a builder closure.
    #[must_use]
    pub fn body(mut self, configure: impl FnOnce(BodyBuilder) -> BodyBuilder) -> Self {
        let builder = configure(BodyBuilder::new());
        self.def.body = Some(builder.body);
        self
    }

    fn into_def(self) -> MethodDef {
        self.def
    }
}

/// Builds a method body instruction by instruction.
///
/// Branch helpers take the *index* of the target instruction in the body being
/// built.
pub struct BodyBuilder {
    body: MethodBody,
}

impl BodyBuilder {
    fn new() -> Self {
        BodyBuilder {
            body: MethodBody::new(),
        }
    }

    /// Declare a local variable slot; returns its index through ordering.
    #[must_use]
    pub fn local(mut self, var_type: TypeRef) -> Self {
        self.body.locals.push(LocalVariable::new(var_type));
        self
    }

    fn push(mut self, mnemonic: &'static str, operand: Operand) -> Self {
        self.body.instructions.push(Instruction::new(mnemonic, operand));
        self
    }

    /// `nop`
    #[must_use]
    pub fn nop(self) -> Self {
        self.push("nop", Operand::None)
    }

    /// `ret`
    #[must_use]
    pub fn ret(self) -> Self {
        self.push("ret", Operand::None)
    }

    /// `ldarg <index>`
    #[must_use]
    pub fn ldarg(self, index: u16) -> Self {
        self.push("ldarg", Operand::Argument(index))
    }

    /// `ldloc <index>`
    #[must_use]
    pub fn ldloc(self, index: u16) -> Self {
        self.push("ldloc", Operand::Local(index))
    }

    /// `stloc <index>`
    #[must_use]
    pub fn stloc(self, index: u16) -> Self {
        self.push("stloc", Operand::Local(index))
    }

    /// `ldc.i4 <value>`
    #[must_use]
    pub fn ldc_i4(self, value: i32) -> Self {
        self.push("ldc.i4", Operand::Immediate(Immediate::Int32(value)))
    }

    /// `ldstr <value>`
    #[must_use]
    pub fn ldstr(self, value: &str) -> Self {
        self.push("ldstr", Operand::String(value.to_string()))
    }

    /// `call <method>`
    #[must_use]
    pub fn call(self, target: MethodRef) -> Self {
        self.push("call", Operand::Method(target))
    }

    /// `callvirt <method>`
    #[must_use]
    pub fn callvirt(self, target: MethodRef) -> Self {
        self.push("callvirt", Operand::Method(target))
    }

    /// `newobj <constructor>`
    #[must_use]
    pub fn newobj(self, constructor: MethodRef) -> Self {
        self.push("newobj", Operand::Method(constructor))
    }

    /// `ldfld <field>`
    #[must_use]
    pub fn ldfld(self, field: FieldRef) -> Self {
        self.push("ldfld", Operand::Field(field))
    }

    /// `stfld <field>`
    #[must_use]
    pub fn stfld(self, field: FieldRef) -> Self {
        self.push("stfld", Operand::Field(field))
    }

    /// `ldtoken <type>`
    #[must_use]
    pub fn ldtoken(self, ty: TypeRef) -> Self {
        self.push("ldtoken", Operand::Type(ty))
    }

    /// `br <target index>`
    #[must_use]
    pub fn br(self, target: usize) -> Self {
        self.push("br", Operand::Target(target))
    }

    /// `brtrue <target index>`
    #[must_use]
    pub fn brtrue(self, target: usize) -> Self {
        self.push("brtrue", Operand::Target(target))
    }

    /// `brfalse <target index>`
    #[must_use]
    pub fn brfalse(self, target: usize) -> Self {
        self.push("brfalse", Operand::Target(target))
    }

    /// `switch <target indices>`
    #[must_use]
    pub fn switch(self, targets: Vec<usize>) -> Self {
        self.push("switch", Operand::Switch(targets))
    }

    /// `leave <target index>`
    #[must_use]
    pub fn leave(self, target: usize) -> Self {
        self.push("leave", Operand::Target(target))
    }

    /// `throw`
    #[must_use]
    pub fn throw(self) -> Self {
        self.push("throw", Operand::None)
    }

    /// `endfinally`
    #[must_use]
    pub fn endfinally(self) -> Self {
        self.push("endfinally", Operand::None)
    }

    /// Attach a typed catch handler over `[try_start, try_end)` handled by
    /// `[handler_start, handler_end)`.
    #[must_use]
    pub fn catch_handler(
        mut self,
        catch_type: TypeRef,
        try_start: usize,
        try_end: usize,
        handler_start: usize,
        handler_end: usize,
    ) -> Self {
        self.body.handlers.push(ExceptionHandler {
            kind: HandlerKind::Catch { catch_type },
            try_start,
            try_end,
            handler_start,
            handler_end,
        });
        self
    }

    /// Attach a finally handler.
    #[must_use]
    pub fn finally_handler(
        mut self,
        try_start: usize,
        try_end: usize,
        handler_start: usize,
        handler_end: usize,
    ) -> Self {
        self.body.handlers.push(ExceptionHandler {
            kind: HandlerKind::Finally,
            try_start,
            try_end,
            handler_start,
            handler_end,
        });
        self
    }

    /// Set the maximum evaluation stack depth.
    #[must_use]
    pub fn max_stack(mut self, depth: u16) -> Self {
        self.body.max_stack = depth;
        self
    }
}
