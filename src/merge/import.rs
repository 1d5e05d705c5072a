//! The import engine: clones one source graph into the output graph.
//!
//! For every source type, in the fixed traversal order (top-level declaration
//! order, depth-first through nested types), the engine decides between four
//! outcomes:
//!
//! 1. **CreateNew** - no occupant with the same (namespace, name, enclosing)
//!    exists; clone a fresh definition and register it in the identity mapper.
//! 2. **MergeInto** - the occupant is an allowed duplicate; reuse it as the
//!    merge target, members merge with the per-member skip rule.
//! 3. **Displace+CreateNew** - the source type is non-public or internalization
//!    is requested: the occupant is renamed to a disambiguated name and a
//!    fresh clone takes the canonical name. The most recently imported type
//!    always wins the canonical name.
//! 4. **Duplicate error** - both are public, no allowance applies; the merge
//!    aborts naming both originating modules.
//!
//! Every embedded mention goes through [`ImportEngine::import_type_ref`]: the
//! identity-mapper fast path first, then the platform fixer, then rebasing into
//! the output signature space appropriate to the [`ImportContext`]. Mentions of
//! types not yet imported stay symbolic; the reference fixator ties them to
//! definitions after all inputs are in.
//!
//! Method bodies clone instruction-by-instruction. Branch targets, switch
//! tables and handler boundaries are instruction indices, and the clone is
//! built 1:1 with the source, so positional correspondence (instruction `i` in
//! the clone corresponds to instruction `i` in the source) holds for every
//! copied index.

use std::collections::HashMap;

use crate::{
    merge::{
        compare,
        dedup::IdentityMapper,
        platform::PlatformFixer,
        MergeOptions,
    },
    metadata::{
        attributes::{
            CaArgument, CaNamedArgument, CaValue, CustomAttribute, SecurityAttribute,
            SecurityDeclaration,
        },
        diagnostics::{DiagnosticCategory, Diagnostics},
        graph::ModuleGraph,
        identity::IdentityKey,
        members::{EventDef, FieldDef, PropertyDef},
        method::{
            body::{ExceptionHandler, HandlerKind, Instruction, MethodBody, Operand},
            LocalVariable, MethodDef, ParamDef,
        },
        token::{MethodId, TypeId},
        typesystem::{
            FieldRef, GenericParam, MethodRef, NamedFieldRef, NamedMethodRef, NamedTypeRef,
            TypeDef, TypeRef, TypeRefScope,
        },
    },
    Result,
};

/// Generic-parameter binding context of an import.
///
/// Module-level contexts (assembly attributes, exported types) have no generic
/// context at all; type and method contexts bind `!n` and `!!n` differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportContext {
    /// No generic context (assembly-level attributes, module tables).
    Module,
    /// Inside a type: `!n` binds, `!!n` does not.
    Type,
    /// Inside a method: both `!n` and `!!n` bind.
    Method,
}

/// Clones definitions from one source graph into the output graph.
///
/// One engine instance per input module; the identity mapper and platform
/// fixer are shared across all instances of a merge session.
pub struct ImportEngine<'a> {
    source: &'a ModuleGraph,
    output: &'a mut ModuleGraph,
    mapper: &'a mut IdentityMapper,
    fixer: &'a PlatformFixer<'a>,
    options: &'a MergeOptions,
    diagnostics: &'a Diagnostics,
    internalize_module: bool,
    is_primary: bool,
}

impl<'a> ImportEngine<'a> {
    /// Create an engine for one source module.
    ///
    /// `internalize` is the per-module policy; it is ignored for the primary
    /// module, whose types are never internalized.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: &'a ModuleGraph,
        output: &'a mut ModuleGraph,
        mapper: &'a mut IdentityMapper,
        fixer: &'a PlatformFixer<'a>,
        options: &'a MergeOptions,
        diagnostics: &'a Diagnostics,
        internalize: bool,
        is_primary: bool,
    ) -> Self {
        mapper.register_module(source.scope_name(), &source.module_name);
        ImportEngine {
            source,
            output,
            mapper,
            fixer,
            options,
            diagnostics,
            internalize_module: internalize && !is_primary,
            is_primary,
        }
    }

    /// Import every top-level type of the source module, then union the
    /// module-level tables (assembly/module references, exported types,
    /// resources).
    ///
    /// # Errors
    /// [`crate::Error::DuplicateType`] on a public collision without an
    /// applicable duplicate allowance; this aborts the whole merge.
    pub fn run(&mut self) -> Result<()> {
        let roots: Vec<TypeId> = self.source.top_level_types().to_vec();
        for root in roots {
            self.import_type(root, None)?;
        }
        self.import_module_tables();
        Ok(())
    }

    /// Whether internalization applies to the top-level type `full_name`.
    fn internalize_for(&self, full_name: &str) -> bool {
        self.internalize_module && !self.options.internalize_exempt(full_name)
    }

    /// Import one type (and, recursively, its nested types and members).
    /// Returns the output definition that now represents it.
    pub fn import_type(&mut self, src_tid: TypeId, parent_out: Option<TypeId>) -> Result<TypeId> {
        let src_def = self.source.type_def(src_tid).clone();
        let src_full = self.source.full_name(src_tid);
        let key = IdentityKey::new(self.source.scope_name(), &src_full);
        if let Some(already) = self.mapper.lookup(&key) {
            return Ok(already);
        }

        // Nested types are never internalized, regardless of parent policy.
        let internalize = parent_out.is_none() && self.internalize_for(&src_full);

        let occupant = match parent_out {
            Some(parent) => self
                .output
                .type_def(parent)
                .nested
                .iter()
                .copied()
                .find(|&nested| self.output.type_def(nested).name == src_def.name),
            None => self.output.lookup(&src_full),
        };

        let target = match occupant {
            None => self.create_new(&src_def, key, parent_out, internalize)?,
            Some(occupant) => {
                if self.mapper.is_allowed_duplicate(&src_def, &src_full, self.options) {
                    self.diagnostics.info(
                        DiagnosticCategory::TypeMerge,
                        format!(
                            "{} from {} merged into existing definition",
                            src_full, self.source.module_name
                        ),
                    );
                    self.mapper.store_mapping(key, occupant);
                    occupant
                } else if !src_def.is_public() || internalize {
                    let record = self.mapper.displace(self.output, occupant);
                    self.diagnostics.info(
                        DiagnosticCategory::TypeMerge,
                        format!(
                            "{} from {} displaced to {}; {} takes the name",
                            record.old_name,
                            self.mapper.module_of_scope(&record.origin),
                            record.new_name,
                            self.source.module_name
                        ),
                    );
                    self.create_new(&src_def, key, parent_out, internalize)?
                } else {
                    let origin = self
                        .mapper
                        .origin_of(occupant)
                        .unwrap_or_default()
                        .to_string();
                    return Err(crate::Error::DuplicateType {
                        name: src_full,
                        existing_module: self.mapper.module_of_scope(&origin),
                        incoming_module: self.source.module_name.clone(),
                    });
                }
            }
        };

        for nested in src_def.nested.clone() {
            self.import_type(nested, Some(target))?;
        }
        self.import_members(&src_def, target);
        Ok(target)
    }

    /// Clone an empty definition shell, register it, then fill in the
    /// signature-level pieces (generic parameters, base, interfaces,
    /// attributes, security).
    fn create_new(
        &mut self,
        src_def: &TypeDef,
        key: IdentityKey,
        parent_out: Option<TypeId>,
        internalize: bool,
    ) -> Result<TypeId> {
        let mut shell = TypeDef::new(&src_def.namespace, &src_def.name, src_def.flags);
        shell.enclosing = parent_out;
        shell.layout = src_def.layout;
        if internalize {
            shell.internalize();
        }
        let out_tid = self.output.add_type(shell)?;
        // Register before importing signature pieces so self-references hit
        // the identity-map fast path.
        self.mapper.store_mapping(key, out_tid);

        let generic_params = src_def
            .generic_params
            .iter()
            .map(|param| self.import_generic_param(param, ImportContext::Type))
            .collect();
        let base = src_def
            .base
            .as_ref()
            .map(|base| self.import_type_ref(base, ImportContext::Type));
        let interfaces = src_def
            .interfaces
            .iter()
            .map(|interface| self.import_type_ref(interface, ImportContext::Type))
            .collect();
        let custom_attributes = self.import_custom_attributes(&src_def.custom_attributes);
        let security = self.import_security(&src_def.security);

        let def = self.output.type_def_mut(out_tid);
        def.generic_params = generic_params;
        def.base = base;
        def.interfaces = interfaces;
        def.custom_attributes = custom_attributes;
        def.security = security;
        Ok(out_tid)
    }

    /// Clone fields, methods, events and properties into `target`, skipping
    /// members the target already has (the per-member duplicate rule).
    fn import_members(&mut self, src_def: &TypeDef, target: TypeId) {
        for &field_id in &src_def.fields {
            let field = self.source.field_def(field_id).clone();
            if compare::find_field(self.output, target, &field.name).is_some() {
                self.diagnostics.warning(
                    DiagnosticCategory::MemberMerge,
                    format!(
                        "field {}::{} already present, skipped (from {})",
                        self.output.full_name(target),
                        field.name,
                        self.source.module_name
                    ),
                );
                continue;
            }
            let imported = FieldDef {
                name: field.name.clone(),
                flags: field.flags,
                field_type: self.import_type_ref(&field.field_type, ImportContext::Type),
                constant: field.constant.map(|value| self.import_ca_value(value)),
                offset: field.offset,
                custom_attributes: self.import_custom_attributes(&field.custom_attributes),
            };
            self.output.add_field(target, imported);
        }

        // Source method id -> output method id, for accessor rebinding below.
        let mut method_map: HashMap<MethodId, MethodId> = HashMap::new();
        for &method_id in &src_def.methods {
            let method = self.source.method_def(method_id).clone();
            if let Some(existing) =
                compare::find_matching_method(self.output, target, self.source, &method)
            {
                self.diagnostics.warning(
                    DiagnosticCategory::MemberMerge,
                    format!(
                        "method {}::{} already present, skipped (from {})",
                        self.output.full_name(target),
                        compare::render_method_sig(self.source, &method),
                        self.source.module_name
                    ),
                );
                method_map.insert(method_id, existing);
                continue;
            }
            let imported = self.import_method(&method);
            let out_mid = self.output.add_method(target, imported);
            method_map.insert(method_id, out_mid);
        }

        for &event_id in &src_def.events {
            let event = self.source.event_def(event_id).clone();
            let exists = self
                .output
                .type_def(target)
                .events
                .iter()
                .any(|&candidate| self.output.event_def(candidate).name == event.name);
            if exists {
                self.diagnostics.warning(
                    DiagnosticCategory::MemberMerge,
                    format!(
                        "event {}::{} already present, skipped (from {})",
                        self.output.full_name(target),
                        event.name,
                        self.source.module_name
                    ),
                );
                continue;
            }
            let imported = EventDef {
                name: event.name.clone(),
                flags: event.flags,
                event_type: self.import_type_ref(&event.event_type, ImportContext::Type),
                add: event
                    .add
                    .and_then(|accessor| self.rebind_accessor(accessor, &method_map, target)),
                remove: event
                    .remove
                    .and_then(|accessor| self.rebind_accessor(accessor, &method_map, target)),
                raise: event
                    .raise
                    .and_then(|accessor| self.rebind_accessor(accessor, &method_map, target)),
                custom_attributes: self.import_custom_attributes(&event.custom_attributes),
            };
            self.output.add_event(target, imported);
        }

        for &property_id in &src_def.properties {
            let property = self.source.property_def(property_id).clone();
            let exists = self
                .output
                .type_def(target)
                .properties
                .iter()
                .any(|&candidate| self.output.property_def(candidate).name == property.name);
            if exists {
                self.diagnostics.warning(
                    DiagnosticCategory::MemberMerge,
                    format!(
                        "property {}::{} already present, skipped (from {})",
                        self.output.full_name(target),
                        property.name,
                        self.source.module_name
                    ),
                );
                continue;
            }
            let imported = PropertyDef {
                name: property.name.clone(),
                flags: property.flags,
                property_type: self.import_type_ref(&property.property_type, ImportContext::Type),
                getter: property
                    .getter
                    .and_then(|accessor| self.rebind_accessor(accessor, &method_map, target)),
                setter: property
                    .setter
                    .and_then(|accessor| self.rebind_accessor(accessor, &method_map, target)),
                custom_attributes: self.import_custom_attributes(&property.custom_attributes),
            };
            self.output.add_property(target, imported);
        }
    }

    /// Translate a source accessor link to the cloned (or pre-existing,
    /// same-named) method in the target type. A link with no counterpart is
    /// dropped with a warning.
    fn rebind_accessor(
        &self,
        src_mid: MethodId,
        method_map: &HashMap<MethodId, MethodId>,
        target: TypeId,
    ) -> Option<MethodId> {
        if let Some(&mapped) = method_map.get(&src_mid) {
            return Some(mapped);
        }
        let name = &self.source.method_def(src_mid).name;
        let found = compare::find_method_by_name(self.output, target, name);
        if found.is_none() {
            self.diagnostics.warning(
                DiagnosticCategory::MemberMerge,
                format!(
                    "accessor {} not found in {} after merge, link dropped",
                    name,
                    self.output.full_name(target)
                ),
            );
        }
        found
    }

    /// Clone one method: shell, generic parameters, P/Invoke info, parameters,
    /// override list, security, attributes, then the body.
    fn import_method(&mut self, method: &MethodDef) -> MethodDef {
        if let Some(pinvoke) = &method.pinvoke {
            self.output.add_module_ref(&pinvoke.module);
        }
        MethodDef {
            name: method.name.clone(),
            access: method.access,
            vtable: method.vtable,
            modifiers: method.modifiers,
            impl_flags: method.impl_flags,
            call_conv: method.call_conv,
            return_type: self.import_type_ref(&method.return_type, ImportContext::Method),
            params: method
                .params
                .iter()
                .map(|param| ParamDef {
                    name: param.name.clone(),
                    flags: param.flags,
                    param_type: self.import_type_ref(&param.param_type, ImportContext::Method),
                    default: param.default.clone().map(|value| self.import_ca_value(value)),
                })
                .collect(),
            generic_params: method
                .generic_params
                .iter()
                .map(|param| self.import_generic_param(param, ImportContext::Method))
                .collect(),
            overrides: method
                .overrides
                .iter()
                .map(|target| self.import_method_ref(target, ImportContext::Method))
                .collect(),
            pinvoke: method.pinvoke.clone(),
            custom_attributes: self.import_custom_attributes(&method.custom_attributes),
            security: self.import_security(&method.security),
            body: method.body.as_ref().map(|body| self.import_body(body)),
        }
    }

    /// Clone a body. Instructions are cloned 1:1; positional operands keep
    /// their indices, symbolic operands are imported.
    fn import_body(&mut self, body: &MethodBody) -> MethodBody {
        let locals = body
            .locals
            .iter()
            .map(|local| LocalVariable {
                var_type: self.import_type_ref(&local.var_type, ImportContext::Method),
                is_pinned: local.is_pinned,
            })
            .collect();

        let mut instructions = Vec::with_capacity(body.instructions.len());
        for instruction in &body.instructions {
            let operand = match &instruction.operand {
                Operand::Field(field) => Operand::Field(self.import_field_ref(field)),
                Operand::Method(method) => {
                    Operand::Method(self.import_method_ref(method, ImportContext::Method))
                }
                Operand::Type(ty) => {
                    Operand::Type(self.import_type_ref(ty, ImportContext::Method))
                }
                // Branch targets and switch tables are instruction indices;
                // the clone is built 1:1, so index i stays index i.
                other => other.clone(),
            };
            instructions.push(Instruction::new(instruction.mnemonic, operand));
        }

        let handlers = body
            .handlers
            .iter()
            .map(|handler| ExceptionHandler {
                kind: match &handler.kind {
                    HandlerKind::Catch { catch_type } => HandlerKind::Catch {
                        catch_type: self.import_type_ref(catch_type, ImportContext::Method),
                    },
                    other => other.clone(),
                },
                try_start: handler.try_start,
                try_end: handler.try_end,
                handler_start: handler.handler_start,
                handler_end: handler.handler_end,
            })
            .collect();

        MethodBody {
            max_stack: body.max_stack,
            init_locals: body.init_locals,
            locals,
            instructions,
            handlers,
        }
    }

    /// Import a type mention into the output signature space.
    ///
    /// Fast path first: if the mention denotes a source definition the mapper
    /// has already placed, the result is that output definition. Otherwise the
    /// platform fixer runs and the mention is rebuilt symbolically for the
    /// reference fixator to resolve after all inputs are imported.
    pub fn import_type_ref(&self, reference: &TypeRef, context: ImportContext) -> TypeRef {
        match reference {
            TypeRef::Definition(src_tid) => {
                let full = self.source.full_name(*src_tid);
                let key = IdentityKey::new(self.source.scope_name(), &full);
                match self.mapper.lookup(&key) {
                    Some(out_tid) => TypeRef::Definition(out_tid),
                    // Forward reference to a type not imported yet; keep it
                    // symbolic under the source scope.
                    None => self.source.make_named_ref(*src_tid),
                }
            }
            TypeRef::Named(named) => {
                if let (Some(scope), Some(full)) = (named.scope_name(), named.full_name()) {
                    let scope = if scope.is_empty() {
                        self.source.scope_name()
                    } else {
                        scope
                    };
                    if let Some(out_tid) = self.mapper.lookup(&IdentityKey::new(scope, &full)) {
                        return TypeRef::Definition(out_tid);
                    }
                }
                let fixed = self.fixer.fix_type(reference);
                match fixed {
                    TypeRef::Named(fixed) => {
                        let scope = match fixed.scope {
                            TypeRefScope::Nested(enclosing) => TypeRefScope::Nested(Box::new(
                                self.import_type_ref(&enclosing, context),
                            )),
                            scope @ TypeRefScope::Scope(_) => scope,
                        };
                        TypeRef::Named(Box::new(NamedTypeRef {
                            scope,
                            namespace: fixed.namespace,
                            name: fixed.name,
                        }))
                    }
                    other => other,
                }
            }
            TypeRef::GenericParam { index, method } => {
                match (context, method) {
                    (ImportContext::Module, _) => self.diagnostics.warning(
                        DiagnosticCategory::TypeMerge,
                        format!("generic parameter !{index} mentioned in a context without generic bindings"),
                    ),
                    (ImportContext::Type, true) => self.diagnostics.warning(
                        DiagnosticCategory::TypeMerge,
                        format!("method generic parameter !!{index} mentioned outside a method context"),
                    ),
                    _ => {}
                }
                reference.clone()
            }
            TypeRef::Array {
                element,
                rank,
                dimensions,
            } => TypeRef::Array {
                element: Box::new(self.import_type_ref(element, context)),
                rank: *rank,
                dimensions: dimensions.clone(),
            },
            TypeRef::Pointer(element) => {
                TypeRef::Pointer(Box::new(self.import_type_ref(element, context)))
            }
            TypeRef::ByRef(element) => {
                TypeRef::ByRef(Box::new(self.import_type_ref(element, context)))
            }
            TypeRef::Pinned(element) => {
                TypeRef::Pinned(Box::new(self.import_type_ref(element, context)))
            }
            TypeRef::Sentinel(element) => {
                TypeRef::Sentinel(Box::new(self.import_type_ref(element, context)))
            }
            TypeRef::Modified {
                required,
                modifier,
                element,
            } => TypeRef::Modified {
                required: *required,
                modifier: Box::new(self.import_type_ref(modifier, context)),
                element: Box::new(self.import_type_ref(element, context)),
            },
            TypeRef::GenericInstance { element, args } => TypeRef::GenericInstance {
                element: Box::new(self.import_type_ref(element, context)),
                args: args
                    .iter()
                    .map(|arg| self.import_type_ref(arg, context))
                    .collect(),
            },
        }
    }

    /// Import a method mention, rebasing its whole signature and binding it to
    /// an output definition when the declaring type and a structural match are
    /// already available.
    pub fn import_method_ref(&self, reference: &MethodRef, context: ImportContext) -> MethodRef {
        let named = match reference {
            MethodRef::Definition(src_mid) => {
                let owner = self.source.method_owner(*src_mid);
                let def = self.source.method_def(*src_mid);
                NamedMethodRef {
                    declaring: self.import_type_ref(&TypeRef::Definition(owner), context),
                    name: def.name.clone(),
                    has_this: def.has_this(),
                    call_conv: def.call_conv,
                    generic_arity: def.generic_params.len() as u32,
                    return_type: self.import_type_ref(&def.return_type, context),
                    params: def
                        .params
                        .iter()
                        .map(|param| self.import_type_ref(&param.param_type, context))
                        .collect(),
                }
            }
            MethodRef::Named(_) => {
                let fixed = self.fixer.fix_method_ref(reference);
                let MethodRef::Named(fixed) = fixed else {
                    return fixed;
                };
                NamedMethodRef {
                    declaring: self.import_type_ref(&fixed.declaring, context),
                    name: fixed.name,
                    has_this: fixed.has_this,
                    call_conv: fixed.call_conv,
                    generic_arity: fixed.generic_arity,
                    return_type: self.import_type_ref(&fixed.return_type, context),
                    params: fixed
                        .params
                        .iter()
                        .map(|param| self.import_type_ref(param, context))
                        .collect(),
                }
            }
        };
        self.bind_method_ref(named)
    }

    fn bind_method_ref(&self, named: NamedMethodRef) -> MethodRef {
        if let Some(declaring) = named.declaring.as_definition() {
            if let Some(found) = compare::find_method_for_ref(self.output, declaring, &named) {
                return MethodRef::Definition(found);
            }
        }
        MethodRef::Named(Box::new(named))
    }

    /// Import a field mention; see [`ImportEngine::import_method_ref`].
    pub fn import_field_ref(&self, reference: &FieldRef) -> FieldRef {
        let named = match reference {
            FieldRef::Definition(src_fid) => {
                let owner = self.source.field_owner(*src_fid);
                let def = self.source.field_def(*src_fid);
                NamedFieldRef {
                    declaring: self.import_type_ref(&TypeRef::Definition(owner), ImportContext::Type),
                    name: def.name.clone(),
                    field_type: self.import_type_ref(&def.field_type, ImportContext::Type),
                }
            }
            FieldRef::Named(_) => {
                let fixed = self.fixer.fix_field_ref(reference);
                let FieldRef::Named(fixed) = fixed else {
                    return fixed;
                };
                NamedFieldRef {
                    declaring: self.import_type_ref(&fixed.declaring, ImportContext::Type),
                    name: fixed.name,
                    field_type: self.import_type_ref(&fixed.field_type, ImportContext::Type),
                }
            }
        };
        if let Some(declaring) = named.declaring.as_definition() {
            if let Some(found) = compare::find_field(self.output, declaring, &named.name) {
                return FieldRef::Definition(found);
            }
        }
        FieldRef::Named(Box::new(named))
    }

    fn import_generic_param(&self, param: &GenericParam, context: ImportContext) -> GenericParam {
        GenericParam {
            name: param.name.clone(),
            flags: param.flags,
            constraints: param
                .constraints
                .iter()
                .map(|constraint| self.import_type_ref(constraint, context))
                .collect(),
            custom_attributes: self.import_custom_attributes(&param.custom_attributes),
        }
    }

    /// Attribute contents carry no generic context of their own.
    fn import_custom_attributes(&self, attributes: &[CustomAttribute]) -> Vec<CustomAttribute> {
        attributes
            .iter()
            .map(|attribute| CustomAttribute {
                constructor: self.import_method_ref(&attribute.constructor, ImportContext::Module),
                fixed_args: attribute
                    .fixed_args
                    .iter()
                    .map(|argument| self.import_ca_argument(argument))
                    .collect(),
                named_args: attribute
                    .named_args
                    .iter()
                    .map(|argument| self.import_ca_named_argument(argument))
                    .collect(),
            })
            .collect()
    }

    fn import_ca_argument(&self, argument: &CaArgument) -> CaArgument {
        CaArgument {
            arg_type: self.import_type_ref(&argument.arg_type, ImportContext::Module),
            value: self.import_ca_value(argument.value.clone()),
        }
    }

    fn import_ca_named_argument(&self, argument: &CaNamedArgument) -> CaNamedArgument {
        CaNamedArgument {
            is_field: argument.is_field,
            name: argument.name.clone(),
            argument: self.import_ca_argument(&argument.argument),
        }
    }

    fn import_ca_value(&self, value: CaValue) -> CaValue {
        match value {
            CaValue::Type(ty) => {
                CaValue::Type(self.import_type_ref(&ty, ImportContext::Module))
            }
            CaValue::Enum { enum_type, value } => CaValue::Enum {
                enum_type: self.import_type_ref(&enum_type, ImportContext::Module),
                value,
            },
            CaValue::Array(Some(elements)) => CaValue::Array(Some(
                elements
                    .iter()
                    .map(|element| self.import_ca_argument(element))
                    .collect(),
            )),
            other => other,
        }
    }

    fn import_security(&self, declarations: &[SecurityDeclaration]) -> Vec<SecurityDeclaration> {
        declarations
            .iter()
            .map(|declaration| SecurityDeclaration {
                action: declaration.action,
                attributes: declaration
                    .attributes
                    .iter()
                    .map(|attribute| SecurityAttribute {
                        attribute_type: self
                            .import_type_ref(&attribute.attribute_type, ImportContext::Module),
                        named_args: attribute
                            .named_args
                            .iter()
                            .map(|argument| self.import_ca_named_argument(argument))
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Copy the source's assembly-level custom attributes and security
    /// declarations into the output manifest. With `additive`, structurally
    /// equal attribute applications are deduplicated.
    pub fn import_assembly_metadata(&mut self, additive: bool) {
        let attributes = self.import_custom_attributes(&self.source.assembly.custom_attributes);
        for attribute in attributes {
            if additive
                && self.output.assembly.custom_attributes.iter().any(|existing| {
                    compare::attributes_equal(self.output, existing, self.output, &attribute)
                })
            {
                continue;
            }
            self.output.assembly.custom_attributes.push(attribute);
        }
        let mut security = self.import_security(&self.source.assembly.security);
        self.output.assembly.security.append(&mut security);
    }

    /// Carry the source's entry point into the output, re-pointed at the
    /// cloned method.
    pub fn import_entry_point(&mut self) {
        if let Some(entry) = self.source.entry_point.clone() {
            let imported = self.import_method_ref(&entry, ImportContext::Module);
            self.output.entry_point = Some(imported);
        }
    }

    /// Union assembly references, module references, exported types and
    /// resource blobs into the output tables.
    fn import_module_tables(&mut self) {
        for reference in self.source.assembly_refs.clone() {
            self.output.add_assembly_ref(reference);
        }
        for module in self.source.module_refs.clone() {
            self.output.add_module_ref(&module);
        }
        for exported in self.source.exported_types.clone() {
            let already = self
                .output
                .exported_types
                .iter()
                .any(|existing| existing.full_name() == exported.full_name());
            if !already {
                self.output.exported_types.push(exported);
            }
        }
        for resource in self.source.resources.clone() {
            let name = resource.name.clone();
            if !self.output.add_resource(resource) {
                self.diagnostics.warning(
                    DiagnosticCategory::Resource,
                    format!(
                        "resource {} already present, copy from {} skipped",
                        name, self.source.module_name
                    ),
                );
            }
        }
    }

    /// Whether this engine imports the primary module.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }
}
