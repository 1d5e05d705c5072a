//! Method definitions, attribute flag groups, and bodies.
//!
//! This module defines the owned representation of a method: its attribute flag
//! groups (split the same way the ECMA-335 masks split them), signature, generic
//! parameters, explicit override list, P/Invoke data and optional body.
//!
//! # Key Types
//! - [`MethodDef`] - a method definition
//! - [`MethodAccessFlags`], [`MethodVtableFlags`], [`MethodModifiers`] - attribute flags
//! - [`ParamDef`] / [`ParamAttributes`] - parameter representation
//! - [`PInvokeInfo`] - platform-invoke forwarding data
//! - [`MethodBody`] and instruction types ([`body`])

pub mod body;

use bitflags::bitflags;

use crate::metadata::{
    attributes::{CaValue, CustomAttribute, SecurityDeclaration},
    typesystem::{CallingConvention, GenericParam, MethodRef, TypeRef},
};

pub use body::{
    ExceptionHandler, HandlerKind, Immediate, Instruction, LocalVariable, MethodBody, Operand,
};

/// Bitmask for `ACCESS` state extraction
pub const METHOD_ACCESS_MASK: u32 = 0x0007;
/// Bitmask for `VTABLE_LAYOUT` information extraction
pub const METHOD_VTABLE_LAYOUT_MASK: u32 = 0x0100;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method access flags
    pub struct MethodAccessFlags: u32 {
        /// Member not referenceable
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this Assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessibly by anyone in the Assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessibly by sub-types anywhere, plus anyone in assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessibly by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
    }
}

impl MethodAccessFlags {
    /// Extract access flags from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & METHOD_ACCESS_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method vtable layout flags
    pub struct MethodVtableFlags: u32 {
        /// Method reuses existing slot in vtable
        const REUSE_SLOT = 0x0000;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
    }
}

impl MethodVtableFlags {
    /// Extract vtable layout flags from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & METHOD_VTABLE_LAYOUT_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method modifiers and properties
    pub struct MethodModifiers: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method can only be overriden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// CLI provides 'special' behavior, depending upon the name of the method
        const RTSPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// Method has security associate with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

impl MethodModifiers {
    /// Extract method modifiers from raw method attributes
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !METHOD_ACCESS_MASK & !METHOD_VTABLE_LAYOUT_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Parameter attributes
    pub struct ParamAttributes: u16 {
        /// Parameter is an input
        const IN = 0x0001;
        /// Parameter is an output
        const OUT = 0x0002;
        /// Parameter is optional
        const OPTIONAL = 0x0010;
        /// Parameter has a default value
        const HAS_DEFAULT = 0x1000;
        /// Parameter has field marshalling information
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

/// A declared parameter: name, flags, type and optional default.
#[derive(Debug, Clone)]
pub struct ParamDef {
    /// Parameter name, if the compiler emitted one
    pub name: Option<String>,
    /// Parameter attributes
    pub flags: ParamAttributes,
    /// Parameter type mention
    pub param_type: TypeRef,
    /// Default value for optional parameters
    pub default: Option<CaValue>,
}

impl ParamDef {
    /// Create a named parameter with no default.
    #[must_use]
    pub fn new(name: &str, param_type: TypeRef) -> Self {
        ParamDef {
            name: Some(name.to_string()),
            flags: ParamAttributes::default(),
            param_type,
            default: None,
        }
    }
}

/// Platform-invoke forwarding information of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PInvokeInfo {
    /// Name of the target module reference
    pub module: String,
    /// Exported entry point name; `None` uses the method name
    pub entry_point: Option<String>,
    /// Raw ECMA-335 implementation map attributes
    pub flags: u16,
}

/// A method definition owned by a type.
///
/// The three attribute groups are stored pre-split so the override-chain
/// accessibility correction can overwrite the access group without touching
/// the rest.
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Access group of the method attributes
    pub access: MethodAccessFlags,
    /// Vtable layout group of the method attributes
    pub vtable: MethodVtableFlags,
    /// Modifier group of the method attributes
    pub modifiers: MethodModifiers,
    /// Raw ECMA-335 implementation flags
    pub impl_flags: u32,
    /// Calling convention of the signature
    pub call_conv: CallingConvention,
    /// Return type mention
    pub return_type: TypeRef,
    /// Declared parameters, in order
    pub params: Vec<ParamDef>,
    /// Generic parameters, in declaration order
    pub generic_params: Vec<GenericParam>,
    /// Explicit override targets (`.override` directives)
    pub overrides: Vec<MethodRef>,
    /// P/Invoke data for forwarded methods
    pub pinvoke: Option<PInvokeInfo>,
    /// Custom attributes applied to the method
    pub custom_attributes: Vec<CustomAttribute>,
    /// Declarative security attached to the method
    pub security: Vec<SecurityDeclaration>,
    /// Body; `None` for abstract, runtime and forwarded methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    /// Create a bodyless method with the given name, access and return type.
    #[must_use]
    pub fn new(name: &str, access: MethodAccessFlags, return_type: TypeRef) -> Self {
        MethodDef {
            name: name.to_string(),
            access,
            vtable: MethodVtableFlags::REUSE_SLOT,
            modifiers: MethodModifiers::empty(),
            impl_flags: 0,
            call_conv: CallingConvention::Default,
            return_type,
            params: Vec::new(),
            generic_params: Vec::new(),
            overrides: Vec::new(),
            pinvoke: None,
            custom_attributes: Vec::new(),
            security: Vec::new(),
            body: None,
        }
    }

    /// Returns `true` for virtual methods.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.modifiers.contains(MethodModifiers::VIRTUAL)
    }

    /// Returns `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(MethodModifiers::STATIC)
    }

    /// Whether the signature carries an implicit `this` parameter.
    #[must_use]
    pub fn has_this(&self) -> bool {
        !self.is_static()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::identity::ReferenceScope;

    fn void() -> TypeRef {
        TypeRef::named(ReferenceScope::CurrentModule, "System", "Void")
    }

    #[test]
    fn test_flag_group_extraction() {
        let raw = 0x0006 | 0x0100 | 0x0040; // public, new slot, virtual
        assert_eq!(
            MethodAccessFlags::from_method_flags(raw),
            MethodAccessFlags::PUBLIC
        );
        assert_eq!(
            MethodVtableFlags::from_method_flags(raw),
            MethodVtableFlags::NEW_SLOT
        );
        assert!(MethodModifiers::from_method_flags(raw).contains(MethodModifiers::VIRTUAL));
    }

    #[test]
    fn test_static_this() {
        let mut method = MethodDef::new("Run", MethodAccessFlags::PUBLIC, void());
        assert!(method.has_this());
        method.modifiers |= MethodModifiers::STATIC;
        assert!(method.is_static());
        assert!(!method.has_this());
    }

    #[test]
    fn test_virtual_flag() {
        let mut method = MethodDef::new("M", MethodAccessFlags::PUBLIC, void());
        assert!(!method.is_virtual());
        method.modifiers |= MethodModifiers::VIRTUAL;
        assert!(method.is_virtual());
    }
}
