//! Field, event and property definitions.
//!
//! Members are owned by exactly one type and addressed by arena id. Event and
//! property accessor links point at method definitions in the same graph; a
//! link that cannot be rebound after a merge is left `None` and reported as a
//! warning, never an abort.
//!
//! # Key Types
//! - [`FieldDef`] - a field with its type, constant and layout offset
//! - [`EventDef`] - an event with add/remove/raise accessor links
//! - [`PropertyDef`] - a property with get/set accessor links
//! - [`FieldAccessFlags`] / [`FieldModifiers`] - attribute flag groups

use bitflags::bitflags;

use crate::metadata::{
    attributes::{CaValue, CustomAttribute},
    token::MethodId,
    typesystem::TypeRef,
};

/// Bitmask for field access extraction
pub const FIELD_ACCESS_MASK: u32 = 0x0007;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Field access flags
    pub struct FieldAccessFlags: u32 {
        /// Member not referenceable
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this Assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the Assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
    }
}

impl FieldAccessFlags {
    /// Extract access flags from raw field attributes
    #[must_use]
    pub fn from_field_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & FIELD_ACCESS_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Field modifiers and properties
    pub struct FieldModifiers: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field may only be initialized, not written to after init
        const INIT_ONLY = 0x0020;
        /// Value is a compile time constant
        const LITERAL = 0x0040;
        /// Field does not have to be serialized when type is remoted
        const NOT_SERIALIZED = 0x0080;
        /// Field is special
        const SPECIAL_NAME = 0x0200;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// CLI provides special behavior, depending upon the name of the field
        const RT_SPECIAL_NAME = 0x0400;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
        /// Field has RVA-mapped initial data
        const HAS_FIELD_RVA = 0x0100;
    }
}

impl FieldModifiers {
    /// Extract modifiers from raw field attributes
    #[must_use]
    pub fn from_field_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !FIELD_ACCESS_MASK)
    }
}

/// A field definition.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Raw ECMA-335 field attributes
    pub flags: u32,
    /// Field type mention
    pub field_type: TypeRef,
    /// Compile-time constant for literal fields
    pub constant: Option<CaValue>,
    /// Explicit layout offset, if the declaring type uses one
    pub offset: Option<u32>,
    /// Custom attributes applied to the field
    pub custom_attributes: Vec<CustomAttribute>,
}

impl FieldDef {
    /// Create a field with the given name, raw flags and type.
    #[must_use]
    pub fn new(name: &str, flags: u32, field_type: TypeRef) -> Self {
        FieldDef {
            name: name.to_string(),
            flags,
            field_type,
            constant: None,
            offset: None,
            custom_attributes: Vec::new(),
        }
    }

    /// Extracted access group of the raw flags.
    #[must_use]
    pub fn access(&self) -> FieldAccessFlags {
        FieldAccessFlags::from_field_flags(self.flags)
    }
}

/// An event definition with its accessor links.
#[derive(Debug, Clone)]
pub struct EventDef {
    /// Event name
    pub name: String,
    /// Raw ECMA-335 event attributes
    pub flags: u16,
    /// Handler type mention (the delegate type)
    pub event_type: TypeRef,
    /// `add_` accessor, if bound
    pub add: Option<MethodId>,
    /// `remove_` accessor, if bound
    pub remove: Option<MethodId>,
    /// `raise_` accessor, if bound
    pub raise: Option<MethodId>,
    /// Custom attributes applied to the event
    pub custom_attributes: Vec<CustomAttribute>,
}

impl EventDef {
    /// Create an event with no accessor links.
    #[must_use]
    pub fn new(name: &str, event_type: TypeRef) -> Self {
        EventDef {
            name: name.to_string(),
            flags: 0,
            event_type,
            add: None,
            remove: None,
            raise: None,
            custom_attributes: Vec::new(),
        }
    }
}

/// A property definition with its accessor links.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// Property name
    pub name: String,
    /// Raw ECMA-335 property attributes
    pub flags: u16,
    /// Property type mention
    pub property_type: TypeRef,
    /// `get_` accessor, if bound
    pub getter: Option<MethodId>,
    /// `set_` accessor, if bound
    pub setter: Option<MethodId>,
    /// Custom attributes applied to the property
    pub custom_attributes: Vec<CustomAttribute>,
}

impl PropertyDef {
    /// Create a property with no accessor links.
    #[must_use]
    pub fn new(name: &str, property_type: TypeRef) -> Self {
        PropertyDef {
            name: name.to_string(),
            flags: 0,
            property_type,
            getter: None,
            setter: None,
            custom_attributes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::identity::ReferenceScope;

    fn int32() -> TypeRef {
        TypeRef::named(ReferenceScope::CurrentModule, "System", "Int32")
    }

    #[test]
    fn test_field_access_extraction() {
        let field = FieldDef::new(
            "counter",
            FieldAccessFlags::PRIVATE.bits() | FieldModifiers::STATIC.bits(),
            int32(),
        );
        assert_eq!(field.access(), FieldAccessFlags::PRIVATE);
        assert!(FieldModifiers::from_field_flags(field.flags).contains(FieldModifiers::STATIC));
    }

    #[test]
    fn test_accessor_links_default_unbound() {
        let event = EventDef::new("Changed", int32());
        assert!(event.add.is_none() && event.remove.is_none() && event.raise.is_none());

        let property = PropertyDef::new("Count", int32());
        assert!(property.getter.is_none() && property.setter.is_none());
    }
}
