//! Custom attributes and declarative security in resolved form.
//!
//! Attributes are stored structurally (constructor mention plus typed argument
//! values) rather than as raw blobs, because the reference fixator must rewrite
//! type mentions inside argument values after a merge - a blob would hide them.
//!
//! # Key Types
//! - [`CustomAttribute`] - constructor mention + fixed and named arguments
//! - [`CaArgument`] / [`CaValue`] / [`CaNamedArgument`] - typed argument values
//! - [`SecurityDeclaration`] / [`SecurityAttribute`] - declarative security data

use crate::metadata::typesystem::{MethodRef, TypeRef};

/// A typed custom-attribute argument value.
///
/// Closed enumeration over the serializable ECMA-335 value kinds. `Type`, the
/// `Enum` discriminant type and nested array elements carry type mentions that
/// participate in reference fix-up.
#[derive(Debug, Clone, PartialEq)]
pub enum CaValue {
    /// Boolean value
    Boolean(bool),
    /// UTF-16 code unit value
    Char(char),
    /// Signed 8-bit value
    Int8(i8),
    /// Unsigned 8-bit value
    UInt8(u8),
    /// Signed 16-bit value
    Int16(i16),
    /// Unsigned 16-bit value
    UInt16(u16),
    /// Signed 32-bit value
    Int32(i32),
    /// Unsigned 32-bit value
    UInt32(u32),
    /// Signed 64-bit value
    Int64(i64),
    /// Unsigned 64-bit value
    UInt64(u64),
    /// 32-bit floating point value
    Float32(f32),
    /// 64-bit floating point value
    Float64(f64),
    /// String value; `None` encodes a null string
    String(Option<String>),
    /// A `System.Type` argument
    Type(TypeRef),
    /// An enum value with its discriminant type
    Enum {
        /// The enum type
        enum_type: TypeRef,
        /// The raw discriminant value
        value: i64,
    },
    /// An array argument; `None` encodes a null array
    Array(Option<Vec<CaArgument>>),
}

/// A single fixed or array-element argument: declared type plus value.
#[derive(Debug, Clone, PartialEq)]
pub struct CaArgument {
    /// Declared argument type
    pub arg_type: TypeRef,
    /// Argument value
    pub value: CaValue,
}

/// A named (field or property) custom-attribute argument.
#[derive(Debug, Clone, PartialEq)]
pub struct CaNamedArgument {
    /// `true` when the target is a field, `false` for a property
    pub is_field: bool,
    /// Name of the target field or property
    pub name: String,
    /// The argument type and value
    pub argument: CaArgument,
}

/// A custom attribute application.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttribute {
    /// Mention of the attribute constructor
    pub constructor: MethodRef,
    /// Positional constructor arguments
    pub fixed_args: Vec<CaArgument>,
    /// Named field/property arguments
    pub named_args: Vec<CaNamedArgument>,
}

impl CustomAttribute {
    /// An attribute application with no arguments.
    #[must_use]
    pub fn marker(constructor: MethodRef) -> Self {
        CustomAttribute {
            constructor,
            fixed_args: Vec::new(),
            named_args: Vec::new(),
        }
    }
}

/// A single security attribute inside a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityAttribute {
    /// The permission attribute type
    pub attribute_type: TypeRef,
    /// Property settings of the permission
    pub named_args: Vec<CaNamedArgument>,
}

/// A declarative security declaration (one security action with its permission set).
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityDeclaration {
    /// ECMA-335 security action code
    pub action: u16,
    /// Permission attributes of the set
    pub attributes: Vec<SecurityAttribute>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::token::MethodId;

    #[test]
    fn test_marker_attribute() {
        let attr = CustomAttribute::marker(MethodRef::Definition(MethodId::new(1)));
        assert!(attr.fixed_args.is_empty());
        assert!(attr.named_args.is_empty());
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(CaValue::Int32(42), CaValue::Int32(42));
        assert_ne!(CaValue::Int32(42), CaValue::Int64(42));
        assert_eq!(CaValue::String(None), CaValue::String(None));
        assert_ne!(
            CaValue::String(None),
            CaValue::String(Some(String::new()))
        );
    }
}
