//! Method bodies: instructions, locals and exception-handler regions.
//!
//! Branch targets and switch tables are instruction *indices* into the owning
//! body's instruction list, not byte offsets or instruction pointers. Cloning a
//! body therefore preserves positional correspondence by construction:
//! instruction `i` in a clone always corresponds to instruction `i` in its
//! source, and copied target indices stay valid in the clone.
//!
//! # Key Types
//! - [`MethodBody`] - instruction list, locals, handlers
//! - [`Instruction`] / [`Operand`] / [`Immediate`] - decoded instruction form
//! - [`LocalVariable`] - a local slot
//! - [`ExceptionHandler`] / [`HandlerKind`] - protected-region data

use crate::metadata::typesystem::{FieldRef, MethodRef, TypeRef};

/// Represents an immediate value type embedded in an instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit immediate value
    Int8(i8),
    /// Signed 32-bit immediate value
    Int32(i32),
    /// Signed 64-bit immediate value
    Int64(i64),
    /// 32-bit floating point immediate value
    Float32(f32),
    /// 64-bit floating point immediate value
    Float64(f64),
}

/// A structured instruction operand.
///
/// Closed enumeration over the operand kinds the merge engine must rewrite;
/// symbolic operands (field/method/type) are imported like any other mention,
/// positional operands (`Target`, `Switch`) are copied by index.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand present
    None,
    /// Immediate value (constant embedded in instruction)
    Immediate(Immediate),
    /// Inline string (user-string heap reference in serialized form)
    String(String),
    /// Local variable index
    Local(u16),
    /// Method argument index
    Argument(u16),
    /// Branch target: index of the target instruction in the owning body
    Target(usize),
    /// Switch table: target instruction indices in the owning body
    Switch(Vec<usize>),
    /// Field mention
    Field(FieldRef),
    /// Method mention
    Method(MethodRef),
    /// Type mention
    Type(TypeRef),
}

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Instruction mnemonic (e.g. `"br"`, `"callvirt"`)
    pub mnemonic: &'static str,
    /// Structured operand
    pub operand: Operand,
}

impl Instruction {
    /// Create an instruction from its mnemonic and operand.
    #[must_use]
    pub fn new(mnemonic: &'static str, operand: Operand) -> Self {
        Instruction { mnemonic, operand }
    }
}

/// Represents a local variable in a method body.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    /// The type of this variable
    pub var_type: TypeRef,
    /// This variable is pinned
    pub is_pinned: bool,
}

impl LocalVariable {
    /// Create an unpinned local of the given type.
    #[must_use]
    pub fn new(var_type: TypeRef) -> Self {
        LocalVariable {
            var_type,
            is_pinned: false,
        }
    }
}

/// Kind of an exception handler region.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerKind {
    /// Typed catch handler
    Catch {
        /// The exception type this handler catches
        catch_type: TypeRef,
    },
    /// Filter handler; the filter block starts at the given instruction index
    Filter {
        /// Index of the first filter instruction
        filter_start: usize,
    },
    /// Finally handler
    Finally,
    /// Fault handler
    Fault,
}

/// A protected region and its handler, with boundaries as instruction indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
    /// Handler kind and kind-specific data
    pub kind: HandlerKind,
    /// Index of the first protected instruction
    pub try_start: usize,
    /// Index one past the last protected instruction
    pub try_end: usize,
    /// Index of the first handler instruction
    pub handler_start: usize,
    /// Index one past the last handler instruction
    pub handler_end: usize,
}

/// A method body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodBody {
    /// Maximum evaluation stack depth
    pub max_stack: u16,
    /// Whether locals are zero-initialized
    pub init_locals: bool,
    /// Local variable slots, in signature order
    pub locals: Vec<LocalVariable>,
    /// Instruction sequence
    pub instructions: Vec<Instruction>,
    /// Exception handler regions
    pub handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// An empty body with `init_locals` set, the common compiler default.
    #[must_use]
    pub fn new() -> Self {
        MethodBody {
            max_stack: 8,
            init_locals: true,
            ..Default::default()
        }
    }

    /// Indices of all branch targets mentioned by any instruction, in
    /// instruction order. Used by the positional-correspondence checks.
    #[must_use]
    pub fn branch_targets(&self) -> Vec<usize> {
        let mut targets = Vec::new();
        for instruction in &self.instructions {
            match &instruction.operand {
                Operand::Target(index) => targets.push(*index),
                Operand::Switch(table) => targets.extend_from_slice(table),
                _ => {}
            }
        }
        targets
    }
}
