use std::fmt;

use crate::common::data::Data;

/// A single instruction.
/// The set is closed; the VM panics on nothing, because there is
/// no way to construct an instruction outside this enum.
/// Branch offsets are relative to the instruction *after* the branch,
/// so a taken branch sets `pc = pc + 1 + offset` and an offset of zero
/// is a plain fall-through.
#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    /// Push a constant onto the stack.
    PushConst(Data),
    /// Look a name up through the environment chain and push its value.
    PushName(String),
    /// Bind the popped value to a new name in the current scope.
    /// Rebinding a name already present in the current scope is an error.
    StoreName(String),
    /// Replace the binding of an existing name, wherever in the
    /// environment chain it was defined.
    AssignName(String),
    /// Pop left, pop right, push `left + right`.
    BinaryAdd,
    /// Pop left, pop right, push `left - right`.
    BinarySub,
    /// Pop left, pop right, push `left * right`.
    BinaryMul,
    /// Pop left, pop right, push `left / right` (truncating).
    BinaryDiv,
    /// Pop two integers, push their equality.
    BinaryEq,
    /// Pop two integers, push `left > right`.
    BinaryGt,
    /// Pop two integers, push `left < right`.
    BinaryLt,
    /// Pop two integers, push `left >= right`.
    BinaryGe,
    /// Pop two integers, push `left <= right`.
    BinaryLe,
    /// Pop two bools, push their conjunction. Both operands were
    /// already evaluated; `and` does not short-circuit.
    BinaryAnd,
    /// Pop two bools, push their disjunction.
    BinaryOr,
    /// Pop the indexed value, pop the index, push the element.
    BinaryIndex,
    /// Pop an integer, push its negation.
    UnaryMinus,
    /// Pop the callee, pop its arguments, run it, push the result.
    CallFunction(usize),
    /// Pop this many values into a fresh list.
    MakeList(usize),
    /// Pop this many value-key pairs into a fresh map.
    MakeMap(usize),
    /// Advance the iteration of the list on the stack: push its next
    /// element, or on exhaustion discard it and branch past the loop.
    ListNext(isize),
    /// Terminate this execution frame, yielding the top of stack.
    ReturnValue,
    /// Branch unconditionally (backwards when negative).
    RelJump(isize),
    /// Pop a bool; branch when it is false, fall through when true.
    RelJumpIfFalse(isize),
}

impl fmt::Display for Opcode {
    /// One disassembly line, without the instruction index.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::PushConst(data) => write!(f, "push_const {}", data.repr()),
            Opcode::PushName(name) => write!(f, "push_name {}", name),
            Opcode::StoreName(name) => write!(f, "store_name {}", name),
            Opcode::AssignName(name) => write!(f, "assign_name {}", name),
            Opcode::BinaryAdd => write!(f, "binary_add"),
            Opcode::BinarySub => write!(f, "binary_sub"),
            Opcode::BinaryMul => write!(f, "binary_mul"),
            Opcode::BinaryDiv => write!(f, "binary_div"),
            Opcode::BinaryEq => write!(f, "binary_eq"),
            Opcode::BinaryGt => write!(f, "binary_gt"),
            Opcode::BinaryLt => write!(f, "binary_lt"),
            Opcode::BinaryGe => write!(f, "binary_ge"),
            Opcode::BinaryLe => write!(f, "binary_le"),
            Opcode::BinaryAnd => write!(f, "binary_and"),
            Opcode::BinaryOr => write!(f, "binary_or"),
            Opcode::BinaryIndex => write!(f, "binary_index"),
            Opcode::UnaryMinus => write!(f, "unary_minus"),
            Opcode::CallFunction(count) => write!(f, "call_function {}", count),
            Opcode::MakeList(count) => write!(f, "make_list {}", count),
            Opcode::MakeMap(count) => write!(f, "make_map {}", count),
            Opcode::ListNext(skip) => write!(f, "list_next {:+}", skip),
            Opcode::ReturnValue => write!(f, "return_value"),
            Opcode::RelJump(offset) => write!(f, "rel_jump {:+}", offset),
            Opcode::RelJumpIfFalse(offset) => write!(f, "rel_jump_if_false {:+}", offset),
        }
    }
}
