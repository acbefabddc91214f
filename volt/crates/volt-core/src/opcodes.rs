//! The instruction set.
//!
//! One byte per opcode. Constant-pool indices and local slots are one
//! operand byte; jump offsets are two bytes, big-endian. The bitwise and
//! fused-logic opcodes are reserved: the compiler never emits them, but they
//! occupy stable encodings and the disassembler knows their names.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Op {
    // actions
    Return,
    LoadConst,
    Pop,
    PopN,

    // statements
    Print,
    DefineGlobal,
    GetGlobal,
    SetGlobal,
    GetLocal,
    SetLocal,

    // literal loads
    Nil,
    True,
    False,

    // arithmetic
    Negate,
    Add,
    Subtract,
    Multiply,
    Divide,

    // logic
    LogicNot,
    LogicAnd,
    LogicOr,
    LogicEqual,
    LogicGreater,
    LogicLess,

    // bitwise (reserved)
    BitNot,
    BitAnd,
    BitOr,

    // jumps
    JumpIfFalse,
    JumpIfTrue,
    Jump,
    Loop,

    // functions
    Call,
}

impl Op {
    /// Disassembler name, matching the C-style `OP_*` spelling the debug
    /// output has always used.
    pub fn name(self) -> &'static str {
        match self {
            Op::Return => "OP_RETURN",
            Op::LoadConst => "OP_LOADCONST",
            Op::Pop => "OP_POP",
            Op::PopN => "OP_POPN",
            Op::Print => "OP_PRINT",
            Op::DefineGlobal => "OP_DEFINE_GLOBAL",
            Op::GetGlobal => "OP_GET_GLOBAL",
            Op::SetGlobal => "OP_SET_GLOBAL",
            Op::GetLocal => "OP_GET_LOCAL",
            Op::SetLocal => "OP_SET_LOCAL",
            Op::Nil => "OP_NIL",
            Op::True => "OP_TRUE",
            Op::False => "OP_FALSE",
            Op::Negate => "OP_NEGATE",
            Op::Add => "OP_ADD",
            Op::Subtract => "OP_SUBTRACT",
            Op::Multiply => "OP_MULTIPLY",
            Op::Divide => "OP_DIVIDE",
            Op::LogicNot => "OP_LOGIC_NOT",
            Op::LogicAnd => "OP_LOGIC_AND",
            Op::LogicOr => "OP_LOGIC_OR",
            Op::LogicEqual => "OP_LOGIC_EQUAL",
            Op::LogicGreater => "OP_LOGIC_GREATER",
            Op::LogicLess => "OP_LOGIC_LESS",
            Op::BitNot => "OP_BIT_NOT",
            Op::BitAnd => "OP_BIT_AND",
            Op::BitOr => "OP_BIT_OR",
            Op::JumpIfFalse => "OP_JUMP_IF_FALSE",
            Op::JumpIfTrue => "OP_JUMP_IF_TRUE",
            Op::Jump => "OP_JUMP",
            Op::Loop => "OP_LOOP",
            Op::Call => "OP_CALL",
        }
    }
}
