//! Diagnostic disassembler.
//!
//! Renders chunks in the interpreter's traditional debug format. Everything
//! is returned as a `String` so callers can route it to stdout, a tracing
//! event, or a test assertion.

use std::fmt::Write;

use crate::chunk::Chunk;
use crate::heap::Heap;
use crate::opcodes::Op;

/// Renders a whole chunk with a header and footer.
pub fn disassemble_chunk(heap: &Heap, chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "==== {name} ====");
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(heap, chunk, offset, &mut out);
    }
    let _ = writeln!(out, "/====/ END CHUNK: {name} /====/");
    out
}

/// Renders the instruction at `offset` into `out` and returns the offset of
/// the next instruction.
pub fn disassemble_instruction(
    heap: &Heap,
    chunk: &Chunk,
    offset: usize,
    out: &mut String,
) -> usize {
    let _ = write!(out, "{offset:04} ");

    let byte = chunk.code[offset];
    let Ok(op) = Op::try_from(byte) else {
        let _ = writeln!(out, "Unknown opcode {byte}");
        return offset + 1;
    };

    match op {
        Op::LoadConst | Op::DefineGlobal | Op::GetGlobal | Op::SetGlobal => {
            const_instruction(heap, chunk, op, offset, out)
        }
        Op::GetLocal | Op::SetLocal | Op::PopN | Op::Call => {
            byte_instruction(chunk, op, offset, out)
        }
        Op::JumpIfFalse | Op::JumpIfTrue | Op::Jump => jump_instruction(chunk, op, 1, offset, out),
        Op::Loop => jump_instruction(chunk, op, -1, offset, out),
        _ => simple_instruction(op, offset, out),
    }
}

fn simple_instruction(op: Op, offset: usize, out: &mut String) -> usize {
    let _ = writeln!(out, "{}", op.name());
    offset + 1
}

fn byte_instruction(chunk: &Chunk, op: Op, offset: usize, out: &mut String) -> usize {
    let operand = chunk.code[offset + 1];
    let _ = writeln!(out, "{:<16} {:4}", op.name(), operand);
    offset + 2
}

fn jump_instruction(chunk: &Chunk, op: Op, sign: i64, offset: usize, out: &mut String) -> usize {
    let jump = u16::from_be_bytes([chunk.code[offset + 1], chunk.code[offset + 2]]);
    let target = offset as i64 + 3 + sign * i64::from(jump);
    let _ = writeln!(
        out,
        "{:<16} {:4} -> {} ({}{})",
        op.name(),
        offset,
        target,
        if sign == -1 { '-' } else { '+' },
        jump
    );
    offset + 3
}

fn const_instruction(
    heap: &Heap,
    chunk: &Chunk,
    op: Op,
    offset: usize,
    out: &mut String,
) -> usize {
    let index = chunk.code[offset + 1];
    let value = chunk.constants[index as usize];
    let _ = writeln!(
        out,
        "{:<16} {:4} '{}'",
        op.name(),
        index,
        heap.format_value(value)
    );
    offset + 2
}
