//! Code-generation helpers.
//!
//! Everything here appends to the chunk of the function currently being
//! compiled, stamping each byte with the line of the token that produced it.

use volt_core::{Chunk, Op, Value};

use crate::Parser;

impl<'src> Parser<'src> {
    pub(crate) fn current_chunk(&mut self) -> &mut Chunk {
        &mut self.compiler.function.chunk
    }

    pub(crate) fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.current_chunk().write(byte, line);
    }

    pub(crate) fn emit_op(&mut self, op: Op) {
        self.emit_byte(op.into());
    }

    pub(crate) fn emit_ops(&mut self, first: Op, second: Op) {
        self.emit_op(first);
        self.emit_op(second);
    }

    pub(crate) fn emit_op_byte(&mut self, op: Op, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand);
    }

    /// Stores `value` in the constant pool, reporting an error when the
    /// index no longer fits in an operand byte.
    pub(crate) fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.current_chunk().add_constant(value);
        if index > u8::MAX as usize {
            self.error("Too many constants in one chunk");
            return 0;
        }
        index as u8
    }

    pub(crate) fn emit_const(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_byte(Op::LoadConst, index);
    }

    /// Emits a jump with a placeholder offset and returns the offset of the
    /// operand bytes so `patch_jump` can fill them in later.
    pub(crate) fn emit_jump(&mut self, op: Op) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().code.len() - 2
    }

    /// Backpatches a forward jump to land on the next instruction to be
    /// emitted. The offset is relative to the byte after the operand.
    pub(crate) fn patch_jump(&mut self, operand_offset: usize) {
        let jump = self.current_chunk().code.len() - operand_offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too long jump.");
            return;
        }

        let [hi, lo] = (jump as u16).to_be_bytes();
        self.current_chunk().code[operand_offset] = hi;
        self.current_chunk().code[operand_offset + 1] = lo;
    }

    /// Emits a backward jump to `loop_start`. The operand is a positive
    /// distance the VM subtracts from the pc.
    pub(crate) fn emit_loop(&mut self, loop_start: usize) {
        let offset = self.current_chunk().code.len() - loop_start + 3;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }

        let [hi, lo] = (offset as u16).to_be_bytes();
        self.emit_op(Op::Loop);
        self.emit_byte(hi);
        self.emit_byte(lo);
    }

    /// The implicit return every function body ends with.
    pub(crate) fn emit_return(&mut self) {
        self.emit_ops(Op::Nil, Op::Return);
    }
}
