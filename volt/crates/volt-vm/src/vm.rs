//! The stack machine.

use std::fmt::Write as _;

use thiserror::Error;
use tracing::{debug, trace};

use volt_compile::compile;
use volt_core::{disassemble_chunk, disassemble_instruction, FunId, Heap, Obj, Op, Table, Value};

use crate::natives;

/// Maximum call depth, the script frame included.
pub const FRAMES_MAX: usize = 64;

/// Value-stack capacity: 256 slots per frame.
pub const STACK_MAX: usize = 256 * FRAMES_MAX;

/// The three-valued interpretation result, minus the OK case that `Ok(())`
/// covers. Diagnostics are printed before either variant is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("compile error")]
    Compile,
    #[error("runtime error")]
    Runtime,
}

/// A suspended activation: where to resume when the callee returns.
struct CallFrame {
    fun: FunId,
    pc: usize,
    base: usize,
}

pub struct Vm {
    heap: Heap,
    stack: Vec<Value>,
    /// Suspended callers; the running frame lives in `run`'s locals.
    frames: Vec<CallFrame>,
    globals: Table,
}

impl Vm {
    pub fn new() -> Self {
        // Anchor clock() before any user code runs.
        std::sync::LazyLock::force(&natives::PROCESS_START);

        let mut vm = Self {
            heap: Heap::new(),
            stack: Vec::with_capacity(STACK_MAX),
            frames: Vec::with_capacity(FRAMES_MAX),
            globals: Table::new(),
        };
        vm.define_native("clock", natives::clock_native);
        vm.define_native("input_num", natives::input_num_native);
        vm
    }

    fn define_native(&mut self, name: &str, fun: volt_core::NativeFn) {
        let name = self.heap.intern(name);
        let id = self.heap.alloc_native(fun);
        self.globals
            .set(&self.heap.strings, name, Value::Obj(Obj::Native(id)));
    }

    /// Compiles and runs a program. Compile diagnostics go to stderr as they
    /// are found; a runtime error prints its message plus the offending line
    /// and resets the stack, leaving the VM reusable.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let script = self.compile_source(source)?;
        self.execute(script)
    }

    /// Compiles without running; the heap keeps the compiled function.
    pub fn compile_source(&mut self, source: &str) -> Result<FunId, InterpretError> {
        compile(source, &mut self.heap).map_err(|_| InterpretError::Compile)
    }

    /// Runs a previously compiled function as the top-level script.
    pub fn execute(&mut self, fun: FunId) -> Result<(), InterpretError> {
        debug!("executing script");
        self.stack.push(Value::Obj(Obj::Fun(fun)));
        self.run(fun)
    }

    /// Renders a compiled function's chunk for diagnostics.
    pub fn disassemble(&self, fun: FunId) -> String {
        let function = self.heap.function(fun);
        let label = self.heap.format_value(Value::Obj(Obj::Fun(fun)));
        disassemble_chunk(&self.heap, &function.chunk, &label)
    }

    /* stack primitives */

    #[inline]
    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline]
    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Nil)
    }

    #[inline]
    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    /* operand decoding */

    #[inline]
    fn read_byte(&self, fun: FunId, pc: &mut usize) -> u8 {
        let byte = self.heap.function(fun).chunk.code[*pc];
        *pc += 1;
        byte
    }

    #[inline]
    fn read_u16(&self, fun: FunId, pc: &mut usize) -> u16 {
        let chunk = &self.heap.function(fun).chunk;
        let value = u16::from_be_bytes([chunk.code[*pc], chunk.code[*pc + 1]]);
        *pc += 2;
        value
    }

    #[inline]
    fn read_const(&self, fun: FunId, pc: &mut usize) -> Value {
        let index = self.read_byte(fun, pc);
        self.heap.function(fun).chunk.constants[index as usize]
    }

    /// Reports a runtime error with the line of the instruction that
    /// raised it, resets the stack, and yields the error to return.
    fn runtime_error(&mut self, fun: FunId, pc: usize, message: String) -> InterpretError {
        eprintln!("{message}");
        let line = self.heap.function(fun).chunk.line_at(pc.saturating_sub(1));
        eprintln!("[line {line}] in script");

        self.stack.clear();
        self.frames.clear();
        InterpretError::Runtime
    }

    /// The dispatch loop. The running frame is held in locals (`fun`, `pc`,
    /// `base`) and synced with the frame stack only on calls and returns.
    fn run(&mut self, mut fun: FunId) -> Result<(), InterpretError> {
        let mut pc: usize = 0;
        let mut base: usize = 0;

        macro_rules! read_name {
            () => {
                match self.read_const(fun, &mut pc) {
                    Value::Obj(Obj::Str(id)) => id,
                    _ => {
                        return Err(self.runtime_error(
                            fun,
                            pc,
                            "Corrupt constant pool entry".to_string(),
                        ))
                    }
                }
            };
        }

        macro_rules! binary_op {
            ($wrap:expr, $op:tt) => {{
                let (Value::Number(b), Value::Number(a)) = (self.peek(0), self.peek(1)) else {
                    return Err(self.runtime_error(
                        fun,
                        pc,
                        "Operands must be numbers.".to_string(),
                    ));
                };
                self.pop();
                self.pop();
                self.push($wrap(a $op b));
            }};
        }

        loop {
            if self.stack.len() >= STACK_MAX {
                return Err(self.runtime_error(fun, pc, "Stack overflow".to_string()));
            }

            if tracing::enabled!(tracing::Level::TRACE) {
                self.trace_instruction(fun, pc);
            }

            let byte = self.read_byte(fun, &mut pc);
            let Ok(op) = Op::try_from(byte) else {
                return Err(self.runtime_error(fun, pc, format!("Unknown opcode {byte}")));
            };

            match op {
                Op::Return => {
                    let result = self.pop();
                    match self.frames.pop() {
                        None => {
                            // The script function itself still sits in slot 0.
                            self.pop();
                            debug_assert!(self.stack.is_empty());
                            return Ok(());
                        }
                        Some(caller) => {
                            self.stack.truncate(base);
                            self.push(result);
                            fun = caller.fun;
                            pc = caller.pc;
                            base = caller.base;
                        }
                    }
                }

                Op::LoadConst => {
                    let value = self.read_const(fun, &mut pc);
                    self.push(value);
                }

                Op::Pop => {
                    self.pop();
                }
                Op::PopN => {
                    let n = self.read_byte(fun, &mut pc) as usize;
                    self.stack.truncate(self.stack.len() - n);
                }

                Op::Nil => self.push(Value::Nil),
                Op::True => self.push(Value::Bool(true)),
                Op::False => self.push(Value::Bool(false)),

                Op::Negate => {
                    let Value::Number(n) = self.peek(0) else {
                        return Err(self.runtime_error(
                            fun,
                            pc,
                            "Operand must be a number".to_string(),
                        ));
                    };
                    self.pop();
                    self.push(Value::Number(-n));
                }

                Op::Add => {
                    let b = self.peek(0);
                    let a = self.peek(1);
                    match (a, b) {
                        (Value::Obj(Obj::Str(x)), Value::Obj(Obj::Str(y))) => {
                            self.pop();
                            self.pop();
                            let joined = self.heap.concatenate(x, y);
                            self.push(Value::Obj(Obj::Str(joined)));
                        }
                        (Value::Number(x), Value::Number(y)) => {
                            self.pop();
                            self.pop();
                            self.push(Value::Number(x + y));
                        }
                        _ => {
                            return Err(self.runtime_error(
                                fun,
                                pc,
                                "Operands must be two numbers or strings.".to_string(),
                            ));
                        }
                    }
                }
                Op::Subtract => binary_op!(Value::Number, -),
                Op::Multiply => binary_op!(Value::Number, *),
                Op::Divide => binary_op!(Value::Number, /),

                Op::LogicNot => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                Op::LogicEqual => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                Op::LogicGreater => binary_op!(Value::Bool, >),
                Op::LogicLess => binary_op!(Value::Bool, <),

                Op::Print => {
                    let value = self.pop();
                    println!("{}", self.heap.format_value(value));
                }

                Op::DefineGlobal => {
                    let name = read_name!();
                    let value = self.peek(0);
                    self.globals.set(&self.heap.strings, name, value);
                    self.pop();
                }

                Op::GetGlobal => {
                    let name = read_name!();
                    match self.globals.get(&self.heap.strings, name) {
                        Some(value) => self.push(value),
                        None => {
                            let message =
                                format!("Undefined variable \"{}\".", self.heap.str_text(name));
                            return Err(self.runtime_error(fun, pc, message));
                        }
                    }
                }

                Op::SetGlobal => {
                    let name = read_name!();
                    let value = self.peek(0);
                    // Assignment must not define: a set that created the key
                    // is rolled back and reported.
                    if self.globals.set(&self.heap.strings, name, value) {
                        self.globals.delete(&self.heap.strings, name);
                        let message =
                            format!("Undefined variable \"{}\".", self.heap.str_text(name));
                        return Err(self.runtime_error(fun, pc, message));
                    }
                    // The value stays on the stack; assignment is an
                    // expression.
                }

                Op::GetLocal => {
                    let slot = self.read_byte(fun, &mut pc) as usize;
                    let value = self.stack[base + slot];
                    self.push(value);
                }

                Op::SetLocal => {
                    let slot = self.read_byte(fun, &mut pc) as usize;
                    self.stack[base + slot] = self.peek(0);
                }

                Op::JumpIfFalse => {
                    let offset = self.read_u16(fun, &mut pc);
                    // The condition is left on the stack; the compiled code
                    // around the jump pops it.
                    if self.peek(0).is_falsey() {
                        pc += offset as usize;
                    }
                }
                Op::JumpIfTrue => {
                    let offset = self.read_u16(fun, &mut pc);
                    if !self.peek(0).is_falsey() {
                        pc += offset as usize;
                    }
                }
                Op::Jump => {
                    let offset = self.read_u16(fun, &mut pc);
                    pc += offset as usize;
                }
                Op::Loop => {
                    let offset = self.read_u16(fun, &mut pc);
                    pc -= offset as usize;
                }

                Op::Call => {
                    let argc = self.read_byte(fun, &mut pc) as usize;
                    match self.peek(argc) {
                        Value::Obj(Obj::Fun(callee)) => {
                            let arity = self.heap.function(callee).arity as usize;
                            if argc != arity {
                                let message =
                                    format!("Expected {arity} arguments, got {argc}");
                                return Err(self.runtime_error(fun, pc, message));
                            }
                            if self.frames.len() + 1 >= FRAMES_MAX {
                                return Err(self.runtime_error(
                                    fun,
                                    pc,
                                    "Call stack overflow".to_string(),
                                ));
                            }
                            // Suspend the running frame and enter the callee;
                            // its slot 0 is the function itself.
                            self.frames.push(CallFrame { fun, pc, base });
                            fun = callee;
                            pc = 0;
                            base = self.stack.len() - argc - 1;
                        }
                        Value::Obj(Obj::Native(native)) => {
                            let callee = self.heap.native(native).fun;
                            let args_start = self.stack.len() - argc;
                            let result = callee(&self.stack[args_start..]);
                            // Drop the arguments and the callee slot.
                            self.stack.truncate(args_start - 1);
                            self.push(result);
                        }
                        _ => {
                            return Err(self.runtime_error(
                                fun,
                                pc,
                                "Can only call functions and classes".to_string(),
                            ));
                        }
                    }
                }

                // Reserved encodings: never emitted by the compiler.
                Op::LogicAnd | Op::LogicOr | Op::BitNot | Op::BitAnd | Op::BitOr => {
                    let message = format!("Unsupported instruction {}", op.name());
                    return Err(self.runtime_error(fun, pc, message));
                }
            }
        }
    }

    /// One line of execution trace: the stack left to right, then the
    /// instruction about to run.
    fn trace_instruction(&self, fun: FunId, pc: usize) {
        let mut stack_repr = String::new();
        for value in &self.stack {
            let _ = write!(stack_repr, "[ {} ]", self.heap.format_value(*value));
        }
        let mut instr = String::new();
        disassemble_instruction(&self.heap, &self.heap.function(fun).chunk, pc, &mut instr);
        trace!(stack = %stack_repr, instr = %instr.trim_end());
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
