//! volt-vm - The bytecode interpreter
//!
//! A stack machine with call frames. [`Vm::interpret`] is the whole public
//! pipeline: compile the source through `volt-compile`, push the resulting
//! script function, and dispatch instructions until the outermost frame
//! returns or an error unwinds everything.
//!
//! The VM owns the [`Heap`](volt_core::Heap), so interned strings, compiled
//! functions, and globals all survive across `interpret` calls; that is what
//! makes a REPL session accumulate state. Dropping the VM releases every
//! object at once.

mod natives;
mod vm;

pub use vm::{InterpretError, Vm, FRAMES_MAX, STACK_MAX};
