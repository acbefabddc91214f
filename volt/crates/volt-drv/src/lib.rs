//! volt-drv - Driver for the Volt interpreter
//!
//! Glue between the outside world and the VM: reads script files, runs the
//! REPL, and maps results onto the interpreter's exit codes:
//!
//! - `0`  success
//! - `65` compile error
//! - `71` runtime error
//! - `74` the script file could not be read
//!
//! Compile and runtime diagnostics are printed by the compiler and the VM
//! themselves; the driver only reports file-access failures.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use volt_vm::{InterpretError, Vm};

/// Driver-level failure, carrying everything `main` needs for its exit code.
#[derive(Debug, Error)]
pub enum VoltError {
    /// The script file was missing or unreadable.
    #[error("Could not open file \"{}\".", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Compilation or execution failed; diagnostics are already printed.
    #[error(transparent)]
    Interpret(#[from] InterpretError),
}

impl VoltError {
    pub fn exit_code(&self) -> i32 {
        match self {
            VoltError::ReadSource { .. } => 74,
            VoltError::Interpret(InterpretError::Compile) => 65,
            VoltError::Interpret(InterpretError::Runtime) => 71,
        }
    }
}

/// Executes a script file in a fresh VM.
pub fn run_file(path: &Path, disasm: bool) -> Result<(), VoltError> {
    debug!(path = %path.display(), "running file");

    let source = std::fs::read_to_string(path).map_err(|source| VoltError::ReadSource {
        path: path.to_path_buf(),
        source,
    })?;

    let mut vm = Vm::new();
    run_source(&mut vm, &source, disasm)?;
    Ok(())
}

/// Line-buffered REPL on one long-lived VM, so globals and interned strings
/// accumulate across inputs. Errors are reported and the loop keeps going;
/// EOF ends the session.
pub fn repl(disasm: bool) -> Result<(), VoltError> {
    debug!("starting repl");

    let mut vm = Vm::new();
    let mut line = String::new();
    loop {
        print!(">> ");
        let _ = io::stdout().flush();

        line.clear();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => {
                println!("Exiting...");
                return Ok(());
            }
            Ok(_) => {
                // One bad line must not end the session.
                let _ = run_source(&mut vm, &line, disasm);
            }
        }
    }
}

fn run_source(vm: &mut Vm, source: &str, disasm: bool) -> Result<(), VoltError> {
    if disasm {
        let script = vm.compile_source(source)?;
        print!("{}", vm.disassemble(script));
        vm.execute(script)?;
    } else {
        vm.interpret(source)?;
    }
    Ok(())
}
