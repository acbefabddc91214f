//! The `volt` binary.
//!
//! `volt` with no arguments starts a REPL; `volt <script>` executes a file
//! and exits with 0, 65 (compile error), 71 (runtime error), or 74 (file
//! unreadable).

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use volt_drv::{repl, run_file, VoltError};

/// The Volt scripting language interpreter.
#[derive(Parser, Debug)]
#[command(name = "volt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "The Volt scripting language interpreter", long_about = None)]
struct Cli {
    /// Script to execute; starts a REPL when omitted
    script: Option<PathBuf>,

    /// Print the compiled bytecode before executing
    #[arg(long)]
    disasm: bool,

    /// Enable verbose output
    #[arg(short, long, env = "VOLT_VERBOSE")]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.script {
        Some(path) => run_file(path, cli.disasm),
        None => repl(cli.disasm),
    };

    if let Err(error) = result {
        // Interpreter diagnostics were already printed where they happened;
        // only file-access failures are reported here.
        if let VoltError::ReadSource { .. } = &error {
            eprintln!("{error}");
        }
        process::exit(error.exit_code());
    }
}

/// Installs the tracing subscriber. Logs go to stderr so program output on
/// stdout stays clean.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
