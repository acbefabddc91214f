//! CLI end-to-end tests.
//!
//! Each test writes a script to a temp directory, runs the `volt` binary on
//! it, and checks stdout, stderr, and the exit code.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn volt_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_volt"))
}

fn write_script(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, source).expect("write script");
    path
}

fn run_script(path: &Path) -> Command {
    let mut cmd = Command::new(volt_bin());
    cmd.arg(path);
    cmd
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::new(volt_bin());
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("volt"));
}

#[test]
fn test_arithmetic_precedence() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "arith.volt", "print 1 + 2 * 3;\n");
    run_script(&script).assert().success().stdout("7\n");
}

#[test]
fn test_interned_strings_compare_equal() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(
        &dir,
        "intern.volt",
        "var x = \"foo\"; var y = \"foo\"; print x == y;\n",
    );
    run_script(&script).assert().success().stdout("true\n");
}

#[test]
fn test_while_loop_counts() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(
        &dir,
        "loop.volt",
        "var a = 0; while (a < 3) { print a; a = a + 1; }\n",
    );
    run_script(&script).assert().success().stdout("0\n1\n2\n");
}

#[test]
fn test_nil_is_falsey() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(
        &dir,
        "falsey.volt",
        "if (nil) print \"t\"; else print \"f\";\n",
    );
    run_script(&script).assert().success().stdout("f\n");
}

#[test]
fn test_fib_recursion() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(
        &dir,
        "fib.volt",
        "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);\n",
    );
    run_script(&script).assert().success().stdout("55\n");
}

#[test]
fn test_undefined_variable_exits_71() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "undef.volt", "print undefined_var;\n");
    run_script(&script)
        .assert()
        .code(71)
        .stderr(predicate::str::contains("Undefined variable \"undefined_var\"."))
        .stderr(predicate::str::contains("[line 1] in script"));
}

#[test]
fn test_nil_arithmetic_exits_71() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "nilmath.volt", "var a; a = a + 1;\n");
    run_script(&script)
        .assert()
        .code(71)
        .stderr(predicate::str::contains("Operands must be"));
}

#[test]
fn test_compile_error_exits_65() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "syntax.volt", "var = 1;\n");
    run_script(&script)
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Syntax error"));
}

#[test]
fn test_runtime_error_reports_real_line() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "lines.volt", "print 1;\nprint 2;\nprint boom;\n");
    run_script(&script)
        .assert()
        .code(71)
        .stdout("1\n2\n")
        .stderr(predicate::str::contains("[line 3] in script"));
}

#[test]
fn test_missing_file_exits_74() {
    let mut cmd = Command::new(volt_bin());
    cmd.arg("definitely_not_here.volt");
    cmd.assert()
        .code(74)
        .stderr(predicate::str::contains(
            "Could not open file \"definitely_not_here.volt\".",
        ));
}

#[test]
fn test_string_concatenation_output() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "concat.volt", "print \"foo\" + \"bar\";\n");
    run_script(&script).assert().success().stdout("foobar\n");
}

#[test]
fn test_multiline_string_literal() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "multiline.volt", "print \"one\ntwo\";\n");
    run_script(&script).assert().success().stdout("one\ntwo\n");
}

#[test]
fn test_input_num_reads_stdin() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "input.volt", "print input_num() + 1;\n");
    run_script(&script)
        .write_stdin("41\n")
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn test_input_num_garbage_yields_nil() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "input_nil.volt", "print input_num();\n");
    run_script(&script)
        .write_stdin("not a number\n")
        .assert()
        .success()
        .stdout("nil\n");
}

#[test]
fn test_disasm_flag_prints_bytecode_then_runs() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(&dir, "disasm.volt", "print 1 + 2;\n");
    let mut cmd = Command::new(volt_bin());
    cmd.arg("--disasm").arg(&script);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("==== <main> ===="))
        .stdout(predicate::str::contains("OP_ADD"))
        .stdout(predicate::str::contains("\n3\n"));
}

/* REPL behavior */

#[test]
fn test_repl_prompt_and_exit() {
    let mut cmd = Command::new(volt_bin());
    cmd.write_stdin("print 40 + 2;\n");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(">> "))
        .stdout(predicate::str::contains("42"))
        .stdout(predicate::str::contains("Exiting..."));
}

#[test]
fn test_repl_keeps_globals_across_lines() {
    let mut cmd = Command::new(volt_bin());
    cmd.write_stdin("var a = 10;\nprint a * 2;\n");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("20"));
}

#[test]
fn test_repl_survives_errors() {
    let mut cmd = Command::new(volt_bin());
    cmd.write_stdin("print missing;\nprint \"still alive\";\n");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("still alive"))
        .stderr(predicate::str::contains("Undefined variable"));
}
