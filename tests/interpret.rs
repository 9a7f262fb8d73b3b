// End-to-end tests for the loxide interpreter.
//
// The VM prints directly to stdout (`println!` in `vm.rs`'s `OP_PRINT`
// handler, matching `original_source/lox/src/vm.c`'s own `printf`),
// so these tests drive the built binary as a subprocess and assert on
// its captured stdout/exit code, the way a CLI's own end-to-end suite
// would -- there's no in-process `Write` sink to intercept instead.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

fn script_path(source: &str) -> std::path::PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!("loxide_test_{}_{}.lox", std::process::id(), n));
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(source.as_bytes()).unwrap();
    path
}

struct RunOutput {
    stdout: String,
    stderr: String,
    code: i32,
}

fn run(source: &str) -> RunOutput {
    let path = script_path(source);
    let output = Command::new(env!("CARGO_BIN_EXE_loxide"))
        .arg(&path)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run loxide binary");
    let _ = std::fs::remove_file(&path);
    RunOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        code: output.status.code().unwrap_or(-1),
    }
}

#[test]
fn arithmetic_precedence() {
    let out = run("print 1 + 2 * 3;");
    assert_eq!(out.stdout.trim_end(), "7");
    assert_eq!(out.code, 0);
}

#[test]
fn string_concatenation_prints_quoted() {
    let out = run(r#"var a = "hi"; var b = "!"; print a + b;"#);
    assert_eq!(out.stdout.trim_end(), "\"hi!\"");
    assert_eq!(out.code, 0);
}

#[test]
fn closures_share_captured_upvalue_across_calls() {
    let out = run(
        "fun make() { var x = 1; fun inc() { x = x + 1; return x; } return inc; } \
         var f = make(); print f(); print f(); print f();",
    );
    assert_eq!(out.stdout.trim_end(), "2\n3\n4");
    assert_eq!(out.code, 0);
}

#[test]
fn inheritance_and_super_dispatch() {
    let out = run(
        "class A { greet() { print \"A\"; } } \
         class B < A { greet() { super.greet(); print \"B\"; } } \
         B().greet();",
    );
    assert_eq!(out.stdout.trim_end(), "A\nB");
    assert_eq!(out.code, 0);
}

#[test]
fn undefined_global_is_a_runtime_error() {
    let out = run("print foo;");
    assert!(out.stderr.starts_with("Undefined variable 'foo'."));
    assert!(out.stderr.contains("[line 1] in script"));
    assert_eq!(out.code, 70);
}

#[test]
fn nested_blocks_shadow_and_restore_locals() {
    let out = run("var x = 1; { var x = 2; { var x = 3; print x; } print x; } print x;");
    assert_eq!(out.stdout.trim_end(), "3\n2\n1");
    assert_eq!(out.code, 0);
}

#[test]
fn compile_error_exits_65_and_reports_to_stderr() {
    let out = run("var ;");
    assert_eq!(out.code, 65);
    assert!(out.stderr.contains("Error"));
}

#[test]
fn calling_a_non_function_is_a_runtime_error() {
    let out = run("var x = 1; x();");
    assert!(out.stderr.contains("Can only call functions and classes."));
    assert_eq!(out.code, 70);
}

#[test]
fn classes_support_fields_and_methods() {
    let out = run(
        "class Counter { init() { this.n = 0; } bump() { this.n = this.n + 1; return this.n; } } \
         var c = Counter(); print c.bump(); print c.bump();",
    );
    assert_eq!(out.stdout.trim_end(), "1\n2");
    assert_eq!(out.code, 0);
}

#[test]
fn native_clock_returns_a_number() {
    let out = run("print clock() > 0;");
    assert_eq!(out.stdout.trim_end(), "true");
    assert_eq!(out.code, 0);
}

#[test]
fn usage_error_with_two_args_exits_64() {
    let output = Command::new(env!("CARGO_BIN_EXE_loxide"))
        .arg("one.lox")
        .arg("two.lox")
        .output()
        .expect("failed to run loxide binary");
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Usage:"));
}

#[test]
fn missing_file_exits_74() {
    let output = Command::new(env!("CARGO_BIN_EXE_loxide"))
        .arg("/nonexistent/path/does_not_exist.lox")
        .output()
        .expect("failed to run loxide binary");
    assert_eq!(output.status.code(), Some(74));
}
