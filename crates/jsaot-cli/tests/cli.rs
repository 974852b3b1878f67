//! Drives the built `jsaot` binary.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn jsaot() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jsaot"))
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn debug_with_input(args: &[&str], input: &str) -> Output {
    let mut child = jsaot()
        .arg("debug")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn jsaot");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn run_prints_program_output() {
    let output = jsaot().arg("run").arg(fixture("make_adder.js")).output().unwrap();
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "15\n");
}

#[test]
fn run_reports_unsupported_constructs() {
    let output = jsaot().arg("run").arg(fixture("string_variable.js")).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Codegen error at line 1"), "{}", stderr(&output));
    assert!(stdout(&output).is_empty());
}

#[test]
fn run_reports_missing_file() {
    let output = jsaot().arg("run").arg("/nonexistent/program.js").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to read"));
}

#[test]
fn captures_prints_report() {
    let output = jsaot().arg("captures").arg(fixture("counter.js")).output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "counter: n <- [anonymous@3]\n");
}

#[test]
fn build_writes_a_module() {
    let out = std::env::temp_dir().join(format!("jsaot-build-{}.wasm", std::process::id()));
    let output = jsaot()
        .arg("build")
        .arg(fixture("add.js"))
        .arg("-o")
        .arg(&out)
        .arg("--debug")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr(&output));
    let wasm = std::fs::read(&out).unwrap();
    assert_eq!(&wasm[..4], b"\0asm");
    std::fs::remove_file(&out).ok();
}

#[test]
fn oracle_passes_on_shipped_fixtures() {
    let output = jsaot().arg("test").output().unwrap();
    let report = stdout(&output);
    assert!(output.status.success(), "{report}");
    assert!(report.contains("XFAIL string_variable.js"));
    assert!(report.contains(" 0 failed"));
}

#[test]
fn oracle_filter_limits_fixtures() {
    let output = jsaot().args(["test", "--filter", "return_inner"]).output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("1 passed, 0 failed, 0 known failures, 0 unexpected passes"));
}

#[test]
fn oracle_fails_when_a_required_fixture_breaks() {
    let dir = std::env::temp_dir().join(format!("jsaot-fixtures-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("add.js"), "console.log(1);\n").unwrap();
    let output = jsaot()
        .args(["test", "--filter", "add.js", "--fixtures"])
        .arg(&dir)
        .output()
        .unwrap();
    std::fs::remove_dir_all(&dir).ok();
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("FAIL  add.js"));
}

#[test]
fn debug_stops_at_breakpoint() {
    let file = fixture("make_adder.js");
    let output = debug_with_input(&[file.to_str().unwrap(), "--break", "3"], "bt\nc\n");
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("paused at line 3"), "{text}");
    assert!(text.contains("#0 anonymous@2 (called from line 7)"), "{text}");
    assert!(text.ends_with("15\n"), "{text}");
}

#[test]
fn debug_without_breakpoints_stops_on_entry_and_runs_at_eof() {
    let file = fixture("add.js");
    let output = debug_with_input(&[file.to_str().unwrap()], "");
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("paused at line 1"), "{text}");
    assert!(text.ends_with("15\n"), "{text}");
}

#[test]
fn debug_rejects_breakpoint_on_empty_line() {
    let file = fixture("make_adder.js");
    let output = debug_with_input(&[file.to_str().unwrap(), "--break", "4"], "c\n");
    assert!(output.status.success());
    assert!(stderr(&output).contains("line 4 has no statement to stop at"));
}

#[test]
fn debug_quit_exits_cleanly() {
    let file = fixture("make_adder.js");
    let output = debug_with_input(&[file.to_str().unwrap(), "--break", "3"], "quit\n");
    assert!(output.status.success());
    assert!(!stdout(&output).contains("15"));
}
