use std::path::PathBuf;
use std::process::Command;

// ── helpers ──────────────────────────────────────────────────────────────────

fn pyxis_bin() -> PathBuf {
    // CARGO_BIN_EXE_pyxis is set by cargo test for integration tests
    PathBuf::from(env!("CARGO_BIN_EXE_pyxis"))
}

struct TempPy {
    dir: tempfile::TempDir,
    files: Vec<PathBuf>,
}

impl TempPy {
    fn new() -> Self {
        Self {
            dir: tempfile::TempDir::new().unwrap(),
            files: Vec::new(),
        }
    }

    fn file(&mut self, name: &str, content: &str) -> &mut Self {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        self.files.push(path);
        self
    }

    /// Run `pyxis <subcommand> <files> <extra>`.  Returns (stdout, stderr,
    /// exit code).
    fn run(&self, subcommand: &str, extra: &[&str]) -> (String, String, i32) {
        let mut cmd = Command::new(pyxis_bin());
        cmd.arg(subcommand);
        for f in &self.files {
            cmd.arg(f);
        }
        for a in extra {
            cmd.arg(a);
        }
        let out = cmd.output().expect("failed to run pyxis");
        (
            String::from_utf8_lossy(&out.stdout).into_owned(),
            String::from_utf8_lossy(&out.stderr).into_owned(),
            out.status.code().unwrap_or(-1),
        )
    }

    /// Convenience: `check` with --no-exit-code so exit code is always 0.
    fn check(&self, extra: &[&str]) -> String {
        let mut args = vec!["--no-exit-code"];
        args.extend_from_slice(extra);
        let (stdout, _, _) = self.run("check", &args);
        stdout
    }
}

// ── check: basic output ──────────────────────────────────────────────────────

#[test]
fn test_clean_file_no_output() {
    let mut t = TempPy::new();
    t.file("clean.py", "x = 1\nprint(x)\n");
    let out = t.check(&[]);
    assert!(out.contains("No violations found"));
}

#[test]
fn test_exit_code_0_when_clean() {
    let mut t = TempPy::new();
    t.file("clean.py", "x = 1\nprint(x)\n");
    let (_, _, code) = t.run("check", &[]);
    assert_eq!(code, 0);
}

#[test]
fn test_exit_code_1_on_violations() {
    let mut t = TempPy::new();
    t.file("bad.py", "import subprocess\n");
    let (_, _, code) = t.run("check", &[]);
    assert_eq!(code, 1);
}

#[test]
fn test_no_exit_code_flag() {
    let mut t = TempPy::new();
    t.file("bad.py", "import subprocess\n");
    let (_, _, code) = t.run("check", &["--no-exit-code"]);
    assert_eq!(code, 0);
}

#[test]
fn test_violation_count_in_summary() {
    let mut t = TempPy::new();
    t.file("bad.py", "import os\nimport socket\n");
    let out = t.check(&[]);
    assert!(out.contains("Found 2 violation(s)"), "got: {out}");
}

// ── check: rule output ───────────────────────────────────────────────────────

#[test]
fn test_dangerous_import_reported_with_line() {
    let mut t = TempPy::new();
    t.file("f.py", "x = 1\nimport os\n");
    let out = t.check(&[]);
    assert!(out.contains("dangerous_import"));
    let line = out
        .lines()
        .find(|l| l.contains("dangerous_import"))
        .unwrap();
    assert!(line.contains(":2:"), "line number missing: {line}");
}

#[test]
fn test_infinite_loop_is_warning() {
    let mut t = TempPy::new();
    t.file("f.py", "while True:\n    work()\n");
    let out = t.check(&[]);
    assert!(out.contains("warning"));
    assert!(out.contains("infinite_loop"));
}

#[test]
fn test_break_suppresses_infinite_loop() {
    let mut t = TempPy::new();
    t.file("f.py", "while True:\n    break\n");
    let out = t.check(&[]);
    assert!(!out.contains("infinite_loop"));
}

#[test]
fn test_select_filters_kinds() {
    let mut t = TempPy::new();
    t.file("f.py", "import os\neval(x)\n");
    let out = t.check(&["--select", "code_execution"]);
    assert!(out.contains("code_execution"));
    assert!(!out.contains("dangerous_import"));
}

#[test]
fn test_select_multiple_kinds() {
    let mut t = TempPy::new();
    t.file("f.py", "import os\neval(x)\n");
    let out = t.check(&["--select", "code_execution,dangerous_import"]);
    assert!(out.contains("code_execution"));
    assert!(out.contains("dangerous_import"));
}

// ── check: JSON output ───────────────────────────────────────────────────────

#[test]
fn test_json_report_shape() {
    let mut t = TempPy::new();
    t.file("f.py", "import os\n");
    let out = t.check(&["--json"]);
    let v: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(v["count"], 1);
    let report = &v["reports"][0];
    assert_eq!(report["safe"], false);
    let violation = &report["violations"][0];
    assert_eq!(violation["type"], "dangerous_import");
    assert_eq!(violation["severity"], "error");
    assert_eq!(violation["line"], 1);
}

#[test]
fn test_json_clean_file() {
    let mut t = TempPy::new();
    t.file("f.py", "x = 1\n");
    let out = t.check(&["--json"]);
    let v: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
    assert_eq!(v["count"], 0);
    assert_eq!(v["reports"][0]["safe"], true);
}

// ── check: directory scanning ────────────────────────────────────────────────

#[test]
fn test_scan_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.py"), "import os\n").unwrap();
    std::fs::write(dir.path().join("b.py"), "import socket\n").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not python\n").unwrap();

    let out = Command::new(pyxis_bin())
        .arg("check")
        .arg(dir.path())
        .arg("--no-exit-code")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Found 2 violation(s)"), "got: {stdout}");
}

#[test]
fn test_scan_directory_with_exclude() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("vendor")).unwrap();
    std::fs::write(dir.path().join("vendor/v.py"), "import os\n").unwrap();
    std::fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();

    let out = Command::new(pyxis_bin())
        .arg("check")
        .arg(dir.path())
        .arg("--exclude")
        .arg("vendor")
        .arg("--no-exit-code")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("No violations found"), "got: {stdout}");
}

// ── parse ────────────────────────────────────────────────────────────────────

#[test]
fn test_parse_outputs_ast_json() {
    let mut t = TempPy::new();
    t.file("f.py", "import os\n");
    let (stdout, _, code) = t.run("parse", &[]);
    assert_eq!(code, 0);
    let v: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(v["type"], "Module");
    assert_eq!(v["body"][0]["type"], "Import");
    assert_eq!(v["body"][0]["names"][0]["name"], "os");
}

#[test]
fn test_parse_expr_flag() {
    let mut t = TempPy::new();
    t.file("e.py", "a < b <= c\n");
    let (stdout, _, code) = t.run("parse", &["--expr"]);
    assert_eq!(code, 0);
    let v: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(v["type"], "Compare");
    assert_eq!(v["ops"], serde_json::json!(["Lt", "LtE"]));
}

#[test]
fn test_parse_syntax_error_exit_code() {
    let mut t = TempPy::new();
    t.file("bad.py", "def f(:\n");
    let (_, stderr, code) = t.run("parse", &[]);
    assert_eq!(code, 2);
    assert!(stderr.contains("SyntaxError"), "got: {stderr}");
}

// ── transform ────────────────────────────────────────────────────────────────

#[test]
fn test_transform_full_pipeline() {
    let mut t = TempPy::new();
    t.file("f.py", "import numpy\nnumpy.zeros(3)\n");
    let (stdout, _, code) = t.run("transform", &[]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("async def __pyx_main__():"));
    assert!(stdout.contains("micropip.install(\"numpy\")"));
    assert!(stdout.contains("__pyx_error__"));
}

#[test]
fn test_transform_single_pass() {
    let mut t = TempPy::new();
    t.file("f.py", "x = 1\n");
    let (stdout, _, code) = t.run("transform", &["--pass", "wrap_async"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "async def __pyx_main__():\n    x = 1\n");
}

#[test]
fn test_transform_unknown_pass_fails() {
    let mut t = TempPy::new();
    t.file("f.py", "x = 1\n");
    let (_, stderr, code) = t.run("transform", &["--pass", "nonsense"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("unknown pass"));
}
