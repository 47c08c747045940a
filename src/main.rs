use clap::{Parser, Subcommand};
use colored::Colorize;
use pyxis::types::SafetyReport;
use rayon::prelude::*;
use serde_json::json;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "pyxis",
    about = "Python static analysis toolkit",
    version,
    long_about = "Pyxis parses Python 3.12 into a CPython-shaped AST, scans source for \
                  dangerous patterns, and rewrites code to run under a WebAssembly \
                  Python runtime."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan files or directories for dangerous code patterns.
    Check {
        /// Paths to scan (files or directories).
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only report the given comma-separated violation kinds
        /// (e.g. --select dangerous_import,code_execution).
        #[arg(long, value_delimiter = ',')]
        select: Option<Vec<String>>,

        /// Exclude directories or files whose path contains any of the given
        /// comma-separated names (e.g. --exclude tests,vendor).
        #[arg(long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,

        /// Emit results as JSON instead of the default text format.
        #[arg(long)]
        json: bool,

        /// Exit with code 0 even when violations are found.
        #[arg(long)]
        no_exit_code: bool,
    },

    /// Parse a file and print its AST as JSON.
    Parse {
        file: PathBuf,

        /// Treat the input as a single expression instead of a module.
        #[arg(long)]
        expr: bool,
    },

    /// Rewrite a file for the WebAssembly runtime and print the result.
    Transform {
        file: PathBuf,

        /// Apply a single named pass instead of the full pipeline
        /// (wrap_async, wrap_top_level_await, rewrite_imports,
        /// capture_print, extract_return_value, mock_input,
        /// wrap_exceptions).
        #[arg(long = "pass")]
        pass_name: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Check {
            paths,
            select,
            exclude,
            json,
            no_exit_code,
        } => run_check(paths, select, exclude, json, no_exit_code),
        Command::Parse { file, expr } => run_parse(&file, expr),
        Command::Transform { file, pass_name } => run_transform(&file, pass_name.as_deref()),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}: {message}", "error".red().bold());
    process::exit(2);
}

// ── check ────────────────────────────────────────────────────────────────────

fn run_check(
    paths: Vec<PathBuf>,
    select: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    json: bool,
    no_exit_code: bool,
) {
    let exclude = exclude.unwrap_or_default();
    let mut files = Vec::new();
    for path in &paths {
        if path.is_file() {
            files.push(path.clone());
        } else {
            match pyxis::discovery::discover_python_files(path, &exclude) {
                Ok(found) => files.extend(found),
                Err(e) => fail(e),
            }
        }
    }

    // Each file is scanned independently; the per-file reports are then
    // flattened and sorted for stable output.
    let mut reports: Vec<(String, SafetyReport)> = files
        .par_iter()
        .filter_map(|path| {
            let source = std::fs::read_to_string(path).ok()?;
            Some((path.to_string_lossy().into_owned(), pyxis::analyze(&source)))
        })
        .collect();

    if let Some(selected) = &select {
        for (_, report) in &mut reports {
            report
                .violations
                .retain(|v| selected.contains(&v.kind.to_string()));
            report.safe = report.violations.is_empty();
        }
    }

    reports.sort_by(|a, b| a.0.cmp(&b.0));
    let total: usize = reports.iter().map(|(_, r)| r.violations.len()).sum();

    if json {
        let items: Vec<serde_json::Value> = reports
            .iter()
            .map(|(file, report)| {
                json!({
                    "file":       file,
                    "safe":       report.safe,
                    "violations": report.violations,
                })
            })
            .collect();
        let output = json!({ "reports": items, "count": total });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).expect("serde_json::Value always serializes")
        );
    } else {
        for (file, report) in &reports {
            for v in &report.violations {
                let line = v.line.map(|l| l.to_string()).unwrap_or_default();
                let severity = match v.severity {
                    pyxis::Severity::Error => "error".red().bold(),
                    pyxis::Severity::Warning => "warning".yellow().bold(),
                };
                println!("{file}:{line}: {severity} [{}] {}", v.kind, v.message);
            }
        }
        if total == 0 {
            println!("{}", "No violations found".green());
        } else {
            println!("{}", format!("Found {total} violation(s)").yellow().bold());
        }
    }

    if !no_exit_code && total > 0 {
        process::exit(1);
    }
}

// ── parse ────────────────────────────────────────────────────────────────────

fn run_parse(file: &PathBuf, expr: bool) {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => fail(e),
    };
    let value = if expr {
        match pyxis::parse_expression(source.trim_end()) {
            Ok(e) => serde_json::to_value(&e),
            Err(e) => fail(e),
        }
    } else {
        match pyxis::parse(&source) {
            Ok(m) => serde_json::to_value(&m),
            Err(e) => fail(e),
        }
    };
    match value {
        Ok(v) => println!(
            "{}",
            serde_json::to_string_pretty(&v).expect("serde_json::Value always serializes")
        ),
        Err(e) => fail(e),
    }
}

// ── transform ────────────────────────────────────────────────────────────────

fn run_transform(file: &PathBuf, pass_name: Option<&str>) {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => fail(e),
    };
    let out = match pass_name {
        None => pyxis::prepare_for_runtime(&source),
        Some("wrap_async") => pyxis::wrap_async(&source),
        Some("wrap_top_level_await") => pyxis::wrap_top_level_await(&source),
        Some("rewrite_imports") => pyxis::rewrite_imports(&source),
        Some("capture_print") => pyxis::capture_print(&source),
        Some("extract_return_value") => pyxis::extract_return_value(&source),
        Some("mock_input") => pyxis::mock_input(&source),
        Some("wrap_exceptions") => pyxis::wrap_exceptions(&source),
        Some(other) => fail(format!("unknown pass `{other}`")),
    };
    print!("{out}");
}
