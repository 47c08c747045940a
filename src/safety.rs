//! Rule-driven safety analysis of Python source.
//!
//! Rules are deliberately syntactic shape-matchers: line-scoped regex
//! families with a message template, a severity, and an optional
//! source-wide skip predicate.  The analyzer never fails — an empty report
//! on empty input is a valid result — and `safe` is true exactly when no
//! rule fired.
//!
//! The default rule set is exposed as a plain `Vec<Rule>` so callers can
//! append their own records before running [`analyze_with_rules`].

use crate::types::{SafetyReport, Severity, Violation, ViolationKind};
use regex::Regex;

// ── Rule ─────────────────────────────────────────────────────────────────────

/// One scan rule: any pattern matching a line fires a violation of `kind`.
#[derive(Clone)]
pub struct Rule {
    pub kind: ViolationKind,
    pub patterns: Vec<Regex>,
    /// Builds the report message from the matched text.
    pub message: fn(&str) -> String,
    pub severity: Severity,
    /// When this returns true for the whole source, the rule is skipped
    /// entirely.
    pub skip_if: Option<fn(&str) -> bool>,
}

impl Rule {
    fn new(
        kind: ViolationKind,
        severity: Severity,
        patterns: &[&str],
        message: fn(&str) -> String,
    ) -> Self {
        Self {
            kind,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("rule pattern is valid"))
                .collect(),
            message,
            severity,
            skip_if: None,
        }
    }

    fn skipped_when(mut self, pred: fn(&str) -> bool) -> Self {
        self.skip_if = Some(pred);
        self
    }
}

// ── Default rules ────────────────────────────────────────────────────────────

fn source_has_break(source: &str) -> bool {
    source.lines().any(|line| {
        let code = line.split('#').next().unwrap_or("");
        code.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .any(|word| word == "break")
    })
}

/// The built-in rule set, in declaration order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            ViolationKind::DangerousImport,
            Severity::Error,
            &[
                r"(?:^|\s)import\s+(?:os|subprocess|socket|pty)\b",
                r"(?:^|\s)from\s+(?:os|subprocess|socket|pty)\b",
            ],
            |m| format!("Import of dangerous module: `{}`", m.trim()),
        ),
        Rule::new(
            ViolationKind::CodeExecution,
            Severity::Error,
            &[
                r"\bexec\s*\(",
                r"\beval\s*\(",
                r"\bcompile\s*\(",
                r"__import__\s*\(",
            ],
            |m| format!("Dynamic code execution: `{}`", m.trim()),
        ),
        Rule::new(
            ViolationKind::FilesystemAccess,
            Severity::Error,
            &[
                r#"open\s*\(\s*["']/etc/"#,
                r#"open\s*\(\s*["']/proc/"#,
                r#"open\s*\(\s*["']/[^"']*["']\s*,\s*["'][wa]"#,
            ],
            |m| format!("Suspicious filesystem access: `{}`", m.trim()),
        ),
        Rule::new(
            ViolationKind::NetworkAccess,
            Severity::Error,
            &[
                r"(?:^|\s)(?:import|from)\s+urllib\b",
                r"(?:^|\s)(?:import|from)\s+http\.client\b",
                r"(?:^|\s)(?:import|from)\s+requests\b",
                r"(?:^|\s)(?:import|from)\s+ftplib\b",
            ],
            |m| format!("Network access: `{}`", m.trim()),
        ),
        Rule::new(
            ViolationKind::DangerousAttribute,
            Severity::Error,
            &[
                r"__builtins__",
                r"__globals__",
                r"__code__",
                r"__subclasses__",
                r"__mro__",
            ],
            |m| format!("Dangerous attribute access: `{}`", m.trim()),
        ),
        Rule::new(
            ViolationKind::SerializationDanger,
            Severity::Error,
            &[r"(?:^|\s)(?:import|from)\s+(?:pickle|cPickle|marshal|shelve)\b"],
            |m| format!("Insecure deserialization module: `{}`", m.trim()),
        ),
        Rule::new(
            ViolationKind::FfiDanger,
            Severity::Error,
            &[r"(?:^|\s)(?:import|from)\s+(?:ctypes|cffi)\b"],
            |m| format!("Foreign function interface import: `{}`", m.trim()),
        ),
        Rule::new(
            ViolationKind::InfiniteLoop,
            Severity::Warning,
            &[r"\bwhile\s+True\s*:", r"\bwhile\s+1\s*:"],
            |m| format!("Potential infinite loop: `{}` with no break", m.trim()),
        )
        .skipped_when(source_has_break),
        Rule::new(
            ViolationKind::ResourceExhaustion,
            Severity::Error,
            &[
                r"range\s*\(\s*10\s*\*\*\s*(?:[7-9]|[1-9]\d+)",
                r"range\s*\(\s*2\s*\*\*\s*(?:3\d|[4-9]\d|[1-9]\d{2,})",
                r"\*\s*\(?\s*10\s*\*\*\s*(?:[7-9]|[1-9]\d+)",
                r"\]\s*\*\s*\d{4,}.*\*\s*\d{4,}",
            ],
            |m| format!("Potential resource exhaustion: `{}`", m.trim()),
        ),
        Rule::new(
            ViolationKind::CommandInjection,
            Severity::Error,
            &[r"os\.system\s*\(", r"os\.popen\s*\(", r"shell\s*=\s*True"],
            |m| format!("Possible shell command injection: `{}`", m.trim()),
        ),
    ]
}

// ── Analysis ─────────────────────────────────────────────────────────────────

/// Scan `source` with the default rules.
pub fn analyze(source: &str) -> SafetyReport {
    analyze_with_rules(source, &default_rules())
}

/// Scan `source` with an explicit rule list, in declaration order.  Lines
/// are 1-based; each rule fires at most once per line, but several rules
/// may fire for the same line.
pub fn analyze_with_rules(source: &str, rules: &[Rule]) -> SafetyReport {
    let mut violations = Vec::new();
    for rule in rules {
        if rule.skip_if.is_some_and(|pred| pred(source)) {
            continue;
        }
        for (idx, line) in source.lines().enumerate() {
            for pattern in &rule.patterns {
                if let Some(m) = pattern.find(line) {
                    violations.push(Violation {
                        kind: rule.kind,
                        message: (rule.message)(m.as_str()),
                        line: Some(idx + 1),
                        severity: rule.severity,
                    });
                    break;
                }
            }
        }
    }
    SafetyReport::new(violations)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_of(source: &str) -> Vec<ViolationKind> {
        analyze(source).violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_empty_source_is_safe() {
        let report = analyze("");
        assert!(report.safe);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_clean_code_is_safe() {
        let report = analyze("import math\nprint(math.pi)\n");
        assert!(report.safe);
    }

    #[test]
    fn test_safe_iff_no_violations() {
        let report = analyze("eval('1')\n");
        assert!(!report.safe);
        assert_eq!(report.safe, report.violations.is_empty());
    }

    #[test]
    fn test_os_import_and_command_injection_scenario() {
        let report = analyze("import os\nos.system('rm -rf /')\n");
        assert!(!report.safe);
        let dangerous: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.kind == ViolationKind::DangerousImport)
            .collect();
        assert_eq!(dangerous[0].line, Some(1));
        assert!(dangerous[0].message.contains("os"));
        assert!(
            report
                .violations
                .iter()
                .any(|v| v.kind == ViolationKind::CommandInjection)
        );
    }

    #[test]
    fn test_dangerous_imports() {
        for src in [
            "import os\n",
            "from os import path\n",
            "import subprocess\n",
            "import socket\n",
            "import pty\n",
        ] {
            assert!(
                kinds_of(src).contains(&ViolationKind::DangerousImport),
                "src = {src}"
            );
        }
        assert!(!kinds_of("import ossaudio_helper\n").contains(&ViolationKind::DangerousImport));
    }

    #[test]
    fn test_code_execution_patterns() {
        for src in ["exec(code)\n", "eval(expr)\n", "compile(src, '<s>', 'exec')\n", "__import__('os')\n"] {
            assert!(
                kinds_of(src).contains(&ViolationKind::CodeExecution),
                "src = {src}"
            );
        }
    }

    #[test]
    fn test_filesystem_access_patterns() {
        assert!(kinds_of("open('/etc/passwd')\n").contains(&ViolationKind::FilesystemAccess));
        assert!(kinds_of("open('/proc/self/mem')\n").contains(&ViolationKind::FilesystemAccess));
        assert!(kinds_of("open('/tmp/x', 'w')\n").contains(&ViolationKind::FilesystemAccess));
        assert!(kinds_of("open('/var/log/x', 'a')\n").contains(&ViolationKind::FilesystemAccess));
        assert!(!kinds_of("open('data.txt')\n").contains(&ViolationKind::FilesystemAccess));
    }

    #[test]
    fn test_network_access_patterns() {
        for src in [
            "import urllib\n",
            "from urllib.request import urlopen\n",
            "import http.client\n",
            "import requests\n",
            "import ftplib\n",
        ] {
            assert!(
                kinds_of(src).contains(&ViolationKind::NetworkAccess),
                "src = {src}"
            );
        }
    }

    #[test]
    fn test_dangerous_attribute_patterns() {
        for src in [
            "__builtins__['eval']\n",
            "f.__globals__\n",
            "f.__code__\n",
            "().__class__.__mro__\n",
            "object.__subclasses__()\n",
        ] {
            assert!(
                kinds_of(src).contains(&ViolationKind::DangerousAttribute),
                "src = {src}"
            );
        }
    }

    #[test]
    fn test_serialization_and_ffi() {
        assert!(kinds_of("import pickle\n").contains(&ViolationKind::SerializationDanger));
        assert!(kinds_of("from marshal import loads\n").contains(&ViolationKind::SerializationDanger));
        assert!(kinds_of("import shelve\n").contains(&ViolationKind::SerializationDanger));
        assert!(kinds_of("import ctypes\n").contains(&ViolationKind::FfiDanger));
        assert!(kinds_of("from cffi import FFI\n").contains(&ViolationKind::FfiDanger));
    }

    #[test]
    fn test_infinite_loop_without_break_warns() {
        let report = analyze("while True:\n    work()\n");
        let hits: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.kind == ViolationKind::InfiniteLoop)
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Severity::Warning);
        assert_eq!(hits[0].line, Some(1));
    }

    #[test]
    fn test_infinite_loop_skipped_when_break_anywhere() {
        // The skip predicate is source-wide: a break anywhere in the
        // source silences the rule, even in a different loop.
        let src = "while True:\n    work()\nfor i in x:\n    break\n";
        assert!(!kinds_of(src).contains(&ViolationKind::InfiniteLoop));
    }

    #[test]
    fn test_while_one_also_flags() {
        assert!(kinds_of("while 1:\n    pass\n").contains(&ViolationKind::InfiniteLoop));
    }

    #[test]
    fn test_resource_exhaustion_patterns() {
        assert!(kinds_of("range(10**8)\n").contains(&ViolationKind::ResourceExhaustion));
        assert!(kinds_of("range(2**32)\n").contains(&ViolationKind::ResourceExhaustion));
        assert!(kinds_of("x = 'a' * (10**9)\n").contains(&ViolationKind::ResourceExhaustion));
        assert!(kinds_of("m = [[0] * 10000] * 10000\n").contains(&ViolationKind::ResourceExhaustion));
        assert!(!kinds_of("range(10**6)\n").contains(&ViolationKind::ResourceExhaustion));
        assert!(!kinds_of("range(2**20)\n").contains(&ViolationKind::ResourceExhaustion));
    }

    #[test]
    fn test_command_injection_patterns() {
        for src in [
            "os.system(f\"rm {path}\")\n",
            "os.popen('ls')\n",
            "subprocess.run(cmd, shell=True)\n",
        ] {
            assert!(
                kinds_of(src).contains(&ViolationKind::CommandInjection),
                "src = {src}"
            );
        }
    }

    #[test]
    fn test_multiple_violations_one_line() {
        let report = analyze("eval(open('/etc/passwd').read())\n");
        let kinds = kinds_of("eval(open('/etc/passwd').read())\n");
        assert!(kinds.contains(&ViolationKind::CodeExecution));
        assert!(kinds.contains(&ViolationKind::FilesystemAccess));
        assert!(report.violations.len() >= 2);
    }

    #[test]
    fn test_line_numbers_are_one_based() {
        let report = analyze("x = 1\ny = 2\nimport subprocess\n");
        assert_eq!(report.violations[0].line, Some(3));
    }

    #[test]
    fn test_caller_can_extend_rules() {
        let mut rules = default_rules();
        rules.push(Rule {
            kind: ViolationKind::CodeExecution,
            patterns: vec![Regex::new(r"\bglobals\s*\(").unwrap()],
            message: |m| format!("globals() escape: `{}`", m.trim()),
            severity: Severity::Error,
            skip_if: None,
        });
        let report = analyze_with_rules("globals()['x'] = 1\n", &rules);
        assert!(!report.safe);
        assert!(report.violations[0].message.contains("globals()"));
    }
}
