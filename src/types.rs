use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of violation kinds the safety analyzer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    DangerousImport,
    CodeExecution,
    FilesystemAccess,
    NetworkAccess,
    DangerousAttribute,
    SerializationDanger,
    FfiDanger,
    InfiniteLoop,
    ResourceExhaustion,
    CommandInjection,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::DangerousImport => "dangerous_import",
            ViolationKind::CodeExecution => "code_execution",
            ViolationKind::FilesystemAccess => "filesystem_access",
            ViolationKind::NetworkAccess => "network_access",
            ViolationKind::DangerousAttribute => "dangerous_attribute",
            ViolationKind::SerializationDanger => "serialization_danger",
            ViolationKind::FfiDanger => "ffi_danger",
            ViolationKind::InfiniteLoop => "infinite_loop",
            ViolationKind::ResourceExhaustion => "resource_exhaustion",
            ViolationKind::CommandInjection => "command_injection",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One rule match: `{"type": kind, "message", "line", "severity"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub message: String,
    pub line: Option<usize>,
    pub severity: Severity,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: {} [{}] {}", line, self.severity, self.kind, self.message),
            None => write!(f, "{} [{}] {}", self.severity, self.kind, self.message),
        }
    }
}

/// The analyzer's result: `safe` is true iff `violations` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub safe: bool,
    pub violations: Vec<Violation>,
}

impl SafetyReport {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self {
            safe: violations.is_empty(),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display() {
        let v = Violation {
            kind: ViolationKind::DangerousImport,
            message: "Import of dangerous module: `import os`".to_string(),
            line: Some(1),
            severity: Severity::Error,
        };
        assert_eq!(
            v.to_string(),
            "1: error [dangerous_import] Import of dangerous module: `import os`"
        );
    }

    #[test]
    fn test_violation_json_shape() {
        let v = Violation {
            kind: ViolationKind::InfiniteLoop,
            message: "no break".to_string(),
            line: Some(3),
            severity: Severity::Warning,
        };
        let j = serde_json::to_value(&v).unwrap();
        assert_eq!(j["type"], "infinite_loop");
        assert_eq!(j["severity"], "warning");
        assert_eq!(j["line"], 3);
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            ViolationKind::DangerousImport,
            ViolationKind::CodeExecution,
            ViolationKind::FilesystemAccess,
            ViolationKind::NetworkAccess,
            ViolationKind::DangerousAttribute,
            ViolationKind::SerializationDanger,
            ViolationKind::FfiDanger,
            ViolationKind::InfiniteLoop,
            ViolationKind::ResourceExhaustion,
            ViolationKind::CommandInjection,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
            let back: ViolationKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn test_report_safe_flag() {
        assert!(SafetyReport::new(Vec::new()).safe);
        let v = Violation {
            kind: ViolationKind::CodeExecution,
            message: "eval".to_string(),
            line: None,
            severity: Severity::Error,
        };
        assert!(!SafetyReport::new(vec![v]).safe);
    }
}
