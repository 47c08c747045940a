//! Discovery of `.py` files for the `check` subcommand.
//!
//! Walks a directory tree honoring `.gitignore`/`.ignore`, skipping hidden
//! entries, and filtering out the usual virtual-environment, cache, and
//! build directories plus any caller-supplied names.

use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};

/// Directory names that are never scanned, gitignored or not.
const SKIP_DIRS: &[&str] = &[
    "venv",
    "env",
    "virtualenv",
    "__pycache__",
    "build",
    "dist",
    "node_modules",
    "site-packages",
];

fn path_has_component(path: &Path, names: &[&str]) -> bool {
    path.components().any(|c| {
        matches!(c, Component::Normal(name)
            if names.contains(&name.to_string_lossy().as_ref()))
    })
}

/// Collect every `.py` file reachable from `root`, in walk order.
pub fn discover_python_files(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let exclude_refs: Vec<&str> = exclude.iter().map(String::as_str).collect();
    let mut files = Vec::new();
    for entry in WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .build()
    {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }
        if path_has_component(path, SKIP_DIRS) || path_has_component(path, &exclude_refs) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn discover(root: &Path, exclude: &[&str]) -> Vec<PathBuf> {
        let exclude: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        discover_python_files(root, &exclude).unwrap()
    }

    #[test]
    fn test_only_python_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        fs::write(dir.path().join("notes.txt"), "text").unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/b.py"), "y = 2").unwrap();
        let files = discover(dir.path(), &[]);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_hidden_and_venv_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/hook.py"), "").unwrap();
        fs::create_dir_all(dir.path().join("venv/lib")).unwrap();
        fs::write(dir.path().join("venv/lib/site.py"), "").unwrap();
        fs::write(dir.path().join("app.py"), "x = 1").unwrap();
        let files = discover(dir.path(), &[]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "app.py");
    }

    #[test]
    fn test_gitignore_respected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "generated/\n").unwrap();
        fs::create_dir(dir.path().join("generated")).unwrap();
        fs::write(dir.path().join("generated/out.py"), "").unwrap();
        fs::write(dir.path().join("main.py"), "x = 1").unwrap();
        let files = discover(dir.path(), &[]);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_caller_excludes() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("migrations")).unwrap();
        fs::write(dir.path().join("migrations/0001.py"), "").unwrap();
        fs::write(dir.path().join("app.py"), "x = 1").unwrap();
        let files = discover(dir.path(), &["migrations"]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "app.py");
    }
}
