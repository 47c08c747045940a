//! Source-to-source rewrites that prepare user Python for a WebAssembly
//! runtime: async wrapping, package-install injection, stdout capture,
//! result extraction, `input()` mocking, and exception serialization.
//!
//! Each pass is an independent `&str -> String` rewrite with a literal
//! output contract; they never fail.  [`prepare_for_runtime`] applies the
//! full pipeline in its canonical order.

use regex::Regex;
use std::collections::HashSet;

/// Top-level module names of the Python 3.11 standard library.  Imports of
/// anything else get a `micropip.install` line injected ahead of them.
const STDLIB_MODULES: &[&str] = &[
    "__future__", "_thread", "abc", "aifc", "argparse", "array", "ast", "asyncio", "atexit",
    "audioop", "base64", "bdb", "binascii", "bisect", "builtins", "bz2", "cProfile", "calendar",
    "cgi", "cgitb", "chunk", "cmath", "cmd", "code", "codecs", "codeop", "collections",
    "colorsys", "compileall", "concurrent", "configparser", "contextlib", "contextvars", "copy",
    "copyreg", "crypt", "csv", "ctypes", "curses", "dataclasses", "datetime", "dbm", "decimal",
    "difflib", "dis", "doctest", "email", "encodings", "ensurepip", "enum", "errno",
    "faulthandler", "fcntl", "filecmp", "fileinput", "fnmatch", "fractions", "ftplib",
    "functools", "gc", "getopt", "getpass", "gettext", "glob", "graphlib", "grp", "gzip",
    "hashlib", "heapq", "hmac", "html", "http", "idlelib", "imaplib", "imghdr", "importlib",
    "inspect", "io", "ipaddress", "itertools", "json", "keyword", "linecache", "locale",
    "logging", "lzma", "mailbox", "mailcap", "marshal", "math", "mimetypes", "mmap",
    "modulefinder", "msilib", "msvcrt", "multiprocessing", "netrc", "nis", "nntplib", "numbers",
    "operator", "optparse", "os", "ossaudiodev", "pathlib", "pdb", "pickle", "pickletools",
    "pipes", "pkgutil", "platform", "plistlib", "poplib", "posix", "pprint", "profile",
    "pstats", "pty", "pwd", "py_compile", "pyclbr", "pydoc", "queue", "quopri", "random", "re",
    "readline", "reprlib", "resource", "rlcompleter", "runpy", "sched", "secrets", "select",
    "selectors", "shelve", "shlex", "shutil", "signal", "site", "smtplib", "sndhdr", "socket",
    "socketserver", "spwd", "sqlite3", "ssl", "stat", "statistics", "string", "stringprep",
    "struct", "subprocess", "sunau", "symtable", "sys", "sysconfig", "syslog", "tabnanny",
    "tarfile", "telnetlib", "tempfile", "termios", "test", "textwrap", "threading", "time",
    "timeit", "tkinter", "token", "tokenize", "tomllib", "trace", "traceback", "tracemalloc",
    "tty", "turtle", "turtledemo", "types", "typing", "unicodedata", "unittest", "urllib",
    "uu", "uuid", "venv", "warnings", "wave", "weakref", "webbrowser", "winreg", "winsound",
    "wsgiref", "xdrlib", "xml", "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib", "zoneinfo",
];

fn is_stdlib_module(name: &str) -> bool {
    STDLIB_MODULES.contains(&name)
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// True when `line` contains the word `await` outside identifier context.
fn has_await_token(line: &str) -> bool {
    let bytes = line.as_bytes();
    let mut from = 0;
    while let Some(i) = line[from..].find("await").map(|i| i + from) {
        let before_ok = i == 0 || !bytes[i - 1].is_ascii_alphanumeric() && bytes[i - 1] != b'_';
        let after = i + 5;
        let after_ok = after >= bytes.len()
            || (!bytes[after].is_ascii_alphanumeric() && bytes[after] != b'_');
        if before_ok && after_ok {
            return true;
        }
        from = i + 5;
    }
    false
}

// ── wrap_async ───────────────────────────────────────────────────────────────

/// Wrap the whole source in `async def __pyx_main__():`, indenting every
/// line by four spaces.  Empty lines stay empty; empty input gets a `pass`
/// body.  Wrapping is not idempotent by design — callers own composition.
pub fn wrap_async(code: &str) -> String {
    let mut out = String::from("async def __pyx_main__():\n");
    if code.trim().is_empty() {
        out.push_str("    pass\n");
        return out;
    }
    for line in code.lines() {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

// ── wrap_top_level_await ─────────────────────────────────────────────────────

/// Apply [`wrap_async`] only when a bare `await` occurs outside every
/// `async def` block; otherwise return the input unchanged.
pub fn wrap_top_level_await(code: &str) -> String {
    // Indentation levels of the `async def` headers currently open.
    let mut async_stack: Vec<usize> = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - trimmed.len();
        while async_stack.last().is_some_and(|top| indent <= *top) {
            async_stack.pop();
        }
        if trimmed.starts_with("async def ") {
            async_stack.push(indent);
            continue;
        }
        if async_stack.is_empty() && has_await_token(line) {
            return wrap_async(code);
        }
    }
    code.to_string()
}

// ── rewrite_imports ──────────────────────────────────────────────────────────

/// For every `import X` / `from X import ...` of a non-stdlib module, insert
/// `await micropip.install("X")` immediately before the line.  The original
/// import is kept, each package installs at most once per call, and existing
/// install lines count as already installed — a second pass adds nothing.
pub fn rewrite_imports(code: &str) -> String {
    let mut installed: HashSet<String> = HashSet::new();
    let mut out = String::with_capacity(code.len());
    for line in code.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("await micropip.install(") {
            if let Some(name) = rest
                .split(['"', '\''])
                .nth(1)
                .filter(|n| !n.is_empty())
            {
                installed.insert(name.to_string());
            }
        } else {
            for module in imported_modules(trimmed) {
                if !is_stdlib_module(&module) && installed.insert(module.clone()) {
                    out.push_str(leading_whitespace(line));
                    out.push_str(&format!("await micropip.install(\"{module}\")\n"));
                }
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Top-level module names imported by one (trimmed) source line.
fn imported_modules(trimmed: &str) -> Vec<String> {
    let code = trimmed.split('#').next().unwrap_or("");
    if let Some(rest) = code.strip_prefix("from ") {
        let module = rest.split_whitespace().next().unwrap_or("");
        let top = module.split('.').next().unwrap_or("");
        if top.is_empty() {
            return Vec::new();
        }
        return vec![top.to_string()];
    }
    if let Some(rest) = code.strip_prefix("import ") {
        return rest
            .split(',')
            .filter_map(|piece| {
                let name = piece.split_whitespace().next()?;
                let top = name.split('.').next()?;
                if top.is_empty() {
                    None
                } else {
                    Some(top.to_string())
                }
            })
            .collect();
    }
    Vec::new()
}

// ── capture_print ────────────────────────────────────────────────────────────

/// Redirect `sys.stdout` into a `StringIO` buffer; the user's code follows
/// verbatim.
pub fn capture_print(code: &str) -> String {
    let mut out = String::from(
        "import sys\n\
         import io\n\
         __pyx_stdout__ = io.StringIO()\n\
         __pyx_prev_stdout__ = sys.stdout\n\
         sys.stdout = __pyx_stdout__\n",
    );
    out.push_str(code);
    out
}

// ── extract_return_value ─────────────────────────────────────────────────────

/// Statement keywords that rule out a bare-expression last line.
const STATEMENT_KEYWORDS: &[&str] = &[
    "def", "class", "if", "elif", "else:", "for", "while", "try:", "except", "finally:",
    "with", "return", "raise", "import", "from", "pass", "break", "continue",
];

/// If the last meaningful line is a bare expression, rewrite it as
/// `__pyx_result__ = <expr>`, preserving indentation and any trailing
/// comment.  Statement lines and assignments are left untouched.
pub fn extract_return_value(code: &str) -> String {
    let had_final_newline = code.ends_with('\n');
    let mut lines: Vec<String> = code.lines().map(str::to_string).collect();
    let Some(idx) = lines
        .iter()
        .rposition(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
    else {
        return code.to_string();
    };

    let line = &lines[idx];
    let (code_part, comment_part) = split_trailing_comment(line);
    let trimmed = code_part.trim();

    if trimmed.starts_with('@') || STATEMENT_KEYWORDS.iter().any(|kw| starts_with_word(trimmed, kw))
    {
        return code.to_string();
    }
    if is_assignment_line(code_part) {
        return code.to_string();
    }

    let indent = leading_whitespace(line).to_string();
    let mut rewritten = format!("{indent}__pyx_result__ = {trimmed}");
    if !comment_part.is_empty() {
        rewritten.push_str("  ");
        rewritten.push_str(comment_part.trim_start());
    }
    lines[idx] = rewritten;

    let mut out = lines.join("\n");
    if had_final_newline {
        out.push('\n');
    }
    out
}

fn starts_with_word(line: &str, kw: &str) -> bool {
    if kw.ends_with(':') {
        return line.starts_with(kw);
    }
    line == kw
        || (line.starts_with(kw)
            && line[kw.len()..]
                .chars()
                .next()
                .is_some_and(|c| !c.is_alphanumeric() && c != '_'))
}

/// Split a line at the `#` that starts a trailing comment, honoring string
/// quotes.
fn split_trailing_comment(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'\'' || b == b'"' {
                    quote = Some(b);
                } else if b == b'#' {
                    return (&line[..i], &line[i..]);
                }
            }
        }
        i += 1;
    }
    (line, "")
}

/// A line is an assignment when it contains a `=` that is not part of
/// `==`, `!=`, `<=`, or `>=`.  Equals signs after a `lambda` keyword are
/// parameter defaults, not assignments.
fn is_assignment_line(code_part: &str) -> bool {
    let lambda_at = find_word(code_part, "lambda");
    let bytes = code_part.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'=' {
            continue;
        }
        if i > 0 && matches!(bytes[i - 1], b'=' | b'!' | b'<' | b'>') {
            continue;
        }
        if bytes.get(i + 1) == Some(&b'=') {
            continue;
        }
        if lambda_at.is_some_and(|at| i > at) {
            continue;
        }
        return true;
    }
    false
}

fn find_word(haystack: &str, word: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(i) = haystack[from..].find(word).map(|i| i + from) {
        let before_ok = i == 0 || !bytes[i - 1].is_ascii_alphanumeric() && bytes[i - 1] != b'_';
        let after = i + word.len();
        let after_ok = after >= bytes.len()
            || (!bytes[after].is_ascii_alphanumeric() && bytes[after] != b'_');
        if before_ok && after_ok {
            return Some(i);
        }
        from = i + word.len();
    }
    None
}

// ── mock_input ───────────────────────────────────────────────────────────────

/// Replace every standalone `input(` with `await __pyx_input__(` so the
/// runtime can satisfy prompts asynchronously.
pub fn mock_input(code: &str) -> String {
    let re = Regex::new(r"\binput\(").expect("literal pattern is valid");
    re.replace_all(code, "await __pyx_input__(").into_owned()
}

// ── wrap_exceptions ──────────────────────────────────────────────────────────

/// Run the code under a `try:` that serializes any exception into
/// `__pyx_error__` as `{type, message, traceback}`.
pub fn wrap_exceptions(code: &str) -> String {
    let mut out = String::from("import traceback\n__pyx_error__ = None\ntry:\n");
    if code.trim().is_empty() {
        out.push_str("    pass\n");
    } else {
        for line in code.lines() {
            if line.trim().is_empty() {
                out.push('\n');
            } else {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out.push_str(
        "except Exception as __pyx_exc__:\n    __pyx_error__ = {'type': type(__pyx_exc__).__name__, 'message': str(__pyx_exc__), 'traceback': traceback.format_exc()}\n",
    );
    out
}

// ── Composition ──────────────────────────────────────────────────────────────

/// The canonical pipeline for handing source to the runtime.
pub fn prepare_for_runtime(code: &str) -> String {
    let code = rewrite_imports(code);
    let code = wrap_top_level_await(&code);
    let code = capture_print(&code);
    let code = extract_return_value(&code);
    let code = wrap_exceptions(&code);
    wrap_async(&code)
}

// ── Tests ────────────────────────────────────────────────────────────────────
