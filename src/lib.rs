//! pyxis — a Python static-analysis toolkit.
//!
//! The crate is built around a single source-of-truth model of Python 3.12
//! syntax:
//!
//! - [`parse`] / [`parse_expression`]: tokenizer + recursive-descent parser
//!   producing an AST compatible in shape and naming with CPython's `ast`
//!   module ([`ast`]).
//! - [`walk`], [`nodes_of_kind`], [`find`], [`find_all`], [`Visitor`],
//!   [`Transformer`]: the traversal framework ([`traverse`]).
//! - [`transform`]: text-level rewrites that prepare user code for a
//!   WebAssembly Python runtime.
//! - [`analyze`]: a rule-driven safety scan producing a [`SafetyReport`].
//!
//! Everything is synchronous and single-threaded; the only failure modes
//! live in parsing ([`ParseError`]) — analysis and transformation always
//! produce a result.
//!
//! ```
//! use pyxis::{analyze, parse};
//!
//! let module = parse("import json\nprint(json.dumps({}))\n").unwrap();
//! assert_eq!(module.body.len(), 2);
//! assert!(analyze("print('hello')\n").safe);
//! ```

pub mod ast;
pub mod discovery;
pub mod error;
pub mod safety;
pub mod tokenizer;
pub mod transform;
pub mod traverse;
pub mod types;

mod location;
mod parser;

pub use error::ParseError;
pub use parser::{parse, parse_expression};
pub use safety::{Rule, analyze, analyze_with_rules, default_rules};
pub use transform::{
    capture_print, extract_return_value, mock_input, prepare_for_runtime, rewrite_imports,
    wrap_async, wrap_exceptions, wrap_top_level_await,
};
pub use traverse::{NodeRef, Transformer, Visitor, find, find_all, nodes_of_kind, walk};
pub use types::{SafetyReport, Severity, Violation, ViolationKind};
