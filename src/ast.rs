//! Python AST node definitions.
//!
//! A closed, exhaustively enumerable set of tagged variants compatible in
//! shape and naming with CPython's `ast` module.  Every node serializes to
//! JSON as `{"type": "<TagName>", "<field>": ...}` with arrays for repeated
//! fields and `null` for missing optionals; unknown tags are rejected when
//! deserializing, so a round-trip is a structural validation.
//!
//! Statements and expressions are wrapper structs (`Stmt`, `Expr`) carrying
//! an optional position [`Span`] next to the variant payload — the same
//! offset-plus-kind shape the rest of the crate pattern-matches on.
//! Trees are values: traversals borrow them, transformations rebuild them.

use serde::{Deserialize, Serialize};

// ── Positions ────────────────────────────────────────────────────────────────

/// Optional source range of a node: 1-based lines, 0-based byte columns.
///
/// Filled in by the parser where known; absent on hand-built or transformed
/// nodes.  Serialized inline into the node object and omitted when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub col: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_col: Option<u32>,
}

impl Span {
    pub fn new(line: u32, col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            line: Some(line),
            col: Some(col),
            end_line: Some(end_line),
            end_col: Some(end_col),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

// ── Constant values ───────────────────────────────────────────────────────────

/// The payload of a `Constant` node (and of `MatchSingleton`).
///
/// JSON-native values map directly (`None` ⇄ `null`, booleans, numbers,
/// strings).  Bytes and ellipsis have no native JSON form and use small
/// object encodings (`{"bytes": [...]}`, `{"special": "ellipsis"}`) so the
/// round-trip stays lossless and unambiguous.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// The imaginary part of an imaginary literal (`3j` → `Complex(3.0)`).
    Complex(f64),
    Str(String),
    Bytes(Vec<u8>),
    Ellipsis,
}

impl Serialize for ConstantValue {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        match self {
            ConstantValue::None => s.serialize_none(),
            ConstantValue::Bool(b) => s.serialize_bool(*b),
            ConstantValue::Int(i) => s.serialize_i64(*i),
            ConstantValue::Float(f) => s.serialize_f64(*f),
            ConstantValue::Complex(f) => {
                let mut m = s.serialize_map(Some(1))?;
                m.serialize_entry("imag", f)?;
                m.end()
            }
            ConstantValue::Str(v) => s.serialize_str(v),
            ConstantValue::Bytes(v) => {
                let mut m = s.serialize_map(Some(1))?;
                m.serialize_entry("bytes", v)?;
                m.end()
            }
            ConstantValue::Ellipsis => {
                let mut m = s.serialize_map(Some(1))?;
                m.serialize_entry("special", "ellipsis")?;
                m.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ConstantValue {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = ConstantValue;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a Python constant value")
            }

            fn visit_unit<E>(self) -> Result<ConstantValue, E> {
                Ok(ConstantValue::None)
            }

            fn visit_none<E>(self) -> Result<ConstantValue, E> {
                Ok(ConstantValue::None)
            }

            fn visit_bool<E>(self, v: bool) -> Result<ConstantValue, E> {
                Ok(ConstantValue::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<ConstantValue, E> {
                Ok(ConstantValue::Int(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<ConstantValue, E> {
                i64::try_from(v)
                    .map(ConstantValue::Int)
                    .map_err(|_| E::custom("integer constant out of range"))
            }

            fn visit_f64<E>(self, v: f64) -> Result<ConstantValue, E> {
                Ok(ConstantValue::Float(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<ConstantValue, E> {
                Ok(ConstantValue::Str(v.to_string()))
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> Result<ConstantValue, A::Error> {
                use serde::de::Error;
                let key: String = map
                    .next_key()?
                    .ok_or_else(|| A::Error::custom("empty constant object"))?;
                match key.as_str() {
                    "imag" => Ok(ConstantValue::Complex(map.next_value()?)),
                    "bytes" => Ok(ConstantValue::Bytes(map.next_value()?)),
                    "special" => {
                        let v: String = map.next_value()?;
                        if v == "ellipsis" {
                            Ok(ConstantValue::Ellipsis)
                        } else {
                            Err(A::Error::custom(format!("unknown special constant `{v}`")))
                        }
                    }
                    other => Err(A::Error::custom(format!("unknown constant key `{other}`"))),
                }
            }
        }
        d.deserialize_any(V)
    }
}

// ── Operator enums ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    FloorDiv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOpKind {
    Invert,
    Not,
    UAdd,
    USub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOpKind {
    And,
    Or,
}

// ── Tagged-struct serde ──────────────────────────────────────────────────────

/// Implements `Serialize`/`Deserialize` for a helper node struct, injecting
/// the normative `"type"` tag and rejecting any other tag on the way in.
macro_rules! tagged_node {
    ($ty:ident, $tag:literal, { $($field:ident : $fty:ty),+ $(,)? }) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                use serde::ser::SerializeMap;
                let mut m = s.serialize_map(None)?;
                m.serialize_entry("type", $tag)?;
                $( m.serialize_entry(stringify!($field), &self.$field)?; )+
                m.end()
            }
        }
        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                #[derive(serde::Deserialize)]
                struct Shadow {
                    #[serde(rename = "type")]
                    tag: String,
                    $( $field: $fty, )+
                }
                let sh = Shadow::deserialize(d)?;
                if sh.tag != $tag {
                    return Err(serde::de::Error::custom(format!(
                        "unknown node tag `{}`, expected `{}`",
                        sh.tag, $tag
                    )));
                }
                Ok($ty { $( $field: sh.$field ),+ })
            }
        }
    };
}

// ── Module root ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
}

tagged_node!(Module, "Module", { body: Vec<Stmt> });

// ── Helper nodes ─────────────────────────────────────────────────────────────

/// One name inside an import statement: `import a.b as c` → `alias("a.b", "c")`.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

tagged_node!(Alias, "alias", { name: String, asname: Option<String> });

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub arg: String,
    pub annotation: Option<Expr>,
}

tagged_node!(Arg, "arg", { arg: String, annotation: Option<Expr> });

/// A full parameter list.
///
/// `defaults` aligns with the tail of `posonlyargs + args`; `kw_defaults`
/// has one entry per keyword-only parameter, `None` where the parameter is
/// required.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments {
    pub posonlyargs: Vec<Arg>,
    pub args: Vec<Arg>,
    pub vararg: Option<Arg>,
    pub kwonlyargs: Vec<Arg>,
    pub kw_defaults: Vec<Option<Expr>>,
    pub kwarg: Option<Arg>,
    pub defaults: Vec<Expr>,
}

tagged_node!(Arguments, "arguments", {
    posonlyargs: Vec<Arg>,
    args: Vec<Arg>,
    vararg: Option<Arg>,
    kwonlyargs: Vec<Arg>,
    kw_defaults: Vec<Option<Expr>>,
    kwarg: Option<Arg>,
    defaults: Vec<Expr>,
});

/// A keyword argument in a call or class header.  `arg` is `None` for
/// `**expr` spreads.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub arg: Option<String>,
    pub value: Expr,
}

tagged_node!(Keyword, "keyword", { arg: Option<String>, value: Expr });

#[derive(Debug, Clone, PartialEq)]
pub struct WithItem {
    pub context_expr: Expr,
    pub optional_vars: Option<Expr>,
}

tagged_node!(WithItem, "withitem", { context_expr: Expr, optional_vars: Option<Expr> });

/// One `for target in iter [if cond]*` clause of a comprehension.
/// `ifs` holds the guards in textual order; `is_async` is 0 or 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
    pub is_async: u8,
}

tagged_node!(Comprehension, "comprehension", {
    target: Expr,
    iter: Expr,
    ifs: Vec<Expr>,
    is_async: u8,
});

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
}

tagged_node!(MatchCase, "match_case", {
    pattern: Pattern,
    guard: Option<Expr>,
    body: Vec<Stmt>,
});

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptHandler {
    pub type_: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

tagged_node!(ExceptHandler, "ExceptHandler", {
    type_: Option<Expr>,
    name: Option<String>,
    body: Vec<Stmt>,
});

// ── Match patterns ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    MatchValue {
        value: Expr,
    },
    MatchSingleton {
        value: ConstantValue,
    },
    MatchSequence {
        patterns: Vec<Pattern>,
    },
    MatchMapping {
        keys: Vec<Expr>,
        patterns: Vec<Pattern>,
        rest: Option<String>,
    },
    MatchClass {
        cls: Expr,
        patterns: Vec<Pattern>,
        kwd_attrs: Vec<String>,
        kwd_patterns: Vec<Pattern>,
    },
    MatchStar {
        name: Option<String>,
    },
    MatchAs {
        pattern: Option<Box<Pattern>>,
        name: Option<String>,
    },
    MatchOr {
        patterns: Vec<Pattern>,
    },
}

impl Pattern {
    pub fn tag(&self) -> &'static str {
        match self {
            Pattern::MatchValue { .. } => "MatchValue",
            Pattern::MatchSingleton { .. } => "MatchSingleton",
            Pattern::MatchSequence { .. } => "MatchSequence",
            Pattern::MatchMapping { .. } => "MatchMapping",
            Pattern::MatchClass { .. } => "MatchClass",
            Pattern::MatchStar { .. } => "MatchStar",
            Pattern::MatchAs { .. } => "MatchAs",
            Pattern::MatchOr { .. } => "MatchOr",
        }
    }
}

// ── Type parameters (PEP 695) ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TypeParam {
    TypeVar { name: String, bound: Option<Expr> },
    TypeVarTuple { name: String },
    ParamSpec { name: String },
}

impl TypeParam {
    pub fn tag(&self) -> &'static str {
        match self {
            TypeParam::TypeVar { .. } => "TypeVar",
            TypeParam::TypeVarTuple { .. } => "TypeVarTuple",
            TypeParam::ParamSpec { .. } => "ParamSpec",
        }
    }
}

// ── Statements ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(flatten)]
    pub kind: StmtKind,
    #[serde(flatten)]
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            span: Span::none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StmtKind {
    Import {
        names: Vec<Alias>,
    },
    ImportFrom {
        module: Option<String>,
        names: Vec<Alias>,
        level: u32,
    },
    FunctionDef {
        name: String,
        type_params: Vec<TypeParam>,
        args: Box<Arguments>,
        body: Vec<Stmt>,
        decorator_list: Vec<Expr>,
        returns: Option<Expr>,
    },
    AsyncFunctionDef {
        name: String,
        type_params: Vec<TypeParam>,
        args: Box<Arguments>,
        body: Vec<Stmt>,
        decorator_list: Vec<Expr>,
        returns: Option<Expr>,
    },
    ClassDef {
        name: String,
        type_params: Vec<TypeParam>,
        bases: Vec<Expr>,
        keywords: Vec<Keyword>,
        body: Vec<Stmt>,
        decorator_list: Vec<Expr>,
    },
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AugAssign {
        target: Expr,
        op: Operator,
        value: Expr,
    },
    AnnAssign {
        target: Expr,
        annotation: Expr,
        value: Option<Expr>,
        simple: u8,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    AsyncFor {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },
    AsyncWith {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },
    Match {
        subject: Expr,
        cases: Vec<MatchCase>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    Raise {
        exc: Option<Expr>,
        cause: Option<Expr>,
    },
    Return {
        value: Option<Expr>,
    },
    Delete {
        targets: Vec<Expr>,
    },
    Pass,
    Break,
    Continue,
    Global {
        names: Vec<String>,
    },
    Nonlocal {
        names: Vec<String>,
    },
    Assert {
        test: Expr,
        msg: Option<Expr>,
    },
    Expr {
        value: Expr,
    },
    TypeAlias {
        name: Expr,
        type_params: Vec<TypeParam>,
        value: Expr,
    },
}

impl StmtKind {
    pub fn tag(&self) -> &'static str {
        match self {
            StmtKind::Import { .. } => "Import",
            StmtKind::ImportFrom { .. } => "ImportFrom",
            StmtKind::FunctionDef { .. } => "FunctionDef",
            StmtKind::AsyncFunctionDef { .. } => "AsyncFunctionDef",
            StmtKind::ClassDef { .. } => "ClassDef",
            StmtKind::Assign { .. } => "Assign",
            StmtKind::AugAssign { .. } => "AugAssign",
            StmtKind::AnnAssign { .. } => "AnnAssign",
            StmtKind::If { .. } => "If",
            StmtKind::For { .. } => "For",
            StmtKind::AsyncFor { .. } => "AsyncFor",
            StmtKind::While { .. } => "While",
            StmtKind::With { .. } => "With",
            StmtKind::AsyncWith { .. } => "AsyncWith",
            StmtKind::Match { .. } => "Match",
            StmtKind::Try { .. } => "Try",
            StmtKind::Raise { .. } => "Raise",
            StmtKind::Return { .. } => "Return",
            StmtKind::Delete { .. } => "Delete",
            StmtKind::Pass => "Pass",
            StmtKind::Break => "Break",
            StmtKind::Continue => "Continue",
            StmtKind::Global { .. } => "Global",
            StmtKind::Nonlocal { .. } => "Nonlocal",
            StmtKind::Assert { .. } => "Assert",
            StmtKind::Expr { .. } => "Expr",
            StmtKind::TypeAlias { .. } => "TypeAlias",
        }
    }
}

// ── Expressions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,
    #[serde(flatten)]
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExprKind {
    BoolOp {
        op: BoolOpKind,
        values: Vec<Expr>,
    },
    NamedExpr {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    BinOp {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: Box<Expr>,
    },
    Lambda {
        args: Box<Arguments>,
        body: Box<Expr>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// A `None` entry in `keys` marks a `**expr` spread whose expression is
    /// the value at the same position.
    Dict {
        keys: Vec<Option<Expr>>,
        values: Vec<Expr>,
    },
    Set {
        elts: Vec<Expr>,
    },
    List {
        elts: Vec<Expr>,
    },
    Tuple {
        elts: Vec<Expr>,
    },
    ListComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    SetComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    GeneratorExp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    Await {
        value: Box<Expr>,
    },
    Yield {
        value: Option<Box<Expr>>,
    },
    YieldFrom {
        value: Box<Expr>,
    },
    /// Invariant: `ops.len() == comparators.len() >= 1`.
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    /// `conversion` is the ASCII code of the `!s`/`!r`/`!a` conversion
    /// character, or -1 when absent.
    FormattedValue {
        value: Box<Expr>,
        conversion: i32,
        format_spec: Option<Box<Expr>>,
    },
    JoinedStr {
        values: Vec<Expr>,
    },
    Constant {
        value: ConstantValue,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        slice: Box<Expr>,
    },
    Starred {
        value: Box<Expr>,
    },
    Name {
        id: String,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
}

impl ExprKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ExprKind::BoolOp { .. } => "BoolOp",
            ExprKind::NamedExpr { .. } => "NamedExpr",
            ExprKind::BinOp { .. } => "BinOp",
            ExprKind::UnaryOp { .. } => "UnaryOp",
            ExprKind::Lambda { .. } => "Lambda",
            ExprKind::IfExp { .. } => "IfExp",
            ExprKind::Dict { .. } => "Dict",
            ExprKind::Set { .. } => "Set",
            ExprKind::List { .. } => "List",
            ExprKind::Tuple { .. } => "Tuple",
            ExprKind::ListComp { .. } => "ListComp",
            ExprKind::SetComp { .. } => "SetComp",
            ExprKind::DictComp { .. } => "DictComp",
            ExprKind::GeneratorExp { .. } => "GeneratorExp",
            ExprKind::Await { .. } => "Await",
            ExprKind::Yield { .. } => "Yield",
            ExprKind::YieldFrom { .. } => "YieldFrom",
            ExprKind::Compare { .. } => "Compare",
            ExprKind::Call { .. } => "Call",
            ExprKind::FormattedValue { .. } => "FormattedValue",
            ExprKind::JoinedStr { .. } => "JoinedStr",
            ExprKind::Constant { .. } => "Constant",
            ExprKind::Attribute { .. } => "Attribute",
            ExprKind::Subscript { .. } => "Subscript",
            ExprKind::Starred { .. } => "Starred",
            ExprKind::Name { .. } => "Name",
            ExprKind::Slice { .. } => "Slice",
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
