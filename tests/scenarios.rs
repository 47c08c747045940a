//! End-to-end behavior checks against the library API: parsing shapes,
//! traversal laws, transform idempotence, and safety reports.

use pyxis::ast::{CmpOp, ConstantValue, ExprKind, StmtKind};
use pyxis::{
    analyze, nodes_of_kind, parse, parse_expression, rewrite_imports, walk, wrap_async,
    wrap_top_level_await, ViolationKind,
};

// ── structural invariants ────────────────────────────────────────────────────

#[test]
fn every_node_kind_is_in_the_closed_set() {
    const KNOWN: &[&str] = &[
        "Module",
        "Import", "ImportFrom", "FunctionDef", "AsyncFunctionDef", "ClassDef", "Assign",
        "AugAssign", "AnnAssign", "If", "For", "AsyncFor", "While", "With", "AsyncWith",
        "Match", "Try", "Raise", "Return", "Delete", "Pass", "Break", "Continue", "Global",
        "Nonlocal", "Assert", "Expr", "TypeAlias",
        "BoolOp", "NamedExpr", "BinOp", "UnaryOp", "Lambda", "IfExp", "Dict", "Set", "List",
        "Tuple", "ListComp", "SetComp", "DictComp", "GeneratorExp", "Await", "Yield",
        "YieldFrom", "Compare", "Call", "FormattedValue", "JoinedStr", "Constant", "Attribute",
        "Subscript", "Starred", "Name", "Slice",
        "alias", "arguments", "arg", "keyword", "withitem", "comprehension", "match_case",
        "ExceptHandler",
        "MatchValue", "MatchSingleton", "MatchSequence", "MatchMapping", "MatchClass",
        "MatchStar", "MatchAs", "MatchOr",
        "TypeVar", "TypeVarTuple", "ParamSpec",
    ];
    let src = r#"
import os, sys as system
from ...pkg.sub import item
from . import x

type Alias[T] = list[T]

@decorator
async def handler[*Ts](a: int, /, b=1, *args, c, **kw) -> None:
    global counter
    nonlocal_free = lambda q=2: q
    async with open('f') as fh:
        async for row in rows:
            await process(row)
    while not done:
        counter += 1
    else:
        pass
    if a:
        del nonlocal_free
    elif b:
        assert a, 'msg'
    else:
        raise ValueError('x') from None
    try:
        yield from gen()
    except (TypeError, KeyError) as e:
        pass
    finally:
        return [i ** 2 for i in range(3) if i]

class Shape(Base, metaclass=Meta):
    field: int = 0
    def area(self):
        return self.w * self.h

match point:
    case Point(x=0, y=0):
        origin = True
    case [Point(), *rest] | (1, 2):
        pass
    case {'kind': k, **attrs}:
        pass
    case None | True:
        pass
    case str() as s if s:
        pass
    case _:
        pass

vals = {**base, 'k': [y for y in (n := gen())]}
items = {1, 2.5, 3j, b'raw', f"{value:.2f}", ..., d[1:2:3, None]}
result = a < b <= c and x if cond else not y
"#;
    let module = parse(src).unwrap();
    for node in walk(&module) {
        assert!(
            KNOWN.contains(&node.kind()),
            "unknown node tag `{}`",
            node.kind()
        );
    }
}

#[test]
fn compare_ops_and_comparators_align() {
    for src in ["a < b", "a < b <= c", "a == b != c < d"] {
        let e = parse_expression(src).unwrap();
        let ExprKind::Compare {
            ops, comparators, ..
        } = &e.kind
        else {
            panic!("expected Compare for {src}");
        };
        assert_eq!(ops.len(), comparators.len());
        assert!(!ops.is_empty());
    }
}

#[test]
fn dict_keys_and_values_align() {
    let e = parse_expression("{'a': 1, **spread, 'b': 2}").unwrap();
    let ExprKind::Dict { keys, values } = &e.kind else {
        panic!("expected Dict");
    };
    assert_eq!(keys.len(), values.len());
    assert!(keys[1].is_none(), "spread entry is a null key");
}

#[test]
fn import_from_level_counts_dots() {
    for (src, level, module) in [
        ("from . import x", 1, None),
        ("from .pkg import x", 1, Some("pkg")),
        ("from ...pkg import x", 3, Some("pkg")),
        ("from ....deep.pkg import x", 4, Some("deep.pkg")),
        ("from os.path import join", 0, Some("os.path")),
    ] {
        let m = parse(&format!("{src}\n")).unwrap();
        let StmtKind::ImportFrom {
            module: got_module,
            level: got_level,
            ..
        } = &m.body[0].kind
        else {
            panic!("expected ImportFrom for {src}");
        };
        assert_eq!(*got_level, level, "src = {src}");
        assert_eq!(got_module.as_deref(), module, "src = {src}");
    }
}

#[test]
fn walk_name_count_matches_name_tokens() {
    let src = "total = base + rate * base\n";
    let module = parse(src).unwrap();
    let names = nodes_of_kind(&module, &["Name"]);
    assert_eq!(names.len(), 4);
}

// ── boundary behaviors ───────────────────────────────────────────────────────

#[test]
fn empty_input_parses_to_empty_module() {
    let m = parse("").unwrap();
    assert!(m.body.is_empty());
}

#[test]
fn comment_only_lines_preserve_line_numbers() {
    let m = parse("# leading comment\n\n# another\nx = 1\n").unwrap();
    assert_eq!(m.body.len(), 1);
    assert_eq!(m.body[0].span.line, Some(4));
}

#[test]
fn triple_quoted_string_is_one_constant() {
    let m = parse("doc = \"\"\"line one\nline two\n\"\"\"\n").unwrap();
    let StmtKind::Assign { value, .. } = &m.body[0].kind else {
        panic!("expected Assign");
    };
    let ExprKind::Constant {
        value: ConstantValue::Str(s),
    } = &value.kind
    else {
        panic!("expected string Constant");
    };
    assert_eq!(s, "line one\nline two\n");
}

// ── literal scenarios ────────────────────────────────────────────────────────

#[test]
fn scenario_chained_comparison() {
    let e = parse_expression("a < b <= c").unwrap();
    let ExprKind::Compare {
        left,
        ops,
        comparators,
    } = &e.kind
    else {
        panic!("expected Compare");
    };
    assert!(matches!(&left.kind, ExprKind::Name { id } if id == "a"));
    assert_eq!(ops, &[CmpOp::Lt, CmpOp::LtE]);
    assert!(matches!(&comparators[0].kind, ExprKind::Name { id } if id == "b"));
    assert!(matches!(&comparators[1].kind, ExprKind::Name { id } if id == "c"));
}

#[test]
fn scenario_relative_import() {
    let m = parse("from ...pkg.sub import item\n").unwrap();
    let StmtKind::ImportFrom {
        module,
        names,
        level,
    } = &m.body[0].kind
    else {
        panic!("expected ImportFrom");
    };
    assert_eq!(module.as_deref(), Some("pkg.sub"));
    assert_eq!(*level, 3);
    assert_eq!(names[0].name, "item");
    assert!(names[0].asname.is_none());
}

#[test]
fn scenario_fstring_with_spec() {
    let e = parse_expression("f\"{value:.2f}\"").unwrap();
    let ExprKind::JoinedStr { values } = &e.kind else {
        panic!("expected JoinedStr");
    };
    assert_eq!(values.len(), 1);
    let ExprKind::FormattedValue {
        value,
        conversion,
        format_spec,
    } = &values[0].kind
    else {
        panic!("expected FormattedValue");
    };
    assert!(matches!(&value.kind, ExprKind::Name { id } if id == "value"));
    assert_eq!(*conversion, -1);
    let ExprKind::JoinedStr { values: spec } = &format_spec.as_ref().unwrap().kind else {
        panic!("expected JoinedStr spec");
    };
    assert!(matches!(
        &spec[0].kind,
        ExprKind::Constant { value: ConstantValue::Str(s) } if s == ".2f"
    ));
}

#[test]
fn scenario_safety_report() {
    let report = analyze("import os\nos.system('rm -rf /')\n");
    assert!(!report.safe);
    assert!(report.violations.iter().any(|v| {
        v.kind == ViolationKind::DangerousImport && v.line == Some(1) && v.message.contains("os")
    }));
    assert!(
        report
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::CommandInjection)
    );
}

#[test]
fn scenario_transform_composition() {
    let src = "import numpy as np\nresult = np.mean([1,2,3])\nresult\n";
    let step1 = rewrite_imports(src);
    let step2 = pyxis::extract_return_value(&step1);
    let out = wrap_async(&step2);
    assert!(out.starts_with("async def __pyx_main__():"));
    let positions: Vec<usize> = [
        "    await micropip.install(\"numpy\")",
        "    import numpy as np",
        "    result = np.mean([1,2,3])",
        "    __pyx_result__ = result",
    ]
    .iter()
    .map(|needle| out.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn scenario_walrus_in_comprehension() {
    let e = parse_expression("[(y := x*2) for x in items if y > 0]").unwrap();
    let ExprKind::ListComp { elt, generators } = &e.kind else {
        panic!("expected ListComp");
    };
    assert!(matches!(elt.kind, ExprKind::NamedExpr { .. }));
    assert_eq!(generators.len(), 1);
    assert_eq!(generators[0].ifs.len(), 1);
    assert!(matches!(generators[0].ifs[0].kind, ExprKind::Compare { .. }));
}

// ── round-trip / idempotence laws ────────────────────────────────────────────

#[test]
fn wrap_async_never_collapses() {
    let once = wrap_async("x = 1\n");
    let twice = wrap_async(&once);
    assert_ne!(once, twice);
    assert_eq!(twice.matches("async def __pyx_main__():").count(), 2);
}

#[test]
fn wrap_top_level_await_is_identity_without_bare_await() {
    for src in [
        "x = 1\n",
        "async def go():\n    await f()\n",
        "# await in comment\n",
    ] {
        assert_eq!(wrap_top_level_await(src), src, "src = {src}");
    }
}

#[test]
fn rewrite_imports_is_idempotent() {
    let src = "import numpy\nfrom scipy.stats import norm\nimport os\n";
    let once = rewrite_imports(src);
    let twice = rewrite_imports(&once);
    assert_eq!(once, twice);
    assert_eq!(once.matches("await micropip.install").count(), 2);
}

#[test]
fn analyze_safe_iff_empty_violations() {
    for src in ["", "x = 1\n", "import os\n", "while True:\n    pass\n"] {
        let report = analyze(src);
        assert_eq!(report.safe, report.violations.is_empty(), "src = {src}");
    }
}

// ── AST JSON round-trip ──────────────────────────────────────────────────────

#[test]
fn module_json_round_trip() {
    let src = "def f(a, b=2):\n    return f'{a:>{b}}'\n";
    let module = parse(src).unwrap();
    let json = serde_json::to_string(&module).unwrap();
    let back: pyxis::ast::Module = serde_json::from_str(&json).unwrap();
    assert_eq!(back, module);
}

#[test]
fn unknown_tag_rejected_on_round_trip() {
    let bad = r#"{"type": "Module", "body": [{"type": "Widget"}]}"#;
    assert!(serde_json::from_str::<pyxis::ast::Module>(bad).is_err());
}
