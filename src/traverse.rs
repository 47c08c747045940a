//! AST traversal: generic walks, typed queries, visitor, and transformer.
//!
//! [`walk`] yields every node exactly once in depth-first preorder,
//! descending through every node-valued field and ignoring scalars.
//! [`Visitor`] dispatches on node family with an overridable
//! [`generic_visit`](Visitor::generic_visit) fallback, so unhandled nodes
//! never stop a traversal.  [`Transformer`] consumes a tree and rebuilds it
//! with possibly-replaced children; the input is never mutated in place, and
//! a statement hook returning `None` deletes the node from its list.

use crate::ast::{
    Alias, Arg, Arguments, Comprehension, ExceptHandler, Expr, ExprKind, Keyword, MatchCase,
    Module, Pattern, Stmt, StmtKind, TypeParam, WithItem,
};

// ── NodeRef ──────────────────────────────────────────────────────────────────

/// A borrowed reference to any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Module(&'a Module),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Alias(&'a Alias),
    Arguments(&'a Arguments),
    Arg(&'a Arg),
    Keyword(&'a Keyword),
    WithItem(&'a WithItem),
    Comprehension(&'a Comprehension),
    MatchCase(&'a MatchCase),
    ExceptHandler(&'a ExceptHandler),
    Pattern(&'a Pattern),
    TypeParam(&'a TypeParam),
}

impl<'a> From<&'a Module> for NodeRef<'a> {
    fn from(m: &'a Module) -> Self {
        NodeRef::Module(m)
    }
}

impl<'a> From<&'a Stmt> for NodeRef<'a> {
    fn from(s: &'a Stmt) -> Self {
        NodeRef::Stmt(s)
    }
}

impl<'a> From<&'a Expr> for NodeRef<'a> {
    fn from(e: &'a Expr) -> Self {
        NodeRef::Expr(e)
    }
}

impl<'a> NodeRef<'a> {
    /// The node's `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Module(_) => "Module",
            NodeRef::Stmt(s) => s.kind.tag(),
            NodeRef::Expr(e) => e.kind.tag(),
            NodeRef::Alias(_) => "alias",
            NodeRef::Arguments(_) => "arguments",
            NodeRef::Arg(_) => "arg",
            NodeRef::Keyword(_) => "keyword",
            NodeRef::WithItem(_) => "withitem",
            NodeRef::Comprehension(_) => "comprehension",
            NodeRef::MatchCase(_) => "match_case",
            NodeRef::ExceptHandler(_) => "ExceptHandler",
            NodeRef::Pattern(p) => p.tag(),
            NodeRef::TypeParam(t) => t.tag(),
        }
    }

    /// Borrow the underlying expression, if this is one.
    pub fn as_expr(&self) -> Option<&'a Expr> {
        match self {
            NodeRef::Expr(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow the underlying statement, if this is one.
    pub fn as_stmt(&self) -> Option<&'a Stmt> {
        match self {
            NodeRef::Stmt(s) => Some(s),
            _ => None,
        }
    }

    /// Append this node's children in field order.
    pub fn push_children(&self, out: &mut Vec<NodeRef<'a>>) {
        match self {
            NodeRef::Module(m) => out.extend(m.body.iter().map(NodeRef::Stmt)),
            NodeRef::Stmt(s) => push_stmt_children(&s.kind, out),
            NodeRef::Expr(e) => push_expr_children(&e.kind, out),
            NodeRef::Alias(_) => {}
            NodeRef::Arguments(a) => {
                out.extend(a.posonlyargs.iter().map(NodeRef::Arg));
                out.extend(a.args.iter().map(NodeRef::Arg));
                if let Some(v) = &a.vararg {
                    out.push(NodeRef::Arg(v));
                }
                out.extend(a.kwonlyargs.iter().map(NodeRef::Arg));
                out.extend(a.kw_defaults.iter().flatten().map(NodeRef::Expr));
                if let Some(k) = &a.kwarg {
                    out.push(NodeRef::Arg(k));
                }
                out.extend(a.defaults.iter().map(NodeRef::Expr));
            }
            NodeRef::Arg(a) => {
                if let Some(ann) = &a.annotation {
                    out.push(NodeRef::Expr(ann));
                }
            }
            NodeRef::Keyword(k) => out.push(NodeRef::Expr(&k.value)),
            NodeRef::WithItem(w) => {
                out.push(NodeRef::Expr(&w.context_expr));
                if let Some(v) = &w.optional_vars {
                    out.push(NodeRef::Expr(v));
                }
            }
            NodeRef::Comprehension(c) => {
                out.push(NodeRef::Expr(&c.target));
                out.push(NodeRef::Expr(&c.iter));
                out.extend(c.ifs.iter().map(NodeRef::Expr));
            }
            NodeRef::MatchCase(c) => {
                out.push(NodeRef::Pattern(&c.pattern));
                if let Some(g) = &c.guard {
                    out.push(NodeRef::Expr(g));
                }
                out.extend(c.body.iter().map(NodeRef::Stmt));
            }
            NodeRef::ExceptHandler(h) => {
                if let Some(t) = &h.type_ {
                    out.push(NodeRef::Expr(t));
                }
                out.extend(h.body.iter().map(NodeRef::Stmt));
            }
            NodeRef::Pattern(p) => push_pattern_children(p, out),
            NodeRef::TypeParam(t) => {
                if let TypeParam::TypeVar {
                    bound: Some(bound), ..
                } = t
                {
                    out.push(NodeRef::Expr(bound));
                }
            }
        }
    }
}

fn push_stmt_children<'a>(kind: &'a StmtKind, out: &mut Vec<NodeRef<'a>>) {
    match kind {
        StmtKind::Import { names } | StmtKind::ImportFrom { names, .. } => {
            out.extend(names.iter().map(NodeRef::Alias));
        }
        StmtKind::FunctionDef {
            type_params,
            args,
            body,
            decorator_list,
            returns,
            ..
        }
        | StmtKind::AsyncFunctionDef {
            type_params,
            args,
            body,
            decorator_list,
            returns,
            ..
        } => {
            out.extend(type_params.iter().map(NodeRef::TypeParam));
            out.push(NodeRef::Arguments(args));
            out.extend(body.iter().map(NodeRef::Stmt));
            out.extend(decorator_list.iter().map(NodeRef::Expr));
            if let Some(r) = returns {
                out.push(NodeRef::Expr(r));
            }
        }
        StmtKind::ClassDef {
            type_params,
            bases,
            keywords,
            body,
            decorator_list,
            ..
        } => {
            out.extend(type_params.iter().map(NodeRef::TypeParam));
            out.extend(bases.iter().map(NodeRef::Expr));
            out.extend(keywords.iter().map(NodeRef::Keyword));
            out.extend(body.iter().map(NodeRef::Stmt));
            out.extend(decorator_list.iter().map(NodeRef::Expr));
        }
        StmtKind::Assign { targets, value } => {
            out.extend(targets.iter().map(NodeRef::Expr));
            out.push(NodeRef::Expr(value));
        }
        StmtKind::AugAssign { target, value, .. } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(value));
        }
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
            ..
        } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(annotation));
            if let Some(v) = value {
                out.push(NodeRef::Expr(v));
            }
        }
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
            out.push(NodeRef::Expr(test));
            out.extend(body.iter().map(NodeRef::Stmt));
            out.extend(orelse.iter().map(NodeRef::Stmt));
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        }
        | StmtKind::AsyncFor {
            target,
            iter,
            body,
            orelse,
        } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(iter));
            out.extend(body.iter().map(NodeRef::Stmt));
            out.extend(orelse.iter().map(NodeRef::Stmt));
        }
        StmtKind::With { items, body } | StmtKind::AsyncWith { items, body } => {
            out.extend(items.iter().map(NodeRef::WithItem));
            out.extend(body.iter().map(NodeRef::Stmt));
        }
        StmtKind::Match { subject, cases } => {
            out.push(NodeRef::Expr(subject));
            out.extend(cases.iter().map(NodeRef::MatchCase));
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            out.extend(body.iter().map(NodeRef::Stmt));
            out.extend(handlers.iter().map(NodeRef::ExceptHandler));
            out.extend(orelse.iter().map(NodeRef::Stmt));
            out.extend(finalbody.iter().map(NodeRef::Stmt));
        }
        StmtKind::Raise { exc, cause } => {
            if let Some(e) = exc {
                out.push(NodeRef::Expr(e));
            }
            if let Some(c) = cause {
                out.push(NodeRef::Expr(c));
            }
        }
        StmtKind::Return { value } => {
            if let Some(v) = value {
                out.push(NodeRef::Expr(v));
            }
        }
        StmtKind::Delete { targets } => out.extend(targets.iter().map(NodeRef::Expr)),
        StmtKind::Assert { test, msg } => {
            out.push(NodeRef::Expr(test));
            if let Some(m) = msg {
                out.push(NodeRef::Expr(m));
            }
        }
        StmtKind::Expr { value } => out.push(NodeRef::Expr(value)),
        StmtKind::TypeAlias {
            name,
            type_params,
            value,
        } => {
            out.push(NodeRef::Expr(name));
            out.extend(type_params.iter().map(NodeRef::TypeParam));
            out.push(NodeRef::Expr(value));
        }
        StmtKind::Pass
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Global { .. }
        | StmtKind::Nonlocal { .. } => {}
    }
}

fn push_expr_children<'a>(kind: &'a ExprKind, out: &mut Vec<NodeRef<'a>>) {
    match kind {
        ExprKind::BoolOp { values, .. } | ExprKind::JoinedStr { values } => {
            out.extend(values.iter().map(NodeRef::Expr));
        }
        ExprKind::NamedExpr { target, value } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(value));
        }
        ExprKind::BinOp { left, right, .. } => {
            out.push(NodeRef::Expr(left));
            out.push(NodeRef::Expr(right));
        }
        ExprKind::UnaryOp { operand, .. } => out.push(NodeRef::Expr(operand)),
        ExprKind::Lambda { args, body } => {
            out.push(NodeRef::Arguments(args));
            out.push(NodeRef::Expr(body));
        }
        ExprKind::IfExp { test, body, orelse } => {
            out.push(NodeRef::Expr(test));
            out.push(NodeRef::Expr(body));
            out.push(NodeRef::Expr(orelse));
        }
        ExprKind::Dict { keys, values } => {
            out.extend(keys.iter().flatten().map(NodeRef::Expr));
            out.extend(values.iter().map(NodeRef::Expr));
        }
        ExprKind::Set { elts } | ExprKind::List { elts } | ExprKind::Tuple { elts } => {
            out.extend(elts.iter().map(NodeRef::Expr));
        }
        ExprKind::ListComp { elt, generators }
        | ExprKind::SetComp { elt, generators }
        | ExprKind::GeneratorExp { elt, generators } => {
            out.push(NodeRef::Expr(elt));
            out.extend(generators.iter().map(NodeRef::Comprehension));
        }
        ExprKind::DictComp {
            key,
            value,
            generators,
        } => {
            out.push(NodeRef::Expr(key));
            out.push(NodeRef::Expr(value));
            out.extend(generators.iter().map(NodeRef::Comprehension));
        }
        ExprKind::Await { value }
        | ExprKind::YieldFrom { value }
        | ExprKind::Starred { value } => out.push(NodeRef::Expr(value)),
        ExprKind::Yield { value } => {
            if let Some(v) = value {
                out.push(NodeRef::Expr(v));
            }
        }
        ExprKind::Compare {
            left, comparators, ..
        } => {
            out.push(NodeRef::Expr(left));
            out.extend(comparators.iter().map(NodeRef::Expr));
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            out.push(NodeRef::Expr(func));
            out.extend(args.iter().map(NodeRef::Expr));
            out.extend(keywords.iter().map(NodeRef::Keyword));
        }
        ExprKind::FormattedValue {
            value, format_spec, ..
        } => {
            out.push(NodeRef::Expr(value));
            if let Some(spec) = format_spec {
                out.push(NodeRef::Expr(spec));
            }
        }
        ExprKind::Attribute { value, .. } => out.push(NodeRef::Expr(value)),
        ExprKind::Subscript { value, slice } => {
            out.push(NodeRef::Expr(value));
            out.push(NodeRef::Expr(slice));
        }
        ExprKind::Slice { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                out.push(NodeRef::Expr(part));
            }
        }
        ExprKind::Constant { .. } | ExprKind::Name { .. } => {}
    }
}

fn push_pattern_children<'a>(pattern: &'a Pattern, out: &mut Vec<NodeRef<'a>>) {
    match pattern {
        Pattern::MatchValue { value } => out.push(NodeRef::Expr(value)),
        Pattern::MatchSingleton { .. } | Pattern::MatchStar { .. } => {}
        Pattern::MatchSequence { patterns } | Pattern::MatchOr { patterns } => {
            out.extend(patterns.iter().map(NodeRef::Pattern));
        }
        Pattern::MatchMapping { keys, patterns, .. } => {
            out.extend(keys.iter().map(NodeRef::Expr));
            out.extend(patterns.iter().map(NodeRef::Pattern));
        }
        Pattern::MatchClass {
            cls,
            patterns,
            kwd_patterns,
            ..
        } => {
            out.push(NodeRef::Expr(cls));
            out.extend(patterns.iter().map(NodeRef::Pattern));
            out.extend(kwd_patterns.iter().map(NodeRef::Pattern));
        }
        Pattern::MatchAs { pattern, .. } => {
            if let Some(p) = pattern {
                out.push(NodeRef::Pattern(p));
            }
        }
    }
}

// ── Walk ─────────────────────────────────────────────────────────────────────

/// Depth-first preorder iterator over every node reachable from the root.
pub struct Walk<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<NodeRef<'a>> {
        let node = self.stack.pop()?;
        let mut children = Vec::new();
        node.push_children(&mut children);
        children.reverse();
        self.stack.extend(children);
        Some(node)
    }
}

pub fn walk<'a>(root: impl Into<NodeRef<'a>>) -> Walk<'a> {
    Walk {
        stack: vec![root.into()],
    }
}

// ── Typed queries ────────────────────────────────────────────────────────────

/// All nodes whose `type` tag is one of `kinds`.
pub fn nodes_of_kind<'a>(root: impl Into<NodeRef<'a>>, kinds: &[&str]) -> Vec<NodeRef<'a>> {
    walk(root).filter(|n| kinds.contains(&n.kind())).collect()
}

/// The first node matching `pred` in preorder, if any.
pub fn find<'a>(
    root: impl Into<NodeRef<'a>>,
    pred: impl Fn(&NodeRef<'a>) -> bool,
) -> Option<NodeRef<'a>> {
    walk(root).find(|n| pred(n))
}

/// Every node matching `pred`, in preorder.
pub fn find_all<'a>(
    root: impl Into<NodeRef<'a>>,
    pred: impl Fn(&NodeRef<'a>) -> bool,
) -> Vec<NodeRef<'a>> {
    walk(root).filter(|n| pred(n)).collect()
}

// ── Visitor ──────────────────────────────────────────────────────────────────

/// Read-only traversal with per-family hooks.
///
/// Override the hook for the nodes you care about and pattern-match on the
/// kind inside; every hook defaults to [`generic_visit`](Self::generic_visit),
/// which recurses into all node-valued fields so unhandled nodes never stop
/// the traversal.
pub trait Visitor {
    fn visit(&mut self, node: NodeRef<'_>) {
        match node {
            NodeRef::Module(m) => self.visit_module(m),
            NodeRef::Stmt(s) => self.visit_stmt(s),
            NodeRef::Expr(e) => self.visit_expr(e),
            NodeRef::Pattern(p) => self.visit_pattern(p),
            other => self.generic_visit(other),
        }
    }

    fn visit_module(&mut self, module: &Module) {
        self.generic_visit(NodeRef::Module(module));
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        self.generic_visit(NodeRef::Stmt(stmt));
    }

    fn visit_expr(&mut self, expr: &Expr) {
        self.generic_visit(NodeRef::Expr(expr));
    }

    fn visit_pattern(&mut self, pattern: &Pattern) {
        self.generic_visit(NodeRef::Pattern(pattern));
    }

    /// Visit all children of `node`.
    fn generic_visit(&mut self, node: NodeRef<'_>) {
        let mut children = Vec::new();
        node.push_children(&mut children);
        for child in children {
            self.visit(child);
        }
    }
}

// ── Transformer ──────────────────────────────────────────────────────────────

/// Rebuild a tree with possibly-replaced nodes.
///
/// Hooks consume nodes by value and return fresh ones; the default
/// `generic_transform_*` methods rebuild a node around transformed children.
/// `transform_stmt` may return `None` to delete a statement from whatever
/// body list contains it.
pub trait Transformer {
    fn transform_module(&mut self, module: Module) -> Module {
        Module {
            body: self.transform_body(module.body),
        }
    }

    fn transform_body(&mut self, body: Vec<Stmt>) -> Vec<Stmt> {
        body.into_iter()
            .filter_map(|s| self.transform_stmt(s))
            .collect()
    }

    fn transform_stmt(&mut self, stmt: Stmt) -> Option<Stmt> {
        Some(self.generic_transform_stmt(stmt))
    }

    fn transform_expr(&mut self, expr: Expr) -> Expr {
        self.generic_transform_expr(expr)
    }

    fn transform_pattern(&mut self, pattern: Pattern) -> Pattern {
        self.generic_transform_pattern(pattern)
    }

    fn generic_transform_stmt(&mut self, stmt: Stmt) -> Stmt {
        let Stmt { kind, span } = stmt;
        let kind = match kind {
            StmtKind::Import { names } => StmtKind::Import { names },
            StmtKind::ImportFrom {
                module,
                names,
                level,
            } => StmtKind::ImportFrom {
                module,
                names,
                level,
            },
            StmtKind::FunctionDef {
                name,
                type_params,
                args,
                body,
                decorator_list,
                returns,
            } => StmtKind::FunctionDef {
                name,
                type_params: map_type_params(self, type_params),
                args: Box::new(map_arguments(self, *args)),
                body: self.transform_body(body),
                decorator_list: map_exprs(self, decorator_list),
                returns: map_opt_expr(self, returns),
            },
            StmtKind::AsyncFunctionDef {
                name,
                type_params,
                args,
                body,
                decorator_list,
                returns,
            } => StmtKind::AsyncFunctionDef {
                name,
                type_params: map_type_params(self, type_params),
                args: Box::new(map_arguments(self, *args)),
                body: self.transform_body(body),
                decorator_list: map_exprs(self, decorator_list),
                returns: map_opt_expr(self, returns),
            },
            StmtKind::ClassDef {
                name,
                type_params,
                bases,
                keywords,
                body,
                decorator_list,
            } => StmtKind::ClassDef {
                name,
                type_params: map_type_params(self, type_params),
                bases: map_exprs(self, bases),
                keywords: map_keywords(self, keywords),
                body: self.transform_body(body),
                decorator_list: map_exprs(self, decorator_list),
            },
            StmtKind::Assign { targets, value } => StmtKind::Assign {
                targets: map_exprs(self, targets),
                value: self.transform_expr(value),
            },
            StmtKind::AugAssign { target, op, value } => StmtKind::AugAssign {
                target: self.transform_expr(target),
                op,
                value: self.transform_expr(value),
            },
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
                simple,
            } => StmtKind::AnnAssign {
                target: self.transform_expr(target),
                annotation: self.transform_expr(annotation),
                value: map_opt_expr(self, value),
                simple,
            },
            StmtKind::If { test, body, orelse } => StmtKind::If {
                test: self.transform_expr(test),
                body: self.transform_body(body),
                orelse: self.transform_body(orelse),
            },
            StmtKind::While { test, body, orelse } => StmtKind::While {
                test: self.transform_expr(test),
                body: self.transform_body(body),
                orelse: self.transform_body(orelse),
            },
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => StmtKind::For {
                target: self.transform_expr(target),
                iter: self.transform_expr(iter),
                body: self.transform_body(body),
                orelse: self.transform_body(orelse),
            },
            StmtKind::AsyncFor {
                target,
                iter,
                body,
                orelse,
            } => StmtKind::AsyncFor {
                target: self.transform_expr(target),
                iter: self.transform_expr(iter),
                body: self.transform_body(body),
                orelse: self.transform_body(orelse),
            },
            StmtKind::With { items, body } => StmtKind::With {
                items: map_withitems(self, items),
                body: self.transform_body(body),
            },
            StmtKind::AsyncWith { items, body } => StmtKind::AsyncWith {
                items: map_withitems(self, items),
                body: self.transform_body(body),
            },
            StmtKind::Match { subject, cases } => StmtKind::Match {
                subject: self.transform_expr(subject),
                cases: cases
                    .into_iter()
                    .map(|c| MatchCase {
                        pattern: self.transform_pattern(c.pattern),
                        guard: map_opt_expr(self, c.guard),
                        body: self.transform_body(c.body),
                    })
                    .collect(),
            },
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => StmtKind::Try {
                body: self.transform_body(body),
                handlers: handlers
                    .into_iter()
                    .map(|h| ExceptHandler {
                        type_: map_opt_expr(self, h.type_),
                        name: h.name,
                        body: self.transform_body(h.body),
                    })
                    .collect(),
                orelse: self.transform_body(orelse),
                finalbody: self.transform_body(finalbody),
            },
            StmtKind::Raise { exc, cause } => StmtKind::Raise {
                exc: map_opt_expr(self, exc),
                cause: map_opt_expr(self, cause),
            },
            StmtKind::Return { value } => StmtKind::Return {
                value: map_opt_expr(self, value),
            },
            StmtKind::Delete { targets } => StmtKind::Delete {
                targets: map_exprs(self, targets),
            },
            StmtKind::Assert { test, msg } => StmtKind::Assert {
                test: self.transform_expr(test),
                msg: map_opt_expr(self, msg),
            },
            StmtKind::Expr { value } => StmtKind::Expr {
                value: self.transform_expr(value),
            },
            StmtKind::TypeAlias {
                name,
                type_params,
                value,
            } => StmtKind::TypeAlias {
                name: self.transform_expr(name),
                type_params: map_type_params(self, type_params),
                value: self.transform_expr(value),
            },
            leaf @ (StmtKind::Pass
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Global { .. }
            | StmtKind::Nonlocal { .. }) => leaf,
        };
        Stmt { kind, span }
    }

    fn generic_transform_expr(&mut self, expr: Expr) -> Expr {
        let Expr { kind, span } = expr;
        let kind = match kind {
            ExprKind::BoolOp { op, values } => ExprKind::BoolOp {
                op,
                values: map_exprs(self, values),
            },
            ExprKind::NamedExpr { target, value } => ExprKind::NamedExpr {
                target: map_box_expr(self, target),
                value: map_box_expr(self, value),
            },
            ExprKind::BinOp { left, op, right } => ExprKind::BinOp {
                left: map_box_expr(self, left),
                op,
                right: map_box_expr(self, right),
            },
            ExprKind::UnaryOp { op, operand } => ExprKind::UnaryOp {
                op,
                operand: map_box_expr(self, operand),
            },
            ExprKind::Lambda { args, body } => ExprKind::Lambda {
                args: Box::new(map_arguments(self, *args)),
                body: map_box_expr(self, body),
            },
            ExprKind::IfExp { test, body, orelse } => ExprKind::IfExp {
                test: map_box_expr(self, test),
                body: map_box_expr(self, body),
                orelse: map_box_expr(self, orelse),
            },
            ExprKind::Dict { keys, values } => ExprKind::Dict {
                keys: keys
                    .into_iter()
                    .map(|k| map_opt_expr(self, k))
                    .collect(),
                values: map_exprs(self, values),
            },
            ExprKind::Set { elts } => ExprKind::Set {
                elts: map_exprs(self, elts),
            },
            ExprKind::List { elts } => ExprKind::List {
                elts: map_exprs(self, elts),
            },
            ExprKind::Tuple { elts } => ExprKind::Tuple {
                elts: map_exprs(self, elts),
            },
            ExprKind::ListComp { elt, generators } => ExprKind::ListComp {
                elt: map_box_expr(self, elt),
                generators: map_comprehensions(self, generators),
            },
            ExprKind::SetComp { elt, generators } => ExprKind::SetComp {
                elt: map_box_expr(self, elt),
                generators: map_comprehensions(self, generators),
            },
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => ExprKind::DictComp {
                key: map_box_expr(self, key),
                value: map_box_expr(self, value),
                generators: map_comprehensions(self, generators),
            },
            ExprKind::GeneratorExp { elt, generators } => ExprKind::GeneratorExp {
                elt: map_box_expr(self, elt),
                generators: map_comprehensions(self, generators),
            },
            ExprKind::Await { value } => ExprKind::Await {
                value: map_box_expr(self, value),
            },
            ExprKind::Yield { value } => ExprKind::Yield {
                value: value.map(|v| Box::new(self.transform_expr(*v))),
            },
            ExprKind::YieldFrom { value } => ExprKind::YieldFrom {
                value: map_box_expr(self, value),
            },
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => ExprKind::Compare {
                left: map_box_expr(self, left),
                ops,
                comparators: map_exprs(self, comparators),
            },
            ExprKind::Call {
                func,
                args,
                keywords,
            } => ExprKind::Call {
                func: map_box_expr(self, func),
                args: map_exprs(self, args),
                keywords: map_keywords(self, keywords),
            },
            ExprKind::FormattedValue {
                value,
                conversion,
                format_spec,
            } => ExprKind::FormattedValue {
                value: map_box_expr(self, value),
                conversion,
                format_spec: format_spec.map(|s| Box::new(self.transform_expr(*s))),
            },
            ExprKind::JoinedStr { values } => ExprKind::JoinedStr {
                values: map_exprs(self, values),
            },
            ExprKind::Attribute { value, attr } => ExprKind::Attribute {
                value: map_box_expr(self, value),
                attr,
            },
            ExprKind::Subscript { value, slice } => ExprKind::Subscript {
                value: map_box_expr(self, value),
                slice: map_box_expr(self, slice),
            },
            ExprKind::Starred { value } => ExprKind::Starred {
                value: map_box_expr(self, value),
            },
            ExprKind::Slice { lower, upper, step } => ExprKind::Slice {
                lower: lower.map(|e| Box::new(self.transform_expr(*e))),
                upper: upper.map(|e| Box::new(self.transform_expr(*e))),
                step: step.map(|e| Box::new(self.transform_expr(*e))),
            },
            leaf @ (ExprKind::Constant { .. } | ExprKind::Name { .. }) => leaf,
        };
        Expr { kind, span }
    }

    fn generic_transform_pattern(&mut self, pattern: Pattern) -> Pattern {
        match pattern {
            Pattern::MatchValue { value } => Pattern::MatchValue {
                value: self.transform_expr(value),
            },
            Pattern::MatchSequence { patterns } => Pattern::MatchSequence {
                patterns: map_patterns(self, patterns),
            },
            Pattern::MatchMapping {
                keys,
                patterns,
                rest,
            } => Pattern::MatchMapping {
                keys: map_exprs(self, keys),
                patterns: map_patterns(self, patterns),
                rest,
            },
            Pattern::MatchClass {
                cls,
                patterns,
                kwd_attrs,
                kwd_patterns,
            } => Pattern::MatchClass {
                cls: self.transform_expr(cls),
                patterns: map_patterns(self, patterns),
                kwd_attrs,
                kwd_patterns: map_patterns(self, kwd_patterns),
            },
            Pattern::MatchAs { pattern, name } => Pattern::MatchAs {
                pattern: pattern.map(|p| Box::new(self.transform_pattern(*p))),
                name,
            },
            Pattern::MatchOr { patterns } => Pattern::MatchOr {
                patterns: map_patterns(self, patterns),
            },
            leaf @ (Pattern::MatchSingleton { .. } | Pattern::MatchStar { .. }) => leaf,
        }
    }
}

// ── Transformer plumbing ─────────────────────────────────────────────────────

fn map_exprs<T: Transformer + ?Sized>(t: &mut T, exprs: Vec<Expr>) -> Vec<Expr> {
    exprs.into_iter().map(|e| t.transform_expr(e)).collect()
}

fn map_opt_expr<T: Transformer + ?Sized>(t: &mut T, expr: Option<Expr>) -> Option<Expr> {
    expr.map(|e| t.transform_expr(e))
}

fn map_box_expr<T: Transformer + ?Sized>(t: &mut T, expr: Box<Expr>) -> Box<Expr> {
    Box::new(t.transform_expr(*expr))
}

fn map_keywords<T: Transformer + ?Sized>(t: &mut T, keywords: Vec<Keyword>) -> Vec<Keyword> {
    keywords
        .into_iter()
        .map(|k| Keyword {
            arg: k.arg,
            value: t.transform_expr(k.value),
        })
        .collect()
}

fn map_withitems<T: Transformer + ?Sized>(t: &mut T, items: Vec<WithItem>) -> Vec<WithItem> {
    items
        .into_iter()
        .map(|w| WithItem {
            context_expr: t.transform_expr(w.context_expr),
            optional_vars: map_opt_expr(t, w.optional_vars),
        })
        .collect()
}

fn map_comprehensions<T: Transformer + ?Sized>(
    t: &mut T,
    generators: Vec<Comprehension>,
) -> Vec<Comprehension> {
    generators
        .into_iter()
        .map(|c| Comprehension {
            target: t.transform_expr(c.target),
            iter: t.transform_expr(c.iter),
            ifs: map_exprs(t, c.ifs),
            is_async: c.is_async,
        })
        .collect()
}

fn map_arguments<T: Transformer + ?Sized>(t: &mut T, args: Arguments) -> Arguments {
    Arguments {
        posonlyargs: map_args(t, args.posonlyargs),
        args: map_args(t, args.args),
        vararg: args.vararg.map(|a| map_arg(t, a)),
        kwonlyargs: map_args(t, args.kwonlyargs),
        kw_defaults: args
            .kw_defaults
            .into_iter()
            .map(|d| map_opt_expr(t, d))
            .collect(),
        kwarg: args.kwarg.map(|a| map_arg(t, a)),
        defaults: map_exprs(t, args.defaults),
    }
}

fn map_arg<T: Transformer + ?Sized>(t: &mut T, arg: Arg) -> Arg {
    Arg {
        arg: arg.arg,
        annotation: map_opt_expr(t, arg.annotation),
    }
}

fn map_args<T: Transformer + ?Sized>(t: &mut T, args: Vec<Arg>) -> Vec<Arg> {
    args.into_iter().map(|a| map_arg(t, a)).collect()
}

fn map_patterns<T: Transformer + ?Sized>(t: &mut T, patterns: Vec<Pattern>) -> Vec<Pattern> {
    patterns
        .into_iter()
        .map(|p| t.transform_pattern(p))
        .collect()
}

fn map_type_params<T: Transformer + ?Sized>(
    t: &mut T,
    params: Vec<TypeParam>,
) -> Vec<TypeParam> {
    params
        .into_iter()
        .map(|p| match p {
            TypeParam::TypeVar { name, bound } => TypeParam::TypeVar {
                name,
                bound: map_opt_expr(t, bound),
            },
            other => other,
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ConstantValue;
    use crate::parser::parse;

    #[test]
    fn test_walk_preorder_root_first() {
        let module = parse("x = 1\n").unwrap();
        let kinds: Vec<&str> = walk(&module).map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["Module", "Assign", "Name", "Constant"]);
    }

    #[test]
    fn test_walk_visits_every_node_once() {
        let module = parse("def f(a, b):\n    return a + b\n").unwrap();
        let total = walk(&module).count();
        // Module, FunctionDef, arguments, arg a, arg b, Return, BinOp,
        // Name a, Name b.
        assert_eq!(total, 9);
    }

    #[test]
    fn test_walk_name_count_matches_tokens() {
        let module = parse("x = foo(bar, baz)\n").unwrap();
        let names = nodes_of_kind(&module, &["Name"]);
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_nodes_of_kind_multiple() {
        let module = parse("import os\nfrom sys import path\n").unwrap();
        let hits = nodes_of_kind(&module, &["Import", "ImportFrom"]);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_find_first_match() {
        let module = parse("a = 1\nb = 2\n").unwrap();
        let hit = find(&module, |n| n.kind() == "Name").unwrap();
        let expr = hit.as_expr().unwrap();
        assert!(matches!(&expr.kind, ExprKind::Name { id } if id == "a"));
    }

    #[test]
    fn test_find_none() {
        let module = parse("x = 1\n").unwrap();
        assert!(find(&module, |n| n.kind() == "Lambda").is_none());
    }

    #[test]
    fn test_find_all() {
        let module = parse("def f():\n    pass\ndef g():\n    pass\n").unwrap();
        assert_eq!(find_all(&module, |n| n.kind() == "FunctionDef").len(), 2);
    }

    #[test]
    fn test_visitor_counts_calls() {
        struct CallCounter {
            count: usize,
        }
        impl Visitor for CallCounter {
            fn visit_expr(&mut self, expr: &Expr) {
                if matches!(expr.kind, ExprKind::Call { .. }) {
                    self.count += 1;
                }
                self.generic_visit(NodeRef::Expr(expr));
            }
        }
        let module = parse("f(g(1), h())\n").unwrap();
        let mut v = CallCounter { count: 0 };
        v.visit(NodeRef::Module(&module));
        assert_eq!(v.count, 3);
    }

    #[test]
    fn test_visitor_default_recurses_into_bodies() {
        struct NameCollector {
            names: Vec<String>,
        }
        impl Visitor for NameCollector {
            fn visit_expr(&mut self, expr: &Expr) {
                if let ExprKind::Name { id } = &expr.kind {
                    self.names.push(id.clone());
                }
                self.generic_visit(NodeRef::Expr(expr));
            }
        }
        let module = parse("def f():\n    if cond:\n        use(value)\n").unwrap();
        let mut v = NameCollector { names: Vec::new() };
        v.visit(NodeRef::Module(&module));
        assert_eq!(v.names, vec!["cond", "use", "value"]);
    }

    #[test]
    fn test_transformer_replaces_names() {
        struct Renamer;
        impl Transformer for Renamer {
            fn transform_expr(&mut self, expr: Expr) -> Expr {
                let expr = self.generic_transform_expr(expr);
                if let ExprKind::Name { id } = &expr.kind {
                    if id == "old" {
                        return Expr {
                            kind: ExprKind::Name {
                                id: "new".to_string(),
                            },
                            span: expr.span,
                        };
                    }
                }
                expr
            }
        }
        let module = parse("y = old + 1\n").unwrap();
        let out = Renamer.transform_module(module.clone());
        let names: Vec<String> = nodes_of_kind(&out, &["Name"])
            .iter()
            .filter_map(|n| match &n.as_expr()?.kind {
                ExprKind::Name { id } => Some(id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["y", "new"]);
        // Source tree is untouched.
        assert!(
            nodes_of_kind(&module, &["Name"])
                .iter()
                .any(|n| matches!(&n.as_expr().unwrap().kind, ExprKind::Name { id } if id == "old"))
        );
    }

    #[test]
    fn test_transformer_deletes_statements() {
        struct DropPasses;
        impl Transformer for DropPasses {
            fn transform_stmt(&mut self, stmt: Stmt) -> Option<Stmt> {
                if matches!(stmt.kind, StmtKind::Pass) {
                    return None;
                }
                Some(self.generic_transform_stmt(stmt))
            }
        }
        let module = parse("pass\nx = 1\npass\n").unwrap();
        let out = DropPasses.transform_module(module);
        assert_eq!(out.body.len(), 1);
        assert_eq!(out.body[0].kind.tag(), "Assign");
    }

    #[test]
    fn test_transformer_rewrites_constants_deep() {
        struct Inc;
        impl Transformer for Inc {
            fn transform_expr(&mut self, expr: Expr) -> Expr {
                let expr = self.generic_transform_expr(expr);
                if let ExprKind::Constant {
                    value: ConstantValue::Int(n),
                } = expr.kind
                {
                    return Expr {
                        kind: ExprKind::Constant {
                            value: ConstantValue::Int(n + 1),
                        },
                        span: expr.span,
                    };
                }
                expr
            }
        }
        let module = parse("xs = [1, [2, 3]]\n").unwrap();
        let out = Inc.transform_module(module);
        let ints: Vec<i64> = walk(&out)
            .filter_map(|n| match &n.as_expr()?.kind {
                ExprKind::Constant {
                    value: ConstantValue::Int(v),
                } => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(ints, vec![2, 3, 4]);
    }

    #[test]
    fn test_walk_includes_helper_nodes() {
        let module = parse("with open(f) as fh:\n    pass\n").unwrap();
        let kinds: Vec<&str> = walk(&module).map(|n| n.kind()).collect();
        assert!(kinds.contains(&"withitem"));
        let module = parse("import os as o\n").unwrap();
        let kinds: Vec<&str> = walk(&module).map(|n| n.kind()).collect();
        assert!(kinds.contains(&"alias"));
    }

    #[test]
    fn test_walk_match_patterns() {
        let module = parse("match p:\n    case Point(x=0):\n        pass\n").unwrap();
        let kinds: Vec<&str> = walk(&module).map(|n| n.kind()).collect();
        assert!(kinds.contains(&"match_case"));
        assert!(kinds.contains(&"MatchClass"));
    }
}
