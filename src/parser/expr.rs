//! Expression parsing: the precedence ladder, atoms, trailers, displays,
//! comprehensions, and assignment targets.
//!
//! Precedence (low → high): `:=` > ternary > `or` > `and` > `not` >
//! comparisons > `|` > `^` > `&` > shifts > `+`/`-` > `*`-family > unary >
//! `**` (right) > `await` > atom with trailers.

use super::{Parser, fstring, is_reserved};
use crate::ast::{
    BoolOpKind, CmpOp, Comprehension, ConstantValue, Expr, ExprKind, Keyword, Operator,
    UnaryOpKind,
};
use crate::error::ParseError;
use crate::tokenizer::TokenKind;

impl<'src> Parser<'src> {
    // ── Expression lists ─────────────────────────────────────────────────────

    /// `testlist_star_expr`: comma-joined star-or-test elements.  A trailing
    /// comma after a single element still makes a tuple (`x = 1,`).
    pub(crate) fn parse_expr_list_star(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let first = self.parse_star_or_named()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if !self.at_expr_start() {
                break;
            }
            elts.push(self.parse_star_or_named()?);
        }
        Ok(self.expr_at(ExprKind::Tuple { elts }, start))
    }

    /// One display/testlist element: `*expr` or a named expression.
    pub(crate) fn parse_star_or_named(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        if self.eat_op("*") {
            let value = Box::new(self.parse_or_test()?);
            return Ok(self.expr_at(ExprKind::Starred { value }, start));
        }
        self.parse_namedexpr()
    }

    /// Does the current token begin an expression?
    pub(crate) fn at_expr_start(&self) -> bool {
        let t = self.cur();
        match t.kind {
            TokenKind::Number | TokenKind::String => true,
            TokenKind::Name => {
                !is_reserved(t.lexeme)
                    || matches!(
                        t.lexeme,
                        "not" | "lambda" | "await" | "yield" | "None" | "True" | "False"
                    )
            }
            TokenKind::Op => matches!(t.lexeme, "(" | "[" | "{" | "-" | "+" | "~" | "*" | "..."),
            _ => false,
        }
    }

    // ── The ladder ───────────────────────────────────────────────────────────

    /// `test [':=' test]` — the walrus binds loosest and is right-leaning.
    pub(crate) fn parse_namedexpr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let e = self.parse_test()?;
        if self.eat_op(":=") {
            let value = Box::new(self.parse_test()?);
            return Ok(self.expr_at(
                ExprKind::NamedExpr {
                    target: Box::new(e),
                    value,
                },
                start,
            ));
        }
        Ok(e)
    }

    /// Ternary (`X if C else Y`) and lambda level.
    pub(crate) fn parse_test(&mut self) -> Result<Expr, ParseError> {
        if self.at_name("lambda") {
            return self.parse_lambda();
        }
        let start = self.start_pos();
        let body = self.parse_or_test()?;
        if self.at_name("if") {
            self.bump();
            let test = Box::new(self.parse_or_test()?);
            self.expect_name("else")?;
            let orelse = Box::new(self.parse_test()?);
            return Ok(self.expr_at(
                ExprKind::IfExp {
                    test,
                    body: Box::new(body),
                    orelse,
                },
                start,
            ));
        }
        Ok(body)
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        self.bump(); // `lambda`
        let args = Box::new(self.parse_parameters(false, ":")?);
        self.expect_op(":")?;
        let body = Box::new(self.parse_test()?);
        Ok(self.expr_at(ExprKind::Lambda { args, body }, start))
    }

    pub(crate) fn parse_or_test(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let first = self.parse_and_test()?;
        if !self.at_name("or") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_name("or") {
            values.push(self.parse_and_test()?);
        }
        Ok(self.expr_at(
            ExprKind::BoolOp {
                op: BoolOpKind::Or,
                values,
            },
            start,
        ))
    }

    fn parse_and_test(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let first = self.parse_not_test()?;
        if !self.at_name("and") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_name("and") {
            values.push(self.parse_not_test()?);
        }
        Ok(self.expr_at(
            ExprKind::BoolOp {
                op: BoolOpKind::And,
                values,
            },
            start,
        ))
    }

    fn parse_not_test(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        if self.eat_name("not") {
            let operand = Box::new(self.parse_not_test()?);
            return Ok(self.expr_at(
                ExprKind::UnaryOp {
                    op: UnaryOpKind::Not,
                    operand,
                },
                start,
            ));
        }
        self.parse_comparison()
    }

    /// Chained comparisons collapse into one `Compare` node.
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = if self.at_op("<") {
                CmpOp::Lt
            } else if self.at_op("<=") {
                CmpOp::LtE
            } else if self.at_op(">") {
                CmpOp::Gt
            } else if self.at_op(">=") {
                CmpOp::GtE
            } else if self.at_op("==") {
                CmpOp::Eq
            } else if self.at_op("!=") {
                CmpOp::NotEq
            } else if self.at_name("in") {
                CmpOp::In
            } else if self.at_name("not") && self.nth(1).lexeme == "in" {
                self.bump();
                CmpOp::NotIn
            } else if self.at_name("is") {
                if self.nth(1).kind == TokenKind::Name && self.nth(1).lexeme == "not" {
                    self.bump();
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                }
            } else {
                break;
            };
            self.bump();
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(self.expr_at(
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
            start,
        ))
    }

    fn parse_binop_level(
        &mut self,
        table: &[(&str, Operator)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let mut left = next(self)?;
        'outer: loop {
            for (lexeme, op) in table {
                if self.at_op(lexeme) {
                    self.bump();
                    let right = Box::new(next(self)?);
                    left = self.expr_at(
                        ExprKind::BinOp {
                            left: Box::new(left),
                            op: *op,
                            right,
                        },
                        start,
                    );
                    continue 'outer;
                }
            }
            break;
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binop_level(&[("|", Operator::BitOr)], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binop_level(&[("^", Operator::BitXor)], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        self.parse_binop_level(&[("&", Operator::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        self.parse_binop_level(
            &[("<<", Operator::LShift), (">>", Operator::RShift)],
            Self::parse_arith,
        )
    }

    fn parse_arith(&mut self) -> Result<Expr, ParseError> {
        self.parse_binop_level(
            &[("+", Operator::Add), ("-", Operator::Sub)],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        self.parse_binop_level(
            &[
                ("*", Operator::Mult),
                ("/", Operator::Div),
                ("//", Operator::FloorDiv),
                ("%", Operator::Mod),
                ("@", Operator::MatMult),
            ],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let op = if self.at_op("-") {
            Some(UnaryOpKind::USub)
        } else if self.at_op("+") {
            Some(UnaryOpKind::UAdd)
        } else if self.at_op("~") {
            Some(UnaryOpKind::Invert)
        } else {
            None
        };
        if let Some(op) = op {
            self.bump();
            let operand = Box::new(self.parse_factor()?);
            return Ok(self.expr_at(ExprKind::UnaryOp { op, operand }, start));
        }
        self.parse_power()
    }

    /// `**` is right-associative and binds tighter than unary on its left:
    /// `-2 ** 2` is `-(2 ** 2)`, `2 ** -1` recurses through the factor.
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let base = self.parse_await_primary()?;
        if self.eat_op("**") {
            let right = Box::new(self.parse_factor()?);
            return Ok(self.expr_at(
                ExprKind::BinOp {
                    left: Box::new(base),
                    op: Operator::Pow,
                    right,
                },
                start,
            ));
        }
        Ok(base)
    }

    fn parse_await_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        if self.at_name("await") {
            self.bump();
            let value = Box::new(self.parse_await_primary()?);
            return Ok(self.expr_at(ExprKind::Await { value }, start));
        }
        self.parse_primary()
    }

    // ── Primary: atom plus trailers ──────────────────────────────────────────

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let mut e = self.parse_atom()?;
        loop {
            if self.at_op("(") {
                let (args, keywords) = self.parse_call_args()?;
                e = self.expr_at(
                    ExprKind::Call {
                        func: Box::new(e),
                        args,
                        keywords,
                    },
                    start,
                );
            } else if self.at_op("[") {
                self.bump();
                let slice = Box::new(self.parse_subscript_list()?);
                self.expect_op("]")?;
                e = self.expr_at(
                    ExprKind::Subscript {
                        value: Box::new(e),
                        slice,
                    },
                    start,
                );
            } else if self.at_op(".") {
                self.bump();
                let attr = self.expect_ident()?;
                e = self.expr_at(
                    ExprKind::Attribute {
                        value: Box::new(e),
                        attr,
                    },
                    start,
                );
            } else {
                return Ok(e);
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let t = self.cur();
        match t.kind {
            TokenKind::Op if t.lexeme == "(" => self.parse_paren(),
            TokenKind::Op if t.lexeme == "[" => self.parse_list_display(),
            TokenKind::Op if t.lexeme == "{" => self.parse_brace_display(),
            TokenKind::Op if t.lexeme == "..." => {
                self.bump();
                Ok(self.expr_at(
                    ExprKind::Constant {
                        value: ConstantValue::Ellipsis,
                    },
                    start,
                ))
            }
            TokenKind::Number => {
                self.bump();
                Ok(self.expr_at(
                    ExprKind::Constant {
                        value: parse_number_value(t.lexeme),
                    },
                    start,
                ))
            }
            TokenKind::String => self.parse_string_group(),
            TokenKind::Name => match t.lexeme {
                "True" => {
                    self.bump();
                    Ok(self.expr_at(
                        ExprKind::Constant {
                            value: ConstantValue::Bool(true),
                        },
                        start,
                    ))
                }
                "False" => {
                    self.bump();
                    Ok(self.expr_at(
                        ExprKind::Constant {
                            value: ConstantValue::Bool(false),
                        },
                        start,
                    ))
                }
                "None" => {
                    self.bump();
                    Ok(self.expr_at(
                        ExprKind::Constant {
                            value: ConstantValue::None,
                        },
                        start,
                    ))
                }
                word if is_reserved(word) => Err(self.unexpected("an expression")),
                _ => {
                    self.bump();
                    Ok(self.expr_at(
                        ExprKind::Name {
                            id: t.lexeme.to_string(),
                        },
                        start,
                    ))
                }
            },
            _ => Err(self.unexpected("an expression")),
        }
    }

    // ── Calls ────────────────────────────────────────────────────────────────

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), ParseError> {
        self.bump(); // `(`
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        loop {
            if self.at_op(")") {
                break;
            }
            if self.eat_op("*") {
                let star_start = self.start_pos();
                let value = Box::new(self.parse_test()?);
                args.push(self.expr_at(ExprKind::Starred { value }, star_start));
            } else if self.eat_op("**") {
                keywords.push(Keyword {
                    arg: None,
                    value: self.parse_test()?,
                });
            } else if self.cur().kind == TokenKind::Name
                && !is_reserved(self.cur().lexeme)
                && self.nth(1).kind == TokenKind::Op
                && self.nth(1).lexeme == "="
            {
                let name = self.expect_ident()?;
                self.bump(); // `=`
                keywords.push(Keyword {
                    arg: Some(name),
                    value: self.parse_test()?,
                });
            } else {
                let arg_start = self.start_pos();
                let e = self.parse_namedexpr()?;
                if self.at_comprehension_for() {
                    let generators = self.parse_comprehensions()?;
                    args.push(self.expr_at(
                        ExprKind::GeneratorExp {
                            elt: Box::new(e),
                            generators,
                        },
                        arg_start,
                    ));
                } else {
                    args.push(e);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok((args, keywords))
    }

    // ── Subscripts ───────────────────────────────────────────────────────────

    /// The contents of `x[...]`: one item, or a comma-joined tuple of items
    /// (as in generic subscripts like `Dict[str, int]`).
    fn parse_subscript_list(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let mut elts = Vec::new();
        let mut had_comma = false;
        loop {
            if self.at_op("]") {
                break;
            }
            elts.push(self.parse_subscript_item()?);
            if self.eat_op(",") {
                had_comma = true;
            } else {
                break;
            }
        }
        if elts.is_empty() {
            return Err(self.unexpected("a subscript"));
        }
        if elts.len() == 1 && !had_comma {
            return Ok(elts.pop().expect("len checked"));
        }
        Ok(self.expr_at(ExprKind::Tuple { elts }, start))
    }

    fn parse_subscript_item(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        if self.eat_op("*") {
            let value = Box::new(self.parse_or_test()?);
            return Ok(self.expr_at(ExprKind::Starred { value }, start));
        }
        if self.at_op(":") {
            return self.parse_slice_tail(None, start);
        }
        let e = self.parse_namedexpr()?;
        if self.at_op(":") {
            return self.parse_slice_tail(Some(Box::new(e)), start);
        }
        Ok(e)
    }

    fn parse_slice_tail(
        &mut self,
        lower: Option<Box<Expr>>,
        start: (u32, u32),
    ) -> Result<Expr, ParseError> {
        self.bump(); // first `:`
        let upper = if self.at_op(":") || self.at_op("]") || self.at_op(",") {
            None
        } else {
            Some(Box::new(self.parse_test()?))
        };
        let step = if self.eat_op(":") {
            if self.at_op("]") || self.at_op(",") {
                None
            } else {
                Some(Box::new(self.parse_test()?))
            }
        } else {
            None
        };
        Ok(self.expr_at(ExprKind::Slice { lower, upper, step }, start))
    }

    // ── Displays ─────────────────────────────────────────────────────────────

    fn at_comprehension_for(&self) -> bool {
        self.at_name("for") || (self.at_name("async") && self.nth(1).lexeme == "for")
    }

    fn parse_paren(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        self.bump(); // `(`
        if self.at_op(")") {
            self.bump();
            return Ok(self.expr_at(ExprKind::Tuple { elts: Vec::new() }, start));
        }
        if self.at_name("yield") {
            let e = self.parse_yield_expr()?;
            self.expect_op(")")?;
            return Ok(e);
        }
        let first = self.parse_star_or_named()?;
        if self.at_comprehension_for() {
            let generators = self.parse_comprehensions()?;
            self.expect_op(")")?;
            return Ok(self.expr_at(
                ExprKind::GeneratorExp {
                    elt: Box::new(first),
                    generators,
                },
                start,
            ));
        }
        if self.at_op(",") {
            let mut elts = vec![first];
            while self.eat_op(",") {
                if self.at_op(")") {
                    break;
                }
                elts.push(self.parse_star_or_named()?);
            }
            self.expect_op(")")?;
            return Ok(self.expr_at(ExprKind::Tuple { elts }, start));
        }
        self.expect_op(")")?;
        // Plain parenthesized expression: the grouping leaves no node.
        Ok(first)
    }

    fn parse_list_display(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        self.bump(); // `[`
        if self.at_op("]") {
            self.bump();
            return Ok(self.expr_at(ExprKind::List { elts: Vec::new() }, start));
        }
        let first = self.parse_star_or_named()?;
        if self.at_comprehension_for() {
            let generators = self.parse_comprehensions()?;
            self.expect_op("]")?;
            return Ok(self.expr_at(
                ExprKind::ListComp {
                    elt: Box::new(first),
                    generators,
                },
                start,
            ));
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            elts.push(self.parse_star_or_named()?);
        }
        self.expect_op("]")?;
        Ok(self.expr_at(ExprKind::List { elts }, start))
    }

    fn parse_brace_display(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        self.bump(); // `{`
        if self.at_op("}") {
            self.bump();
            return Ok(self.expr_at(
                ExprKind::Dict {
                    keys: Vec::new(),
                    values: Vec::new(),
                },
                start,
            ));
        }
        // `**spread` can only open a dict.
        if self.eat_op("**") {
            let mut keys = vec![None];
            let mut values = vec![self.parse_or_test()?];
            self.parse_dict_rest(&mut keys, &mut values)?;
            return Ok(self.expr_at(ExprKind::Dict { keys, values }, start));
        }
        let first = self.parse_star_or_named()?;
        if self.at_op(":") {
            self.bump();
            let value = self.parse_test()?;
            if self.at_comprehension_for() {
                let generators = self.parse_comprehensions()?;
                self.expect_op("}")?;
                return Ok(self.expr_at(
                    ExprKind::DictComp {
                        key: Box::new(first),
                        value: Box::new(value),
                        generators,
                    },
                    start,
                ));
            }
            let mut keys = vec![Some(first)];
            let mut values = vec![value];
            self.parse_dict_rest(&mut keys, &mut values)?;
            return Ok(self.expr_at(ExprKind::Dict { keys, values }, start));
        }
        if self.at_comprehension_for() {
            let generators = self.parse_comprehensions()?;
            self.expect_op("}")?;
            return Ok(self.expr_at(
                ExprKind::SetComp {
                    elt: Box::new(first),
                    generators,
                },
                start,
            ));
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            elts.push(self.parse_star_or_named()?);
        }
        self.expect_op("}")?;
        Ok(self.expr_at(ExprKind::Set { elts }, start))
    }

    fn parse_dict_rest(
        &mut self,
        keys: &mut Vec<Option<Expr>>,
        values: &mut Vec<Expr>,
    ) -> Result<(), ParseError> {
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            if self.eat_op("**") {
                keys.push(None);
                values.push(self.parse_or_test()?);
            } else {
                keys.push(Some(self.parse_test()?));
                self.expect_op(":")?;
                values.push(self.parse_test()?);
            }
        }
        self.expect_op("}")
    }

    // ── Comprehension clauses ────────────────────────────────────────────────

    /// `[async] for target in iter [if cond]*`, repeated.  The iterable and
    /// the guards parse at or-test level so a ternary cannot swallow the
    /// following clause keyword.
    pub(crate) fn parse_comprehensions(&mut self) -> Result<Vec<Comprehension>, ParseError> {
        let mut generators = Vec::new();
        loop {
            let is_async = if self.at_name("async") && self.nth(1).lexeme == "for" {
                self.bump();
                1
            } else {
                0
            };
            if !self.eat_name("for") {
                break;
            }
            let target = self.parse_target_list()?;
            self.expect_name("in")?;
            let iter = self.parse_or_test()?;
            let mut ifs = Vec::new();
            while self.eat_name("if") {
                ifs.push(self.parse_or_test()?);
            }
            generators.push(Comprehension {
                target,
                iter,
                ifs,
                is_async,
            });
        }
        if generators.is_empty() {
            return Err(self.unexpected("`for`"));
        }
        Ok(generators)
    }

    // ── Targets ──────────────────────────────────────────────────────────────

    /// A `for`-loop or comprehension target list; commas make a tuple.
    pub(crate) fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let first = self.parse_target()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if !self.at_target_start() {
                break;
            }
            elts.push(self.parse_target()?);
        }
        Ok(self.expr_at(ExprKind::Tuple { elts }, start))
    }

    fn at_target_start(&self) -> bool {
        let t = self.cur();
        match t.kind {
            TokenKind::Name => !is_reserved(t.lexeme),
            TokenKind::Op => matches!(t.lexeme, "*" | "(" | "["),
            _ => false,
        }
    }

    /// A single assignment target: name, attribute, subscript, starred, or
    /// a parenthesized/bracketed nesting of targets.
    pub(crate) fn parse_target(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        if self.eat_op("*") {
            let value = Box::new(self.parse_target()?);
            return Ok(self.expr_at(ExprKind::Starred { value }, start));
        }
        if self.eat_op("(") {
            let inner = self.parse_target_list_until(")")?;
            self.expect_op(")")?;
            return Ok(inner);
        }
        if self.eat_op("[") {
            let mut elts = Vec::new();
            loop {
                if self.at_op("]") {
                    break;
                }
                elts.push(self.parse_target()?);
                if !self.eat_op(",") {
                    break;
                }
            }
            self.expect_op("]")?;
            return Ok(self.expr_at(ExprKind::List { elts }, start));
        }
        let id = self.expect_ident()?;
        let mut e = self.expr_at(ExprKind::Name { id }, start);
        loop {
            if self.at_op(".") {
                self.bump();
                let attr = self.expect_ident()?;
                e = self.expr_at(
                    ExprKind::Attribute {
                        value: Box::new(e),
                        attr,
                    },
                    start,
                );
            } else if self.at_op("[") {
                self.bump();
                let slice = Box::new(self.parse_subscript_list()?);
                self.expect_op("]")?;
                e = self.expr_at(
                    ExprKind::Subscript {
                        value: Box::new(e),
                        slice,
                    },
                    start,
                );
            } else {
                return Ok(e);
            }
        }
    }

    fn parse_target_list_until(&mut self, close: &str) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        let mut elts = Vec::new();
        let mut had_comma = false;
        loop {
            if self.at_op(close) {
                break;
            }
            elts.push(self.parse_target()?);
            if self.eat_op(",") {
                had_comma = true;
            } else {
                break;
            }
        }
        if elts.len() == 1 && !had_comma {
            return Ok(elts.pop().expect("len checked"));
        }
        Ok(self.expr_at(ExprKind::Tuple { elts }, start))
    }

    // ── yield ────────────────────────────────────────────────────────────────

    pub(crate) fn parse_yield_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start_pos();
        self.bump(); // `yield`
        if self.eat_name("from") {
            let value = Box::new(self.parse_test()?);
            return Ok(self.expr_at(ExprKind::YieldFrom { value }, start));
        }
        if self.at_expr_start() {
            let value = Some(Box::new(self.parse_expr_list_star()?));
            return Ok(self.expr_at(ExprKind::Yield { value }, start));
        }
        Ok(self.expr_at(ExprKind::Yield { value: None }, start))
    }

    // ── String literal groups ────────────────────────────────────────────────

    /// One or more adjacent string tokens: plain strings concatenate into a
    /// single `Constant`, any f-string in the group produces a `JoinedStr`.
    fn parse_string_group(&mut self) -> Result<Expr, ParseError> {
        enum Part {
            Plain(String),
            Bytes(Vec<u8>),
            Formatted(Vec<Expr>),
        }
        let start = self.start_pos();
        let mut parts = Vec::new();
        while self.cur().kind == TokenKind::String {
            let tok = self.bump();
            let (flags, rest) = split_string_prefix(tok.lexeme);
            let body = string_body(rest);
            if flags.fstring {
                parts.push(Part::Formatted(fstring::parse_fstring_parts(
                    body,
                    flags.raw,
                    tok.start(),
                )?));
            } else if flags.bytes {
                parts.push(Part::Bytes(unescape_bytes(body, flags.raw)));
            } else {
                parts.push(Part::Plain(unescape_str(body, flags.raw)));
            }
        }
        let any_f = parts.iter().any(|p| matches!(p, Part::Formatted(_)));
        let any_b = parts.iter().any(|p| matches!(p, Part::Bytes(_)));
        if any_b && (any_f || parts.iter().any(|p| matches!(p, Part::Plain(_)))) {
            return Err(self.syntax_error("cannot mix bytes and nonbytes literals"));
        }
        if any_f {
            let mut values = Vec::new();
            for p in parts {
                match p {
                    Part::Plain(s) => {
                        if !s.is_empty() {
                            values.push(Expr::new(ExprKind::Constant {
                                value: ConstantValue::Str(s),
                            }));
                        }
                    }
                    Part::Formatted(v) => values.extend(v),
                    Part::Bytes(_) => unreachable!("rejected above"),
                }
            }
            return Ok(self.expr_at(ExprKind::JoinedStr { values }, start));
        }
        if any_b {
            let mut bytes = Vec::new();
            for p in parts {
                if let Part::Bytes(b) = p {
                    bytes.extend(b);
                }
            }
            return Ok(self.expr_at(
                ExprKind::Constant {
                    value: ConstantValue::Bytes(bytes),
                },
                start,
            ));
        }
        let mut s = String::new();
        for p in parts {
            if let Part::Plain(v) = p {
                s.push_str(&v);
            }
        }
        Ok(self.expr_at(
            ExprKind::Constant {
                value: ConstantValue::Str(s),
            },
            start,
        ))
    }
}

// ── Literal decoding ─────────────────────────────────────────────────────────

pub(crate) fn parse_number_value(lexeme: &str) -> ConstantValue {
    let clean: String = lexeme.chars().filter(|c| *c != '_').collect();
    if let Some(imag) = clean.strip_suffix(['j', 'J']) {
        return ConstantValue::Complex(imag.parse::<f64>().unwrap_or(0.0));
    }
    let radix = match clean.get(..2) {
        Some("0x") | Some("0X") => 16,
        Some("0o") | Some("0O") => 8,
        Some("0b") | Some("0B") => 2,
        _ => 0,
    };
    if radix != 0 {
        let digits = &clean[2..];
        return match i64::from_str_radix(digits, radix) {
            Ok(v) => ConstantValue::Int(v),
            // Out-of-range literals degrade to a float approximation.
            Err(_) => ConstantValue::Float(
                u128::from_str_radix(digits, radix)
                    .map(|v| v as f64)
                    .unwrap_or(0.0),
            ),
        };
    }
    if clean.contains(['.', 'e', 'E']) {
        return ConstantValue::Float(clean.parse::<f64>().unwrap_or(0.0));
    }
    match clean.parse::<i64>() {
        Ok(v) => ConstantValue::Int(v),
        Err(_) => ConstantValue::Float(clean.parse::<f64>().unwrap_or(0.0)),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StringFlags {
    pub raw: bool,
    pub bytes: bool,
    pub fstring: bool,
}

/// Split a raw string lexeme into its prefix flags and the quoted remainder.
pub(crate) fn split_string_prefix(lexeme: &str) -> (StringFlags, &str) {
    let mut flags = StringFlags::default();
    for (i, ch) in lexeme.char_indices() {
        match ch {
            'r' | 'R' => flags.raw = true,
            'b' | 'B' => flags.bytes = true,
            'f' | 'F' => flags.fstring = true,
            'u' | 'U' => {}
            _ => return (flags, &lexeme[i..]),
        }
    }
    (flags, "")
}

/// Strip the quotes (single or triple) from a prefix-less string lexeme.
pub(crate) fn string_body(rest: &str) -> &str {
    let bytes = rest.as_bytes();
    if bytes.is_empty() {
        return "";
    }
    let q = bytes[0];
    let triple = bytes.len() >= 6 && bytes[1] == q && bytes[2] == q;
    let (open, close) = if triple { (3, 3) } else { (1, 1) };
    rest.get(open..rest.len().saturating_sub(close)).unwrap_or("")
}

/// Decode escape sequences in a string literal body.
pub(crate) fn unescape_str(body: &str, raw: bool) -> String {
    if raw {
        return body.to_string();
    }
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let esc = chars[i + 1];
        i += 2;
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '\n' => {} // escaped newline: line continuation
            'x' => {
                let hex: String = chars[i..].iter().take(2).collect();
                if let Ok(v) = u8::from_str_radix(&hex, 16) {
                    out.push(v as char);
                    i += hex.len();
                } else {
                    out.push('\\');
                    out.push('x');
                }
            }
            'u' | 'U' => {
                let width = if esc == 'u' { 4 } else { 8 };
                let hex: String = chars[i..].iter().take(width).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) if hex.len() == width => {
                        out.push(c);
                        i += width;
                    }
                    _ => {
                        out.push('\\');
                        out.push(esc);
                    }
                }
            }
            '0'..='7' => {
                let mut v = esc as u32 - '0' as u32;
                let mut taken = 0;
                while taken < 2 && i < chars.len() && ('0'..='7').contains(&chars[i]) {
                    v = v * 8 + (chars[i] as u32 - '0' as u32);
                    i += 1;
                    taken += 1;
                }
                out.push(char::from_u32(v).unwrap_or('\u{fffd}'));
            }
            other => {
                // Unknown escapes are kept verbatim, as CPython does.
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

/// Decode escape sequences in a bytes literal body.
pub(crate) fn unescape_bytes(body: &str, raw: bool) -> Vec<u8> {
    if raw {
        return body.as_bytes().to_vec();
    }
    // Bytes literals share the simple escapes; decode through the string
    // path and re-encode (the lexer guarantees ASCII content for `b''`).
    unescape_str(body, false).into_bytes()
}

// ── Tests ────────────────────────────────────────────────────────────────────
