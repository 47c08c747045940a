//! Recursive-descent Python parser.
//!
//! Statements live here; the expression ladder is in [`expr`], the f-string
//! sub-parser in [`fstring`], and match patterns / type parameters in
//! [`pattern`].  The parser materializes the token stream up front and keeps
//! a position index into it — deeper lookahead (soft keywords, `name=value`
//! keyword arguments) is a matter of peeking at `pos + n`.
//!
//! There is no error recovery: the first unexpected token aborts the parse
//! with a [`ParseError`] carrying the expected/actual description and the
//! token's position.

mod expr;
mod fstring;
mod pattern;

use crate::ast::{
    Alias, Arg, Arguments, Expr, ExprKind, Keyword, Module, Operator, Span, Stmt, StmtKind,
    WithItem,
};
use crate::error::ParseError;
use crate::tokenizer::{Token, TokenKind, Tokenizer};

// ── Public entry points ──────────────────────────────────────────────────────

/// Parse a complete module.  Empty input parses to `Module { body: [] }`.
pub fn parse(source: &str) -> Result<Module, ParseError> {
    let mut p = Parser::new(source)?;
    p.parse_module()
}

/// Parse a single expression (no statement machinery, no trailing garbage).
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let mut p = Parser::new(source)?;
    let e = p.parse_expr_list_star()?;
    p.skip_newlines();
    if p.cur().kind != TokenKind::EndOfInput {
        return Err(p.unexpected("end of input"));
    }
    Ok(e)
}

// ── Keywords ─────────────────────────────────────────────────────────────────

/// Hard keywords — never usable as identifiers.  The soft keywords `match`,
/// `case`, and `type` are deliberately absent.
const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

pub(crate) fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

fn aug_op(lexeme: &str) -> Option<Operator> {
    Some(match lexeme {
        "+=" => Operator::Add,
        "-=" => Operator::Sub,
        "*=" => Operator::Mult,
        "/=" => Operator::Div,
        "//=" => Operator::FloorDiv,
        "%=" => Operator::Mod,
        "**=" => Operator::Pow,
        "&=" => Operator::BitAnd,
        "|=" => Operator::BitOr,
        "^=" => Operator::BitXor,
        ">>=" => Operator::RShift,
        "<<=" => Operator::LShift,
        "@=" => Operator::MatMult,
        _ => return None,
    })
}

// ── Parser ───────────────────────────────────────────────────────────────────

pub(crate) struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
    /// End position of the most recently consumed token.
    last_end: (u32, u32),
}

impl<'src> Parser<'src> {
    pub(crate) fn new(source: &'src str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: Tokenizer::tokenize(source)?,
            pos: 0,
            last_end: (1, 0),
        })
    }

    // ── Token access ─────────────────────────────────────────────────────────

    pub(crate) fn cur(&self) -> Token<'src> {
        self.tokens[self.pos]
    }

    /// Peek `n` tokens ahead (0 = current).
    pub(crate) fn nth(&self, n: usize) -> Token<'src> {
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + n).min(last)]
    }

    pub(crate) fn bump(&mut self) -> Token<'src> {
        let t = self.cur();
        if t.kind != TokenKind::EndOfInput {
            self.pos += 1;
        }
        self.last_end = t.end();
        t
    }

    pub(crate) fn at_op(&self, op: &str) -> bool {
        let t = self.cur();
        t.kind == TokenKind::Op && t.lexeme == op
    }

    pub(crate) fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_op(&mut self, op: &str) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{op}`")))
        }
    }

    pub(crate) fn at_name(&self, word: &str) -> bool {
        let t = self.cur();
        t.kind == TokenKind::Name && t.lexeme == word
    }

    pub(crate) fn eat_name(&mut self, word: &str) -> bool {
        if self.at_name(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_name(&mut self, word: &str) -> Result<(), ParseError> {
        if self.eat_name(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{word}`")))
        }
    }

    /// Consume an identifier (soft keywords allowed, hard keywords rejected).
    pub(crate) fn expect_ident(&mut self) -> Result<String, ParseError> {
        let t = self.cur();
        if t.kind == TokenKind::Name && !is_reserved(t.lexeme) {
            self.bump();
            Ok(t.lexeme.to_string())
        } else {
            Err(self.unexpected("an identifier"))
        }
    }

    fn describe(t: Token<'_>) -> String {
        match t.kind {
            TokenKind::EndOfInput => "end of input".to_string(),
            TokenKind::Newline | TokenKind::NewlineLogical => "newline".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            _ => format!("`{}`", t.lexeme),
        }
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        let t = self.cur();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: Self::describe(t),
            line: t.line,
            col: t.col,
        }
    }

    pub(crate) fn syntax_error(&self, message: &str) -> ParseError {
        let t = self.cur();
        ParseError::Syntax {
            message: message.to_string(),
            line: t.line,
            col: t.col,
        }
    }

    // ── Spans ────────────────────────────────────────────────────────────────

    pub(crate) fn start_pos(&self) -> (u32, u32) {
        let t = self.cur();
        (t.line, t.col)
    }

    pub(crate) fn span_from(&self, start: (u32, u32)) -> Span {
        Span::new(start.0, start.1, self.last_end.0, self.last_end.1)
    }

    pub(crate) fn expr_at(&self, kind: ExprKind, start: (u32, u32)) -> Expr {
        Expr {
            kind,
            span: self.span_from(start),
        }
    }

    fn stmt_at(&self, kind: StmtKind, start: (u32, u32)) -> Stmt {
        Stmt {
            kind,
            span: self.span_from(start),
        }
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.cur().kind == TokenKind::Newline {
            self.bump();
        }
    }

    // ── Module ───────────────────────────────────────────────────────────────

    fn parse_module(&mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            if self.cur().kind == TokenKind::EndOfInput {
                break;
            }
            self.parse_statement_into(&mut body)?;
        }
        Ok(Module { body })
    }

    // ── Statement dispatch ───────────────────────────────────────────────────

    /// Parse one compound statement, or a `;`-separated simple-statement
    /// list, appending the results to `out`.
    fn parse_statement_into(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        let t = self.cur();
        if t.kind == TokenKind::Op && t.lexeme == "@" {
            out.push(self.parse_decorated()?);
            return Ok(());
        }
        if t.kind == TokenKind::Name {
            match t.lexeme {
                "if" => {
                    out.push(self.parse_if()?);
                    return Ok(());
                }
                "while" => {
                    out.push(self.parse_while()?);
                    return Ok(());
                }
                "for" => {
                    out.push(self.parse_for(false)?);
                    return Ok(());
                }
                "try" => {
                    out.push(self.parse_try()?);
                    return Ok(());
                }
                "with" => {
                    out.push(self.parse_with(false)?);
                    return Ok(());
                }
                "def" => {
                    out.push(self.parse_funcdef(false, Vec::new())?);
                    return Ok(());
                }
                "class" => {
                    out.push(self.parse_classdef(Vec::new())?);
                    return Ok(());
                }
                "async" => {
                    out.push(self.parse_async_stmt()?);
                    return Ok(());
                }
                "match" if self.looks_like_match_stmt() => {
                    out.push(self.parse_match()?);
                    return Ok(());
                }
                _ => {}
            }
        }
        // Simple statement list: `a = 1; b = 2`.
        loop {
            out.push(self.parse_simple_stmt()?);
            if !self.eat_op(";") {
                break;
            }
            if matches!(
                self.cur().kind,
                TokenKind::Newline | TokenKind::EndOfInput | TokenKind::Dedent
            ) {
                break;
            }
        }
        self.end_of_statement()
    }

    fn end_of_statement(&mut self) -> Result<(), ParseError> {
        match self.cur().kind {
            TokenKind::Newline => {
                self.bump();
                Ok(())
            }
            TokenKind::EndOfInput | TokenKind::Dedent => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    /// `match` is a soft keyword: `match x:` opens a match statement, but
    /// `match = 5`, `match(x)`, `match[0] = 5` are ordinary expressions.
    /// A match statement needs the next token to start a subject expression
    /// AND a depth-0 `:` before the end of the line.
    fn looks_like_match_stmt(&self) -> bool {
        let t = self.nth(1);
        let starts_subject = match t.kind {
            TokenKind::Number | TokenKind::String => true,
            TokenKind::Name => {
                !is_reserved(t.lexeme)
                    || matches!(t.lexeme, "not" | "lambda" | "None" | "True" | "False")
            }
            TokenKind::Op => matches!(t.lexeme, "-" | "+" | "~" | "*" | "(" | "[" | "{"),
            _ => false,
        };
        if !starts_subject {
            return false;
        }
        // Scan the rest of the logical line for the header colon.
        let mut depth = 0i32;
        let mut n = 1;
        loop {
            let t = self.nth(n);
            match t.kind {
                TokenKind::Newline | TokenKind::EndOfInput | TokenKind::Dedent => return false,
                TokenKind::Op => match t.lexeme {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth -= 1,
                    ":" if depth == 0 => return true,
                    ";" if depth == 0 => return false,
                    _ => {}
                },
                _ => {}
            }
            n += 1;
        }
    }

    /// `type X = ...` / `type X[T] = ...` is a soft-keyword statement; plain
    /// uses of a variable called `type` stay expressions.
    fn looks_like_type_alias(&self) -> bool {
        let name = self.nth(1);
        if name.kind != TokenKind::Name || is_reserved(name.lexeme) {
            return false;
        }
        let after = self.nth(2);
        after.kind == TokenKind::Op && (after.lexeme == "=" || after.lexeme == "[")
    }

    // ── Simple statements ────────────────────────────────────────────────────

    fn parse_simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        let t = self.cur();
        if t.kind == TokenKind::Name {
            match t.lexeme {
                "pass" => {
                    self.bump();
                    return Ok(self.stmt_at(StmtKind::Pass, start));
                }
                "break" => {
                    self.bump();
                    return Ok(self.stmt_at(StmtKind::Break, start));
                }
                "continue" => {
                    self.bump();
                    return Ok(self.stmt_at(StmtKind::Continue, start));
                }
                "return" => return self.parse_return(),
                "raise" => return self.parse_raise(),
                "import" => return self.parse_import(),
                "from" => return self.parse_import_from(),
                "global" => {
                    self.bump();
                    let names = self.parse_ident_list()?;
                    return Ok(self.stmt_at(StmtKind::Global { names }, start));
                }
                "nonlocal" => {
                    self.bump();
                    let names = self.parse_ident_list()?;
                    return Ok(self.stmt_at(StmtKind::Nonlocal { names }, start));
                }
                "del" => return self.parse_delete(),
                "assert" => return self.parse_assert(),
                "yield" => {
                    let value = self.parse_yield_expr()?;
                    return Ok(self.stmt_at(StmtKind::Expr { value }, start));
                }
                "type" if self.looks_like_type_alias() => return self.parse_type_alias(),
                _ => {}
            }
        }
        self.parse_expr_stmt()
    }

    fn parse_ident_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.expect_ident()?];
        while self.eat_op(",") {
            names.push(self.expect_ident()?);
        }
        Ok(names)
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.cur().kind,
            TokenKind::Newline | TokenKind::EndOfInput | TokenKind::Dedent
        ) || self.at_op(";")
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expr_list_star()?)
        };
        Ok(self.stmt_at(StmtKind::Return { value }, start))
    }

    fn parse_raise(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let exc = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_test()?)
        };
        let cause = if self.eat_name("from") {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(self.stmt_at(StmtKind::Raise { exc, cause }, start))
    }

    fn parse_delete(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let mut targets = vec![self.parse_target()?];
        while self.eat_op(",") {
            if self.at_statement_end() {
                break;
            }
            targets.push(self.parse_target()?);
        }
        Ok(self.stmt_at(StmtKind::Delete { targets }, start))
    }

    fn parse_assert(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let test = self.parse_test()?;
        let msg = if self.eat_op(",") {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(self.stmt_at(StmtKind::Assert { test, msg }, start))
    }

    // ── Imports ──────────────────────────────────────────────────────────────

    fn parse_dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_ident()?;
        while self.at_op(".") && self.nth(1).kind == TokenKind::Name {
            self.bump();
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }
        Ok(name)
    }

    fn parse_import_alias(&mut self, dotted: bool) -> Result<Alias, ParseError> {
        let name = if dotted {
            self.parse_dotted_name()?
        } else {
            self.expect_ident()?
        };
        let asname = if self.eat_name("as") {
            Some(self.expect_ident()?)
        } else {
            None
        };
        Ok(Alias { name, asname })
    }

    fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let mut names = vec![self.parse_import_alias(true)?];
        while self.eat_op(",") {
            names.push(self.parse_import_alias(true)?);
        }
        Ok(self.stmt_at(StmtKind::Import { names }, start))
    }

    fn parse_import_from(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        // Leading dots set the relative level; `...` tokenizes as one Op.
        let mut level = 0u32;
        loop {
            if self.at_op(".") {
                self.bump();
                level += 1;
            } else if self.at_op("...") {
                self.bump();
                level += 3;
            } else {
                break;
            }
        }
        let module = if self.cur().kind == TokenKind::Name && !self.at_name("import") {
            Some(self.parse_dotted_name()?)
        } else {
            None
        };
        if level == 0 && module.is_none() {
            return Err(self.unexpected("a module name"));
        }
        self.expect_name("import")?;
        let names = if self.eat_op("*") {
            vec![Alias {
                name: "*".to_string(),
                asname: None,
            }]
        } else {
            let parens = self.eat_op("(");
            let mut names = vec![self.parse_import_alias(false)?];
            while self.eat_op(",") {
                if parens && self.at_op(")") {
                    break;
                }
                names.push(self.parse_import_alias(false)?);
            }
            if parens {
                self.expect_op(")")?;
            }
            names
        };
        Ok(self.stmt_at(
            StmtKind::ImportFrom {
                module,
                names,
                level,
            },
            start,
        ))
    }

    // ── Expression statements and assignments ────────────────────────────────

    fn parse_assign_rhs(&mut self) -> Result<Expr, ParseError> {
        if self.at_name("yield") {
            self.parse_yield_expr()
        } else {
            self.parse_expr_list_star()
        }
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        let first = self.parse_expr_list_star()?;

        // `target: annotation [= value]`
        if self.at_op(":") {
            self.bump();
            let simple = u8::from(matches!(first.kind, ExprKind::Name { .. }));
            let annotation = self.parse_test()?;
            let value = if self.eat_op("=") {
                Some(self.parse_assign_rhs()?)
            } else {
                None
            };
            return Ok(self.stmt_at(
                StmtKind::AnnAssign {
                    target: first,
                    annotation,
                    value,
                    simple,
                },
                start,
            ));
        }

        // `target <op>= value`
        if self.cur().kind == TokenKind::Op {
            if let Some(op) = aug_op(self.cur().lexeme) {
                self.bump();
                let value = self.parse_assign_rhs()?;
                return Ok(self.stmt_at(
                    StmtKind::AugAssign {
                        target: first,
                        op,
                        value,
                    },
                    start,
                ));
            }
        }

        // `a = b = value`
        if self.at_op("=") {
            let mut targets = vec![first];
            loop {
                self.bump();
                let next = self.parse_assign_rhs()?;
                if self.at_op("=") {
                    targets.push(next);
                } else {
                    return Ok(self.stmt_at(
                        StmtKind::Assign {
                            targets,
                            value: next,
                        },
                        start,
                    ));
                }
            }
        }

        Ok(self.stmt_at(StmtKind::Expr { value: first }, start))
    }

    // ── Suites ───────────────────────────────────────────────────────────────

    /// `: NEWLINE INDENT stmt+ DEDENT` or an inline simple-statement list.
    pub(crate) fn parse_suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_op(":")?;
        if self.cur().kind == TokenKind::Newline {
            self.bump();
            self.skip_newlines();
            if self.cur().kind != TokenKind::Indent {
                return Err(self.unexpected("an indented block"));
            }
            self.bump();
            let mut body = Vec::new();
            loop {
                self.skip_newlines();
                match self.cur().kind {
                    TokenKind::Dedent => {
                        self.bump();
                        break;
                    }
                    TokenKind::EndOfInput => break,
                    _ => self.parse_statement_into(&mut body)?,
                }
            }
            if body.is_empty() {
                return Err(self.unexpected("a statement"));
            }
            Ok(body)
        } else {
            // Inline suite: `if cond: stmt[; stmt]`
            let mut body = Vec::new();
            loop {
                body.push(self.parse_simple_stmt()?);
                if !self.eat_op(";") {
                    break;
                }
                if matches!(
                    self.cur().kind,
                    TokenKind::Newline | TokenKind::EndOfInput | TokenKind::Dedent
                ) {
                    break;
                }
            }
            self.end_of_statement()?;
            Ok(body)
        }
    }

    fn parse_else_clause(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.at_name("else") {
            self.bump();
            self.parse_suite()
        } else {
            Ok(Vec::new())
        }
    }

    // ── Control flow ─────────────────────────────────────────────────────────

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let test = self.parse_namedexpr()?;
        let body = self.parse_suite()?;
        let orelse = self.parse_elif_else()?;
        Ok(self.stmt_at(StmtKind::If { test, body, orelse }, start))
    }

    fn parse_elif_else(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.at_name("elif") {
            // `elif` becomes a nested `If` in the parent's orelse.
            let start = self.start_pos();
            self.bump();
            let test = self.parse_namedexpr()?;
            let body = self.parse_suite()?;
            let orelse = self.parse_elif_else()?;
            Ok(vec![self.stmt_at(StmtKind::If { test, body, orelse }, start)])
        } else {
            self.parse_else_clause()
        }
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let test = self.parse_namedexpr()?;
        let body = self.parse_suite()?;
        let orelse = self.parse_else_clause()?;
        Ok(self.stmt_at(StmtKind::While { test, body, orelse }, start))
    }

    fn parse_for(&mut self, is_async: bool) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let target = self.parse_target_list()?;
        self.expect_name("in")?;
        let iter = self.parse_expr_list_star()?;
        let body = self.parse_suite()?;
        let orelse = self.parse_else_clause()?;
        let kind = if is_async {
            StmtKind::AsyncFor {
                target,
                iter,
                body,
                orelse,
            }
        } else {
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            }
        };
        Ok(self.stmt_at(kind, start))
    }

    fn parse_with(&mut self, is_async: bool) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let mut items = Vec::new();
        loop {
            let context_expr = self.parse_test()?;
            let optional_vars = if self.eat_name("as") {
                Some(self.parse_target()?)
            } else {
                None
            };
            items.push(WithItem {
                context_expr,
                optional_vars,
            });
            if !self.eat_op(",") {
                break;
            }
        }
        let body = self.parse_suite()?;
        let kind = if is_async {
            StmtKind::AsyncWith { items, body }
        } else {
            StmtKind::With { items, body }
        };
        Ok(self.stmt_at(kind, start))
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let body = self.parse_suite()?;
        let mut handlers = Vec::new();
        while self.at_name("except") {
            self.bump();
            // `except*` exception groups parse like plain handlers.
            let _ = self.eat_op("*");
            let type_ = if self.at_op(":") {
                None
            } else {
                Some(self.parse_test()?)
            };
            let name = if self.eat_name("as") {
                Some(self.expect_ident()?)
            } else {
                None
            };
            let handler_body = self.parse_suite()?;
            handlers.push(crate::ast::ExceptHandler {
                type_,
                name,
                body: handler_body,
            });
        }
        let orelse = self.parse_else_clause()?;
        let finalbody = if self.eat_name("finally") {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.unexpected("`except` or `finally`"));
        }
        Ok(self.stmt_at(
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            },
            start,
        ))
    }

    // ── Definitions ──────────────────────────────────────────────────────────

    fn parse_async_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump();
        let stmt = if self.at_name("def") {
            self.parse_funcdef(true, Vec::new())?
        } else if self.at_name("for") {
            self.parse_for(true)?
        } else if self.at_name("with") {
            self.parse_with(true)?
        } else {
            return Err(self.unexpected("`def`, `for`, or `with`"));
        };
        Ok(Stmt {
            kind: stmt.kind,
            span: self.span_from(start),
        })
    }

    fn parse_decorated(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        let mut decorators = Vec::new();
        while self.at_op("@") {
            self.bump();
            decorators.push(self.parse_namedexpr()?);
            self.end_of_statement()?;
            self.skip_newlines();
        }
        let is_async = if self.at_name("async") {
            self.bump();
            true
        } else {
            false
        };
        let mut stmt = if self.at_name("def") {
            self.parse_funcdef(is_async, decorators)?
        } else if self.at_name("class") && !is_async {
            self.parse_classdef(decorators)?
        } else {
            return Err(self.unexpected("`def` or `class`"));
        };
        stmt.span = self.span_from(start);
        Ok(stmt)
    }

    fn parse_funcdef(
        &mut self,
        is_async: bool,
        decorator_list: Vec<Expr>,
    ) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump(); // `def`
        let name = self.expect_ident()?;
        let type_params = if self.at_op("[") {
            self.parse_type_params()?
        } else {
            Vec::new()
        };
        self.expect_op("(")?;
        let args = Box::new(self.parse_parameters(true, ")")?);
        self.expect_op(")")?;
        let returns = if self.eat_op("->") {
            Some(self.parse_test()?)
        } else {
            None
        };
        let body = self.parse_suite()?;
        let kind = if is_async {
            StmtKind::AsyncFunctionDef {
                name,
                type_params,
                args,
                body,
                decorator_list,
                returns,
            }
        } else {
            StmtKind::FunctionDef {
                name,
                type_params,
                args,
                body,
                decorator_list,
                returns,
            }
        };
        Ok(self.stmt_at(kind, start))
    }

    fn parse_classdef(&mut self, decorator_list: Vec<Expr>) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump(); // `class`
        let name = self.expect_ident()?;
        let type_params = if self.at_op("[") {
            self.parse_type_params()?
        } else {
            Vec::new()
        };
        let mut bases = Vec::new();
        let mut keywords = Vec::new();
        if self.eat_op("(") {
            loop {
                if self.at_op(")") {
                    break;
                }
                if self.eat_op("**") {
                    keywords.push(Keyword {
                        arg: None,
                        value: self.parse_test()?,
                    });
                } else if self.cur().kind == TokenKind::Name
                    && !is_reserved(self.cur().lexeme)
                    && self.nth(1).kind == TokenKind::Op
                    && self.nth(1).lexeme == "="
                {
                    let kw_name = self.expect_ident()?;
                    self.bump(); // `=`
                    keywords.push(Keyword {
                        arg: Some(kw_name),
                        value: self.parse_test()?,
                    });
                } else {
                    bases.push(self.parse_star_or_named()?);
                }
                if !self.eat_op(",") {
                    break;
                }
            }
            self.expect_op(")")?;
        }
        let body = self.parse_suite()?;
        Ok(self.stmt_at(
            StmtKind::ClassDef {
                name,
                type_params,
                bases,
                keywords,
                body,
                decorator_list,
            },
            start,
        ))
    }

    /// Parameter list for `def` (annotations allowed) and `lambda`
    /// (annotations rejected because `:` opens the body).  `term` is the
    /// closing lexeme and is left unconsumed.
    fn parse_parameters(
        &mut self,
        allow_annotations: bool,
        term: &str,
    ) -> Result<Arguments, ParseError> {
        let mut args = Arguments::default();
        let mut seen_star = false;
        let mut seen_default = false;
        loop {
            if self.at_op(term) || self.cur().kind == TokenKind::EndOfInput {
                break;
            }
            if self.eat_op("/") {
                // Everything so far was positional-only.
                args.posonlyargs.append(&mut args.args);
            } else if self.eat_op("*") {
                seen_star = true;
                if !self.at_op(",") && !self.at_op(term) {
                    let arg = self.parse_param(allow_annotations)?;
                    args.vararg = Some(arg);
                }
            } else if self.eat_op("**") {
                let arg = self.parse_param(allow_annotations)?;
                args.kwarg = Some(arg);
            } else {
                let arg = self.parse_param(allow_annotations)?;
                let default = if self.eat_op("=") {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                if seen_star {
                    args.kw_defaults.push(default);
                    args.kwonlyargs.push(arg);
                } else {
                    match default {
                        Some(d) => {
                            seen_default = true;
                            args.defaults.push(d);
                        }
                        None if seen_default => {
                            return Err(self.syntax_error(
                                "parameter without a default follows parameter with a default",
                            ));
                        }
                        None => {}
                    }
                    args.args.push(arg);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(args)
    }

    fn parse_param(&mut self, allow_annotations: bool) -> Result<Arg, ParseError> {
        let name = self.expect_ident()?;
        let annotation = if allow_annotations && self.eat_op(":") {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(Arg {
            arg: name,
            annotation,
        })
    }

    // ── match / type statements ──────────────────────────────────────────────

    fn parse_match(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump(); // `match`
        let subject = self.parse_expr_list_star()?;
        self.expect_op(":")?;
        if self.cur().kind != TokenKind::Newline {
            return Err(self.unexpected("newline"));
        }
        self.bump();
        self.skip_newlines();
        if self.cur().kind != TokenKind::Indent {
            return Err(self.unexpected("an indented block"));
        }
        self.bump();
        let mut cases = Vec::new();
        loop {
            self.skip_newlines();
            match self.cur().kind {
                TokenKind::Dedent => {
                    self.bump();
                    break;
                }
                TokenKind::EndOfInput => break,
                _ => {
                    if !self.at_name("case") {
                        return Err(self.unexpected("`case`"));
                    }
                    self.bump();
                    let case = self.parse_match_case()?;
                    cases.push(case);
                }
            }
        }
        if cases.is_empty() {
            return Err(self.unexpected("`case`"));
        }
        Ok(self.stmt_at(StmtKind::Match { subject, cases }, start))
    }

    fn parse_type_alias(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start_pos();
        self.bump(); // `type`
        let name_start = self.start_pos();
        let id = self.expect_ident()?;
        let name = self.expr_at(ExprKind::Name { id }, name_start);
        let type_params = if self.at_op("[") {
            self.parse_type_params()?
        } else {
            Vec::new()
        };
        self.expect_op("=")?;
        let value = self.parse_test()?;
        Ok(self.stmt_at(
            StmtKind::TypeAlias {
                name,
                type_params,
                value,
            },
            start,
        ))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
