//! Match-statement patterns and PEP 695 type parameters.
//!
//! Patterns are a subgrammar distinct from expressions: a bare name is a
//! capture, a dotted name is a value to compare against, and literals
//! compare by equality (`None`/`True`/`False` by identity, hence
//! `MatchSingleton`).

use super::Parser;
use super::expr::parse_number_value;
use crate::ast::{
    ConstantValue, Expr, ExprKind, MatchCase, Pattern, TypeParam, UnaryOpKind,
};
use crate::error::ParseError;
use crate::tokenizer::TokenKind;

impl<'src> Parser<'src> {
    /// The remainder of a `case` clause: patterns, optional guard, suite.
    pub(crate) fn parse_match_case(&mut self) -> Result<MatchCase, ParseError> {
        let pattern = self.parse_open_sequence_pattern()?;
        let guard = if self.eat_name("if") {
            Some(self.parse_namedexpr()?)
        } else {
            None
        };
        let body = self.parse_suite()?;
        Ok(MatchCase {
            pattern,
            guard,
            body,
        })
    }

    /// `case a, b, *rest:` — a comma at the top level makes an (unbracketed)
    /// sequence pattern.
    fn parse_open_sequence_pattern(&mut self) -> Result<Pattern, ParseError> {
        let first = self.parse_as_pattern()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut patterns = vec![first];
        while self.eat_op(",") {
            if self.at_op(":") || self.at_name("if") {
                break;
            }
            patterns.push(self.parse_as_pattern()?);
        }
        Ok(Pattern::MatchSequence { patterns })
    }

    /// `pattern as name`.
    fn parse_as_pattern(&mut self) -> Result<Pattern, ParseError> {
        let p = self.parse_or_pattern()?;
        if self.eat_name("as") {
            let name = self.expect_ident()?;
            return Ok(Pattern::MatchAs {
                pattern: Some(Box::new(p)),
                name: Some(name),
            });
        }
        Ok(p)
    }

    /// `p | q | ...`
    fn parse_or_pattern(&mut self) -> Result<Pattern, ParseError> {
        let first = self.parse_closed_pattern()?;
        if !self.at_op("|") {
            return Ok(first);
        }
        let mut patterns = vec![first];
        while self.eat_op("|") {
            patterns.push(self.parse_closed_pattern()?);
        }
        Ok(Pattern::MatchOr { patterns })
    }

    fn parse_closed_pattern(&mut self) -> Result<Pattern, ParseError> {
        let t = self.cur();
        match t.kind {
            TokenKind::Op if t.lexeme == "*" => {
                self.bump();
                let name = self.expect_ident()?;
                Ok(Pattern::MatchStar {
                    name: if name == "_" { None } else { Some(name) },
                })
            }
            TokenKind::Op if t.lexeme == "-" => {
                // Negative number literal.
                self.bump();
                let num = self.cur();
                if num.kind != TokenKind::Number {
                    return Err(self.unexpected("a number"));
                }
                self.bump();
                let value = Expr::new(ExprKind::UnaryOp {
                    op: UnaryOpKind::USub,
                    operand: Box::new(Expr::new(ExprKind::Constant {
                        value: parse_number_value(num.lexeme),
                    })),
                });
                Ok(Pattern::MatchValue { value })
            }
            TokenKind::Op if t.lexeme == "(" => {
                self.bump();
                if self.eat_op(")") {
                    return Ok(Pattern::MatchSequence {
                        patterns: Vec::new(),
                    });
                }
                let mut patterns = Vec::new();
                let mut had_comma = false;
                loop {
                    patterns.push(self.parse_as_pattern()?);
                    if self.eat_op(",") {
                        had_comma = true;
                        if self.at_op(")") {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                self.expect_op(")")?;
                if patterns.len() == 1 && !had_comma {
                    // Parenthesized group, not a sequence.
                    Ok(patterns.pop().expect("len checked"))
                } else {
                    Ok(Pattern::MatchSequence { patterns })
                }
            }
            TokenKind::Op if t.lexeme == "[" => {
                self.bump();
                let mut patterns = Vec::new();
                loop {
                    if self.at_op("]") {
                        break;
                    }
                    patterns.push(self.parse_as_pattern()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("]")?;
                Ok(Pattern::MatchSequence { patterns })
            }
            TokenKind::Op if t.lexeme == "{" => self.parse_mapping_pattern(),
            TokenKind::Number => {
                self.bump();
                Ok(Pattern::MatchValue {
                    value: Expr::new(ExprKind::Constant {
                        value: parse_number_value(t.lexeme),
                    }),
                })
            }
            TokenKind::String => {
                let value = self.parse_pattern_literal_string()?;
                Ok(Pattern::MatchValue { value })
            }
            TokenKind::Name => match t.lexeme {
                "None" => {
                    self.bump();
                    Ok(Pattern::MatchSingleton {
                        value: ConstantValue::None,
                    })
                }
                "True" => {
                    self.bump();
                    Ok(Pattern::MatchSingleton {
                        value: ConstantValue::Bool(true),
                    })
                }
                "False" => {
                    self.bump();
                    Ok(Pattern::MatchSingleton {
                        value: ConstantValue::Bool(false),
                    })
                }
                "_" => {
                    self.bump();
                    Ok(Pattern::MatchAs {
                        pattern: None,
                        name: None,
                    })
                }
                _ => self.parse_name_pattern(),
            },
            _ => Err(self.unexpected("a pattern")),
        }
    }

    /// Bare name → capture; dotted name → value; trailing `(` → class.
    fn parse_name_pattern(&mut self) -> Result<Pattern, ParseError> {
        let start = self.start_pos();
        let id = self.expect_ident()?;
        let mut value = self.expr_at(ExprKind::Name { id: id.clone() }, start);
        let mut dotted = false;
        while self.at_op(".") {
            dotted = true;
            self.bump();
            let attr = self.expect_ident()?;
            value = self.expr_at(
                ExprKind::Attribute {
                    value: Box::new(value),
                    attr,
                },
                start,
            );
        }
        if self.at_op("(") {
            return self.parse_class_pattern(value);
        }
        if dotted {
            return Ok(Pattern::MatchValue { value });
        }
        Ok(Pattern::MatchAs {
            pattern: None,
            name: Some(id),
        })
    }

    /// `ClassName(pos..., kw=pat...)`.
    fn parse_class_pattern(&mut self, cls: Expr) -> Result<Pattern, ParseError> {
        self.bump(); // `(`
        let mut patterns = Vec::new();
        let mut kwd_attrs = Vec::new();
        let mut kwd_patterns = Vec::new();
        loop {
            if self.at_op(")") {
                break;
            }
            if self.cur().kind == TokenKind::Name
                && !super::is_reserved(self.cur().lexeme)
                && self.nth(1).kind == TokenKind::Op
                && self.nth(1).lexeme == "="
            {
                kwd_attrs.push(self.expect_ident()?);
                self.bump(); // `=`
                kwd_patterns.push(self.parse_as_pattern()?);
            } else {
                patterns.push(self.parse_as_pattern()?);
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok(Pattern::MatchClass {
            cls,
            patterns,
            kwd_attrs,
            kwd_patterns,
        })
    }

    /// `{key: pattern, ..., **rest}` — keys are literals or dotted names.
    fn parse_mapping_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.bump(); // `{`
        let mut keys = Vec::new();
        let mut patterns = Vec::new();
        let mut rest = None;
        loop {
            if self.at_op("}") {
                break;
            }
            if self.eat_op("**") {
                rest = Some(self.expect_ident()?);
            } else {
                keys.push(self.parse_mapping_key()?);
                self.expect_op(":")?;
                patterns.push(self.parse_as_pattern()?);
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op("}")?;
        Ok(Pattern::MatchMapping {
            keys,
            patterns,
            rest,
        })
    }

    fn parse_mapping_key(&mut self) -> Result<Expr, ParseError> {
        let t = self.cur();
        match t.kind {
            TokenKind::Number => {
                self.bump();
                Ok(Expr::new(ExprKind::Constant {
                    value: parse_number_value(t.lexeme),
                }))
            }
            TokenKind::String => self.parse_pattern_literal_string(),
            TokenKind::Op if t.lexeme == "-" => {
                self.bump();
                let num = self.cur();
                if num.kind != TokenKind::Number {
                    return Err(self.unexpected("a number"));
                }
                self.bump();
                Ok(Expr::new(ExprKind::UnaryOp {
                    op: UnaryOpKind::USub,
                    operand: Box::new(Expr::new(ExprKind::Constant {
                        value: parse_number_value(num.lexeme),
                    })),
                }))
            }
            TokenKind::Name if t.lexeme == "None" => {
                self.bump();
                Ok(Expr::new(ExprKind::Constant {
                    value: ConstantValue::None,
                }))
            }
            TokenKind::Name if !super::is_reserved(t.lexeme) => {
                let start = self.start_pos();
                let id = self.expect_ident()?;
                let mut value = self.expr_at(ExprKind::Name { id }, start);
                while self.at_op(".") {
                    self.bump();
                    let attr = self.expect_ident()?;
                    value = self.expr_at(
                        ExprKind::Attribute {
                            value: Box::new(value),
                            attr,
                        },
                        start,
                    );
                }
                Ok(value)
            }
            _ => Err(self.unexpected("a mapping key")),
        }
    }

    /// String literals in patterns: plain constants only.
    fn parse_pattern_literal_string(&mut self) -> Result<Expr, ParseError> {
        let t = self.bump();
        let (flags, rest) = super::expr::split_string_prefix(t.lexeme);
        if flags.fstring {
            return Err(self.syntax_error("patterns may not match formatted string literals"));
        }
        let body = super::expr::string_body(rest);
        let value = if flags.bytes {
            ConstantValue::Bytes(super::expr::unescape_bytes(body, flags.raw))
        } else {
            ConstantValue::Str(super::expr::unescape_str(body, flags.raw))
        };
        Ok(Expr::new(ExprKind::Constant { value }))
    }

    // ── Type parameters ──────────────────────────────────────────────────────

    /// `[T, U: bound, *Ts, **P]` after a def/class name or `type` alias.
    pub(crate) fn parse_type_params(&mut self) -> Result<Vec<TypeParam>, ParseError> {
        self.bump(); // `[`
        let mut params = Vec::new();
        loop {
            if self.at_op("]") {
                break;
            }
            if self.eat_op("*") {
                params.push(TypeParam::TypeVarTuple {
                    name: self.expect_ident()?,
                });
            } else if self.eat_op("**") {
                params.push(TypeParam::ParamSpec {
                    name: self.expect_ident()?,
                });
            } else {
                let name = self.expect_ident()?;
                let bound = if self.eat_op(":") {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                params.push(TypeParam::TypeVar { name, bound });
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op("]")?;
        if params.is_empty() {
            return Err(self.unexpected("a type parameter"));
        }
        Ok(params)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::{ConstantValue, ExprKind, Pattern, StmtKind};

    fn first_case_pattern(src: &str) -> Pattern {
        let module = parse(src).unwrap();
        let StmtKind::Match { cases, .. } = &module.body[0].kind else {
            panic!("expected Match");
        };
        cases[0].pattern.clone()
    }

    fn match_src(pattern: &str) -> String {
        format!("match x:\n    case {pattern}:\n        pass\n")
    }

    #[test]
    fn test_wildcard() {
        let p = first_case_pattern(&match_src("_"));
        assert_eq!(
            p,
            Pattern::MatchAs {
                pattern: None,
                name: None
            }
        );
    }

    #[test]
    fn test_capture_name() {
        let p = first_case_pattern(&match_src("value"));
        assert_eq!(
            p,
            Pattern::MatchAs {
                pattern: None,
                name: Some("value".to_string())
            }
        );
    }

    #[test]
    fn test_dotted_name_is_value() {
        let p = first_case_pattern(&match_src("Color.RED"));
        let Pattern::MatchValue { value } = p else {
            panic!("expected MatchValue");
        };
        assert!(matches!(value.kind, ExprKind::Attribute { .. }));
    }

    #[test]
    fn test_literal_singletons() {
        assert_eq!(
            first_case_pattern(&match_src("None")),
            Pattern::MatchSingleton {
                value: ConstantValue::None
            }
        );
        assert_eq!(
            first_case_pattern(&match_src("True")),
            Pattern::MatchSingleton {
                value: ConstantValue::Bool(true)
            }
        );
    }

    #[test]
    fn test_number_and_string_literals() {
        assert!(matches!(
            first_case_pattern(&match_src("42")),
            Pattern::MatchValue { .. }
        ));
        assert!(matches!(
            first_case_pattern(&match_src("'quit'")),
            Pattern::MatchValue { .. }
        ));
        assert!(matches!(
            first_case_pattern(&match_src("-1")),
            Pattern::MatchValue { .. }
        ));
    }

    #[test]
    fn test_sequence_patterns() {
        let p = first_case_pattern(&match_src("[a, b]"));
        assert!(matches!(p, Pattern::MatchSequence { patterns } if patterns.len() == 2));
        let p = first_case_pattern(&match_src("(a, b)"));
        assert!(matches!(p, Pattern::MatchSequence { patterns } if patterns.len() == 2));
        let p = first_case_pattern(&match_src("a, *rest"));
        let Pattern::MatchSequence { patterns } = p else {
            panic!("expected MatchSequence");
        };
        assert!(matches!(
            patterns[1],
            Pattern::MatchStar { name: Some(_) }
        ));
    }

    #[test]
    fn test_group_is_not_sequence() {
        let p = first_case_pattern(&match_src("(a)"));
        assert!(matches!(p, Pattern::MatchAs { .. }));
    }

    #[test]
    fn test_mapping_pattern() {
        let p = first_case_pattern(&match_src("{'k': v, **rest}"));
        let Pattern::MatchMapping {
            keys,
            patterns,
            rest,
        } = p
        else {
            panic!("expected MatchMapping");
        };
        assert_eq!(keys.len(), 1);
        assert_eq!(patterns.len(), 1);
        assert_eq!(rest.as_deref(), Some("rest"));
    }

    #[test]
    fn test_class_pattern() {
        let p = first_case_pattern(&match_src("Point(0, y=0)"));
        let Pattern::MatchClass {
            cls,
            patterns,
            kwd_attrs,
            kwd_patterns,
        } = p
        else {
            panic!("expected MatchClass");
        };
        assert!(matches!(&cls.kind, ExprKind::Name { id } if id == "Point"));
        assert_eq!(patterns.len(), 1);
        assert_eq!(kwd_attrs, vec!["y".to_string()]);
        assert_eq!(kwd_patterns.len(), 1);
    }

    #[test]
    fn test_or_pattern() {
        let p = first_case_pattern(&match_src("1 | 2 | 3"));
        assert!(matches!(p, Pattern::MatchOr { patterns } if patterns.len() == 3));
    }

    #[test]
    fn test_as_pattern() {
        let p = first_case_pattern(&match_src("[x] as pair"));
        let Pattern::MatchAs { pattern, name } = p else {
            panic!("expected MatchAs");
        };
        assert!(matches!(
            pattern.as_deref(),
            Some(Pattern::MatchSequence { .. })
        ));
        assert_eq!(name.as_deref(), Some("pair"));
    }

    #[test]
    fn test_guard() {
        let module = parse("match x:\n    case n if n > 0:\n        pass\n").unwrap();
        let StmtKind::Match { cases, .. } = &module.body[0].kind else {
            panic!("expected Match");
        };
        assert!(cases[0].guard.is_some());
    }
}
