//! F-string interior parsing.
//!
//! The tokenizer hands over a whole f-string as one `String` token; this
//! module walks the body, producing alternating `Constant` literal chunks
//! and `FormattedValue` entries.  Replacement-field expressions are handed
//! to a nested [`parse_expression`](super::parse_expression) over the
//! substring — positions inside a formatted value are local to it.

use super::expr::unescape_str;
use crate::ast::{ConstantValue, Expr, ExprKind};
use crate::error::ParseError;

/// Parse the body of an f-string (prefix and quotes already stripped) into
/// `JoinedStr` parts.  `base` is the position of the f-string token, used
/// for error reporting.
pub(crate) fn parse_fstring_parts(
    body: &str,
    raw: bool,
    base: (u32, u32),
) -> Result<Vec<Expr>, ParseError> {
    let mut values = Vec::new();
    walk_joined(body, raw, base, &mut values)?;
    Ok(values)
}

fn fstring_error(base: (u32, u32), message: &str) -> ParseError {
    ParseError::Syntax {
        message: message.to_string(),
        line: base.0,
        col: base.1,
    }
}

fn walk_joined(
    body: &str,
    raw: bool,
    base: (u32, u32),
    values: &mut Vec<Expr>,
) -> Result<(), ParseError> {
    let bytes = body.as_bytes();
    let mut lit = String::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                lit.push('{');
                i += 2;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                lit.push('}');
                i += 2;
            }
            b'}' => return Err(fstring_error(base, "f-string: single '}' is not allowed")),
            b'{' => {
                flush_literal(&mut lit, raw, values);
                i = parse_replacement(body, i + 1, raw, base, values)?;
            }
            _ => {
                let ch = body[i..].chars().next().expect("index is in bounds");
                lit.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    flush_literal(&mut lit, raw, values);
    Ok(())
}

fn flush_literal(lit: &mut String, raw: bool, values: &mut Vec<Expr>) {
    if lit.is_empty() {
        return;
    }
    let text = unescape_str(lit, raw);
    lit.clear();
    values.push(Expr::new(ExprKind::Constant {
        value: ConstantValue::Str(text),
    }));
}

/// Parse one `{expr[!conv][:spec]}` replacement field starting just after
/// the `{`.  Returns the index just past the closing `}`.
fn parse_replacement(
    body: &str,
    start: usize,
    raw: bool,
    base: (u32, u32),
    values: &mut Vec<Expr>,
) -> Result<usize, ParseError> {
    let bytes = body.as_bytes();
    let expr_end = scan_expr(body, start, base)?;
    let mut expr_src = &body[start..expr_end];
    let mut i = expr_end;

    // Self-documenting form `{x=}`: the raw text (with the `=`) becomes a
    // literal chunk and the repr of the value follows.
    let trimmed = expr_src.trim_end();
    let self_doc = trimmed.ends_with('=')
        && !trimmed.ends_with("==")
        && !trimmed.ends_with("!=")
        && !trimmed.ends_with("<=")
        && !trimmed.ends_with(">=");
    if self_doc {
        values.push(Expr::new(ExprKind::Constant {
            value: ConstantValue::Str(expr_src.to_string()),
        }));
        expr_src = &trimmed[..trimmed.len() - 1];
    }

    let mut conversion = -1i32;
    if bytes.get(i) == Some(&b'!') {
        conversion = match bytes.get(i + 1) {
            Some(b's') => 115,
            Some(b'r') => 114,
            Some(b'a') => 97,
            _ => return Err(fstring_error(base, "f-string: invalid conversion character")),
        };
        i += 2;
    }

    let mut format_spec = None;
    if bytes.get(i) == Some(&b':') {
        i += 1;
        let spec_end = scan_spec(body, i, base)?;
        let mut spec_values = Vec::new();
        walk_joined(&body[i..spec_end], raw, base, &mut spec_values)?;
        format_spec = Some(Box::new(Expr::new(ExprKind::JoinedStr {
            values: spec_values,
        })));
        i = spec_end;
    }

    if bytes.get(i) != Some(&b'}') {
        return Err(fstring_error(base, "f-string: expecting '}'"));
    }
    i += 1;

    if self_doc && conversion == -1 && format_spec.is_none() {
        conversion = 114; // bare `{x=}` defaults to repr
    }

    let value = super::parse_expression(expr_src.trim())?;
    values.push(Expr::new(ExprKind::FormattedValue {
        value: Box::new(value),
        conversion,
        format_spec,
    }));
    Ok(i)
}

/// Find the end of a replacement-field expression: the first `}`, `!conv`,
/// or `:` at depth 0.  Tracks bracket depth and string quotes so `:` inside
/// `x[1:2]`, a nested literal, or a walrus `:=` does not end the field.
fn scan_expr(body: &str, start: usize, base: (u32, u32)) -> Result<usize, ParseError> {
    let bytes = body.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<(u8, bool)> = None;
    let mut i = start;
    while i < bytes.len() {
        let c = bytes[i];
        if let Some((q, triple)) = quote {
            if c == b'\\' {
                i = (i + 2).min(bytes.len());
                continue;
            }
            if c == q {
                if triple {
                    if bytes.get(i + 1) == Some(&q) && bytes.get(i + 2) == Some(&q) {
                        quote = None;
                        i += 3;
                        continue;
                    }
                } else {
                    quote = None;
                }
            }
            i += 1;
            continue;
        }
        match c {
            b'\'' | b'"' => {
                let triple = bytes.get(i + 1) == Some(&c) && bytes.get(i + 2) == Some(&c);
                quote = Some((c, triple));
                i += if triple { 3 } else { 1 };
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                i += 1;
            }
            b')' | b']' => {
                depth -= 1;
                i += 1;
            }
            b'}' => {
                if depth == 0 {
                    return Ok(i);
                }
                depth -= 1;
                i += 1;
            }
            b'!' => {
                if depth == 0 && bytes.get(i + 1) != Some(&b'=') {
                    return Ok(i);
                }
                i += if bytes.get(i + 1) == Some(&b'=') { 2 } else { 1 };
            }
            b':' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                } else if depth == 0 {
                    return Ok(i);
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    Err(fstring_error(base, "f-string: expecting '}'"))
}

/// Find the end of a format spec: the `}` that closes the replacement
/// field, skipping nested `{...}` fields.
fn scan_spec(body: &str, start: usize, base: (u32, u32)) -> Result<usize, ParseError> {
    let bytes = body.as_bytes();
    let mut depth = 0i32;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                if depth == 0 {
                    return Ok(i);
                }
                depth -= 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    Err(fstring_error(base, "f-string: expecting '}'"))
}

// ── Tests ────────────────────────────────────────────────────────────────────
