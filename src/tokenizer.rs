//! Indentation-aware Python tokenizer.
//!
//! Produces [`Token`] values that borrow `&'src str` lexemes directly from
//! the source buffer — no heap allocation for identifiers or string content.
//!
//! Handles:
//! - INDENT / DEDENT via an indentation stack (tab stops at 8)
//! - Implicit line continuation inside `(`, `[`, `{`
//! - Explicit line continuation via trailing `\`
//! - All string literal forms: single/triple-quoted, raw, bytes, f-strings
//! - Comments (skipped silently; comment-only lines emit no tokens)
//! - `\r\n` / `\r` normalized to `\n`
//!
//! Keywords are not distinguished here: `def`, `if`, `await` and friends come
//! out as `Name` tokens and the parser dispatches on the lexeme.  The first
//! failure (unterminated string, inconsistent dedent, invalid character)
//! aborts tokenization with a typed [`ParseError`]; there is no recovery.

use crate::error::ParseError;
use crate::location::LineIndex;

// ── Token ────────────────────────────────────────────────────────────────────

/// The closed set of token kinds.
///
/// `NewlineLogical`, `Comment`, and `Error` are part of the vocabulary but
/// never emitted by this tokenizer: logical newlines collapse into
/// [`TokenKind::Newline`], comments are consumed silently, and failure
/// states surface as [`ParseError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    String,
    Op,
    Newline,
    Indent,
    Dedent,
    EndOfInput,
    NewlineLogical,
    Comment,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    /// Start position: 1-based line, 0-based byte column.
    pub line: u32,
    pub col: u32,
    /// End position (exclusive).
    pub end_line: u32,
    pub end_col: u32,
}

impl<'src> Token<'src> {
    pub fn start(&self) -> (u32, u32) {
        (self.line, self.col)
    }

    pub fn end(&self) -> (u32, u32) {
        (self.end_line, self.end_col)
    }
}

// ── Tokenizer ────────────────────────────────────────────────────────────────

pub struct Tokenizer<'src> {
    src: &'src [u8],
    /// The same source as a `&str` — used for safe UTF-8 slicing without `unsafe`.
    src_str: &'src str,
    index: LineIndex,
    /// Current byte position.
    pos: usize,
    /// Indentation stack; always starts with [0].
    indent_stack: Vec<usize>,
    /// How many DEDENT tokens remain to be emitted.
    pending_dedents: usize,
    /// Whether the next logical line should trigger indent/dedent analysis.
    at_line_start: bool,
    /// Nesting depth of `()`, `[]`, `{}`.  When > 0 newlines are ignored.
    bracket_depth: i32,
    /// One-token lookahead buffer.
    peeked: Option<Token<'src>>,
}

/// Three-byte operators, matched before the shorter tables.
const OPS3: &[&str] = &["...", "**=", "//=", ">>=", "<<="];
const OPS2: &[&str] = &[
    "==", "!=", "<=", ">=", "<<", ">>", "**", "//", "->", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "@=", ":=",
];
const OPS1: &[&str] = &[
    ".", ",", ":", ";", "(", ")", "[", "]", "{", "}", "+", "-", "*", "/", "%", "&", "|", "^",
    "~", "<", ">", "=", "@", "!", "?",
];

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

impl<'src> Tokenizer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src: src.as_bytes(),
            src_str: src,
            index: LineIndex::new(src),
            pos: 0,
            indent_stack: vec![0],
            pending_dedents: 0,
            at_line_start: true,
            bracket_depth: 0,
            peeked: None,
        }
    }

    // ── public interface ─────────────────────────────────────────────────────

    /// Return (but do not consume) the next token.
    pub fn peek(&mut self) -> Result<Token<'src>, ParseError> {
        if let Some(t) = self.peeked {
            return Ok(t);
        }
        let t = self.next_inner()?;
        self.peeked = Some(t);
        Ok(t)
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Result<Token<'src>, ParseError> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self.next_inner(),
        }
    }

    /// Drain the whole stream, `EndOfInput` included.
    pub fn tokenize(src: &'src str) -> Result<Vec<Token<'src>>, ParseError> {
        let mut lex = Tokenizer::new(src);
        let mut out = Vec::new();
        loop {
            let t = lex.next_token()?;
            let end = t.kind == TokenKind::EndOfInput;
            out.push(t);
            if end {
                return Ok(out);
            }
        }
    }

    // ── internal tokenisation ────────────────────────────────────────────────

    fn make_token(&self, kind: TokenKind, start: usize, end: usize, lexeme: &'src str) -> Token<'src> {
        let (line, col) = self.index.position(start as u32);
        let (end_line, end_col) = self.index.position(end as u32);
        Token {
            kind,
            lexeme,
            line,
            col,
            end_line,
            end_col,
        }
    }

    fn synthetic(&self, kind: TokenKind) -> Token<'src> {
        self.make_token(kind, self.pos, self.pos, "")
    }

    fn error_here(&self, start: usize, message: &str) -> ParseError {
        let (line, col) = self.index.position(start as u32);
        ParseError::Syntax {
            message: message.to_string(),
            line,
            col,
        }
    }

    fn next_inner(&mut self) -> Result<Token<'src>, ParseError> {
        // Emit queued DEDENT tokens before reading more source.
        if self.pending_dedents > 0 {
            self.pending_dedents -= 1;
            return Ok(self.synthetic(TokenKind::Dedent));
        }

        loop {
            // At the start of a logical line (not inside brackets), handle
            // indentation.
            if self.at_line_start && self.bracket_depth == 0 {
                self.at_line_start = false;
                if let Some(tok) = self.handle_indent()? {
                    return Ok(tok);
                }
            }

            if self.pos >= self.src.len() {
                // Flush remaining DEDENT tokens before the end marker.
                if self.indent_stack.len() > 1 {
                    self.indent_stack.pop();
                    self.pending_dedents = self.indent_stack.len().saturating_sub(1);
                    self.indent_stack.truncate(1);
                    return Ok(self.synthetic(TokenKind::Dedent));
                }
                return Ok(self.synthetic(TokenKind::EndOfInput));
            }

            let start = self.pos;
            let b = self.src[self.pos];

            // ── Whitespace (not newlines) ─────────────────────────────────
            if b == b' ' || b == b'\t' {
                self.pos += 1;
                continue;
            }

            // ── Newlines (normalize \r\n and \r to \n) ────────────────────
            if b == b'\n' || b == b'\r' {
                self.pos += 1;
                if b == b'\r' && self.src.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
                if self.bracket_depth > 0 {
                    // Inside brackets: implicit continuation — no token.
                    continue;
                }
                self.at_line_start = true;
                return Ok(self.make_token(TokenKind::Newline, start, self.pos, "\n"));
            }

            // ── Explicit line continuation ────────────────────────────────
            if b == b'\\' {
                self.pos += 1;
                if self.src.get(self.pos) == Some(&b'\r') {
                    self.pos += 1;
                }
                if self.src.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
                continue;
            }

            // ── Comment: skipped silently ─────────────────────────────────
            if b == b'#' {
                while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            // ── String literals ───────────────────────────────────────────
            if self.is_string_start() {
                return self.lex_string(start);
            }

            // ── Numbers ───────────────────────────────────────────────────
            if b.is_ascii_digit()
                || (b == b'.'
                    && self
                        .src
                        .get(self.pos + 1)
                        .copied()
                        .is_some_and(|c| c.is_ascii_digit()))
            {
                return Ok(self.lex_number(start));
            }

            // ── Identifiers and keywords ──────────────────────────────────
            if is_ident_start(b) {
                return Ok(self.lex_name(start));
            }

            // ── Operators and punctuation ─────────────────────────────────
            return self.lex_operator(start);
        }
    }

    // ── Indentation handling ─────────────────────────────────────────────────

    /// Called at the start of a logical line.  Skips blank and comment-only
    /// lines (which produce no tokens), measures the indentation of the next
    /// line with content, and emits INDENT / DEDENT / nothing.
    fn handle_indent(&mut self) -> Result<Option<Token<'src>>, ParseError> {
        loop {
            let mut col = 0usize;
            while self.pos < self.src.len() {
                match self.src[self.pos] {
                    b' ' => {
                        col += 1;
                        self.pos += 1;
                    }
                    b'\t' => {
                        // A tab advances to the next multiple of 8.
                        col = (col + 8) & !7;
                        self.pos += 1;
                    }
                    _ => break,
                }
            }

            if self.pos >= self.src.len() {
                return Ok(None);
            }
            match self.src[self.pos] {
                b'\n' => {
                    self.pos += 1;
                    continue;
                }
                b'\r' => {
                    self.pos += 1;
                    if self.src.get(self.pos) == Some(&b'\n') {
                        self.pos += 1;
                    }
                    continue;
                }
                b'#' => {
                    while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    if self.pos < self.src.len() {
                        self.pos += 1;
                    }
                    continue;
                }
                _ => {}
            }

            // Real content at column `col`.
            let top = *self.indent_stack.last().unwrap_or(&0);
            if col > top {
                self.indent_stack.push(col);
                return Ok(Some(self.synthetic(TokenKind::Indent)));
            }
            if col < top {
                let mut dedent_count = 0usize;
                while self.indent_stack.len() > 1
                    && self.indent_stack.last().is_some_and(|t| *t > col)
                {
                    self.indent_stack.pop();
                    dedent_count += 1;
                }
                if *self.indent_stack.last().unwrap_or(&0) != col {
                    let (line, _) = self.index.position(self.pos as u32);
                    return Err(ParseError::Indentation {
                        message: "unindent does not match any outer indentation level"
                            .to_string(),
                        line,
                    });
                }
                self.pending_dedents = dedent_count - 1;
                return Ok(Some(self.synthetic(TokenKind::Dedent)));
            }
            return Ok(None);
        }
    }

    // ── Identifier lexing ────────────────────────────────────────────────────

    fn lex_name(&mut self, start: usize) -> Token<'src> {
        while self.pos < self.src.len() && is_ident_continue(self.src[self.pos]) {
            self.pos += 1;
        }
        // Multi-byte identifier characters are consumed whole, so the slice
        // always lands on a UTF-8 boundary.
        let lexeme = &self.src_str[start..self.pos];
        self.make_token(TokenKind::Name, start, self.pos, lexeme)
    }

    // ── Number lexing ────────────────────────────────────────────────────────

    fn lex_number(&mut self, start: usize) -> Token<'src> {
        let two = self.src_str.get(start..start + 2).unwrap_or("");
        if matches!(two, "0x" | "0X" | "0o" | "0O" | "0b" | "0B") {
            self.pos += 2;
            while self.pos < self.src.len()
                && (self.src[self.pos].is_ascii_alphanumeric() || self.src[self.pos] == b'_')
            {
                self.pos += 1;
            }
        } else {
            self.consume_digits();
            // Fraction: take the dot only when it cannot start a method
            // access (`1.method` must lex as number-dot-name).
            if self.src.get(self.pos) == Some(&b'.') {
                let next = self.src.get(self.pos + 1).copied();
                let take = match next {
                    Some(c) if c.is_ascii_digit() => true,
                    Some(b'e') | Some(b'E') => self.exponent_follows(self.pos + 1),
                    Some(c) if is_ident_start(c) => false,
                    _ => true,
                };
                if take {
                    self.pos += 1;
                    self.consume_digits();
                }
            }
            // Exponent.
            if matches!(self.src.get(self.pos), Some(b'e') | Some(b'E'))
                && self.exponent_follows(self.pos)
            {
                self.pos += 1;
                if matches!(self.src.get(self.pos), Some(b'+') | Some(b'-')) {
                    self.pos += 1;
                }
                self.consume_digits();
            }
            // Imaginary suffix.
            if matches!(self.src.get(self.pos), Some(b'j') | Some(b'J')) {
                self.pos += 1;
            }
        }
        let lexeme = &self.src_str[start..self.pos];
        self.make_token(TokenKind::Number, start, self.pos, lexeme)
    }

    fn consume_digits(&mut self) {
        while self.pos < self.src.len()
            && (self.src[self.pos].is_ascii_digit() || self.src[self.pos] == b'_')
        {
            self.pos += 1;
        }
    }

    /// True when the byte at `at` is an `e`/`E` that opens a real exponent.
    fn exponent_follows(&self, at: usize) -> bool {
        if !matches!(self.src.get(at), Some(b'e') | Some(b'E')) {
            return false;
        }
        match self.src.get(at + 1) {
            Some(c) if c.is_ascii_digit() => true,
            Some(b'+') | Some(b'-') => self
                .src
                .get(at + 2)
                .copied()
                .is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    // ── String lexing ────────────────────────────────────────────────────────

    fn is_string_start(&self) -> bool {
        let b = self.src[self.pos];
        match b {
            b'"' | b'\'' => true,
            b'r' | b'R' | b'b' | b'B' | b'u' | b'U' | b'f' | b'F' => {
                let next = self.src.get(self.pos + 1).copied().unwrap_or(0);
                match next {
                    b'"' | b'\'' => true,
                    b'r' | b'R' | b'b' | b'B' | b'f' | b'F' => {
                        let nn = self.src.get(self.pos + 2).copied().unwrap_or(0);
                        nn == b'"' || nn == b'\''
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn lex_string(&mut self, start: usize) -> Result<Token<'src>, ParseError> {
        // Consume up to two prefix letters (r, b, u, f and their pairs).
        let mut prefix_chars = 0;
        while prefix_chars < 2 {
            match self.src.get(self.pos).copied().unwrap_or(0) {
                b'r' | b'R' | b'b' | b'B' | b'u' | b'U' | b'f' | b'F' => {
                    self.pos += 1;
                    prefix_chars += 1;
                }
                _ => break,
            }
        }

        let q = self.src[self.pos];
        let triple =
            self.src.get(self.pos + 1) == Some(&q) && self.src.get(self.pos + 2) == Some(&q);
        self.pos += if triple { 3 } else { 1 };

        if triple {
            loop {
                if self.pos >= self.src.len() {
                    let (line, col) = self.index.position(start as u32);
                    return Err(ParseError::UnterminatedString {
                        message: "EOF while scanning triple-quoted string literal".to_string(),
                        line,
                        col,
                    });
                }
                let b = self.src[self.pos];
                if b == b'\\' {
                    self.pos = (self.pos + 2).min(self.src.len());
                    continue;
                }
                if b == q
                    && self.src.get(self.pos + 1) == Some(&q)
                    && self.src.get(self.pos + 2) == Some(&q)
                {
                    self.pos += 3;
                    break;
                }
                self.pos += 1;
            }
        } else {
            loop {
                if self.pos >= self.src.len() || self.src[self.pos] == b'\n' {
                    let (line, col) = self.index.position(start as u32);
                    return Err(ParseError::UnterminatedString {
                        message: "EOL while scanning string literal".to_string(),
                        line,
                        col,
                    });
                }
                let b = self.src[self.pos];
                if b == b'\\' {
                    self.pos = (self.pos + 2).min(self.src.len());
                    continue;
                }
                self.pos += 1;
                if b == q {
                    break;
                }
            }
        }

        let lexeme = &self.src_str[start..self.pos];
        Ok(self.make_token(TokenKind::String, start, self.pos, lexeme))
    }

    // ── Operator lexing ──────────────────────────────────────────────────────

    fn lex_operator(&mut self, start: usize) -> Result<Token<'src>, ParseError> {
        let rest = &self.src_str[start..];
        let lexeme = OPS3
            .iter()
            .chain(OPS2.iter())
            .chain(OPS1.iter())
            .find(|op| rest.starts_with(**op))
            .copied()
            .ok_or_else(|| self.error_here(start, "invalid character"))?;
        self.pos += lexeme.len();
        match lexeme {
            "(" | "[" | "{" => self.bracket_depth += 1,
            ")" | "]" | "}" => self.bracket_depth = (self.bracket_depth - 1).max(0),
            _ => {}
        }
        Ok(self.make_token(TokenKind::Op, start, self.pos, lexeme))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_lexemes(src: &str) -> Vec<(TokenKind, String)> {
        Tokenizer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.lexeme.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_name() {
        let toks = kinds_and_lexemes("hello");
        assert_eq!(toks[0], (TokenKind::Name, "hello".to_string()));
        assert_eq!(toks.last().unwrap().0, TokenKind::EndOfInput);
    }

    #[test]
    fn test_keywords_are_names() {
        let toks = kinds_and_lexemes("import os");
        assert_eq!(toks[0], (TokenKind::Name, "import".to_string()));
        assert_eq!(toks[1], (TokenKind::Name, "os".to_string()));
    }

    #[test]
    fn test_walrus_longest_match() {
        let toks = kinds_and_lexemes("n := 1");
        assert_eq!(toks[1], (TokenKind::Op, ":=".to_string()));
    }

    #[test]
    fn test_ellipsis_longest_match() {
        let toks = kinds_and_lexemes("...");
        assert_eq!(toks[0], (TokenKind::Op, "...".to_string()));
    }

    #[test]
    fn test_indent_dedent() {
        let toks = kinds_and_lexemes("if True:\n    x = 1\n");
        assert!(toks.iter().any(|t| t.0 == TokenKind::Indent));
        assert!(toks.iter().any(|t| t.0 == TokenKind::Dedent));
    }

    #[test]
    fn test_dedents_flushed_at_eof() {
        let toks = kinds_and_lexemes("if a:\n    if b:\n        x\n");
        let dedents = toks.iter().filter(|t| t.0 == TokenKind::Dedent).count();
        assert_eq!(dedents, 2);
    }

    #[test]
    fn test_comment_only_line_emits_nothing() {
        let toks = kinds_and_lexemes("x = 1\n# just a note\ny = 2\n");
        let names: Vec<_> = toks
            .iter()
            .filter(|t| t.0 == TokenKind::Name)
            .map(|t| t.1.clone())
            .collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_comment_preserves_line_numbers() {
        let toks = Tokenizer::tokenize("# header\n\nx = 1\n").unwrap();
        let x = toks.iter().find(|t| t.lexeme == "x").unwrap();
        assert_eq!(x.line, 3);
    }

    #[test]
    fn test_bracket_suppresses_newline() {
        let toks = kinds_and_lexemes("f(a,\n  b)\n");
        let newlines = toks.iter().filter(|t| t.0 == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_backslash_continuation() {
        let toks = kinds_and_lexemes("x = 1 + \\\n    2\n");
        let newlines = toks.iter().filter(|t| t.0 == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_crlf_normalized() {
        let toks = Tokenizer::tokenize("x = 1\r\ny = 2\r\n").unwrap();
        let y = toks.iter().find(|t| t.lexeme == "y").unwrap();
        assert_eq!(y.line, 2);
    }

    #[test]
    fn test_string_token_keeps_raw_lexeme() {
        let toks = kinds_and_lexemes("'hello\\n'");
        assert_eq!(toks[0], (TokenKind::String, "'hello\\n'".to_string()));
    }

    #[test]
    fn test_fstring_is_one_string_token() {
        let toks = kinds_and_lexemes("f'{name} x'");
        assert_eq!(toks[0].0, TokenKind::String);
        assert!(toks[0].1.starts_with("f'"));
    }

    #[test]
    fn test_triple_quoted_multiline() {
        let toks = kinds_and_lexemes("s = \"\"\"a\nb\"\"\"\n");
        assert!(toks.iter().any(|t| t.0 == TokenKind::String && t.1.contains('\n')));
    }

    #[test]
    fn test_unterminated_string_errors() {
        let err = Tokenizer::tokenize("x = 'oops\n").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedString { .. }));
        assert!(err.to_string().contains("EOL while scanning string literal"));
    }

    #[test]
    fn test_inconsistent_dedent_errors() {
        let err = Tokenizer::tokenize("if a:\n        x\n    y\n").unwrap_err();
        assert!(matches!(err, ParseError::Indentation { .. }));
    }

    #[test]
    fn test_tab_indentation() {
        let toks = kinds_and_lexemes("if a:\n\tx = 1\n");
        assert!(toks.iter().any(|t| t.0 == TokenKind::Indent));
    }

    #[test]
    fn test_number_forms() {
        for src in ["42", "0x_ff", "0b1010", "0o755", "1_000_000", "3.14", ".5", "1e10", "2.5e-3", "3j"] {
            let toks = kinds_and_lexemes(src);
            assert_eq!(toks[0], (TokenKind::Number, src.to_string()), "src = {src}");
        }
    }

    #[test]
    fn test_int_then_method_access() {
        let toks = kinds_and_lexemes("1 .bit_length()");
        assert_eq!(toks[0].0, TokenKind::Number);
        assert_eq!(toks[0].1, "1");
        assert_eq!(toks[1], (TokenKind::Op, ".".to_string()));
        assert_eq!(toks[2].1, "bit_length");
    }

    #[test]
    fn test_trailing_dot_float() {
        let toks = kinds_and_lexemes("1.");
        assert_eq!(toks[0], (TokenKind::Number, "1.".to_string()));
    }

    #[test]
    fn test_aug_ops_longest_match() {
        for op in ["+=", "-=", "*=", "/=", "//=", "%=", "**=", "&=", "|=", "^=", ">>=", "<<=", "@="] {
            let src = format!("x {op} 1");
            let toks = kinds_and_lexemes(&src);
            assert_eq!(toks[1], (TokenKind::Op, op.to_string()), "op = {op}");
        }
    }

    #[test]
    fn test_token_positions() {
        let toks = Tokenizer::tokenize("x = 1\n").unwrap();
        assert_eq!(toks[0].start(), (1, 0));
        assert_eq!(toks[0].end(), (1, 1));
        assert_eq!(toks[2].start(), (1, 4));
    }

    #[test]
    fn test_empty_input() {
        let toks = Tokenizer::tokenize("").unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::EndOfInput);
    }
}
