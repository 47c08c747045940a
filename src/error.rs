//! Error taxonomy for the tokenizer and parser.
//!
//! All runtime failure modes of the toolkit are concentrated here: the
//! safety analyzer and the transformation passes never fail, so a host
//! embedding the crate can cleanly distinguish "malformed input" (a
//! [`ParseError`]) from an analysis result.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A general syntax error from the tokenizer or parser.
    #[error("SyntaxError: {message} (line {line}, column {col})")]
    Syntax { message: String, line: u32, col: u32 },

    /// The parser saw a token it did not expect.
    #[error("SyntaxError: expected {expected}, found {found} (line {line}, column {col})")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: u32,
        col: u32,
    },

    /// A string literal ran off the end of its line (or, for triple-quoted
    /// strings, off the end of the input).
    #[error("SyntaxError: {message} (line {line}, column {col})")]
    UnterminatedString { message: String, line: u32, col: u32 },

    /// A dedent did not land on any indentation level on the stack.
    #[error("IndentationError: {message} (line {line})")]
    Indentation { message: String, line: u32 },
}

impl ParseError {
    /// The source line the error was reported at (1-based).
    pub fn line(&self) -> u32 {
        match self {
            ParseError::Syntax { line, .. }
            | ParseError::UnexpectedToken { line, .. }
            | ParseError::UnterminatedString { line, .. }
            | ParseError::Indentation { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let e = ParseError::Syntax {
            message: "invalid character".to_string(),
            line: 3,
            col: 7,
        };
        assert_eq!(
            e.to_string(),
            "SyntaxError: invalid character (line 3, column 7)"
        );
    }

    #[test]
    fn test_unexpected_token_display() {
        let e = ParseError::UnexpectedToken {
            expected: "`:`".to_string(),
            found: "`)`".to_string(),
            line: 1,
            col: 4,
        };
        assert!(e.to_string().contains("expected `:`"));
        assert!(e.to_string().contains("found `)`"));
    }

    #[test]
    fn test_line_accessor() {
        let e = ParseError::Indentation {
            message: "unindent does not match any outer indentation level".to_string(),
            line: 12,
        };
        assert_eq!(e.line(), 12);
    }
}
