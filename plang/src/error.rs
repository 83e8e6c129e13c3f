use thiserror::Error;

use crate::parser::lexer::TokenType;

/// The tokenizer could not advance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },

    #[error("invalid escape sequence '\\{escape}' at line {line}, column {column}")]
    InvalidEscape { escape: char, line: usize, column: usize },

    #[error("unexpected character '{ch}' at line {line}, column {column}")]
    UnexpectedCharacter { ch: char, line: usize, column: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            Self::UnterminatedString { line, .. }
            | Self::InvalidEscape { line, .. }
            | Self::UnexpectedCharacter { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Self::UnterminatedString { column, .. }
            | Self::InvalidEscape { column, .. }
            | Self::UnexpectedCharacter { column, .. } => *column,
        }
    }
}

/// The token stream does not match any production at the current position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at line {line}, column {column}: {message} (found {found} '{text}')")]
pub struct ParseError {
    pub message: String,
    pub found: TokenType,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl CompileError {
    pub fn line(&self) -> usize {
        match self {
            Self::Lex(e) => e.line(),
            Self::Parse(e) => e.line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Self::Lex(e) => e.column(),
            Self::Parse(e) => e.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_message_carries_position_and_token() {
        let err = ParseError {
            message: "expected category".to_string(),
            found: TokenType::Ident,
            text: "FOO".to_string(),
            line: 1,
            column: 12,
        };
        assert_eq!(
            err.to_string(),
            "syntax error at line 1, column 12: expected category (found identifier 'FOO')"
        );
    }

    #[test]
    fn compile_error_exposes_position_of_either_stage() {
        let lex: CompileError =
            LexError::UnexpectedCharacter { ch: '$', line: 3, column: 7 }.into();
        assert_eq!((lex.line(), lex.column()), (3, 7));
        assert_eq!(lex.to_string(), "unexpected character '$' at line 3, column 7");
    }
}
