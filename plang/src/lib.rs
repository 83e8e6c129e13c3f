//! Front end for PLang v2.0 governance policies.
//!
//! [`compile`] turns policy source into a [`Program`]; [`tokenize`] exposes
//! the token stream on its own. Both are pure and keep no state between calls.

pub mod error;
pub mod ir;
pub mod parser;
pub mod span;

pub use error::{CompileError, LexError, ParseError};
pub use ir::ast::{self, Action, Category, Program};
pub use parser::lexer::{Token, TokenType, tokenize};
pub use parser::parse;
pub use span::{Span, Spanned};

/// Compiles PLang source into a syntax tree.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    parser::parse(source)
}
