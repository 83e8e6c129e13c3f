pub mod lexer;
pub mod parser;

use crate::error::CompileError;
use crate::ir::ast;

pub use parser::{DEFAULT_MAX_DEPTH, parse_tokens, parse_tokens_with_depth};

/// Source text to AST: tokenize, then parse.
pub fn parse(source: &str) -> Result<ast::Program, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse_tokens(tokens)?;
    Ok(program)
}
