//! Go source syntax: tokens, a declaration-level AST and its parser.

pub mod ast;
pub mod lexer;
pub mod parser;

use thiserror::Error;

pub use ast::{Decl, Expr, Field, FuncType, TypeExpr};
pub use parser::{parse_decl_list, parse_file, SourceFile};

/// A lexical or grammatical error, tagged with the 1-based line it
/// occurred on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}
