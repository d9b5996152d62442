//! Frontend for a small kaleidoscope-style expression language: a
//! streaming lexer and a recursive-descent, precedence-climbing parser
//! producing ASTs for `def` function definitions, `extern` declarations,
//! and arithmetic expressions. Later compilation stages (codegen, JIT)
//! live elsewhere; this crate only establishes syntactic well-formedness.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, Function, Item, Prototype};
pub use lexer::{Lexer, Token};
pub use parser::{ParseResult, Parser, ParserError};
