/*! Parse contract sources into the veriyul AST.
 *
 * The source language is lenient: the lexer never rejects input, and the
 * declaration and statement scanners drop whatever they do not recognise (logged at debug
 * level) instead of failing. The one hard error is a constructor declared with `method`,
 * which would make it callable after deployment.
 */

use pest_derive::Parser;
use veriyul_core::Contract;

pub mod cursor;
pub mod error;
pub mod expr;
pub mod items;
pub mod lexer;
pub mod stmt;
pub mod types;

pub use error::ParseError;
pub use lexer::{Token, TokenKind};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct VeriLexer;

pub type ParseResult<T> = Result<T, ParseError>;

pub fn parse(source: &str) -> ParseResult<Contract> {
    let tokens = lexer::lex(source)?;
    items::parse_contract(source, &tokens)
}
