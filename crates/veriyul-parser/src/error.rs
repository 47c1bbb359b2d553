use crate::Rule;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error(
        "Line {line}: constructor cannot be declared as a method; use `constructor(...)` \
         instead of `method constructor(...)`, constructors run once at deployment and \
         cannot be called afterwards"
    )]
    ConstructorAsMethod { line: usize },

    #[error("lexer error: {0}")]
    Lex(#[from] Box<pest::error::Error<Rule>>),
}
