mod ast;
mod parser;

pub use ast::*;
pub use parser::{Parser, ParseError};

/// Lex and parse a source unit in one step.
pub fn parse_source(source: &str) -> Result<Program, SourceError> {
    let tokens = jsaot_lexer::Lexer::new(source).tokenize()?;
    Ok(Parser::new(tokens).parse()?)
}

/// Either front-end failure, for callers that do not care which stage failed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Lex(#[from] jsaot_lexer::LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
