mod token;
mod lexer;

pub use token::{Token, TokenType, Span};
pub use lexer::{Lexer, LexError};
