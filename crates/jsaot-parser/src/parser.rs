use jsaot_lexer::{Token, TokenType, Span};
use crate::ast::*;

mod exprs;
mod stmts;

/// Recursive-descent parser for the JavaScript subset
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_func_id: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, next_func_id: 0 }
    }

    /// Parse all tokens into a Program AST
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.statement()?);
        }
        Ok(Program {
            body,
            function_count: self.next_func_id,
        })
    }

    // ── Token navigation ─────────────────────────────────────

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_type(&self) -> TokenType {
        self.current().token_type
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn peek_type_at(&self, offset: usize) -> TokenType {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[idx].token_type
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, expected: TokenType) -> bool {
        self.current_type() == expected
    }

    fn eat(&mut self, expected: TokenType) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: TokenType) -> Result<Token, ParseError> {
        let tok = self.advance();
        if tok.token_type != expected {
            return Err(self.error_at(
                tok.span,
                format!("expected {:?}, found {}", expected, describe(&tok)),
            ));
        }
        Ok(tok)
    }

    fn expect_ident(&mut self) -> Result<Token, ParseError> {
        self.expect(TokenType::Ident)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.current_type() == TokenType::Eof
    }

    fn error_at(&self, span: Span, message: String) -> ParseError {
        ParseError::Error {
            line: span.line,
            column: span.column,
            message,
        }
    }

    fn unexpected(&self, context: &str) -> ParseError {
        let tok = self.current();
        self.error_at(tok.span, format!("unexpected {} {}", describe(tok), context))
    }

    /// Statement terminator with automatic semicolon insertion: an explicit
    /// `;`, or a line break, `}` or end of input before the next token.
    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat(TokenType::Semicolon) {
            return Ok(());
        }
        let tok = self.current();
        if tok.newline_before || matches!(tok.token_type, TokenType::RBrace | TokenType::Eof) {
            return Ok(());
        }
        Err(self.unexpected("(expected ';')"))
    }

    fn alloc_func_id(&mut self) -> FuncId {
        let id = FuncId(self.next_func_id);
        self.next_func_id += 1;
        id
    }
}

fn describe(tok: &Token) -> String {
    match tok.token_type {
        TokenType::Eof => "end of input".to_string(),
        TokenType::StringLit => format!("string \"{}\"", tok.value),
        _ => format!("'{}'", tok.value),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Parse error at line {line}, column {column}: {message}")]
    Error {
        line: usize,
        column: usize,
        message: String,
    },
}

#[cfg(test)]
mod tests;
