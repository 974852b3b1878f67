//! Integration tests for the jsaot lexer.
//!
//! Whole programs in, token streams out.

use jsaot_lexer::{Lexer, TokenType};

fn token_types(src: &str) -> Vec<TokenType> {
    Lexer::new(src)
        .tokenize()
        .expect("lexer should succeed")
        .iter()
        .map(|t| t.token_type)
        .collect()
}

#[test]
fn make_adder_program() {
    let src = "function makeAdder(x) {\n  return y => x + y;\n}\nconsole.log(makeAdder(5)(10));\n";
    use TokenType::*;
    assert_eq!(
        token_types(src),
        vec![
            Function, Ident, LParen, Ident, RParen, LBrace,
            Return, Ident, Arrow, Ident, Plus, Ident, Semicolon,
            RBrace,
            Ident, Dot, Ident, LParen, Ident, LParen, Number, RParen, LParen, Number, RParen, RParen, Semicolon,
            Eof,
        ]
    );
}

#[test]
fn for_loop_header() {
    use TokenType::*;
    assert_eq!(
        token_types("for (let i = 0; i < 3; i++) {}"),
        vec![
            For, LParen, Let, Ident, Assign, Number, Semicolon, Ident, Lt, Number, Semicolon,
            Ident, PlusPlus, RParen, LBrace, RBrace, Eof,
        ]
    );
}

#[test]
fn conditional_expression() {
    use TokenType::*;
    assert_eq!(
        token_types("a ? b : c"),
        vec![Ident, Question, Ident, Colon, Ident, Eof]
    );
}

#[test]
fn lines_are_one_based_in_spans() {
    let tokens = Lexer::new("\n\nlet a = 1").tokenize().unwrap();
    assert_eq!(tokens[0].span.line, 3);
    assert_eq!(tokens[0].span.line_index(), 2);
}
