/// Source location span (1-based line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    /// 0-based line index, as used by line markers and breakpoints.
    pub fn line_index(&self) -> u32 {
        self.line.saturating_sub(1) as u32
    }
}

/// All token types of the accepted JavaScript subset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Literals
    Number,       // 42, 3.14, 1e3, 0xff
    StringLit,    // "hello", 'hello'
    Ident,        // identifiers

    // Arithmetic operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Percent,      // %
    PlusPlus,     // ++
    MinusMinus,   // --

    // Assignment
    Assign,       // =
    PlusAssign,   // +=
    MinusAssign,  // -=
    StarAssign,   // *=
    SlashAssign,  // /=
    PercentAssign, // %=

    // Comparison
    Gt,           // >
    Lt,           // <
    GtEq,         // >=
    LtEq,         // <=
    EqEq,         // ==
    NotEq,        // !=
    EqEqEq,       // ===
    NotEqEq,      // !==

    // Logical
    Bang,         // !
    AndAnd,       // &&
    OrOr,         // ||

    // Punctuation
    Arrow,        // =>
    Question,     // ?
    Colon,        // :
    Dot,          // .
    Comma,        // ,
    Semicolon,    // ;
    LParen,       // (
    RParen,       // )
    LBrace,       // {
    RBrace,       // }
    LBracket,     // [
    RBracket,     // ]

    // Keywords
    Function,
    Return,
    Let,
    Const,
    Var,
    If,
    Else,
    While,
    For,
    Break,
    Continue,
    True,
    False,

    Eof,
}

/// A single token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    /// Drives automatic semicolon insertion in the parser.
    pub newline_before: bool,
}
