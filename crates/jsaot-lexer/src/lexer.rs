use crate::token::{Token, TokenType, Span};

/// Lexer for the JavaScript subset
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
    newline_pending: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
            newline_pending: false,
        }
    }

    /// Tokenize the entire source and return the token list
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        while self.pos < self.source.len() {
            let ch = self.source[self.pos];
            match ch {
                // Whitespace (skip)
                ' ' | '\t' | '\u{feff}' => {
                    self.advance();
                }

                // Line terminators only matter for semicolon insertion
                '\n' => {
                    self.newline();
                }
                '\r' => {
                    self.pos += 1;
                    if self.current() == Some('\n') {
                        self.pos += 1;
                    }
                    self.line += 1;
                    self.column = 1;
                    self.newline_pending = true;
                }

                '"' | '\'' => self.read_string(ch),

                '0'..='9' => self.read_number(),
                '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),

                'a'..='z' | 'A'..='Z' | '_' | '$' => self.read_identifier_or_keyword(),

                '+' => self.read_plus(),
                '-' => self.read_minus(),
                '*' => self.read_compound('*', TokenType::Star, TokenType::StarAssign),
                '%' => self.read_compound('%', TokenType::Percent, TokenType::PercentAssign),
                '/' => self.read_slash(),
                '!' => self.read_bang(),
                '=' => self.read_eq(),
                '>' => self.read_compound('>', TokenType::Gt, TokenType::GtEq),
                '<' => self.read_compound('<', TokenType::Lt, TokenType::LtEq),
                '&' => self.read_double('&', TokenType::AndAnd),
                '|' => self.read_double('|', TokenType::OrOr),

                '?' => self.single(TokenType::Question, "?"),
                ':' => self.single(TokenType::Colon, ":"),
                '.' => self.single(TokenType::Dot, "."),
                ',' => self.single(TokenType::Comma, ","),
                ';' => self.single(TokenType::Semicolon, ";"),
                '(' => self.single(TokenType::LParen, "("),
                ')' => self.single(TokenType::RParen, ")"),
                '{' => self.single(TokenType::LBrace, "{"),
                '}' => self.single(TokenType::RBrace, "}"),
                '[' => self.single(TokenType::LBracket, "["),
                ']' => self.single(TokenType::RBracket, "]"),

                // Illegal character
                _ => {
                    self.errors.push(LexError::Error {
                        line: self.line,
                        column: self.column,
                        message: format!("illegal character '{}'", ch),
                    });
                    self.advance();
                }
            }
        }

        // Append EOF
        let span = self.span();
        self.push_token(TokenType::Eof, String::new(), span);

        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }

        Ok(std::mem::take(&mut self.tokens))
    }

    // ── Helpers ──────────────────────────────────────────────

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        self.column += 1;
        Some(ch)
    }

    fn newline(&mut self) {
        self.pos += 1;
        self.line += 1;
        self.column = 1;
        self.newline_pending = true;
    }

    fn span(&self) -> Span {
        Span { line: self.line, column: self.column }
    }

    fn push_token(&mut self, token_type: TokenType, value: String, span: Span) {
        let newline_before = std::mem::take(&mut self.newline_pending);
        self.tokens.push(Token { token_type, value, span, newline_before });
    }

    fn single(&mut self, token_type: TokenType, text: &str) {
        let span = self.span();
        self.advance();
        self.push_token(token_type, text.to_string(), span);
    }

    // ── Number ───────────────────────────────────────────────

    fn read_number(&mut self) {
        let span = self.span();
        let mut value = String::new();

        if self.current() == Some('0') && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            self.advance();
            let mut digits = String::new();
            while let Some(ch) = self.current() {
                if ch.is_ascii_hexdigit() {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            match u64::from_str_radix(&digits, 16) {
                Ok(n) => self.push_token(TokenType::Number, format!("{}", n as f64), span),
                Err(_) => self.errors.push(LexError::Error {
                    line: span.line,
                    column: span.column,
                    message: "illegal hexadecimal literal".to_string(),
                }),
            }
            return;
        }

        let mut seen_dot = false;
        let mut seen_exp = false;

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !seen_dot && !seen_exp {
                seen_dot = true;
                value.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E') && !seen_exp {
                seen_exp = true;
                value.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current() {
                    value.push(sign);
                    self.advance();
                }
                if !self.current().is_some_and(|c| c.is_ascii_digit()) {
                    self.errors.push(LexError::Error {
                        line: self.line,
                        column: self.column,
                        message: "missing exponent digits".to_string(),
                    });
                    break;
                }
            } else {
                break;
            }
        }

        if self.current().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$') {
            self.errors.push(LexError::Error {
                line: self.line,
                column: self.column,
                message: "identifier starts immediately after numeric literal".to_string(),
            });
        }

        self.push_token(TokenType::Number, value, span);
    }

    // ── String ───────────────────────────────────────────────

    fn read_string(&mut self, quote: char) {
        let span = self.span();
        // Skip opening quote
        self.advance();
        let mut value = String::new();
        let mut closed = false;

        while let Some(ch) = self.current() {
            if ch == quote {
                self.advance();
                closed = true;
                break;
            }
            if ch == '\n' || ch == '\r' {
                break;
            }
            if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.advance() {
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                continue;
            }
            value.push(ch);
            self.advance();
        }

        if !closed {
            self.errors.push(LexError::Error {
                line: span.line,
                column: span.column,
                message: format!("unterminated string literal, missing {}", quote),
            });
        }

        self.push_token(TokenType::StringLit, value, span);
    }

    // ── Identifier / Keyword ─────────────────────────────────

    fn read_identifier_or_keyword(&mut self) {
        let span = self.span();
        let mut word = String::new();

        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let token_type = match word.as_str() {
            "function" => TokenType::Function,
            "return" => TokenType::Return,
            "let" => TokenType::Let,
            "const" => TokenType::Const,
            "var" => TokenType::Var,
            "if" => TokenType::If,
            "else" => TokenType::Else,
            "while" => TokenType::While,
            "for" => TokenType::For,
            "break" => TokenType::Break,
            "continue" => TokenType::Continue,
            "true" => TokenType::True,
            "false" => TokenType::False,
            _ => TokenType::Ident,
        };

        self.push_token(token_type, word, span);
    }

    // ── Compound operators ───────────────────────────────────

    /// `+`, `++`, `+=`
    fn read_plus(&mut self) {
        let span = self.span();
        self.advance(); // consume '+'
        match self.current() {
            Some('+') => {
                self.advance();
                self.push_token(TokenType::PlusPlus, "++".to_string(), span);
            }
            Some('=') => {
                self.advance();
                self.push_token(TokenType::PlusAssign, "+=".to_string(), span);
            }
            _ => self.push_token(TokenType::Plus, "+".to_string(), span),
        }
    }

    /// `-`, `--`, `-=`
    fn read_minus(&mut self) {
        let span = self.span();
        self.advance(); // consume '-'
        match self.current() {
            Some('-') => {
                self.advance();
                self.push_token(TokenType::MinusMinus, "--".to_string(), span);
            }
            Some('=') => {
                self.advance();
                self.push_token(TokenType::MinusAssign, "-=".to_string(), span);
            }
            _ => self.push_token(TokenType::Minus, "-".to_string(), span),
        }
    }

    /// `op` or `op=`
    fn read_compound(&mut self, op: char, plain: TokenType, with_eq: TokenType) {
        let span = self.span();
        self.advance();
        if self.current() == Some('=') {
            self.advance();
            self.push_token(with_eq, format!("{}=", op), span);
        } else {
            self.push_token(plain, op.to_string(), span);
        }
    }

    /// `&&`, `||` (the single-character bitwise forms are not supported)
    fn read_double(&mut self, op: char, token_type: TokenType) {
        let span = self.span();
        self.advance();
        if self.current() == Some(op) {
            self.advance();
            self.push_token(token_type, format!("{}{}", op, op), span);
        } else {
            self.errors.push(LexError::Error {
                line: span.line,
                column: span.column,
                message: format!("unsupported operator '{}'", op),
            });
        }
    }

    /// `/`, `/=`, `// comment`, `/* comment */`
    fn read_slash(&mut self) {
        let span = self.span();
        self.advance(); // consume '/'
        match self.current() {
            Some('/') => {
                while let Some(ch) = self.current() {
                    if ch == '\n' || ch == '\r' {
                        break;
                    }
                    self.advance();
                }
            }
            Some('*') => {
                self.advance();
                let mut closed = false;
                while let Some(ch) = self.current() {
                    if ch == '*' && self.peek() == Some('/') {
                        self.advance();
                        self.advance();
                        closed = true;
                        break;
                    }
                    if ch == '\n' {
                        self.newline();
                    } else {
                        self.advance();
                    }
                }
                if !closed {
                    self.errors.push(LexError::Error {
                        line: span.line,
                        column: span.column,
                        message: "unterminated block comment".to_string(),
                    });
                }
            }
            Some('=') => {
                self.advance();
                self.push_token(TokenType::SlashAssign, "/=".to_string(), span);
            }
            _ => self.push_token(TokenType::Slash, "/".to_string(), span),
        }
    }

    /// `!`, `!=`, `!==`
    fn read_bang(&mut self) {
        let span = self.span();
        self.advance(); // consume '!'
        if self.current() == Some('=') {
            self.advance();
            if self.current() == Some('=') {
                self.advance();
                self.push_token(TokenType::NotEqEq, "!==".to_string(), span);
            } else {
                self.push_token(TokenType::NotEq, "!=".to_string(), span);
            }
        } else {
            self.push_token(TokenType::Bang, "!".to_string(), span);
        }
    }

    /// `=`, `==`, `===`, `=>`
    fn read_eq(&mut self) {
        let span = self.span();
        self.advance(); // consume '='
        match self.current() {
            Some('=') => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    self.push_token(TokenType::EqEqEq, "===".to_string(), span);
                } else {
                    self.push_token(TokenType::EqEq, "==".to_string(), span);
                }
            }
            Some('>') => {
                self.advance();
                self.push_token(TokenType::Arrow, "=>".to_string(), span);
            }
            _ => self.push_token(TokenType::Assign, "=".to_string(), span),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("Lex error at line {line}, column {column}: {message}")]
    Error {
        line: usize,
        column: usize,
        message: String,
    },
}
