use super::*;

impl Parser {
    pub(super) fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    // ── Assignment ───────────────────────────────────────────
    // Assignment -> Arrow | Conditional [(=|+=|-=|*=|/=|%=) Assignment]

    pub(super) fn assignment(&mut self) -> Result<Expr, ParseError> {
        if self.arrow_ahead() {
            return self.arrow_function();
        }

        let left = self.conditional()?;

        let op = match self.current_type() {
            TokenType::Assign => AssignOp::Assign,
            TokenType::PlusAssign => AssignOp::Compound(BinaryOp::Add),
            TokenType::MinusAssign => AssignOp::Compound(BinaryOp::Sub),
            TokenType::StarAssign => AssignOp::Compound(BinaryOp::Mul),
            TokenType::SlashAssign => AssignOp::Compound(BinaryOp::Div),
            TokenType::PercentAssign => AssignOp::Compound(BinaryOp::Rem),
            _ => return Ok(left),
        };
        let op_span = self.advance().span;

        let target = match left {
            Expr::Ident(name, _) => name,
            other => {
                return Err(self.error_at(
                    other.span(),
                    "invalid assignment target, only identifiers can be assigned".to_string(),
                ));
            }
        };
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target,
            value: Box::new(value),
            span: op_span,
        })
    }

    /// `x =>` or `( ... ) =>` starts an arrow function.
    fn arrow_ahead(&self) -> bool {
        match self.current_type() {
            TokenType::Ident => self.peek_type_at(1) == TokenType::Arrow,
            TokenType::LParen => {
                let mut depth = 0usize;
                let mut offset = 0;
                loop {
                    match self.peek_type_at(offset) {
                        TokenType::LParen => depth += 1,
                        TokenType::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return self.peek_type_at(offset + 1) == TokenType::Arrow;
                            }
                        }
                        TokenType::Eof => return false,
                        _ => {}
                    }
                    offset += 1;
                }
            }
            _ => false,
        }
    }

    fn arrow_function(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        let id = self.alloc_func_id();
        let params = if self.check(TokenType::Ident) {
            let tok = self.advance();
            vec![Param { name: tok.value, span: tok.span }]
        } else {
            self.params()?
        };
        let arrow = self.expect(TokenType::Arrow)?;
        if arrow.newline_before {
            return Err(self.error_at(arrow.span, "line break before '=>'".to_string()));
        }
        let body = if self.check(TokenType::LBrace) {
            FunctionBody::Block(self.block()?)
        } else {
            FunctionBody::Expr(Box::new(self.assignment()?))
        };
        Ok(Expr::Function(Box::new(Function {
            id,
            name: None,
            params,
            body,
            is_arrow: true,
            span,
            debug_id: None,
        })))
    }

    // ── Conditional ──────────────────────────────────────────
    // Conditional -> LogicalOr [? Assignment : Assignment]

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.logical_or()?;
        if !self.check(TokenType::Question) {
            return Ok(test);
        }
        let span = self.advance().span;
        let consequent = self.assignment()?;
        self.expect(TokenType::Colon)?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span,
        })
    }

    // ── Logical ──────────────────────────────────────────────

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logical_and()?;
        while self.check(TokenType::OrOr) {
            let span = self.advance().span;
            let right = self.logical_and()?;
            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::Or,
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while self.check(TokenType::AndAnd) {
            let span = self.advance().span;
            let right = self.equality()?;
            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::And,
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    // ── Binary operators by precedence ───────────────────────

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.relational()?;
        loop {
            let op = match self.current_type() {
                TokenType::EqEq | TokenType::EqEqEq => BinaryOp::Eq,
                TokenType::NotEq | TokenType::NotEqEq => BinaryOp::NotEq,
                _ => break,
            };
            let span = self.advance().span;
            let right = self.relational()?;
            left = binary(left, op, right, span);
        }
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.current_type() {
                TokenType::Lt => BinaryOp::Lt,
                TokenType::Gt => BinaryOp::Gt,
                TokenType::LtEq => BinaryOp::LtEq,
                TokenType::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            let span = self.advance().span;
            let right = self.additive()?;
            left = binary(left, op, right, span);
        }
        Ok(left)
    }

    // Additive -> Multiplicative ((+|-) Multiplicative)*

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.current_type() {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Sub,
                _ => break,
            };
            let span = self.advance().span;
            let right = self.multiplicative()?;
            left = binary(left, op, right, span);
        }
        Ok(left)
    }

    // Multiplicative -> Unary ((*|/|%) Unary)*

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.current_type() {
                TokenType::Star => BinaryOp::Mul,
                TokenType::Slash => BinaryOp::Div,
                TokenType::Percent => BinaryOp::Rem,
                _ => break,
            };
            let span = self.advance().span;
            let right = self.unary()?;
            left = binary(left, op, right, span);
        }
        Ok(left)
    }

    // Unary -> (-|+|!) Unary | (++|--) IDENT | Postfix

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current_type() {
            TokenType::Minus => Some(UnaryOp::Neg),
            TokenType::Plus => Some(UnaryOp::Plus),
            TokenType::Bang => Some(UnaryOp::Not),
            TokenType::PlusPlus | TokenType::MinusMinus => {
                let tok = self.advance();
                let op = if tok.token_type == TokenType::PlusPlus {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                let target = self.expect_ident().map_err(|_| {
                    self.error_at(tok.span, format!("invalid operand for prefix '{}'", tok.value))
                })?;
                return Ok(Expr::Update {
                    op,
                    prefix: true,
                    target: target.value,
                    span: tok.span,
                });
            }
            _ => None,
        };

        if let Some(op) = op {
            let span = self.advance().span;
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }

        self.postfix()
    }

    // Postfix -> Call [++|--]   (no line break before the operator)

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.call()?;
        let tok = self.current();
        if tok.newline_before || !matches!(tok.token_type, TokenType::PlusPlus | TokenType::MinusMinus) {
            return Ok(expr);
        }
        let tok = self.advance();
        let op = if tok.token_type == TokenType::PlusPlus {
            UpdateOp::Increment
        } else {
            UpdateOp::Decrement
        };
        match expr {
            Expr::Ident(target, span) => Ok(Expr::Update {
                op,
                prefix: false,
                target,
                span,
            }),
            other => Err(self.error_at(
                other.span(),
                format!("invalid operand for postfix '{}'", tok.value),
            )),
        }
    }

    // Call -> Primary ( '(' args ')' | '.' IDENT )*

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.current_type() {
                TokenType::LParen => {
                    let span = self.advance().span;
                    let mut args = Vec::new();
                    if !self.check(TokenType::RParen) {
                        loop {
                            args.push(self.assignment()?);
                            if !self.eat(TokenType::Comma) || self.check(TokenType::RParen) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenType::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        span,
                    };
                }
                TokenType::Dot => {
                    let span = self.advance().span;
                    let property = self.expect_ident()?.value;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    // Primary -> NUM | STRING | true | false | IDENT | ( Expression ) | FunctionExpr

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.current_type() {
            TokenType::Number => {
                let tok = self.advance();
                let value = tok.value.parse::<f64>().map_err(|_| {
                    self.error_at(tok.span, format!("invalid number literal '{}'", tok.value))
                })?;
                Ok(Expr::Number(value, tok.span))
            }
            TokenType::StringLit => {
                let tok = self.advance();
                Ok(Expr::Str(tok.value, tok.span))
            }
            TokenType::True => Ok(Expr::Bool(true, self.advance().span)),
            TokenType::False => Ok(Expr::Bool(false, self.advance().span)),
            TokenType::Ident => {
                let tok = self.advance();
                Ok(Expr::Ident(tok.value, tok.span))
            }
            TokenType::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(TokenType::RParen)?;
                Ok(inner)
            }
            TokenType::Function => self.function_expression(),
            _ => Err(self.unexpected("(expected an expression)")),
        }
    }

    // function [name](params) { body }

    fn function_expression(&mut self) -> Result<Expr, ParseError> {
        let span = self.expect(TokenType::Function)?.span;
        let id = self.alloc_func_id();
        let name = if self.check(TokenType::Ident) {
            Some(self.advance().value)
        } else {
            None
        };
        let params = self.params()?;
        let body = self.block()?;
        Ok(Expr::Function(Box::new(Function {
            id,
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            span,
            debug_id: None,
        })))
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr, span: Span) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
        span,
    }
}
