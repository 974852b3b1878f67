use super::*;

impl Parser {
    // ── Statement ────────────────────────────────────────────
    // Dispatch based on current token

    pub(super) fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current_type() {
            TokenType::Function => self.function_declaration(),
            TokenType::Let | TokenType::Const | TokenType::Var => {
                let decl = self.var_declaration()?;
                self.consume_semicolon()?;
                Ok(Stmt::VarDecl(decl))
            }
            TokenType::LBrace => Ok(Stmt::Block(self.block()?)),
            TokenType::If => self.if_statement(),
            TokenType::While => self.while_statement(),
            TokenType::For => self.for_statement(),
            TokenType::Return => self.return_statement(),
            TokenType::Break => {
                let span = self.advance().span;
                self.consume_semicolon()?;
                Ok(Stmt::Break(span))
            }
            TokenType::Continue => {
                let span = self.advance().span;
                self.consume_semicolon()?;
                Ok(Stmt::Continue(span))
            }
            TokenType::Semicolon => {
                let span = self.advance().span;
                Ok(Stmt::Empty(span))
            }
            _ => {
                let span = self.current_span();
                let expr = self.expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Expr(ExprStmt { expr, span }))
            }
        }
    }

    // ── Block ────────────────────────────────────────────────
    // { statement* }

    pub(super) fn block(&mut self) -> Result<Block, ParseError> {
        let span = self.expect(TokenType::LBrace)?.span;
        let mut body = Vec::new();
        while !self.check(TokenType::RBrace) {
            if self.is_at_end() {
                return Err(self.unexpected("(expected '}')"));
            }
            body.push(self.statement()?);
        }
        self.expect(TokenType::RBrace)?;
        Ok(Block { body, span })
    }

    // ── Functions ────────────────────────────────────────────
    // function name(params) { body }

    fn function_declaration(&mut self) -> Result<Stmt, ParseError> {
        let span = self.expect(TokenType::Function)?.span;
        let id = self.alloc_func_id();
        let name = self.expect_ident()?.value;
        let params = self.params()?;
        let body = self.block()?;
        Ok(Stmt::FunctionDecl(Function {
            id,
            name: Some(name),
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            span,
            debug_id: None,
        }))
    }

    /// `( [ident (, ident)*] )`
    pub(super) fn params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenType::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                let tok = self.expect_ident()?;
                params.push(Param { name: tok.value, span: tok.span });
                if !self.eat(TokenType::Comma) {
                    break;
                }
                // trailing comma
                if self.check(TokenType::RParen) {
                    break;
                }
            }
        }
        self.expect(TokenType::RParen)?;
        Ok(params)
    }

    // ── Variable declarations ────────────────────────────────
    // (let|const|var) name [= expr] (, name [= expr])*

    pub(super) fn var_declaration(&mut self) -> Result<VarDecl, ParseError> {
        let tok = self.advance();
        let kind = match tok.token_type {
            TokenType::Let => VarKind::Let,
            TokenType::Const => VarKind::Const,
            TokenType::Var => VarKind::Var,
            _ => return Err(self.error_at(tok.span, "expected let, const or var".to_string())),
        };

        let mut declarators = Vec::new();
        loop {
            let name_tok = self.expect_ident()?;
            let init = if self.eat(TokenType::Assign) {
                Some(self.assignment()?)
            } else {
                None
            };
            if kind == VarKind::Const && init.is_none() {
                return Err(self.error_at(
                    name_tok.span,
                    format!("missing initializer in const declaration of '{}'", name_tok.value),
                ));
            }
            declarators.push(Declarator {
                name: name_tok.value,
                init,
                span: name_tok.span,
            });
            if !self.eat(TokenType::Comma) {
                break;
            }
        }

        Ok(VarDecl {
            kind,
            declarators,
            span: tok.span,
        })
    }

    // ── If / While / For ─────────────────────────────────────

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let span = self.expect(TokenType::If)?.span;
        self.expect(TokenType::LParen)?;
        let test = self.expression()?;
        self.expect(TokenType::RParen)?;
        let consequent = Box::new(self.statement()?);
        let alternate = if self.eat(TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            test,
            consequent,
            alternate,
            span,
        }))
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let span = self.expect(TokenType::While)?.span;
        self.expect(TokenType::LParen)?;
        let test = self.expression()?;
        self.expect(TokenType::RParen)?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While(WhileStmt { test, body, span }))
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let span = self.expect(TokenType::For)?.span;
        self.expect(TokenType::LParen)?;

        // init (optional)
        let init = match self.current_type() {
            TokenType::Semicolon => None,
            TokenType::Let | TokenType::Const | TokenType::Var => {
                Some(Box::new(Stmt::VarDecl(self.var_declaration()?)))
            }
            _ => {
                let init_span = self.current_span();
                let expr = self.expression()?;
                Some(Box::new(Stmt::Expr(ExprStmt { expr, span: init_span })))
            }
        };
        self.expect(TokenType::Semicolon)?;

        // test (optional)
        let test = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenType::Semicolon)?;

        // update (optional)
        let update = if self.check(TokenType::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenType::RParen)?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For(ForStmt {
            init,
            test,
            update,
            body,
            span,
        }))
    }

    // ── Return ───────────────────────────────────────────────
    // `return` followed by a line break returns undefined

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let span = self.expect(TokenType::Return)?.span;
        let tok = self.current();
        let value = if tok.newline_before
            || matches!(
                tok.token_type,
                TokenType::Semicolon | TokenType::RBrace | TokenType::Eof
            ) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume_semicolon()?;
        Ok(Stmt::Return(ReturnStmt { value, span }))
    }
}
