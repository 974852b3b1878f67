use super::*;

impl WasmCodegen {
    /// Intern a string literal and return its (address, length) in linear memory.
    pub(super) fn intern_string(&mut self, s: &str) -> (u32, u32) {
        if let Some(&entry) = self.string_pool.get(s) {
            return entry;
        }
        let offset = abi::DATA_BASE + self.string_data.len() as u32;
        let bytes = s.as_bytes();
        let len = bytes.len() as u32;
        self.string_data.extend_from_slice(bytes);
        self.string_pool.insert(s.to_string(), (offset, len));
        (offset, len)
    }

    pub(super) fn string_entry(&self, s: &str) -> Result<(u32, u32), CodegenError> {
        self.string_pool
            .get(s)
            .copied()
            .ok_or_else(|| internal(format!("string {s:?} missing from the pool")))
    }

    /// Pre-pass: intern the console separators and every string literal.
    pub(super) fn collect_strings(&mut self, program: &Program) {
        self.intern_string(" ");
        self.intern_string("\n");
        self.collect_strings_stmts(&program.body);
    }

    fn collect_strings_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.collect_strings_stmt(stmt);
        }
    }

    fn collect_strings_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDecl(func) => self.collect_strings_func(func),
            Stmt::VarDecl(decl) => {
                for declarator in &decl.declarators {
                    if let Some(init) = &declarator.init {
                        self.collect_strings_expr(init);
                    }
                }
            }
            Stmt::Expr(stmt) => self.collect_strings_expr(&stmt.expr),
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.collect_strings_expr(value);
                }
            }
            Stmt::If(stmt) => {
                self.collect_strings_expr(&stmt.test);
                self.collect_strings_stmt(&stmt.consequent);
                if let Some(alternate) = &stmt.alternate {
                    self.collect_strings_stmt(alternate);
                }
            }
            Stmt::While(stmt) => {
                self.collect_strings_expr(&stmt.test);
                self.collect_strings_stmt(&stmt.body);
            }
            Stmt::For(stmt) => {
                if let Some(init) = &stmt.init {
                    self.collect_strings_stmt(init);
                }
                if let Some(test) = &stmt.test {
                    self.collect_strings_expr(test);
                }
                if let Some(update) = &stmt.update {
                    self.collect_strings_expr(update);
                }
                self.collect_strings_stmt(&stmt.body);
            }
            Stmt::Block(block) => self.collect_strings_stmts(&block.body),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) | Stmt::Marker(_) => {}
        }
    }

    fn collect_strings_func(&mut self, func: &Function) {
        match &func.body {
            FunctionBody::Block(block) => self.collect_strings_stmts(&block.body),
            FunctionBody::Expr(expr) => self.collect_strings_expr(expr),
        }
    }

    fn collect_strings_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Str(s, _) => {
                self.intern_string(s);
            }
            Expr::Unary { operand, .. } => self.collect_strings_expr(operand),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.collect_strings_expr(left);
                self.collect_strings_expr(right);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.collect_strings_expr(test);
                self.collect_strings_expr(consequent);
                self.collect_strings_expr(alternate);
            }
            Expr::Assign { value, .. } => self.collect_strings_expr(value),
            Expr::Call { callee, args, .. } => {
                self.collect_strings_expr(callee);
                for arg in args {
                    self.collect_strings_expr(arg);
                }
            }
            Expr::Member { object, .. } => self.collect_strings_expr(object),
            Expr::Function(func) => self.collect_strings_func(func),
            Expr::Number(..) | Expr::Bool(..) | Expr::Ident(..) | Expr::Update { .. } => {}
        }
    }
}
