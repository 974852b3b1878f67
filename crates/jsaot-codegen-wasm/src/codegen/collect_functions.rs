use super::*;

impl WasmCodegen {
    /// Walk the entire program and collect every function node, indexed by id.
    pub(super) fn collect_functions<'p>(
        &self,
        program: &'p Program,
    ) -> Result<Vec<&'p Function>, CodegenError> {
        let mut found = Vec::new();
        self.collect_functions_stmts(&program.body, &mut found);
        found.sort_by_key(|f: &&Function| f.id);

        for (i, func) in found.iter().enumerate() {
            if func.id.0 as usize != i {
                return Err(internal(format!(
                    "function ids are not dense: expected f{i}, found {}",
                    func.id
                )));
            }
        }
        if found.len() != program.function_count as usize {
            return Err(internal(format!(
                "found {} functions, parser reported {}",
                found.len(),
                program.function_count
            )));
        }
        Ok(found)
    }

    fn collect_functions_stmts<'p>(&self, stmts: &'p [Stmt], found: &mut Vec<&'p Function>) {
        for stmt in stmts {
            self.collect_functions_stmt(stmt, found);
        }
    }

    fn collect_functions_stmt<'p>(&self, stmt: &'p Stmt, found: &mut Vec<&'p Function>) {
        match stmt {
            Stmt::FunctionDecl(func) => self.collect_functions_func(func, found),
            Stmt::VarDecl(decl) => {
                for declarator in &decl.declarators {
                    if let Some(init) = &declarator.init {
                        self.collect_functions_expr(init, found);
                    }
                }
            }
            Stmt::Expr(stmt) => self.collect_functions_expr(&stmt.expr, found),
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.collect_functions_expr(value, found);
                }
            }
            Stmt::If(stmt) => {
                self.collect_functions_expr(&stmt.test, found);
                self.collect_functions_stmt(&stmt.consequent, found);
                if let Some(alternate) = &stmt.alternate {
                    self.collect_functions_stmt(alternate, found);
                }
            }
            Stmt::While(stmt) => {
                self.collect_functions_expr(&stmt.test, found);
                self.collect_functions_stmt(&stmt.body, found);
            }
            Stmt::For(stmt) => {
                if let Some(init) = &stmt.init {
                    self.collect_functions_stmt(init, found);
                }
                if let Some(test) = &stmt.test {
                    self.collect_functions_expr(test, found);
                }
                if let Some(update) = &stmt.update {
                    self.collect_functions_expr(update, found);
                }
                self.collect_functions_stmt(&stmt.body, found);
            }
            Stmt::Block(block) => self.collect_functions_stmts(&block.body, found),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) | Stmt::Marker(_) => {}
        }
    }

    fn collect_functions_func<'p>(&self, func: &'p Function, found: &mut Vec<&'p Function>) {
        found.push(func);
        match &func.body {
            FunctionBody::Block(block) => self.collect_functions_stmts(&block.body, found),
            FunctionBody::Expr(expr) => self.collect_functions_expr(expr, found),
        }
    }

    fn collect_functions_expr<'p>(&self, expr: &'p Expr, found: &mut Vec<&'p Function>) {
        match expr {
            Expr::Unary { operand, .. } => self.collect_functions_expr(operand, found),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.collect_functions_expr(left, found);
                self.collect_functions_expr(right, found);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.collect_functions_expr(test, found);
                self.collect_functions_expr(consequent, found);
                self.collect_functions_expr(alternate, found);
            }
            Expr::Assign { value, .. } => self.collect_functions_expr(value, found),
            Expr::Call { callee, args, .. } => {
                self.collect_functions_expr(callee, found);
                for arg in args {
                    self.collect_functions_expr(arg, found);
                }
            }
            Expr::Member { object, .. } => self.collect_functions_expr(object, found),
            Expr::Function(func) => self.collect_functions_func(func, found),
            Expr::Number(..) | Expr::Str(..) | Expr::Bool(..) | Expr::Ident(..) | Expr::Update { .. } => {}
        }
    }
}
