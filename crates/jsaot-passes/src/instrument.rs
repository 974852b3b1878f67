//! Debug instrumentation.
//!
//! Rewrites the AST in place so that the generated code reports source lines,
//! function entries and function exits to the host debugger. Line markers
//! carry 0-based lines of the original source, taken from statement spans.

use std::collections::BTreeSet;

use jsaot_parser::{Block, Expr, Function, FunctionBody, Marker, Program, ReturnStmt, Stmt};

/// What the debugger needs to know about an instrumented program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfo {
    /// Function display names, indexed by debug id.
    pub functions: Vec<String>,
    /// 0-based lines that carry a line marker.
    pub lines: BTreeSet<u32>,
}

impl DebugInfo {
    pub fn function_name(&self, debug_id: u32) -> Option<&str> {
        self.functions.get(debug_id as usize).map(String::as_str)
    }

    /// Whether execution can ever stop at `line`.
    pub fn has_line(&self, line: u32) -> bool {
        self.lines.contains(&line)
    }
}

/// Insert line and call markers, assigning debug ids to functions in pre-order.
pub fn instrument(program: &mut Program) -> DebugInfo {
    let mut pass = Instrumenter::default();
    pass.stmts(&mut program.body, None);
    tracing::debug!(
        functions = pass.info.functions.len(),
        lines = pass.info.lines.len(),
        "instrumented program"
    );
    pass.info
}

#[derive(Default)]
struct Instrumenter {
    info: DebugInfo,
}

impl Instrumenter {
    /// `enclosing` is the line of the marker already in front of the
    /// statement that owns this list, if any.
    fn stmts(&mut self, stmts: &mut Vec<Stmt>, enclosing: Option<u32>) {
        let original = std::mem::take(stmts);
        let mut last_line = enclosing;
        for mut stmt in original {
            if let Stmt::Marker(_) = stmt {
                stmts.push(stmt);
                continue;
            }
            let span = stmt.span();
            let line = span.line_index();
            // one marker per line, including the line a nested body opens on
            if last_line != Some(line) {
                stmts.push(Stmt::Marker(Marker::Line { line, span }));
                self.info.lines.insert(line);
                last_line = Some(line);
            }
            self.stmt(&mut stmt, line);
            stmts.push(stmt);
        }
    }

    /// `line` is the line of the marker in front of `stmt`.
    fn stmt(&mut self, stmt: &mut Stmt, line: u32) {
        match stmt {
            Stmt::FunctionDecl(func) => self.function(func),
            Stmt::VarDecl(decl) => {
                for declarator in &mut decl.declarators {
                    if let Some(init) = &mut declarator.init {
                        self.expr(init);
                    }
                }
            }
            Stmt::Expr(stmt) => self.expr(&mut stmt.expr),
            Stmt::Return(ret) => {
                if let Some(value) = &mut ret.value {
                    self.expr(value);
                }
            }
            Stmt::If(stmt) => {
                self.expr(&mut stmt.test);
                self.nested_body(&mut stmt.consequent, line);
                if let Some(alternate) = &mut stmt.alternate {
                    // keep `else if` chains flat
                    if let Stmt::If(_) = **alternate {
                        self.stmt(alternate, line);
                    } else {
                        self.nested_body(alternate, line);
                    }
                }
            }
            Stmt::While(stmt) => {
                self.expr(&mut stmt.test);
                self.nested_body(&mut stmt.body, line);
            }
            Stmt::For(stmt) => {
                if let Some(init) = &mut stmt.init {
                    self.stmt(init, line);
                }
                if let Some(test) = &mut stmt.test {
                    self.expr(test);
                }
                if let Some(update) = &mut stmt.update {
                    self.expr(update);
                }
                self.nested_body(&mut stmt.body, line);
            }
            Stmt::Block(block) => self.stmts(&mut block.body, Some(line)),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) | Stmt::Marker(_) => {}
        }
    }

    /// Wrap a single-statement body in a block so it can hold markers.
    fn nested_body(&mut self, body: &mut Box<Stmt>, line: u32) {
        if !matches!(**body, Stmt::Block(_)) {
            let span = body.span();
            let inner = std::mem::replace(&mut **body, Stmt::Empty(span));
            **body = Stmt::Block(Block {
                body: vec![inner],
                span,
            });
        }
        self.stmt(body, line);
    }

    fn function(&mut self, func: &mut Function) {
        let debug_id = self.info.functions.len() as u32;
        self.info.functions.push(func.display_name());
        func.debug_id = Some(debug_id);

        if let FunctionBody::Expr(expr) = &func.body {
            let span = expr.span();
            let placeholder = FunctionBody::Block(Block { body: Vec::new(), span });
            if let FunctionBody::Expr(expr) = std::mem::replace(&mut func.body, placeholder) {
                func.body = FunctionBody::Block(Block {
                    body: vec![Stmt::Return(ReturnStmt {
                        value: Some(*expr),
                        span,
                    })],
                    span,
                });
            }
        }

        if let FunctionBody::Block(block) = &mut func.body {
            self.stmts(&mut block.body, None);
            block.body.insert(
                0,
                Stmt::Marker(Marker::Call {
                    debug_id,
                    span: func.span,
                }),
            );
        }
    }

    fn expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Number(..) | Expr::Str(..) | Expr::Bool(..) | Expr::Ident(..) => {}
            Expr::Update { .. } => {}
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.expr(test);
                self.expr(consequent);
                self.expr(alternate);
            }
            Expr::Assign { value, .. } => self.expr(value),
            Expr::Call { callee, args, .. } => {
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            Expr::Member { object, .. } => self.expr(object),
            Expr::Function(func) => self.function(func),
        }
    }
}
