//! Shallow AST traversal: reports declarations, references and nested
//! functions of one function body without entering the nested functions.

use jsaot_lexer::Span;
use jsaot_parser::{AssignOp, Expr, Function, FunctionBody, Stmt, VarKind};

pub(super) enum Event<'a> {
    Declare { name: &'a str, kind: VarKind, span: Span },
    FunctionDecl(&'a Function),
    FunctionExpr(&'a Function),
    Read { name: &'a str, span: Span },
    Write { name: &'a str, span: Span },
}

pub(super) fn visit_body<'a>(body: &'a FunctionBody, f: &mut dyn FnMut(Event<'a>)) {
    match body {
        FunctionBody::Block(block) => visit_stmts(&block.body, f),
        FunctionBody::Expr(expr) => visit_expr(expr, f),
    }
}

pub(super) fn visit_stmts<'a>(stmts: &'a [Stmt], f: &mut dyn FnMut(Event<'a>)) {
    for stmt in stmts {
        visit_stmt(stmt, f);
    }
}

fn visit_stmt<'a>(stmt: &'a Stmt, f: &mut dyn FnMut(Event<'a>)) {
    match stmt {
        Stmt::FunctionDecl(func) => f(Event::FunctionDecl(func)),
        Stmt::VarDecl(decl) => {
            for declarator in &decl.declarators {
                f(Event::Declare {
                    name: &declarator.name,
                    kind: decl.kind,
                    span: declarator.span,
                });
                if let Some(init) = &declarator.init {
                    visit_expr(init, f);
                }
            }
        }
        Stmt::Expr(stmt) => visit_expr(&stmt.expr, f),
        Stmt::Return(ret) => {
            if let Some(value) = &ret.value {
                visit_expr(value, f);
            }
        }
        Stmt::If(stmt) => {
            visit_expr(&stmt.test, f);
            visit_stmt(&stmt.consequent, f);
            if let Some(alternate) = &stmt.alternate {
                visit_stmt(alternate, f);
            }
        }
        Stmt::While(stmt) => {
            visit_expr(&stmt.test, f);
            visit_stmt(&stmt.body, f);
        }
        Stmt::For(stmt) => {
            if let Some(init) = &stmt.init {
                visit_stmt(init, f);
            }
            if let Some(test) = &stmt.test {
                visit_expr(test, f);
            }
            if let Some(update) = &stmt.update {
                visit_expr(update, f);
            }
            visit_stmt(&stmt.body, f);
        }
        Stmt::Block(block) => visit_stmts(&block.body, f),
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) | Stmt::Marker(_) => {}
    }
}

pub(super) fn visit_expr<'a>(expr: &'a Expr, f: &mut dyn FnMut(Event<'a>)) {
    match expr {
        Expr::Number(..) | Expr::Str(..) | Expr::Bool(..) => {}
        Expr::Ident(name, span) => f(Event::Read { name, span: *span }),
        Expr::Unary { operand, .. } => visit_expr(operand, f),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            visit_expr(left, f);
            visit_expr(right, f);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
            ..
        } => {
            visit_expr(test, f);
            visit_expr(consequent, f);
            visit_expr(alternate, f);
        }
        Expr::Assign {
            op,
            target,
            value,
            span,
        } => {
            if let AssignOp::Compound(_) = op {
                f(Event::Read { name: target, span: *span });
            }
            visit_expr(value, f);
            f(Event::Write { name: target, span: *span });
        }
        Expr::Update { target, span, .. } => f(Event::Write { name: target, span: *span }),
        Expr::Call { callee, args, .. } => {
            visit_expr(callee, f);
            for arg in args {
                visit_expr(arg, f);
            }
        }
        // property names are not references
        Expr::Member { object, .. } => visit_expr(object, f),
        Expr::Function(func) => f(Event::FunctionExpr(func)),
    }
}
