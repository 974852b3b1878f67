use super::*;
use jsaot_lexer::Lexer;

fn parse_source(src: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(src).tokenize().expect("lexer should succeed");
    let mut parser = Parser::new(tokens);
    parser.parse()
}

fn parse_ok(src: &str) -> Program {
    parse_source(src).expect("parse should succeed")
}

/// Extract the initializer from `let _x = <expr>`.
fn parse_expr(src: &str) -> Expr {
    let prog = parse_ok(&format!("let _x = {src}"));
    match prog.body.into_iter().next().unwrap() {
        Stmt::VarDecl(mut decl) => decl.declarators.remove(0).init.unwrap(),
        other => panic!("expected VarDecl, got {other:?}"),
    }
}

// ── Expression priority ─────────────────────────────────

#[test]
fn multiplication_binds_tighter_than_addition() {
    match parse_expr("1 + 2 * 3") {
        Expr::Binary { op: BinaryOp::Add, right, .. } => {
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
        }
        other => panic!("expected Add at the root, got {other:?}"),
    }
}

#[test]
fn subtraction_is_left_associative() {
    match parse_expr("10 - 3 - 2") {
        Expr::Binary { op: BinaryOp::Sub, left, right, .. } => {
            assert!(matches!(*left, Expr::Binary { op: BinaryOp::Sub, .. }));
            assert!(matches!(*right, Expr::Number(n, _) if n == 2.0));
        }
        other => panic!("expected Sub, got {other:?}"),
    }
}

#[test]
fn logical_and_binds_tighter_than_or() {
    match parse_expr("a || b && c") {
        Expr::Logical { op: LogicalOp::Or, right, .. } => {
            assert!(matches!(*right, Expr::Logical { op: LogicalOp::And, .. }));
        }
        other => panic!("expected Or, got {other:?}"),
    }
}

#[test]
fn strict_and_loose_equality_share_an_operator() {
    assert!(matches!(parse_expr("a === b"), Expr::Binary { op: BinaryOp::Eq, .. }));
    assert!(matches!(parse_expr("a != b"), Expr::Binary { op: BinaryOp::NotEq, .. }));
}

#[test]
fn conditional_expression() {
    match parse_expr("a ? 1 : 2") {
        Expr::Conditional { test, .. } => assert!(matches!(*test, Expr::Ident(ref n, _) if n == "a")),
        other => panic!("expected Conditional, got {other:?}"),
    }
}

#[test]
fn unary_operators() {
    assert!(matches!(parse_expr("-x"), Expr::Unary { op: UnaryOp::Neg, .. }));
    assert!(matches!(parse_expr("!x"), Expr::Unary { op: UnaryOp::Not, .. }));
    assert!(matches!(parse_expr("+x"), Expr::Unary { op: UnaryOp::Plus, .. }));
}

#[test]
fn prefix_and_postfix_update() {
    assert!(matches!(
        parse_expr("++i"),
        Expr::Update { op: UpdateOp::Increment, prefix: true, .. }
    ));
    assert!(matches!(
        parse_expr("i--"),
        Expr::Update { op: UpdateOp::Decrement, prefix: false, .. }
    ));
}

#[test]
fn assignment_is_right_associative() {
    match parse_expr("a = b = 3") {
        Expr::Assign { target, value, .. } => {
            assert_eq!(target, "a");
            assert!(matches!(*value, Expr::Assign { ref target, .. } if target == "b"));
        }
        other => panic!("expected Assign, got {other:?}"),
    }
}

#[test]
fn compound_assignment_carries_operator() {
    assert!(matches!(
        parse_expr("x += 2"),
        Expr::Assign { op: AssignOp::Compound(BinaryOp::Add), .. }
    ));
}

#[test]
fn assignment_to_call_is_rejected() {
    assert!(parse_source("f() = 1").is_err());
}

// ── Functions ───────────────────────────────────────────

#[test]
fn function_declaration() {
    let prog = parse_ok("function add(a, b) { return a + b; }");
    match &prog.body[0] {
        Stmt::FunctionDecl(f) => {
            assert_eq!(f.name.as_deref(), Some("add"));
            let names: Vec<&str> = f.params.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b"]);
            assert_eq!(f.id, FuncId(0));
        }
        other => panic!("expected FunctionDecl, got {other:?}"),
    }
    assert_eq!(prog.function_count, 1);
}

#[test]
fn arrow_with_single_param_and_expression_body() {
    match parse_expr("y => x + y") {
        Expr::Function(f) => {
            assert!(f.is_arrow);
            assert_eq!(f.params.len(), 1);
            assert!(matches!(f.body, FunctionBody::Expr(_)));
        }
        other => panic!("expected arrow, got {other:?}"),
    }
}

#[test]
fn arrow_with_parenthesized_params_and_block() {
    match parse_expr("(a, b) => { return a * b; }") {
        Expr::Function(f) => {
            assert_eq!(f.params.len(), 2);
            assert!(matches!(f.body, FunctionBody::Block(_)));
        }
        other => panic!("expected arrow, got {other:?}"),
    }
}

#[test]
fn parenthesized_expression_is_not_an_arrow() {
    assert!(matches!(parse_expr("(a + b) * 2"), Expr::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn function_ids_are_preorder() {
    let prog = parse_ok("function outer() { const f = () => 1; function inner() {} }\nconst g = function () {};");
    assert_eq!(prog.function_count, 4);
    let Stmt::FunctionDecl(outer) = &prog.body[0] else { panic!("expected function") };
    assert_eq!(outer.id, FuncId(0));
    let FunctionBody::Block(body) = &outer.body else { panic!("expected block") };
    let Stmt::VarDecl(decl) = &body.body[0] else { panic!("expected const") };
    let Some(Expr::Function(arrow)) = &decl.declarators[0].init else { panic!("expected arrow") };
    assert_eq!(arrow.id, FuncId(1));
    let Stmt::FunctionDecl(inner) = &body.body[1] else { panic!("expected inner") };
    assert_eq!(inner.id, FuncId(2));
}

#[test]
fn curried_call_chain() {
    match parse_expr("makeAdder(5)(10)") {
        Expr::Call { callee, args, .. } => {
            assert_eq!(args.len(), 1);
            assert!(matches!(*callee, Expr::Call { .. }));
        }
        other => panic!("expected Call, got {other:?}"),
    }
}

#[test]
fn member_call() {
    let prog = parse_ok("console.log(1, 'two')");
    let Stmt::Expr(stmt) = &prog.body[0] else { panic!("expected expression statement") };
    match &stmt.expr {
        Expr::Call { callee, args, .. } => {
            assert!(matches!(**callee, Expr::Member { ref property, .. } if property == "log"));
            assert_eq!(args.len(), 2);
        }
        other => panic!("expected Call, got {other:?}"),
    }
}

// ── Statements ──────────────────────────────────────────

#[test]
fn semicolons_are_optional_at_line_breaks() {
    let prog = parse_ok("let a = 1\nlet b = 2\nconsole.log(a + b)");
    assert_eq!(prog.body.len(), 3);
}

#[test]
fn missing_semicolon_on_same_line_is_error() {
    assert!(parse_source("let a = 1 let b = 2").is_err());
}

#[test]
fn return_followed_by_newline_has_no_value() {
    let prog = parse_ok("function f() {\n  return\n  1\n}");
    let Stmt::FunctionDecl(f) = &prog.body[0] else { panic!("expected function") };
    let FunctionBody::Block(body) = &f.body else { panic!("expected block") };
    assert!(matches!(body.body[0], Stmt::Return(ReturnStmt { value: None, .. })));
    assert_eq!(body.body.len(), 2);
}

#[test]
fn multiple_declarators() {
    let prog = parse_ok("let a = 1, b, c = 3;");
    let Stmt::VarDecl(decl) = &prog.body[0] else { panic!("expected VarDecl") };
    assert_eq!(decl.kind, VarKind::Let);
    assert_eq!(decl.declarators.len(), 3);
    assert!(decl.declarators[1].init.is_none());
}

#[test]
fn const_requires_initializer() {
    assert!(parse_source("const a;").is_err());
}

#[test]
fn if_else_chain() {
    let prog = parse_ok("if (a) { b = 1 } else if (c) b = 2; else { b = 3 }");
    let Stmt::If(stmt) = &prog.body[0] else { panic!("expected If") };
    assert!(matches!(stmt.alternate.as_deref(), Some(Stmt::If(_))));
}

#[test]
fn for_loop_parts_are_optional() {
    let prog = parse_ok("for (;;) { break; }");
    let Stmt::For(stmt) = &prog.body[0] else { panic!("expected For") };
    assert!(stmt.init.is_none() && stmt.test.is_none() && stmt.update.is_none());
}

#[test]
fn for_loop_with_declaration() {
    let prog = parse_ok("for (let i = 0; i < 10; i++) sum += i");
    let Stmt::For(stmt) = &prog.body[0] else { panic!("expected For") };
    assert!(matches!(stmt.init.as_deref(), Some(Stmt::VarDecl(_))));
    assert!(matches!(stmt.update, Some(Expr::Update { .. })));
}

#[test]
fn while_loop() {
    let prog = parse_ok("while (i < 3) { i = i + 1; continue; }");
    assert!(matches!(prog.body[0], Stmt::While(_)));
}

#[test]
fn unclosed_block_is_error() {
    let err = parse_source("function f() { return 1;").unwrap_err();
    assert!(err.to_string().contains("end of input"));
}

#[test]
fn error_reports_location() {
    let err = parse_source("let a = ;").unwrap_err();
    match err {
        ParseError::Error { line, column, .. } => {
            assert_eq!(line, 1);
            assert_eq!(column, 9);
        }
    }
}
