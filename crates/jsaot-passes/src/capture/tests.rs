use super::*;
use jsaot_parser::parse_source;

fn analyze_source(src: &str) -> Result<CaptureAnalysis, AnalyzeError> {
    let program = parse_source(src).expect("source should parse");
    analyze(&program)
}

fn analyze_ok(src: &str) -> CaptureAnalysis {
    analyze_source(src).expect("analysis should succeed")
}

// ── Captures ────────────────────────────────────────────

#[test]
fn make_adder_captures_parameter() {
    let analysis = analyze_ok("function makeAdder(x) {\n  return function (y) { return x + y; };\n}");
    let outer = analysis.function(FuncId(0)).unwrap();
    assert_eq!(analysis.captured_in(FuncId(0)), vec!["x"]);
    assert_eq!(outer.captured["x"].iter().copied().collect::<Vec<_>>(), vec![FuncId(1)]);
    assert!(analysis.captured_in(FuncId(1)).is_empty());
    assert_eq!(analysis.report(), "makeAdder: x <- [anonymous@2]\n");
}

#[test]
fn local_only_variables_are_not_captured() {
    let analysis = analyze_ok("function f(a) { let b = a * 2; return b; }");
    assert!(analysis.captured_in(FuncId(0)).is_empty());
    assert_eq!(analysis.resolve(Some(FuncId(0)), "b"), Some(Resolution::Local));
    assert_eq!(analysis.report(), "(no captured variables)\n");
}

#[test]
fn shadowing_does_not_mark_outer_declaration() {
    let analysis = analyze_ok("function outer() { let x = 1; const g = () => { let x = 2; return x; }; return x; }");
    assert!(analysis.captured_in(FuncId(0)).is_empty());
    assert_eq!(analysis.resolve(Some(FuncId(1)), "x"), Some(Resolution::Local));
}

#[test]
fn capture_through_intermediate_function() {
    let src = "function a() { let v = 1; function b() { function c() { return v; } return c; } return b; }";
    let analysis = analyze_ok(src);
    assert_eq!(analysis.captured_in(FuncId(0)), vec!["v"]);
    assert_eq!(
        analysis.resolve(Some(FuncId(2)), "v"),
        Some(Resolution::Captured { owner: FuncId(0) })
    );
    // b never touches v and owns no context
    assert!(!analysis.function(FuncId(1)).unwrap().owns_context());
    // c is only used where it is declared
    assert!(analysis.captured_in(FuncId(1)).is_empty());
    assert_eq!(analysis.function(FuncId(0)).unwrap().hoisted, vec![("b".to_string(), FuncId(1))]);
}

#[test]
fn owner_sees_its_own_captured_variable_as_captured() {
    let analysis = analyze_ok("function counter() { let n = 0; return () => { n = n + 1; return n; }; }");
    assert_eq!(
        analysis.resolve(Some(FuncId(0)), "n"),
        Some(Resolution::Captured { owner: FuncId(0) })
    );
    assert_eq!(analysis.slot_of(FuncId(0), "n"), Some(0));
}

#[test]
fn slots_follow_name_order() {
    let analysis = analyze_ok("function f(b, a) { return () => a + b; }");
    assert_eq!(analysis.captured_in(FuncId(0)), vec!["a", "b"]);
    assert_eq!(analysis.slot_of(FuncId(0), "b"), Some(1));
}

#[test]
fn multiple_users_are_reported_together() {
    let src = "function pair(x) {\n  const inc = () => x + 1;\n  const dec = () => x - 1;\n  return inc(dec(0));\n}";
    let analysis = analyze_ok(src);
    assert_eq!(analysis.report(), "pair: x <- [anonymous@2, anonymous@3]\n");
}

#[test]
fn loop_variables_are_function_scoped() {
    let analysis = analyze_ok("function f() { for (let i = 0; i < 3; i++) { var t = i; } return t; }");
    let scope = analysis.function(FuncId(0)).unwrap();
    assert!(scope.declared.contains("i") && scope.declared.contains("t"));
}

// ── Top level ───────────────────────────────────────────

#[test]
fn top_level_names_resolve_as_globals() {
    let analysis = analyze_ok("let g = 1;\nfunction f() { return g; }\nconsole.log(f());");
    assert_eq!(analysis.resolve(Some(FuncId(0)), "g"), Some(Resolution::Global));
    assert_eq!(analysis.resolve(None, "f"), Some(Resolution::GlobalFunction));
    assert_eq!(analysis.resolve(None, "console"), Some(Resolution::Builtin));
    assert_eq!(analysis.global_function("f"), Some(FuncId(0)));
    assert_eq!(analysis.globals().collect::<Vec<_>>(), vec!["g"]);
    assert!(analysis.captured_in(FuncId(0)).is_empty());
}

#[test]
fn recursion_through_global_function() {
    let analysis = analyze_ok("function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }");
    assert_eq!(analysis.resolve(Some(FuncId(0)), "fact"), Some(Resolution::GlobalFunction));
}

// ── Errors ──────────────────────────────────────────────

#[test]
fn unresolved_reference_reports_location() {
    let err = analyze_source("let a = 1;\nconsole.log(b);").unwrap_err();
    match err {
        AnalyzeError::UnresolvedReference { name, line, column } => {
            assert_eq!(name, "b");
            assert_eq!(line, 2);
            assert_eq!(column, 13);
        }
        other => panic!("expected UnresolvedReference, got {other:?}"),
    }
}

#[test]
fn unresolved_reference_inside_nested_function() {
    let err = analyze_source("function f() { return () => missing; }").unwrap_err();
    assert!(matches!(err, AnalyzeError::UnresolvedReference { ref name, .. } if name == "missing"));
}

#[test]
fn duplicate_parameters_are_rejected() {
    let err = analyze_source("function f(a, a) { return a; }").unwrap_err();
    assert!(matches!(err, AnalyzeError::DuplicateParameter { .. }));
}

#[test]
fn assignment_to_function_builtin_or_const_is_rejected() {
    assert!(matches!(
        analyze_source("function f() {}\nf = 1;").unwrap_err(),
        AnalyzeError::InvalidAssignment { what: "function", .. }
    ));
    assert!(matches!(
        analyze_source("undefined = 1;").unwrap_err(),
        AnalyzeError::InvalidAssignment { what: "builtin", .. }
    ));
    assert!(matches!(
        analyze_source("function f() { const k = 1; return () => { k += 1; }; }").unwrap_err(),
        AnalyzeError::InvalidAssignment { what: "constant", .. }
    ));
}

#[test]
fn variable_and_function_with_same_name_conflict() {
    let err = analyze_source("var f = 1;\nfunction f() {}").unwrap_err();
    assert!(matches!(err, AnalyzeError::ConflictingDeclaration { .. }));
}
