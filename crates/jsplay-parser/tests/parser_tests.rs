//! Parser tests: statements, expression precedence, functions and arrows,
//! literals, automatic semicolon insertion, early errors, nesting limits
//! and error recovery.

use jsplay_parser::{parse_source, ParseResult, MAX_NESTING_DEPTH};
use jsplay_types::ast::*;
use jsplay_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Parse source and return the result (program + errors).
fn parse(source: &str) -> ParseResult {
    let sf = SourceFile::new("playground.js", source);
    parse_source(&sf)
}

/// Parse source and return the program, panicking if there are errors.
fn parse_ok(source: &str) -> Program {
    let result = parse(source);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  ERROR: {} ({})", e.message, e.code);
        }
        panic!("unexpected parse errors (see above)");
    }
    result.program
}

/// The first error's code and message.
fn first_error(source: &str) -> (ErrorCode, String) {
    let result = parse(source);
    let err = result.errors.first().expect("expected a parse error");
    (err.code, err.message.clone())
}

/// Parse a single expression statement and return its expression.
fn expr(source: &str) -> Expr {
    let program = parse_ok(source);
    assert_eq!(program.body.len(), 1, "expected a single statement");
    match program.body.into_iter().next() {
        Some(Stmt::Expr(stmt)) => stmt.expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn binary_op(e: &Expr) -> BinOp {
    match &e.kind {
        ExprKind::Binary { op, .. } => *op,
        other => panic!("expected binary expression, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Programs & statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_program() {
    let program = parse_ok("");
    assert!(program.body.is_empty());
}

#[test]
fn test_initial_source() {
    let program = parse_ok("// Write your JavaScript code here\nconsole.log(\"Hello, World!\");");
    assert_eq!(program.body.len(), 1);
    let Stmt::Expr(stmt) = &program.body[0] else {
        panic!("expected expression statement");
    };
    let ExprKind::Call { callee, args, optional } = &stmt.expr.kind else {
        panic!("expected call");
    };
    assert!(!optional);
    assert_eq!(args.len(), 1);
    assert!(matches!(
        &callee.kind,
        ExprKind::Member { property: MemberProperty::Named(name), .. } if name.name == "log"
    ));
}

#[test]
fn test_variable_declarations() {
    let program = parse_ok("var a = 1, b; let c = 2; const d = 3;");
    assert_eq!(program.body.len(), 3);
    let Stmt::Var(decl) = &program.body[0] else {
        panic!("expected var declaration");
    };
    assert_eq!(decl.kind, VarKind::Var);
    assert_eq!(decl.declarators.len(), 2);
    assert_eq!(decl.declarators[0].name.name, "a");
    assert!(decl.declarators[1].init.is_none());
    assert!(matches!(&program.body[2], Stmt::Var(d) if d.kind == VarKind::Const));
}

#[test]
fn test_function_declaration() {
    let program = parse_ok("function add(a, b = 2, ...rest) { return a + b; }");
    let Stmt::Function(f) = &program.body[0] else {
        panic!("expected function declaration");
    };
    assert_eq!(f.name.as_ref().map(|n| n.name.as_str()), Some("add"));
    assert_eq!(f.params.len(), 3);
    assert!(f.params[1].default.is_some());
    assert!(f.params[2].rest);
    assert_eq!(f.arity(), 1);
    assert!(!f.is_arrow);
}

#[test]
fn test_control_flow_statements() {
    let program = parse_ok(
        r#"
if (x) { y(); } else if (z) w(); else {}
for (let i = 0; i < 3; i++) { if (i) continue; break; }
for (const v of [1, 2]) v;
for (k in obj) k;
while (false) {}
do { x--; } while (x > 0)
switch (x) { case 1: y(); break; default: z(); }
try { a(); } catch (e) { b(e); } finally { c(); }
try { a(); } catch { b(); }
"#,
    );
    assert_eq!(program.body.len(), 9);
    assert!(matches!(program.body[0], Stmt::If(_)));
    assert!(matches!(program.body[1], Stmt::For(_)));
    assert!(matches!(
        &program.body[2],
        Stmt::ForEach(f) if f.kind == ForEachKind::Of && f.declaration == Some(VarKind::Const)
    ));
    assert!(matches!(
        &program.body[3],
        Stmt::ForEach(f) if f.kind == ForEachKind::In && f.declaration.is_none()
    ));
    assert!(matches!(program.body[4], Stmt::While(_)));
    assert!(matches!(program.body[5], Stmt::DoWhile(_)));
    let Stmt::Switch(switch) = &program.body[6] else {
        panic!("expected switch");
    };
    assert_eq!(switch.cases.len(), 2);
    assert!(switch.cases[1].test.is_none());
    let Stmt::Try(t) = &program.body[7] else {
        panic!("expected try");
    };
    assert!(t.handler.as_ref().is_some_and(|h| h.param.is_some()));
    assert!(t.finalizer.is_some());
    assert!(matches!(&program.body[8], Stmt::Try(t) if t.handler.as_ref().is_some_and(|h| h.param.is_none())));
}

#[test]
fn test_for_in_head_does_not_swallow_in() {
    let program = parse_ok("for (var key in { a: 1 }) {}");
    let Stmt::ForEach(each) = &program.body[0] else {
        panic!("expected for-in");
    };
    assert_eq!(each.binding.name, "key");
    assert_eq!(each.declaration, Some(VarKind::Var));
    assert!(matches!(each.iterable.kind, ExprKind::ObjectLit(_)));
}

#[test]
fn test_top_level_return_is_allowed() {
    let program = parse_ok("console.log(1); return; console.log(2);");
    assert!(matches!(&program.body[1], Stmt::Return(r) if r.value.is_none()));
}

// ─────────────────────────────────────────────────────────────────────
// Expressions & precedence
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_multiplication_binds_tighter() {
    let e = expr("1 + 2 * 3");
    assert_eq!(binary_op(&e), BinOp::Add);
    let ExprKind::Binary { right, .. } = &e.kind else {
        unreachable!()
    };
    assert_eq!(binary_op(right), BinOp::Mul);
}

#[test]
fn test_left_associative_subtraction() {
    let e = expr("a - b - c");
    let ExprKind::Binary { left, .. } = &e.kind else {
        unreachable!()
    };
    assert_eq!(binary_op(left), BinOp::Sub);
}

#[test]
fn test_exponent_is_right_associative() {
    let e = expr("2 ** 3 ** 2");
    let ExprKind::Binary { left, right, op } = &e.kind else {
        unreachable!()
    };
    assert_eq!(*op, BinOp::Exp);
    assert!(matches!(left.kind, ExprKind::NumberLit(n) if n == 2.0));
    assert_eq!(binary_op(right), BinOp::Exp);
}

#[test]
fn test_logical_and_nullish() {
    let e = expr("a || b && c");
    assert!(matches!(e.kind, ExprKind::Logical { op: LogicalOp::Or, .. }));
    let e = expr("a ?? b");
    assert!(matches!(e.kind, ExprKind::Logical { op: LogicalOp::Nullish, .. }));
}

#[test]
fn test_comparison_below_arithmetic_above_equality() {
    let e = expr("a + 1 < b === true");
    assert_eq!(binary_op(&e), BinOp::StrictEq);
    let ExprKind::Binary { left, .. } = &e.kind else {
        unreachable!()
    };
    assert_eq!(binary_op(left), BinOp::Less);
}

#[test]
fn test_conditional_and_assignment_are_right_associative() {
    let e = expr("a = b = c ? d : e ? f : g");
    let ExprKind::Assign { op, value, .. } = &e.kind else {
        panic!("expected assignment");
    };
    assert_eq!(*op, AssignOp::Assign);
    let ExprKind::Assign { value, .. } = &value.kind else {
        panic!("expected nested assignment");
    };
    let ExprKind::Conditional { alternate, .. } = &value.kind else {
        panic!("expected conditional");
    };
    assert!(matches!(alternate.kind, ExprKind::Conditional { .. }));
}

#[test]
fn test_compound_and_logical_assignment() {
    assert!(matches!(
        expr("x += 1").kind,
        ExprKind::Assign { op: AssignOp::Compound(BinOp::Add), .. }
    ));
    assert!(matches!(
        expr("x ??= 1").kind,
        ExprKind::Assign { op: AssignOp::Logical(LogicalOp::Nullish), .. }
    ));
}

#[test]
fn test_unary_and_update() {
    assert!(matches!(
        expr("typeof x").kind,
        ExprKind::Unary { op: UnaryOp::TypeOf, .. }
    ));
    assert!(matches!(
        expr("-x ** 2").kind,
        ExprKind::Binary { op: BinOp::Exp, .. }
    ));
    assert!(matches!(
        expr("++x").kind,
        ExprKind::Update { prefix: true, op: UpdateOp::Increment, .. }
    ));
    assert!(matches!(
        expr("x--").kind,
        ExprKind::Update { prefix: false, op: UpdateOp::Decrement, .. }
    ));
}

#[test]
fn test_sequence_expression() {
    assert!(matches!(expr("a, b, c").kind, ExprKind::Sequence(ref v) if v.len() == 3));
}

// ─────────────────────────────────────────────────────────────────────
// Calls, members, optional chaining, new
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_member_chain() {
    let e = expr("a.b[c].d(1)(2)");
    let ExprKind::Call { callee, .. } = &e.kind else {
        panic!("expected call");
    };
    assert!(matches!(callee.kind, ExprKind::Call { .. }));
}

#[test]
fn test_keyword_property_names() {
    let e = expr("obj.default.new");
    assert!(matches!(
        &e.kind,
        ExprKind::Member { property: MemberProperty::Named(n), .. } if n.name == "new"
    ));
}

#[test]
fn test_optional_chain_is_wrapped() {
    let e = expr("a?.b.c");
    let ExprKind::OptionalChain(inner) = &e.kind else {
        panic!("expected optional chain");
    };
    let ExprKind::Member { object, optional, .. } = &inner.kind else {
        panic!("expected member");
    };
    assert!(!optional);
    assert!(matches!(object.kind, ExprKind::Member { optional: true, .. }));

    assert!(matches!(
        expr("f?.(1)").kind,
        ExprKind::OptionalChain(ref inner) if matches!(inner.kind, ExprKind::Call { optional: true, .. })
    ));
}

#[test]
fn test_new_expression() {
    let e = expr("new Error(\"boom\")");
    let ExprKind::New { callee, args } = &e.kind else {
        panic!("expected new");
    };
    assert!(matches!(&callee.kind, ExprKind::Identifier(n) if n == "Error"));
    assert_eq!(args.len(), 1);

    // `new a.B().c` applies the member access to the constructed object.
    let e = expr("new a.B().c");
    let ExprKind::Member { object, .. } = &e.kind else {
        panic!("expected member");
    };
    assert!(matches!(object.kind, ExprKind::New { .. }));
}

#[test]
fn test_spread_arguments() {
    let ExprKind::Call { args, .. } = expr("f(a, ...b)").kind else {
        panic!("expected call");
    };
    assert!(matches!(args[1], Element::Spread(_)));
}

// ─────────────────────────────────────────────────────────────────────
// Literals & functions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_array_literal_with_holes_and_trailing_comma() {
    let ExprKind::ArrayLit(items) = expr("[1, , 3,]").kind else {
        panic!("expected array");
    };
    assert_eq!(items.len(), 3);
    assert!(matches!(
        &items[1],
        Element::Expr(e) if matches!(e.kind, ExprKind::Unary { op: UnaryOp::Void, .. })
    ));
}

#[test]
fn test_object_literal_forms() {
    let ExprKind::ObjectLit(props) =
        expr("({ a: 1, b, [k]: 2, m() { return 1 }, ...rest, \"q\": 3, 4: 5, default: 6 })").kind
    else {
        panic!("expected object");
    };
    assert_eq!(props.len(), 8);
    assert!(matches!(
        &props[1],
        PropertyDef::Init { key: PropertyKey::Named(k), value }
            if k == "b" && matches!(&value.kind, ExprKind::Identifier(n) if n == "b")
    ));
    assert!(matches!(&props[2], PropertyDef::Init { key: PropertyKey::Computed(_), .. }));
    assert!(matches!(
        &props[3],
        PropertyDef::Init { value, .. } if matches!(value.kind, ExprKind::Function(_))
    ));
    assert!(matches!(&props[4], PropertyDef::Spread(_)));
    assert!(matches!(&props[6], PropertyDef::Init { key: PropertyKey::Named(k), .. } if k == "4"));
    assert!(matches!(&props[7], PropertyDef::Init { key: PropertyKey::Named(k), .. } if k == "default"));
}

#[test]
fn test_block_at_statement_start_is_not_object() {
    let program = parse_ok("{ let a = 1; }");
    assert!(matches!(&program.body[0], Stmt::Block(b) if b.stmts.len() == 1));
}

#[test]
fn test_template_literal() {
    let ExprKind::Template(parts) = expr("`sum: ${a + b}!`").kind else {
        panic!("expected template");
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(&parts[0], TemplatePart::Literal(s) if s == "sum: "));
    assert!(matches!(&parts[1], TemplatePart::Expr(e) if matches!(e.kind, ExprKind::Binary { .. })));

    assert!(matches!(expr("`plain`").kind, ExprKind::StringLit(ref s) if s == "plain"));
}

#[test]
fn test_arrow_functions() {
    let ExprKind::Function(f) = expr("x => x * 2").kind else {
        panic!("expected arrow");
    };
    assert!(f.is_arrow);
    assert_eq!(f.params.len(), 1);
    assert!(matches!(f.body, FunctionBody::Expr(_)));

    let ExprKind::Function(f) = expr("(a, b = 1) => { return a + b; }").kind else {
        panic!("expected arrow");
    };
    assert_eq!(f.params.len(), 2);
    assert!(matches!(f.body, FunctionBody::Block(_)));

    let ExprKind::Function(f) = expr("() => ({})").kind else {
        panic!("expected arrow");
    };
    assert!(f.params.is_empty());
}

#[test]
fn test_arrow_as_argument() {
    let ExprKind::Call { args, .. } = expr("[1, 2].map((n, i) => n + i)").kind else {
        panic!("expected call");
    };
    assert!(matches!(
        &args[0],
        Element::Expr(e) if matches!(&e.kind, ExprKind::Function(f) if f.is_arrow)
    ));
}

#[test]
fn test_parenthesised_expression_is_not_arrow() {
    assert_eq!(binary_op(&expr("(a + b) * c")), BinOp::Mul);
}

#[test]
fn test_function_expression() {
    let e = expr("(function fact(n) { return n; })");
    assert!(matches!(
        &e.kind,
        ExprKind::Function(f) if f.name.as_ref().is_some_and(|n| n.name == "fact")
    ));
}

// ─────────────────────────────────────────────────────────────────────
// Automatic semicolon insertion
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_asi_at_line_breaks() {
    let program = parse_ok("let a = 1\nlet b = 2\nconsole.log(a + b)");
    assert_eq!(program.body.len(), 3);
}

#[test]
fn test_asi_before_closing_brace_and_eof() {
    let program = parse_ok("function f() { return 1 } f()");
    assert_eq!(program.body.len(), 2);
}

#[test]
fn test_return_line_break_restriction() {
    let program = parse_ok("function f() {\n  return\n  42\n}");
    let Stmt::Function(f) = &program.body[0] else {
        panic!("expected function");
    };
    let FunctionBody::Block(body) = &f.body else {
        panic!("expected block body");
    };
    assert_eq!(body.stmts.len(), 2);
    assert!(matches!(&body.stmts[0], Stmt::Return(r) if r.value.is_none()));
}

#[test]
fn test_postfix_update_line_break_restriction() {
    let program = parse_ok("let a = 1, b = 1\na\n++b");
    assert_eq!(program.body.len(), 3);
    assert!(matches!(
        &program.body[2],
        Stmt::Expr(s) if matches!(s.expr.kind, ExprKind::Update { prefix: true, .. })
    ));
}

#[test]
fn test_missing_semicolon_on_same_line_is_error() {
    let (code, message) = first_error("let a = 1 let b = 2");
    assert_eq!(code, ErrorCode::UNEXPECTED_TOKEN);
    assert_eq!(message, "Unexpected token 'let'");
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_unexpected_end_of_input() {
    let (code, message) = first_error("console.log(");
    assert_eq!(code, ErrorCode::UNEXPECTED_END);
    assert_eq!(message, "Unexpected end of input");
}

#[test]
fn test_unexpected_token_messages() {
    assert_eq!(first_error("console.log(;").1, "Unexpected token ';'");
    assert_eq!(first_error("let x = 1 2").1, "Unexpected number");
    assert_eq!(first_error("foo bar").1, "Unexpected identifier 'bar'");
    assert_eq!(first_error("x 'str'").1, "Unexpected string");
}

#[test]
fn test_invalid_assignment_targets() {
    assert_eq!(
        first_error("1 = 2"),
        (
            ErrorCode::INVALID_ASSIGNMENT_TARGET,
            "Invalid left-hand side in assignment".to_string()
        )
    );
    assert_eq!(first_error("a?.b = 1").0, ErrorCode::INVALID_ASSIGNMENT_TARGET);
    assert_eq!(
        first_error("f()++").1,
        "Invalid left-hand side expression in postfix operation"
    );
    assert_eq!(
        first_error("++1").1,
        "Invalid left-hand side expression in prefix operation"
    );
}

#[test]
fn test_illegal_break_and_continue() {
    assert_eq!(
        first_error("break;"),
        (ErrorCode::ILLEGAL_BREAK, "Illegal break statement".to_string())
    );
    assert_eq!(first_error("continue;").0, ErrorCode::ILLEGAL_CONTINUE);
    // A function body resets loop context.
    assert_eq!(
        first_error("while (true) { (function () { break; })(); }").0,
        ErrorCode::ILLEGAL_BREAK
    );
    // `break` is legal in switch, `continue` is not.
    parse_ok("switch (1) { case 1: break; }");
    assert_eq!(
        first_error("switch (1) { case 1: continue; }").0,
        ErrorCode::ILLEGAL_CONTINUE
    );
}

#[test]
fn test_const_requires_initializer() {
    assert_eq!(
        first_error("const x;"),
        (
            ErrorCode::MISSING_INITIALIZER,
            "Missing initializer in const declaration".to_string()
        )
    );
    parse_ok("for (const x of [1]) {}");
}

#[test]
fn test_duplicate_default_clause() {
    assert_eq!(
        first_error("switch (x) { default: 1; default: 2; }").0,
        ErrorCode::DUPLICATE_DEFAULT
    );
}

#[test]
fn test_rest_parameter_must_be_last() {
    assert_eq!(
        first_error("function f(...a, b) {}"),
        (
            ErrorCode::INVALID_REST_PARAMETER,
            "Rest parameter must be last formal parameter".to_string()
        )
    );
}

#[test]
fn test_try_requires_handler() {
    assert_eq!(first_error("try {}").1, "Missing catch or finally after try");
}

#[test]
fn test_throw_line_break() {
    assert_eq!(first_error("throw\nnew Error('x')").1, "Illegal newline after throw");
}

#[test]
fn test_class_is_rejected_with_suggestion() {
    let result = parse("class A {}");
    let err = result.errors.first().expect("error expected");
    assert_eq!(err.message, "Unexpected token 'class'");
    assert!(err.suggestion.is_some());
}

#[test]
fn test_lexer_errors_come_first() {
    let result = parse("let s = \"open\nconsole.log(;");
    assert!(result.errors.total_errors >= 2);
    assert_eq!(result.errors.errors[0].code, ErrorCode::UNTERMINATED_STRING);
}

#[test]
fn test_error_span_points_at_token() {
    let result = parse("let a = 1;\nconsole.log(a;");
    let err = result.errors.first().expect("error expected");
    assert_eq!(err.span.start_line, 2);
    assert_eq!(err.span.start_col, 14);
    assert_eq!(err.source_line, "console.log(a;");
}

// ─────────────────────────────────────────────────────────────────────
// Limits & recovery
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_nesting_limit() {
    let depth = MAX_NESTING_DEPTH as usize + 10;
    let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    let (code, _) = first_error(&source);
    assert_eq!(code, ErrorCode::STRUCTURAL_LIMIT_EXCEEDED);

    let source = format!("{}1{}", "[".repeat(20), "]".repeat(20));
    parse_ok(&source);
}

#[test]
fn test_unary_chain_is_bounded() {
    let source = format!("{}x", "!".repeat(500));
    assert_eq!(first_error(&source).0, ErrorCode::STRUCTURAL_LIMIT_EXCEEDED);
}

#[test]
fn test_recovery_reports_multiple_errors() {
    let result = parse("let = 1;\nlet ok = 2;\nconst;\n");
    assert_eq!(result.errors.total_errors, 2);
    assert!(result.program.body.iter().any(|s| matches!(
        s,
        Stmt::Var(d) if d.declarators[0].name.name == "ok"
    )));
}

#[test]
fn test_stray_closing_brace_does_not_hang() {
    let result = parse("}}} console.log(1)");
    assert!(result.errors.has_errors());
    assert_eq!(result.program.body.len(), 1);
}

#[test]
fn test_parsing_is_deterministic() {
    let source = "const xs = [3, 1, 2];\nxs.sort((a, b) => a - b);\nconsole.log(xs, { n: xs.length });";
    let first = parse_ok(source);
    for _ in 0..20 {
        assert_eq!(parse_ok(source), first);
    }
}
