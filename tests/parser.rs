//! §4.P end-to-end parsing tests, driven through the public
//! `frontc::parser::parse_file` entry point and `frontc::lexer::lex`.

use frontc::diagnostics::DiagnosticSink;
use frontc::lexer::lex;
use frontc::parser::{parse_file, stmt_parser};
use frontc::types::decl::Decl;
use frontc::types::expr::{ExprKind, Stmt};

fn parse(src: &str) -> (Vec<Decl>, DiagnosticSink) {
    let (tokens, lex_sink) = lex(src, 0);
    assert!(!lex_sink.has_errors(), "lexing failed: {:?}", lex_sink.diagnostics());
    let mut sink = DiagnosticSink::new();
    let decls = parse_file(&tokens, 0, &mut sink);
    (decls, sink)
}

/// The top-level parser only stashes a function's body as a `TokenRange`
/// (§4.P: the resolver re-parses it once a local scope exists), so tests
/// that need the body's shape parse that range directly, the same way
/// `Resolver::resolve_function` does.
fn only_function_body(src: &str, decls: &[Decl]) -> Vec<Stmt> {
    let (tokens, _) = lex(src, 0);
    match &decls[0] {
        Decl::Function(f) => {
            let range = f.body_tokens.expect("function body was parsed");
            let mut sink = DiagnosticSink::new();
            stmt_parser::parse_function_body(&tokens, range, 0, &mut sink)
        }
        other => panic!("expected a function decl, got {other:?}"),
    }
}

#[test]
fn parses_a_top_level_variable_with_an_initializer() {
    let (decls, sink) = parse("let x: i32 = 1 + 2;\n");
    assert!(!sink.has_errors());
    assert_eq!(decls.len(), 1);
    assert!(matches!(&decls[0], Decl::Variable(v) if v.name.as_str() == "x"));
}

#[test]
fn parses_an_import_with_an_alias() {
    let (decls, sink) = parse("import \"lib.lang\" as lib;\n");
    assert!(!sink.has_errors());
    match &decls[0] {
        Decl::Import { name, path } => {
            assert_eq!(name.as_str(), "lib");
            assert_eq!(path, "lib.lang");
        }
        other => panic!("expected an import decl, got {other:?}"),
    }
}

#[test]
fn binary_operator_precedence_groups_multiplication_before_addition() {
    // `1 + 2 * 3` must parse as `1 + (2 * 3)`, i.e. the outer node's
    // right-hand side is itself a `BinaryOp`, not the left.
    let src = "function f() -> i32 { return 1 + 2 * 3; }\n";
    let (decls, sink) = parse(src);
    assert!(!sink.has_errors());
    let stmts = only_function_body(src, &decls);
    let Stmt::Return(Some(expr)) = &stmts[0] else { panic!("expected a return statement") };
    let ExprKind::BinaryOp(_, _, rhs) = expr.kind().expect("binary op") else { panic!("expected a binary op") };
    assert!(matches!(rhs.kind(), Some(ExprKind::BinaryOp(..))));
}

#[test]
fn postfix_call_and_member_access_chain_left_to_right() {
    let src = "function f() -> i32 { return a.b(c); }\n";
    let (decls, sink) = parse(src);
    assert!(!sink.has_errors());
    let stmts = only_function_body(src, &decls);
    let Stmt::Return(Some(expr)) = &stmts[0] else { panic!("expected a return statement") };
    // `a.b(c)` parses as `Call { callee: MemberAccess { a, b }, args: [c] }`,
    // never `MemberAccess { Call(a, c), b }` (§4.P postfix loop order).
    match expr.kind() {
        Some(ExprKind::Call { callee, args }) => {
            assert_eq!(args.len(), 1);
            assert!(matches!(callee.kind(), Some(ExprKind::MemberAccess { .. })));
        }
        other => panic!("expected a call expression, got {other:?}"),
    }
}

#[test]
fn unknown_top_level_token_is_reported_and_parsing_resynchronizes() {
    let (decls, sink) = parse("@@@ garbage\nlet x: i32 = 1;\n");
    assert!(sink.has_errors());
    // Despite the garbage line, the parser recovers and still sees the
    // well-formed declaration after it (§4.P error recovery).
    assert!(decls.iter().any(|d| matches!(d, Decl::Variable(v) if v.name.as_str() == "x")));
}

#[test]
fn generic_function_declares_with_a_type_parameter_list() {
    let (decls, sink) = parse("function identity<T>(x: T) -> T { return x; }\n");
    assert!(!sink.has_errors());
    assert!(matches!(&decls[0], Decl::Function(f) if f.is_generic()));
}
