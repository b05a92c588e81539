//! §4.R resolver behaviors exercised end-to-end through
//! [`frontc::Compiler`], since the three-stage protocol only does anything
//! observable once a whole declaration set shares one arena and scope tree.

use frontc::diagnostics::DiagnosticKind;
use frontc::types::constant_value::ConstantValue;
use frontc::Compiler;
use std::io::Write;

fn compile(src: &str) -> Result<frontc::TypedUnit, Vec<frontc::Diagnostic>> {
    let mut file = tempfile::NamedTempFile::with_suffix(".lang").expect("create temp file");
    file.write_all(src.as_bytes()).expect("write temp file");
    Compiler::new().compile_file(file.path())
}

#[test]
fn local_scope_shadows_a_global_of_the_same_name() {
    let src = "let x: i32 = 1;\n\
               function f() -> i32 { let x: i32 = 2; return x; }\n";
    let unit = compile(src).expect("compiles cleanly");
    assert_eq!(unit.globals[0].init, Some(ConstantValue::Sint(1)));
}

#[test]
fn overload_resolution_picks_the_exact_parameter_type_match() {
    let src = "function f(x: i32) -> i32 { return 1; }\n\
               function f(x: u8) -> i32 { return 2; }\n\
               function g() -> i32 { return f(1 as i32); }\n";
    let result = compile(src);
    assert!(result.is_ok(), "expected overload resolution to succeed: {result:?}");
}

#[test]
fn ambiguous_overload_is_reported() {
    let src = "function f(x: i32, y: i32) -> i32 { return 1; }\n\
               function f(x: i32, y: u8) -> i32 { return 2; }\n\
               function g() -> i32 { return f(1, 2); }\n";
    let result = compile(src);
    let diags = result.expect_err("ambiguous call should fail resolution");
    assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::AmbiguousName { .. } | DiagnosticKind::OverloadResolutionFailure { .. })));
}

#[test]
fn unresolved_identifier_reports_unresolved_name() {
    let src = "function f() -> i32 { return missing; }\n";
    let diags = compile(src).expect_err("should fail resolution");
    assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::UnresolvedName { ref name } if name == "missing")));
}

#[test]
fn self_referential_variable_initializer_is_a_circular_dependency() {
    let src = "let x: i32 = x;\n";
    let diags = compile(src).expect_err("self-reference must be rejected");
    assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::CircularDependency { .. })));
}

#[test]
fn foreach_over_a_slice_desugars_and_resolves_cleanly() {
    let src = "function touch_each(items: []i32) -> void { foreach (x in items) { } }\n";
    let result = compile(src);
    assert!(result.is_ok(), "foreach desugaring should resolve without error: {result:?}");
}
