//! §8 worked scenarios for the consteval engine, exercised end-to-end
//! through [`frontc::Compiler`] rather than the engine's own unit tests
//! (which call `consteval_try` directly on hand-built `Expr` trees).
//!
//! Plain `let` initializers only ever fold opportunistically and silently
//! (`consteval_guaranteed`, via the resolver's `try_fold`); `static_assert`
//! is the only statement that forces evaluation and diagnoses failures
//! (§4.C "forces"/"diagnoses" table), so the warning-producing scenarios
//! below are phrased as `static_assert` conditions.

use frontc::diagnostics::{DiagnosticKind, Severity};
use frontc::types::constant_value::ConstantValue;
use frontc::Compiler;
use std::io::Write;

fn compile_with_diagnostics(src: &str) -> (Result<frontc::TypedUnit, ()>, Vec<frontc::Diagnostic>) {
    let mut file = tempfile::NamedTempFile::with_suffix(".lang").expect("create temp file");
    file.write_all(src.as_bytes()).expect("write temp file");
    let mut compiler = Compiler::new();
    let result = compiler.compile_file(file.path()).map_err(|_| ());
    (result, compiler.get_diagnostics().to_vec())
}

#[test]
fn scenario_1_literal_folding_adds_two_integers_at_compile_time() {
    let (result, _) = compile_with_diagnostics("let x: i32 = 1 + 2;\n");
    let unit = result.expect("compiles cleanly");
    assert_eq!(unit.globals[0].init, Some(ConstantValue::Sint(3)));
}

#[test]
fn scenario_2_shift_past_width_warns_under_a_forcing_static_assert() {
    let src = "function f() -> void { static_assert(1u8 << 9 == 0u8, \"never taken\"); }\n";
    let (_, diags) = compile_with_diagnostics(src);
    assert!(
        diags.iter().any(|d| d.severity == Severity::Warning && d.message.contains("shift amount")),
        "expected a shift-overflow warning, got {diags:?}"
    );
}

#[test]
fn scenario_3_double_parens_suppress_the_overflow_warning() {
    let unwrapped = "function f() -> void { static_assert(1u8 << 9 == 0u8, \"never taken\"); }\n";
    let wrapped = "function f() -> void { static_assert(((1u8 << 9)) == 0u8, \"never taken\"); }\n";
    let (_, plain_diags) = compile_with_diagnostics(unwrapped);
    let (_, quiet_diags) = compile_with_diagnostics(wrapped);
    assert!(plain_diags.iter().any(|d| d.severity == Severity::Warning && d.message.contains("shift amount")));
    assert!(!quiet_diags.iter().any(|d| d.severity == Severity::Warning && d.message.contains("shift amount")));
}

#[test]
fn scenario_4_generic_specialization_is_memoized_per_argument_set() {
    let src = "function factorial(n) -> typeof n {\n\
               \x20   type T = typeof n;\n\
               \x20   mut result = 1 as T;\n\
               \x20   for (mut i = 1 as T; i <= n; ++i) { result *= i; }\n\
               \x20   return result;\n\
               }\n\
               consteval x = factorial(10);\n\
               consteval y = factorial(10u);\n";
    let (result, _) = compile_with_diagnostics(src);
    let unit = result.expect("both specializations fold independently");
    assert_eq!(unit.globals[0].init, Some(ConstantValue::Sint(3628800)));
    assert_eq!(unit.globals[1].init, Some(ConstantValue::Uint(3628800)));
}

#[test]
fn scenario_5_failing_static_assert_is_reported() {
    let src = "function f() -> void { static_assert(1 == 2, \"unreachable\"); }\n";
    let (result, diags) = compile_with_diagnostics(src);
    assert!(result.is_err(), "a false static_assert must fail the build");
    assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::StaticAssertFailure { .. })));
}

#[test]
fn scenario_5_passing_static_assert_compiles_cleanly() {
    let src = "function f() -> void { static_assert(1 == 1, \"always true\"); }\n";
    let (result, _) = compile_with_diagnostics(src);
    result.expect("a true static_assert must not fail the build");
}

#[test]
fn scenario_6_negative_compile_time_subscript_stays_dynamic() {
    // The base array and the index both fold to constants on their own, but
    // a negative index never folds the assignment itself (§4.C): under a
    // forcing `consteval` context the store fails and compilation is
    // diagnosed rather than the build crashing.
    let src = "function f() -> void {\n\
               \x20   mut arr: (i32, i32, i32, i32) = (1, 2, 3, 4);\n\
               \x20   let index = 0 - 1;\n\
               \x20   arr[index] = 3;\n\
               }\n\
               consteval z = f();\n";
    let (result, diags) = compile_with_diagnostics(src);
    assert!(result.is_err(), "a negative compile-time index store must fail a forcing consteval");
    assert!(diags.iter().any(|d| matches!(d.kind, DiagnosticKind::ConstevalFailure { .. })));
}
