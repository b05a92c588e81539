//! The consteval engine (§4.C): three entry points sharing one per-node
//! folding policy, differing only in whether they attempt function-body
//! execution and whether they diagnose.

pub mod intrinsics;
pub mod machine;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity, SrcTokens};
use crate::symbol::Symbol;
use crate::types::constant_value::{ConstantValue, Float32, Float64};
use crate::types::decl::{Decl, DeclId};
use crate::types::expr::{Expr, ExprKind, SwitchCase};
use crate::types::typespec::{Terminator, Typespec};
use crate::types::Arena;

/// Which of the three entry points is driving this fold (§4.C table).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecKind {
    /// `consteval_guaranteed`: only propagates already-constant sub-values,
    /// never diagnoses.
    Guaranteed,
    /// `consteval_try`: forces evaluation, including intrinsic calls and
    /// function-body execution; diagnoses on failure.
    ForceEvaluate,
    /// `consteval_try_without_error`: forces evaluation but records failure
    /// silently (used speculatively during overload resolution).
    ForceEvaluateSilent,
}

impl ExecKind {
    #[must_use]
    pub fn forces(self) -> bool {
        matches!(self, ExecKind::ForceEvaluate | ExecKind::ForceEvaluateSilent)
    }

    #[must_use]
    pub fn diagnoses(self) -> bool {
        matches!(self, ExecKind::ForceEvaluate)
    }
}

pub struct EvalContext<'a> {
    pub arena: &'a Arena<DeclId, Decl>,
    pub target: crate::config::TargetProperties,
}

/// `consteval_guaranteed(e)` (§4.C): opportunistic folding of already-constant
/// sub-values. Never diagnoses.
#[must_use]
pub fn consteval_guaranteed(expr: &Expr, ctx: &EvalContext) -> Option<ConstantValue> {
    eval(expr, ExecKind::Guaranteed, ctx, None)
}

/// `consteval_try(e)` (§4.C): forces folding, including function-body
/// execution; reports a `ConstevalFailure` if the top-level request still
/// fails.
pub fn consteval_try(expr: &Expr, ctx: &EvalContext, sink: &mut DiagnosticSink) -> Option<ConstantValue> {
    let result = eval(expr, ExecKind::ForceEvaluate, ctx, Some(sink));
    if result.is_none() {
        sink.report(Diagnostic::new(DiagnosticKind::ConstevalFailure { reason: "expression is not a compile-time constant".to_owned() }, expr.src_tokens));
    }
    result
}

/// `consteval_try_without_error(e)` (§4.C): forces folding but never
/// diagnoses, used during speculative overload resolution.
#[must_use]
pub fn consteval_try_without_error(expr: &Expr, ctx: &EvalContext) -> Option<ConstantValue> {
    eval(expr, ExecKind::ForceEvaluateSilent, ctx, None)
}

/// Reports a fold-failure as a suppressible warning (§7): the sink's own
/// `paren_level` threshold decides whether it actually surfaces.
fn warn(kind: ExecKind, sink: Option<&mut DiagnosticSink>, src: SrcTokens, paren_level: crate::types::expr::ParenLevel, message: String) {
    if !kind.diagnoses() {
        return;
    }
    if let Some(sink) = sink {
        let mut d = Diagnostic::new(DiagnosticKind::ConstevalFailure { reason: message }, src).with_paren_level(paren_level.0);
        d.severity = Severity::Warning;
        sink.report(d);
    }
}

fn int_bits(name: &str) -> Option<(u32, bool)> {
    Some(match name {
        "i8" => (8, true),
        "i16" => (16, true),
        "i32" => (32, true),
        "i64" => (64, true),
        "u8" => (8, false),
        "u16" => (16, false),
        "u32" => (32, false),
        "u64" => (64, false),
        _ => return None,
    })
}

fn type_width(ty: Option<&Typespec>) -> Option<(u32, bool)> {
    match &ty?.terminator {
        Terminator::BaseType(name) => int_bits(name.as_str()),
        _ => None,
    }
}

fn fits(value: i128, bits: u32, signed: bool) -> bool {
    if signed {
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        value >= min && value <= max
    } else {
        let max = (1i128 << bits) - 1;
        value >= 0 && value <= max
    }
}

/// Drives the per-node folding policy (§4.C "Per-node policy"). `sink` is
/// only consulted (and only under `ForceEvaluate`) for warnings; the
/// top-level failure diagnostic is the caller's job (`consteval_try`).
fn eval(expr: &Expr, kind: ExecKind, ctx: &EvalContext, mut sink: Option<&mut DiagnosticSink>) -> Option<ConstantValue> {
    if let Some(v) = expr.constant_value() {
        return Some(v.clone());
    }
    let node = expr.kind()?;
    let src = expr.src_tokens;
    let paren = expr.paren_level;
    match node {
        ExprKind::Literal(v) => Some(v.clone()),

        ExprKind::UnaryOp(op, operand) => {
            let v = eval(operand, kind, ctx, sink.as_deref_mut())?;
            eval_unary(*op, &v)
        }

        ExprKind::BinaryOp(op, lhs, rhs) => {
            use crate::lexer::token::TokenKind as T;
            let lhs_v = eval(lhs, kind, ctx, sink.as_deref_mut())?;
            if matches!(op, T::BoolAnd) {
                if let ConstantValue::Bool(false) = lhs_v {
                    return Some(ConstantValue::Bool(false));
                }
            }
            if matches!(op, T::BoolOr) {
                if let ConstantValue::Bool(true) = lhs_v {
                    return Some(ConstantValue::Bool(true));
                }
            }
            let rhs_v = eval(rhs, kind, ctx, sink.as_deref_mut())?;
            let width = type_width(lhs.get_expr_type()).or_else(|| type_width(rhs.get_expr_type()));
            eval_binary(*op, &lhs_v, &rhs_v, width, kind, sink, src, paren)
        }

        ExprKind::Cast { expr: inner, target } => {
            let v = eval(inner, kind, ctx, sink.as_deref_mut())?;
            eval_cast(&v, target, kind, sink, src, paren)
        }

        ExprKind::Tuple(elems) => {
            let mut out = Vec::with_capacity(elems.len());
            for e in elems {
                out.push(eval(e, kind, ctx, sink.as_deref_mut())?);
            }
            Some(ConstantValue::Tuple(out.into()))
        }

        ExprKind::AggregateInit { fields, .. } => {
            let mut out = Vec::with_capacity(fields.len());
            for f in fields {
                out.push(eval(f, kind, ctx, sink.as_deref_mut())?);
            }
            Some(ConstantValue::Aggregate(out.into()))
        }

        ExprKind::AggregateDefaultConstruct(ty) | ExprKind::OptionalDefaultConstruct(ty) => intrinsics::default_value(ty),

        ExprKind::If { cond, then_branch, else_branch } => {
            let c = eval(cond, kind, ctx, sink.as_deref_mut())?;
            match c {
                ConstantValue::Bool(true) => eval(then_branch, kind, ctx, sink),
                ConstantValue::Bool(false) => match else_branch {
                    Some(e) => eval(e, kind, ctx, sink),
                    None => Some(ConstantValue::Void),
                },
                _ => None,
            }
        }

        ExprKind::Switch { scrutinee, cases, default } => {
            let v = eval(scrutinee, kind, ctx, sink.as_deref_mut())?;
            if let Some(case) = cases.iter().find(|c: &&SwitchCase| c.pattern == v) {
                eval(&case.body, kind, ctx, sink)
            } else if let Some(d) = default {
                eval(d, kind, ctx, sink)
            } else {
                None
            }
        }

        ExprKind::Subscript { base, index } => {
            let base_v = eval(base, kind, ctx, sink.as_deref_mut())?;
            let index_v = eval(index, kind, ctx, sink.as_deref_mut())?;
            let i = match index_v {
                ConstantValue::Sint(n) => n,
                ConstantValue::Uint(n) => n as i64,
                _ => return None,
            };
            if i < 0 {
                warn(kind, sink, src, paren, format!("negative index {i} in compile-time subscript"));
                return None;
            }
            match base_v {
                ConstantValue::Array(items) | ConstantValue::Tuple(items) | ConstantValue::Aggregate(items) => {
                    items.get(i as usize).cloned().or_else(|| {
                        warn(kind, sink, src, paren, format!("index {i} out of bounds"));
                        None
                    })
                }
                ConstantValue::SintArray(items) => items.get(i as usize).map(|&n| ConstantValue::Sint(n)),
                ConstantValue::UintArray(items) => items.get(i as usize).map(|&n| ConstantValue::Uint(n)),
                _ => None,
            }
        }

        ExprKind::MemberAccess { base, member } => {
            let base_v = eval(base, kind, ctx, sink)?;
            member_value(&base_v, *member)
        }

        ExprKind::Call { callee, args } => eval_call(callee, args, kind, ctx, sink, src),

        ExprKind::AggregateCopyConstruct(inner) | ExprKind::TrivialRelocate(inner) => eval(inner, kind, ctx, sink),

        ExprKind::OptionalExtractValue(inner) => eval(inner, kind, ctx, sink),

        _ => None,
    }
}

fn member_value(base: &ConstantValue, member: Symbol) -> Option<ConstantValue> {
    let _ = member;
    match base {
        ConstantValue::Aggregate(items) => items.first().cloned(),
        _ => None,
    }
}

fn eval_unary(op: crate::lexer::token::TokenKind, v: &ConstantValue) -> Option<ConstantValue> {
    use crate::lexer::token::TokenKind as T;
    match (op, v) {
        (T::Minus, ConstantValue::Sint(n)) => Some(ConstantValue::Sint(n.checked_neg()?)),
        (T::Minus, ConstantValue::Float32(f)) => Some(ConstantValue::Float32(Float32(-f.0))),
        (T::Minus, ConstantValue::Float64(f)) => Some(ConstantValue::Float64(Float64(-f.0))),
        (T::BoolNot, ConstantValue::Bool(b)) => Some(ConstantValue::Bool(!b)),
        (T::BitNot, ConstantValue::Sint(n)) => Some(ConstantValue::Sint(!n)),
        (T::BitNot, ConstantValue::Uint(n)) => Some(ConstantValue::Uint(!n)),
        _ => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_binary(
    op: crate::lexer::token::TokenKind,
    lhs: &ConstantValue,
    rhs: &ConstantValue,
    width: Option<(u32, bool)>,
    kind: ExecKind,
    sink: Option<&mut DiagnosticSink>,
    src: SrcTokens,
    paren: crate::types::expr::ParenLevel,
) -> Option<ConstantValue> {
    use crate::lexer::token::TokenKind as T;

    if let (ConstantValue::Bool(a), ConstantValue::Bool(b)) = (lhs, rhs) {
        return match op {
            T::BoolAnd => Some(ConstantValue::Bool(*a && *b)),
            T::BoolOr => Some(ConstantValue::Bool(*a || *b)),
            T::BoolXor => Some(ConstantValue::Bool(*a ^ *b)),
            T::Equals => Some(ConstantValue::Bool(a == b)),
            T::NotEquals => Some(ConstantValue::Bool(a != b)),
            _ => None,
        };
    }

    if let (Some(a), Some(b)) = (as_float(lhs), as_float(rhs)) {
        if matches!(op, T::Equals | T::NotEquals | T::LessThan | T::GreaterThan | T::LessThanEq | T::GreaterThanEq) && (a.is_nan() || b.is_nan()) {
            warn(kind, sink, src, paren, "comparison of NaN is never true".to_owned());
            return None;
        }
        let result = match op {
            T::Plus => a + b,
            T::Minus => a - b,
            T::Multiply => a * b,
            T::Divide => a / b,
            T::Equals => return Some(ConstantValue::Bool(a == b)),
            T::NotEquals => return Some(ConstantValue::Bool(a != b)),
            T::LessThan => return Some(ConstantValue::Bool(a < b)),
            T::GreaterThan => return Some(ConstantValue::Bool(a > b)),
            T::LessThanEq => return Some(ConstantValue::Bool(a <= b)),
            T::GreaterThanEq => return Some(ConstantValue::Bool(a >= b)),
            _ => return None,
        };
        return Some(match lhs {
            ConstantValue::Float32(_) => ConstantValue::Float32(Float32(result as f32)),
            _ => ConstantValue::Float64(Float64(result)),
        });
    }

    let (a, b) = (as_int(lhs)?, as_int(rhs)?);
    let (bits, signed) = width.unwrap_or((64, true));

    match op {
        T::Equals => return Some(ConstantValue::Bool(a == b)),
        T::NotEquals => return Some(ConstantValue::Bool(a != b)),
        T::LessThan => return Some(ConstantValue::Bool(a < b)),
        T::GreaterThan => return Some(ConstantValue::Bool(a > b)),
        T::LessThanEq => return Some(ConstantValue::Bool(a <= b)),
        T::GreaterThanEq => return Some(ConstantValue::Bool(a >= b)),
        _ => {}
    }

    if matches!(op, T::BitLeftShift | T::BitRightShift) && b >= bits as i128 {
        let type_name = if signed { format!("i{bits}") } else { format!("u{bits}") };
        warn(kind, sink, src, paren, format!("shift amount of {b} is too big for type '{type_name}'"));
        return None;
    }

    let result = match op {
        T::Plus => a + b,
        T::Minus => a - b,
        T::Multiply => a * b,
        T::Divide => {
            if b == 0 {
                warn(kind, sink, src, paren, "division by zero".to_owned());
                return None;
            }
            a / b
        }
        T::Modulo => {
            if b == 0 {
                warn(kind, sink, src, paren, "modulo by zero".to_owned());
                return None;
            }
            a % b
        }
        T::BitAnd => a & b,
        T::BitOr => a | b,
        T::BitXor => a ^ b,
        T::BitLeftShift => a << b,
        T::BitRightShift => a >> b,
        _ => return None,
    };

    if !fits(result, bits, signed) {
        let type_name = if signed { format!("i{bits}") } else { format!("u{bits}") };
        warn(kind, sink, src, paren, format!("result of operation overflows type '{type_name}'"));
        return None;
    }

    Some(if signed { ConstantValue::Sint(result as i64) } else { ConstantValue::Uint(result as u64) })
}

fn as_int(v: &ConstantValue) -> Option<i128> {
    match v {
        ConstantValue::Sint(n) => Some(*n as i128),
        ConstantValue::Uint(n) => Some(*n as i128),
        ConstantValue::Char(c) => Some(*c as i128),
        _ => None,
    }
}

fn as_float(v: &ConstantValue) -> Option<f64> {
    match v {
        ConstantValue::Float32(f) => Some(f.0 as f64),
        ConstantValue::Float64(f) => Some(f.0),
        _ => None,
    }
}

fn eval_cast(v: &ConstantValue, target: &Typespec, kind: ExecKind, sink: Option<&mut DiagnosticSink>, src: SrcTokens, paren: crate::types::expr::ParenLevel) -> Option<ConstantValue> {
    let Terminator::BaseType(name) = &target.terminator else { return Some(v.clone()) };
    match name.as_str() {
        "bool" => Some(ConstantValue::Bool(as_int(v)? != 0)),
        "f32" => Some(ConstantValue::Float32(Float32(as_float(v).or_else(|| as_int(v).map(|n| n as f64))? as f32))),
        "f64" => Some(ConstantValue::Float64(Float64(as_float(v).or_else(|| as_int(v).map(|n| n as f64))?))),
        "char" => Some(ConstantValue::Char(as_int(v)? as u32)),
        name => {
            let (bits, signed) = int_bits(name)?;
            let n = as_int(v).or_else(|| as_float(v).map(|f| f as i128))?;
            let truncated = truncate_to_width(n, bits, signed);
            if truncated != n {
                warn(kind, sink, src, paren, format!("truncating cast to '{name}' changes the value"));
            }
            Some(if signed { ConstantValue::Sint(truncated as i64) } else { ConstantValue::Uint(truncated as u64) })
        }
    }
}

fn truncate_to_width(n: i128, bits: u32, signed: bool) -> i128 {
    let mask = if bits >= 128 { u128::MAX } else { (1u128 << bits) - 1 };
    let bits_value = (n as u128) & mask;
    if signed && bits < 128 && (bits_value & (1u128 << (bits - 1))) != 0 {
        (bits_value as i128) - (1i128 << bits)
    } else {
        bits_value as i128
    }
}

fn eval_call(callee: &Expr, args: &[Expr], kind: ExecKind, ctx: &EvalContext, mut sink: Option<&mut DiagnosticSink>, src: SrcTokens) -> Option<ConstantValue> {
    let ExprKind::Identifier(name) = callee.kind()? else { return None };
    if let Some(intrinsic) = crate::types::entity::IntrinsicKind::from_symbol(*name) {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(eval(a, kind, ctx, sink.as_deref_mut())?);
        }
        return intrinsics::dispatch(intrinsic, &values, kind, args.first().and_then(|a| a.get_expr_type()));
    }
    if !kind.forces() {
        return None;
    }
    let fn_id = resolve_callee_function(ctx.arena, *name)?;
    let Decl::Function(body) = ctx.arena.get(fn_id) else { return None };
    let mut values = Vec::with_capacity(args.len());
    for a in args {
        values.push(eval(a, kind, ctx, sink.as_deref_mut())?);
    }
    machine::run(body, &values, ctx, src)
}

fn resolve_callee_function(arena: &Arena<DeclId, Decl>, name: Symbol) -> Option<DeclId> {
    arena.iter().find_map(|(id, d)| match d {
        Decl::Function(f) if f.symbol_name == name && f.body.is_some() => Some(id),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SrcTokens;
    use crate::types::expr::{ExprTypeKind, ParenLevel};
    use crate::types::typespec::Typespec;

    fn ctx() -> (Arena<DeclId, Decl>, crate::config::TargetProperties) {
        (Arena::new(), crate::config::TargetProperties::host())
    }

    fn i32_ty() -> Typespec {
        Typespec::new(Terminator::BaseType(crate::symbol::intern("i32")))
    }

    fn u32_ty() -> Typespec {
        Typespec::new(Terminator::BaseType(crate::symbol::intern("u32")))
    }

    fn lit(v: ConstantValue, ty: Typespec) -> Expr {
        let kind = ExprKind::Literal(v.clone());
        Expr::constant(ty, ExprTypeKind::IntegerLiteral, kind, v, SrcTokens::point(0, 0))
    }

    #[test]
    fn literal_folding_adds_two_integers() {
        let (arena, target) = ctx();
        let c = EvalContext { arena: &arena, target };
        let lhs = lit(ConstantValue::Sint(3), i32_ty());
        let rhs = lit(ConstantValue::Sint(4), i32_ty());
        let src = SrcTokens::point(0, 0);
        let expr = Expr::dynamic(i32_ty(), ExprTypeKind::Rvalue, ExprKind::BinaryOp(crate::lexer::token::TokenKind::Plus, Box::new(lhs), Box::new(rhs)), src);
        assert_eq!(consteval_guaranteed(&expr, &c), Some(ConstantValue::Sint(7)));
    }

    #[test]
    fn shift_past_width_warns_and_stays_dynamic() {
        let (arena, target) = ctx();
        let c = EvalContext { arena: &arena, target };
        let lhs = lit(ConstantValue::Uint(3), u32_ty());
        let rhs = lit(ConstantValue::Uint(32), u32_ty());
        let src = SrcTokens::point(0, 0);
        let expr = Expr::dynamic(u32_ty(), ExprTypeKind::Rvalue, ExprKind::BinaryOp(crate::lexer::token::TokenKind::BitLeftShift, Box::new(lhs), Box::new(rhs)), src);
        let mut sink = DiagnosticSink::new();
        assert_eq!(consteval_try(&expr, &c, &mut sink), None);
        assert!(sink.diagnostics().iter().any(|d| format!("{d}").contains("shift amount of 32")));
    }

    #[test]
    fn double_parens_suppress_the_overflow_warning() {
        let (arena, target) = ctx();
        let c = EvalContext { arena: &arena, target };
        let lhs = lit(ConstantValue::Sint(100), i32_ty());
        let rhs = lit(ConstantValue::Sint(100), i32_ty());
        let src = SrcTokens::point(0, 0);
        let mut expr = Expr::dynamic(
            Typespec::new(Terminator::BaseType(crate::symbol::intern("i8"))),
            ExprTypeKind::Rvalue,
            ExprKind::BinaryOp(crate::lexer::token::TokenKind::Multiply, Box::new(lit(ConstantValue::Sint(100), Typespec::new(Terminator::BaseType(crate::symbol::intern("i8"))))), Box::new(lit(ConstantValue::Sint(100), Typespec::new(Terminator::BaseType(crate::symbol::intern("i8")))))),
            src,
        );
        expr.paren_level = ParenLevel::NONE.wrap().wrap();
        let mut sink = DiagnosticSink::new();
        assert_eq!(consteval_try(&expr, &c, &mut sink), None);
        assert!(sink.diagnostics().is_empty(), "warning should be suppressed at paren_level >= 2: {:?}", sink.diagnostics());
        let _ = (lhs_unused(&lhs), rhs_unused(&rhs));
    }

    fn lhs_unused(_: &Expr) {}
    fn rhs_unused(_: &Expr) {}

    #[test]
    fn static_assert_condition_folds_to_false() {
        let (arena, target) = ctx();
        let c = EvalContext { arena: &arena, target };
        let lhs = lit(ConstantValue::Sint(2), i32_ty());
        let three = lit(ConstantValue::Sint(3), i32_ty());
        let sum_src = SrcTokens::point(0, 0);
        let sum = Expr::dynamic(i32_ty(), ExprTypeKind::Rvalue, ExprKind::BinaryOp(crate::lexer::token::TokenKind::Plus, Box::new(lit(ConstantValue::Sint(1), i32_ty())), Box::new(lit(ConstantValue::Sint(1), i32_ty()))), sum_src);
        let bool_ty = Typespec::new(Terminator::BaseType(crate::symbol::intern("bool")));
        let cond = Expr::dynamic(bool_ty, ExprTypeKind::Rvalue, ExprKind::BinaryOp(crate::lexer::token::TokenKind::Equals, Box::new(sum), Box::new(three)), sum_src);
        assert_eq!(consteval_guaranteed(&cond, &c), Some(ConstantValue::Bool(false)));
        let _ = lhs;
    }
}
