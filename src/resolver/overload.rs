//! Overload resolution and `match_expression_to_type` (§4.R).

use crate::diagnostics::{Diagnostic, DiagnosticKind, SrcTokens};
use crate::symbol::Symbol;
use crate::types::constant_value::ConstantValue;
use crate::types::decl::{Decl, DeclId, FunctionBody};
use crate::types::expr::{Expr, ExprKind, ExprTypeKind};
use crate::types::typespec::{Modifier, Terminator, Typespec};
use crate::types::Arena;
use smallvec::SmallVec;

/// One coercion step's cost (§4.R "Scores capture exactness..."). Variant
/// declaration order is the ranking: lower = better, mirroring
/// `PartialOrd`/`Ord` derived from discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchScore {
    Identity,
    MutConstAdjust,
    IntegerLiteralFit,
    ImplicitConversion,
    UserDefinedConversion,
    VariadicExpansion,
}

fn is_builtin_integer(term: &Terminator) -> bool {
    matches!(term, Terminator::BaseType(name) if matches!(
        name.as_str(),
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64"
    ))
}

/// `match_expression_to_type(expr, target_type)` (§4.R). Returns `None` when
/// no coercion bridges `ty` to `target`.
#[must_use]
pub fn match_expression_to_type(ty: &Typespec, value: Option<&ConstantValue>, target: &Typespec) -> Option<MatchScore> {
    // An unresolved placeholder (parser's `untyped()` stamp, or a modifier
    // stack not yet narrowed) unifies with anything; the resolver revisits
    // it once the declaration it came from reaches `Symbol`. A target of
    // `Auto` is an un-specialized generic parameter's declared type (§4.R
    // "a generic parameter's declared type is itself the placeholder"),
    // which must also accept any argument so overload scoring can pick the
    // template before `GenericCache::get_or_create` substitutes it.
    if matches!(ty.terminator, Terminator::Auto | Terminator::GenericParam(_)) || matches!(target.terminator, Terminator::Auto | Terminator::GenericParam(_)) {
        return Some(MatchScore::ImplicitConversion);
    }

    if let Some(v) = value {
        if matches!(v, ConstantValue::Sint(_) | ConstantValue::Uint(_)) && is_builtin_integer(&target.terminator) && target.modifiers.is_empty() {
            return Some(MatchScore::IntegerLiteralFit);
        }
        if matches!(v, ConstantValue::Null) && target.is_optional() {
            return Some(MatchScore::ImplicitConversion);
        }
    }

    if ty == target {
        return Some(MatchScore::Identity);
    }

    // `mut` -> non-`mut` is allowed; the reverse is not (§4.R).
    if ty.is_mut() && !target.is_mut() {
        let stripped = Typespec { modifiers: ty.modifiers[1..].into(), terminator: ty.terminator.clone() };
        if &stripped == target {
            return Some(MatchScore::MutConstAdjust);
        }
    }

    // array-of-T -> slice-of-T (§4.R "Array-of-T coerces to slice-of-T when
    // T matches").
    if let (Some(Modifier::Array(_)), Some(Modifier::ArraySlice)) = (ty.outer_modifier(), target.outer_modifier()) {
        let lhs_elem = Typespec { modifiers: ty.modifiers[1..].into(), terminator: ty.terminator.clone() };
        let rhs_elem = Typespec { modifiers: target.modifiers[1..].into(), terminator: target.terminator.clone() };
        if lhs_elem == rhs_elem {
            return Some(MatchScore::ImplicitConversion);
        }
    }

    // Tuple -> tuple-type requires pointwise match (§4.R).
    if let (Terminator::Tuple(lhs), Terminator::Tuple(rhs)) = (&ty.terminator, &target.terminator) {
        if lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(a, b)| match_expression_to_type(a, None, b).is_some()) {
            return Some(MatchScore::ImplicitConversion);
        }
    }

    None
}

/// Strips the `auto_reference[_mut]` modifier per §4.R: binds to a reference
/// when `expr` is an lvalue, otherwise drops the reference modifier
/// entirely.
#[must_use]
pub fn bind_auto_reference(target: &Typespec, expr_type_kind: ExprTypeKind) -> Typespec {
    match target.outer_modifier() {
        Some(Modifier::AutoReference | Modifier::AutoReferenceMut) => {
            let rest = Typespec { modifiers: target.modifiers[1..].into(), terminator: target.terminator.clone() };
            if expr_type_kind.binds_by_reference() {
                rest.with_modifier(Modifier::LvalueReference)
            } else {
                rest
            }
        }
        _ => target.clone(),
    }
}

fn function_body(decl: &Decl) -> Option<&FunctionBody> {
    match decl {
        Decl::Function(f) | Decl::Operator { body: f, .. } => Some(f),
        _ => None,
    }
}

struct Candidate {
    id: DeclId,
    total: u32,
}

/// Scores and selects the best candidate for `f(a₁, …, aₙ)` (§4.R "Overload
/// resolution"). `args` are the already-retyped argument expressions.
/// Returns the winning declaration, or `None` (with diagnostics already
/// reported) on no-match/ambiguity.
#[must_use]
pub fn resolve_call(candidates: &[DeclId], args: &[Expr], arena: &Arena<DeclId, Decl>, name: Symbol, call_src: SrcTokens, sink: &mut crate::diagnostics::DiagnosticSink) -> Option<DeclId> {
    let mut scored = Vec::new();
    let mut rejected_names = Vec::new();
    for &id in candidates {
        let Some(body) = function_body(arena.get(id)) else { continue };
        match score_candidate(body, args) {
            Some(total) => scored.push(Candidate { id, total }),
            None => rejected_names.push(body.symbol_name.as_str().to_owned()),
        }
    }
    if scored.is_empty() {
        sink.report(Diagnostic::new(
            DiagnosticKind::OverloadResolutionFailure { name: name.as_str().to_owned(), candidates: rejected_names },
            call_src,
        ));
        return None;
    }
    let best = scored.iter().map(|c| c.total).min().unwrap();
    let winners: SmallVec<[&Candidate; 4]> = scored.iter().filter(|c| c.total == best).collect();
    if winners.len() > 1 {
        let names = winners
            .iter()
            .map(|c| function_body(arena.get(c.id)).map(|f| f.symbol_name.as_str().to_owned()).unwrap_or_default())
            .collect();
        sink.report(Diagnostic::new(DiagnosticKind::AmbiguousName { name: name.as_str().to_owned(), candidates: names }, call_src));
        return None;
    }
    Some(winners[0].id)
}

fn score_candidate(body: &FunctionBody, args: &[Expr]) -> Option<u32> {
    let variadic = body.params.last().map(|p| matches!(p.ty.outer_modifier(), Some(Modifier::Variadic))).unwrap_or(false);
    if args.len() < body.params.len() - usize::from(variadic) {
        return None;
    }
    if !variadic && args.len() != body.params.len() {
        return None;
    }
    let mut total = 0u32;
    for (arg, param) in args.iter().zip(body.params.iter()) {
        let ty = arg.get_expr_type()?;
        let value = arg.constant_value();
        let target = bind_auto_reference(&param.ty, arg.type_kind().unwrap_or(ExprTypeKind::Rvalue));
        let score = match_expression_to_type(ty, value, &target)?;
        total += score as u32;
    }
    // Extra arguments beyond the fixed parameters are absorbed by the
    // trailing `variadic` parameter, each at `VariadicExpansion` cost.
    if variadic {
        total += (args.len().saturating_sub(body.params.len() - 1)) as u32 * (MatchScore::VariadicExpansion as u32);
    }
    Some(total)
}

/// Wraps `expr` in an explicit coercion node so later stages never need to
/// re-derive it (§4.R "All coercions are materialised as explicit nodes").
#[must_use]
pub fn materialize_coercion(expr: Expr, target: &Typespec, score: MatchScore) -> Expr {
    match score {
        MatchScore::Identity => expr,
        _ => {
            let src = expr.src_tokens;
            Expr::dynamic(target.clone(), ExprTypeKind::Rvalue, ExprKind::Cast { expr: Box::new(expr), target: Box::new(target.clone()) }, src)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::intern;

    fn i32_ty() -> Typespec {
        Typespec::new(Terminator::BaseType(intern("i32")))
    }

    #[test]
    fn identity_match_scores_best() {
        let ty = i32_ty();
        assert_eq!(match_expression_to_type(&ty, None, &ty), Some(MatchScore::Identity));
    }

    #[test]
    fn integer_literal_fits_builtin_family() {
        // A literal typed `i32` by default still fits a narrower integer
        // parameter (§4.R): the constant value, not the literal's own type,
        // decides the match.
        let ty = i32_ty();
        let target = Typespec::new(Terminator::BaseType(intern("u8")));
        let v = ConstantValue::Uint(3);
        assert_eq!(match_expression_to_type(&ty, Some(&v), &target), Some(MatchScore::IntegerLiteralFit));
    }

    #[test]
    fn untyped_placeholder_unifies_with_anything() {
        let ty = Typespec::new(Terminator::Auto);
        let target = i32_ty();
        assert_eq!(match_expression_to_type(&ty, None, &target), Some(MatchScore::ImplicitConversion));
    }

    #[test]
    fn mut_to_non_mut_is_allowed_but_not_reverse() {
        let mut_ty = i32_ty().with_modifier(Modifier::Mut);
        let plain = i32_ty();
        assert_eq!(match_expression_to_type(&mut_ty, None, &plain), Some(MatchScore::MutConstAdjust));
        assert_eq!(match_expression_to_type(&plain, None, &mut_ty), None);
    }

    #[test]
    fn array_coerces_to_slice_of_same_element() {
        let array_ty = i32_ty().with_modifier(Modifier::Array(4));
        let slice_ty = i32_ty().with_modifier(Modifier::ArraySlice);
        assert_eq!(match_expression_to_type(&array_ty, None, &slice_ty), Some(MatchScore::ImplicitConversion));
    }

    #[test]
    fn tuple_requires_pointwise_match() {
        let lhs = Typespec::new(Terminator::Tuple(vec![i32_ty(), i32_ty()]));
        let rhs = Typespec::new(Terminator::Tuple(vec![i32_ty(), i32_ty()]));
        assert_eq!(match_expression_to_type(&lhs, None, &rhs), Some(MatchScore::ImplicitConversion));
        let mismatched = Typespec::new(Terminator::Tuple(vec![i32_ty()]));
        assert_eq!(match_expression_to_type(&lhs, None, &mismatched), None);
    }
}
