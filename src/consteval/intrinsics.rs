//! The intrinsic registry (§4.C.3): a closed table from [`IntrinsicKind`] to
//! a handler. Dispatch is driven by [`super::eval_call`] once it finds the
//! callee name in [`IntrinsicKind::from_symbol`].

use super::ExecKind;
use crate::types::constant_value::{ConstantValue, Float32, Float64};
use crate::types::entity::IntrinsicKind;
use crate::types::typespec::{Modifier, Terminator, Typespec};

/// `default_construct(T)` and the implicit default-construction of
/// built-ins/aggregates (§4.C "Default constructors"): zero/null-initialised
/// constants, recursing into tuple/aggregate element types.
#[must_use]
pub fn default_value(ty: &Typespec) -> Option<ConstantValue> {
    if ty.is_optional() {
        return Some(ConstantValue::Null);
    }
    if !ty.modifiers.is_empty() {
        return match ty.outer_modifier()? {
            Modifier::Pointer | Modifier::ArraySlice => Some(ConstantValue::Null),
            Modifier::Array(n) => {
                let inner = Typespec { modifiers: ty.modifiers[1..].into(), terminator: ty.terminator.clone() };
                let elem = default_value(&inner)?;
                Some(ConstantValue::Array(vec![elem; *n as usize].into()))
            }
            Modifier::Mut | Modifier::Const | Modifier::Consteval => {
                let inner = Typespec { modifiers: ty.modifiers[1..].into(), terminator: ty.terminator.clone() };
                default_value(&inner)
            }
            _ => None,
        };
    }
    match &ty.terminator {
        Terminator::BaseType(name) => match name.as_str() {
            "bool" => Some(ConstantValue::Bool(false)),
            "f32" => Some(ConstantValue::Float32(Float32(0.0))),
            "f64" => Some(ConstantValue::Float64(Float64(0.0))),
            "char" => Some(ConstantValue::Char(0)),
            n if super::int_bits(n).is_some() => {
                let (_, signed) = super::int_bits(n)?;
                Some(if signed { ConstantValue::Sint(0) } else { ConstantValue::Uint(0) })
            }
            _ => None,
        },
        Terminator::Void => Some(ConstantValue::Void),
        Terminator::Tuple(elems) => {
            let mut out = Vec::with_capacity(elems.len());
            for e in elems {
                out.push(default_value(e)?);
            }
            Some(ConstantValue::Tuple(out.into()))
        }
        _ => None,
    }
}

/// `typename_of(T)` renders a typespec the way a diagnostic would; kept
/// deliberately simple (base-type name plus a `*`/`[]` per modifier) rather
/// than reproducing a full pretty-printer.
fn typename_of(ty: &Typespec) -> String {
    let mut s = match &ty.terminator {
        Terminator::BaseType(n) => n.to_string(),
        Terminator::Void => "void".to_owned(),
        Terminator::Auto => "auto".to_owned(),
        Terminator::Typename => "typename".to_owned(),
        _ => "<type>".to_owned(),
    };
    for m in &ty.modifiers {
        match m {
            Modifier::Pointer => s.push('*'),
            Modifier::ArraySlice => s = format!("[]{s}"),
            Modifier::Array(n) => s = format!("[{n}]{s}"),
            Modifier::Optional => s.push('?'),
            _ => {}
        }
    }
    s
}

fn array_value_type(ty: &Typespec) -> Option<Typespec> {
    match ty.outer_modifier()? {
        Modifier::Array(_) | Modifier::ArraySlice => Some(Typespec { modifiers: ty.modifiers[1..].into(), terminator: ty.terminator.clone() }),
        _ => None,
    }
}

/// Dispatches a resolved [`IntrinsicKind`] call (§4.C.3). `first_arg_type` is
/// the static type of the call's first argument, used by the
/// type-introspection intrinsics that take a type rather than a value.
#[must_use]
pub fn dispatch(kind: IntrinsicKind, args: &[ConstantValue], exec: ExecKind, first_arg_type: Option<&crate::types::typespec::Typespec>) -> Option<ConstantValue> {
    match kind {
        IntrinsicKind::ExpF64 => as_f64(args.first()?).map(|x| ConstantValue::Float64(Float64(x.exp()))),
        IntrinsicKind::ExpF32 => as_f32(args.first()?).map(|x| ConstantValue::Float32(Float32(x.exp()))),
        IntrinsicKind::SqrtF64 => as_f64(args.first()?).map(|x| ConstantValue::Float64(Float64(x.sqrt()))),
        IntrinsicKind::SqrtF32 => as_f32(args.first()?).map(|x| ConstantValue::Float32(Float32(x.sqrt()))),

        IntrinsicKind::IsTrivial => Some(ConstantValue::Bool(matches!(first_arg_type?.terminator, Terminator::BaseType(_) | Terminator::Void))),
        IntrinsicKind::IsComparable => Some(ConstantValue::Bool(matches!(first_arg_type?.terminator, Terminator::BaseType(_)))),
        IntrinsicKind::IsDefaultConstructible => Some(ConstantValue::Bool(default_value(first_arg_type?).is_some())),

        IntrinsicKind::ArrayValueType => array_value_type(first_arg_type?).map(|t| ConstantValue::Type(Box::new(t))),
        IntrinsicKind::EnumUnderlyingType => None,
        IntrinsicKind::BuiltinArraySize => match first_arg_type?.outer_modifier()? {
            Modifier::Array(n) => Some(ConstantValue::Uint(*n)),
            _ => None,
        },

        IntrinsicKind::BuiltinIsComptime => {
            if exec.forces() {
                Some(ConstantValue::Bool(true))
            } else {
                None
            }
        }

        IntrinsicKind::ComptimeConcatenateStrs => {
            let mut out = String::new();
            for a in args {
                match a {
                    ConstantValue::String(s) => out.push_str(s),
                    _ => return None,
                }
            }
            Some(ConstantValue::String(out.into()))
        }

        IntrinsicKind::DefaultConstruct => default_value(first_arg_type?),
        IntrinsicKind::TypenameOf => Some(ConstantValue::String(typename_of(first_arg_type?).into())),

        IntrinsicKind::SliceLen | IntrinsicKind::SlicePtr => None,
    }
}

fn as_f64(v: &ConstantValue) -> Option<f64> {
    match v {
        ConstantValue::Float64(f) => Some(f.0),
        ConstantValue::Float32(f) => Some(f.0 as f64),
        ConstantValue::Sint(n) => Some(*n as f64),
        ConstantValue::Uint(n) => Some(*n as f64),
        _ => None,
    }
}

fn as_f32(v: &ConstantValue) -> Option<f32> {
    as_f64(v).map(|f| f as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::intern;

    #[test]
    fn default_value_of_i32_is_zero() {
        let ty = Typespec::new(Terminator::BaseType(intern("i32")));
        assert_eq!(default_value(&ty), Some(ConstantValue::Sint(0)));
    }

    #[test]
    fn default_value_of_pointer_is_null() {
        let ty = Typespec::new(Terminator::BaseType(intern("i32"))).with_modifier(Modifier::Pointer);
        assert_eq!(default_value(&ty), Some(ConstantValue::Null));
    }

    #[test]
    fn builtin_array_size_reads_the_array_modifier() {
        let ty = Typespec::new(Terminator::BaseType(intern("i32"))).with_modifier(Modifier::Array(4));
        assert_eq!(dispatch(IntrinsicKind::BuiltinArraySize, &[], ExecKind::Guaranteed, Some(&ty)), Some(ConstantValue::Uint(4)));
    }

    #[test]
    fn builtin_is_comptime_only_folds_when_forced() {
        assert_eq!(dispatch(IntrinsicKind::BuiltinIsComptime, &[], ExecKind::Guaranteed, None), None);
        assert_eq!(dispatch(IntrinsicKind::BuiltinIsComptime, &[], ExecKind::ForceEvaluate, None), Some(ConstantValue::Bool(true)));
    }
}
