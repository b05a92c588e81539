//! Closed registries of well-known names: intrinsic kinds (§4.C.3, §4.I) and
//! attribute names (§4.R "Attribute application"). Kept from the teacher
//! crate's `make_prims!` pattern (`mmcc::types::entity::{PrimOp, PrimType}`),
//! generalized from MMC's primitive operators/types to this language's
//! intrinsic functions and recognised attributes.

use crate::symbol::{init_dense_symbol_map, intern, Symbol};
use std::sync::LazyLock;

macro_rules! make_prims {
    {$($(#[$attr0:meta])* enum $name:ident {
        $($(#[$attr:meta])* $x:ident: $e:expr,)*
    })*} => {
        $(
            $(#[$attr0])*
            #[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
            pub enum $name { $($(#[$attr])* $x),* }

            impl $name {
                /// Evaluate a function on all elements of the type, with their names.
                pub fn scan(mut f: impl FnMut(Self, &'static str)) {
                    $(f($name::$x, $e);)*
                }

                /// Convert a string into this type.
                #[allow(clippy::should_implement_trait)]
                #[must_use] pub fn from_str(s: &str) -> Option<Self> {
                    match s {
                        $($e => Some(Self::$x),)*
                        _ => None,
                    }
                }

                /// Get the registry entry for a symbol.
                #[must_use] pub fn from_symbol(s: Symbol) -> Option<Self> {
                    static SYMBOL_MAP: LazyLock<Box<[Option<$name>]>> = LazyLock::new(|| {
                        let mut pairs: Vec<(Symbol, $name)> = Vec::new();
                        $name::scan(|p, s| pairs.push((intern(s), p)));
                        init_dense_symbol_map(&pairs)
                    });
                    SYMBOL_MAP.get(s.into_usize()).copied().flatten()
                }

                /// Get the symbol for this entry.
                #[must_use] pub fn as_symbol(self) -> Symbol {
                    static INTERNED: LazyLock<Vec<Symbol>> = LazyLock::new(|| {
                        let mut v = Vec::new();
                        $name::scan(|_, s| v.push(intern(s)));
                        v
                    });
                    INTERNED[self as usize]
                }
            }
        )*
    }
}

make_prims! {
    /// Named built-ins dispatched through the intrinsic registry (§4.C.3).
    /// Each corresponds to a `fn(call_site, args, exec_kind, ctx) ->
    /// Option<ConstantValue>` handler registered in `consteval::intrinsics`.
    enum IntrinsicKind {
        /// `exp_f64(x)` — `f64` exponential.
        ExpF64: "exp_f64",
        /// `exp_f32(x)` — `f32` exponential.
        ExpF32: "exp_f32",
        /// `sqrt_f64(x)`.
        SqrtF64: "sqrt_f64",
        /// `sqrt_f32(x)`.
        SqrtF32: "sqrt_f32",
        /// `is_trivial(T)` type-introspection predicate.
        IsTrivial: "is_trivial",
        /// `is_comparable(T)` type-introspection predicate.
        IsComparable: "is_comparable",
        /// `is_default_constructible(T)` type-introspection predicate.
        IsDefaultConstructible: "is_default_constructible",
        /// `array_value_type(T)` — element type of an array/slice type.
        ArrayValueType: "array_value_type",
        /// `enum_underlying_type(T)` — underlying integer type of an enum.
        EnumUnderlyingType: "enum_underlying_type",
        /// `builtin_array_size(T)` — compile-time array length.
        BuiltinArraySize: "builtin_array_size",
        /// `builtin_is_comptime()` — special-cased: folds to `true` only
        /// under `consteval_guaranteed` (§4.C.3).
        BuiltinIsComptime: "__builtin_is_comptime",
        /// `comptime_concatenate_strs(a, b, ...)`.
        ComptimeConcatenateStrs: "comptime_concatenate_strs",
        /// `default_construct(T)` — zero/null-initialised value of a
        /// built-in or trivially-constructible aggregate type.
        DefaultConstruct: "default_construct",
        /// `typename_of(T)` — returns the spelling of a type as a string.
        TypenameOf: "typename_of",
        /// `slice_len(s)` — length of a slice value.
        SliceLen: "slice_len",
        /// `slice_ptr(s)` — base pointer of a slice value.
        SlicePtr: "slice_ptr",
    }

    /// Attribute names recognised by the resolver's attribute registry
    /// (§4.R "Recognised attributes"). Unknown attributes produce a
    /// warning, not an error, and are not represented here.
    enum AttributeKind {
        SymbolName: "symbol_name",
        Builtin: "__builtin",
        BuiltinAssign: "__builtin_assign",
        ComptimeErrorChecking: "__comptime_error_checking",
        NoComptimeChecking: "__no_comptime_checking",
        NoRuntimeEmit: "__no_runtime_emit",
        MaybeUnused: "maybe_unused",
        Extern: "extern",
    }
}

/// Construct the initial name -> `IntrinsicKind` table used to seed the
/// resolver's global scope before any user declarations are processed.
#[must_use]
pub fn make_intrinsic_names() -> hashbrown::HashMap<Symbol, IntrinsicKind> {
    let mut names = hashbrown::HashMap::new();
    IntrinsicKind::scan(|kind, spelling| {
        names.insert(intern(spelling), kind);
    });
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_symbol() {
        let sym = intern("is_trivial");
        assert_eq!(IntrinsicKind::from_symbol(sym), Some(IntrinsicKind::IsTrivial));
        assert_eq!(IntrinsicKind::IsTrivial.as_symbol(), sym);
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(IntrinsicKind::from_str("not_a_real_intrinsic"), None);
    }

    #[test]
    fn attribute_lookup() {
        assert_eq!(AttributeKind::from_str("symbol_name"), Some(AttributeKind::SymbolName));
        assert_eq!(AttributeKind::from_str("extern"), Some(AttributeKind::Extern));
    }
}
