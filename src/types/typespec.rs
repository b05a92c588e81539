//! `Typespec`: an ordered list of modifier nodes ending in a terminator
//! (§3 Typespec).

use crate::symbol::Symbol;
use smallvec::SmallVec;

/// One link in the modifier stack. Invariants enforced by construction
/// helpers below (§3): at most one outer `mut`/`const`/`consteval`;
/// references cannot appear under a modifier other than `optional`;
/// `Variadic` may only terminate a parameter type and only as the last
/// parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Modifier {
    Pointer,
    LvalueReference,
    MoveReference,
    AutoReference,
    AutoReferenceMut,
    Mut,
    Const,
    Consteval,
    Optional,
    Array(u64),
    ArraySlice,
    /// May only terminate a parameter type and only as the last parameter.
    Variadic,
}

impl Modifier {
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Modifier::LvalueReference | Modifier::MoveReference | Modifier::AutoReference | Modifier::AutoReferenceMut
        )
    }
}

/// A resolved field/parameter of a struct or function type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Arg {
    pub name: Symbol,
    pub ty: Typespec,
}

/// One case of an inline `enum(decl*)` terminator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumCase {
    pub name: Symbol,
    pub value: Option<i64>,
}

/// Calling convention, written after `function` per §6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    C,
    Fast,
    Std,
}

/// An unresolved span of tokens the parser could not yet interpret as a
/// type; stashed so the resolver can re-enter parsing once context (e.g. a
/// `typeof` target, or a generic parameter) is available.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnresolvedTokenRange {
    pub file_id: u32,
    pub begin: u32,
    pub end: u32,
}

/// The terminal node of a typespec's modifier stack.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Terminator {
    BaseType(Symbol),
    Void,
    Auto,
    Typename,
    Tuple(Vec<Typespec>),
    Enum(Vec<EnumCase>),
    Function { cc: CallingConvention, params: Vec<Typespec>, ret: Box<Typespec> },
    Unresolved(UnresolvedTokenRange),
    /// A named generic type parameter occurrence (e.g. the `T` in `<T>`),
    /// distinct from `Auto` so that distinct parameters (`T` vs `U`) keep
    /// their identity through specialization.
    GenericParam(Symbol),
    /// `typeof <identifier>` in typespec position: resolved against the
    /// named binding's declared type once that binding is itself resolved.
    Typeof(Symbol),
}

/// An ordered list of modifier nodes ending in a terminator (§3 Typespec).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Typespec {
    pub modifiers: SmallVec<[Modifier; 4]>,
    pub terminator: Terminator,
}

impl Typespec {
    #[must_use]
    pub fn new(terminator: Terminator) -> Self {
        Typespec { modifiers: SmallVec::new(), terminator }
    }

    #[must_use]
    pub fn void() -> Self {
        Typespec::new(Terminator::Void)
    }

    #[must_use]
    pub fn with_modifier(mut self, m: Modifier) -> Self {
        self.modifiers.insert(0, m);
        self
    }

    /// Innermost (i.e. closest to the terminator) modifier, the one most
    /// recently applied.
    #[must_use]
    pub fn outer_modifier(&self) -> Option<&Modifier> {
        self.modifiers.first()
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.outer_modifier(), Some(m) if m.is_reference())
    }

    #[must_use]
    pub fn is_mut(&self) -> bool {
        matches!(self.outer_modifier(), Some(Modifier::Mut))
    }

    #[must_use]
    pub fn is_const(&self) -> bool {
        matches!(self.outer_modifier(), Some(Modifier::Const))
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self.outer_modifier(), Some(Modifier::Optional))
    }

    /// Strips a single outer reference modifier, if present, returning the
    /// pointee type (used by match-expression-to-type, §4.R, when binding a
    /// value to a non-reference parameter).
    #[must_use]
    pub fn without_outer_reference(&self) -> Typespec {
        if self.is_reference() {
            Typespec { modifiers: self.modifiers[1..].into(), terminator: self.terminator.clone() }
        } else {
            self.clone()
        }
    }

    /// Validates the structural invariants from §3:
    /// - at most one outer mut/const/consteval
    /// - references cannot appear under a modifier other than `optional`
    /// - `variadic` only as the last parameter position (checked by caller)
    #[must_use]
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        let mut seen_qualifier = false;
        for (i, m) in self.modifiers.iter().enumerate() {
            match m {
                Modifier::Mut | Modifier::Const | Modifier::Consteval => {
                    if i != 0 {
                        return Err("mut/const/consteval must be the outermost modifier");
                    }
                    if seen_qualifier {
                        return Err("at most one outer mut/const/consteval modifier is allowed");
                    }
                    seen_qualifier = true;
                }
                m if m.is_reference() => {
                    if i != 0 && !matches!(self.modifiers[i - 1], Modifier::Optional) {
                        return Err("references cannot appear under a modifier other than optional");
                    }
                    let _ = m;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_mut_rejected() {
        let ty = Typespec::new(Terminator::Void).with_modifier(Modifier::Mut).with_modifier(Modifier::Mut);
        assert!(ty.check_invariants().is_err());
    }

    #[test]
    fn reference_under_optional_allowed() {
        let ty = Typespec::new(Terminator::Void)
            .with_modifier(Modifier::LvalueReference)
            .with_modifier(Modifier::Optional);
        assert!(ty.check_invariants().is_ok());
    }

    #[test]
    fn reference_under_pointer_rejected() {
        let ty = Typespec::new(Terminator::Void)
            .with_modifier(Modifier::LvalueReference)
            .with_modifier(Modifier::Pointer);
        assert!(ty.check_invariants().is_err());
    }
}
