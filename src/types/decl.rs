//! Declarations (§3 Declarations) and their three-stage resolution state
//! (§2 control flow, §4.R).

use crate::lexer::token::TokenRange;
use crate::mk_idx;
use crate::symbol::Symbol;
use crate::types::expr::{Expr, Stmt};
use crate::types::typespec::{Arg, CallingConvention, Typespec};
use bitflags::bitflags;

mk_idx! {
    /// Arena index for a declaration, stable for the whole compile (§5).
    pub struct DeclId;
}

/// Every declaration carries one of these states; requests that reference
/// an unresolved symbol push it onto the resolver's work queue, and
/// re-entry into a matching `resolving_*` state signals a cycle (§2, §4.R).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolveState {
    None,
    ResolvingParameters,
    Parameters,
    ResolvingSymbol,
    Symbol,
    ResolvingAll,
    All,
    Error,
}

impl ResolveState {
    #[must_use]
    pub fn is_resolving(self) -> bool {
        matches!(self, ResolveState::ResolvingParameters | ResolveState::ResolvingSymbol | ResolveState::ResolvingAll)
    }

    #[must_use]
    pub fn at_least(self, target: ResolveState) -> bool {
        self.rank() >= target.rank()
    }

    fn rank(self) -> u8 {
        match self {
            ResolveState::None => 0,
            ResolveState::ResolvingParameters => 1,
            ResolveState::Parameters => 2,
            ResolveState::ResolvingSymbol => 3,
            ResolveState::Symbol => 4,
            ResolveState::ResolvingAll => 5,
            ResolveState::All => 6,
            ResolveState::Error => 7,
        }
    }
}

bitflags! {
    /// Flags on a [`FunctionBody`] (§3 Declarations).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FunctionFlags: u32 {
        const INTRINSIC               = 1 << 0;
        const EXTERNAL_LINKAGE        = 1 << 1;
        const GENERIC                 = 1 << 2;
        const NO_COMPTIME_CHECKING    = 1 << 3;
        const BUILTIN_OPERATOR        = 1 << 4;
        const BUILTIN_ASSIGN          = 1 << 5;
        const GENERIC_SPECIALIZATION  = 1 << 6;
    }
}

/// Owns a function's parameters, return type, and (initially token-range,
/// later statement-list) body. Specialization bodies are owned by their
/// generic parent (§3 Declarations "Ownership").
#[derive(Clone, Debug)]
pub struct FunctionBody {
    pub symbol_name: Symbol,
    pub params: Vec<Arg>,
    pub return_type: Typespec,
    pub cc: CallingConvention,
    pub body_tokens: Option<TokenRange>,
    pub body: Option<Vec<Stmt>>,
    pub flags: FunctionFlags,
    pub generic_specializations: Vec<DeclId>,
    /// Back-pointer to the generic template this was instantiated from, if
    /// this is itself a `generic_specialization`.
    pub generic_parent: Option<DeclId>,
    /// Non-owning back-pointer: set when this function is the constructor
    /// or destructor of a struct/enum declaration.
    pub constructor_or_destructor_of: Option<DeclId>,
    pub attributes: Vec<Attribute>,
    pub resolve_state: ResolveState,
}

impl FunctionBody {
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.flags.contains(FunctionFlags::GENERIC)
    }

    #[must_use]
    pub fn is_intrinsic(&self) -> bool {
        self.flags.contains(FunctionFlags::INTRINSIC)
    }
}

/// Binary/unary operator this language allows overloading (a subset of
/// `TokenKind` restricted to the `*_overloadable` flagged tokens, §4.T).
pub type OperatorKind = crate::lexer::token::TokenKind;

/// `@name(arg₁, …)` written before a declaration (§4.R "Attribute
/// application"). Arguments are unresolved expressions until the resolver's
/// attribute stage folds them.
#[derive(Clone, Debug)]
pub struct Attribute {
    pub name: Symbol,
    pub args: Vec<Expr>,
    pub src_tokens: crate::diagnostics::SrcTokens,
}

#[derive(Clone, Debug)]
pub struct VariableDecl {
    pub name: Symbol,
    pub prototype_modifiers: TokenRange,
    pub var_type: Option<Typespec>,
    pub init_expr: Option<Expr>,
    /// Non-empty when this is a `let (a, b, c) = ...` destructuring binding.
    pub tuple_decls: Vec<VariableDecl>,
    pub is_mut: bool,
    pub is_consteval: bool,
    pub attributes: Vec<Attribute>,
    pub resolve_state: ResolveState,
}

#[derive(Clone, Debug)]
pub struct StructField {
    pub name: Symbol,
    pub ty: Typespec,
}

#[derive(Clone, Debug)]
pub struct TypeInfo {
    pub name: Symbol,
    pub fields: Vec<StructField>,
    /// Member functions parsed inside the struct body, not yet pushed into
    /// an arena. The resolver drains these on first registration, wiring
    /// `constructor`/`destructor` to the real `DeclId`s it creates.
    pub methods: Vec<FunctionBody>,
    pub constructor: Option<DeclId>,
    pub destructor: Option<DeclId>,
}

#[derive(Clone, Debug)]
pub struct EnumVariant {
    pub name: Symbol,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug)]
pub enum Decl {
    Variable(VariableDecl),
    Function(FunctionBody),
    Operator { kind: OperatorKind, body: FunctionBody },
    FunctionAlias { name: Symbol, target: DeclId },
    TypeAlias { name: Symbol, target: Typespec },
    Struct { name: Symbol, info: TypeInfo, resolve_state: ResolveState },
    Enum { name: Symbol, variants: Vec<EnumVariant>, underlying: Typespec, resolve_state: ResolveState },
    Import { name: Symbol, path: String },
}

impl Decl {
    #[must_use]
    pub fn resolve_state(&self) -> ResolveState {
        match self {
            Decl::Variable(v) => v.resolve_state,
            Decl::Function(f) | Decl::Operator { body: f, .. } => f.resolve_state,
            Decl::Struct { resolve_state, .. } | Decl::Enum { resolve_state, .. } => *resolve_state,
            Decl::FunctionAlias { .. } | Decl::TypeAlias { .. } | Decl::Import { .. } => ResolveState::All,
        }
    }

    pub fn set_resolve_state(&mut self, state: ResolveState) {
        match self {
            Decl::Variable(v) => v.resolve_state = state,
            Decl::Function(f) | Decl::Operator { body: f, .. } => f.resolve_state = state,
            Decl::Struct { resolve_state, .. } | Decl::Enum { resolve_state, .. } => *resolve_state = state,
            Decl::FunctionAlias { .. } | Decl::TypeAlias { .. } | Decl::Import { .. } => {}
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<Symbol> {
        match self {
            Decl::Variable(v) => Some(v.name),
            Decl::Function(f) => Some(f.symbol_name),
            Decl::Operator { .. } => None,
            Decl::FunctionAlias { name, .. } | Decl::TypeAlias { name, .. } | Decl::Struct { name, .. } | Decl::Enum { name, .. } | Decl::Import { name, .. } => Some(*name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_state_ordering() {
        assert!(ResolveState::All.at_least(ResolveState::Parameters));
        assert!(!ResolveState::Parameters.at_least(ResolveState::All));
        assert!(ResolveState::ResolvingSymbol.is_resolving());
        assert!(!ResolveState::Symbol.is_resolving());
    }
}
