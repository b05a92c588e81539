//! `Expression`: the sum of `unresolved | constant | dynamic | error`
//! (§3 Expression).

use crate::diagnostics::SrcTokens;
use crate::lexer::token::{TokenKind, TokenRange};
use crate::symbol::Symbol;
use crate::types::constant_value::ConstantValue;
use crate::types::decl::DeclId;
use crate::types::typespec::Typespec;
use smallvec::SmallVec;

/// How deeply nested in parentheses an expression is: `0`, `1`, or `>=2`,
/// used to suppress warnings nested deep in parenthesised sub-expressions
/// (§3, §7). Stored saturating at 2 since the suppression rule never needs
/// to distinguish 2 from 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParenLevel(pub u32);

impl ParenLevel {
    pub const NONE: ParenLevel = ParenLevel(0);

    #[must_use]
    pub fn wrap(self) -> Self {
        ParenLevel((self.0 + 1).min(2))
    }
}

/// §3 Expression-type-kind. Governs how an expression participates in
/// binding, temporaries, and unification (`noreturn` unifies with
/// anything).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprTypeKind {
    Lvalue,
    LvalueReference,
    Rvalue,
    RvalueReference,
    MovedLvalue,
    TypeName,
    IntegerLiteral,
    EnumLiteral,
    FunctionName,
    OverloadSet,
    None,
    Noreturn,
    SwitchExpr,
    IfExpr,
    Tuple,
}

impl ExprTypeKind {
    /// An `lvalue` binds by reference; `rvalue` materialises a temporary;
    /// `moved_lvalue` transfers ownership (§3).
    #[must_use]
    pub fn binds_by_reference(self) -> bool {
        matches!(self, ExprTypeKind::Lvalue | ExprTypeKind::LvalueReference)
    }

    #[must_use]
    pub fn is_rvalue(self) -> bool {
        matches!(self, ExprTypeKind::Rvalue | ExprTypeKind::RvalueReference)
    }
}

/// Binary operator discriminant, drawn from the punctuation/keyword tokens
/// that are binary-overloadable (§4.T `binary_overloadable`).
pub type BinOp = TokenKind;
/// Unary operator discriminant, drawn from the unary-overloadable tokens.
pub type UnOp = TokenKind;

/// One case of a `switch` expression.
#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub pattern: ConstantValue,
    pub body: Box<Expr>,
}

/// The large sum making up an expression's dynamic payload (§3 Expression).
#[derive(Clone, Debug)]
pub enum ExprKind {
    Identifier(Symbol),
    Literal(ConstantValue),
    Tuple(Vec<Expr>),
    UnaryOp(UnOp, Box<Expr>),
    BinaryOp(BinOp, Box<Expr>, Box<Expr>),
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Cast { expr: Box<Expr>, target: Box<Typespec> },
    Subscript { base: Box<Expr>, index: Box<Expr> },
    MemberAccess { base: Box<Expr>, member: Symbol },
    Compound(Vec<Stmt>),
    If { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Option<Box<Expr>> },
    Switch { scrutinee: Box<Expr>, cases: Vec<SwitchCase>, default: Option<Box<Expr>> },
    Break { label: Option<Symbol>, value: Option<Box<Expr>> },
    Continue { label: Option<Symbol> },
    AggregateInit { ty: Box<Typespec>, fields: Vec<Expr> },
    AggregateDefaultConstruct(Box<Typespec>),
    AggregateCopyConstruct(Box<Expr>),
    OptionalDefaultConstruct(Box<Typespec>),
    OptionalExtractValue(Box<Expr>),
    ArrayDestruct { value: Box<Expr>, bindings: SmallVec<[Symbol; 4]> },
    TrivialRelocate(Box<Expr>),
    BitcodeValueReference(Symbol),
}

/// An expression's typed classification plus payload. `Unresolved` holds a
/// raw token range before the resolver runs; `Constant` additionally caches
/// a folded `ConstantValue`; `Dynamic` has no folded value; `Error` marks a
/// node the resolver gave up on (§3, §7 "mark the offending node `error`").
#[derive(Clone, Debug)]
pub enum ExprPayload {
    Unresolved(TokenRange),
    Constant { ty: Box<Typespec>, type_kind: ExprTypeKind, kind: Box<ExprKind>, value: Box<ConstantValue> },
    Dynamic { ty: Box<Typespec>, type_kind: ExprTypeKind, kind: Box<ExprKind> },
    Error,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub payload: ExprPayload,
    pub src_tokens: SrcTokens,
    pub paren_level: ParenLevel,
}

impl Expr {
    #[must_use]
    pub fn error(src_tokens: SrcTokens) -> Self {
        Expr { payload: ExprPayload::Error, src_tokens, paren_level: ParenLevel::NONE }
    }

    #[must_use]
    pub fn unresolved(range: TokenRange, src_tokens: SrcTokens) -> Self {
        Expr { payload: ExprPayload::Unresolved(range), src_tokens, paren_level: ParenLevel::NONE }
    }

    #[must_use]
    pub fn dynamic(ty: Typespec, type_kind: ExprTypeKind, kind: ExprKind, src_tokens: SrcTokens) -> Self {
        Expr {
            payload: ExprPayload::Dynamic { ty: Box::new(ty), type_kind, kind: Box::new(kind) },
            src_tokens,
            paren_level: ParenLevel::NONE,
        }
    }

    #[must_use]
    pub fn constant(ty: Typespec, type_kind: ExprTypeKind, kind: ExprKind, value: ConstantValue, src_tokens: SrcTokens) -> Self {
        Expr {
            payload: ExprPayload::Constant { ty: Box::new(ty), type_kind, kind: Box::new(kind), value: Box::new(value) },
            src_tokens,
            paren_level: ParenLevel::NONE,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.payload, ExprPayload::Error)
    }

    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self.payload, ExprPayload::Unresolved(_))
    }

    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self.payload, ExprPayload::Constant { .. })
    }

    /// §8 "Type preservation": non-empty iff `e` is not `error`.
    #[must_use]
    pub fn get_expr_type(&self) -> Option<&Typespec> {
        match &self.payload {
            ExprPayload::Constant { ty, .. } | ExprPayload::Dynamic { ty, .. } => Some(ty),
            ExprPayload::Unresolved(_) | ExprPayload::Error => None,
        }
    }

    #[must_use]
    pub fn type_kind(&self) -> Option<ExprTypeKind> {
        match &self.payload {
            ExprPayload::Constant { type_kind, .. } | ExprPayload::Dynamic { type_kind, .. } => Some(*type_kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn constant_value(&self) -> Option<&ConstantValue> {
        match &self.payload {
            ExprPayload::Constant { value, .. } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<&ExprKind> {
        match &self.payload {
            ExprPayload::Constant { kind, .. } | ExprPayload::Dynamic { kind, .. } => Some(kind),
            _ => None,
        }
    }

    #[must_use]
    pub fn with_paren_wrap(mut self) -> Self {
        self.paren_level = self.paren_level.wrap();
        self
    }
}

/// A local-scope statement. At global/struct-body scope, the parser instead
/// produces [`crate::types::decl::Decl`] nodes; these are exclusively the
/// statements available inside a function body (§4.P).
#[derive(Clone, Debug)]
pub enum Stmt {
    Expr(Expr),
    Let { pattern: Pattern, ty: Option<Typespec>, init: Option<Expr> },
    While { cond: Expr, body: Box<Stmt> },
    For { init: Option<Box<Stmt>>, cond: Option<Expr>, step: Option<Expr>, body: Box<Stmt> },
    Foreach { binding: Symbol, range: Expr, body: Box<Stmt> },
    Return(Option<Expr>),
    Defer(Expr),
    StaticAssert { cond: Expr, message: Option<Expr>, src_tokens: SrcTokens },
    Block(Vec<Stmt>),
    /// A local declaration (functions/types can be declared inside a block
    /// in this language, desugaring identically to file scope, §4.P).
    Decl(Box<crate::types::decl::Decl>),
}

/// A (possibly destructuring) binding pattern for `let`.
#[derive(Clone, Debug)]
pub enum Pattern {
    Name(Symbol),
    Tuple(Vec<Pattern>),
    Wildcard,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st() -> SrcTokens {
        SrcTokens::point(0, 0)
    }

    #[test]
    fn error_expression_has_no_type() {
        let e = Expr::error(st());
        assert!(e.get_expr_type().is_none());
    }

    #[test]
    fn dynamic_expression_has_a_type() {
        let e = Expr::dynamic(Typespec::void(), ExprTypeKind::Rvalue, ExprKind::Literal(ConstantValue::Void), st());
        assert!(e.get_expr_type().is_some());
    }

    #[test]
    fn paren_level_saturates_at_two() {
        let p = ParenLevel::NONE.wrap().wrap().wrap();
        assert_eq!(p.0, 2);
    }
}
