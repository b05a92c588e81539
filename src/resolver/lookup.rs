//! Scope and identifier lookup (§4.R "Scope and identifier lookup").
//!
//! Thin wrapper over [`ScopeTree::lookup`]/[`ScopeTree::lookup_qualified`]
//! that turns a miss into a diagnostic and a hit into the
//! [`ExprKind`]/[`ExprTypeKind`] pair the resolver stamps onto an
//! `Identifier` expression.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, SrcTokens};
use crate::symbol::Symbol;
use crate::types::decl::{Decl, DeclId};
use crate::types::expr::ExprTypeKind;
use crate::types::scope::{LookupResult, ScopeId, ScopeTree};
use crate::types::{Arena, Idx};
use smallvec::SmallVec;

/// What an `Identifier` expression resolves to, reduced to the three shapes
/// the expression-retyping code needs to act on.
pub enum Resolved {
    Variable(DeclId),
    TypeAlias(DeclId),
    Function(SmallVec<[DeclId; 4]>),
}

impl Resolved {
    #[must_use]
    pub fn type_kind(&self) -> ExprTypeKind {
        match self {
            Resolved::Variable(_) => ExprTypeKind::Lvalue,
            Resolved::TypeAlias(_) => ExprTypeKind::TypeName,
            Resolved::Function(fns) if fns.len() == 1 => ExprTypeKind::FunctionName,
            Resolved::Function(_) => ExprTypeKind::OverloadSet,
        }
    }
}

/// Locally-then-globally resolve a bare name from `scope` (§4.R).
pub fn lookup_name(scopes: &ScopeTree, scope: ScopeId, name: Symbol, src: SrcTokens, sink: &mut DiagnosticSink) -> Option<Resolved> {
    match scopes.lookup(scope, name) {
        Some(LookupResult::Variable(id)) => Some(Resolved::Variable(id)),
        Some(LookupResult::TypeAlias(id)) => Some(Resolved::TypeAlias(id)),
        Some(LookupResult::SingleFunction(id)) => Some(Resolved::Function(SmallVec::from_slice(&[id]))),
        Some(LookupResult::Overloads(ids)) => Some(Resolved::Function(ids)),
        Some(LookupResult::Namespace(_)) => {
            sink.report(Diagnostic::new(DiagnosticKind::UnresolvedName { name: name.as_str().to_owned() }, src));
            None
        }
        None => {
            sink.report(Diagnostic::new(DiagnosticKind::UnresolvedName { name: name.as_str().to_owned() }, src));
            None
        }
    }
}

/// Qualified lookup `ns::x::y` (§4.R "Globally": "qualified identifiers
/// traverse namespace chains").
pub fn lookup_qualified(scopes: &ScopeTree, scope: ScopeId, path: &[Symbol], src: SrcTokens, sink: &mut DiagnosticSink) -> Option<Resolved> {
    match scopes.lookup_qualified(scope, path) {
        Some(LookupResult::Variable(id)) => Some(Resolved::Variable(id)),
        Some(LookupResult::TypeAlias(id)) => Some(Resolved::TypeAlias(id)),
        Some(LookupResult::SingleFunction(id)) => Some(Resolved::Function(SmallVec::from_slice(&[id]))),
        Some(LookupResult::Overloads(ids)) => Some(Resolved::Function(ids)),
        _ => {
            let joined = path.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("::");
            sink.report(Diagnostic::new(DiagnosticKind::UnresolvedName { name: joined }, src));
            None
        }
    }
}

/// Universal-function-call rewrite (§4.R "Overload resolution": `a.f(b, …)`
/// becomes a plain call to `f` with `a` prepended). Returns the candidate
/// set for `member` visible from `scope`, without touching `base`; the
/// caller prepends it to the argument list itself.
#[must_use]
pub fn lookup_method_candidates(scopes: &ScopeTree, scope: ScopeId, member: Symbol) -> SmallVec<[DeclId; 4]> {
    match scopes.lookup(scope, member) {
        Some(LookupResult::SingleFunction(id)) => SmallVec::from_slice(&[id]),
        Some(LookupResult::Overloads(ids)) => ids,
        _ => SmallVec::new(),
    }
}

/// Diagnoses a same-scope name collision (§4.R "Collisions at the same
/// scope are reported"). Call sites look up the existing binding before
/// inserting a new one with the same name and the same kind.
pub fn report_collision(name: Symbol, first: DeclId, second: DeclId, arena: &Arena<DeclId, Decl>, src: SrcTokens, sink: &mut DiagnosticSink) {
    let _ = (arena, first, second);
    sink.report(Diagnostic::new(
        DiagnosticKind::AmbiguousName { name: name.as_str().to_owned(), candidates: vec![format!("{first:?}"), format!("{second:?}")] },
        src,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::intern;
    use crate::types::scope::ScopeKind;

    #[test]
    fn unresolved_name_reports_a_diagnostic() {
        let scopes = ScopeTree::new();
        let mut sink = DiagnosticSink::new();
        let src = SrcTokens::point(0, 0);
        let r = lookup_name(&scopes, scopes.global.unwrap(), intern("missing"), src, &mut sink);
        assert!(r.is_none());
        assert!(sink.has_errors());
    }

    #[test]
    fn variable_found_locally_shadows_global() {
        let mut scopes = ScopeTree::new();
        let global = scopes.global.unwrap();
        let file = scopes.push_scope(ScopeKind::File { file_id: 0 }, global);
        let name = intern("x");
        let id = DeclId::from_usize(0);
        scopes.get_mut(file).decls.var_decls.insert(name, id);
        let mut sink = DiagnosticSink::new();
        match lookup_name(&scopes, file, name, SrcTokens::point(0, 0), &mut sink) {
            Some(Resolved::Variable(found)) => assert_eq!(found, id),
            _ => panic!("expected a variable"),
        }
    }
}
