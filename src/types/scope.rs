//! Scopes (§3 Scopes): a `DeclSet` groups variables/types/function overload
//! sets/operator overload sets; scopes form a stack for local resolution and
//! a tree of `global_scope -> file_scopes -> namespace_scopes`.

use crate::symbol::Symbol;
use crate::types::decl::{DeclId, OperatorKind};
use hashbrown::HashMap;
use smallvec::SmallVec;

/// What a name looked up in a scope can resolve to (§4.R "Scope and
/// identifier lookup": "a single variable, a type alias, a single function,
/// a set of overloads, or a namespace").
#[derive(Clone, Debug)]
pub enum LookupResult {
    Variable(DeclId),
    TypeAlias(DeclId),
    SingleFunction(DeclId),
    Overloads(SmallVec<[DeclId; 4]>),
    Namespace(ScopeId),
}

crate::mk_idx! {
    pub struct ScopeId;
}

/// Groups `var_decls`, `types`, `func_sets[name -> bodies]`,
/// `op_sets[op-kind -> bodies]` for one scope (§3 Scopes).
#[derive(Default, Debug)]
pub struct DeclSet {
    pub var_decls: HashMap<Symbol, DeclId>,
    pub types: HashMap<Symbol, DeclId>,
    pub func_sets: HashMap<Symbol, SmallVec<[DeclId; 4]>>,
    pub op_sets: HashMap<OperatorKind, SmallVec<[DeclId; 4]>>,
    /// Declarations re-exported by `export`, spliced into an importer's
    /// scope via `import` (§3 Scopes: "Imports splice another file's
    /// export_decls into the current scope").
    pub export_decls: Vec<DeclId>,
}

impl DeclSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, name: Symbol, id: DeclId) {
        self.func_sets.entry(name).or_default().push(id);
    }

    pub fn add_operator(&mut self, kind: OperatorKind, id: DeclId) {
        self.op_sets.entry(kind).or_default().push(id);
    }

    #[must_use]
    pub fn lookup(&self, name: Symbol) -> Option<LookupResult> {
        if let Some(&id) = self.var_decls.get(&name) {
            return Some(LookupResult::Variable(id));
        }
        if let Some(&id) = self.types.get(&name) {
            return Some(LookupResult::TypeAlias(id));
        }
        if let Some(fns) = self.func_sets.get(&name) {
            return Some(if fns.len() == 1 {
                LookupResult::SingleFunction(fns[0])
            } else {
                LookupResult::Overloads(fns.clone())
            });
        }
        None
    }
}

/// A kind of scope in the `global_scope -> file_scopes -> namespace_scopes`
/// tree, plus the local-resolution stack nested inside function bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    File { file_id: u32 },
    Namespace { name: Symbol },
    StructBody,
    Local,
}

pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub decls: DeclSet,
    pub children: Vec<ScopeId>,
    /// Files imported directly into this scope (§3 Scopes, §6 `add_import`).
    pub imports: Vec<ScopeId>,
}

impl Scope {
    #[must_use]
    pub fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Scope { kind, parent, decls: DeclSet::new(), children: Vec::new(), imports: Vec::new() }
    }
}

/// Owns every scope in a compile and provides the local-then-global lookup
/// protocol from §4.R.
#[derive(Default)]
pub struct ScopeTree {
    scopes: crate::types::Arena<ScopeId, Scope>,
    pub global: Option<ScopeId>,
}

impl ScopeTree {
    #[must_use]
    pub fn new() -> Self {
        let mut tree = ScopeTree { scopes: crate::types::Arena::new(), global: None };
        let global = tree.scopes.push(Scope::new(ScopeKind::Global, None));
        tree.global = Some(global);
        tree
    }

    pub fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = self.scopes.push(Scope::new(kind, Some(parent)));
        self.scopes.get_mut(parent).children.push(id);
        id
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> &Scope {
        self.scopes.get(id)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.scopes.get_mut(id)
    }

    /// Walks `scope_decls` from innermost outward; first match wins (§4.R
    /// "Locally"). Then, at the boundary of local scopes, falls through to
    /// the file scope, the file's imports, and finally the global scope
    /// (§4.R "Globally").
    #[must_use]
    pub fn lookup(&self, mut scope: ScopeId, name: Symbol) -> Option<LookupResult> {
        let mut visited = Vec::new();
        loop {
            visited.push(scope);
            let s = self.get(scope);
            if let Some(r) = s.decls.lookup(name) {
                return Some(r);
            }
            for &imp in &s.imports {
                if let Some(r) = self.get(imp).decls.lookup(name) {
                    return Some(r);
                }
            }
            match s.parent {
                Some(p) => scope = p,
                None => return None,
            }
        }
    }

    /// Qualified lookup `ns::x`: traverses a chain of namespace scopes
    /// starting from `scope`, resolving each segment via plain lookup
    /// within the previous segment's namespace scope (§4.R "Globally").
    #[must_use]
    pub fn lookup_qualified(&self, mut scope: ScopeId, path: &[Symbol]) -> Option<LookupResult> {
        let (last, init) = path.split_last()?;
        for seg in init {
            match self.get(scope).decls.lookup(*seg) {
                Some(LookupResult::Namespace(ns)) => scope = ns,
                _ => return None,
            }
        }
        self.get(scope).decls.lookup(*last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::intern;
    use crate::types::Idx;

    #[test]
    fn local_scope_shadows_outer() {
        let mut tree = ScopeTree::new();
        let global = tree.global.unwrap();
        let file = tree.push_scope(ScopeKind::File { file_id: 0 }, global);
        let local = tree.push_scope(ScopeKind::Local, file);
        let name = intern("x");
        let outer_decl = DeclId::from_usize(0);
        let inner_decl = DeclId::from_usize(1);
        tree.get_mut(file).decls.var_decls.insert(name, outer_decl);
        tree.get_mut(local).decls.var_decls.insert(name, inner_decl);
        match tree.lookup(local, name) {
            Some(LookupResult::Variable(id)) => assert_eq!(id, inner_decl),
            other => panic!("expected inner variable, got {other:?}"),
        }
    }
}
