//! Generic specialization and memoization (§4.R "Generic specialization").

use crate::symbol::Symbol;
use crate::types::decl::{Decl, DeclId, FunctionFlags, ResolveState};
use crate::types::typespec::{Terminator, Typespec};
use crate::types::Arena;
use hashbrown::HashMap;

/// Memoizes `(template, concrete_param_types) -> specialized_decl` so two
/// call sites instantiating the same generic with the same argument types
/// share one specialized body (§4.R: "identical instantiations share one
/// specialized body").
#[derive(Default)]
pub struct GenericCache {
    memo: HashMap<(DeclId, Vec<Typespec>), DeclId>,
}

impl GenericCache {
    #[must_use]
    pub fn new() -> Self {
        GenericCache::default()
    }

    /// Returns the existing specialization for `(template, args)` if one was
    /// already created, cloning and substituting a fresh one into `arena`
    /// otherwise.
    pub fn get_or_create(&mut self, arena: &mut Arena<DeclId, Decl>, template: DeclId, args: Vec<Typespec>) -> DeclId {
        let key = (template, args);
        if let Some(&existing) = self.memo.get(&key) {
            return existing;
        }
        let (_, args) = (key.0, key.1.clone());
        let mut specialized = specialize(arena.get(template), &args);
        if let Decl::Function(f) | Decl::Operator { body: f, .. } = &mut specialized {
            f.generic_parent = Some(template);
        }
        let new_id = arena.push(specialized);
        if let Decl::Function(f) | Decl::Operator { body: f, .. } = arena.get_mut(template) {
            f.generic_specializations.push(new_id);
        }
        self.memo.insert(key, new_id);
        new_id
    }
}

/// Clones `template`'s body and substitutes each parameter's declared type,
/// and any `GenericParam(name)` occurrence in the return type, with the
/// corresponding concrete type in `args`, positionally (§4.R: a generic
/// parameter's declared type is itself the placeholder substituted at
/// specialization time). A `typeof <param>` return type is left as-is here
/// — it's resolved once the specialization's own `resolve_parameters` stage
/// can look the named sibling parameter's now-concrete type up.
fn specialize(template: &Decl, args: &[Typespec]) -> Decl {
    let Decl::Function(body) | Decl::Operator { body, .. } = template else {
        panic!("generic specialization target must be a function or operator");
    };
    let mut specialized = body.clone();

    let mut by_name: HashMap<Symbol, Typespec> = HashMap::new();
    for (param, concrete) in specialized.params.iter().zip(args) {
        if let Terminator::GenericParam(name) = &param.ty.terminator {
            by_name.insert(*name, concrete.clone());
        }
    }

    for (param, concrete) in specialized.params.iter_mut().zip(args) {
        param.ty = concrete.clone();
    }

    if let Terminator::GenericParam(name) = &specialized.return_type.terminator {
        if let Some(concrete) = by_name.get(name) {
            specialized.return_type = concrete.clone();
        }
    }

    specialized.body = None;
    specialized.flags.remove(FunctionFlags::GENERIC);
    specialized.flags.insert(FunctionFlags::GENERIC_SPECIALIZATION);
    specialized.generic_specializations.clear();
    // The template's own resolve_all already ran (and reached `All`, since
    // a generic body is never actually entered), so a fresh clone must be
    // reset or the specialization's own resolve_all call is a no-op.
    specialized.resolve_state = ResolveState::None;
    specialized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::TokenRange;
    use crate::symbol::intern;
    use crate::types::decl::FunctionBody;
    use crate::types::typespec::{Arg, CallingConvention};

    fn template_fn() -> Decl {
        Decl::Function(FunctionBody {
            symbol_name: intern("identity"),
            params: vec![Arg { name: intern("x"), ty: Typespec::new(Terminator::Auto) }],
            return_type: Typespec::new(Terminator::Auto),
            cc: CallingConvention::Fast,
            body_tokens: Some(TokenRange::new(0, 0)),
            body: None,
            flags: FunctionFlags::GENERIC,
            generic_specializations: Vec::new(),
            generic_parent: None,
            constructor_or_destructor_of: None,
            attributes: Vec::new(),
            resolve_state: ResolveState::Symbol,
        })
    }

    /// `function pick<T>(x: T) -> T` — the explicit-`<T>` form, where the
    /// return type must be substituted by name, not position.
    fn named_generic_fn() -> Decl {
        Decl::Function(FunctionBody {
            symbol_name: intern("pick"),
            params: vec![Arg { name: intern("x"), ty: Typespec::new(Terminator::GenericParam(intern("T"))) }],
            return_type: Typespec::new(Terminator::GenericParam(intern("T"))),
            cc: CallingConvention::Fast,
            body_tokens: Some(TokenRange::new(0, 0)),
            body: None,
            flags: FunctionFlags::GENERIC,
            generic_specializations: Vec::new(),
            generic_parent: None,
            constructor_or_destructor_of: None,
            attributes: Vec::new(),
            resolve_state: ResolveState::All,
        })
    }

    #[test]
    fn specialization_substitutes_named_return_type() {
        let mut arena = Arena::new();
        let template = arena.push(named_generic_fn());
        let mut cache = GenericCache::new();
        let f64_ty = Typespec::new(Terminator::BaseType(intern("f64")));
        let id = cache.get_or_create(&mut arena, template, vec![f64_ty.clone()]);
        let Decl::Function(f) = arena.get(id) else { panic!("expected a function") };
        assert_eq!(f.return_type, f64_ty);
        assert_eq!(f.generic_parent, Some(template));
        assert_eq!(f.resolve_state, crate::types::decl::ResolveState::None);
    }

    #[test]
    fn same_arguments_share_one_specialization() {
        let mut arena = Arena::new();
        let template = arena.push(template_fn());
        let mut cache = GenericCache::new();
        let i32_ty = Typespec::new(Terminator::BaseType(intern("i32")));
        let a = cache.get_or_create(&mut arena, template, vec![i32_ty.clone()]);
        let b = cache.get_or_create(&mut arena, template, vec![i32_ty]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_arguments_create_distinct_specializations() {
        let mut arena = Arena::new();
        let template = arena.push(template_fn());
        let mut cache = GenericCache::new();
        let i32_ty = Typespec::new(Terminator::BaseType(intern("i32")));
        let f64_ty = Typespec::new(Terminator::BaseType(intern("f64")));
        let a = cache.get_or_create(&mut arena, template, vec![i32_ty]);
        let b = cache.get_or_create(&mut arena, template, vec![f64_ty]);
        assert_ne!(a, b);
    }
}
