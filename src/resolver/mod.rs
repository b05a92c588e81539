//! The resolver (§4.R): drives the three-stage per-declaration protocol,
//! retypes the parser's `untyped()` placeholders, and desugars `foreach`.

pub mod attributes;
pub mod generics;
pub mod lookup;
pub mod overload;

use crate::config::TargetProperties;
use crate::consteval::{self, EvalContext};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, SrcTokens};
use crate::lexer::token::{Token, TokenRange};
use crate::parser::stmt_parser;
use crate::symbol::{intern, Symbol};
use crate::types::constant_value::ConstantValue;
use crate::types::decl::{Decl, DeclId, FunctionBody, ResolveState, VariableDecl};
use crate::types::expr::{Expr, ExprKind, ExprPayload, ExprTypeKind, Pattern, Stmt};
use crate::types::scope::{ScopeId, ScopeKind, ScopeTree};
use crate::types::typespec::{Modifier, Terminator, Typespec};
use crate::types::Arena;
use generics::GenericCache;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Owns every arena, scope, and per-file token buffer live for one compile
/// (§5: "Arenas are per-instance"). Declarations are resolved lazily, on
/// first reference, via [`Resolver::resolve_all`].
pub struct Resolver {
    pub arena: Arena<DeclId, Decl>,
    pub scopes: ScopeTree,
    /// Handed down from the driver via `set_target_properties` (§6); governs
    /// integer widths and endianness for consteval folding.
    pub target: TargetProperties,
    generics: GenericCache,
    tokens: HashMap<u32, Vec<Token>>,
    decl_file: HashMap<DeclId, u32>,
    /// Currently-resolving declarations, innermost last; used to detect and
    /// report circular dependencies (§4.R "Circular-dependency detection").
    stack: Vec<DeclId>,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver {
            arena: Arena::new(),
            scopes: ScopeTree::new(),
            target: TargetProperties::host(),
            generics: GenericCache::new(),
            tokens: HashMap::new(),
            decl_file: HashMap::new(),
            stack: Vec::new(),
        }
    }
}

impl Resolver {
    #[must_use]
    pub fn new() -> Self {
        Resolver::default()
    }

    pub fn set_target(&mut self, target: TargetProperties) {
        self.target = target;
    }

    fn eval_context(&self) -> EvalContext<'_> {
        EvalContext { arena: &self.arena, target: self.target }
    }

    /// Opportunistic constant folding after an expression's type is known
    /// (§4.C "Every node after resolution"): promotes a `Dynamic` payload to
    /// `Constant` whenever its sub-values already fold.
    fn try_fold(&self, expr: &mut Expr) {
        if !matches!(expr.payload, ExprPayload::Dynamic { .. }) {
            return;
        }
        let ctx = self.eval_context();
        let Some(value) = consteval::consteval_guaranteed(expr, &ctx) else { return };
        let ExprPayload::Dynamic { ty, type_kind, kind } = std::mem::replace(&mut expr.payload, ExprPayload::Error) else {
            unreachable!("just matched Dynamic above")
        };
        expr.payload = ExprPayload::Constant { ty, type_kind, kind, value: Box::new(value) };
    }

    /// Pushes one file's top-level declarations into the arena and a fresh
    /// file scope, reporting same-scope name collisions (§4.R "Scope and
    /// identifier lookup"). Returns the new scope and the declarations'
    /// arena ids, in source order.
    pub fn register_file(&mut self, file_id: u32, tokens: Vec<Token>, decls: Vec<Decl>, sink: &mut DiagnosticSink) -> (ScopeId, Vec<DeclId>) {
        let global = self.scopes.global.expect("global scope always exists");
        let file_scope = self.scopes.push_scope(ScopeKind::File { file_id }, global);
        self.tokens.insert(file_id, tokens);
        let mut ids = Vec::with_capacity(decls.len());
        for decl in decls {
            let id = self.arena.push(decl);
            self.decl_file.insert(id, file_id);
            self.register_name(file_scope, id, sink);
            ids.push(id);
        }
        (file_scope, ids)
    }

    fn register_name(&mut self, scope: ScopeId, id: DeclId, sink: &mut DiagnosticSink) {
        let decl = self.arena.get(id);
        match decl {
            Decl::Function(f) => {
                let name = f.symbol_name;
                self.scopes.get_mut(scope).decls.add_function(name, id);
            }
            Decl::Operator { kind, .. } => {
                let kind = *kind;
                self.scopes.get_mut(scope).decls.add_operator(kind, id);
            }
            Decl::Variable(v) => {
                let name = v.name;
                if let Some(&existing) = self.scopes.get(scope).decls.var_decls.get(&name) {
                    lookup::report_collision(name, existing, id, &self.arena, SrcTokens::point(0, 0), sink);
                } else {
                    self.scopes.get_mut(scope).decls.var_decls.insert(name, id);
                }
            }
            Decl::Struct { .. } => self.register_struct(scope, id),
            Decl::Enum { name, .. } | Decl::TypeAlias { name, .. } => {
                let name = *name;
                self.scopes.get_mut(scope).decls.types.insert(name, id);
            }
            Decl::FunctionAlias { name, .. } => {
                let name = *name;
                self.scopes.get_mut(scope).decls.add_function(name, id);
            }
            Decl::Import { .. } => {}
        }
    }

    /// Drains a just-parsed struct's member functions into real arena
    /// entries, classifying the constructor/destructor by name (§4.R:
    /// struct bodies are parsed before an arena exists to push them into).
    fn register_struct(&mut self, scope: ScopeId, id: DeclId) {
        let (name, methods) = match self.arena.get_mut(id) {
            Decl::Struct { name, info, .. } => (*name, std::mem::take(&mut info.methods)),
            _ => return,
        };
        self.scopes.get_mut(scope).decls.types.insert(name, id);
        let file_id = self.decl_file.get(&id).copied().unwrap_or(0);
        let mut constructor = None;
        let mut destructor = None;
        for mut method in methods {
            let symbol_name = method.symbol_name;
            method.constructor_or_destructor_of = Some(id);
            let method_id = self.arena.push(Decl::Function(method));
            self.decl_file.insert(method_id, file_id);
            self.scopes.get_mut(scope).decls.add_function(symbol_name, method_id);
            if symbol_name == name {
                constructor = Some(method_id);
            } else if symbol_name.as_str().starts_with('~') {
                destructor = Some(method_id);
            }
        }
        if let Decl::Struct { info, .. } = self.arena.get_mut(id) {
            info.constructor = constructor;
            info.destructor = destructor;
        }
    }

    fn enters_cycle(&mut self, id: DeclId, target: ResolveState, sink: &mut DiagnosticSink) -> bool {
        let state = self.arena.get(id).resolve_state();
        if state.at_least(target) {
            return true;
        }
        if state.is_resolving() || self.stack.contains(&id) {
            let chain: Vec<String> = self.stack.iter().map(|d| format!("{d:?}")).collect();
            sink.report(Diagnostic::new(DiagnosticKind::CircularDependency { chain }, SrcTokens::point(0, 0)));
            self.arena.get_mut(id).set_resolve_state(ResolveState::Error);
            return true;
        }
        false
    }

    /// Stage 1 (§4.R): validates parameter/field typespecs. Typespecs are
    /// built eagerly by the parser, so this stage is mostly a state
    /// transition, except for `typeof <param>` placeholders: those are
    /// substituted here, by looking the named sibling parameter up in the
    /// same (possibly already-specialized) parameter list.
    pub fn resolve_parameters(&mut self, id: DeclId, sink: &mut DiagnosticSink) {
        if self.enters_cycle(id, ResolveState::Parameters, sink) {
            return;
        }
        self.arena.get_mut(id).set_resolve_state(ResolveState::ResolvingParameters);
        self.stack.push(id);
        match self.arena.get_mut(id) {
            Decl::Function(f) => resolve_function_typeof(f),
            Decl::Operator { body, .. } => resolve_function_typeof(body),
            _ => {}
        }
        self.stack.pop();
        if self.arena.get(id).resolve_state() != ResolveState::Error {
            self.arena.get_mut(id).set_resolve_state(ResolveState::Parameters);
        }
    }

    /// Stage 2 (§4.R): registers the declaration's externally-visible
    /// signature. Scope registration already happened in [`Self::register_file`],
    /// so this mainly exists to order ahead of [`Self::resolve_all`].
    pub fn resolve_symbol(&mut self, id: DeclId, sink: &mut DiagnosticSink) {
        self.resolve_parameters(id, sink);
        if self.enters_cycle(id, ResolveState::Symbol, sink) {
            return;
        }
        self.arena.get_mut(id).set_resolve_state(ResolveState::ResolvingSymbol);
        self.stack.push(id);
        self.stack.pop();
        if self.arena.get(id).resolve_state() != ResolveState::Error {
            self.arena.get_mut(id).set_resolve_state(ResolveState::Symbol);
        }
    }

    /// Stage 3 (§4.R): resolves a function's body / a variable's
    /// initializer, retyping every expression along the way.
    pub fn resolve_all(&mut self, id: DeclId, scope: ScopeId, sink: &mut DiagnosticSink) {
        self.resolve_symbol(id, sink);
        if self.enters_cycle(id, ResolveState::All, sink) {
            return;
        }
        self.arena.get_mut(id).set_resolve_state(ResolveState::ResolvingAll);
        self.stack.push(id);

        let file_id = self.decl_file.get(&id).copied().unwrap_or(0);
        let mut decl = self.arena.get(id).clone();
        match &mut decl {
            Decl::Variable(v) => self.resolve_variable(v, scope, file_id, sink),
            Decl::Function(f) => self.resolve_function(id, f, scope, file_id, sink),
            Decl::Operator { body, .. } => self.resolve_function(id, body, scope, file_id, sink),
            Decl::Struct { info, .. } => {
                if let Some(ctor) = info.constructor {
                    self.resolve_all(ctor, scope, sink);
                }
                if let Some(dtor) = info.destructor {
                    self.resolve_all(dtor, scope, sink);
                }
            }
            Decl::TypeAlias { target, .. } => {
                if let Terminator::Typeof(name) = &target.terminator {
                    let name = *name;
                    match self.scopes.lookup(scope, name) {
                        Some(crate::types::scope::LookupResult::Variable(var_id)) => {
                            self.resolve_all(var_id, scope, sink);
                            if let Decl::Variable(v) = self.arena.get(var_id) {
                                if let Some(ty) = v.var_type.clone() {
                                    *target = ty;
                                }
                            }
                        }
                        _ => sink.report(Diagnostic::new(DiagnosticKind::UnresolvedName { name: name.as_str().to_owned() }, SrcTokens::point(file_id, 0))),
                    }
                }
            }
            Decl::Enum { .. } | Decl::FunctionAlias { .. } | Decl::Import { .. } => {}
        }
        *self.arena.get_mut(id) = decl;

        self.stack.pop();
        if self.arena.get(id).resolve_state() != ResolveState::Error {
            self.arena.get_mut(id).set_resolve_state(ResolveState::All);
        }
    }

    fn resolve_variable(&mut self, v: &mut VariableDecl, scope: ScopeId, file_id: u32, sink: &mut DiagnosticSink) {
        attributes::apply_to_variable(v, sink);
        let Some(init) = v.init_expr.as_mut() else { return };
        self.resolve_expr(init, scope, file_id, sink);
        match (&v.var_type, init.get_expr_type().cloned()) {
            (None, Some(ty)) => v.var_type = Some(ty),
            (Some(target), Some(ty)) => {
                let value = init.constant_value().cloned();
                let target = target.clone();
                let src = init.src_tokens;
                match overload::match_expression_to_type(&ty, value.as_ref(), &target) {
                    Some(score) => {
                        let old = std::mem::replace(init, Expr::error(src));
                        *init = overload::materialize_coercion(old, &target, score);
                    }
                    None => {
                        sink.report(Diagnostic::new(DiagnosticKind::TypeMismatch { expected: format!("{target:?}"), found: format!("{ty:?}") }, src));
                        *init = Expr::error(src);
                    }
                }
            }
            _ => {}
        }

        // `consteval x = ...` (or a `var_type` carrying a `consteval`
        // modifier) must be *forced* through the evaluator and diagnosed on
        // failure (§4.C entry-point table), not just opportunistically
        // folded the way every other initializer already was above.
        let forces = v.is_consteval || matches!(v.var_type.as_ref().and_then(Typespec::outer_modifier), Some(Modifier::Consteval));
        if forces && init.constant_value().is_none() {
            let ctx = self.eval_context();
            if let Some(value) = consteval::consteval_try(init, &ctx, sink) {
                if let ExprPayload::Dynamic { ty, type_kind, kind } = std::mem::replace(&mut init.payload, ExprPayload::Error) {
                    init.payload = ExprPayload::Constant { ty, type_kind, kind, value: Box::new(value) };
                }
            }
        }
    }

    fn resolve_function(&mut self, id: DeclId, f: &mut FunctionBody, scope: ScopeId, file_id: u32, sink: &mut DiagnosticSink) {
        attributes::apply_to_function(f, sink);
        if f.body.is_some() || f.is_generic() {
            return;
        }
        let Some(range) = f.body_tokens else { return };
        let Some(tokens) = self.tokens.get(&file_id).cloned() else { return };
        let mut stmts = stmt_parser::parse_function_body(&tokens, range, file_id, sink);

        let fn_scope = self.scopes.push_scope(ScopeKind::Local, scope);
        for p in &f.params {
            let pid = self.arena.push(Decl::Variable(VariableDecl {
                name: p.name,
                prototype_modifiers: TokenRange::new(0, 0),
                var_type: Some(p.ty.clone()),
                init_expr: None,
                tuple_decls: Vec::new(),
                is_mut: false,
                is_consteval: false,
                attributes: Vec::new(),
                resolve_state: ResolveState::All,
            }));
            self.decl_file.insert(pid, file_id);
            self.scopes.get_mut(fn_scope).decls.var_decls.insert(p.name, pid);
        }
        self.resolve_stmts(&mut stmts, fn_scope, file_id, &f.return_type.clone(), sink);
        f.body = Some(stmts);
        let _ = id;
    }

    fn resolve_stmts(&mut self, stmts: &mut [Stmt], scope: ScopeId, file_id: u32, return_type: &Typespec, sink: &mut DiagnosticSink) {
        for stmt in stmts {
            self.resolve_stmt(stmt, scope, file_id, return_type, sink);
        }
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt, scope: ScopeId, file_id: u32, return_type: &Typespec, sink: &mut DiagnosticSink) {
        match stmt {
            Stmt::Expr(e) => self.resolve_expr(e, scope, file_id, sink),
            Stmt::Let { pattern, ty, init } => {
                if let Some(init) = init.as_mut() {
                    self.resolve_expr(init, scope, file_id, sink);
                }
                let inferred = ty.clone().or_else(|| init.as_ref().and_then(|e| e.get_expr_type().cloned()));
                self.bind_pattern(pattern, inferred.as_ref(), scope, file_id);
            }
            Stmt::While { cond, body } => {
                self.resolve_expr(cond, scope, file_id, sink);
                self.check_bool(cond, sink);
                let inner = self.scopes.push_scope(ScopeKind::Local, scope);
                self.resolve_stmt(body, inner, file_id, return_type, sink);
            }
            Stmt::For { init, cond, step, body } => {
                let inner = self.scopes.push_scope(ScopeKind::Local, scope);
                if let Some(init) = init {
                    self.resolve_stmt(init, inner, file_id, return_type, sink);
                }
                if let Some(cond) = cond {
                    self.resolve_expr(cond, inner, file_id, sink);
                    self.check_bool(cond, sink);
                }
                if let Some(step) = step {
                    self.resolve_expr(step, inner, file_id, sink);
                }
                self.resolve_stmt(body, inner, file_id, return_type, sink);
            }
            Stmt::Foreach { .. } => {
                let desugared = self.desugar_foreach(stmt);
                *stmt = desugared;
                self.resolve_stmt(stmt, scope, file_id, return_type, sink);
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.resolve_expr(value, scope, file_id, sink);
                    if let Some(ty) = value.get_expr_type().cloned() {
                        let v = value.constant_value().cloned();
                        if overload::match_expression_to_type(&ty, v.as_ref(), return_type).is_none() {
                            sink.report(Diagnostic::new(
                                DiagnosticKind::TypeMismatch { expected: format!("{return_type:?}"), found: format!("{ty:?}") },
                                value.src_tokens,
                            ));
                        }
                    }
                }
            }
            Stmt::Defer(e) => self.resolve_expr(e, scope, file_id, sink),
            Stmt::StaticAssert { cond, message, src_tokens } => {
                self.resolve_expr(cond, scope, file_id, sink);
                if let Some(msg) = message.as_mut() {
                    self.resolve_expr(msg, scope, file_id, sink);
                }
                if cond.constant_value().is_none() {
                    // `static_assert` forces evaluation (§4.C table), unlike the
                    // opportunistic folding `resolve_expr` already attempted.
                    let ctx = self.eval_context();
                    if let Some(value) = consteval::consteval_try(cond, &ctx, sink) {
                        if let ExprPayload::Dynamic { ty, type_kind, kind } = std::mem::replace(&mut cond.payload, ExprPayload::Error) {
                            cond.payload = ExprPayload::Constant { ty, type_kind, kind, value: Box::new(value) };
                        }
                    }
                }
                match cond.constant_value() {
                    Some(ConstantValue::Bool(true)) => {}
                    Some(ConstantValue::Bool(false)) => {
                        let msg = message.as_ref().and_then(Expr::constant_value).map(ConstantValue::display_string).unwrap_or_default();
                        sink.report(Diagnostic::new(
                            DiagnosticKind::StaticAssertFailure { condition: format!("{:?}", cond.kind()), message: msg },
                            *src_tokens,
                        ));
                    }
                    _ => sink.report(Diagnostic::new(
                        DiagnosticKind::ConstevalFailure { reason: "static_assert condition did not fold to a constant bool".to_owned() },
                        *src_tokens,
                    )),
                }
            }
            Stmt::Block(stmts) => {
                let inner = self.scopes.push_scope(ScopeKind::Local, scope);
                self.resolve_stmts(stmts, inner, file_id, return_type, sink);
            }
            Stmt::Decl(decl) => {
                let id = self.arena.push((**decl).clone());
                self.decl_file.insert(id, file_id);
                self.register_name(scope, id, sink);
                self.resolve_all(id, scope, sink);
                **decl = self.arena.get(id).clone();
            }
        }
    }

    fn bind_pattern(&mut self, pattern: &Pattern, ty: Option<&Typespec>, scope: ScopeId, file_id: u32) {
        match pattern {
            Pattern::Name(name) => {
                let id = self.arena.push(Decl::Variable(VariableDecl {
                    name: *name,
                    prototype_modifiers: TokenRange::new(0, 0),
                    var_type: ty.cloned(),
                    init_expr: None,
                    tuple_decls: Vec::new(),
                    is_mut: true,
                    is_consteval: false,
                    attributes: Vec::new(),
                    resolve_state: ResolveState::All,
                }));
                self.decl_file.insert(id, file_id);
                self.scopes.get_mut(scope).decls.var_decls.insert(*name, id);
            }
            Pattern::Tuple(elems) => {
                let elem_tys: Vec<Option<Typespec>> = match ty.map(|t| &t.terminator) {
                    Some(Terminator::Tuple(tys)) => tys.iter().cloned().map(Some).collect(),
                    _ => vec![None; elems.len()],
                };
                for (elem, elem_ty) in elems.iter().zip(elem_tys.into_iter().chain(std::iter::repeat(None))) {
                    self.bind_pattern(elem, elem_ty.as_ref(), scope, file_id);
                }
            }
            Pattern::Wildcard => {}
        }
    }

    fn check_bool(&mut self, expr: &Expr, sink: &mut DiagnosticSink) {
        if let Some(ty) = expr.get_expr_type() {
            if !matches!(&ty.terminator, Terminator::BaseType(name) if name.as_str() == "bool") {
                sink.report(Diagnostic::new(
                    DiagnosticKind::TypeMismatch { expected: "bool".to_owned(), found: format!("{ty:?}") },
                    expr.src_tokens,
                ));
            }
        }
    }

    /// `foreach(x in range) body` -> `{ let __range = range; let __iter =
    /// __range.begin(); let __end = __range.end(); while (__iter != __end) {
    /// let x = *__iter; body; ++__iter; } }` (§4.R "Statement resolution").
    fn desugar_foreach(&mut self, stmt: &mut Stmt) -> Stmt {
        let Stmt::Foreach { binding, range, body } = std::mem::replace(stmt, Stmt::Block(Vec::new())) else {
            unreachable!("desugar_foreach called on a non-foreach statement")
        };
        let src = range.src_tokens;
        let range_sym = intern("__range");
        let iter_sym = intern("__iter");
        let end_sym = intern("__end");

        let range_ident = || placeholder_expr(ExprKind::Identifier(range_sym), src);
        let method_call = |name: &str, recv: Expr| {
            placeholder_expr(ExprKind::Call { callee: Box::new(placeholder_expr(ExprKind::Identifier(intern(name)), src)), args: vec![recv] }, src)
        };

        let range_let = Stmt::Let { pattern: Pattern::Name(range_sym), ty: None, init: Some(*range) };
        let iter_let = Stmt::Let { pattern: Pattern::Name(iter_sym), ty: None, init: Some(method_call("begin", range_ident())) };
        let end_let = Stmt::Let { pattern: Pattern::Name(end_sym), ty: None, init: Some(method_call("end", range_ident())) };

        let iter_ident = || placeholder_expr(ExprKind::Identifier(iter_sym), src);
        let end_ident = placeholder_expr(ExprKind::Identifier(end_sym), src);
        let cond = placeholder_expr(ExprKind::BinaryOp(crate::lexer::token::TokenKind::NotEquals, Box::new(iter_ident()), Box::new(end_ident)), src);

        let deref_binding = placeholder_expr(ExprKind::UnaryOp(crate::lexer::token::TokenKind::Dereference, Box::new(iter_ident())), src);
        let binding_let = Stmt::Let { pattern: Pattern::Name(binding), ty: None, init: Some(deref_binding) };
        let advance = Stmt::Expr(placeholder_expr(ExprKind::UnaryOp(crate::lexer::token::TokenKind::PlusPlus, Box::new(iter_ident())), src));

        let mut while_body = vec![binding_let, *body];
        while_body.push(advance);
        let while_stmt = Stmt::While { cond, body: Box::new(Stmt::Block(while_body)) };

        Stmt::Block(vec![range_let, iter_let, end_let, while_stmt])
    }

    fn resolve_expr(&mut self, expr: &mut Expr, scope: ScopeId, file_id: u32, sink: &mut DiagnosticSink) {
        let src = expr.src_tokens;
        let kind = match &mut expr.payload {
            ExprPayload::Dynamic { kind, .. } => kind.as_mut(),
            _ => return,
        };
        let (new_ty, new_kind) = match kind {
            ExprKind::Identifier(name) => self.resolve_identifier(*name, scope, src, sink),
            ExprKind::UnaryOp(op, operand) => {
                self.resolve_expr(operand, scope, file_id, sink);
                self.resolve_unary(*op, operand)
            }
            ExprKind::BinaryOp(op, lhs, rhs) => {
                self.resolve_expr(lhs, scope, file_id, sink);
                self.resolve_expr(rhs, scope, file_id, sink);
                self.resolve_binary(*op, lhs, rhs)
            }
            ExprKind::Call { callee, args } => self.resolve_call(callee, args, scope, file_id, src, sink),
            ExprKind::Cast { expr: inner, target } => {
                self.resolve_expr(inner, scope, file_id, sink);
                ((**target).clone(), ExprTypeKind::Rvalue)
            }
            ExprKind::Subscript { base, index } => {
                self.resolve_expr(base, scope, file_id, sink);
                self.resolve_expr(index, scope, file_id, sink);
                let ty = base.get_expr_type().map_or_else(Typespec::void, |t| t.without_outer_reference());
                (ty, ExprTypeKind::Lvalue)
            }
            ExprKind::MemberAccess { base, .. } => {
                self.resolve_expr(base, scope, file_id, sink);
                (Typespec::new(Terminator::Auto), ExprTypeKind::Lvalue)
            }
            ExprKind::Tuple(elems) => {
                for e in elems.iter_mut() {
                    self.resolve_expr(e, scope, file_id, sink);
                }
                let tys = elems.iter().map(|e| e.get_expr_type().cloned().unwrap_or_else(Typespec::void)).collect();
                (Typespec::new(Terminator::Tuple(tys)), ExprTypeKind::Tuple)
            }
            ExprKind::Compound(stmts) => {
                let inner = self.scopes.push_scope(ScopeKind::Local, scope);
                self.resolve_stmts(stmts, inner, file_id, &Typespec::void(), sink);
                (Typespec::void(), ExprTypeKind::Rvalue)
            }
            ExprKind::If { cond, then_branch, else_branch } => {
                self.resolve_expr(cond, scope, file_id, sink);
                self.check_bool(cond, sink);
                self.resolve_expr(then_branch, scope, file_id, sink);
                if let Some(e) = else_branch {
                    self.resolve_expr(e, scope, file_id, sink);
                }
                let ty = then_branch.get_expr_type().cloned().unwrap_or_else(Typespec::void);
                (ty, ExprTypeKind::IfExpr)
            }
            ExprKind::Switch { scrutinee, cases, default } => {
                self.resolve_expr(scrutinee, scope, file_id, sink);
                for case in cases.iter_mut() {
                    self.resolve_expr(&mut case.body, scope, file_id, sink);
                }
                if let Some(d) = default {
                    self.resolve_expr(d, scope, file_id, sink);
                }
                let ty = cases.first().and_then(|c| c.body.get_expr_type().cloned()).unwrap_or_else(Typespec::void);
                (ty, ExprTypeKind::SwitchExpr)
            }
            ExprKind::Break { value, .. } => {
                if let Some(v) = value {
                    self.resolve_expr(v, scope, file_id, sink);
                }
                (Typespec::void(), ExprTypeKind::Noreturn)
            }
            ExprKind::Continue { .. } => (Typespec::void(), ExprTypeKind::Noreturn),
            ExprKind::AggregateInit { ty, fields } => {
                for f in fields.iter_mut() {
                    self.resolve_expr(f, scope, file_id, sink);
                }
                ((**ty).clone(), ExprTypeKind::Rvalue)
            }
            ExprKind::AggregateDefaultConstruct(ty) | ExprKind::OptionalDefaultConstruct(ty) => ((**ty).clone(), ExprTypeKind::Rvalue),
            ExprKind::AggregateCopyConstruct(inner) | ExprKind::TrivialRelocate(inner) => {
                self.resolve_expr(inner, scope, file_id, sink);
                (inner.get_expr_type().cloned().unwrap_or_else(Typespec::void), ExprTypeKind::Rvalue)
            }
            ExprKind::OptionalExtractValue(inner) => {
                self.resolve_expr(inner, scope, file_id, sink);
                let ty = inner.get_expr_type().map_or_else(Typespec::void, Typespec::without_outer_reference);
                (ty, ExprTypeKind::Lvalue)
            }
            ExprKind::ArrayDestruct { value, .. } => {
                self.resolve_expr(value, scope, file_id, sink);
                (Typespec::void(), ExprTypeKind::Rvalue)
            }
            ExprKind::Literal(_) | ExprKind::BitcodeValueReference(_) => return,
        };
        if let ExprPayload::Dynamic { ty, type_kind, .. } = &mut expr.payload {
            *ty = Box::new(new_ty);
            *type_kind = new_kind;
        }
        self.try_fold(expr);
    }

    fn resolve_identifier(&mut self, name: Symbol, scope: ScopeId, src: SrcTokens, sink: &mut DiagnosticSink) -> (Typespec, ExprTypeKind) {
        match lookup::lookup_name(&self.scopes, scope, name, src, sink) {
            Some(resolved @ lookup::Resolved::Variable(id)) => {
                self.resolve_all(id, scope, sink);
                let ty = match self.arena.get(id) {
                    Decl::Variable(v) => v.var_type.clone().unwrap_or_else(Typespec::void),
                    _ => Typespec::void(),
                };
                (ty, resolved.type_kind())
            }
            Some(resolved @ lookup::Resolved::TypeAlias(id)) => {
                let ty = match self.arena.get(id) {
                    Decl::TypeAlias { target, .. } => target.clone(),
                    Decl::Struct { name, .. } => Typespec::new(Terminator::BaseType(*name)),
                    Decl::Enum { underlying, .. } => underlying.clone(),
                    _ => Typespec::new(Terminator::Typename),
                };
                (ty, resolved.type_kind())
            }
            Some(resolved @ lookup::Resolved::Function(ref ids)) => {
                let ty = if ids.len() == 1 {
                    self.resolve_symbol(ids[0], sink);
                    function_type(self.arena.get(ids[0]))
                } else {
                    Typespec::new(Terminator::Typename)
                };
                let type_kind = resolved.type_kind();
                (ty, type_kind)
            }
            None => (Typespec::void(), ExprTypeKind::None),
        }
    }

    fn resolve_unary(&self, op: crate::lexer::token::TokenKind, operand: &Expr) -> (Typespec, ExprTypeKind) {
        use crate::lexer::token::TokenKind;
        let operand_ty = operand.get_expr_type().cloned().unwrap_or_else(Typespec::void);
        match op {
            TokenKind::BoolNot => (bool_type(), ExprTypeKind::Rvalue),
            TokenKind::Dereference => (operand_ty.without_outer_reference(), ExprTypeKind::Lvalue),
            TokenKind::AddressOf => (operand_ty.with_modifier(crate::types::typespec::Modifier::Pointer), ExprTypeKind::Rvalue),
            TokenKind::PlusPlus | TokenKind::MinusMinus => (operand_ty, ExprTypeKind::Lvalue),
            _ => (operand_ty, ExprTypeKind::Rvalue),
        }
    }

    fn resolve_binary(&self, op: crate::lexer::token::TokenKind, lhs: &Expr, rhs: &Expr) -> (Typespec, ExprTypeKind) {
        use crate::lexer::token::TokenKind;
        if matches!(
            op,
            TokenKind::Equals
                | TokenKind::NotEquals
                | TokenKind::LessThan
                | TokenKind::GreaterThan
                | TokenKind::LessThanEq
                | TokenKind::GreaterThanEq
                | TokenKind::BoolAnd
                | TokenKind::BoolOr
                | TokenKind::BoolXor
        ) {
            return (bool_type(), ExprTypeKind::Rvalue);
        }
        if matches!(op, TokenKind::Assign | TokenKind::PlusEq | TokenKind::MinusEq | TokenKind::MultiplyEq | TokenKind::DivideEq | TokenKind::ModuloEq) {
            return (lhs.get_expr_type().cloned().unwrap_or_else(Typespec::void), ExprTypeKind::Lvalue);
        }
        let ty = lhs
            .get_expr_type()
            .filter(|t| !matches!(t.terminator, Terminator::Auto))
            .or_else(|| rhs.get_expr_type())
            .cloned()
            .unwrap_or_else(Typespec::void);
        (ty, ExprTypeKind::Rvalue)
    }

    fn resolve_call(&mut self, callee: &mut Expr, args: &mut Vec<Expr>, scope: ScopeId, file_id: u32, src: SrcTokens, sink: &mut DiagnosticSink) -> (Typespec, ExprTypeKind) {
        for a in args.iter_mut() {
            self.resolve_expr(a, scope, file_id, sink);
        }

        let (candidates, name, already_reported): (SmallVec<[DeclId; 4]>, Symbol, bool) = match callee.kind() {
            Some(ExprKind::Identifier(name)) => {
                let name = *name;
                match lookup::lookup_name(&self.scopes, scope, name, callee.src_tokens, sink) {
                    Some(lookup::Resolved::Function(ids)) => (ids, name, false),
                    Some(_) => (SmallVec::new(), name, false),
                    None => (SmallVec::new(), name, true),
                }
            }
            Some(ExprKind::MemberAccess { base, member }) => {
                let member = *member;
                let mut base = (**base).clone();
                self.resolve_expr(&mut base, scope, file_id, sink);
                let candidates = lookup::lookup_method_candidates(&self.scopes, scope, member);
                args.insert(0, base);
                (candidates, member, false)
            }
            _ => {
                self.resolve_expr(callee, scope, file_id, sink);
                (SmallVec::new(), intern("<call>"), false)
            }
        };

        if candidates.is_empty() {
            if !already_reported {
                sink.report(Diagnostic::new(DiagnosticKind::UnresolvedName { name: name.as_str().to_owned() }, src));
            }
            return (Typespec::void(), ExprTypeKind::None);
        }
        for &c in &candidates {
            self.resolve_symbol(c, sink);
        }
        match overload::resolve_call(&candidates, args, &self.arena, name, src, sink) {
            Some(id) => {
                let is_generic = matches!(self.arena.get(id), Decl::Function(f) if f.is_generic());
                let target_id = if is_generic {
                    let concrete: Vec<Typespec> = args.iter().filter_map(|a| a.get_expr_type().cloned()).collect();
                    self.generics.get_or_create(&mut self.arena, id, concrete)
                } else {
                    id
                };
                if is_generic {
                    // A freshly created specialization's body is still
                    // `None`; resolve_all drives it through resolve_function
                    // so the consteval machine has a body to re-enter.
                    self.resolve_all(target_id, scope, sink);
                } else {
                    self.resolve_symbol(target_id, sink);
                }
                (function_return_type(self.arena.get(target_id)), ExprTypeKind::Rvalue)
            }
            None => (Typespec::void(), ExprTypeKind::None),
        }
    }
}

fn function_type(decl: &Decl) -> Typespec {
    match decl {
        Decl::Function(f) | Decl::Operator { body: f, .. } => Typespec::new(Terminator::Function {
            cc: f.cc,
            params: f.params.iter().map(|a| a.ty.clone()).collect(),
            ret: Box::new(f.return_type.clone()),
        }),
        _ => Typespec::void(),
    }
}

fn function_return_type(decl: &Decl) -> Typespec {
    match decl {
        Decl::Function(f) | Decl::Operator { body: f, .. } => f.return_type.clone(),
        _ => Typespec::void(),
    }
}

/// Substitutes `typeof <name>` in `f`'s own params/return type by looking
/// `name` up among `f`'s own parameters (§4.R: the only binding visible at
/// this stage is a sibling parameter, not the enclosing scope).
fn resolve_function_typeof(f: &mut FunctionBody) {
    for i in 0..f.params.len() {
        let target_name = match &f.params[i].ty.terminator {
            Terminator::Typeof(name) => Some(*name),
            _ => None,
        };
        if let Some(name) = target_name {
            if let Some(ty) = f.params.iter().find(|p| p.name == name).map(|p| p.ty.clone()) {
                f.params[i].ty = ty;
            }
        }
    }
    let ret_name = match &f.return_type.terminator {
        Terminator::Typeof(name) => Some(*name),
        _ => None,
    };
    if let Some(name) = ret_name {
        if let Some(ty) = f.params.iter().find(|p| p.name == name).map(|p| p.ty.clone()) {
            f.return_type = ty;
        }
    }
}

fn bool_type() -> Typespec {
    Typespec::new(Terminator::BaseType(intern("bool")))
}

fn placeholder_expr(kind: ExprKind, src: SrcTokens) -> Expr {
    Expr::dynamic(Typespec::new(Terminator::Auto), ExprTypeKind::None, kind, src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse_file;

    fn resolve_source(src: &str) -> (Resolver, Vec<DeclId>, DiagnosticSink) {
        let (tokens, mut lex_sink) = lex(src, 0);
        assert!(!lex_sink.has_errors(), "lex errors: {:?}", lex_sink.diagnostics());
        let decls = parse_file(&tokens, 0, &mut lex_sink);
        let mut resolver = Resolver::new();
        let mut sink = DiagnosticSink::new();
        let (scope, ids) = resolver.register_file(0, tokens, decls, &mut sink);
        for &id in &ids {
            resolver.resolve_all(id, scope, &mut sink);
        }
        (resolver, ids, sink)
    }

    #[test]
    fn resolves_a_variable_initializer_type() {
        let (resolver, ids, sink) = resolve_source("let x: i32 = 1;");
        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        match resolver.arena.get(ids[0]) {
            Decl::Variable(v) => assert!(v.var_type.is_some()),
            other => panic!("expected a variable decl, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_identifier_is_reported() {
        let (_resolver, _ids, sink) = resolve_source("function f() -> void { return missing_name; }");
        assert!(sink.has_errors());
    }

    #[test]
    fn struct_constructor_is_wired_to_a_real_declaration() {
        let (resolver, ids, sink) = resolve_source("struct Point { x: i32; function Point() -> void { } }");
        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        match resolver.arena.get(ids[0]) {
            Decl::Struct { info, .. } => {
                let ctor = info.constructor.expect("constructor wired during registration");
                match resolver.arena.get(ctor) {
                    Decl::Function(f) => assert_eq!(f.constructor_or_destructor_of, Some(ids[0])),
                    other => panic!("expected a function decl, got {other:?}"),
                }
            }
            other => panic!("expected a struct decl, got {other:?}"),
        }
    }

    #[test]
    fn foreach_desugars_into_a_while_loop() {
        let (resolver, ids, sink) = resolve_source("function f(items: []i32) -> void { foreach (x in items) { } }");
        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        match resolver.arena.get(ids[0]) {
            Decl::Function(f) => {
                let body = f.body.as_ref().expect("body resolved");
                assert!(matches!(body[0], Stmt::Block(_)));
            }
            other => panic!("expected a function decl, got {other:?}"),
        }
    }
}
