//! The abstract machine (§4.C.2): a bounded, tree-walking interpreter over a
//! resolved function body, used by `consteval_try`/`consteval_try_without_
//! error` when a call's callee is not an intrinsic. Kept deliberately at the
//! "design level" the spec calls for rather than lowering to a real bytecode
//! — locals live in a self-contained frame map rather than the byte-level
//! `memory::MemoryManager`, since every value this machine needs to touch is
//! itself a `ConstantValue` already.

use super::{EvalContext, ExecKind};
use crate::diagnostics::SrcTokens;
use crate::symbol::Symbol;
use crate::types::constant_value::ConstantValue;
use crate::types::decl::FunctionBody;
use crate::types::expr::{Expr, ExprKind, Pattern, Stmt};
use hashbrown::HashMap;

/// A single call frame: the bound parameters plus any locals introduced by
/// `let` inside the body, and the step budget shared across the whole call
/// tree (§4.C.2 "Execution is bounded").
struct Frame<'a> {
    locals: Vec<HashMap<Symbol, ConstantValue>>,
    steps: &'a mut u32,
}

const MAX_STEPS: u32 = 200_000;

enum Flow {
    Normal,
    Return(ConstantValue),
    Break,
    Continue,
}

impl Frame<'_> {
    fn lookup(&self, name: Symbol) -> Option<ConstantValue> {
        self.locals.iter().rev().find_map(|scope| scope.get(&name).cloned())
    }

    fn bind(&mut self, name: Symbol, value: ConstantValue) {
        self.locals.last_mut().expect("frame always has an outer scope").insert(name, value);
    }

    /// Updates an already-bound local in whichever enclosing scope declared
    /// it (§4.C.2 `store`), falling back to binding in the innermost scope
    /// if somehow unbound (shouldn't happen for a well-typed lvalue).
    fn assign(&mut self, name: Symbol, value: ConstantValue) {
        for scope in self.locals.iter_mut().rev() {
            if scope.contains_key(&name) {
                scope.insert(name, value);
                return;
            }
        }
        self.bind(name, value);
    }

    fn push_scope(&mut self) {
        self.locals.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.locals.pop();
    }

    fn tick(&mut self) -> bool {
        if *self.steps == 0 {
            return false;
        }
        *self.steps -= 1;
        true
    }
}

/// Executes `body` with `args` bound to its parameters in declaration order
/// (§4.C.2 "call (re-entering the interpreter for non-intrinsic callees)").
/// Returns `None` if the body is unresolved, the step budget is exhausted, or
/// any statement fails to fold.
pub fn run(body: &FunctionBody, args: &[ConstantValue], ctx: &EvalContext, _src: SrcTokens) -> Option<ConstantValue> {
    let stmts = body.body.as_ref()?;
    if body.params.len() != args.len() {
        return None;
    }
    let mut steps = MAX_STEPS;
    let mut frame = Frame { locals: vec![HashMap::new()], steps: &mut steps };
    for (param, value) in body.params.iter().zip(args) {
        frame.bind(param.name, value.clone());
    }
    match exec_block(stmts, &mut frame, ctx)? {
        Flow::Return(v) => Some(v),
        Flow::Normal => Some(ConstantValue::Void),
        Flow::Break | Flow::Continue => None,
    }
}

fn exec_block(stmts: &[Stmt], frame: &mut Frame, ctx: &EvalContext) -> Option<Flow> {
    frame.push_scope();
    let result = (|| {
        for stmt in stmts {
            match exec_stmt(stmt, frame, ctx)? {
                Flow::Normal => continue,
                other => return Some(other),
            }
        }
        Some(Flow::Normal)
    })();
    frame.pop_scope();
    result
}

fn exec_stmt(stmt: &Stmt, frame: &mut Frame, ctx: &EvalContext) -> Option<Flow> {
    if !frame.tick() {
        return None;
    }
    match stmt {
        Stmt::Expr(e) => {
            eval_in_frame(e, frame, ctx)?;
            Some(Flow::Normal)
        }
        Stmt::Let { pattern, init, .. } => {
            let value = match init {
                Some(e) => eval_in_frame(e, frame, ctx)?,
                None => ConstantValue::Void,
            };
            bind_pattern(pattern, value, frame);
            Some(Flow::Normal)
        }
        Stmt::While { cond, body } => {
            loop {
                if !frame.tick() {
                    return None;
                }
                match eval_in_frame(cond, frame, ctx)? {
                    ConstantValue::Bool(true) => {}
                    ConstantValue::Bool(false) => break,
                    _ => return None,
                }
                match exec_stmt(body, frame, ctx)? {
                    Flow::Normal | Flow::Continue => {}
                    Flow::Break => break,
                    ret @ Flow::Return(_) => return Some(ret),
                }
            }
            Some(Flow::Normal)
        }
        Stmt::For { init, cond, step, body } => {
            frame.push_scope();
            let result = (|| {
                if let Some(init) = init {
                    match exec_stmt(init, frame, ctx)? {
                        Flow::Normal => {}
                        other => return Some(other),
                    }
                }
                loop {
                    if !frame.tick() {
                        return None;
                    }
                    if let Some(cond) = cond {
                        match eval_in_frame(cond, frame, ctx)? {
                            ConstantValue::Bool(true) => {}
                            ConstantValue::Bool(false) => break,
                            _ => return None,
                        }
                    }
                    match exec_stmt(body, frame, ctx)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Some(ret),
                    }
                    if let Some(step) = step {
                        eval_in_frame(step, frame, ctx)?;
                    }
                }
                Some(Flow::Normal)
            })();
            frame.pop_scope();
            result
        }
        Stmt::Foreach { .. } => None,
        Stmt::Return(e) => {
            let value = match e {
                Some(e) => eval_in_frame(e, frame, ctx)?,
                None => ConstantValue::Void,
            };
            Some(Flow::Return(value))
        }
        Stmt::Defer(_) => Some(Flow::Normal),
        Stmt::StaticAssert { cond, .. } => match eval_in_frame(cond, frame, ctx)? {
            ConstantValue::Bool(true) => Some(Flow::Normal),
            _ => None,
        },
        Stmt::Block(stmts) => exec_block(stmts, frame, ctx),
        Stmt::Decl(_) => Some(Flow::Normal),
    }
}

fn bind_pattern(pattern: &Pattern, value: ConstantValue, frame: &mut Frame) {
    match (pattern, value) {
        (Pattern::Name(name), value) => frame.bind(*name, value),
        (Pattern::Tuple(patterns), ConstantValue::Tuple(values)) => {
            for (p, v) in patterns.iter().zip(values.iter()) {
                bind_pattern(p, v.clone(), frame);
            }
        }
        (Pattern::Wildcard, _) | (Pattern::Tuple(_), _) => {}
    }
}

/// `true` for `=`, `+=`, `-=`, `*=`, `/=`, `%=` — every binary operator that
/// stores into its left operand rather than just producing a value.
fn is_assign_op(op: crate::lexer::token::TokenKind) -> bool {
    use crate::lexer::token::TokenKind as T;
    matches!(op, T::Assign | T::PlusEq | T::MinusEq | T::MultiplyEq | T::DivideEq | T::ModuloEq)
}

/// The plain arithmetic operator a compound-assignment operator folds
/// through before storing, e.g. `+=` -> `+`. `None` for plain `=`.
fn compound_base_op(op: crate::lexer::token::TokenKind) -> Option<crate::lexer::token::TokenKind> {
    use crate::lexer::token::TokenKind as T;
    Some(match op {
        T::PlusEq => T::Plus,
        T::MinusEq => T::Minus,
        T::MultiplyEq => T::Multiply,
        T::DivideEq => T::Divide,
        T::ModuloEq => T::Modulo,
        _ => return None,
    })
}

fn subscript_index(v: &ConstantValue) -> Option<i64> {
    match v {
        ConstantValue::Sint(n) => Some(*n),
        ConstantValue::Uint(n) => Some(*n as i64),
        _ => None,
    }
}

fn read_subscript(base: &ConstantValue, i: i64) -> Option<ConstantValue> {
    if i < 0 {
        return None;
    }
    let i = i as usize;
    match base {
        ConstantValue::Array(items) | ConstantValue::Tuple(items) | ConstantValue::Aggregate(items) => items.get(i).cloned(),
        ConstantValue::SintArray(items) => items.get(i).map(|&n| ConstantValue::Sint(n)),
        ConstantValue::UintArray(items) => items.get(i).map(|&n| ConstantValue::Uint(n)),
        ConstantValue::Float32Array(items) => items.get(i).map(|&f| ConstantValue::Float32(f)),
        ConstantValue::Float64Array(items) => items.get(i).map(|&f| ConstantValue::Float64(f)),
        _ => None,
    }
}

/// Rebuilds `base` with element `i` replaced by `value` (§4.C.2 `store`
/// through a subscript lvalue). `None` on an out-of-bounds or negative
/// index, or a value of the wrong element kind.
fn write_subscript(base: &ConstantValue, i: i64, value: ConstantValue) -> Option<ConstantValue> {
    if i < 0 {
        return None;
    }
    let i = i as usize;
    match base {
        ConstantValue::Array(items) => {
            let mut v = items.to_vec();
            *v.get_mut(i)? = value;
            Some(ConstantValue::Array(v.into()))
        }
        ConstantValue::Tuple(items) => {
            let mut v = items.to_vec();
            *v.get_mut(i)? = value;
            Some(ConstantValue::Tuple(v.into()))
        }
        ConstantValue::Aggregate(items) => {
            let mut v = items.to_vec();
            *v.get_mut(i)? = value;
            Some(ConstantValue::Aggregate(v.into()))
        }
        ConstantValue::SintArray(items) => {
            let ConstantValue::Sint(n) = value else { return None };
            let mut v = items.to_vec();
            *v.get_mut(i)? = n;
            Some(ConstantValue::SintArray(v.into()))
        }
        ConstantValue::UintArray(items) => {
            let ConstantValue::Uint(n) = value else { return None };
            let mut v = items.to_vec();
            *v.get_mut(i)? = n;
            Some(ConstantValue::UintArray(v.into()))
        }
        ConstantValue::Float32Array(items) => {
            let ConstantValue::Float32(f) = value else { return None };
            let mut v = items.to_vec();
            *v.get_mut(i)? = f;
            Some(ConstantValue::Float32Array(v.into()))
        }
        ConstantValue::Float64Array(items) => {
            let ConstantValue::Float64(f) = value else { return None };
            let mut v = items.to_vec();
            *v.get_mut(i)? = f;
            Some(ConstantValue::Float64Array(v.into()))
        }
        _ => None,
    }
}

/// Writes `value` back through an lvalue expression — a local name or a
/// chain of subscripts rooted at one (§4.C.2 `store`). Anything else isn't
/// an lvalue the machine can assign through.
fn store_lvalue(expr: &Expr, value: ConstantValue, frame: &mut Frame, ctx: &EvalContext) -> Option<()> {
    match expr.kind()? {
        ExprKind::Identifier(name) => {
            frame.assign(*name, value);
            Some(())
        }
        ExprKind::Subscript { base, index } => {
            let base_v = eval_in_frame(base, frame, ctx)?;
            let index_v = eval_in_frame(index, frame, ctx)?;
            let i = subscript_index(&index_v)?;
            let updated = write_subscript(&base_v, i, value)?;
            store_lvalue(base, updated, frame, ctx)
        }
        _ => None,
    }
}

/// A self-contained expression evaluator for the machine's local scope:
/// handles identifier lookups the top-level `consteval::eval` cannot (it has
/// no environment), delegating everything else to the shared folding rules.
fn eval_in_frame(expr: &Expr, frame: &mut Frame, ctx: &EvalContext) -> Option<ConstantValue> {
    use crate::lexer::token::TokenKind as T;
    if !frame.tick() {
        return None;
    }
    if let Some(v) = expr.constant_value() {
        return Some(v.clone());
    }
    match expr.kind()? {
        ExprKind::Identifier(name) => frame.lookup(*name),
        ExprKind::UnaryOp(op, operand) if matches!(op, T::PlusPlus | T::MinusMinus) => {
            let old = eval_in_frame(operand, frame, ctx)?;
            let one = ConstantValue::Sint(1);
            let base_op = if matches!(op, T::PlusPlus) { T::Plus } else { T::Minus };
            let width = super::type_width(operand.get_expr_type());
            let new_v = super::eval_binary(base_op, &old, &one, width, ExecKind::ForceEvaluateSilent, None, expr.src_tokens, expr.paren_level)?;
            store_lvalue(operand, new_v.clone(), frame, ctx)?;
            Some(new_v)
        }
        ExprKind::UnaryOp(op, operand) => {
            let v = eval_in_frame(operand, frame, ctx)?;
            super::eval_unary(*op, &v)
        }
        ExprKind::BinaryOp(op, lhs, rhs) if is_assign_op(*op) => {
            let rhs_v = eval_in_frame(rhs, frame, ctx)?;
            let new_v = if matches!(op, T::Assign) {
                rhs_v
            } else {
                let old = eval_in_frame(lhs, frame, ctx)?;
                let base_op = compound_base_op(*op)?;
                let width = super::type_width(lhs.get_expr_type()).or_else(|| super::type_width(rhs.get_expr_type()));
                super::eval_binary(base_op, &old, &rhs_v, width, ExecKind::ForceEvaluateSilent, None, expr.src_tokens, expr.paren_level)?
            };
            store_lvalue(lhs, new_v.clone(), frame, ctx)?;
            Some(new_v)
        }
        ExprKind::BinaryOp(op, lhs, rhs) => {
            let lhs_v = eval_in_frame(lhs, frame, ctx)?;
            if matches!(op, T::BoolAnd) && matches!(lhs_v, ConstantValue::Bool(false)) {
                return Some(ConstantValue::Bool(false));
            }
            if matches!(op, T::BoolOr) && matches!(lhs_v, ConstantValue::Bool(true)) {
                return Some(ConstantValue::Bool(true));
            }
            let rhs_v = eval_in_frame(rhs, frame, ctx)?;
            let width = super::type_width(lhs.get_expr_type()).or_else(|| super::type_width(rhs.get_expr_type()));
            super::eval_binary(*op, &lhs_v, &rhs_v, width, ExecKind::ForceEvaluateSilent, None, expr.src_tokens, expr.paren_level)
        }
        ExprKind::Subscript { base, index } => {
            let base_v = eval_in_frame(base, frame, ctx)?;
            let index_v = eval_in_frame(index, frame, ctx)?;
            let i = subscript_index(&index_v)?;
            read_subscript(&base_v, i)
        }
        ExprKind::Cast { expr: inner, target } => {
            let v = eval_in_frame(inner, frame, ctx)?;
            super::eval_cast(&v, target, ExecKind::ForceEvaluateSilent, None, expr.src_tokens, expr.paren_level)
        }
        ExprKind::If { cond, then_branch, else_branch } => match eval_in_frame(cond, frame, ctx)? {
            ConstantValue::Bool(true) => eval_in_frame(then_branch, frame, ctx),
            ConstantValue::Bool(false) => match else_branch {
                Some(e) => eval_in_frame(e, frame, ctx),
                None => Some(ConstantValue::Void),
            },
            _ => None,
        },
        ExprKind::Call { callee, args } => {
            let ExprKind::Identifier(name) = callee.kind()? else { return None };
            let mut values = Vec::with_capacity(args.len());
            for a in args {
                values.push(eval_in_frame(a, frame, ctx)?);
            }
            if let Some(intrinsic) = crate::types::entity::IntrinsicKind::from_symbol(*name) {
                return super::intrinsics::dispatch(intrinsic, &values, ExecKind::ForceEvaluateSilent, args.first().and_then(|a| a.get_expr_type()));
            }
            let callee_id = super::resolve_callee_function(ctx.arena, *name)?;
            let crate::types::decl::Decl::Function(callee_body) = ctx.arena.get(callee_id) else { return None };
            if !frame.tick() {
                return None;
            }
            let mut callee_steps = *frame.steps;
            let mut callee_frame = Frame { locals: vec![HashMap::new()], steps: &mut callee_steps };
            for (param, value) in callee_body.params.iter().zip(&values) {
                callee_frame.bind(param.name, value.clone());
            }
            let result = match exec_block(callee_body.body.as_ref()?, &mut callee_frame, ctx)? {
                Flow::Return(v) => Some(v),
                Flow::Normal => Some(ConstantValue::Void),
                Flow::Break | Flow::Continue => None,
            };
            *frame.steps = callee_steps;
            result
        }
        _ => super::eval(expr, ExecKind::ForceEvaluateSilent, ctx, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::intern;
    use crate::types::decl::{CallingConvention, FunctionFlags, ResolveState};
    use crate::types::expr::ExprTypeKind;
    use crate::types::typespec::{Arg, Terminator, Typespec};

    fn i32_ty() -> Typespec {
        Typespec::new(Terminator::BaseType(intern("i32")))
    }

    fn ident(name: &str, ty: Typespec) -> Expr {
        Expr::dynamic(ty, ExprTypeKind::Lvalue, ExprKind::Identifier(intern(name)), SrcTokens::point(0, 0))
    }

    fn lit(v: i64) -> Expr {
        let ty = i32_ty();
        Expr::constant(ty, ExprTypeKind::IntegerLiteral, ExprKind::Literal(ConstantValue::Sint(v)), ConstantValue::Sint(v), SrcTokens::point(0, 0))
    }

    fn arena() -> crate::types::Arena<crate::types::decl::DeclId, crate::types::decl::Decl> {
        crate::types::Arena::new()
    }

    /// `function f(n: i32) -> i32 { return n + 1; }`
    fn increment_body() -> FunctionBody {
        let n = ident("n", i32_ty());
        let one = lit(1);
        let ret_expr = Expr::dynamic(i32_ty(), ExprTypeKind::Rvalue, ExprKind::BinaryOp(crate::lexer::token::TokenKind::Plus, Box::new(n), Box::new(one)), SrcTokens::point(0, 0));
        FunctionBody {
            symbol_name: intern("f"),
            params: vec![Arg { name: intern("n"), ty: i32_ty() }],
            return_type: i32_ty(),
            cc: CallingConvention::Fast,
            body_tokens: None,
            body: Some(vec![Stmt::Return(Some(ret_expr))]),
            flags: FunctionFlags::empty(),
            generic_specializations: Vec::new(),
            generic_parent: None,
            constructor_or_destructor_of: None,
            attributes: Vec::new(),
            resolve_state: ResolveState::All,
        }
    }

    #[test]
    fn runs_a_simple_function_body() {
        let arena = arena();
        let ctx = EvalContext { arena: &arena, target: crate::config::TargetProperties::host() };
        let body = increment_body();
        let result = run(&body, &[ConstantValue::Sint(41)], &ctx, SrcTokens::point(0, 0));
        assert_eq!(result, Some(ConstantValue::Sint(42)));
    }

}
