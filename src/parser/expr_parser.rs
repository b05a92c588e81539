//! Pratt expression parsing (§4.P). Postfix application (call, subscript,
//! member access, `as`-cast, post-increment/decrement) is handled in a tight
//! loop right after the primary/unary parse since its right-hand grammar
//! isn't a generic expression; everything binding looser than that goes
//! through the generic precedence-climbing loop in [`Parser::parse_expression`].

use super::Parser;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::lexer::token::TokenKind;
use crate::symbol::intern;
use crate::token_info::{self, TokenFlags, NO_ASSIGN, NO_COMMA};
use crate::types::constant_value::{ConstantValue, Float64};
use crate::types::expr::{Expr, ExprKind, ExprTypeKind, Pattern, SwitchCase};
use crate::types::typespec::{Terminator, Typespec};

/// Placeholder type stamped on every expression the parser builds; the
/// resolver replaces it once scope/type context is available (§4.R).
fn untyped() -> Typespec {
    Typespec::new(Terminator::Auto)
}

impl<'t> Parser<'t> {
    #[must_use]
    pub fn parse_expr_no_comma(&mut self, sink: &mut DiagnosticSink) -> Expr {
        self.parse_expression(NO_COMMA, sink)
    }

    #[must_use]
    pub fn parse_expr_no_assign(&mut self, sink: &mut DiagnosticSink) -> Expr {
        self.parse_expression(NO_ASSIGN, sink)
    }

    #[must_use]
    pub fn parse_expr(&mut self, sink: &mut DiagnosticSink) -> Expr {
        self.parse_expression(token_info::Precedence::new(21, true), sink)
    }

    /// Precedence-climbing loop (§4.T `binds_tighter_than`).
    #[must_use]
    pub fn parse_expression(&mut self, min_prec: token_info::Precedence, sink: &mut DiagnosticSink) -> Expr {
        let mut lhs = self.parse_unary(sink);
        loop {
            let op_kind = self.kind();
            let info = token_info::info(op_kind);
            if !info.flags.contains(TokenFlags::BINARY_OPERATOR) || info.binary_prec.is_none() {
                break;
            }
            let op_prec = info.binary_prec;
            if !op_prec.binds_tighter_than(min_prec) {
                break;
            }
            let op_tok = self.bump();
            if op_kind == TokenKind::Comma {
                let rhs = self.parse_expression(op_prec, sink);
                let src = self.span_from(&op_tok);
                lhs = Expr::dynamic(untyped(), ExprTypeKind::Tuple, ExprKind::Tuple(vec![lhs, rhs]), src);
                continue;
            }
            let rhs = self.parse_expression(op_prec, sink);
            let src = self.span_from(&op_tok);
            lhs = Expr::dynamic(untyped(), ExprTypeKind::Rvalue, ExprKind::BinaryOp(op_kind, Box::new(lhs), Box::new(rhs)), src);
        }
        lhs
    }

    fn parse_unary(&mut self, sink: &mut DiagnosticSink) -> Expr {
        let info = token_info::info(self.kind());
        if info.flags.contains(TokenFlags::UNARY_OPERATOR) && !info.unary_prec.is_none() {
            let op_tok = self.bump();
            let operand = self.parse_unary(sink);
            let src = self.span_from(&op_tok);
            return Expr::dynamic(untyped(), ExprTypeKind::Rvalue, ExprKind::UnaryOp(op_tok.kind, Box::new(operand)), src);
        }
        self.parse_postfix(sink)
    }

    fn parse_postfix(&mut self, sink: &mut DiagnosticSink) -> Expr {
        let mut expr = self.parse_primary(sink);
        loop {
            match self.kind() {
                TokenKind::ParenOpen => {
                    let open = self.bump();
                    let mut args = Vec::new();
                    while !self.check(TokenKind::ParenClose) && !self.at_eof() {
                        args.push(self.parse_expr_no_comma(sink));
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::ParenClose, sink);
                    let src = self.span_from(&open);
                    expr = Expr::dynamic(untyped(), ExprTypeKind::Rvalue, ExprKind::Call { callee: Box::new(expr), args }, src);
                }
                TokenKind::SquareOpen => {
                    let open = self.bump();
                    let index = self.parse_expr_no_comma(sink);
                    self.expect(TokenKind::SquareClose, sink);
                    let src = self.span_from(&open);
                    expr = Expr::dynamic(untyped(), ExprTypeKind::Lvalue, ExprKind::Subscript { base: Box::new(expr), index: Box::new(index) }, src);
                }
                TokenKind::Dot => {
                    let dot = self.bump();
                    let member = self.expect_identifier(sink);
                    let src = self.span_from(&dot);
                    expr = Expr::dynamic(untyped(), ExprTypeKind::Lvalue, ExprKind::MemberAccess { base: Box::new(expr), member }, src);
                }
                TokenKind::KwAs => {
                    let as_tok = self.bump();
                    let target = self.parse_typespec(sink);
                    let src = self.span_from(&as_tok);
                    expr = Expr::dynamic(untyped(), ExprTypeKind::Rvalue, ExprKind::Cast { expr: Box::new(expr), target: Box::new(target) }, src);
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op_tok = self.bump();
                    let src = self.span_from(&op_tok);
                    expr = Expr::dynamic(untyped(), ExprTypeKind::Rvalue, ExprKind::UnaryOp(op_tok.kind, Box::new(expr)), src);
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_primary(&mut self, sink: &mut DiagnosticSink) -> Expr {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::IntegerLiteral => {
                self.bump();
                let value = parse_int_literal(&tok.value, 10);
                self.literal_from_int(value, &tok.postfix, tok.src_tokens())
            }
            TokenKind::HexLiteral => {
                self.bump();
                let digits = tok.value.trim_start_matches("0x").trim_start_matches("0X");
                let value = parse_int_literal(digits, 16);
                self.literal_from_int(value, &tok.postfix, tok.src_tokens())
            }
            TokenKind::OctLiteral => {
                self.bump();
                let digits = tok.value.trim_start_matches("0o").trim_start_matches("0O");
                let value = parse_int_literal(digits, 8);
                self.literal_from_int(value, &tok.postfix, tok.src_tokens())
            }
            TokenKind::BinLiteral => {
                self.bump();
                let digits = tok.value.trim_start_matches("0b").trim_start_matches("0B");
                let value = parse_int_literal(digits, 2);
                self.literal_from_int(value, &tok.postfix, tok.src_tokens())
            }
            TokenKind::FloatingPointLiteral => {
                self.bump();
                let cleaned: String = tok.value.chars().filter(|c| *c != '_').collect();
                let v: f64 = cleaned.parse().unwrap_or(0.0);
                Expr::constant(untyped(), ExprTypeKind::Rvalue, ExprKind::Literal(ConstantValue::Float64(Float64(v))), ConstantValue::Float64(Float64(v)), tok.src_tokens())
            }
            TokenKind::StringLiteral => {
                self.bump();
                let v = ConstantValue::String(tok.value.clone().into());
                Expr::constant(untyped(), ExprTypeKind::Rvalue, ExprKind::Literal(v.clone()), v, tok.src_tokens())
            }
            TokenKind::CharacterLiteral => {
                self.bump();
                let c = tok.value.chars().next().unwrap_or('\0') as u32;
                let v = ConstantValue::Char(c);
                Expr::constant(untyped(), ExprTypeKind::Rvalue, ExprKind::Literal(v.clone()), v, tok.src_tokens())
            }
            TokenKind::KwTrue | TokenKind::KwFalse => {
                self.bump();
                let v = ConstantValue::Bool(tok.kind == TokenKind::KwTrue);
                Expr::constant(untyped(), ExprTypeKind::Rvalue, ExprKind::Literal(v.clone()), v, tok.src_tokens())
            }
            TokenKind::KwNull => {
                self.bump();
                Expr::constant(untyped(), ExprTypeKind::Rvalue, ExprKind::Literal(ConstantValue::Null), ConstantValue::Null, tok.src_tokens())
            }
            TokenKind::Identifier => {
                self.bump();
                let name = intern(&tok.value);
                Expr::dynamic(untyped(), ExprTypeKind::Lvalue, ExprKind::Identifier(name), tok.src_tokens())
            }
            TokenKind::ParenOpen => {
                self.bump();
                let mut elems = Vec::new();
                let mut trailing_comma_only_one = true;
                while !self.check(TokenKind::ParenClose) && !self.at_eof() {
                    elems.push(self.parse_expr_no_comma(sink));
                    if self.eat(TokenKind::Comma) {
                        trailing_comma_only_one = false;
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::ParenClose, sink);
                let src = self.span_from(&tok);
                if elems.len() == 1 && trailing_comma_only_one {
                    elems.pop().unwrap().with_paren_wrap()
                } else {
                    Expr::dynamic(untyped(), ExprTypeKind::Tuple, ExprKind::Tuple(elems), src)
                }
            }
            TokenKind::CurlyOpen => self.parse_compound_expression(sink),
            TokenKind::KwIf => self.parse_if_expression(sink),
            TokenKind::KwBreak => {
                self.bump();
                let value = if matches!(self.kind(), TokenKind::SemiColon | TokenKind::ParenClose | TokenKind::CurlyClose) {
                    None
                } else {
                    Some(Box::new(self.parse_expr_no_comma(sink)))
                };
                Expr::dynamic(untyped(), ExprTypeKind::Noreturn, ExprKind::Break { label: None, value }, tok.src_tokens())
            }
            TokenKind::KwContinue => {
                self.bump();
                Expr::dynamic(untyped(), ExprTypeKind::Noreturn, ExprKind::Continue { label: None }, tok.src_tokens())
            }
            TokenKind::KwSizeof => {
                self.bump();
                self.expect(TokenKind::ParenOpen, sink);
                let ty = self.parse_typespec(sink);
                self.expect(TokenKind::ParenClose, sink);
                Expr::dynamic(untyped(), ExprTypeKind::Rvalue, ExprKind::AggregateDefaultConstruct(Box::new(ty)), tok.src_tokens())
            }
            TokenKind::KwSwitch => self.parse_switch_expression(sink),
            _ => {
                sink.report(Diagnostic::new(
                    DiagnosticKind::ParseError { reason: format!("expected an expression, found {:?} ('{}')", tok.kind, tok.value) },
                    self.src_tokens_here(),
                ));
                if !self.at_eof() {
                    self.bump();
                }
                Expr::error(tok.src_tokens())
            }
        }
    }

    /// `_` has no dedicated `TokenKind` of its own and lexes as a plain
    /// `Identifier`; this checks for that spelling.
    fn check_identifier_like_keyword(&self, spelling: &str) -> bool {
        self.check(TokenKind::Identifier) && self.peek().value == spelling
    }

    /// Untyped integer literals default to `uint` (unsuffixed literals fit
    /// the widest non-negative family first, §4.R match-expression-to-type
    /// narrows them down once a target type is known); an explicit `i*`
    /// suffix picks the signed family instead.
    fn literal_from_int(&self, value: i128, postfix: &str, src: crate::diagnostics::SrcTokens) -> Expr {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let v = if postfix.starts_with('i') {
            ConstantValue::Sint(value as i64)
        } else {
            ConstantValue::Uint(value as u64)
        };
        Expr::constant(untyped(), ExprTypeKind::IntegerLiteral, ExprKind::Literal(v.clone()), v, src)
    }

    /// `{ stmt* }` as an expression (§4.P `parse_compound_expression`); the
    /// value of the block is its last statement if that statement is a bare
    /// expression with no trailing `;`. Token-level trailing-semicolon
    /// tracking is left to the statement parser; here every statement is
    /// collected uniformly.
    pub fn parse_compound_expression(&mut self, sink: &mut DiagnosticSink) -> Expr {
        let open = self.bump(); // {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::CurlyClose) && !self.at_eof() {
            stmts.push(self.parse_stmt(sink));
        }
        self.expect(TokenKind::CurlyClose, sink);
        let src = self.span_from(&open);
        Expr::dynamic(untyped(), ExprTypeKind::Rvalue, ExprKind::Compound(stmts), src)
    }

    pub fn parse_if_expression(&mut self, sink: &mut DiagnosticSink) -> Expr {
        let if_tok = self.bump(); // if
        self.expect(TokenKind::ParenOpen, sink);
        let cond = self.parse_expr(sink);
        self.expect(TokenKind::ParenClose, sink);
        let then_branch = Box::new(self.parse_expr_no_comma(sink));
        let else_branch = if self.eat(TokenKind::KwElse) { Some(Box::new(self.parse_expr_no_comma(sink))) } else { None };
        let src = self.span_from(&if_tok);
        Expr::dynamic(untyped(), ExprTypeKind::IfExpr, ExprKind::If { cond: Box::new(cond), then_branch, else_branch }, src)
    }

    pub fn parse_switch_expression(&mut self, sink: &mut DiagnosticSink) -> Expr {
        let switch_tok = self.bump(); // switch
        self.expect(TokenKind::ParenOpen, sink);
        let scrutinee = self.parse_expr(sink);
        self.expect(TokenKind::ParenClose, sink);
        self.expect(TokenKind::CurlyOpen, sink);
        let mut cases = Vec::new();
        let mut default = None;
        while !self.check(TokenKind::CurlyClose) && !self.at_eof() {
            if self.check(TokenKind::KwElse) {
                self.bump();
                self.expect(TokenKind::FatArrow, sink);
                default = Some(Box::new(self.parse_expr_no_comma(sink)));
            } else {
                let pattern = self.parse_expr_no_comma(sink);
                self.expect(TokenKind::FatArrow, sink);
                let body = Box::new(self.parse_expr_no_comma(sink));
                let pattern_value = pattern.constant_value().cloned().unwrap_or(ConstantValue::Void);
                cases.push(SwitchCase { pattern: pattern_value, body });
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CurlyClose, sink);
        let src = self.span_from(&switch_tok);
        Expr::dynamic(untyped(), ExprTypeKind::SwitchExpr, ExprKind::Switch { scrutinee: Box::new(scrutinee), cases, default }, src)
    }

    /// Binds an expression-statement body pattern for `let`, delegating to
    /// `stmt_parser` for anything that isn't a bare name (§4.P).
    pub(crate) fn parse_pattern(&mut self, sink: &mut DiagnosticSink) -> Pattern {
        if self.eat(TokenKind::ParenOpen) {
            let mut elems = Vec::new();
            while !self.check(TokenKind::ParenClose) && !self.at_eof() {
                elems.push(self.parse_pattern(sink));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::ParenClose, sink);
            Pattern::Tuple(elems)
        } else if self.check_identifier_like_keyword("_") {
            self.bump();
            Pattern::Wildcard
        } else {
            Pattern::Name(self.expect_identifier(sink))
        }
    }
}

fn parse_int_literal(digits: &str, radix: u32) -> i128 {
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    i128::from_str_radix(&cleaned, radix).unwrap_or(0)
}
