//! Local statement parsing (§4.P). Unlike top-level declarations, local
//! statements are parsed directly into fully-structured [`Stmt`]/[`Expr`]
//! trees the moment a function body's stashed [`TokenRange`] is handed back
//! to the parser by the resolver (§4.P: "fully-resolved statements at local
//! scope").

use super::Parser;
use crate::diagnostics::DiagnosticSink;
use crate::lexer::token::{Token, TokenKind, TokenRange};
use crate::types::decl::{Decl, ResolveState, VariableDecl};
use crate::types::expr::Stmt;
use crate::types::typespec::Typespec;

impl<'t> Parser<'t> {
    /// Parses one local statement. A bare expression must be followed by
    /// `;` except when it is itself a block/if/switch (those are also legal
    /// as standalone statements without a trailing `;`).
    pub fn parse_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        match self.kind() {
            TokenKind::KwLet => self.parse_let_stmt(sink),
            TokenKind::KwWhile => self.parse_while_stmt(sink),
            TokenKind::KwFor => self.parse_for_stmt(sink),
            TokenKind::KwForeach => self.parse_foreach_stmt(sink),
            TokenKind::KwReturn => self.parse_return_stmt(sink),
            TokenKind::KwDefer => self.parse_defer_stmt(sink),
            TokenKind::KwStaticAssert => self.parse_static_assert_stmt(sink),
            TokenKind::CurlyOpen => self.parse_block_stmt(sink),
            TokenKind::KwFunction | TokenKind::KwStruct | TokenKind::KwEnum | TokenKind::KwType => {
                self.parse_local_decl_stmt(sink)
            }
            _ => {
                let expr = self.parse_expr(sink);
                let needs_semi = !matches!(
                    expr.kind(),
                    Some(crate::types::expr::ExprKind::Compound(_) | crate::types::expr::ExprKind::If { .. } | crate::types::expr::ExprKind::Switch { .. })
                );
                if needs_semi {
                    self.expect(TokenKind::SemiColon, sink);
                } else {
                    self.eat(TokenKind::SemiColon);
                }
                Stmt::Expr(expr)
            }
        }
    }

    fn parse_block_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        self.expect(TokenKind::CurlyOpen, sink);
        let mut stmts = Vec::new();
        while !self.check(TokenKind::CurlyClose) && !self.at_eof() {
            stmts.push(self.parse_stmt(sink));
        }
        self.expect(TokenKind::CurlyClose, sink);
        Stmt::Block(stmts)
    }

    fn parse_let_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        self.bump(); // let
        let is_mut = self.eat(TokenKind::KwMut);
        let pattern = self.parse_pattern(sink);
        let ty = if self.eat(TokenKind::Colon) { Some(self.parse_typespec(sink)) } else { None };
        let init = if self.eat(TokenKind::Assign) { Some(self.parse_expr_no_comma(sink)) } else { None };
        self.expect(TokenKind::SemiColon, sink);
        let _ = is_mut;
        Stmt::Let { pattern, ty, init }
    }

    fn parse_while_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        self.bump(); // while
        self.expect(TokenKind::ParenOpen, sink);
        let cond = self.parse_expr(sink);
        self.expect(TokenKind::ParenClose, sink);
        let body = Box::new(self.parse_stmt(sink));
        Stmt::While { cond, body }
    }

    fn parse_for_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        self.bump(); // for
        self.expect(TokenKind::ParenOpen, sink);
        let init = if self.check(TokenKind::SemiColon) {
            self.bump();
            None
        } else {
            Some(Box::new(self.parse_stmt(sink)))
        };
        let cond = if self.check(TokenKind::SemiColon) { None } else { Some(self.parse_expr(sink)) };
        self.expect(TokenKind::SemiColon, sink);
        let step = if self.check(TokenKind::ParenClose) { None } else { Some(self.parse_expr(sink)) };
        self.expect(TokenKind::ParenClose, sink);
        let body = Box::new(self.parse_stmt(sink));
        Stmt::For { init, cond, step, body }
    }

    fn parse_foreach_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        self.bump(); // foreach
        self.expect(TokenKind::ParenOpen, sink);
        let binding = self.expect_identifier(sink);
        self.expect(TokenKind::KwIn, sink);
        let range = self.parse_expr(sink);
        self.expect(TokenKind::ParenClose, sink);
        let body = Box::new(self.parse_stmt(sink));
        Stmt::Foreach { binding, range, body }
    }

    fn parse_return_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        self.bump(); // return
        let value = if self.check(TokenKind::SemiColon) { None } else { Some(self.parse_expr(sink)) };
        self.expect(TokenKind::SemiColon, sink);
        Stmt::Return(value)
    }

    fn parse_defer_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        self.bump(); // defer
        let expr = self.parse_expr(sink);
        self.expect(TokenKind::SemiColon, sink);
        Stmt::Defer(expr)
    }

    fn parse_static_assert_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        let tok = self.bump(); // static_assert
        self.expect(TokenKind::ParenOpen, sink);
        let cond = self.parse_expr_no_comma(sink);
        let message = if self.eat(TokenKind::Comma) { Some(self.parse_expr_no_comma(sink)) } else { None };
        self.expect(TokenKind::ParenClose, sink);
        self.expect(TokenKind::SemiColon, sink);
        Stmt::StaticAssert { cond, message, src_tokens: self.span_from(&tok) }
    }

    /// A function/struct/enum/type declared inline inside a function body
    /// desugars identically to file scope (§4.P); reuse the top-level
    /// parsers and wrap the result.
    fn parse_local_decl_stmt(&mut self, sink: &mut DiagnosticSink) -> Stmt {
        match self.parse_top_level_decl(sink) {
            Some(d) => Stmt::Decl(Box::new(d)),
            None => {
                self.synchronize();
                Stmt::Decl(Box::new(Decl::Variable(VariableDecl {
                    name: crate::symbol::intern("<error>"),
                    prototype_modifiers: TokenRange::new(0, 0),
                    var_type: None::<Typespec>,
                    init_expr: None,
                    tuple_decls: Vec::new(),
                    is_mut: false,
                    is_consteval: false,
                    attributes: Vec::new(),
                    resolve_state: ResolveState::Error,
                })))
            }
        }
    }
}

/// Re-entry point used by the resolver (§4.P): parses a function body's
/// stashed token range into a fully-structured statement list, sharing the
/// same file's token slice and absolute offsets so diagnostics keep correct
/// source spans.
#[must_use]
pub fn parse_function_body(tokens: &[Token], range: TokenRange, file_id: u32, sink: &mut DiagnosticSink) -> Vec<Stmt> {
    let body_tokens = &tokens[range.begin as usize..range.end as usize];
    let mut parser = Parser::new(body_tokens, file_id);
    let mut stmts = Vec::new();
    while !parser.at_eof() {
        stmts.push(parser.parse_stmt(sink));
    }
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn body_stmts(src: &str) -> Vec<Stmt> {
        let (tokens, sink) = lex(src, 0);
        assert!(!sink.has_errors(), "lex errors: {:?}", sink.diagnostics());
        let mut sink = DiagnosticSink::new();
        let range = TokenRange::new(0, u32::try_from(tokens.len()).unwrap());
        let stmts = parse_function_body(&tokens, range, 0, &mut sink);
        assert!(!sink.has_errors(), "parse errors: {:?}", sink.diagnostics());
        stmts
    }

    #[test]
    fn parses_a_let_and_return() {
        let stmts = body_stmts("let x: i32 = 1; return x;");
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0], Stmt::Let { .. }));
        assert!(matches!(stmts[1], Stmt::Return(Some(_))));
    }

    #[test]
    fn parses_a_while_loop() {
        let stmts = body_stmts("while (true) { x += 1; }");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::While { body, .. } => assert!(matches!(**body, Stmt::Block(_))),
            other => panic!("expected a while stmt, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_foreach_loop() {
        let stmts = body_stmts("foreach (item in items) { defer cleanup(item); }");
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Foreach { .. }));
    }

    #[test]
    fn if_expression_statement_needs_no_trailing_semicolon() {
        let stmts = body_stmts("if (cond) { a(); } else { b(); }");
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Expr(_)));
    }

    #[test]
    fn nested_function_decl_becomes_a_decl_stmt() {
        let stmts = body_stmts("function helper() -> void { return; } helper();");
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0], Stmt::Decl(_)));
    }
}
