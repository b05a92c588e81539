//! Token stream → AST (§4.P). Operator-precedence ("Pratt") expression
//! parsing plus a table-driven statement/declaration dispatch, mirroring the
//! shape of `mmcc::build_mir`'s single-pass `Translator` (one struct holding
//! cursor state, a handful of `parse_*` methods each owning one grammar
//! production).
//!
//! Declaration *bodies* are not parsed eagerly: at global/struct-body scope a
//! function or variable initializer is stashed as a [`TokenRange`] and only
//! turned into real [`Stmt`]/[`Expr`] trees when the resolver asks for it
//! (§4.P: "handlers produce unresolved statements when used at
//! global/struct-body scope"). [`stmt_parser::parse_function_body`] is the
//! re-entry point the resolver uses for that.

pub mod expr_parser;
pub mod stmt_parser;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, SrcTokens};
use crate::lexer::token::{Token, TokenKind, TokenRange};
use crate::symbol::{intern, Symbol};
use crate::types::decl::{Attribute, Decl, EnumVariant, FunctionBody, FunctionFlags, OperatorKind, ResolveState, StructField, TypeInfo, VariableDecl};
use crate::types::typespec::{Arg, CallingConvention, EnumCase, Modifier, Terminator, Typespec, UnresolvedTokenRange};
use crate::types::Idx;

/// Cursor over one file's token stream. Holds no diagnostics state of its
/// own; every fallible method takes the sink explicitly (§9 "no global
/// singleton").
pub struct Parser<'t> {
    pub(crate) tokens: &'t [Token],
    pub(crate) pos: usize,
    pub(crate) file_id: u32,
    /// Set while parsing the argument list of a generic instantiation so
    /// that `>` closes the list instead of parsing as `greater-than` (§4.P).
    pub(crate) parsing_template_argument: bool,
}

impl<'t> Parser<'t> {
    #[must_use]
    pub fn new(tokens: &'t [Token], file_id: u32) -> Self {
        Parser { tokens, pos: 0, file_id, parsing_template_argument: false }
    }

    #[must_use]
    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    #[must_use]
    pub fn peek_at(&self, offset: usize) -> &Token {
        let i = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[i]
    }

    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    #[must_use]
    pub fn at_eof(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    pub fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    #[must_use]
    pub fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consumes `kind` or reports a `ParseError` and leaves the cursor in
    /// place for the caller's recovery strategy.
    pub fn expect(&mut self, kind: TokenKind, sink: &mut DiagnosticSink) -> Option<Token> {
        if self.check(kind) {
            Some(self.bump())
        } else {
            let found = self.peek().clone();
            sink.report(Diagnostic::new(
                DiagnosticKind::ParseError {
                    reason: format!("expected {:?}, found {:?} ('{}')", kind, found.kind, found.value),
                },
                self.src_tokens_here(),
            ));
            None
        }
    }

    #[must_use]
    pub fn src_tokens_here(&self) -> SrcTokens {
        let t = self.peek();
        SrcTokens::point(t.file_id, t.begin)
    }

    #[must_use]
    pub fn span_from(&self, begin_tok: &Token) -> SrcTokens {
        let end = self.peek();
        SrcTokens::new(self.file_id, begin_tok.begin, begin_tok.begin, end.begin)
    }

    /// Recovery (§4.P "Failure"): skip to the next semicolon, a matching
    /// closing bracket at the current nesting depth, or a top-level keyword,
    /// whichever comes first.
    pub fn synchronize(&mut self) {
        let mut depth: i32 = 0;
        loop {
            match self.kind() {
                TokenKind::Eof => return,
                TokenKind::ParenOpen | TokenKind::CurlyOpen | TokenKind::SquareOpen => {
                    depth += 1;
                    self.bump();
                }
                TokenKind::ParenClose | TokenKind::SquareClose => {
                    depth -= 1;
                    self.bump();
                }
                TokenKind::CurlyClose => {
                    if depth <= 0 {
                        self.bump();
                        return;
                    }
                    depth -= 1;
                    self.bump();
                }
                TokenKind::SemiColon if depth <= 0 => {
                    self.bump();
                    return;
                }
                k if depth <= 0 && is_top_level_starter(k) => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn token_range_from(&self, begin: usize) -> TokenRange {
        TokenRange::new(u32::try_from(begin).expect("file too large"), u32::try_from(self.pos).expect("file too large"))
    }

    /// Skips a balanced `{ ... }` / `( ... )` / `[ ... ]` body, returning the
    /// token range *inside* the delimiters for deferred parsing. `open` must
    /// already have been consumed by the caller.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> TokenRange {
        let begin = self.pos;
        let mut depth: i32 = 1;
        loop {
            match self.kind() {
                TokenKind::Eof => break,
                k if k == open => {
                    depth += 1;
                    self.bump();
                }
                k if k == close => {
                    depth -= 1;
                    if depth == 0 {
                        let range = self.token_range_from(begin);
                        self.bump();
                        return range;
                    }
                    self.bump();
                }
                _ => {
                    self.bump();
                }
            }
        }
        self.token_range_from(begin)
    }

    // ---- Typespec ----------------------------------------------------

    /// Parses a typespec: a run of prefix modifiers ending in a terminator
    /// (§3 Typespec). Never fails outright; an unparseable terminator is
    /// stashed as `Terminator::Unresolved` over the remaining tokens on the
    /// current line/bracket so the caller can still make progress.
    pub fn parse_typespec(&mut self, sink: &mut DiagnosticSink) -> Typespec {
        let mut modifiers = smallvec::SmallVec::new();
        loop {
            let m = match self.kind() {
                TokenKind::Multiply => Some(Modifier::Pointer),
                TokenKind::BitAnd => Some(Modifier::LvalueReference),
                TokenKind::KwMove => Some(Modifier::MoveReference),
                TokenKind::KwMut if modifiers.is_empty() => Some(Modifier::Mut),
                TokenKind::KwConst if modifiers.is_empty() => Some(Modifier::Const),
                TokenKind::KwConsteval if modifiers.is_empty() => Some(Modifier::Consteval),
                TokenKind::KwOptional => Some(Modifier::Optional),
                TokenKind::KwVariadic => Some(Modifier::Variadic),
                TokenKind::SquareOpen => {
                    self.bump();
                    if self.eat(TokenKind::SquareClose) {
                        Some(Modifier::ArraySlice)
                    } else {
                        let expr = self.parse_expr_no_comma(sink);
                        self.expect(TokenKind::SquareClose, sink);
                        let len = expr.constant_value().and_then(|v| match v {
                            crate::types::constant_value::ConstantValue::Uint(n) => Some(*n),
                            crate::types::constant_value::ConstantValue::Sint(n) if *n >= 0 => Some(*n as u64),
                            _ => None,
                        });
                        Some(Modifier::Array(len.unwrap_or(0)))
                    }
                }
                _ => None,
            };
            match m {
                Some(m) => {
                    self.bump_if_modifier_needs_no_token(&m);
                    modifiers.push(m);
                }
                None => break,
            }
        }
        let terminator = self.parse_terminator(sink);
        Typespec { modifiers, terminator }
    }

    /// `Array`/`ArraySlice` already consume their own tokens inside the
    /// `[...]` branch above; every other modifier is a single keyword/symbol
    /// token that still needs consuming.
    fn bump_if_modifier_needs_no_token(&mut self, m: &Modifier) {
        if !matches!(m, Modifier::Array(_) | Modifier::ArraySlice) {
            self.bump();
        }
    }

    fn parse_terminator(&mut self, sink: &mut DiagnosticSink) -> Terminator {
        match self.kind() {
            TokenKind::KwVoid => {
                self.bump();
                Terminator::Void
            }
            TokenKind::KwAuto => {
                self.bump();
                Terminator::Auto
            }
            TokenKind::KwTypename => {
                self.bump();
                Terminator::Typename
            }
            TokenKind::KwTypeof => {
                self.bump();
                let name = self.expect_identifier(sink);
                Terminator::Typeof(name)
            }
            TokenKind::ParenOpen => {
                self.bump();
                let mut elems = Vec::new();
                while !self.check(TokenKind::ParenClose) && !self.at_eof() {
                    elems.push(self.parse_typespec(sink));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::ParenClose, sink);
                Terminator::Tuple(elems)
            }
            TokenKind::KwEnum => {
                self.bump();
                self.expect(TokenKind::ParenOpen, sink);
                let mut cases = Vec::new();
                while !self.check(TokenKind::ParenClose) && !self.at_eof() {
                    let name = self.expect_identifier(sink);
                    let value = if self.eat(TokenKind::Assign) {
                        self.parse_expr_no_comma(sink).constant_value().and_then(|v| match v {
                            crate::types::constant_value::ConstantValue::Sint(n) => Some(*n),
                            crate::types::constant_value::ConstantValue::Uint(n) => Some(*n as i64),
                            _ => None,
                        })
                    } else {
                        None
                    };
                    cases.push(EnumCase { name, value });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::ParenClose, sink);
                Terminator::Enum(cases)
            }
            TokenKind::KwFunction => {
                self.bump();
                let cc = self.parse_calling_convention();
                self.expect(TokenKind::ParenOpen, sink);
                let mut params = Vec::new();
                while !self.check(TokenKind::ParenClose) && !self.at_eof() {
                    params.push(self.parse_typespec(sink));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::ParenClose, sink);
                let ret = if self.eat(TokenKind::Arrow) { self.parse_typespec(sink) } else { Typespec::void() };
                Terminator::Function { cc, params, ret: Box::new(ret) }
            }
            TokenKind::Identifier => {
                let name = intern(&self.bump().value);
                Terminator::BaseType(name)
            }
            _ => {
                let begin = self.pos;
                sink.report(Diagnostic::new(
                    DiagnosticKind::ParseError { reason: format!("expected a type, found {:?}", self.kind()) },
                    self.src_tokens_here(),
                ));
                // Consume one token so callers always make progress.
                if !self.at_eof() {
                    self.bump();
                }
                Terminator::Unresolved(UnresolvedTokenRange { file_id: self.file_id, begin: u32::try_from(begin).unwrap_or(0), end: u32::try_from(self.pos).unwrap_or(0) })
            }
        }
    }

    fn parse_calling_convention(&mut self) -> CallingConvention {
        if self.check(TokenKind::Identifier) {
            match self.peek().value.as_str() {
                "__cdecl" => {
                    self.bump();
                    CallingConvention::C
                }
                "__fastcall" => {
                    self.bump();
                    CallingConvention::Fast
                }
                _ => CallingConvention::Std,
            }
        } else {
            CallingConvention::Std
        }
    }

    fn expect_identifier(&mut self, sink: &mut DiagnosticSink) -> Symbol {
        if self.check(TokenKind::Identifier) {
            intern(&self.bump().value)
        } else {
            sink.report(Diagnostic::new(
                DiagnosticKind::ParseError { reason: format!("expected an identifier, found {:?}", self.kind()) },
                self.src_tokens_here(),
            ));
            intern("<error>")
        }
    }

    /// A parameter's `: Type` is optional: a bare name (e.g. the spec's
    /// `factorial(n)`) is an implicit, untyped generic placeholder, parsed
    /// as `Terminator::Auto` and folded into `generic` by the caller.
    fn parse_arg_list(&mut self, sink: &mut DiagnosticSink) -> Vec<Arg> {
        let mut args = Vec::new();
        self.expect(TokenKind::ParenOpen, sink);
        while !self.check(TokenKind::ParenClose) && !self.at_eof() {
            let name = self.expect_identifier(sink);
            let ty = if self.eat(TokenKind::Colon) { self.parse_typespec(sink) } else { Typespec::new(Terminator::Auto) };
            args.push(Arg { name, ty });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::ParenClose, sink);
        args
    }

    // ---- Top-level / struct-body declarations -------------------------

    /// Parses every declaration in the file, stashing bodies as token
    /// ranges. Returns the declarations in source order; the resolver owns
    /// turning this into an arena and a scope tree.
    pub fn parse_file(&mut self, sink: &mut DiagnosticSink) -> Vec<Decl> {
        let mut decls = Vec::new();
        while !self.at_eof() {
            match self.parse_top_level_decl(sink) {
                Some(d) => decls.push(d),
                None => self.synchronize(),
            }
        }
        decls
    }

    pub fn parse_top_level_decl(&mut self, sink: &mut DiagnosticSink) -> Option<Decl> {
        let attributes = self.parse_attributes(sink);
        let mut decl = match self.kind() {
            TokenKind::KwImport => self.parse_import(sink),
            TokenKind::KwExport => {
                self.bump();
                self.parse_top_level_decl(sink)
            }
            TokenKind::KwLet | TokenKind::KwMut | TokenKind::KwConsteval => self.parse_variable_decl(sink),
            TokenKind::KwFunction => self.parse_function_decl(sink),
            TokenKind::KwOperator => self.parse_operator_decl(sink),
            TokenKind::KwStruct => self.parse_struct_decl(sink),
            TokenKind::KwEnum => self.parse_enum_decl(sink),
            TokenKind::KwType => self.parse_type_alias(sink),
            _ => {
                let found = self.peek().clone();
                sink.report(Diagnostic::new(
                    DiagnosticKind::ParseError { reason: format!("expected a declaration, found {:?} ('{}')", found.kind, found.value) },
                    self.src_tokens_here(),
                ));
                None
            }
        };
        if let Some(d) = &mut decl {
            set_attributes(d, attributes);
        }
        decl
    }

    /// Parses zero or more leading `@name(arg, …)` attributes (§4.R
    /// "Attribute application"). Arguments are left unresolved; the
    /// resolver's attribute stage folds and applies them.
    fn parse_attributes(&mut self, sink: &mut DiagnosticSink) -> Vec<Attribute> {
        let mut attrs = Vec::new();
        while self.check(TokenKind::At) {
            let at_tok = self.bump();
            let name = self.expect_identifier(sink);
            let mut args = Vec::new();
            if self.eat(TokenKind::ParenOpen) {
                while !self.check(TokenKind::ParenClose) && !self.at_eof() {
                    args.push(self.parse_expr_no_comma(sink));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::ParenClose, sink);
            }
            attrs.push(Attribute { name, args, src_tokens: self.span_from(&at_tok) });
        }
        attrs
    }

    fn parse_import(&mut self, sink: &mut DiagnosticSink) -> Option<Decl> {
        self.bump(); // import
        let path_tok = self.expect(TokenKind::StringLiteral, sink)?;
        let name = if self.eat(TokenKind::KwAs) { self.expect_identifier(sink) } else { intern(&path_tok.value) };
        self.expect(TokenKind::SemiColon, sink);
        Some(Decl::Import { name, path: path_tok.value })
    }

    fn parse_variable_decl(&mut self, sink: &mut DiagnosticSink) -> Option<Decl> {
        let is_consteval = self.eat(TokenKind::KwConsteval);
        let is_mut = self.eat(TokenKind::KwMut);
        self.eat(TokenKind::KwLet);
        let begin = self.pos;
        let name = self.expect_identifier(sink);
        let var_type = if self.eat(TokenKind::Colon) { Some(self.parse_typespec(sink)) } else { None };
        let init_expr = if self.eat(TokenKind::Assign) {
            let e_begin = self.pos;
            let expr = self.parse_expr_no_comma(sink);
            let _ = e_begin;
            Some(expr)
        } else {
            None
        };
        self.expect(TokenKind::SemiColon, sink);
        Some(Decl::Variable(VariableDecl {
            name,
            prototype_modifiers: self.token_range_from(begin),
            var_type,
            init_expr,
            tuple_decls: Vec::new(),
            is_mut,
            is_consteval,
            attributes: Vec::new(),
            resolve_state: ResolveState::None,
        }))
    }

    fn parse_function_decl(&mut self, sink: &mut DiagnosticSink) -> Option<Decl> {
        self.bump(); // function
        let cc = self.parse_calling_convention();
        let symbol_name = self.expect_identifier(sink);
        let mut type_params = Vec::new();
        let mut generic = self.eat(TokenKind::LessThan) && {
            while !self.check(TokenKind::GreaterThan) && !self.at_eof() {
                if self.check(TokenKind::Identifier) {
                    type_params.push(intern(&self.peek().value));
                }
                self.bump();
            }
            self.eat(TokenKind::GreaterThan);
            true
        };
        let mut params = self.parse_arg_list(sink);
        let mut return_type = if self.eat(TokenKind::Arrow) { self.parse_typespec(sink) } else { Typespec::void() };
        // A bare, untyped parameter (`factorial(n)`, no `<...>` list at all)
        // is an implicit generic placeholder in its own right (§4.R).
        let implicit_generic = params.iter().any(|p| p.ty.modifiers.is_empty() && matches!(p.ty.terminator, Terminator::Auto));
        generic = generic || implicit_generic;
        if generic {
            // A type parameter's declared type is itself the placeholder
            // substituted at specialization time (§4.R); stamp every
            // occurrence of one of `<T, U, ...>`'s names as `GenericParam`
            // so overload scoring treats it as "matches anything" until
            // `GenericCache::get_or_create` fills in the concrete type.
            // Implicit (untyped) parameters are already `Auto` and need no
            // further stamping.
            for p in &mut params {
                mark_generic_placeholder(&mut p.ty, &type_params);
            }
            mark_generic_placeholder(&mut return_type, &type_params);
        }
        let (body_tokens, flags) = self.parse_function_tail(sink, generic);
        Some(Decl::Function(FunctionBody {
            symbol_name,
            params,
            return_type,
            cc,
            body_tokens,
            body: None,
            flags,
            generic_specializations: Vec::new(),
            generic_parent: None,
            constructor_or_destructor_of: None,
            attributes: Vec::new(),
            resolve_state: ResolveState::None,
        }))
    }

    /// Consumes either `;` (forward/intrinsic declaration) or a `{ ... }`
    /// body, returning the stashed body range and accumulated flags.
    fn parse_function_tail(&mut self, sink: &mut DiagnosticSink, generic: bool) -> (Option<TokenRange>, FunctionFlags) {
        let mut flags = FunctionFlags::empty();
        if generic {
            flags |= FunctionFlags::GENERIC;
        }
        if self.check(TokenKind::Identifier) && self.peek().value == "intrinsic" {
            self.bump();
            flags |= FunctionFlags::INTRINSIC;
        }
        if self.eat(TokenKind::SemiColon) {
            return (None, flags);
        }
        if self.expect(TokenKind::CurlyOpen, sink).is_none() {
            return (None, flags);
        }
        let range = self.skip_balanced(TokenKind::CurlyOpen, TokenKind::CurlyClose);
        (Some(range), flags)
    }

    fn parse_operator_decl(&mut self, sink: &mut DiagnosticSink) -> Option<Decl> {
        self.bump(); // operator
        let cc = self.parse_calling_convention();
        let kind: OperatorKind = self.kind();
        self.bump();
        let params = self.parse_arg_list(sink);
        let return_type = if self.eat(TokenKind::Arrow) { self.parse_typespec(sink) } else { Typespec::void() };
        let (body_tokens, flags) = self.parse_function_tail(sink, false);
        let symbol_name = intern(&format!("operator{kind:?}"));
        Some(Decl::Operator {
            kind,
            body: FunctionBody {
                symbol_name,
                params,
                return_type,
                cc,
                body_tokens,
                body: None,
                flags: flags | FunctionFlags::BUILTIN_OPERATOR,
                generic_specializations: Vec::new(),
                generic_parent: None,
                constructor_or_destructor_of: None,
                attributes: Vec::new(),
                resolve_state: ResolveState::None,
            },
        })
    }

    fn parse_struct_decl(&mut self, sink: &mut DiagnosticSink) -> Option<Decl> {
        self.bump(); // struct
        let name = self.expect_identifier(sink);
        self.expect(TokenKind::CurlyOpen, sink)?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(TokenKind::CurlyClose) && !self.at_eof() {
            if self.check(TokenKind::KwFunction) {
                if let Some(Decl::Function(f)) = self.parse_function_decl(sink) {
                    methods.push(f);
                }
                continue;
            }
            let field_name = self.expect_identifier(sink);
            self.expect(TokenKind::Colon, sink);
            let ty = self.parse_typespec(sink);
            self.expect(TokenKind::SemiColon, sink);
            fields.push(StructField { name: field_name, ty });
        }
        self.expect(TokenKind::CurlyClose, sink);
        Some(Decl::Struct { name, info: TypeInfo { name, fields, methods, constructor: None, destructor: None }, resolve_state: ResolveState::None })
    }

    fn parse_enum_decl(&mut self, sink: &mut DiagnosticSink) -> Option<Decl> {
        self.bump(); // enum
        let name = self.expect_identifier(sink);
        let underlying = if self.eat(TokenKind::Colon) { self.parse_typespec(sink) } else { Typespec::new(Terminator::BaseType(intern("i32"))) };
        self.expect(TokenKind::CurlyOpen, sink)?;
        let mut variants = Vec::new();
        while !self.check(TokenKind::CurlyClose) && !self.at_eof() {
            let vname = self.expect_identifier(sink);
            let value = if self.eat(TokenKind::Assign) { Some(self.parse_expr_no_comma(sink)) } else { None };
            variants.push(EnumVariant { name: vname, value });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CurlyClose, sink);
        Some(Decl::Enum { name, variants, underlying, resolve_state: ResolveState::None })
    }

    fn parse_type_alias(&mut self, sink: &mut DiagnosticSink) -> Option<Decl> {
        self.bump(); // type
        let name = self.expect_identifier(sink);
        self.expect(TokenKind::Assign, sink);
        let target = self.parse_typespec(sink);
        self.expect(TokenKind::SemiColon, sink);
        Some(Decl::TypeAlias { name, target })
    }
}

/// Attaches parsed leading attributes to whichever declaration variant can
/// carry them (§4.R); struct/enum/alias/import declarations have no
/// attribute slot, so attributes written before them are discarded with no
/// diagnostic (mirroring `maybe_unused`-style silent-if-inapplicable attrs).
/// Rewrites a bare reference to one of `type_params` (e.g. `T` in
/// `x: T`) into `Terminator::GenericParam(T)`, leaving anything wrapped in a
/// modifier (`T*`, `[]T`, ...) alone (§4.R Open Questions: only the
/// unmodified parameter position is specialized positionally). Keeping the
/// name (rather than collapsing to `Auto`) lets `specialize` substitute a
/// `-> T` return type by which parameter actually supplied `T`.
fn mark_generic_placeholder(ty: &mut Typespec, type_params: &[Symbol]) {
    if ty.modifiers.is_empty() {
        if let Terminator::BaseType(name) = &ty.terminator {
            let name = *name;
            if type_params.contains(&name) {
                ty.terminator = Terminator::GenericParam(name);
            }
        }
    }
}

fn set_attributes(decl: &mut Decl, attributes: Vec<Attribute>) {
    match decl {
        Decl::Variable(v) => v.attributes = attributes,
        Decl::Function(f) | Decl::Operator { body: f, .. } => f.attributes = attributes,
        _ => {}
    }
}

fn is_top_level_starter(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::KwFunction
            | TokenKind::KwOperator
            | TokenKind::KwStruct
            | TokenKind::KwEnum
            | TokenKind::KwImport
            | TokenKind::KwExport
            | TokenKind::KwType
            | TokenKind::KwLet
            | TokenKind::KwNamespace
    )
}

/// Top-level entry point: parse a whole file's declarations, in source
/// order. The resolver owns turning these into an arena and scope tree
/// (§4.P, §6).
#[must_use]
pub fn parse_file(tokens: &[Token], file_id: u32, sink: &mut DiagnosticSink) -> Vec<Decl> {
    Parser::new(tokens, file_id).parse_file(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn decls(src: &str) -> Vec<Decl> {
        let (tokens, sink) = lex(src, 0);
        assert!(!sink.has_errors(), "lex errors: {:?}", sink.diagnostics());
        let mut sink = DiagnosticSink::new();
        let mut parser = Parser::new(&tokens, 0);
        let decls = parser.parse_file(&mut sink);
        assert!(!sink.has_errors(), "parse errors: {:?}", sink.diagnostics());
        decls
    }

    #[test]
    fn parses_a_simple_function() {
        let ds = decls("function add(a: i32, b: i32) -> i32 { return a + b; }");
        assert_eq!(ds.len(), 1);
        match &ds[0] {
            Decl::Function(f) => {
                assert_eq!(f.params.len(), 2);
                assert!(f.body_tokens.is_some());
            }
            other => panic!("expected a function decl, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_global_let_with_initializer() {
        let ds = decls("let x: i32 = 1 + 2;");
        match &ds[0] {
            Decl::Variable(v) => assert!(v.init_expr.is_some()),
            other => panic!("expected a variable decl, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_struct_with_fields() {
        let ds = decls("struct Point { x: i32; y: i32; }");
        match &ds[0] {
            Decl::Struct { info, .. } => assert_eq!(info.fields.len(), 2),
            other => panic!("expected a struct decl, got {other:?}"),
        }
    }

    #[test]
    fn recovers_after_a_malformed_declaration() {
        let (tokens, _) = lex("@@@ function ok() -> void;", 0);
        let mut sink = DiagnosticSink::new();
        let mut parser = Parser::new(&tokens, 0);
        let ds = parser.parse_file(&mut sink);
        assert!(sink.has_errors());
        assert_eq!(ds.len(), 1);
    }
}
