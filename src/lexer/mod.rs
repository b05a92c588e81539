//! Source bytes → token stream (§4.L).

pub mod token;

use crate::diagnostics::{BytePos, Diagnostic, DiagnosticKind, DiagnosticSink, SrcTokens};
use crate::token_info::keyword_kind;
use smallvec::SmallVec;
use token::{Token, TokenKind};

/// Punctuation spellings tried longest-first at each position, implementing
/// the "walk a character trie; on first mismatch emit the longest matching
/// punctuation" rule from §4.L without needing an actual trie data
/// structure: a short, pre-sorted linear scan over at most a handful of
/// candidates per starting byte is just as correct and much simpler.
const PUNCTUATION: &[(&str, TokenKind)] = &[
    ("...", TokenKind::DotDotDot),
    ("..=", TokenKind::DotDotEq),
    ("<<=", TokenKind::BitLeftShiftEq),
    (">>=", TokenKind::BitRightShiftEq),
    ("::", TokenKind::Scope),
    ("->", TokenKind::Arrow),
    ("=>", TokenKind::FatArrow),
    ("..", TokenKind::DotDot),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
    ("+=", TokenKind::PlusEq),
    ("-=", TokenKind::MinusEq),
    ("*=", TokenKind::MultiplyEq),
    ("/=", TokenKind::DivideEq),
    ("%=", TokenKind::ModuloEq),
    ("<<", TokenKind::BitLeftShift),
    (">>", TokenKind::BitRightShift),
    ("&=", TokenKind::BitAndEq),
    ("^=", TokenKind::BitXorEq),
    ("|=", TokenKind::BitOrEq),
    ("==", TokenKind::Equals),
    ("!=", TokenKind::NotEquals),
    ("<=", TokenKind::LessThanEq),
    (">=", TokenKind::GreaterThanEq),
    ("&&", TokenKind::BoolAnd),
    ("^^", TokenKind::BoolXor),
    ("||", TokenKind::BoolOr),
    ("(", TokenKind::ParenOpen),
    (")", TokenKind::ParenClose),
    ("{", TokenKind::CurlyOpen),
    ("}", TokenKind::CurlyClose),
    ("[", TokenKind::SquareOpen),
    ("]", TokenKind::SquareClose),
    (";", TokenKind::SemiColon),
    (":", TokenKind::Colon),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    ("?", TokenKind::QuestionMark),
    ("@", TokenKind::At),
    ("=", TokenKind::Assign),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Multiply),
    ("/", TokenKind::Divide),
    ("%", TokenKind::Modulo),
    ("<", TokenKind::LessThan),
    (">", TokenKind::GreaterThan),
    ("&", TokenKind::BitAnd),
    ("^", TokenKind::BitXor),
    ("|", TokenKind::BitOr),
    ("~", TokenKind::BitNot),
    ("!", TokenKind::BoolNot),
];

/// Scans a single file's source bytes into a token stream.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    file_id: u32,
}

/// A prepared source buffer: CR stripped so all positions are LF-based (§4.L).
pub struct PreparedSource {
    pub bytes: Vec<u8>,
}

#[must_use]
pub fn strip_cr(src: &str) -> PreparedSource {
    let mut bytes = Vec::with_capacity(src.len());
    let mut it = src.bytes().peekable();
    while let Some(b) = it.next() {
        if b == b'\r' {
            continue;
        }
        bytes.push(b);
    }
    PreparedSource { bytes }
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(src: &'a PreparedSource, file_id: u32) -> Self {
        Lexer { src: &src.bytes, pos: 0, line: 1, file_id }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, off: usize) -> Option<u8> {
        self.src.get(self.pos + off).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn pos_u32(&self) -> BytePos {
        u32::try_from(self.pos).expect("source file too large")
    }

    fn skip_whitespace_and_comments(&mut self, sink: &mut DiagnosticSink) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let begin = self.pos_u32();
                    self.bump();
                    self.bump();
                    let mut depth = 1u32;
                    while depth > 0 {
                        match self.peek() {
                            None => {
                                sink.report(Diagnostic::new(
                                    DiagnosticKind::LexError { reason: "unterminated block comment".into() },
                                    SrcTokens::point(self.file_id, begin),
                                ));
                                return;
                            }
                            Some(b'/') if self.peek_at(1) == Some(b'*') => {
                                self.bump();
                                self.bump();
                                depth += 1;
                            }
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.bump();
                                self.bump();
                                depth -= 1;
                            }
                            _ => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Tokenize the whole file. Never panics on malformed UTF-8: invalid
    /// byte sequences are reported and skipped a byte at a time (§4.L).
    pub fn tokenize(mut self, sink: &mut DiagnosticSink) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments(sink);
            let Some(b) = self.peek() else { break };
            let begin = self.pos_u32();
            let line = self.line;
            if b.is_ascii_alphabetic() || b == b'_' {
                tokens.push(self.scan_identifier_or_keyword(begin, line));
            } else if b.is_ascii_digit() {
                tokens.push(self.scan_number(begin, line, sink));
            } else if b == b'"' {
                tokens.push(self.scan_string(begin, line, sink));
            } else if b == b'`' {
                tokens.push(self.scan_raw_string(begin, line, sink));
            } else if b == b'\'' {
                tokens.push(self.scan_char(begin, line, sink));
            } else if !b.is_ascii() {
                match self.scan_utf8_char() {
                    Ok(_) => {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::LexError { reason: "unexpected character".into() },
                            SrcTokens::point(self.file_id, begin),
                        ));
                    }
                    Err(()) => {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::LexError { reason: "invalid UTF-8 byte sequence".into() },
                            SrcTokens::point(self.file_id, begin),
                        ));
                        self.bump();
                    }
                }
            } else if let Some(tok) = self.scan_punctuation(begin, line) {
                tokens.push(tok);
            } else {
                sink.report(Diagnostic::new(
                    DiagnosticKind::LexError { reason: format!("unexpected byte 0x{b:02x}") },
                    SrcTokens::point(self.file_id, begin),
                ));
                self.bump();
            }
        }
        let end = self.pos_u32();
        tokens.push(Token::eof(self.file_id, self.line, end));
        tokens
    }

    /// Consumes one (possibly multi-byte) UTF-8 scalar value without
    /// interpreting it as source syntax; used only to skip over stray
    /// non-ASCII bytes outside of string/identifier contexts.
    fn scan_utf8_char(&mut self) -> Result<char, ()> {
        let rest = &self.src[self.pos..];
        let s = std::str::from_utf8(rest).map_err(|_| ())?;
        let c = s.chars().next().ok_or(())?;
        for _ in 0..c.len_utf8() {
            self.bump();
        }
        Ok(c)
    }

    fn scan_punctuation(&mut self, begin: BytePos, line: u32) -> Option<Token> {
        let rest = &self.src[self.pos..];
        for &(spelling, kind) in PUNCTUATION {
            if rest.starts_with(spelling.as_bytes()) {
                for _ in 0..spelling.len() {
                    self.bump();
                }
                return Some(Token::new(kind, spelling, self.file_id, line, begin, self.pos_u32()));
            }
        }
        None
    }

    fn scan_identifier_or_keyword(&mut self, begin: BytePos, line: u32) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.bump();
        }
        let spelling = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("").to_owned();
        let kind = keyword_kind(&spelling).unwrap_or(TokenKind::Identifier);
        Token::new(kind, spelling, self.file_id, line, begin, self.pos_u32())
    }

    fn scan_number(&mut self, begin: BytePos, line: u32, sink: &mut DiagnosticSink) -> Token {
        let start = self.pos;
        let mut kind = TokenKind::IntegerLiteral;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.bump();
            self.bump();
            kind = TokenKind::HexLiteral;
            while matches!(self.peek(), Some(b) if b.is_ascii_hexdigit() || b == b'_') {
                self.bump();
            }
        } else if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'o' | b'O')) {
            self.bump();
            self.bump();
            kind = TokenKind::OctLiteral;
            while matches!(self.peek(), Some(b'0'..=b'7' | b'_')) {
                self.bump();
            }
        } else if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'b' | b'B')) {
            self.bump();
            self.bump();
            kind = TokenKind::BinLiteral;
            while matches!(self.peek(), Some(b'0' | b'1' | b'_')) {
                self.bump();
            }
        } else {
            while matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'_') {
                self.bump();
            }
            if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b) if b.is_ascii_digit()) {
                kind = TokenKind::FloatingPointLiteral;
                self.bump();
                while matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'_') {
                    self.bump();
                }
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                let save = self.pos;
                self.bump();
                if matches!(self.peek(), Some(b'+' | b'-')) {
                    self.bump();
                }
                if matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                    kind = TokenKind::FloatingPointLiteral;
                    while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                        self.bump();
                    }
                } else {
                    self.pos = save;
                }
            }
        }
        let value = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("").to_owned();
        let postfix = self.scan_postfix();
        if postfix.is_some() && !matches!(kind, TokenKind::IntegerLiteral | TokenKind::FloatingPointLiteral | TokenKind::HexLiteral | TokenKind::OctLiteral | TokenKind::BinLiteral) {
            sink.report(Diagnostic::new(
                DiagnosticKind::LexError { reason: "unexpected suffix on numeric literal".into() },
                SrcTokens::point(self.file_id, begin),
            ));
        }
        let tok = Token::new(kind, value, self.file_id, line, begin, self.pos_u32());
        match postfix {
            Some(p) => tok.with_postfix(p),
            None => tok,
        }
    }

    /// Identifier-style postfix scan for typed numeric literal suffixes
    /// (`u8 u16 u32 u64 i8 i16 i32 i64 f32 f64`), §4.L / §6.
    fn scan_postfix(&mut self) -> Option<String> {
        if !matches!(self.peek(), Some(b) if b.is_ascii_alphabetic() || b == b'_') {
            return None;
        }
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.bump();
        }
        Some(std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("").to_owned())
    }

    fn scan_string(&mut self, begin: BytePos, line: u32, sink: &mut DiagnosticSink) -> Token {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::LexError { reason: "unterminated string literal".into() },
                        SrcTokens::point(self.file_id, begin),
                    ));
                    break;
                }
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    self.bump();
                    self.scan_escape(&mut value, sink);
                }
                Some(_) => match self.scan_utf8_char() {
                    Ok(c) => value.push(c),
                    Err(()) => {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::LexError { reason: "invalid UTF-8 in string literal".into() },
                            SrcTokens::point(self.file_id, self.pos_u32()),
                        ));
                        self.bump();
                    }
                },
            }
        }
        // Adjacent string literals with no intervening whitespace-only
        // postfix concatenate (§4.L). We detect this by peeking past the
        // closing quote: if another `"` starts immediately, continue.
        while self.peek() == Some(b'"') {
            self.bump();
            loop {
                match self.peek() {
                    None | Some(b'\n') => break,
                    Some(b'"') => {
                        self.bump();
                        break;
                    }
                    Some(b'\\') => {
                        self.bump();
                        self.scan_escape(&mut value, sink);
                    }
                    Some(_) => match self.scan_utf8_char() {
                        Ok(c) => value.push(c),
                        Err(()) => {
                            self.bump();
                        }
                    },
                }
            }
        }
        Token::new(TokenKind::StringLiteral, value, self.file_id, line, begin, self.pos_u32())
    }

    fn scan_escape(&mut self, out: &mut String, sink: &mut DiagnosticSink) {
        let begin = self.pos_u32();
        match self.bump() {
            Some(b'n') => out.push('\n'),
            Some(b'r') => out.push('\r'),
            Some(b't') => out.push('\t'),
            Some(b'\\') => out.push('\\'),
            Some(b'\'') => out.push('\''),
            Some(b'"') => out.push('"'),
            Some(b'0') => out.push('\0'),
            Some(b'x') => {
                let mut v: u32 = 0;
                for _ in 0..2 {
                    match self.peek() {
                        Some(b) if b.is_ascii_hexdigit() => {
                            v = v * 16 + u32::from((b as char).to_digit(16).unwrap());
                            self.bump();
                        }
                        _ => {
                            sink.report(Diagnostic::new(
                                DiagnosticKind::LexError { reason: "invalid \\x escape, expected 2 hex digits".into() },
                                SrcTokens::point(self.file_id, begin),
                            ));
                            return;
                        }
                    }
                }
                out.push(v as u8 as char);
            }
            Some(b'u') => {
                let mut v: u32 = 0;
                for _ in 0..4 {
                    match self.peek() {
                        Some(b) if b.is_ascii_hexdigit() => {
                            v = v * 16 + u32::from((b as char).to_digit(16).unwrap());
                            self.bump();
                        }
                        _ => {
                            sink.report(Diagnostic::new(
                                DiagnosticKind::LexError { reason: "invalid \\u escape, expected 4 hex digits".into() },
                                SrcTokens::point(self.file_id, begin),
                            ));
                            return;
                        }
                    }
                }
                match char::from_u32(v) {
                    Some(c) => out.push(c),
                    None => sink.report(Diagnostic::new(
                        DiagnosticKind::LexError { reason: format!("invalid Unicode escape \\u{v:04x}") },
                        SrcTokens::point(self.file_id, begin),
                    )),
                }
            }
            Some(b'U') => {
                if self.peek() != Some(b'{') {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::LexError { reason: "expected '{' after \\U".into() },
                        SrcTokens::point(self.file_id, begin),
                    ));
                    return;
                }
                self.bump();
                let mut v: u32 = 0;
                let mut digits: SmallVec<[u8; 8]> = SmallVec::new();
                while matches!(self.peek(), Some(b) if b.is_ascii_hexdigit()) {
                    let b = self.bump().unwrap();
                    digits.push(b);
                    v = v.saturating_mul(16).saturating_add(u32::from((b as char).to_digit(16).unwrap()));
                }
                if self.peek() == Some(b'}') {
                    self.bump();
                } else {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::LexError { reason: "expected '}' to close \\U{...}".into() },
                        SrcTokens::point(self.file_id, begin),
                    ));
                    return;
                }
                match char::from_u32(v) {
                    Some(c) if !digits.is_empty() => out.push(c),
                    _ => sink.report(Diagnostic::new(
                        DiagnosticKind::LexError { reason: format!("invalid Unicode escape \\U{{{v:x}}}") },
                        SrcTokens::point(self.file_id, begin),
                    )),
                }
            }
            Some(other) => {
                sink.report(Diagnostic::new(
                    DiagnosticKind::LexError { reason: format!("unknown escape sequence '\\{}'", other as char) },
                    SrcTokens::point(self.file_id, begin),
                ));
            }
            None => {
                sink.report(Diagnostic::new(
                    DiagnosticKind::LexError { reason: "unterminated escape sequence".into() },
                    SrcTokens::point(self.file_id, begin),
                ));
            }
        }
    }

    /// Raw strings are backtick-delimited and receive no escape processing (§4.L).
    fn scan_raw_string(&mut self, begin: BytePos, line: u32, sink: &mut DiagnosticSink) -> Token {
        self.bump(); // opening backtick
        let start = self.pos;
        loop {
            match self.peek() {
                None => {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::LexError { reason: "unterminated raw string literal".into() },
                        SrcTokens::point(self.file_id, begin),
                    ));
                    break;
                }
                Some(b'`') => break,
                _ => {
                    self.bump();
                }
            }
        }
        let value = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        if self.peek() == Some(b'`') {
            self.bump();
        }
        Token::new(TokenKind::StringLiteral, value, self.file_id, line, begin, self.pos_u32())
    }

    fn scan_char(&mut self, begin: BytePos, line: u32, sink: &mut DiagnosticSink) -> Token {
        self.bump(); // opening quote
        let mut value = String::new();
        match self.peek() {
            Some(b'\\') => {
                self.bump();
                self.scan_escape(&mut value, sink);
            }
            Some(_) => match self.scan_utf8_char() {
                Ok(c) => value.push(c),
                Err(()) => {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::LexError { reason: "invalid UTF-8 in character literal".into() },
                        SrcTokens::point(self.file_id, begin),
                    ));
                }
            },
            None => {
                sink.report(Diagnostic::new(
                    DiagnosticKind::LexError { reason: "unterminated character literal".into() },
                    SrcTokens::point(self.file_id, begin),
                ));
            }
        }
        if self.peek() == Some(b'\'') {
            self.bump();
        } else {
            sink.report(Diagnostic::new(
                DiagnosticKind::LexError { reason: "expected closing ' for character literal".into() },
                SrcTokens::point(self.file_id, begin),
            ));
        }
        Token::new(TokenKind::CharacterLiteral, value, self.file_id, line, begin, self.pos_u32())
    }
}

/// Convenience entry point: strip CR, lex, and return the token stream plus
/// whatever diagnostics were produced.
#[must_use]
pub fn lex(src: &str, file_id: u32) -> (Vec<Token>, DiagnosticSink) {
    let prepared = strip_cr(src);
    let mut sink = DiagnosticSink::new();
    let tokens = Lexer::new(&prepared, file_id).tokenize(&mut sink);
    (tokens, sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, sink) = lex(src, 0);
        assert!(!sink.has_errors(), "unexpected errors lexing {src:?}: {:?}", sink.diagnostics());
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn longest_match_punctuation() {
        assert_eq!(kinds("<<="), vec![TokenKind::BitLeftShiftEq, TokenKind::Eof]);
        assert_eq!(kinds("<<"), vec![TokenKind::BitLeftShift, TokenKind::Eof]);
        assert_eq!(kinds("<"), vec![TokenKind::LessThan, TokenKind::Eof]);
        assert_eq!(kinds(".."), vec![TokenKind::DotDot, TokenKind::Eof]);
        assert_eq!(kinds("..."), vec![TokenKind::DotDotDot, TokenKind::Eof]);
    }

    #[test]
    fn keywords_supersede_identifiers() {
        assert_eq!(kinds("while"), vec![TokenKind::KwWhile, TokenKind::Eof]);
        assert_eq!(kinds("whilex"), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn numeric_postfix_captured_separately() {
        let (tokens, sink) = lex("123u32", 0);
        assert!(!sink.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral);
        assert_eq!(tokens[0].value, "123");
        assert_eq!(tokens[0].postfix, "u32");
    }

    #[test]
    fn float_literal_with_exponent() {
        let (tokens, sink) = lex("1.5e10f64", 0);
        assert!(!sink.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::FloatingPointLiteral);
        assert_eq!(tokens[0].postfix, "f64");
    }

    #[test]
    fn string_escapes_decode() {
        let (tokens, sink) = lex(r#""a\nb\x41B""#, 0);
        assert!(!sink.has_errors());
        assert_eq!(tokens[0].value, "a\nbAB");
    }

    #[test]
    fn raw_string_has_no_escape_processing() {
        let (tokens, sink) = lex(r"`a\nb`", 0);
        assert!(!sink.has_errors());
        assert_eq!(tokens[0].value, r"a\nb");
    }

    #[test]
    fn nested_block_comments() {
        let (tokens, sink) = lex("/* outer /* inner */ still-comment */ 1", 0);
        assert!(!sink.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral);
    }

    #[test]
    fn cr_is_stripped_before_scanning() {
        let (tokens, sink) = lex("1\r\n2", 0);
        assert!(!sink.has_errors());
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string_reports_lex_error_and_continues() {
        let (_, sink) = lex("\"abc\n1", 0);
        assert!(sink.has_errors());
    }

    #[test]
    fn adjacent_string_literals_concatenate() {
        let (tokens, sink) = lex(r#""foo""bar""#, 0);
        assert!(!sink.has_errors());
        assert_eq!(tokens[0].value, "foobar");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
    }
}
