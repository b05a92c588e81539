//! Token kinds and the token value itself (§3 Tokens).

use crate::diagnostics::{BytePos, SrcTokens};

/// The closed enumeration of punctuation, keyword, and literal-class kinds.
/// Multi-character punctuation gets its own kind rather than being
/// represented as a run of single-character tokens; the lexer's
/// longest-match rule (§4.L) guarantees exactly one of these is produced per
/// operator occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum TokenKind {
    Eof = 0,

    ParenOpen,
    ParenClose,
    CurlyOpen,
    CurlyClose,
    SquareOpen,
    SquareClose,
    AngleOpen,
    AngleClose,
    SemiColon,
    Colon,
    Comma,
    Dot,
    QuestionMark,
    At,

    Assign,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    LessThan,
    GreaterThan,
    BitAnd,
    BitXor,
    BitOr,

    BitNot,
    BoolNot,
    AddressOf,
    Dereference,

    Identifier,
    IntegerLiteral,
    FloatingPointLiteral,
    HexLiteral,
    OctLiteral,
    BinLiteral,
    StringLiteral,
    CharacterLiteral,

    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    MultiplyEq,
    DivideEq,
    ModuloEq,
    BitLeftShift,
    BitRightShift,
    BitAndEq,
    BitXorEq,
    BitOrEq,
    BitLeftShiftEq,
    BitRightShiftEq,
    Equals,
    NotEquals,
    LessThanEq,
    GreaterThanEq,
    BoolAnd,
    BoolXor,
    BoolOr,
    Arrow,
    FatArrow,
    Scope,
    DotDot,
    DotDotEq,
    DotDotDot,

    KwIf,
    KwElse,
    KwWhile,
    KwFor,
    KwForeach,
    KwIn,
    KwReturn,
    KwBreak,
    KwContinue,
    KwDefer,
    KwSwitch,
    KwFunction,
    KwOperator,
    KwStruct,
    KwEnum,
    KwNamespace,
    KwSizeof,
    KwTypeof,
    KwImport,
    KwExport,

    KwAs,
    KwMove,
    KwForward,

    KwAuto,
    KwLet,
    KwMut,
    KwConst,
    KwConsteval,
    KwOptional,
    KwVariadic,
    KwTypename,
    KwVoid,

    KwTrue,
    KwFalse,
    KwNull,

    KwStaticAssert,
    KwType,

    Last,
}

impl TokenKind {
    #[must_use]
    pub fn is_eof(self) -> bool {
        self == TokenKind::Eof
    }
}

/// A token as produced by the lexer (§3 Tokens): `(kind, value, postfix,
/// file_id, line, begin, end)`.
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    /// The token's literal spelling, including quotes/escapes as written.
    pub value: String,
    /// For integer/float literals, the optional typed suffix (`u8`, `f64`, ...).
    pub postfix: String,
    pub file_id: u32,
    pub line: u32,
    pub begin: BytePos,
    pub end: BytePos,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, value: impl Into<String>, file_id: u32, line: u32, begin: BytePos, end: BytePos) -> Self {
        Token { kind, value: value.into(), postfix: String::new(), file_id, line, begin, end }
    }

    #[must_use]
    pub fn with_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = postfix.into();
        self
    }

    #[must_use]
    pub fn src_tokens(&self) -> SrcTokens {
        SrcTokens::new(self.file_id, self.begin, self.begin, self.end)
    }

    #[must_use]
    pub fn eof(file_id: u32, line: u32, pos: BytePos) -> Self {
        Token::new(TokenKind::Eof, "", file_id, line, pos, pos)
    }
}

/// A half-open range of indices into a token stream, used to stash unparsed
/// token ranges (e.g. the body of an unresolved typespec, or a deferred
/// function body) for later re-entrant parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenRange {
    pub begin: u32,
    pub end: u32,
}

impl TokenRange {
    #[must_use]
    pub fn new(begin: u32, end: u32) -> Self {
        TokenRange { begin, end }
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.begin
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }
}
