//! Static token-info table (§2 component T, §4.T).
//!
//! One entry per [`TokenKind`], built once at first use into a read-only
//! array keyed by the token-kind enum, the way the original source's
//! `constexpr token_info` table and `mmcc`'s primitive-name tables
//! (`types::entity::make_prims!`) are both built: declaratively, then
//! looked up by index thereafter.

use crate::lexer::token::TokenKind;
use bitflags::bitflags;
use std::sync::LazyLock;

bitflags! {
    /// Per-token-kind flag bitset (§4.T).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TokenFlags: u64 {
        const KEYWORD                        = 1 << 0;
        const UNARY_OPERATOR                 = 1 << 1;
        const BINARY_OPERATOR                = 1 << 2;
        const OPERATOR                       = 1 << 3;
        const UNARY_OVERLOADABLE             = 1 << 4;
        const BINARY_OVERLOADABLE            = 1 << 5;
        const OVERLOADABLE                   = 1 << 6;
        const VALID_EXPRESSION_OR_TYPE_TOKEN = 1 << 7;
        const UNARY_BUILTIN                  = 1 << 8;
        const BINARY_BUILTIN                 = 1 << 9;
        const BUILTIN                        = 1 << 10;
        const UNARY_TYPE_OP                  = 1 << 11;
        const BINARY_TYPE_OP                 = 1 << 12;
        const TYPE_OP                        = 1 << 13;
    }
}

/// `(value, left_associative?)`. A `value` of `-1` (represented here as
/// `None`) is the sentinel meaning "unparseable as this fixity" (§4.T).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Precedence(pub Option<(i32, bool)>);

impl Precedence {
    pub const NONE: Precedence = Precedence(None);

    #[must_use]
    pub fn new(value: i32, left_associative: bool) -> Self {
        Precedence(Some((value, left_associative)))
    }

    #[must_use]
    pub fn is_none(self) -> bool {
        self.0.is_none()
    }

    /// `lhs < rhs ⇔ lhs.value < rhs.value ∨ (!rhs.left_assoc ∧ lhs.value == rhs.value)` (§4.T).
    /// Used by the Pratt parser to decide whether to keep consuming
    /// operators at the current binding power.
    #[must_use]
    pub fn binds_tighter_than(self, rhs: Precedence) -> bool {
        match (self.0, rhs.0) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some((lv, _)), Some((rv, r_left))) => lv < rv || (!r_left && lv == rv),
        }
    }
}

pub const NO_ASSIGN: Precedence = Precedence(Some((17, true)));
pub const NO_COMMA: Precedence = Precedence(Some((19, true)));
pub const POSTFIX_PREC: Precedence = Precedence(Some((2, true)));

#[derive(Clone, Copy, Debug)]
pub struct TokenInfo {
    pub kind: TokenKind,
    pub spelling: &'static str,
    pub display_name: &'static str,
    pub flags: TokenFlags,
    pub unary_prec: Precedence,
    pub binary_prec: Precedence,
}

impl Default for TokenInfo {
    fn default() -> Self {
        TokenInfo {
            kind: TokenKind::Eof,
            spelling: "",
            display_name: "",
            flags: TokenFlags::empty(),
            unary_prec: Precedence::NONE,
            binary_prec: Precedence::NONE,
        }
    }
}

const EXPR_TYPE: TokenFlags = TokenFlags::VALID_EXPRESSION_OR_TYPE_TOKEN;
const OP: TokenFlags = TokenFlags::OPERATOR.union(EXPR_TYPE);
const UNARY_OP: TokenFlags = TokenFlags::UNARY_OPERATOR.union(OP);
const BINARY_OP: TokenFlags = TokenFlags::BINARY_OPERATOR.union(OP);
const UNARY_OVL: TokenFlags = UNARY_OP.union(TokenFlags::UNARY_OVERLOADABLE).union(TokenFlags::OVERLOADABLE);
const BINARY_OVL: TokenFlags = BINARY_OP.union(TokenFlags::BINARY_OVERLOADABLE).union(TokenFlags::OVERLOADABLE);
const KEYWORD: TokenFlags = TokenFlags::KEYWORD;

fn build_table() -> Box<[TokenInfo]> {
    use TokenKind as K;
    let mut t = vec![TokenInfo::default(); K::Last as usize].into_boxed_slice();
    macro_rules! set {
        ($kind:expr, $spelling:expr, $display:expr, $flags:expr) => {
            t[$kind as usize] = TokenInfo {
                kind: $kind, spelling: $spelling, display_name: $display,
                flags: $flags, unary_prec: Precedence::NONE, binary_prec: Precedence::NONE,
            };
        };
    }
    macro_rules! prec {
        ($kind:expr, unary = $uv:expr, $ul:expr) => {
            t[$kind as usize].unary_prec = Precedence::new($uv, $ul);
        };
        ($kind:expr, binary = $bv:expr, $bl:expr) => {
            t[$kind as usize].binary_prec = Precedence::new($bv, $bl);
        };
    }

    set!(K::Eof, "", "end-of-file", TokenFlags::empty());

    set!(K::ParenOpen, "(", "", BINARY_OVL);
    prec!(K::ParenOpen, binary = 2, true); // call
    set!(K::ParenClose, ")", "", EXPR_TYPE);
    set!(K::CurlyOpen, "{", "", EXPR_TYPE);
    set!(K::CurlyClose, "}", "", EXPR_TYPE);
    set!(K::SquareOpen, "[", "", BINARY_OVL);
    prec!(K::SquareOpen, binary = 2, true); // subscript
    set!(K::SquareClose, "]", "", EXPR_TYPE);
    set!(K::AngleOpen, "<", "", BINARY_OP);
    set!(K::AngleClose, ">", "", BINARY_OP);
    set!(K::SemiColon, ";", "", TokenFlags::empty());
    set!(K::Colon, ":", "", TokenFlags::empty());
    set!(K::Comma, ",", "", BINARY_OP);
    prec!(K::Comma, binary = 20, true);
    set!(K::Dot, ".", "", BINARY_OVL);
    prec!(K::Dot, binary = 2, true);
    set!(K::QuestionMark, "?", "", EXPR_TYPE);
    set!(K::At, "@", "", TokenFlags::empty());

    set!(K::Assign, "=", "", BINARY_OP);
    prec!(K::Assign, binary = 18, false);
    set!(K::Plus, "+", "", UNARY_OVL.union(BINARY_OVL));
    prec!(K::Plus, unary = 3, false);
    prec!(K::Plus, binary = 7, true);
    set!(K::Minus, "-", "", UNARY_OVL.union(BINARY_OVL));
    prec!(K::Minus, unary = 3, false);
    prec!(K::Minus, binary = 7, true);
    set!(K::Multiply, "*", "", UNARY_OVL.union(BINARY_OVL));
    prec!(K::Multiply, unary = 3, false); // dereference
    prec!(K::Multiply, binary = 6, true);
    set!(K::Divide, "/", "", BINARY_OVL);
    prec!(K::Divide, binary = 6, true);
    set!(K::Modulo, "%", "", BINARY_OVL);
    prec!(K::Modulo, binary = 6, true);
    set!(K::LessThan, "<", "", BINARY_OVL);
    prec!(K::LessThan, binary = 9, true);
    set!(K::GreaterThan, ">", "", BINARY_OVL);
    prec!(K::GreaterThan, binary = 9, true);
    set!(K::BitAnd, "&", "", UNARY_OVL.union(BINARY_OVL));
    prec!(K::BitAnd, unary = 3, false); // address-of
    prec!(K::BitAnd, binary = 11, true);
    set!(K::BitXor, "^", "", BINARY_OVL);
    prec!(K::BitXor, binary = 12, true);
    set!(K::BitOr, "|", "", BINARY_OVL);
    prec!(K::BitOr, binary = 13, true);

    set!(K::BitNot, "~", "", UNARY_OVL);
    prec!(K::BitNot, unary = 3, false);
    set!(K::BoolNot, "!", "", UNARY_OVL);
    prec!(K::BoolNot, unary = 3, false);
    set!(K::AddressOf, "&", "", UNARY_OVL);
    prec!(K::AddressOf, unary = 3, false);
    set!(K::Dereference, "*", "", UNARY_OVL);
    prec!(K::Dereference, unary = 3, false);

    set!(K::Identifier, "", "identifier", EXPR_TYPE);
    for (k, name) in [
        (K::IntegerLiteral, "integer literal"),
        (K::FloatingPointLiteral, "floating point literal"),
        (K::HexLiteral, "hex literal"),
        (K::OctLiteral, "octal literal"),
        (K::BinLiteral, "binary literal"),
        (K::StringLiteral, "string literal"),
        (K::CharacterLiteral, "character literal"),
    ] {
        set!(k, "", name, EXPR_TYPE);
    }

    set!(K::PlusPlus, "++", "", UNARY_OVL.union(BINARY_OP));
    prec!(K::PlusPlus, unary = 3, false);
    set!(K::MinusMinus, "--", "", UNARY_OVL.union(BINARY_OP));
    prec!(K::MinusMinus, unary = 3, false);
    for (k, s) in [
        (K::PlusEq, "+="), (K::MinusEq, "-="), (K::MultiplyEq, "*="),
        (K::DivideEq, "/="), (K::ModuloEq, "%="), (K::BitLeftShiftEq, "<<="),
        (K::BitRightShiftEq, ">>="), (K::BitAndEq, "&="), (K::BitXorEq, "^="),
        (K::BitOrEq, "|="),
    ] {
        set!(k, s, "", BINARY_OVL);
        prec!(k, binary = 18, false);
    }
    set!(K::BitLeftShift, "<<", "", BINARY_OVL);
    prec!(K::BitLeftShift, binary = 8, true);
    set!(K::BitRightShift, ">>", "", BINARY_OVL);
    prec!(K::BitRightShift, binary = 8, true);
    set!(K::Equals, "==", "", BINARY_OVL);
    prec!(K::Equals, binary = 10, true);
    set!(K::NotEquals, "!=", "", BINARY_OVL);
    prec!(K::NotEquals, binary = 10, true);
    set!(K::LessThanEq, "<=", "", BINARY_OVL);
    prec!(K::LessThanEq, binary = 9, true);
    set!(K::GreaterThanEq, ">=", "", BINARY_OVL);
    prec!(K::GreaterThanEq, binary = 9, true);
    set!(K::BoolAnd, "&&", "", BINARY_OP);
    prec!(K::BoolAnd, binary = 14, true);
    set!(K::BoolXor, "^^", "", BINARY_OP);
    prec!(K::BoolXor, binary = 15, true);
    set!(K::BoolOr, "||", "", BINARY_OP);
    prec!(K::BoolOr, binary = 16, true);
    set!(K::Arrow, "->", "", EXPR_TYPE);
    set!(K::FatArrow, "=>", "", EXPR_TYPE);
    set!(K::Scope, "::", "", EXPR_TYPE);
    set!(K::DotDot, "..", "", BINARY_OVL);
    prec!(K::DotDot, binary = 5, true);
    set!(K::DotDotEq, "..=", "", BINARY_OVL);
    prec!(K::DotDotEq, binary = 18, false);
    set!(K::DotDotDot, "...", "", UNARY_OP);
    prec!(K::DotDotDot, unary = 3, false);

    for (k, s) in [
        (K::KwIf, "if"), (K::KwElse, "else"), (K::KwWhile, "while"),
        (K::KwFor, "for"), (K::KwForeach, "foreach"), (K::KwIn, "in"),
        (K::KwReturn, "return"), (K::KwBreak, "break"), (K::KwContinue, "continue"),
        (K::KwDefer, "defer"), (K::KwSwitch, "switch"), (K::KwFunction, "function"), (K::KwOperator, "operator"),
        (K::KwStruct, "struct"), (K::KwEnum, "enum"), (K::KwNamespace, "namespace"),
        (K::KwImport, "import"), (K::KwExport, "export"),
        (K::KwAuto, "auto"), (K::KwLet, "let"), (K::KwMut, "mut"),
        (K::KwOptional, "optional"), (K::KwVariadic, "variadic"),
        (K::KwTypename, "typename"), (K::KwVoid, "void"),
        (K::KwTrue, "true"), (K::KwFalse, "false"), (K::KwNull, "null"),
        (K::KwStaticAssert, "static_assert"), (K::KwType, "type"),
    ] {
        set!(k, s, "", KEYWORD.union(EXPR_TYPE));
    }

    set!(K::KwSizeof, "sizeof", "", KEYWORD.union(UNARY_OP));
    prec!(K::KwSizeof, unary = 3, false);
    set!(K::KwTypeof, "typeof", "", KEYWORD.union(UNARY_OP).union(TokenFlags::UNARY_TYPE_OP).union(TokenFlags::TYPE_OP));
    prec!(K::KwTypeof, unary = 3, false);
    set!(K::KwAs, "as", "", KEYWORD.union(BINARY_OP));
    prec!(K::KwAs, binary = 4, true);
    set!(K::KwMove, "move", "", KEYWORD.union(UNARY_OP));
    prec!(K::KwMove, unary = 3, false);
    set!(K::KwForward, "__forward", "", KEYWORD.union(UNARY_OP));
    prec!(K::KwForward, unary = 3, false);
    set!(K::KwConst, "const", "", KEYWORD.union(UNARY_OP).union(TokenFlags::UNARY_TYPE_OP).union(TokenFlags::TYPE_OP));
    prec!(K::KwConst, unary = 3, false);
    set!(K::KwConsteval, "consteval", "", KEYWORD.union(UNARY_OP).union(TokenFlags::UNARY_TYPE_OP).union(TokenFlags::TYPE_OP));
    prec!(K::KwConsteval, unary = 3, false);

    t
}

static TOKEN_INFO: LazyLock<Box<[TokenInfo]>> = LazyLock::new(build_table);

#[must_use]
pub fn info(kind: TokenKind) -> &'static TokenInfo {
    &TOKEN_INFO[kind as usize]
}

#[must_use]
pub fn is_valid_expression_or_type_token(kind: TokenKind) -> bool {
    info(kind).flags.contains(TokenFlags::VALID_EXPRESSION_OR_TYPE_TOKEN)
}

/// Compile-time-sorted-by-length keyword table; identifiers are looked up
/// here after scanning so that keywords supersede identifiers (§4.L).
pub fn keyword_kind(spelling: &str) -> Option<TokenKind> {
    use TokenKind as K;
    Some(match spelling {
        "if" => K::KwIf, "else" => K::KwElse, "while" => K::KwWhile, "for" => K::KwFor,
        "foreach" => K::KwForeach, "in" => K::KwIn, "return" => K::KwReturn,
        "break" => K::KwBreak, "continue" => K::KwContinue, "defer" => K::KwDefer,
        "switch" => K::KwSwitch,
        "function" => K::KwFunction, "operator" => K::KwOperator, "struct" => K::KwStruct,
        "enum" => K::KwEnum, "namespace" => K::KwNamespace, "sizeof" => K::KwSizeof,
        "typeof" => K::KwTypeof, "import" => K::KwImport, "export" => K::KwExport,
        "as" => K::KwAs, "auto" => K::KwAuto, "let" => K::KwLet, "mut" => K::KwMut,
        "const" => K::KwConst, "consteval" => K::KwConsteval, "optional" => K::KwOptional,
        "variadic" => K::KwVariadic, "typename" => K::KwTypename, "void" => K::KwVoid,
        "true" => K::KwTrue, "false" => K::KwFalse, "null" => K::KwNull,
        "static_assert" => K::KwStaticAssert, "type" => K::KwType,
        "move" => K::KwMove, "__forward" => K::KwForward,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_rule_matches_spec() {
        // multiplicative (6, left) binds tighter than additive (7, left)
        let mul = Precedence::new(6, true);
        let add = Precedence::new(7, true);
        assert!(mul.binds_tighter_than(add));
        assert!(!add.binds_tighter_than(mul));
    }

    #[test]
    fn sentinel_never_binds_tighter() {
        assert!(!Precedence::NONE.binds_tighter_than(Precedence::new(1, true)));
        assert!(Precedence::new(1, true).binds_tighter_than(Precedence::NONE));
    }

    #[test]
    fn right_associative_assign_chains_right() {
        let assign = Precedence::new(18, false);
        // lhs==rhs and rhs is not left-assoc => lhs binds tighter, enabling
        // right-to-left chaining of `a = b = c`.
        assert!(assign.binds_tighter_than(assign));
    }

    #[test]
    fn postfix_flags_include_overloadable() {
        assert!(info(TokenKind::ParenOpen).flags.contains(TokenFlags::OVERLOADABLE));
        assert!(info(TokenKind::Dot).flags.contains(TokenFlags::BINARY_OVERLOADABLE));
    }
}
