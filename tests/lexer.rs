//! §8 "Lex round-trip" and related lexer contract tests, driven through the
//! public `frontc::lexer` entry point rather than `Lexer` internals.

use frontc::lexer::lex;
use frontc::lexer::token::TokenKind;

#[test]
fn longest_match_wins_for_multi_character_punctuation() {
    let (tokens, sink) = lex("a <<= b", 0);
    assert!(!sink.has_errors());
    assert_eq!(tokens[1].kind, TokenKind::BitLeftShiftEq);
}

#[test]
fn longest_match_prefers_shift_over_two_relational_tokens() {
    let (tokens, sink) = lex(">> >", 0);
    assert!(!sink.has_errors());
    assert_eq!(tokens[0].kind, TokenKind::BitRightShift);
    assert_eq!(tokens[1].kind, TokenKind::GreaterThan);
}

#[test]
fn keyword_supersedes_identifier_of_the_same_spelling() {
    let (tokens, _sink) = lex("consteval", 0);
    assert_eq!(tokens[0].kind, TokenKind::KwConsteval);
}

#[test]
fn integer_literal_captures_a_typed_postfix() {
    let (tokens, sink) = lex("42u8", 0);
    assert!(!sink.has_errors());
    assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral);
    assert_eq!(tokens[0].postfix, "u8");
}

#[test]
fn escape_sequences_decode_inside_double_quoted_strings() {
    let (tokens, sink) = lex(r#""a\nb""#, 0);
    assert!(!sink.has_errors());
    assert_eq!(tokens[0].value, "a\nb");
}

#[test]
fn raw_strings_receive_no_escape_processing() {
    let (tokens, sink) = lex(r"`a\nb`", 0);
    assert!(!sink.has_errors());
    assert_eq!(tokens[0].value, r"a\nb");
}

#[test]
fn adjacent_string_literals_concatenate() {
    let (tokens, sink) = lex(r#""foo""bar""#, 0);
    assert!(!sink.has_errors());
    assert_eq!(tokens[0].value, "foobar");
    assert_eq!(tokens[1].kind, TokenKind::Eof);
}

#[test]
fn nested_block_comments_are_consumed() {
    let (tokens, sink) = lex("/* outer /* inner */ still-outer */ x", 0);
    assert!(!sink.has_errors());
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].value, "x");
}

#[test]
fn carriage_returns_are_stripped_before_line_tracking() {
    let (tokens, sink) = lex("a\r\nb", 0);
    assert!(!sink.has_errors());
    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[1].line, 2);
}

#[test]
fn every_well_formed_token_stream_ends_in_a_synthetic_eof() {
    let (tokens, _sink) = lex("1 + 2", 0);
    assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
}
