//! Tokenization behavior of generated lexers: longest match, modes,
//! unrecognized input, and stream termination.

use sable::intern::{Context, SymbolType};
use sable::lexer::{LexerAction, LexerGenerator, RegexLexerGenerator, DEFAULT_MODE};
use sable::symbol::Symbol;

fn types(tokens: &[Symbol]) -> Vec<SymbolType> {
    tokens.iter().map(|t| t.ty()).collect()
}

#[test]
fn longest_match_beats_keyword() {
    let mut ctx = Context::new();
    let kw_if = ctx.terminal("IF");
    let id = ctx.terminal("ID");

    let actions = vec![
        LexerAction::token("if", kw_if),
        LexerAction::token("[a-z]+", id),
    ];
    let result = RegexLexerGenerator.generate(&ctx, &actions);
    assert!(result.succeeded());
    let lexer = result.lexer().expect("generation succeeded");

    // "iffy" is one identifier, not IF followed by "fy"
    let tokens: Vec<Symbol> = lexer.lex("iffy").collect();
    assert_eq!(types(&tokens), vec![id, ctx.eof_type()]);
    assert_eq!(tokens[0].text(), "iffy");

    // on an exact tie the first-declared rule wins
    let tokens: Vec<Symbol> = lexer.lex("if").collect();
    assert_eq!(types(&tokens), vec![kw_if, ctx.eof_type()]);
}

#[test]
fn string_literal_mode_round_trip() {
    let mut ctx = Context::new();
    let id = ctx.terminal("ID");
    let quote = ctx.terminal("QUOTE");
    let text = ctx.terminal("TEXT");
    let escape = ctx.terminal("ESCAPE");

    let actions = vec![
        LexerAction::token("[a-z]+", id),
        LexerAction::enter(&[DEFAULT_MODE], "\"", Some(quote), "string"),
        LexerAction::leave(&["string"], "\"", Some(quote)),
        LexerAction::token_in(&["string"], "\\\\.", escape),
        LexerAction::token_in(&["string"], "[^\"\\\\]+", text),
    ];
    let lexer = RegexLexerGenerator
        .generate(&ctx, &actions)
        .into_lexer()
        .expect("generation succeeded");

    // the escaped quote must not terminate the literal
    let tokens: Vec<Symbol> = lexer.lex("ab\"x\\\"y\"cd").collect();
    assert_eq!(
        types(&tokens),
        vec![id, quote, text, escape, text, quote, id, ctx.eof_type()],
    );
    assert_eq!(tokens[3].text(), "\\\"");
    assert_eq!(tokens[6].text(), "cd");
}

#[test]
fn unmatchable_input_becomes_unrecognized_tokens() {
    let mut ctx = Context::new();
    let id = ctx.terminal("ID");

    let lexer = RegexLexerGenerator
        .generate(&ctx, &[LexerAction::token("[a-z]+", id)])
        .into_lexer()
        .expect("generation succeeded");

    // one unrecognized token per character, then lexing resumes
    let tokens: Vec<Symbol> = lexer.lex("ab12cd").collect();
    let unrecognized = ctx.unrecognized_type();
    assert_eq!(
        types(&tokens),
        vec![id, unrecognized, unrecognized, id, ctx.eof_type()],
    );
    assert_eq!(tokens[1].text(), "1");
    assert_eq!(tokens[2].text(), "2");
}

#[test]
fn skip_rules_emit_nothing() {
    let mut ctx = Context::new();
    let id = ctx.terminal("ID");

    let actions = vec![
        LexerAction::token("[a-z]+", id),
        LexerAction::skip(&[DEFAULT_MODE], "( |\t|\n)+"),
    ];
    let lexer = RegexLexerGenerator
        .generate(&ctx, &actions)
        .into_lexer()
        .expect("generation succeeded");

    let tokens: Vec<Symbol> = lexer.lex("a b\n\tc").collect();
    assert_eq!(types(&tokens), vec![id, id, id, ctx.eof_type()]);
    // positions survive the skipped whitespace
    assert_eq!(tokens[2].line(), Some(2));
    assert_eq!(tokens[2].column(), Some(2));
}

#[test]
fn every_stream_ends_with_exactly_one_eof() {
    let mut ctx = Context::new();
    let id = ctx.terminal("ID");

    let lexer = RegexLexerGenerator
        .generate(&ctx, &[LexerAction::token("[a-z]+", id)])
        .into_lexer()
        .expect("generation succeeded");

    for input in ["", "abc", "7"] {
        let tokens: Vec<Symbol> = lexer.lex(input).collect();
        let eofs = tokens
            .iter()
            .filter(|t| t.ty() == ctx.eof_type())
            .count();
        assert_eq!(eofs, 1, "input {input:?}");
        assert_eq!(tokens.last().map(|t| t.ty()), Some(ctx.eof_type()));
    }
}
