//! End-to-end behavior of the backtracking recursive-descent parser,
//! including left recursion through the full lex-then-parse pipeline.

use sable::grammar::{Grammar, PrecedenceTable, Production};
use sable::intern::Context;
use sable::lexer::{LexerAction, LexerGenerator, RegexLexerGenerator};
use sable::parser::{ParserGenerator, RecursiveDescentGenerator};
use sable::symbol::Symbol;

#[test]
fn left_recursion_terminates_with_a_full_tree() {
    let mut ctx = Context::new();
    let x = ctx.terminal("x");
    let plus = ctx.terminal("+");
    let e = ctx.non_terminal("E");

    let grammar = Grammar::new(
        &ctx,
        "expr",
        e,
        vec![
            Production::new(e, vec![e, plus, e]),
            Production::new(e, vec![x]),
        ],
        PrecedenceTable::default(),
    );

    let lexer = RegexLexerGenerator
        .generate(
            &ctx,
            &[
                LexerAction::token("x", x),
                LexerAction::token("\\+", plus),
            ],
        )
        .into_lexer()
        .expect("lexer generation succeeded");
    let parser = RecursiveDescentGenerator
        .generate(&grammar)
        .into_parser()
        .expect("generation never fails");

    let outcome = parser.parse(&mut lexer.lex("x+x+x"));
    assert!(outcome.succeeded(), "errors: {:?}", outcome.errors);
    let tree = outcome.parse_tree().expect("parse succeeded");

    // the whole input is consumed
    assert_eq!(tree.text(), "x+x+x");

    // same-precedence chains nest to the right: (x + (x + x))
    assert_eq!(tree.children().len(), 3);
    assert_eq!(tree.children()[0].children().len(), 1);
    assert_eq!(tree.children()[1].ty(), plus);
    let right = &tree.children()[2];
    assert_eq!(right.children().len(), 3);
    assert_eq!(right.children()[2].children().len(), 1);
}

#[test]
fn backtracking_tries_alternatives_in_declaration_order() {
    let mut ctx = Context::new();
    let a = ctx.terminal("a");
    let b = ctx.terminal("b");
    let s = ctx.non_terminal("S");

    // both alternatives start with a; only the second can finish the input
    let grammar = Grammar::new(
        &ctx,
        "backtrack",
        s,
        vec![
            Production::new(s, vec![a, a]),
            Production::new(s, vec![a, b]),
        ],
        PrecedenceTable::default(),
    );

    let parser = RecursiveDescentGenerator
        .generate(&grammar)
        .into_parser()
        .expect("generation never fails");

    let tokens = vec![
        Symbol::leaf(a, "a", 1, 1),
        Symbol::leaf(b, "b", 1, 2),
        Symbol::leaf(ctx.eof_type(), "", 1, 3),
    ];
    let outcome = parser.parse_all(tokens);
    assert!(outcome.succeeded());
    let tree = outcome.parse_tree().expect("parse succeeded");
    assert_eq!(tree.children()[1].ty(), b);
}

#[test]
fn exhausted_alternatives_fail_cleanly() {
    let mut ctx = Context::new();
    let a = ctx.terminal("a");
    let b = ctx.terminal("b");
    let s = ctx.non_terminal("S");

    let grammar = Grammar::new(
        &ctx,
        "fail",
        s,
        vec![Production::new(s, vec![a, b])],
        PrecedenceTable::default(),
    );

    let parser = RecursiveDescentGenerator
        .generate(&grammar)
        .into_parser()
        .expect("generation never fails");

    let outcome = parser.parse_all(vec![
        Symbol::leaf(b, "b", 1, 1),
        Symbol::leaf(ctx.eof_type(), "", 1, 2),
    ]);
    assert!(!outcome.succeeded());
    assert!(outcome.parse_tree().is_none());
}
