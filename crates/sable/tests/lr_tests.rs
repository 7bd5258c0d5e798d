//! Generation and parsing behavior across the LR family.

use sable::grammar::{
    Associativity, Grammar, PrecedenceTable, Production, ProductionPrecedence,
};
use sable::intern::{Context, SymbolType};
use sable::parser::{lr::LrGenerator, ParserGenerator};
use sable::symbol::Symbol;

fn token(ty: SymbolType, text: &str) -> Symbol {
    Symbol::leaf(ty, text, 1, 1)
}

#[test]
fn nested_lists_parse_to_the_declared_shapes() {
    let mut ctx = Context::new();
    let lparen = ctx.terminal("(");
    let rparen = ctx.terminal(")");
    let comma = ctx.terminal(",");
    let x = ctx.terminal("x");
    let s = ctx.non_terminal("S");
    let l = ctx.non_terminal("L");

    let grammar = Grammar::new(
        &ctx,
        "lists",
        s,
        vec![
            Production::new(s, vec![lparen, l, rparen]),
            Production::new(s, vec![x]),
            Production::new(l, vec![s]),
            Production::new(l, vec![l, comma, s]),
        ],
        PrecedenceTable::default(),
    );

    let result = LrGenerator::lalr().generate(&grammar);
    assert!(result.succeeded(), "conflicts: {:?}", result.conflicts);
    let parser = result.parser().expect("generation succeeded");

    // (x,(x,x))
    let tokens = vec![
        token(lparen, "("),
        token(x, "x"),
        token(comma, ","),
        token(lparen, "("),
        token(x, "x"),
        token(comma, ","),
        token(x, "x"),
        token(rparen, ")"),
        token(rparen, ")"),
        token(ctx.eof_type(), ""),
    ];
    let outcome = parser.parse_all(tokens);
    assert!(outcome.succeeded(), "errors: {:?}", outcome.errors);
    let tree = outcome.parse_tree().expect("parse succeeded");
    assert_eq!(tree.ty(), s);
    assert_eq!(tree.children().len(), 3);
    assert_eq!(tree.children()[0].ty(), lparen);
    assert_eq!(tree.children()[1].ty(), l);
    assert_eq!(tree.children()[2].ty(), rparen);
}

/// A -> c and B -> c reduce in one state; FOLLOW sets overlap on z, so only
/// per-item lookahead can tell them apart.
fn one_token_lookahead_grammar(ctx: &mut Context) -> Grammar {
    let w = ctx.terminal("w");
    let x = ctx.terminal("x");
    let y = ctx.terminal("y");
    let z = ctx.terminal("z");
    let c = ctx.terminal("c");
    let s = ctx.non_terminal("S");
    let a = ctx.non_terminal("A");
    let b = ctx.non_terminal("B");

    Grammar::new(
        ctx,
        "lookahead",
        s,
        vec![
            Production::new(s, vec![x, a, y]),
            Production::new(s, vec![x, b, z]),
            Production::new(s, vec![w, a, z]),
            Production::new(a, vec![c]),
            Production::new(b, vec![c]),
        ],
        PrecedenceTable::default(),
    )
}

#[test]
fn weaker_flavors_reject_what_lalr_accepts() {
    let mut ctx = Context::new();
    let grammar = one_token_lookahead_grammar(&mut ctx);

    assert!(!LrGenerator::lr0().generate(&grammar).succeeded());
    assert!(!LrGenerator::slr().generate(&grammar).succeeded());
    assert!(LrGenerator::lalr().generate(&grammar).succeeded());
    assert!(LrGenerator::lr1().generate(&grammar).succeeded());
}

fn expression_grammar(ctx: &mut Context, associativity: Associativity) -> Grammar {
    let x = ctx.terminal("x");
    let plus = ctx.terminal("+");
    let e = ctx.non_terminal("E");

    Grammar::new(
        ctx,
        "expr",
        e,
        vec![
            Production::new(e, vec![e, plus, e]),
            Production::new(e, vec![x]),
        ],
        PrecedenceTable::new(
            &[(&[plus], associativity)],
            ProductionPrecedence::LeftmostTerminal,
        ),
    )
}

fn parse_x_plus_x_plus_x(grammar: &Grammar, ctx: &Context) -> Symbol {
    let x = grammar
        .terminal_types()
        .iter()
        .copied()
        .find(|t| t.name() == "x")
        .expect("grammar has x");
    let plus = grammar
        .terminal_types()
        .iter()
        .copied()
        .find(|t| t.name() == "+")
        .expect("grammar has +");

    let parser = LrGenerator::lalr()
        .generate(grammar)
        .into_parser()
        .expect("generation succeeded");
    let outcome = parser.parse_all(vec![
        token(x, "x"),
        token(plus, "+"),
        token(x, "x"),
        token(plus, "+"),
        token(x, "x"),
        token(ctx.eof_type(), ""),
    ]);
    assert!(outcome.succeeded(), "errors: {:?}", outcome.errors);
    outcome.into_parse_tree().expect("parse succeeded")
}

#[test]
fn left_associativity_nests_left() {
    let mut ctx = Context::new();
    let grammar = expression_grammar(&mut ctx, Associativity::Left);
    let tree = parse_x_plus_x_plus_x(&grammar, &ctx);

    // ((x + x) + x)
    assert_eq!(tree.children().len(), 3);
    assert_eq!(tree.children()[0].children().len(), 3);
    assert_eq!(tree.children()[2].children().len(), 1);
}

#[test]
fn right_associativity_nests_right() {
    let mut ctx = Context::new();
    let grammar = expression_grammar(&mut ctx, Associativity::Right);
    let tree = parse_x_plus_x_plus_x(&grammar, &ctx);

    // (x + (x + x))
    assert_eq!(tree.children().len(), 3);
    assert_eq!(tree.children()[0].children().len(), 1);
    assert_eq!(tree.children()[2].children().len(), 3);
}

#[test]
fn non_associative_ambiguity_fails_generation() {
    let mut ctx = Context::new();
    let grammar = expression_grammar(&mut ctx, Associativity::NonAssociative);

    let result = LrGenerator::lalr().generate(&grammar);
    assert!(!result.succeeded());
    assert!(result.parser().is_none());
}

#[test]
fn parse_failures_carry_errors_not_panics() {
    let mut ctx = Context::new();
    let grammar = expression_grammar(&mut ctx, Associativity::Left);
    let x = grammar
        .terminal_types()
        .iter()
        .copied()
        .find(|t| t.name() == "x")
        .expect("grammar has x");
    let plus = grammar
        .terminal_types()
        .iter()
        .copied()
        .find(|t| t.name() == "+")
        .expect("grammar has +");

    let parser = LrGenerator::lalr()
        .generate(&grammar)
        .into_parser()
        .expect("generation succeeded");

    // dangling operator
    let outcome = parser.parse_all(vec![
        token(x, "x"),
        token(plus, "+"),
        token(ctx.eof_type(), ""),
    ]);
    assert!(!outcome.succeeded());
    assert!(outcome.parse_tree().is_none());

    // stream without the EOF terminal
    let outcome = parser.parse_all(vec![token(x, "x")]);
    assert!(!outcome.succeeded());
}
