use antlr_atn::token::{TOKEN_EOF, TOKEN_EPSILON};
use antlr_atn::{AtnError, ContextArena, IntervalSet};
use insta::assert_snapshot;

use crate::fixtures::{X, Y, Z, chain, grammar, vocabulary};

fn set(values: &[isize]) -> IntervalSet {
    values.iter().copied().collect()
}

#[test]
fn follows_the_callers_until_a_symbol_is_consumed() {
    let g = grammar();
    let mut arena = ContextArena::new();
    let in_c = chain(&mut arena, 2, &[(g.c_call, 1), (g.b_call, 0)]);

    let expected = g.atn.expected_tokens(g.a_mid, arena.node(in_c)).unwrap();

    assert_eq!(expected, set(&[Y, Z]));
    assert_eq!(
        g.atn.expected_tokens(g.a_stop, arena.node(in_c)).unwrap(),
        expected
    );
    assert_snapshot!(expected.display_with(&vocabulary()), @"{'y', 'z'}");
}

#[test]
fn eof_when_the_outermost_rule_can_end() {
    let g = grammar();
    let mut arena = ContextArena::new();
    let in_d = chain(&mut arena, 3, &[(g.d_call, 1), (g.b_call, 0)]);
    let root = chain(&mut arena, 0, &[]);

    assert_eq!(
        g.atn.expected_tokens(g.a_mid, arena.node(in_d)).unwrap(),
        set(&[TOKEN_EOF, Y])
    );
    assert_eq!(
        g.atn.expected_tokens(g.a_mid, arena.node(root)).unwrap(),
        set(&[TOKEN_EOF])
    );
    assert_eq!(
        g.atn.expected_tokens(g.a_mid, None).unwrap(),
        set(&[TOKEN_EOF])
    );
}

#[test]
fn callers_are_not_consulted_when_the_rule_cannot_end() {
    let g = grammar();
    let mut arena = ContextArena::new();
    // a_x does not call a rule, so walking this chain would fail.
    let bogus = chain(&mut arena, 1, &[(g.a_x, 0)]);

    assert_eq!(
        g.atn.expected_tokens(g.a_x, arena.node(bogus)).unwrap(),
        set(&[X])
    );
    assert_eq!(
        g.atn.expected_tokens(g.a_mid, arena.node(bogus)),
        Err(AtnError::NotARuleTransition {
            state_number: g.a_x
        })
    );
}

#[test]
fn a_popped_caller_ends_the_chain() {
    let g = grammar();
    let mut arena = ContextArena::new();
    let root = arena.push_root(Some(2));
    let in_b = arena.push(root, g.c_call, Some(1));
    let in_a = arena.push(in_b, g.b_call, Some(0));

    arena.pop(in_b);

    let expected = g.atn.expected_tokens(g.a_mid, arena.node(in_a)).unwrap();
    let a_mid = g.atn.state(g.a_mid).unwrap();

    assert_eq!(expected, set(&[TOKEN_EOF, Y]));
    assert_eq!(
        g.atn.next_tokens_in_context(a_mid, arena.node(in_a)).unwrap(),
        expected
    );
}

#[test]
fn bad_state_numbers() {
    let mut g = grammar();
    let len = g.atn.number_of_states();

    assert_eq!(
        g.atn.expected_tokens(len, None),
        Err(AtnError::InvalidStateNumber {
            state_number: len,
            len
        })
    );

    g.atn.remove_state(g.c_after);

    assert_eq!(
        g.atn.expected_tokens(g.c_after, None),
        Err(AtnError::RemovedState {
            state_number: g.c_after
        })
    );
}

#[test]
fn results_are_mutable_and_never_contain_epsilon() {
    let g = grammar();

    for state in g.atn.states() {
        let mut expected = g.atn.expected_tokens(state.state_number, None).unwrap();

        assert!(!expected.contains(TOKEN_EPSILON), "state {}", state.state_number);
        assert!(!expected.is_readonly());

        expected.add(42);
    }
}

#[test]
fn within_rule_keeps_epsilon() {
    let g = grammar();

    let mut within = g.atn.expected_tokens_within_rule(g.b_after).unwrap();

    assert_eq!(within, set(&[TOKEN_EPSILON, Y]));
    within.remove(TOKEN_EPSILON);
    assert_eq!(
        g.atn.next_tokens(g.atn.state(g.b_after).unwrap()),
        &set(&[TOKEN_EPSILON, Y])
    );
}

#[test]
fn is_expected_token() {
    let g = grammar();
    let mut arena = ContextArena::new();
    let in_c = chain(&mut arena, 2, &[(g.c_call, 1), (g.b_call, 0)]);
    let in_d = chain(&mut arena, 3, &[(g.d_call, 1), (g.b_call, 0)]);

    let expected = |ctx, symbol| g.atn.is_expected_token(g.a_mid, arena.node(ctx), symbol).unwrap();

    assert!(expected(in_c, Y));
    assert!(expected(in_c, Z));
    assert!(!expected(in_c, X));
    assert!(!expected(in_c, TOKEN_EOF));
    assert!(expected(in_d, TOKEN_EOF));
    assert!(!expected(in_d, Z));
    assert!(!expected(in_d, TOKEN_EPSILON));
}

#[test]
fn is_expected_token_agrees_with_expected_tokens() {
    let g = grammar();
    let mut arena = ContextArena::new();
    let in_c = chain(&mut arena, 2, &[(g.c_call, 1), (g.b_call, 0)]);
    let in_d = chain(&mut arena, 3, &[(g.d_call, 1), (g.b_call, 0)]);

    for state in g.atn.states() {
        for ctx in [None, arena.node(in_c), arena.node(in_d)] {
            let expected = g.atn.expected_tokens(state.state_number, ctx).unwrap();

            for symbol in TOKEN_EPSILON..=Z {
                assert_eq!(
                    g.atn.is_expected_token(state.state_number, ctx, symbol).unwrap(),
                    expected.contains(symbol),
                    "state {} symbol {symbol}",
                    state.state_number
                );
            }
        }
    }
}
