use std::ptr;
use std::thread;

use antlr_atn::ll1::{HIT_PRED, LookOptions};
use antlr_atn::token::{TOKEN_EOF, TOKEN_EPSILON};
use antlr_atn::{Atn, ContextArena, IntervalSet, Transition};
use insta::assert_debug_snapshot;

use crate::fixtures::{X, Y, Z, chain, grammar};

fn set(values: &[isize]) -> IntervalSet {
    values.iter().copied().collect()
}

#[test]
fn follow_sets_within_a_rule() {
    let g = grammar();
    let next = |state_number| g.atn.next_tokens(g.atn.state(state_number).unwrap());

    assert_eq!(next(g.a_x), &set(&[X]));
    assert_eq!(next(g.a_mid), &set(&[TOKEN_EPSILON]));
    assert_eq!(next(g.b_call), &set(&[X]));
    assert_eq!(next(g.b_after), &set(&[TOKEN_EPSILON, Y]));
    assert_eq!(next(g.b_optional), &set(&[TOKEN_EPSILON, Y]));
    assert_eq!(next(g.c_after), &set(&[Z]));
}

#[test]
fn follow_sets_are_memoized_and_frozen() {
    let g = grammar();
    let state = g.atn.state(g.b_optional).unwrap();

    assert!(state.next_token_within_rule().is_none());

    let first = g.atn.next_tokens(state);
    let second = g.atn.next_tokens(state);

    assert!(ptr::eq(first, second));
    assert!(first.is_readonly());
    assert!(ptr::eq(state.next_token_within_rule().unwrap(), first));
}

#[test]
fn editing_a_state_forgets_its_follow_set() {
    let mut g = grammar();
    g.atn.next_tokens(g.atn.state(g.a_x).unwrap());

    let state = g.atn.state_mut(g.a_x).unwrap();

    assert!(state.next_token_within_rule().is_none());
}

#[test]
fn editing_a_callee_forgets_the_callers_follow_sets() {
    let mut g = grammar();
    let a_mid = g.a_mid;

    assert_eq!(g.atn.next_tokens(g.atn.state(g.b_call).unwrap()), &set(&[X]));

    g.atn
        .state_mut(g.a_x)
        .unwrap()
        .set_transition(0, Transition::atom(a_mid, Z));

    let b_call = g.atn.state(g.b_call).unwrap();

    assert!(b_call.next_token_within_rule().is_none());
    assert_eq!(g.atn.next_tokens(b_call), &set(&[Z]));

    g.atn.remove_state(g.c_after);

    assert!(g.atn.state(g.b_call).unwrap().next_token_within_rule().is_none());
}

#[test]
fn predicates_are_seen_through() {
    let g = grammar();
    let e_block = g.atn.state(g.e_block).unwrap();

    assert_eq!(g.atn.next_tokens(e_block), &set(&[X, Y]));

    let options = LookOptions {
        see_through_predicates: false,
        ..LookOptions::default()
    };
    let look = g.atn.analyzer().look_with(e_block, None, None, options).unwrap();

    assert_eq!(look, set(&[HIT_PRED, Y]));
}

#[test]
fn wildcard_and_not_set_use_the_symbol_range() {
    let g = grammar();

    assert_eq!(
        g.atn.next_tokens(g.atn.state(g.f_wildcard).unwrap()),
        &IntervalSet::of_range(1, Z)
    );
    assert_eq!(
        g.atn.next_tokens(g.atn.state(g.f_not_set).unwrap()),
        &IntervalSet::of_range(Y, Z)
    );
}

#[test]
fn left_recursion_terminates() {
    let g = grammar();

    assert_eq!(g.atn.next_tokens(g.atn.state(g.g_start).unwrap()), &set(&[Y]));
}

#[test]
fn search_stops_at_the_stop_state() {
    let g = grammar();
    let b_after = g.atn.state(g.b_after).unwrap();

    let look = g.atn.analyzer().look(b_after, Some(g.b_optional), None).unwrap();

    assert_eq!(look, set(&[TOKEN_EPSILON]));
}

#[test]
fn follow_sets_in_context() {
    let g = grammar();
    let a_mid = g.atn.state(g.a_mid).unwrap();
    let mut arena = ContextArena::new();
    let in_c = chain(&mut arena, 2, &[(g.c_call, 1), (g.b_call, 0)]);
    let in_d = chain(&mut arena, 3, &[(g.d_call, 1), (g.b_call, 0)]);

    assert_eq!(
        g.atn.next_tokens_in_context(a_mid, arena.node(in_c)).unwrap(),
        set(&[Y, Z])
    );
    assert_eq!(
        g.atn.next_tokens_in_context(a_mid, arena.node(in_d)).unwrap(),
        set(&[TOKEN_EOF, Y])
    );
    assert_eq!(
        g.atn.next_tokens_in_context(a_mid, None).unwrap(),
        set(&[TOKEN_EPSILON])
    );
}

#[test]
fn eof_is_optional_when_leaving_the_outermost_rule() {
    let g = grammar();
    let a_mid = g.atn.state(g.a_mid).unwrap();
    let mut arena = ContextArena::new();
    let in_d = chain(&mut arena, 3, &[(g.d_call, 1), (g.b_call, 0)]);

    let options = LookOptions {
        add_eof: false,
        ..LookOptions::default()
    };
    let look = g
        .atn
        .analyzer()
        .look_with(a_mid, None, arena.node(in_d), options)
        .unwrap();

    assert_eq!(look, set(&[Y]));
}

#[test]
fn decision_lookahead_per_alternative() {
    let g = grammar();
    let analyzer = g.atn.analyzer();

    assert_debug_snapshot!(analyzer.decision_lookahead(g.atn.state(g.b_optional).unwrap()), @r"
    [
        Some(
            IntervalSet {
                intervals: [
                    Interval {
                        start: 2,
                        stop: 2,
                    },
                ],
                readonly: false,
            },
        ),
        None,
    ]
    ");

    assert_eq!(
        analyzer.decision_lookahead(g.atn.state(g.e_block).unwrap()),
        [None, Some(set(&[Y]))]
    );
}

#[test]
fn atn_is_shareable_between_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Atn>();

    let g = grammar();
    let atn = &g.atn;
    let state = atn.state(g.b_optional).unwrap();

    let addresses: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| ptr::from_ref(atn.next_tokens(state)) as usize))
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(atn.next_tokens(state), &set(&[TOKEN_EPSILON, Y]));
}
