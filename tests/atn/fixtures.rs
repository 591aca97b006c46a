//! A small parser ATN shared by the tests.
//!
//! ```text
//! a : X ;
//! b : a Y? ;
//! c : b Z ;
//! d : b ;
//! e : {p}? X | Y ;
//! f : . | ~X ;
//! g : g X | Y ;
//! ```

use antlr_atn::{
    Atn, AtnState, AtnType, ContextArena, ContextId, IntervalSet, StateKind, Transition,
    Vocabulary,
};

pub const X: isize = 1;
pub const Y: isize = 2;
pub const Z: isize = 3;

pub const RULE_NAMES: [&str; 7] = ["a", "b", "c", "d", "e", "f", "g"];

pub fn vocabulary() -> Vocabulary {
    let names = |names: &[&str]| -> Vec<Option<String>> {
        std::iter::once(None)
            .chain(names.iter().map(|name| Some(name.to_string())))
            .collect()
    };

    Vocabulary::new(names(&["'x'", "'y'", "'z'"]), names(&["X", "Y", "Z"]), vec![])
}

pub fn rule_names() -> Vec<String> {
    RULE_NAMES.iter().map(|name| name.to_string()).collect()
}

#[derive(Debug)]
pub struct Grammar {
    pub atn: Atn,

    pub a_start: usize,
    pub a_x: usize,
    pub a_mid: usize,
    pub a_stop: usize,

    pub b_start: usize,
    pub b_call: usize,
    pub b_after: usize,
    pub b_optional: usize,
    pub b_stop: usize,

    pub c_call: usize,
    pub c_after: usize,

    pub d_call: usize,

    pub e_block: usize,

    pub f_wildcard: usize,
    pub f_not_set: usize,

    pub g_start: usize,
}

struct Builder {
    atn: Atn,
}

impl Builder {
    fn state(&mut self, kind: StateKind, rule_index: usize) -> usize {
        self.atn.add_state(AtnState::new(kind).in_rule(rule_index))
    }

    fn basic(&mut self, rule_index: usize) -> usize {
        self.state(StateKind::Basic, rule_index)
    }

    fn edge(&mut self, from: usize, transition: Transition) {
        self.atn.add_transition(from, transition).unwrap();
    }

    fn rule(&mut self, rule_index: usize) -> (usize, usize) {
        let start = self.state(StateKind::rule_start(), rule_index);
        let stop = self.state(StateKind::RuleStop, rule_index);
        assert_eq!(self.atn.define_rule(start, stop).unwrap(), rule_index);

        (start, stop)
    }

    /// Creates a block start and its block end, linked to each other, and registers the
    /// decision.
    fn block(&mut self, rule_index: usize) -> (usize, usize) {
        let end = self.state(StateKind::BlockEnd { start_state: None }, rule_index);
        let start = self.state(
            StateKind::BasicBlockStart {
                end_state: Some(end),
            },
            rule_index,
        );
        self.atn.state_mut(end).unwrap().kind = StateKind::BlockEnd {
            start_state: Some(start),
        };
        self.atn.define_decision_state(start).unwrap();

        (start, end)
    }
}

pub fn grammar() -> Grammar {
    let mut b = Builder {
        atn: Atn::new(AtnType::Parser, Z),
    };

    let (a_start, a_stop) = b.rule(0);
    let (b_start, b_stop) = b.rule(1);
    let (c_start, c_stop) = b.rule(2);
    let (d_start, d_stop) = b.rule(3);
    let (e_start, e_stop) = b.rule(4);
    let (f_start, f_stop) = b.rule(5);
    let (g_start, g_stop) = b.rule(6);

    // a : X ;
    let a_x = b.basic(0);
    let a_mid = b.basic(0);
    b.edge(a_start, Transition::epsilon(a_x));
    b.edge(a_x, Transition::atom(a_mid, X));
    b.edge(a_mid, Transition::epsilon(a_stop));

    // b : a Y? ;
    let b_call = b.basic(1);
    let b_after = b.basic(1);
    let (b_block, b_block_end) = b.block(1);
    let b_y = b.basic(1);
    b.edge(b_start, Transition::epsilon(b_call));
    b.edge(b_call, Transition::rule(a_start, 0, 0, b_after));
    b.edge(b_after, Transition::epsilon(b_block));
    b.edge(b_block, Transition::epsilon(b_y));
    b.edge(b_block, Transition::epsilon(b_block_end));
    let b_y_done = b.basic(1);
    b.edge(b_y, Transition::atom(b_y_done, Y));
    b.edge(b_y_done, Transition::epsilon(b_block_end));
    b.edge(b_block_end, Transition::epsilon(b_stop));

    // c : b Z ;
    let c_call = b.basic(2);
    let c_after = b.basic(2);
    let c_z = b.basic(2);
    b.edge(c_start, Transition::epsilon(c_call));
    b.edge(c_call, Transition::rule(b_start, 1, 0, c_after));
    b.edge(c_after, Transition::atom(c_z, Z));
    b.edge(c_z, Transition::epsilon(c_stop));

    // d : b ;
    let d_call = b.basic(3);
    let d_after = b.basic(3);
    b.edge(d_start, Transition::epsilon(d_call));
    b.edge(d_call, Transition::rule(b_start, 1, 0, d_after));
    b.edge(d_after, Transition::epsilon(d_stop));

    // e : {p}? X | Y ;
    let (e_block, e_block_end) = b.block(4);
    let e_pred = b.basic(4);
    let e_x = b.basic(4);
    let e_y = b.basic(4);
    let e_done = b.basic(4);
    b.edge(e_start, Transition::epsilon(e_block));
    b.edge(e_block, Transition::epsilon(e_pred));
    b.edge(e_block, Transition::epsilon(e_y));
    b.edge(e_pred, Transition::predicate(e_x, 4, 0, false));
    b.edge(e_x, Transition::atom(e_done, X));
    b.edge(e_y, Transition::atom(e_done, Y));
    b.edge(e_done, Transition::epsilon(e_block_end));
    b.edge(e_block_end, Transition::epsilon(e_stop));

    // f : . | ~X ;
    let (f_block, f_block_end) = b.block(5);
    let f_wildcard = b.basic(5);
    let f_not_set = b.basic(5);
    let f_done = b.basic(5);
    b.edge(f_start, Transition::epsilon(f_block));
    b.edge(f_block, Transition::epsilon(f_wildcard));
    b.edge(f_block, Transition::epsilon(f_not_set));
    b.edge(f_wildcard, Transition::wildcard(f_done));
    b.edge(f_not_set, Transition::not_set(f_done, IntervalSet::of(X)));
    b.edge(f_done, Transition::epsilon(f_block_end));
    b.edge(f_block_end, Transition::epsilon(f_stop));

    // g : g X | Y ;
    let (g_block, g_block_end) = b.block(6);
    let g_call = b.basic(6);
    let g_after = b.basic(6);
    let g_y = b.basic(6);
    let g_done = b.basic(6);
    b.edge(g_start, Transition::epsilon(g_block));
    b.edge(g_block, Transition::epsilon(g_call));
    b.edge(g_block, Transition::epsilon(g_y));
    b.edge(g_call, Transition::rule(g_start, 6, 0, g_after));
    b.edge(g_after, Transition::atom(g_done, X));
    b.edge(g_y, Transition::atom(g_done, Y));
    b.edge(g_done, Transition::epsilon(g_block_end));
    b.edge(g_block_end, Transition::epsilon(g_stop));

    Grammar {
        atn: b.atn,
        a_start,
        a_x,
        a_mid,
        a_stop,
        b_start,
        b_call,
        b_after,
        b_optional: b_block,
        b_stop,
        c_call,
        c_after,
        d_call,
        e_block,
        f_wildcard,
        f_not_set,
        g_start,
    }
}

/// Pushes the frames of a call chain, outermost first, and returns the innermost one.
///
/// `calls` lists `(invoking_state, rule_index)` pairs for every frame below the root.
pub fn chain(arena: &mut ContextArena, root_rule: usize, calls: &[(usize, usize)]) -> ContextId {
    let root = arena.push_root(Some(root_rule));

    calls
        .iter()
        .fold(root, |parent, &(invoking_state, rule_index)| {
            arena.push(parent, invoking_state, Some(rule_index))
        })
}
