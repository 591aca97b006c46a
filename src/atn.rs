//! The ATN: the state graph of a grammar and the queries answered over it.

use std::sync::atomic::{AtomicBool, Ordering};

use derive_more::Display;
use indexmap::IndexMap;
use thiserror::Error;

use crate::context::ContextNode;
use crate::interval_set::IntervalSet;
use crate::lexer_action::LexerAction;
use crate::ll1::Ll1Analyzer;
use crate::state::{AtnState, StateKind};
use crate::token::{TOKEN_EOF, TOKEN_EPSILON};
use crate::transition::{RuleTransition, Transition, TransitionKind};

pub(crate) type Result<T, E = AtnError> = std::result::Result<T, E>;

/// The alternative number meaning "no alternative".
pub const INVALID_ALT_NUMBER: usize = 0;

/// What kind of recognizer an ATN drives.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtnType {
    #[display("lexer")]
    Lexer,

    #[display("parser")]
    Parser,
}

/// An error that occurred while querying or building an ATN.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtnError {
    /// The state number is outside of the state table.
    #[error("invalid state number {state_number} (the ATN has {len} states)")]
    InvalidStateNumber { state_number: usize, len: usize },

    /// The state number refers to a slot whose state has been removed.
    #[error("state {state_number} has been removed from the ATN")]
    RemovedState { state_number: usize },

    /// A frame's invoking state doesn't start with a rule call.
    #[error("state {state_number} does not invoke a rule")]
    NotARuleTransition { state_number: usize },

    /// The state can't be registered as a decision.
    #[error("state {state_number} ({kind}) is not a decision state")]
    NotADecisionState { state_number: usize, kind: StateKind },

    /// The state has the wrong kind for the role it was given.
    #[error("state {state_number} is a {kind} state, expected {expected}")]
    UnexpectedStateKind {
        state_number: usize,
        kind: StateKind,
        expected: &'static str,
    },

    /// The graph violates a structural invariant.
    #[error("ATN verification failed: {0}")]
    Verification(String),
}

/// Set once any follow set of the ATN has been memoized.
#[derive(Debug, Default)]
struct MemoFlag(AtomicBool);

impl Clone for MemoFlag {
    fn clone(&self) -> Self {
        Self(AtomicBool::new(self.0.load(Ordering::Relaxed)))
    }
}

/// An augmented transition network.
///
/// The ATN owns every state of a grammar. States are referred to by their state number, which is
/// their index in the state table: removing a state leaves a hole so that every other state
/// keeps its number.
///
/// An ATN is built once (by a deserializer) and then shared read-only between recognizers. The
/// only state mutated by queries is the per-state follow-set cache, which is initialized at most
/// once. Editing the graph through `&mut self` discards every memoized follow set.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct Atn {
    /// Whether this is a lexer or a parser ATN.
    pub grammar_type: AtnType,

    /// The largest symbol any transition of the ATN matches.
    pub max_token_type: isize,

    /// For lexers, maps rule indices to the token types they produce.
    pub rule_to_token_type: Option<Vec<isize>>,

    states: Vec<Option<AtnState>>,
    decision_to_state: Vec<usize>,
    rule_to_start_state: Vec<usize>,
    rule_to_stop_state: Vec<usize>,
    mode_name_to_start_state: IndexMap<String, usize>,
    mode_to_start_state: Vec<usize>,
    lexer_actions: Vec<LexerAction>,

    #[cfg_attr(feature = "serde", serde(skip))]
    memoized: MemoFlag,
}

impl Atn {
    pub fn new(grammar_type: AtnType, max_token_type: isize) -> Self {
        Self {
            grammar_type,
            max_token_type,
            rule_to_token_type: None,
            states: vec![],
            decision_to_state: vec![],
            rule_to_start_state: vec![],
            rule_to_stop_state: vec![],
            mode_name_to_start_state: IndexMap::new(),
            mode_to_start_state: vec![],
            lexer_actions: vec![],
            memoized: MemoFlag::default(),
        }
    }

    /// Adds a state to the ATN and returns the state number it was assigned.
    pub fn add_state(&mut self, mut state: AtnState) -> usize {
        let state_number = self.states.len();
        state.state_number = state_number;
        tracing::debug!(state_number, kind = %state.kind, "added an ATN state");
        self.states.push(Some(state));

        state_number
    }

    /// Reserves a state number without a state behind it.
    pub fn add_placeholder_state(&mut self) -> usize {
        self.states.push(None);

        self.states.len() - 1
    }

    /// Removes a state, leaving its slot empty.
    ///
    /// No other state is renumbered.
    pub fn remove_state(&mut self, state_number: usize) -> Option<AtnState> {
        self.forget_follow_sets();
        let removed = self.states.get_mut(state_number)?.take();

        if removed.is_some() {
            tracing::debug!(state_number, "removed an ATN state");
        }

        removed
    }

    /// The number of slots in the state table, removed states included.
    pub fn number_of_states(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, state_number: usize) -> Option<&AtnState> {
        self.states.get(state_number)?.as_ref()
    }

    /// Gives mutable access to a state while the ATN is being built.
    ///
    /// Every memoized follow set is discarded.
    pub fn state_mut(&mut self, state_number: usize) -> Option<&mut AtnState> {
        self.forget_follow_sets();

        self.states.get_mut(state_number)?.as_mut()
    }

    fn forget_follow_sets(&mut self) {
        if !std::mem::take(self.memoized.0.get_mut()) {
            return;
        }

        for state in self.states.iter_mut().flatten() {
            state.next_token_within_rule.take();
        }

        tracing::debug!("discarded memoized follow sets");
    }

    /// Iterates over all states still present in the ATN.
    pub fn states(&self) -> impl Iterator<Item = &AtnState> {
        self.states.iter().flatten()
    }

    /// Looks up a state, reporting why it can't be found.
    pub fn checked_state(&self, state_number: usize) -> Result<&AtnState> {
        match self.states.get(state_number) {
            None => Err(AtnError::InvalidStateNumber {
                state_number,
                len: self.states.len(),
            }),
            Some(None) => Err(AtnError::RemovedState { state_number }),
            Some(Some(state)) => Ok(state),
        }
    }

    fn checked_state_mut(&mut self, state_number: usize) -> Result<&mut AtnState> {
        self.forget_follow_sets();
        let len = self.states.len();

        match self.states.get_mut(state_number) {
            None => Err(AtnError::InvalidStateNumber { state_number, len }),
            Some(None) => Err(AtnError::RemovedState { state_number }),
            Some(Some(state)) => Ok(state),
        }
    }

    /// Adds an outgoing edge to state `from`.
    pub fn add_transition(&mut self, from: usize, transition: Transition) -> Result<()> {
        self.checked_state_mut(from)?.add_transition(transition);

        Ok(())
    }

    /// Registers a decision state and returns its decision number.
    ///
    /// Decisions are numbered densely in registration order.
    pub fn define_decision_state(&mut self, state_number: usize) -> Result<usize> {
        let decision = self.decision_to_state.len();
        let state = self.checked_state_mut(state_number)?;

        if !state.is_decision() {
            return Err(AtnError::NotADecisionState {
                state_number,
                kind: state.kind,
            });
        }

        state.decision = Some(decision);
        self.decision_to_state.push(state_number);
        tracing::debug!(state_number, decision, "defined a decision");

        Ok(decision)
    }

    /// Returns the state registered as decision number `decision`.
    pub fn decision_state(&self, decision: usize) -> Option<&AtnState> {
        self.decision_to_state
            .get(decision)
            .and_then(|&state_number| self.state(state_number))
    }

    pub fn number_of_decisions(&self) -> usize {
        self.decision_to_state.len()
    }

    /// Appends to the decision registry without assigning a decision number.
    ///
    /// Used by deserializers that restore decision numbers themselves.
    pub fn append_decision_to_state(&mut self, state_number: usize) {
        self.decision_to_state.push(state_number);
    }

    /// Appends to the mode start-state table without naming the mode.
    pub fn append_mode_to_start_state(&mut self, state_number: usize) {
        self.mode_to_start_state.push(state_number);
    }

    /// Registers a rule by its start and stop states and returns its rule index.
    ///
    /// The start state is linked to the stop state.
    pub fn define_rule(&mut self, start_state: usize, stop_state: usize) -> Result<usize> {
        let stop = self.checked_state(stop_state)?;

        if !stop.is_rule_stop() {
            return Err(AtnError::UnexpectedStateKind {
                state_number: stop_state,
                kind: stop.kind,
                expected: "a rule stop",
            });
        }

        let start = self.checked_state_mut(start_state)?;

        match &mut start.kind {
            StateKind::RuleStart {
                stop_state: linked_stop,
                ..
            } => *linked_stop = Some(stop_state),

            kind => {
                return Err(AtnError::UnexpectedStateKind {
                    state_number: start_state,
                    kind: *kind,
                    expected: "a rule start",
                });
            }
        }

        let rule_index = self.rule_to_start_state.len();
        self.rule_to_start_state.push(start_state);
        self.rule_to_stop_state.push(stop_state);
        tracing::debug!(rule_index, start_state, stop_state, "defined a rule");

        Ok(rule_index)
    }

    pub fn number_of_rules(&self) -> usize {
        self.rule_to_start_state.len()
    }

    pub fn rule_start_state(&self, rule_index: usize) -> Option<&AtnState> {
        self.rule_to_start_state
            .get(rule_index)
            .and_then(|&state_number| self.state(state_number))
    }

    pub fn rule_stop_state(&self, rule_index: usize) -> Option<&AtnState> {
        self.rule_to_stop_state
            .get(rule_index)
            .and_then(|&state_number| self.state(state_number))
    }

    /// Registers a lexer mode by its tokens-start state and returns the mode's ordinal.
    pub fn define_mode(&mut self, name: impl Into<String>, start_state: usize) -> Result<usize> {
        let start = self.checked_state(start_state)?;

        if start.kind != StateKind::TokensStart {
            return Err(AtnError::UnexpectedStateKind {
                state_number: start_state,
                kind: start.kind,
                expected: "a tokens start",
            });
        }

        let name = name.into();
        let mode = self.mode_to_start_state.len();
        tracing::debug!(mode, name = %name, start_state, "defined a lexer mode");
        self.mode_name_to_start_state.insert(name, start_state);
        self.mode_to_start_state.push(start_state);

        Ok(mode)
    }

    pub fn mode_start_state(&self, name: &str) -> Option<&AtnState> {
        self.mode_name_to_start_state
            .get(name)
            .and_then(|&state_number| self.state(state_number))
    }

    pub fn mode_start_state_at(&self, mode: usize) -> Option<&AtnState> {
        self.mode_to_start_state
            .get(mode)
            .and_then(|&state_number| self.state(state_number))
    }

    /// The names of the lexer modes in definition order.
    pub fn mode_names(&self) -> impl Iterator<Item = &str> {
        self.mode_name_to_start_state.keys().map(String::as_str)
    }

    pub fn number_of_modes(&self) -> usize {
        self.mode_to_start_state.len()
    }

    /// Adds an entry to the lexer action table and returns its index.
    pub fn add_lexer_action(&mut self, action: LexerAction) -> usize {
        self.lexer_actions.push(action);

        self.lexer_actions.len() - 1
    }

    pub fn lexer_actions(&self) -> &[LexerAction] {
        &self.lexer_actions
    }

    pub fn analyzer(&self) -> Ll1Analyzer<'_> {
        Ll1Analyzer::new(self)
    }

    /// Computes the symbols that can follow `state` without leaving its rule.
    ///
    /// [`TOKEN_EPSILON`] is in the set if the end of the rule is reachable without consuming
    /// input. The result is computed once per state and frozen.
    pub fn next_tokens<'a>(&'a self, state: &'a AtnState) -> &'a IntervalSet {
        state.next_token_within_rule.get_or_init(|| {
            let mut next = self.analyzer().look_within_rule(state, None);
            next.set_readonly(true);
            self.memoized.0.store(true, Ordering::Relaxed);
            tracing::trace!(state = state.state_number, %next, "memoized a follow set");

            next
        })
    }

    /// Computes the symbols that can follow `state` in the given context.
    ///
    /// With no context, the search stops at the end of `state`'s rule and adds
    /// [`TOKEN_EPSILON`] there. With one, it continues into the callers, adding [`TOKEN_EOF`]
    /// once the outermost frame is exited.
    pub fn next_tokens_in_context(
        &self,
        state: &AtnState,
        ctx: Option<ContextNode<'_>>,
    ) -> Result<IntervalSet> {
        self.analyzer().look(state, None, ctx)
    }

    /// Resolves the rule call made at `state_number`.
    pub fn rule_call_at(&self, state_number: usize) -> Result<&RuleTransition> {
        self.checked_state(state_number)?
            .transition(0)
            .and_then(Transition::as_rule)
            .ok_or(AtnError::NotARuleTransition { state_number })
    }

    fn follow_of_call(&self, invoking_state: usize) -> Result<&IntervalSet> {
        let follow_state = self.rule_call_at(invoking_state)?.follow_state;

        Ok(self.next_tokens(self.checked_state(follow_state)?))
    }

    /// Computes the set of symbols that could follow state `state_number` in the full context
    /// `ctx`.
    ///
    /// Semantic predicates are assumed to be true. If the outermost rule can be exited without
    /// consuming input, [`TOKEN_EOF`] is in the set. A missing context is treated as the
    /// outermost one. [`TOKEN_EPSILON`] is never in the result.
    pub fn expected_tokens(
        &self,
        state_number: usize,
        ctx: Option<ContextNode<'_>>,
    ) -> Result<IntervalSet> {
        let state = self.checked_state(state_number)?;
        let mut following = self.next_tokens(state);

        if !following.contains(TOKEN_EPSILON) {
            return Ok(following.to_mutable());
        }

        let mut expected = following.to_mutable();
        expected.remove(TOKEN_EPSILON);
        let mut ctx = ctx;

        while let Some(node) = ctx.filter(|_| following.contains(TOKEN_EPSILON)) {
            let Some(invoking_state) = node.invoking_state() else {
                break;
            };

            tracing::trace!(invoking_state, "walking out to the caller's follow state");
            following = self.follow_of_call(invoking_state)?;
            expected.add_all(following);
            expected.remove(TOKEN_EPSILON);
            ctx = node.parent();
        }

        if following.contains(TOKEN_EPSILON) {
            expected.add(TOKEN_EOF);
        }

        Ok(expected)
    }

    /// Checks whether `symbol` could follow state `state_number` in the full context `ctx`.
    ///
    /// Equivalent to `expected_tokens(state_number, ctx)?.contains(symbol)`, but stops walking
    /// the context as soon as the answer is known.
    pub fn is_expected_token(
        &self,
        state_number: usize,
        ctx: Option<ContextNode<'_>>,
        symbol: isize,
    ) -> Result<bool> {
        let mut following = self.next_tokens(self.checked_state(state_number)?);

        if following.contains(symbol) && symbol != TOKEN_EPSILON {
            return Ok(true);
        }

        let mut ctx = ctx;

        while let Some(node) = ctx.filter(|_| following.contains(TOKEN_EPSILON)) {
            let Some(invoking_state) = node.invoking_state() else {
                break;
            };

            following = self.follow_of_call(invoking_state)?;

            if following.contains(symbol) && symbol != TOKEN_EPSILON {
                return Ok(true);
            }

            ctx = node.parent();
        }

        Ok(symbol == TOKEN_EOF && following.contains(TOKEN_EPSILON))
    }

    /// The symbols that can follow `state_number` within its rule, as an owned mutable set.
    pub fn expected_tokens_within_rule(&self, state_number: usize) -> Result<IntervalSet> {
        Ok(self
            .next_tokens(self.checked_state(state_number)?)
            .to_mutable())
    }

    /// Checks the structural invariants of a fully built ATN.
    pub fn verify(&self) -> Result<()> {
        let result = self.verify_states().and_then(|()| self.verify_registries());

        if let Err(e) = &result {
            tracing::debug!(error = %e, "ATN verification failed");
        }

        result
    }

    fn verify_states(&self) -> Result<()> {
        fn check(condition: bool, state: &AtnState, msg: &str) -> Result<()> {
            if condition {
                Ok(())
            } else {
                Err(AtnError::Verification(format!(
                    "state {} ({}): {msg}",
                    state.state_number, state.kind
                )))
            }
        }

        for state in self.states() {
            check(
                state.only_has_epsilon_transitions() || state.number_of_transitions() <= 1,
                state,
                "mixes epsilon and non-epsilon transitions",
            )?;

            match state.kind {
                StateKind::RuleStart { stop_state, .. } => {
                    check(stop_state.is_some(), state, "rule start has no stop state")?;
                }

                StateKind::PlusBlockStart {
                    loop_back_state, ..
                }
                | StateKind::LoopEnd { loop_back_state } => {
                    check(loop_back_state.is_some(), state, "missing loop-back state")?;
                }

                StateKind::StarLoopEntry {
                    loop_back_state, ..
                } => {
                    check(loop_back_state.is_some(), state, "missing loop-back state")?;
                    check(
                        state.number_of_transitions() == 2,
                        state,
                        "a star-loop entry must have exactly two transitions",
                    )?;
                }

                StateKind::BlockEnd { start_state } => {
                    check(start_state.is_some(), state, "block end has no start state")?;
                }

                _ => {}
            }

            if state.kind.is_block_start() {
                check(state.kind.end_state().is_some(), state, "block start has no end state")?;
            }

            if state.is_decision() {
                check(
                    state.number_of_transitions() <= 1 || state.decision.is_some(),
                    state,
                    "decision state has no decision number",
                )?;
            } else {
                check(
                    state.number_of_transitions() <= 1 || state.is_rule_stop(),
                    state,
                    "only decision and rule stop states may branch",
                )?;
            }

            for transition in state.transitions() {
                let target = self.state(transition.target);
                check(target.is_some(), state, "a transition targets a missing state")?;

                if let TransitionKind::Rule(rule) = &transition.kind {
                    check(
                        target.is_some_and(|t| matches!(t.kind, StateKind::RuleStart { .. })),
                        state,
                        "a rule transition must target a rule start state",
                    )?;
                    check(
                        self.state(rule.follow_state).is_some(),
                        state,
                        "a rule transition's follow state is missing",
                    )?;
                }
            }
        }

        Ok(())
    }

    fn verify_registries(&self) -> Result<()> {
        for (decision, &state_number) in self.decision_to_state.iter().enumerate() {
            let state = self.state(state_number).ok_or_else(|| {
                AtnError::Verification(format!("decision {decision} refers to a missing state"))
            })?;

            if state.decision != Some(decision) {
                return Err(AtnError::Verification(format!(
                    "decision {decision} refers to state {state_number} with decision {:?}",
                    state.decision
                )));
            }
        }

        for (rule_index, (&start, &stop)) in self
            .rule_to_start_state
            .iter()
            .zip(&self.rule_to_stop_state)
            .enumerate()
        {
            let linked = self.state(start).and_then(|state| match state.kind {
                StateKind::RuleStart { stop_state, .. } => stop_state,
                _ => None,
            });

            if linked != Some(stop) || !self.state(stop).is_some_and(AtnState::is_rule_stop) {
                return Err(AtnError::Verification(format!(
                    "rule {rule_index} has no matching start ({start}) and stop ({stop}) states"
                )));
            }
        }

        Ok(())
    }
}
