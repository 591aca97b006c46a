//! ATN state definitions.

use std::sync::OnceLock;

use derive_more::Display;

use crate::interval_set::IntervalSet;
use crate::transition::Transition;

/// The state number of a state that hasn't been added to an ATN yet.
pub const INVALID_STATE_NUMBER: usize = usize::MAX;

/// A node of the ATN.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct AtnState {
    /// The index of the state in its ATN's state table.
    ///
    /// Assigned by [`Atn::add_state`](crate::atn::Atn::add_state) and stable afterwards.
    pub state_number: usize,

    /// The index of the rule this state belongs to.
    pub rule_index: usize,

    /// What kind of state this is.
    ///
    /// The variants hold the links specific to each kind.
    pub kind: StateKind,

    /// The decision number, if this is a decision state registered with
    /// [`Atn::define_decision_state`](crate::atn::Atn::define_decision_state).
    pub decision: Option<usize>,

    /// Whether the decision prefers exiting over looping (`*?`, `+?`, `??`).
    pub non_greedy: bool,

    transitions: Vec<Transition>,
    epsilon_only_transitions: bool,

    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) next_token_within_rule: OnceLock<IntervalSet>,
}

/// An enumeration of all possible state kinds.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    #[display("BASIC")]
    Basic,

    /// The entry of a rule.
    #[display("RULE_START")]
    RuleStart {
        stop_state: Option<usize>,
        is_left_recursive: bool,
    },

    /// The exit of a rule.
    #[display("RULE_STOP")]
    RuleStop,

    /// The start of a `(A | B | ...)` block.
    #[display("BLOCK_START")]
    BasicBlockStart { end_state: Option<usize> },

    /// The start of a `(A | B | ...)+` block.
    #[display("PLUS_BLOCK_START")]
    PlusBlockStart {
        end_state: Option<usize>,
        loop_back_state: Option<usize>,
    },

    /// The start of a `(A | B | ...)*` block.
    #[display("STAR_BLOCK_START")]
    StarBlockStart { end_state: Option<usize> },

    /// The end of any block.
    #[display("BLOCK_END")]
    BlockEnd { start_state: Option<usize> },

    /// The decision of a `(...)*` loop: enter the block or exit the loop.
    #[display("STAR_LOOP_ENTRY")]
    StarLoopEntry {
        loop_back_state: Option<usize>,
        is_precedence_decision: bool,
    },

    #[display("STAR_LOOP_BACK")]
    StarLoopback,

    /// The decision of a `(...)+` loop: iterate again or exit.
    #[display("PLUS_LOOP_BACK")]
    PlusLoopback,

    /// The state a loop exits to.
    #[display("LOOP_END")]
    LoopEnd { loop_back_state: Option<usize> },

    /// The entry of a lexer mode.
    #[display("TOKEN_START")]
    TokensStart,
}

impl StateKind {
    pub fn rule_start() -> Self {
        Self::RuleStart {
            stop_state: None,
            is_left_recursive: false,
        }
    }

    /// Returns `true` for the kinds where the parser picks among alternatives.
    pub fn is_decision(&self) -> bool {
        matches!(
            self,
            Self::BasicBlockStart { .. }
                | Self::PlusBlockStart { .. }
                | Self::StarBlockStart { .. }
                | Self::StarLoopEntry { .. }
                | Self::PlusLoopback
                | Self::TokensStart
        )
    }

    pub fn is_block_start(&self) -> bool {
        matches!(
            self,
            Self::BasicBlockStart { .. } | Self::PlusBlockStart { .. } | Self::StarBlockStart { .. }
        )
    }

    /// The end state of a block start.
    pub fn end_state(&self) -> Option<usize> {
        match *self {
            Self::BasicBlockStart { end_state }
            | Self::PlusBlockStart { end_state, .. }
            | Self::StarBlockStart { end_state } => end_state,
            _ => None,
        }
    }
}

impl AtnState {
    pub fn new(kind: StateKind) -> Self {
        Self {
            state_number: INVALID_STATE_NUMBER,
            rule_index: 0,
            kind,
            decision: None,
            non_greedy: false,
            transitions: vec![],
            epsilon_only_transitions: false,
            next_token_within_rule: OnceLock::new(),
        }
    }

    pub fn basic() -> Self {
        Self::new(StateKind::Basic)
    }

    /// Sets the owning rule.
    pub fn in_rule(mut self, rule_index: usize) -> Self {
        self.rule_index = rule_index;

        self
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn transition(&self, idx: usize) -> Option<&Transition> {
        self.transitions.get(idx)
    }

    pub fn number_of_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` if every outgoing edge consumes no input.
    pub fn only_has_epsilon_transitions(&self) -> bool {
        self.epsilon_only_transitions
    }

    pub fn add_transition(&mut self, transition: Transition) {
        self.insert_transition(self.transitions.len(), transition);
    }

    /// Inserts an outgoing edge at position `idx`.
    ///
    /// # Panics
    /// Panics if `idx > self.number_of_transitions()`.
    pub fn insert_transition(&mut self, idx: usize, transition: Transition) {
        if self.transitions.is_empty() {
            self.epsilon_only_transitions = transition.is_epsilon();
        } else if self.epsilon_only_transitions != transition.is_epsilon() {
            tracing::warn!(
                state = self.state_number,
                "ATN state has both epsilon and non-epsilon transitions"
            );
            self.epsilon_only_transitions = false;
        }

        self.transitions.insert(idx, transition);
    }

    /// Replaces the edge at position `idx`, returning the old one.
    pub fn set_transition(&mut self, idx: usize, transition: Transition) -> Option<Transition> {
        let slot = self.transitions.get_mut(idx)?;
        let replaced = std::mem::replace(slot, transition);
        self.refresh_epsilon_only();

        Some(replaced)
    }

    pub fn remove_transition(&mut self, idx: usize) -> Option<Transition> {
        let removed = (idx < self.transitions.len()).then(|| self.transitions.remove(idx))?;
        self.refresh_epsilon_only();

        Some(removed)
    }

    fn refresh_epsilon_only(&mut self) {
        self.epsilon_only_transitions =
            !self.transitions.is_empty() && self.transitions.iter().all(Transition::is_epsilon);
    }

    pub fn is_decision(&self) -> bool {
        self.kind.is_decision()
    }

    pub fn is_rule_stop(&self) -> bool {
        matches!(self.kind, StateKind::RuleStop)
    }

    /// The memoized follow set within the state's rule, if it has been computed.
    pub fn next_token_within_rule(&self) -> Option<&IntervalSet> {
        self.next_token_within_rule.get()
    }
}

impl PartialEq for AtnState {
    fn eq(&self, other: &Self) -> bool {
        self.state_number == other.state_number
    }
}

impl Eq for AtnState {}
