//! Edges of the ATN.
//!
//! A transition is owned by its source state and refers to its target by state number. The
//! [kind](TransitionKind) decides what the edge consumes: nothing (epsilon-like edges, including
//! rule calls, predicates and actions) or one symbol out of a set.

use std::fmt::{self, Display};

use crate::interval_set::IntervalSet;

/// An edge from one ATN state to another.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The state number this edge leads to.
    ///
    /// For a rule call, this is the start state of the called rule.
    pub target: usize,

    /// What kind of edge this is.
    pub kind: TransitionKind,
}

/// An enumeration of all possible transition kinds.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    /// Consumes nothing.
    Epsilon {
        /// Set on the edges leaving a precedence rule's stop state back into the rule's loop:
        /// the rule index whose outermost-precedence return this edge models.
        outermost_precedence_return: Option<usize>,
    },

    /// Consumes a single symbol.
    Atom(isize),

    /// Consumes one symbol of `start..=stop`.
    Range { start: isize, stop: isize },

    /// Consumes one symbol of the set.
    Set(IntervalSet),

    /// Consumes one symbol that is not in the set.
    NotSet(IntervalSet),

    /// Calls another rule.
    Rule(RuleTransition),

    /// Consumes any symbol.
    Wildcard,

    /// A semantic predicate. Consumes nothing.
    Predicate {
        rule_index: usize,
        pred_index: usize,
        is_ctx_dependent: bool,
    },

    /// A precedence predicate of a left-recursive rule. Consumes nothing.
    PrecedencePredicate { precedence: isize },

    /// An embedded action. Consumes nothing.
    Action {
        rule_index: usize,
        action_index: Option<usize>,
        is_ctx_dependent: bool,
    },
}

/// A call of a rule.
///
/// The target of the transition is the called rule's start state; `follow_state` is where
/// execution resumes once the called rule returns.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTransition {
    /// The index of the called rule.
    pub rule_index: usize,

    /// The precedence the rule is invoked with (`0` for non-precedence rules).
    pub precedence: isize,

    /// The state number in the caller that follows the call.
    pub follow_state: usize,
}

impl From<RuleTransition> for TransitionKind {
    fn from(transition: RuleTransition) -> Self {
        Self::Rule(transition)
    }
}

impl Transition {
    pub fn new(target: usize, kind: impl Into<TransitionKind>) -> Self {
        Self {
            target,
            kind: kind.into(),
        }
    }

    pub fn epsilon(target: usize) -> Self {
        Self::new(
            target,
            TransitionKind::Epsilon {
                outermost_precedence_return: None,
            },
        )
    }

    pub fn atom(target: usize, symbol: isize) -> Self {
        Self::new(target, TransitionKind::Atom(symbol))
    }

    pub fn range(target: usize, start: isize, stop: isize) -> Self {
        Self::new(target, TransitionKind::Range { start, stop })
    }

    pub fn set(target: usize, set: IntervalSet) -> Self {
        Self::new(target, TransitionKind::Set(set))
    }

    pub fn not_set(target: usize, set: IntervalSet) -> Self {
        Self::new(target, TransitionKind::NotSet(set))
    }

    pub fn wildcard(target: usize) -> Self {
        Self::new(target, TransitionKind::Wildcard)
    }

    /// A call of the rule starting at `rule_start`, resuming at `follow_state` afterwards.
    pub fn rule(rule_start: usize, rule_index: usize, precedence: isize, follow_state: usize) -> Self {
        Self::new(
            rule_start,
            RuleTransition {
                rule_index,
                precedence,
                follow_state,
            },
        )
    }

    pub fn predicate(target: usize, rule_index: usize, pred_index: usize, is_ctx_dependent: bool) -> Self {
        Self::new(
            target,
            TransitionKind::Predicate {
                rule_index,
                pred_index,
                is_ctx_dependent,
            },
        )
    }

    pub fn precedence_predicate(target: usize, precedence: isize) -> Self {
        Self::new(target, TransitionKind::PrecedencePredicate { precedence })
    }

    pub fn action(target: usize, rule_index: usize, action_index: Option<usize>) -> Self {
        Self::new(
            target,
            TransitionKind::Action {
                rule_index,
                action_index,
                is_ctx_dependent: false,
            },
        )
    }

    /// Returns `true` if following the edge consumes no input.
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self.kind,
            TransitionKind::Epsilon { .. }
                | TransitionKind::Rule(_)
                | TransitionKind::Predicate { .. }
                | TransitionKind::PrecedencePredicate { .. }
                | TransitionKind::Action { .. }
        )
    }

    /// Returns the rule call this edge performs, if it is one.
    pub fn as_rule(&self) -> Option<&RuleTransition> {
        match &self.kind {
            TransitionKind::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    /// The set of symbols the edge is labeled with.
    ///
    /// `None` for epsilon-like edges and wildcards. For a not-set edge, this is the excluded set.
    pub fn label(&self) -> Option<IntervalSet> {
        match &self.kind {
            TransitionKind::Atom(symbol) => Some(IntervalSet::of(*symbol)),
            &TransitionKind::Range { start, stop } => Some(IntervalSet::of_range(start, stop)),
            TransitionKind::Set(set) | TransitionKind::NotSet(set) => Some(set.clone()),
            _ => None,
        }
    }

    /// Checks whether the edge consumes `symbol`, given the grammar's symbol range.
    pub fn matches(&self, symbol: isize, min_vocab_symbol: isize, max_vocab_symbol: isize) -> bool {
        match &self.kind {
            &TransitionKind::Atom(label) => label == symbol,
            &TransitionKind::Range { start, stop } => (start..=stop).contains(&symbol),
            TransitionKind::Set(set) => set.contains(symbol),
            TransitionKind::NotSet(set) => {
                (min_vocab_symbol..=max_vocab_symbol).contains(&symbol) && !set.contains(symbol)
            }
            TransitionKind::Wildcard => (min_vocab_symbol..=max_vocab_symbol).contains(&symbol),
            _ => false,
        }
    }
}

impl Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epsilon { .. } => f.write_str("epsilon"),
            Self::Atom(symbol) => write!(f, "{symbol}"),
            Self::Range { start, stop } => write!(f, "{start}..{stop}"),
            Self::Set(set) => write!(f, "{set}"),
            Self::NotSet(set) => write!(f, "~{set}"),
            Self::Rule(rule) => write!(f, "rule_{}", rule.rule_index),
            Self::Wildcard => f.write_str("."),
            Self::Predicate {
                rule_index,
                pred_index,
                ..
            } => write!(f, "pred_{rule_index}:{pred_index}"),
            Self::PrecedencePredicate { precedence } => write!(f, "{precedence} >= _p"),
            Self::Action {
                rule_index,
                action_index,
                ..
            } => match action_index {
                Some(action_index) => write!(f, "action_{rule_index}:{action_index}"),
                None => write!(f, "action_{rule_index}"),
            },
        }
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.kind, self.target)
    }
}
