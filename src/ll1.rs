//! Follow-set computation by epsilon closure over the ATN.

use std::collections::HashSet;
use std::rc::Rc;

use crate::atn::{Atn, Result};
use crate::context::ContextNode;
use crate::interval_set::IntervalSet;
use crate::state::AtnState;
use crate::token::{TOKEN_EOF, TOKEN_EPSILON, TOKEN_INVALID_TYPE, TOKEN_MIN_USER_TOKEN_TYPE};
use crate::transition::TransitionKind;

/// The symbol a lookahead set carries when the search stopped at a semantic predicate.
pub const HIT_PRED: isize = TOKEN_INVALID_TYPE;

/// Options of a closure search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookOptions {
    /// Follow predicate edges as if the predicates held. Otherwise, reaching a predicate adds
    /// [`HIT_PRED`] to the result.
    pub see_through_predicates: bool,

    /// Add [`TOKEN_EOF`] when the outermost context is exited.
    ///
    /// When unset, the search instead follows the outgoing edges of the rule stop state it
    /// reached.
    pub add_eof: bool,
}

impl Default for LookOptions {
    fn default() -> Self {
        Self {
            see_through_predicates: true,
            add_eof: true,
        }
    }
}

/// The return states of the rules entered so far, innermost first.
#[derive(Debug, PartialEq, Eq, Hash)]
enum ReturnStack {
    /// The outermost context: nothing to return to.
    Empty,

    Frame {
        return_state: usize,

        /// `None` if the search started with no context.
        parent: Option<Rc<ReturnStack>>,
    },
}

/// Computes the symbols that can follow an ATN state.
#[derive(Debug, Clone, Copy)]
pub struct Ll1Analyzer<'a> {
    atn: &'a Atn,
}

impl<'a> Ll1Analyzer<'a> {
    pub fn new(atn: &'a Atn) -> Self {
        Self { atn }
    }

    /// Computes the symbols that can follow `state`.
    ///
    /// The search stops at `stop_state` if given. Without a context, reaching the end of a rule
    /// (or `stop_state`) adds [`TOKEN_EPSILON`]; with one, the search continues into the callers
    /// and adds [`TOKEN_EOF`] once the outermost frame is exited.
    pub fn look(
        &self,
        state: &AtnState,
        stop_state: Option<usize>,
        ctx: Option<ContextNode<'_>>,
    ) -> Result<IntervalSet> {
        self.look_with(state, stop_state, ctx, LookOptions::default())
    }

    /// Same as [`look`](Self::look), with explicit options.
    pub fn look_with(
        &self,
        state: &AtnState,
        stop_state: Option<usize>,
        ctx: Option<ContextNode<'_>>,
        options: LookOptions,
    ) -> Result<IntervalSet> {
        let ctx = ctx.map(|node| self.return_stack_of(node)).transpose()?;
        let mut closure = Closure::new(self.atn, options);
        closure.walk(state, stop_state, ctx);

        Ok(closure.look)
    }

    /// The context-free search: the end of the rule adds [`TOKEN_EPSILON`].
    pub(crate) fn look_within_rule(&self, state: &AtnState, stop_state: Option<usize>) -> IntervalSet {
        let mut closure = Closure::new(self.atn, LookOptions::default());
        closure.walk(state, stop_state, None);

        closure.look
    }

    /// Computes the lookahead of each alternative of a decision.
    ///
    /// Predicates are not seen through. An alternative whose lookahead is empty or depends on a
    /// predicate is `None`.
    pub fn decision_lookahead(&self, state: &AtnState) -> Vec<Option<IntervalSet>> {
        let options = LookOptions {
            see_through_predicates: false,
            add_eof: false,
        };

        state
            .transitions()
            .iter()
            .map(|transition| {
                let target = self.atn.state(transition.target)?;
                let mut closure = Closure::new(self.atn, options);
                closure.walk(target, None, Some(Rc::new(ReturnStack::Empty)));

                let look = closure.look;

                (!look.is_empty() && !look.contains(HIT_PRED)).then_some(look)
            })
            .collect()
    }

    /// Converts a chain of frames into the return states of their rule calls.
    ///
    /// The chain ends at the outermost frame or at the first frame whose caller has been popped.
    /// That frame's own call still counts.
    fn return_stack_of(&self, node: ContextNode<'_>) -> Result<Rc<ReturnStack>> {
        let invoking_states: Vec<usize> = node
            .ancestors()
            .map_while(|node| node.invoking_state())
            .collect();

        invoking_states
            .into_iter()
            .rev()
            .try_fold(Rc::new(ReturnStack::Empty), |parent, invoking_state| {
                let rule = self.atn.rule_call_at(invoking_state)?;

                Ok(Rc::new(ReturnStack::Frame {
                    return_state: rule.follow_state,
                    parent: Some(parent),
                }))
            })
    }
}

struct Closure<'a> {
    atn: &'a Atn,
    options: LookOptions,
    look: IntervalSet,
    busy: HashSet<(usize, Option<Rc<ReturnStack>>)>,
    called_rules: HashSet<usize>,
}

impl<'a> Closure<'a> {
    fn new(atn: &'a Atn, options: LookOptions) -> Self {
        Self {
            atn,
            options,
            look: IntervalSet::new(),
            busy: HashSet::new(),
            called_rules: HashSet::new(),
        }
    }

    fn walk(&mut self, state: &AtnState, stop_state: Option<usize>, ctx: Option<Rc<ReturnStack>>) {
        if !self.busy.insert((state.state_number, ctx.clone())) {
            return;
        }

        tracing::trace!(state = state.state_number, "LL(1) closure step");

        let at_stop_state = stop_state == Some(state.state_number);

        if at_stop_state || state.is_rule_stop() {
            match ctx.as_deref() {
                None => {
                    self.look.add(TOKEN_EPSILON);

                    return;
                }

                Some(ReturnStack::Empty) if self.options.add_eof => {
                    self.look.add(TOKEN_EOF);

                    return;
                }

                Some(ReturnStack::Frame {
                    return_state,
                    parent,
                }) if state.is_rule_stop() => {
                    self.return_to(state, *return_state, stop_state, parent.clone());

                    return;
                }

                _ => {}
            }
        }

        let atn = self.atn;

        for transition in state.transitions() {
            let Some(target) = atn.state(transition.target) else {
                tracing::warn!(
                    state = state.state_number,
                    target = transition.target,
                    "skipping a transition to a missing state"
                );

                continue;
            };

            match &transition.kind {
                TransitionKind::Rule(rule) => {
                    if self.called_rules.contains(&target.rule_index) {
                        continue;
                    }

                    let callee_ctx = Rc::new(ReturnStack::Frame {
                        return_state: rule.follow_state,
                        parent: ctx.clone(),
                    });

                    self.called_rules.insert(target.rule_index);
                    self.walk(target, stop_state, Some(callee_ctx));
                    self.called_rules.remove(&target.rule_index);
                }

                TransitionKind::Predicate { .. } | TransitionKind::PrecedencePredicate { .. } => {
                    if self.options.see_through_predicates {
                        self.walk(target, stop_state, ctx.clone());
                    } else {
                        self.look.add(HIT_PRED);
                    }
                }

                _ if transition.is_epsilon() => self.walk(target, stop_state, ctx.clone()),

                TransitionKind::Wildcard => {
                    self.look
                        .add_range(TOKEN_MIN_USER_TOKEN_TYPE, atn.max_token_type);
                }

                TransitionKind::NotSet(set) => {
                    self.look.add_all(
                        &set.complement(TOKEN_MIN_USER_TOKEN_TYPE, atn.max_token_type),
                    );
                }

                _ => {
                    if let Some(label) = transition.label() {
                        self.look.add_all(&label);
                    }
                }
            }
        }
    }

    /// Leaves the rule of `stop` and continues at the caller's follow state.
    fn return_to(
        &mut self,
        stop: &AtnState,
        return_state: usize,
        stop_state: Option<usize>,
        parent: Option<Rc<ReturnStack>>,
    ) {
        let Some(follow) = self.atn.state(return_state) else {
            tracing::warn!(return_state, "skipping a return to a missing state");

            return;
        };

        // the caller may call this rule again after the return.
        let was_called = self.called_rules.remove(&stop.rule_index);
        self.walk(follow, stop_state, parent);

        if was_called {
            self.called_rules.insert(stop.rule_index);
        }
    }
}
