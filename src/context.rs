//! Rule invocation frames.
//!
//! The parser's call stack is a chain of frames, each pointing at the frame of its caller. Frames
//! live in a [`ContextArena`] and refer to their parents by [`ContextId`], so the chain is
//! never copied: queries borrow the arena and walk it through [`ContextNode`]s.

use std::fmt::{self, Display};
use std::iter;

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A handle to a frame stored in a [`ContextArena`].
    pub struct ContextId;
}

/// One active rule invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    /// The key of this frame in its arena.
    pub id: ContextId,

    /// The state number in the caller at which the invocation happened.
    ///
    /// `None` for the outermost frame, which has no caller.
    pub invoking_state: Option<usize>,

    /// The caller's frame.
    pub parent: Option<ContextId>,

    /// The index of the invoked rule, if known.
    pub rule_index: Option<usize>,
}

/// Storage for rule invocation frames.
///
/// The parsing machinery pushes a frame when it enters a rule and pops it when the rule returns.
/// Only leaf frames should be popped: a frame whose parent has been popped sees its chain end
/// there.
#[derive(Debug, Clone, Default)]
pub struct ContextArena {
    frames: SlotMap<ContextId, RuleContext>,
}

impl ContextArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an outermost frame, one with no caller.
    pub fn push_root(&mut self, rule_index: Option<usize>) -> ContextId {
        self.frames.insert_with_key(|id| RuleContext {
            id,
            invoking_state: None,
            parent: None,
            rule_index,
        })
    }

    /// Creates a frame for a rule invoked from `parent` at state `invoking_state`.
    pub fn push(
        &mut self,
        parent: ContextId,
        invoking_state: usize,
        rule_index: Option<usize>,
    ) -> ContextId {
        self.frames.insert_with_key(|id| RuleContext {
            id,
            invoking_state: Some(invoking_state),
            parent: Some(parent),
            rule_index,
        })
    }

    /// Discards a frame once its rule has returned.
    pub fn pop(&mut self, id: ContextId) -> Option<RuleContext> {
        self.frames.remove(id)
    }

    pub fn get(&self, id: ContextId) -> Option<&RuleContext> {
        self.frames.get(id)
    }

    /// Returns a view of the frame that can walk its chain of callers.
    pub fn node(&self, id: ContextId) -> Option<ContextNode<'_>> {
        self.frames.get(id).map(|frame| ContextNode { arena: self, frame })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// A frame borrowed together with its arena.
#[derive(Debug, Clone, Copy)]
pub struct ContextNode<'a> {
    arena: &'a ContextArena,
    frame: &'a RuleContext,
}

impl<'a> ContextNode<'a> {
    pub fn id(&self) -> ContextId {
        self.frame.id
    }

    pub fn frame(&self) -> &'a RuleContext {
        self.frame
    }

    pub fn invoking_state(&self) -> Option<usize> {
        self.frame.invoking_state
    }

    pub fn rule_index(&self) -> Option<usize> {
        self.frame.rule_index
    }

    /// The caller's frame, if it is still alive.
    pub fn parent(&self) -> Option<ContextNode<'a>> {
        self.frame.parent.and_then(|id| self.arena.node(id))
    }

    /// Returns `true` for an outermost frame.
    pub fn is_empty(&self) -> bool {
        self.frame.invoking_state.is_none()
    }

    /// Iterates over this frame and all of its callers, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = ContextNode<'a>> + use<'a> {
        iter::successors(Some(*self), ContextNode::parent)
    }

    /// The number of frames in the chain, this one included.
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Renders the chain as `[rule caller ...]` using `rule_names`.
    pub fn display_with<'n, S: AsRef<str>>(&self, rule_names: &'n [S]) -> impl Display + use<'a, 'n, S> {
        ChainDisplay {
            node: *self,
            rule_names,
        }
    }
}

impl PartialEq for ContextNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.arena, other.arena) && self.frame.id == other.frame.id
    }
}

impl Eq for ContextNode<'_> {}

struct ChainDisplay<'a, 'n, S> {
    node: ContextNode<'a>,
    rule_names: &'n [S],
}

impl<S: AsRef<str>> Display for ChainDisplay<'_, '_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;

        for (idx, node) in self.node.ancestors().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }

            match node.rule_index() {
                Some(rule_index) => match self.rule_names.get(rule_index) {
                    Some(name) => f.write_str(name.as_ref())?,
                    None => write!(f, "{rule_index}")?,
                },

                None => match node.invoking_state() {
                    Some(state) => write!(f, "{state}")?,
                    None => f.write_str("<root>")?,
                },
            }
        }

        f.write_str("]")
    }
}
