//! The runtime core of an ATN-based parser generator.
//!
//! An [`Atn`] is the state graph of a grammar. Besides storing the graph, it answers the question
//! recognizers ask when reporting errors or suggesting completions: which symbols may come next
//! at a given state, given the chain of rule invocations ([`context`]) that led there.

pub mod atn;
pub mod context;
pub mod error_listener;
pub mod interval_set;
pub mod lexer_action;
pub mod ll1;
pub mod recognizer;
pub mod state;
pub mod stream;
pub mod token;
pub mod transition;
pub mod vocabulary;

#[cfg(feature = "serde")]
mod serialize;

pub use atn::{Atn, AtnError, AtnType};
pub use context::{ContextArena, ContextId, ContextNode, RuleContext};
pub use interval_set::{Interval, IntervalSet};
pub use recognizer::{Recognizer, RecognizerBase, RecognizerError};
pub use state::{AtnState, StateKind};
pub use transition::{RuleTransition, Transition, TransitionKind};
pub use vocabulary::Vocabulary;
