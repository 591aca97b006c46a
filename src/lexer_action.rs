//! Actions a lexer ATN attaches to its rules.

use derive_more::Display;

/// A lexer command or a user action, referenced by index from action transitions of a lexer ATN.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Display, Debug, Clone, PartialEq, Eq, Hash)]
pub enum LexerAction {
    /// `-> channel(n)`
    #[display("channel({_0})")]
    Channel(isize),

    /// A user action embedded in a lexer rule.
    #[display("custom({rule_index}, {action_index})")]
    Custom {
        rule_index: usize,
        action_index: usize,
    },

    /// `-> mode(n)`
    #[display("mode({_0})")]
    Mode(usize),

    /// `-> more`
    #[display("more")]
    More,

    /// `-> popMode`
    #[display("popMode")]
    PopMode,

    /// `-> pushMode(n)`
    #[display("pushMode({_0})")]
    PushMode(usize),

    /// `-> skip`
    #[display("skip")]
    Skip,

    /// `-> type(n)`
    #[display("type({_0})")]
    Type(isize),

    /// A position-dependent action pinned to an offset of the token's start.
    #[display("indexedCustom({offset}, {action})")]
    IndexedCustom {
        offset: isize,
        action: Box<LexerAction>,
    },
}

impl LexerAction {
    /// Returns `true` if the action must run at the position it appears in the rule rather than
    /// at the end of the token.
    pub fn is_position_dependent(&self) -> bool {
        matches!(self, Self::Custom { .. } | Self::IndexedCustom { .. })
    }
}
