//! Token types and the token abstraction consumed from the lexer layer.

use std::fmt::{self, Display};

/// The token type of the end-of-file marker.
pub const TOKEN_EOF: isize = -1;

/// The pseudo token type a follow set carries when the end of a rule is reachable without
/// consuming any input.
///
/// Never a real input symbol.
pub const TOKEN_EPSILON: isize = -2;

/// The token type of an invalid token.
pub const TOKEN_INVALID_TYPE: isize = 0;

/// The smallest token type a grammar can assign to a user-defined token.
pub const TOKEN_MIN_USER_TOKEN_TYPE: isize = 1;

/// The default channel tokens are emitted on.
pub const TOKEN_DEFAULT_CHANNEL: isize = 0;

/// The channel for tokens the parser should not see.
pub const TOKEN_HIDDEN_CHANNEL: isize = 1;

/// A lexed symbol as seen by the runtime.
///
/// The runtime only ever reads these properties; how a token is stored is up to the lexer.
pub trait Token: fmt::Debug {
    /// The token type.
    fn token_type(&self) -> isize;

    /// The token text, if any was recorded.
    fn text(&self) -> Option<&str>;

    /// The line number (1-based) the token starts on.
    fn line(&self) -> isize;

    /// The column (0-based) the token starts at.
    fn column(&self) -> isize;

    /// The channel the token was emitted on.
    fn channel(&self) -> isize;

    /// The index of the token in its token stream, or `-1` if it was synthesized.
    fn token_index(&self) -> isize;

    /// The index of the first character of the token in the input.
    fn start_index(&self) -> isize;

    /// The index of the last character of the token in the input.
    fn stop_index(&self) -> isize;
}

/// The default token implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonToken {
    pub token_type: isize,
    pub text: Option<String>,
    pub line: isize,
    pub column: isize,
    pub channel: isize,
    pub token_index: isize,
    pub start: isize,
    pub stop: isize,
}

impl CommonToken {
    /// Creates a synthesized token with the given type and text.
    pub fn new(token_type: isize, text: impl Into<Option<String>>) -> Self {
        Self {
            token_type,
            text: text.into(),
            line: 0,
            column: -1,
            channel: TOKEN_DEFAULT_CHANNEL,
            token_index: -1,
            start: 0,
            stop: 0,
        }
    }

    /// Creates the end-of-file token.
    pub fn eof() -> Self {
        Self::new(TOKEN_EOF, Some("<EOF>".to_owned()))
    }
}

impl Token for CommonToken {
    fn token_type(&self) -> isize {
        self.token_type
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn line(&self) -> isize {
        self.line
    }

    fn column(&self) -> isize {
        self.column
    }

    fn channel(&self) -> isize {
        self.channel
    }

    fn token_index(&self) -> isize {
        self.token_index
    }

    fn start_index(&self) -> isize {
        self.start
    }

    fn stop_index(&self) -> isize {
        self.stop
    }
}

impl Display for CommonToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[@{},{}:{}='{}',<{}>",
            self.token_index,
            self.start,
            self.stop,
            escape_whitespace(self.text.as_deref().unwrap_or("<no text>")),
            self.token_type,
        )?;

        if self.channel > TOKEN_DEFAULT_CHANNEL {
            write!(f, ",channel={}", self.channel)?;
        }

        write!(f, ",{}:{}]", self.line, self.column)
    }
}

/// Escapes newlines, carriage returns and tabs so that a token's text fits on a single line.
pub(crate) fn escape_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(c),
        }
    }

    result
}
