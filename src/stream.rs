//! The input layer's interfaces: symbol streams and token factories.
//!
//! These are implemented outside this crate by lexers and token streams; the runtime only reads
//! symbol values and positions through them.

use crate::token::{CommonToken, TOKEN_DEFAULT_CHANNEL};

/// The name reported by streams that don't know where their input came from.
pub const UNKNOWN_SOURCE_NAME: &str = "<unknown>";

/// A stream of integer symbols: characters for a lexer, token types for a parser.
pub trait IntStream {
    /// Advances the stream past the current symbol.
    fn consume(&mut self);

    /// Looks `i` symbols ahead (`1` is the current symbol, `-1` the previous one).
    ///
    /// Returns [`TOKEN_EOF`](crate::token::TOKEN_EOF) past the end of the input.
    fn la(&mut self, i: isize) -> isize;

    /// The index of the current symbol.
    fn index(&self) -> isize;

    /// Moves the stream so that the current symbol is the one at `index`.
    fn seek(&mut self, index: isize);

    /// The total number of symbols in the stream, if known.
    fn size(&self) -> Option<usize>;

    /// The name of the input's source.
    fn source_name(&self) -> String {
        UNKNOWN_SOURCE_NAME.to_owned()
    }
}

/// The data a token factory needs to create a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpec<'a> {
    pub token_type: isize,
    pub text: Option<&'a str>,
    pub channel: isize,
    pub start: isize,
    pub stop: isize,
    pub line: isize,
    pub column: isize,
}

impl<'a> TokenSpec<'a> {
    /// A token on the default channel with no position information.
    pub fn new(token_type: isize, text: Option<&'a str>) -> Self {
        Self {
            token_type,
            text,
            channel: TOKEN_DEFAULT_CHANNEL,
            start: 0,
            stop: 0,
            line: 0,
            column: -1,
        }
    }
}

/// Creates the tokens a lexer emits.
pub trait TokenFactory {
    /// The token type this factory creates.
    type Token: crate::token::Token;

    /// Creates a token.
    fn create(&self, spec: TokenSpec<'_>) -> Self::Token;
}

/// A factory producing [`CommonToken`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonTokenFactory;

impl TokenFactory for CommonTokenFactory {
    type Token = CommonToken;

    fn create(&self, spec: TokenSpec<'_>) -> CommonToken {
        CommonToken {
            token_type: spec.token_type,
            text: spec.text.map(str::to_owned),
            line: spec.line,
            column: spec.column,
            channel: spec.channel,
            token_index: -1,
            start: spec.start,
            stop: spec.stop,
        }
    }
}
