//! Receivers of syntax errors reported by recognizers.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use thiserror::Error;

use crate::token::Token;

/// Receives the syntax errors a recognizer reports.
pub trait ErrorListener: Debug {
    /// Called for every syntax error.
    ///
    /// `line` is 1-based, `column` 0-based.
    fn syntax_error(
        &self,
        offending_symbol: Option<&dyn Token>,
        line: isize,
        column: isize,
        msg: &str,
    );
}

/// Prints syntax errors to the standard error stream.
///
/// Recognizers start with this listener registered.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleErrorListener;

impl ErrorListener for ConsoleErrorListener {
    fn syntax_error(
        &self,
        _offending_symbol: Option<&dyn Token>,
        line: isize,
        column: isize,
        msg: &str,
    ) {
        eprintln!("line {line}:{column} {msg}");
    }
}

/// Forwards every error to a list of listeners, in order.
#[derive(Debug, Default, Clone)]
pub struct ProxyErrorListener {
    delegates: Vec<Rc<dyn ErrorListener>>,
}

impl ProxyErrorListener {
    pub fn new(delegates: Vec<Rc<dyn ErrorListener>>) -> Self {
        Self { delegates }
    }

    pub fn delegates(&self) -> &[Rc<dyn ErrorListener>] {
        &self.delegates
    }
}

impl ErrorListener for ProxyErrorListener {
    fn syntax_error(
        &self,
        offending_symbol: Option<&dyn Token>,
        line: isize,
        column: isize,
        msg: &str,
    ) {
        for delegate in &self.delegates {
            delegate.syntax_error(offending_symbol, line, column, msg);
        }
    }
}

/// A syntax error recorded by a [`CollectingErrorListener`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("encountered a syntax error at L{line}:{column}: {msg}")]
pub struct SyntaxError {
    /// The line number (1-based) this error occurred in.
    pub line: isize,

    /// The column number (0-based) this error occurred in.
    pub column: isize,

    /// The type of the offending token, if there was one.
    pub token_type: Option<isize>,

    /// The error message.
    pub msg: String,
}

/// Records syntax errors for later inspection.
#[derive(Debug, Clone)]
pub struct CollectingErrorListener(Rc<RefCell<Vec<SyntaxError>>>);

impl CollectingErrorListener {
    /// Creates a listener together with a handle to the errors it collects.
    pub fn new() -> (Self, Rc<RefCell<Vec<SyntaxError>>>) {
        let errors: Rc<RefCell<Vec<SyntaxError>>> = Default::default();

        (Self(errors.clone()), errors)
    }
}

impl ErrorListener for CollectingErrorListener {
    fn syntax_error(
        &self,
        offending_symbol: Option<&dyn Token>,
        line: isize,
        column: isize,
        msg: &str,
    ) {
        self.0.borrow_mut().push(SyntaxError {
            line,
            column,
            token_type: offending_symbol.map(|token| token.token_type()),
            msg: msg.into(),
        });
    }
}
