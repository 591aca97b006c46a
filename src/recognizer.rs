//! The recognizer boundary: what lexers and parsers share.
//!
//! A concrete recognizer embeds a [`RecognizerBase`] and implements [`Recognizer`], supplying the
//! grammar-specific hooks. Hooks have no default bodies, so a recognizer that forgets one does not
//! compile.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use thiserror::Error;

use crate::atn::{Atn, AtnError};
use crate::context::{ContextId, ContextNode};
use crate::error_listener::{ConsoleErrorListener, ErrorListener, ProxyErrorListener};
use crate::interval_set::IntervalSet;
use crate::stream::{CommonTokenFactory, IntStream, TokenFactory};
use crate::token::{TOKEN_EOF, TOKEN_INVALID_TYPE, Token, escape_whitespace};
use crate::vocabulary::Vocabulary;

/// An error reported by a recognizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognizerError {
    /// The recognizer cannot provide what was asked for.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The recognizer hasn't been placed in an ATN state yet.
    #[error("the recognizer is not in any ATN state")]
    NoState,

    #[error(transparent)]
    Atn(#[from] AtnError),
}

type NameMap<V> = Arc<HashMap<String, V>>;

struct CacheEntry<T: ?Sized, V> {
    snapshot: Weak<T>,
    map: NameMap<V>,
}

/// Name lookup tables keyed by the identity of the snapshot they were built from.
///
/// Each entry keeps a weak reference to its snapshot. The weak reference pins the snapshot's
/// allocation, so its address can't be reused by another snapshot while the entry exists.
struct IdentityCache<T: ?Sized, V> {
    entries: Mutex<HashMap<usize, CacheEntry<T, V>>>,
}

impl<T: ?Sized, V> IdentityCache<T, V> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(snapshot: &Arc<T>) -> usize {
        Arc::as_ptr(snapshot).cast::<()>() as usize
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<usize, CacheEntry<T, V>>> {
        // entries are only ever inserted whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_or_build(
        &self,
        snapshot: &Arc<T>,
        build: impl FnOnce(&T) -> HashMap<String, V>,
    ) -> NameMap<V> {
        let key = Self::key(snapshot);

        if let Some(entry) = self.lock().get(&key) {
            return entry.map.clone();
        }

        // built without holding the lock; a concurrent build of the same map loses the race.
        let map = Arc::new(build(snapshot.as_ref()));

        self.lock()
            .entry(key)
            .or_insert_with(|| CacheEntry {
                snapshot: Arc::downgrade(snapshot),
                map,
            })
            .map
            .clone()
    }

    fn purge(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.snapshot.strong_count() > 0);

        before - entries.len()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Caches of the token-type and rule-index maps.
///
/// The cache can be shared between recognizers of the same grammar. A map is reused as long as
/// the vocabulary or rule-name snapshot it was built from is alive; [`purge`](Self::purge) frees
/// the maps of snapshots that have been dropped.
pub struct LookupCache {
    token_types: IdentityCache<Vocabulary, isize>,
    rule_indices: IdentityCache<[String], usize>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self {
            token_types: IdentityCache::new(),
            rule_indices: IdentityCache::new(),
        }
    }

    /// Maps token names (literal and symbolic) to token types.
    pub fn token_type_map(
        &self,
        vocabulary: &Arc<Vocabulary>,
        max_token_type: isize,
    ) -> NameMap<isize> {
        self.token_types.get_or_build(vocabulary, |vocabulary| {
            let mut map = HashMap::new();

            for token_type in 0..=max_token_type {
                if let Some(name) = vocabulary.literal_name(token_type) {
                    map.insert(name.to_owned(), token_type);
                }

                if let Some(name) = vocabulary.symbolic_name(token_type) {
                    map.insert(name.to_owned(), token_type);
                }
            }

            map.insert("EOF".to_owned(), TOKEN_EOF);
            tracing::debug!(entries = map.len(), "built a token type map");

            map
        })
    }

    /// Maps rule names to rule indices.
    pub fn rule_index_map(&self, rule_names: &Arc<[String]>) -> NameMap<usize> {
        self.rule_indices.get_or_build(rule_names, |rule_names| {
            let map: HashMap<_, _> = rule_names
                .iter()
                .enumerate()
                .map(|(idx, name)| (name.clone(), idx))
                .collect();
            tracing::debug!(entries = map.len(), "built a rule index map");

            map
        })
    }

    /// Drops the maps whose snapshots are gone, returning how many were dropped.
    pub fn purge(&self) -> usize {
        self.token_types.purge() + self.rule_indices.purge()
    }

    /// The number of cached maps.
    pub fn len(&self) -> usize {
        self.token_types.len() + self.rule_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for LookupCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupCache")
            .field("token_types", &self.token_types.len())
            .field("rule_indices", &self.rule_indices.len())
            .finish()
    }
}

/// The state every recognizer carries.
#[derive(Debug)]
pub struct RecognizerBase<I> {
    interpreter: Option<I>,
    state: Option<usize>,
    listeners: Vec<Rc<dyn ErrorListener>>,
    cache: Arc<LookupCache>,
}

impl<I> RecognizerBase<I> {
    /// Creates a base with the console listener registered and a cache of its own.
    pub fn new() -> Self {
        Self::with_cache(Arc::default())
    }

    /// Creates a base using a shared lookup cache.
    pub fn with_cache(cache: Arc<LookupCache>) -> Self {
        Self {
            interpreter: None,
            state: None,
            listeners: vec![Rc::new(ConsoleErrorListener)],
            cache,
        }
    }

    /// The ATN interpreter driving this recognizer.
    pub fn interpreter(&self) -> Option<&I> {
        self.interpreter.as_ref()
    }

    pub fn interpreter_mut(&mut self) -> Option<&mut I> {
        self.interpreter.as_mut()
    }

    /// Replaces the interpreter, returning the previous one.
    pub fn set_interpreter(&mut self, interpreter: I) -> Option<I> {
        self.interpreter.replace(interpreter)
    }

    pub fn cache(&self) -> &Arc<LookupCache> {
        &self.cache
    }
}

impl<I> Default for RecognizerBase<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A lexer or parser driven by an ATN.
pub trait Recognizer {
    /// The ATN interpreter type stored in the base.
    type Interpreter;

    /// The input the recognizer reads.
    type Input: IntStream + ?Sized;

    /// The factory the recognizer creates tokens with.
    type TokenFactory: TokenFactory;

    fn base(&self) -> &RecognizerBase<Self::Interpreter>;

    fn base_mut(&mut self) -> &mut RecognizerBase<Self::Interpreter>;

    /// The names of the grammar's tokens.
    fn vocabulary(&self) -> &Arc<Vocabulary>;

    /// The names of the grammar's rules, indexed by rule index.
    fn rule_names(&self) -> &Arc<[String]>;

    /// The serialized form of the grammar's ATN.
    ///
    /// Recognizers that were not generated from a grammar don't know it and return
    /// [`RecognizerError::Unsupported`].
    fn serialized_atn(&self) -> Result<&str, RecognizerError>;

    fn grammar_file_name(&self) -> &str;

    /// The ATN the recognizer predicts with.
    fn atn(&self) -> &Atn;

    /// Evaluates semantic predicate `pred_index` of rule `rule_index`.
    fn sempred(&mut self, ctx: Option<ContextId>, rule_index: usize, pred_index: usize) -> bool;

    /// Evaluates a precedence predicate of a left-recursive rule.
    fn precpred(&mut self, ctx: Option<ContextId>, precedence: isize) -> bool;

    /// Runs action `action_index` of rule `rule_index`.
    fn action(&mut self, ctx: Option<ContextId>, rule_index: usize, action_index: usize);

    fn input_stream(&mut self) -> &mut Self::Input;

    fn token_factory(&self) -> &Self::TokenFactory;

    /// The ATN state the recognizer is in, if any.
    fn state(&self) -> Option<usize> {
        self.base().state
    }

    /// Records that the recognizer moved to ATN state `state`.
    fn set_state(&mut self, state: usize) {
        self.base_mut().state = Some(state);
    }

    fn add_error_listener(&mut self, listener: Rc<dyn ErrorListener>) {
        self.base_mut().listeners.push(listener);
    }

    /// Unregisters a listener, comparing by identity.
    fn remove_error_listener(&mut self, listener: &Rc<dyn ErrorListener>) {
        self.base_mut()
            .listeners
            .retain(|registered| !Rc::ptr_eq(registered, listener));
    }

    fn remove_error_listeners(&mut self) {
        self.base_mut().listeners.clear();
    }

    fn error_listeners(&self) -> &[Rc<dyn ErrorListener>] {
        &self.base().listeners
    }

    /// A listener forwarding to every registered listener.
    fn error_listener_dispatch(&self) -> ProxyErrorListener {
        ProxyErrorListener::new(self.base().listeners.clone())
    }

    /// Maps token names to token types.
    fn token_type_map(&self) -> Arc<HashMap<String, isize>> {
        self.base()
            .cache
            .token_type_map(self.vocabulary(), self.atn().max_token_type)
    }

    /// Maps rule names to rule indices.
    fn rule_index_map(&self) -> Arc<HashMap<String, usize>> {
        self.base().cache.rule_index_map(self.rule_names())
    }

    /// The token type named `token_name`, or [`TOKEN_INVALID_TYPE`] if there's none.
    fn token_type(&self, token_name: &str) -> isize {
        self.token_type_map()
            .get(token_name)
            .copied()
            .unwrap_or(TOKEN_INVALID_TYPE)
    }

    /// The symbols that could follow the current state in context `ctx`.
    fn expected_tokens(&self, ctx: Option<ContextNode<'_>>) -> Result<IntervalSet, RecognizerError> {
        let state = self.state().ok_or(RecognizerError::NoState)?;

        Ok(self.atn().expected_tokens(state, ctx)?)
    }

    /// Checks whether `symbol` could follow the current state in context `ctx`.
    fn is_expected_token(
        &self,
        ctx: Option<ContextNode<'_>>,
        symbol: isize,
    ) -> Result<bool, RecognizerError> {
        let state = self.state().ok_or(RecognizerError::NoState)?;

        Ok(self.atn().is_expected_token(state, ctx, symbol)?)
    }

    /// The position prefix of an error message about `token`.
    fn error_header(&self, token: &dyn Token) -> String {
        format!("line {}:{}", token.line(), token.column())
    }

    /// How `token` is shown in error messages.
    fn token_error_display(&self, token: Option<&dyn Token>) -> String {
        let Some(token) = token else {
            return "<no token>".to_owned();
        };

        match token.text() {
            Some(text) => escape_whitespace(text),
            None if token.token_type() == TOKEN_EOF => "<EOF>".to_owned(),
            None => format!("<{}>", token.token_type()),
        }
    }
}

/// The semantic hooks of a grammar: predicates and actions.
pub trait SemanticHooks {
    fn sempred(&mut self, ctx: Option<ContextId>, rule_index: usize, pred_index: usize) -> bool;

    fn precpred(&mut self, ctx: Option<ContextId>, precedence: isize) -> bool;

    fn action(&mut self, ctx: Option<ContextId>, rule_index: usize, action_index: usize);
}

/// Hooks for grammars without predicates or actions.
///
/// Calling any hook means the grammar has predicates or actions after all, so every hook panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSemantics;

impl SemanticHooks for NoSemantics {
    fn sempred(&mut self, _ctx: Option<ContextId>, rule_index: usize, pred_index: usize) -> bool {
        panic!("the grammar has no semantic predicates, but predicate {rule_index}:{pred_index} was evaluated");
    }

    fn precpred(&mut self, _ctx: Option<ContextId>, precedence: isize) -> bool {
        panic!("the grammar has no precedence predicates, but one with precedence {precedence} was evaluated");
    }

    fn action(&mut self, _ctx: Option<ContextId>, rule_index: usize, action_index: usize) {
        panic!("the grammar has no actions, but action {rule_index}:{action_index} was run");
    }
}

/// A recognizer over an ATN that was loaded at runtime rather than generated.
///
/// Since it wasn't generated, it doesn't know its serialized ATN.
#[derive(Debug)]
pub struct InterpreterRecognizer<S, H, I = ()> {
    base: RecognizerBase<I>,
    grammar_file_name: String,
    atn: Arc<Atn>,
    vocabulary: Arc<Vocabulary>,
    rule_names: Arc<[String]>,
    input: S,
    hooks: H,
    token_factory: CommonTokenFactory,
}

impl<S: IntStream, H: SemanticHooks, I> InterpreterRecognizer<S, H, I> {
    pub fn new(
        grammar_file_name: impl Into<String>,
        atn: Arc<Atn>,
        vocabulary: Arc<Vocabulary>,
        rule_names: Arc<[String]>,
        input: S,
        hooks: H,
    ) -> Self {
        Self {
            base: RecognizerBase::new(),
            grammar_file_name: grammar_file_name.into(),
            atn,
            vocabulary,
            rule_names,
            input,
            hooks,
            token_factory: CommonTokenFactory,
        }
    }

    /// Uses a lookup cache shared with other recognizers.
    pub fn with_cache(mut self, cache: Arc<LookupCache>) -> Self {
        self.base.cache = cache;

        self
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn into_input(self) -> S {
        self.input
    }
}

impl<S: IntStream, H: SemanticHooks, I> Recognizer for InterpreterRecognizer<S, H, I> {
    type Interpreter = I;
    type Input = S;
    type TokenFactory = CommonTokenFactory;

    fn base(&self) -> &RecognizerBase<I> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecognizerBase<I> {
        &mut self.base
    }

    fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    fn rule_names(&self) -> &Arc<[String]> {
        &self.rule_names
    }

    fn serialized_atn(&self) -> Result<&str, RecognizerError> {
        Err(RecognizerError::Unsupported("serialized ATN of an interpreted grammar"))
    }

    fn grammar_file_name(&self) -> &str {
        &self.grammar_file_name
    }

    fn atn(&self) -> &Atn {
        &self.atn
    }

    fn sempred(&mut self, ctx: Option<ContextId>, rule_index: usize, pred_index: usize) -> bool {
        self.hooks.sempred(ctx, rule_index, pred_index)
    }

    fn precpred(&mut self, ctx: Option<ContextId>, precedence: isize) -> bool {
        self.hooks.precpred(ctx, precedence)
    }

    fn action(&mut self, ctx: Option<ContextId>, rule_index: usize, action_index: usize) {
        self.hooks.action(ctx, rule_index, action_index);
    }

    fn input_stream(&mut self) -> &mut S {
        &mut self.input
    }

    fn token_factory(&self) -> &CommonTokenFactory {
        &self.token_factory
    }
}
