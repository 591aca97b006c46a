//! Token names of a grammar.

use std::borrow::Cow;

use crate::token::TOKEN_EOF;

/// Maps token types to the names a grammar gives them.
///
/// A token type may have a literal name (`'while'`), a symbolic name (`WHILE`) and a display
/// name used in diagnostics. Missing entries are `None`.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    literal_names: Vec<Option<String>>,
    symbolic_names: Vec<Option<String>>,
    display_names: Vec<Option<String>>,
    max_token_type: isize,
}

impl Vocabulary {
    pub fn new(
        literal_names: Vec<Option<String>>,
        symbolic_names: Vec<Option<String>>,
        display_names: Vec<Option<String>>,
    ) -> Self {
        let len = literal_names
            .len()
            .max(symbolic_names.len())
            .max(display_names.len());

        Self {
            literal_names,
            symbolic_names,
            display_names,
            max_token_type: len as isize - 1,
        }
    }

    /// Builds a vocabulary from a legacy token-name table.
    ///
    /// Names quoted with `'` become literal names, names starting with an uppercase letter become
    /// symbolic names. Every name is kept as the display name.
    pub fn from_token_names<S: AsRef<str>>(token_names: &[Option<S>]) -> Self {
        let mut literal_names = vec![None; token_names.len()];
        let mut symbolic_names = vec![None; token_names.len()];
        let mut display_names = vec![None; token_names.len()];

        for (idx, name) in token_names.iter().enumerate() {
            let Some(name) = name.as_ref().map(AsRef::as_ref) else {
                continue;
            };

            if name.starts_with('\'') {
                literal_names[idx] = Some(name.to_owned());
            } else if name.starts_with(|c: char| c.is_uppercase()) {
                symbolic_names[idx] = Some(name.to_owned());
            }

            display_names[idx] = Some(name.to_owned());
        }

        Self::new(literal_names, symbolic_names, display_names)
    }

    /// The largest token type with a name.
    pub fn max_token_type(&self) -> isize {
        self.max_token_type
    }

    fn lookup(names: &[Option<String>], token_type: isize) -> Option<&str> {
        usize::try_from(token_type)
            .ok()
            .and_then(|idx| names.get(idx))
            .and_then(Option::as_deref)
    }

    pub fn literal_name(&self, token_type: isize) -> Option<&str> {
        Self::lookup(&self.literal_names, token_type)
    }

    pub fn symbolic_name(&self, token_type: isize) -> Option<&str> {
        if token_type == TOKEN_EOF {
            return Some("EOF");
        }

        Self::lookup(&self.symbolic_names, token_type)
    }

    /// The name to show for `token_type` in diagnostics.
    ///
    /// Falls back to the literal name, then the symbolic name, then the number itself.
    pub fn display_name(&self, token_type: isize) -> Cow<'_, str> {
        Self::lookup(&self.display_names, token_type)
            .or_else(|| self.literal_name(token_type))
            .or_else(|| self.symbolic_name(token_type))
            .map(Cow::Borrowed)
            .unwrap_or_else(|| Cow::Owned(token_type.to_string()))
    }
}
