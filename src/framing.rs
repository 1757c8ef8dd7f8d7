//! The start/end framing state machine shared by every reader and writer.
//!
//! [`Framing`] owns a stack of open scopes and a pending-pair flag. Each token is
//! checked against the current state before anything changes, so a rejected token
//! leaves the machine exactly as it was.
//!
//! | state | accepts |
//! |---|---|
//! | top level, no pending pair | scope starts, pair starts |
//! | pending pair | one value or scope start |
//! | inside a list | values, scope starts, pair starts, `End` |
//! | inside a dictionary or packable | pair starts with unused names, `End` |

use crate::{BaseTypeId, Error, Result, StreamOptions, Token};
use indexmap::IndexSet;

#[derive(Clone, Debug)]
enum Scope {
    List,
    Keyed {
        kind: BaseTypeId,
        names: IndexSet<String>,
    },
}

impl Scope {
    fn id(&self) -> BaseTypeId {
        match self {
            Scope::List => BaseTypeId::List,
            Scope::Keyed { kind, .. } => *kind,
        }
    }
}

/// A framing position recorded by [`Framing::mark`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mark {
    depth: usize,
    names: usize,
    pending_pair: bool,
}

impl Mark {
    /// Number of scopes that were open when the mark was taken.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Tracks open scopes and pending pairs for one token stream.
///
/// # Examples
///
/// ```rust
/// use basetypes::{BaseValue, Framing, Token};
///
/// let mut framing = Framing::new();
/// framing.accept(&Token::DictionaryStart).unwrap();
/// framing.accept(&Token::PairStart("a".into())).unwrap();
/// assert!(framing.pending_pair());
///
/// framing.accept(&Token::Value(BaseValue::Int(1))).unwrap();
/// assert!(framing.accept(&Token::PairStart("a".into())).is_err());
///
/// framing.accept(&Token::End).unwrap();
/// assert!(framing.finish().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct Framing {
    stack: Vec<Scope>,
    pending_pair: bool,
    max_depth: usize,
}

impl Default for Framing {
    fn default() -> Self {
        Self::new()
    }
}

impl Framing {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(&StreamOptions::default())
    }

    #[must_use]
    pub fn with_options(options: &StreamOptions) -> Self {
        Framing {
            stack: Vec::new(),
            pending_pair: false,
            max_depth: options.max_depth,
        }
    }

    /// Number of open scopes.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// `true` between a pair start and the start of its value.
    #[must_use]
    pub fn pending_pair(&self) -> bool {
        self.pending_pair
    }

    /// The innermost open scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<BaseTypeId> {
        self.stack.last().map(Scope::id)
    }

    /// `true` when every scope is closed and no pair is waiting for its value.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.stack.is_empty() && !self.pending_pair
    }

    /// Checks `token` against the current state without changing it.
    pub fn check(&self, token: &Token) -> Result<()> {
        let depth = self.depth();
        match token {
            Token::Value(value) => {
                if !value.is_scalar() {
                    return Err(Error::type_mismatch("a single-token value", value.id()));
                }
                self.check_value_position(value.id())
            }
            Token::ListStart | Token::DictionaryStart | Token::PackableStart(_) => {
                if depth >= self.max_depth {
                    return Err(Error::framing(
                        depth,
                        format!("nesting exceeds the limit of {}", self.max_depth),
                    ));
                }
                if self.pending_pair || self.stack.is_empty() {
                    return Ok(());
                }
                self.check_value_position(token.id())
            }
            Token::PairStart(name) => {
                if self.pending_pair {
                    return Err(Error::framing(depth, "pair started before the previous pair's value"));
                }
                if name.is_empty() {
                    return Err(Error::key("pair name must not be empty"));
                }
                match self.stack.last() {
                    Some(Scope::Keyed { kind, names }) if names.contains(name) => Err(Error::key(
                        format!("duplicate name '{}' in {}", name, kind),
                    )),
                    _ => Ok(()),
                }
            }
            Token::End => {
                if self.pending_pair {
                    return Err(Error::framing(depth, "end while a pair value is pending"));
                }
                if self.stack.is_empty() {
                    return Err(Error::framing(depth, "end without an open scope"));
                }
                Ok(())
            }
        }
    }

    fn check_value_position(&self, id: BaseTypeId) -> Result<()> {
        if self.pending_pair {
            return Ok(());
        }
        match self.stack.last() {
            None => Err(Error::framing(
                0,
                format!("{} outside any scope and without a pair name", id),
            )),
            Some(Scope::List) => Ok(()),
            Some(Scope::Keyed { kind, .. }) => Err(Error::key(format!(
                "{} in a {} must be named by a pair",
                id, kind
            ))),
        }
    }

    /// Checks `token` and, if it is allowed, applies it.
    pub fn accept(&mut self, token: &Token) -> Result<()> {
        if let Err(err) = self.check(token) {
            tracing::warn!(token = %token.id(), depth = self.depth(), error = %err, "rejected token");
            return Err(err);
        }

        match token {
            Token::Value(_) => self.pending_pair = false,
            Token::PairStart(name) => {
                if let Some(Scope::Keyed { names, .. }) = self.stack.last_mut() {
                    names.insert(name.clone());
                }
                self.pending_pair = true;
            }
            Token::ListStart => self.open(Scope::List),
            Token::DictionaryStart => self.open(Scope::Keyed {
                kind: BaseTypeId::Dictionary,
                names: IndexSet::new(),
            }),
            Token::PackableStart(_) => self.open(Scope::Keyed {
                kind: BaseTypeId::Packable,
                names: IndexSet::new(),
            }),
            Token::End => {
                if let Some(scope) = self.stack.pop() {
                    tracing::debug!(kind = %scope.id(), depth = self.depth(), "scope closed");
                }
            }
        }
        Ok(())
    }

    /// Records the current position for [`rewind`](Framing::rewind).
    #[must_use]
    pub fn mark(&self) -> Mark {
        let names = match self.stack.last() {
            Some(Scope::Keyed { names, .. }) => names.len(),
            _ => 0,
        };
        Mark {
            depth: self.depth(),
            names,
            pending_pair: self.pending_pair,
        }
    }

    /// Returns to `mark`, forgetting scopes opened and names used since.
    ///
    /// Only tokens that kept every scope from before the mark open can be undone.
    pub fn rewind(&mut self, mark: Mark) {
        self.stack.truncate(mark.depth);
        if let Some(Scope::Keyed { names, .. }) = self.stack.last_mut() {
            names.truncate(mark.names);
        }
        self.pending_pair = mark.pending_pair;
        tracing::debug!(depth = mark.depth, "framing rewound");
    }

    fn open(&mut self, scope: Scope) {
        self.pending_pair = false;
        tracing::debug!(kind = %scope.id(), depth = self.depth() + 1, "scope opened");
        self.stack.push(scope);
    }

    /// Fails if the stream stopped with scopes open or a pair value missing.
    pub fn finish(&self) -> Result<()> {
        if self.pending_pair {
            return Err(Error::framing(self.depth(), "stream ended while a pair value is pending"));
        }
        if let Some(scope) = self.stack.last() {
            return Err(Error::framing(
                self.depth(),
                format!("stream ended with {} still open", scope.id()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BaseValue, PackableHeader};

    fn int(i: i64) -> Token {
        Token::Value(BaseValue::Int(i))
    }

    fn pair(name: &str) -> Token {
        Token::PairStart(name.to_string())
    }

    #[test]
    fn test_top_level_value_rejected() {
        let mut framing = Framing::new();
        assert!(matches!(framing.accept(&int(1)), Err(Error::Framing { depth: 0, .. })));
        assert!(framing.is_balanced());
    }

    #[test]
    fn test_top_level_pair() {
        let mut framing = Framing::new();
        framing.accept(&pair("a")).unwrap();
        framing.accept(&int(1)).unwrap();
        assert!(framing.is_balanced());
    }

    #[test]
    fn test_second_pair_start_rejected() {
        let mut framing = Framing::new();
        framing.accept(&Token::DictionaryStart).unwrap();
        framing.accept(&pair("a")).unwrap();
        assert!(matches!(framing.accept(&pair("b")), Err(Error::Framing { .. })));
        assert!(framing.pending_pair());

        framing.accept(&int(1)).unwrap();
        framing.accept(&pair("b")).unwrap();
    }

    #[test]
    fn test_dictionary_requires_pairs() {
        let mut framing = Framing::new();
        framing.accept(&Token::DictionaryStart).unwrap();
        assert!(matches!(framing.accept(&int(1)), Err(Error::Key(_))));
        assert!(matches!(framing.accept(&Token::ListStart), Err(Error::Key(_))));
        assert!(matches!(framing.accept(&pair("")), Err(Error::Key(_))));
    }

    #[test]
    fn test_packable_names_are_unique() {
        let mut framing = Framing::new();
        let header = PackableHeader::new("thing").unwrap();
        framing.accept(&Token::PackableStart(header)).unwrap();
        framing.accept(&pair("x")).unwrap();
        framing.accept(&int(1)).unwrap();
        assert!(matches!(framing.accept(&pair("x")), Err(Error::Key(_))));
    }

    #[test]
    fn test_names_scoped_per_dictionary() {
        let mut framing = Framing::new();
        framing.accept(&Token::DictionaryStart).unwrap();
        framing.accept(&pair("a")).unwrap();
        framing.accept(&Token::DictionaryStart).unwrap();
        framing.accept(&pair("a")).unwrap();
        framing.accept(&int(1)).unwrap();
        framing.accept(&Token::End).unwrap();
        framing.accept(&pair("b")).unwrap();
        framing.accept(&int(2)).unwrap();
        framing.accept(&Token::End).unwrap();
        assert!(framing.finish().is_ok());
    }

    #[test]
    fn test_end_rules() {
        let mut framing = Framing::new();
        assert!(matches!(framing.accept(&Token::End), Err(Error::Framing { .. })));

        framing.accept(&Token::ListStart).unwrap();
        framing.accept(&pair("a")).unwrap();
        assert!(matches!(framing.accept(&Token::End), Err(Error::Framing { .. })));
        assert_eq!(framing.depth(), 1);
    }

    #[test]
    fn test_compound_value_token_rejected() {
        let mut framing = Framing::new();
        framing.accept(&Token::ListStart).unwrap();
        let compound = Token::Value(BaseValue::List(vec![]));
        assert!(matches!(framing.accept(&compound), Err(Error::Type { .. })));
    }

    #[test]
    fn test_max_depth() {
        let mut framing = Framing::with_options(&StreamOptions::new().with_max_depth(2));
        framing.accept(&Token::ListStart).unwrap();
        framing.accept(&Token::ListStart).unwrap();
        assert!(matches!(
            framing.accept(&Token::ListStart),
            Err(Error::Framing { depth: 2, .. })
        ));
    }

    #[test]
    fn test_finish_reports_open_scopes() {
        let mut framing = Framing::new();
        framing.accept(&Token::ListStart).unwrap();
        assert!(matches!(framing.finish(), Err(Error::Framing { depth: 1, .. })));
    }

    #[test]
    fn test_rewind_forgets_names_and_scopes() {
        let mut framing = Framing::new();
        framing.accept(&Token::DictionaryStart).unwrap();
        framing.accept(&pair("a")).unwrap();
        framing.accept(&int(1)).unwrap();

        let mark = framing.mark();
        framing.accept(&pair("b")).unwrap();
        framing.accept(&Token::ListStart).unwrap();
        framing.accept(&pair("c")).unwrap();
        framing.rewind(mark);

        assert_eq!(framing.depth(), 1);
        assert!(!framing.pending_pair());
        assert!(matches!(framing.accept(&pair("a")), Err(Error::Key(_))));
        framing.accept(&pair("b")).unwrap();
        framing.accept(&int(2)).unwrap();
        framing.accept(&Token::End).unwrap();
        assert!(framing.finish().is_ok());
    }
}
