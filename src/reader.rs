//! Token readers.
//!
//! A [`BaseTypeReader`] is a forward-only cursor over a token stream. This module
//! provides the trait, readers over in-memory tokens ([`TokenReader`]) and value trees
//! ([`ValueReader`]), and adapters that narrow a reader to one subtree
//! ([`ChildReader`], [`ScopeReader`]) or let it look ahead ([`Peekable`]).
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{base, read_value, BaseTypeReader, ValueReader};
//!
//! let tree = base!({"a": 1, "b": [true, null]});
//! let mut reader = ValueReader::new(tree.clone()).unwrap();
//! assert_eq!(read_value(&mut reader).unwrap(), Some(tree));
//! assert_eq!(reader.next_token().unwrap(), None);
//! ```

use crate::{
    BaseValue, Dictionary, Error, Framing, PackableHeader, PackedState, Pair, Result,
    StreamOptions, Token,
};

/// A forward-only source of tokens.
///
/// `next_token` returns `Ok(None)` once the stream is exhausted. After `close` every
/// call fails with [`Error::Closed`]; closing twice is harmless.
pub trait BaseTypeReader {
    fn next_token(&mut self) -> Result<Option<Token>>;

    fn close(&mut self);

    /// Wraps this reader so the next token can be inspected without consuming it.
    fn peekable(self) -> Peekable<Self>
    where
        Self: Sized,
    {
        Peekable::new(self)
    }
}

impl<R: BaseTypeReader + ?Sized> BaseTypeReader for &mut R {
    fn next_token(&mut self) -> Result<Option<Token>> {
        (**self).next_token()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<R: BaseTypeReader + ?Sized> BaseTypeReader for Box<R> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        (**self).next_token()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Adapts any iterator of `Result<Token>` into a reader, validating framing as
/// tokens pass through.
///
/// # Examples
///
/// ```rust
/// use basetypes::{BaseTypeReader, BaseValue, Error, Token, TokenReader};
///
/// let mut reader = TokenReader::from_tokens(vec![
///     Token::ListStart,
///     Token::Value(BaseValue::Int(1)),
/// ]);
/// assert_eq!(reader.next_token().unwrap(), Some(Token::ListStart));
/// assert!(reader.next_token().unwrap().is_some());
/// assert!(matches!(reader.next_token(), Err(Error::Framing { .. })));
/// ```
pub struct TokenReader<I> {
    tokens: I,
    framing: Framing,
    options: StreamOptions,
    closed: bool,
}

type Oks<I> = std::iter::Map<I, fn(Token) -> Result<Token>>;

impl<T> TokenReader<Oks<T>>
where
    T: Iterator<Item = Token>,
{
    /// Reads from plain tokens.
    pub fn from_tokens<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = Token, IntoIter = T>,
    {
        TokenReader::new(tokens.into_iter().map(Ok as fn(Token) -> Result<Token>))
    }
}

impl<I> TokenReader<I>
where
    I: Iterator<Item = Result<Token>>,
{
    pub fn new(tokens: I) -> Self {
        Self::with_options(tokens, StreamOptions::default())
    }

    pub fn with_options(tokens: I, options: StreamOptions) -> Self {
        TokenReader {
            tokens,
            framing: Framing::with_options(&options),
            options,
            closed: false,
        }
    }

    /// Number of scopes currently open in the stream.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.framing.depth()
    }
}

impl<I> BaseTypeReader for TokenReader<I>
where
    I: Iterator<Item = Result<Token>>,
{
    fn next_token(&mut self) -> Result<Option<Token>> {
        if self.closed {
            return Err(Error::Closed("token reader"));
        }
        match self.tokens.next() {
            Some(Ok(token)) => {
                self.framing.accept(&token)?;
                if let Token::Value(value) = &token {
                    self.options.check_storage(value);
                }
                tracing::trace!(%token, depth = self.framing.depth(), "read token");
                Ok(Some(token))
            }
            Some(Err(err)) => Err(err),
            None => {
                self.framing.finish()?;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// A reader that can look one token ahead.
///
/// `peek` caches whatever the next read produced, including an error, and the
/// following `next_token` returns that cached result.
///
/// # Examples
///
/// ```rust
/// use basetypes::{base, BaseTypeReader, Token, ValueReader};
///
/// let mut reader = ValueReader::new(base!([1])).unwrap().peekable();
/// assert_eq!(reader.peek().unwrap(), Some(&Token::ListStart));
/// assert_eq!(reader.next_token().unwrap(), Some(Token::ListStart));
/// ```
pub struct Peekable<R> {
    inner: R,
    peeked: Option<Result<Option<Token>>>,
    closed: bool,
}

impl<R: BaseTypeReader> Peekable<R> {
    pub fn new(inner: R) -> Self {
        Peekable {
            inner,
            peeked: None,
            closed: false,
        }
    }

    pub fn peek(&mut self) -> Result<Option<&Token>> {
        if self.closed {
            return Err(Error::Closed("peekable reader"));
        }
        if self.peeked.is_none() {
            self.peeked = Some(self.inner.next_token());
        }
        match &self.peeked {
            Some(Ok(token)) => Ok(token.as_ref()),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(None),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BaseTypeReader> BaseTypeReader for Peekable<R> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        if self.closed {
            return Err(Error::Closed("peekable reader"));
        }
        match self.peeked.take() {
            Some(result) => result,
            None => self.inner.next_token(),
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.peeked = None;
        self.inner.close();
    }
}

/// Reads exactly one subtree: a first token already taken from `parent`, plus
/// whatever `parent` tokens complete it.
///
/// A scope start reads through its matching `End`; a pair start reads until the
/// pair's value is complete; a plain value is the whole subtree, so the parent is
/// never touched.
pub struct ChildReader<'a, R: ?Sized> {
    first: Option<Token>,
    parent: &'a mut R,
    depth: usize,
    pending_pair: bool,
    done: bool,
    closed: bool,
}

impl<'a, R: BaseTypeReader + ?Sized> ChildReader<'a, R> {
    pub fn new(first: Token, parent: &'a mut R) -> Self {
        ChildReader {
            first: Some(first),
            parent,
            depth: 0,
            pending_pair: false,
            done: false,
            closed: false,
        }
    }

    fn track(&mut self, token: &Token) {
        match token {
            Token::PairStart(_) => self.pending_pair = true,
            Token::End => self.depth = self.depth.saturating_sub(1),
            other => {
                if other.opens_scope() {
                    self.depth += 1;
                }
                self.pending_pair = false;
            }
        }
        self.done = self.depth == 0 && !self.pending_pair;
    }

    /// Consumes the rest of the subtree so `parent` is positioned after it.
    pub fn drain(&mut self) -> Result<()> {
        while self.next_token()?.is_some() {}
        Ok(())
    }
}

impl<R: BaseTypeReader + ?Sized> BaseTypeReader for ChildReader<'_, R> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        if self.closed {
            return Err(Error::Closed("child reader"));
        }
        if let Some(token) = self.first.take() {
            self.track(&token);
            return Ok(Some(token));
        }
        if self.done {
            return Ok(None);
        }
        match self.parent.next_token()? {
            Some(token) => {
                self.track(&token);
                Ok(Some(token))
            }
            None => Err(Error::framing(self.depth, "stream ended inside a subtree")),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Reads the members of a scope whose start token has already been consumed.
///
/// The closing `End` is consumed from the parent but not returned; the scope simply
/// ends. Used to hand a packable exactly its property tokens.
pub struct ScopeReader<'a, R: ?Sized> {
    parent: &'a mut R,
    depth: usize,
    finished: bool,
    closed: bool,
}

impl<'a, R: BaseTypeReader + ?Sized> ScopeReader<'a, R> {
    pub fn new(parent: &'a mut R) -> Self {
        ScopeReader {
            parent,
            depth: 0,
            finished: false,
            closed: false,
        }
    }

    /// Skips any unread members and the scope's `End`.
    pub fn drain(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed("scope reader"));
        }
        while self.next_token()?.is_some() {}
        Ok(())
    }
}

impl<R: BaseTypeReader + ?Sized> BaseTypeReader for ScopeReader<'_, R> {
    fn next_token(&mut self) -> Result<Option<Token>> {
        if self.closed {
            return Err(Error::Closed("scope reader"));
        }
        if self.finished {
            return Ok(None);
        }
        let token = self
            .parent
            .next_token()?
            .ok_or_else(|| Error::framing(self.depth + 1, "stream ended inside a scope"))?;
        match &token {
            Token::End if self.depth == 0 => {
                self.finished = true;
                return Ok(None);
            }
            Token::End => self.depth -= 1,
            other if other.opens_scope() => self.depth += 1,
            _ => {}
        }
        Ok(Some(token))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

enum Frame {
    List(std::vec::IntoIter<BaseValue>),
    Entries(indexmap::map::IntoIter<String, BaseValue>),
}

/// Streams the tokens of a value tree lazily.
///
/// The root must be a list, dictionary, packable or pair; a lone scalar has no legal
/// position in a stream.
pub struct ValueReader {
    next: Option<BaseValue>,
    stack: Vec<Frame>,
    closed: bool,
}

impl ValueReader {
    pub fn new(root: BaseValue) -> Result<Self> {
        if root.is_scalar() {
            return Err(Error::framing(
                0,
                format!("{} outside any scope and without a pair name", root.id()),
            ));
        }
        Ok(ValueReader {
            next: Some(root),
            stack: Vec::new(),
            closed: false,
        })
    }

    fn open(&mut self, value: BaseValue) -> Token {
        match value {
            BaseValue::List(items) => {
                self.stack.push(Frame::List(items.into_iter()));
                Token::ListStart
            }
            BaseValue::Dictionary(dict) => {
                self.stack.push(Frame::Entries(dict.into_iter()));
                Token::DictionaryStart
            }
            BaseValue::Packable(state) => {
                let (header, properties) = state.into_parts();
                self.stack.push(Frame::Entries(properties.into_iter()));
                Token::PackableStart(header)
            }
            BaseValue::Pair(pair) => {
                let (name, value) = pair.into_parts();
                self.next = Some(value);
                Token::PairStart(name)
            }
            scalar => Token::Value(scalar),
        }
    }
}

impl BaseTypeReader for ValueReader {
    fn next_token(&mut self) -> Result<Option<Token>> {
        if self.closed {
            return Err(Error::Closed("value reader"));
        }
        if let Some(value) = self.next.take() {
            return Ok(Some(self.open(value)));
        }
        let member = match self.stack.last_mut() {
            None => return Ok(None),
            Some(Frame::List(items)) => items.next().map(|item| (None, item)),
            Some(Frame::Entries(entries)) => entries.next().map(|(name, item)| (Some(name), item)),
        };
        let token = match member {
            Some((Some(name), value)) => {
                self.next = Some(value);
                Token::PairStart(name)
            }
            Some((None, value)) => self.open(value),
            None => {
                self.stack.pop();
                Token::End
            }
        };
        tracing::trace!(%token, depth = self.stack.len(), "read token");
        Ok(Some(token))
    }

    fn close(&mut self) {
        self.closed = true;
        self.next = None;
        self.stack.clear();
    }
}

fn next_required<R: BaseTypeReader + ?Sized>(reader: &mut R, depth: usize) -> Result<Token> {
    reader
        .next_token()?
        .ok_or_else(|| Error::framing(depth, "stream ended before the value was complete"))
}

fn value_from<R: BaseTypeReader + ?Sized>(first: Token, reader: &mut R, depth: usize) -> Result<BaseValue> {
    match first {
        Token::Value(value) => Ok(value),
        Token::PairStart(name) => {
            let token = next_required(reader, depth)?;
            let value = value_from(token, reader, depth)?;
            Ok(BaseValue::from(Pair::new(name, value)?))
        }
        Token::ListStart => {
            let mut items = Vec::new();
            loop {
                match next_required(reader, depth + 1)? {
                    Token::End => break,
                    token => items.push(value_from(token, reader, depth + 1)?),
                }
            }
            Ok(BaseValue::List(items))
        }
        Token::DictionaryStart => Ok(BaseValue::Dictionary(entries_from(reader, depth + 1)?)),
        Token::PackableStart(header) => {
            let properties = entries_from(reader, depth + 1)?;
            Ok(BaseValue::Packable(PackedState::from_parts(header, properties)))
        }
        Token::End => Err(Error::framing(depth, "end without an open scope")),
    }
}

fn entries_from<R: BaseTypeReader + ?Sized>(reader: &mut R, depth: usize) -> Result<Dictionary> {
    let mut entries = Dictionary::new();
    loop {
        match next_required(reader, depth)? {
            Token::End => return Ok(entries),
            Token::PairStart(name) => {
                let token = next_required(reader, depth)?;
                let value = value_from(token, reader, depth)?;
                entries.insert(name, value)?;
            }
            other => {
                return Err(Error::key(format!("expected a pair, found {}", other.id())));
            }
        }
    }
}

/// Reads one complete value, `None` if the stream is already exhausted.
pub fn read_value<R: BaseTypeReader + ?Sized>(reader: &mut R) -> Result<Option<BaseValue>> {
    match reader.next_token()? {
        Some(first) => value_from(first, reader, 0).map(Some),
        None => Ok(None),
    }
}

/// Reads a pair start and its value as `(name, value)`, `None` at the end of the
/// stream or scope.
///
/// # Examples
///
/// ```rust
/// use basetypes::{read_pair, BaseValue, Token, TokenReader};
///
/// let mut reader = TokenReader::from_tokens(vec![
///     Token::PairStart("answer".into()),
///     Token::Value(BaseValue::Int(42)),
/// ]);
/// let (name, value) = read_pair(&mut reader).unwrap().unwrap();
/// assert_eq!(name, "answer");
/// assert_eq!(value, BaseValue::Int(42));
/// ```
pub fn read_pair<R: BaseTypeReader + ?Sized>(reader: &mut R) -> Result<Option<(String, BaseValue)>> {
    match reader.next_token()? {
        Some(Token::PairStart(name)) => {
            let token = next_required(reader, 0)?;
            Ok(Some((name, value_from(token, reader, 0)?)))
        }
        Some(other) => Err(Error::key(format!("expected a pair, found {}", other.id()))),
        None => Ok(None),
    }
}

/// Reads a packable start token and returns its header.
pub(crate) fn read_packable_header<R: BaseTypeReader + ?Sized>(reader: &mut R) -> Result<PackableHeader> {
    match reader.next_token()? {
        Some(Token::PackableStart(header)) => Ok(header),
        Some(other) => Err(Error::type_mismatch(crate::BaseTypeId::Packable, other.id())),
        None => Err(Error::framing(0, "expected a packable, found the end of the stream")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base;

    fn int(i: i64) -> Token {
        Token::Value(BaseValue::Int(i))
    }

    fn collect<R: BaseTypeReader>(mut reader: R) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = reader.next_token().unwrap() {
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_value_reader_tokens() {
        let tokens = collect(ValueReader::new(base!({"a": 1, "b": [2]})).unwrap());
        assert_eq!(
            tokens,
            vec![
                Token::DictionaryStart,
                Token::PairStart("a".into()),
                int(1),
                Token::PairStart("b".into()),
                Token::ListStart,
                int(2),
                Token::End,
                Token::End,
            ]
        );
    }

    #[test]
    fn test_value_reader_rejects_scalar_root() {
        assert!(matches!(ValueReader::new(BaseValue::Int(1)), Err(Error::Framing { .. })));
    }

    #[test]
    fn test_value_reader_pair_root() {
        let pair = BaseValue::from(Pair::new("p", base!([1])).unwrap());
        let tokens = collect(ValueReader::new(pair).unwrap());
        assert_eq!(
            tokens,
            vec![Token::PairStart("p".into()), Token::ListStart, int(1), Token::End]
        );
    }

    #[test]
    fn test_token_reader_reports_unclosed_scope() {
        let mut reader = TokenReader::from_tokens(vec![Token::ListStart]);
        reader.next_token().unwrap();
        assert!(matches!(reader.next_token(), Err(Error::Framing { depth: 1, .. })));
    }

    #[test]
    fn test_token_reader_passes_errors_through() {
        let mut reader = TokenReader::new(vec![Ok(Token::ListStart), Err(Error::custom("io"))].into_iter());
        reader.next_token().unwrap();
        assert_eq!(reader.next_token(), Err(Error::custom("io")));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut reader = TokenReader::from_tokens(vec![Token::ListStart, Token::End]);
        reader.close();
        reader.close();
        assert_eq!(reader.next_token(), Err(Error::Closed("token reader")));
    }

    #[test]
    fn test_peek_caches_errors() {
        let mut reader = TokenReader::from_tokens(vec![Token::End]).peekable();
        assert!(reader.peek().is_err());
        assert!(matches!(reader.next_token(), Err(Error::Framing { .. })));
    }

    #[test]
    fn test_child_reader_scope() {
        let mut parent = TokenReader::from_tokens(vec![
            Token::ListStart,
            Token::ListStart,
            int(1),
            Token::End,
            int(2),
            Token::End,
        ]);
        parent.next_token().unwrap();
        let first = parent.next_token().unwrap().unwrap();

        let child = collect(ChildReader::new(first, &mut parent));
        assert_eq!(child, vec![Token::ListStart, int(1), Token::End]);
        assert_eq!(parent.next_token().unwrap(), Some(int(2)));
    }

    #[test]
    fn test_child_reader_plain_value_leaves_parent() {
        let mut parent = TokenReader::from_tokens(vec![Token::ListStart, int(1), int(2), Token::End]);
        parent.next_token().unwrap();
        let first = parent.next_token().unwrap().unwrap();

        let child = collect(ChildReader::new(first, &mut parent));
        assert_eq!(child, vec![int(1)]);
        assert_eq!(parent.next_token().unwrap(), Some(int(2)));
    }

    #[test]
    fn test_child_reader_pair() {
        let mut parent = TokenReader::from_tokens(vec![
            Token::DictionaryStart,
            Token::PairStart("a".into()),
            Token::ListStart,
            int(1),
            Token::End,
            Token::PairStart("b".into()),
            int(2),
            Token::End,
        ]);
        parent.next_token().unwrap();
        let first = parent.next_token().unwrap().unwrap();

        let mut child = ChildReader::new(first, &mut parent);
        assert_eq!(read_pair(&mut child).unwrap(), Some(("a".to_string(), base!([1]))));
        assert_eq!(child.next_token().unwrap(), None);
        assert_eq!(parent.next_token().unwrap(), Some(Token::PairStart("b".into())));
    }

    #[test]
    fn test_scope_reader_hides_end() {
        let mut parent = TokenReader::from_tokens(vec![
            Token::DictionaryStart,
            Token::PairStart("a".into()),
            Token::DictionaryStart,
            Token::End,
            Token::End,
            Token::ListStart,
            Token::End,
        ]);
        parent.next_token().unwrap();

        let members = collect(ScopeReader::new(&mut parent));
        assert_eq!(
            members,
            vec![Token::PairStart("a".into()), Token::DictionaryStart, Token::End]
        );
        assert_eq!(parent.next_token().unwrap(), Some(Token::ListStart));
    }

    #[test]
    fn test_read_value_rejects_stray_members() {
        let mut reader = TokenReader::from_tokens(vec![Token::DictionaryStart, int(1), Token::End]);
        assert!(matches!(read_value(&mut reader), Err(Error::Key(_))));
    }
}
