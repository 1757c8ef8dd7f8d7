//! Token writers.
//!
//! [`BaseTypeWriter`] has one required method, `write_token`, and a provided
//! `write_*` method for every kind of token. Writers check framing when each method
//! is called, so a protocol violation fails at the offending call and leaves the
//! writer usable.
//!
//! Helpers that write several tokens, [`write_value`] and
//! [`pack_packable`](crate::pack_packable), take a [`Checkpoint`] first and rewind to
//! it when a later token fails. Writers that cannot take back emitted tokens return no
//! checkpoint; after a failed helper call such a writer must be discarded.
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{base, BaseTypeWriter, ValueWriter};
//!
//! let mut writer = ValueWriter::new();
//! writer.write_dictionary_start().unwrap();
//! writer.write_pair_start("name").unwrap();
//! writer.write_string_value("Alice").unwrap();
//! writer.write_pair_start("tags").unwrap();
//! writer.write_list_start().unwrap();
//! writer.write_int_value(1).unwrap();
//! writer.write_end().unwrap();
//! writer.write_end().unwrap();
//!
//! assert_eq!(writer.finish().unwrap(), vec![base!({"name": "Alice", "tags": [1]})]);
//! ```

use crate::framing::Mark;
use crate::{
    BaseValue, Color, Dictionary, Error, Framing, Geolocation, PackableHeader, PackedState, Pair,
    Predicate, Result, StreamOptions, Tag, Token, Urn,
};
use chrono::{DateTime, Utc};

/// A writer position that [`BaseTypeWriter::rewind`] can return to.
///
/// A checkpoint stays valid as long as every scope that was open when it was taken is
/// still open.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    framing: Mark,
    emitted: usize,
    members: usize,
    pending: Option<String>,
}

/// A sink for tokens that enforces start/end framing.
pub trait BaseTypeWriter {
    fn write_token(&mut self, token: Token) -> Result<()>;

    /// Releases the writer. Idempotent; later writes fail with [`Error::Closed`].
    fn close(&mut self);

    /// The current position, or `None` if this writer cannot take back tokens.
    fn checkpoint(&self) -> Option<Checkpoint> {
        None
    }

    /// Discards every token written since `checkpoint` was taken.
    fn rewind(&mut self, checkpoint: Checkpoint) {
        tracing::warn!(depth = checkpoint.framing.depth(), "writer cannot rewind");
    }

    fn write_null_value(&mut self) -> Result<()> {
        self.write_token(Token::Value(BaseValue::Null))
    }

    fn write_bool_value(&mut self, value: bool) -> Result<()> {
        self.write_token(Token::Value(BaseValue::Bool(value)))
    }

    fn write_int_value(&mut self, value: i64) -> Result<()> {
        self.write_token(Token::Value(BaseValue::Int(value)))
    }

    fn write_float_value(&mut self, value: f64) -> Result<()> {
        self.write_token(Token::Value(BaseValue::Float(value)))
    }

    fn write_datetime_value(&mut self, value: DateTime<Utc>) -> Result<()> {
        self.write_token(Token::Value(BaseValue::DateTime(value)))
    }

    fn write_string_value(&mut self, value: &str) -> Result<()> {
        self.write_token(Token::Value(BaseValue::String(value.to_string())))
    }

    fn write_urn_value(&mut self, value: Urn) -> Result<()> {
        self.write_token(Token::Value(BaseValue::Urn(value)))
    }

    fn write_tag_value(&mut self, value: Tag) -> Result<()> {
        self.write_token(Token::Value(BaseValue::Tag(value)))
    }

    fn write_blob_value(&mut self, value: &[u8]) -> Result<()> {
        self.write_token(Token::Value(BaseValue::Blob(value.to_vec())))
    }

    fn write_color_value(&mut self, value: Color) -> Result<()> {
        self.write_token(Token::Value(BaseValue::Color(value)))
    }

    fn write_geolocation_value(&mut self, value: Geolocation) -> Result<()> {
        self.write_token(Token::Value(BaseValue::Geolocation(value)))
    }

    fn write_predicate_value(&mut self, value: Predicate) -> Result<()> {
        self.write_token(Token::Value(BaseValue::from(value)))
    }

    fn write_pair_start(&mut self, name: &str) -> Result<()> {
        self.write_token(Token::PairStart(name.to_string()))
    }

    fn write_list_start(&mut self) -> Result<()> {
        self.write_token(Token::ListStart)
    }

    fn write_dictionary_start(&mut self) -> Result<()> {
        self.write_token(Token::DictionaryStart)
    }

    fn write_packable_start(&mut self, header: PackableHeader) -> Result<()> {
        self.write_token(Token::PackableStart(header))
    }

    fn write_end(&mut self) -> Result<()> {
        self.write_token(Token::End)
    }
}

impl<W: BaseTypeWriter + ?Sized> BaseTypeWriter for &mut W {
    fn write_token(&mut self, token: Token) -> Result<()> {
        (**self).write_token(token)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn checkpoint(&self) -> Option<Checkpoint> {
        (**self).checkpoint()
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        (**self).rewind(checkpoint)
    }
}

impl<W: BaseTypeWriter + ?Sized> BaseTypeWriter for Box<W> {
    fn write_token(&mut self, token: Token) -> Result<()> {
        (**self).write_token(token)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn checkpoint(&self) -> Option<Checkpoint> {
        (**self).checkpoint()
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        (**self).rewind(checkpoint)
    }
}

/// Writes one complete value: its scope start, members and `End` for collections
/// and packables, the name and value for a pair, a single token otherwise.
///
/// If a token is rejected partway, everything this call wrote is rewound, provided
/// the writer supports [checkpoints](BaseTypeWriter::checkpoint).
///
/// # Examples
///
/// ```rust
/// use basetypes::{base, write_value, Token, TokenWriter};
///
/// let mut writer = TokenWriter::new();
/// write_value(&mut writer, &base!([1, "two"])).unwrap();
/// let tokens = writer.finish().unwrap();
/// assert_eq!(tokens.first(), Some(&Token::ListStart));
/// assert_eq!(tokens.last(), Some(&Token::End));
/// ```
pub fn write_value<W: BaseTypeWriter + ?Sized>(writer: &mut W, value: &BaseValue) -> Result<()> {
    atomically(writer, |writer| emit_value(writer, value))
}

/// Runs `write`, rewinding the writer to where it started if `write` fails.
pub(crate) fn atomically<W, F>(writer: &mut W, write: F) -> Result<()>
where
    W: BaseTypeWriter + ?Sized,
    F: FnOnce(&mut W) -> Result<()>,
{
    let checkpoint = writer.checkpoint();
    let result = write(writer);
    if let (Err(err), Some(checkpoint)) = (&result, checkpoint) {
        tracing::debug!(error = %err, "rewinding partial write");
        writer.rewind(checkpoint);
    }
    result
}

fn emit_value<W: BaseTypeWriter + ?Sized>(writer: &mut W, value: &BaseValue) -> Result<()> {
    match value {
        BaseValue::List(items) => {
            writer.write_list_start()?;
            for item in items {
                emit_value(writer, item)?;
            }
            writer.write_end()
        }
        BaseValue::Dictionary(dict) => {
            writer.write_dictionary_start()?;
            write_entries(writer, dict)?;
            writer.write_end()
        }
        BaseValue::Packable(state) => {
            writer.write_packable_start(state.header().clone())?;
            write_entries(writer, state.properties())?;
            writer.write_end()
        }
        BaseValue::Pair(pair) => {
            writer.write_pair_start(pair.name())?;
            emit_value(writer, pair.value())
        }
        scalar => writer.write_token(Token::Value(scalar.clone())),
    }
}

pub(crate) fn write_entries<W: BaseTypeWriter + ?Sized>(writer: &mut W, entries: &Dictionary) -> Result<()> {
    for (name, value) in entries {
        writer.write_pair_start(name)?;
        emit_value(writer, value)?;
    }
    Ok(())
}

/// Records the token stream in memory.
///
/// # Examples
///
/// ```rust
/// use basetypes::{BaseTypeWriter, Error, TokenWriter};
///
/// let mut writer = TokenWriter::new();
/// assert!(matches!(writer.write_int_value(1), Err(Error::Framing { .. })));
///
/// writer.write_list_start().unwrap();
/// writer.write_int_value(1).unwrap();
/// assert!(writer.finish().is_err());
/// ```
#[derive(Debug, Default)]
pub struct TokenWriter {
    tokens: Vec<Token>,
    framing: Framing,
    options: StreamOptions,
    closed: bool,
}

impl TokenWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(StreamOptions::default())
    }

    #[must_use]
    pub fn with_options(options: StreamOptions) -> Self {
        TokenWriter {
            tokens: Vec::new(),
            framing: Framing::with_options(&options),
            options,
            closed: false,
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.framing.depth()
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Returns the recorded tokens without checking that every scope was closed.
    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Returns the recorded tokens, failing if a scope or pair is still open.
    pub fn finish(self) -> Result<Vec<Token>> {
        self.framing.finish()?;
        Ok(self.tokens)
    }
}

impl BaseTypeWriter for TokenWriter {
    fn write_token(&mut self, token: Token) -> Result<()> {
        if self.closed {
            return Err(Error::Closed("token writer"));
        }
        self.framing.accept(&token)?;
        if let Token::Value(value) = &token {
            self.options.check_storage(value);
        }
        tracing::trace!(%token, depth = self.framing.depth(), "wrote token");
        self.tokens.push(token);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn checkpoint(&self) -> Option<Checkpoint> {
        Some(Checkpoint {
            framing: self.framing.mark(),
            emitted: self.tokens.len(),
            members: 0,
            pending: None,
        })
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        self.framing.rewind(checkpoint.framing);
        self.tokens.truncate(checkpoint.emitted);
    }
}

#[derive(Debug)]
enum Building {
    List(Vec<BaseValue>),
    Dictionary(Dictionary),
    Packable(PackableHeader, Dictionary),
}

impl Building {
    fn len(&self) -> usize {
        match self {
            Building::List(items) => items.len(),
            Building::Dictionary(entries) | Building::Packable(_, entries) => entries.len(),
        }
    }

    fn truncate(&mut self, len: usize) {
        match self {
            Building::List(items) => items.truncate(len),
            Building::Dictionary(entries) | Building::Packable(_, entries) => entries.truncate(len),
        }
    }
}

#[derive(Debug)]
struct Frame {
    building: Building,
    pending: Option<String>,
}

/// Builds value trees from writer calls.
///
/// Each completed top-level value (a closed scope or a top-level pair) is collected
/// and returned by [`ValueWriter::finish`].
#[derive(Debug, Default)]
pub struct ValueWriter {
    framing: Framing,
    options: StreamOptions,
    stack: Vec<Frame>,
    top_pending: Option<String>,
    completed: Vec<BaseValue>,
    closed: bool,
}

impl ValueWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(StreamOptions::default())
    }

    #[must_use]
    pub fn with_options(options: StreamOptions) -> Self {
        ValueWriter {
            framing: Framing::with_options(&options),
            options,
            stack: Vec::new(),
            top_pending: None,
            completed: Vec::new(),
            closed: false,
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.framing.depth()
    }

    /// Returns every completed top-level value, failing if a scope or pair is
    /// still open.
    pub fn finish(self) -> Result<Vec<BaseValue>> {
        self.framing.finish()?;
        Ok(self.completed)
    }

    fn open(&mut self, building: Building) {
        self.stack.push(Frame {
            building,
            pending: None,
        });
    }

    fn attach(&mut self, value: BaseValue) -> Result<()> {
        let Some(frame) = self.stack.last_mut() else {
            let value = match self.top_pending.take() {
                Some(name) => BaseValue::from(Pair::new(name, value)?),
                None => value,
            };
            self.completed.push(value);
            return Ok(());
        };

        let pending = frame.pending.take();
        match &mut frame.building {
            Building::List(items) => {
                let value = match pending {
                    Some(name) => BaseValue::from(Pair::new(name, value)?),
                    None => value,
                };
                items.push(value);
                Ok(())
            }
            Building::Dictionary(entries) | Building::Packable(_, entries) => {
                let name = pending.ok_or_else(|| Error::key("keyed member without a pair name"))?;
                entries.insert(name, value)
            }
        }
    }
}

impl BaseTypeWriter for ValueWriter {
    fn write_token(&mut self, token: Token) -> Result<()> {
        if self.closed {
            return Err(Error::Closed("value writer"));
        }
        self.framing.accept(&token)?;
        tracing::trace!(%token, depth = self.framing.depth(), "wrote token");

        match token {
            Token::Value(value) => {
                self.options.check_storage(&value);
                self.attach(value)
            }
            Token::PairStart(name) => {
                match self.stack.last_mut() {
                    Some(frame) => frame.pending = Some(name),
                    None => self.top_pending = Some(name),
                }
                Ok(())
            }
            Token::ListStart => {
                self.open(Building::List(Vec::new()));
                Ok(())
            }
            Token::DictionaryStart => {
                self.open(Building::Dictionary(Dictionary::new()));
                Ok(())
            }
            Token::PackableStart(header) => {
                self.open(Building::Packable(header, Dictionary::new()));
                Ok(())
            }
            Token::End => {
                let frame = self
                    .stack
                    .pop()
                    .ok_or_else(|| Error::framing(0, "end without an open scope"))?;
                let value = match frame.building {
                    Building::List(items) => BaseValue::List(items),
                    Building::Dictionary(entries) => BaseValue::Dictionary(entries),
                    Building::Packable(header, properties) => {
                        BaseValue::Packable(PackedState::from_parts(header, properties))
                    }
                };
                self.attach(value)
            }
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn checkpoint(&self) -> Option<Checkpoint> {
        let (members, pending) = match self.stack.last() {
            Some(frame) => (frame.building.len(), frame.pending.clone()),
            None => (0, self.top_pending.clone()),
        };
        Some(Checkpoint {
            framing: self.framing.mark(),
            emitted: self.completed.len(),
            members,
            pending,
        })
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        self.framing.rewind(checkpoint.framing);
        self.stack.truncate(checkpoint.framing.depth());
        self.completed.truncate(checkpoint.emitted);
        match self.stack.last_mut() {
            Some(frame) => {
                frame.building.truncate(checkpoint.members);
                frame.pending = checkpoint.pending;
            }
            None => self.top_pending = checkpoint.pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base;

    #[test]
    fn test_rejected_call_leaves_writer_usable() {
        let mut writer = TokenWriter::new();
        writer.write_dictionary_start().unwrap();
        writer.write_pair_start("a").unwrap();
        assert!(writer.write_pair_start("b").is_err());
        assert!(writer.write_end().is_err());
        writer.write_int_value(1).unwrap();
        writer.write_end().unwrap();
        assert_eq!(writer.finish().unwrap().len(), 4);
    }

    #[test]
    fn test_value_writer_pairs_in_lists() {
        let mut writer = ValueWriter::new();
        writer.write_list_start().unwrap();
        writer.write_pair_start("p").unwrap();
        writer.write_int_value(1).unwrap();
        writer.write_bool_value(true).unwrap();
        writer.write_end().unwrap();

        let values = writer.finish().unwrap();
        let expected = BaseValue::List(vec![
            BaseValue::from(Pair::new("p", 1).unwrap()),
            BaseValue::Bool(true),
        ]);
        assert_eq!(values, vec![expected]);
    }

    #[test]
    fn test_value_writer_top_level_pair() {
        let mut writer = ValueWriter::new();
        writer.write_pair_start("outer").unwrap();
        writer.write_list_start().unwrap();
        writer.write_null_value().unwrap();
        writer.write_end().unwrap();

        let values = writer.finish().unwrap();
        assert_eq!(values, vec![BaseValue::from(Pair::new("outer", base!([null])).unwrap())]);
    }

    #[test]
    fn test_value_writer_packable() {
        let mut writer = ValueWriter::new();
        writer
            .write_packable_start(PackableHeader::new("point").unwrap())
            .unwrap();
        writer.write_pair_start("x").unwrap();
        writer.write_float_value(1.5).unwrap();
        writer.write_end().unwrap();

        let values = writer.finish().unwrap();
        let state = values[0].as_packed().unwrap();
        assert_eq!(state.state_id(), "point");
        assert_eq!(state.get("x"), Some(&BaseValue::Float(1.5)));
    }

    #[test]
    fn test_write_value_matches_tree() {
        let tree = base!({"a": [1, {"b": null}], "c": "d"});
        let mut writer = ValueWriter::new();
        write_value(&mut writer, &tree).unwrap();
        assert_eq!(writer.finish().unwrap(), vec![tree]);
    }

    #[test]
    fn test_closed_writer() {
        let mut writer = ValueWriter::new();
        writer.close();
        writer.close();
        assert_eq!(writer.write_list_start(), Err(Error::Closed("value writer")));
    }

    #[test]
    fn test_unfinished_writer() {
        let mut writer = ValueWriter::new();
        writer.write_list_start().unwrap();
        assert!(matches!(writer.finish(), Err(Error::Framing { depth: 1, .. })));
    }

    fn shallow() -> StreamOptions {
        StreamOptions::new().with_max_depth(2)
    }

    #[test]
    fn test_failed_write_value_is_rewound() {
        let mut writer = TokenWriter::with_options(shallow());
        writer.write_list_start().unwrap();
        writer.write_int_value(1).unwrap();

        let result = write_value(&mut writer, &base!([2, [3]]));
        assert!(matches!(result, Err(Error::Framing { depth: 2, .. })));
        assert_eq!(writer.depth(), 1);
        assert_eq!(writer.tokens().len(), 2);

        writer.write_int_value(7).unwrap();
        writer.write_end().unwrap();
        assert_eq!(
            writer.finish().unwrap(),
            vec![
                Token::ListStart,
                Token::Value(BaseValue::Int(1)),
                Token::Value(BaseValue::Int(7)),
                Token::End,
            ]
        );
    }

    #[test]
    fn test_value_writer_rewind_keeps_pending_pair() {
        let mut writer = ValueWriter::with_options(shallow());
        writer.write_dictionary_start().unwrap();
        writer.write_pair_start("a").unwrap();
        writer.write_int_value(1).unwrap();
        writer.write_pair_start("b").unwrap();

        assert!(write_value(&mut writer, &base!({"c": [[null]]})).is_err());
        assert_eq!(writer.depth(), 1);

        writer.write_int_value(2).unwrap();
        writer.write_end().unwrap();
        assert_eq!(writer.finish().unwrap(), vec![base!({"a": 1, "b": 2})]);
    }

    #[test]
    fn test_rewind_drops_names_written_since_checkpoint() {
        let mut writer = ValueWriter::new();
        writer.write_dictionary_start().unwrap();
        let checkpoint = writer.checkpoint().unwrap();
        writer.write_pair_start("a").unwrap();
        writer.write_int_value(1).unwrap();
        writer.rewind(checkpoint);

        writer.write_pair_start("a").unwrap();
        writer.write_int_value(2).unwrap();
        writer.write_end().unwrap();
        assert_eq!(writer.finish().unwrap(), vec![base!({"a": 2})]);
    }
}
