//! Packable objects and the factories that rebuild them.
//!
//! A [`Packable`] writes its state as named properties and can read them back. The
//! caller frames that state: [`pack_packable`] opens a packable scope, lets the object
//! write its pairs, and closes the scope. On the way in, a [`PackableFactory`] reads the
//! packable start token, constructs an empty object for its state id and lets the
//! object unpack from a reader limited to exactly its properties.
//!
//! Factories chain. A [`FactoryChain`] tries factories in order, and a
//! [`RegistryFactory`] falls back to its parent. Putting a restricted factory first
//! substitutes safe implementations for chosen state ids, and [`PackedStateFactory`]
//! accepts any state id without running any producer-specific code.
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{
//!     pack_packable, read_pair, BaseTypeReader, BaseTypeWriter, Dictionary, Packable,
//!     PackableFactory, RegistryFactory, Result, TokenReader, TokenWriter,
//! };
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! impl Packable for Counter {
//!     fn state_id(&self) -> String {
//!         "tag:example.com,2019:counter".to_string()
//!     }
//!
//!     fn pack(&self, writer: &mut dyn BaseTypeWriter, _hints: &Dictionary) -> Result<()> {
//!         if self.count != 0 {
//!             writer.write_pair_start("count")?;
//!             writer.write_int_value(self.count)?;
//!         }
//!         Ok(())
//!     }
//!
//!     fn unpack(&mut self, reader: &mut dyn BaseTypeReader, _hints: &Dictionary) -> Result<()> {
//!         while let Some((name, value)) = read_pair(reader)? {
//!             if name == "count" {
//!                 self.count = value.as_i64().unwrap_or_default();
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut writer = TokenWriter::new();
//! pack_packable(&mut writer, &Counter { count: 3 }, &Dictionary::new()).unwrap();
//! let tokens = writer.finish().unwrap();
//!
//! let mut factory = RegistryFactory::new();
//! factory.register("tag:example.com,2019:counter", |_| Box::new(Counter::default()));
//!
//! let mut reader = TokenReader::from_tokens(tokens);
//! let object = factory.make_packable(&mut reader, &Dictionary::new()).unwrap();
//! assert_eq!(object.state_id(), "tag:example.com,2019:counter");
//! ```

use crate::reader::read_packable_header;
use crate::writer::{atomically, write_entries};
use crate::{
    read_pair, BaseTypeReader, BaseTypeWriter, Dictionary, Error, PackableHeader,
    PackedState, Result, ScopeReader, Token, ValueWriter,
};
use std::collections::HashMap;
use std::fmt;

/// An object whose state travels as a packable scope.
pub trait Packable {
    /// The state design this object writes, recommended to be a tag URI.
    fn state_id(&self) -> String;

    /// Revision of the state design, written into the packable header.
    fn version(&self) -> Option<String> {
        None
    }

    /// The header [`pack_packable`] opens the scope with: this object's state id and
    /// version, carrying the caller's `hints`.
    fn start_header(&self, hints: &Dictionary) -> Result<PackableHeader> {
        let header = PackableHeader::new(self.state_id())?.with_hints(hints.clone());
        Ok(match self.version() {
            Some(version) => header.with_version(version),
            None => header,
        })
    }

    /// Writes the object's state as pairs, usually leaving out default values. The
    /// surrounding packable scope is opened and closed by the caller.
    fn pack(&self, writer: &mut dyn BaseTypeWriter, hints: &Dictionary) -> Result<()>;

    /// Reads pairs until `reader` is exhausted, applying defaults for absent ones.
    fn unpack(&mut self, reader: &mut dyn BaseTypeReader, hints: &Dictionary) -> Result<()>;
}

/// Writes one balanced packable scope holding `packable`'s state.
///
/// If packing fails, the writer is rewound to where it was before the call. A writer
/// without [checkpoints](BaseTypeWriter::checkpoint) is left inside the failed scope
/// and must be discarded.
pub fn pack_packable(writer: &mut dyn BaseTypeWriter, packable: &dyn Packable, hints: &Dictionary) -> Result<()> {
    let header = packable.start_header(hints)?;
    atomically(writer, |writer| {
        writer.write_packable_start(header)?;
        let mut properties = PropertyWriter::new(&mut *writer);
        packable.pack(&mut properties, hints)?;
        properties.finish()?;
        writer.write_end()
    })
}

/// Hands a packable its own scope: nested scopes must balance and the packable's
/// scope cannot be closed from inside. It takes no checkpoints, so a failure inside
/// `pack` is undone as a whole by [`pack_packable`].
struct PropertyWriter<'a, W: ?Sized> {
    inner: &'a mut W,
    depth: usize,
}

impl<'a, W: BaseTypeWriter + ?Sized> PropertyWriter<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        PropertyWriter { inner, depth: 0 }
    }

    fn finish(&self) -> Result<()> {
        if self.depth > 0 {
            return Err(Error::framing(self.depth, "packable left a nested scope open"));
        }
        Ok(())
    }
}

impl<W: BaseTypeWriter + ?Sized> BaseTypeWriter for PropertyWriter<'_, W> {
    fn write_token(&mut self, token: Token) -> Result<()> {
        if token.is_end() && self.depth == 0 {
            return Err(Error::framing(0, "packable tried to close its own scope"));
        }
        let opens = token.opens_scope();
        let closes = token.is_end();
        self.inner.write_token(token)?;
        if opens {
            self.depth += 1;
        } else if closes {
            self.depth -= 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.inner.close()
    }
}

/// Packs `packable` into a [`PackedState`] without any intermediate encoding.
pub fn pack_to_value(packable: &dyn Packable, hints: &Dictionary) -> Result<PackedState> {
    let mut writer = ValueWriter::new();
    pack_packable(&mut writer, packable, hints)?;
    match writer.finish()?.pop() {
        Some(crate::BaseValue::Packable(state)) => Ok(state),
        _ => Err(Error::framing(0, "packable did not produce a packable scope")),
    }
}

/// Constructs packables for state ids.
pub trait PackableFactory {
    /// Returns a default-state object for `state_id`, or `None` if this factory does
    /// not handle it.
    fn make_object(&self, state_id: &str, hints: &Dictionary) -> Option<Box<dyn Packable>>;

    /// Like [`make_object`](PackableFactory::make_object) but sees the whole start
    /// header. Factories that keep the header override this.
    fn make_object_for(&self, header: &PackableHeader, hints: &Dictionary) -> Option<Box<dyn Packable>> {
        self.make_object(header.state_id(), hints)
    }

    /// Reads one packable from `reader`: the start token, its properties and the
    /// closing `End`. Properties the object does not read are skipped.
    fn make_packable(&self, reader: &mut dyn BaseTypeReader, hints: &Dictionary) -> Result<Box<dyn Packable>> {
        let header = read_packable_header(reader)?;
        let mut object = self
            .make_object_for(&header, hints)
            .ok_or_else(|| Error::UnknownStateId(header.state_id().to_string()))?;
        tracing::debug!(state_id = header.state_id(), version = ?header.version(), "constructed packable");

        let mut scope = ScopeReader::new(reader);
        object.unpack(&mut scope, hints)?;
        scope.drain()?;
        Ok(object)
    }
}

impl<F: PackableFactory + ?Sized> PackableFactory for Box<F> {
    fn make_object(&self, state_id: &str, hints: &Dictionary) -> Option<Box<dyn Packable>> {
        (**self).make_object(state_id, hints)
    }

    fn make_object_for(&self, header: &PackableHeader, hints: &Dictionary) -> Option<Box<dyn Packable>> {
        (**self).make_object_for(header, hints)
    }
}

impl<F: PackableFactory + ?Sized> PackableFactory for &F {
    fn make_object(&self, state_id: &str, hints: &Dictionary) -> Option<Box<dyn Packable>> {
        (**self).make_object(state_id, hints)
    }

    fn make_object_for(&self, header: &PackableHeader, hints: &Dictionary) -> Option<Box<dyn Packable>> {
        (**self).make_object_for(header, hints)
    }
}

/// Tries each factory in order; the first that handles a state id wins.
#[derive(Default)]
pub struct FactoryChain {
    factories: Vec<Box<dyn PackableFactory>>,
}

impl FactoryChain {
    #[must_use]
    pub fn new() -> Self {
        FactoryChain::default()
    }

    #[must_use]
    pub fn with(mut self, factory: impl PackableFactory + 'static) -> Self {
        self.push(factory);
        self
    }

    pub fn push(&mut self, factory: impl PackableFactory + 'static) {
        self.factories.push(Box::new(factory));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl PackableFactory for FactoryChain {
    fn make_object(&self, state_id: &str, hints: &Dictionary) -> Option<Box<dyn Packable>> {
        self.factories
            .iter()
            .find_map(|factory| factory.make_object(state_id, hints))
    }

    fn make_object_for(&self, header: &PackableHeader, hints: &Dictionary) -> Option<Box<dyn Packable>> {
        self.factories
            .iter()
            .find_map(|factory| factory.make_object_for(header, hints))
    }
}

impl fmt::Debug for FactoryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryChain")
            .field("factories", &self.factories.len())
            .finish()
    }
}

/// Builds a default-state object; receives the caller's hints.
pub type Constructor = fn(&Dictionary) -> Box<dyn Packable>;

/// Maps state ids to constructors, deferring unknown ids to an optional parent.
#[derive(Default)]
pub struct RegistryFactory {
    constructors: HashMap<String, Constructor>,
    parent: Option<Box<dyn PackableFactory>>,
}

impl RegistryFactory {
    #[must_use]
    pub fn new() -> Self {
        RegistryFactory::default()
    }

    #[must_use]
    pub fn with_parent(parent: impl PackableFactory + 'static) -> Self {
        RegistryFactory {
            constructors: HashMap::new(),
            parent: Some(Box::new(parent)),
        }
    }

    /// Registers `constructor` for `state_id`, replacing any earlier registration.
    pub fn register(&mut self, state_id: impl Into<String>, constructor: Constructor) -> &mut Self {
        self.constructors.insert(state_id.into(), constructor);
        self
    }

    #[must_use]
    pub fn handles(&self, state_id: &str) -> bool {
        self.constructors.contains_key(state_id)
    }
}

impl PackableFactory for RegistryFactory {
    fn make_object(&self, state_id: &str, hints: &Dictionary) -> Option<Box<dyn Packable>> {
        match self.constructors.get(state_id) {
            Some(constructor) => Some(constructor(hints)),
            None => self
                .parent
                .as_ref()
                .and_then(|parent| parent.make_object(state_id, hints)),
        }
    }

    fn make_object_for(&self, header: &PackableHeader, hints: &Dictionary) -> Option<Box<dyn Packable>> {
        match self.constructors.get(header.state_id()) {
            Some(constructor) => Some(constructor(hints)),
            None => self
                .parent
                .as_ref()
                .and_then(|parent| parent.make_object_for(header, hints)),
        }
    }
}

impl fmt::Debug for RegistryFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryFactory")
            .field("state_ids", &self.constructors.keys().collect::<Vec<_>>())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// Builds a [`PackedState`] for any state id, keeping the start header so the state
/// packs back exactly as it was read.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackedStateFactory;

impl PackableFactory for PackedStateFactory {
    fn make_object(&self, state_id: &str, _hints: &Dictionary) -> Option<Box<dyn Packable>> {
        let header = PackableHeader::new(state_id).ok()?;
        Some(Box::new(PackedState::new(header)))
    }

    fn make_object_for(&self, header: &PackableHeader, _hints: &Dictionary) -> Option<Box<dyn Packable>> {
        Some(Box::new(PackedState::new(header.clone())))
    }
}

impl Packable for PackedState {
    fn state_id(&self) -> String {
        self.header().state_id().to_string()
    }

    fn version(&self) -> Option<String> {
        self.header().version().map(str::to_string)
    }

    /// The header this state was read with, so it packs back unchanged.
    fn start_header(&self, _hints: &Dictionary) -> Result<PackableHeader> {
        Ok(self.header().clone())
    }

    fn pack(&self, writer: &mut dyn BaseTypeWriter, _hints: &Dictionary) -> Result<()> {
        write_entries(writer, self.properties())
    }

    fn unpack(&mut self, reader: &mut dyn BaseTypeReader, _hints: &Dictionary) -> Result<()> {
        while let Some((name, value)) = read_pair(reader)? {
            self.properties_mut().insert(name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BaseValue, Token, TokenReader, TokenWriter};

    #[derive(Debug, Default, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl Packable for Point {
        fn state_id(&self) -> String {
            "point".to_string()
        }

        fn pack(&self, writer: &mut dyn BaseTypeWriter, _hints: &Dictionary) -> Result<()> {
            if self.x != 0 {
                writer.write_pair_start("x")?;
                writer.write_int_value(self.x)?;
            }
            if self.y != 0 {
                writer.write_pair_start("y")?;
                writer.write_int_value(self.y)?;
            }
            Ok(())
        }

        fn unpack(&mut self, reader: &mut dyn BaseTypeReader, _hints: &Dictionary) -> Result<()> {
            while let Some((name, value)) = read_pair(reader)? {
                match name.as_str() {
                    "x" => self.x = value.as_i64().unwrap_or_default(),
                    "y" => self.y = value.as_i64().unwrap_or_default(),
                    _ => {}
                }
            }
            Ok(())
        }
    }

    /// Reads only the first property and leaves the rest for the factory to skip.
    #[derive(Default)]
    struct Lazy;

    impl Packable for Lazy {
        fn state_id(&self) -> String {
            "point".to_string()
        }

        fn pack(&self, _writer: &mut dyn BaseTypeWriter, _hints: &Dictionary) -> Result<()> {
            Ok(())
        }

        fn unpack(&mut self, reader: &mut dyn BaseTypeReader, _hints: &Dictionary) -> Result<()> {
            read_pair(reader).map(|_| ())
        }
    }

    fn packed_tokens(packable: &dyn Packable) -> Vec<Token> {
        let mut writer = TokenWriter::new();
        pack_packable(&mut writer, packable, &Dictionary::new()).unwrap();
        writer.finish().unwrap()
    }

    fn point_registry() -> RegistryFactory {
        let mut registry = RegistryFactory::new();
        registry.register("point", |_| Box::new(Point::default()));
        registry
    }

    #[test]
    fn test_pack_writes_one_balanced_scope() {
        let tokens = packed_tokens(&Point { x: 1, y: 0 });
        assert_eq!(tokens.len(), 4);
        assert!(matches!(&tokens[0], Token::PackableStart(header) if header.state_id() == "point"));
        assert_eq!(tokens[3], Token::End);
    }

    #[test]
    fn test_round_trip_is_token_identical() {
        let original = Point { x: 3, y: -4 };
        let tokens = packed_tokens(&original);

        let mut reader = TokenReader::from_tokens(tokens.clone());
        let object = point_registry().make_packable(&mut reader, &Dictionary::new()).unwrap();
        assert_eq!(packed_tokens(object.as_ref()), tokens);
    }

    #[test]
    fn test_unknown_state_id() {
        let tokens = packed_tokens(&Point { x: 1, y: 1 });
        let mut reader = TokenReader::from_tokens(tokens);
        let result = RegistryFactory::new().make_packable(&mut reader, &Dictionary::new());
        assert!(matches!(result, Err(Error::UnknownStateId(id)) if id == "point"));
    }

    #[test]
    fn test_unread_properties_are_drained() {
        let mut tokens = packed_tokens(&Point { x: 1, y: 2 });
        tokens.insert(0, Token::ListStart);
        tokens.push(Token::Value(BaseValue::Int(9)));
        tokens.push(Token::End);

        let mut registry = RegistryFactory::new();
        registry.register("point", |_| Box::new(Lazy));
        let mut reader = TokenReader::from_tokens(tokens);
        reader.next_token().unwrap();
        registry.make_packable(&mut reader, &Dictionary::new()).unwrap();
        assert_eq!(reader.next_token().unwrap(), Some(Token::Value(BaseValue::Int(9))));
    }

    #[test]
    fn test_chain_prefers_first_factory() {
        let tokens = packed_tokens(&Point { x: 5, y: 6 });
        let chain = FactoryChain::new()
            .with(PackedStateFactory)
            .with(point_registry());

        let mut reader = TokenReader::from_tokens(tokens.clone());
        let object = chain.make_packable(&mut reader, &Dictionary::new()).unwrap();
        let state = pack_to_value(object.as_ref(), &Dictionary::new()).unwrap();
        assert_eq!(state.get("x"), Some(&BaseValue::Int(5)));
        assert_eq!(packed_tokens(object.as_ref()), tokens);
    }

    #[test]
    fn test_registry_falls_back_to_parent() {
        let registry = RegistryFactory::with_parent(PackedStateFactory);
        assert!(!registry.handles("anything"));
        assert!(registry.make_object("anything", &Dictionary::new()).is_some());
        assert!(RegistryFactory::new().make_object("anything", &Dictionary::new()).is_none());
    }

    #[test]
    fn test_pack_to_value() {
        let state = pack_to_value(&Point { x: 0, y: 7 }, &Dictionary::new()).unwrap();
        assert_eq!(state.state_id(), "point");
        assert_eq!(state.properties().len(), 1);
        assert_eq!(state.get("y"), Some(&BaseValue::Int(7)));
    }

    #[test]
    fn test_packable_body_must_be_pairs() {
        struct Broken;

        impl Packable for Broken {
            fn state_id(&self) -> String {
                "broken".to_string()
            }

            fn pack(&self, writer: &mut dyn BaseTypeWriter, _hints: &Dictionary) -> Result<()> {
                writer.write_int_value(1)
            }

            fn unpack(&mut self, _reader: &mut dyn BaseTypeReader, _hints: &Dictionary) -> Result<()> {
                Ok(())
            }
        }

        let mut writer = TokenWriter::new();
        let result = pack_packable(&mut writer, &Broken, &Dictionary::new());
        assert!(matches!(result, Err(Error::Key(_))));
    }

    /// Writes one good property, then the given tokens.
    struct Stray(Vec<Token>);

    impl Packable for Stray {
        fn state_id(&self) -> String {
            "stray".to_string()
        }

        fn pack(&self, writer: &mut dyn BaseTypeWriter, _hints: &Dictionary) -> Result<()> {
            writer.write_pair_start("a")?;
            writer.write_int_value(1)?;
            for token in &self.0 {
                writer.write_token(token.clone())?;
            }
            Ok(())
        }

        fn unpack(&mut self, _reader: &mut dyn BaseTypeReader, _hints: &Dictionary) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_pack_rewinds_writer() {
        let mut writer = TokenWriter::new();
        writer.write_list_start().unwrap();

        let stray = Stray(vec![Token::Value(BaseValue::Int(2))]);
        let result = pack_packable(&mut writer, &stray, &Dictionary::new());
        assert!(matches!(result, Err(Error::Key(_))));
        assert_eq!(writer.depth(), 1);

        writer.write_int_value(7).unwrap();
        writer.write_end().unwrap();
        assert_eq!(
            writer.finish().unwrap(),
            vec![Token::ListStart, Token::Value(BaseValue::Int(7)), Token::End]
        );
    }

    #[test]
    fn test_packable_cannot_close_its_own_scope() {
        let mut writer = ValueWriter::new();
        writer.write_list_start().unwrap();

        let result = pack_packable(&mut writer, &Stray(vec![Token::End]), &Dictionary::new());
        assert!(matches!(result, Err(Error::Framing { .. })));
        assert_eq!(writer.depth(), 1);

        writer.write_end().unwrap();
        assert_eq!(writer.finish().unwrap(), vec![BaseValue::List(vec![])]);
    }

    #[test]
    fn test_packable_must_close_nested_scopes() {
        let stray = Stray(vec![Token::PairStart("b".to_string()), Token::ListStart]);
        let result = pack_to_value(&stray, &Dictionary::new());
        assert!(matches!(result, Err(Error::Framing { .. })));
    }

    #[test]
    fn test_packed_state_keeps_producer_header() {
        let mut hints = Dictionary::new();
        hints.insert("compact", true).unwrap();
        let header = PackableHeader::new("point")
            .unwrap()
            .with_version("3")
            .with_hints(hints);
        let mut state = PackedState::new(header);
        state.set("x", 1).unwrap();

        let tokens = packed_tokens(&state);
        assert!(matches!(&tokens[0], Token::PackableStart(h) if h.hints().get("compact").is_some()));

        let mut reader = TokenReader::from_tokens(tokens.clone());
        let object = PackedStateFactory
            .make_packable(&mut reader, &Dictionary::new())
            .unwrap();
        assert_eq!(packed_tokens(object.as_ref()), tokens);
    }

    #[test]
    fn test_start_header_carries_caller_hints() {
        let mut hints = Dictionary::new();
        hints.insert("units", "mm").unwrap();
        let header = Point::default().start_header(&hints).unwrap();
        assert_eq!(header.state_id(), "point");
        assert_eq!(header.version(), None);
        assert_eq!(header.hints(), &hints);
    }
}
