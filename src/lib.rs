//! # basetypes
//!
//! A closed vocabulary of data types and a streaming token protocol for moving values
//! built from them between components.
//!
//! ## What is a base type?
//!
//! Every value is exactly one of seventeen [`BaseTypeId`]s, grouped into categories:
//!
//! - **Value**: Null, Bool, Int, Float, DateTime
//! - **Storage**: String, Urn, Tag, Blob
//! - **Structure**: Pair, Color, Geolocation, Predicate
//! - **Collection**: List, Dictionary
//! - **Object**: Packable, a self-describing object identified by a state id
//! - **Sentinel**: End, the token that closes a scope
//!
//! In memory a tree of base types is a [`BaseValue`]. Any `T: Serialize` can be
//! classified and converted with [`classify`], [`is_valid`] and [`to_value`], and
//! converted back with [`from_value`].
//!
//! ## Token streams
//!
//! Values travel as a pre-order stream of [`Token`]s. Lists, dictionaries and
//! packables open a scope that exactly one `End` closes; a pair start is followed by
//! exactly one value and never gets an `End`. Every reader and writer in this crate
//! enforces those rules through [`Framing`], so a malformed stream fails at the token
//! that breaks it.
//!
//! ```rust
//! use basetypes::{base, read_value, to_tokens, TokenReader};
//!
//! let value = base!({"name": "probe", "readings": [1, 2, 3]});
//! let tokens = to_tokens(&value).unwrap();
//! assert_eq!(tokens.len(), 10);
//!
//! let mut reader = TokenReader::from_tokens(tokens);
//! assert_eq!(read_value(&mut reader).unwrap(), Some(value));
//! ```
//!
//! ## Classifying native values
//!
//! ```rust
//! use basetypes::{classify, is_valid, BaseTypeId};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Reading {
//!     sensor: String,
//!     at: (f64, f64, f64),
//! }
//!
//! let reading = Reading { sensor: "s1".into(), at: (51.5, -0.12, 11.0) };
//! assert_eq!(classify(&reading), Some(BaseTypeId::Dictionary));
//! assert_eq!(classify(&reading.at), Some(BaseTypeId::Geolocation));
//!
//! #[derive(Serialize)]
//! struct Opaque;
//! assert!(!is_valid(&vec![Opaque]));
//! ```
//!
//! ## Packables
//!
//! Objects implement [`Packable`] to write their state as named properties, and a
//! [`PackableFactory`] rebuilds them from a stream. See the [`packable`] module.
//!
//! ## Logging
//!
//! The crate emits `tracing` events: `debug` when scopes open and close and when a
//! packable is constructed, `trace` for every token, and `warn` for rejected tokens and
//! oversized storage values. It never installs a subscriber.

pub mod callback;
pub mod de;
pub mod error;
pub mod framing;
pub mod id;
pub mod macros;
pub mod map;
pub mod options;
pub mod packable;
pub mod packed;
pub mod reader;
pub mod ser;
pub mod structure;
pub mod tag;
pub mod token;
pub mod urn;
pub mod value;
pub mod writer;

pub use callback::{read_with_callbacks, ReaderCallback};
pub use de::from_value;
pub use error::{Error, Result};
pub use framing::{Framing, Mark};
pub use id::{BaseTypeId, Category};
pub use map::Dictionary;
pub use options::StreamOptions;
pub use packable::{
    pack_packable, pack_to_value, Constructor, FactoryChain, Packable, PackableFactory,
    PackedStateFactory, RegistryFactory,
};
pub use packed::{PackableHeader, PackedState};
pub use reader::{
    read_pair, read_value, BaseTypeReader, ChildReader, Peekable, ScopeReader, TokenReader,
    ValueReader,
};
pub use ser::ValueSerializer;
pub use structure::{Color, Geolocation, Pair, Predicate};
pub use tag::Tag;
pub use token::Token;
pub use urn::Urn;
pub use value::BaseValue;
pub use writer::{write_value, BaseTypeWriter, Checkpoint, TokenWriter, ValueWriter};

use serde::Serialize;

/// Convert any `T: Serialize` to a [`BaseValue`] tree.
///
/// # Examples
///
/// ```rust
/// use basetypes::{to_value, BaseValue};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let value = to_value(&Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(value.as_dictionary().and_then(|d| d.get("y")), Some(&BaseValue::Int(2)));
/// ```
///
/// # Errors
///
/// Returns an error if the value, or anything inside it, is not a base type.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T>(value: &T) -> Result<BaseValue>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer::new())
}

/// The base type of a native value, or `None` if it is not one.
///
/// # Examples
///
/// ```rust
/// use basetypes::{classify, BaseTypeId};
///
/// assert_eq!(classify(&()), Some(BaseTypeId::Null));
/// assert_eq!(classify("text"), Some(BaseTypeId::String));
/// assert_eq!(classify(&u64::MAX), None);
/// ```
#[must_use]
pub fn classify<T>(value: &T) -> Option<BaseTypeId>
where
    T: ?Sized + Serialize,
{
    match to_value(value) {
        Ok(value) => Some(value.id()),
        Err(err) => {
            tracing::trace!(error = %err, "value is not a base type");
            None
        }
    }
}

/// `true` if `value`, and everything inside it, is a base type.
#[must_use]
pub fn is_valid<T>(value: &T) -> bool
where
    T: ?Sized + Serialize,
{
    classify(value).is_some()
}

/// Writes `value` through a [`TokenWriter`] and returns the recorded tokens.
///
/// # Errors
///
/// Returns a framing error for a lone scalar, which has no legal position in a stream.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_tokens(value: &BaseValue) -> Result<Vec<Token>> {
    let mut writer = TokenWriter::new();
    write_value(&mut writer, value)?;
    writer.finish()
}

/// Reads every complete value from `tokens`.
///
/// # Examples
///
/// ```rust
/// use basetypes::{base, from_tokens, to_tokens};
///
/// let mut tokens = to_tokens(&base!([1])).unwrap();
/// tokens.extend(to_tokens(&base!({"a": null})).unwrap());
/// assert_eq!(from_tokens(tokens).unwrap(), vec![base!([1]), base!({"a": null})]);
/// ```
///
/// # Errors
///
/// Returns the first framing, key or type error in the stream.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_tokens<I>(tokens: I) -> Result<Vec<BaseValue>>
where
    I: IntoIterator<Item = Token>,
{
    let mut reader = TokenReader::from_tokens(tokens);
    let mut values = Vec::new();
    while let Some(value) = read_value(&mut reader)? {
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base;
    use serde::{Deserialize, Serialize};
    use std::collections::{BTreeMap, HashMap};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u32,
        name: String,
        active: bool,
        tags: Vec<String>,
    }

    #[derive(Serialize)]
    struct Opaque;

    #[derive(Serialize)]
    enum Mode {
        Fast,
    }

    #[test]
    fn test_struct_round_trip() {
        let user = User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["admin".to_string(), "user".to_string()],
        };
        let value = to_value(&user).unwrap();
        assert_eq!(value.id(), BaseTypeId::Dictionary);
        let back: User = from_value(value).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_classify_scalars() {
        assert_eq!(classify(&()), Some(BaseTypeId::Null));
        assert_eq!(classify(&None::<i32>), Some(BaseTypeId::Null));
        assert_eq!(classify(&true), Some(BaseTypeId::Bool));
        assert_eq!(classify(&-5i8), Some(BaseTypeId::Int));
        assert_eq!(classify(&u64::from(u32::MAX)), Some(BaseTypeId::Int));
        assert_eq!(classify(&1.5f32), Some(BaseTypeId::Float));
        assert_eq!(classify(&'c'), Some(BaseTypeId::String));
        assert_eq!(classify(&Some("x")), Some(BaseTypeId::String));
    }

    #[test]
    fn test_classify_structures() {
        assert_eq!(classify(&("n", 1)), Some(BaseTypeId::Pair));
        assert_eq!(classify(&("", 1)), Some(BaseTypeId::List));
        assert_eq!(classify(&(0u8, 0u8, 0u8, 0.5f64)), Some(BaseTypeId::Color));
        assert_eq!(classify(&(1.0, 2.0, 3.0)), Some(BaseTypeId::Geolocation));
        assert_eq!(classify(&(91.0, 2.0, 3.0)), Some(BaseTypeId::List));
        let verb: Tag = "tag:example.com,2019:has".parse().unwrap();
        assert_eq!(classify(&("a", verb, 2)), Some(BaseTypeId::Predicate));
    }

    #[test]
    fn test_recursive_validity() {
        let mut good = BTreeMap::new();
        good.insert("a", vec![1, 2]);
        assert!(is_valid(&good));

        let mut bad_key = HashMap::new();
        bad_key.insert(1, "bad key");
        assert!(!is_valid(&bad_key));

        let mut inner = BTreeMap::new();
        inner.insert("y", vec![Opaque]);
        let mut outer = BTreeMap::new();
        outer.insert("x", inner);
        assert!(!is_valid(&outer));

        assert!(!is_valid(&Mode::Fast));
        assert!(!is_valid(&vec![Some(u128::MAX)]));
    }

    #[test]
    fn test_dictionary_cannot_hold_pair() {
        let mut map = BTreeMap::new();
        map.insert("p", ("name", 1));
        let value = to_value(&map).unwrap();
        let inner = value.as_dictionary().and_then(|d| d.get("p")).unwrap();
        assert_eq!(inner.id(), BaseTypeId::List);
    }

    #[test]
    fn test_base_value_classifies_as_itself() {
        let value = base!({"p": [1, 2], "q": null});
        assert_eq!(to_value(&value).unwrap(), value);
        let tag: Tag = "tag:bt.co,2019:null".parse().unwrap();
        assert_eq!(classify(&tag), Some(BaseTypeId::Tag));
    }

    #[test]
    fn test_token_helpers() {
        let value = to_value(&Point { x: 1, y: 2 }).unwrap();
        let tokens = to_tokens(&value).unwrap();
        assert_eq!(tokens.first(), Some(&Token::DictionaryStart));
        assert_eq!(tokens.last(), Some(&Token::End));
        assert_eq!(from_tokens(tokens).unwrap(), vec![value]);
    }

    #[test]
    fn test_category_docs_match_ids() {
        for id in [BaseTypeId::String, BaseTypeId::Urn, BaseTypeId::Tag, BaseTypeId::Blob] {
            assert_eq!(id.category(), Category::Storage);
        }
        assert_eq!(BaseTypeId::DateTime.category(), Category::Value);
    }

    #[test]
    fn test_scalar_has_no_stream_position() {
        assert!(matches!(to_tokens(&BaseValue::Int(1)), Err(Error::Framing { .. })));
        let result = from_tokens(vec![Token::Value(BaseValue::Int(1))]);
        assert!(matches!(result, Err(Error::Framing { .. })));
    }
}
