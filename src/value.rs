//! The base-type value tree.
//!
//! [`BaseValue`] is a sum type with one variant per base type (every id except the
//! `End` sentinel). Structure, storage and collection payloads validate themselves when
//! they are built, so any `BaseValue` is a valid base type and [`BaseValue::id`]
//! classifies it without further checks.
//!
//! ## Creating Values
//!
//! ```rust
//! use basetypes::{base, BaseTypeId, BaseValue, Dictionary};
//!
//! let number = BaseValue::from(42);
//! let text = BaseValue::from("hello");
//! let tree = base!({
//!     "name": "Alice",
//!     "scores": [1, 2, 3]
//! });
//!
//! assert_eq!(number.id(), BaseTypeId::Int);
//! assert_eq!(text.id(), BaseTypeId::String);
//! assert_eq!(tree.id(), BaseTypeId::Dictionary);
//! ```
//!
//! ## Extracting Values
//!
//! ```rust
//! use basetypes::BaseValue;
//!
//! let value = BaseValue::from(42);
//! assert_eq!(value.as_i64(), Some(42));
//! assert_eq!(i64::try_from(value).unwrap(), 42);
//! ```

use crate::{
    BaseTypeId, Color, Dictionary, Error, Geolocation, PackedState, Pair, Predicate, Result, Tag,
    Urn,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Any base-type value.
///
/// # Examples
///
/// ```rust
/// use basetypes::{BaseTypeId, BaseValue, Pair};
///
/// let pair = BaseValue::from(Pair::new("key", "value").unwrap());
/// assert_eq!(pair.id(), BaseTypeId::Pair);
/// assert!(pair.id().is_structure());
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum BaseValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
    String(String),
    Urn(Urn),
    Tag(Tag),
    Blob(Vec<u8>),
    Pair(Box<Pair>),
    Color(Color),
    Geolocation(Geolocation),
    Predicate(Box<Predicate>),
    List(Vec<BaseValue>),
    Dictionary(Dictionary),
    Packable(PackedState),
}

impl BaseValue {
    /// Returns the base type id of this value.
    #[must_use]
    pub const fn id(&self) -> BaseTypeId {
        match self {
            BaseValue::Null => BaseTypeId::Null,
            BaseValue::Bool(_) => BaseTypeId::Bool,
            BaseValue::Int(_) => BaseTypeId::Int,
            BaseValue::Float(_) => BaseTypeId::Float,
            BaseValue::DateTime(_) => BaseTypeId::DateTime,
            BaseValue::String(_) => BaseTypeId::String,
            BaseValue::Urn(_) => BaseTypeId::Urn,
            BaseValue::Tag(_) => BaseTypeId::Tag,
            BaseValue::Blob(_) => BaseTypeId::Blob,
            BaseValue::Pair(_) => BaseTypeId::Pair,
            BaseValue::Color(_) => BaseTypeId::Color,
            BaseValue::Geolocation(_) => BaseTypeId::Geolocation,
            BaseValue::Predicate(_) => BaseTypeId::Predicate,
            BaseValue::List(_) => BaseTypeId::List,
            BaseValue::Dictionary(_) => BaseTypeId::Dictionary,
            BaseValue::Packable(_) => BaseTypeId::Packable,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, BaseValue::Null)
    }

    /// Returns `true` for values that stream as a single self-contained token.
    #[inline]
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(
            self,
            BaseValue::Pair(_) | BaseValue::List(_) | BaseValue::Dictionary(_) | BaseValue::Packable(_)
        )
    }

    /// Byte length of a storage value's content, `None` for every other type.
    #[must_use]
    pub fn storage_len(&self) -> Option<usize> {
        match self {
            BaseValue::String(s) => Some(s.len()),
            BaseValue::Blob(bytes) => Some(bytes.len()),
            BaseValue::Urn(urn) => Some(urn.nid().len() + urn.nss().len() + 5),
            BaseValue::Tag(tag) => Some(tag.to_string().len()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BaseValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BaseValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BaseValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BaseValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[BaseValue]> {
        match self {
            BaseValue::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            BaseValue::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_pair(&self) -> Option<&Pair> {
        match self {
            BaseValue::Pair(pair) => Some(pair),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_packed(&self) -> Option<&PackedState> {
        match self {
            BaseValue::Packable(state) => Some(state),
            _ => None,
        }
    }
}

impl fmt::Display for BaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseValue::Null => write!(f, "null"),
            BaseValue::Bool(b) => write!(f, "{}", b),
            BaseValue::Int(i) => write!(f, "{}", i),
            BaseValue::Float(fl) => write!(f, "{}", fl),
            BaseValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            BaseValue::String(s) => write!(f, "{:?}", s),
            BaseValue::Urn(urn) => write!(f, "{}", urn),
            BaseValue::Tag(tag) => write!(f, "{}", tag),
            BaseValue::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
            BaseValue::Pair(pair) => write!(f, "{}: {}", pair.name(), pair.value()),
            BaseValue::Color(color) => {
                write!(f, "rgb({},{},{})", color.red(), color.green(), color.blue())
            }
            BaseValue::Geolocation(geo) => {
                write!(f, "({},{},{})", geo.latitude(), geo.longitude(), geo.altitude())
            }
            BaseValue::Predicate(p) => write!(f, "{} {} {}", p.object(), p.verb(), p.subject()),
            BaseValue::List(items) => {
                write!(
                    f,
                    "[{}]",
                    items
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
            BaseValue::Dictionary(dict) => {
                write!(
                    f,
                    "{{{}}}",
                    dict.iter()
                        .map(|(k, v)| format!("{:?}: {}", k, v))
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
            BaseValue::Packable(state) => write!(f, "<packable {}>", state.state_id()),
        }
    }
}

impl Serialize for BaseValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            BaseValue::Null => serializer.serialize_unit(),
            BaseValue::Bool(b) => serializer.serialize_bool(*b),
            BaseValue::Int(i) => serializer.serialize_i64(*i),
            BaseValue::Float(f) => serializer.serialize_f64(*f),
            BaseValue::DateTime(dt) => {
                serializer.serialize_newtype_struct(crate::ser::DATETIME_TOKEN, &dt.to_rfc3339())
            }
            BaseValue::String(s) => serializer.serialize_str(s),
            BaseValue::Urn(urn) => urn.serialize(serializer),
            BaseValue::Tag(tag) => tag.serialize(serializer),
            BaseValue::Blob(bytes) => serializer.serialize_bytes(bytes),
            BaseValue::Pair(pair) => pair.serialize(serializer),
            BaseValue::Color(color) => color.serialize(serializer),
            BaseValue::Geolocation(geo) => geo.serialize(serializer),
            BaseValue::Predicate(predicate) => predicate.serialize(serializer),
            BaseValue::List(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for element in items {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            BaseValue::Dictionary(dict) => dict.serialize(serializer),
            BaseValue::Packable(state) => state.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for BaseValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct BaseValueVisitor;

        impl<'de> Visitor<'de> for BaseValueVisitor {
            type Value = BaseValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any base-type value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<BaseValue, E> {
                Ok(BaseValue::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<BaseValue, E> {
                Ok(BaseValue::Int(value))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<BaseValue, E>
            where
                E: de::Error,
            {
                i64::try_from(value)
                    .map(BaseValue::Int)
                    .map_err(|_| E::custom(format!("integer {} does not fit an int", value)))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<BaseValue, E> {
                Ok(BaseValue::Float(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<BaseValue, E> {
                Ok(BaseValue::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<BaseValue, E> {
                Ok(BaseValue::String(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<BaseValue, E> {
                Ok(BaseValue::Blob(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<BaseValue, E> {
                Ok(BaseValue::Blob(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<BaseValue, E> {
                Ok(BaseValue::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<BaseValue, E> {
                Ok(BaseValue::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<BaseValue, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_newtype_struct<D>(
                self,
                deserializer: D,
            ) -> std::result::Result<BaseValue, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<BaseValue, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(BaseValue::List(vec))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<BaseValue, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut dict = Dictionary::new();
                while let Some((key, value)) = map.next_entry::<String, BaseValue>()? {
                    dict.insert(key, value).map_err(de::Error::custom)?;
                }
                Ok(BaseValue::Dictionary(dict))
            }
        }

        deserializer.deserialize_any(BaseValueVisitor)
    }
}

impl TryFrom<BaseValue> for i64 {
    type Error = Error;

    fn try_from(value: BaseValue) -> Result<Self> {
        match value {
            BaseValue::Int(i) => Ok(i),
            other => Err(Error::type_mismatch(BaseTypeId::Int, other.id())),
        }
    }
}

impl TryFrom<BaseValue> for f64 {
    type Error = Error;

    fn try_from(value: BaseValue) -> Result<Self> {
        match value {
            BaseValue::Float(f) => Ok(f),
            other => Err(Error::type_mismatch(BaseTypeId::Float, other.id())),
        }
    }
}

impl TryFrom<BaseValue> for bool {
    type Error = Error;

    fn try_from(value: BaseValue) -> Result<Self> {
        match value {
            BaseValue::Bool(b) => Ok(b),
            other => Err(Error::type_mismatch(BaseTypeId::Bool, other.id())),
        }
    }
}

impl TryFrom<BaseValue> for String {
    type Error = Error;

    fn try_from(value: BaseValue) -> Result<Self> {
        match value {
            BaseValue::String(s) => Ok(s),
            other => Err(Error::type_mismatch(BaseTypeId::String, other.id())),
        }
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BaseValue {
                fn from(value: $ty) -> Self {
                    BaseValue::Int(i64::from(value))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for BaseValue {
    fn from(value: bool) -> Self {
        BaseValue::Bool(value)
    }
}

impl From<f32> for BaseValue {
    fn from(value: f32) -> Self {
        BaseValue::Float(f64::from(value))
    }
}

impl From<f64> for BaseValue {
    fn from(value: f64) -> Self {
        BaseValue::Float(value)
    }
}

impl From<String> for BaseValue {
    fn from(value: String) -> Self {
        BaseValue::String(value)
    }
}

impl From<&str> for BaseValue {
    fn from(value: &str) -> Self {
        BaseValue::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for BaseValue {
    fn from(value: DateTime<Utc>) -> Self {
        BaseValue::DateTime(value)
    }
}

impl From<Urn> for BaseValue {
    fn from(value: Urn) -> Self {
        BaseValue::Urn(value)
    }
}

impl From<Tag> for BaseValue {
    fn from(value: Tag) -> Self {
        BaseValue::Tag(value)
    }
}

impl From<Vec<u8>> for BaseValue {
    fn from(value: Vec<u8>) -> Self {
        BaseValue::Blob(value)
    }
}

impl From<Pair> for BaseValue {
    fn from(value: Pair) -> Self {
        BaseValue::Pair(Box::new(value))
    }
}

impl From<Color> for BaseValue {
    fn from(value: Color) -> Self {
        BaseValue::Color(value)
    }
}

impl From<Geolocation> for BaseValue {
    fn from(value: Geolocation) -> Self {
        BaseValue::Geolocation(value)
    }
}

impl From<Predicate> for BaseValue {
    fn from(value: Predicate) -> Self {
        BaseValue::Predicate(Box::new(value))
    }
}

impl From<Vec<BaseValue>> for BaseValue {
    fn from(value: Vec<BaseValue>) -> Self {
        BaseValue::List(value)
    }
}

impl From<Dictionary> for BaseValue {
    fn from(value: Dictionary) -> Self {
        BaseValue::Dictionary(value)
    }
}

impl From<PackedState> for BaseValue {
    fn from(value: PackedState) -> Self {
        BaseValue::Packable(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PackableHeader;

    #[test]
    fn test_id_covers_every_variant() {
        let tag: Tag = "tag:bt.co,2019:null".parse().unwrap();
        let values = vec![
            BaseValue::Null,
            BaseValue::from(true),
            BaseValue::from(1),
            BaseValue::from(1.5),
            BaseValue::from(Utc::now()),
            BaseValue::from("s"),
            BaseValue::from("urn:isbn:1".parse::<Urn>().unwrap()),
            BaseValue::from(tag.clone()),
            BaseValue::from(vec![1u8, 2]),
            BaseValue::from(Pair::new("n", 1).unwrap()),
            BaseValue::from(Color::rgb(1, 2, 3)),
            BaseValue::from(Geolocation::new(1.0, 2.0, 3.0).unwrap()),
            BaseValue::from(Predicate::new(1, tag, 2).unwrap()),
            BaseValue::List(vec![]),
            BaseValue::Dictionary(Dictionary::new()),
            BaseValue::from(PackedState::new(PackableHeader::new("p").unwrap())),
        ];
        let ids: Vec<_> = values.iter().map(BaseValue::id).collect();
        let expected: Vec<_> = BaseTypeId::ALL
            .into_iter()
            .filter(|id| !id.is_end())
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_tryfrom_reports_ids() {
        assert_eq!(i64::try_from(BaseValue::Int(42)).unwrap(), 42);
        let err = i64::try_from(BaseValue::from("x")).unwrap_err();
        assert_eq!(err, Error::type_mismatch("int", "string"));
        assert!(bool::try_from(BaseValue::Int(1)).is_err());
        assert_eq!(f64::try_from(BaseValue::Float(2.5)).unwrap(), 2.5);
        assert_eq!(String::try_from(BaseValue::from("hi")).unwrap(), "hi");
    }

    #[test]
    fn test_scalar_split() {
        assert!(BaseValue::from(Color::rgb(0, 0, 0)).is_scalar());
        assert!(!BaseValue::List(vec![]).is_scalar());
        assert!(!BaseValue::from(Pair::new("a", 1).unwrap()).is_scalar());
    }

    #[test]
    fn test_storage_len() {
        assert_eq!(BaseValue::from("abc").storage_len(), Some(3));
        assert_eq!(BaseValue::from(vec![0u8; 10]).storage_len(), Some(10));
        assert_eq!(BaseValue::Int(5).storage_len(), None);
    }

    #[test]
    fn test_display() {
        let value = BaseValue::List(vec![BaseValue::from(1), BaseValue::from("a")]);
        assert_eq!(value.to_string(), "[1,\"a\"]");
    }
}
