//! Rebuilding native values from base values.
//!
//! [`from_value`] is the inverse of [`to_value`](crate::to_value) for ordinary serde
//! types. It drives a `T: Deserialize` from a [`BaseValue`] tree:
//!
//! - structures (pair, color, geolocation, predicate) are presented as sequences of
//!   their members, in tuple order
//! - tags, URNs and datetimes are presented as their text form
//! - blobs are presented as byte buffers
//! - a packable is presented as a map with `header` and `properties` entries
//!
//! Enums use the externally tagged form: a string for a unit variant, or a dictionary
//! with a single entry for the others.
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{from_value, to_value};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Swatch {
//!     name: String,
//!     rgb: (u8, u8, u8),
//! }
//!
//! let swatch = Swatch { name: "orange".into(), rgb: (255, 128, 0) };
//! let value = to_value(&swatch).unwrap();
//! assert_eq!(from_value::<Swatch>(value).unwrap(), swatch);
//! ```

use crate::{BaseValue, Dictionary, Error, Result};
use serde::de::{self, IntoDeserializer};
use serde::forward_to_deserialize_any;

/// Deserializes a `T` from a base value.
///
/// # Errors
///
/// Fails when the shape of `value` does not match what `T` expects.
pub fn from_value<T>(value: BaseValue) -> Result<T>
where
    T: de::DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<BaseValue>,
}

impl SeqDeserializer {
    fn new(vec: Vec<BaseValue>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, BaseValue>,
    value: Option<BaseValue>,
}

impl MapDeserializer {
    fn new(map: Dictionary) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ValueDeserializer::new(BaseValue::String(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<BaseValue>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ValueDeserializer::new(BaseValue::String(self.variant)))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<BaseValue>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Some(BaseValue::Null) | None => Ok(()),
            Some(other) => Err(Error::type_mismatch("unit variant", other.id())),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::type_mismatch("newtype variant", "unit variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(value) => de::Deserializer::deserialize_seq(ValueDeserializer::new(value), visitor),
            None => Err(Error::type_mismatch("tuple variant", "unit variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(BaseValue::Dictionary(dict)) => visitor.visit_map(MapDeserializer::new(dict)),
            Some(other) => Err(Error::type_mismatch("struct variant", other.id())),
            None => Err(Error::type_mismatch("struct variant", "unit variant")),
        }
    }
}

/// Presents one base value to a serde visitor.
struct ValueDeserializer {
    value: BaseValue,
}

impl ValueDeserializer {
    fn new(value: BaseValue) -> Self {
        ValueDeserializer { value }
    }
}

fn seq_of<'de, V>(members: Vec<BaseValue>, visitor: V) -> Result<V::Value>
where
    V: de::Visitor<'de>,
{
    visitor.visit_seq(SeqDeserializer::new(members))
}

fn packed_entries(state: crate::PackedState) -> Result<Dictionary> {
    let (header, properties) = state.into_parts();
    let mut header_dict = Dictionary::new();
    header_dict.insert("state_id", header.state_id())?;
    if let Some(version) = header.version() {
        header_dict.insert("version", version)?;
    }
    header_dict.insert("hints", header.hints().clone())?;

    let mut dict = Dictionary::with_capacity(2);
    dict.insert("header", header_dict)?;
    dict.insert("properties", properties)?;
    Ok(dict)
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            BaseValue::Null => visitor.visit_unit(),
            BaseValue::Bool(b) => visitor.visit_bool(b),
            BaseValue::Int(i) => visitor.visit_i64(i),
            BaseValue::Float(f) => visitor.visit_f64(f),
            BaseValue::DateTime(dt) => visitor.visit_string(dt.to_rfc3339()),
            BaseValue::String(s) => visitor.visit_string(s),
            BaseValue::Urn(urn) => visitor.visit_string(urn.to_string()),
            BaseValue::Tag(tag) => visitor.visit_string(tag.to_string()),
            BaseValue::Blob(bytes) => visitor.visit_byte_buf(bytes),
            BaseValue::List(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            BaseValue::Dictionary(dict) => visitor.visit_map(MapDeserializer::new(dict)),
            BaseValue::Packable(state) => visitor.visit_map(MapDeserializer::new(packed_entries(state)?)),
            BaseValue::Pair(pair) => {
                let (name, value) = pair.into_parts();
                seq_of(vec![BaseValue::String(name), value], visitor)
            }
            BaseValue::Color(color) => seq_of(color.members(), visitor),
            BaseValue::Geolocation(geo) => seq_of(
                vec![
                    BaseValue::Float(geo.latitude()),
                    BaseValue::Float(geo.longitude()),
                    BaseValue::Float(geo.altitude()),
                ],
                visitor,
            ),
            BaseValue::Predicate(predicate) => seq_of(
                vec![
                    predicate.object().clone(),
                    BaseValue::Tag(predicate.verb().clone()),
                    predicate.subject().clone(),
                ],
                visitor,
            ),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            BaseValue::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            BaseValue::String(s) => visitor.visit_enum(s.into_deserializer()),
            BaseValue::Dictionary(dict) if dict.len() == 1 => {
                let mut entries = dict.into_iter();
                match entries.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer {
                        variant,
                        value: Some(value),
                    }),
                    None => Err(Error::type_mismatch("enum variant", "empty dictionary")),
                }
            }
            other => Err(Error::type_mismatch("enum", other.id())),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier
    }
}
