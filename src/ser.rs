//! Native value classification.
//!
//! [`ValueSerializer`] converts any `T: Serialize` into a [`BaseValue`] tree, and in
//! doing so decides whether the native value is a base type at all. The serde data
//! model maps onto base types as follows:
//!
//! | serde | base type |
//! |---|---|
//! | unit, `None` | Null |
//! | `bool` | Bool |
//! | integers that fit `i64` | Int |
//! | `f32`, `f64` | Float |
//! | `char`, `str` | String |
//! | bytes | Blob |
//! | sequence | List |
//! | map, struct | Dictionary |
//! | tuple, tuple struct | Pair, Color, Geolocation or Predicate when the members match, otherwise List |
//!
//! `Some(x)` and newtype structs are transparent. Unit structs, enum variants and
//! integers outside `i64` are not base types, and neither is any tree that contains one.
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{classify, is_valid, to_value, BaseTypeId, BaseValue};
//! use std::collections::BTreeMap;
//!
//! assert_eq!(classify(&(255u8, 128u8, 0u8)), Some(BaseTypeId::Color));
//! assert_eq!(classify(&("name", 1)), Some(BaseTypeId::Pair));
//! assert_eq!(classify(&vec![1, 2, 3]), Some(BaseTypeId::List));
//!
//! let mut bad = BTreeMap::new();
//! bad.insert(1, "bad key");
//! assert!(!is_valid(&bad));
//! ```

use crate::packed::packed_from_dictionary;
use crate::structure::{recognize_color, recognize_geolocation, recognize_pair, recognize_predicate};
use crate::{BaseTypeId, BaseValue, Dictionary, Error, Result, Tag, Urn};
use chrono::{DateTime, Utc};
use serde::{ser, Serialize};

pub(crate) const TAG_TOKEN: &str = "$basetypes::private::Tag";
pub(crate) const URN_TOKEN: &str = "$basetypes::private::Urn";
pub(crate) const DATETIME_TOKEN: &str = "$basetypes::private::DateTime";
pub(crate) const PACKABLE_TOKEN: &str = "$basetypes::private::Packable";

/// A serde `Serializer` whose output is a [`BaseValue`].
///
/// Pairs are only recognized where a pair may appear: at the top level and as list
/// members. A two-member tuple in a dictionary value, pair value or packable property
/// becomes a two-member list instead, so `("outer", ("n", 1))` is a pair whose value
/// is the list `["n", 1]`.
#[derive(Clone, Copy, Debug)]
pub struct ValueSerializer {
    pair_allowed: bool,
}

impl ValueSerializer {
    #[must_use]
    pub fn new() -> Self {
        ValueSerializer { pair_allowed: true }
    }

    fn keyed() -> Self {
        ValueSerializer {
            pair_allowed: false,
        }
    }
}

impl Default for ValueSerializer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SerializeVec {
    vec: Vec<BaseValue>,
}

pub struct SerializeTuple {
    members: Vec<BaseValue>,
    len: usize,
    pair_allowed: bool,
}

pub struct SerializeMap {
    map: Dictionary,
    current_key: Option<String>,
}

/// Placeholder for the enum-variant serializers; never constructed because every enum
/// variant is rejected up front.
pub enum Impossible {}

fn int_from<T>(value: T, kind: &str) -> Result<BaseValue>
where
    T: TryInto<i64> + std::fmt::Display + Copy,
{
    value
        .try_into()
        .map(BaseValue::Int)
        .map_err(|_| Error::unknown_type(format!("{} {} does not fit an int", kind, value)))
}

fn string_payload<T>(value: &T, what: &str) -> Result<String>
where
    T: ?Sized + Serialize,
{
    match value.serialize(ValueSerializer::keyed())? {
        BaseValue::String(text) => Ok(text),
        other => Err(Error::type_mismatch(format!("{} text", what), other.id())),
    }
}

impl ser::Serializer for ValueSerializer {
    type Ok = BaseValue;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeTuple;
    type SerializeTupleStruct = SerializeTuple;
    type SerializeTupleVariant = Impossible;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = Impossible;

    fn serialize_bool(self, v: bool) -> Result<BaseValue> {
        Ok(BaseValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<BaseValue> {
        Ok(BaseValue::Int(i64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<BaseValue> {
        Ok(BaseValue::Int(i64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<BaseValue> {
        Ok(BaseValue::Int(i64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<BaseValue> {
        Ok(BaseValue::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<BaseValue> {
        int_from(v, "integer")
    }

    fn serialize_u8(self, v: u8) -> Result<BaseValue> {
        Ok(BaseValue::Int(i64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<BaseValue> {
        Ok(BaseValue::Int(i64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<BaseValue> {
        Ok(BaseValue::Int(i64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<BaseValue> {
        int_from(v, "unsigned integer")
    }

    fn serialize_u128(self, v: u128) -> Result<BaseValue> {
        int_from(v, "unsigned integer")
    }

    fn serialize_f32(self, v: f32) -> Result<BaseValue> {
        Ok(BaseValue::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<BaseValue> {
        Ok(BaseValue::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<BaseValue> {
        Ok(BaseValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<BaseValue> {
        Ok(BaseValue::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<BaseValue> {
        Ok(BaseValue::Blob(v.to_vec()))
    }

    fn serialize_none(self) -> Result<BaseValue> {
        Ok(BaseValue::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<BaseValue>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<BaseValue> {
        Ok(BaseValue::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<BaseValue> {
        Err(Error::unknown_type(format!("unit struct {}", name)))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<BaseValue> {
        Err(Error::unknown_type(format!("enum variant {}::{}", name, variant)))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<BaseValue>
    where
        T: ?Sized + Serialize,
    {
        match name {
            TAG_TOKEN => Ok(BaseValue::Tag(string_payload(value, "tag")?.parse::<Tag>()?)),
            URN_TOKEN => Ok(BaseValue::Urn(string_payload(value, "urn")?.parse::<Urn>()?)),
            DATETIME_TOKEN => {
                let text = string_payload(value, "datetime")?;
                let parsed = DateTime::parse_from_rfc3339(&text)
                    .map_err(|err| Error::custom(format!("invalid datetime '{}': {}", text, err)))?;
                Ok(BaseValue::DateTime(parsed.with_timezone(&Utc)))
            }
            PACKABLE_TOKEN => match value.serialize(ValueSerializer::keyed())? {
                BaseValue::Dictionary(dict) => Ok(BaseValue::Packable(packed_from_dictionary(dict)?)),
                other => Err(Error::type_mismatch(BaseTypeId::Packable, other.id())),
            },
            _ => value.serialize(self),
        }
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<BaseValue>
    where
        T: ?Sized + Serialize,
    {
        Err(Error::unknown_type(format!("enum variant {}::{}", name, variant)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec {
            vec: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeTuple> {
        Ok(SerializeTuple {
            members: Vec::with_capacity(len),
            len,
            pair_allowed: self.pair_allowed,
        })
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeTuple> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Impossible> {
        Err(Error::unknown_type(format!("enum variant {}::{}", name, variant)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap {
            map: Dictionary::with_capacity(len.unwrap_or(0)),
            current_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeMap> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Impossible> {
        Err(Error::unknown_type(format!("enum variant {}::{}", name, variant)))
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = BaseValue;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(value.serialize(ValueSerializer::new())?);
        Ok(())
    }

    fn end(self) -> Result<BaseValue> {
        Ok(BaseValue::List(self.vec))
    }
}

impl SerializeTuple {
    /// `true` when the next member would be the value of a recognizable pair.
    fn at_pair_value(&self) -> bool {
        self.pair_allowed
            && self.len == 2
            && matches!(self.members.as_slice(), [BaseValue::String(name)] if !name.is_empty())
    }

    /// Runs the structure recognizers over the collected members, in order.
    fn recognize(self) -> BaseValue {
        if self.pair_allowed {
            if let Some(pair) = recognize_pair(&self.members) {
                return BaseValue::from(pair);
            }
        }
        if let Some(color) = recognize_color(&self.members) {
            return BaseValue::Color(color);
        }
        if let Some(geolocation) = recognize_geolocation(&self.members) {
            return BaseValue::Geolocation(geolocation);
        }
        if let Some(predicate) = recognize_predicate(&self.members) {
            return BaseValue::from(predicate);
        }
        BaseValue::List(self.members)
    }
}

impl ser::SerializeTuple for SerializeTuple {
    type Ok = BaseValue;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let serializer = if self.at_pair_value() {
            ValueSerializer::keyed()
        } else {
            ValueSerializer::new()
        };
        self.members.push(value.serialize(serializer)?);
        Ok(())
    }

    fn end(self) -> Result<BaseValue> {
        Ok(self.recognize())
    }
}

impl ser::SerializeTupleStruct for SerializeTuple {
    type Ok = BaseValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeTuple::serialize_element(self, value)
    }

    fn end(self) -> Result<BaseValue> {
        Ok(self.recognize())
    }
}

impl ser::SerializeTupleVariant for Impossible {
    type Ok = BaseValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, _value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match *self {}
    }

    fn end(self) -> Result<BaseValue> {
        match self {}
    }
}

impl ser::SerializeStructVariant for Impossible {
    type Ok = BaseValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, _key: &'static str, _value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match *self {}
    }

    fn end(self) -> Result<BaseValue> {
        match self {}
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = BaseValue;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match value_of(key) {
            Ok(BaseValue::String(s)) => {
                self.current_key = Some(s);
                Ok(())
            }
            Ok(other) => Err(Error::key(format!(
                "dictionary keys must be strings, found {}",
                other.id()
            ))),
            Err(err) => Err(Error::key(format!("dictionary key is not a base type: {}", err))),
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.map.insert(key, value.serialize(ValueSerializer::keyed())?)
    }

    fn end(self) -> Result<BaseValue> {
        Ok(BaseValue::Dictionary(self.map))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = BaseValue;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.map.insert(key, value.serialize(ValueSerializer::keyed())?)
    }

    fn end(self) -> Result<BaseValue> {
        Ok(BaseValue::Dictionary(self.map))
    }
}

fn value_of<T: Serialize + ?Sized>(value: &T) -> Result<BaseValue> {
    value.serialize(ValueSerializer::new())
}
