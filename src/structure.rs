//! Fixed-arity structure base types: [`Pair`], [`Color`], [`Geolocation`] and
//! [`Predicate`].
//!
//! Each structure validates its fields when it is built, so a structure held in a
//! [`BaseValue`] is always valid. In the native bridge every structure is a tuple; the
//! `recognize_*` functions decide whether an already converted tuple matches one.

use crate::{BaseTypeId, BaseValue, Error, Result, Tag};
use serde::de::Error as _;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A named value. The name is never empty and the value is never itself a pair.
///
/// # Examples
///
/// ```rust
/// use basetypes::{BaseValue, Pair};
///
/// let pair = Pair::new("answer", 42).unwrap();
/// assert_eq!(pair.name(), "answer");
/// assert_eq!(pair.value().as_i64(), Some(42));
///
/// let nested = BaseValue::from(pair);
/// assert!(Pair::new("outer", nested).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Pair {
    name: String,
    value: BaseValue,
}

impl Pair {
    pub fn new(name: impl Into<String>, value: impl Into<BaseValue>) -> Result<Self> {
        let name = name.into();
        let value = value.into();

        if name.is_empty() {
            return Err(Error::key("pair name must not be empty"));
        }
        if value.id() == BaseTypeId::Pair {
            return Err(Error::type_mismatch("a non-pair value", BaseTypeId::Pair));
        }

        Ok(Pair { name, value })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &BaseValue {
        &self.value
    }

    #[must_use]
    pub fn into_parts(self) -> (String, BaseValue) {
        (self.name, self.value)
    }
}

impl Serialize for Pair {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.name)?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Pair {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (name, value) = <(String, BaseValue)>::deserialize(deserializer)?;
        Pair::new(name, value).map_err(D::Error::custom)
    }
}

/// An RGB color with optional alpha, hue, saturation and luminosity.
///
/// Red, green and blue are required. The optional channels are positional: supplying a
/// later channel means every earlier one is present in the tuple form, written as a
/// negative number when it was not supplied. Trailing channels that were not supplied
/// are left out, so [`Color::field_count`] is between 3 and 7.
///
/// # Examples
///
/// ```rust
/// use basetypes::Color;
///
/// let color = Color::rgb(255, 128, 0).with_saturation(0.5).unwrap();
/// assert_eq!(color.field_count(), 6);
/// assert_eq!(color.alpha(), None);
/// assert_eq!(color.saturation(), Some(0.5));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    red: u8,
    green: u8,
    blue: u8,
    optional: [Option<f64>; 4],
}

const ALPHA: usize = 0;
const HUE: usize = 1;
const SATURATION: usize = 2;
const LUMINOSITY: usize = 3;

/// Written in place of an optional color channel that was not supplied.
const NOT_SUPPLIED: f64 = -1.0;

impl Color {
    #[must_use]
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color {
            red,
            green,
            blue,
            optional: [None; 4],
        }
    }

    pub fn with_alpha(self, alpha: f64) -> Result<Self> {
        self.with_channel(ALPHA, "alpha", alpha)
    }

    pub fn with_hue(self, hue: f64) -> Result<Self> {
        self.with_channel(HUE, "hue", hue)
    }

    pub fn with_saturation(self, saturation: f64) -> Result<Self> {
        self.with_channel(SATURATION, "saturation", saturation)
    }

    pub fn with_luminosity(self, luminosity: f64) -> Result<Self> {
        self.with_channel(LUMINOSITY, "luminosity", luminosity)
    }

    fn with_channel(mut self, index: usize, field: &'static str, value: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(Error::invalid_field(
                "color",
                field,
                format!("{} is outside 0.0..=1.0", value),
            ));
        }
        self.optional[index] = Some(value);
        Ok(self)
    }

    #[must_use]
    pub fn red(&self) -> u8 {
        self.red
    }

    #[must_use]
    pub fn green(&self) -> u8 {
        self.green
    }

    #[must_use]
    pub fn blue(&self) -> u8 {
        self.blue
    }

    #[must_use]
    pub fn alpha(&self) -> Option<f64> {
        self.optional[ALPHA]
    }

    #[must_use]
    pub fn hue(&self) -> Option<f64> {
        self.optional[HUE]
    }

    #[must_use]
    pub fn saturation(&self) -> Option<f64> {
        self.optional[SATURATION]
    }

    #[must_use]
    pub fn luminosity(&self) -> Option<f64> {
        self.optional[LUMINOSITY]
    }

    /// Number of fields in the tuple form: 3 plus the position of the last supplied
    /// optional channel.
    #[must_use]
    pub fn field_count(&self) -> usize {
        let supplied = self
            .optional
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |last| last + 1);
        3 + supplied
    }

    fn optional_fields(&self) -> impl Iterator<Item = f64> + '_ {
        self.optional[..self.field_count() - 3]
            .iter()
            .map(|channel| channel.unwrap_or(NOT_SUPPLIED))
    }

    /// The tuple form as base values.
    pub(crate) fn members(&self) -> Vec<BaseValue> {
        let mut members = vec![
            BaseValue::Int(i64::from(self.red)),
            BaseValue::Int(i64::from(self.green)),
            BaseValue::Int(i64::from(self.blue)),
        ];
        members.extend(self.optional_fields().map(BaseValue::Float));
        members
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(self.field_count())?;
        tuple.serialize_element(&self.red)?;
        tuple.serialize_element(&self.green)?;
        tuple.serialize_element(&self.blue)?;
        for channel in self.optional_fields() {
            tuple.serialize_element(&channel)?;
        }
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let members = Vec::<BaseValue>::deserialize(deserializer)?;
        recognize_color(&members).ok_or_else(|| D::Error::custom("not a color tuple"))
    }
}

/// A position on the globe. Latitude is in `-90.0..=90.0`, longitude in
/// `-180.0..=180.0`, and altitude is metres above sea level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geolocation {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

impl Geolocation {
    /// # Examples
    ///
    /// ```rust
    /// use basetypes::Geolocation;
    ///
    /// assert!(Geolocation::new(51.5, -0.12, 11.0).is_ok());
    /// assert!(Geolocation::new(91.0, 0.0, 0.0).is_err());
    /// assert!(Geolocation::new(0.0, 0.0, f64::NAN).is_err());
    /// ```
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::invalid_field(
                "geolocation",
                "latitude",
                format!("{} is outside -90..=90", latitude),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::invalid_field(
                "geolocation",
                "longitude",
                format!("{} is outside -180..=180", longitude),
            ));
        }
        if !altitude.is_finite() {
            return Err(Error::invalid_field("geolocation", "altitude", "must be finite"));
        }

        Ok(Geolocation {
            latitude,
            longitude,
            altitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub fn altitude(&self) -> f64 {
        self.altitude
    }
}

impl Serialize for Geolocation {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.latitude, self.longitude, self.altitude).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Geolocation {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (latitude, longitude, altitude) = <(f64, f64, f64)>::deserialize(deserializer)?;
        Geolocation::new(latitude, longitude, altitude).map_err(D::Error::custom)
    }
}

/// An `(object, verb, subject)` statement. Object and subject are value or storage base
/// types; the verb is a tag.
///
/// # Examples
///
/// ```rust
/// use basetypes::{BaseValue, Predicate, Tag};
///
/// let verb: Tag = "tag:example.com,2019:likes".parse().unwrap();
/// let predicate = Predicate::new("alice", verb, "rust").unwrap();
/// assert_eq!(predicate.verb().specific(), "likes");
///
/// let verb: Tag = "tag:example.com,2019:likes".parse().unwrap();
/// assert!(Predicate::new(BaseValue::List(vec![]), verb, "rust").is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    object: BaseValue,
    verb: Tag,
    subject: BaseValue,
}

impl Predicate {
    pub fn new(
        object: impl Into<BaseValue>,
        verb: Tag,
        subject: impl Into<BaseValue>,
    ) -> Result<Self> {
        let object = object.into();
        let subject = subject.into();

        for (field, member) in [("object", &object), ("subject", &subject)] {
            if !member.id().is_value_or_storage() {
                return Err(Error::invalid_field(
                    "predicate",
                    field,
                    format!("expected a value or storage type, found {}", member.id()),
                ));
            }
        }

        Ok(Predicate {
            object,
            verb,
            subject,
        })
    }

    #[must_use]
    pub fn object(&self) -> &BaseValue {
        &self.object
    }

    #[must_use]
    pub fn verb(&self) -> &Tag {
        &self.verb
    }

    #[must_use]
    pub fn subject(&self) -> &BaseValue {
        &self.subject
    }
}

impl Serialize for Predicate {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.object)?;
        tuple.serialize_element(&self.verb)?;
        tuple.serialize_element(&self.subject)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (object, verb, subject) = <(BaseValue, Tag, BaseValue)>::deserialize(deserializer)?;
        Predicate::new(object, verb, subject).map_err(D::Error::custom)
    }
}

/// `(name, value)` with a non-empty string name and a non-pair value.
pub(crate) fn recognize_pair(members: &[BaseValue]) -> Option<Pair> {
    match members {
        [BaseValue::String(name), value] => Pair::new(name.clone(), value.clone()).ok(),
        _ => None,
    }
}

/// Three integer channels in `0..=255`, then up to four floats that are either in
/// `0.0..=1.0` or negative for "not supplied".
pub(crate) fn recognize_color(members: &[BaseValue]) -> Option<Color> {
    if !(3..=7).contains(&members.len()) {
        return None;
    }

    let channel = |member: &BaseValue| match member {
        BaseValue::Int(value) => u8::try_from(*value).ok(),
        _ => None,
    };
    let mut color = Color::rgb(
        channel(&members[0])?,
        channel(&members[1])?,
        channel(&members[2])?,
    );

    for (index, member) in members[3..].iter().enumerate() {
        match member {
            BaseValue::Float(value) if *value < 0.0 => {}
            BaseValue::Float(value) if *value <= 1.0 => color.optional[index] = Some(*value),
            _ => return None,
        }
    }

    Some(color)
}

pub(crate) fn recognize_geolocation(members: &[BaseValue]) -> Option<Geolocation> {
    match members {
        [BaseValue::Float(latitude), BaseValue::Float(longitude), BaseValue::Float(altitude)] => {
            Geolocation::new(*latitude, *longitude, *altitude).ok()
        }
        _ => None,
    }
}

pub(crate) fn recognize_predicate(members: &[BaseValue]) -> Option<Predicate> {
    match members {
        [object, BaseValue::Tag(verb), subject] => {
            Predicate::new(object.clone(), verb.clone(), subject.clone()).ok()
        }
        _ => None,
    }
}
