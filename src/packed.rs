//! Packable headers and the code-free [`PackedState`] representation.

use crate::{Dictionary, Error, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The payload of a packable start token.
///
/// `state_id` names the state design (recommended to be a tag or other namespaced URI),
/// `version` optionally distinguishes revisions of that design, and `hints` carries
/// producer-supplied options for the consumer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PackableHeader {
    state_id: String,
    version: Option<String>,
    hints: Dictionary,
}

impl PackableHeader {
    /// # Examples
    ///
    /// ```rust
    /// use basetypes::PackableHeader;
    ///
    /// let header = PackableHeader::new("tag:example.com,2019:point")
    ///     .unwrap()
    ///     .with_version("2");
    /// assert_eq!(header.state_id(), "tag:example.com,2019:point");
    /// assert_eq!(header.version(), Some("2"));
    /// assert!(PackableHeader::new("").is_err());
    /// ```
    pub fn new(state_id: impl Into<String>) -> Result<Self> {
        let state_id = state_id.into();
        if state_id.is_empty() {
            return Err(Error::invalid_field("packable", "state_id", "must not be empty"));
        }
        Ok(PackableHeader {
            state_id,
            version: None,
            hints: Dictionary::new(),
        })
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_hints(mut self, hints: Dictionary) -> Self {
        self.hints = hints;
        self
    }

    #[must_use]
    pub fn state_id(&self) -> &str {
        &self.state_id
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    #[must_use]
    pub fn hints(&self) -> &Dictionary {
        &self.hints
    }
}

#[derive(Deserialize)]
struct HeaderFields {
    state_id: String,
    version: Option<String>,
    hints: Dictionary,
}

impl<'de> Deserialize<'de> for PackableHeader {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = HeaderFields::deserialize(deserializer)?;
        let mut header = PackableHeader::new(fields.state_id)
            .map_err(D::Error::custom)?
            .with_hints(fields.hints);
        header.version = fields.version;
        Ok(header)
    }
}

/// The state of any packable as plain data: its header plus its named properties.
///
/// A `PackedState` can be built from any stream without running the producer's code,
/// which makes it the safe landing type for untrusted input.
///
/// # Examples
///
/// ```rust
/// use basetypes::{PackableHeader, PackedState};
///
/// let mut state = PackedState::new(PackableHeader::new("point").unwrap());
/// state.set("x", 3).unwrap();
/// state.set("y", 4).unwrap();
///
/// assert_eq!(state.state_id(), "point");
/// assert_eq!(state.get("y").and_then(|v| v.as_i64()), Some(4));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PackedState {
    header: PackableHeader,
    properties: Dictionary,
}

impl PackedState {
    #[must_use]
    pub fn new(header: PackableHeader) -> Self {
        PackedState {
            header,
            properties: Dictionary::new(),
        }
    }

    #[must_use]
    pub fn from_parts(header: PackableHeader, properties: Dictionary) -> Self {
        PackedState { header, properties }
    }

    /// Adds a property. Property names follow the same rules as dictionary keys.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<crate::BaseValue>) -> Result<()> {
        self.properties.insert(name, value)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&crate::BaseValue> {
        self.properties.get(name)
    }

    #[must_use]
    pub fn header(&self) -> &PackableHeader {
        &self.header
    }

    #[must_use]
    pub fn state_id(&self) -> &str {
        self.header.state_id()
    }

    #[must_use]
    pub fn properties(&self) -> &Dictionary {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut Dictionary {
        &mut self.properties
    }

    #[must_use]
    pub fn into_parts(self) -> (PackableHeader, Dictionary) {
        (self.header, self.properties)
    }
}

#[derive(Serialize)]
struct PackedRef<'a> {
    header: &'a PackableHeader,
    properties: &'a Dictionary,
}

#[derive(Deserialize)]
struct PackedOwned {
    header: PackableHeader,
    properties: Dictionary,
}

impl Serialize for PackedState {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(
            crate::ser::PACKABLE_TOKEN,
            &PackedRef {
                header: &self.header,
                properties: &self.properties,
            },
        )
    }
}

impl<'de> Deserialize<'de> for PackedState {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let owned = PackedOwned::deserialize(deserializer)?;
        Ok(PackedState::from_parts(owned.header, owned.properties))
    }
}

/// Rebuilds a packed state from the dictionary its serialized form converts to.
pub(crate) fn packed_from_dictionary(mut dict: Dictionary) -> Result<PackedState> {
    use crate::BaseValue;

    let properties = match dict.remove("properties") {
        Some(BaseValue::Dictionary(properties)) => properties,
        other => return Err(packed_field_error("properties", other.as_ref())),
    };
    let mut header = match dict.remove("header") {
        Some(BaseValue::Dictionary(header)) => header,
        other => return Err(packed_field_error("header", other.as_ref())),
    };

    let state_id = match header.remove("state_id") {
        Some(BaseValue::String(state_id)) => state_id,
        other => return Err(packed_field_error("state_id", other.as_ref())),
    };
    let version = match header.remove("version") {
        Some(BaseValue::String(version)) => Some(version),
        Some(BaseValue::Null) | None => None,
        Some(other) => return Err(packed_field_error("version", Some(&other))),
    };
    let hints = match header.remove("hints") {
        Some(BaseValue::Dictionary(hints)) => hints,
        None => Dictionary::new(),
        Some(other) => return Err(packed_field_error("hints", Some(&other))),
    };

    let mut header = PackableHeader::new(state_id)?.with_hints(hints);
    header.version = version;
    Ok(PackedState::from_parts(header, properties))
}

fn packed_field_error(field: &'static str, found: Option<&crate::BaseValue>) -> Error {
    let found = found.map_or_else(|| "nothing".to_string(), |value| value.id().to_string());
    Error::invalid_field("packable", field, format!("unexpected {}", found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BaseValue;

    #[test]
    fn test_duplicate_property_rejected() {
        let mut state = PackedState::new(PackableHeader::new("thing").unwrap());
        state.set("a", 1).unwrap();
        assert!(matches!(state.set("a", 2), Err(Error::Key(_))));
        assert_eq!(state.properties().len(), 1);
    }

    #[test]
    fn test_packed_from_dictionary() {
        let mut header = Dictionary::new();
        header.insert("state_id", "thing").unwrap();
        header.insert("version", "1").unwrap();
        let mut props = Dictionary::new();
        props.insert("x", 1).unwrap();
        let mut dict = Dictionary::new();
        dict.insert("header", header).unwrap();
        dict.insert("properties", props).unwrap();

        let state = packed_from_dictionary(dict).unwrap();
        assert_eq!(state.state_id(), "thing");
        assert_eq!(state.header().version(), Some("1"));
        assert_eq!(state.get("x"), Some(&BaseValue::Int(1)));
    }

    #[test]
    fn test_packed_from_dictionary_missing_header() {
        let mut dict = Dictionary::new();
        dict.insert("properties", Dictionary::new()).unwrap();
        assert!(matches!(
            packed_from_dictionary(dict),
            Err(Error::InvalidField { field: "header", .. })
        ));
    }

    #[test]
    fn test_header_deserialize_validates_state_id() {
        let header: PackableHeader =
            crate::from_value(crate::base!({"state_id": "thing", "version": "2", "hints": {}})).unwrap();
        assert_eq!(header.state_id(), "thing");
        assert_eq!(header.version(), Some("2"));

        let empty = crate::from_value::<PackableHeader>(crate::base!({"state_id": "", "hints": {}}));
        assert!(empty.is_err());

        let json = r#"{"header": {"state_id": "", "version": null, "hints": {}}, "properties": {}}"#;
        assert!(serde_json::from_str::<PackedState>(json).is_err());
    }
}
