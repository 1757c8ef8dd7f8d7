//! Insertion-ordered dictionary base type.
//!
//! [`Dictionary`] wraps an [`IndexMap`] so entries iterate, and stream, in the order
//! they were inserted. Unlike a plain map it is a list of uniquely named pairs: keys
//! are non-empty, values are never pairs, and inserting an existing key is a key error
//! rather than a silent overwrite.
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{BaseValue, Dictionary};
//!
//! let mut dict = Dictionary::new();
//! dict.insert("name", "Alice").unwrap();
//! dict.insert("age", 30).unwrap();
//!
//! assert_eq!(dict.len(), 2);
//! assert_eq!(dict.get("name").and_then(|v| v.as_str()), Some("Alice"));
//! assert!(dict.insert("age", 31).is_err());
//! ```

use crate::{BaseTypeId, BaseValue, Error, Result};
use indexmap::IndexMap;
use serde::de::{self, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An ordered collection of uniquely named base-type values.
///
/// # Examples
///
/// ```rust
/// use basetypes::{BaseValue, Dictionary};
///
/// let dict = Dictionary::from_pairs(vec![
///     ("first".to_string(), BaseValue::from(1)),
///     ("second".to_string(), BaseValue::from(2)),
/// ])
/// .unwrap();
///
/// let keys: Vec<_> = dict.keys().cloned().collect();
/// assert_eq!(keys, vec!["first", "second"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary(IndexMap<String, BaseValue>);

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Dictionary(IndexMap::with_capacity(capacity))
    }

    /// Builds a dictionary from `(name, value)` entries, failing on the first entry
    /// [`Dictionary::insert`] would reject.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, BaseValue)>,
    {
        let mut dict = Dictionary::new();
        for (key, value) in pairs {
            dict.insert(key, value)?;
        }
        Ok(dict)
    }

    /// Appends an entry.
    ///
    /// Fails with [`Error::Key`] when the key is empty or already present, and with
    /// [`Error::Type`] when the value is a pair. A failed insert leaves the dictionary
    /// unchanged.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<BaseValue>) -> Result<()> {
        let key = key.into();
        let value = value.into();

        if key.is_empty() {
            return Err(Error::key("dictionary keys must not be empty"));
        }
        if self.0.contains_key(&key) {
            return Err(Error::key(format!("duplicate dictionary key '{}'", key)));
        }
        if value.id() == BaseTypeId::Pair {
            return Err(Error::type_mismatch("a non-pair value", BaseTypeId::Pair));
        }

        self.0.insert(key, value);
        Ok(())
    }

    /// Removes an entry, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<BaseValue> {
        self.0.shift_remove(key)
    }

    /// Keeps the first `len` entries.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&BaseValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, BaseValue> {
        self.0.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, BaseValue> {
        self.0.values()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, BaseValue> {
        self.0.iter()
    }
}

impl IntoIterator for Dictionary {
    type Item = (String, BaseValue);
    type IntoIter = indexmap::map::IntoIter<String, BaseValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a String, &'a BaseValue);
    type IntoIter = indexmap::map::Iter<'a, String, BaseValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl TryFrom<Vec<(String, BaseValue)>> for Dictionary {
    type Error = Error;

    fn try_from(pairs: Vec<(String, BaseValue)>) -> Result<Self> {
        Dictionary::from_pairs(pairs)
    }
}

impl Serialize for Dictionary {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Dictionary {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DictionaryVisitor;

        impl<'de> Visitor<'de> for DictionaryVisitor {
            type Value = Dictionary;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map with unique, non-empty string keys")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Dictionary, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut dict = Dictionary::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, BaseValue>()? {
                    dict.insert(key, value).map_err(de::Error::custom)?;
                }
                Ok(dict)
            }
        }

        deserializer.deserialize_map(DictionaryVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pair;

    #[test]
    fn test_insert_rejections_leave_map_unchanged() {
        let mut dict = Dictionary::new();
        dict.insert("a", 1).unwrap();

        assert!(matches!(dict.insert("", 2), Err(Error::Key(_))));
        assert!(matches!(dict.insert("a", 2), Err(Error::Key(_))));

        let pair = BaseValue::from(Pair::new("p", 1).unwrap());
        assert!(matches!(dict.insert("b", pair), Err(Error::Type { .. })));

        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get("a"), Some(&BaseValue::Int(1)));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut dict = Dictionary::new();
        for key in ["a", "b", "c"] {
            dict.insert(key, key).unwrap();
        }
        assert_eq!(dict.remove("b"), Some(BaseValue::from("b")));
        let keys: Vec<_> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_from_pairs_rejects_duplicates() {
        let result = Dictionary::from_pairs(vec![
            ("x".to_string(), BaseValue::Null),
            ("x".to_string(), BaseValue::Null),
        ]);
        assert!(matches!(result, Err(Error::Key(_))));
    }
}
