//! Uniform resource names, `urn:<nid>:<nss>`.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated URN storage value.
///
/// The scheme is matched case-insensitively and normalised to lowercase; the namespace
/// identifier must be 1-32 alphanumerics or hyphens and may not start with a hyphen;
/// the namespace-specific string must be non-empty.
///
/// # Examples
///
/// ```rust
/// use basetypes::Urn;
///
/// let urn: Urn = "URN:isbn:0451450523".parse().unwrap();
/// assert_eq!(urn.nid(), "isbn");
/// assert_eq!(urn.nss(), "0451450523");
/// assert_eq!(urn.to_string(), "urn:isbn:0451450523");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Urn {
    nid: String,
    nss: String,
}

impl Urn {
    /// Creates a URN from its namespace identifier and namespace-specific string.
    pub fn new(nid: impl Into<String>, nss: impl Into<String>) -> Result<Self> {
        let nid = nid.into();
        let nss = nss.into();
        let text = format!("urn:{}:{}", nid, nss);

        if nid.is_empty() || nid.len() > 32 {
            return Err(Error::malformed_urn(&text, "namespace identifier must be 1-32 characters"));
        }
        if nid.starts_with('-') || !nid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::malformed_urn(&text, "invalid namespace identifier"));
        }
        if nss.is_empty() {
            return Err(Error::malformed_urn(&text, "empty namespace-specific string"));
        }

        Ok(Urn { nid, nss })
    }

    #[must_use]
    pub fn nid(&self) -> &str {
        &self.nid
    }

    #[must_use]
    pub fn nss(&self) -> &str {
        &self.nss
    }
}

impl FromStr for Urn {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let mut parts = input.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(nid), Some(nss)) if scheme.eq_ignore_ascii_case("urn") => {
                Urn::new(nid, nss)
            }
            _ => Err(Error::malformed_urn(input, "expected 'urn:<nid>:<nss>'")),
        }
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "urn:{}:{}", self.nid, self.nss)
    }
}

impl Serialize for Urn {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(crate::ser::URN_TOKEN, &self.to_string())
    }
}

impl<'de> Deserialize<'de> for Urn {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
