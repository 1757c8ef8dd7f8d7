//! RFC 4151 `tag:` URIs.
//!
//! Tags name base-type identities and packable state designs, and are a storage base
//! type in their own right. The grammar is
//! `tag:<authority>,<date>:<specific>[#<fragment>]` where `<date>` is `YYYY`,
//! `YYYY-MM` or `YYYY-MM-DD`.
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::Tag;
//!
//! let tag: Tag = "tag:bt.co,2019-04:null#frag".parse().unwrap();
//! assert_eq!(tag.fragment(), Some("frag"));
//! assert_eq!(tag.date_string(), "2019-4");
//! assert_eq!(tag.to_string(), "tag:bt.co,2019-4:null#frag");
//! ```
//!
//! See also: <https://taguri.org/>

use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A parsed RFC 4151 tag URI.
///
/// Constructed either by parsing (`"tag:...".parse::<Tag>()`) or from discrete fields
/// with [`Tag::new`]. Displaying a tag always produces its canonical form, using the
/// shortest date representation that parses back to the same date.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    authority: String,
    date: NaiveDate,
    specific: String,
    fragment: Option<String>,
}

impl Tag {
    /// Creates a tag from its fields.
    ///
    /// Fails with [`Error::MalformedTag`] when a field contains a character that would
    /// change how the canonical string splits (`:` or `,` in the authority, `:` or `#`
    /// in the specific part), or when the year needs more than four digits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use basetypes::Tag;
    /// use chrono::NaiveDate;
    ///
    /// let date = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    /// let tag = Tag::new("bt.co", date, "null").unwrap();
    /// assert_eq!(tag.to_string(), "tag:bt.co,2019:null");
    /// ```
    pub fn new(authority: impl Into<String>, date: NaiveDate, specific: impl Into<String>) -> Result<Self> {
        let authority = authority.into();
        let specific = specific.into();

        if authority.contains(|c: char| c == ':' || c == ',') {
            return Err(Error::malformed_tag(&authority, "authority contains ':' or ','"));
        }
        if specific.contains(|c: char| c == ':' || c == '#') {
            return Err(Error::malformed_tag(&specific, "specific contains ':' or '#'"));
        }
        if !(0..=9999).contains(&date.year()) {
            return Err(Error::malformed_tag(&date.to_string(), "year must have four digits"));
        }

        Ok(Tag {
            authority,
            date,
            specific,
            fragment: None,
        })
    }

    /// Creates a tag dated January 1st of the current (UTC) year.
    pub fn for_current_year(authority: impl Into<String>, specific: impl Into<String>) -> Result<Self> {
        let year = Utc::now().year();
        let date = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| Error::malformed_tag(&year.to_string(), "year out of range"))?;
        Tag::new(authority, date, specific)
    }

    /// Returns a copy of this tag with the given fragment.
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Result<Self> {
        let fragment = fragment.into();
        if fragment.contains(|c: char| c == ':' || c == '#') {
            return Err(Error::malformed_tag(&fragment, "fragment contains ':' or '#'"));
        }
        self.fragment = Some(fragment);
        Ok(self)
    }

    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn specific(&self) -> &str {
        &self.specific
    }

    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Returns the shortest date text that parses back to this tag's date.
    ///
    /// January 1st is written as the year alone, the first of any other month as
    /// `year-month`, and every other day in full. Month and day are not zero padded.
    #[must_use]
    pub fn date_string(&self) -> String {
        let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());
        if day == 1 {
            if month == 1 {
                format!("{:04}", year)
            } else {
                format!("{:04}-{}", year, month)
            }
        } else {
            format!("{:04}-{}-{}", year, month, day)
        }
    }

    /// Returns the tagging entity, `authority,date`.
    #[must_use]
    pub fn tagging_entity(&self) -> String {
        format!("{},{}", self.authority, self.date_string())
    }
}

/// Parses `YYYY-MM-DD`, then `YYYY-MM`, then `YYYY`; the first form that matches wins.
fn parse_date(text: &str) -> Option<NaiveDate> {
    fn digits(part: &str, min: usize, max: usize) -> Option<u32> {
        if part.len() < min || part.len() > max || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    }

    let parts: Vec<&str> = text.split('-').collect();
    let year = digits(parts.first()?, 4, 4)? as i32;
    match parts.as_slice() {
        [_, month, day] => NaiveDate::from_ymd_opt(year, digits(month, 1, 2)?, digits(day, 1, 2)?),
        [_, month] => NaiveDate::from_ymd_opt(year, digits(month, 1, 2)?, 1),
        [_] => NaiveDate::from_ymd_opt(year, 1, 1),
        _ => None,
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let colon_split: Vec<&str> = input.split(':').collect();
        if colon_split.len() != 3 || !colon_split[0].eq_ignore_ascii_case("tag") {
            return Err(Error::malformed_tag(input, "expected 'tag:<entity>:<specific>'"));
        }

        let comma_split: Vec<&str> = colon_split[1].split(',').collect();
        if comma_split.len() != 2 {
            return Err(Error::malformed_tag(input, "tagging entity"));
        }
        let date = parse_date(comma_split[1]).ok_or_else(|| Error::malformed_tag(input, "date"))?;

        let hash_split: Vec<&str> = colon_split[2].split('#').collect();
        let (specific, fragment) = match hash_split.as_slice() {
            [specific] => (*specific, None),
            [specific, fragment] => (*specific, Some(fragment.to_string())),
            _ => return Err(Error::malformed_tag(input, "fragment")),
        };

        Ok(Tag {
            authority: comma_split[0].to_string(),
            date,
            specific: specific.to_string(),
            fragment,
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag:{}:{}", self.tagging_entity(), self.specific)?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

impl Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(crate::ser::TAG_TOKEN, &self.to_string())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_only_round_trip() {
        let tag: Tag = "tag:bt.co,2019:null".parse().unwrap();
        assert_eq!(tag.authority(), "bt.co");
        assert_eq!(tag.date(), NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
        assert_eq!(tag.specific(), "null");
        assert_eq!(tag.fragment(), None);
        assert_eq!(tag.to_string(), "tag:bt.co,2019:null");
    }

    #[test]
    fn test_year_month_with_fragment() {
        let tag: Tag = "tag:bt.co,2019-04:null#frag".parse().unwrap();
        assert_eq!(tag.fragment(), Some("frag"));
        assert_eq!(tag.date_string(), "2019-4");
        assert_eq!(tag.to_string(), "tag:bt.co,2019-4:null#frag");
    }

    #[test]
    fn test_full_date() {
        let tag: Tag = "TAG:example.com,2001-12-25:xmas".parse().unwrap();
        assert_eq!(tag.date_string(), "2001-12-25");
        assert_eq!(tag.to_string(), "tag:example.com,2001-12-25:xmas");
    }

    #[test]
    fn test_shortest_date_form() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let tag = Tag::new("a.b", date, "x").unwrap();
        assert_eq!(tag.date_string(), "2020-3");

        let parsed: Tag = tag.to_string().parse().unwrap();
        assert_eq!(parsed, tag);
    }

    #[test]
    fn test_malformed_inputs() {
        for input in [
            "urn:bt.co,2019:null",
            "tag:bt.co:null",
            "tag:bt.co,2019",
            "tag:bt.co,2019:null:extra",
            "tag:a,b,2019:null",
            "tag:bt.co,19:null",
            "tag:bt.co,2019-13:null",
            "tag:bt.co,2019-02-30:null",
            "tag:bt.co,2019:null#a#b",
        ] {
            let result = input.parse::<Tag>();
            assert!(
                matches!(result, Err(Error::MalformedTag { .. })),
                "{} should not parse",
                input
            );
        }
    }

    #[test]
    fn test_constructor_rejects_separators() {
        let date = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        assert!(Tag::new("a:b", date, "x").is_err());
        assert!(Tag::new("a", date, "x#y").is_err());
        assert!(Tag::new("a", date, "x").unwrap().with_fragment("f#g").is_err());
    }

    #[test]
    fn test_current_year() {
        let tag = Tag::for_current_year("bt.co", "thing").unwrap();
        assert_eq!(tag.date().year(), Utc::now().year());
        assert_eq!(tag.date().ordinal(), 1);
    }
}
