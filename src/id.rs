//! Base type identifiers and categories.
//!
//! The id set is closed: every base-type value, and every token in a stream, carries
//! exactly one [`BaseTypeId`], and every id belongs to exactly one [`Category`].
//!
//! | Category | Ids |
//! |---|---|
//! | Value | Null, Bool, Int, Float, DateTime |
//! | Storage | String, Urn, Tag, Blob |
//! | Structure | Pair, Color, Geolocation, Predicate |
//! | Collection | List, Dictionary |
//! | Object | Packable |
//! | Sentinel | End |
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{BaseTypeId, Category};
//!
//! assert_eq!(BaseTypeId::Dictionary.category(), Category::Collection);
//! assert!(BaseTypeId::Dictionary.opens_scope());
//! assert_eq!(BaseTypeId::try_from(257u16).unwrap(), BaseTypeId::Dictionary);
//! assert_eq!(BaseTypeId::Int.tag().to_string(), "tag:bt.co,2019:int");
//! ```

use crate::{Error, Result, Tag};
use chrono::NaiveDate;
use std::fmt;

/// Authority of the identity tags, `tag:bt.co,2019:<name>`.
pub const IDENTITY_AUTHORITY: &str = "bt.co";

/// Identifier of a base type, with its stable numeric code as discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum BaseTypeId {
    Null = 0,
    Bool = 1,
    Int = 4,
    Float = 8,
    DateTime = 9,
    String = 64,
    Urn = 65,
    Tag = 66,
    Blob = 67,
    Pair = 128,
    Color = 129,
    Geolocation = 130,
    Predicate = 131,
    List = 256,
    Dictionary = 257,
    Packable = 384,
    End = 65535,
}

/// The category each [`BaseTypeId`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Fixed in-memory size, compared by value.
    Value,
    /// Variable-length text or byte content.
    Storage,
    /// Fixed-arity composites.
    Structure,
    /// Unbounded, nestable.
    Collection,
    /// Externally defined object state.
    Object,
    /// Closes a collection or packable scope.
    Sentinel,
}

impl BaseTypeId {
    /// Every id, in code order.
    pub const ALL: [BaseTypeId; 17] = [
        BaseTypeId::Null,
        BaseTypeId::Bool,
        BaseTypeId::Int,
        BaseTypeId::Float,
        BaseTypeId::DateTime,
        BaseTypeId::String,
        BaseTypeId::Urn,
        BaseTypeId::Tag,
        BaseTypeId::Blob,
        BaseTypeId::Pair,
        BaseTypeId::Color,
        BaseTypeId::Geolocation,
        BaseTypeId::Predicate,
        BaseTypeId::List,
        BaseTypeId::Dictionary,
        BaseTypeId::Packable,
        BaseTypeId::End,
    ];

    /// Returns the stable numeric code of this id.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Returns the lowercase name used in this id's identity tag.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            BaseTypeId::Null => "null",
            BaseTypeId::Bool => "bool",
            BaseTypeId::Int => "int",
            BaseTypeId::Float => "float",
            BaseTypeId::DateTime => "datetime",
            BaseTypeId::String => "string",
            BaseTypeId::Urn => "urn",
            BaseTypeId::Tag => "tag",
            BaseTypeId::Blob => "blob",
            BaseTypeId::Pair => "pair",
            BaseTypeId::Color => "color",
            BaseTypeId::Geolocation => "geolocation",
            BaseTypeId::Predicate => "predicate",
            BaseTypeId::List => "list",
            BaseTypeId::Dictionary => "dictionary",
            BaseTypeId::Packable => "packable",
            BaseTypeId::End => "end",
        }
    }

    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            BaseTypeId::Null
            | BaseTypeId::Bool
            | BaseTypeId::Int
            | BaseTypeId::Float
            | BaseTypeId::DateTime => Category::Value,
            BaseTypeId::String | BaseTypeId::Urn | BaseTypeId::Tag | BaseTypeId::Blob => {
                Category::Storage
            }
            BaseTypeId::Pair
            | BaseTypeId::Color
            | BaseTypeId::Geolocation
            | BaseTypeId::Predicate => Category::Structure,
            BaseTypeId::List | BaseTypeId::Dictionary => Category::Collection,
            BaseTypeId::Packable => Category::Object,
            BaseTypeId::End => Category::Sentinel,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_value(self) -> bool {
        matches!(self.category(), Category::Value)
    }

    #[inline]
    #[must_use]
    pub const fn is_storage(self) -> bool {
        matches!(self.category(), Category::Storage)
    }

    #[inline]
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self.category(), Category::Structure)
    }

    #[inline]
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self.category(), Category::Collection)
    }

    #[inline]
    #[must_use]
    pub const fn is_packable(self) -> bool {
        matches!(self.category(), Category::Object)
    }

    #[inline]
    #[must_use]
    pub const fn is_end(self) -> bool {
        matches!(self.category(), Category::Sentinel)
    }

    /// Returns `true` for ids whose start token opens a scope closed by `End`.
    #[inline]
    #[must_use]
    pub const fn opens_scope(self) -> bool {
        matches!(
            self,
            BaseTypeId::List | BaseTypeId::Dictionary | BaseTypeId::Packable
        )
    }

    /// Returns `true` for ids allowed as the object or subject of a predicate.
    #[inline]
    #[must_use]
    pub const fn is_value_or_storage(self) -> bool {
        self.is_value() || self.is_storage()
    }

    /// Returns the identity tag of this id, `tag:bt.co,2019:<name>`.
    #[must_use]
    pub fn tag(self) -> Tag {
        // Fixed authority, date and name; none contain a tag separator.
        Tag::new(IDENTITY_AUTHORITY, identity_date(), self.name())
            .unwrap_or_else(|_| unreachable!("identity tags are well-formed"))
    }

    /// Looks up the id whose identity tag equals `tag`, ignoring any fragment.
    #[must_use]
    pub fn from_tag(tag: &Tag) -> Option<BaseTypeId> {
        if tag.authority() != IDENTITY_AUTHORITY || tag.date() != identity_date() {
            return None;
        }
        BaseTypeId::ALL
            .into_iter()
            .find(|id| id.name() == tag.specific())
    }
}

fn identity_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default()
}

impl TryFrom<u16> for BaseTypeId {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self> {
        BaseTypeId::ALL
            .into_iter()
            .find(|id| id.code() == code)
            .ok_or_else(|| Error::unknown_type(format!("unknown base type code {}", code)))
    }
}

impl fmt::Display for BaseTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
