//! Error types for base-type classification and token streaming.
//!
//! Every failure in this crate is local and synchronous: it is raised at the point of
//! detection and never retried internally.
//!
//! ## Error Categories
//!
//! - **Type errors**: a value written through the wrong method, or a structure whose
//!   fields are out of range
//! - **Key errors**: a pair or dictionary key that is missing, empty or duplicated
//! - **Framing errors**: a token that breaks the start/end scope discipline
//! - **Tag/URN errors**: malformed `tag:` or `urn:` text
//! - **Unknown-type errors**: a native value or stream token that matches no base type
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{Error, Tag};
//!
//! let result = "tag:bt.co:null".parse::<Tag>();
//! assert!(matches!(result, Err(Error::MalformedTag { .. })));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors raised by the base-type model and stream protocol.
///
/// `Error` is `Clone` so a peeked reader can cache a failure and hand it back on the
/// following read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A value does not have the type the operation requires
    #[error("type error: expected {expected}, found {found}")]
    Type { expected: String, found: String },

    /// A structure field is outside its legal range
    #[error("invalid {structure} field '{field}': {msg}")]
    InvalidField {
        structure: &'static str,
        field: &'static str,
        msg: String,
    },

    /// A pair or dictionary key is missing, empty, non-string or duplicated
    #[error("key error: {0}")]
    Key(String),

    /// A token breaks the start/end scope discipline
    #[error("framing error at depth {depth}: {msg}")]
    Framing { depth: usize, msg: String },

    /// Text is not a valid RFC 4151 tag URI
    #[error("malformed tag URI '{input}': {reason}")]
    MalformedTag { input: String, reason: &'static str },

    /// Text is not a valid `urn:` name
    #[error("malformed URN '{input}': {reason}")]
    MalformedUrn { input: String, reason: &'static str },

    /// A native value or token matches no base type
    #[error("not a base type: {0}")]
    UnknownType(String),

    /// No factory in a chain can construct the requested state
    #[error("no packable factory for state id '{0}'")]
    UnknownStateId(String),

    /// The reader or writer has been closed
    #[error("{0} is closed")]
    Closed(&'static str),

    /// Custom error raised through the serde bridge
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Creates a type error describing the expected and found kinds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use basetypes::Error;
    ///
    /// let err = Error::type_mismatch("int", "string");
    /// assert!(err.to_string().contains("expected int"));
    /// ```
    pub fn type_mismatch(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        Error::Type {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates an out-of-range structure field error.
    pub fn invalid_field(structure: &'static str, field: &'static str, msg: impl Into<String>) -> Self {
        Error::InvalidField {
            structure,
            field,
            msg: msg.into(),
        }
    }

    /// Creates a key error.
    pub fn key(msg: impl Into<String>) -> Self {
        Error::Key(msg.into())
    }

    /// Creates a framing error observed at the given nesting depth.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use basetypes::Error;
    ///
    /// let err = Error::framing(0, "end without an open scope");
    /// assert!(err.to_string().contains("depth 0"));
    /// ```
    pub fn framing(depth: usize, msg: impl Into<String>) -> Self {
        Error::Framing {
            depth,
            msg: msg.into(),
        }
    }

    pub(crate) fn malformed_tag(input: &str, reason: &'static str) -> Self {
        Error::MalformedTag {
            input: input.to_string(),
            reason,
        }
    }

    pub(crate) fn malformed_urn(input: &str, reason: &'static str) -> Self {
        Error::MalformedUrn {
            input: input.to_string(),
            reason,
        }
    }

    /// Creates an unknown-type error.
    pub fn unknown_type(msg: impl Into<String>) -> Self {
        Error::UnknownType(msg.into())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use basetypes::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns `true` for framing errors.
    #[must_use]
    pub fn is_framing(&self) -> bool {
        matches!(self, Error::Framing { .. })
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
