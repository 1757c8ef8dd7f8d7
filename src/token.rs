//! Stream tokens.
//!
//! A base-type value travels as a pre-order, depth-first sequence of [`Token`]s.
//! Value, storage and the non-pair structure types are self-contained `Value` tokens.
//! Lists, dictionaries and packables open a scope that exactly one `End` closes. A pair
//! is a `PairStart` carrying the name, followed by exactly one value with no `End`.
//!
//! ```text
//! {"a": 1, "b": [true]}
//!
//! DictionaryStart
//!   PairStart("a")  Value(Int 1)
//!   PairStart("b")  ListStart  Value(Bool true)  End
//! End
//! ```

use crate::{BaseTypeId, BaseValue, Error, PackableHeader, Result};
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A self-contained value. Never a pair, list, dictionary or packable.
    Value(BaseValue),
    PairStart(String),
    ListStart,
    DictionaryStart,
    PackableStart(PackableHeader),
    End,
}

impl Token {
    /// Wraps a scalar value, rejecting values that stream as more than one token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use basetypes::{BaseValue, Token};
    ///
    /// assert!(Token::value(BaseValue::Int(1)).is_ok());
    /// assert!(Token::value(BaseValue::List(vec![])).is_err());
    /// ```
    pub fn value(value: impl Into<BaseValue>) -> Result<Token> {
        let value = value.into();
        if !value.is_scalar() {
            return Err(Error::type_mismatch("a single-token value", value.id()));
        }
        Ok(Token::Value(value))
    }

    #[must_use]
    pub const fn id(&self) -> BaseTypeId {
        match self {
            Token::Value(value) => value.id(),
            Token::PairStart(_) => BaseTypeId::Pair,
            Token::ListStart => BaseTypeId::List,
            Token::DictionaryStart => BaseTypeId::Dictionary,
            Token::PackableStart(_) => BaseTypeId::Packable,
            Token::End => BaseTypeId::End,
        }
    }

    #[inline]
    #[must_use]
    pub const fn opens_scope(&self) -> bool {
        matches!(
            self,
            Token::ListStart | Token::DictionaryStart | Token::PackableStart(_)
        )
    }

    #[inline]
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self, Token::End)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Value(value) => write!(f, "{}({})", value.id(), value),
            Token::PairStart(name) => write!(f, "pair({:?})", name),
            Token::PackableStart(header) => write!(f, "packable({})", header.state_id()),
            other => write!(f, "{}", other.id()),
        }
    }
}

impl From<BaseValue> for Token {
    /// Wraps a value without checking it; framing rejects compound values later.
    fn from(value: BaseValue) -> Self {
        Token::Value(value)
    }
}
