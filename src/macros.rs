/// Builds a [`BaseValue`](crate::BaseValue) tree from JSON-like syntax.
///
/// Lists and dictionaries nest; any other expression goes through
/// [`to_value`](crate::to_value).
///
/// # Panics
///
/// Panics if an expression is not a base type or a dictionary rejects an entry, such as
/// a repeated key. [`try_base!`](crate::try_base) returns the error instead.
///
/// ```rust
/// use basetypes::{base, BaseValue};
///
/// let value = base!({"name": "probe", "readings": [1, 2.5, null]});
/// assert_eq!(value.as_dictionary().map(|d| d.len()), Some(2));
/// assert_eq!(base!(7), BaseValue::Int(7));
/// ```
#[macro_export]
macro_rules! base {
    ($($value:tt)+) => {
        match $crate::try_base!($($value)+) {
            ::core::result::Result::Ok(value) => value,
            ::core::result::Result::Err(err) => ::core::panic!("invalid base! literal: {}", err),
        }
    };
}

/// Like [`base!`](crate::base), but returns a [`Result`](crate::Result) holding the
/// first error instead of panicking.
///
/// ```rust
/// use basetypes::{try_base, Error};
///
/// assert!(try_base!({"a": 1, "b": [true]}).is_ok());
/// assert!(matches!(try_base!({"a": 1, "a": 2}), Err(Error::Key(_))));
/// assert!(matches!(try_base!([u64::MAX]), Err(Error::UnknownType(_))));
/// ```
#[macro_export]
macro_rules! try_base {
    (null) => {
        $crate::Result::Ok($crate::BaseValue::Null)
    };

    (true) => {
        $crate::Result::Ok($crate::BaseValue::Bool(true))
    };

    (false) => {
        $crate::Result::Ok($crate::BaseValue::Bool(false))
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::macros::list(vec![$($crate::try_base!($elem)),*])
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {
        $crate::macros::dictionary(vec![$(($key.to_string(), $crate::try_base!($value))),*])
    };

    ($e:expr) => {
        $crate::to_value(&$e)
    };
}

use crate::{BaseValue, Dictionary, Result};

#[doc(hidden)]
pub fn list(items: Vec<Result<BaseValue>>) -> Result<BaseValue> {
    items.into_iter().collect::<Result<Vec<_>>>().map(BaseValue::List)
}

#[doc(hidden)]
pub fn dictionary(entries: Vec<(String, Result<BaseValue>)>) -> Result<BaseValue> {
    let mut dictionary = Dictionary::with_capacity(entries.len());
    for (key, value) in entries {
        dictionary.insert(key, value?)?;
    }
    Ok(BaseValue::Dictionary(dictionary))
}
