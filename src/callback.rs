//! Event-style traversal of a token stream.
//!
//! [`read_with_callbacks`] pulls tokens from a reader and hands each one to a
//! [`ReaderCallback`]. Any callback can stop the traversal by returning `false`; the
//! driver then reports `Ok(false)` instead of an error.
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{base, read_with_callbacks, BaseValue, ReaderCallback, ValueReader};
//!
//! #[derive(Default)]
//! struct SumInts(i64);
//!
//! impl ReaderCallback for SumInts {
//!     fn on_value(&mut self, value: &BaseValue) -> bool {
//!         self.0 += value.as_i64().unwrap_or(0);
//!         true
//!     }
//! }
//!
//! let mut reader = ValueReader::new(base!([1, 2, [3]])).unwrap();
//! let mut sum = SumInts::default();
//! assert!(read_with_callbacks(&mut reader, &mut sum).unwrap());
//! assert_eq!(sum.0, 6);
//! ```

use crate::{BaseTypeReader, BaseValue, PackableHeader, Result, Token};

/// Receives one call per token. Every method defaults to continuing.
pub trait ReaderCallback {
    fn on_value(&mut self, _value: &BaseValue) -> bool {
        true
    }

    fn on_pair_start(&mut self, _name: &str) -> bool {
        true
    }

    fn on_list_start(&mut self) -> bool {
        true
    }

    fn on_dictionary_start(&mut self) -> bool {
        true
    }

    fn on_packable_start(&mut self, _header: &PackableHeader) -> bool {
        true
    }

    fn on_end(&mut self) -> bool {
        true
    }
}

/// Drives `callback` over every token of `reader`.
///
/// Returns `Ok(true)` when the stream was read to the end and `Ok(false)` when a
/// callback asked to stop. Reader errors propagate unchanged.
pub fn read_with_callbacks<R, C>(reader: &mut R, callback: &mut C) -> Result<bool>
where
    R: BaseTypeReader + ?Sized,
    C: ReaderCallback + ?Sized,
{
    let mut count = 0usize;
    while let Some(token) = reader.next_token()? {
        count += 1;
        let keep_going = match &token {
            Token::End => callback.on_end(),
            Token::PairStart(name) => callback.on_pair_start(name),
            Token::ListStart => callback.on_list_start(),
            Token::DictionaryStart => callback.on_dictionary_start(),
            Token::PackableStart(header) => callback.on_packable_start(header),
            Token::Value(value) => callback.on_value(value),
        };
        if !keep_going {
            tracing::debug!(tokens = count, "callback stopped the traversal");
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{base, Error, Token, TokenReader, ValueReader};

    struct StopAfter {
        limit: usize,
        calls: usize,
    }

    impl StopAfter {
        fn tick(&mut self) -> bool {
            self.calls += 1;
            self.calls < self.limit
        }
    }

    impl ReaderCallback for StopAfter {
        fn on_value(&mut self, _value: &BaseValue) -> bool {
            self.tick()
        }

        fn on_pair_start(&mut self, _name: &str) -> bool {
            self.tick()
        }

        fn on_list_start(&mut self) -> bool {
            self.tick()
        }

        fn on_dictionary_start(&mut self) -> bool {
            self.tick()
        }

        fn on_end(&mut self) -> bool {
            self.tick()
        }
    }

    #[test]
    fn test_stop_on_third_token() {
        let mut reader = ValueReader::new(base!({"a": 1, "b": 2})).unwrap();
        let mut callback = StopAfter { limit: 3, calls: 0 };
        assert!(!read_with_callbacks(&mut reader, &mut callback).unwrap());
        assert_eq!(callback.calls, 3);
        assert_eq!(reader.next_token().unwrap(), Some(Token::PairStart("b".into())));
    }

    #[test]
    fn test_complete_traversal() {
        let mut reader = ValueReader::new(base!([1, [2]])).unwrap();
        let mut callback = StopAfter { limit: usize::MAX, calls: 0 };
        assert!(read_with_callbacks(&mut reader, &mut callback).unwrap());
        assert_eq!(callback.calls, 6);
    }

    #[test]
    fn test_reader_errors_propagate() {
        let mut reader = TokenReader::from_tokens(vec![Token::End]);
        let mut callback = StopAfter { limit: usize::MAX, calls: 0 };
        assert!(matches!(
            read_with_callbacks(&mut reader, &mut callback),
            Err(Error::Framing { .. })
        ));
        assert_eq!(callback.calls, 0);
    }
}
