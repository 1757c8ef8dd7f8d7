//! Configuration for token readers and writers.
//!
//! ## Examples
//!
//! ```rust
//! use basetypes::{StreamOptions, TokenWriter};
//!
//! let options = StreamOptions::new()
//!     .with_max_depth(8)
//!     .with_storage_warn_bytes(1024);
//! let writer = TokenWriter::with_options(options);
//! assert_eq!(writer.depth(), 0);
//! ```

use crate::BaseValue;

/// Default nesting limit for lists, dictionaries and packables.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Storage values above this size are worth streaming by reference instead.
pub const DEFAULT_STORAGE_WARN_BYTES: usize = 256 * 1024;

/// Options shared by every reader and writer in the crate.
///
/// # Examples
///
/// ```rust
/// use basetypes::StreamOptions;
///
/// let options = StreamOptions::new();
/// assert_eq!(options.max_depth, 64);
/// assert_eq!(options.storage_warn_bytes, 256 * 1024);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StreamOptions {
    /// Deepest scope nesting accepted before a framing error.
    pub max_depth: usize,
    /// Storage values larger than this many bytes log a warning.
    pub storage_warn_bytes: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            storage_warn_bytes: DEFAULT_STORAGE_WARN_BYTES,
        }
    }
}

impl StreamOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the nesting limit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use basetypes::{Error, StreamOptions, TokenWriter, BaseTypeWriter};
    ///
    /// let mut writer = TokenWriter::with_options(StreamOptions::new().with_max_depth(1));
    /// writer.write_list_start().unwrap();
    /// assert!(matches!(writer.write_list_start(), Err(Error::Framing { .. })));
    /// ```
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_storage_warn_bytes(mut self, bytes: usize) -> Self {
        self.storage_warn_bytes = bytes;
        self
    }

    /// Logs a warning when a storage value exceeds the configured size.
    pub(crate) fn check_storage(&self, value: &BaseValue) {
        if let Some(len) = value.storage_len() {
            if len > self.storage_warn_bytes {
                tracing::warn!(
                    kind = %value.id(),
                    len,
                    limit = self.storage_warn_bytes,
                    "storage value exceeds the recommended size"
                );
            }
        }
    }
}
