//! Fixed-capacity, NUL-terminated string fields as stored in the container format.

use std::fmt;

/// A UTF-8 string stored in exactly `N` bytes.
///
/// At most `N - 1` bytes of text are kept; the remainder is zero-filled so the
/// field is always NUL-terminated. Truncation never splits a UTF-8 sequence.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize> {
    bytes: [u8; N],
}

/// Returned when raw bytes cannot form a valid [`FixedStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FixedStrError {
    #[error("field has no NUL terminator")]
    Unterminated,
    #[error("field is not valid UTF-8 (valid up to byte {0})")]
    InvalidUtf8(usize),
}

impl<const N: usize> FixedStr<N> {
    /// Usable text capacity in bytes (one byte is reserved for the terminator).
    pub const CAPACITY: usize = N - 1;

    /// Copy `text` into a new field, truncating to [`Self::CAPACITY`] bytes.
    pub fn new(text: &str) -> Self {
        let mut bytes = [0u8; N];
        let text = truncate_to_boundary(text, Self::CAPACITY);
        bytes[..text.len()].copy_from_slice(text.as_bytes());
        Self { bytes }
    }

    /// Reinterpret a raw field read from disk.
    ///
    /// Text ends at the first NUL. A field whose bytes contain no NUL at all
    /// is rejected rather than read past its end.
    pub fn from_bytes(bytes: [u8; N]) -> Result<Self, FixedStrError> {
        let end = bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or(FixedStrError::Unterminated)?;
        std::str::from_utf8(&bytes[..end]).map_err(|e| FixedStrError::InvalidUtf8(e.valid_up_to()))?;

        let mut clean = [0u8; N];
        clean[..end].copy_from_slice(&bytes[..end]);
        Ok(Self { bytes: clean })
    }

    pub fn as_str(&self) -> &str {
        let end = self.len();
        // Constructors only admit valid UTF-8 before the terminator.
        std::str::from_utf8(&self.bytes[..end]).unwrap_or_default()
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.iter().position(|&b| b == 0).unwrap_or(N)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self { bytes: [0u8; N] }
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> From<&str> for FixedStr<N> {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[cfg(feature = "serde")]
impl<const N: usize> serde::Serialize for FixedStr<N> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn truncate_to_boundary(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
