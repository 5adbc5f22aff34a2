//! Storage index identifiers and their base32 text form.
//!
//! The text form is lowercase RFC 4648 base32 without padding. Decoding is
//! strict (no uppercase, no non-zero trailing bits) so every valid text has
//! exactly one binary form and re-encoding gives the same text back.

use crate::utils::errors::{Result, StatusError};
use data_encoding::BASE32_NOPAD;
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a binary storage index
pub const STORAGE_INDEX_LEN: usize = 16;

/// Fixed-length identifier naming the group of shares of one stored object
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageIndex([u8; STORAGE_INDEX_LEN]);

impl StorageIndex {
    pub fn from_bytes(bytes: [u8; STORAGE_INDEX_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; STORAGE_INDEX_LEN] {
        &self.0
    }

    /// First two characters of the text form, used to fan out share directories
    pub fn prefix(&self) -> String {
        let mut text = self.to_string();
        text.truncate(2);
        text
    }
}

impl FromStr for StorageIndex {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self> {
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(StatusError::Decode(format!("{s:?} is not lowercase base32")));
        }

        let bytes = BASE32_NOPAD
            .decode(s.to_ascii_uppercase().as_bytes())
            .map_err(|e| StatusError::Decode(format!("{s:?}: {e}")))?;

        let index: [u8; STORAGE_INDEX_LEN] = bytes.as_slice().try_into().map_err(|_| {
            StatusError::Decode(format!(
                "{s:?} decodes to {} bytes, expected {STORAGE_INDEX_LEN}",
                bytes.len()
            ))
        })?;

        Ok(Self(index))
    }
}

impl fmt::Display for StorageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE32_NOPAD.encode(&self.0).to_ascii_lowercase())
    }
}

impl fmt::Debug for StorageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageIndex({self})")
    }
}
