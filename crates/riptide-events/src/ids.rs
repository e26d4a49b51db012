//! Torrent identifiers shared by events and engine interfaces.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InfoHashError;

/// Length in bytes of a SHA-1 info-hash.
pub const INFO_HASH_LEN: usize = 20;

/// SHA-1 info-hash of a torrent's `info` dictionary, kept as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InfoHash(String);

/// Torrents are keyed by their info-hash.
pub type TorrentId = InfoHash;

impl InfoHash {
    /// Parse a 40-character hex string, normalising to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`InfoHashError`] when the input has the wrong length or
    /// contains non-hex characters.
    pub fn parse(raw: &str) -> Result<Self, InfoHashError> {
        let trimmed = raw.trim();
        if trimmed.len() != INFO_HASH_LEN * 2 {
            return Err(InfoHashError::Length {
                length: trimmed.len(),
            });
        }
        if !trimmed.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(InfoHashError::NotHex);
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Build an info-hash from a raw 20-byte digest.
    ///
    /// # Errors
    ///
    /// Returns [`InfoHashError::Length`] when `digest` is not 20 bytes long.
    pub fn from_bytes(digest: &[u8]) -> Result<Self, InfoHashError> {
        if digest.len() != INFO_HASH_LEN {
            return Err(InfoHashError::Length {
                length: digest.len(),
            });
        }
        Ok(Self(hex::encode(digest)))
    }

    /// Borrow the lowercase hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InfoHash {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for InfoHash {
    type Err = InfoHashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for InfoHash {
    type Error = InfoHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InfoHash> for String {
    fn from(value: InfoHash) -> Self {
        value.0
    }
}
