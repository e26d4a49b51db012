//! Decoding of bencoded `.torrent` metadata.
//!
//! # Design
//! - Accepts a full metainfo dictionary (with an `info` key) or a bare info
//!   dictionary, which is what magnet metadata fetches produce.
//! - The info-hash is the SHA-1 of the re-encoded info dictionary; bencode
//!   dictionaries are key-sorted, so re-encoding is canonical.

use std::collections::HashMap;
use std::path::PathBuf;

use riptide_events::{InfoHash, InfoHashError};
use serde::{Deserialize, Serialize};
use serde_bencode::value::Value;
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Length of one SHA-1 piece hash inside the `pieces` string.
const PIECE_HASH_LEN: usize = 20;

/// Errors raised while decoding torrent metadata.
#[derive(Debug, Error)]
pub enum MetaInfoError {
    /// Input was not valid bencode.
    #[error("metadata is not valid bencode")]
    Bencode {
        /// Underlying parser error.
        source: serde_bencode::Error,
    },
    /// Top-level value (or `info`) was not a dictionary.
    #[error("metadata is not a dictionary")]
    NotADictionary,
    /// A required key was absent.
    #[error("metadata field missing")]
    MissingField {
        /// Key that was expected.
        field: &'static str,
    },
    /// A key held a value of the wrong shape.
    #[error("metadata field invalid")]
    InvalidField {
        /// Offending key.
        field: &'static str,
    },
    /// Computing the info-hash failed.
    #[error("metadata info-hash invalid")]
    InfoHash {
        /// Underlying identifier error.
        source: InfoHashError,
    },
}

/// File entry inside a torrent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaFile {
    /// Path relative to the torrent root.
    pub path: PathBuf,
    /// Size in bytes.
    pub length: u64,
}

/// Decoded torrent metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TorrentMetaInfo {
    /// Display name from the info dictionary.
    pub name: String,
    /// SHA-1 of the info dictionary.
    pub info_hash: InfoHash,
    /// Sum of all file lengths.
    pub total_size: u64,
    /// Bytes per piece.
    pub piece_length: u64,
    /// Number of pieces.
    pub piece_count: usize,
    /// Files in metainfo order.
    pub files: Vec<MetaFile>,
}

impl TorrentMetaInfo {
    /// Decode bencoded torrent metadata.
    ///
    /// # Errors
    ///
    /// Returns [`MetaInfoError`] when the payload is not valid bencode or is
    /// missing the fields a torrent requires.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetaInfoError> {
        let root: Value = serde_bencode::from_bytes(bytes)
            .map_err(|source| MetaInfoError::Bencode { source })?;
        let Value::Dict(mut root) = root else {
            return Err(MetaInfoError::NotADictionary);
        };
        let info_value = match root.remove(b"info".as_slice()) {
            Some(info) => info,
            None => Value::Dict(root),
        };

        let encoded =
            serde_bencode::to_bytes(&info_value).map_err(|source| MetaInfoError::Bencode { source })?;
        let info_hash = InfoHash::from_bytes(&Sha1::digest(&encoded))
            .map_err(|source| MetaInfoError::InfoHash { source })?;

        let Value::Dict(info) = info_value else {
            return Err(MetaInfoError::NotADictionary);
        };
        let name = text_field(&info, "name")?;
        let piece_length = int_field(&info, "piece length")?;
        let piece_count = match info.get(b"pieces".as_slice()) {
            Some(Value::Bytes(pieces)) => pieces.len() / PIECE_HASH_LEN,
            Some(_) => return Err(MetaInfoError::InvalidField { field: "pieces" }),
            None => 0,
        };
        let files = match info.get(b"files".as_slice()) {
            Some(Value::List(entries)) => entries
                .iter()
                .map(file_entry)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(MetaInfoError::InvalidField { field: "files" }),
            None => vec![MetaFile {
                path: PathBuf::from(&name),
                length: int_field(&info, "length")?,
            }],
        };
        let total_size = files
            .iter()
            .try_fold(0_u64, |total, file| total.checked_add(file.length))
            .ok_or(MetaInfoError::InvalidField { field: "length" })?;

        Ok(Self {
            name,
            info_hash,
            total_size,
            piece_length,
            piece_count,
            files,
        })
    }

    /// Number of files in the torrent.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

fn file_entry(entry: &Value) -> Result<MetaFile, MetaInfoError> {
    let Value::Dict(entry) = entry else {
        return Err(MetaInfoError::InvalidField { field: "files" });
    };
    let length = int_field(entry, "length")?;
    let Some(Value::List(segments)) = entry.get(b"path".as_slice()) else {
        return Err(MetaInfoError::MissingField { field: "path" });
    };
    let mut path = PathBuf::new();
    for segment in segments {
        let Value::Bytes(segment) = segment else {
            return Err(MetaInfoError::InvalidField { field: "path" });
        };
        path.push(String::from_utf8_lossy(segment).as_ref());
    }
    Ok(MetaFile { path, length })
}

fn text_field(dict: &HashMap<Vec<u8>, Value>, field: &'static str) -> Result<String, MetaInfoError> {
    match dict.get(field.as_bytes()) {
        Some(Value::Bytes(bytes)) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Some(_) => Err(MetaInfoError::InvalidField { field }),
        None => Err(MetaInfoError::MissingField { field }),
    }
}

fn int_field(dict: &HashMap<Vec<u8>, Value>, field: &'static str) -> Result<u64, MetaInfoError> {
    match dict.get(field.as_bytes()) {
        Some(Value::Int(value)) => {
            u64::try_from(*value).map_err(|_| MetaInfoError::InvalidField { field })
        }
        Some(_) => Err(MetaInfoError::InvalidField { field }),
        None => Err(MetaInfoError::MissingField { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(value: &str) -> Value {
        Value::Bytes(value.as_bytes().to_vec())
    }

    fn dict(entries: Vec<(&str, Value)>) -> Value {
        Value::Dict(
            entries
                .into_iter()
                .map(|(key, value)| (key.as_bytes().to_vec(), value))
                .collect(),
        )
    }

    fn single_file_info() -> Value {
        dict(vec![
            ("name", bytes("ubuntu.iso")),
            ("piece length", Value::Int(16_384)),
            ("pieces", Value::Bytes(vec![0; PIECE_HASH_LEN * 3])),
            ("length", Value::Int(40_000)),
        ])
    }

    #[test]
    fn decodes_single_file_torrent() -> anyhow::Result<()> {
        let info = single_file_info();
        let expected_hash = InfoHash::from_bytes(&Sha1::digest(serde_bencode::to_bytes(&info)?))?;
        let torrent = serde_bencode::to_bytes(&dict(vec![
            ("announce", bytes("http://tracker.example/announce")),
            ("info", info),
        ]))?;

        let meta = TorrentMetaInfo::from_bytes(&torrent)?;

        assert_eq!(meta.name, "ubuntu.iso");
        assert_eq!(meta.info_hash, expected_hash);
        assert_eq!(meta.total_size, 40_000);
        assert_eq!(meta.piece_length, 16_384);
        assert_eq!(meta.piece_count, 3);
        assert_eq!(meta.file_count(), 1);
        assert_eq!(meta.files[0].path, PathBuf::from("ubuntu.iso"));
        Ok(())
    }

    #[test]
    fn decodes_multi_file_info_dictionary() -> anyhow::Result<()> {
        let info = dict(vec![
            ("name", bytes("album")),
            ("piece length", Value::Int(32_768)),
            ("pieces", Value::Bytes(vec![1; PIECE_HASH_LEN])),
            (
                "files",
                Value::List(vec![
                    dict(vec![
                        ("length", Value::Int(100)),
                        ("path", Value::List(vec![bytes("disc1"), bytes("01.flac")])),
                    ]),
                    dict(vec![
                        ("length", Value::Int(250)),
                        ("path", Value::List(vec![bytes("cover.jpg")])),
                    ]),
                ]),
            ),
        ]);

        let meta = TorrentMetaInfo::from_bytes(&serde_bencode::to_bytes(&info)?)?;

        assert_eq!(meta.total_size, 350);
        assert_eq!(meta.file_count(), 2);
        assert_eq!(meta.files[0].path, PathBuf::from("disc1").join("01.flac"));
        Ok(())
    }

    #[test]
    fn oversized_file_lengths_are_rejected() -> anyhow::Result<()> {
        let huge = || {
            dict(vec![
                ("length", Value::Int(i64::MAX)),
                ("path", Value::List(vec![bytes("part.bin")])),
            ])
        };
        let info = dict(vec![
            ("name", bytes("bomb")),
            ("piece length", Value::Int(16_384)),
            ("files", Value::List(vec![huge(), huge(), huge()])),
        ]);

        assert!(matches!(
            TorrentMetaInfo::from_bytes(&serde_bencode::to_bytes(&info)?),
            Err(MetaInfoError::InvalidField { field: "length" })
        ));
        Ok(())
    }

    #[test]
    fn rejects_garbage_and_incomplete_metadata() -> anyhow::Result<()> {
        assert!(matches!(
            TorrentMetaInfo::from_bytes(b"not bencode"),
            Err(MetaInfoError::Bencode { .. })
        ));
        assert!(matches!(
            TorrentMetaInfo::from_bytes(b"i42e"),
            Err(MetaInfoError::NotADictionary)
        ));
        let nameless = serde_bencode::to_bytes(&dict(vec![("length", Value::Int(1))]))?;
        assert!(matches!(
            TorrentMetaInfo::from_bytes(&nameless),
            Err(MetaInfoError::MissingField { field: "name" })
        ));
        Ok(())
    }
}
