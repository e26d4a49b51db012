//! Bencoded torrent builders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use riptide_events::InfoHash;
use serde_bencode::value::Value;
use sha1::{Digest, Sha1};

const PIECE_HASH_LEN: usize = 20;
const DEFAULT_PIECE_LENGTH: u64 = 16_384;
const DEFAULT_TRACKER: &str = "udp://tracker.example.org:6969/announce";

/// Builder for small, valid `.torrent` payloads.
#[derive(Debug, Clone)]
pub struct TorrentFixture {
    name: String,
    piece_length: u64,
    files: Vec<(Vec<String>, u64)>,
    single: bool,
}

impl TorrentFixture {
    /// Single-file torrent named `name` holding `length` bytes.
    #[must_use]
    pub fn single(name: &str, length: u64) -> Self {
        Self {
            name: name.to_string(),
            piece_length: DEFAULT_PIECE_LENGTH,
            files: vec![(vec![name.to_string()], length)],
            single: true,
        }
    }

    /// Multi-file torrent rooted at `name`; paths use `/` separators.
    #[must_use]
    pub fn multi(name: &str, files: &[(&str, u64)]) -> Self {
        Self {
            name: name.to_string(),
            piece_length: DEFAULT_PIECE_LENGTH,
            files: files
                .iter()
                .map(|(path, length)| (path.split('/').map(str::to_string).collect(), *length))
                .collect(),
            single: false,
        }
    }

    /// Override the piece length.
    #[must_use]
    pub const fn with_piece_length(mut self, piece_length: u64) -> Self {
        self.piece_length = piece_length;
        self
    }

    /// Torrent name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sum of all file lengths.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|(_, length)| length).sum()
    }

    /// Number of files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Bare info dictionary, as delivered by a magnet metadata fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn info_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_bencode::to_bytes(&self.info_value())?)
    }

    /// Full metainfo document with an announce URL.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut root = HashMap::new();
        root.insert(b"announce".to_vec(), bytes(DEFAULT_TRACKER));
        root.insert(b"info".to_vec(), self.info_value());
        Ok(serde_bencode::to_bytes(&Value::Dict(root))?)
    }

    /// SHA-1 of the info dictionary.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn info_hash(&self) -> Result<InfoHash> {
        Ok(InfoHash::from_bytes(&Sha1::digest(self.info_bytes()?))?)
    }

    /// Magnet URI naming this torrent.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn magnet_uri(&self) -> Result<String> {
        Ok(format!(
            "magnet:?xt=urn:btih:{}&dn={}",
            self.info_hash()?,
            self.name
        ))
    }

    /// Write the full metainfo to `dir/<file_name>`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write_to(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = dir.join(file_name);
        std::fs::write(&path, self.to_bytes()?)?;
        Ok(path)
    }

    fn info_value(&self) -> Value {
        let total = self.total_size();
        let pieces = usize::try_from(total.div_ceil(self.piece_length.max(1))).unwrap_or(0);

        let mut info = HashMap::new();
        info.insert(b"name".to_vec(), bytes(&self.name));
        info.insert(
            b"piece length".to_vec(),
            Value::Int(i64::try_from(self.piece_length).unwrap_or(i64::MAX)),
        );
        info.insert(
            b"pieces".to_vec(),
            Value::Bytes(vec![0; pieces * PIECE_HASH_LEN]),
        );
        if self.single {
            info.insert(
                b"length".to_vec(),
                Value::Int(i64::try_from(total).unwrap_or(i64::MAX)),
            );
        } else {
            let files = self
                .files
                .iter()
                .map(|(segments, length)| {
                    let mut entry = HashMap::new();
                    entry.insert(
                        b"length".to_vec(),
                        Value::Int(i64::try_from(*length).unwrap_or(i64::MAX)),
                    );
                    entry.insert(
                        b"path".to_vec(),
                        Value::List(segments.iter().map(|segment| bytes(segment)).collect()),
                    );
                    Value::Dict(entry)
                })
                .collect();
            info.insert(b"files".to_vec(), Value::List(files));
        }
        Value::Dict(info)
    }
}

fn bytes(text: &str) -> Value {
    Value::Bytes(text.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_torrent_core::TorrentMetaInfo;

    #[test]
    fn fixtures_decode_with_matching_hash() -> Result<()> {
        let fixture = TorrentFixture::multi(
            "album",
            &[("cd1/track.flac", 40_000), ("cover.jpg", 2_000)],
        );

        let full = TorrentMetaInfo::from_bytes(&fixture.to_bytes()?)?;
        let bare = TorrentMetaInfo::from_bytes(&fixture.info_bytes()?)?;

        assert_eq!(full, bare);
        assert_eq!(full.info_hash, fixture.info_hash()?);
        assert_eq!(full.total_size, 42_000);
        assert_eq!(full.file_count(), 2);
        assert_eq!(full.piece_count, 3);
        assert_eq!(full.files[0].path, PathBuf::from("cd1").join("track.flac"));
        Ok(())
    }

    #[test]
    fn magnet_uri_carries_hash_and_name() -> Result<()> {
        let fixture = TorrentFixture::single("debian.iso", 1_000);
        let uri = fixture.magnet_uri()?;
        assert!(uri.starts_with("magnet:?xt=urn:btih:"));
        assert!(uri.contains(fixture.info_hash()?.as_str()));
        assert!(uri.ends_with("&dn=debian.iso"));
        Ok(())
    }
}
