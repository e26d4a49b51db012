//! Magnet metadata resolution on top of correlated event subscriptions.
//!
//! # Design
//! - Subscribe first, then look for already-resident metadata, so an event
//!   landing between the two steps cannot be lost.
//! - Each [`MetadataFuture`] owns a one-shot subscription; dropping the future
//!   detaches that waiter only and leaves the session fetch running.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use riptide_events::{Correlated, EngineEvent};
use riptide_torrent_core::{InfoHash, MagnetInfo, Session, TorrentMetaInfo, TorrentResult};
use tracing::debug;

use crate::error::MagnetError;

/// Resolves with the decoded metadata of one magnet fetch.
#[must_use = "metadata futures do nothing unless awaited"]
pub struct MetadataFuture {
    info_hash: InfoHash,
    state: Resolution,
}

enum Resolution {
    Ready(Option<Result<TorrentMetaInfo, MagnetError>>),
    Waiting(Correlated<Option<Vec<u8>>>),
}

impl MetadataFuture {
    const fn ready(info_hash: InfoHash, result: Result<TorrentMetaInfo, MagnetError>) -> Self {
        Self {
            info_hash,
            state: Resolution::Ready(Some(result)),
        }
    }

    /// Info-hash this future waits on.
    #[must_use]
    pub const fn info_hash(&self) -> &InfoHash {
        &self.info_hash
    }
}

impl Future for MetadataFuture {
    type Output = Result<TorrentMetaInfo, MagnetError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let delivered = match &mut this.state {
            Resolution::Ready(result) => {
                return Poll::Ready(result.take().unwrap_or_else(|| {
                    Err(MagnetError::Closed {
                        info_hash: this.info_hash.clone(),
                    })
                }));
            }
            Resolution::Waiting(pending) => match Pin::new(pending).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(delivered) => delivered,
            },
        };
        this.state = Resolution::Ready(None);
        Poll::Ready(match delivered {
            Ok(metadata) => decode(&this.info_hash, metadata),
            Err(_) => Err(MagnetError::Closed {
                info_hash: this.info_hash.clone(),
            }),
        })
    }
}

fn decode(
    info_hash: &InfoHash,
    metadata: Option<Vec<u8>>,
) -> Result<TorrentMetaInfo, MagnetError> {
    let bytes = metadata.ok_or_else(|| MagnetError::MissingData {
        info_hash: info_hash.clone(),
    })?;
    TorrentMetaInfo::from_bytes(&bytes).map_err(|source| MagnetError::Decode {
        info_hash: info_hash.clone(),
        source,
    })
}

/// Turns session magnet fetches into awaitable metadata.
pub struct MagnetResolutionBridge {
    session: Arc<dyn Session>,
}

impl MagnetResolutionBridge {
    /// Bridge over `session`.
    #[must_use]
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self { session }
    }

    /// Wait for the metadata of `info_hash`.
    pub fn fetch_metadata(&self, info_hash: &InfoHash) -> MetadataFuture {
        let wanted = info_hash.clone();
        let pending = self.session.events().once(move |event| match event {
            EngineEvent::MagnetLoaded {
                info_hash,
                metadata,
            } if *info_hash == wanted => Some(metadata.clone()),
            _ => None,
        });

        if let Some(bytes) = self.session.loaded_magnet(info_hash) {
            drop(pending);
            debug!(info_hash = %info_hash, "magnet metadata already resident");
            return MetadataFuture::ready(info_hash.clone(), decode(info_hash, Some(bytes)));
        }

        MetadataFuture {
            info_hash: info_hash.clone(),
            state: Resolution::Waiting(pending),
        }
    }

    /// Ask the session to fetch `uri` and wait for its metadata.
    ///
    /// # Errors
    ///
    /// Returns the session error when the fetch cannot start.
    pub fn fetch_magnet(&self, uri: &str) -> TorrentResult<(MagnetInfo, MetadataFuture)> {
        let info = self.session.fetch_magnet(uri)?;
        let metadata = self.fetch_metadata(&info.info_hash);
        Ok((info, metadata))
    }

    /// Stop fetching `info_hash`.
    pub fn cancel(&self, info_hash: &InfoHash) {
        self.session.cancel_fetch_magnet(info_hash);
    }
}
