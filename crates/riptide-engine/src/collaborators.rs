//! Outward-facing seams the coordinator talks to besides the session.

use riptide_torrent_core::{TorrentErrorKind, TorrentId};

/// Why an add request failed, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddFailure {
    /// The `.torrent` file does not exist.
    NotFound,
    /// Reading or writing storage failed.
    Io,
    /// Not enough room in the download directory.
    FreeSpace,
    /// The `.torrent` file could not be decoded.
    Decode,
    /// Anything else the session reported.
    Other,
}

impl AddFailure {
    /// Failure shown for `kind`; duplicates are not failures.
    #[must_use]
    pub const fn classify(kind: TorrentErrorKind) -> Option<Self> {
        match kind {
            TorrentErrorKind::AlreadyExists => None,
            TorrentErrorKind::NotFound => Some(Self::NotFound),
            TorrentErrorKind::Io => Some(Self::Io),
            TorrentErrorKind::FreeSpace => Some(Self::FreeSpace),
            TorrentErrorKind::Decode => Some(Self::Decode),
            TorrentErrorKind::Other => Some(Self::Other),
        }
    }
}

/// User-visible notification raised by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The torrent is already in the session.
    TorrentExists {
        /// Display name of the duplicate.
        name: String,
    },
    /// Adding a torrent failed.
    AddFailed {
        /// Torrent name, or the file path when the name is unknown.
        name: String,
        /// Failure classification.
        reason: AddFailure,
    },
    /// A torrent finished downloading.
    Finished {
        /// Finished torrent.
        torrent_id: TorrentId,
        /// Display name.
        name: String,
    },
    /// Torrent storage started moving.
    Moving {
        /// Moving torrent.
        torrent_id: TorrentId,
        /// Display name.
        name: String,
    },
    /// Torrent storage finished moving.
    Moved {
        /// Moved torrent.
        torrent_id: TorrentId,
        /// Display name.
        name: String,
        /// Whether the move succeeded.
        success: bool,
    },
    /// The session reported an error.
    SessionError {
        /// Session message.
        message: String,
    },
    /// Port mapping failed.
    NatError {
        /// Session message.
        message: String,
    },
    /// A torrent could not be restored from saved state.
    RestoreFailed {
        /// Torrent that failed.
        torrent_id: TorrentId,
        /// Display name, or the id when unknown.
        name: String,
    },
    /// Metadata arrived but the payload does not fit on disk.
    FreeSpace {
        /// Affected torrent.
        torrent_id: TorrentId,
        /// Display name.
        name: String,
    },
    /// The IP filter file was parsed.
    IpFilterParsed {
        /// Whether parsing succeeded.
        success: bool,
    },
    /// The streaming server could not start.
    StreamingFailed {
        /// Error detail.
        message: String,
    },
    /// Pending proxy preferences were pushed to the session.
    ProxyApplied,
}

/// Fire-and-forget sink for [`Notice`]s.
pub trait Notifier: Send + Sync {
    /// Show `notice` to the user.
    fn notify(&self, notice: Notice);
}

/// Local HTTP server streaming torrent payloads.
pub trait StreamingServer: Send + Sync {
    /// Bind to `host:port` and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error when the server cannot bind.
    fn start(&self, host: &str, port: u16) -> anyhow::Result<()>;

    /// Stop serving; a no-op when stopped.
    fn stop(&self);
}

/// Hosting process that keeps the engine alive.
pub trait ServiceHost: Send + Sync {
    /// Make sure the host is running before torrents are added.
    fn ensure_started(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_not_failures() {
        assert_eq!(AddFailure::classify(TorrentErrorKind::AlreadyExists), None);
        assert_eq!(
            AddFailure::classify(TorrentErrorKind::FreeSpace),
            Some(AddFailure::FreeSpace)
        );
        assert_eq!(
            AddFailure::classify(TorrentErrorKind::Other),
            Some(AddFailure::Other)
        );
    }
}
