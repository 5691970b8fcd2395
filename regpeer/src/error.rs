//! Peer-side failures: everything a command can report back to the prompt.

use std::path::PathBuf;

use regpeer_core::{FrameDecodeError, FrameEncodeError, SessionError};

pub type Result<T> = std::result::Result<T, PeerError>;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// No resolved registry address accepted a connection. Fatal to the process.
    #[error("registry {host}:{port} unreachable: {reason}")]
    RegistryUnreachable {
        host: String,
        port: String,
        reason: String,
    },

    /// Shared directory could not be listed. Publish is aborted; the connection stays usable.
    #[error("shared directory {} unavailable: {source}", .path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("partial send: {sent} of {expected} bytes written")]
    PartialSend { sent: usize, expected: usize },

    #[error("connection closed after {received} of {expected} bytes")]
    ConnectionClosed { received: usize, expected: usize },

    /// Search reply had the wrong size; the result is unknown, not "not found".
    #[error("malformed search response: {0}")]
    MalformedResponse(FrameDecodeError),

    #[error("cannot encode request: {0}")]
    Encode(#[from] FrameEncodeError),

    #[error("{0}")]
    Session(SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SessionError> for PeerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Decode(e) => PeerError::MalformedResponse(e),
            SessionError::Encode(e) => PeerError::Encode(e),
            other => PeerError::Session(other),
        }
    }
}

impl PeerError {
    /// Whether the connection must be abandoned after this error.
    pub fn breaks_connection(&self) -> bool {
        matches!(
            self,
            PeerError::PartialSend { .. }
                | PeerError::ConnectionClosed { .. }
                | PeerError::MalformedResponse(_)
                | PeerError::Io(_)
                | PeerError::Session(SessionError::Broken)
        )
    }
}
