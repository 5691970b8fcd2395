//! Host-driven API: PeerSession turns commands into bytes and replies into results.
//!
//! The host owns the connection. It asks the session for the bytes of each
//! request, sends them, and reports back what happened on the wire.

use crate::listing::FileListing;
use crate::protocol::{PeerId, SearchResult};
use crate::wire::{self, FrameDecodeError, FrameEncodeError};

/// Where the session stands with respect to its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Idle; any command may be issued.
    Ready,
    /// A Search was handed out and its reply has not been seen yet.
    AwaitingResponse,
    /// The connection failed mid-request; framing can no longer be trusted.
    Broken,
    /// The host ended the session on purpose.
    Closed,
}

/// One peer's conversation with the registry.
#[derive(Debug)]
pub struct PeerSession {
    peer_id: PeerId,
    state: SessionState,
    pending_search: Option<Vec<u8>>,
}

impl PeerSession {
    pub fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            state: SessionState::Ready,
            pending_search: None,
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Filename of the Search currently awaiting its reply.
    pub fn pending_search(&self) -> Option<&[u8]> {
        self.pending_search.as_deref()
    }

    /// Whether a new command may be issued right now.
    pub fn ensure_ready(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::AwaitingResponse => Err(SessionError::SearchInFlight),
            SessionState::Broken => Err(SessionError::Broken),
            SessionState::Closed => Err(SessionError::Closed),
        }
    }

    /// Bytes of a Join for this peer. No reply follows.
    pub fn join(&mut self) -> Result<Vec<u8>, SessionError> {
        self.ensure_ready()?;
        Ok(wire::encode_join(self.peer_id))
    }

    /// Bytes of a Publish for `listing`. No reply follows.
    pub fn publish(&mut self, listing: &FileListing) -> Result<Vec<u8>, SessionError> {
        self.ensure_ready()?;
        Ok(wire::encode_publish(listing)?)
    }

    /// Bytes of a Search. The session then waits for [`PeerSession::on_search_response`].
    pub fn search(&mut self, filename: &[u8]) -> Result<Vec<u8>, SessionError> {
        self.ensure_ready()?;
        let bytes = wire::encode_search(filename)?;
        self.state = SessionState::AwaitingResponse;
        self.pending_search = Some(filename.to_vec());
        Ok(bytes)
    }

    /// Feed the full Search reply. A reply of the wrong size breaks the session.
    pub fn on_search_response(&mut self, bytes: &[u8]) -> Result<SearchResult, SessionError> {
        match self.state {
            SessionState::AwaitingResponse => {}
            SessionState::Ready => return Err(SessionError::NoSearchPending),
            SessionState::Broken => return Err(SessionError::Broken),
            SessionState::Closed => return Err(SessionError::Closed),
        }
        self.pending_search = None;
        match wire::decode_search_response(bytes) {
            Ok(result) => {
                self.state = SessionState::Ready;
                Ok(result)
            }
            Err(e) => {
                self.state = SessionState::Broken;
                Err(SessionError::Decode(e))
            }
        }
    }

    /// The host saw a send or receive failure. Later commands fail fast.
    pub fn on_transport_failure(&mut self) {
        self.state = SessionState::Broken;
        self.pending_search = None;
    }

    /// The host is done with the connection. Later commands are refused.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.pending_search = None;
    }
}

/// Why the session refused or could not complete a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("connection is unusable after an earlier failure")]
    Broken,
    #[error("session was closed")]
    Closed,
    #[error("a search is still waiting for its response")]
    SearchInFlight,
    #[error("no search is waiting for a response")]
    NoSearchPending,
    #[error(transparent)]
    Encode(#[from] FrameEncodeError),
    #[error(transparent)]
    Decode(#[from] FrameDecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PeerLocation, SEARCH_RESP_SIZE};

    #[test]
    fn join_and_publish_keep_ready() {
        let mut s = PeerSession::new(PeerId(42));
        assert_eq!(s.join().unwrap(), vec![0, 0, 0, 0, 42]);
        let bytes = s.publish(&FileListing::from_names(["a.txt"])).unwrap();
        assert_eq!(bytes, b"\x01\x00\x00\x00\x01a.txt\x00");
        assert_eq!(s.state(), SessionState::Ready);
    }

    #[test]
    fn search_waits_for_response() {
        let mut s = PeerSession::new(PeerId(1));
        s.search(b"missing.txt").unwrap();
        assert_eq!(s.state(), SessionState::AwaitingResponse);
        assert_eq!(s.pending_search(), Some(&b"missing.txt"[..]));

        assert_eq!(s.join(), Err(SessionError::SearchInFlight));
        assert_eq!(s.search(b"other"), Err(SessionError::SearchInFlight));

        let result = s.on_search_response(&[0u8; SEARCH_RESP_SIZE]).unwrap();
        assert_eq!(result, SearchResult::NotFound);
        assert_eq!(s.state(), SessionState::Ready);
        assert_eq!(s.pending_search(), None);
    }

    #[test]
    fn found_response() {
        let mut s = PeerSession::new(PeerId(1));
        s.search(b"song.mp3").unwrap();
        let result = s
            .on_search_response(&[0, 0, 0, 7, 127, 0, 0, 1, 0x23, 0x28])
            .unwrap();
        assert_eq!(
            result,
            SearchResult::Found(PeerLocation {
                peer_id: PeerId(7),
                ip: [127, 0, 0, 1],
                port: 9000,
            })
        );
    }

    #[test]
    fn response_without_search_rejected() {
        let mut s = PeerSession::new(PeerId(1));
        assert_eq!(
            s.on_search_response(&[0u8; SEARCH_RESP_SIZE]),
            Err(SessionError::NoSearchPending)
        );
        assert_eq!(s.state(), SessionState::Ready);
    }

    #[test]
    fn malformed_response_breaks_session() {
        let mut s = PeerSession::new(PeerId(1));
        s.search(b"a").unwrap();
        assert_eq!(
            s.on_search_response(&[0u8; 9]),
            Err(SessionError::Decode(FrameDecodeError::MalformedResponse {
                len: 9
            }))
        );
        assert_eq!(s.state(), SessionState::Broken);
        assert_eq!(s.join(), Err(SessionError::Broken));
    }

    #[test]
    fn transport_failure_fails_fast() {
        let mut s = PeerSession::new(PeerId(1));
        s.search(b"a").unwrap();
        s.on_transport_failure();
        assert_eq!(s.state(), SessionState::Broken);
        assert_eq!(s.join(), Err(SessionError::Broken));
        assert_eq!(
            s.publish(&FileListing::new()),
            Err(SessionError::Broken)
        );
        assert_eq!(s.search(b"a"), Err(SessionError::Broken));
        assert_eq!(
            s.on_search_response(&[0u8; SEARCH_RESP_SIZE]),
            Err(SessionError::Broken)
        );
    }

    #[test]
    fn close_refuses_further_commands() {
        let mut s = PeerSession::new(PeerId(3));
        s.join().unwrap();
        s.close();
        assert_eq!(s.state(), SessionState::Closed);
        assert_eq!(s.join(), Err(SessionError::Closed));
        assert_eq!(s.search(b"a"), Err(SessionError::Closed));
        assert_eq!(
            s.on_search_response(&[0u8; SEARCH_RESP_SIZE]),
            Err(SessionError::Closed)
        );
    }

    #[test]
    fn encode_error_leaves_state_untouched() {
        let mut s = PeerSession::new(PeerId(1));
        assert!(matches!(
            s.search(b"bad\0name"),
            Err(SessionError::Encode(FrameEncodeError::EmbeddedNul(_)))
        ));
        assert_eq!(s.state(), SessionState::Ready);
    }
}
