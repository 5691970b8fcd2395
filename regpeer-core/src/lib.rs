//! Registry directory protocol: peer side.
//! Host-driven: no I/O; host sends the bytes it is given and feeds back replies.

pub mod listing;
pub mod protocol;
pub mod session;
pub mod wire;

pub use listing::FileListing;
pub use protocol::{
    Action, PeerId, PeerLocation, Request, SearchResult, JOIN_MSG_SIZE, SEARCH_RESP_SIZE,
};
pub use session::{PeerSession, SessionError, SessionState};
pub use wire::{
    decode_request, decode_search_response, encode_join, encode_publish, encode_search,
    FrameDecodeError, FrameEncodeError,
};
