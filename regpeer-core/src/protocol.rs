//! Registry directory protocol: action tags, wire sizes and message types.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::num::ParseIntError;
use std::str::FromStr;

/// Tag byte for a Join request.
pub const ACTION_JOIN: u8 = 0;
/// Tag byte for a Publish request.
pub const ACTION_PUBLISH: u8 = 1;
/// Tag byte for a Search request.
pub const ACTION_SEARCH: u8 = 2;

/// Join is tag + peer id.
pub const JOIN_MSG_SIZE: usize = 5;
/// Publish header is tag + file count; names follow.
pub const PUBLISH_HEADER_SIZE: usize = 5;
/// Registry reply to Search: peer id + IPv4 + port.
pub const SEARCH_RESP_SIZE: usize = 10;

/// Discriminator carried in the first byte of every peer -> registry message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Join,
    Publish,
    Search,
}

impl Action {
    pub fn tag(self) -> u8 {
        match self {
            Action::Join => ACTION_JOIN,
            Action::Publish => ACTION_PUBLISH,
            Action::Search => ACTION_SEARCH,
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            ACTION_JOIN => Ok(Action::Join),
            ACTION_PUBLISH => Ok(Action::Publish),
            ACTION_SEARCH => Ok(Action::Search),
            other => Err(other),
        }
    }
}

/// Peer identifier assigned at process start. Zero is not forbidden by the protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u32);

impl PeerId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for PeerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(PeerId)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// All peer -> registry messages. Filenames are raw bytes without the trailing NUL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Register this peer with the registry. No reply.
    Join { peer_id: PeerId },
    /// Advertise the shared files. No reply.
    Publish { filenames: Vec<Vec<u8>> },
    /// Ask which peer holds `filename`. Registry answers with [`SEARCH_RESP_SIZE`] bytes.
    Search { filename: Vec<u8> },
}

/// Where a searched file can be fetched from.
///
/// The address is kept as the raw wire bytes; formatting happens only when asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerLocation {
    pub peer_id: PeerId,
    pub ip: [u8; 4],
    pub port: u16,
}

impl PeerLocation {
    pub fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.ip)
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip(), self.port)
    }
}

impl fmt::Display for PeerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Decoded registry answer to a Search.
///
/// An all-zero reply is the not-found sentinel, so a registry can never report
/// a peer that is literally `0.0.0.0:0` with id 0. A reply with ip `0.0.0.0`
/// but a non-zero id or port is still reported as `Found`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    NotFound,
    Found(PeerLocation),
}

impl SearchResult {
    pub fn location(&self) -> Option<&PeerLocation> {
        match self {
            SearchResult::NotFound => None,
            SearchResult::Found(loc) => Some(loc),
        }
    }
}
