//! Command dispatch: one registry operation per command over the owned connection.

use std::fmt;
use std::str::FromStr;

use regpeer_core::{PeerId, PeerLocation, PeerSession, SearchResult, SEARCH_RESP_SIZE};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::shared::SharedDir;
use crate::transport::{recv_exact, send_all};

/// Command names accepted at the prompt. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Join,
    Publish,
    Search,
    Exit,
}

impl FromStr for CommandKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "JOIN" => Ok(CommandKind::Join),
            "PUBLISH" => Ok(CommandKind::Publish),
            "SEARCH" => Ok(CommandKind::Search),
            "EXIT" => Ok(CommandKind::Exit),
            _ => Err(()),
        }
    }
}

/// A fully specified command, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Publish,
    Search(Vec<u8>),
    Exit,
}

/// What a command achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Joined(PeerId),
    Published(usize),
    Found(PeerLocation),
    NotFound,
    Exited,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Joined(id) => write!(f, "Joined registry as peer {id}"),
            Outcome::Published(n) => write!(f, "Published {n} file(s)"),
            Outcome::Found(loc) => write!(f, "File found at peer {} ({loc})", loc.peer_id),
            Outcome::NotFound => f.write_str("File not found"),
            Outcome::Exited => f.write_str("Exiting..."),
        }
    }
}

/// Owns the registry connection for the life of the process.
pub struct Dispatcher<S> {
    stream: S,
    session: PeerSession,
    shared: SharedDir,
}

impl<S> Dispatcher<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer_id: PeerId, shared: SharedDir) -> Self {
        Self {
            stream,
            session: PeerSession::new(peer_id),
            shared,
        }
    }

    /// Run one command. Only Search waits for a reply.
    pub async fn execute(&mut self, cmd: Command) -> Result<Outcome> {
        match cmd {
            Command::Join => {
                let bytes = self.session.join()?;
                self.send(&bytes).await?;
                tracing::info!(peer_id = %self.session.peer_id(), "join sent");
                Ok(Outcome::Joined(self.session.peer_id()))
            }
            Command::Publish => {
                self.session.ensure_ready()?;
                let listing = self.shared.snapshot().await?;
                let bytes = self.session.publish(&listing)?;
                self.send(&bytes).await?;
                tracing::info!(files = listing.len(), bytes = bytes.len(), "publish sent");
                Ok(Outcome::Published(listing.len()))
            }
            Command::Search(filename) => {
                let bytes = self.session.search(&filename)?;
                self.send(&bytes).await?;
                tracing::debug!(
                    file = ?self.session.pending_search().map(String::from_utf8_lossy),
                    "awaiting search reply"
                );
                let mut reply = [0u8; SEARCH_RESP_SIZE];
                if let Err(e) = recv_exact(&mut self.stream, &mut reply).await {
                    self.session.on_transport_failure();
                    return Err(e);
                }
                let result = self.session.on_search_response(&reply)?;
                tracing::info!(
                    file = %String::from_utf8_lossy(&filename),
                    found = result.location().is_some(),
                    "search answered"
                );
                Ok(match result {
                    SearchResult::NotFound => Outcome::NotFound,
                    SearchResult::Found(loc) => Outcome::Found(loc),
                })
            }
            Command::Exit => {
                if let Err(e) = self.stream.shutdown().await {
                    tracing::debug!(error = %e, "shutdown failed");
                }
                self.session.close();
                Ok(Outcome::Exited)
            }
        }
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let res = send_all(&mut self.stream, bytes).await;
        if res.is_err() {
            self.session.on_transport_failure();
        }
        res
    }
}
