//! Registry connection: resolve host/port and connect to the first address that answers.

use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::config::AddressFamily;
use crate::error::{PeerError, Result};

/// Resolve `host:port` and try each admitted address in resolver order.
pub async fn connect_registry(host: &str, port: &str, family: AddressFamily) -> Result<TcpStream> {
    let unreachable = |reason: String| PeerError::RegistryUnreachable {
        host: host.to_string(),
        port: port.to_string(),
        reason,
    };
    let port_num: u16 = port
        .trim()
        .parse()
        .map_err(|e| unreachable(format!("invalid port: {e}")))?;
    let candidates: Vec<SocketAddr> = tokio::net::lookup_host((host, port_num))
        .await
        .map_err(|e| unreachable(format!("resolution failed: {e}")))?
        .filter(|a| family.admits(a))
        .collect();
    connect_any(&candidates).await.map_err(unreachable)
}

/// First successful connect wins. On total failure returns the last error seen.
async fn connect_any(candidates: &[SocketAddr]) -> std::result::Result<TcpStream, String> {
    let mut last_err = None;
    for addr in candidates {
        match TcpStream::connect(*addr).await {
            Ok(stream) => {
                tracing::info!(%addr, "connected to registry");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(%addr, error = %e, "connect attempt failed");
                last_err = Some(format!("{addr}: {e}"));
            }
        }
    }
    Err(last_err.unwrap_or_else(|| "no usable addresses".to_string()))
}
