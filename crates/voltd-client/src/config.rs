//! Client configuration and connection establishment
//!
//! The daemon is reachable either over a Unix domain socket at a well-known
//! filesystem path or over TCP. Both transports behave identically above the
//! dial: the client opens one connection for commands and, when events are
//! wanted, a second independent connection the daemon pushes tap
//! notifications onto. The two are never multiplexed.

use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};
use tracing::debug;
use voltd_protocol::Result;

/// A duplex byte stream to the daemon, regardless of transport
pub(crate) trait Conn: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Conn for T {}

pub(crate) type BoxedConn = Box<dyn Conn>;

/// Where the daemon lives
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// Unix domain socket path
    Unix(PathBuf),
    /// TCP host and port
    Tcp(String, u16),
}

impl Endpoint {
    /// The default local endpoint (see [`voltd_protocol::socket_path`])
    pub fn default_unix() -> Self {
        Self::Unix(voltd_protocol::socket_path())
    }

    /// Open one connection to this endpoint
    pub(crate) async fn dial(&self) -> Result<BoxedConn> {
        match self {
            Self::Unix(path) => {
                debug!("Connecting to daemon at {:?}", path);
                let stream = UnixStream::connect(path).await?;
                Ok(Box::new(stream))
            }
            Self::Tcp(host, port) => {
                debug!("Connecting to daemon at {}:{}", host, port);
                let stream = TcpStream::connect((host.as_str(), *port)).await?;
                Ok(Box::new(stream))
            }
        }
    }
}

/// Connection options for [`crate::VoltdClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Daemon endpoint; both connections are opened against it
    pub endpoint: Endpoint,
    /// Open the event connection and start the listener task
    ///
    /// Without it the client is command-only and tap handler registration
    /// is rejected.
    pub events: bool,
    /// Per-read timeout on the command connection; `None` blocks indefinitely
    pub read_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default_unix(),
            events: true,
            read_timeout: None,
        }
    }
}
