//! Command connection engine
//!
//! One persistent connection, strict request/response discipline: the daemon
//! has no request identifiers, so a response can only be attributed to the
//! command that is currently in flight. Every exchange therefore runs under a
//! single lock covering the write and all reads for that command, which makes
//! sharing a client across tasks safe.
//!
//! The daemon may interleave tap-event tokens onto the command connection.
//! Those tokens are stripped from every chunk before validation; a chunk that
//! was nothing but event tokens counts as an empty read and is retried.

use crate::config::BoxedConn;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use voltd_protocol::{contains, lookup, Error, FieldValue, ParserKind, Result, TapEvent};

/// Reads attempted per command before giving up
const MAX_READ_ATTEMPTS: u32 = 3;

/// Upper bound on a single read
const READ_CHUNK_SIZE: usize = 4096;

/// Synchronous request/response engine over the command connection
pub struct CommandClient {
    conn: Mutex<BoxedConn>,
    read_timeout: Option<Duration>,
}

impl CommandClient {
    pub(crate) fn new(conn: BoxedConn, read_timeout: Option<Duration>) -> Self {
        Self {
            conn: Mutex::new(conn),
            read_timeout,
        }
    }

    /// Send a command and return the validated raw response bytes
    ///
    /// Writes `command` verbatim (the wire format needs no trailing
    /// delimiter), then reads up to three chunks: event tokens are stripped,
    /// empty chunks are retried, and a non-empty chunk must contain
    /// `expected` or the call fails with [`Error::ProtocolMismatch`].
    pub async fn execute_raw(&self, command: &str, expected: &str) -> Result<Vec<u8>> {
        let mut conn = self.conn.lock().await;

        trace!(command, "sending command");
        conn.write_all(command.as_bytes()).await?;

        for attempt in 1..=MAX_READ_ATTEMPTS {
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            let n = match self.read_timeout {
                Some(limit) => tokio::time::timeout(limit, conn.read(&mut buf))
                    .await
                    .map_err(|_| {
                        Error::Transport(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("no response within {limit:?}"),
                        ))
                    })??,
                None => conn.read(&mut buf).await?,
            };

            let chunk = strip_event_tokens(&buf[..n]);
            if chunk.is_empty() {
                debug!(command, attempt, "empty response chunk, retrying");
                continue;
            }
            if !contains(&chunk, expected.as_bytes()) {
                return Err(Error::ProtocolMismatch {
                    expected: expected.to_string(),
                    actual: String::from_utf8_lossy(&chunk).into_owned(),
                });
            }
            return Ok(chunk);
        }

        Err(Error::RetryExhausted {
            attempts: MAX_READ_ATTEMPTS,
        })
    }

    /// Send a command and parse the validated response
    pub async fn execute(
        &self,
        command: &str,
        expected: &str,
        parser: ParserKind,
    ) -> Result<FieldValue> {
        let resp = self.execute_raw(command, expected).await?;
        parser.apply(&resp)
    }

    /// Query a cataloged field, applying its declared parser
    pub async fn get(&self, field: &str) -> Result<FieldValue> {
        let spec = lookup(field)
            .ok_or_else(|| Error::configuration(format!("field {field} is not in the catalog")))?;
        self.execute(&format!("get {field}"), field, spec.parser)
            .await
    }

    /// Query a cataloged field that takes a selector argument
    pub async fn get_with_arg(&self, field: &str, arg: &str) -> Result<FieldValue> {
        let spec = lookup(field)
            .ok_or_else(|| Error::configuration(format!("field {field} is not in the catalog")))?;
        self.execute(&format!("get {field} {arg}"), field, spec.parser)
            .await
    }

    /// Mutate a field and require a `done` acknowledgment
    pub async fn set(&self, field: &str, args: &[&str]) -> Result<()> {
        let command = format!("{field} {}", args.join(" "));
        self.execute(&command, field, ParserKind::Done).await?;
        Ok(())
    }
}

/// Remove interleaved tap-event tokens from a command-connection chunk
///
/// Tokens are removed in wire-stripping order (single, double, long), each
/// pass left-to-right and non-overlapping. Required for compatibility: a
/// concurrent tap can land its notification in the middle of a response.
fn strip_event_tokens(chunk: &[u8]) -> Vec<u8> {
    let mut out = chunk.to_vec();
    for kind in TapEvent::ALL {
        out = remove_all(&out, kind.as_wire().as_bytes());
    }
    out
}

fn remove_all(buf: &[u8], needle: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buf.len());
    let mut i = 0;
    while i < buf.len() {
        if buf[i..].starts_with(needle) {
            i += needle.len();
        } else {
            out.push(buf[i]);
            i += 1;
        }
    }
    out
}
