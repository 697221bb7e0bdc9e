//! Connection Handler Module
//!
//! This module handles individual client connections to linekv.
//! Each client gets its own handler task that runs in a loop,
//! reading request lines and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client admitted by the server (permit taken)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read one line           │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Parse + execute         │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Write one response line │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / error / idle timeout
//!        │
//!        ▼
//! 5. Handler dropped: socket closed, permit released
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a `BytesMut` buffer. TCP is a stream, so a
//! read may deliver part of a line or several lines at once. Lines are taken
//! from the buffer one at a time and each gets its response written before
//! the next one is looked at.

use crate::commands::CommandHandler;
use crate::config::ConnectionLimits;
use crate::connection::admission::ConnectionPermit;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling, shared by all handlers of a server
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total request lines answered
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Owns the socket and the admission permit; both are released when the
/// handler is dropped.
pub struct ConnectionHandler<S> {
    /// The client stream
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shared across connections)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Line size and idle limits
    limits: ConnectionLimits,

    /// Admission slot held for the lifetime of the connection
    _permit: ConnectionPermit,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client stream
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    /// * `limits` - Per-connection line size and idle limits
    /// * `permit` - The admission slot this connection occupies
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        limits: ConnectionLimits,
        permit: ConnectionPermit,
    ) -> Self {
        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
            limits,
            _permit: permit,
        }
    }

    /// Runs the connection loop until the client goes away or an error occurs.
    ///
    /// The stream is closed and the admission slot released when this returns.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    info!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Closing connection"),
            },
        }

        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(line) = self.try_take_line()? {
                trace!(client = %self.addr, request = %line, "Received request");

                let response = match self.command_handler.process(&line) {
                    Ok(response) => response,
                    Err(e) => {
                        debug!(client = %self.addr, error = %e, "Rejected request");
                        format!("error: {}", e)
                    }
                };
                self.stats.command_processed();

                self.send_response(&response).await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Takes one complete line (without its newline) from the buffer.
    ///
    /// The line terminator, `\n` or `\r\n`, does not count against
    /// `max_message_size`.
    fn try_take_line(&mut self) -> Result<Option<String>, ConnectionError> {
        let max = self.limits.max_message_size;

        match self.buffer.iter().position(|&b| b == b'\n') {
            Some(end) if content_len(&self.buffer[..end]) > max => {
                Err(ConnectionError::LineTooLong { max })
            }
            Some(end) => {
                let line = self.buffer.split_to(end + 1);
                Ok(Some(String::from_utf8_lossy(&line[..end]).into_owned()))
            }
            None if content_len(&self.buffer) > max => Err(ConnectionError::LineTooLong { max }),
            None => Ok(None),
        }
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        // Ensure we have some capacity
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let read = self.stream.get_mut().read_buf(&mut self.buffer);
        let n = match self.limits.idle_timeout {
            Some(idle) => tokio::time::timeout(idle, read)
                .await
                .map_err(|_| ConnectionError::IdleTimeout(idle))??,
            None => read.await?,
        };

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial line in buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Writes one response line to the client.
    async fn send_response(&mut self, response: &str) -> Result<(), ConnectionError> {
        self.stream.write_all(response.as_bytes()).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await?;

        self.stats.bytes_written(response.len() + 1);
        trace!(
            client = %self.addr,
            bytes = response.len() + 1,
            "Sent response"
        );
        Ok(())
    }
}

/// Length of a line without a trailing `\r`.
fn content_len(line: &[u8]) -> usize {
    match line.last() {
        Some(b'\r') => line.len() - 1,
        _ => line.len(),
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Client disconnected in the middle of a line
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// A request line exceeded the configured maximum
    #[error("Request line exceeds {max} bytes")]
    LineTooLong { max: usize },

    /// No data arrived within the idle timeout
    #[error("Idle for {0:?}")]
    IdleTimeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Admission;
    use crate::storage::StorageEngine;
    use std::io;
    use tokio_test::io::{Builder, Mock};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn create_handler(
        mock: Mock,
        limits: ConnectionLimits,
    ) -> (ConnectionHandler<Mock>, Arc<Admission>, Arc<ConnectionStats>) {
        let admission = Arc::new(Admission::new(1));
        let permit = admission.try_admit().unwrap();
        let stats = Arc::new(ConnectionStats::new());
        let commands = CommandHandler::new(Arc::new(StorageEngine::new()));

        let handler = ConnectionHandler::new(
            mock,
            test_addr(),
            commands,
            Arc::clone(&stats),
            limits,
            permit,
        );
        (handler, admission, stats)
    }

    #[tokio::test]
    async fn test_set_get() {
        let mock = Builder::new()
            .read(b"SET name ariz\n")
            .write(b"\n")
            .read(b"GET name\n")
            .write(b"ariz\n")
            .build();
        let (handler, admission, stats) = create_handler(mock, ConnectionLimits::default());

        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
        assert_eq!(admission.active(), 0);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 2);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 6);
    }

    #[tokio::test]
    async fn test_error_response_keeps_connection_open() {
        let mock = Builder::new()
            .read(b"get a\n")
            .write(b"error: invalid command\n")
            .read(b"SET a\n")
            .write(b"error: not enough arguments\n")
            .read(b"GET a#\n")
            .write(b"error: invalid argument\n")
            .read(b"GET a\n")
            .write(b"\n")
            .build();
        let (handler, _, stats) = create_handler(mock, ConnectionLimits::default());

        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_partial_and_batched_lines_answered_in_order() {
        let mock = Builder::new()
            .read(b"SET k")
            .read(b" v\nGET k\nDEL k\nGET k\n")
            .write(b"\n")
            .write(b"v\n")
            .write(b"\n")
            .write(b"\n")
            .build();
        let (handler, _, stats) = create_handler(mock, ConnectionLimits::default());

        handler.run().await.unwrap_err();

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_crlf_line_endings() {
        let mock = Builder::new()
            .read(b"SET k v\r\nGET k\r\n")
            .write(b"\n")
            .write(b"v\n")
            .build();
        let (handler, _, _) = create_handler(mock, ConnectionLimits::default());

        handler.run().await.unwrap_err();
    }

    #[tokio::test]
    async fn test_empty_line_is_invalid_command() {
        let mock = Builder::new()
            .read(b"\n")
            .write(b"error: invalid command\n")
            .build();
        let (handler, _, _) = create_handler(mock, ConnectionLimits::default());

        handler.run().await.unwrap_err();
    }

    #[tokio::test]
    async fn test_partial_line_at_eof() {
        let mock = Builder::new().read(b"GET k").build();
        let (handler, admission, _) = create_handler(mock, ConnectionLimits::default());

        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::UnexpectedEof)));
        assert_eq!(admission.active(), 0);
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let limits = ConnectionLimits {
            max_message_size: 8,
            idle_timeout: None,
        };
        let mock = Builder::new()
            .read(b"GET a\n")
            .write(b"\n")
            .read(b"SET key_is_long value\n")
            .build();
        let (handler, admission, _) = create_handler(mock, limits);

        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::LineTooLong { max: 8 })));
        assert_eq!(admission.active(), 0);
    }

    #[tokio::test]
    async fn test_line_of_exactly_max_size() {
        let limits = ConnectionLimits {
            max_message_size: 8,
            idle_timeout: None,
        };
        let mock = Builder::new()
            .read(b"GET abcd\n")
            .write(b"\n")
            .read(b"GET abcd\r\n")
            .write(b"\n")
            .read(b"GET abcd\r")
            .read(b"\n")
            .write(b"\n")
            .read(b"GET abcde\r\n")
            .build();
        let (handler, admission, stats) = create_handler(mock, limits);

        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::LineTooLong { max: 8 })));
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 3);
        assert_eq!(admission.active(), 0);
    }

    #[tokio::test]
    async fn test_unterminated_line_too_long() {
        let limits = ConnectionLimits {
            max_message_size: 8,
            idle_timeout: None,
        };
        let mock = Builder::new().read(b"SET aaaaaaaaaaaa").build();
        let (handler, _, _) = create_handler(mock, limits);

        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::LineTooLong { .. })));
    }

    #[tokio::test]
    async fn test_read_error_closes_connection() {
        let mock = Builder::new()
            .read(b"SET a b\n")
            .write(b"\n")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (handler, admission, _) = create_handler(mock, ConnectionLimits::default());

        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::IoError(_))));
        assert_eq!(admission.active(), 0);
    }

    #[tokio::test]
    async fn test_write_error_closes_connection() {
        let mock = Builder::new()
            .read(b"SET a b\n")
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "broken"))
            .build();
        let (handler, admission, _) = create_handler(mock, ConnectionLimits::default());

        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::IoError(_))));
        assert_eq!(admission.active(), 0);
    }
}
