//! Line Protocol Client
//!
//! A minimal async client: send one request line, read one response line.
//! Used by the `linekv-cli` console and by the integration tests.

use crate::protocol::Command;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Errors returned by [`Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by server")]
    ConnectionClosed,
}

/// The reply to one request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Successful response text (empty for `SET`, `DEL` and missing keys)
    Value(String),
    /// The server answered `error: <message>`
    Error(String),
}

impl Reply {
    fn from_line(line: String) -> Self {
        match line.strip_prefix("error: ") {
            Some(message) => Reply::Error(message.to_string()),
            None => Reply::Value(line),
        }
    }
}

/// A connection to a linekv server.
#[derive(Debug)]
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl Client {
    /// Connects to the server at `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (read, write) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read),
            writer: BufWriter::new(write),
        })
    }

    /// Sends a raw request line and returns the raw response line
    /// (without its newline).
    ///
    /// The line and its newline leave in a single flush.
    pub async fn send_line(&mut self, line: &str) -> Result<String, ClientError> {
        let line = line.trim_end_matches(['\r', '\n']);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        let mut response = String::new();
        if self.reader.read_line(&mut response).await? == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        if response.ends_with('\n') {
            response.pop();
        }
        Ok(response)
    }

    /// Sends a command and classifies the reply.
    pub async fn execute(&mut self, command: &Command) -> Result<Reply, ClientError> {
        let line = self.send_line(&command.to_string()).await?;
        Ok(Reply::from_line(line))
    }

    pub async fn set(&mut self, key: &str, value: &str) -> Result<Reply, ClientError> {
        self.execute(&Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await
    }

    pub async fn get(&mut self, key: &str) -> Result<Reply, ClientError> {
        self.execute(&Command::Get {
            key: key.to_string(),
        })
        .await
    }

    pub async fn delete(&mut self, key: &str) -> Result<Reply, ClientError> {
        self.execute(&Command::Delete {
            key: key.to_string(),
        })
        .await
    }
}
