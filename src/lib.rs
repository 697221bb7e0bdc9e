//! # linekv - An In-Memory Key-Value Database over a Line Protocol
//!
//! linekv is a single-node, in-memory key-value store. Clients talk to it
//! over TCP with one plain-text command per line.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                               linekv                                 │
//! │                                                                      │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐               │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │               │
//! │  │ + Admission │    │  Handler    │    │  Handler    │               │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘               │
//! │                                               │                      │
//! │                                               ▼                      │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐ │
//! │  │   Line      │    │              StorageEngine                   │ │
//! │  │   Parser    │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │ │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │ │
//! │  └─────────────┘    │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │ │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │ │
//! │                     └──────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! ```text
//! SET <key> <value>   -> ""                 | "error: <msg>"
//! GET <key>           -> value, or "" if absent | "error: <msg>"
//! DEL <key>           -> ""                 | "error: <msg>"
//! ```
//!
//! Keys and values match `[A-Za-z0-9_/*]+`. Errors are `invalid command`,
//! `not enough arguments` and `invalid argument`.
//!
//! ## Quick Start
//!
//! ```ignore
//! use linekv::config::ServerConfig;
//! use linekv::server::Server;
//! use linekv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let server = Arc::new(Server::new(ServerConfig::default(), storage));
//!
//!     server.bind().await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Request line parser and command types
//! - [`storage`]: Thread-safe storage engine
//! - [`commands`]: Applies commands to the storage engine
//! - [`connection`]: Per-client handler and admission control
//! - [`server`]: Accept loop and lifecycle
//! - [`config`]: Flags, environment variables and validated settings
//! - [`client`]: Async client for the line protocol

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use client::{Client, ClientError, Reply};
pub use commands::CommandHandler;
pub use config::{ConnectionLimits, ServerConfig};
pub use connection::{Admission, ConnectionHandler, ConnectionStats};
pub use protocol::{parse_line, Command, ParseError};
pub use server::{Server, ServerError, ServerState};
pub use storage::StorageEngine;

/// Version of linekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
