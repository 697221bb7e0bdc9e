//! Connection Handler Module
//!
//! This module manages individual client connections to linekv.
//! Each admitted client connection is handled by its own async task.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Server accept loop                      │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept() + Admission::try_admit()
//!                        ▼
//!           ┌────────────────────────┐
//!           │  admitted?  no ──> close socket, no bytes sent
//!           └────────────┬───────────┘
//!                        │ yes: spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read line   │───>│ Parse line  │───>│ Execute cmd │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Send resp   │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Admission Control**: Lock-free bounded counter with RAII permits
//! - **Strict Ordering**: One response line per request line, in order
//! - **Limits**: Maximum line size and idle timeout per connection
//! - **Statistics**: Tracks command and byte counts

pub mod admission;
pub mod handler;

// Re-export commonly used types
pub use admission::{Admission, ConnectionPermit};
pub use handler::{ConnectionError, ConnectionHandler, ConnectionStats};
