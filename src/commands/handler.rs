//! Command Handler Module
//!
//! This module applies parsed commands to the storage engine and produces
//! the response text for each request line.
//!
//! ## Supported Commands
//!
//! - `SET key value` - Store a value; responds with an empty line
//! - `GET key` - Respond with the stored value, or an empty line if absent
//! - `DEL key` - Remove a key; responds with an empty line (idempotent)

use crate::protocol::{parse_line, Command, ParseResult};
use crate::storage::StorageEngine;
use std::sync::Arc;
use tracing::trace;

/// Dispatches commands to the storage engine.
///
/// Cloning is cheap: clones share the same engine.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The storage engine
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Returns the storage engine this handler writes to.
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Parses a raw request line and executes it.
    ///
    /// A parse failure is returned untouched and the engine is not accessed.
    ///
    /// # Example
    ///
    /// ```
    /// use linekv::commands::CommandHandler;
    /// use linekv::storage::StorageEngine;
    /// use std::sync::Arc;
    ///
    /// let handler = CommandHandler::new(Arc::new(StorageEngine::new()));
    /// assert_eq!(handler.process("SET k v").unwrap(), "");
    /// assert_eq!(handler.process("GET k").unwrap(), "v");
    /// assert!(handler.process("GET k!").is_err());
    /// ```
    pub fn process(&self, line: &str) -> ParseResult<String> {
        let command = parse_line(line)?;
        Ok(self.execute(command))
    }

    /// Executes an already-parsed command and returns the response text.
    pub fn execute(&self, command: Command) -> String {
        trace!(command = %command, "Executing command");

        match command {
            Command::Set { key, value } => {
                self.storage.set(key, value);
                String::new()
            }
            Command::Get { key } => self.storage.get(&key).unwrap_or_default(),
            Command::Delete { key } => {
                self.storage.delete(&key);
                String::new()
            }
        }
    }
}
