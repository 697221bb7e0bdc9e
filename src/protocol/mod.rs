//! Line Protocol Implementation
//!
//! This module implements the plain-text request protocol of linekv.
//!
//! ## Overview
//!
//! Every request is a single newline-terminated line. The connection handler
//! strips the newline and hands the rest to [`parse_line`], which yields a
//! typed [`Command`] or a [`ParseError`].
//!
//! ## Modules
//!
//! - `types`: Defines the `Command` enum
//! - `parser`: Tokenizes and validates request lines
//!
//! ## Example
//!
//! ```
//! use linekv::protocol::{parse_line, Command};
//!
//! let cmd = parse_line("GET name").unwrap();
//! assert_eq!(cmd, Command::Get { key: "name".into() });
//! assert_eq!(cmd.to_string(), "GET name");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{is_valid_argument, parse_line, ParseError, ParseResult};
pub use types::Command;
