//! Command Types
//!
//! This module defines the typed commands of the line protocol.
//!
//! ## Protocol Format
//!
//! Each request is one line of whitespace-separated tokens. The first token
//! names the command:
//! - `SET <key> <value>`
//! - `GET <key>`
//! - `DEL <key>`
//!
//! Keys and values are restricted to the charset `[A-Za-z0-9_/*]`.

use std::fmt;

/// Command name for [`Command::Set`]
pub const SET: &str = "SET";
/// Command name for [`Command::Get`]
pub const GET: &str = "GET";
/// Command name for [`Command::Delete`]
pub const DEL: &str = "DEL";

/// A parsed request.
///
/// Values of this type are only produced by the parser, so keys and values
/// always satisfy the protocol charset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store `value` under `key`, overwriting any previous value.
    Set { key: String, value: String },

    /// Read the value stored under `key`.
    Get { key: String },

    /// Remove `key` if present.
    Delete { key: String },
}

impl Command {
    /// Returns the wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => SET,
            Command::Get { .. } => GET,
            Command::Delete { .. } => DEL,
        }
    }

    /// Returns the key this command operates on.
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } | Command::Get { key } | Command::Delete { key } => key,
        }
    }

    /// Number of arguments the command consumes after its name.
    pub(crate) fn arity(name: &str) -> Option<usize> {
        match name {
            SET => Some(2),
            GET | DEL => Some(1),
            _ => None,
        }
    }
}

/// Renders the command as its canonical request line (without newline).
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Set { key, value } => write!(f, "{} {} {}", SET, key, value),
            Command::Get { key } => write!(f, "{} {}", GET, key),
            Command::Delete { key } => write!(f, "{} {}", DEL, key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let set = Command::Set {
            key: "user/1".into(),
            value: "ariz".into(),
        };
        assert_eq!(set.to_string(), "SET user/1 ariz");

        let get = Command::Get { key: "k".into() };
        assert_eq!(get.to_string(), "GET k");

        let del = Command::Delete { key: "k".into() };
        assert_eq!(del.to_string(), "DEL k");
    }

    #[test]
    fn test_name_and_key() {
        let del = Command::Delete { key: "a_b".into() };
        assert_eq!(del.name(), "DEL");
        assert_eq!(del.key(), "a_b");
    }

    #[test]
    fn test_arity() {
        assert_eq!(Command::arity("SET"), Some(2));
        assert_eq!(Command::arity("GET"), Some(1));
        assert_eq!(Command::arity("DEL"), Some(1));
        assert_eq!(Command::arity("set"), None);
    }
}
