//! Request Line Parser
//!
//! This module turns one line of text into a [`Command`].
//!
//! ## How the Parser Works
//!
//! 1. Split the line on runs of whitespace.
//! 2. Match the first token, case-sensitively, against `SET`, `GET` and `DEL`.
//! 3. Check that enough arguments follow. Extra trailing tokens are ignored.
//! 4. Validate every consumed argument against the key/value charset.
//!
//! The parser is pure: it has no state and no side effects.

use crate::protocol::types::{Command, DEL, GET, SET};
use thiserror::Error;

/// Errors that can occur while parsing a request line.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The first token is not a known command name (or the line is blank)
    #[error("invalid command")]
    InvalidCommand,

    /// Fewer arguments than the command requires
    #[error("not enough arguments")]
    NotEnoughArguments,

    /// A consumed argument contains characters outside `[A-Za-z0-9_/*]`
    #[error("invalid argument")]
    InvalidArgument,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Returns `true` if `arg` is a non-empty run of `[A-Za-z0-9_/*]`.
pub fn is_valid_argument(arg: &str) -> bool {
    !arg.is_empty()
        && arg
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'/' | b'*'))
}

/// Parses one request line into a [`Command`].
///
/// The line must not contain its terminating newline; any surrounding
/// whitespace (including a stray `\r`) is ignored by tokenization.
///
/// # Example
///
/// ```
/// use linekv::protocol::{parse_line, Command, ParseError};
///
/// let cmd = parse_line("SET name value").unwrap();
/// assert_eq!(cmd, Command::Set { key: "name".into(), value: "value".into() });
///
/// assert_eq!(parse_line("get name"), Err(ParseError::InvalidCommand));
/// ```
pub fn parse_line(line: &str) -> ParseResult<Command> {
    let mut tokens = line.split_whitespace();

    let name = tokens.next().ok_or(ParseError::InvalidCommand)?;
    let arity = Command::arity(name).ok_or(ParseError::InvalidCommand)?;

    let args: Vec<&str> = tokens.take(arity).collect();
    if args.len() < arity {
        return Err(ParseError::NotEnoughArguments);
    }

    if !args.iter().all(|arg| is_valid_argument(arg)) {
        return Err(ParseError::InvalidArgument);
    }

    let key = args[0].to_string();
    let command = match name {
        SET => Command::Set {
            key,
            value: args[1].to_string(),
        },
        GET => Command::Get { key },
        DEL => Command::Delete { key },
        _ => return Err(ParseError::InvalidCommand),
    };

    Ok(command)
}
