//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Error types for command registration, lookup and coercion

use std::fmt;
use thiserror::Error;

/// Result type for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

/// Command error types
#[derive(Debug, Error)]
pub enum CommandError {
    /// Two command inputs resolved to the same name
    #[error("Duplicate command: {0}")]
    DuplicateCommand(String),

    /// No command inputs were supplied
    #[error("Registry contains no commands")]
    EmptyRegistry,

    /// A command name is empty or contains whitespace
    #[error("Invalid command name: {0:?}")]
    InvalidCommandName(String),

    /// No command with the given name is registered
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Token count differs from the declared parameter count
    #[error("{command} expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// Command being invoked
        command: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied token count
        actual: usize,
    },

    /// A token could not be converted to its declared type
    #[error("argument {} ({token:?}) is not a valid {expected}: {reason}", .index + 1)]
    TypeConversion {
        /// Zero based parameter index
        index: usize,
        /// The raw token
        token: String,
        /// Name of the declared type
        expected: String,
        /// Why the conversion failed
        reason: String,
    },

    /// The invoked handler failed
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl CommandError {
    /// Check if the error is fatal at registry build time
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CommandError::DuplicateCommand(_)
                | CommandError::EmptyRegistry
                | CommandError::InvalidCommandName(_)
        )
    }

    /// Check if the error is caused by a malformed command line
    ///
    /// Protocol errors are reported to the remote user and never end a session.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            CommandError::UnknownCommand(_)
                | CommandError::ArityMismatch { .. }
                | CommandError::TypeConversion { .. }
        )
    }

    /// Check if the error was raised by the command handler itself
    pub fn is_handler_error(&self) -> bool {
        matches!(self, CommandError::Handler(_))
    }
}

/// Error returned by a command handler
///
/// Handlers report failure with a human readable message, which is relayed
/// to the remote user verbatim (first line only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create a new handler error from anything printable
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(CommandError::EmptyRegistry.is_configuration_error());
        assert!(CommandError::DuplicateCommand("add".into()).is_configuration_error());
        assert!(CommandError::UnknownCommand("nope".into()).is_protocol_error());
        assert!(!CommandError::UnknownCommand("nope".into()).is_configuration_error());
        assert!(CommandError::Handler(HandlerError::new("boom")).is_handler_error());
    }

    #[test]
    fn test_error_display() {
        let err = CommandError::ArityMismatch {
            command: "add".to_string(),
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.to_string(), "add expects 2 argument(s), got 1");

        let err = CommandError::TypeConversion {
            index: 0,
            token: "x".to_string(),
            expected: "integer".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "argument 1 (\"x\") is not a valid integer: invalid digit found in string"
        );

        let err = CommandError::from(HandlerError::new("disk full"));
        assert_eq!(err.to_string(), "disk full");
    }
}
