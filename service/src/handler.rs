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

//! Session lifecycle hooks

use crate::SessionId;
use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;

/// How a non-blank command line was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandOutcome {
    /// The invoker ran and its text was sent back
    Completed,
    /// No command is registered under the first token
    UnknownCommand,
    /// Wrong argument count or a token failed to convert
    InvalidArguments,
    /// The invoker returned an error or panicked
    Failed,
}

impl CommandOutcome {
    /// Stable label, used as the metrics `outcome` tag
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::UnknownCommand => "unknown_command",
            Self::InvalidArguments => "invalid_arguments",
            Self::Failed => "failed",
        }
    }

    /// Check if the command produced a normal response
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session event handler
///
/// Implement this trait to observe sessions. All methods are async and
/// have default implementations that do nothing.
///
/// # Example
///
/// ```no_run
/// use telcmd_service::{CommandOutcome, SessionHandler, SessionId};
/// use async_trait::async_trait;
///
/// struct AuditLog;
///
/// #[async_trait]
/// impl SessionHandler for AuditLog {
///     async fn on_command(&self, id: SessionId, command: &str, outcome: CommandOutcome) {
///         println!("{id} ran {command}: {outcome}");
///     }
/// }
/// ```
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    /// Called once a connection is accepted, before the first prompt
    async fn on_connect(&self, _id: SessionId, _peer: SocketAddr) {}

    /// Called after the response to a non-blank line has been written
    ///
    /// `command` is the first token of the line as the client typed it.
    async fn on_command(&self, _id: SessionId, _command: &str, _outcome: CommandOutcome) {}

    /// Called when the session ends, whoever closed it
    async fn on_disconnect(&self, _id: SessionId) {}
}

/// Handler that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl SessionHandler for NoopHandler {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(CommandOutcome::Completed.to_string(), "completed");
        assert_eq!(CommandOutcome::UnknownCommand.as_str(), "unknown_command");
        assert!(CommandOutcome::Completed.is_success());
        assert!(!CommandOutcome::Failed.is_success());
    }

    #[tokio::test]
    async fn test_default_methods_are_noops() {
        let handler: &dyn SessionHandler = &NoopHandler;
        let id = SessionId::new(1);
        handler.on_connect(id, "127.0.0.1:1".parse().unwrap()).await;
        handler.on_command(id, "add", CommandOutcome::Completed).await;
        handler.on_disconnect(id).await;
    }
}
