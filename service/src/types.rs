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

//! Core types for the command server

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Unique identifier for a session (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new session ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Session state (stored as atomic u8 for lock-free state management)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Connection accepted, initial prompt not yet written
    Connected = 0,
    /// Waiting for the next command line
    AwaitingLine = 1,
    /// Resolving, coercing and invoking a command
    Dispatching = 2,
    /// Writing the result and the next prompt
    Responding = 3,
    /// Connection is closed
    Closed = 4,
}

impl SessionState {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connected,
            1 => Self::AwaitingLine,
            2 => Self::Dispatching,
            3 => Self::Responding,
            _ => Self::Closed,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if the session has ended
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::AwaitingLine => write!(f, "awaiting-line"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Responding => write!(f, "responding"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    /// Configured but not yet bound
    Created = 0,
    /// Bound and accepting connections
    Listening = 1,
    /// Deactivation in progress
    Stopping = 2,
    /// Listener released
    Stopped = 3,
}

impl ServerState {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Listening,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Listening => write!(f, "listening"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Session information snapshot (for non-blocking queries)
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Session ID
    pub id: SessionId,
    /// Remote address
    pub peer_addr: SocketAddr,
    /// Current state
    pub state: SessionState,
    /// When the connection was accepted
    pub connected_at: Instant,
    /// Non-blank lines handled so far
    pub commands_handled: u64,
}

impl SessionInfo {
    /// Get the session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Bound address
    pub local_addr: SocketAddr,
    /// Lifecycle state
    pub state: ServerState,
    /// Number of open sessions
    pub active_sessions: usize,
    /// Total sessions since activation
    pub total_sessions: u64,
    /// Total commands dispatched since activation
    pub commands_dispatched: u64,
    /// Time since activation
    pub uptime: Duration,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CommandServer {{ addr: {}, state: {}, active: {}, total: {}, commands: {}, uptime: {:?} }}",
            self.local_addr,
            self.state,
            self.active_sessions,
            self.total_sessions,
            self.commands_dispatched,
            self.uptime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id() {
        let id1 = SessionId::new(1);
        let id2 = SessionId::new(2);

        assert_eq!(id1.as_u64(), 1);
        assert!(id1 < id2);
        assert_eq!(id2.to_string(), "session-2");
    }

    #[test]
    fn test_session_state_conversion() {
        for state in [
            SessionState::Connected,
            SessionState::AwaitingLine,
            SessionState::Dispatching,
            SessionState::Responding,
            SessionState::Closed,
        ] {
            assert_eq!(SessionState::from_u8(state.as_u8()), state);
        }
        assert_eq!(SessionState::from_u8(200), SessionState::Closed);
        assert!(SessionState::Closed.is_terminal());
        assert!(!SessionState::AwaitingLine.is_terminal());
    }

    #[test]
    fn test_server_state_conversion() {
        for state in [
            ServerState::Created,
            ServerState::Listening,
            ServerState::Stopping,
            ServerState::Stopped,
        ] {
            assert_eq!(ServerState::from_u8(state.as_u8()), state);
        }
        assert_eq!(ServerState::Listening.to_string(), "listening");
    }
}
