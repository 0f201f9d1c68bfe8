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

//! Error types for the command server

use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Command server error types
#[derive(Debug, Error)]
pub enum ServerError {
    /// Port is outside the usable range
    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    /// Some other configuration value is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The port is already bound by someone else
    #[error("Port {0} is already in use")]
    PortInUse(u16),

    /// Binding the listener failed for another reason
    #[error("Failed to bind port {port}: {source}")]
    Bind {
        /// Port that was requested
        port: u16,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A server is already activated on this port
    #[error("A server is already active on port {0}")]
    AlreadyActive(u16),

    /// No server is activated on this port
    #[error("No server is active on port {0}")]
    NotActive(u16),

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// The connection was closed by the server
    #[error("Connection closed")]
    ConnectionClosed,

    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Check if the error is a configuration problem detected before binding
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, ServerError::InvalidPort(_) | ServerError::InvalidConfig(_))
    }

    /// Check if the error comes from activating or deactivating a server
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            ServerError::PortInUse(_)
                | ServerError::Bind { .. }
                | ServerError::AlreadyActive(_)
                | ServerError::NotActive(_)
                | ServerError::ServerNotRunning
        )
    }

    /// Check if the error only concerns a single connection
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ServerError::ConnectionClosed | ServerError::Io(_))
    }
}
