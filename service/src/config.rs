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

//! Server configuration

use crate::{Result, ServerError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Port used when the caller does not pick one
pub const DEFAULT_PORT: u16 = 2020;

/// Prompt used when the caller supplies none or an empty one
pub const DEFAULT_PROMPT: &str = "prompt>";

/// Server configuration
///
/// Use the builder methods to customize the configuration.
///
/// # Example
///
/// ```
/// use telcmd_service::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new(2323)
///     .with_prompt("shell> ")
///     .with_max_sessions(Some(64))
///     .with_shutdown_timeout(Duration::from_secs(2));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on, must be non-zero
    pub port: u16,

    /// Interface to bind, all interfaces by default
    pub bind_ip: IpAddr,

    /// Text written before every command line
    ///
    /// Written verbatim, without a trailing newline. An empty prompt is
    /// replaced by [`DEFAULT_PROMPT`].
    pub prompt: String,

    /// Maximum number of concurrent sessions (None for unlimited)
    pub max_sessions: Option<usize>,

    /// Longest accepted command line in bytes
    ///
    /// Longer lines are discarded and reported to the client.
    pub max_line_length: usize,

    /// How long deactivation waits for sessions to unwind
    ///
    /// Session tasks still running after this are aborted.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            prompt: DEFAULT_PROMPT.to_string(),
            max_sessions: None,
            max_line_length: 4096,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration for the given port
    ///
    /// All other settings will use their default values.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Set the interface to bind
    pub fn with_bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    /// Set the prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the maximum number of concurrent sessions
    pub fn with_max_sessions(mut self, max: Option<usize>) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the maximum line length
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Address the listener binds to
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Prompt actually written to clients
    pub fn effective_prompt(&self) -> &str {
        if self.prompt.is_empty() {
            DEFAULT_PROMPT
        } else {
            &self.prompt
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ServerError::InvalidPort(self.port));
        }

        if self.max_line_length == 0 {
            return Err(ServerError::InvalidConfig(
                "max_line_length must be greater than 0".to_string(),
            ));
        }

        if self.max_sessions == Some(0) {
            return Err(ServerError::InvalidConfig(
                "max_sessions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
