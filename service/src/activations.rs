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

//! Per-port activation table

use crate::{CommandServer, NoopHandler, Result, ServerConfig, ServerError, SessionHandler};
use std::collections::HashMap;
use std::sync::Arc;
use telcmd_commands::CommandRegistry;
use tracing::warn;

/// Running servers keyed by port
///
/// Owned by whoever hosts the command servers; at most one server per port.
///
/// # Example
///
/// ```no_run
/// use telcmd_commands::{CommandInput, CommandRegistry};
/// use telcmd_service::{Activations, ServerConfig};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(CommandRegistry::build(vec![
///     CommandInput::named("ping", |_| Ok("pong".to_string())),
/// ])?);
///
/// let mut activations = Activations::new();
/// activations.activate(ServerConfig::new(2020), registry.clone()).await?;
/// activations.activate(ServerConfig::new(2021), registry).await?;
///
/// activations.deactivate(2020).await?;
/// activations.deactivate_all().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Activations {
    servers: HashMap<u16, CommandServer>,
}

impl Activations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a server on `config.port`
    pub async fn activate(
        &mut self,
        config: ServerConfig,
        registry: Arc<CommandRegistry>,
    ) -> Result<&CommandServer> {
        self.activate_with_handler(config, registry, Arc::new(NoopHandler))
            .await
    }

    /// Activate a server on `config.port` with a session handler
    ///
    /// Fails with [`ServerError::AlreadyActive`] if this table already
    /// holds a server on the port.
    pub async fn activate_with_handler(
        &mut self,
        config: ServerConfig,
        registry: Arc<CommandRegistry>,
        handler: Arc<dyn SessionHandler>,
    ) -> Result<&CommandServer> {
        let port = config.port;
        if self.servers.contains_key(&port) {
            return Err(ServerError::AlreadyActive(port));
        }
        let server = CommandServer::activate_with_handler(config, registry, handler).await?;
        Ok(self.servers.entry(port).or_insert(server))
    }

    /// Deactivate and forget the server on `port`
    pub async fn deactivate(&mut self, port: u16) -> Result<()> {
        let server = self
            .servers
            .remove(&port)
            .ok_or(ServerError::NotActive(port))?;
        server.deactivate().await
    }

    /// Deactivate every server
    ///
    /// All servers are stopped even if some fail; the first failure is
    /// returned.
    pub async fn deactivate_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for (port, server) in self.servers.drain() {
            if let Err(err) = server.deactivate().await {
                warn!(port, error = %err, "failed to deactivate server");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn get(&self, port: u16) -> Option<&CommandServer> {
        self.servers.get(&port)
    }

    pub fn is_active(&self, port: u16) -> bool {
        self.servers.contains_key(&port)
    }

    /// Active ports in ascending order
    pub fn ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.servers.keys().copied().collect();
        ports.sort_unstable();
        ports
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
