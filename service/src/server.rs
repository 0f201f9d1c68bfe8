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

//! Command server implementation

use crate::manager::SessionManager;
use crate::session::SessionShared;
use crate::{
    NoopHandler, Result, ServerConfig, ServerError, ServerMetrics, ServerSnapshot, ServerState,
    SessionHandler, SessionId, SessionInfo,
};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use telcmd_commands::CommandRegistry;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Written to connections turned away at the session limit
const BUSY_MESSAGE: &[u8] = b"error: server busy\r\n";

/// Upper bound on delivering [`BUSY_MESSAGE`]
const BUSY_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Telnet command server
///
/// One activation of a [`CommandRegistry`] on a port. Activating binds the
/// listener and starts accepting connections; [`deactivate`] stops the
/// accept loop, closes every session and releases the port.
///
/// [`deactivate`]: CommandServer::deactivate
///
/// # Example
///
/// ```no_run
/// use telcmd_commands::{CommandInput, CommandRegistry, ParameterType};
/// use telcmd_service::{CommandServer, ServerConfig};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = CommandRegistry::build(vec![
///         CommandInput::named("add", |args| {
///             Ok((args.integer(0)? + args.integer(1)?).to_string())
///         })
///         .param(ParameterType::Integer)
///         .param(ParameterType::Integer),
///     ])?;
///
///     let config = ServerConfig::new(2020).with_prompt("t>");
///     let server = CommandServer::activate(config, Arc::new(registry)).await?;
///
///     tokio::signal::ctrl_c().await?;
///     server.deactivate().await?;
///     Ok(())
/// }
/// ```
pub struct CommandServer {
    config: ServerConfig,
    local_addr: SocketAddr,
    manager: Arc<SessionManager>,
    metrics: Arc<ServerMetrics>,
    state: AtomicU8,
    /// Stops the accept loop and, through child tokens, every session
    cancel: CancellationToken,
    accept_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    started_at: Instant,
}

impl CommandServer {
    /// Bind the configured port and start serving `registry`
    pub async fn activate(config: ServerConfig, registry: Arc<CommandRegistry>) -> Result<Self> {
        Self::activate_with_handler(config, registry, Arc::new(NoopHandler)).await
    }

    /// Like [`activate`](Self::activate), reporting session events to `handler`
    #[instrument(skip_all, fields(port = config.port))]
    pub async fn activate_with_handler(
        config: ServerConfig,
        registry: Arc<CommandRegistry>,
        handler: Arc<dyn SessionHandler>,
    ) -> Result<Self> {
        config.validate()?;

        let port = config.port;
        let listener = TcpListener::bind(config.bind_address())
            .await
            .map_err(|source| match source.kind() {
                ErrorKind::AddrInUse => ServerError::PortInUse(port),
                _ => ServerError::Bind { port, source },
            })?;
        let local_addr = listener.local_addr()?;

        let metrics = Arc::new(ServerMetrics::new());
        let shared = Arc::new(SessionShared {
            prompt: Arc::from(config.effective_prompt()),
            registry,
            handler,
            metrics: Arc::clone(&metrics),
            max_line_length: config.max_line_length,
        });
        let cancel = CancellationToken::new();
        let manager = Arc::new(SessionManager::new(shared, cancel.child_token()));

        let handle = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&manager),
            Arc::clone(&metrics),
            config.max_sessions,
            cancel.clone(),
        ));

        info!(%local_addr, "command server listening");

        Ok(Self {
            config,
            local_addr,
            manager,
            metrics,
            state: AtomicU8::new(ServerState::Listening.as_u8()),
            cancel,
            accept_handle: tokio::sync::Mutex::new(Some(handle)),
            started_at: Instant::now(),
        })
    }

    /// Stop accepting, close every session and release the port
    ///
    /// The listener is closed before this returns. Sessions get
    /// `shutdown_timeout` to unwind before their tasks are aborted; a
    /// command handler still blocked at that point is left to finish on
    /// its own thread.
    #[instrument(skip(self), fields(addr = %self.local_addr))]
    pub async fn deactivate(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(
                ServerState::Listening.as_u8(),
                ServerState::Stopping.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Err(ServerError::ServerNotRunning);
        }

        info!("deactivating command server");
        self.cancel.cancel();

        // The accept loop owns the listener; once it returns the port is free.
        if let Some(handle) = self.accept_handle.lock().await.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "accept loop failed");
            }
        }

        self.manager.shutdown(self.config.shutdown_timeout).await;
        self.state
            .store(ServerState::Stopped.as_u8(), Ordering::SeqCst);

        info!("command server deactivated");
        Ok(())
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Configuration the server was activated with
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Check if the server is accepting connections
    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Listening
    }

    /// Number of open sessions
    pub fn session_count(&self) -> usize {
        self.manager.session_count()
    }

    /// Snapshot of every open session
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.manager.sessions()
    }

    pub fn session(&self, id: SessionId) -> Option<SessionInfo> {
        self.manager.session_info(id)
    }

    /// Close one session; returns false if it was not open
    pub fn close_session(&self, id: SessionId) -> bool {
        self.manager.close_session(id)
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            local_addr: self.local_addr,
            state: self.state(),
            active_sessions: self.manager.session_count(),
            total_sessions: self.metrics.total_sessions(),
            commands_dispatched: self.metrics.commands_dispatched(),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(addr = %self.local_addr, "CommandServer dropped while still running");
        }
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for CommandServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandServer")
            .field("local_addr", &self.local_addr)
            .field("state", &self.state())
            .field("sessions", &self.session_count())
            .finish()
    }
}

async fn accept_loop(
    listener: TcpListener,
    manager: Arc<SessionManager>,
    metrics: Arc<ServerMetrics>,
    max_sessions: Option<usize>,
    cancel: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((socket, peer_addr)) => {
                if let Some(max) = max_sessions.filter(|max| manager.session_count() >= *max) {
                    warn!(%peer_addr, max, "session limit reached, rejecting connection");
                    metrics.connection_rejected();
                    tokio::spawn(reject(socket, peer_addr));
                    continue;
                }
                if let Err(err) = socket.set_nodelay(true) {
                    debug!(%peer_addr, error = %err, "failed to set TCP_NODELAY");
                }
                manager.spawn(socket, peer_addr);
            }
            Err(err) => {
                error!(error = %err, "failed to accept connection");
                metrics.connection_error();
                // Back off so a persistent accept error does not spin.
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {}
                }
            }
        }
    }

    drop(listener);
    info!("accept loop terminated");
}

/// Tell a turned-away client the server is busy, then close it
async fn reject(mut socket: TcpStream, peer_addr: SocketAddr) {
    match tokio::time::timeout(BUSY_WRITE_TIMEOUT, socket.write_all(BUSY_MESSAGE)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => debug!(%peer_addr, error = %err, "failed to send busy message"),
        Err(_) => debug!(%peer_addr, "timed out sending busy message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use telcmd_commands::CommandInput;
    use tokio::io::AsyncReadExt;
    use tracing_test::traced_test;

    fn registry() -> Arc<CommandRegistry> {
        let registry =
            CommandRegistry::build(vec![CommandInput::named("ping", |_| Ok("pong".to_string()))])
                .unwrap();
        Arc::new(registry)
    }

    fn localhost(port: u16) -> ServerConfig {
        ServerConfig::new(port).with_bind_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test]
    async fn test_reject_sends_busy_message() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        let (socket, peer_addr) = listener.accept().await.unwrap();

        reject(socket, peer_addr).await;

        let mut received = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, BUSY_MESSAGE);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_activation_is_logged() {
        let server = CommandServer::activate(localhost(free_port()), registry())
            .await
            .unwrap();
        assert!(logs_contain("command server listening"));

        server.deactivate().await.unwrap();
        assert!(logs_contain("command server deactivated"));
    }

    #[tokio::test]
    async fn test_snapshot_reflects_state() {
        let server = CommandServer::activate(localhost(free_port()), registry())
            .await
            .unwrap();
        let snapshot = server.snapshot();
        assert_eq!(snapshot.state, ServerState::Listening);
        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.local_addr, server.local_addr());

        server.deactivate().await.unwrap();
        assert_eq!(server.snapshot().state, ServerState::Stopped);
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_invalid_config_never_binds() {
        let config = localhost(free_port()).with_max_line_length(0);
        let err = CommandServer::activate(config, registry()).await.unwrap_err();
        assert!(err.is_configuration_error());
    }
}
