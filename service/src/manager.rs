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

//! Session tracking
//!
//! The manager owns the set of live sessions for one server. Entries are
//! inserted by the accept loop, removed by the session task itself when it
//! ends, and drained all at once by [`SessionManager::shutdown`]. All three
//! go through the same [`DashMap`], so a session removing itself can never
//! race a shutdown into leaking or double-closing it.

use crate::session::{Session, SessionShared};
use crate::{ServerMetrics, SessionId, SessionInfo, SessionState};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Bookkeeping for one running session
struct ManagedSession {
    peer_addr: SocketAddr,
    connected_at: Instant,
    state: Arc<AtomicU8>,
    commands: Arc<AtomicU64>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ManagedSession {
    fn info(&self, id: SessionId) -> SessionInfo {
        SessionInfo {
            id,
            peer_addr: self.peer_addr,
            state: SessionState::from_u8(self.state.load(Ordering::Acquire)),
            connected_at: self.connected_at,
            commands_handled: self.commands.load(Ordering::Relaxed),
        }
    }
}

/// Removes the session's entry once its connection is closed or its task is aborted
struct SessionGuard {
    id: SessionId,
    sessions: Arc<DashMap<SessionId, ManagedSession>>,
    metrics: Arc<ServerMetrics>,
    started: Instant,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        self.metrics.session_closed(self.started.elapsed());
    }
}

/// Session manager
pub(crate) struct SessionManager {
    /// Live sessions (lock-free concurrent map)
    sessions: Arc<DashMap<SessionId, ManagedSession>>,
    /// Next session ID (monotonically increasing)
    next_id: AtomicU64,
    shared: Arc<SessionShared>,
    /// Parent of every session's token
    cancel: CancellationToken,
}

impl SessionManager {
    pub(crate) fn new(shared: Arc<SessionShared>, cancel: CancellationToken) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            shared,
            cancel,
        }
    }

    /// Start a session task for an accepted connection
    pub(crate) fn spawn<T>(&self, io: T, peer_addr: SocketAddr) -> SessionId
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let state = Arc::new(AtomicU8::new(SessionState::Connected.as_u8()));
        let commands = Arc::new(AtomicU64::new(0));
        let cancel = self.cancel.child_token();

        let session = Session::new(
            id,
            peer_addr,
            io,
            Arc::clone(&self.shared),
            Arc::clone(&state),
            Arc::clone(&commands),
            cancel.clone(),
        );
        let guard = SessionGuard {
            id,
            sessions: Arc::clone(&self.sessions),
            metrics: Arc::clone(&self.shared.metrics),
            started: Instant::now(),
        };
        self.shared.metrics.session_opened();

        // The shard stays locked until the entry is in place, so a session
        // that finishes immediately still finds its own entry to remove.
        let entry = self.sessions.entry(id);
        let handle = tokio::spawn(session.run(guard));
        entry.or_insert(ManagedSession {
            peer_addr,
            connected_at: Instant::now(),
            state,
            commands,
            cancel,
            handle,
        });

        debug!(session_id = %id, %peer_addr, "session started");
        id
    }

    pub(crate) fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of every live session, ordered by id
    pub(crate) fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|entry| entry.value().info(*entry.key()))
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    pub(crate) fn session_info(&self, id: SessionId) -> Option<SessionInfo> {
        self.sessions.get(&id).map(|entry| entry.info(id))
    }

    /// Ask one session to close; returns false if it is already gone
    pub(crate) fn close_session(&self, id: SessionId) -> bool {
        match self.sessions.get(&id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Close every session, waiting up to `grace` before aborting stragglers
    pub(crate) async fn shutdown(&self, grace: Duration) {
        self.cancel.cancel();

        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let handles: Vec<JoinHandle<()>> = ids
            .into_iter()
            .filter_map(|id| self.sessions.remove(&id))
            .map(|(_, managed)| managed.handle)
            .collect();
        if handles.is_empty() {
            return;
        }

        let count = handles.len();
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        match tokio::time::timeout(grace, futures_util::future::join_all(handles)).await {
            Ok(_) => info!(sessions = count, "all sessions closed"),
            Err(_) => {
                warn!(
                    sessions = count,
                    ?grace,
                    "sessions did not close in time, aborting"
                );
                for abort in aborts {
                    abort.abort();
                }
            }
        }
    }
}
