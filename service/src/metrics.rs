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

//! Server metrics
//!
//! Every recording method updates a lock-free atomic counter for
//! [`ServerMetrics::snapshot`] and mirrors the event to the `metrics`
//! facade under the `telcmd.` namespace, so an installed recorder sees
//! the same numbers.

use crate::CommandOutcome;
use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Atomic counters describing one server's activity
#[derive(Debug, Default)]
pub struct ServerMetrics {
    sessions_opened: AtomicU64,
    sessions_closed: AtomicU64,
    commands_dispatched: AtomicU64,
    protocol_errors: AtomicU64,
    handler_errors: AtomicU64,
    connection_errors: AtomicU64,
    rejected_connections: AtomicU64,
}

impl ServerMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        counter!("telcmd.sessions.total").increment(1);
        gauge!("telcmd.sessions.active").increment(1.0);
    }

    pub(crate) fn session_closed(&self, lifetime: Duration) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
        gauge!("telcmd.sessions.active").decrement(1.0);
        histogram!("telcmd.sessions.duration").record(lifetime.as_secs_f64());
    }

    /// Record the outcome of one non-blank command line
    pub(crate) fn command(&self, outcome: CommandOutcome) {
        self.commands_dispatched.fetch_add(1, Ordering::Relaxed);
        match outcome {
            CommandOutcome::Completed => {}
            CommandOutcome::UnknownCommand | CommandOutcome::InvalidArguments => {
                self.protocol_errors.fetch_add(1, Ordering::Relaxed);
            }
            CommandOutcome::Failed => {
                self.handler_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
        counter!("telcmd.commands", "outcome" => outcome.as_str()).increment(1);
    }

    pub(crate) fn handler_latency(&self, elapsed: Duration) {
        histogram!("telcmd.handler.duration").record(elapsed.as_secs_f64());
    }

    pub(crate) fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
        counter!("telcmd.protocol.errors").increment(1);
    }

    pub(crate) fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
        counter!("telcmd.connection.errors").increment(1);
    }

    pub(crate) fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
        counter!("telcmd.connections.rejected").increment(1);
    }

    /// Total sessions accepted
    pub fn total_sessions(&self) -> u64 {
        self.sessions_opened.load(Ordering::Relaxed)
    }

    /// Total non-blank command lines handled
    pub fn commands_dispatched(&self) -> u64 {
        self.commands_dispatched.load(Ordering::Relaxed)
    }

    /// Take a point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let sessions_opened = self.sessions_opened.load(Ordering::Relaxed);
        let sessions_closed = self.sessions_closed.load(Ordering::Relaxed);
        MetricsSnapshot {
            sessions_opened,
            sessions_closed,
            active_sessions: sessions_opened.saturating_sub(sessions_closed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServerMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Sessions accepted
    pub sessions_opened: u64,
    /// Sessions that have ended
    pub sessions_closed: u64,
    /// Sessions still open
    pub active_sessions: u64,
    /// Non-blank command lines handled
    pub commands_dispatched: u64,
    /// Unknown commands, bad arguments and overlong lines
    pub protocol_errors: u64,
    /// Invoker failures and panics
    pub handler_errors: u64,
    /// Accept and socket I/O failures
    pub connection_errors: u64,
    /// Connections turned away at the session limit
    pub rejected_connections: u64,
}
