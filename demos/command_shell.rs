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

//! Command Shell Example
//!
//! Serves a small key/value shell on port 2020 (or the first argument).
//!
//! ```text
//! cargo run -p telcmd-service --example command_shell -- 2323
//! telnet localhost 2323
//! shell> set greeting hello
//! ok
//! shell> list ^g
//! greeting
//! shell> add 2 3
//! 5
//! ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use telcmd_commands::{CommandInput, CommandRegistry, HandlerError, ParameterType};
use telcmd_service::{
    Activations, CommandOutcome, DEFAULT_PORT, ServerConfig, SessionHandler, SessionId,
};
use tracing::info;

const JOKES: &[&str] = &[
    "There are 10 kinds of people: those who read binary and those who don't.",
    "A SQL query walks into a bar, walks up to two tables and asks: may I join you?",
    "Why do programmers prefer dark mode? Because light attracts bugs.",
];

type Store = Arc<Mutex<BTreeMap<String, String>>>;

fn lock(store: &Store) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, HandlerError> {
    store
        .lock()
        .map_err(|_| HandlerError::new("store is unavailable"))
}

fn build_registry() -> telcmd_commands::Result<CommandRegistry> {
    let store: Store = Arc::default();
    let next_joke = Arc::new(AtomicUsize::new(0));

    let list_store = store.clone();
    let set_store = store.clone();
    let get_store = store;

    CommandRegistry::builder()
        .with_help_command()
        .command(
            CommandInput::derived("doDate", |_| {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_err(HandlerError::new)?;
                Ok(format!("{} seconds since the Unix epoch", now.as_secs()))
            })
            .with_description("Show the current time"),
        )
        .command(
            CommandInput::derived("doJoke", move |_| {
                let index = next_joke.fetch_add(1, Ordering::Relaxed) % JOKES.len();
                Ok(JOKES[index].to_string())
            })
            .with_description("Tell a joke"),
        )
        .command(
            CommandInput::derived("doList", move |args| {
                let pattern = args.pattern(0)?;
                let store = lock(&list_store)?;
                let keys: Vec<&str> = store
                    .keys()
                    .map(String::as_str)
                    .filter(|key| pattern.is_match(key))
                    .collect();
                Ok(keys.join("\n"))
            })
            .named_param("pattern", ParameterType::Pattern)
            .with_description("List keys matching a regular expression"),
        )
        .command(
            CommandInput::derived("doSet", move |args| {
                let key = args.string(0)?.to_string();
                let value = args.string(1)?.to_string();
                lock(&set_store)?.insert(key, value);
                Ok("ok".to_string())
            })
            .named_param("key", ParameterType::String)
            .named_param("value", ParameterType::String)
            .with_description("Store a value"),
        )
        .command(
            CommandInput::derived("doGet", move |args| {
                let key = args.string(0)?;
                lock(&get_store)?
                    .get(key)
                    .cloned()
                    .ok_or_else(|| HandlerError::new(format!("no value for {key}")))
            })
            .named_param("key", ParameterType::String)
            .with_description("Fetch a stored value"),
        )
        .command(
            CommandInput::derived("doAdd", |args| {
                let sum = args
                    .integer(0)?
                    .checked_add(args.integer(1)?)
                    .ok_or_else(|| HandlerError::new("integer overflow"))?;
                Ok(sum.to_string())
            })
            .named_param("a", ParameterType::Integer)
            .named_param("b", ParameterType::Integer)
            .with_description("Add two integers"),
        )
        .build()
}

/// Logs every session event
struct AuditLog;

#[async_trait]
impl SessionHandler for AuditLog {
    async fn on_connect(&self, id: SessionId, peer: SocketAddr) {
        info!(%id, %peer, "client connected");
    }

    async fn on_command(&self, id: SessionId, command: &str, outcome: CommandOutcome) {
        info!(%id, command, %outcome, "command handled");
    }

    async fn on_disconnect(&self, id: SessionId) {
        info!(%id, "client disconnected");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let port = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => DEFAULT_PORT,
    };

    let registry = Arc::new(build_registry()?);
    info!(commands = ?registry.names(), "registry built");

    let mut activations = Activations::new();
    let config = ServerConfig::new(port).with_prompt("shell> ");
    let server = activations
        .activate_with_handler(config, registry, Arc::new(AuditLog))
        .await?;
    info!(addr = %server.local_addr(), "connect with: telnet localhost {port}");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    activations.deactivate_all().await?;
    Ok(())
}
