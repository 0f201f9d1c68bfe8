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

//! Telnet Command Server
//!
//! Exposes a [`CommandRegistry`](telcmd_commands::CommandRegistry) over a
//! line-oriented TCP connection. Each client gets a prompt, types a command
//! line, and receives the command's text response followed by the prompt
//! again until it disconnects or the server is deactivated.
//!
//! # Architecture
//!
//! ```text
//! Activations (port → CommandServer)
//!     ↓
//! CommandServer (listener, accept loop)
//!     ↓
//! SessionManager (DashMap of live sessions)
//!     ↓
//! Session → Framed<TcpStream, LineCodec> → CommandRegistry
//! ```
//!
//! Command handlers are synchronous and run on the blocking pool, so one
//! slow command never stalls other sessions.
//!
//! # Example
//!
//! ```no_run
//! use telcmd_commands::{CommandInput, CommandRegistry, ParameterType};
//! use telcmd_service::{Activations, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = CommandRegistry::builder()
//!         .with_help_command()
//!         .command(
//!             CommandInput::named("add", |args| {
//!                 Ok((args.integer(0)? + args.integer(1)?).to_string())
//!             })
//!             .param(ParameterType::Integer)
//!             .param(ParameterType::Integer)
//!             .with_description("Add two integers"),
//!         )
//!         .build()?;
//!
//!     let mut activations = Activations::new();
//!     activations
//!         .activate(ServerConfig::new(2020).with_prompt("t>"), Arc::new(registry))
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     activations.deactivate_all().await?;
//!     Ok(())
//! }
//! ```

mod activations;
mod codec;
mod config;
mod error;
mod handler;
mod manager;
mod metrics;
mod server;
mod session;
mod types;

pub use activations::Activations;
pub use codec::{InboundLine, LineCodec, Reply};
pub use config::{DEFAULT_PORT, DEFAULT_PROMPT, ServerConfig};
pub use error::{Result, ServerError};
pub use handler::{CommandOutcome, NoopHandler, SessionHandler};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use server::CommandServer;
pub use types::{ServerSnapshot, ServerState, SessionId, SessionInfo, SessionState};
