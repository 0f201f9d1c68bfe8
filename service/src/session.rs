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

//! Per-connection read/dispatch/respond loop

use crate::codec::{InboundLine, LineCodec, Reply};
use crate::{
    CommandOutcome, Result, ServerError, ServerMetrics, SessionHandler, SessionId, SessionState,
};
use futures_util::{SinkExt, StreamExt};
use std::any::Any;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Instant;
use telcmd_commands::{CommandRegistry, split_command_line};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Everything a session needs that is shared across one server
pub(crate) struct SessionShared {
    pub(crate) prompt: Arc<str>,
    pub(crate) registry: Arc<CommandRegistry>,
    pub(crate) handler: Arc<dyn SessionHandler>,
    pub(crate) metrics: Arc<ServerMetrics>,
    pub(crate) max_line_length: usize,
}

impl SessionShared {
    /// Resolve, coerce and invoke one command line
    ///
    /// Every command-level failure becomes response text; only cancellation
    /// escapes as an error.
    async fn dispatch(
        &self,
        name: &str,
        rest: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, CommandOutcome)> {
        let descriptor = match self.registry.lookup(name) {
            Ok(descriptor) => Arc::clone(descriptor),
            Err(err) => return Ok((error_line(err), CommandOutcome::UnknownCommand)),
        };
        let args = match descriptor.coerce(rest) {
            Ok(args) => args,
            Err(err) => return Ok((error_line(err), CommandOutcome::InvalidArguments)),
        };

        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || descriptor.invoke(&args));
        // On cancellation the blocking invoker is left to finish on its own.
        let joined = tokio::select! {
            _ = cancel.cancelled() => return Err(ServerError::ConnectionClosed),
            joined = task => joined,
        };
        self.metrics.handler_latency(started.elapsed());

        Ok(match joined {
            Ok(Ok(text)) => (text, CommandOutcome::Completed),
            Ok(Err(err)) => (error_line(err), CommandOutcome::Failed),
            Err(err) => {
                let message = match err.try_into_panic() {
                    Ok(payload) => panic_message(payload.as_ref()),
                    Err(err) => err.to_string(),
                };
                warn!(command = name, %message, "command handler panicked");
                (
                    error_line(format_args!("handler panicked: {message}")),
                    CommandOutcome::Failed,
                )
            }
        })
    }
}

/// One client conversation
///
/// Generic over the transport so it can run on a `TcpStream` or an
/// in-memory duplex pipe.
pub(crate) struct Session<T> {
    id: SessionId,
    peer_addr: SocketAddr,
    framed: Framed<T, LineCodec>,
    shared: Arc<SessionShared>,
    state: Arc<AtomicU8>,
    commands: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub(crate) fn new(
        id: SessionId,
        peer_addr: SocketAddr,
        io: T,
        shared: Arc<SessionShared>,
        state: Arc<AtomicU8>,
        commands: Arc<AtomicU64>,
        cancel: CancellationToken,
    ) -> Self {
        let codec = LineCodec::new(shared.max_line_length);
        Self {
            id,
            peer_addr,
            framed: Framed::new(io, codec),
            shared,
            state,
            commands,
            cancel,
        }
    }

    /// Drive the session until the client leaves or the server cancels it
    ///
    /// `release` is dropped as soon as the connection is closed, before the
    /// disconnect hook runs.
    #[instrument(skip(self, release), fields(session_id = %self.id, peer_addr = %self.peer_addr))]
    pub(crate) async fn run<R: Send>(mut self, release: R) {
        let handler = Arc::clone(&self.shared.handler);
        handler.on_connect(self.id, self.peer_addr).await;

        match self.event_loop().await {
            Ok(()) => debug!("client closed the connection"),
            Err(ServerError::ConnectionClosed) => debug!("session closed by server"),
            Err(err) => {
                self.shared.metrics.connection_error();
                warn!(error = %err, "session ended with error");
            }
        }

        self.set_state(SessionState::Closed);
        // Release the socket and the session's entry before reporting the disconnect.
        drop(self.framed);
        drop(release);
        handler.on_disconnect(self.id).await;
    }

    async fn event_loop(&mut self) -> Result<()> {
        self.respond(None).await?;

        loop {
            self.set_state(SessionState::AwaitingLine);
            let inbound = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ServerError::ConnectionClosed),
                inbound = self.framed.next() => inbound,
            };

            let line = match inbound {
                None => return Ok(()),
                Some(Err(err)) => return Err(err.into()),
                Some(Ok(InboundLine::Overflow)) => {
                    self.shared.metrics.protocol_error();
                    let limit = self.framed.codec().max_length();
                    self.respond(Some(format!("error: line exceeds {limit} bytes")))
                        .await?;
                    continue;
                }
                Some(Ok(InboundLine::Line(line))) => line,
            };

            let Some((name, rest)) = split_command_line(&line) else {
                self.respond(None).await?;
                continue;
            };

            self.set_state(SessionState::Dispatching);
            let (text, outcome) = self.shared.dispatch(name, rest, &self.cancel).await?;
            self.commands.fetch_add(1, Ordering::Relaxed);
            self.shared.metrics.command(outcome);
            debug!(command = name, %outcome, "dispatched");

            self.respond(Some(text)).await?;
            self.shared
                .handler
                .on_command(self.id, name, outcome)
                .await;
        }
    }

    /// Write optional response text followed by the prompt
    async fn respond(&mut self, text: Option<String>) -> Result<()> {
        self.set_state(SessionState::Responding);
        let prompt = Reply::Prompt(Arc::clone(&self.shared.prompt));
        let cancel = self.cancel.clone();
        tokio::select! {
            _ = cancel.cancelled() => Err(ServerError::ConnectionClosed),
            written = write_reply(&mut self.framed, text, prompt) => Ok(written?),
        }
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

async fn write_reply<T>(
    framed: &mut Framed<T, LineCodec>,
    text: Option<String>,
    prompt: Reply,
) -> std::io::Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    if let Some(text) = text {
        framed.feed(Reply::Line(text)).await?;
    }
    framed.feed(prompt).await?;
    framed.flush().await
}

/// Render an error as a single `error: ` line
fn error_line(err: impl Display) -> String {
    let message = err.to_string();
    let mut line = String::with_capacity(message.len() + 7);
    line.push_str("error: ");
    for (i, part) in message.lines().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(part.trim());
    }
    line
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoopHandler;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use telcmd_commands::{CommandInput, HandlerError, ParameterType};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
    use tokio::task::JoinHandle;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SessionHandler for Recorder {
        async fn on_connect(&self, id: SessionId, _peer: SocketAddr) {
            self.events.lock().unwrap().push(format!("connect {id}"));
        }

        async fn on_command(&self, _id: SessionId, command: &str, outcome: CommandOutcome) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{command} {outcome}"));
        }

        async fn on_disconnect(&self, id: SessionId) {
            self.events.lock().unwrap().push(format!("disconnect {id}"));
        }
    }

    fn registry() -> Arc<CommandRegistry> {
        let registry = CommandRegistry::build(vec![
            CommandInput::named("add", |args| {
                Ok((args.integer(0)? + args.integer(1)?).to_string())
            })
            .param(ParameterType::Integer)
            .param(ParameterType::Integer),
            CommandInput::named("fail", |_| Err(HandlerError::new("no luck"))),
            CommandInput::named("boom", |_| -> std::result::Result<String, HandlerError> {
                panic!("kaboom")
            }),
            CommandInput::named("stall", |_| {
                std::thread::sleep(Duration::from_millis(200));
                Ok("late".to_string())
            }),
        ])
        .unwrap();
        Arc::new(registry)
    }

    struct Harness {
        client: DuplexStream,
        cancel: CancellationToken,
        state: Arc<AtomicU8>,
        commands: Arc<AtomicU64>,
        metrics: Arc<ServerMetrics>,
        task: JoinHandle<()>,
    }

    fn start(handler: Arc<dyn SessionHandler>, max_line_length: usize) -> Harness {
        let (client, server) = duplex(4096);
        let metrics = Arc::new(ServerMetrics::new());
        let shared = Arc::new(SessionShared {
            prompt: Arc::from("t>"),
            registry: registry(),
            handler,
            metrics: metrics.clone(),
            max_line_length,
        });
        let state = Arc::new(AtomicU8::new(SessionState::Connected.as_u8()));
        let commands = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();
        let session = Session::new(
            SessionId::new(1),
            "127.0.0.1:4000".parse().unwrap(),
            server,
            shared,
            state.clone(),
            commands.clone(),
            cancel.clone(),
        );
        let task = tokio::spawn(session.run(()));
        Harness {
            client,
            cancel,
            state,
            commands,
            metrics,
            task,
        }
    }

    async fn read_until_prompt(client: &mut DuplexStream) -> String {
        let mut received = Vec::new();
        let mut buf = [0u8; 256];
        while !received.ends_with(b"t>") {
            let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
                .await
                .expect("timed out waiting for prompt")
                .unwrap();
            assert!(n > 0, "stream closed before prompt");
            received.extend_from_slice(&buf[..n]);
        }
        String::from_utf8(received).unwrap()
    }

    async fn exchange(client: &mut DuplexStream, line: &str) -> String {
        client.write_all(line.as_bytes()).await.unwrap();
        read_until_prompt(client).await
    }

    #[tokio::test]
    async fn test_prompt_and_successful_command() {
        let mut h = start(Arc::new(NoopHandler), 1024);
        assert_eq!(read_until_prompt(&mut h.client).await, "t>");
        assert_eq!(exchange(&mut h.client, "add 2 3\r\n").await, "5\r\nt>");
        assert_eq!(exchange(&mut h.client, "  add  -4   1 \n").await, "-3\r\nt>");
        assert_eq!(h.commands.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_blank_line_reprompts() {
        let mut h = start(Arc::new(NoopHandler), 1024);
        read_until_prompt(&mut h.client).await;
        assert_eq!(exchange(&mut h.client, "\r\n").await, "t>");
        assert_eq!(exchange(&mut h.client, "   \t \n").await, "t>");
        assert_eq!(h.commands.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_errors_are_single_lines() {
        let mut h = start(Arc::new(NoopHandler), 1024);
        read_until_prompt(&mut h.client).await;

        let reply = exchange(&mut h.client, "nope 1\r\n").await;
        assert_eq!(reply, "error: Unknown command: nope\r\nt>");

        let reply = exchange(&mut h.client, "add x y\r\n").await;
        assert!(reply.starts_with("error: "), "{reply}");
        assert!(reply.contains("integer"), "{reply}");
        assert_eq!(reply.matches("\r\n").count(), 1);

        let reply = exchange(&mut h.client, "add 1\r\n").await;
        assert!(reply.starts_with("error: add expects 2 argument(s), got 1"));

        let reply = exchange(&mut h.client, "fail\r\n").await;
        assert_eq!(reply, "error: no luck\r\nt>");

        let snapshot = h.metrics.snapshot();
        assert_eq!(snapshot.protocol_errors, 3);
        assert_eq!(snapshot.handler_errors, 1);
    }

    #[tokio::test]
    async fn test_handler_panic_keeps_session_alive() {
        let mut h = start(Arc::new(NoopHandler), 1024);
        read_until_prompt(&mut h.client).await;

        let reply = exchange(&mut h.client, "boom\r\n").await;
        assert_eq!(reply, "error: handler panicked: kaboom\r\nt>");
        assert_eq!(exchange(&mut h.client, "add 1 1\r\n").await, "2\r\nt>");
    }

    #[tokio::test]
    async fn test_overlong_line_reported() {
        let mut h = start(Arc::new(NoopHandler), 16);
        read_until_prompt(&mut h.client).await;

        let long = format!("add {}\r\n", "9".repeat(64));
        let reply = exchange(&mut h.client, &long).await;
        assert_eq!(reply, "error: line exceeds 16 bytes\r\nt>");
        assert_eq!(exchange(&mut h.client, "add 2 2\r\n").await, "4\r\nt>");
    }

    #[tokio::test]
    async fn test_client_close_ends_session() {
        let recorder = Arc::new(Recorder::default());
        let mut h = start(recorder.clone(), 1024);
        read_until_prompt(&mut h.client).await;
        exchange(&mut h.client, "add 1 2\r\n").await;
        exchange(&mut h.client, "\r\n").await;
        exchange(&mut h.client, "what\r\n").await;
        drop(h.client);

        h.task.await.unwrap();
        assert_eq!(
            SessionState::from_u8(h.state.load(Ordering::Acquire)),
            SessionState::Closed
        );
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "connect session-1",
                "add completed",
                "what unknown_command",
                "disconnect session-1",
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_while_reading() {
        let mut h = start(Arc::new(NoopHandler), 1024);
        read_until_prompt(&mut h.client).await;

        h.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), h.task)
            .await
            .expect("session did not stop")
            .unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(h.client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_slow_handler() {
        let mut h = start(Arc::new(NoopHandler), 1024);
        read_until_prompt(&mut h.client).await;
        h.client.write_all(b"stall\r\n").await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        h.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), h.task)
            .await
            .expect("session did not stop")
            .unwrap();
    }

    #[test]
    fn test_error_line_flattens() {
        assert_eq!(error_line("a\nb\r\n  c"), "error: a b c");
        assert_eq!(error_line("plain"), "error: plain");
    }
}
