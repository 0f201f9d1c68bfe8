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

//! Tests for the per-port activation table

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use telcmd_commands::{CommandInput, CommandRegistry};
use telcmd_service::{Activations, ServerConfig, ServerError};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn config(port: u16) -> ServerConfig {
    ServerConfig::new(port).with_bind_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn registry() -> Arc<CommandRegistry> {
    Arc::new(
        CommandRegistry::build(vec![CommandInput::named("ping", |_| Ok("pong".to_string()))])
            .unwrap(),
    )
}

#[tokio::test]
async fn test_activate_and_deactivate_by_port() {
    let mut activations = Activations::new();
    let port = free_port();

    let server = activations.activate(config(port), registry()).await.unwrap();
    assert!(server.is_running());
    assert_eq!(server.port(), port);
    assert!(activations.is_active(port));
    assert_eq!(activations.len(), 1);

    activations.deactivate(port).await.unwrap();
    assert!(activations.is_empty());
    TcpListener::bind(("127.0.0.1", port)).await.unwrap();
}

#[tokio::test]
async fn test_same_port_twice_is_rejected() {
    let mut activations = Activations::new();
    let port = free_port();
    activations.activate(config(port), registry()).await.unwrap();

    let err = activations
        .activate(config(port), registry())
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::AlreadyActive(p) if p == port));
    assert!(err.is_lifecycle_error());

    // The original activation is untouched.
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let mut prompt = [0u8; 7];
    stream.read_exact(&mut prompt).await.unwrap();
    assert_eq!(&prompt, b"prompt>");

    activations.deactivate_all().await.unwrap();
}

#[tokio::test]
async fn test_unknown_port_is_not_active() {
    let mut activations = Activations::new();
    let err = activations.deactivate(free_port()).await.unwrap_err();
    assert!(matches!(err, ServerError::NotActive(_)));
}

#[tokio::test]
async fn test_failed_activation_is_not_tracked() {
    let mut activations = Activations::new();
    let err = activations.activate(config(0), registry()).await.unwrap_err();
    assert!(matches!(err, ServerError::InvalidPort(0)));
    assert!(activations.is_empty());
}

#[tokio::test]
async fn test_deactivate_all() {
    let mut activations = Activations::new();
    let mut ports = vec![free_port(), free_port(), free_port()];
    ports.sort_unstable();
    ports.dedup();
    for port in &ports {
        activations.activate(config(*port), registry()).await.unwrap();
    }
    assert_eq!(activations.ports(), ports);

    activations.deactivate_all().await.unwrap();
    assert!(activations.is_empty());
    for port in ports {
        TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    }
}
