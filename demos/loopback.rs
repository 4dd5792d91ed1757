//! Loopback - a client and a server talking over in-process channels.
//!
//! This demo shows:
//! - Declaring an operation catalog shared by both peers
//! - Registering request and push handlers
//! - Awaiting a response while the other side runs on its own task
//!
//! Run with `RUST_LOG=debug cargo run --example loopback` to see dispatch logs.

use std::sync::Arc;

use kindwire::{NetworkClient, NetworkServer, OperationCatalog, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Serialize, Deserialize, Debug)]
struct FullState {
    score: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let catalog = Arc::new(
        OperationCatalog::builder()
            .client_request("FullState")
            .client_push("Status")
            .server_push("Tick")
            .build()?,
    );

    let (to_server, mut server_inbox) = mpsc::unbounded_channel::<String>();
    let (to_client, mut client_inbox) = mpsc::unbounded_channel::<String>();

    let server: Arc<NetworkServer> = Arc::new({
        let to_client = to_client.clone();
        NetworkServer::builder(catalog.clone())
            .on_request("ClientFullStateRequest", move |peer: &NetworkServer, _meta: &(), request| {
                peer.respond(&to_client, &request, &FullState { score: 42 })
            })
            .on_push("ClientStatusPush", |_: &NetworkServer, _meta: &(), push| {
                println!("server got status: {}", push.payload);
                Ok(())
            })
            .build()?
    });

    let client: Arc<NetworkClient> = Arc::new(
        NetworkClient::builder(catalog)
            .on_push("ServerTickPush", |_: &NetworkClient, _meta: &(), push| {
                println!("client got tick: {}", push.payload);
                Ok(())
            })
            .build()?,
    );

    let server_loop = tokio::spawn({
        let server = server.clone();
        async move {
            while let Some(data) = server_inbox.recv().await {
                if let Err(e) = server.handle_message(&(), &data) {
                    tracing::error!("Server dropped message: {}", e);
                }
            }
        }
    });
    tokio::spawn({
        let client = client.clone();
        async move {
            while let Some(data) = client_inbox.recv().await {
                if let Err(e) = client.handle_message(&(), &data) {
                    tracing::error!("Client dropped message: {}", e);
                }
            }
        }
    });

    let tick = server.create_push_message("ServerTickPush", &serde_json::json!({ "n": 1 }))?;
    server.send_push(&to_client, tick)?;

    let status = client.create_push_message("ClientStatusPush", &serde_json::json!({ "ok": true }))?;
    client.send_push(&to_server, status)?;

    let request = client.create_request_message("ClientFullStateRequest", &serde_json::json!({ "time": 0 }))?;
    let response = client.send_request(&to_server, request)?.await?;
    let state: FullState = response.payload_as()?;
    println!("client got full state: {:?}", state);

    drop(to_server);
    if let Err(e) = server_loop.await {
        tracing::error!("Server loop failed: {}", e);
    }
    Ok(())
}
