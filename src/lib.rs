//! # kindwire
//!
//! Bidirectional request/response/push messaging between a client peer and
//! a server peer, independent of the transport carrying the bytes.
//!
//! ## Architecture
//!
//! - **Kinds**: every message is tagged `{Role}{Operation}{Shape}`, e.g.
//!   `ServerUsernameRequest`, derived from a shared [`OperationCatalog`]
//! - **Correlation**: requests are matched to responses by id, never by
//!   arrival order
//! - **Dispatch**: inbound requests and pushes go to handlers registered
//!   per kind; the handler gets the peer back so it can respond
//!
//! The peer only ever calls [`Transport::send`]; whoever owns the
//! connection feeds inbound data to [`Peer::handle_message`].
//!
//! ## Example
//!
//! ```ignore
//! use kindwire::{NetworkClient, OperationCatalog};
//! use serde_json::json;
//!
//! let catalog = OperationCatalog::builder()
//!     .client_request("FullState")
//!     .server_push("Tick")
//!     .build()?;
//!
//! let client: NetworkClient = NetworkClient::builder(catalog)
//!     .on_push("ServerTickPush", |_peer, _meta, push| {
//!         println!("tick {}", push.payload);
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let request = client.create_request_message("ClientFullStateRequest", &json!({ "time": 0 }))?;
//! let response = client.send_request(&socket, request)?.await?;
//! ```

pub mod catalog;
pub mod codec;
pub mod correlation;
pub mod error;
pub mod handler;
pub mod kind;
pub mod message;
pub mod transport;

mod peer;

pub use catalog::OperationCatalog;
pub use correlation::PendingResponse;
pub use error::{KindwireError, Result};
pub use kind::{Role, Shape};
pub use message::{Envelope, Push, Request, Response};
pub use peer::{ClientSide, NetworkClient, NetworkServer, Peer, PeerBuilder, PeerRole, ServerSide};
pub use transport::Transport;
