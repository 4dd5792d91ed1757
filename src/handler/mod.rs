//! Handler module - inbound request and push dispatch.
//!
//! Provides [`HandlerRegistry`], the per-peer map from inbound kind to the
//! integrator-supplied function that handles it. A handler receives the peer
//! itself, the transport's provenance metadata and the decoded message, so
//! it can build and send a response through the same peer.
//!
//! # Example
//!
//! ```
//! use kindwire::handler::HandlerRegistry;
//! use kindwire::message::Request;
//!
//! struct Peer;
//!
//! let mut registry: HandlerRegistry<Peer, ()> = HandlerRegistry::new();
//! registry.register_request("ServerUsernameRequest", |_peer: &Peer, _meta: &(), request: Request| {
//!     println!("asked for username by {}", request.id);
//!     Ok(())
//! });
//!
//! assert!(registry.contains("ServerUsernameRequest"));
//! ```

mod registry;

pub use registry::{HandlerEntry, HandlerRegistry, HandlerResult, PushHandler, RequestHandler};
