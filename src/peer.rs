//! Peer facade - one side of a client/server conversation.
//!
//! A [`Peer`] binds an [`OperationCatalog`], a [`HandlerRegistry`] and a
//! [`CorrelationTable`] to one role. It builds messages, sends them through
//! a [`Transport`], and dispatches inbound data:
//!
//! 1. Decode the envelope (failure is returned to the caller)
//! 2. If it carries `responseTo`, resolve the matching pending request,
//!    or drop it with a warning if none is outstanding
//! 3. Otherwise call the handler registered for its kind, or drop it
//!    with a warning if there is none
//!
//! Client and server peers differ only in which kinds they may send and
//! which kinds they may register handlers for.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use kindwire::catalog::OperationCatalog;
//! use kindwire::{NetworkClient, NetworkServer, Result};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let catalog = Arc::new(OperationCatalog::builder().server_request("Username").build()?);
//!
//! let server: Arc<NetworkServer> = Arc::new(NetworkServer::builder(catalog.clone()).build()?);
//!
//! let to_server = server.clone();
//! let client: NetworkClient = NetworkClient::builder(catalog)
//!     .on_request("ServerUsernameRequest", move |peer: &NetworkClient, _meta: &(), request| {
//!         let transport = |data: String| to_server.handle_message(&(), &data);
//!         peer.respond(&transport, &request, &json!({ "username": "Jamie Fraser" }))
//!     })
//!     .build()?;
//!
//! let request = server.create_request_message("ServerUsernameRequest", &json!({}))?;
//! let to_client = |data: String| client.handle_message(&(), &data);
//! let response = server.send_request(&to_client, request)?.await?;
//!
//! assert_eq!(response.payload, json!({ "username": "Jamie Fraser" }));
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::OperationCatalog;
use crate::codec::{JsonCodec, WireCodec};
use crate::correlation::{CorrelationTable, PendingResponse};
use crate::error::{KindwireError, Result};
use crate::handler::{HandlerRegistry, HandlerResult};
use crate::kind::{to_response_kind, Role, Shape};
use crate::message::{Envelope, Push, Request, Response};
use crate::transport::Transport;

/// Compile-time marker for the role a peer plays.
pub trait PeerRole: Send + Sync + 'static {
    /// Role this peer originates requests and pushes as.
    const ROLE: Role;
}

/// Marker for the client side.
#[derive(Debug, Clone, Copy)]
pub struct ClientSide;

impl PeerRole for ClientSide {
    const ROLE: Role = Role::Client;
}

/// Marker for the server side.
#[derive(Debug, Clone, Copy)]
pub struct ServerSide;

impl PeerRole for ServerSide {
    const ROLE: Role = Role::Server;
}

/// Client peer: sends `Client*Request`/`Client*Push`, handles server-originated kinds.
pub type NetworkClient<M = ()> = Peer<ClientSide, M>;

/// Server peer: sends `Server*Request`/`Server*Push`, handles client-originated kinds.
pub type NetworkServer<M = ()> = Peer<ServerSide, M>;

/// Builder for configuring and creating a [`Peer`].
///
/// Handlers are validated against the catalog in [`build`](Self::build).
pub struct PeerBuilder<R: PeerRole, M = ()> {
    catalog: Arc<OperationCatalog>,
    handlers: HandlerRegistry<Peer<R, M>, M>,
    codec: Box<dyn WireCodec>,
}

impl<R: PeerRole, M> PeerBuilder<R, M> {
    /// Create a builder over a catalog, with no handlers and the JSON codec.
    pub fn new(catalog: impl Into<Arc<OperationCatalog>>) -> Self {
        Self {
            catalog: catalog.into(),
            handlers: HandlerRegistry::new(),
            codec: Box::new(JsonCodec),
        }
    }

    /// Register a handler for a request originated by the remote peer.
    ///
    /// The handler usually answers through [`Peer::respond`].
    pub fn on_request<F>(mut self, kind: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Peer<R, M>, &M, Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.register_request(kind, handler);
        self
    }

    /// Register a handler for a push originated by the remote peer.
    pub fn on_push<F>(mut self, kind: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Peer<R, M>, &M, Push) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.register_push(kind, handler);
        self
    }

    /// Use a different wire encoding.
    pub fn codec(mut self, codec: impl WireCodec) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Validate handlers and build the peer.
    ///
    /// # Errors
    ///
    /// Returns [`KindwireError::IllegalKind`] if a handler is registered for
    /// a kind this peer can never receive.
    pub fn build(self) -> Result<Peer<R, M>> {
        let inbound = R::ROLE.opposite();
        for (kind, entry) in self.handlers.iter() {
            let (shape, reason) = if entry.is_request() {
                (Shape::Request, "not an inbound request kind for this peer")
            } else {
                (Shape::Push, "not an inbound push kind for this peer")
            };
            if !self.catalog.is_kind(kind, inbound, shape) {
                return Err(illegal(kind, reason));
            }
        }

        tracing::debug!(
            "Built {} peer with {} handler(s)",
            R::ROLE,
            self.handlers.len()
        );

        Ok(Peer {
            catalog: self.catalog,
            handlers: self.handlers,
            correlation: CorrelationTable::new(),
            codec: self.codec,
            _role: PhantomData,
        })
    }
}

/// One side of a conversation.
///
/// `R` is the role marker ([`ClientSide`] or [`ServerSide`]); `M` is the
/// provenance metadata the transport attaches to inbound messages. `Peer`
/// is `Send + Sync`; share it across tasks with an `Arc`.
pub struct Peer<R: PeerRole, M = ()> {
    catalog: Arc<OperationCatalog>,
    handlers: HandlerRegistry<Peer<R, M>, M>,
    correlation: CorrelationTable,
    codec: Box<dyn WireCodec>,
    _role: PhantomData<fn() -> R>,
}

impl<R: PeerRole, M> Peer<R, M> {
    /// Create a new peer builder.
    pub fn builder(catalog: impl Into<Arc<OperationCatalog>>) -> PeerBuilder<R, M> {
        PeerBuilder::new(catalog)
    }

    /// Role this peer plays.
    #[inline]
    pub fn role(&self) -> Role {
        R::ROLE
    }

    /// Catalog this peer was built with.
    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    /// Number of sent requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.correlation.len()
    }

    /// Build a request this peer may send.
    ///
    /// `kind` must be a request kind originated by this peer's role.
    pub fn create_request_message<T: Serialize + ?Sized>(
        &self,
        kind: &str,
        payload: &T,
    ) -> Result<Request> {
        self.check_kind(
            kind,
            R::ROLE,
            Shape::Request,
            "not an outgoing request kind for this peer",
        )?;
        Ok(Request::new(kind, serde_json::to_value(payload)?))
    }

    /// Build a response to a request received from the remote peer.
    ///
    /// `kind` must be a response kind originated by the remote role, and
    /// `response_to` should be the id of the request being answered.
    pub fn create_response_message<T: Serialize + ?Sized>(
        &self,
        kind: &str,
        response_to: &str,
        payload: &T,
    ) -> Result<Response> {
        self.check_kind(
            kind,
            R::ROLE.opposite(),
            Shape::Response,
            "not a response kind this peer can answer with",
        )?;
        Ok(Response::new(kind, response_to, serde_json::to_value(payload)?))
    }

    /// Build a push this peer may send.
    pub fn create_push_message<T: Serialize + ?Sized>(
        &self,
        kind: &str,
        payload: &T,
    ) -> Result<Push> {
        self.check_kind(
            kind,
            R::ROLE,
            Shape::Push,
            "not an outgoing push kind for this peer",
        )?;
        Ok(Push::new(kind, serde_json::to_value(payload)?))
    }

    fn check_kind(
        &self,
        kind: &str,
        role: Role,
        shape: Shape,
        reason: &'static str,
    ) -> Result<()> {
        if self.catalog.is_kind(kind, role, shape) {
            Ok(())
        } else {
            Err(illegal(kind, reason))
        }
    }

    /// Send a request and return a future for its response.
    ///
    /// The correlation entry exists before `transport.send` runs, so a
    /// transport that delivers the response synchronously still resolves
    /// the future. If the send fails the entry is removed again.
    pub fn send_request<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: Request,
    ) -> Result<PendingResponse> {
        let request_id = request.id.clone();
        let data = self.codec.encode(&Envelope::from(request))?;

        let pending = self.correlation.register(request_id.as_str());
        tracing::debug!("Sending request {}", request_id);

        if let Err(e) = transport.send(data) {
            self.correlation.remove(&request_id);
            return Err(e);
        }
        Ok(pending)
    }

    /// Send a response (no correlation bookkeeping).
    pub fn send_response<T: Transport + ?Sized>(
        &self,
        transport: &T,
        response: Response,
    ) -> Result<()> {
        tracing::debug!("Sending response to {}", response.response_to);
        let data = self.codec.encode(&Envelope::from(response))?;
        transport.send(data)
    }

    /// Send a push (fire-and-forget).
    pub fn send_push<T: Transport + ?Sized>(&self, transport: &T, push: Push) -> Result<()> {
        tracing::debug!("Sending push {}", push.kind);
        let data = self.codec.encode(&Envelope::from(push))?;
        transport.send(data)
    }

    /// Answer a received request with `payload`.
    ///
    /// Derives the response kind from the request kind and sets
    /// `responseTo` to the request id.
    pub fn respond<T, P>(&self, transport: &T, request: &Request, payload: &P) -> Result<()>
    where
        T: Transport + ?Sized,
        P: Serialize + ?Sized,
    {
        let kind = to_response_kind(&request.kind)
            .ok_or_else(|| illegal(&request.kind, "request kind has no response counterpart"))?;
        let response = self.create_response_message(&kind, &request.id, payload)?;
        self.send_response(transport, response)
    }

    /// Process one inbound message.
    ///
    /// Unmatched responses and kinds without a handler are dropped with a
    /// warning and return `Ok(())`.
    ///
    /// # Errors
    ///
    /// - [`KindwireError::Decode`] if `data` is malformed; nothing is mutated.
    /// - Any error returned by the handler.
    pub fn handle_message(&self, meta: &M, data: &str) -> Result<()> {
        let envelope = self.codec.decode(data)?;

        let envelope = match envelope.into_response() {
            Ok(response) => {
                let response_to = response.response_to.clone();
                if !self.correlation.resolve(response) {
                    tracing::warn!("No pending request for response to {}", response_to);
                }
                return Ok(());
            }
            Err(envelope) => envelope,
        };

        if !self.handlers.contains(&envelope.kind) {
            tracing::warn!("Unknown handler: {}", envelope.kind);
            return Ok(());
        }

        tracing::debug!("Dispatching {} {}", envelope.kind, envelope.id);
        self.handlers.dispatch(self, meta, envelope)?;
        Ok(())
    }
}

fn illegal(kind: &str, reason: &'static str) -> KindwireError {
    KindwireError::IllegalKind {
        kind: kind.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn catalog() -> Arc<OperationCatalog> {
        Arc::new(
            OperationCatalog::builder()
                .client_request("FullState")
                .client_push("Status")
                .server_request("Username")
                .server_push("Tick")
                .build()
                .unwrap(),
        )
    }

    fn server() -> NetworkServer {
        NetworkServer::builder(catalog()).build().unwrap()
    }

    fn client() -> NetworkClient {
        NetworkClient::builder(catalog()).build().unwrap()
    }

    /// Transport that records everything sent through it.
    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
    }

    impl Transport for Recorder {
        fn send(&self, data: String) -> Result<()> {
            self.sent.lock().unwrap().push(data);
            Ok(())
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<Envelope> {
            self.sent
                .lock()
                .unwrap()
                .drain(..)
                .map(|s| JsonCodec.decode(&s).unwrap())
                .collect()
        }
    }

    #[test]
    fn test_roles() {
        assert_eq!(client().role(), Role::Client);
        assert_eq!(server().role(), Role::Server);
    }

    #[test]
    fn test_create_messages_scoped_to_role() {
        let server = server();

        let request = server
            .create_request_message("ServerUsernameRequest", &json!({}))
            .unwrap();
        assert_eq!(request.kind, "ServerUsernameRequest");

        let push = server.create_push_message("ServerTickPush", &json!({"n": 1})).unwrap();
        assert_eq!(push.payload, json!({"n": 1}));

        let response = server
            .create_response_message("ClientFullStateResponse", "req-1", &json!({"score": 3}))
            .unwrap();
        assert_eq!(response.response_to, "req-1");

        for err in [
            server
                .create_request_message("ClientFullStateRequest", &json!({}))
                .unwrap_err(),
            server
                .create_push_message("ClientStatusPush", &json!({}))
                .unwrap_err(),
            server
                .create_response_message("ServerUsernameResponse", "x", &json!({}))
                .unwrap_err(),
            server
                .create_request_message("ServerUnknownRequest", &json!({}))
                .unwrap_err(),
        ] {
            assert!(matches!(err, KindwireError::IllegalKind { .. }));
        }
    }

    #[test]
    fn test_build_rejects_illegal_handlers() {
        let err = NetworkServer::<()>::builder(catalog())
            .on_request("ServerUsernameRequest", |_, _, _| Ok(()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            KindwireError::IllegalKind { kind, .. } if kind == "ServerUsernameRequest"
        ));

        let err = NetworkClient::<()>::builder(catalog())
            .on_push("ServerUsernameRequest", |_, _, _| Ok(()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, KindwireError::IllegalKind { .. }));

        let built = NetworkServer::<()>::builder(catalog())
            .on_request("ClientFullStateRequest", |_, _, _| Ok(()))
            .on_push("ClientStatusPush", |_, _, _| Ok(()))
            .build();
        assert!(built.is_ok());
    }

    #[tokio::test]
    async fn test_send_request_registers_then_resolves() {
        let server = server();
        let wire = Recorder::default();

        let request = server
            .create_request_message("ServerUsernameRequest", &json!({}))
            .unwrap();
        let request_id = request.id.clone();
        let pending = server.send_request(&wire, request).unwrap();

        assert_eq!(pending.request_id(), request_id);
        assert_eq!(server.pending_requests(), 1);

        let sent = wire.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, request_id);
        assert!(!sent[0].is_response());

        let reply = format!(
            r#"{{"kind":"ServerUsernameResponse","id":"r1","responseTo":"{}","payload":{{"username":"Jamie Fraser"}}}}"#,
            request_id
        );
        server.handle_message(&(), &reply).unwrap();

        assert_eq!(server.pending_requests(), 0);
        let response = pending.await.unwrap();
        assert_eq!(response.payload, json!({"username": "Jamie Fraser"}));

        // A second response to the same request is dropped silently.
        server.handle_message(&(), &reply).unwrap();
        assert_eq!(server.pending_requests(), 0);
    }

    #[test]
    fn test_failed_send_removes_entry() {
        let server = server();
        let broken = |_: String| -> Result<()> { Err(KindwireError::ConnectionClosed) };

        let request = server
            .create_request_message("ServerUsernameRequest", &json!({}))
            .unwrap();
        let err = server.send_request(&broken, request).unwrap_err();

        assert!(matches!(err, KindwireError::ConnectionClosed));
        assert_eq!(server.pending_requests(), 0);
    }

    #[test]
    fn test_unknown_kind_is_dropped() {
        let server = server();
        let wire = Recorder::default();
        let request = server
            .create_request_message("ServerUsernameRequest", &json!({}))
            .unwrap();
        let _pending = server.send_request(&wire, request).unwrap();

        let data = r#"{"kind":"ClientNobodyRequest","id":"x","payload":{}}"#;
        server.handle_message(&(), data).unwrap();

        assert_eq!(server.pending_requests(), 1);
    }

    #[test]
    fn test_malformed_data_is_an_error() {
        let server = server();
        let wire = Recorder::default();
        let request = server
            .create_request_message("ServerUsernameRequest", &json!({}))
            .unwrap();
        let _pending = server.send_request(&wire, request).unwrap();

        let err = server.handle_message(&(), "{not json").unwrap_err();
        assert!(matches!(err, KindwireError::Decode(_)));
        assert_eq!(server.pending_requests(), 1);
    }

    #[test]
    fn test_handler_receives_peer_meta_and_message() {
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
        let seen_clone = seen.clone();

        let server: NetworkServer<String> = NetworkServer::builder(catalog())
            .on_push("ClientStatusPush", move |peer: &NetworkServer<String>, meta: &String, push| {
                assert_eq!(peer.role(), Role::Server);
                let score: i64 = push.payload["score"].as_i64().unwrap_or_default();
                seen_clone
                    .lock()
                    .unwrap()
                    .push((meta.clone(), format!("{}:{}", push.kind, score)));
                Ok(())
            })
            .build()
            .unwrap();

        let client = client();
        let wire = Recorder::default();
        let push = client
            .create_push_message("ClientStatusPush", &json!({"score": 9}))
            .unwrap();
        client.send_push(&wire, push).unwrap();

        let data = JsonCodec.encode(&wire.take().remove(0)).unwrap();
        server.handle_message(&"conn-1".to_string(), &data).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("conn-1".to_string(), "ClientStatusPush:9".to_string())]
        );
    }

    #[test]
    fn test_handler_error_propagates() {
        let server: NetworkServer = NetworkServer::builder(catalog())
            .on_request("ClientFullStateRequest", |_, _, _| {
                Err(KindwireError::Handler("state unavailable".into()))
            })
            .build()
            .unwrap();

        let data = r#"{"kind":"ClientFullStateRequest","id":"q1","payload":{"time":0}}"#;
        let err = server.handle_message(&(), data).unwrap_err();
        assert!(matches!(err, KindwireError::Handler(_)));
    }

    #[test]
    fn test_respond_builds_matching_response() {
        let wire = Recorder::default();
        let server: NetworkServer = NetworkServer::builder(catalog()).build().unwrap();

        let request = Request::new("ClientFullStateRequest", json!({"time": 4}));
        server.respond(&wire, &request, &json!({"score": 10})).unwrap();

        let sent = wire.take();
        assert_eq!(sent[0].kind, "ClientFullStateResponse");
        assert_eq!(sent[0].response_to.as_deref(), Some(request.id.as_str()));
        assert_eq!(sent[0].payload, json!({"score": 10}));

        let push_like = Request::new("ClientStatusPush", json!({}));
        let err = server.respond(&wire, &push_like, &json!({})).unwrap_err();
        assert!(matches!(err, KindwireError::IllegalKind { .. }));
    }
}
