//! Handler registry mapping inbound kinds to handlers.
//!
//! A kind is registered either as a request kind or a push kind; the entry
//! decides which message type the raw envelope is read as on dispatch.

use std::collections::HashMap;

use crate::error::Result;
use crate::message::{Envelope, Push, Request};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Boxed handler for inbound requests.
pub type RequestHandler<P, M> = Box<dyn Fn(&P, &M, Request) -> HandlerResult + Send + Sync>;

/// Boxed handler for inbound pushes.
pub type PushHandler<P, M> = Box<dyn Fn(&P, &M, Push) -> HandlerResult + Send + Sync>;

/// Handler registered for one kind.
pub enum HandlerEntry<P, M> {
    Request(RequestHandler<P, M>),
    Push(PushHandler<P, M>),
}

impl<P, M> HandlerEntry<P, M> {
    /// Whether this entry handles requests.
    pub fn is_request(&self) -> bool {
        matches!(self, HandlerEntry::Request(_))
    }
}

/// Registry mapping kind strings to handlers.
///
/// `P` is the peer type passed to handlers, `M` the provenance metadata.
pub struct HandlerRegistry<P, M> {
    handlers: HashMap<String, HandlerEntry<P, M>>,
}

impl<P, M> HandlerRegistry<P, M> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    fn insert(&mut self, kind: String, entry: HandlerEntry<P, M>) {
        if self.handlers.insert(kind.clone(), entry).is_some() {
            tracing::warn!("Replacing handler already registered for kind {}", kind);
        }
    }

    /// Register a handler for an inbound request kind.
    pub fn register_request<F>(&mut self, kind: impl Into<String>, handler: F)
    where
        F: Fn(&P, &M, Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(kind.into(), HandlerEntry::Request(Box::new(handler)));
    }

    /// Register a handler for an inbound push kind.
    pub fn register_push<F>(&mut self, kind: impl Into<String>, handler: F)
    where
        F: Fn(&P, &M, Push) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(kind.into(), HandlerEntry::Push(Box::new(handler)));
    }

    /// Get the handler entry for a kind.
    pub fn get(&self, kind: &str) -> Option<&HandlerEntry<P, M>> {
        self.handlers.get(kind)
    }

    /// Whether a handler is registered for a kind.
    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Registered entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HandlerEntry<P, M>)> {
        self.handlers.iter().map(|(kind, entry)| (kind.as_str(), entry))
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch an envelope to the handler registered for its kind.
    ///
    /// Returns `Ok(false)` without calling anything if no handler is
    /// registered. Handler errors are returned unchanged.
    pub fn dispatch(&self, peer: &P, meta: &M, envelope: Envelope) -> Result<bool> {
        let Some(entry) = self.handlers.get(&envelope.kind) else {
            return Ok(false);
        };

        match entry {
            HandlerEntry::Request(handler) => handler(peer, meta, envelope.into_request())?,
            HandlerEntry::Push(handler) => handler(peer, meta, envelope.into_push())?,
        }
        Ok(true)
    }
}

impl<P, M> Default for HandlerRegistry<P, M> {
    fn default() -> Self {
        Self::new()
    }
}
