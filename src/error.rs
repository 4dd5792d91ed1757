//! Error types for kindwire.

use thiserror::Error;

/// Main error type for all kindwire operations.
#[derive(Debug, Error)]
pub enum KindwireError {
    /// I/O error on a stream transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Inbound data could not be decoded into a message envelope.
    #[error("Malformed message: {0}")]
    Decode(String),

    /// Kind is not legal for the requested operation on this peer.
    #[error("Illegal kind {kind}: {reason}")]
    IllegalKind {
        /// The offending kind string.
        kind: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Operation name rejected while building a catalog.
    #[error("Invalid operation name {name:?}: {reason}")]
    InvalidOperation {
        /// The offending operation name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Two catalog operations derive the same kind string.
    #[error("Duplicate kind in catalog: {0}")]
    DuplicateKind(String),

    /// Transport refused the outgoing message.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Outgoing queue is full.
    #[error("Outgoing channel full")]
    ChannelFull,

    /// The peer owning a pending request was dropped before a response arrived.
    #[error("Peer dropped before response to {0} arrived")]
    PeerDropped(String),

    /// Inbound line exceeded the configured maximum length.
    #[error("Line exceeds maximum length of {0} bytes")]
    LineTooLong(usize),

    /// Failure reported by an integrator-supplied handler.
    #[error("Handler error: {0}")]
    Handler(String),
}

/// Result type alias using KindwireError.
pub type Result<T> = std::result::Result<T, KindwireError>;
