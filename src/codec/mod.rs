//! Codec module - wire encoding of message envelopes.
//!
//! Peers hand each outgoing [`Envelope`](crate::message::Envelope) to a
//! [`WireCodec`] and pass the resulting string to the transport. Inbound
//! strings go through the same codec before dispatch.
//!
//! - [`JsonCodec`] - JSON text (default)
//!
//! # Example
//!
//! ```
//! use kindwire::codec::{JsonCodec, WireCodec};
//! use kindwire::message::{Envelope, Push};
//! use serde_json::json;
//!
//! let envelope: Envelope = Push::new("ServerTickPush", json!({"n": 1})).into();
//! let text = JsonCodec.encode(&envelope).unwrap();
//! assert_eq!(JsonCodec.decode(&text).unwrap(), envelope);
//! ```

mod json;

pub use json::JsonCodec;

use crate::error::Result;
use crate::message::Envelope;

/// Text encoding for envelopes.
///
/// Any encoding that preserves field names and string values is
/// interchangeable with [`JsonCodec`].
pub trait WireCodec: Send + Sync + 'static {
    /// Encode an envelope for the transport.
    fn encode(&self, envelope: &Envelope) -> Result<String>;

    /// Decode inbound transport data.
    ///
    /// # Errors
    ///
    /// Returns [`KindwireError::Decode`](crate::KindwireError::Decode) for
    /// malformed data.
    fn decode(&self, data: &str) -> Result<Envelope>;
}
