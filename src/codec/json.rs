//! JSON codec using `serde_json`.

use crate::error::{KindwireError, Result};
use crate::message::Envelope;

use super::WireCodec;

/// JSON text codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl WireCodec for JsonCodec {
    #[inline]
    fn encode(&self, envelope: &Envelope) -> Result<String> {
        Ok(serde_json::to_string(envelope)?)
    }

    #[inline]
    fn decode(&self, data: &str) -> Result<Envelope> {
        serde_json::from_str(data).map_err(|e| KindwireError::Decode(e.to_string()))
    }
}
