//! Message envelopes - requests, responses and pushes.
//!
//! Every message carries a `kind` and a freshly generated `id`. A response
//! additionally carries `responseTo`, the `id` of the request it answers.
//! On the wire all three shapes share one [`Envelope`] record; presence of
//! `responseTo` is the only thing that marks a response.
//!
//! ```text
//! Request:  {"kind":"ServerUsernameRequest","id":"…","payload":{}}
//! Response: {"kind":"ServerUsernameResponse","id":"…","responseTo":"…","payload":{"username":"Jamie Fraser"}}
//! Push:     {"kind":"ClientStatusPush","id":"…","payload":{"score":3}}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::kind::to_response_kind;

/// Generate a globally unique message id (UUID v4).
pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// Structural wire form shared by all message shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Kind string, e.g. `ServerUsernameRequest`.
    pub kind: String,
    /// Unique id of this message.
    pub id: String,
    /// Id of the request this answers; present only on responses.
    #[serde(
        rename = "responseTo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_to: Option<String>,
    /// Operation-specific payload.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Whether this envelope is a response (carries `responseTo`).
    #[inline]
    pub fn is_response(&self) -> bool {
        self.response_to.is_some()
    }

    /// Convert into a [`Response`] if `responseTo` is present.
    ///
    /// Hands the envelope back unchanged when it is not a response.
    pub fn into_response(self) -> std::result::Result<Response, Envelope> {
        match self.response_to {
            Some(response_to) => Ok(Response {
                kind: self.kind,
                id: self.id,
                response_to,
                payload: self.payload,
            }),
            None => Err(self),
        }
    }

    /// Read as a [`Request`], ignoring any `responseTo`.
    pub fn into_request(self) -> Request {
        Request {
            kind: self.kind,
            id: self.id,
            payload: self.payload,
        }
    }

    /// Read as a [`Push`], ignoring any `responseTo`.
    pub fn into_push(self) -> Push {
        Push {
            kind: self.kind,
            id: self.id,
            payload: self.payload,
        }
    }
}

/// A message expecting a correlated [`Response`].
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Kind string, e.g. `ServerUsernameRequest`.
    pub kind: String,
    /// Unique id of this message.
    pub id: String,
    /// Operation-specific payload.
    pub payload: Value,
}

impl Request {
    /// Create a request with a fresh id.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            id: new_message_id(),
            payload,
        }
    }

    /// Kind a response to this request must carry.
    ///
    /// `None` if this request's kind does not end in `Request`.
    pub fn response_kind(&self) -> Option<String> {
        to_response_kind(&self.kind)
    }

    /// Deserialize the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.payload)?)
    }
}

/// Answer to a [`Request`], correlated by `response_to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Kind string, e.g. `ServerUsernameRequest`.
    pub kind: String,
    /// Unique id of this message.
    pub id: String,
    /// Id of the request this answers.
    pub response_to: String,
    /// Operation-specific payload.
    pub payload: Value,
}

impl Response {
    /// Create a response with a fresh id.
    pub fn new(kind: impl Into<String>, response_to: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            id: new_message_id(),
            response_to: response_to.into(),
            payload,
        }
    }

    /// Deserialize the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.payload)?)
    }
}

/// One-way message without correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct Push {
    /// Kind string, e.g. `ServerUsernameRequest`.
    pub kind: String,
    /// Unique id of this message.
    pub id: String,
    /// Operation-specific payload.
    pub payload: Value,
}

impl Push {
    /// Create a push with a fresh id.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            id: new_message_id(),
            payload,
        }
    }

    /// Deserialize the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.payload)?)
    }
}

impl From<Request> for Envelope {
    fn from(m: Request) -> Self {
        Envelope {
            kind: m.kind,
            id: m.id,
            response_to: None,
            payload: m.payload,
        }
    }
}

impl From<Response> for Envelope {
    fn from(m: Response) -> Self {
        Envelope {
            kind: m.kind,
            id: m.id,
            response_to: Some(m.response_to),
            payload: m.payload,
        }
    }
}

impl From<Push> for Envelope {
    fn from(m: Push) -> Self {
        Envelope {
            kind: m.kind,
            id: m.id,
            response_to: None,
            payload: m.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_ids_unique() {
        let ids: HashSet<String> = (0..10_000)
            .map(|_| Request::new("ClientFullStateRequest", Value::Null).id)
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_response_kind() {
        let request = Request::new("ServerUsernameRequest", json!({}));
        assert_eq!(
            request.response_kind().as_deref(),
            Some("ServerUsernameResponse")
        );

        let odd = Request::new("ServerTickPush", json!({}));
        assert_eq!(odd.response_kind(), None);
    }

    #[test]
    fn test_response_carries_fresh_id() {
        let request = Request::new("ServerUsernameRequest", json!({}));
        let response = Response::new("ServerUsernameResponse", &request.id, json!({}));
        assert_eq!(response.response_to, request.id);
        assert_ne!(response.id, request.id);
    }

    #[test]
    fn test_envelope_classification() {
        let request: Envelope = Request::new("ClientFullStateRequest", json!({"time": 1})).into();
        assert!(!request.is_response());
        assert!(request.clone().into_response().is_err());

        let response: Envelope =
            Response::new("ClientFullStateResponse", "abc", json!({"score": 2})).into();
        assert!(response.is_response());
        let response = response.into_response().unwrap();
        assert_eq!(response.response_to, "abc");
        assert_eq!(response.payload, json!({"score": 2}));
    }

    #[test]
    fn test_envelope_wire_field_names() {
        let envelope: Envelope = Response::new("ServerUsernameResponse", "req-1", json!({})).into();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["responseTo"], "req-1");
        assert!(value.get("response_to").is_none());

        let envelope: Envelope = Push::new("ClientStatusPush", json!({"score": 1})).into();
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("responseTo").is_none());
    }

    #[test]
    fn test_payload_as() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Username {
            username: String,
        }

        let response = Response::new(
            "ServerUsernameResponse",
            "req-1",
            json!({"username": "Jamie Fraser"}),
        );
        let parsed: Username = response.payload_as().unwrap();
        assert_eq!(parsed.username, "Jamie Fraser");

        let push = Push::new("ClientStatusPush", json!({"score": "high"}));
        assert!(push.payload_as::<Username>().is_err());
    }
}
