//! Kind codec - wire-level message kind strings.
//!
//! A kind is `{Role}{Operation}{Shape}`, e.g. `ServerUsernameRequest`.
//! The role names the peer that *originates* the exchange, so a response
//! carries the same role as the request it answers.
//!
//! # Example
//!
//! ```
//! use kindwire::kind::{derive_kind, to_response_kind, Role, Shape};
//!
//! let kind = derive_kind(Role::Server, "Username", Shape::Request);
//! assert_eq!(kind, "ServerUsernameRequest");
//! assert_eq!(
//!     to_response_kind(&kind).as_deref(),
//!     Some("ServerUsernameResponse")
//! );
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Peer that originates a request or push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The client side of a connection.
    Client,
    /// The server side of a connection.
    Server,
}

impl Role {
    /// Wire fragment for this role.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "Client",
            Role::Server => "Server",
        }
    }

    /// The other peer.
    #[inline]
    pub fn opposite(self) -> Role {
        match self {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural category of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    /// Expects a correlated response.
    Request,
    /// Answers a request.
    Response,
    /// One-way, never answered.
    Push,
}

impl Shape {
    /// Wire fragment for this shape.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Request => "Request",
            Shape::Response => "Response",
            Shape::Push => "Push",
        }
    }

    const ALL: [Shape; 3] = [Shape::Request, Shape::Response, Shape::Push];
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded components of a kind string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindParts<'a> {
    /// Role that originates the exchange.
    pub role: Role,
    /// Operation name between the role prefix and the shape suffix.
    pub operation: &'a str,
    /// Shape suffix.
    pub shape: Shape,
}

/// Build the kind string for a (role, operation, shape) triple.
pub fn derive_kind(role: Role, operation: &str, shape: Shape) -> String {
    let mut kind =
        String::with_capacity(role.as_str().len() + operation.len() + shape.as_str().len());
    kind.push_str(role.as_str());
    kind.push_str(operation);
    kind.push_str(shape.as_str());
    kind
}

/// Split a kind string back into its components.
///
/// Only the last shape suffix is stripped, so an operation that itself ends
/// in a shape word stays intact. Returns `None` if the role prefix or shape
/// suffix is missing, or the operation part is empty.
pub fn parse_kind(kind: &str) -> Option<KindParts<'_>> {
    let (role, rest) = if let Some(rest) = kind.strip_prefix(Role::Client.as_str()) {
        (Role::Client, rest)
    } else if let Some(rest) = kind.strip_prefix(Role::Server.as_str()) {
        (Role::Server, rest)
    } else {
        return None;
    };

    Shape::ALL.iter().find_map(|&shape| {
        rest.strip_suffix(shape.as_str())
            .filter(|operation| !operation.is_empty())
            .map(|operation| KindParts {
                role,
                operation,
                shape,
            })
    })
}

/// Swap a trailing `Request` for `Response`.
///
/// Returns `None` if `kind` does not end in `Request`.
pub fn to_response_kind(kind: &str) -> Option<String> {
    swap_suffix(kind, Shape::Request, Shape::Response)
}

/// Swap a trailing `Response` for `Request`.
///
/// Returns `None` if `kind` does not end in `Response`.
pub fn to_request_kind(kind: &str) -> Option<String> {
    swap_suffix(kind, Shape::Response, Shape::Request)
}

fn swap_suffix(kind: &str, from: Shape, to: Shape) -> Option<String> {
    let stem = kind.strip_suffix(from.as_str())?;
    let mut swapped = String::with_capacity(stem.len() + to.as_str().len());
    swapped.push_str(stem);
    swapped.push_str(to.as_str());
    Some(swapped)
}
