//! Operation catalog - the set of operations a client and server agree on.
//!
//! The catalog lists operations in four groups (client requests, client
//! pushes, server requests, server pushes) and derives every legal kind
//! string from them when it is built. Validation happens once, in
//! [`OperationCatalogBuilder::build`]; afterwards the catalog is immutable
//! and is shared between peers behind an `Arc`.
//!
//! # Example
//!
//! ```
//! use kindwire::catalog::OperationCatalog;
//! use kindwire::kind::{Role, Shape};
//!
//! let catalog = OperationCatalog::builder()
//!     .client_request("FullState")
//!     .client_push("Status")
//!     .server_request("CameraPosition")
//!     .build()
//!     .unwrap();
//!
//! let info = catalog.lookup("ServerCameraPositionResponse").unwrap();
//! assert_eq!(info.role, Role::Server);
//! assert_eq!(info.shape, Shape::Response);
//! ```

use std::collections::HashMap;

use crate::error::{KindwireError, Result};
use crate::kind::{derive_kind, Role, Shape};

/// One of the four operation groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationGroup {
    /// Requests the client sends and the server answers.
    ClientRequests,
    /// Pushes the client sends.
    ClientPushes,
    /// Requests the server sends and the client answers.
    ServerRequests,
    /// Pushes the server sends.
    ServerPushes,
}

impl OperationGroup {
    /// Role that originates messages in this group.
    pub fn role(self) -> Role {
        match self {
            OperationGroup::ClientRequests | OperationGroup::ClientPushes => Role::Client,
            OperationGroup::ServerRequests | OperationGroup::ServerPushes => Role::Server,
        }
    }

    /// Whether operations in this group are request/response pairs.
    pub fn is_request(self) -> bool {
        matches!(
            self,
            OperationGroup::ClientRequests | OperationGroup::ServerRequests
        )
    }

    /// Shapes a group's operations appear in on the wire.
    fn shapes(self) -> &'static [Shape] {
        if self.is_request() {
            &[Shape::Request, Shape::Response]
        } else {
            &[Shape::Push]
        }
    }
}

/// A named operation within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Group the operation belongs to.
    pub group: OperationGroup,
    /// Operation name, e.g. `FullState`.
    pub name: String,
}

impl OperationDescriptor {
    /// Kind of the request, for request/response operations.
    pub fn request_kind(&self) -> Option<String> {
        self.group
            .is_request()
            .then(|| derive_kind(self.group.role(), &self.name, Shape::Request))
    }

    /// Kind of the response, for request/response operations.
    pub fn response_kind(&self) -> Option<String> {
        self.group
            .is_request()
            .then(|| derive_kind(self.group.role(), &self.name, Shape::Response))
    }

    /// Kind of the push, for push operations.
    pub fn push_kind(&self) -> Option<String> {
        (!self.group.is_request()).then(|| derive_kind(self.group.role(), &self.name, Shape::Push))
    }
}

/// What a kind string resolves to within a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindInfo {
    /// Role that originates the exchange.
    pub role: Role,
    /// Operation name.
    pub operation: String,
    /// Shape of this particular kind.
    pub shape: Shape,
    /// Group the operation was declared in.
    pub group: OperationGroup,
}

/// Immutable registry of operations and the kinds derived from them.
#[derive(Debug, Clone, Default)]
pub struct OperationCatalog {
    operations: Vec<OperationDescriptor>,
    kinds: HashMap<String, KindInfo>,
}

impl OperationCatalog {
    /// Start building a catalog.
    pub fn builder() -> OperationCatalogBuilder {
        OperationCatalogBuilder::new()
    }

    /// Resolve a kind string.
    pub fn lookup(&self, kind: &str) -> Option<&KindInfo> {
        self.kinds.get(kind)
    }

    /// Whether `kind` is a legal kind in this catalog.
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Whether `kind` is legal with the given role and shape.
    pub fn is_kind(&self, kind: &str, role: Role, shape: Shape) -> bool {
        self.lookup(kind)
            .is_some_and(|info| info.role == role && info.shape == shape)
    }

    /// All legal kind strings, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Registered operations, in registration order.
    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    /// Response kind answering `request_kind`, if both are in the catalog.
    pub fn response_kind_for(&self, request_kind: &str) -> Option<String> {
        let info = self.lookup(request_kind)?;
        if info.shape != Shape::Request {
            return None;
        }
        Some(derive_kind(info.role, &info.operation, Shape::Response))
    }

    /// Request kind answered by `response_kind`, if both are in the catalog.
    pub fn request_kind_for(&self, response_kind: &str) -> Option<String> {
        let info = self.lookup(response_kind)?;
        if info.shape != Shape::Response {
            return None;
        }
        Some(derive_kind(info.role, &info.operation, Shape::Request))
    }
}

/// Builder for [`OperationCatalog`].
#[derive(Debug, Default)]
pub struct OperationCatalogBuilder {
    operations: Vec<OperationDescriptor>,
}

impl OperationCatalogBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation to a group.
    pub fn operation(mut self, group: OperationGroup, name: impl Into<String>) -> Self {
        self.operations.push(OperationDescriptor {
            group,
            name: name.into(),
        });
        self
    }

    /// Add a request/response operation initiated by the client.
    pub fn client_request(self, name: impl Into<String>) -> Self {
        self.operation(OperationGroup::ClientRequests, name)
    }

    /// Add a push operation initiated by the client.
    pub fn client_push(self, name: impl Into<String>) -> Self {
        self.operation(OperationGroup::ClientPushes, name)
    }

    /// Add a request/response operation initiated by the server.
    pub fn server_request(self, name: impl Into<String>) -> Self {
        self.operation(OperationGroup::ServerRequests, name)
    }

    /// Add a push operation initiated by the server.
    pub fn server_push(self, name: impl Into<String>) -> Self {
        self.operation(OperationGroup::ServerPushes, name)
    }

    /// Validate the operations and derive the kind table.
    ///
    /// # Errors
    ///
    /// - [`KindwireError::InvalidOperation`] for an empty name or a name
    ///   ending in `Request`, `Response` or `Push`.
    /// - [`KindwireError::DuplicateKind`] if two operations derive the same kind.
    pub fn build(self) -> Result<OperationCatalog> {
        let mut kinds = HashMap::new();

        for op in &self.operations {
            validate_name(&op.name)?;

            let role = op.group.role();
            for &shape in op.group.shapes() {
                let kind = derive_kind(role, &op.name, shape);
                let info = KindInfo {
                    role,
                    operation: op.name.clone(),
                    shape,
                    group: op.group,
                };
                if kinds.insert(kind.clone(), info).is_some() {
                    return Err(KindwireError::DuplicateKind(kind));
                }
            }
        }

        Ok(OperationCatalog {
            operations: self.operations,
            kinds,
        })
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KindwireError::InvalidOperation {
            name: name.to_string(),
            reason: "operation name is empty",
        });
    }
    // Suffix-based request/response derivation needs an unambiguous tail.
    if [Shape::Request, Shape::Response, Shape::Push]
        .iter()
        .any(|shape| name.ends_with(shape.as_str()))
    {
        return Err(KindwireError::InvalidOperation {
            name: name.to_string(),
            reason: "operation name ends with a shape suffix",
        });
    }
    Ok(())
}
