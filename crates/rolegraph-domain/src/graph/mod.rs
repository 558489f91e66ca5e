//! RBAC graph service.
//!
//! The service is the referential-integrity boundary of the graph. Every
//! mutation runs inside a [`GraphSession`], which holds the service's write
//! gate for its lifetime, so uniqueness and reference checks can never
//! interleave with another writer. Reads go straight to the store.

mod service;
mod types;

pub use service::{GraphService, GraphSession};
pub use types::{PermissionWithRoles, RoleWithPermissions};
