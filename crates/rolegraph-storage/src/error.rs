//! Storage error types.

use std::fmt;

use thiserror::Error;

/// The kind of graph entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Role,
    Permission,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Role => "role",
            EntityKind::Permission => "permission",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage-specific errors.
///
/// Every condition a caller is expected to react to has its own variant;
/// callers never need to inspect the rendered message.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A role or permission with a case-insensitively equal name exists.
    #[error("{kind} \"{name}\" already exists")]
    DuplicateName { kind: EntityKind, name: String },

    /// The (role, permission) pair is already assigned.
    #[error("permission {permission_id} is already assigned to role {role_id}")]
    DuplicateAssignment {
        role_id: String,
        permission_id: String,
    },

    /// Entity with the given id does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// An assignment referenced an entity that does not exist.
    #[error("assignment references unknown {kind}: {id}")]
    UnknownReference { kind: EntityKind, id: String },

    /// No assignment exists for the (role, permission) pair.
    #[error("assignment not found: role {role_id}, permission {permission_id}")]
    AssignmentNotFound {
        role_id: String,
        permission_id: String,
    },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
