//! Domain error types for graph and command operations.

use rolegraph_storage::{EntityKind, StorageError};
use thiserror::Error;

/// Domain-specific errors for graph and command operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A role or permission with a case-insensitively equal name exists.
    #[error("{kind} \"{name}\" already exists")]
    DuplicateName { kind: EntityKind, name: String },

    /// The permission is already assigned to the role.
    #[error("permission {permission_id} is already assigned to role {role_id}")]
    DuplicateAssignment {
        role_id: String,
        permission_id: String,
    },

    /// Entity with the given id does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// No assignment exists for the (role, permission) pair.
    #[error("permission {permission_id} is not assigned to role {role_id}")]
    AssignmentNotFound {
        role_id: String,
        permission_id: String,
    },

    /// An assignment referenced an entity that does not exist.
    #[error("assignment references unknown {kind}: {id}")]
    UnknownReference { kind: EntityKind, id: String },

    /// A resolved intent does not fit the intent schema.
    #[error("invalid intent: {reason}")]
    InvalidIntent { reason: String },

    /// The intent resolver failed or timed out.
    #[error("resolver unavailable: {message}")]
    ResolverUnavailable { message: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Unexpected storage fault.
    #[error("storage error: {message}")]
    Storage { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateName { kind, name } => DomainError::DuplicateName { kind, name },
            StorageError::DuplicateAssignment {
                role_id,
                permission_id,
            } => DomainError::DuplicateAssignment {
                role_id,
                permission_id,
            },
            StorageError::NotFound { kind, id } => DomainError::NotFound { kind, id },
            StorageError::UnknownReference { kind, id } => {
                DomainError::UnknownReference { kind, id }
            }
            StorageError::AssignmentNotFound {
                role_id,
                permission_id,
            } => DomainError::AssignmentNotFound {
                role_id,
                permission_id,
            },
            StorageError::InvalidInput { message } => DomainError::InvalidInput { message },
            err @ StorageError::InternalError { .. } => DomainError::Storage {
                message: err.to_string(),
            },
        }
    }
}
