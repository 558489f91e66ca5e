//! rolegraph-storage: Storage abstraction layer
//!
//! This crate provides the storage abstraction for the role/permission graph:
//! - GraphStore trait for entity and assignment operations
//! - In-memory implementation used by the server and tests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             rolegraph-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - GraphStore trait + entities  │
//! │  memory.rs   - In-memory implementation     │
//! │  error.rs    - Typed storage conditions     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{EntityKind, StorageError, StorageResult};
pub use memory::MemoryGraphStore;
pub use traits::{
    fold_name, GraphStore, Permission, PermissionChanges, Role, RoleAssignment, RoleChanges,
};

// Re-export chrono types used in entity timestamps
pub use chrono::{DateTime, Utc};
