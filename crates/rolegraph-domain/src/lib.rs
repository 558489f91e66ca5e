//! rolegraph-domain: RBAC graph and command logic
//!
//! This crate contains the core of the role/permission graph:
//! - Graph service enforcing uniqueness and referential integrity
//! - Intent schema and parameter normalization
//! - Resolver contract and structured-output parsing
//! - Command dispatcher with auto-creation and idempotency
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rolegraph-domain               │
//! ├─────────────────────────────────────────────┤
//! │  graph/      - Graph service & write gate   │
//! │  intent/     - Intent schema & validation   │
//! │  resolver/   - Text to intent resolution    │
//! │  dispatcher/ - Command execution & outcome  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod dispatcher;
pub mod error;
pub mod graph;
pub mod intent;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use dispatcher::{
    register_dispatch_metrics, CommandDispatcher, CommandOutcome, DispatcherConfig, OutcomeData,
    OutcomeStatus,
};
pub use error::{DomainError, DomainResult};
pub use graph::{GraphService, GraphSession, PermissionWithRoles, RoleWithPermissions};
pub use intent::{IntentKind, ResolvedIntent, ValidatedIntent};
pub use resolver::{parse_structured_output, IntentResolver, KeywordResolver};
