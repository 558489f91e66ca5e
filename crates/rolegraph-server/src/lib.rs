//! rolegraph-server: Configuration and startup wiring
//!
//! This crate contains the pieces the binary needs before serving:
//! - Configuration loading and validation
//! - Default graph seeding
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rolegraph-server               │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! │  seed.rs     - Default roles & permissions  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod seed;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServerConfig};
pub use seed::{seed_default_graph, SeedReport};
