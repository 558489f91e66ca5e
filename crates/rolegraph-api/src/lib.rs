//! rolegraph-api: HTTP API layer
//!
//! This crate provides the API layer including:
//! - HTTP REST endpoints for roles, permissions, assignments and commands
//! - The LLM-backed intent resolver
//! - Middleware (request ids, logging, metrics)
//! - Observability (structured logging, Prometheus metrics)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rolegraph-api                 │
//! ├─────────────────────────────────────────────┤
//! │  http/          - HTTP REST endpoints       │
//! │  adapters       - LLM intent resolver       │
//! │  middleware/    - Request id, logging       │
//! │  observability/ - Logging and metrics setup │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod http;
pub mod middleware;
pub mod observability;
