//! HTTP REST API endpoints.
//!
//! # Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/roles` | GET | List roles with their permissions |
//! | `/api/roles` | POST | Create role |
//! | `/api/roles/{id}` | GET | Get role with its permissions |
//! | `/api/roles/{id}` | PUT | Update role |
//! | `/api/roles/{id}` | DELETE | Delete role and its assignments |
//! | `/api/permissions` | GET | List permissions with their roles |
//! | `/api/permissions` | POST | Create permission |
//! | `/api/permissions/{id}` | GET | Get permission with its roles |
//! | `/api/permissions/{id}` | PUT | Update permission |
//! | `/api/permissions/{id}` | DELETE | Delete permission and its assignments |
//! | `/api/rbac/roles/{role_id}/permissions` | GET | Permissions assigned to a role |
//! | `/api/rbac/permissions/{permission_id}/roles` | GET | Roles holding a permission |
//! | `/api/rbac/assign` | POST | Assign a permission to a role |
//! | `/api/rbac/roles/{role_id}/permissions/{permission_id}` | DELETE | Remove an assignment |
//! | `/api/rbac/nlp` | POST | Run a natural-language command |
//! | `/health` | GET | Liveness |
//! | `/ready` | GET | Readiness (store reachable) |

pub mod routes;
pub mod state;

pub use routes::{
    create_router, create_router_with_body_limit, create_router_with_observability, error_codes,
    ApiError, HttpOptions, DEFAULT_BODY_LIMIT,
};
pub use state::AppState;
