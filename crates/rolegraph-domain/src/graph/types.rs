//! Annotated graph views.

use rolegraph_storage::{Permission, Role};
use serde::Serialize;

/// A role together with the permissions assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// A permission together with the roles it is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionWithRoles {
    #[serde(flatten)]
    pub permission: Permission,
    pub roles: Vec<Role>,
}
