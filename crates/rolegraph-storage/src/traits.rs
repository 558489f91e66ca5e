//! GraphStore trait definition.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{EntityKind, StorageError, StorageResult};

/// Maximum length of a role or permission name.
pub const MAX_NAME_LENGTH: usize = 256;

/// A stored role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A stored permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// The edge linking one role to one permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleAssignment {
    pub role_id: String,
    pub permission_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Editable fields of a role. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Editable fields of a permission. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PermissionChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Folds a name into the key used for case-insensitive uniqueness.
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Validates a role or permission name.
pub fn validate_name(kind: EntityKind, name: &str) -> StorageResult<()> {
    if name.trim().is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("{kind} name cannot be empty"),
        });
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!("{kind} name exceeds {MAX_NAME_LENGTH} characters"),
        });
    }
    Ok(())
}

/// Abstract storage interface for the role/permission graph.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations. The store is the enforcement point for name uniqueness:
/// `create_*` and renaming `update_*` calls fail with
/// [`StorageError::DuplicateName`] on a case-insensitive clash, so every
/// caller observes the same guarantee.
///
/// All list operations return entities in insertion order.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    // Role operations

    /// Creates a new role.
    async fn create_role(&self, name: &str, description: Option<&str>) -> StorageResult<Role>;

    /// Gets a role by ID.
    async fn get_role(&self, id: &str) -> StorageResult<Role>;

    /// Finds a role by name, ignoring case.
    async fn find_role_by_name(&self, name: &str) -> StorageResult<Option<Role>>;

    /// Updates a role's name and/or description.
    async fn update_role(&self, id: &str, changes: RoleChanges) -> StorageResult<Role>;

    /// Deletes a role. Assignments are not touched.
    async fn delete_role(&self, id: &str) -> StorageResult<()>;

    /// Lists all roles.
    async fn list_roles(&self) -> StorageResult<Vec<Role>>;

    // Permission operations

    /// Creates a new permission.
    async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> StorageResult<Permission>;

    /// Gets a permission by ID.
    async fn get_permission(&self, id: &str) -> StorageResult<Permission>;

    /// Finds a permission by name, ignoring case.
    async fn find_permission_by_name(&self, name: &str) -> StorageResult<Option<Permission>>;

    /// Updates a permission's name and/or description.
    async fn update_permission(
        &self,
        id: &str,
        changes: PermissionChanges,
    ) -> StorageResult<Permission>;

    /// Deletes a permission. Assignments are not touched.
    async fn delete_permission(&self, id: &str) -> StorageResult<()>;

    /// Lists all permissions.
    async fn list_permissions(&self) -> StorageResult<Vec<Permission>>;

    // Assignment operations

    /// Creates the assignment edge between a role and a permission.
    ///
    /// Fails with `UnknownReference` if either id is absent and with
    /// `DuplicateAssignment` if the pair already exists.
    async fn create_assignment(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> StorageResult<RoleAssignment>;

    /// Deletes the assignment edge between a role and a permission.
    async fn delete_assignment(&self, role_id: &str, permission_id: &str) -> StorageResult<()>;

    /// Lists the assignments of a role.
    async fn list_assignments_for_role(&self, role_id: &str)
        -> StorageResult<Vec<RoleAssignment>>;

    /// Lists the assignments of a permission.
    async fn list_assignments_for_permission(
        &self,
        permission_id: &str,
    ) -> StorageResult<Vec<RoleAssignment>>;

    /// Checks that the backend can serve requests.
    async fn health_check(&self) -> StorageResult<()> {
        self.list_roles().await.map(|_| ())
    }
}
