//! Graph service implementation.

use std::collections::HashMap;
use std::sync::Arc;

use rolegraph_storage::{
    EntityKind, GraphStore, Permission, PermissionChanges, Role, RoleAssignment, RoleChanges,
    StorageError,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use super::types::{PermissionWithRoles, RoleWithPermissions};
use crate::error::{DomainError, DomainResult};

/// Strict CRUD and assignment operations over a [`GraphStore`].
///
/// Mutations are serialized through a write gate; see [`GraphSession`].
/// Reads are not gated and may run in parallel with writers.
pub struct GraphService<S> {
    store: Arc<S>,
    write_gate: Mutex<()>,
}

impl<S: GraphStore> GraphService<S> {
    /// Creates a new graph service over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_gate: Mutex::new(()),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Opens a write session, waiting for any in-flight writer to finish.
    ///
    /// Several mutations issued through the same session form one unit with
    /// respect to other writers.
    pub async fn session(&self) -> GraphSession<'_, S> {
        GraphSession {
            store: self.store.as_ref(),
            _gate: self.write_gate.lock().await,
        }
    }

    // Mutations

    pub async fn create_role(&self, name: &str, description: Option<&str>) -> DomainResult<Role> {
        self.session().await.create_role(name, description).await
    }

    pub async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> DomainResult<Permission> {
        self.session()
            .await
            .create_permission(name, description)
            .await
    }

    pub async fn update_role(&self, id: &str, changes: RoleChanges) -> DomainResult<Role> {
        self.session().await.update_role(id, changes).await
    }

    pub async fn update_permission(
        &self,
        id: &str,
        changes: PermissionChanges,
    ) -> DomainResult<Permission> {
        self.session().await.update_permission(id, changes).await
    }

    /// Deletes a role and every assignment referencing it.
    pub async fn delete_role(&self, id: &str) -> DomainResult<()> {
        self.session().await.delete_role(id).await
    }

    /// Deletes a permission and every assignment referencing it.
    pub async fn delete_permission(&self, id: &str) -> DomainResult<()> {
        self.session().await.delete_permission(id).await
    }

    pub async fn assign(&self, role_id: &str, permission_id: &str) -> DomainResult<RoleAssignment> {
        self.session().await.assign(role_id, permission_id).await
    }

    pub async fn unassign(&self, role_id: &str, permission_id: &str) -> DomainResult<()> {
        self.session().await.unassign(role_id, permission_id).await
    }

    // Reads

    /// Gets a role with its assigned permissions.
    #[instrument(skip(self))]
    pub async fn get_role(&self, id: &str) -> DomainResult<RoleWithPermissions> {
        let role = self.store.get_role(id).await?;
        let permissions = permissions_for_role(self.store.as_ref(), id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    /// Gets a permission with the roles it is assigned to.
    #[instrument(skip(self))]
    pub async fn get_permission(&self, id: &str) -> DomainResult<PermissionWithRoles> {
        let permission = self.store.get_permission(id).await?;
        let roles = roles_for_permission(self.store.as_ref(), id).await?;
        Ok(PermissionWithRoles { permission, roles })
    }

    pub async fn find_role_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        Ok(self.store.find_role_by_name(name).await?)
    }

    pub async fn find_permission_by_name(&self, name: &str) -> DomainResult<Option<Permission>> {
        Ok(self.store.find_permission_by_name(name).await?)
    }

    /// Lists the permissions assigned to a role, in assignment order.
    #[instrument(skip(self))]
    pub async fn list_permissions_for_role(&self, role_id: &str) -> DomainResult<Vec<Permission>> {
        self.store.get_role(role_id).await?;
        permissions_for_role(self.store.as_ref(), role_id).await
    }

    /// Lists the roles a permission is assigned to, in assignment order.
    #[instrument(skip(self))]
    pub async fn list_roles_for_permission(&self, permission_id: &str) -> DomainResult<Vec<Role>> {
        self.store.get_permission(permission_id).await?;
        roles_for_permission(self.store.as_ref(), permission_id).await
    }

    /// Lists every role annotated with its permissions.
    pub async fn list_roles(&self) -> DomainResult<Vec<RoleWithPermissions>> {
        let roles = self.store.list_roles().await?;
        let permissions: HashMap<String, Permission> = self
            .store
            .list_permissions()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut annotated = Vec::with_capacity(roles.len());
        for role in roles {
            let assignments = self.store.list_assignments_for_role(&role.id).await?;
            let assigned = assignments
                .iter()
                .filter_map(|a| permissions.get(&a.permission_id).cloned())
                .collect();
            annotated.push(RoleWithPermissions {
                role,
                permissions: assigned,
            });
        }
        Ok(annotated)
    }

    /// Lists every permission annotated with its roles.
    pub async fn list_permissions(&self) -> DomainResult<Vec<PermissionWithRoles>> {
        let permissions = self.store.list_permissions().await?;
        let roles: HashMap<String, Role> = self
            .store
            .list_roles()
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let mut annotated = Vec::with_capacity(permissions.len());
        for permission in permissions {
            let assignments = self
                .store
                .list_assignments_for_permission(&permission.id)
                .await?;
            let assigned = assignments
                .iter()
                .filter_map(|a| roles.get(&a.role_id).cloned())
                .collect();
            annotated.push(PermissionWithRoles {
                permission,
                roles: assigned,
            });
        }
        Ok(annotated)
    }

    /// Checks that the backing store can serve requests.
    pub async fn health_check(&self) -> DomainResult<()> {
        Ok(self.store.health_check().await?)
    }
}

/// A write session holding the service's write gate.
///
/// The gate is released when the session is dropped.
pub struct GraphSession<'a, S> {
    store: &'a S,
    _gate: MutexGuard<'a, ()>,
}

impl<'a, S: GraphStore> GraphSession<'a, S> {
    #[instrument(skip(self, description))]
    pub async fn create_role(&self, name: &str, description: Option<&str>) -> DomainResult<Role> {
        let name = required_name(EntityKind::Role, name)?;
        let role = self.store.create_role(name, description).await?;
        debug!(role_id = %role.id, "role created");
        Ok(role)
    }

    #[instrument(skip(self, description))]
    pub async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> DomainResult<Permission> {
        let name = required_name(EntityKind::Permission, name)?;
        let permission = self.store.create_permission(name, description).await?;
        debug!(permission_id = %permission.id, "permission created");
        Ok(permission)
    }

    #[instrument(skip(self, changes), fields(role_id = %id))]
    pub async fn update_role(&self, id: &str, mut changes: RoleChanges) -> DomainResult<Role> {
        if let Some(name) = changes.name.take() {
            changes.name = Some(required_name(EntityKind::Role, &name)?.to_string());
        }
        Ok(self.store.update_role(id, changes).await?)
    }

    #[instrument(skip(self, changes), fields(permission_id = %id))]
    pub async fn update_permission(
        &self,
        id: &str,
        mut changes: PermissionChanges,
    ) -> DomainResult<Permission> {
        if let Some(name) = changes.name.take() {
            changes.name = Some(required_name(EntityKind::Permission, &name)?.to_string());
        }
        Ok(self.store.update_permission(id, changes).await?)
    }

    #[instrument(skip(self), fields(role_id = %id))]
    pub async fn delete_role(&self, id: &str) -> DomainResult<()> {
        self.store.get_role(id).await?;
        let assignments = self.store.list_assignments_for_role(id).await?;
        for assignment in &assignments {
            self.remove_assignment(assignment).await?;
        }
        self.store.delete_role(id).await?;
        debug!(removed_assignments = assignments.len(), "role deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(permission_id = %id))]
    pub async fn delete_permission(&self, id: &str) -> DomainResult<()> {
        self.store.get_permission(id).await?;
        let assignments = self.store.list_assignments_for_permission(id).await?;
        for assignment in &assignments {
            self.remove_assignment(assignment).await?;
        }
        self.store.delete_permission(id).await?;
        debug!(removed_assignments = assignments.len(), "permission deleted");
        Ok(())
    }

    /// Assigns a permission to a role.
    ///
    /// Fails with `NotFound` when either entity is missing and with
    /// `DuplicateAssignment` when the pair is already assigned.
    #[instrument(skip(self))]
    pub async fn assign(&self, role_id: &str, permission_id: &str) -> DomainResult<RoleAssignment> {
        self.store.get_role(role_id).await?;
        self.store.get_permission(permission_id).await?;
        Ok(self.store.create_assignment(role_id, permission_id).await?)
    }

    /// Removes the assignment between a role and a permission.
    ///
    /// Fails with `NotFound` when either entity is missing and with
    /// `AssignmentNotFound` when both exist but are not linked.
    #[instrument(skip(self))]
    pub async fn unassign(&self, role_id: &str, permission_id: &str) -> DomainResult<()> {
        self.store.get_role(role_id).await?;
        self.store.get_permission(permission_id).await?;
        Ok(self.store.delete_assignment(role_id, permission_id).await?)
    }

    pub async fn find_role_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        Ok(self.store.find_role_by_name(name).await?)
    }

    pub async fn find_permission_by_name(&self, name: &str) -> DomainResult<Option<Permission>> {
        Ok(self.store.find_permission_by_name(name).await?)
    }

    async fn remove_assignment(&self, assignment: &RoleAssignment) -> DomainResult<()> {
        match self
            .store
            .delete_assignment(&assignment.role_id, &assignment.permission_id)
            .await
        {
            Ok(()) | Err(StorageError::AssignmentNotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Trims a name and rejects it when blank.
fn required_name(kind: EntityKind, name: &str) -> DomainResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidInput {
            message: format!("{kind} name is required"),
        });
    }
    Ok(trimmed)
}

async fn permissions_for_role<S: GraphStore>(
    store: &S,
    role_id: &str,
) -> DomainResult<Vec<Permission>> {
    let mut permissions = Vec::new();
    for assignment in store.list_assignments_for_role(role_id).await? {
        match store.get_permission(&assignment.permission_id).await {
            Ok(permission) => permissions.push(permission),
            // Removed by a concurrent cascade
            Err(StorageError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(permissions)
}

async fn roles_for_permission<S: GraphStore>(
    store: &S,
    permission_id: &str,
) -> DomainResult<Vec<Role>> {
    let mut roles = Vec::new();
    for assignment in store.list_assignments_for_permission(permission_id).await? {
        match store.get_role(&assignment.role_id).await {
            Ok(role) => roles.push(role),
            Err(StorageError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(roles)
}
