//! In-memory storage implementation.
//!
//! Each entity class lives in a `DashMap` keyed by id, paired with a second
//! `DashMap` from folded (lower-cased) name to id. Uniqueness is enforced with
//! the atomic entry API on the name index, so a concurrent check-then-insert
//! can never produce two entities with the same folded name.
//!
//! Lock order is always name index first, then entity map.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::instrument;

use crate::error::{EntityKind, StorageError, StorageResult};
use crate::traits::{
    fold_name, validate_name, GraphStore, Permission, PermissionChanges, Role, RoleAssignment,
    RoleChanges,
};

/// A value tagged with its insertion sequence number.
#[derive(Debug, Clone)]
struct Sequenced<T> {
    seq: u64,
    value: T,
}

/// Common shape of roles and permissions.
trait NamedEntity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn build(id: String, name: String, description: Option<String>, now: DateTime<Utc>) -> Self;

    fn name(&self) -> &str;

    fn apply(&mut self, name: Option<String>, description: Option<String>, now: DateTime<Utc>);
}

impl NamedEntity for Role {
    const KIND: EntityKind = EntityKind::Role;

    fn build(id: String, name: String, description: Option<String>, now: DateTime<Utc>) -> Self {
        Role {
            id,
            name,
            description,
            created_at: now,
            updated_at: now,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, name: Option<String>, description: Option<String>, now: DateTime<Utc>) {
        if let Some(name) = name {
            self.name = name;
        }
        if description.is_some() {
            self.description = description;
        }
        self.updated_at = now;
    }
}

impl NamedEntity for Permission {
    const KIND: EntityKind = EntityKind::Permission;

    fn build(id: String, name: String, description: Option<String>, now: DateTime<Utc>) -> Self {
        Permission {
            id,
            name,
            description,
            created_at: now,
            updated_at: now,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, name: Option<String>, description: Option<String>, now: DateTime<Utc>) {
        if let Some(name) = name {
            self.name = name;
        }
        if description.is_some() {
            self.description = description;
        }
        self.updated_at = now;
    }
}

/// Entities of one class plus their folded-name index.
#[derive(Debug)]
struct EntityTable<T> {
    entries: DashMap<String, Sequenced<T>>,
    names: DashMap<String, String>,
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            names: DashMap::new(),
        }
    }
}

impl<T: NamedEntity> EntityTable<T> {
    fn not_found(id: &str) -> StorageError {
        StorageError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        }
    }

    fn create(&self, seq: &AtomicU64, name: &str, description: Option<&str>) -> StorageResult<T> {
        validate_name(T::KIND, name)?;
        let name = name.trim();

        match self.names.entry(fold_name(name)) {
            Entry::Occupied(_) => Err(StorageError::DuplicateName {
                kind: T::KIND,
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                let id = ulid::Ulid::new().to_string();
                let entity = T::build(
                    id.clone(),
                    name.to_string(),
                    description.map(str::to_string),
                    Utc::now(),
                );
                self.entries.insert(
                    id.clone(),
                    Sequenced {
                        seq: seq.fetch_add(1, Ordering::SeqCst),
                        value: entity.clone(),
                    },
                );
                slot.insert(id);
                Ok(entity)
            }
        }
    }

    fn get(&self, id: &str) -> StorageResult<T> {
        self.entries
            .get(id)
            .map(|e| e.value().value.clone())
            .ok_or_else(|| Self::not_found(id))
    }

    fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    fn find_by_name(&self, name: &str) -> Option<T> {
        let id = self.names.get(&fold_name(name)).map(|id| id.value().clone())?;
        self.entries.get(&id).map(|e| e.value().value.clone())
    }

    fn update(
        &self,
        id: &str,
        name: Option<String>,
        description: Option<String>,
    ) -> StorageResult<T> {
        let current_name = self
            .entries
            .get(id)
            .map(|e| e.value().value.name().to_string())
            .ok_or_else(|| Self::not_found(id))?;

        let mut claimed_fold = None;
        let name = match name {
            Some(name) => {
                validate_name(T::KIND, &name)?;
                let name = name.trim().to_string();
                let new_fold = fold_name(&name);
                if new_fold != fold_name(&current_name) {
                    match self.names.entry(new_fold.clone()) {
                        Entry::Occupied(_) => {
                            return Err(StorageError::DuplicateName {
                                kind: T::KIND,
                                name,
                            });
                        }
                        Entry::Vacant(slot) => {
                            slot.insert(id.to_string());
                        }
                    }
                    claimed_fold = Some(new_fold);
                }
                Some(name)
            }
            None => None,
        };

        let updated = match self.entries.get_mut(id) {
            Some(mut entry) => {
                entry.value.apply(name, description, Utc::now());
                entry.value.clone()
            }
            None => {
                // Deleted between lookup and update; release the claimed name.
                if let Some(fold) = claimed_fold {
                    self.names.remove_if(&fold, |_, owner| owner == id);
                }
                return Err(Self::not_found(id));
            }
        };

        if claimed_fold.is_some() {
            self.names
                .remove_if(&fold_name(&current_name), |_, owner| owner == id);
        }

        Ok(updated)
    }

    fn remove(&self, id: &str) -> StorageResult<()> {
        let (_, removed) = self.entries.remove(id).ok_or_else(|| Self::not_found(id))?;
        self.names
            .remove_if(&fold_name(removed.value.name()), |_, owner| owner == id);
        Ok(())
    }

    fn list(&self) -> Vec<T> {
        let mut items: Vec<Sequenced<T>> = self.entries.iter().map(|e| e.value().clone()).collect();
        items.sort_by_key(|s| s.seq);
        items.into_iter().map(|s| s.value).collect()
    }
}

/// In-memory implementation of GraphStore.
///
/// # Performance Characteristics
///
/// - **Create/get/find by name**: O(1) average (DashMap lookup)
/// - **Create/delete assignment**: O(1) average
/// - **List operations**: O(N) scan plus a sort by insertion sequence
///
/// Constructed once per process and shared by `Arc`; there is no global state.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    roles: EntityTable<Role>,
    permissions: EntityTable<Permission>,
    /// Assignments keyed by (role_id, permission_id).
    assignments: DashMap<(String, String), Sequenced<RoleAssignment>>,
    /// Monotonic insertion counter shared by all entity classes.
    sequence: AtomicU64,
}

impl MemoryGraphStore {
    /// Creates a new in-memory graph store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory graph store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn assignments_where<F>(&self, predicate: F) -> Vec<RoleAssignment>
    where
        F: Fn(&RoleAssignment) -> bool,
    {
        let mut matching: Vec<Sequenced<RoleAssignment>> = self
            .assignments
            .iter()
            .filter(|a| predicate(&a.value().value))
            .map(|a| a.value().clone())
            .collect();
        matching.sort_by_key(|s| s.seq);
        matching.into_iter().map(|s| s.value).collect()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    #[instrument(skip(self, description))]
    async fn create_role(&self, name: &str, description: Option<&str>) -> StorageResult<Role> {
        self.roles.create(&self.sequence, name, description)
    }

    async fn get_role(&self, id: &str) -> StorageResult<Role> {
        self.roles.get(id)
    }

    async fn find_role_by_name(&self, name: &str) -> StorageResult<Option<Role>> {
        Ok(self.roles.find_by_name(name))
    }

    #[instrument(skip(self, changes), fields(role_id = %id))]
    async fn update_role(&self, id: &str, changes: RoleChanges) -> StorageResult<Role> {
        self.roles.update(id, changes.name, changes.description)
    }

    #[instrument(skip(self), fields(role_id = %id))]
    async fn delete_role(&self, id: &str) -> StorageResult<()> {
        self.roles.remove(id)
    }

    async fn list_roles(&self) -> StorageResult<Vec<Role>> {
        Ok(self.roles.list())
    }

    #[instrument(skip(self, description))]
    async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> StorageResult<Permission> {
        self.permissions.create(&self.sequence, name, description)
    }

    async fn get_permission(&self, id: &str) -> StorageResult<Permission> {
        self.permissions.get(id)
    }

    async fn find_permission_by_name(&self, name: &str) -> StorageResult<Option<Permission>> {
        Ok(self.permissions.find_by_name(name))
    }

    #[instrument(skip(self, changes), fields(permission_id = %id))]
    async fn update_permission(
        &self,
        id: &str,
        changes: PermissionChanges,
    ) -> StorageResult<Permission> {
        self.permissions.update(id, changes.name, changes.description)
    }

    #[instrument(skip(self), fields(permission_id = %id))]
    async fn delete_permission(&self, id: &str) -> StorageResult<()> {
        self.permissions.remove(id)
    }

    async fn list_permissions(&self) -> StorageResult<Vec<Permission>> {
        Ok(self.permissions.list())
    }

    #[instrument(skip(self))]
    async fn create_assignment(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> StorageResult<RoleAssignment> {
        if !self.roles.contains(role_id) {
            return Err(StorageError::UnknownReference {
                kind: EntityKind::Role,
                id: role_id.to_string(),
            });
        }
        if !self.permissions.contains(permission_id) {
            return Err(StorageError::UnknownReference {
                kind: EntityKind::Permission,
                id: permission_id.to_string(),
            });
        }

        match self
            .assignments
            .entry((role_id.to_string(), permission_id.to_string()))
        {
            Entry::Occupied(_) => Err(StorageError::DuplicateAssignment {
                role_id: role_id.to_string(),
                permission_id: permission_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                let assignment = RoleAssignment {
                    role_id: role_id.to_string(),
                    permission_id: permission_id.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(Sequenced {
                    seq: self.sequence.fetch_add(1, Ordering::SeqCst),
                    value: assignment.clone(),
                });
                Ok(assignment)
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_assignment(&self, role_id: &str, permission_id: &str) -> StorageResult<()> {
        self.assignments
            .remove(&(role_id.to_string(), permission_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::AssignmentNotFound {
                role_id: role_id.to_string(),
                permission_id: permission_id.to_string(),
            })
    }

    async fn list_assignments_for_role(
        &self,
        role_id: &str,
    ) -> StorageResult<Vec<RoleAssignment>> {
        Ok(self.assignments_where(|a| a.role_id == role_id))
    }

    async fn list_assignments_for_permission(
        &self,
        permission_id: &str,
    ) -> StorageResult<Vec<RoleAssignment>> {
        Ok(self.assignments_where(|a| a.permission_id == permission_id))
    }
}
