//! Default graph seeding.
//!
//! A fresh deployment starts with an `Admin` role holding every management
//! permission. Seeding is idempotent: entities that already exist (by
//! case-insensitive name) are reused and existing assignments are kept.

use rolegraph_domain::{DomainError, DomainResult, GraphService};
use rolegraph_storage::GraphStore;
use tracing::{info, instrument};

/// Name of the seeded administrator role.
pub const ADMIN_ROLE: &str = "Admin";

const ADMIN_DESCRIPTION: &str = "Administrator with full access";

/// Default permissions and their descriptions, in creation order.
pub const DEFAULT_PERMISSIONS: [(&str, &str); 10] = [
    ("read_users", "Read user data"),
    ("write_users", "Create and update users"),
    ("delete_users", "Delete users"),
    ("read_roles", "Read role data"),
    ("write_roles", "Create and update roles"),
    ("delete_roles", "Delete roles"),
    ("read_permissions", "Read permission data"),
    ("write_permissions", "Create and update permissions"),
    ("delete_permissions", "Delete permissions"),
    ("assign_permissions", "Assign permissions to roles"),
];

/// What a seeding run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub role_created: bool,
    pub permissions_created: usize,
    pub assignments_created: usize,
}

impl SeedReport {
    /// Whether the run changed nothing.
    pub fn is_noop(&self) -> bool {
        !self.role_created && self.permissions_created == 0 && self.assignments_created == 0
    }
}

/// Seeds the default Admin role and permissions into the graph.
#[instrument(skip(graph))]
pub async fn seed_default_graph<S: GraphStore>(
    graph: &GraphService<S>,
) -> DomainResult<SeedReport> {
    let session = graph.session().await;
    let mut report = SeedReport::default();

    let admin = match session.find_role_by_name(ADMIN_ROLE).await? {
        Some(role) => role,
        None => {
            report.role_created = true;
            session
                .create_role(ADMIN_ROLE, Some(ADMIN_DESCRIPTION))
                .await?
        }
    };

    for (name, description) in DEFAULT_PERMISSIONS {
        let permission = match session.find_permission_by_name(name).await? {
            Some(permission) => permission,
            None => {
                report.permissions_created += 1;
                session.create_permission(name, Some(description)).await?
            }
        };

        match session.assign(&admin.id, &permission.id).await {
            Ok(_) => report.assignments_created += 1,
            Err(DomainError::DuplicateAssignment { .. }) => {}
            Err(err) => return Err(err),
        }
    }

    info!(
        role_created = report.role_created,
        permissions_created = report.permissions_created,
        assignments_created = report.assignments_created,
        "default graph seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegraph_storage::MemoryGraphStore;

    #[tokio::test]
    async fn test_seed_creates_admin_with_all_permissions() {
        let graph = GraphService::new(MemoryGraphStore::new_shared());

        let report = seed_default_graph(&graph).await.unwrap();

        assert!(report.role_created);
        assert_eq!(report.permissions_created, 10);
        assert_eq!(report.assignments_created, 10);

        let admin = graph.find_role_by_name("admin").await.unwrap().unwrap();
        assert_eq!(admin.description.as_deref(), Some(ADMIN_DESCRIPTION));
        let names: Vec<String> = graph
            .list_permissions_for_role(&admin.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        let expected: Vec<String> = DEFAULT_PERMISSIONS
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let graph = GraphService::new(MemoryGraphStore::new_shared());
        seed_default_graph(&graph).await.unwrap();

        let second = seed_default_graph(&graph).await.unwrap();

        assert!(second.is_noop());
        assert_eq!(graph.list_roles().await.unwrap().len(), 1);
        assert_eq!(graph.list_permissions().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_seed_reuses_existing_entities() {
        let graph = GraphService::new(MemoryGraphStore::new_shared());
        graph.create_role("ADMIN", None).await.unwrap();
        graph.create_permission("read_users", None).await.unwrap();

        let report = seed_default_graph(&graph).await.unwrap();

        assert!(!report.role_created);
        assert_eq!(report.permissions_created, 9);
        assert_eq!(report.assignments_created, 10);
        assert_eq!(graph.list_roles().await.unwrap()[0].role.name, "ADMIN");
    }
}
