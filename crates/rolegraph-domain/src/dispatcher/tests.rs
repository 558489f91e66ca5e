//! Dispatcher tests with scripted resolvers and a fault-injecting store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rolegraph_storage::{
    GraphStore, MemoryGraphStore, Permission, PermissionChanges, Role, RoleAssignment,
    RoleChanges, StorageError, StorageResult,
};

use super::*;
use crate::intent::params;
use crate::resolver::KeywordResolver;

/// Resolver returning a fixed intent.
struct StaticResolver(ResolvedIntent);

#[async_trait]
impl IntentResolver for StaticResolver {
    async fn resolve(&self, _text: &str) -> DomainResult<ResolvedIntent> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Resolver that always fails.
struct FailingResolver;

#[async_trait]
impl IntentResolver for FailingResolver {
    async fn resolve(&self, _text: &str) -> DomainResult<ResolvedIntent> {
        Err(DomainError::ResolverUnavailable {
            message: "connection refused".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Resolver that never answers in time.
struct SlowResolver;

#[async_trait]
impl IntentResolver for SlowResolver {
    async fn resolve(&self, _text: &str) -> DomainResult<ResolvedIntent> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(ResolvedIntent::unknown())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Memory store with switchable faults.
#[derive(Default)]
struct FaultyStore {
    inner: MemoryGraphStore,
    fail_assignments: AtomicBool,
    fail_deletes: AtomicBool,
    fail_lists: AtomicBool,
}

impl FaultyStore {
    fn fault(operation: &str) -> StorageError {
        StorageError::InternalError {
            message: format!("injected {operation} fault"),
        }
    }
}

#[async_trait]
impl GraphStore for FaultyStore {
    async fn create_role(&self, name: &str, description: Option<&str>) -> StorageResult<Role> {
        self.inner.create_role(name, description).await
    }

    async fn get_role(&self, id: &str) -> StorageResult<Role> {
        self.inner.get_role(id).await
    }

    async fn find_role_by_name(&self, name: &str) -> StorageResult<Option<Role>> {
        self.inner.find_role_by_name(name).await
    }

    async fn update_role(&self, id: &str, changes: RoleChanges) -> StorageResult<Role> {
        self.inner.update_role(id, changes).await
    }

    async fn delete_role(&self, id: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::fault("delete_role"));
        }
        self.inner.delete_role(id).await
    }

    async fn list_roles(&self) -> StorageResult<Vec<Role>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(Self::fault("list_roles"));
        }
        self.inner.list_roles().await
    }

    async fn create_permission(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> StorageResult<Permission> {
        self.inner.create_permission(name, description).await
    }

    async fn get_permission(&self, id: &str) -> StorageResult<Permission> {
        self.inner.get_permission(id).await
    }

    async fn find_permission_by_name(&self, name: &str) -> StorageResult<Option<Permission>> {
        self.inner.find_permission_by_name(name).await
    }

    async fn update_permission(
        &self,
        id: &str,
        changes: PermissionChanges,
    ) -> StorageResult<Permission> {
        self.inner.update_permission(id, changes).await
    }

    async fn delete_permission(&self, id: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::fault("delete_permission"));
        }
        self.inner.delete_permission(id).await
    }

    async fn list_permissions(&self) -> StorageResult<Vec<Permission>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(Self::fault("list_permissions"));
        }
        self.inner.list_permissions().await
    }

    async fn create_assignment(
        &self,
        role_id: &str,
        permission_id: &str,
    ) -> StorageResult<RoleAssignment> {
        if self.fail_assignments.load(Ordering::SeqCst) {
            return Err(Self::fault("create_assignment"));
        }
        self.inner.create_assignment(role_id, permission_id).await
    }

    async fn delete_assignment(&self, role_id: &str, permission_id: &str) -> StorageResult<()> {
        self.inner.delete_assignment(role_id, permission_id).await
    }

    async fn list_assignments_for_role(
        &self,
        role_id: &str,
    ) -> StorageResult<Vec<RoleAssignment>> {
        self.inner.list_assignments_for_role(role_id).await
    }

    async fn list_assignments_for_permission(
        &self,
        permission_id: &str,
    ) -> StorageResult<Vec<RoleAssignment>> {
        self.inner.list_assignments_for_permission(permission_id).await
    }
}

fn keyword_dispatcher() -> CommandDispatcher<MemoryGraphStore> {
    let graph = Arc::new(GraphService::new(MemoryGraphStore::new_shared()));
    CommandDispatcher::new(
        graph,
        Arc::new(KeywordResolver::new()),
        DispatcherConfig::default(),
    )
}

fn dispatcher_with<R: IntentResolver + 'static>(
    resolver: R,
    config: DispatcherConfig,
) -> CommandDispatcher<MemoryGraphStore> {
    let graph = Arc::new(GraphService::new(MemoryGraphStore::new_shared()));
    CommandDispatcher::new(graph, Arc::new(resolver), config)
}

fn faulty_dispatcher(store: Arc<FaultyStore>) -> CommandDispatcher<FaultyStore> {
    CommandDispatcher::new(
        Arc::new(GraphService::new(store)),
        Arc::new(KeywordResolver::new()),
        DispatcherConfig::default(),
    )
}

#[tokio::test]
async fn test_create_permission_normalizes_name() {
    let dispatcher = keyword_dispatcher();
    let outcome = dispatcher
        .dispatch("Create a permission called publish content")
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.status, OutcomeStatus::Succeeded);
    assert_eq!(outcome.kind, Some(IntentKind::CreatePermission));
    assert_eq!(
        outcome.message,
        "Successfully created permission \"publish content\""
    );
    match outcome.data {
        Some(OutcomeData::Permission(permission)) => {
            assert_eq!(permission.name, "publish_content");
            assert_eq!(
                permission.description.as_deref(),
                Some("Permission for publish content")
            );
        }
        other => panic!("unexpected data: {other:?}"),
    }
    assert!(outcome.parsed.is_some());
}

#[tokio::test]
async fn test_names_ending_in_entity_words_survive_dispatch() {
    let dispatcher = keyword_dispatcher();

    for command in [
        "Create a permission called read roles",
        "Create a permission called assign permissions",
    ] {
        assert!(dispatcher.dispatch(command).await.success, "{command}");
    }
    let outcome = dispatcher.dispatch("Give admin permission to read roles").await;
    assert_eq!(outcome.status, OutcomeStatus::Succeeded);
    assert!(!outcome.permission_created);

    let names: Vec<String> = dispatcher
        .graph()
        .list_permissions()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.permission.name)
        .collect();
    assert_eq!(names, vec!["read_roles", "assign_permissions"]);
}

#[tokio::test]
async fn test_create_role_capitalizes_and_reports_duplicate() {
    let dispatcher = keyword_dispatcher();
    let outcome = dispatcher.dispatch("Create role editor").await;
    match &outcome.data {
        Some(OutcomeData::Role(role)) => {
            assert_eq!(role.name, "Editor");
            assert_eq!(role.description.as_deref(), Some("editor role"));
        }
        other => panic!("unexpected data: {other:?}"),
    }

    let again = dispatcher.dispatch("create role EDITOR").await;
    assert!(!again.success);
    assert_eq!(again.status, OutcomeStatus::AlreadyExists);
    assert_eq!(again.message, "Role \"EDITOR\" already exists");
    assert_eq!(dispatcher.graph().list_roles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_uses_given_description() {
    let intent = ResolvedIntent::new(IntentKind::CreateRole, 0.95)
        .with_parameter(params::NAME, "auditor")
        .with_parameter(params::DESCRIPTION, "Reads audit logs");
    let dispatcher = dispatcher_with(StaticResolver(intent), DispatcherConfig::default());

    let outcome = dispatcher.dispatch("create the auditor role").await;
    match outcome.data {
        Some(OutcomeData::Role(role)) => {
            assert_eq!(role.description.as_deref(), Some("Reads audit logs"));
        }
        other => panic!("unexpected data: {other:?}"),
    }
}

#[tokio::test]
async fn test_assign_auto_creates_both() {
    let dispatcher = keyword_dispatcher();
    let outcome = dispatcher
        .dispatch("Give editor permission to delete posts")
        .await;

    assert!(outcome.success);
    assert!(outcome.role_created);
    assert!(outcome.permission_created);
    assert_eq!(
        outcome.message,
        "Successfully assigned permission \"delete posts\" to role \"editor\" (both role and permission were created automatically)"
    );

    let graph = dispatcher.graph();
    let role = graph.find_role_by_name("Editor").await.unwrap().unwrap();
    let permission = graph
        .find_permission_by_name("delete_posts")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(permission.description.as_deref(), Some("Permission to delete posts"));
    assert_eq!(
        graph.list_permissions_for_role(&role.id).await.unwrap(),
        vec![permission]
    );
}

#[tokio::test]
async fn test_assign_auto_creates_only_missing_side() {
    let dispatcher = keyword_dispatcher();
    dispatcher.graph().create_role("Editor", None).await.unwrap();

    let outcome = dispatcher.dispatch("Assign delete posts to editor").await;
    assert!(!outcome.role_created);
    assert!(outcome.permission_created);
    assert!(outcome
        .message
        .ends_with("(permission was created automatically)"));

    dispatcher
        .graph()
        .create_permission("publish_posts", None)
        .await
        .unwrap();
    let outcome = dispatcher
        .dispatch("give reviewer permission to publish posts")
        .await;
    assert!(outcome.role_created);
    assert!(!outcome.permission_created);
    assert!(outcome.message.ends_with("(role was created automatically)"));
}

#[tokio::test]
async fn test_repeated_assign_is_informational() {
    let dispatcher = keyword_dispatcher();
    dispatcher.dispatch("Let editors delete posts").await;
    let outcome = dispatcher.dispatch("Let editors delete posts").await;

    assert!(outcome.success);
    assert_eq!(outcome.status, OutcomeStatus::AlreadyExists);
    assert_eq!(
        outcome.message,
        "Permission \"delete posts\" is already assigned to role \"editor\"."
    );
    assert!(!outcome.role_created);
    assert!(!outcome.permission_created);

    let graph = dispatcher.graph();
    assert_eq!(graph.list_roles().await.unwrap().len(), 1);
    assert_eq!(graph.list_permissions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_commands_report_counts() {
    let dispatcher = keyword_dispatcher();
    dispatcher.dispatch("create role editor").await;
    dispatcher.dispatch("create role viewer").await;

    let outcome = dispatcher.dispatch("list roles").await;
    assert!(outcome.success);
    assert_eq!(outcome.message, "Found 2 roles");
    assert!(matches!(outcome.data, Some(OutcomeData::Roles(ref roles)) if roles.len() == 2));

    let outcome = dispatcher.dispatch("show all permissions").await;
    assert_eq!(outcome.message, "Found 0 permissions");
}

#[tokio::test]
async fn test_gibberish_is_unknown_failure() {
    let dispatcher = keyword_dispatcher();
    let outcome = dispatcher.dispatch("asdkjashdkj").await;

    assert!(!outcome.success);
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.kind, Some(IntentKind::Unknown));
    assert_eq!(
        outcome.message,
        "I could not understand that command. Please try rephrasing it."
    );
}

#[tokio::test]
async fn test_blank_command_is_rejected_without_resolving() {
    let dispatcher = dispatcher_with(FailingResolver, DispatcherConfig::default());
    let outcome = dispatcher.dispatch("   ").await;
    assert!(!outcome.success);
    assert_eq!(outcome.kind, None);
    assert_eq!(outcome.message, "Command is required.");
}

#[tokio::test]
async fn test_missing_parameter_fails_before_graph() {
    let intent = ResolvedIntent::new(IntentKind::AssignPermission, 0.95)
        .with_parameter(params::ROLE_NAME, "editor");
    let dispatcher = dispatcher_with(StaticResolver(intent), DispatcherConfig::default());

    let outcome = dispatcher.dispatch("give editor something").await;
    assert!(!outcome.success);
    assert_eq!(outcome.kind, Some(IntentKind::AssignPermission));
    assert_eq!(
        outcome.message,
        "Both role name and permission name are required."
    );
    assert!(dispatcher.graph().list_roles().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_kind_is_rejected() {
    let intent = ResolvedIntent {
        kind: "delete_everything".to_string(),
        parameters: Default::default(),
        confidence: 0.99,
    };
    let dispatcher = dispatcher_with(StaticResolver(intent), DispatcherConfig::default());

    let outcome = dispatcher.dispatch("delete everything").await;
    assert!(!outcome.success);
    assert_eq!(outcome.kind, Some(IntentKind::Unknown));
    assert_eq!(outcome.message, "Unsupported command \"delete_everything\".");
    assert_eq!(
        outcome.parsed.map(|p| p.kind),
        Some("delete_everything".to_string())
    );
}

#[tokio::test]
async fn test_resolver_failure_degrades_to_failed_outcome() {
    let dispatcher = dispatcher_with(FailingResolver, DispatcherConfig::default());
    let outcome = dispatcher.dispatch("create role editor").await;

    assert!(!outcome.success);
    assert_eq!(outcome.kind, None);
    assert!(outcome.message.starts_with("Sorry, I encountered an error"));
}

#[tokio::test]
async fn test_resolver_timeout_degrades_to_failed_outcome() {
    let config = DispatcherConfig::default().with_resolver_timeout(Duration::from_millis(50));
    let dispatcher = dispatcher_with(SlowResolver, config);

    let outcome = dispatcher.dispatch("create role editor").await;
    assert!(!outcome.success);
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.kind, None);
}

#[tokio::test]
async fn test_low_confidence_runs_without_floor() {
    let intent =
        ResolvedIntent::new(IntentKind::CreateRole, 0.1).with_parameter(params::NAME, "editor");
    let dispatcher = dispatcher_with(StaticResolver(intent), DispatcherConfig::default());

    let outcome = dispatcher.dispatch("maybe create editor?").await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_confidence_floor_rejects_doubtful_intent() {
    let intent =
        ResolvedIntent::new(IntentKind::CreateRole, 0.3).with_parameter(params::NAME, "editor");
    let config = DispatcherConfig::default().with_min_confidence(0.5);
    let dispatcher = dispatcher_with(StaticResolver(intent), config);

    let outcome = dispatcher.dispatch("maybe create editor?").await;
    assert!(!outcome.success);
    assert_eq!(outcome.kind, Some(IntentKind::CreateRole));
    assert!(outcome.message.contains("not confident"));
    assert!(dispatcher.graph().list_roles().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_assign_rolls_back_auto_created_entities() {
    let store = Arc::new(FaultyStore::default());
    store.fail_assignments.store(true, Ordering::SeqCst);
    let dispatcher = faulty_dispatcher(Arc::clone(&store));

    let outcome = dispatcher
        .dispatch("Give editor permission to delete posts")
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(
        outcome.message,
        "Failed to assign permission. Please try again."
    );
    assert!(!outcome.role_created);
    assert!(!outcome.permission_created);
    assert!(store.inner.list_roles().await.unwrap().is_empty());
    assert!(store.inner.list_permissions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_rollback_reports_partial_state() {
    let store = Arc::new(FaultyStore::default());
    store.fail_assignments.store(true, Ordering::SeqCst);
    store.fail_deletes.store(true, Ordering::SeqCst);
    let dispatcher = faulty_dispatcher(Arc::clone(&store));

    let outcome = dispatcher
        .dispatch("Give editor permission to delete posts")
        .await;

    assert!(!outcome.success);
    assert!(outcome.role_created);
    assert!(outcome.permission_created);
    assert!(outcome
        .message
        .contains("role \"Editor\" and permission \"delete_posts\" could not be removed"));
}

#[tokio::test]
async fn test_rollback_keeps_preexisting_entities() {
    let store = Arc::new(FaultyStore::default());
    let dispatcher = faulty_dispatcher(Arc::clone(&store));
    dispatcher.graph().create_role("Editor", None).await.unwrap();
    store.fail_assignments.store(true, Ordering::SeqCst);

    let outcome = dispatcher.dispatch("Assign delete posts to editor").await;

    assert!(!outcome.success);
    assert_eq!(store.inner.list_roles().await.unwrap().len(), 1);
    assert!(store.inner.list_permissions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_fault_on_list_is_internal_failure() {
    let store = Arc::new(FaultyStore::default());
    store.fail_lists.store(true, Ordering::SeqCst);
    let dispatcher = faulty_dispatcher(store);

    let outcome = dispatcher.dispatch("list roles").await;
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Failed to retrieve roles.");
}
