//! Natural-language command dispatcher.
//!
//! A command goes through five steps:
//!
//! 1. **Resolve**: the [`IntentResolver`] guesses a structured intent. Resolver
//!    failure or timeout ends the command with a generic failure.
//! 2. **Validate** the guess against the intent schema.
//! 3. **Normalize** names (underscored permissions, capitalized roles).
//! 4. **Execute** against the [`GraphService`]. Assign commands create a
//!    missing role or permission first; the lookups, creations and the
//!    assignment share one write session so no other writer interleaves.
//! 5. **Compose** a [`CommandOutcome`].
//!
//! Dispatch never returns an error: every condition, expected or not, is
//! turned into an outcome.

mod outcome;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rolegraph_storage::{GraphStore, Permission, Role};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{DomainError, DomainResult};
use crate::graph::{GraphService, GraphSession};
use crate::intent::{
    assigned_permission_description, assigned_role_description, default_permission_description,
    default_role_description, normalize_permission_name, normalize_role_name, validate,
    IntentKind, ResolvedIntent, ValidatedIntent,
};
use crate::resolver::IntentResolver;

pub use outcome::{CommandOutcome, OutcomeData, OutcomeStatus};
use outcome::entity_label;

/// Confidence below which a resolved intent is logged as doubtful.
const LOW_CONFIDENCE: f64 = 0.5;

const NOT_UNDERSTOOD: &str = "I could not understand that command. Please try rephrasing it.";
const RESOLVER_FAILED: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

/// Configuration for the command dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on a single resolver call.
    pub resolver_timeout: Duration,
    /// Intents resolved with lower confidence are rejected. `None` never
    /// rejects on confidence.
    pub min_confidence: Option<f64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            resolver_timeout: Duration::from_secs(10),
            min_confidence: None,
        }
    }
}

impl DispatcherConfig {
    /// Creates a new configuration with the specified resolver timeout.
    pub fn with_resolver_timeout(mut self, timeout: Duration) -> Self {
        self.resolver_timeout = timeout;
        self
    }

    /// Creates a new configuration with the specified confidence floor.
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }
}

/// Registers dispatcher metric descriptions with the metrics recorder.
pub fn register_dispatch_metrics() {
    metrics::describe_counter!(
        "rolegraph_dispatch_total",
        "Total number of dispatched commands by intent kind and status"
    );
    metrics::describe_histogram!(
        "rolegraph_dispatch_duration_seconds",
        "Time spent dispatching a command, including resolution"
    );
}

/// Executes natural-language commands against the graph.
pub struct CommandDispatcher<S> {
    graph: Arc<GraphService<S>>,
    resolver: Arc<dyn IntentResolver>,
    config: DispatcherConfig,
}

impl<S: GraphStore> CommandDispatcher<S> {
    pub fn new(
        graph: Arc<GraphService<S>>,
        resolver: Arc<dyn IntentResolver>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            graph,
            resolver,
            config,
        }
    }

    pub fn graph(&self) -> &Arc<GraphService<S>> {
        &self.graph
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Dispatches one raw command and reports what happened.
    #[instrument(skip(self), fields(resolver = self.resolver.name()))]
    pub async fn dispatch(&self, raw: &str) -> CommandOutcome {
        let started = Instant::now();

        let outcome = if raw.trim().is_empty() {
            CommandOutcome::failed(None, "Command is required.")
        } else {
            match self.resolve(raw).await {
                Ok(resolved) => self.execute(resolved).await,
                Err(err) => {
                    warn!(error = %err, "intent resolution failed");
                    CommandOutcome::failed(None, RESOLVER_FAILED)
                }
            }
        };

        let kind = outcome.kind.map(|k| k.as_str()).unwrap_or("none");
        let labels = [
            ("kind", kind.to_string()),
            ("status", outcome.status.as_str().to_string()),
        ];
        metrics::counter!("rolegraph_dispatch_total", &labels).increment(1);
        metrics::histogram!("rolegraph_dispatch_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        info!(
            kind,
            status = outcome.status.as_str(),
            role_created = outcome.role_created,
            permission_created = outcome.permission_created,
            "command dispatched"
        );
        outcome
    }

    async fn resolve(&self, raw: &str) -> DomainResult<ResolvedIntent> {
        let limit = self.config.resolver_timeout;
        match timeout(limit, self.resolver.resolve(raw)).await {
            Ok(Ok(intent)) => Ok(intent),
            Ok(Err(err @ DomainError::ResolverUnavailable { .. })) => Err(err),
            Ok(Err(err)) => Err(DomainError::ResolverUnavailable {
                message: err.to_string(),
            }),
            Err(_) => Err(DomainError::ResolverUnavailable {
                message: format!("timed out after {}ms", limit.as_millis()),
            }),
        }
    }

    async fn execute(&self, resolved: ResolvedIntent) -> CommandOutcome {
        let kind = resolved.intent_kind().unwrap_or(IntentKind::Unknown);
        debug!(
            action = %resolved.kind,
            confidence = resolved.confidence,
            "intent resolved"
        );

        let validated = match validate(&resolved) {
            Ok(validated) => validated,
            Err(err) => return self.failure(kind, err).with_parsed(resolved),
        };

        if validated != ValidatedIntent::Unknown {
            if let Some(floor) = self.config.min_confidence {
                if resolved.confidence < floor {
                    let err = DomainError::InvalidIntent {
                        reason: format!(
                            "I am not confident I understood that command (confidence {:.2}). Please try rephrasing it.",
                            resolved.confidence
                        ),
                    };
                    return self.failure(kind, err).with_parsed(resolved);
                }
            } else if resolved.confidence < LOW_CONFIDENCE {
                info!(confidence = resolved.confidence, "executing low-confidence intent");
            }
        }

        let outcome = match validated {
            ValidatedIntent::CreatePermission { name, description } => {
                self.create_permission(&name, description).await
            }
            ValidatedIntent::CreateRole { name, description } => {
                self.create_role(&name, description).await
            }
            ValidatedIntent::AssignPermission {
                role_name,
                permission_name,
            } => self.assign(&role_name, &permission_name).await,
            ValidatedIntent::ListPermissions => match self.graph.list_permissions().await {
                Ok(permissions) => CommandOutcome::succeeded(
                    kind,
                    format!("Found {} permissions", permissions.len()),
                    OutcomeData::Permissions(permissions),
                ),
                Err(err) => self.failure(kind, err),
            },
            ValidatedIntent::ListRoles => match self.graph.list_roles().await {
                Ok(roles) => CommandOutcome::succeeded(
                    kind,
                    format!("Found {} roles", roles.len()),
                    OutcomeData::Roles(roles),
                ),
                Err(err) => self.failure(kind, err),
            },
            ValidatedIntent::Unknown => CommandOutcome::failed(Some(kind), NOT_UNDERSTOOD),
        };
        outcome.with_parsed(resolved)
    }

    async fn create_permission(&self, name: &str, description: Option<String>) -> CommandOutcome {
        let kind = IntentKind::CreatePermission;
        let description = description.unwrap_or_else(|| default_permission_description(name));
        match self
            .graph
            .create_permission(&normalize_permission_name(name), Some(&description))
            .await
        {
            Ok(permission) => CommandOutcome::succeeded(
                kind,
                format!("Successfully created permission \"{name}\""),
                OutcomeData::Permission(permission),
            ),
            Err(err) => self.failure(kind, err),
        }
    }

    async fn create_role(&self, name: &str, description: Option<String>) -> CommandOutcome {
        let kind = IntentKind::CreateRole;
        let description = description.unwrap_or_else(|| default_role_description(name));
        match self
            .graph
            .create_role(&normalize_role_name(name), Some(&description))
            .await
        {
            Ok(role) => CommandOutcome::succeeded(
                kind,
                format!("Successfully created role \"{name}\""),
                OutcomeData::Role(role),
            ),
            Err(err) => self.failure(kind, err),
        }
    }

    /// Assigns by name, creating whichever side is missing.
    #[instrument(skip(self))]
    async fn assign(&self, role_name: &str, permission_name: &str) -> CommandOutcome {
        let kind = IntentKind::AssignPermission;
        let session = self.graph.session().await;

        let (role, role_created) = match find_or_create_role(&session, role_name).await {
            Ok(found) => found,
            Err(err) => {
                return self.auto_create_failure(kind, "role", role_name, err);
            }
        };

        let (permission, permission_created) =
            match find_or_create_permission(&session, permission_name).await {
                Ok(found) => found,
                Err(err) => {
                    let leftover = self
                        .roll_back(&session, role_created.then_some(&role), None)
                        .await;
                    return self
                        .auto_create_failure(kind, "permission", permission_name, err)
                        .with_leftover(leftover);
                }
            };

        match session.assign(&role.id, &permission.id).await {
            Ok(_) => {
                let mut message = format!(
                    "Successfully assigned permission \"{permission_name}\" to role \"{role_name}\""
                );
                match (role_created, permission_created) {
                    (true, true) => {
                        message.push_str(" (both role and permission were created automatically)")
                    }
                    (true, false) => message.push_str(" (role was created automatically)"),
                    (false, true) => message.push_str(" (permission was created automatically)"),
                    (false, false) => {}
                }
                CommandOutcome::succeeded(
                    kind,
                    message,
                    OutcomeData::Assignment { role, permission },
                )
                .with_created(role_created, permission_created)
            }
            Err(DomainError::DuplicateAssignment { .. }) => CommandOutcome::already_exists(
                kind,
                true,
                format!(
                    "Permission \"{permission_name}\" is already assigned to role \"{role_name}\"."
                ),
            )
            .with_data(OutcomeData::Assignment { role, permission }),
            Err(err) => {
                error!(error = %err, "assignment failed after lookups");
                let leftover = self
                    .roll_back(
                        &session,
                        role_created.then_some(&role),
                        permission_created.then_some(&permission),
                    )
                    .await;
                self.failure(kind, err).with_leftover(leftover)
            }
        }
    }

    /// Removes entities auto-created by a failed assign command.
    ///
    /// Returns whatever could not be removed.
    async fn roll_back(
        &self,
        session: &GraphSession<'_, S>,
        role: Option<&Role>,
        permission: Option<&Permission>,
    ) -> Leftover {
        let mut leftover = Leftover::default();
        if let Some(permission) = permission {
            if let Err(err) = session.delete_permission(&permission.id).await {
                error!(
                    permission_id = %permission.id,
                    error = %err,
                    "rollback of auto-created permission failed"
                );
                leftover.permission = Some(permission.name.clone());
            }
        }
        if let Some(role) = role {
            if let Err(err) = session.delete_role(&role.id).await {
                error!(role_id = %role.id, error = %err, "rollback of auto-created role failed");
                leftover.role = Some(role.name.clone());
            }
        }
        leftover
    }

    fn auto_create_failure(
        &self,
        kind: IntentKind,
        entity: &str,
        requested: &str,
        err: DomainError,
    ) -> CommandOutcome {
        let detail = self.failure(kind, err).message;
        CommandOutcome::failed(
            Some(kind),
            format!("Failed to create {entity} \"{requested}\". {detail}"),
        )
    }

    /// Maps a domain condition to a failed outcome.
    fn failure(&self, kind: IntentKind, err: DomainError) -> CommandOutcome {
        match err {
            DomainError::DuplicateName { kind: entity, name } => CommandOutcome::already_exists(
                kind,
                false,
                format!("{} \"{name}\" already exists", entity_label(entity)),
            ),
            DomainError::DuplicateAssignment { .. } => CommandOutcome::already_exists(
                kind,
                true,
                "Permission is already assigned to this role.".to_string(),
            ),
            DomainError::InvalidIntent { reason } => CommandOutcome::failed(Some(kind), reason),
            DomainError::InvalidInput { message } => CommandOutcome::failed(Some(kind), message),
            err @ (DomainError::NotFound { .. }
            | DomainError::AssignmentNotFound { .. }
            | DomainError::UnknownReference { .. }) => {
                CommandOutcome::failed(Some(kind), capitalize(&err.to_string()))
            }
            DomainError::ResolverUnavailable { message } => {
                warn!(%message, "resolver unavailable");
                CommandOutcome::failed(Some(kind), RESOLVER_FAILED)
            }
            DomainError::Storage { message } => {
                error!(%message, kind = kind.as_str(), "unexpected storage fault");
                CommandOutcome::failed(Some(kind), internal_message(kind))
            }
        }
    }
}

/// Auto-created entities a rollback could not remove.
#[derive(Debug, Default)]
struct Leftover {
    role: Option<String>,
    permission: Option<String>,
}

impl CommandOutcome {
    fn with_leftover(mut self, leftover: Leftover) -> Self {
        let mut names = Vec::new();
        if let Some(role) = &leftover.role {
            names.push(format!("role \"{role}\""));
        }
        if let Some(permission) = &leftover.permission {
            names.push(format!("permission \"{permission}\""));
        }
        if !names.is_empty() {
            self.message.push_str(&format!(
                " The automatically created {} could not be removed.",
                names.join(" and ")
            ));
        }
        self.role_created = leftover.role.is_some();
        self.permission_created = leftover.permission.is_some();
        self
    }
}

async fn find_or_create_role<S: GraphStore>(
    session: &GraphSession<'_, S>,
    requested: &str,
) -> DomainResult<(Role, bool)> {
    let normalized = normalize_role_name(requested);
    if let Some(role) = session.find_role_by_name(requested).await? {
        return Ok((role, false));
    }
    if let Some(role) = session.find_role_by_name(&normalized).await? {
        return Ok((role, false));
    }
    let role = session
        .create_role(&normalized, Some(&assigned_role_description(requested)))
        .await?;
    Ok((role, true))
}

async fn find_or_create_permission<S: GraphStore>(
    session: &GraphSession<'_, S>,
    requested: &str,
) -> DomainResult<(Permission, bool)> {
    let normalized = normalize_permission_name(requested);
    if let Some(permission) = session.find_permission_by_name(requested).await? {
        return Ok((permission, false));
    }
    if let Some(permission) = session.find_permission_by_name(&normalized).await? {
        return Ok((permission, false));
    }
    let permission = session
        .create_permission(
            &normalized,
            Some(&assigned_permission_description(requested)),
        )
        .await?;
    Ok((permission, true))
}

fn internal_message(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::CreatePermission => "Failed to create permission. Please try again.",
        IntentKind::CreateRole => "Failed to create role. Please try again.",
        IntentKind::AssignPermission => "Failed to assign permission. Please try again.",
        IntentKind::ListPermissions => "Failed to retrieve permissions.",
        IntentKind::ListRoles => "Failed to retrieve roles.",
        IntentKind::Unknown => "An error occurred while processing your command.",
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests;
