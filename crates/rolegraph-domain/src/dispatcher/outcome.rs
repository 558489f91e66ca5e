//! Uniform result record of a dispatched command.

use rolegraph_storage::{EntityKind, Permission, Role};
use serde::Serialize;

use crate::graph::{PermissionWithRoles, RoleWithPermissions};
use crate::intent::{IntentKind, ResolvedIntent};

/// Terminal state of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The command changed or read the graph as asked.
    Succeeded,
    /// The requested entity or assignment was already present.
    AlreadyExists,
    /// The command could not be carried out.
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Succeeded => "succeeded",
            OutcomeStatus::AlreadyExists => "already_exists",
            OutcomeStatus::Failed => "failed",
        }
    }
}

/// Entity data attached to an outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutcomeData {
    Permission(Permission),
    Role(Role),
    Assignment { role: Role, permission: Permission },
    Permissions(Vec<PermissionWithRoles>),
    Roles(Vec<RoleWithPermissions>),
}

/// The result of dispatching one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub status: OutcomeStatus,
    /// The schema kind the command resolved to; `None` when resolution
    /// itself failed.
    #[serde(rename = "action")]
    pub kind: Option<IntentKind>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<OutcomeData>,
    /// The resolver's guess, as received.
    #[serde(rename = "parsed_command", skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ResolvedIntent>,
    /// The role named by an assign command did not exist and was created.
    pub role_created: bool,
    /// The permission named by an assign command did not exist and was created.
    pub permission_created: bool,
}

impl CommandOutcome {
    pub(crate) fn succeeded(kind: IntentKind, message: String, data: OutcomeData) -> Self {
        Self {
            success: true,
            status: OutcomeStatus::Succeeded,
            kind: Some(kind),
            message,
            data: Some(data),
            parsed: None,
            role_created: false,
            permission_created: false,
        }
    }

    pub(crate) fn failed(kind: Option<IntentKind>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: OutcomeStatus::Failed,
            kind,
            message: message.into(),
            data: None,
            parsed: None,
            role_created: false,
            permission_created: false,
        }
    }

    pub(crate) fn already_exists(kind: IntentKind, success: bool, message: String) -> Self {
        Self {
            success,
            status: OutcomeStatus::AlreadyExists,
            kind: Some(kind),
            message,
            data: None,
            parsed: None,
            role_created: false,
            permission_created: false,
        }
    }

    pub(crate) fn with_parsed(mut self, parsed: ResolvedIntent) -> Self {
        self.parsed = Some(parsed);
        self
    }

    pub(crate) fn with_data(mut self, data: OutcomeData) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn with_created(mut self, role_created: bool, permission_created: bool) -> Self {
        self.role_created = role_created;
        self.permission_created = permission_created;
        self
    }
}

/// "Role" / "Permission", for the start of a sentence.
pub(crate) fn entity_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Role => "Role",
        EntityKind::Permission => "Permission",
    }
}
