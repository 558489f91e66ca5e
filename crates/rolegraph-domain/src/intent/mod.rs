//! Intent schema.
//!
//! This module contains:
//! - The fixed vocabulary of supported commands ([`IntentKind`])
//! - The resolver's unvalidated guess ([`ResolvedIntent`])
//! - Schema validation into [`ValidatedIntent`]
//! - Name normalization rules applied before execution

mod normalize;
#[cfg(test)]
mod normalize_proptest;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

pub use normalize::{
    assigned_permission_description, assigned_role_description, default_permission_description,
    default_role_description, normalize_permission_name, normalize_role_name,
};

/// Parameter keys understood by the schema.
pub mod params {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const ROLE_NAME: &str = "role_name";
    pub const PERMISSION_NAME: &str = "permission_name";
}

/// The supported command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    CreatePermission,
    CreateRole,
    AssignPermission,
    ListPermissions,
    ListRoles,
    Unknown,
}

impl IntentKind {
    pub const ALL: [IntentKind; 6] = [
        IntentKind::CreatePermission,
        IntentKind::CreateRole,
        IntentKind::AssignPermission,
        IntentKind::ListPermissions,
        IntentKind::ListRoles,
        IntentKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::CreatePermission => "create_permission",
            IntentKind::CreateRole => "create_role",
            IntentKind::AssignPermission => "assign_permission",
            IntentKind::ListPermissions => "list_permissions",
            IntentKind::ListRoles => "list_roles",
            IntentKind::Unknown => "unknown",
        }
    }

    /// Parses a wire name. Returns `None` for anything outside the schema.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolver's best guess at the structured form of a command.
///
/// Nothing here has been checked against the schema yet: `kind` may name an
/// unsupported action and required parameters may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedIntent {
    #[serde(rename = "action")]
    pub kind: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub confidence: f64,
}

impl ResolvedIntent {
    /// Creates an intent of the given kind with no parameters.
    pub fn new(kind: IntentKind, confidence: f64) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            parameters: BTreeMap::new(),
            confidence,
        }
    }

    /// The intent used when resolution produced nothing usable.
    pub fn unknown() -> Self {
        Self::new(IntentKind::Unknown, 0.0)
    }

    pub fn with_parameter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    /// Returns a parameter, trimmed, or `None` when absent or blank.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The schema kind, if `kind` names one.
    pub fn intent_kind(&self) -> Option<IntentKind> {
        IntentKind::parse(&self.kind)
    }
}

/// An intent that satisfies the schema.
///
/// Names are trimmed but not yet normalized.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedIntent {
    CreatePermission {
        name: String,
        description: Option<String>,
    },
    CreateRole {
        name: String,
        description: Option<String>,
    },
    AssignPermission {
        role_name: String,
        permission_name: String,
    },
    ListPermissions,
    ListRoles,
    Unknown,
}

impl ValidatedIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            ValidatedIntent::CreatePermission { .. } => IntentKind::CreatePermission,
            ValidatedIntent::CreateRole { .. } => IntentKind::CreateRole,
            ValidatedIntent::AssignPermission { .. } => IntentKind::AssignPermission,
            ValidatedIntent::ListPermissions => IntentKind::ListPermissions,
            ValidatedIntent::ListRoles => IntentKind::ListRoles,
            ValidatedIntent::Unknown => IntentKind::Unknown,
        }
    }
}

/// Validates a resolved intent against the schema.
///
/// Fails with [`DomainError::InvalidIntent`] when the kind is unsupported or a
/// required parameter is missing or blank. The reason is phrased for the end
/// user.
pub fn validate(intent: &ResolvedIntent) -> DomainResult<ValidatedIntent> {
    let kind = intent.intent_kind().ok_or_else(|| DomainError::InvalidIntent {
        reason: format!("Unsupported command \"{}\".", intent.kind.trim()),
    })?;

    let description = || intent.parameter(params::DESCRIPTION).map(str::to_string);

    match kind {
        IntentKind::CreatePermission => {
            let name = required(intent, params::NAME, "Permission name is required.")?;
            Ok(ValidatedIntent::CreatePermission {
                name,
                description: description(),
            })
        }
        IntentKind::CreateRole => {
            let name = required(intent, params::NAME, "Role name is required.")?;
            Ok(ValidatedIntent::CreateRole {
                name,
                description: description(),
            })
        }
        IntentKind::AssignPermission => {
            let role_name = intent.parameter(params::ROLE_NAME);
            let permission_name = intent.parameter(params::PERMISSION_NAME);
            match (role_name, permission_name) {
                (Some(role_name), Some(permission_name)) => Ok(ValidatedIntent::AssignPermission {
                    role_name: role_name.to_string(),
                    permission_name: permission_name.to_string(),
                }),
                _ => Err(DomainError::InvalidIntent {
                    reason: "Both role name and permission name are required.".to_string(),
                }),
            }
        }
        IntentKind::ListPermissions => Ok(ValidatedIntent::ListPermissions),
        IntentKind::ListRoles => Ok(ValidatedIntent::ListRoles),
        IntentKind::Unknown => Ok(ValidatedIntent::Unknown),
    }
}

fn required(intent: &ResolvedIntent, key: &str, reason: &str) -> DomainResult<String> {
    intent
        .parameter(key)
        .map(str::to_string)
        .ok_or_else(|| DomainError::InvalidIntent {
            reason: reason.to_string(),
        })
}
