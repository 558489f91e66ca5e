//! HTTP route definitions and handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};
use tracing::error;

use rolegraph_domain::DomainError;
use rolegraph_server::ServerConfig;
use rolegraph_storage::{EntityKind, GraphStore, PermissionChanges, RoleChanges};

use super::state::AppState;
use crate::middleware::{cors_layer, MetricsLayer, RequestIdLayer, RequestLoggingLayer};
use crate::observability::{metrics_handler, MetricsState};

/// JSON extractor that rejects malformed bodies with 400 instead of 422.
///
/// Body limit rejections keep their 413 status.
pub struct JsonBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBadRequest(value)),
            Err(rejection) => {
                let message = rejection.body_text();
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    Err(ApiError::new(error_codes::PAYLOAD_TOO_LARGE, message))
                } else {
                    Err(ApiError::validation_error(message))
                }
            }
        }
    }
}

/// Default request body size limit (64 KiB).
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// Router settings taken from the `server` and `metrics` config sections.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub body_limit: usize,
    pub request_timeout: Duration,
    pub metrics_path: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            body_limit: DEFAULT_BODY_LIMIT,
            request_timeout: Duration::from_secs(30),
            metrics_path: "/metrics".to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl HttpOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            body_limit: config.server.body_limit_bytes,
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
            metrics_path: config.metrics.path.clone(),
            cors_allowed_origins: config.server.cors_allowed_origins.clone(),
        }
    }
}

fn api_routes<S: GraphStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        // Roles
        .route("/roles", get(list_roles::<S>).post(create_role::<S>))
        .route(
            "/roles/:id",
            get(get_role::<S>)
                .put(update_role::<S>)
                .delete(delete_role::<S>),
        )
        // Permissions
        .route(
            "/permissions",
            get(list_permissions::<S>).post(create_permission::<S>),
        )
        .route(
            "/permissions/:id",
            get(get_permission::<S>)
                .put(update_permission::<S>)
                .delete(delete_permission::<S>),
        )
        // Assignments and commands
        .route(
            "/rbac/roles/:role_id/permissions",
            get(role_permissions::<S>),
        )
        .route(
            "/rbac/permissions/:permission_id/roles",
            get(permission_roles::<S>),
        )
        .route("/rbac/assign", post(assign::<S>))
        .route(
            "/rbac/roles/:role_id/permissions/:permission_id",
            delete(unassign::<S>),
        )
        .route("/rbac/nlp", post(run_command::<S>))
}

/// Creates the HTTP router with the default body size limit.
pub fn create_router<S: GraphStore>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<S: GraphStore>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    base_router(state).layer(RequestBodyLimitLayer::new(body_limit))
}

/// Creates the production router: API routes, health probes, the optional
/// metrics endpoint and every middleware layer.
pub fn create_router_with_observability<S: GraphStore>(
    state: AppState<S>,
    metrics_state: Option<MetricsState>,
    options: &HttpOptions,
) -> Router {
    let mut router = base_router(state);
    if let Some(metrics_state) = metrics_state {
        router = router.merge(
            Router::new()
                .route(&options.metrics_path, get(metrics_handler))
                .with_state(metrics_state),
        );
    }

    // The last layer is the outermost.
    router
        .layer(RequestBodyLimitLayer::new(options.body_limit))
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(cors_layer(&options.cors_allowed_origins))
        .layer(RequestLoggingLayer::new())
        .layer(MetricsLayer::default())
        .layer(RequestIdLayer::new())
}

fn base_router<S: GraphStore>(state: AppState<S>) -> Router {
    Router::new()
        .nest("/api", api_routes::<S>())
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<S>))
        .with_state(Arc::new(state))
}

// ============================================================
// Errors
// ============================================================

/// Error codes carried in error bodies.
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const RESOLVER_UNAVAILABLE: &str = "resolver_unavailable";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// API error response body: `{"success": false, "code": ..., "message": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(error_codes::CONFLICT, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            error_codes::VALIDATION_ERROR => StatusCode::BAD_REQUEST,
            error_codes::NOT_FOUND => StatusCode::NOT_FOUND,
            error_codes::CONFLICT => StatusCode::CONFLICT,
            error_codes::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            error_codes::RESOLVER_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = json!({
            "success": false,
            "code": self.code,
            "message": self.message,
        });
        (self.status(), Json(body)).into_response()
    }
}

fn entity_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Role => "Role",
        EntityKind::Permission => "Permission",
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::DuplicateName { kind, name } => {
                ApiError::conflict(format!("{} \"{name}\" already exists", entity_label(kind)))
            }
            DomainError::DuplicateAssignment { .. } => {
                ApiError::conflict("Permission is already assigned to this role")
            }
            DomainError::NotFound { kind, .. } => {
                ApiError::not_found(format!("{} not found", entity_label(kind)))
            }
            DomainError::AssignmentNotFound { .. } => {
                ApiError::not_found("Role-permission assignment not found")
            }
            DomainError::UnknownReference { .. } => {
                ApiError::validation_error("Invalid role ID or permission ID")
            }
            DomainError::InvalidIntent { reason } => ApiError::validation_error(reason),
            DomainError::InvalidInput { message } => ApiError::validation_error(message),
            DomainError::ResolverUnavailable { message } => {
                error!(%message, "intent resolver unavailable");
                ApiError::new(
                    error_codes::RESOLVER_UNAVAILABLE,
                    "Command processing is temporarily unavailable",
                )
            }
            DomainError::Storage { message } => {
                error!(%message, "storage fault");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Bodies
// ============================================================

/// Success envelope: `{"success": true, "data": ..., "message": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
        })
    }

    fn data_with_message(data: T, message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
        })
    }
}

fn message_only(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        data: None,
        message: Some(message.to_string()),
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntityRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl UpdateEntityRequest {
    fn ensure_not_empty(&self) -> ApiResult<()> {
        if self.name.is_none() && self.description.is_none() {
            return Err(ApiError::validation_error(
                "At least one of name or description is required",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    #[serde(default)]
    pub role_id: String,
    #[serde(default)]
    pub permission_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub command: String,
}

// ============================================================
// Health
// ============================================================

async fn health_check() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn readiness_check<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    match state.graph.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "ready", "checks": {"storage": "ok"}})),
        ),
        Err(err) => {
            error!(error = %err, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "not_ready", "checks": {"storage": "unavailable"}})),
            )
        }
    }
}

// ============================================================
// Roles
// ============================================================

async fn list_roles<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::data(state.graph.list_roles().await?))
}

async fn create_role<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<CreateEntityRequest>,
) -> ApiResult<impl IntoResponse> {
    let role = state
        .graph
        .create_role(&body.name, body.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::data(role)))
}

async fn get_role<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::data(state.graph.get_role(&id).await?))
}

async fn update_role<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<UpdateEntityRequest>,
) -> ApiResult<impl IntoResponse> {
    body.ensure_not_empty()?;
    let changes = RoleChanges {
        name: body.name,
        description: body.description,
    };
    Ok(ApiResponse::data(state.graph.update_role(&id, changes).await?))
}

async fn delete_role<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.graph.delete_role(&id).await?;
    Ok(message_only("Role deleted successfully"))
}

// ============================================================
// Permissions
// ============================================================

async fn list_permissions<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::data(state.graph.list_permissions().await?))
}

async fn create_permission<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<CreateEntityRequest>,
) -> ApiResult<impl IntoResponse> {
    let permission = state
        .graph
        .create_permission(&body.name, body.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::data(permission)))
}

async fn get_permission<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::data(state.graph.get_permission(&id).await?))
}

async fn update_permission<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<UpdateEntityRequest>,
) -> ApiResult<impl IntoResponse> {
    body.ensure_not_empty()?;
    let changes = PermissionChanges {
        name: body.name,
        description: body.description,
    };
    Ok(ApiResponse::data(
        state.graph.update_permission(&id, changes).await?,
    ))
}

async fn delete_permission<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.graph.delete_permission(&id).await?;
    Ok(message_only("Permission deleted successfully"))
}

// ============================================================
// Assignments
// ============================================================

async fn role_permissions<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(role_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::data(
        state.graph.list_permissions_for_role(&role_id).await?,
    ))
}

async fn permission_roles<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(permission_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::data(
        state.graph.list_roles_for_permission(&permission_id).await?,
    ))
}

async fn assign<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<AssignRequest>,
) -> ApiResult<impl IntoResponse> {
    let role_id = body.role_id.trim();
    let permission_id = body.permission_id.trim();
    if role_id.is_empty() || permission_id.is_empty() {
        return Err(ApiError::validation_error(
            "Role ID and Permission ID are required",
        ));
    }

    let assignment = state.graph.assign(role_id, permission_id).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::data_with_message(assignment, "Permission assigned to role successfully"),
    ))
}

async fn unassign<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((role_id, permission_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    state.graph.unassign(&role_id, &permission_id).await?;
    Ok(message_only("Permission removed from role successfully"))
}

// ============================================================
// Commands
// ============================================================

/// Runs a natural-language command.
///
/// Always answers 200 once the body is valid; the outcome's `success` and
/// `status` fields say whether the command took effect.
async fn run_command<S: GraphStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<CommandRequest>,
) -> ApiResult<impl IntoResponse> {
    if body.command.trim().is_empty() {
        return Err(ApiError::validation_error("Command is required"));
    }
    Ok(Json(state.dispatcher.dispatch(&body.command).await))
}
