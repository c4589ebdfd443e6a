use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::Config;
use crate::errors::AppError;
use crate::middleware::auth::auth_middleware;
use crate::models::ids;
use crate::models::notification::NotificationResponse;
use crate::services::notification_service::NotificationService;
use crate::utils::Claims;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UnreadCount {
    pub count: u64,
}

async fn listing(
    notifications: &NotificationService,
    claims: &Claims,
    unread_only: bool,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let found = notifications.list(claims.object_id()?, unread_only).await?;
    Ok(Json(found.into_iter().map(NotificationResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    responses((status = 200, description = "All notifications, newest first", body = [NotificationResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_notifications(
    State(notifications): State<Arc<NotificationService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    listing(&notifications, &claims, false).await
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread",
    responses((status = 200, description = "Unread notifications", body = [NotificationResponse])),
    security(("bearer_auth" = []))
)]
pub async fn unread_notifications(
    State(notifications): State<Arc<NotificationService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    listing(&notifications, &claims, true).await
}

#[utoipa::path(
    get,
    path = "/api/notifications/count",
    responses((status = 200, description = "Number of unread notifications", body = UnreadCount)),
    security(("bearer_auth" = []))
)]
pub async fn unread_count(
    State(notifications): State<Arc<NotificationService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<UnreadCount>, AppError> {
    let count = notifications.unread_count(claims.object_id()?).await?;
    Ok(Json(UnreadCount { count }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_read(
    State(notifications): State<Arc<NotificationService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = ids::parse(&id, "notification")?;
    notifications.mark_read(id, claims.object_id()?).await?;
    Ok(Json(serde_json::json!({ "message": "Notification marked as read" })))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    responses((status = 200, description = "Every notification marked as read")),
    security(("bearer_auth" = []))
)]
pub async fn mark_all_read(
    State(notifications): State<Arc<NotificationService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = notifications.mark_all_read(claims.object_id()?).await?;
    Ok(Json(serde_json::json!({ "message": "All notifications marked as read", "updated": updated })))
}

pub fn notification_routes(notification_service: Arc<NotificationService>, config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread", get(unread_notifications))
        .route("/count", get(unread_count))
        .route("/{id}/read", post(mark_read))
        .route("/read-all", post(mark_all_read))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(notification_service)
}
