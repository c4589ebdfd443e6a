use axum::{extract::State, middleware, routing::get, Extension, Json, Router};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::middleware::auth::auth_middleware;
use crate::services::dashboard_service::{Dashboard, DashboardService};
use crate::utils::Claims;

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Role-specific overview for the caller", body = Dashboard),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn dashboard(
    State(dashboards): State<Arc<DashboardService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(dashboards.for_user(&claims).await?))
}

pub fn dashboard_routes(dashboard_service: Arc<DashboardService>, config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(dashboard_service)
}
