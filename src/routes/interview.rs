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
use crate::models::roadmap::InterviewSlot;
use crate::services::roadmap_service::RoadmapService;
use crate::utils::Claims;

#[derive(Deserialize, ToSchema)]
pub struct SetThemeRequest {
    roadmap_id: String,
    /// 1 or 2
    interview_num: i64,
    /// Interview instructions written by the mentor.
    context: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct InterviewThemeResponse {
    pub theme: String,
    pub goal: String,
}

#[utoipa::path(
    post,
    path = "/api/interviews/theme",
    request_body = SetThemeRequest,
    responses(
        (status = 200, description = "Interview theme stored"),
        (status = 400, description = "Empty context or bad interview_num"),
        (status = 403, description = "Only the roadmap's mentor may set themes")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_theme(
    State(roadmaps): State<Arc<RoadmapService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Json(req): Json<SetThemeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let roadmap_id = ids::parse(&req.roadmap_id, "roadmap")?;
    let slot = InterviewSlot::from_number(req.interview_num)?;
    roadmaps.set_theme(&claims, roadmap_id, slot, &req.context).await?;
    Ok(Json(serde_json::json!({ "message": "Interview theme saved" })))
}

#[utoipa::path(
    get,
    path = "/api/interviews/{roadmap_id}/{interview_num}",
    params(
        ("roadmap_id" = String, Path, description = "Roadmap ID"),
        ("interview_num" = i64, Path, description = "Interview number, 1 or 2")
    ),
    responses(
        (status = 200, description = "Theme and goal for the interview", body = InterviewThemeResponse),
        (status = 404, description = "Roadmap or theme not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_theme(
    State(roadmaps): State<Arc<RoadmapService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Path((roadmap_id, interview_num)): Path<(String, i64)>,
) -> Result<Json<InterviewThemeResponse>, AppError> {
    let roadmap_id = ids::parse(&roadmap_id, "roadmap")?;
    let slot = InterviewSlot::from_number(interview_num)?;
    let (roadmap, theme) = roadmaps.interview_context(&claims, roadmap_id, slot).await?;
    Ok(Json(InterviewThemeResponse { theme, goal: roadmap.goal }))
}

pub fn interview_routes(roadmap_service: Arc<RoadmapService>, config: Arc<Config>) -> Router {
    Router::new()
        .route("/theme", post(set_theme))
        .route("/{roadmap_id}/{interview_num}", get(get_theme))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(roadmap_service)
}
