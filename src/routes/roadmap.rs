use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::Config;
use crate::errors::AppError;
use crate::middleware::auth::auth_middleware;
use crate::models::ids;
use crate::models::roadmap::{ApprovalState, FeedbackDirection, FeedbackEntryResponse, Progress, RoadmapResponse, RoadmapStatus};
use crate::models::user::Role;
use crate::services::assessment_service::{AssessmentService, AssessmentView, SubmissionResult};
use crate::services::roadmap_service::{ProgressUpdate, RoadmapService};
use crate::utils::Claims;

type RoadmapState = (Arc<RoadmapService>, Arc<AssessmentService>);

#[derive(Deserialize, ToSchema)]
pub struct StatusRequest {
    status: RoadmapStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct ApprovalRequest {
    status: ApprovalState,
    #[serde(default)]
    comments: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteSubtopicsRequest {
    completed_subtopics: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteResourcesRequest {
    completed_resources: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ToggleResourceRequest {
    subtopic_index: usize,
    resource_index: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitAssessmentRequest {
    selected_answers: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct FeedbackRequest {
    direction: FeedbackDirection,
    rating: i32,
    #[serde(default)]
    text: String,
}

fn view(claims: &Claims, roadmap: crate::models::roadmap::Roadmap) -> RoadmapResponse {
    RoadmapResponse::build(roadmap, claims.role == Role::Mentor)
}

#[utoipa::path(
    get,
    path = "/api/roadmaps",
    responses((status = 200, description = "Roadmaps visible to the caller", body = [RoadmapResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_roadmaps(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<Vec<RoadmapResponse>>, AppError> {
    let list = roadmaps.list_for(&claims).await?;
    Ok(Json(list.into_iter().map(|r| view(&claims, r)).collect()))
}

#[utoipa::path(
    get,
    path = "/api/roadmaps/{id}",
    params(("id" = String, Path, description = "Roadmap ID")),
    responses(
        (status = 200, description = "Roadmap; answer keys only for mentors", body = RoadmapResponse),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Roadmap not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_roadmap(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(id): Path<String>,
) -> Result<Json<RoadmapResponse>, AppError> {
    let roadmap = roadmaps.get_for(&claims, ids::parse(&id, "roadmap")?).await?;
    Ok(Json(view(&claims, roadmap)))
}

#[utoipa::path(
    get,
    path = "/api/roadmaps/{id}/progress",
    params(("id" = String, Path, description = "Roadmap ID")),
    responses((status = 200, description = "Completed vs total resources", body = Progress)),
    security(("bearer_auth" = []))
)]
pub async fn get_progress(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(id): Path<String>,
) -> Result<Json<Progress>, AppError> {
    let roadmap = roadmaps.get_for(&claims, ids::parse(&id, "roadmap")?).await?;
    Ok(Json(roadmap.progress()))
}

#[utoipa::path(
    put,
    path = "/api/roadmaps/{id}/status",
    params(("id" = String, Path, description = "Roadmap ID")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status changed", body = RoadmapResponse),
        (status = 403, description = "Mentor access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_status(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<RoadmapResponse>, AppError> {
    let roadmap = roadmaps.set_status(&claims, ids::parse(&id, "roadmap")?, req.status).await?;
    Ok(Json(view(&claims, roadmap)))
}

#[utoipa::path(
    put,
    path = "/api/roadmaps/{id}/approval",
    params(("id" = String, Path, description = "Roadmap ID")),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Approval recorded", body = RoadmapResponse),
        (status = 403, description = "Mentor access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_approval(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(id): Path<String>,
    Json(req): Json<ApprovalRequest>,
) -> Result<Json<RoadmapResponse>, AppError> {
    let roadmap = roadmaps
        .set_approval(&claims, ids::parse(&id, "roadmap")?, req.status, req.comments)
        .await?;
    Ok(Json(view(&claims, roadmap)))
}

#[utoipa::path(
    post,
    path = "/api/roadmaps/{id}/modules/{index}/complete",
    params(
        ("id" = String, Path, description = "Roadmap ID"),
        ("index" = usize, Path, description = "Module index")
    ),
    responses(
        (status = 200, description = "Module marked complete", body = ProgressUpdate),
        (status = 404, description = "Roadmap or module not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_module(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<Json<ProgressUpdate>, AppError> {
    let update = roadmaps.complete_module(&claims, ids::parse(&id, "roadmap")?, index).await?;
    Ok(Json(update))
}

#[utoipa::path(
    post,
    path = "/api/roadmaps/{id}/modules/{index}/subtopics/complete",
    params(
        ("id" = String, Path, description = "Roadmap ID"),
        ("index" = usize, Path, description = "Module index")
    ),
    request_body = CompleteSubtopicsRequest,
    responses(
        (status = 200, description = "Every resource of the named subtopics marked complete", body = ProgressUpdate),
        (status = 400, description = "Empty list")
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_subtopics(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path((id, index)): Path<(String, usize)>,
    Json(req): Json<CompleteSubtopicsRequest>,
) -> Result<Json<ProgressUpdate>, AppError> {
    let update = roadmaps
        .complete_subtopics(&claims, ids::parse(&id, "roadmap")?, index, req.completed_subtopics)
        .await?;
    Ok(Json(update))
}

#[utoipa::path(
    post,
    path = "/api/roadmaps/{id}/modules/{index}/resources/complete",
    params(
        ("id" = String, Path, description = "Roadmap ID"),
        ("index" = usize, Path, description = "Module index")
    ),
    request_body = CompleteResourcesRequest,
    responses(
        (status = 200, description = "Named resources marked complete", body = ProgressUpdate),
        (status = 400, description = "Empty list")
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_resources(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path((id, index)): Path<(String, usize)>,
    Json(req): Json<CompleteResourcesRequest>,
) -> Result<Json<ProgressUpdate>, AppError> {
    let update = roadmaps
        .complete_resources(&claims, ids::parse(&id, "roadmap")?, index, req.completed_resources)
        .await?;
    Ok(Json(update))
}

#[utoipa::path(
    post,
    path = "/api/roadmaps/{id}/modules/{index}/resources/toggle",
    params(
        ("id" = String, Path, description = "Roadmap ID"),
        ("index" = usize, Path, description = "Module index")
    ),
    request_body = ToggleResourceRequest,
    responses(
        (status = 200, description = "Resource flipped", body = ProgressUpdate),
        (status = 404, description = "Module or resource not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_resource(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path((id, index)): Path<(String, usize)>,
    Json(req): Json<ToggleResourceRequest>,
) -> Result<Json<ProgressUpdate>, AppError> {
    let update = roadmaps
        .toggle_resource(&claims, ids::parse(&id, "roadmap")?, index, req.subtopic_index, req.resource_index)
        .await?;
    Ok(Json(update))
}

#[utoipa::path(
    get,
    path = "/api/roadmaps/{id}/modules/{index}/assessment",
    params(
        ("id" = String, Path, description = "Roadmap ID"),
        ("index" = usize, Path, description = "Module index")
    ),
    responses((status = 200, description = "Questions; answer key only for mentors", body = AssessmentView)),
    security(("bearer_auth" = []))
)]
pub async fn get_assessment(
    State((_roadmaps, assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<Json<AssessmentView>, AppError> {
    let assessment = assessments
        .get_assessment(&claims, ids::parse(&id, "roadmap")?, index)
        .await?;
    Ok(Json(assessment))
}

#[utoipa::path(
    post,
    path = "/api/roadmaps/{id}/modules/{index}/assessment",
    params(
        ("id" = String, Path, description = "Roadmap ID"),
        ("index" = usize, Path, description = "Module index")
    ),
    request_body = SubmitAssessmentRequest,
    responses(
        (status = 200, description = "Graded submission and best score so far", body = SubmissionResult),
        (status = 400, description = "Wrong number of answers")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_assessment(
    State((_roadmaps, assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path((id, index)): Path<(String, usize)>,
    Json(req): Json<SubmitAssessmentRequest>,
) -> Result<Json<SubmissionResult>, AppError> {
    let result = assessments
        .submit(&claims, ids::parse(&id, "roadmap")?, index, &req.selected_answers)
        .await?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/roadmaps/{id}/feedback",
    params(("id" = String, Path, description = "Roadmap ID")),
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback stored", body = FeedbackEntryResponse),
        (status = 400, description = "Rating outside 1..=5"),
        (status = 403, description = "Direction not allowed for this role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn leave_feedback(
    State((roadmaps, _assessments)): State<RoadmapState>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(id): Path<String>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<FeedbackEntryResponse>, AppError> {
    let entry = roadmaps
        .set_feedback(&claims, ids::parse(&id, "roadmap")?, req.direction, req.rating, req.text)
        .await?;
    Ok(Json(entry.into()))
}

pub fn roadmap_routes(
    roadmap_service: Arc<RoadmapService>,
    assessment_service: Arc<AssessmentService>,
    config: Arc<Config>,
) -> Router {
    Router::new()
        .route("/", get(list_roadmaps))
        .route("/{id}", get(get_roadmap))
        .route("/{id}/progress", get(get_progress))
        .route("/{id}/status", put(set_status))
        .route("/{id}/approval", put(set_approval))
        .route("/{id}/feedback", post(leave_feedback))
        .route("/{id}/modules/{index}/complete", post(complete_module))
        .route("/{id}/modules/{index}/subtopics/complete", post(complete_subtopics))
        .route("/{id}/modules/{index}/resources/complete", post(complete_resources))
        .route("/{id}/modules/{index}/resources/toggle", post(toggle_resource))
        .route("/{id}/modules/{index}/assessment", get(get_assessment).post(submit_assessment))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state((roadmap_service, assessment_service))
}
