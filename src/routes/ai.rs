use axum::{extract::State, middleware, routing::post, Extension, Json, Router};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::Config;
use crate::errors::AppError;
use crate::middleware::auth::auth_middleware;
use crate::models::ids;
use crate::models::roadmap::InterviewSlot;
use crate::models::user::Role;
use crate::services::interview_service::{Exchange, InterviewService, InterviewTurn};
use crate::services::roadmap_service::{GenerateOutcome, RoadmapService};
use crate::services::user_service::{MentorMatch, UserService};
use crate::services::AiClients;
use crate::utils::Claims;

type AiState = (Arc<RoadmapService>, Arc<UserService>, Arc<InterviewService>, AiClients);

#[derive(Deserialize, ToSchema)]
pub struct GenerateRoadmapRequest {
    /// Goal text or the whole mentor/mentee conversation.
    conversation: String,
    mentee_id: String,
}

#[derive(ToSchema)]
pub struct InterviewTurnMultipart {
    pub roadmap_id: String,
    /// 1 or 2
    pub interview_num: i64,
    /// JSON array of `{question, answer}` objects
    pub history: Option<String>,
    #[schema(value_type = String, format = "binary")]
    pub audio: Option<Vec<u8>>,
}

#[utoipa::path(
    post,
    path = "/api/ai/roadmap",
    request_body = GenerateRoadmapRequest,
    responses(
        (status = 200, description = "Roadmap created, or the existing one revised", body = GenerateOutcome),
        (status = 403, description = "Caller is neither the mentee nor their mentor"),
        (status = 409, description = "Concurrent revision"),
        (status = 500, description = "Model output could not be parsed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn generate_roadmap(
    State((roadmaps, _users, _interviews, _clients)): State<AiState>,
    Extension(claims): Extension<Arc<Claims>>,
    Json(req): Json<GenerateRoadmapRequest>,
) -> Result<Json<GenerateOutcome>, AppError> {
    let mentee_id = ids::parse(&req.mentee_id, "mentee")?;
    let outcome = roadmaps.generate(&claims, mentee_id, &req.conversation).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/ai/match",
    responses(
        (status = 200, description = "Best mentor for the caller's goals", body = MentorMatch),
        (status = 400, description = "No learning goals on the profile"),
        (status = 404, description = "No suitable mentor found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn match_mentor(
    State((_roadmaps, users, _interviews, clients)): State<AiState>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<MentorMatch>, AppError> {
    claims.require_role(Role::Mentee)?;
    let found = users.match_mentor(claims.object_id()?, clients.llm.as_ref()).await?;
    Ok(Json(found))
}

#[utoipa::path(
    post,
    path = "/api/ai/interview",
    request_body(
        content_type = "multipart/form-data",
        content = inline(InterviewTurnMultipart)
    ),
    responses(
        (status = 200, description = "Next interview question", body = InterviewTurn),
        (status = 400, description = "Missing roadmap_id or bad interview_num"),
        (status = 404, description = "Roadmap or interview theme not found"),
        (status = 500, description = "Transcription failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn interview_turn(
    State((_roadmaps, _users, interviews, _clients)): State<AiState>,
    Extension(claims): Extension<Arc<Claims>>,
    mut multipart: Multipart,
) -> Result<Json<InterviewTurn>, AppError> {
    let mut roadmap_id = None;
    let mut interview_num = None;
    let mut history: Vec<Exchange> = Vec::new();
    let mut audio = None;

    let field_error = |e: axum_extra::extract::multipart::MultipartError| AppError::BadRequest(format!("Multipart error: {e}"));

    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "roadmap_id" => roadmap_id = Some(field.text().await.map_err(field_error)?),
            "interview_num" => {
                let raw = field.text().await.map_err(field_error)?;
                let num = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::BadRequest("interview_num must be 1 or 2".to_string()))?;
                interview_num = Some(num);
            }
            "history" => {
                let raw = field.text().await.map_err(field_error)?;
                if !raw.trim().is_empty() {
                    history = serde_json::from_str(&raw)
                        .map_err(|e| AppError::BadRequest(format!("history must be a JSON array: {e}")))?;
                }
            }
            "audio" => audio = Some(field.bytes().await.map_err(field_error)?.to_vec()),
            _ => {}
        }
    }

    let roadmap_id = roadmap_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("roadmap_id is required".to_string()))?;
    let roadmap_id = ids::parse(roadmap_id.trim(), "roadmap")?;
    let interview_num = interview_num.ok_or_else(|| AppError::BadRequest("interview_num is required".to_string()))?;
    let slot = InterviewSlot::from_number(interview_num)?;

    let turn = interviews.take_turn(&claims, roadmap_id, slot, history, audio).await?;
    Ok(Json(turn))
}

pub fn ai_routes(
    roadmap_service: Arc<RoadmapService>,
    user_service: Arc<UserService>,
    interview_service: Arc<InterviewService>,
    clients: AiClients,
    config: Arc<Config>,
) -> Router {
    Router::new()
        .route("/roadmap", post(generate_roadmap))
        .route("/match", post(match_mentor))
        .route("/interview", post(interview_turn))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state((roadmap_service, user_service, interview_service, clients))
}
