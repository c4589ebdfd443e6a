use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::Config;
use crate::errors::AppError;
use crate::middleware::auth::auth_middleware;
use crate::models::ids;
use crate::models::meeting::{MeetingResponse, MeetingStatus, MeetingWindow};
use crate::services::meeting_service::{MeetingChanges, MeetingService, NewMeeting};
use crate::utils::Claims;

#[derive(Deserialize, ToSchema)]
pub struct CreateMeetingRequest {
    mentor_id: String,
    mentee_id: String,
    title: String,
    description: Option<String>,
    /// RFC 3339 timestamp
    start_time: String,
    end_time: String,
    meeting_link: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateMeetingRequest {
    title: Option<String>,
    description: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    meeting_link: Option<String>,
    status: Option<MeetingStatus>,
}

async fn list_window(
    meetings: &MeetingService,
    claims: &Claims,
    window: MeetingWindow,
) -> Result<Json<Vec<MeetingResponse>>, AppError> {
    let found = meetings.list(claims, window).await?;
    Ok(Json(found.into_iter().map(MeetingResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/meetings",
    request_body = CreateMeetingRequest,
    responses(
        (status = 201, description = "Meeting scheduled", body = MeetingResponse),
        (status = 400, description = "Invalid times or missing title"),
        (status = 403, description = "Caller is not a participant")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_meeting(
    State(meetings): State<Arc<MeetingService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<MeetingResponse>), AppError> {
    let input = NewMeeting {
        mentor_id: ids::parse(&req.mentor_id, "mentor")?,
        mentee_id: ids::parse(&req.mentee_id, "mentee")?,
        title: req.title,
        description: req.description,
        start_time: req.start_time,
        end_time: req.end_time,
        meeting_link: req.meeting_link,
    };
    let meeting = meetings.schedule(&claims, input).await?;
    Ok((StatusCode::CREATED, Json(meeting.into())))
}

#[utoipa::path(
    get,
    path = "/api/meetings",
    responses((status = 200, description = "All of the caller's meetings", body = [MeetingResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_meetings(
    State(meetings): State<Arc<MeetingService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<Vec<MeetingResponse>>, AppError> {
    list_window(&meetings, &claims, MeetingWindow::All).await
}

#[utoipa::path(
    get,
    path = "/api/meetings/upcoming",
    responses((status = 200, description = "Scheduled meetings that have not started", body = [MeetingResponse])),
    security(("bearer_auth" = []))
)]
pub async fn upcoming_meetings(
    State(meetings): State<Arc<MeetingService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<Vec<MeetingResponse>>, AppError> {
    list_window(&meetings, &claims, MeetingWindow::Upcoming).await
}

#[utoipa::path(
    get,
    path = "/api/meetings/past",
    responses((status = 200, description = "Meetings that have ended, newest first", body = [MeetingResponse])),
    security(("bearer_auth" = []))
)]
pub async fn past_meetings(
    State(meetings): State<Arc<MeetingService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<Vec<MeetingResponse>>, AppError> {
    list_window(&meetings, &claims, MeetingWindow::Past).await
}

#[utoipa::path(
    get,
    path = "/api/meetings/current",
    responses((status = 200, description = "Meetings in progress right now", body = [MeetingResponse])),
    security(("bearer_auth" = []))
)]
pub async fn current_meetings(
    State(meetings): State<Arc<MeetingService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<Vec<MeetingResponse>>, AppError> {
    list_window(&meetings, &claims, MeetingWindow::Current).await
}

#[utoipa::path(
    get,
    path = "/api/meetings/{id}",
    params(("id" = String, Path, description = "Meeting ID")),
    responses(
        (status = 200, description = "Meeting found", body = MeetingResponse),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Meeting not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_meeting(
    State(meetings): State<Arc<MeetingService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(id): Path<String>,
) -> Result<Json<MeetingResponse>, AppError> {
    let meeting = meetings.get(&claims, ids::parse(&id, "meeting")?).await?;
    Ok(Json(meeting.into()))
}

#[utoipa::path(
    put,
    path = "/api/meetings/{id}",
    params(("id" = String, Path, description = "Meeting ID")),
    request_body = UpdateMeetingRequest,
    responses(
        (status = 200, description = "Meeting updated", body = MeetingResponse),
        (status = 400, description = "Invalid times"),
        (status = 404, description = "Meeting not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_meeting(
    State(meetings): State<Arc<MeetingService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateMeetingRequest>,
) -> Result<Json<MeetingResponse>, AppError> {
    let changes = MeetingChanges {
        title: req.title,
        description: req.description,
        start_time: req.start_time,
        end_time: req.end_time,
        meeting_link: req.meeting_link,
        status: req.status,
    };
    let meeting = meetings.update(&claims, ids::parse(&id, "meeting")?, changes).await?;
    Ok(Json(meeting.into()))
}

#[utoipa::path(
    delete,
    path = "/api/meetings/{id}",
    params(("id" = String, Path, description = "Meeting ID")),
    responses(
        (status = 200, description = "Meeting cancelled"),
        (status = 404, description = "Meeting not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn cancel_meeting(
    State(meetings): State<Arc<MeetingService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    meetings.cancel(&claims, ids::parse(&id, "meeting")?).await?;
    Ok(Json(serde_json::json!({ "message": "Meeting cancelled" })))
}

pub fn meeting_routes(meeting_service: Arc<MeetingService>, config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(list_meetings).post(create_meeting))
        .route("/upcoming", get(upcoming_meetings))
        .route("/past", get(past_meetings))
        .route("/current", get(current_meetings))
        .route("/{id}", get(get_meeting).put(update_meeting).delete(cancel_meeting))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(meeting_service)
}
