use axum::{
    extract::{Path, State},
    http::StatusCode,
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
use crate::models::user::{Role, UserResponse};
use crate::services::user_service::UserService;
use crate::utils::Claims;

#[derive(Deserialize, ToSchema)]
pub struct ConnectRequest {
    target_id: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ConnectResponse {
    pub message: String,
    pub request_id: String,
}

#[utoipa::path(
    get,
    path = "/api/users/mentors",
    responses((status = 200, description = "All mentors", body = [UserResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_mentors(State(user_service): State<Arc<UserService>>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let mentors = user_service.list_by_role(Role::Mentor).await?;
    Ok(Json(mentors.into_iter().map(UserResponse::public).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/mentor/{id}",
    params(("id" = String, Path, description = "Mentor ID")),
    responses(
        (status = 200, description = "Mentor found", body = UserResponse),
        (status = 404, description = "Mentor not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_mentor(
    State(user_service): State<Arc<UserService>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let mentor = user_service.get_with_role(ids::parse(&id, "mentor")?, Role::Mentor).await?;
    Ok(Json(UserResponse::public(mentor)))
}

#[utoipa::path(
    get,
    path = "/api/users/mentees",
    responses(
        (status = 200, description = "The caller's mentees", body = [UserResponse]),
        (status = 403, description = "Mentor access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_mentees(
    State(user_service): State<Arc<UserService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    claims.require_role(Role::Mentor)?;
    let mentees = user_service.mentees_of(claims.object_id()?).await?;
    Ok(Json(mentees.into_iter().map(UserResponse::public).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/mentees/{id}",
    params(("id" = String, Path, description = "Mentee ID")),
    responses(
        (status = 200, description = "Mentee found", body = UserResponse),
        (status = 404, description = "Mentee not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_mentee(
    State(user_service): State<Arc<UserService>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let mentee = user_service.get_with_role(ids::parse(&id, "mentee")?, Role::Mentee).await?;
    Ok(Json(UserResponse::public(mentee)))
}

#[utoipa::path(
    get,
    path = "/api/users/mymentor",
    responses(
        (status = 200, description = "The caller's mentor", body = UserResponse),
        (status = 404, description = "No mentor connected yet")
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_mentor(
    State(user_service): State<Arc<UserService>>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<UserResponse>, AppError> {
    claims.require_role(Role::Mentee)?;
    let mentor = user_service.my_mentor(claims.object_id()?).await?;
    Ok(Json(UserResponse::public(mentor)))
}

#[utoipa::path(
    post,
    path = "/api/users/connect",
    request_body = ConnectRequest,
    responses(
        (status = 201, description = "Connection request sent", body = ConnectResponse),
        (status = 404, description = "Target not found"),
        (status = 409, description = "Already connected")
    ),
    security(("bearer_auth" = []))
)]
pub async fn request_connection(
    State(user_service): State<Arc<UserService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Json(req): Json<ConnectRequest>,
) -> Result<(StatusCode, Json<ConnectResponse>), AppError> {
    let target_id = ids::parse(&req.target_id, "user")?;
    let request_id = user_service.request_connection(&claims, target_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ConnectResponse { message: "Connection request sent".to_string(), request_id: request_id.to_hex() }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/users/connect/{request_id}/accept",
    params(("request_id" = String, Path, description = "Connection request (notification) ID")),
    responses(
        (status = 200, description = "Users linked"),
        (status = 403, description = "Not the recipient of this request")
    ),
    security(("bearer_auth" = []))
)]
pub async fn accept_connection(
    State(user_service): State<Arc<UserService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(request_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let request_id = ids::parse(&request_id, "request")?;
    user_service.respond_connection(&claims, request_id, true).await?;
    Ok(Json(serde_json::json!({ "message": "Connection accepted" })))
}

#[utoipa::path(
    post,
    path = "/api/users/connect/{request_id}/reject",
    params(("request_id" = String, Path, description = "Connection request (notification) ID")),
    responses(
        (status = 200, description = "Request rejected"),
        (status = 403, description = "Not the recipient of this request")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_connection(
    State(user_service): State<Arc<UserService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(request_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let request_id = ids::parse(&request_id, "request")?;
    user_service.respond_connection(&claims, request_id, false).await?;
    Ok(Json(serde_json::json!({ "message": "Connection rejected" })))
}

pub fn user_routes(user_service: Arc<UserService>, config: Arc<Config>) -> Router {
    Router::new()
        .route("/mentors", get(list_mentors))
        .route("/mentor/{id}", get(get_mentor))
        .route("/mentees", get(my_mentees))
        .route("/mentees/{id}", get(get_mentee))
        .route("/mymentor", get(my_mentor))
        .route("/connect", post(request_connection))
        .route("/connect/{request_id}/accept", post(accept_connection))
        .route("/connect/{request_id}/reject", post(reject_connection))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(user_service)
}
