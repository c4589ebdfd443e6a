use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::Config;
use crate::errors::AppError;
use crate::middleware::auth::auth_middleware;
use crate::models::ids;
use crate::models::message::{MessagePage, MessageResponse};
use crate::services::chat_service::ChatService;
use crate::utils::Claims;

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    receiver_id: String,
    content: String,
}

#[utoipa::path(
    post,
    path = "/api/chat/send",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = MessageResponse),
        (status = 400, description = "Empty message"),
        (status = 404, description = "Receiver not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_message(
    State(chat): State<Arc<ChatService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let receiver_id = ids::parse(&req.receiver_id, "receiver")?;
    let message = chat.send(&claims, receiver_id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/api/chat/get/{other_id}/{page}",
    params(
        ("other_id" = String, Path, description = "The other participant's ID"),
        ("page" = u64, Path, description = "1-based page, newest first")
    ),
    responses((status = 200, description = "One page of the conversation", body = MessagePage)),
    security(("bearer_auth" = []))
)]
pub async fn get_page(
    State(chat): State<Arc<ChatService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Path((other_id, page)): Path<(String, u64)>,
) -> Result<Json<MessagePage>, AppError> {
    let other_id = ids::parse(&other_id, "user")?;
    let page = chat.page(claims.object_id()?, other_id, page).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/chat/history/{other_id}",
    params(("other_id" = String, Path, description = "The other participant's ID")),
    responses((status = 200, description = "Whole conversation, oldest first", body = [MessageResponse])),
    security(("bearer_auth" = []))
)]
pub async fn get_history(
    State(chat): State<Arc<ChatService>>,
    Extension(claims): Extension<Arc<Claims>>,
    Path(other_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let other_id = ids::parse(&other_id, "user")?;
    Ok(Json(chat.history(claims.object_id()?, other_id).await?))
}

pub fn chat_routes(chat_service: Arc<ChatService>, config: Arc<Config>) -> Router {
    Router::new()
        .route("/send", post(send_message))
        .route("/get/{other_id}/{page}", get(get_page))
        .route("/history/{other_id}", get(get_history))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(chat_service)
}
