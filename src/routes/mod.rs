use axum::{routing::get, Router};
use mongodb::Database;
use std::{path::Path, sync::Arc};
use tower_http::services::ServeFile;

use crate::config::Config;
use crate::services::{
    assessment_service::AssessmentService, chat_service::ChatService, dashboard_service::DashboardService,
    interview_service::{InterviewService, AUDIO_FILE}, meeting_service::MeetingService,
    notification_service::NotificationService, roadmap_builder::RoadmapBuilder, roadmap_service::RoadmapService,
    user_service::UserService, AiClients,
};

pub mod ai;
pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod interview;
pub mod meeting;
pub mod notification;
pub mod roadmap;
pub mod user;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check OK")
    )
)]
pub async fn health_check() -> &'static str {
    "OK"
}

pub fn init_routes(db: Arc<Database>, config: Arc<Config>, clients: AiClients) -> Router {
    let notification_service = Arc::new(NotificationService::new(db.clone()));
    let user_service = Arc::new(UserService::new(db.clone(), notification_service.clone()));
    let roadmap_service = Arc::new(RoadmapService::new(
        db.clone(),
        user_service.clone(),
        notification_service.clone(),
        RoadmapBuilder::new(&clients),
    ));
    let assessment_service = Arc::new(AssessmentService::new(roadmap_service.clone()));
    let interview_service = Arc::new(InterviewService::new(
        roadmap_service.clone(),
        clients.clone(),
        config.audio_dir.clone(),
    ));
    let chat_service = Arc::new(ChatService::new(db.clone(), user_service.clone(), notification_service.clone()));
    let meeting_service = Arc::new(MeetingService::new(db, user_service.clone(), notification_service.clone()));
    let dashboard_service = Arc::new(DashboardService::new(user_service.clone(), roadmap_service.clone()));

    let speech = ServeFile::new(Path::new(&config.audio_dir).join(AUDIO_FILE));

    Router::new()
        .route("/health", get(health_check))
        .route_service(&format!("/{AUDIO_FILE}"), speech)
        .nest("/api/auth", auth::auth_routes(user_service.clone(), config.clone()))
        .nest("/api/users", user::user_routes(user_service.clone(), config.clone()))
        .nest(
            "/api/roadmaps",
            roadmap::roadmap_routes(roadmap_service.clone(), assessment_service, config.clone()),
        )
        .nest(
            "/api/ai",
            ai::ai_routes(roadmap_service.clone(), user_service, interview_service, clients, config.clone()),
        )
        .nest("/api/interviews", interview::interview_routes(roadmap_service, config.clone()))
        .nest("/api/chat", chat::chat_routes(chat_service, config.clone()))
        .nest("/api/meetings", meeting::meeting_routes(meeting_service, config.clone()))
        .nest(
            "/api/notifications",
            notification::notification_routes(notification_service, config.clone()),
        )
        .nest("/api/dashboard", dashboard::dashboard_routes(dashboard_service, config))
}
