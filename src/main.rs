use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::{
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
        SecurityRequirement,
    },
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::Config, routes::init_routes, services::AiClients};

mod config;
mod db;
mod errors;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health_check,
        routes::auth::register,
        routes::auth::login,
        routes::auth::logout,
        routes::auth::profile,
        routes::auth::update_profile,
        routes::user::list_mentors,
        routes::user::get_mentor,
        routes::user::my_mentees,
        routes::user::get_mentee,
        routes::user::my_mentor,
        routes::user::request_connection,
        routes::user::accept_connection,
        routes::user::reject_connection,
        routes::roadmap::list_roadmaps,
        routes::roadmap::get_roadmap,
        routes::roadmap::get_progress,
        routes::roadmap::set_status,
        routes::roadmap::set_approval,
        routes::roadmap::leave_feedback,
        routes::roadmap::complete_module,
        routes::roadmap::complete_subtopics,
        routes::roadmap::complete_resources,
        routes::roadmap::toggle_resource,
        routes::roadmap::get_assessment,
        routes::roadmap::submit_assessment,
        routes::ai::generate_roadmap,
        routes::ai::match_mentor,
        routes::ai::interview_turn,
        routes::interview::set_theme,
        routes::interview::get_theme,
        routes::chat::send_message,
        routes::chat::get_page,
        routes::chat::get_history,
        routes::meeting::create_meeting,
        routes::meeting::list_meetings,
        routes::meeting::upcoming_meetings,
        routes::meeting::past_meetings,
        routes::meeting::current_meetings,
        routes::meeting::get_meeting,
        routes::meeting::update_meeting,
        routes::meeting::cancel_meeting,
        routes::notification::list_notifications,
        routes::notification::unread_notifications,
        routes::notification::unread_count,
        routes::notification::mark_read,
        routes::notification::mark_all_read,
        routes::dashboard::dashboard,
    ),
    components(
        schemas(
            errors::ErrorBody,
            routes::auth::RegisterRequest,
            routes::auth::LoginRequest,
            routes::auth::UpdateProfileRequest,
            services::user_service::LoginResponse,
            services::user_service::MentorMatch,
            models::user::UserResponse,
            models::user::Role,
            models::user::Profile,
            models::user::MentorProfile,
            models::user::MenteeProfile,
            models::user::ProfileInput,
            routes::user::ConnectRequest,
            routes::user::ConnectResponse,
            routes::roadmap::StatusRequest,
            routes::roadmap::ApprovalRequest,
            routes::roadmap::CompleteSubtopicsRequest,
            routes::roadmap::CompleteResourcesRequest,
            routes::roadmap::ToggleResourceRequest,
            routes::roadmap::SubmitAssessmentRequest,
            routes::roadmap::FeedbackRequest,
            models::roadmap::RoadmapResponse,
            models::roadmap::ModuleResponse,
            models::roadmap::AssessmentQuestion,
            models::roadmap::Subtopic,
            models::roadmap::Resource,
            models::roadmap::RoadmapStatus,
            models::roadmap::ApprovalState,
            models::roadmap::ApprovalStatus,
            models::roadmap::InterviewTrigger,
            models::roadmap::FeedbackResponse,
            models::roadmap::FeedbackEntryResponse,
            models::roadmap::FeedbackDirection,
            models::roadmap::Progress,
            services::roadmap_service::GenerateOutcome,
            services::roadmap_service::ProgressUpdate,
            services::assessment_service::AssessmentView,
            services::assessment_service::SubmissionResult,
            routes::ai::GenerateRoadmapRequest,
            routes::ai::InterviewTurnMultipart,
            services::interview_service::Exchange,
            services::interview_service::InterviewTurn,
            routes::interview::SetThemeRequest,
            routes::interview::InterviewThemeResponse,
            routes::chat::SendMessageRequest,
            models::message::MessageResponse,
            models::message::MessagePage,
            routes::meeting::CreateMeetingRequest,
            routes::meeting::UpdateMeetingRequest,
            models::meeting::MeetingResponse,
            models::meeting::MeetingStatus,
            routes::notification::UnreadCount,
            models::notification::NotificationResponse,
            models::notification::NotificationKind,
            models::notification::RequestStatus,
            services::dashboard_service::Dashboard,
            services::dashboard_service::RoadmapSummary,
        ),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

/// Injects the `bearer_auth` scheme and makes it a global requirement.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let comps = openapi.components.get_or_insert_with(Default::default);
        comps.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );

        let requirement = SecurityRequirement::new::<String, Vec<String>, String>(
            "bearer_auth".to_string(),
            Vec::<String>::new(),
        );
        openapi.security = Some(vec![requirement]);
    }
}

#[shuttle_runtime::main]
async fn main(
    #[shuttle_runtime::Secrets] secrets: shuttle_runtime::SecretStore,
) -> shuttle_axum::ShuttleAxum {
    dotenv::dotenv().ok();

    let config = Config::from_secrets(&secrets).map_err(|e| shuttle_runtime::Error::Custom(e.into()))?;

    let db = db::init_db(&config.mongodb_uri, &config.database_name)
        .await
        .map_err(|e| shuttle_runtime::Error::Custom(e.into()))?;
    db::ensure_indexes(&db)
        .await
        .map_err(|e| shuttle_runtime::Error::Custom(e.into()))?;
    tracing::info!(database = %config.database_name, "connected to MongoDB");

    let clients = AiClients::from_config(&config);

    let app = Router::new()
        .merge(init_routes(Arc::new(db), Arc::new(config), clients))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Ok(app.into())
}

#[cfg(test)]
mod tests;
