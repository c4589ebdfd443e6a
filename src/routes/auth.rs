use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::Config;
use crate::errors::AppError;
use crate::middleware::auth::auth_middleware;
use crate::models::user::{ProfileInput, Role, User, UserResponse};
use crate::services::user_service::{LoginResponse, NewUser, UserService};
use crate::utils::{generate_jwt, Claims, AUTH_COOKIE, TOKEN_TTL_HOURS};

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    name: String,
    username: String,
    email: String,
    password: String,
    /// "mentor" or "mentee"
    role: String,
    #[serde(default)]
    profile: Option<ProfileInput>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    email: String,
    password: String,
    role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    name: Option<String>,
    #[serde(flatten)]
    profile: ProfileInput,
}

type AuthState = (Arc<UserService>, Arc<Config>);

fn parse_role(raw: &str) -> Result<Role, AppError> {
    Role::parse(raw.trim()).ok_or_else(|| AppError::BadRequest("role must be mentor or mentee".to_string()))
}

fn session(user: &User, config: &Config) -> Result<(String, Cookie<'static>), AppError> {
    let user_id = user
        .id
        .map(|oid| oid.to_hex())
        .ok_or_else(|| AppError::Internal("user without id".to_string()))?;
    let token = generate_jwt(&user_id, &user.email, &user.username, user.role, &config.jwt_secret)?;
    let cookie = Cookie::build((AUTH_COOKIE, token.clone()))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::hours(TOKEN_TTL_HOURS))
        .build();
    Ok((token, cookie))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = LoginResponse),
        (status = 400, description = "Missing fields or invalid role"),
        (status = 409, description = "Email or username already in use")
    )
)]
pub async fn register(
    State((user_service, config)): State<AuthState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<LoginResponse>), AppError> {
    let role = parse_role(&req.role)?;
    let user = user_service
        .register(NewUser {
            name: req.name,
            username: req.username,
            email: req.email,
            password: req.password,
            role,
            profile: req.profile.unwrap_or_default(),
        })
        .await?;

    let (token, cookie) = session(&user, &config)?;
    let body = LoginResponse {
        message: "Registration successful".to_string(),
        token: Some(token),
        user: Some(user.into()),
    };
    Ok((StatusCode::CREATED, jar.add(cookie), Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or wrong role")
    )
)]
pub async fn login(
    State((user_service, config)): State<AuthState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let role = parse_role(&req.role)?;
    let user = user_service.login(&req.email, &req.password, role).await?;

    let (token, cookie) = session(&user, &config)?;
    let body = LoginResponse {
        message: "Login successful".to_string(),
        token: Some(token),
        user: Some(user.into()),
    };
    Ok((jar.add(cookie), Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session cookie cleared"))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    (jar, Json(serde_json::json!({ "message": "Logged out" })))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn profile(
    State((user_service, _config)): State<AuthState>,
    Extension(claims): Extension<Arc<Claims>>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user_service.get_user(claims.object_id()?).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    post,
    path = "/api/auth/profile/update",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State((user_service, _config)): State<AuthState>,
    Extension(claims): Extension<Arc<Claims>>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user_service
        .update_profile(claims.object_id()?, req.name, req.profile)
        .await?;
    Ok(Json(user.into()))
}

pub fn auth_routes(user_service: Arc<UserService>, config: Arc<Config>) -> Router {
    let protected = Router::new()
        .route("/profile", get(profile))
        .route("/profile/update", post(update_profile))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
        .with_state((user_service, config))
}
