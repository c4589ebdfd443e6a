use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::utils::{validate_jwt, AUTH_COOKIE};

/// Middleware for `middleware::from_fn_with_state`.
/// - Takes the token from the `auth_token` cookie, else from `Authorization: Bearer <token>`.
/// - Validates it and inserts `Arc<Claims>` into request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<Config>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match jar.get(AUTH_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string)
            .ok_or_else(|| AppError::Unauthorized("Authorization token is missing".to_string()))?,
    };

    let claims = validate_jwt(&token, &config.jwt_secret)
        .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

    req.extensions_mut().insert(Arc::new(claims));
    Ok(next.run(req).await)
}
