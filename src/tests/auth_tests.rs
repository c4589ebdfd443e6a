#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{self, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{models::user::Role, services::user_service::LoginResponse, utils::generate_jwt};

    use super::super::common::{create_test_user, json_body, offline_app, setup, TEST_SECRET};

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(http::Method::POST)
            .uri(uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(json_body(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_check_is_open() {
        let app = offline_app().await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        for uri in ["/api/auth/profile", "/api/roadmaps", "/api/dashboard", "/api/notifications/count"] {
            let app = offline_app().await;
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn forged_tokens_are_rejected() {
        let app = offline_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/profile")
                    .header(http::header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn interview_turn_needs_an_interview_number() {
        let app = offline_app().await;
        let token = generate_jwt("64b7f0c2a1b2c3d4e5f60718", "ada@example.com", "ada", Role::Mentee, TEST_SECRET).unwrap();
        let boundary = "turn-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"roadmap_id\"\r\n\r\n\
             64b7f0c2a1b2c3d4e5f60719\r\n--{boundary}--\r\n"
        );

        let response = app
            .oneshot(
                Request::builder()
                    .method(http::Method::POST)
                    .uri("/api/ai/interview")
                    .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(http::header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["message"], "interview_num is required");
    }

    #[tokio::test]
    #[ignore = "needs MONGODB_TEST_URI"]
    async fn register_sets_cookie_and_returns_token() {
        let ctx = setup().await;
        let request = json!({
            "name": "Ada",
            "username": "ada",
            "email": "ada@example.com",
            "password": "password123",
            "role": "mentee",
            "profile": { "goals": ["Learn Rust"] }
        });

        let response = ctx.app.oneshot(post_json("/api/auth/register", &request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = response.headers().get(http::header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("auth_token="));
        assert!(cookie.contains("HttpOnly"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let registered: LoginResponse = serde_json::from_slice(&body).unwrap();
        assert!(registered.token.is_some());
        assert_eq!(registered.user.unwrap().username, "ada");
    }

    #[tokio::test]
    #[ignore = "needs MONGODB_TEST_URI"]
    async fn duplicate_email_conflicts() {
        let ctx = setup().await;
        create_test_user(&ctx.users, Role::Mentor, "grace").await;
        let request = json!({
            "name": "Other",
            "username": "someone_else",
            "email": "grace@example.com",
            "password": "password123",
            "role": "mentor"
        });

        let response = ctx.app.oneshot(post_json("/api/auth/register", &request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    #[ignore = "needs MONGODB_TEST_URI"]
    async fn login_checks_password_and_role() {
        let ctx = setup().await;
        create_test_user(&ctx.users, Role::Mentee, "linus").await;

        let ok = json!({ "email": "linus@example.com", "password": "password123", "role": "mentee" });
        let response = ctx.app.clone().oneshot(post_json("/api/auth/login", &ok)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let login: LoginResponse = serde_json::from_slice(&body).unwrap();
        assert!(login.token.is_some());

        let wrong_password = json!({ "email": "linus@example.com", "password": "nope", "role": "mentee" });
        let response = ctx.app.clone().oneshot(post_json("/api/auth/login", &wrong_password)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let wrong_role = json!({ "email": "linus@example.com", "password": "password123", "role": "mentor" });
        let response = ctx.app.oneshot(post_json("/api/auth/login", &wrong_role)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[ignore = "needs MONGODB_TEST_URI"]
    async fn profile_uses_the_bearer_token() {
        let ctx = setup().await;
        let user = create_test_user(&ctx.users, Role::Mentor, "barbara").await;

        let response = ctx
            .app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/profile")
                    .header(http::header::AUTHORIZATION, format!("Bearer {}", user.token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let profile: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(profile["username"], "barbara");
        assert!(profile.get("authentication").is_none());
    }
}
