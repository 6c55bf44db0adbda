use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use hobbylist::config::Config;
use hobbylist::services::{EmailMessage, Mailer};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn last(&self) -> EmailMessage {
        self.sent.lock().unwrap().last().cloned().expect("an email was sent")
    }

    fn last_token(&self) -> String {
        let html = self.last().html;
        html.split("token=")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

async fn spawn_app() -> (Router, Arc<RecordingMailer>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let mailer = Arc::new(RecordingMailer::default());
    let state = hobbylist::api::create_app_state_with_mailer(config, Some(mailer.clone()))
        .await
        .expect("Failed to create app state");

    (hobbylist::api::router(state), mailer)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str, bearer: Option<&str>) -> Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn credentials(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

#[tokio::test]
async fn test_signup_verify_login_me() {
    let (app, mailer) = spawn_app().await;

    let response = post_json(
        &app,
        "/api/auth/signup",
        credentials("Alice@Example.com", "password123"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User registered successfully");

    assert_eq!(mailer.count(), 1);
    let email = mailer.last();
    assert_eq!(email.to, vec!["alice@example.com".to_string()]);
    assert_eq!(email.subject, "Verify your email");
    assert!(
        email
            .html
            .contains("http://localhost:3000/verification?token=")
    );

    // Not active yet
    let response = post_json(
        &app,
        "/api/auth/login",
        credentials("alice@example.com", "password123"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Account not activated");

    let token = mailer.last_token();
    let response = get(&app, &format!("/api/auth/verify?token={token}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Account verified successfully"
    );

    // Tokens are single use
    let response = get(&app, &format!("/api/auth/verify?token={token}"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid verification token"
    );

    let response = post_json(
        &app,
        "/api/auth/login",
        credentials("alice@example.com", "password123"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body.get("data").is_none());
    let jwt = body["token"].as_str().unwrap().to_string();

    let response = get(&app, "/api/auth/me", Some(&jwt)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["role"], "ROLE_USER");
    assert_eq!(body["active"], true);
}

#[tokio::test]
async fn test_me_requires_bearer() {
    let (app, _) = spawn_app().await;

    let response = get(&app, "/api/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(&app, "/api/auth/me", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_existing_accounts() {
    let (app, mailer) = spawn_app().await;

    let response = post_json(
        &app,
        "/api/auth/signup",
        credentials("bob@example.com", "password123"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Inactive account gets a fresh verification email
    let response = post_json(
        &app,
        "/api/auth/signup",
        credentials("bob@example.com", "password123"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Verification email resent"
    );
    assert_eq!(mailer.count(), 2);

    let token = mailer.last_token();
    let response = get(&app, &format!("/api/auth/verify?token={token}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        &app,
        "/api/auth/signup",
        credentials("bob@example.com", "password123"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Email in use");
    assert_eq!(mailer.count(), 2);
}

#[tokio::test]
async fn test_signup_validation() {
    let (app, mailer) = spawn_app().await;

    let response = post_json(
        &app,
        "/api/auth/signup",
        credentials("not-an-email", "password123"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);

    let response = post_json(
        &app,
        "/api/auth/signup",
        credentials("short@example.com", "abc"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(mailer.count(), 0);
}

#[tokio::test]
async fn test_login_rejections() {
    let (app, _) = spawn_app().await;

    let response = post_json(
        &app,
        "/api/auth/login",
        credentials("nobody@example.com", "password123"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid email or password"
    );

    let response = post_json(
        &app,
        "/api/auth/login",
        credentials("nobody@example.com", ""),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_unknown_token() {
    let (app, _) = spawn_app().await;

    let response = get(
        &app,
        "/api/auth/verify?token=00000000-0000-4000-8000-000000000000",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid verification token"
    );

    let response = get(&app, "/api/auth/verify?token=", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/api/auth/verify", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid verification token"
    );
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let (app, mailer) = spawn_app().await;

    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "nobody@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);

    assert_eq!(mailer.count(), 0);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let (app, mailer) = spawn_app().await;

    post_json(
        &app,
        "/api/auth/signup",
        credentials("carol@example.com", "password123"),
    )
    .await;
    let token = mailer.last_token();
    get(&app, &format!("/api/auth/verify?token={token}"), None).await;

    // Unknown address gets the same answer and no email
    let response = post_json(
        &app,
        "/api/auth/forgot-password",
        json!({ "email": "ghost@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let unknown_message = body_json(response).await["message"].clone();
    assert_eq!(mailer.count(), 1);

    let response = post_json(
        &app,
        "/api/auth/forgot-password",
        json!({ "email": "carol@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], unknown_message);
    assert_eq!(mailer.count(), 2);

    let email = mailer.last();
    assert_eq!(email.subject, "Reset your password");
    assert!(
        email
            .html
            .contains("http://localhost:3000/reset-password?token=")
    );
    let reset_token = mailer.last_token();

    // A reset token cannot activate or verify anything
    let response = get(&app, &format!("/api/auth/verify?token={reset_token}"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/api/auth/reset-password",
        json!({ "token": reset_token, "password": "newpassword456" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Password reset successfully"
    );

    let response = post_json(
        &app,
        "/api/auth/reset-password",
        json!({ "token": reset_token, "password": "anotherpass789" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid reset token");

    let response = post_json(
        &app,
        "/api/auth/login",
        credentials("carol@example.com", "password123"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/api/auth/login",
        credentials("carol@example.com", "newpassword456"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_headers() {
    let (app, _) = spawn_app().await;

    let response = get(&app, "/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().contains_key("x-request-id"));

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
