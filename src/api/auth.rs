use axum::{
    Extension, Json,
    extract::{Query, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::extract::ApiJson;
use super::validation::validate_token_param;
use super::{
    ApiError, ApiResponse, AppState, CredentialsRequest, ForgotPasswordRequest, LoginResponse,
    MessageResponse, ResetPasswordRequest, TokenQuery,
};
use crate::domain::UserId;
use crate::services::{Claims, SignupOutcome, UserInfo};

const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

// ============================================================================
// Middleware
// ============================================================================

/// Requires `Authorization: Bearer <jwt>` and exposes the claims to handlers.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = state
        .auth_service()
        .authenticate(&token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    tracing::Span::current().record("user_id", claims.sub.as_str());
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get("Authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let outcome = state
        .auth_service()
        .signup(&payload.email, &payload.password)
        .await?;

    let message = match outcome {
        SignupOutcome::Registered => "User registered successfully",
        SignupOutcome::VerificationResent => "Verification email resent",
    };

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}

/// POST /auth/login
/// Returns a signed bearer token for an active account
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let result = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token: result.token,
    })))
}

/// GET /auth/verify?token=
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let token = validate_token_param(&query.token, "Invalid verification token")?;

    state.auth_service().verify_email(token).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Account verified successfully",
    ))))
}

/// POST /auth/forgot-password
/// Answers identically whether or not the account exists
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .request_password_reset(&payload.email)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        RESET_REQUESTED_MESSAGE,
    ))))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let token = validate_token_param(&payload.token, "Invalid reset token")?;

    state
        .auth_service()
        .reset_password(token, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password reset successfully",
    ))))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let id: i32 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?;

    let info = state.auth_service().get_user_info(UserId::new(id)).await?;
    Ok(Json(ApiResponse::success(info)))
}
