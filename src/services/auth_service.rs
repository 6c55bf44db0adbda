//! Domain service for account lifecycle.
//!
//! Handles signup, login, email verification and password reset.

use serde::Serialize;
use thiserror::Error;

use crate::domain::UserId;
use crate::services::jwt::Claims;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account not activated")]
    AccountNotActivated,

    #[error("Email in use")]
    EmailInUse,

    #[error("Invalid verification token")]
    InvalidVerificationToken,

    #[error("Invalid reset token")]
    InvalidResetToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Account already verified")]
    AlreadyVerified,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// What a signup request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupOutcome {
    /// A new inactive account was created and a verification email issued.
    Registered,
    /// The address belonged to an unverified account; a new link was issued.
    VerificationResent,
}

/// Login result carrying the bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
}

/// User info DTO for responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub email: String,
    pub role: String,
    pub active: bool,
    pub created_at: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Registers an account, or re-issues verification for an unverified one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailInUse`] if an active account owns the address.
    async fn signup(&self, email: &str, password: &str) -> Result<SignupOutcome, AuthError>;

    /// Verifies credentials and returns a signed login token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccountNotActivated`] for unverified accounts and
    /// [`AuthError::InvalidCredentials`] for unknown emails or wrong passwords.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Redeems an email verification token, activating its owner.
    async fn verify_email(&self, token: &str) -> Result<(), AuthError>;

    /// Issues a password reset token if the account exists. Succeeds either way.
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Redeems a password reset token, replacing the owner's password.
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError>;

    /// Issues a new verification token for an unverified account.
    async fn resend_verification(&self, email: &str) -> Result<(), AuthError>;

    /// Validates a bearer token.
    fn authenticate(&self, bearer: &str) -> Result<Claims, AuthError>;

    /// Gets information for a specific user.
    async fn get_user_info(&self, id: UserId) -> Result<UserInfo, AuthError>;
}
