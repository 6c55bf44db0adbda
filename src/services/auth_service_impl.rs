//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::task;
use tracing::{debug, info};

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::user::hash_password;
use crate::domain::{TokenPurpose, UserId};
use crate::services::auth_service::{
    AuthError, AuthService, LoginResult, SignupOutcome, UserInfo,
};
use crate::services::jwt::{Claims, JwtService};
use crate::services::verification::VerificationService;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Trims and lowercases an address after checking its shape.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AuthError::Validation("Email is required".to_string()));
    }
    if email.len() > 254 || !EMAIL_RE.is_match(&email) {
        return Err(AuthError::Validation("Email address is invalid".to_string()));
    }
    Ok(email)
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), AuthError> {
    if password.chars().count() < min_length {
        return Err(AuthError::Validation(format!(
            "Password must be at least {min_length} characters"
        )));
    }
    Ok(())
}

pub struct SeaOrmAuthService {
    store: Store,
    verification: Arc<VerificationService>,
    jwt: JwtService,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(
        store: Store,
        verification: Arc<VerificationService>,
        jwt: JwtService,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            verification,
            jwt,
            security,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(&self, email: &str, password: &str) -> Result<SignupOutcome, AuthError> {
        let email = normalize_email(email)?;
        validate_password(password, self.security.min_password_length)?;

        if let Some(existing) = self.store.get_user_by_email(&email).await? {
            if existing.active {
                return Err(AuthError::EmailInUse);
            }

            self.verification
                .issue(&existing, TokenPurpose::EmailVerification)
                .await?;
            info!(user_id = %existing.id, "Resent verification for unverified account");
            return Ok(SignupOutcome::VerificationResent);
        }

        let user = self
            .store
            .create_user(&email, password, &self.security)
            .await?;

        self.verification
            .issue(&user, TokenPurpose::EmailVerification)
            .await?;

        info!(user_id = %user.id, "Registered new account");
        Ok(SignupOutcome::Registered)
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let Ok(email) = normalize_email(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        let (user, is_valid) = self
            .store
            .check_user_credentials(&email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.active {
            return Err(AuthError::AccountNotActivated);
        }

        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.jwt.create_token(&user)?;
        Ok(LoginResult { token })
    }

    async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let found = self
            .verification
            .find(token, TokenPurpose::EmailVerification)
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;

        if !self.store.redeem_email_verification(&found).await? {
            return Err(AuthError::InvalidVerificationToken);
        }

        info!(user_id = %found.user_id, "Account verified");
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email)?;

        match self.store.get_user_by_email(&email).await? {
            Some(user) => {
                self.verification
                    .issue(&user, TokenPurpose::PasswordReset)
                    .await?;
            }
            None => debug!("Password reset requested for unknown address"),
        }

        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password, self.security.min_password_length)?;

        let found = self
            .verification
            .find(token, TokenPurpose::PasswordReset)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let password = new_password.to_string();
        let security = self.security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task panicked: {e}")))??;

        if !self
            .store
            .redeem_password_reset(&found, &password_hash)
            .await?
        {
            return Err(AuthError::InvalidResetToken);
        }

        info!(user_id = %found.user_id, "Password reset completed");
        Ok(())
    }

    async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email)?;
        let user = self
            .store
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.active {
            return Err(AuthError::AlreadyVerified);
        }

        self.verification
            .issue(&user, TokenPurpose::EmailVerification)
            .await?;
        Ok(())
    }

    fn authenticate(&self, bearer: &str) -> Result<Claims, AuthError> {
        self.jwt.validate_token(bearer)
    }

    async fn get_user_info(&self, id: UserId) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserInfo {
            id: user.id,
            email: user.email,
            role: user.role,
            active: user.active,
            created_at: user.created_at,
        })
    }
}
