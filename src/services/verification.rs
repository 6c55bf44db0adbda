//! Issues and redeems one-time account tokens.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::db::{Store, User, VerificationToken};
use crate::domain::TokenPurpose;
use crate::services::notifier::Notifier;

/// Joins the frontend base URL, the route for `purpose` and the token.
#[must_use]
pub fn build_link(frontend_base_url: &str, purpose: TokenPurpose, token: &str) -> String {
    format!(
        "{}/{}?token={}",
        frontend_base_url.trim_end_matches('/'),
        purpose.frontend_path(),
        token
    )
}

pub struct VerificationService {
    store: Store,
    notifier: Arc<Notifier>,
    frontend_base_url: String,
}

impl VerificationService {
    #[must_use]
    pub fn new(store: Store, notifier: Arc<Notifier>, frontend_base_url: impl Into<String>) -> Self {
        Self {
            store,
            notifier,
            frontend_base_url: frontend_base_url.into(),
        }
    }

    /// Persists a fresh token for `user` and emails the link.
    ///
    /// # Errors
    ///
    /// Returns the store error if the token cannot be saved. In that case no
    /// email is attempted. Email failures are never returned.
    pub async fn issue(&self, user: &User, purpose: TokenPurpose) -> Result<VerificationToken> {
        let token = Uuid::new_v4().to_string();

        let saved = self
            .store
            .save_verification_token(user.id, &token, purpose)
            .await?;

        info!(user_id = %user.id, purpose = %purpose, "Issued account token");

        let link = build_link(&self.frontend_base_url, purpose, &saved.token);
        self.notifier.send(purpose, &user.email, &link).await;

        Ok(saved)
    }

    /// Looks up a token, treating one with a different purpose as absent.
    pub async fn find(&self, token: &str, purpose: TokenPurpose) -> Result<Option<VerificationToken>> {
        let found = self.store.find_verification_token(token).await?;
        Ok(found.filter(|t| t.purpose == purpose))
    }
}
