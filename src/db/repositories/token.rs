use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::debug;

use crate::domain::{TokenPurpose, UserId};
use crate::entities::{prelude::*, users, verification_tokens};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken {
    pub id: i32,
    pub token: String,
    pub user_id: UserId,
    pub purpose: TokenPurpose,
    pub created_at: String,
}

impl TryFrom<verification_tokens::Model> for VerificationToken {
    type Error = anyhow::Error;

    fn try_from(model: verification_tokens::Model) -> Result<Self> {
        let purpose = model
            .purpose
            .parse::<TokenPurpose>()
            .with_context(|| format!("Token {} has a corrupt purpose", model.id))?;

        Ok(Self {
            id: model.id,
            token: model.token,
            user_id: UserId::new(model.user_id),
            purpose,
            created_at: model.created_at,
        })
    }
}

/// Persistence for one-time verification and reset tokens
pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn save(
        &self,
        user_id: UserId,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<VerificationToken> {
        let active = verification_tokens::ActiveModel {
            token: Set(token.to_string()),
            user_id: Set(user_id.value()),
            purpose: Set(purpose.as_str().to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .with_context(|| format!("Failed to save {purpose} token for user {user_id}"))?;

        VerificationToken::try_from(model)
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<VerificationToken>> {
        let row = VerificationTokens::find()
            .filter(verification_tokens::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query verification token")?;

        row.map(VerificationToken::try_from).transpose()
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<VerificationToken>> {
        let rows = VerificationTokens::find()
            .filter(verification_tokens::Column::UserId.eq(user_id.value()))
            .all(&self.conn)
            .await
            .context("Failed to list verification tokens")?;

        rows.into_iter().map(VerificationToken::try_from).collect()
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = VerificationTokens::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete verification token")?;

        Ok(result.rows_affected > 0)
    }

    /// Activates the owner and deletes the token in one transaction.
    /// Returns false if the token was already consumed.
    pub async fn redeem_email_verification(&self, token: &VerificationToken) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let deleted = VerificationTokens::delete_by_id(token.id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            debug!(token_id = token.id, "Verification token already consumed");
            return Ok(false);
        }

        let updated = Users::update_many()
            .col_expr(
                users::Column::Active,
                sea_orm::sea_query::Expr::value(true),
            )
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(token.user_id.value()))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            anyhow::bail!("Token {} references missing user {}", token.id, token.user_id);
        }

        txn.commit().await?;
        Ok(true)
    }

    /// Stores the new password hash and deletes the token in one transaction.
    /// Returns false if the token was already consumed.
    pub async fn redeem_password_reset(
        &self,
        token: &VerificationToken,
        password_hash: &str,
    ) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let deleted = VerificationTokens::delete_by_id(token.id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            debug!(token_id = token.id, "Reset token already consumed");
            return Ok(false);
        }

        let updated = Users::update_many()
            .col_expr(
                users::Column::PasswordHash,
                sea_orm::sea_query::Expr::value(password_hash),
            )
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(token.user_id.value()))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            anyhow::bail!("Token {} references missing user {}", token.id, token.user_id);
        }

        txn.commit().await?;
        Ok(true)
    }
}
