use crate::config::SecurityConfig;
use crate::domain::{TokenPurpose, UserId};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::token::VerificationToken;
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        // An in-memory database lives only as long as its last connection
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);
        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo().create(email, password, config).await
    }

    pub async fn check_user_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<(User, bool)>> {
        self.user_repo().check_credentials(email, password).await
    }

    // ========================================================================
    // Verification tokens
    // ========================================================================

    pub async fn save_verification_token(
        &self,
        user_id: UserId,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<VerificationToken> {
        self.token_repo().save(user_id, token, purpose).await
    }

    pub async fn find_verification_token(&self, token: &str) -> Result<Option<VerificationToken>> {
        self.token_repo().find_by_token(token).await
    }

    pub async fn list_verification_tokens(&self, user_id: UserId) -> Result<Vec<VerificationToken>> {
        self.token_repo().list_for_user(user_id).await
    }

    pub async fn delete_verification_token(&self, id: i32) -> Result<bool> {
        self.token_repo().delete(id).await
    }

    pub async fn redeem_email_verification(&self, token: &VerificationToken) -> Result<bool> {
        self.token_repo().redeem_email_verification(token).await
    }

    pub async fn redeem_password_reset(
        &self,
        token: &VerificationToken,
        password_hash: &str,
    ) -> Result<bool> {
        self.token_repo()
            .redeem_password_reset(token, password_hash)
            .await
    }
}
