use std::sync::Arc;

use crate::clients::resend::ResendClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, JwtService, Mailer, Notifier, SeaOrmAuthService, VerificationService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    /// Builds the state with the configured email provider.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mailer: Option<Arc<dyn Mailer>> = if config.email.enabled {
            Some(Arc::new(ResendClient::new(&config.email)?))
        } else {
            None
        };

        Self::with_mailer(config, mailer).await
    }

    /// Builds the state around a caller-supplied mail transport.
    pub async fn with_mailer(
        mut config: Config,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> anyhow::Result<Self> {
        config.ensure_jwt_secret();

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let notifier = Arc::new(Notifier::new(&config.email, mailer));

        let verification = Arc::new(VerificationService::new(
            store.clone(),
            notifier,
            config.frontend.base_url.clone(),
        ));

        let jwt = JwtService::new(
            &config.security.jwt_secret,
            config.security.jwt_expiry_hours,
        );

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            verification,
            jwt,
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
        })
    }
}
