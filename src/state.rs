use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{
    jwt::TokenKeys,
    password::PasswordHasher,
    repo::{MemoryUserStore, PgUserStore, UserStore},
    services::AuthService,
};
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url).await?;
                db::migrate(&pool).await?;
                info!("using postgres user store");
                Arc::new(PgUserStore::new(pool))
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory user store");
                Arc::new(MemoryUserStore::new())
            }
        };

        Self::from_parts(config, store)
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(config.hash)?;
        let tokens = TokenKeys::from_config(&config.jwt);
        let auth = AuthService::new(store, hasher, tokens.clone());
        Ok(Self {
            config,
            auth: Arc::new(auth),
            tokens: Arc::new(tokens),
        })
    }
}
