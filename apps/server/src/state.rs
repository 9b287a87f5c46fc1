//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::TokenIssuer;
use crate::config::Config;

/// State shared by every request handler. Cloning is cheap: the pool and
/// config are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = crate::db::create_pool(&config.database).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let tokens = TokenIssuer::new(&config.auth);

        Ok(Self {
            config: Arc::new(config),
            pool,
            tokens,
        })
    }
}
