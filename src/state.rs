use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    auth::JwtKeys, config::AppConfig, db::PgStore, memory::MemoryStore,
    recipes::repo::CatalogRepo, users::repo::UserRepo,
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub catalog: Arc<dyn CatalogRepo>,
    pub jwt: JwtKeys,
}

impl AppState {
    /// Postgres when `DATABASE_URL` is set, otherwise the in-memory store.
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => {
                let store = Arc::new(PgStore::connect(url).await?);
                info!("using postgres store");
                Ok(Self::from_parts(store.clone(), store, config))
            }
            None => {
                warn!("DATABASE_URL not set; data lives in memory and is lost on exit");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn in_memory(config: &AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(store.clone(), store, config)
    }

    pub fn from_parts(
        users: Arc<dyn UserRepo>,
        catalog: Arc<dyn CatalogRepo>,
        config: &AppConfig,
    ) -> Self {
        Self {
            users,
            catalog,
            jwt: JwtKeys::from_config(&config.jwt),
        }
    }
}
