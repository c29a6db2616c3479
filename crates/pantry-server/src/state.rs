use crate::config::ServerConfig;
use crate::media::MediaStorage;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
    pub media: Arc<MediaStorage>,
}

impl AppState {
    /// Create a new app state; media storage is derived from the config
    pub fn new(pool: PgPool, config: ServerConfig) -> Self {
        let media = MediaStorage::new(&config.media.root_dir, &config.media.url_prefix);
        Self {
            pool,
            config: Arc::new(config),
            media: Arc::new(media),
        }
    }
}
