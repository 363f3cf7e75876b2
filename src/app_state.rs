use std::sync::Arc;

use crate::{
    config::Config,
    domains::{feed::FeedService, social::SocialGraphService},
    error::AppResult,
    infrastructure::{
        database::{connect_database, SocialDatabase},
        id_generator::IdGenerator,
        middleware::RateLimiter,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub database: Arc<dyn SocialDatabase>,
    pub feed: FeedService,
    pub social: SocialGraphService,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let database = connect_database(&config).await?;
        Self::with_database(config, database)
    }

    /// Wire services around an already-initialized database.
    pub fn with_database(config: Config, database: Arc<dyn SocialDatabase>) -> AppResult<Self> {
        let ids = Arc::new(IdGenerator::new(config.ids.shard_id)?);
        let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));

        Ok(Self {
            feed: FeedService::new(database.clone()),
            social: SocialGraphService::new(database.clone(), ids),
            database,
            rate_limiter,
            config,
        })
    }
}
