use std::sync::Arc;

use crate::{
    auth::Authenticator, config::Config, database::RedisStore, error::AppError,
    storage::ObjectStore, store::Store,
};

pub struct AppState<S> {
    pub config: Config,
    pub store: S,
    pub auth: Authenticator,
    pub objects: ObjectStore,
}

impl AppState<RedisStore> {
    pub async fn new() -> Result<Arc<Self>, AppError> {
        let config = Config::load().map_err(|e| AppError::InternalError(Box::new(e)))?;

        let store = RedisStore::connect(&config.redis_url).await?;
        let auth = Authenticator::hosted(&config.auth_url, &config.service_key);
        let objects = ObjectStore::remote(&config.storage_url, &config.service_key);

        Ok(Arc::new(Self {
            config,
            store,
            auth,
            objects,
        }))
    }
}

impl<S: Store> AppState<S> {
    pub fn with(config: Config, store: S, auth: Authenticator, objects: ObjectStore) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            auth,
            objects,
        })
    }
}
