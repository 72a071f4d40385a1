use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::users::{self, repo::UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let store = users::connect(&config.store).await?;
        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: AppConfig) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        Self {
            store,
            config: Arc::new(config),
            jwt,
        }
    }

    /// State backed by a throwaway file store. Keep the returned directory
    /// alive for as long as the state is used.
    #[cfg(test)]
    pub async fn fake() -> (tempfile::TempDir, Self) {
        use crate::{
            config::{JwtConfig, StoreConfig},
            rewards::engine::RewardConfig,
            users::file::FileUserStore,
        };

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("users.json");
        let store = Arc::new(FileUserStore::open(&path).await.expect("open file store"))
            as Arc<dyn UserStore>;

        let config = AppConfig {
            store: StoreConfig::File { path },
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60 * 24 * 7,
            },
            rewards: RewardConfig::default(),
            cors_origins: Vec::new(),
        };
        (dir, Self::from_parts(store, config))
    }
}
