pub mod file;
pub mod pg;
pub mod repo;
pub mod repo_types;

use std::sync::Arc;

use crate::config::StoreConfig;
use repo::UserStore;

pub async fn connect(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn UserStore>> {
    let store: Arc<dyn UserStore> = match cfg {
        StoreConfig::Postgres { database_url } => {
            tracing::info!("using postgres user store");
            Arc::new(pg::PgUserStore::connect(database_url).await?)
        }
        StoreConfig::File { path } => {
            tracing::info!(path = %path.display(), "using file user store");
            Arc::new(file::FileUserStore::open(path.clone()).await?)
        }
    };
    Ok(store)
}
