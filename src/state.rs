//! Shared application services.

use std::sync::Arc;

use crate::assistant::Assistant;
use crate::config::Config;
use crate::data_sources::{AqiSource, GeminiClient};
use crate::repository::ComplaintRepository;
use crate::session::{IdentityProvider, LocalIdentity};
use crate::storage::{ComplaintStore, SqliteStore};

/// Everything a handler or dashboard needs, built once from [`Config`].
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repository: ComplaintRepository,
    pub aqi: AqiSource,
    pub assistant: Assistant,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Wire services around an existing store.
    pub fn new(config: Config, store: Arc<dyn ComplaintStore>) -> Self {
        Self {
            repository: ComplaintRepository::new(store),
            aqi: AqiSource::from_config(&config),
            assistant: Assistant::new(GeminiClient::from_config(&config)),
            identity: Arc::new(LocalIdentity),
            config: Arc::new(config),
        }
    }

    /// Open the configured SQLite database and wire services around it.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store = SqliteStore::new(&config.database_url).await?;
        Ok(Self::new(config, Arc::new(store)))
    }
}
