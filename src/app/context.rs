use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::{Result, SwipeFeedError};
use crate::config::Config;
use crate::engine::ReconcileEngine;
use crate::fetcher::proxied::default_proxies;
use crate::fetcher::{DirectTransport, ProxiedTransport, Transport};
use crate::store::SqliteStore;

/// Composition root: wires the transport, store, and reconciliation engine.
/// The transport variant (direct vs proxied) is selected here, from config,
/// not by code duplication downstream.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub engine: ReconcileEngine<SqliteStore>,
    pub config: Config,
}

impl AppContext {
    pub fn new(db_path: Option<PathBuf>, config: Config) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Ok(Self::wire(store, config))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Ok(Self::wire(store, config))
    }

    fn wire(store: Arc<SqliteStore>, config: Config) -> Self {
        let timeout = Duration::from_secs(config.fetch.timeout_secs);
        let transport: Arc<dyn Transport + Send + Sync> = if config.fetch.use_proxies {
            let proxies = if config.fetch.proxies.is_empty() {
                default_proxies()
            } else {
                config.fetch.proxies.iter().map(Into::into).collect()
            };
            Arc::new(ProxiedTransport::with_proxies(proxies, timeout))
        } else {
            Arc::new(DirectTransport::with_timeout(timeout))
        };

        let engine = ReconcileEngine::with_batch_width(
            transport,
            store.clone(),
            config.refresh.batch_width,
        );

        Self {
            store,
            engine,
            config,
        }
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| SwipeFeedError::Config("Could not find data directory".into()))?;
        let dir = data_dir.join("swipefeed");
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join("swipefeed.db"))
    }
}
