use tokio::sync::OnceCell;
use tracing::warn;

use super::SqliteStorage;
use crate::config::DatabaseConfig;
use crate::error::StorageResult;

/// Lazily opened, shared store.
///
/// The first [`acquire`](Self::acquire) opens and migrates the database;
/// concurrent callers wait on that same initialization. A failed open is not
/// cached, so the next call tries again.
pub struct StoreHandle {
    config: DatabaseConfig,
    storage: OnceCell<SqliteStorage>,
}

impl StoreHandle {
    /// Create a handle; nothing is opened until first use.
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            storage: OnceCell::new(),
        }
    }

    /// Get the open store, opening it on first use.
    pub async fn acquire(&self) -> StorageResult<SqliteStorage> {
        let storage = self
            .storage
            .get_or_try_init(|| async {
                SqliteStorage::open(&self.config).await.map_err(|e| {
                    warn!(error = %e, "Failed to open store; will retry on next use");
                    e
                })
            })
            .await?;
        Ok(storage.clone())
    }

    /// Whether the store has been opened successfully.
    pub fn is_open(&self) -> bool {
        self.storage.initialized()
    }

    /// Configuration this handle opens with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}
