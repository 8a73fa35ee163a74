//! Agent memory and store backends for Boardroom.
//!
//! - [`AgentMemory`]: the per-(agent, principal) view an agent runtime uses
//! - [`InMemoryStore`]: ephemeral, used by tests and `storage.backend = "memory"`
//! - [`FileStore`]: JSON files and real artifact files under one root directory
//! - `SqliteStore`: a single SQLite database (behind the `sqlite` feature)
//!
//! Every backend implements all five store traits from `boardroom-core`, and
//! [`Stores`] bundles them as trait objects.

pub mod adapter;
pub mod in_memory;
pub mod file_backend;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use adapter::AgentMemory;
pub use in_memory::InMemoryStore;
pub use file_backend::FileStore;
pub use boardroom_core::store::normalize_path;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use boardroom_config::{StorageBackend, StorageConfig};
use boardroom_core::error::StoreError;
use boardroom_core::store::{ArtifactStore, ConfigStore, HistoryStore, MemoryStore, TaskStore};
use std::sync::Arc;
use tracing::info;

/// All stores an orchestration session needs, as shared trait objects.
#[derive(Clone)]
pub struct Stores {
    pub memory: Arc<dyn MemoryStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub configs: Arc<dyn ConfigStore>,
    pub history: Arc<dyn HistoryStore>,
}

impl Stores {
    /// Use one backend for every store.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: MemoryStore + ArtifactStore + TaskStore + ConfigStore + HistoryStore + 'static,
    {
        Self {
            memory: backend.clone(),
            artifacts: backend.clone(),
            tasks: backend.clone(),
            configs: backend.clone(),
            history: backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(InMemoryStore::new()))
    }

    /// Open the backend selected in configuration.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let path = config.resolved_path();
        match config.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Self::in_memory())
            }
            StorageBackend::File => {
                info!(path = %path.display(), "Using file storage");
                Ok(Self::from_backend(Arc::new(FileStore::new(path))))
            }
            #[cfg(feature = "sqlite")]
            StorageBackend::Sqlite => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        StoreError::Storage(format!("Failed to create storage directory: {e}"))
                    })?;
                }
                let url = format!("sqlite://{}", path.display());
                Ok(Self::from_backend(Arc::new(SqliteStore::new(&url).await?)))
            }
            #[cfg(not(feature = "sqlite"))]
            StorageBackend::Sqlite => Err(StoreError::Storage(
                "SQLite storage requested but the `sqlite` feature is disabled".into(),
            )),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
