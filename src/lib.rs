pub mod ai;
pub mod cli;
pub mod config;
pub mod project;
pub mod storage;

use std::path::Path;

use config::{AppConfig, StorageBackend};
use project::{KvProjectRepository, ProjectRepository, ProjectStore};
use storage::{FileBackend, MemoryBackend, SqliteBackend};

/// The store as the application runs it: backend picked from config at startup.
pub type AppStore = ProjectStore<Box<dyn ProjectRepository + Send>>;

/// Builds the configured backend under `app_data` and loads the project list.
/// A database that cannot be opened leaves the session running in memory.
pub fn open_store(config: &AppConfig, app_data: &Path) -> anyhow::Result<AppStore> {
    let repository: Box<dyn ProjectRepository + Send> = match config.storage {
        StorageBackend::Sqlite => match SqliteBackend::open(&app_data.join("mediaspark.db")) {
            Ok(backend) => Box::new(KvProjectRepository::new(backend)),
            Err(e) => {
                log::error!("Storage unavailable, changes will not be saved: {:#}", e);
                Box::new(KvProjectRepository::new(MemoryBackend::new()))
            }
        },
        StorageBackend::File => {
            Box::new(KvProjectRepository::new(FileBackend::new(app_data.join("store"))))
        }
        StorageBackend::Memory => Box::new(KvProjectRepository::new(MemoryBackend::new())),
    };

    log::debug!("Using {:?} storage in {}", config.storage, app_data.display());
    Ok(ProjectStore::open(repository))
}
