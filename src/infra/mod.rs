pub mod azure;
pub mod fs_store;
pub mod http_client;
pub mod memory_store;

use crate::app::ports::BlobStorePort;
use crate::config::{HttpConfig, StorageConfig, StoreBackend};
use crate::error::{IngestError, Result};
use std::sync::Arc;
use tracing::info;

/// Construct the object store selected by configuration.
///
/// Remote backends take their request timeout from `http`.
pub fn build_store(config: &StorageConfig, http: &HttpConfig) -> Result<Arc<dyn BlobStorePort>> {
    let store: Arc<dyn BlobStorePort> = match config.backend {
        StoreBackend::Azure => {
            let conn = config
                .connection_string
                .as_deref()
                .ok_or_else(|| IngestError::Config("azure backend requires a connection string".into()))?;
            let store = azure::AzureBlobStore::connect(conn, http)?;
            info!(account = store.account(), "Using Azure Blob Storage");
            Arc::new(store)
        }
        StoreBackend::Local => {
            info!(root = %config.local_root.display(), "Using local filesystem store");
            Arc::new(fs_store::FsBlobStore::new(config.local_root.clone()))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; nothing will persist");
            Arc::new(memory_store::InMemoryBlobStore::new())
        }
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn azure_without_connection_string_is_config_error() {
        let config = StorageConfig::default();
        assert!(matches!(build_store(&config, &HttpConfig::default()).err(), Some(IngestError::Config(_))));
    }

    #[test]
    fn azure_connection_errors_surface_as_storage_config() {
        let config = StorageConfig { connection_string: Some("AccountName=x".into()), ..StorageConfig::default() };
        assert!(matches!(
            build_store(&config, &HttpConfig::default()).err(),
            Some(IngestError::Storage(crate::error::StoreError::Config(_)))
        ));
    }

    #[test]
    fn development_storage_builds_without_network() {
        let config = StorageConfig { connection_string: Some("UseDevelopmentStorage=true".into()), ..StorageConfig::default() };
        assert!(build_store(&config, &HttpConfig { timeout_secs: 3, ..HttpConfig::default() }).is_ok());
    }

    #[test]
    fn local_and_memory_backends_build() {
        let dir = tempfile::tempdir().unwrap();
        let local = StorageConfig {
            backend: StoreBackend::Local,
            local_root: dir.path().to_path_buf(),
            ..StorageConfig::default()
        };
        assert!(build_store(&local, &HttpConfig::default()).is_ok());
        let memory = StorageConfig { backend: StoreBackend::Memory, ..StorageConfig::default() };
        assert!(build_store(&memory, &HttpConfig::default()).is_ok());
    }
}
