use crate::app::ports::BlobStorePort;
use crate::constants::{FOLDER_MARKER, FOLDER_SEPARATOR, MARKER_CONTENT_TYPE};
use crate::error::{IngestError, Result};
use crate::metrics::StorageMetrics;
use std::sync::Arc;
use tracing::{debug, info};

/// What a call to [`PathProvisioner::ensure`] changed in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub container_created: bool,
    pub marker_created: bool,
}

/// Makes sure a container and a virtual folder exist before anything is written into them.
///
/// Safe to call concurrently without coordination: losing the container
/// creation race is reported as success, and marker uploads overwrite.
#[derive(Clone)]
pub struct PathProvisioner {
    store: Arc<dyn BlobStorePort>,
}

impl PathProvisioner {
    pub fn new(store: Arc<dyn BlobStorePort>) -> Self {
        Self { store }
    }

    pub async fn ensure(&self, container: &str, folder: Option<&str>) -> Result<ProvisionOutcome> {
        let container_created = self.ensure_container(container).await?;

        let marker_created = match folder.and_then(normalize_folder) {
            Some(prefix) => self.ensure_marker(container, &prefix).await?,
            None => false,
        };

        Ok(ProvisionOutcome { container_created, marker_created })
    }

    /// Returns `true` when this call created the container.
    pub async fn ensure_container(&self, container: &str) -> Result<bool> {
        if container.trim().is_empty() {
            return Err(IngestError::InvalidInput("container name must not be empty".into()));
        }

        match self.store.get_container_properties(container).await {
            Ok(_) => return Ok(false),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        match self.store.create_container(container).await {
            Ok(()) => {
                info!(container, "Created container");
                StorageMetrics::record_container_created();
                Ok(true)
            }
            Err(e) if e.is_already_exists() => {
                debug!(container, "Container created concurrently by another caller");
                StorageMetrics::record_container_race();
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_marker(&self, container: &str, prefix: &str) -> Result<bool> {
        let marker = format!("{}{}", prefix, FOLDER_MARKER);
        match self.store.get_blob_properties(container, &marker).await {
            Ok(_) => Ok(false),
            Err(e) if e.is_not_found() => {
                self.store.upload_blob(container, &marker, Vec::new(), MARKER_CONTENT_TYPE, true).await?;
                info!(container, folder = prefix, "Provisioned virtual folder");
                StorageMetrics::record_marker_created();
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Normalize a folder to exactly one trailing separator. Blank folders mean "container only".
pub fn normalize_folder(folder: &str) -> Option<String> {
    let trimmed = folder.trim_end_matches(FOLDER_SEPARATOR);
    if trimmed.trim().is_empty() {
        None
    } else {
        Some(format!("{}{}", trimmed, FOLDER_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::infra::memory_store::{InMemoryBlobStore, StoreCall};
    use std::time::Duration;

    fn provisioner(store: &Arc<InMemoryBlobStore>) -> PathProvisioner {
        PathProvisioner::new(store.clone())
    }

    #[test]
    fn folder_normalization() {
        assert_eq!(normalize_folder("rss/bbc").as_deref(), Some("rss/bbc/"));
        assert_eq!(normalize_folder("rss/bbc///").as_deref(), Some("rss/bbc/"));
        assert_eq!(normalize_folder(""), None);
        assert_eq!(normalize_folder("//"), None);
    }

    #[tokio::test]
    async fn creates_container_and_marker() {
        let store = Arc::new(InMemoryBlobStore::new());
        let outcome = provisioner(&store).ensure("data", Some("rss/bbc/")).await.unwrap();

        assert_eq!(outcome, ProvisionOutcome { container_created: true, marker_created: true });
        assert!(store.has_container("data"));
        assert_eq!(store.blob("data", "rss/bbc/.keep"), Some(Vec::new()));
        assert_eq!(store.content_type("data", "rss/bbc/.keep").as_deref(), Some(MARKER_CONTENT_TYPE));
    }

    #[tokio::test]
    async fn second_call_is_a_no_op() {
        let store = Arc::new(InMemoryBlobStore::new());
        let p = provisioner(&store);
        p.ensure("data", Some("rss/bbc")).await.unwrap();
        let second = p.ensure("data", Some("rss/bbc/")).await.unwrap();

        assert_eq!(second, ProvisionOutcome::default());
        assert_eq!(store.blob_names("data"), vec!["rss/bbc/.keep".to_string()]);
        let uploads = store.calls().iter().filter(|c| matches!(c, StoreCall::Upload { .. })).count();
        assert_eq!(uploads, 1);
    }

    #[tokio::test]
    async fn existing_container_is_not_recreated() {
        let store = Arc::new(InMemoryBlobStore::new());
        store.insert_container("data");
        let created = provisioner(&store).ensure_container("data").await.unwrap();

        assert!(!created);
        assert!(!store.calls().iter().any(|c| matches!(c, StoreCall::CreateContainer(_))));
    }

    #[tokio::test]
    async fn concurrent_callers_both_succeed() {
        // Latency makes both callers observe "not found" before either creates.
        let store = Arc::new(InMemoryBlobStore::new().with_latency(Duration::from_millis(20)));
        let a = provisioner(&store);
        let b = provisioner(&store);

        let (ra, rb) = tokio::join!(a.ensure("fresh", Some("rss/")), b.ensure("fresh", Some("rss/")));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        assert!(ra.container_created ^ rb.container_created, "exactly one caller creates");
        assert_eq!(store.container_names(), vec!["fresh".to_string()]);
        let creates = store.calls().iter().filter(|c| matches!(c, StoreCall::CreateContainer(_))).count();
        assert_eq!(creates, 2);
        assert_eq!(store.blob_names("fresh"), vec!["rss/.keep".to_string()]);
    }

    #[tokio::test]
    async fn unreachable_store_is_a_storage_fault() {
        let store = Arc::new(InMemoryBlobStore::new());
        store.set_offline(true);
        let err = provisioner(&store).ensure("data", Some("rss")).await.unwrap_err();
        assert!(matches!(err, IngestError::Storage(StoreError::Transport(_))));
    }

    #[tokio::test]
    async fn empty_container_is_rejected_before_any_store_call() {
        let store = Arc::new(InMemoryBlobStore::new());
        let err = provisioner(&store).ensure(" ", Some("rss")).await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidInput(_)));
        assert!(store.calls().is_empty());
    }
}
