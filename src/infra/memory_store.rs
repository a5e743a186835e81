use crate::app::ports::{BlobProperties, BlobStorePort, ContainerProperties};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// A store operation as seen by the in-memory adapter, recorded in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetContainer(String),
    CreateContainer(String),
    GetBlob { container: String, blob: String },
    Upload { container: String, blob: String, overwrite: bool },
    Download { container: String, blob: String },
}

struct MemoryBlob {
    data: Vec<u8>,
    content_type: String,
}

#[derive(Default)]
struct State {
    containers: HashMap<String, BTreeMap<String, MemoryBlob>>,
    calls: Vec<StoreCall>,
}

/// In-memory object store for development and testing.
///
/// `with_latency` delays every call before it touches state, which lets
/// tests interleave concurrent callers; `set_offline` makes every call fail
/// as if the service were unreachable.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    state: Arc<Mutex<State>>,
    offline: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn insert_container(&self, container: &str) {
        self.state().containers.entry(container.to_string()).or_default();
    }

    pub fn insert_blob(&self, container: &str, blob: &str, data: &[u8]) {
        self.state()
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(blob.to_string(), MemoryBlob { data: data.to_vec(), content_type: "application/octet-stream".into() });
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.state().containers.contains_key(container)
    }

    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().containers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn blob(&self, container: &str, blob: &str) -> Option<Vec<u8>> {
        self.state().containers.get(container)?.get(blob).map(|b| b.data.clone())
    }

    /// Content type the blob was last uploaded with.
    pub fn content_type(&self, container: &str, blob: &str) -> Option<String> {
        self.state().containers.get(container)?.get(blob).map(|b| b.content_type.clone())
    }

    /// Blob names in a container, sorted.
    pub fn blob_names(&self, container: &str) -> Vec<String> {
        self.state()
            .containers
            .get(container)
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn begin(&self, call: StoreCall) -> Result<MutexGuard<'_, State>, StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state();
        state.calls.push(call);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("in-memory store is offline".into()));
        }
        Ok(state)
    }
}

#[async_trait]
impl BlobStorePort for InMemoryBlobStore {
    async fn get_container_properties(&self, container: &str) -> Result<ContainerProperties, StoreError> {
        let state = self.begin(StoreCall::GetContainer(container.to_string())).await?;
        if state.containers.contains_key(container) {
            Ok(ContainerProperties { name: container.to_string() })
        } else {
            Err(StoreError::NotFound(container.to_string()))
        }
    }

    async fn create_container(&self, container: &str) -> Result<(), StoreError> {
        let mut state = self.begin(StoreCall::CreateContainer(container.to_string())).await?;
        if state.containers.contains_key(container) {
            return Err(StoreError::AlreadyExists(container.to_string()));
        }
        state.containers.insert(container.to_string(), BTreeMap::new());
        debug!("Created in-memory container {}", container);
        Ok(())
    }

    async fn get_blob_properties(&self, container: &str, blob: &str) -> Result<BlobProperties, StoreError> {
        let call = StoreCall::GetBlob { container: container.to_string(), blob: blob.to_string() };
        let state = self.begin(call).await?;
        let stored = state
            .containers
            .get(container)
            .and_then(|blobs| blobs.get(blob))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", container, blob)))?;
        Ok(BlobProperties { content_length: stored.data.len() as u64 })
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let call = StoreCall::Upload { container: container.to_string(), blob: blob.to_string(), overwrite };
        let mut state = self.begin(call).await?;
        let blobs = state
            .containers
            .get_mut(container)
            .ok_or_else(|| StoreError::NotFound(container.to_string()))?;
        if !overwrite && blobs.contains_key(blob) {
            return Err(StoreError::AlreadyExists(format!("{}/{}", container, blob)));
        }
        debug!("Stored {} bytes at {}/{}", data.len(), container, blob);
        blobs.insert(blob.to_string(), MemoryBlob { data, content_type: content_type.to_string() });
        Ok(())
    }

    async fn download_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>, StoreError> {
        let call = StoreCall::Download { container: container.to_string(), blob: blob.to_string() };
        let state = self.begin(call).await?;
        state
            .containers
            .get(container)
            .and_then(|blobs| blobs.get(blob))
            .map(|b| b.data.clone())
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", container, blob)))
    }
}
