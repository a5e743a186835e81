use crate::error::StoreError;
use async_trait::async_trait;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerProperties {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobProperties {
    pub content_length: u64,
}

/// Flat, container-scoped object store.
///
/// Adapters must report a missing container or blob as `StoreError::NotFound`
/// and a create that lost to an existing object as `StoreError::AlreadyExists`.
#[async_trait]
pub trait BlobStorePort: Send + Sync {
    async fn get_container_properties(&self, container: &str) -> Result<ContainerProperties, StoreError>;

    async fn create_container(&self, container: &str) -> Result<(), StoreError>;

    async fn get_blob_properties(&self, container: &str, blob: &str) -> Result<BlobProperties, StoreError>;

    /// Upload a whole blob. With `overwrite == false` an existing blob yields `AlreadyExists`.
    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StoreError>;

    async fn download_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>, StoreError>;
}

// Ingest-side ports
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    /// GET a URL. `Err` means no response was received; any status is returned as `Ok`.
    async fn get(&self, url: &str) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}
