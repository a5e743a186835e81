use crate::app::ports::BlobStorePort;
use crate::constants::JSON_CONTENT_TYPE;
use crate::error::{IngestError, Result};
use crate::metrics::StorageMetrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Overwrites a JSON document at an arbitrary container/blob location. Last writer wins.
#[derive(Clone)]
pub struct ConfigWriter {
    store: Arc<dyn BlobStorePort>,
}

impl ConfigWriter {
    pub fn new(store: Arc<dyn BlobStorePort>) -> Self {
        Self { store }
    }

    /// Serialize `data` as pretty-printed JSON (2-space indent) and upload it unconditionally.
    ///
    /// Returns the number of bytes written.
    pub async fn overwrite<T>(&self, container: &str, blob_name: &str, data: &T) -> Result<usize>
    where
        T: Serialize + ?Sized,
    {
        if container.trim().is_empty() {
            return Err(IngestError::InvalidInput("container must not be empty".into()));
        }
        if blob_name.trim().is_empty() {
            return Err(IngestError::InvalidInput("blob name must not be empty".into()));
        }

        let body = serde_json::to_vec_pretty(data)
            .map_err(|e| IngestError::InvalidInput(format!("data is not JSON-serializable: {}", e)))?;
        let len = body.len();

        self.store.upload_blob(container, blob_name, body, JSON_CONTENT_TYPE, true).await?;
        StorageMetrics::record_upload();
        info!(container, blob = blob_name, bytes = len, "Overwrote JSON blob");
        Ok(len)
    }
}
