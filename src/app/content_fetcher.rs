use crate::app::path_provisioner::PathProvisioner;
use crate::app::ports::{BlobStorePort, HttpClientPort};
use crate::error::{IngestError, Result};
use crate::metrics::{SourcesMetrics, StorageMetrics};
use crate::naming::generate_filename;
use crate::types::{StoragePath, StoredObject};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Downloads a remote document and archives it under a freshly generated blob name.
#[derive(Clone)]
pub struct ContentFetcher {
    http: Arc<dyn HttpClientPort>,
    store: Arc<dyn BlobStorePort>,
    provisioner: PathProvisioner,
    container: String,
}

impl ContentFetcher {
    pub fn new(http: Arc<dyn HttpClientPort>, store: Arc<dyn BlobStorePort>, container: &str) -> Self {
        let provisioner = PathProvisioner::new(store.clone());
        Self { http, store, provisioner, container: container.to_string() }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Fetch `url` and store the body at `<folder>/<generated name>` in the target container.
    ///
    /// Non-2xx responses are `Remote` faults and nothing is uploaded. No retries.
    pub async fn fetch_and_store(&self, url: &str, folder: &str) -> Result<StoredObject> {
        if url.trim().is_empty() {
            return Err(IngestError::InvalidInput("url must not be empty".into()));
        }

        self.provisioner.ensure_container(&self.container).await?;

        let started = Instant::now();
        let resp = match self.http.get(url).await {
            Ok(resp) => resp,
            Err(message) => {
                let err = IngestError::Network { url: url.to_string(), message };
                SourcesMetrics::record_fetch_error(err.kind());
                warn!("{}", err);
                return Err(err);
            }
        };

        if !resp.is_success() {
            let err = IngestError::Remote { url: url.to_string(), status: resp.status };
            SourcesMetrics::record_fetch_error(err.kind());
            warn!("{}", err);
            return Err(err);
        }
        SourcesMetrics::record_fetch_success(started.elapsed().as_secs_f64(), resp.bytes.len());

        let sha256 = {
            let mut h = Sha256::new();
            h.update(&resp.bytes);
            hex::encode(h.finalize())
        };
        let size_bytes = resp.bytes.len();
        let path = StoragePath::new(&self.container, folder, &generate_filename());
        let key = path.key();

        debug!(url, key = %key, size_bytes, "Uploading fetched payload");
        self.store
            .upload_blob(&self.container, &key, resp.bytes, &resp.content_type, true)
            .await?;
        StorageMetrics::record_upload();
        info!(url, path = %path, size_bytes, "Stored payload");

        Ok(StoredObject {
            path,
            key,
            url: url.to_string(),
            size_bytes,
            sha256,
            content_type: resp.content_type,
            upstream_etag: resp.etag,
            upstream_last_modified: resp.last_modified,
        })
    }
}
