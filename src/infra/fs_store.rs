use crate::app::ports::{BlobProperties, BlobStorePort, ContainerProperties};
use crate::error::StoreError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// Filesystem-backed object store: one directory per container, blob keys map
/// to relative paths inside it. Used for local development without Azurite.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf, StoreError> {
        if container.is_empty() || container.contains(['/', '\\']) || container == "." || container == ".." {
            return Err(StoreError::InvalidKey(format!("invalid container name: {:?}", container)));
        }
        Ok(self.root.join(container))
    }

    fn blob_path(&self, container: &str, blob: &str) -> Result<PathBuf, StoreError> {
        let dir = self.container_dir(container)?;
        let rel = Path::new(blob);
        let clean = !blob.is_empty()
            && !blob.contains('\\')
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StoreError::InvalidKey(format!("invalid blob key: {:?}", blob)));
        }
        Ok(dir.join(rel))
    }

    async fn require_container(&self, container: &str) -> Result<PathBuf, StoreError> {
        let dir = self.container_dir(container)?;
        match fs::metadata(&dir).await {
            Ok(m) if m.is_dir() => Ok(dir),
            Ok(_) => Err(StoreError::NotFound(container.to_string())),
            Err(e) => Err(map_io(e, container)),
        }
    }
}

fn map_io(e: std::io::Error, what: &str) -> StoreError {
    match e.kind() {
        ErrorKind::NotFound => StoreError::NotFound(what.to_string()),
        ErrorKind::AlreadyExists => StoreError::AlreadyExists(what.to_string()),
        _ => StoreError::Transport(format!("{}: {}", what, e)),
    }
}

#[async_trait]
impl BlobStorePort for FsBlobStore {
    async fn get_container_properties(&self, container: &str) -> Result<ContainerProperties, StoreError> {
        self.require_container(container).await?;
        Ok(ContainerProperties { name: container.to_string() })
    }

    async fn create_container(&self, container: &str) -> Result<(), StoreError> {
        let dir = self.container_dir(container)?;
        fs::create_dir_all(&self.root).await.map_err(|e| map_io(e, container))?;
        // Non-recursive so a concurrent creator surfaces as AlreadyExists.
        fs::create_dir(&dir).await.map_err(|e| map_io(e, container))?;
        debug!(path = %dir.display(), "Created container directory");
        Ok(())
    }

    async fn get_blob_properties(&self, container: &str, blob: &str) -> Result<BlobProperties, StoreError> {
        let path = self.blob_path(container, blob)?;
        self.require_container(container).await?;
        let what = format!("{}/{}", container, blob);
        let meta = fs::metadata(&path).await.map_err(|e| map_io(e, &what))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(what));
        }
        Ok(BlobProperties { content_length: meta.len() })
    }

    /// Plain files carry no metadata, so the content type is not kept.
    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
        _content_type: &str,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let path = self.blob_path(container, blob)?;
        self.require_container(container).await?;
        let what = format!("{}/{}", container, blob);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| map_io(e, &what))?;
        }

        if !overwrite {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
                .map_err(|e| map_io(e, &what))?;
            file.write_all(&data).await.map_err(|e| map_io(e, &what))?;
            file.flush().await.map_err(|e| map_io(e, &what))?;
            return Ok(());
        }

        // Write aside then rename so readers never observe a partial blob.
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("blob");
        let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
        fs::write(&tmp, &data).await.map_err(|e| map_io(e, &what))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(map_io(e, &what));
        }
        Ok(())
    }

    async fn download_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.blob_path(container, blob)?;
        self.require_container(container).await?;
        let what = format!("{}/{}", container, blob);
        match fs::metadata(&path).await {
            Ok(m) if m.is_file() => fs::read(&path).await.map_err(|e| map_io(e, &what)),
            Ok(_) => Err(StoreError::NotFound(what)),
            Err(e) => Err(map_io(e, &what)),
        }
    }
}
