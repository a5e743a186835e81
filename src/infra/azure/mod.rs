//! Azure Blob Storage adapter built on the Azure SDK clients.
//!
//! Credentials and endpoint come from a standard connection string, so the
//! same code talks to the public cloud, a custom `BlobEndpoint` or Azurite
//! (`UseDevelopmentStorage=true`).

pub mod connection;

use crate::app::ports::{BlobProperties, BlobStorePort, ContainerProperties};
use crate::config::HttpConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use azure_core::error::ErrorKind;
use azure_core::request_options::IfMatchCondition;
use azure_core::RetryOptions;
use azure_storage_blobs::prelude::{BlobServiceClient, ClientBuilder};
use connection::BlobTarget;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub struct AzureBlobStore {
    service: BlobServiceClient,
    account: String,
    timeout: Duration,
}

impl AzureBlobStore {
    /// Build the service client. Nothing is sent until the first operation.
    pub fn connect(connection_string: &str, http: &HttpConfig) -> Result<Self, StoreError> {
        let target = connection::resolve(connection_string)?;
        Ok(Self::with_target(target, http))
    }

    pub fn with_target(target: BlobTarget, http: &HttpConfig) -> Self {
        let account = target.account().to_string();
        // The scheduler's next tick is the retry.
        let service = ClientBuilder::with_location(target.location, target.credentials)
            .retry(RetryOptions::none())
            .blob_service_client();
        Self { service, account, timeout: http.timeout() }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    async fn call<T, F>(&self, what: &str, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = azure_core::Result<T>>,
    {
        debug!(object = what, "Blob service request");
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result.map_err(|e| classify(e, what)),
            Err(_) => Err(StoreError::Transport(format!("{} timed out after {:?}", what, self.timeout))),
        }
    }
}

/// Map an SDK failure onto the store's error vocabulary.
fn classify(err: azure_core::Error, what: &str) -> StoreError {
    match err.kind() {
        ErrorKind::HttpResponse { status, error_code } => {
            let status = u16::from(*status);
            let code = error_code.as_deref().unwrap_or_default();
            match (status, code) {
                (404, _) => StoreError::NotFound(what.to_string()),
                (409, "ContainerAlreadyExists" | "BlobAlreadyExists") | (412, _) => {
                    StoreError::AlreadyExists(what.to_string())
                }
                _ => StoreError::Unexpected {
                    status,
                    message: if code.is_empty() { err.to_string() } else { code.to_string() },
                },
            }
        }
        _ => StoreError::Transport(err.to_string()),
    }
}

#[async_trait]
impl BlobStorePort for AzureBlobStore {
    async fn get_container_properties(&self, container: &str) -> Result<ContainerProperties, StoreError> {
        let client = self.service.container_client(container);
        let resp = self.call(container, client.get_properties().into_future()).await?;
        Ok(ContainerProperties { name: resp.container.name })
    }

    async fn create_container(&self, container: &str) -> Result<(), StoreError> {
        let client = self.service.container_client(container);
        self.call(container, client.create().into_future()).await
    }

    async fn get_blob_properties(&self, container: &str, blob: &str) -> Result<BlobProperties, StoreError> {
        let client = self.service.container_client(container).blob_client(blob);
        let what = format!("{}/{}", container, blob);
        let resp = self.call(&what, client.get_properties().into_future()).await?;
        Ok(BlobProperties { content_length: resp.blob.properties.content_length })
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let client = self.service.container_client(container).blob_client(blob);
        let mut put = client.put_block_blob(data).content_type(content_type.to_string());
        if !overwrite {
            put = put.if_match(IfMatchCondition::NotMatch("*".into()));
        }
        self.call(&format!("{}/{}", container, blob), put.into_future()).await?;
        Ok(())
    }

    async fn download_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>, StoreError> {
        let client = self.service.container_client(container).blob_client(blob);
        self.call(&format!("{}/{}", container, blob), client.get_content()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sas_store(server: &MockServer) -> AzureBlobStore {
        AzureBlobStore::connect(
            &format!("BlobEndpoint={}/acct;SharedAccessSignature=sv=2021-08-06&sig=abc", server.uri()),
            &HttpConfig::default(),
        )
        .unwrap()
    }

    fn put_ok() -> ResponseTemplate {
        ResponseTemplate::new(201)
            .insert_header("etag", "\"0x8D0\"")
            .insert_header("last-modified", "Mon, 01 Jan 2024 00:00:00 GMT")
            .insert_header("date", "Mon, 01 Jan 2024 00:00:00 GMT")
            .insert_header("x-ms-request-id", "00000000-0000-0000-0000-000000000001")
            .insert_header("x-ms-request-server-encrypted", "true")
    }

    #[tokio::test]
    async fn missing_container_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/acct/data"))
            .and(query_param("restype", "container"))
            .and(query_param("sig", "abc"))
            .respond_with(ResponseTemplate::new(404).insert_header("x-ms-error-code", "ContainerNotFound"))
            .mount(&server)
            .await;

        let err = sas_store(&server).get_container_properties("data").await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("data".into()));
    }

    #[tokio::test]
    async fn create_container_succeeds_and_race_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/acct/fresh"))
            .and(query_param("restype", "container"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/acct/data"))
            .and(query_param("restype", "container"))
            .respond_with(ResponseTemplate::new(409).insert_header("x-ms-error-code", "ContainerAlreadyExists"))
            .mount(&server)
            .await;

        let store = sas_store(&server);
        store.create_container("fresh").await.unwrap();
        let err = store.create_container("data").await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists("data".into()));
    }

    #[tokio::test]
    async fn upload_sends_block_blob_with_the_callers_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/acct/data/rss/bbc/a.txt"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .and(header("x-ms-blob-content-type", "application/rss+xml"))
            .respond_with(put_ok())
            .expect(1)
            .mount(&server)
            .await;

        sas_store(&server)
            .upload_blob("data", "rss/bbc/a.txt", b"<rss/>".to_vec(), "application/rss+xml", true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn conditional_upload_conflict_is_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/acct/data/rss/.keep"))
            .and(header("if-none-match", "*"))
            .respond_with(ResponseTemplate::new(409).insert_header("x-ms-error-code", "BlobAlreadyExists"))
            .mount(&server)
            .await;

        let err = sas_store(&server)
            .upload_blob("data", "rss/.keep", Vec::new(), "application/octet-stream", false)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists("data/rss/.keep".into()));
    }

    #[tokio::test]
    async fn download_classifies_missing_and_auth_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acct/data/urls.json"))
            .respond_with(ResponseTemplate::new(404).insert_header("x-ms-error-code", "BlobNotFound"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/acct/data/secret.json"))
            .respond_with(ResponseTemplate::new(403).insert_header("x-ms-error-code", "AuthorizationFailure"))
            .mount(&server)
            .await;

        let store = sas_store(&server);
        assert!(store.download_blob("data", "urls.json").await.unwrap_err().is_not_found());
        let err = store.download_blob("data", "secret.json").await.unwrap_err();
        assert_eq!(err, StoreError::Unexpected { status: 403, message: "AuthorizationFailure".into() });
    }

    #[tokio::test]
    async fn account_key_requests_are_signed() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/acct/data/a.txt"))
            .and(header_exists("authorization"))
            .and(header_exists("x-ms-date"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let store = AzureBlobStore::connect(
            &format!("AccountName=acct;AccountKey=c2VjcmV0;BlobEndpoint={}/acct", server.uri()),
            &HttpConfig::default(),
        )
        .unwrap();
        assert_eq!(store.account(), "acct");
        assert!(store.get_blob_properties("data", "a.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let store = AzureBlobStore::connect(
            "BlobEndpoint=http://127.0.0.1:9/acct;SharedAccessSignature=sig=x",
            &HttpConfig::default(),
        )
        .unwrap();
        let err = store.get_container_properties("data").await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }

    #[tokio::test]
    async fn slow_service_is_cut_off_by_the_configured_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/acct/data"))
            .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let http = HttpConfig { timeout_secs: 1, ..HttpConfig::default() };
        let store = AzureBlobStore::connect(
            &format!("BlobEndpoint={}/acct;SharedAccessSignature=sig=x", server.uri()),
            &http,
        )
        .unwrap();

        let started = std::time::Instant::now();
        let err = store.get_container_properties("data").await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(ref m) if m.contains("timed out")), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
