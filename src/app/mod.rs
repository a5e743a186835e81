pub mod config_loader;
pub mod config_writer;
pub mod content_fetcher;
pub mod ingest_use_case;
pub mod path_provisioner;
pub mod ports;

use crate::app::config_loader::ConfigLoader;
use crate::app::config_writer::ConfigWriter;
use crate::app::content_fetcher::ContentFetcher;
use crate::app::ingest_use_case::IngestUseCase;
use crate::app::path_provisioner::PathProvisioner;
use crate::app::ports::{BlobStorePort, HttpClientPort};
use crate::config::AppConfig;
use crate::error::Result;
use crate::infra::{build_store, http_client::ReqwestHttp};
use std::sync::Arc;

/// Every component, wired from one `AppConfig`. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn BlobStorePort>,
    pub loader: ConfigLoader,
    pub provisioner: PathProvisioner,
    pub fetcher: ContentFetcher,
    pub writer: ConfigWriter,
    pub ingest: IngestUseCase,
}

impl AppContext {
    /// Build the real adapters (object store backend, reqwest client) from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let store = build_store(&config.storage, &config.http)?;
        let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::new(&config.http)?);
        Ok(Self::new(config, store, http))
    }

    pub fn new(config: AppConfig, store: Arc<dyn BlobStorePort>, http: Arc<dyn HttpClientPort>) -> Self {
        let storage = &config.storage;
        let loader = ConfigLoader::new(store.clone(), &storage.config_container, &storage.config_blob);
        let provisioner = PathProvisioner::new(store.clone());
        let fetcher = ContentFetcher::new(http, store.clone(), &storage.data_container);
        let writer = ConfigWriter::new(store.clone());
        let ingest = IngestUseCase::new(loader.clone(), provisioner.clone(), fetcher.clone());

        Self {
            config: Arc::new(config),
            store,
            loader,
            provisioner,
            fetcher,
            writer,
            ingest,
        }
    }
}
