use crate::app::ports::BlobStorePort;
use crate::metrics::ConfigMetrics;
use crate::types::{ConfigDocument, SourceEntry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why the configuration document could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// The document does not exist (yet).
    Missing,
    /// The store refused or failed the read.
    Unreadable(String),
    /// The document exists but is not a recognised configuration shape.
    Malformed(String),
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::Missing => write!(f, "configuration document not found"),
            Unavailable::Unreadable(msg) => write!(f, "configuration document unreadable: {}", msg),
            Unavailable::Malformed(msg) => write!(f, "configuration document malformed: {}", msg),
        }
    }
}

/// Outcome of a configuration load. `NotAvailable` is an expected runtime condition, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoad {
    Loaded(Vec<SourceEntry>),
    NotAvailable(Unavailable),
}

/// Reads the shared URL configuration document from the store, fresh on every call.
#[derive(Clone)]
pub struct ConfigLoader {
    store: Arc<dyn BlobStorePort>,
    container: String,
    blob: String,
}

impl ConfigLoader {
    pub fn new(store: Arc<dyn BlobStorePort>, container: &str, blob: &str) -> Self {
        Self { store, container: container.to_string(), blob: blob.to_string() }
    }

    pub fn location(&self) -> (&str, &str) {
        (&self.container, &self.blob)
    }

    /// Load the source entries, keeping only those whose key equals `routing_key`.
    ///
    /// A missing or blank routing key returns the full list.
    pub async fn load(&self, routing_key: Option<&str>) -> ConfigLoad {
        let routing_key = routing_key.map(str::trim).filter(|k| !k.is_empty());

        let bytes = match self.fetch().await {
            Ok(bytes) => bytes,
            Err(reason) => return self.not_available(reason),
        };

        let document = match ConfigDocument::parse(&bytes) {
            Ok(doc) => doc,
            Err(e) => return self.not_available(Unavailable::Malformed(e.to_string())),
        };

        let entries = document.filter(routing_key);
        debug!(
            routing_key = routing_key.unwrap_or("<all>"),
            total = document.entries.len(),
            selected = entries.len(),
            "Loaded source configuration"
        );
        ConfigMetrics::record_load("loaded");
        ConfigLoad::Loaded(entries)
    }

    /// The raw document as stored, for display. Fails the same way `load` does.
    pub async fn load_document(&self) -> Result<serde_json::Value, Unavailable> {
        let bytes = self.fetch().await?;
        serde_json::from_slice(&bytes).map_err(|e| Unavailable::Malformed(e.to_string()))
    }

    async fn fetch(&self) -> Result<Vec<u8>, Unavailable> {
        match self.store.download_blob(&self.container, &self.blob).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.is_not_found() => Err(Unavailable::Missing),
            Err(e) => Err(Unavailable::Unreadable(e.to_string())),
        }
    }

    fn not_available(&self, reason: Unavailable) -> ConfigLoad {
        match &reason {
            Unavailable::Missing => {
                info!(container = %self.container, blob = %self.blob, "No source configuration found");
                ConfigMetrics::record_load("missing");
            }
            Unavailable::Unreadable(_) => {
                warn!(container = %self.container, blob = %self.blob, "{}", reason);
                ConfigMetrics::record_load("unreadable");
            }
            Unavailable::Malformed(_) => {
                warn!(container = %self.container, blob = %self.blob, "{}", reason);
                ConfigMetrics::record_load("malformed");
            }
        }
        ConfigLoad::NotAvailable(reason)
    }
}
