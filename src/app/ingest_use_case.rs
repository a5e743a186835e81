use crate::app::config_loader::{ConfigLoad, ConfigLoader};
use crate::app::content_fetcher::ContentFetcher;
use crate::app::path_provisioner::PathProvisioner;
use crate::error::{IngestError, Result};
use crate::metrics::ConfigMetrics;
use crate::types::StoredObject;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub url: String,
    pub kind: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub cycle_id: Uuid,
    pub routing_key: Option<String>,
    pub config_available: bool,
    pub stored: Vec<StoredObject>,
    pub skipped_inactive: usize,
    pub failures: Vec<SourceFailure>,
}

impl IngestReport {
    fn new(routing_key: Option<&str>) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            routing_key: routing_key.map(str::to_string),
            config_available: false,
            stored: Vec::new(),
            skipped_inactive: 0,
            failures: Vec::new(),
        }
    }
}

/// One ingestion pass: load the configuration, then provision and fetch every active source.
///
/// Per-source faults are logged and collected; the cycle carries on with the next source.
#[derive(Clone)]
pub struct IngestUseCase {
    loader: ConfigLoader,
    provisioner: PathProvisioner,
    fetcher: ContentFetcher,
}

impl IngestUseCase {
    pub fn new(loader: ConfigLoader, provisioner: PathProvisioner, fetcher: ContentFetcher) -> Self {
        Self { loader, provisioner, fetcher }
    }

    pub async fn run_cycle(&self, routing_key: Option<&str>) -> Result<IngestReport> {
        let routing_key = routing_key.map(str::trim).filter(|k| !k.is_empty());
        let mut report = IngestReport::new(routing_key);
        let span = info_span!("ingest_cycle", cycle_id = %report.cycle_id, key = routing_key.unwrap_or("<all>"));
        ConfigMetrics::record_cycle();

        async {
            let entries = match self.loader.load(routing_key).await {
                ConfigLoad::Loaded(entries) => entries,
                ConfigLoad::NotAvailable(reason) => {
                    info!("Skipping cycle: {}", reason);
                    return Ok(());
                }
            };
            report.config_available = true;

            let container = self.fetcher.container().to_string();
            if let Some(key) = routing_key {
                self.provisioner.ensure(&container, Some(key)).await?;
            }

            for entry in entries {
                if !entry.active {
                    report.skipped_inactive += 1;
                    continue;
                }
                let folder = entry.folder();
                let outcome = async {
                    self.provisioner.ensure(&container, Some(&folder)).await?;
                    self.fetcher.fetch_and_store(&entry.url, &folder).await
                }
                .instrument(info_span!("source", source = %entry.source))
                .await;

                match outcome {
                    Ok(stored) => report.stored.push(stored),
                    Err(e) => {
                        warn!(source = %entry.source, url = %entry.url, "Source failed: {}", e);
                        report.failures.push(SourceFailure {
                            source: entry.source.clone(),
                            url: entry.url.clone(),
                            kind: e.kind().as_str(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            info!(
                stored = report.stored.len(),
                failed = report.failures.len(),
                skipped_inactive = report.skipped_inactive,
                "Ingest cycle finished"
            );
            Ok::<(), IngestError>(())
        }
        .instrument(span)
        .await?;

        Ok(report)
    }
}
