//! Prometheus metrics for the ingestion pipeline.
//!
//! Each phase owns a small struct of recording helpers so call sites stay
//! one-liners and metric names live in one place.

use crate::error::FaultKind;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub const FETCH_SUCCESS: &str = "rss_ingest_sources_fetch_success_total";
pub const FETCH_ERROR: &str = "rss_ingest_sources_fetch_error_total";
pub const FETCH_DURATION: &str = "rss_ingest_sources_fetch_duration_seconds";
pub const PAYLOAD_BYTES: &str = "rss_ingest_sources_payload_bytes";
pub const UPLOADS: &str = "rss_ingest_storage_uploads_total";
pub const CONTAINERS_CREATED: &str = "rss_ingest_storage_containers_created_total";
pub const CONTAINER_RACES: &str = "rss_ingest_storage_container_races_total";
pub const MARKERS_CREATED: &str = "rss_ingest_storage_markers_created_total";
pub const CONFIG_LOADS: &str = "rss_ingest_config_loads_total";
pub const CYCLES: &str = "rss_ingest_cycles_total";

/// Install the global Prometheus recorder. Idempotent.
///
/// No HTTP listener is started; the handle is rendered by the `/metrics` route.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = HANDLE.set(handle);
            info!("Prometheus recorder installed");
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    });
}

/// Render the current metrics in Prometheus text format, if the recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

pub struct SourcesMetrics;

impl SourcesMetrics {
    pub fn record_fetch_success(duration_secs: f64, payload_bytes: usize) {
        ::metrics::counter!(FETCH_SUCCESS).increment(1);
        ::metrics::histogram!(FETCH_DURATION).record(duration_secs);
        ::metrics::histogram!(PAYLOAD_BYTES).record(payload_bytes as f64);
    }

    pub fn record_fetch_error(kind: FaultKind) {
        ::metrics::counter!(FETCH_ERROR, "kind" => kind.as_str()).increment(1);
    }
}

pub struct StorageMetrics;

impl StorageMetrics {
    pub fn record_upload() {
        ::metrics::counter!(UPLOADS).increment(1);
    }

    pub fn record_container_created() {
        ::metrics::counter!(CONTAINERS_CREATED).increment(1);
    }

    /// Another caller created the container between our check and our create.
    pub fn record_container_race() {
        ::metrics::counter!(CONTAINER_RACES).increment(1);
    }

    pub fn record_marker_created() {
        ::metrics::counter!(MARKERS_CREATED).increment(1);
    }
}

pub struct ConfigMetrics;

impl ConfigMetrics {
    pub fn record_load(outcome: &'static str) {
        ::metrics::counter!(CONFIG_LOADS, "outcome" => outcome).increment(1);
    }

    pub fn record_cycle() {
        ::metrics::counter!(CYCLES).increment(1);
    }
}
