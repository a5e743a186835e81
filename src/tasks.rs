use crate::app::ingest_use_case::IngestUseCase;
use crate::app::AppContext;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Shortest period the ticker accepts. `tokio::time::interval` panics on zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub stored: u64,
}

/// Run ingestion cycles on the configured `ingest.interval_secs`.
///
/// Used by `ingest --schedule` and by `serve --schedule` as a background task.
pub async fn run_configured(ctx: &AppContext, routing_key: Option<&str>, max_cycles: Option<u64>) -> ScheduleSummary {
    run_on_interval(&ctx.ingest, routing_key, ctx.config.ingest.interval(), max_cycles).await
}

/// Run ingestion cycles every `every` until `max_cycles` have run or Ctrl-C is received.
///
/// The first cycle starts immediately.
pub async fn run_on_interval(
    use_case: &IngestUseCase,
    routing_key: Option<&str>,
    every: Duration,
    max_cycles: Option<u64>,
) -> ScheduleSummary {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_until(use_case, routing_key, every, max_cycles, shutdown).await
}

/// Like `run_on_interval`, stopping when `shutdown` resolves instead of on Ctrl-C.
///
/// A cycle in progress is allowed to finish; cycles never overlap.
pub async fn run_until<F>(
    use_case: &IngestUseCase,
    routing_key: Option<&str>,
    every: Duration,
    max_cycles: Option<u64>,
    shutdown: F,
) -> ScheduleSummary
where
    F: Future<Output = ()>,
{
    let every = every.max(MIN_PERIOD);
    let mut summary = ScheduleSummary::default();
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(every_secs = every.as_secs_f64(), max_cycles = ?max_cycles, "Scheduler started");
    loop {
        if max_cycles.is_some_and(|max| summary.cycles >= max) {
            break;
        }
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {}
        }

        summary.cycles += 1;
        match use_case.run_cycle(routing_key).await {
            Ok(report) => summary.stored += report.stored.len() as u64,
            Err(e) => {
                summary.failed_cycles += 1;
                error!(kind = e.kind().as_str(), "Ingest cycle failed: {}", e);
            }
        }
    }
    info!(cycles = summary.cycles, failed = summary.failed_cycles, stored = summary.stored, "Scheduler stopped");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config_loader::ConfigLoader;
    use crate::app::content_fetcher::ContentFetcher;
    use crate::app::path_provisioner::PathProvisioner;
    use crate::app::ports::{BlobStorePort, HttpClientPort, HttpGetResult};
    use crate::config::AppConfig;
    use crate::infra::memory_store::InMemoryBlobStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Instant;

    struct Feed;

    #[async_trait]
    impl HttpClientPort for Feed {
        async fn get(&self, _url: &str) -> std::result::Result<HttpGetResult, String> {
            Ok(HttpGetResult {
                status: 200,
                bytes: b"<rss/>".to_vec(),
                content_type: "application/rss+xml".into(),
                etag: None,
                last_modified: None,
            })
        }
    }

    fn use_case(store: &InMemoryBlobStore) -> IngestUseCase {
        let store: Arc<dyn BlobStorePort> = Arc::new(store.clone());
        IngestUseCase::new(
            ConfigLoader::new(store.clone(), "data", "urls.json"),
            PathProvisioner::new(store.clone()),
            ContentFetcher::new(Arc::new(Feed), store, "data"),
        )
    }

    #[tokio::test]
    async fn stops_after_max_cycles() {
        let store = InMemoryBlobStore::new();
        store.insert_blob("data", "urls.json", br#"[{"key":"rss","url":"http://x/1","source":"bbc"}]"#);

        let started = Instant::now();
        let summary =
            run_until(&use_case(&store), Some("rss"), Duration::from_millis(20), Some(3), std::future::pending()).await;

        assert_eq!(summary, ScheduleSummary { cycles: 3, failed_cycles: 0, stored: 3 });
        assert!(started.elapsed() >= Duration::from_millis(40));
        let payloads = store.blob_names("data").into_iter().filter(|n| n.ends_with(".txt")).count();
        assert_eq!(payloads, 3);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let store = InMemoryBlobStore::new();
        let summary = run_until(&use_case(&store), None, Duration::from_secs(3600), None, async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await;
        // First tick fires immediately; the next is an hour away.
        assert_eq!(summary.cycles, 1);
    }

    #[tokio::test]
    async fn unreachable_store_skips_cycles_without_failing_them() {
        let store = InMemoryBlobStore::new();
        store.set_offline(true);

        let summary =
            run_until(&use_case(&store), Some("rss"), Duration::from_millis(5), Some(2), std::future::pending()).await;

        assert_eq!(summary, ScheduleSummary { cycles: 2, failed_cycles: 0, stored: 0 });
    }

    #[tokio::test]
    async fn zero_period_is_clamped_instead_of_panicking() {
        let store = InMemoryBlobStore::new();
        store.insert_blob("data", "urls.json", br#"[{"key":"rss","url":"http://x/1","source":"bbc"}]"#);

        let summary = run_until(&use_case(&store), Some("rss"), Duration::ZERO, Some(2), std::future::pending()).await;

        assert_eq!(summary, ScheduleSummary { cycles: 2, failed_cycles: 0, stored: 2 });
    }

    #[tokio::test]
    async fn configured_interval_paces_the_cycles() {
        let memory = InMemoryBlobStore::new();
        memory.insert_blob("data", "urls.json", br#"[{"key":"rss","url":"http://x/1","source":"bbc"}]"#);
        let mut config = AppConfig::default();
        config.ingest.interval_secs = 1;
        let ctx = AppContext::new(config, Arc::new(memory.clone()), Arc::new(Feed));

        let started = Instant::now();
        let summary = run_configured(&ctx, Some("rss"), Some(2)).await;

        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.stored, 2);
        // Second cycle waits one configured period; the 300 s default would not finish.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(10), "{:?}", elapsed);
    }
}
