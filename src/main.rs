use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use rss_ingest::app::config_loader::ConfigLoad;
use rss_ingest::app::AppContext;
use rss_ingest::config::AppConfig;
use rss_ingest::{logging, metrics, server, tasks};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rss_ingest")]
#[command(about = "Fetch configured RSS/news sources and archive raw payloads into blob storage")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run ingestion cycles for a routing key
    #[command(group(ArgGroup::new("repeat").args(["every", "schedule"])))]
    Ingest {
        /// Routing key to ingest (defaults to the configured key)
        #[arg(long, conflicts_with = "all")]
        key: Option<String>,
        /// Ingest every source regardless of key
        #[arg(long)]
        all: bool,
        /// Repeat every SECS seconds instead of running once
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
        /// Repeat on the configured ingest.interval_secs
        #[arg(long)]
        schedule: bool,
        /// Stop after N cycles (only with --every or --schedule)
        #[arg(long, requires = "repeat")]
        cycles: Option<u64>,
    },
    /// Serve the configuration UI, write endpoint, health and metrics
    Serve {
        #[arg(long)]
        port: Option<u16>,
        /// Also run ingestion in the background on the configured interval
        #[arg(long)]
        schedule: bool,
    },
    /// Fetch one URL and store it under a folder of the data container
    Fetch {
        #[arg(long)]
        url: String,
        #[arg(long)]
        folder: String,
    },
    /// Ensure a container (and optionally a virtual folder) exists
    Provision {
        #[arg(long)]
        container: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Overwrite a blob with the JSON read from a local file
    WriteBlob {
        #[arg(long)]
        container: String,
        #[arg(long)]
        blob: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the configured sources, optionally filtered by routing key
    ShowConfig {
        #[arg(long)]
        key: Option<String>,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _guard = logging::init_logging(&config.logging.dir);
    metrics::init_metrics();
    info!(backend = ?config.storage.backend, "Configuration loaded");

    let ctx = AppContext::from_config(config).context("Failed to initialise storage and HTTP clients")?;

    match cli.command {
        Commands::Ingest { key, all, every, schedule, cycles } => {
            let key = if all { None } else { key.or_else(|| ctx.config.ingest.routing_key.clone()) };
            match (every, schedule) {
                (Some(secs), _) => {
                    let every = Duration::from_secs(secs.max(1));
                    let summary = tasks::run_on_interval(&ctx.ingest, key.as_deref(), every, cycles).await;
                    print_json(&summary)?;
                }
                (None, true) => {
                    let summary = tasks::run_configured(&ctx, key.as_deref(), cycles).await;
                    print_json(&summary)?;
                }
                (None, false) => {
                    let report = ctx.ingest.run_cycle(key.as_deref()).await?;
                    if !report.failures.is_empty() {
                        warn!("{} source(s) failed", report.failures.len());
                    }
                    print_json(&report)?;
                }
            }
        }
        Commands::Serve { port, schedule } => {
            let port = port.unwrap_or(ctx.config.server.port);
            if schedule {
                let background = ctx.clone();
                info!(every_secs = background.config.ingest.interval_secs, "Starting background ingestion");
                tokio::spawn(async move {
                    let key = background.config.ingest.routing_key.clone();
                    tasks::run_configured(&background, key.as_deref(), None).await
                });
            }
            server::start_server(ctx, port).await?;
        }
        Commands::Fetch { url, folder } => {
            let container = ctx.fetcher.container().to_string();
            ctx.provisioner.ensure(&container, Some(&folder)).await?;
            let stored = ctx.fetcher.fetch_and_store(&url, &folder).await?;
            print_json(&stored)?;
        }
        Commands::Provision { container, folder } => {
            let outcome = ctx.provisioner.ensure(&container, folder.as_deref()).await?;
            println!(
                "container {}: {}; folder marker: {}",
                container,
                if outcome.container_created { "created" } else { "present" },
                if outcome.marker_created { "created" } else { "present or not requested" }
            );
        }
        Commands::WriteBlob { container, blob, file } => {
            let raw = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let data: serde_json::Value =
                serde_json::from_slice(&raw).with_context(|| format!("{} is not valid JSON", file.display()))?;
            let bytes = ctx.writer.overwrite(&container, &blob, &data).await?;
            println!("Wrote {} bytes to {}/{}", bytes, container, blob);
        }
        Commands::ShowConfig { key } => match ctx.loader.load(key.as_deref()).await {
            ConfigLoad::Loaded(entries) => print_json(&entries)?,
            ConfigLoad::NotAvailable(reason) => println!("Configuration not available: {}", reason),
        },
    }
    Ok(())
}
