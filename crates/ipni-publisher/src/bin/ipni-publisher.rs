//! # ipni-publisher CLI
//!
//! Runs one queue batch through the content handler or the advertisement
//! publisher. Configuration comes from the environment (see
//! [`PublisherConfig::from_env`]); the batch is a queue event document
//! `{"Records":[{"body":"..."}]}` read from a file or stdin.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;

use ipni_publisher::core::Event;
use ipni_publisher::store::{ObjectStore, SqliteStore};
use ipni_publisher::{
    http_client, telemetry, ContentHandler, IndexerClient, Publisher, PublisherConfig,
    PublisherIdentities, StoreHeadFetcher,
};

/// Publish IPNI advertisement chains.
#[derive(Parser, Debug)]
#[command(name = "ipni-publisher", version, about, long_about = None)]
struct Cli {
    /// SQLite object store path.
    #[arg(long, global = true, default_value = "ipni-publisher.db")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build, sign and store one advertisement per record, then move the head.
    Advertise(AdvertiseArgs),

    /// Pack the batch's multihashes into one entries block and print its CID.
    Content(ContentArgs),
}

#[derive(Args, Debug)]
struct AdvertiseArgs {
    /// Queue event file, or `-` for stdin.
    #[arg(long)]
    event: PathBuf,

    /// Read the previous head from the object store instead of over HTTP.
    #[arg(long)]
    head_from_store: bool,
}

#[derive(Args, Debug)]
struct ContentArgs {
    /// Queue event file, or `-` for stdin.
    #[arg(long)]
    event: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init_logging() {
        eprintln!("cannot initialize logging: {e}");
    }

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder unavailable");
            None
        }
    };
    telemetry::describe_metrics();

    let result = run(cli).await;

    if let Some(handle) = metrics {
        tracing::info!(metrics = %handle.render(), "metrics snapshot");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PublisherConfig::from_env().context("loading configuration")?;
    let store: Arc<dyn ObjectStore> = Arc::new(
        SqliteStore::open(&cli.store)
            .with_context(|| format!("opening object store {}", cli.store.display()))?,
    );

    match cli.command {
        Commands::Advertise(args) => {
            let event = read_event(&args.event)?;
            let identities = PublisherIdentities::load(store.as_ref(), &config).await?;
            let publisher = if args.head_from_store {
                let head = Arc::new(StoreHeadFetcher::new(store.clone(), config.bucket.clone()));
                let indexer = IndexerClient::new(http_client(&config)?, config.announce_url());
                Publisher::new(config, store, head, indexer, identities)
            } else {
                Publisher::from_config(config, store, identities)?
            };

            let report = publisher.process(&event).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Content(args) => {
            let event = read_event(&args.event)?;
            let handler = ContentHandler::new(store, config.bucket.clone());
            if let Some(cid) = handler.process(&event).await? {
                println!("{cid}");
            }
        }
    }

    Ok(())
}

fn read_event(path: &Path) -> anyhow::Result<Event> {
    let bytes = if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("reading event from stdin")?;
        buf
    } else {
        std::fs::read(path).with_context(|| format!("reading event {}", path.display()))?
    };
    serde_json::from_slice(&bytes).context("parsing queue event")
}
