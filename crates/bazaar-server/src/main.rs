//! bazaar-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `BAZAAR_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use bazaar_core::{Commerce, events::EventBus};
use bazaar_server::{
  ServerConfig,
  collaborators::{AnalyticsCounters, InvoiceTrigger, NotificationLog},
};
use bazaar_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Bazaar commerce server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("BAZAAR").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open_with(&store_path, server_cfg.busy_timeout())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let events = EventBus::new()
    .with(Arc::new(NotificationLog))
    .with(Arc::new(InvoiceTrigger::default()))
    .with(Arc::new(AnalyticsCounters::default()));
  let commerce = Arc::new(Commerce::with_events(store, events));

  let app = bazaar_server::app(commerce);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
