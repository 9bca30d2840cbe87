//! Bazaar HTTP server wiring.
//!
//! Configuration, the collaborator subscribers that observe committed
//! commerce events, and the top-level router. The binary in `main.rs` only
//! reads configuration and serves [`app`].

pub mod collaborators;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use bazaar_core::{Commerce, store::CommerceStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BAZAAR_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// How long a writer waits for the database lock before the request fails
  /// with `CONTENTION_RETRY`.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("bazaar.db") }

fn default_busy_timeout_ms() -> u64 { 5_000 }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            default_host(),
      port:            default_port(),
      store_path:      default_store_path(),
      busy_timeout_ms: default_busy_timeout_ms(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }

  /// The store path with a leading `~/` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The complete application: the JSON API with request tracing.
pub fn app<S>(commerce: Arc<Commerce<S>>) -> Router
where
  S: CommerceStore + 'static,
{
  bazaar_api::api_router(commerce).layer(TraceLayer::new_for_http())
}
