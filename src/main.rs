//! Giáo Án Pro · lesson-plan upgrade backend
//!
//! - Axum HTTP API consumed by the browser form
//! - Gemini `generateContent` with an ordered model fallback
//! - Word (.doc) and simulation (.html) exports
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   APP_CONFIG_PATH  : path to TOML config (prompts, model list, limits)
//!   SETTINGS_PATH    : settings file (default "./data/settings.json")
//!   GEMINI_API_KEY   : seeds the credential when the settings file has none
//!   GEMINI_MODEL     : seeds the preferred model when the settings file has none
//!   GEMINI_BASE_URL  : default "https://generativelanguage.googleapis.com/v1beta"
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod settings;
mod prompt;
mod gemini;
mod fallback;
mod export;
mod state;
mod protocol;
mod error;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: config, persisted settings, Gemini client, plan store.
  let state = Arc::new(AppState::from_env()?);

  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "giaoan", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "giaoan", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "giaoan", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
}
