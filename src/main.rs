//! Topic Lottery · classroom exercise assignment backend
//!
//! - Axum HTTP API: student submission / re-roll, admin history + un-assign
//! - Roster CSV (roll number -> self-selected topics), loaded at startup
//! - History in a local JSON file or a remote row-table service
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   LOTTERY_CONFIG_PATH : path to TOML config (cap, catalog, roster columns, history backend)
//!   ROSTER_PATH         : overrides `roster.path` from the config
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod catalog;
mod config;
mod domain;
mod error;
mod history;
mod logic;
mod pool;
mod protocol;
mod roster;
mod routes;
mod selector;
mod state;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // The roster is required: without it nobody can be matched to their choices.
  let state = match AppState::from_env().await {
    Ok(s) => Arc::new(s),
    Err(e) => {
      error!(target: "topic_lottery_backend", error = %e, "Cannot start without roster and history store");
      return Err(e.into());
    }
  };

  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "topic_lottery_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "topic_lottery_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "topic_lottery_backend", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
}
