//! Application state: configuration, roster snapshot, history store and the mutation gate.
//!
//! This module owns:
//!   - the lottery configuration (cap, roll-number rule, catalog)
//!   - the roster snapshot, replaced only by an explicit reload
//!   - the history store (file or remote)
//!   - a process-wide gate so "read counts -> select -> append" runs as one step
//!
//! History itself is never cached here; every operation re-reads the store.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{info, instrument, warn};

use crate::config::{load_lottery_config_from_env, LotteryConfig};
use crate::error::LotteryError;
use crate::history::{build_store, HistoryStore};
use crate::roster::Roster;

pub struct AppState {
  pub config: Arc<LotteryConfig>,
  roster: RwLock<Arc<Roster>>,
  pub store: Arc<dyn HistoryStore>,
  gate: Mutex<()>,
}

impl AppState {
  /// Build state from env: load config, open the history store, read the roster.
  #[instrument(level = "info", skip_all)]
  pub async fn from_env() -> Result<Self, LotteryError> {
    let config = load_lottery_config_from_env();
    Self::new(config).await
  }

  #[instrument(level = "info", skip_all)]
  pub async fn new(config: LotteryConfig) -> Result<Self, LotteryError> {
    let store = build_store(&config.history)?;
    let roster = Roster::load(&config.roster).await?;
    log_roster_inventory(&roster, &config);
    info!(
      target: "topic_lottery_backend",
      backend = store.backend(),
      students = roster.len(),
      catalog = config.catalog.len(),
      cap = config.max_assignments_per_topic,
      "Lottery state ready"
    );
    Ok(Self::from_parts(config, roster, store))
  }

  pub fn from_parts(config: LotteryConfig, roster: Roster, store: Arc<dyn HistoryStore>) -> Self {
    Self {
      config: Arc::new(config),
      roster: RwLock::new(Arc::new(roster)),
      store,
      gate: Mutex::new(()),
    }
  }

  /// Current roster snapshot.
  pub async fn roster(&self) -> Arc<Roster> {
    self.roster.read().await.clone()
  }

  /// Re-read the roster file and swap the snapshot. The old one stays on error.
  #[instrument(level = "info", skip(self))]
  pub async fn reload_roster(&self) -> Result<Arc<Roster>, LotteryError> {
    let fresh = Arc::new(Roster::load(&self.config.roster).await?);
    log_roster_inventory(&fresh, &self.config);
    *self.roster.write().await = fresh.clone();
    Ok(fresh)
  }

  /// Serialize mutating lottery operations.
  pub async fn gate(&self) -> MutexGuard<'_, ()> {
    self.gate.lock().await
  }
}

fn log_roster_inventory(roster: &Roster, config: &LotteryConfig) {
  let unknown = roster.unknown_topics(&config.catalog);
  if !unknown.is_empty() {
    warn!(target: "roster", count = unknown.len(), topics = ?unknown, "Roster mentions topics missing from the catalog");
  }
  if roster.is_empty() {
    warn!(target: "roster", "Roster is empty; every student will draw from the unassigned pool");
  }
}
