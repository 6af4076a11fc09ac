//! Durable assignment history.
//!
//! Two backends share one contract: a local JSON file rewritten wholesale on
//! every mutation, and a remote row-table service reached over HTTP. Counts
//! are never persisted; callers derive them from `History::counts`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::HistoryConfig;
use crate::domain::History;
use crate::error::StoreError;

pub mod file;
pub mod remote;

pub use file::JsonFileStore;
pub use remote::RemoteSheetStore;

#[async_trait]
pub trait HistoryStore: Send + Sync {
  /// Short backend name for logs and the health endpoint.
  fn backend(&self) -> &'static str;

  /// Read every active assignment and every exclusion.
  async fn load_all(&self) -> Result<History, StoreError>;

  async fn append_assignment(&self, roll: &str, topic: &str) -> Result<(), StoreError>;

  /// Record `(roll, topic)` as an exclusion, then drop the active assignment.
  async fn archive_assignment(&self, roll: &str, topic: &str) -> Result<(), StoreError>;
}

/// Build the configured backend.
pub fn build_store(cfg: &HistoryConfig) -> Result<Arc<dyn HistoryStore>, StoreError> {
  let store: Arc<dyn HistoryStore> = match cfg {
    HistoryConfig::File { path } => {
      let file = JsonFileStore::new(path.clone());
      info!(target: "history", path = %file.path().display(), "Using local JSON history file");
      Arc::new(file)
    }
    HistoryConfig::Remote(remote) => Arc::new(RemoteSheetStore::from_config(remote)?),
  };
  info!(target: "history", backend = store.backend(), "History store ready");
  Ok(store)
}
