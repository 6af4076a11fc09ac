//! Local JSON file backend.
//!
//! Layout: `{"assignments": {roll: topic}, "exclusions": {roll: [topic]}}`.
//! The whole document is read on every call and rewritten (temp file + rename)
//! on every mutation. A missing file is an empty history.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::domain::History;
use crate::error::StoreError;
use crate::history::HistoryStore;

pub struct JsonFileStore {
  path: PathBuf,
  // serializes read-modify-write cycles on the file
  write_lock: Mutex<()>,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), write_lock: Mutex::new(()) }
  }

  pub fn path(&self) -> &Path { &self.path }

  async fn read(&self) -> Result<History, StoreError> {
    let bytes = match tokio::fs::read(&self.path).await {
      Ok(b) => b,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(History::default()),
      Err(source) => return Err(StoreError::Io { path: self.path.clone(), source }),
    };
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
      return Ok(History::default());
    }
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode { path: self.path.clone(), source })
  }

  async fn write(&self, history: &History) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(history)
      .map_err(|source| StoreError::Decode { path: self.path.clone(), source })?;
    let tmp = self.path.with_extension("json.tmp");
    let io_err = |source: std::io::Error| StoreError::Io { path: self.path.clone(), source };
    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(&tmp, body).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
    Ok(())
  }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
  fn backend(&self) -> &'static str { "file" }

  #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
  async fn load_all(&self) -> Result<History, StoreError> {
    self.read().await
  }

  #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
  async fn append_assignment(&self, roll: &str, topic: &str) -> Result<(), StoreError> {
    let _guard = self.write_lock.lock().await;
    let mut history = self.read().await?;
    if history.assignments.contains_key(roll) {
      return Err(StoreError::Conflict { roll: roll.to_string() });
    }
    history.assignments.insert(roll.to_string(), topic.to_string());
    self.write(&history).await?;
    debug!(target: "history", %roll, %topic, "Assignment appended");
    Ok(())
  }

  #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
  async fn archive_assignment(&self, roll: &str, topic: &str) -> Result<(), StoreError> {
    let _guard = self.write_lock.lock().await;
    let mut history = self.read().await?;
    history
      .exclusions
      .entry(roll.to_string())
      .or_default()
      .push(topic.to_string());
    history.assignments.remove(roll);
    // single rewrite: exclusion and removal land together
    self.write(&history).await?;
    debug!(target: "history", %roll, %topic, "Assignment archived to exclusions");
    Ok(())
  }
}
