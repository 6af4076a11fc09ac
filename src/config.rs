//! Loading lottery configuration (cap, roll-number rule, catalog, roster
//! columns, history backend) from TOML.
//!
//! See `LotteryConfig` for the expected schema. Every field has a default,
//! so an empty file (or no file at all) yields the reference setup.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::catalog::default_catalog;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
  /// Maximum number of students that may hold the same topic at once.
  pub max_assignments_per_topic: usize,
  /// Exact number of ASCII digits in a valid roll number.
  pub roll_number_len: usize,
  /// When false, the selector skips the per-student exclusion filter.
  pub track_exclusions: bool,
  pub catalog: Vec<String>,
  pub roster: RosterConfig,
  pub history: HistoryConfig,
}

impl Default for LotteryConfig {
  fn default() -> Self {
    Self {
      max_assignments_per_topic: 4,
      roll_number_len: 11,
      track_exclusions: true,
      catalog: default_catalog(),
      roster: RosterConfig::default(),
      history: HistoryConfig::default(),
    }
  }
}

/// Where the roster CSV lives and which header names carry the two columns we read.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
  pub path: PathBuf,
  pub roll_column: String,
  pub problems_column: String,
}

impl Default for RosterConfig {
  fn default() -> Self {
    Self {
      path: PathBuf::from("roster.csv"),
      roll_column: "Roll No.".into(),
      problems_column: "Please choose any 13 Probem Statements from the following".into(),
    }
  }
}

/// History backend selection. `backend = "file"` or `backend = "remote"`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum HistoryConfig {
  File {
    #[serde(default = "default_history_path")]
    path: PathBuf,
  },
  Remote(RemoteStoreConfig),
}

impl Default for HistoryConfig {
  fn default() -> Self {
    HistoryConfig::File { path: default_history_path() }
  }
}

fn default_history_path() -> PathBuf {
  PathBuf::from("assignment_history.json")
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemoteStoreConfig {
  pub base_url: String,
  #[serde(default = "default_spreadsheet")]
  pub spreadsheet: String,
  #[serde(default = "default_assignments_ws")]
  pub assignments_worksheet: String,
  #[serde(default = "default_exclusions_ws")]
  pub exclusions_worksheet: String,
  /// Name of the env variable holding a bearer token (never the token itself).
  #[serde(default)]
  pub token_env: Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_spreadsheet() -> String { "LotteryAppHistory".into() }
fn default_assignments_ws() -> String { "Assignments".into() }
fn default_exclusions_ws() -> String { "Exclusions".into() }
fn default_timeout_secs() -> u64 { 20 }

impl LotteryConfig {
  /// Parse a TOML document. Missing keys fall back to defaults.
  pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
    toml::from_str::<LotteryConfig>(s)
  }

  /// Apply env overrides that operators commonly tweak without editing the file.
  fn apply_env_overrides(mut self) -> Self {
    if let Ok(p) = std::env::var("ROSTER_PATH") {
      if !p.trim().is_empty() {
        self.roster.path = PathBuf::from(p);
      }
    }
    self
  }
}

/// Load `LotteryConfig` from LOTTERY_CONFIG_PATH. On any parsing/IO error, logs and uses defaults.
pub fn load_lottery_config_from_env() -> LotteryConfig {
  let cfg = match std::env::var("LOTTERY_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match LotteryConfig::from_toml_str(&s) {
        Ok(cfg) => {
          info!(target: "topic_lottery_backend", %path, "Loaded lottery config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "topic_lottery_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
          LotteryConfig::default()
        }
      },
      Err(e) => {
        error!(target: "topic_lottery_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
        LotteryConfig::default()
      }
    },
    Err(_) => {
      info!(target: "topic_lottery_backend", "LOTTERY_CONFIG_PATH not set; using built-in defaults");
      LotteryConfig::default()
    }
  };
  cfg.apply_env_overrides()
}
