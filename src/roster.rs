//! Roster snapshot: which topics each roll number pre-selected.
//!
//! Loaded from a CSV export with a header row. Only two columns matter, located
//! by exact header name. Rows are validated into `StudentRecord`s here so the
//! rest of the crate never sees loosely typed cells.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{info, instrument, warn};

use crate::config::RosterConfig;
use crate::domain::{StudentRecord, Topic};
use crate::error::RosterError;
use crate::util::{normalize_roll_cell, parse_csv, split_problem_list};

#[derive(Clone, Debug, Default)]
pub struct Roster {
  records: Vec<StudentRecord>,
  by_roll: HashMap<String, usize>,
}

impl Roster {
  pub fn from_records(records: Vec<StudentRecord>) -> Self {
    let mut kept: Vec<StudentRecord> = Vec::with_capacity(records.len());
    let mut by_roll = HashMap::new();
    for rec in records {
      if by_roll.contains_key(&rec.roll_number) {
        warn!(target: "roster", roll = %rec.roll_number, "Duplicate roster row ignored (first row wins)");
        continue;
      }
      by_roll.insert(rec.roll_number.clone(), kept.len());
      kept.push(rec);
    }
    Self { records: kept, by_roll }
  }

  /// Parse CSV text using the configured column names.
  pub fn parse(text: &str, cfg: &RosterConfig) -> Result<Self, RosterError> {
    let mut rows = parse_csv(text).into_iter();
    let header = rows.next().ok_or(RosterError::Empty)?;
    let col = |name: &str| {
      header
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| RosterError::MissingColumn { column: name.to_string() })
    };
    let roll_idx = col(&cfg.roll_column)?;
    let problems_idx = col(&cfg.problems_column)?;

    let mut records = Vec::new();
    for row in rows {
      let roll_number = row.get(roll_idx).map(|c| normalize_roll_cell(c)).unwrap_or_default();
      if roll_number.is_empty() {
        continue;
      }
      let chosen = row.get(problems_idx).map(|c| split_problem_list(c)).unwrap_or_default();
      records.push(StudentRecord { roll_number, chosen });
    }
    Ok(Self::from_records(records))
  }

  #[instrument(level = "info", skip(cfg), fields(path = %cfg.path.display()))]
  pub async fn load(cfg: &RosterConfig) -> Result<Self, RosterError> {
    let text = read_roster_file(&cfg.path).await?;
    let roster = Self::parse(&text, cfg)?;
    info!(target: "roster", students = roster.len(), "Loaded student responses");
    Ok(roster)
  }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  /// The declared choice set for `roll`, if the roll number is on the roster.
  pub fn choices_for(&self, roll: &str) -> Option<&[Topic]> {
    self.by_roll.get(roll).map(|&i| self.records[i].chosen.as_slice())
  }

  /// Union of every student's declared topics.
  pub fn all_chosen(&self) -> HashSet<&str> {
    self
      .records
      .iter()
      .flat_map(|r| r.chosen.iter().map(|t| t.as_str()))
      .collect()
  }

  /// Declared topics that are not in `catalog` (typos in the form, retired topics).
  pub fn unknown_topics(&self, catalog: &[Topic]) -> Vec<String> {
    let known: HashSet<&str> = catalog.iter().map(|t| t.as_str()).collect();
    let mut out: Vec<String> = self
      .all_chosen()
      .into_iter()
      .filter(|t| !known.contains(t))
      .map(|t| t.to_string())
      .collect();
    out.sort();
    out
  }
}

async fn read_roster_file(path: &Path) -> Result<String, RosterError> {
  tokio::fs::read_to_string(path)
    .await
    .map_err(|source| RosterError::Io { path: path.to_path_buf(), source })
}
