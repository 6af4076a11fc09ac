//! Domain models: roll numbers, roster records, candidate pools and assignment history.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LotteryError;

/// Opaque exercise statement drawn from the catalog.
pub type Topic = String;

/// A roll number that passed the digit/length rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RollNumber(String);

impl RollNumber {
  /// Trim and validate: exactly `len` ASCII digits.
  pub fn parse(raw: &str, len: usize) -> Result<Self, LotteryError> {
    let s = raw.trim();
    if s.len() == len && s.bytes().all(|b| b.is_ascii_digit()) {
      Ok(Self(s.to_string()))
    } else {
      Err(LotteryError::InvalidRollNumber { input: s.to_string(), expected_len: len })
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RollNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// One validated roster row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudentRecord {
  pub roll_number: String,
  /// Declared order, de-duplicated, no blanks.
  pub chosen: Vec<Topic>,
}

/// Where a candidate pool came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSource {
  StudentChoice,
  UnassignedPool,
  FullCatalog,
}

impl PoolSource {
  pub fn label(self) -> &'static str {
    match self {
      PoolSource::StudentChoice => "student's chosen set",
      PoolSource::UnassignedPool => "general unassigned pool",
      PoolSource::FullCatalog => "fallback: full catalog",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidatePool {
  pub topics: Vec<Topic>,
  pub source: PoolSource,
}

/// Persisted lottery state: active assignments plus append-only exclusions.
///
/// Counts are never stored; `counts()` tallies the active assignments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
  #[serde(default)]
  pub assignments: BTreeMap<String, Topic>,
  #[serde(default)]
  pub exclusions: BTreeMap<String, Vec<Topic>>,
}

impl History {
  pub fn assignment_for(&self, roll: &str) -> Option<&Topic> {
    self.assignments.get(roll)
  }

  pub fn counts(&self) -> HashMap<Topic, usize> {
    let mut out = HashMap::new();
    for topic in self.assignments.values() {
      *out.entry(topic.clone()).or_insert(0) += 1;
    }
    out
  }

  pub fn exclusions_for(&self, roll: &str) -> HashSet<Topic> {
    self
      .exclusions
      .get(roll)
      .map(|v| v.iter().cloned().collect())
      .unwrap_or_default()
  }
}

/// Result status of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
  /// The student already held a topic; nothing was drawn.
  Existing,
  /// A fresh topic was drawn in this call.
  Assigned,
}

/// Outcome of `submit` / `reroll`.
#[derive(Clone, Debug)]
pub struct Submission {
  pub roll_number: String,
  pub topic: Topic,
  pub status: SubmissionStatus,
  pub pool_source: Option<PoolSource>,
  /// False when the draw succeeded but the store write failed.
  pub saved: bool,
  pub warning: Option<String>,
  pub revoked: Option<Topic>,
}
