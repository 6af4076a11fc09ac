//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable so the form/admin frontends can evolve separately.

use serde::{Deserialize, Serialize};

use crate::domain::{PoolSource, Submission, SubmissionStatus};
use crate::logic::Overview;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollIn {
  pub roll_number: String,
}

/// Outcome of a submission or re-roll.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOut {
  pub roll_number: String,
  pub topic: String,
  pub status: SubmissionStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pool_source: Option<PoolSource>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pool_label: Option<&'static str>,
  pub saved: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub warning: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub revoked: Option<String>,
}

pub fn to_out(s: Submission) -> SubmissionOut {
  SubmissionOut {
    roll_number: s.roll_number,
    topic: s.topic,
    status: s.status,
    pool_source: s.pool_source,
    pool_label: s.pool_source.map(PoolSource::label),
    saved: s.saved,
    warning: s.warning,
    revoked: s.revoked,
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRow {
  pub roll_number: String,
  pub topic: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountRow {
  pub topic: String,
  pub times_assigned: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionRow {
  pub roll_number: String,
  pub topics: Vec<String>,
}

/// Admin overview: active assignments, per-topic counts, exclusions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOut {
  pub assignments: Vec<AssignmentRow>,
  pub counts: Vec<CountRow>,
  pub exclusions: Vec<ExclusionRow>,
  pub roster_size: usize,
  pub max_assignments_per_topic: usize,
}

pub fn overview_out(o: Overview) -> HistoryOut {
  HistoryOut {
    assignments: o
      .assignments
      .into_iter()
      .map(|(roll_number, topic)| AssignmentRow { roll_number, topic })
      .collect(),
    counts: o
      .counts
      .into_iter()
      .map(|(topic, times_assigned)| CountRow { topic, times_assigned })
      .collect(),
    exclusions: o
      .exclusions
      .into_iter()
      .map(|(roll_number, topics)| ExclusionRow { roll_number, topics })
      .collect(),
    roster_size: o.roster_size,
    max_assignments_per_topic: o.max_assignments_per_topic,
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignIn {
  pub roll_number: String,
  pub topic: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignOut {
  pub roll_number: String,
  pub topic: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignOut {
  pub roll_number: String,
  pub revoked: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterOut {
  pub students: usize,
  pub unknown_topics: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOut {
  pub topics: Vec<String>,
  pub max_assignments_per_topic: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
  pub ok: bool,
  pub backend: &'static str,
  pub roster_size: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
  pub error: &'static str,
  pub message: String,
  /// Set when a re-roll revoked the old topic but could not draw a new one.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub revoked: Option<String>,
}
