//! Core lottery behaviors shared by the HTTP handlers.
//!
//! Per roll number the state is `Unassigned` or `Active(topic)`:
//!   - submit: returns an existing assignment untouched, otherwise draws one
//!   - assign: Unassigned -> Active, rejected when already active
//!   - revoke: Active -> Unassigned, leaving a permanent exclusion behind
//!   - reroll: revoke, then draw again with the grown exclusion list
//!
//! Mutating paths hold the state gate for their whole read/select/write cycle.

use std::collections::BTreeMap;

use tracing::{error, info, instrument, warn};

use crate::domain::{History, RollNumber, Submission, SubmissionStatus, Topic};
use crate::error::{LotteryError, StoreError};
use crate::pool::pool_for;
use crate::selector::select;
use crate::state::AppState;

/// Admin view of the current history.
#[derive(Clone, Debug)]
pub struct Overview {
  pub assignments: Vec<(String, Topic)>,
  /// Sorted by count descending, then topic.
  pub counts: Vec<(Topic, usize)>,
  pub exclusions: BTreeMap<String, Vec<Topic>>,
  pub roster_size: usize,
  pub max_assignments_per_topic: usize,
}

/// Student submission. Never re-rolls an existing assignment.
#[instrument(level = "info", skip(state))]
pub async fn submit(state: &AppState, raw_roll: &str) -> Result<Submission, LotteryError> {
  let roll = RollNumber::parse(raw_roll, state.config.roll_number_len)?;
  let _gate = state.gate().await;

  let history = state.store.load_all().await?;
  if let Some(topic) = history.assignment_for(roll.as_str()) {
    info!(target: "lottery", %roll, %topic, "Existing assignment returned");
    return Ok(Submission {
      roll_number: roll.to_string(),
      topic: topic.clone(),
      status: SubmissionStatus::Existing,
      pool_source: None,
      saved: true,
      warning: None,
      revoked: None,
    });
  }

  draw_and_assign(state, &roll, &history).await
}

/// Revoke the student's active assignment and draw a new topic.
///
/// A failed draw after the revoke reports the revoked topic in the error.
#[instrument(level = "info", skip(state))]
pub async fn reroll(state: &AppState, raw_roll: &str) -> Result<Submission, LotteryError> {
  let roll = RollNumber::parse(raw_roll, state.config.roll_number_len)?;
  let _gate = state.gate().await;

  let history = state.store.load_all().await?;
  let revoked = revoke_locked(state, roll.as_str(), &history).await?;

  let history = state.store.load_all().await?;
  match draw_and_assign(state, &roll, &history).await {
    Ok(mut out) => {
      out.revoked = Some(revoked);
      Ok(out)
    }
    Err(LotteryError::NoTopicAvailable(source)) => Err(LotteryError::RerollFailed { revoked, source }),
    Err(e) => Err(e),
  }
}

/// Admin assignment of a given catalog topic. Fails when the student already holds one.
///
/// The cap is a selection-time rule, so it is not checked here.
#[instrument(level = "info", skip(state))]
pub async fn assign(state: &AppState, roll: &RollNumber, topic: &str) -> Result<(), LotteryError> {
  if !state.config.catalog.iter().any(|t| t == topic) {
    return Err(LotteryError::UnknownTopic(topic.to_string()));
  }
  let _gate = state.gate().await;
  let history = state.store.load_all().await?;
  assign_locked(state, roll.as_str(), topic, &history).await
}

/// Admin un-assign. Accepts any roll number present in history.
#[instrument(level = "info", skip(state))]
pub async fn revoke(state: &AppState, raw_roll: &str) -> Result<Topic, LotteryError> {
  let roll = raw_roll.trim();
  let _gate = state.gate().await;
  let history = state.store.load_all().await?;
  revoke_locked(state, roll, &history).await
}

#[instrument(level = "debug", skip(state))]
pub async fn overview(state: &AppState) -> Result<Overview, LotteryError> {
  let history = state.store.load_all().await?;
  let mut counts: Vec<(Topic, usize)> = history.counts().into_iter().collect();
  counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
  Ok(Overview {
    assignments: history.assignments.into_iter().collect(),
    counts,
    exclusions: history.exclusions,
    roster_size: state.roster().await.len(),
    max_assignments_per_topic: state.config.max_assignments_per_topic,
  })
}

// -------- Gate-held steps --------

async fn assign_locked(state: &AppState, roll: &str, topic: &str, history: &History) -> Result<(), LotteryError> {
  if history.assignment_for(roll).is_some() {
    return Err(LotteryError::AlreadyAssigned(roll.to_string()));
  }
  state.store.append_assignment(roll, topic).await.map_err(|e| match e {
    StoreError::Conflict { roll } => LotteryError::AlreadyAssigned(roll),
    other => LotteryError::Store(other),
  })
}

async fn revoke_locked(state: &AppState, roll: &str, history: &History) -> Result<Topic, LotteryError> {
  let topic = history
    .assignment_for(roll)
    .cloned()
    .ok_or_else(|| LotteryError::NotAssigned(roll.to_string()))?;

  if let Err(e) = state.store.archive_assignment(roll, &topic).await {
    error!(target: "lottery", %roll, %topic, error = %e, "CRITICAL: failed to archive assignment");
    return Err(e.into());
  }
  warn!(target: "lottery", %roll, %topic, "Assignment revoked and added to exclusions");
  Ok(topic)
}

async fn draw_and_assign(state: &AppState, roll: &RollNumber, history: &History) -> Result<Submission, LotteryError> {
  let roster = state.roster().await;
  let pool = pool_for(roll.as_str(), &roster, &state.config.catalog);
  if roster.choices_for(roll.as_str()).is_none() {
    warn!(target: "lottery", %roll, "Roll number not on the roster; using a fallback pool");
  }

  let exclusions = history.exclusions_for(roll.as_str());
  let exclusions = state.config.track_exclusions.then_some(&exclusions);
  let topic = match select(&pool.topics, &history.counts(), exclusions, state.config.max_assignments_per_topic) {
    Ok(t) => t,
    Err(e) => {
      warn!(target: "lottery", %roll, source = pool.source.label(), pool_size = pool.topics.len(), reason = e.reason(), "No topic available");
      return Err(e.into());
    }
  };

  let (saved, warning) = match assign_locked(state, roll.as_str(), &topic, history).await {
    Ok(()) => (true, None),
    Err(LotteryError::Store(e)) => {
      // the draw stands for this response but may not survive a revisit
      error!(target: "lottery", %roll, %topic, error = %e, "CRITICAL: failed to save assignment");
      (false, Some(format!("Your assignment could not be saved ({e}). It may not persist; contact the instructor.")))
    }
    Err(other) => return Err(other),
  };

  info!(target: "lottery", %roll, %topic, source = pool.source.label(), saved, "Topic assigned");
  Ok(Submission {
    roll_number: roll.to_string(),
    topic,
    status: SubmissionStatus::Assigned,
    pool_source: Some(pool.source),
    saved,
    warning,
    revoked: None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use async_trait::async_trait;

  use crate::config::LotteryConfig;
  use crate::domain::{PoolSource, StudentRecord};
  use crate::error::StoreError;
  use crate::history::{HistoryStore, JsonFileStore};
  use crate::roster::Roster;
  use crate::selector::SelectError;

  const ROLL: &str = "11000100001";

  fn rec(roll: &str, chosen: &[&str]) -> StudentRecord {
    StudentRecord { roll_number: roll.into(), chosen: chosen.iter().map(|s| s.to_string()).collect() }
  }

  fn state_with(dir: &tempfile::TempDir, records: Vec<StudentRecord>, config: LotteryConfig) -> AppState {
    let store = Arc::new(JsonFileStore::new(dir.path().join("history.json")));
    AppState::from_parts(config, Roster::from_records(records), store)
  }

  #[tokio::test]
  async fn first_submission_assigns_and_second_returns_same_topic() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(
      &dir,
      vec![rec(ROLL, &["Fibonacci Number", "Stack: Push Pop Display"])],
      LotteryConfig::default(),
    );

    let first = submit(&state, ROLL).await.unwrap();
    assert_eq!(first.status, SubmissionStatus::Assigned);
    assert_eq!(first.pool_source, Some(PoolSource::StudentChoice));
    assert!(first.saved);
    assert!(first.topic == "Fibonacci Number" || first.topic == "Stack: Push Pop Display");

    let h = state.store.load_all().await.unwrap();
    assert_eq!(h.counts().get(&first.topic), Some(&1));

    let second = submit(&state, ROLL).await.unwrap();
    assert_eq!(second.status, SubmissionStatus::Existing);
    assert_eq!(second.topic, first.topic);
    assert_eq!(state.store.load_all().await.unwrap().counts().get(&first.topic), Some(&1));
  }

  #[tokio::test]
  async fn malformed_roll_never_touches_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(&dir, vec![], LotteryConfig::default());
    for bad in ["", "1100010000", "110001000012", "1100010000x"] {
      assert!(matches!(submit(&state, bad).await, Err(LotteryError::InvalidRollNumber { .. })));
    }
    assert!(!dir.path().join("history.json").exists());
  }

  #[tokio::test]
  async fn revoked_topic_is_not_assigned_again() {
    let dir = tempfile::tempdir().unwrap();
    let config = LotteryConfig { catalog: vec!["Q1".into(), "Q2".into()], ..LotteryConfig::default() };
    let state = state_with(&dir, vec![rec(ROLL, &["Q1", "Q2"])], config);
    let roll = RollNumber::parse(ROLL, 11).unwrap();

    assert!(matches!(assign(&state, &roll, "Q9").await, Err(LotteryError::UnknownTopic(_))));
    assign(&state, &roll, "Q1").await.unwrap();
    assert!(matches!(assign(&state, &roll, "Q2").await, Err(LotteryError::AlreadyAssigned(_))));
    assert_eq!(revoke(&state, ROLL).await.unwrap(), "Q1");

    let h = state.store.load_all().await.unwrap();
    assert_eq!(h.counts().get("Q1"), None);
    for _ in 0..3 {
      let out = submit(&state, ROLL).await.unwrap();
      assert_eq!(out.topic, "Q2");
    }
  }

  #[tokio::test]
  async fn reroll_excludes_previous_topics_until_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(&dir, vec![rec(ROLL, &["A", "B"])], LotteryConfig::default());

    let first = submit(&state, ROLL).await.unwrap();
    let second = reroll(&state, ROLL).await.unwrap();
    assert_eq!(second.revoked.as_deref(), Some(first.topic.as_str()));
    assert_ne!(second.topic, first.topic);

    match reroll(&state, ROLL).await {
      Err(LotteryError::RerollFailed { revoked, source: SelectError::AllExcluded }) => {
        assert_eq!(revoked, second.topic);
      }
      other => panic!("expected RerollFailed, got {other:?}"),
    }
    // the revoke step already ran: student is unassigned with two exclusions
    let h = state.store.load_all().await.unwrap();
    assert!(h.assignment_for(ROLL).is_none());
    assert_eq!(h.exclusions_for(ROLL).len(), 2);
  }

  #[tokio::test]
  async fn single_choice_reroll_reports_the_lost_topic() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(&dir, vec![rec(ROLL, &["A"])], LotteryConfig::default());
    submit(&state, ROLL).await.unwrap();

    let err = reroll(&state, ROLL).await.unwrap_err();
    assert_eq!(err.code(), "all_excluded");
    match &err {
      LotteryError::RerollFailed { revoked, .. } => assert_eq!(revoked, "A"),
      other => panic!("expected RerollFailed, got {other:?}"),
    }
    assert!(err.to_string().contains("'A' has been un-assigned"));

    let h = state.store.load_all().await.unwrap();
    assert!(h.assignments.is_empty());
    assert!(h.exclusions_for(ROLL).contains("A"));
  }

  #[tokio::test]
  async fn reroll_without_assignment_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(&dir, vec![rec(ROLL, &["A"])], LotteryConfig::default());
    assert!(matches!(reroll(&state, ROLL).await, Err(LotteryError::NotAssigned(_))));
    assert!(matches!(revoke(&state, ROLL).await, Err(LotteryError::NotAssigned(_))));
  }

  #[tokio::test]
  async fn cap_blocks_the_fifth_student() {
    let dir = tempfile::tempdir().unwrap();
    let records: Vec<StudentRecord> = (1..=5).map(|i| rec(&format!("1100010000{i}"), &["Only"])).collect();
    let state = state_with(&dir, records, LotteryConfig::default());
    for i in 1..=4 {
      assert_eq!(submit(&state, &format!("1100010000{i}")).await.unwrap().topic, "Only");
    }
    match submit(&state, "11000100005").await {
      Err(LotteryError::NoTopicAvailable(SelectError::PoolExhausted { cap: 4 })) => {}
      other => panic!("expected PoolExhausted, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn unknown_student_uses_unassigned_pool_then_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let config = LotteryConfig { catalog: vec!["X".into(), "Z".into()], ..LotteryConfig::default() };
    let state = state_with(&dir, vec![rec(ROLL, &["X"])], config);

    let out = submit(&state, "11000100009").await.unwrap();
    assert_eq!(out.topic, "Z");
    assert_eq!(out.pool_source, Some(PoolSource::UnassignedPool));
  }

  #[tokio::test]
  async fn exclusion_tracking_can_be_switched_off() {
    let dir = tempfile::tempdir().unwrap();
    let config = LotteryConfig { track_exclusions: false, ..LotteryConfig::default() };
    let state = state_with(&dir, vec![rec(ROLL, &["A"])], config);
    submit(&state, ROLL).await.unwrap();
    assert_eq!(reroll(&state, ROLL).await.unwrap().topic, "A");
  }

  #[tokio::test]
  async fn overview_sorts_counts_descending() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(&dir, vec![], LotteryConfig::default());
    for (roll, topic) in [("3", "B"), ("1", "A"), ("2", "B")] {
      state.store.append_assignment(roll, topic).await.unwrap();
    }
    let o = overview(&state).await.unwrap();
    assert_eq!(o.counts, vec![("B".to_string(), 2), ("A".to_string(), 1)]);
    assert_eq!(o.assignments[0], ("1".to_string(), "A".to_string()));
    assert_eq!(o.max_assignments_per_topic, 4);
  }

  /// Loads fine, refuses every write.
  struct ReadOnlyStore;

  #[async_trait]
  impl HistoryStore for ReadOnlyStore {
    fn backend(&self) -> &'static str { "read_only" }
    async fn load_all(&self) -> Result<History, StoreError> { Ok(History::default()) }
    async fn append_assignment(&self, _roll: &str, _topic: &str) -> Result<(), StoreError> {
      Err(StoreError::Remote { status: 503, message: "read only".into() })
    }
    async fn archive_assignment(&self, _roll: &str, _topic: &str) -> Result<(), StoreError> {
      Err(StoreError::Remote { status: 503, message: "read only".into() })
    }
  }

  /// Holds one assignment; archiving writes the exclusion but never removes the row.
  #[derive(Default)]
  struct HalfArchiveStore {
    archives: AtomicUsize,
    appends: AtomicUsize,
  }

  #[async_trait]
  impl HistoryStore for HalfArchiveStore {
    fn backend(&self) -> &'static str { "half_archive" }
    async fn load_all(&self) -> Result<History, StoreError> {
      let mut h = History::default();
      h.assignments.insert(ROLL.into(), "A".into());
      Ok(h)
    }
    async fn append_assignment(&self, _roll: &str, _topic: &str) -> Result<(), StoreError> {
      self.appends.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
    async fn archive_assignment(&self, roll: &str, topic: &str) -> Result<(), StoreError> {
      self.archives.fetch_add(1, Ordering::SeqCst);
      Err(StoreError::PartialArchive {
        roll: roll.into(),
        topic: topic.into(),
        source: Box::new(StoreError::Remote { status: 500, message: "delete failed".into() }),
      })
    }
  }

  #[tokio::test]
  async fn partial_archive_surfaces_once_from_revoke_and_reroll() {
    let store = Arc::new(HalfArchiveStore::default());
    let state = AppState::from_parts(
      LotteryConfig::default(),
      Roster::from_records(vec![rec(ROLL, &["A", "B"])]),
      store.clone(),
    );

    let err = revoke(&state, ROLL).await.unwrap_err();
    assert!(matches!(err, LotteryError::Store(StoreError::PartialArchive { .. })), "got {err:?}");
    assert_eq!(err.code(), "store_unavailable");
    assert_eq!(store.archives.load(Ordering::SeqCst), 1);

    let err = reroll(&state, ROLL).await.unwrap_err();
    assert_eq!(err.code(), "store_unavailable");
    assert_eq!(store.archives.load(Ordering::SeqCst), 2);
    // no draw after a failed revoke
    assert_eq!(store.appends.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn failed_save_still_reports_the_topic() {
    let state = AppState::from_parts(
      LotteryConfig::default(),
      Roster::from_records(vec![rec(ROLL, &["A"])]),
      Arc::new(ReadOnlyStore),
    );
    let out = submit(&state, ROLL).await.unwrap();
    assert_eq!(out.topic, "A");
    assert!(!out.saved);
    assert!(out.warning.unwrap().contains("could not be saved"));
  }
}
