//! Candidate pool derivation for a roll number.
//!
//! Policy, in order:
//! 1) the student's own non-empty choice set, verbatim;
//! 2) catalog topics nobody on the roster chose (catalog order);
//! 3) the whole catalog.
//!
//! Recomputed from the roster snapshot on every call.

use crate::domain::{CandidatePool, PoolSource, Topic};
use crate::roster::Roster;

pub fn pool_for(roll: &str, roster: &Roster, catalog: &[Topic]) -> CandidatePool {
  if let Some(chosen) = roster.choices_for(roll) {
    if !chosen.is_empty() {
      return CandidatePool { topics: chosen.to_vec(), source: PoolSource::StudentChoice };
    }
  }

  let unassigned = unassigned_pool(roster, catalog);
  if !unassigned.is_empty() {
    return CandidatePool { topics: unassigned, source: PoolSource::UnassignedPool };
  }

  CandidatePool { topics: catalog.to_vec(), source: PoolSource::FullCatalog }
}

/// Catalog topics that appear in no student's declared set.
pub fn unassigned_pool(roster: &Roster, catalog: &[Topic]) -> Vec<Topic> {
  let chosen = roster.all_chosen();
  catalog
    .iter()
    .filter(|t| !chosen.contains(t.as_str()))
    .cloned()
    .collect()
}
