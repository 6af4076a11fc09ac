//! Constrained random topic selection.
//!
//! Narrowing order: drop topics already at the cap, then (optionally) drop
//! topics this student had revoked before, then pick uniformly at random.
//! Pure over its inputs; persistence is the caller's job.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::domain::Topic;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
  #[error("The problem pool to select from is empty.")]
  EmptyPool,

  #[error("All problems in your pool have already been assigned the maximum number of times ({cap}).")]
  PoolExhausted { cap: usize },

  #[error("All available problems in your pool have been assigned to you in the past. Cannot assign a new one.")]
  AllExcluded,
}

impl SelectError {
  pub fn reason(&self) -> &'static str {
    match self {
      SelectError::EmptyPool => "empty_pool",
      SelectError::PoolExhausted { .. } => "pool_exhausted",
      SelectError::AllExcluded => "all_excluded",
    }
  }
}

/// Pick one topic from `pool` using the thread-local RNG.
///
/// `exclusions = None` skips the per-student filter entirely.
pub fn select(
  pool: &[Topic],
  counts: &HashMap<Topic, usize>,
  exclusions: Option<&HashSet<Topic>>,
  cap: usize,
) -> Result<Topic, SelectError> {
  let mut rng = rand::thread_rng();
  select_with(&mut rng, pool, counts, exclusions, cap)
}

pub fn select_with<R: Rng + ?Sized>(
  rng: &mut R,
  pool: &[Topic],
  counts: &HashMap<Topic, usize>,
  exclusions: Option<&HashSet<Topic>>,
  cap: usize,
) -> Result<Topic, SelectError> {
  if pool.is_empty() {
    return Err(SelectError::EmptyPool);
  }

  let available: Vec<&Topic> = pool
    .iter()
    .filter(|t| counts.get(*t).copied().unwrap_or(0) < cap)
    .collect();
  if available.is_empty() {
    return Err(SelectError::PoolExhausted { cap });
  }

  let candidates: Vec<&Topic> = match exclusions {
    Some(excluded) => available.into_iter().filter(|t| !excluded.contains(*t)).collect(),
    None => available,
  };

  candidates
    .choose(rng)
    .map(|t| (*t).clone())
    .ok_or(SelectError::AllExcluded)
}
