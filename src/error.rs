//! Error types for the roster, the history stores and the lottery flow.

use std::path::PathBuf;

use thiserror::Error;

use crate::selector::SelectError;

/// Roster file could not be turned into student records.
#[derive(Error, Debug)]
pub enum RosterError {
  #[error("Roster file '{}' could not be read: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Column '{column}' not found in the roster header")]
  MissingColumn { column: String },

  #[error("Roster file has no header row")]
  Empty,
}

/// History backend failures. None of these are retried.
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("History file '{}' I/O failed: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("History file '{}' is not valid JSON: {source}", path.display())]
  Decode {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("Remote store request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Remote store answered {status}: {message}")]
  Remote { status: u16, message: String },

  #[error("Remote store URL '{0}' cannot be used as a base URL")]
  InvalidUrl(String),

  #[error("Spreadsheet '{0}' not found in the remote store")]
  SpreadsheetNotFound(String),

  #[error("Worksheet '{worksheet}' not found in spreadsheet '{spreadsheet}'")]
  WorksheetNotFound { spreadsheet: String, worksheet: String },

  #[error("Roll number {roll} already has an assignment in the store")]
  Conflict { roll: String },

  #[error("Exclusion for {roll} ('{topic}') was written but the assignment row could not be removed: {source}")]
  PartialArchive {
    roll: String,
    topic: String,
    #[source]
    source: Box<StoreError>,
  },
}

/// Everything the lottery flow can report back to a caller.
#[derive(Error, Debug)]
pub enum LotteryError {
  #[error("Please enter a valid {expected_len}-digit Roll Number (got '{input}').")]
  InvalidRollNumber { input: String, expected_len: usize },

  #[error("Roll number {0} already has an active assignment; re-roll instead.")]
  AlreadyAssigned(String),

  #[error("Roll number {0} has no active assignment.")]
  NotAssigned(String),

  #[error("'{0}' is not a topic in the catalog.")]
  UnknownTopic(String),

  #[error("Could not assign a question. Reason: {0}")]
  NoTopicAvailable(#[from] SelectError),

  /// The old topic is already gone when the new draw fails.
  #[error("Your previous question '{revoked}' has been un-assigned and added to your exclusion list, but a new one could not be assigned. Reason: {source}")]
  RerollFailed {
    revoked: String,
    #[source]
    source: SelectError,
  },

  #[error("Malformed request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Roster(#[from] RosterError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl LotteryError {
  /// Stable machine-readable code for API consumers.
  pub fn code(&self) -> &'static str {
    match self {
      LotteryError::InvalidRollNumber { .. } => "invalid_roll_number",
      LotteryError::AlreadyAssigned(_) => "already_assigned",
      LotteryError::NotAssigned(_) => "not_assigned",
      LotteryError::UnknownTopic(_) => "unknown_topic",
      LotteryError::NoTopicAvailable(e) => e.reason(),
      LotteryError::RerollFailed { source, .. } => source.reason(),
      LotteryError::BadRequest(_) => "bad_request",
      LotteryError::Roster(_) => "roster_unavailable",
      LotteryError::Store(_) => "store_unavailable",
    }
  }
}
