//! Remote row-table backend.
//!
//! Talks to a spreadsheet-like HTTP service holding two worksheets in one
//! spreadsheet:
//!   - Assignments: `Roll Number`, `Assigned Question` (one row per active assignment)
//!   - Exclusions:  `Roll Number`, `Excluded Question` (append-only)
//!
//! Endpoints, relative to `base_url`:
//!   GET    /spreadsheets/{sheet}/worksheets/{ws}/records      -> [{header: cell}]
//!   POST   /spreadsheets/{sheet}/worksheets/{ws}/rows         <- {"values": [..]}
//!   GET    /spreadsheets/{sheet}/worksheets/{ws}/find?query=  -> {"row": n | null}
//!   DELETE /spreadsheets/{sheet}/worksheets/{ws}/rows/{n}
//!
//! Every call is independently fallible and nothing is retried.
//!
//! NOTE: the bearer token is read from the env variable named in config and never logged.

use std::collections::btree_map::Entry;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use crate::config::RemoteStoreConfig;
use crate::domain::History;
use crate::error::StoreError;
use crate::history::HistoryStore;
use crate::util::{normalize_roll_cell, trunc_for_log};

pub const COL_ROLL: &str = "Roll Number";
pub const COL_ASSIGNED: &str = "Assigned Question";
pub const COL_EXCLUDED: &str = "Excluded Question";

#[derive(Clone)]
pub struct RemoteSheetStore {
  client: reqwest::Client,
  base_url: Url,
  spreadsheet: String,
  assignments_ws: String,
  exclusions_ws: String,
  token: Option<String>,
}

#[derive(Serialize)]
struct AppendRow<'a> {
  values: [&'a str; 2],
}

#[derive(Deserialize)]
struct FindOut {
  row: Option<u64>,
}

type Record = Map<String, Value>;

impl RemoteSheetStore {
  pub fn from_config(cfg: &RemoteStoreConfig) -> Result<Self, StoreError> {
    let base_url = Url::parse(&cfg.base_url).map_err(|_| StoreError::InvalidUrl(cfg.base_url.clone()))?;
    if base_url.cannot_be_a_base() {
      return Err(StoreError::InvalidUrl(cfg.base_url.clone()));
    }
    let token = cfg
      .token_env
      .as_deref()
      .and_then(|k| std::env::var(k).ok())
      .filter(|t| !t.trim().is_empty());
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .build()?;

    info!(
      target: "history",
      base_url = %base_url,
      spreadsheet = %cfg.spreadsheet,
      assignments = %cfg.assignments_worksheet,
      exclusions = %cfg.exclusions_worksheet,
      authenticated = token.is_some(),
      "Remote sheet store configured"
    );

    Ok(Self {
      client,
      base_url,
      spreadsheet: cfg.spreadsheet.clone(),
      assignments_ws: cfg.assignments_worksheet.clone(),
      exclusions_ws: cfg.exclusions_worksheet.clone(),
      token,
    })
  }

  fn worksheet_url(&self, ws: &str, tail: &[&str]) -> Result<Url, StoreError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?
      .pop_if_empty()
      .extend(["spreadsheets", self.spreadsheet.as_str(), "worksheets", ws])
      .extend(tail);
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    let rb = self
      .client
      .request(method, url)
      .header(USER_AGENT, "topic-lottery-backend/0.1");
    match &self.token {
      Some(t) => rb.bearer_auth(t),
      None => rb,
    }
  }

  /// Map non-success statuses to store errors.
  ///
  /// A 404 names the missing spreadsheet when the body says
  /// `{"error": "spreadsheet_not_found"}`, the worksheet otherwise.
  async fn check(&self, ws: &str, res: Response) -> Result<Response, StoreError> {
    let status = res.status();
    if status.is_success() {
      return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
      let code = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));
      if code.as_deref() == Some("spreadsheet_not_found") {
        return Err(StoreError::SpreadsheetNotFound(self.spreadsheet.clone()));
      }
      return Err(StoreError::WorksheetNotFound {
        spreadsheet: self.spreadsheet.clone(),
        worksheet: ws.to_string(),
      });
    }
    Err(StoreError::Remote { status: status.as_u16(), message: trunc_for_log(body.trim(), 200) })
  }

  #[instrument(level = "debug", skip(self))]
  async fn fetch_records(&self, ws: &str) -> Result<Vec<Record>, StoreError> {
    let url = self.worksheet_url(ws, &["records"])?;
    let res = self.request(Method::GET, url).send().await?;
    let res = self.check(ws, res).await?;
    Ok(res.json::<Vec<Record>>().await?)
  }

  #[instrument(level = "debug", skip(self))]
  async fn append_row(&self, ws: &str, roll: &str, value: &str) -> Result<(), StoreError> {
    let url = self.worksheet_url(ws, &["rows"])?;
    let res = self
      .request(Method::POST, url)
      .json(&AppendRow { values: [roll, value] })
      .send()
      .await?;
    self.check(ws, res).await?;
    Ok(())
  }

  #[instrument(level = "debug", skip(self))]
  async fn find_row(&self, ws: &str, query: &str) -> Result<Option<u64>, StoreError> {
    let mut url = self.worksheet_url(ws, &["find"])?;
    url.query_pairs_mut().append_pair("query", query);
    let res = self.request(Method::GET, url).send().await?;
    let res = self.check(ws, res).await?;
    Ok(res.json::<FindOut>().await?.row)
  }

  #[instrument(level = "debug", skip(self))]
  async fn delete_row(&self, ws: &str, row: u64) -> Result<(), StoreError> {
    let row = row.to_string();
    let url = self.worksheet_url(ws, &["rows", row.as_str()])?;
    let res = self.request(Method::DELETE, url).send().await?;
    self.check(ws, res).await?;
    Ok(())
  }

  async fn remove_assignment_row(&self, roll: &str) -> Result<(), StoreError> {
    match self.find_row(&self.assignments_ws, roll).await? {
      Some(row) => self.delete_row(&self.assignments_ws, row).await,
      None => {
        warn!(target: "history", %roll, "No assignment row found to delete");
        Ok(())
      }
    }
  }
}

/// Sheets hand numeric-looking cells back as numbers; roll numbers must stay strings.
fn cell_roll(v: &Value) -> String {
  normalize_roll_cell(&cell_text(v))
}

fn cell_text(v: &Value) -> String {
  match v {
    Value::String(s) => s.trim().to_string(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

fn pairs<'a>(rows: &'a [Record], value_col: &'a str) -> impl Iterator<Item = (String, String)> + 'a {
  rows.iter().filter_map(move |row| {
    let roll = row.get(COL_ROLL).map(cell_roll).unwrap_or_default();
    let value = row.get(value_col).map(cell_text).unwrap_or_default();
    if roll.is_empty() || value.is_empty() { None } else { Some((roll, value)) }
  })
}

#[async_trait]
impl HistoryStore for RemoteSheetStore {
  fn backend(&self) -> &'static str { "remote" }

  #[instrument(level = "debug", skip(self), fields(spreadsheet = %self.spreadsheet))]
  async fn load_all(&self) -> Result<History, StoreError> {
    let assigned = self.fetch_records(&self.assignments_ws).await?;
    let excluded = self.fetch_records(&self.exclusions_ws).await?;

    let mut history = History::default();
    // first row wins, matching the row `find` hands back for deletion
    for (roll, topic) in pairs(&assigned, COL_ASSIGNED) {
      match history.assignments.entry(roll) {
        Entry::Occupied(e) => {
          warn!(target: "history", roll = %e.key(), kept = %e.get(), ignored = %topic, "Duplicate assignment rows; keeping the first one");
        }
        Entry::Vacant(e) => {
          e.insert(topic);
        }
      }
    }
    for (roll, topic) in pairs(&excluded, COL_EXCLUDED) {
      history.exclusions.entry(roll).or_default().push(topic);
    }
    Ok(history)
  }

  #[instrument(level = "info", skip(self), fields(spreadsheet = %self.spreadsheet))]
  async fn append_assignment(&self, roll: &str, topic: &str) -> Result<(), StoreError> {
    self.append_row(&self.assignments_ws, roll, topic).await
  }

  #[instrument(level = "info", skip(self), fields(spreadsheet = %self.spreadsheet))]
  async fn archive_assignment(&self, roll: &str, topic: &str) -> Result<(), StoreError> {
    self.append_row(&self.exclusions_ws, roll, topic).await?;

    if let Err(e) = self.remove_assignment_row(roll).await {
      error!(target: "history", %roll, %topic, error = %e, "CRITICAL: exclusion written but assignment row not removed");
      return Err(StoreError::PartialArchive {
        roll: roll.to_string(),
        topic: topic.to_string(),
        source: Box::new(e),
      });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::{Arc, Mutex};

  use axum::extract::{Path, Query, State};
  use axum::http::StatusCode as AxumStatus;
  use axum::routing::{delete, get, post};
  use axum::{Json, Router};
  use serde_json::json;

  /// In-process fake of the row-table service. Row 1 is the header row.
  #[derive(Default)]
  struct FakeSheet {
    worksheets: Mutex<HashMap<String, (Vec<String>, Vec<Vec<String>>)>>,
    fail_delete: AtomicBool,
  }

  type Shared = Arc<FakeSheet>;

  fn typed_cell(s: &str) -> Value {
    // mimic sheets returning numeric cells as numbers
    match s.parse::<u64>() {
      Ok(n) => json!(n),
      Err(_) => json!(s),
    }
  }

  const SHEET: &str = "LotteryAppHistory";

  fn not_found(code: &str) -> (AxumStatus, Json<Value>) {
    (AxumStatus::NOT_FOUND, Json(json!({ "error": code })))
  }

  async fn records(
    State(s): State<Shared>,
    Path((sheet, ws)): Path<(String, String)>,
  ) -> Result<Json<Value>, (AxumStatus, Json<Value>)> {
    if sheet != SHEET {
      return Err(not_found("spreadsheet_not_found"));
    }
    let sheets = s.worksheets.lock().unwrap();
    let (header, rows) = sheets.get(&ws).ok_or_else(|| not_found("worksheet_not_found"))?;
    let out: Vec<Value> = rows
      .iter()
      .map(|r| {
        let obj: Map<String, Value> = header.iter().cloned().zip(r.iter().map(|c| typed_cell(c))).collect();
        Value::Object(obj)
      })
      .collect();
    Ok(Json(Value::Array(out)))
  }

  async fn append(
    State(s): State<Shared>,
    Path((_sheet, ws)): Path<(String, String)>,
    Json(body): Json<Value>,
  ) -> AxumStatus {
    let mut sheets = s.worksheets.lock().unwrap();
    let Some((_, rows)) = sheets.get_mut(&ws) else { return AxumStatus::NOT_FOUND };
    let values: Vec<String> = body["values"]
      .as_array()
      .map(|a| a.iter().map(|v| v.as_str().unwrap_or_default().to_string()).collect())
      .unwrap_or_default();
    rows.push(values);
    AxumStatus::OK
  }

  async fn find(
    State(s): State<Shared>,
    Path((_sheet, ws)): Path<(String, String)>,
    Query(q): Query<HashMap<String, String>>,
  ) -> Result<Json<Value>, AxumStatus> {
    let sheets = s.worksheets.lock().unwrap();
    let (_, rows) = sheets.get(&ws).ok_or(AxumStatus::NOT_FOUND)?;
    let needle = q.get("query").cloned().unwrap_or_default();
    let row = rows.iter().position(|r| r.iter().any(|c| *c == needle)).map(|i| i as u64 + 2);
    Ok(Json(json!({ "row": row })))
  }

  async fn remove(State(s): State<Shared>, Path((_sheet, ws, row)): Path<(String, String, u64)>) -> AxumStatus {
    if s.fail_delete.load(Ordering::SeqCst) {
      return AxumStatus::INTERNAL_SERVER_ERROR;
    }
    let mut sheets = s.worksheets.lock().unwrap();
    let Some((_, rows)) = sheets.get_mut(&ws) else { return AxumStatus::NOT_FOUND };
    let idx = row as usize - 2;
    if idx >= rows.len() {
      return AxumStatus::BAD_REQUEST;
    }
    rows.remove(idx);
    AxumStatus::OK
  }

  async fn spawn_fake(with_exclusions: bool) -> (Shared, RemoteStoreConfig) {
    let fake = Arc::new(FakeSheet::default());
    {
      let mut sheets = fake.worksheets.lock().unwrap();
      sheets.insert("Assignments".into(), (vec![COL_ROLL.into(), COL_ASSIGNED.into()], vec![]));
      if with_exclusions {
        sheets.insert("Exclusions".into(), (vec![COL_ROLL.into(), COL_EXCLUDED.into()], vec![]));
      }
    }
    let app = Router::new()
      .route("/spreadsheets/:sheet/worksheets/:ws/records", get(records))
      .route("/spreadsheets/:sheet/worksheets/:ws/rows", post(append))
      .route("/spreadsheets/:sheet/worksheets/:ws/find", get(find))
      .route("/spreadsheets/:sheet/worksheets/:ws/rows/:row", delete(remove))
      .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.ok();
    });

    let cfg = RemoteStoreConfig {
      base_url: format!("http://{addr}/"),
      spreadsheet: SHEET.into(),
      assignments_worksheet: "Assignments".into(),
      exclusions_worksheet: "Exclusions".into(),
      token_env: None,
      timeout_secs: 5,
    };
    (fake, cfg)
  }

  async fn spawn_store(with_exclusions: bool) -> (Shared, RemoteSheetStore) {
    let (fake, cfg) = spawn_fake(with_exclusions).await;
    (fake, RemoteSheetStore::from_config(&cfg).unwrap())
  }

  #[tokio::test]
  async fn append_load_and_archive_round_trip() {
    let (_fake, store) = spawn_store(true).await;
    store.append_assignment("11000100001", "Fibonacci Number").await.unwrap();
    store.append_assignment("11000100002", "Tower of Hanoi").await.unwrap();

    let h = store.load_all().await.unwrap();
    // numeric cells come back as JSON numbers and are normalized to strings
    assert_eq!(h.assignment_for("11000100001").map(String::as_str), Some("Fibonacci Number"));
    assert_eq!(h.assignments.len(), 2);
    assert_eq!(h, store.load_all().await.unwrap());

    store.archive_assignment("11000100001", "Fibonacci Number").await.unwrap();
    let h = store.load_all().await.unwrap();
    assert!(h.assignment_for("11000100001").is_none());
    assert!(h.exclusions_for("11000100001").contains("Fibonacci Number"));
    assert_eq!(h.assignments.len(), 1);
  }

  #[tokio::test]
  async fn missing_worksheet_is_reported_by_name() {
    let (_fake, store) = spawn_store(false).await;
    match store.load_all().await {
      Err(StoreError::WorksheetNotFound { spreadsheet, worksheet }) => {
        assert_eq!(spreadsheet, SHEET);
        assert_eq!(worksheet, "Exclusions");
      }
      other => panic!("expected WorksheetNotFound, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn misnamed_spreadsheet_is_not_blamed_on_a_worksheet() {
    let (_fake, cfg) = spawn_fake(true).await;
    let cfg = RemoteStoreConfig { spreadsheet: "LotteryHistroy".into(), ..cfg };
    let store = RemoteSheetStore::from_config(&cfg).unwrap();
    match store.load_all().await {
      Err(StoreError::SpreadsheetNotFound(name)) => assert_eq!(name, "LotteryHistroy"),
      other => panic!("expected SpreadsheetNotFound, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn duplicate_rows_archive_the_topic_that_was_reported() {
    let (fake, store) = spawn_store(true).await;
    store.append_assignment("11000100001", "Fibonacci Number").await.unwrap();
    store.append_assignment("11000100001", "Tower of Hanoi").await.unwrap();

    let h = store.load_all().await.unwrap();
    let active = h.assignment_for("11000100001").cloned().unwrap();
    assert_eq!(active, "Fibonacci Number");

    store.archive_assignment("11000100001", &active).await.unwrap();
    let sheets = fake.worksheets.lock().unwrap();
    let (_, rows) = &sheets["Assignments"];
    assert_eq!(rows, &vec![vec!["11000100001".to_string(), "Tower of Hanoi".to_string()]]);
  }

  #[tokio::test]
  async fn failed_delete_after_exclusion_is_partial_archive() {
    let (fake, store) = spawn_store(true).await;
    store.append_assignment("11000100001", "Tower of Hanoi").await.unwrap();
    fake.fail_delete.store(true, Ordering::SeqCst);

    let err = store.archive_assignment("11000100001", "Tower of Hanoi").await.unwrap_err();
    assert!(matches!(err, StoreError::PartialArchive { .. }), "got {err:?}");

    // dangling exclusion, assignment still present
    let h = store.load_all().await.unwrap();
    assert!(h.exclusions_for("11000100001").contains("Tower of Hanoi"));
    assert!(h.assignment_for("11000100001").is_some());
  }

  #[test]
  fn non_hierarchical_base_url_is_rejected() {
    let cfg = RemoteStoreConfig {
      base_url: "mailto:someone@example.com".into(),
      spreadsheet: "S".into(),
      assignments_worksheet: "A".into(),
      exclusions_worksheet: "E".into(),
      token_env: None,
      timeout_secs: 1,
    };
    assert!(matches!(RemoteSheetStore::from_config(&cfg), Err(StoreError::InvalidUrl(_))));
  }
}
