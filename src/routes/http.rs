//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs the roll number and basic result info.

use std::sync::Arc;

use axum::{
  extract::{rejection::JsonRejection, FromRequest, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::domain::RollNumber;
use crate::error::LotteryError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

/// `Json` whose rejections use the API error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(LotteryError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for LotteryError {
  fn from(rejection: JsonRejection) -> Self {
    LotteryError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for LotteryError {
  fn into_response(self) -> Response {
    let status = match &self {
      LotteryError::InvalidRollNumber { .. } => StatusCode::BAD_REQUEST,
      LotteryError::AlreadyAssigned(_) => StatusCode::CONFLICT,
      LotteryError::NotAssigned(_) => StatusCode::NOT_FOUND,
      LotteryError::UnknownTopic(_) => StatusCode::BAD_REQUEST,
      LotteryError::NoTopicAvailable(_) | LotteryError::RerollFailed { .. } => StatusCode::CONFLICT,
      LotteryError::BadRequest(_) => StatusCode::BAD_REQUEST,
      LotteryError::Roster(_) | LotteryError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    if status.is_server_error() {
      warn!(target: "lottery", error = %self, "Request failed: resource unavailable");
    }
    let revoked = match &self {
      LotteryError::RerollFailed { revoked, .. } => Some(revoked.clone()),
      _ => None,
    };
    (status, Json(ErrorOut { error: self.code(), message: self.to_string(), revoked })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut {
    ok: true,
    backend: state.store.backend(),
    roster_size: state.roster().await.len(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(CatalogOut {
    topics: state.config.catalog.clone(),
    max_assignments_per_topic: state.config.max_assignments_per_topic,
  })
}

#[instrument(level = "info", skip(state, body), fields(roll = %body.roll_number))]
pub async fn http_post_lottery(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<RollIn>,
) -> Result<Json<SubmissionOut>, LotteryError> {
  let out = logic::submit(&state, &body.roll_number).await?;
  info!(target: "lottery", roll = %out.roll_number, topic = %out.topic, status = ?out.status, "HTTP submission served");
  Ok(Json(to_out(out)))
}

#[instrument(level = "info", skip(state, body), fields(roll = %body.roll_number))]
pub async fn http_post_reroll(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<RollIn>,
) -> Result<Json<SubmissionOut>, LotteryError> {
  let out = logic::reroll(&state, &body.roll_number).await?;
  info!(target: "lottery", roll = %out.roll_number, topic = %out.topic, revoked = ?out.revoked, "HTTP re-roll served");
  Ok(Json(to_out(out)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_history(State(state): State<Arc<AppState>>) -> Result<Json<HistoryOut>, LotteryError> {
  let o = logic::overview(&state).await?;
  Ok(Json(overview_out(o)))
}

#[instrument(level = "info", skip(state, body), fields(roll = %body.roll_number))]
pub async fn http_post_unassign(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<RollIn>,
) -> Result<Json<UnassignOut>, LotteryError> {
  let revoked = logic::revoke(&state, &body.roll_number).await?;
  info!(target: "lottery", roll = %body.roll_number, %revoked, "HTTP admin un-assign served");
  Ok(Json(UnassignOut { roll_number: body.roll_number.trim().to_string(), revoked }))
}

#[instrument(level = "info", skip(state, body), fields(roll = %body.roll_number))]
pub async fn http_post_assign(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<AssignIn>,
) -> Result<Json<AssignOut>, LotteryError> {
  let roll = RollNumber::parse(&body.roll_number, state.config.roll_number_len)?;
  logic::assign(&state, &roll, &body.topic).await?;
  info!(target: "lottery", %roll, topic = %body.topic, "HTTP admin assign served");
  Ok(Json(AssignOut { roll_number: roll.to_string(), topic: body.topic }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reload_roster(State(state): State<Arc<AppState>>) -> Result<Json<RosterOut>, LotteryError> {
  let roster = state.reload_roster().await?;
  Ok(Json(RosterOut {
    students: roster.len(),
    unknown_topics: roster.unknown_topics(&state.config.catalog),
  }))
}
