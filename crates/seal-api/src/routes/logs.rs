//! # Audit Log API
//!
//! Read-only queries over the append-only transition log. Admin only.
//!
//! - **GET `/api/logs`** — recent activity, newest first
//! - **GET `/api/logs/seal/:seal_number`** — one seal's history
//! - **GET `/api/logs/user/:user_id`** — one actor's actions
//! - **GET `/api/logs/action?q=install&q=return`** — keyword search,
//!   OR-combined
//! - **GET `/api/logs/range?from=YYYY-MM-DD&to=YYYY-MM-DD`** — window
//!
//! Filtered reads return oldest-first so a history replays in order;
//! only the unfiltered listing is reverse-chronological.

use axum::extract::{Path, Query, RawQuery, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::auth::{require_admin, CallerIdentity};
use crate::db::logs::{self, LogRecord};
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// Build the logs router. All routes sit behind the auth middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/logs", get(list_logs))
        .route("/api/logs/seal/:seal_number", get(logs_by_seal))
        .route("/api/logs/user/:user_id", get(logs_by_user))
        .route("/api/logs/action", get(logs_by_action))
        .route("/api/logs/range", get(logs_by_range))
}

// ── Request types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    /// Inclusive start date, `YYYY-MM-DD`.
    pub from: String,
    /// Inclusive end date, `YYYY-MM-DD`.
    pub to: String,
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// GET /api/logs — recent activity, newest first.
async fn list_logs(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    require_admin(&caller)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);
    let records = logs::list_all(&state.db, limit, offset).await?;
    Ok(Json(records))
}

/// GET /api/logs/seal/:seal_number — one seal's history, oldest first.
async fn logs_by_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    require_admin(&caller)?;
    let records = logs::list_by_seal(&state.db, &number).await?;
    Ok(Json(records))
}

/// GET /api/logs/user/:user_id — one actor's actions, oldest first.
async fn logs_by_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    require_admin(&caller)?;
    let records = logs::list_by_actor(&state.db, user_id).await?;
    Ok(Json(records))
}

/// GET /api/logs/action?q=install&q=return — keyword search.
///
/// Repeated `q` keys are OR-combined. Parsed from the raw query string
/// because form-urlencoded deserialization rejects repeated keys.
async fn logs_by_action(
    State(state): State<AppState>,
    caller: CallerIdentity,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    require_admin(&caller)?;
    let keywords = parse_keywords(query.as_deref().unwrap_or(""));
    if keywords.is_empty() {
        return Err(AppError::Validation(
            "at least one q parameter is required".into(),
        ));
    }
    let records = logs::list_by_action(&state.db, &keywords).await?;
    Ok(Json(records))
}

/// GET /api/logs/range?from=&to= — inclusive day window, oldest first.
async fn logs_by_range(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    require_admin(&caller)?;
    let from_day = parse_day(&params.from)?;
    let to_day = parse_day(&params.to)?;
    if to_day < from_day {
        return Err(AppError::Validation("to must not precede from".into()));
    }

    let (from, until) = day_window(from_day, to_day)?;
    let records = logs::list_by_range(&state.db, from, until).await?;
    Ok(Json(records))
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn parse_day(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date (expected YYYY-MM-DD): {value}")))
}

/// Turn an inclusive day range into a half-open UTC timestamp window.
///
/// The upper bound is midnight of the day after `to_day`, so every
/// instant of the final day is covered without naming a last tick.
fn day_window(
    from_day: NaiveDate,
    to_day: NaiveDate,
) -> Result<(chrono::DateTime<Utc>, chrono::DateTime<Utc>), AppError> {
    let day_after = to_day
        .succ_opt()
        .ok_or_else(|| AppError::Validation("to is out of range".into()))?;
    let from = Utc.from_utc_datetime(&from_day.and_hms_opt(0, 0, 0).unwrap_or_default());
    let until = Utc.from_utc_datetime(&day_after.and_hms_opt(0, 0, 0).unwrap_or_default());
    Ok((from, until))
}

/// Collect repeated `q` keys from a raw query string.
fn parse_keywords(query: &str) -> Vec<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == "q")
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.trim().is_empty())
        .collect()
}
