//! # Seal Inventory & Lifecycle API
//!
//! HTTP surface for seal records. Implements:
//!
//! - **GET `/api/seals`** — list seals, optionally filtered by status
//! - **POST `/api/seals`** — create one seal (admin)
//! - **POST `/api/seals/generate`** — bulk generate from base + count (admin)
//! - **PUT `/api/seals/:seal_number/assign`** — assign to a technician (admin)
//! - **POST `/api/seals/assign-by-techcode`** — bulk assign by code (admin)
//! - **PUT `/api/seals/:seal_number/issue`** — issue to a user (admin)
//! - **PUT `/api/seals/:seal_number/use`** — owner uses the seal
//! - **PUT `/api/seals/:seal_number/return`** — owner or admin returns it
//! - **PUT `/api/seals/:seal_number/reactivate`** — back to AVAILABLE (admin)
//! - **PUT `/api/seals/:seal_number/cancel`** — soft delete (admin)
//! - **POST `/api/seals/scan`** — barcode existence lookup
//! - **GET `/api/seals/check/:seal_number`** — single existence check
//! - **GET `/api/seals/check?numbers=a,b,c`** — multi existence check
//! - **GET `/api/seals/status/:status`** — list by status
//! - **GET `/api/seals/report`** — counts per status (admin)
//! - **GET `/api/seals/:seal_number`** — fetch one
//!
//! Role checks for transitions live in the lifecycle engine, not here:
//! a handler only shapes the request into a [`TransitionCommand`].

use std::collections::HashSet;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use seal_core::{sequential_numbers, SealStatus};

use crate::auth::{require_admin, CallerIdentity};
use crate::db::seals::{self, SealRecord};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::lifecycle::{self, TransitionCommand};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// Build the seals router. All routes sit behind the auth middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/seals", get(list_seals).post(create_seal))
        .route("/api/seals/generate", post(generate_seals))
        .route("/api/seals/assign-by-techcode", post(assign_by_techcode))
        .route("/api/seals/scan", post(scan_seal))
        .route("/api/seals/check", get(check_many))
        .route("/api/seals/check/:seal_number", get(check_one))
        .route("/api/seals/status/:status", get(list_by_status))
        .route("/api/seals/report", get(status_report))
        .route("/api/seals/:seal_number", get(get_seal))
        .route("/api/seals/:seal_number/assign", put(assign_seal))
        .route("/api/seals/:seal_number/issue", put(issue_seal))
        .route("/api/seals/:seal_number/use", put(use_seal))
        .route("/api/seals/:seal_number/return", put(return_seal))
        .route("/api/seals/:seal_number/reactivate", put(reactivate_seal))
        .route("/api/seals/:seal_number/cancel", put(cancel_seal))
}

// ── Request / Response types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Optional status filter, canonical name (e.g. `ASSIGNED`).
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSealRequest {
    pub number: String,
}

impl Validate for CreateSealRequest {
    fn validate(&self) -> Result<(), String> {
        validate_seal_number(&self.number)
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Base number whose numeric suffix seeds the sequence.
    pub base_number: String,
    pub count: u32,
}

impl Validate for GenerateRequest {
    fn validate(&self) -> Result<(), String> {
        validate_seal_number(&self.base_number)
        // count bounds are checked by the number generator.
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub technician_id: i64,
}

impl Validate for AssignRequest {
    fn validate(&self) -> Result<(), String> {
        if self.technician_id <= 0 {
            return Err("technician_id must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignByCodeRequest {
    pub tech_code: String,
    pub seal_numbers: Vec<String>,
}

impl Validate for AssignByCodeRequest {
    fn validate(&self) -> Result<(), String> {
        if self.tech_code.trim().is_empty() {
            return Err("tech_code must not be empty".to_string());
        }
        if self.seal_numbers.is_empty() {
            return Err("seal_numbers must not be empty".to_string());
        }
        for number in &self.seal_numbers {
            validate_seal_number(number)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub user_id: i64,
}

impl Validate for IssueRequest {
    fn validate(&self) -> Result<(), String> {
        if self.user_id <= 0 {
            return Err("user_id must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub number: String,
}

impl Validate for ScanRequest {
    fn validate(&self) -> Result<(), String> {
        validate_seal_number(&self.number)
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckManyParams {
    /// Comma-separated seal numbers.
    pub numbers: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seal: Option<SealRecord>,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub number: String,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub count: usize,
    pub seals: Vec<SealRecord>,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub counts: Vec<StatusCount>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: SealStatus,
    pub count: i64,
}

fn validate_seal_number(number: &str) -> Result<(), String> {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        return Err("seal number must not be empty".to_string());
    }
    if trimmed.len() > 64 {
        return Err("seal number must not exceed 64 characters".to_string());
    }
    Ok(())
}

fn parse_status(name: &str) -> Result<SealStatus, AppError> {
    SealStatus::from_name(name)
        .ok_or_else(|| AppError::Validation(format!("unknown seal status: {name}")))
}

// ── Inventory handlers ──────────────────────────────────────────────────────

/// GET /api/seals — list seals, newest first.
async fn list_seals(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<SealRecord>>, AppError> {
    let status = params.status.as_deref().map(parse_status).transpose()?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);
    let records = seals::list(&state.db, status, limit, offset).await?;
    Ok(Json(records))
}

/// POST /api/seals — create a single seal (admin).
async fn create_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateSealRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SealRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let numbers = vec![req.number.trim().to_string()];
    let mut created = lifecycle::generate(&state.db, &numbers, &caller).await?;
    let seal = created
        .pop()
        .ok_or_else(|| AppError::Internal("generation returned no records".into()))?;
    Ok((StatusCode::CREATED, Json(seal)))
}

/// POST /api/seals/generate — bulk generate sequential numbers (admin).
async fn generate_seals(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BatchResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let numbers = sequential_numbers(&req.base_number, req.count)?;
    let created = lifecycle::generate(&state.db, &numbers, &caller).await?;
    Ok((
        StatusCode::CREATED,
        Json(BatchResponse {
            count: created.len(),
            seals: created,
        }),
    ))
}

/// GET /api/seals/:seal_number — fetch one seal.
async fn get_seal(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<SealRecord>, AppError> {
    seals::get_by_number(&state.db, &number)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("seal {number} not found")))
}

/// GET /api/seals/status/:status — list seals in one state.
async fn list_by_status(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(status): Path<String>,
) -> Result<Json<Vec<SealRecord>>, AppError> {
    let status = parse_status(&status)?;
    let records = seals::list(&state.db, Some(status), MAX_LIMIT, 0).await?;
    Ok(Json(records))
}

/// GET /api/seals/report — per-status counts (admin).
async fn status_report(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<StatusReport>, AppError> {
    require_admin(&caller)?;
    let counts = seals::status_counts(&state.db).await?;
    let total = counts.iter().map(|(_, n)| n).sum();
    Ok(Json(StatusReport {
        counts: counts
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
        total,
    }))
}

// ── Existence checks ────────────────────────────────────────────────────────

/// POST /api/seals/scan — barcode lookup, returns the record if present.
async fn scan_seal(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let seal = seals::get_by_number(&state.db, req.number.trim()).await?;
    Ok(Json(ScanResponse {
        exists: seal.is_some(),
        seal,
    }))
}

/// GET /api/seals/check/:seal_number — single existence check.
async fn check_one(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<CheckResult>, AppError> {
    let exists = seals::get_by_number(&state.db, &number).await?.is_some();
    Ok(Json(CheckResult { number, exists }))
}

/// GET /api/seals/check?numbers=a,b,c — multi existence check.
async fn check_many(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Query(params): Query<CheckManyParams>,
) -> Result<Json<Vec<CheckResult>>, AppError> {
    let numbers: Vec<String> = params
        .numbers
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    if numbers.is_empty() {
        return Err(AppError::Validation("numbers must not be empty".into()));
    }
    // One round trip for the whole batch; results keep request order.
    let found: HashSet<String> = seals::existing_numbers(&state.db, &numbers)
        .await?
        .into_iter()
        .collect();
    let results = numbers
        .into_iter()
        .map(|number| {
            let exists = found.contains(&number);
            CheckResult { number, exists }
        })
        .collect();
    Ok(Json(results))
}

// ── Transition handlers ─────────────────────────────────────────────────────

/// PUT /api/seals/:seal_number/assign — hand to a technician (admin).
async fn assign_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> Result<Json<SealRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let command = TransitionCommand::Assign {
        technician_id: req.technician_id,
    };
    let seal = lifecycle::apply(&state.db, &number, command, &caller).await?;
    Ok(Json(seal))
}

/// POST /api/seals/assign-by-techcode — bulk assign by code (admin).
async fn assign_by_techcode(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<AssignByCodeRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let numbers: Vec<String> = req
        .seal_numbers
        .iter()
        .map(|n| n.trim().to_string())
        .collect();
    let assigned =
        lifecycle::assign_by_tech_code(&state.db, req.tech_code.trim(), &numbers, &caller).await?;
    Ok(Json(BatchResponse {
        count: assigned.len(),
        seals: assigned,
    }))
}

/// PUT /api/seals/:seal_number/issue — grant to a user (admin).
async fn issue_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Json<SealRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let command = TransitionCommand::Issue {
        owner_user_id: req.user_id,
    };
    let seal = lifecycle::apply(&state.db, &number, command, &caller).await?;
    Ok(Json(seal))
}

/// PUT /api/seals/:seal_number/use — owner consumes the seal.
async fn use_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<SealRecord>, AppError> {
    let seal = lifecycle::apply(&state.db, &number, TransitionCommand::Use, &caller).await?;
    Ok(Json(seal))
}

/// PUT /api/seals/:seal_number/return — holder or admin returns it.
async fn return_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<SealRecord>, AppError> {
    let seal = lifecycle::apply(&state.db, &number, TransitionCommand::Return, &caller).await?;
    Ok(Json(seal))
}

/// PUT /api/seals/:seal_number/reactivate — RETURNED back to AVAILABLE (admin).
async fn reactivate_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<SealRecord>, AppError> {
    let seal =
        lifecycle::apply(&state.db, &number, TransitionCommand::Reactivate, &caller).await?;
    Ok(Json(seal))
}

/// PUT /api/seals/:seal_number/cancel — soft delete (admin).
async fn cancel_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<SealRecord>, AppError> {
    let seal = lifecycle::apply(&state.db, &number, TransitionCommand::Cancel, &caller).await?;
    Ok(Json(seal))
}
