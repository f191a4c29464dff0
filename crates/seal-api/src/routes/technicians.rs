//! # Technician API
//!
//! Self-service endpoints for field technicians plus admin management.
//! Registration and login are public; everything else sits behind the
//! auth middleware.
//!
//! - **POST `/api/technicians/register`** — public
//! - **POST `/api/technicians/login`** — public, returns technician JWT
//! - **GET `/api/technicians`** — list (any authenticated caller)
//! - **POST `/api/technicians/import`** — bulk register (admin)
//! - **PUT `/api/technicians/:id`** — update profile (admin)
//! - **DELETE `/api/technicians/:id`** — deactivate (admin)
//! - **GET `/api/technicians/my-seals`** — seals held by the caller
//! - **PUT `/api/technicians/seals/:seal_number/install`** — install
//!   with image evidence
//! - **POST `/api/technicians/seals/:seal_number/images`** — attach
//!   more photo evidence to a held seal
//! - **PUT `/api/technicians/seals/:seal_number/return`** — return an
//!   installed seal

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{
    hash_password, require_admin, require_technician, verify_password, CallerIdentity, Role,
};
use crate::db::seals::{self, SealRecord};
use crate::db::technicians::{self, TechnicianView};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::lifecycle::{self, TransitionCommand};
use crate::state::AppState;

/// Build the public technician router (registration + login).
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/technicians/register", post(register))
        .route("/api/technicians/login", post(login))
}

/// Build the authenticated technician router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/technicians", get(list_technicians))
        .route("/api/technicians/import", post(import_technicians))
        .route("/api/technicians/my-seals", get(my_seals))
        .route(
            "/api/technicians/:id",
            put(update_technician).delete(delete_technician),
        )
        .route(
            "/api/technicians/seals/:seal_number/install",
            put(install_seal),
        )
        .route(
            "/api/technicians/seals/:seal_number/images",
            post(upload_images),
        )
        .route(
            "/api/technicians/seals/:seal_number/return",
            put(return_seal),
        )
}

// ── Request / Response types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub tech_code: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        if self.tech_code.trim().is_empty() {
            return Err("tech_code must not be empty".to_string());
        }
        if self.tech_code.len() > 32 {
            return Err("tech_code must not exceed 32 characters".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.password.len() < 6 {
            return Err("password must be at least 6 characters".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct TechnicianLoginRequest {
    pub tech_code: String,
    pub password: String,
}

impl Validate for TechnicianLoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.tech_code.trim().is_empty() {
            return Err("tech_code must not be empty".to_string());
        }
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTechnicianRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

impl Validate for UpdateTechnicianRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err("name must not be empty".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct InstallRequest {
    pub image_paths: Vec<String>,
}

impl Validate for InstallRequest {
    fn validate(&self) -> Result<(), String> {
        if self.image_paths.is_empty() {
            return Err("image_paths must not be empty".to_string());
        }
        if self.image_paths.iter().any(|p| p.trim().is_empty()) {
            return Err("image_paths must not contain empty entries".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub technicians: Vec<RegisterRequest>,
}

impl Validate for ImportRequest {
    fn validate(&self) -> Result<(), String> {
        if self.technicians.is_empty() {
            return Err("technicians must not be empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for entry in &self.technicians {
            entry.validate()?;
            if !seen.insert(entry.tech_code.trim()) {
                return Err(format!(
                    "tech_code {} appears more than once",
                    entry.tech_code.trim()
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadImagesRequest {
    pub image_paths: Vec<String>,
}

impl Validate for UploadImagesRequest {
    fn validate(&self) -> Result<(), String> {
        if self.image_paths.is_empty() {
            return Err("image_paths must not be empty".to_string());
        }
        if self.image_paths.iter().any(|p| p.trim().is_empty()) {
            return Err("image_paths must not contain empty entries".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct TechnicianLoginResponse {
    pub token: String,
    pub technician: TechnicianView,
}

// ── Public handlers ─────────────────────────────────────────────────────────

/// POST /api/technicians/register — create a technician account.
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TechnicianView>), AppError> {
    let req = extract_validated_json(body)?;
    let password_hash = hash_password(&req.password);
    let technician = technicians::insert(
        &state.db,
        req.tech_code.trim(),
        req.name.trim(),
        req.email.trim(),
        req.phone.trim(),
        &password_hash,
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Validation(format!(
                "tech_code {} is already registered",
                req.tech_code.trim()
            ))
        } else {
            AppError::from(e)
        }
    })?;
    tracing::info!(tech_code = %technician.tech_code, "technician registered");
    Ok((StatusCode::CREATED, Json(technician.into_view())))
}

/// POST /api/technicians/login — verify credentials and mint a token.
async fn login(
    State(state): State<AppState>,
    body: Result<Json<TechnicianLoginRequest>, JsonRejection>,
) -> Result<Json<TechnicianLoginResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let technician = technicians::get_by_code(&state.db, req.tech_code.trim())
        .await?
        .ok_or_else(invalid_credentials)?;
    if !verify_password(&req.password, &technician.password_hash) {
        tracing::warn!(tech_code = %technician.tech_code, "login failed: bad password");
        return Err(invalid_credentials());
    }
    if !technician.active {
        return Err(AppError::Forbidden(format!(
            "technician {} is deactivated",
            technician.tech_code
        )));
    }

    let identity = CallerIdentity {
        id: technician.id,
        role: Role::Technician,
        handle: technician.tech_code.clone(),
    };
    let token = state.auth.issue_token(&identity)?;

    Ok(Json(TechnicianLoginResponse {
        token,
        technician: technician.into_view(),
    }))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid tech code or password".to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

// ── Authenticated handlers ──────────────────────────────────────────────────

/// GET /api/technicians — list all technicians.
async fn list_technicians(
    State(state): State<AppState>,
    _caller: CallerIdentity,
) -> Result<Json<Vec<TechnicianView>>, AppError> {
    let records = technicians::list(&state.db).await?;
    Ok(Json(
        records
            .into_iter()
            .map(technicians::TechnicianRecord::into_view)
            .collect(),
    ))
}

/// POST /api/technicians/import — bulk register technicians (admin).
///
/// One transaction for the whole batch: a duplicate tech code rolls
/// everything back with an error naming the colliding code.
async fn import_technicians(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<TechnicianView>>), AppError> {
    require_admin(&caller)?;
    let req = extract_validated_json(body)?;

    let mut tx = state.db.begin().await?;
    let mut imported = Vec::with_capacity(req.technicians.len());
    for entry in &req.technicians {
        let password_hash = hash_password(&entry.password);
        let technician = technicians::insert_tx(
            &mut tx,
            entry.tech_code.trim(),
            entry.name.trim(),
            entry.email.trim(),
            entry.phone.trim(),
            &password_hash,
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation(format!(
                    "tech_code {} is already registered",
                    entry.tech_code.trim()
                ))
            } else {
                AppError::from(e)
            }
        })?;
        imported.push(technician.into_view());
    }
    tx.commit().await?;
    tracing::info!(count = imported.len(), "technician batch imported");
    Ok((StatusCode::CREATED, Json(imported)))
}

/// PUT /api/technicians/:id — update profile fields (admin).
async fn update_technician(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<UpdateTechnicianRequest>, JsonRejection>,
) -> Result<Json<TechnicianView>, AppError> {
    require_admin(&caller)?;
    let req = extract_validated_json(body)?;
    let updated = technicians::update_profile(
        &state.db,
        id,
        req.name.as_deref().map(str::trim),
        req.email.as_deref().map(str::trim),
        req.phone.as_deref().map(str::trim),
        req.active,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("technician {id} not found")))?;
    Ok(Json(updated.into_view()))
}

/// DELETE /api/technicians/:id — deactivate (admin).
///
/// Soft delete: past seal assignments keep a valid reference.
async fn delete_technician(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    let removed = technicians::deactivate(&state.db, id).await?;
    if !removed {
        return Err(AppError::NotFound(format!("technician {id} not found")));
    }
    tracing::info!(technician = id, "technician deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/technicians/my-seals — seals currently held by the caller.
async fn my_seals(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<SealRecord>>, AppError> {
    require_technician(&caller)?;
    let records = seals::list_by_technician(&state.db, caller.id).await?;
    Ok(Json(records))
}

/// PUT /api/technicians/seals/:seal_number/install — install with
/// photo evidence. Only the assigned technician passes the capability
/// check in the lifecycle engine.
async fn install_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
    body: Result<Json<InstallRequest>, JsonRejection>,
) -> Result<Json<SealRecord>, AppError> {
    require_technician(&caller)?;
    let req = extract_validated_json(body)?;
    let command = TransitionCommand::Install {
        image_paths: req.image_paths,
    };
    let seal = lifecycle::apply(&state.db, &number, command, &caller).await?;
    Ok(Json(seal))
}

/// POST /api/technicians/seals/:seal_number/images — attach more photo
/// evidence to a seal the caller holds. Does not change the status.
async fn upload_images(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
    body: Result<Json<UploadImagesRequest>, JsonRejection>,
) -> Result<Json<SealRecord>, AppError> {
    require_technician(&caller)?;
    let req = extract_validated_json(body)?;
    let seal = lifecycle::attach_images(&state.db, &number, &req.image_paths, &caller).await?;
    Ok(Json(seal))
}

/// PUT /api/technicians/seals/:seal_number/return — return an
/// installed seal.
async fn return_seal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(number): Path<String>,
) -> Result<Json<SealRecord>, AppError> {
    require_technician(&caller)?;
    let seal = lifecycle::apply(&state.db, &number, TransitionCommand::Return, &caller).await?;
    Ok(Json(seal))
}
