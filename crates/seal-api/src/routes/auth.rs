//! # User Authentication API
//!
//! `POST /api/auth/login` — username/password against the users table,
//! returning an HS256 JWT. Unknown users and wrong passwords produce
//! the same response so the endpoint cannot be used to probe for
//! accounts.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{verify_password, CallerIdentity, Role};
use crate::db::users::{self, UserView};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Build the auth router. Mounted outside the auth middleware.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/auth/login", post(login))
}

// ── Request / Response types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username must not be empty".to_string());
        }
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /api/auth/login — verify credentials and mint a token.
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let user = users::get_by_username(&state.db, req.username.trim())
        .await?
        .ok_or_else(invalid_credentials)?;
    if !verify_password(&req.password, &user.password_hash) {
        tracing::warn!(username = %user.username, "login failed: bad password");
        return Err(invalid_credentials());
    }

    let identity = CallerIdentity {
        id: user.id,
        role: if user.is_admin() { Role::Admin } else { Role::User },
        handle: user.username.clone(),
    };
    let token = state.auth.issue_token(&identity)?;

    Ok(Json(LoginResponse {
        token,
        user: user.into_view(),
    }))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid username or password".to_string())
}
