//! # Application State & Configuration
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState deliberately holds no seal data: the Postgres pool is the
//! single source of truth, and every lifecycle transition runs inside
//! one database transaction. Keeping seal rows out of process memory
//! means a crash between steps can never leave a stale cached status.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::AuthKeys;

// ── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, built from the environment in `main`.
///
/// Custom `Debug` redacts the JWT secret to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// TCP port to listen on. `PORT`, default 3000.
    pub port: u16,
    /// Postgres connection string. `DATABASE_URL`, required.
    pub database_url: String,
    /// HMAC secret for signing and verifying JWTs. `JWT_SECRET`, required.
    pub jwt_secret: String,
    /// Maximum pool size. `MAX_DB_CONNECTIONS`, default 10.
    pub max_db_connections: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("jwt_secret", &"[REDACTED]")
            .field("max_db_connections", &self.max_db_connections)
            .finish()
    }
}

impl AppConfig {
    /// Build configuration from environment variables.
    ///
    /// `DATABASE_URL` and `JWT_SECRET` are required; the process refuses
    /// to start without them rather than running with a guessable secret.
    pub fn from_env() -> Result<Self, String> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set".to_string())?;
        if jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        let max_db_connections = std::env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            port,
            database_url,
            jwt_secret,
            max_db_connections,
        })
    }
}

// ── AppState ────────────────────────────────────────────────────────────────

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Postgres connection pool. The sole owner of seal state.
    pub db: PgPool,
    /// JWT signing/verification keys derived from the configured secret.
    pub auth: AuthKeys,
    /// Runtime configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Build state from configuration, connecting the pool lazily.
    ///
    /// `connect_lazy` defers the first connection until the first query,
    /// so construction never fails on a cold database. Pool errors
    /// surface per-request as 500s instead.
    pub fn new(config: AppConfig) -> Result<Self, sqlx::Error> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_db_connections)
            .connect_lazy(&config.database_url)?;
        let auth = AuthKeys::from_secret(config.jwt_secret.as_bytes());
        Ok(Self { db, auth, config })
    }
}
