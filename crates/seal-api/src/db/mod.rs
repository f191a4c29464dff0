//! # Persistence Layer
//!
//! Plain async functions over `sqlx` — no repository traits. Read paths
//! take a `&PgPool`; anything that participates in a lifecycle
//! transition takes the open `Transaction` so the row lock, the status
//! update, and the audit log entry commit or roll back together.
//!
//! Each submodule owns one table and maps internal `*Row` structs to
//! public `*Record` types.

pub mod logs;
pub mod seals;
pub mod technicians;
pub mod users;

use sqlx::PgPool;

/// Apply embedded migrations. Run once at startup before serving.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
