//! Audit log persistence.
//!
//! The log is append-only: entries are written inside the same
//! transaction as the transition they record and never updated or
//! deleted. Filtered reads return ascending `(timestamp, id)` so a
//! seal's history replays in order; the firehose listing is newest
//! first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// One audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub id: Uuid,
    pub seal_number: String,
    pub actor_id: i64,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

const LOG_COLUMNS: &str = "id, seal_number, actor_id, action, timestamp";

/// Ordering clause for history reads. Entries written in the same
/// millisecond tie-break on id so replay order is deterministic.
const HISTORY_ORDER: &str = "ORDER BY timestamp ASC, id ASC";

/// Append an entry inside the caller's transition transaction.
pub async fn append(
    tx: &mut Transaction<'_, Postgres>,
    seal_number: &str,
    actor_id: i64,
    action: &str,
) -> Result<LogRecord, sqlx::Error> {
    let row = sqlx::query_as::<_, LogRow>(&format!(
        "INSERT INTO seal_logs (id, seal_number, actor_id, action)
         VALUES ($1, $2, $3, $4)
         RETURNING {LOG_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(seal_number)
    .bind(actor_id)
    .bind(action)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.into_record())
}

/// Full history of one seal, oldest first.
pub async fn list_by_seal(
    pool: &PgPool,
    seal_number: &str,
) -> Result<Vec<LogRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogRow>(&format!(
        "SELECT {LOG_COLUMNS} FROM seal_logs WHERE seal_number = $1 {HISTORY_ORDER}"
    ))
    .bind(seal_number)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(LogRow::into_record).collect())
}

/// Every action performed by one actor, oldest first.
pub async fn list_by_actor(pool: &PgPool, actor_id: i64) -> Result<Vec<LogRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogRow>(&format!(
        "SELECT {LOG_COLUMNS} FROM seal_logs WHERE actor_id = $1 {HISTORY_ORDER}"
    ))
    .bind(actor_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(LogRow::into_record).collect())
}

/// Entries whose action label contains any of the given fragments,
/// oldest first.
///
/// Matching is on the stored label, which starts with the canonical
/// operation token, so `ISSUE` finds every issue transition. Multiple
/// fragments are OR-combined.
pub async fn list_by_action(
    pool: &PgPool,
    fragments: &[String],
) -> Result<Vec<LogRecord>, sqlx::Error> {
    let patterns: Vec<String> = fragments
        .iter()
        .map(|f| format!("%{}%", escape_like(f)))
        .collect();
    let rows = sqlx::query_as::<_, LogRow>(&format!(
        "SELECT {LOG_COLUMNS} FROM seal_logs WHERE action ILIKE ANY($1) {HISTORY_ORDER}"
    ))
    .bind(&patterns)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(LogRow::into_record).collect())
}

/// Entries within a half-open time window `[from, until)`, oldest first.
pub async fn list_by_range(
    pool: &PgPool,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<LogRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogRow>(&format!(
        "SELECT {LOG_COLUMNS} FROM seal_logs
         WHERE timestamp >= $1 AND timestamp < $2 {HISTORY_ORDER}"
    ))
    .bind(from)
    .bind(until)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(LogRow::into_record).collect())
}

/// The whole log, newest first, paginated.
pub async fn list_all(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<LogRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogRow>(&format!(
        "SELECT {LOG_COLUMNS} FROM seal_logs
         ORDER BY timestamp DESC, id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(LogRow::into_record).collect())
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(fragment: &str) -> String {
    fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct LogRow {
    id: Uuid,
    seal_number: String,
    actor_id: i64,
    action: String,
    timestamp: DateTime<Utc>,
}

impl LogRow {
    fn into_record(self) -> LogRecord {
        LogRecord {
            id: self.id,
            seal_number: self.seal_number,
            actor_id: self.actor_id,
            action: self.action,
            timestamp: self.timestamp,
        }
    }
}
