//! Seal persistence operations.
//!
//! Lifecycle writes go through the caller's open transaction so the
//! `SELECT ... FOR UPDATE` lock, the status update, and the audit log
//! entry are atomic. The status column is a closed set enforced by a
//! CHECK constraint; an unknown value on read is treated as corruption
//! and surfaces as a decode error rather than a silent default.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};

use seal_core::{Holder, SealStatus};

/// A seal row as the rest of the application sees it.
#[derive(Debug, Clone, Serialize)]
pub struct SealRecord {
    pub id: i64,
    pub number: String,
    pub status: SealStatus,
    pub owner_user_id: Option<i64>,
    pub technician_id: Option<i64>,
    pub image_paths: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SealRecord {
    /// The holder pair the capability checks operate on.
    pub fn holder(&self) -> Holder {
        Holder {
            owner_user_id: self.owner_user_id,
            technician_id: self.technician_id,
        }
    }
}

const SEAL_COLUMNS: &str =
    "id, number, status, owner_user_id, technician_id, image_paths, created_at, updated_at";

/// Insert one seal in `AVAILABLE` state inside the caller's transaction.
///
/// A unique violation on `number` propagates as a database error; the
/// lifecycle engine maps it to a duplicate-number conflict and the
/// whole batch rolls back.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    number: &str,
) -> Result<SealRecord, sqlx::Error> {
    let row = sqlx::query_as::<_, SealRow>(&format!(
        "INSERT INTO seals (number, status) VALUES ($1, $2) RETURNING {SEAL_COLUMNS}"
    ))
    .bind(number)
    .bind(SealStatus::Available.as_str())
    .fetch_one(&mut **tx)
    .await?;
    row.into_record()
}

/// Fetch a seal by number and lock the row for the rest of the
/// transaction. Concurrent transitions on the same seal serialize here.
pub async fn lock_by_number(
    tx: &mut Transaction<'_, Postgres>,
    number: &str,
) -> Result<Option<SealRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, SealRow>(&format!(
        "SELECT {SEAL_COLUMNS} FROM seals WHERE number = $1 FOR UPDATE"
    ))
    .bind(number)
    .fetch_optional(&mut **tx)
    .await?;
    row.map(SealRow::into_record).transpose()
}

/// Apply a validated transition to a locked row: new status, new holder,
/// and (for installs) recorded evidence paths.
pub async fn apply_transition(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    status: SealStatus,
    holder: &Holder,
    image_paths: &[String],
) -> Result<SealRecord, sqlx::Error> {
    let images = serde_json::to_value(image_paths)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    let row = sqlx::query_as::<_, SealRow>(&format!(
        "UPDATE seals
         SET status = $1, owner_user_id = $2, technician_id = $3,
             image_paths = $4, updated_at = NOW()
         WHERE id = $5
         RETURNING {SEAL_COLUMNS}"
    ))
    .bind(status.as_str())
    .bind(holder.owner_user_id)
    .bind(holder.technician_id)
    .bind(&images)
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;
    row.into_record()
}

/// Fetch a seal by number without locking.
pub async fn get_by_number(
    pool: &PgPool,
    number: &str,
) -> Result<Option<SealRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, SealRow>(&format!(
        "SELECT {SEAL_COLUMNS} FROM seals WHERE number = $1"
    ))
    .bind(number)
    .fetch_optional(pool)
    .await?;
    row.map(SealRow::into_record).transpose()
}

/// Return which of the given numbers exist, as a single query.
pub async fn existing_numbers(
    pool: &PgPool,
    numbers: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT number FROM seals WHERE number = ANY($1)")
            .bind(numbers)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(number,)| number).collect())
}

/// List seals, optionally filtered by status, newest first.
pub async fn list(
    pool: &PgPool,
    status: Option<SealStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<SealRecord>, sqlx::Error> {
    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, SealRow>(&format!(
                "SELECT {SEAL_COLUMNS} FROM seals WHERE status = $1
                 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
            ))
            .bind(status.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, SealRow>(&format!(
                "SELECT {SEAL_COLUMNS} FROM seals
                 ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };
    rows.into_iter().map(SealRow::into_record).collect()
}

/// List the seals currently held by a technician, oldest assignment first.
pub async fn list_by_technician(
    pool: &PgPool,
    technician_id: i64,
) -> Result<Vec<SealRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SealRow>(&format!(
        "SELECT {SEAL_COLUMNS} FROM seals WHERE technician_id = $1
         ORDER BY updated_at ASC, id ASC"
    ))
    .bind(technician_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SealRow::into_record).collect()
}

/// Per-status seal counts for the inventory report.
pub async fn status_counts(pool: &PgPool) -> Result<Vec<(SealStatus, i64)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM seals GROUP BY status ORDER BY status",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|(name, count)| {
            SealStatus::from_name(&name)
                .map(|status| (status, count))
                .ok_or_else(|| unknown_status_error(&name))
        })
        .collect()
}

fn unknown_status_error(name: &str) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("unknown seal status in database: {name}"),
    )))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct SealRow {
    id: i64,
    number: String,
    status: String,
    owner_user_id: Option<i64>,
    technician_id: Option<i64>,
    image_paths: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SealRow {
    fn into_record(self) -> Result<SealRecord, sqlx::Error> {
        let status = SealStatus::from_name(&self.status).ok_or_else(|| {
            tracing::error!(
                number = %self.number,
                status = %self.status,
                "unknown seal status in database"
            );
            unknown_status_error(&self.status)
        })?;
        let image_paths: Vec<String> =
            serde_json::from_value(self.image_paths).unwrap_or_else(|e| {
                tracing::error!(
                    number = %self.number,
                    error = %e,
                    "malformed image_paths in database, treating as empty"
                );
                Vec::new()
            });
        Ok(SealRecord {
            id: self.id,
            number: self.number,
            status,
            owner_user_id: self.owner_user_id,
            technician_id: self.technician_id,
            image_paths,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
