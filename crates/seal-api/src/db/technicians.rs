//! Technician persistence operations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};

/// A technician row. The password hash never leaves the db layer's
/// callers; responses serialize through DTOs that drop it.
#[derive(Debug, Clone)]
pub struct TechnicianRecord {
    pub id: i64,
    pub tech_code: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub active: bool,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a technician, safe to serialize in responses.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicianView {
    pub id: i64,
    pub tech_code: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TechnicianRecord {
    pub fn into_view(self) -> TechnicianView {
        TechnicianView {
            id: self.id,
            tech_code: self.tech_code,
            name: self.name,
            email: self.email,
            phone: self.phone,
            active: self.active,
            created_at: self.created_at,
        }
    }
}

const TECHNICIAN_COLUMNS: &str =
    "id, tech_code, name, email, phone, active, password_hash, created_at, updated_at";

/// Register a new technician. A duplicate `tech_code` propagates as a
/// unique violation for the caller to map.
pub async fn insert(
    pool: &PgPool,
    tech_code: &str,
    name: &str,
    email: &str,
    phone: &str,
    password_hash: &str,
) -> Result<TechnicianRecord, sqlx::Error> {
    let row = sqlx::query_as::<_, TechnicianRow>(&format!(
        "INSERT INTO technicians (tech_code, name, email, phone, password_hash)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {TECHNICIAN_COLUMNS}"
    ))
    .bind(tech_code)
    .bind(name)
    .bind(email)
    .bind(phone)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(row.into_record())
}

/// Register a technician inside an open transaction. Used by bulk
/// import so a batch is all-or-nothing.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    tech_code: &str,
    name: &str,
    email: &str,
    phone: &str,
    password_hash: &str,
) -> Result<TechnicianRecord, sqlx::Error> {
    let row = sqlx::query_as::<_, TechnicianRow>(&format!(
        "INSERT INTO technicians (tech_code, name, email, phone, password_hash)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {TECHNICIAN_COLUMNS}"
    ))
    .bind(tech_code)
    .bind(name)
    .bind(email)
    .bind(phone)
    .bind(password_hash)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.into_record())
}

/// Fetch a technician by code.
pub async fn get_by_code(
    pool: &PgPool,
    tech_code: &str,
) -> Result<Option<TechnicianRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, TechnicianRow>(&format!(
        "SELECT {TECHNICIAN_COLUMNS} FROM technicians WHERE tech_code = $1"
    ))
    .bind(tech_code)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(TechnicianRow::into_record))
}

/// Resolve a technician inside an open lifecycle transaction.
///
/// Used by assignment to confirm the target exists and is active before
/// the seal row is updated, under the same transaction.
pub async fn get_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<TechnicianRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, TechnicianRow>(&format!(
        "SELECT {TECHNICIAN_COLUMNS} FROM technicians WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(TechnicianRow::into_record))
}

/// Resolve a technician by code inside an open lifecycle transaction.
pub async fn get_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    tech_code: &str,
) -> Result<Option<TechnicianRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, TechnicianRow>(&format!(
        "SELECT {TECHNICIAN_COLUMNS} FROM technicians WHERE tech_code = $1"
    ))
    .bind(tech_code)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(TechnicianRow::into_record))
}

/// List all technicians, newest first.
pub async fn list(pool: &PgPool) -> Result<Vec<TechnicianRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TechnicianRow>(&format!(
        "SELECT {TECHNICIAN_COLUMNS} FROM technicians ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(TechnicianRow::into_record).collect())
}

/// Update mutable profile fields. `None` leaves a field unchanged.
pub async fn update_profile(
    pool: &PgPool,
    id: i64,
    name: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
    active: Option<bool>,
) -> Result<Option<TechnicianRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, TechnicianRow>(&format!(
        "UPDATE technicians
         SET name = COALESCE($1, name),
             email = COALESCE($2, email),
             phone = COALESCE($3, phone),
             active = COALESCE($4, active),
             updated_at = NOW()
         WHERE id = $5
         RETURNING {TECHNICIAN_COLUMNS}"
    ))
    .bind(name)
    .bind(email)
    .bind(phone)
    .bind(active)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(TechnicianRow::into_record))
}

/// Deactivate a technician. Soft delete: the row stays so historical
/// seal assignments keep a valid reference.
pub async fn deactivate(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE technicians SET active = FALSE, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct TechnicianRow {
    id: i64,
    tech_code: String,
    name: String,
    email: String,
    phone: String,
    active: bool,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TechnicianRow {
    fn into_record(self) -> TechnicianRecord {
        TechnicianRecord {
            id: self.id,
            tech_code: self.tech_code,
            name: self.name,
            email: self.email,
            phone: self.phone,
            active: self.active,
            password_hash: self.password_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
