//! # Lifecycle Transaction Engine
//!
//! Every transition runs as one Postgres transaction:
//!
//! ```text
//! BEGIN
//!   SELECT ... FOR UPDATE          -- lock the seal row
//!   authorize(op, holder, actor)   -- capability check (seal-core)
//!   validate_transition(state, op) -- pure table lookup (seal-core)
//!   UPDATE seals ...               -- new status + holder
//!   INSERT INTO seal_logs ...      -- audit entry, same transaction
//! COMMIT
//! ```
//!
//! The row lock serializes concurrent transitions on the same seal:
//! the loser of a race re-reads the committed state and fails
//! validation with a 409 instead of double-applying. Nothing here is
//! cached in process memory; the database is the only copy of seal
//! state.
//!
//! Bulk operations (generate, assign-by-code) share one transaction so
//! a batch is all-or-nothing.

use sqlx::PgPool;

use seal_core::{authorize, validate_transition, Holder, SealOperation, SealStatus};

use crate::auth::CallerIdentity;
use crate::db::seals::SealRecord;
use crate::db::{logs, seals, technicians, users};
use crate::error::AppError;

// ── Commands ────────────────────────────────────────────────────────────────

/// A requested transition with its operation-specific payload.
#[derive(Debug, Clone)]
pub enum TransitionCommand {
    /// Hand the seal to a technician (admin).
    Assign { technician_id: i64 },
    /// Grant the seal to a user (admin).
    Issue { owner_user_id: i64 },
    /// Owner consumes the seal.
    Use,
    /// Holder or admin returns the seal.
    Return,
    /// Admin re-activates a returned seal.
    Reactivate,
    /// Admin soft-deletes the seal.
    Cancel,
    /// Assigned technician installs the seal, with photo evidence.
    Install { image_paths: Vec<String> },
}

impl TransitionCommand {
    /// The lifecycle operation this command performs.
    pub fn operation(&self) -> SealOperation {
        match self {
            Self::Assign { .. } => SealOperation::AssignToTechnician,
            Self::Issue { .. } => SealOperation::Issue,
            Self::Use => SealOperation::Use,
            Self::Return => SealOperation::Return,
            Self::Reactivate => SealOperation::Reactivate,
            Self::Cancel => SealOperation::Cancel,
            Self::Install { .. } => SealOperation::Install,
        }
    }
}

// ── Single transition ───────────────────────────────────────────────────────

/// Apply one transition to one seal atomically.
///
/// Order of checks matters for error codes: a missing seal is 404
/// before anything else, then the caller's capability is judged (403),
/// and only a permitted caller learns whether the transition itself is
/// possible (409). An unrelated technician acting on an issued seal
/// gets a capability rejection, not lifecycle detail.
pub async fn apply(
    pool: &PgPool,
    number: &str,
    command: TransitionCommand,
    caller: &CallerIdentity,
) -> Result<SealRecord, AppError> {
    let actor = caller.as_actor();
    let mut tx = pool.begin().await?;

    let seal = seals::lock_by_number(&mut tx, number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("seal {number} not found")))?;

    let operation = command.operation();
    authorize(operation, &seal.holder(), &actor)?;
    let target = validate_transition(seal.status, operation)
        .map_err(|e| AppError::InvalidTransition(format!("seal {number}: {e}")))?;

    let (holder, image_paths, detail) =
        resolve_command(&mut tx, &seal, &command, target).await?;

    let updated =
        seals::apply_transition(&mut tx, seal.id, target, &holder, &image_paths).await?;
    logs::append(&mut tx, number, actor.id(), &action_label(operation, number, &detail)).await?;

    tx.commit().await?;
    tracing::info!(
        seal = %number,
        from = %seal.status,
        to = %target,
        operation = %operation,
        actor = actor.id(),
        "seal transition committed"
    );
    Ok(updated)
}

/// Resolve a command's preconditions and compute the post-transition
/// holder, running lookups inside the open transaction.
async fn resolve_command(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    seal: &SealRecord,
    command: &TransitionCommand,
    target: SealStatus,
) -> Result<(Holder, Vec<String>, Option<String>), AppError> {
    let holder = seal.holder();
    match command {
        TransitionCommand::Assign { technician_id } => {
            let technician = technicians::get_by_id_tx(tx, *technician_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("technician {technician_id} not found"))
                })?;
            if !technician.active {
                return Err(AppError::Validation(format!(
                    "technician {} is inactive",
                    technician.tech_code
                )));
            }
            Ok((
                Holder {
                    owner_user_id: None,
                    technician_id: Some(technician.id),
                },
                seal.image_paths.clone(),
                Some(format!("to technician {}", technician.tech_code)),
            ))
        }
        TransitionCommand::Issue { owner_user_id } => {
            let user = users::get_by_id_tx(tx, *owner_user_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {owner_user_id} not found")))?;
            Ok((
                Holder {
                    owner_user_id: Some(user.id),
                    technician_id: None,
                },
                seal.image_paths.clone(),
                Some(format!("to user {}", user.id)),
            ))
        }
        // Use and Return keep the holder on record so the audit trail
        // shows who last held the seal.
        TransitionCommand::Use | TransitionCommand::Return => {
            Ok((holder, seal.image_paths.clone(), None))
        }
        // Reactivate and Cancel park the seal in a holderless state.
        TransitionCommand::Reactivate | TransitionCommand::Cancel => {
            debug_assert!(target.is_holderless());
            Ok((Holder::default(), seal.image_paths.clone(), None))
        }
        TransitionCommand::Install { image_paths } => {
            if image_paths.is_empty() {
                return Err(AppError::Validation(
                    "install requires at least one image path".into(),
                ));
            }
            let detail = Some(format!("with {} images", image_paths.len()));
            Ok((holder, image_paths.clone(), detail))
        }
    }
}

// ── Evidence attachment ─────────────────────────────────────────────────────

/// Append photo evidence to a seal the caller holds, without moving it
/// through the lifecycle.
///
/// Only the assigned technician may attach images, and only while the
/// seal is assigned or installed. No audit entry is written: the log
/// records transitions only, and attaching evidence is not one.
pub async fn attach_images(
    pool: &PgPool,
    number: &str,
    new_paths: &[String],
    caller: &CallerIdentity,
) -> Result<SealRecord, AppError> {
    let mut tx = pool.begin().await?;

    let seal = seals::lock_by_number(&mut tx, number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("seal {number} not found")))?;

    if seal.holder().technician_id != Some(caller.id) {
        return Err(AppError::Forbidden(format!(
            "seal {number} is not assigned to you"
        )));
    }
    if !matches!(seal.status, SealStatus::Assigned | SealStatus::Installed) {
        return Err(AppError::InvalidTransition(format!(
            "seal {number}: images can only be attached while assigned or installed"
        )));
    }

    let mut image_paths = seal.image_paths.clone();
    image_paths.extend(new_paths.iter().cloned());

    let updated =
        seals::apply_transition(&mut tx, seal.id, seal.status, &seal.holder(), &image_paths)
            .await?;
    tx.commit().await?;
    tracing::info!(
        seal = %number,
        added = new_paths.len(),
        actor = caller.id,
        "evidence images attached"
    );
    Ok(updated)
}

// ── Bulk operations ─────────────────────────────────────────────────────────

/// Create a batch of seals in one transaction. Admin only.
///
/// All-or-nothing: one duplicate number rolls back the whole batch with
/// a 409 naming the colliding number.
pub async fn generate(
    pool: &PgPool,
    numbers: &[String],
    caller: &CallerIdentity,
) -> Result<Vec<SealRecord>, AppError> {
    let actor = caller.as_actor();
    authorize(SealOperation::Generate, &Holder::default(), &actor)?;

    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(numbers.len());
    for number in numbers {
        let seal = seals::insert(&mut tx, number).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateSealNumber(format!("seal number {number} already exists"))
            } else {
                AppError::from(e)
            }
        })?;
        logs::append(
            &mut tx,
            number,
            actor.id(),
            &action_label(SealOperation::Generate, number, &None),
        )
        .await?;
        created.push(seal);
    }
    tx.commit().await?;
    tracing::info!(count = created.len(), actor = actor.id(), "seal batch generated");
    Ok(created)
}

/// Assign a batch of seals to a technician identified by code, in one
/// transaction. Admin only. All-or-nothing: any missing seal or
/// invalid transition rolls back the whole batch.
pub async fn assign_by_tech_code(
    pool: &PgPool,
    tech_code: &str,
    numbers: &[String],
    caller: &CallerIdentity,
) -> Result<Vec<SealRecord>, AppError> {
    let actor = caller.as_actor();
    let operation = SealOperation::AssignToTechnician;

    let mut tx = pool.begin().await?;
    let technician = technicians::get_by_code_tx(&mut tx, tech_code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("technician {tech_code} not found")))?;
    if !technician.active {
        return Err(AppError::Validation(format!(
            "technician {tech_code} is inactive"
        )));
    }

    let holder = Holder {
        owner_user_id: None,
        technician_id: Some(technician.id),
    };
    let detail = Some(format!("to technician {tech_code}"));

    let mut assigned = Vec::with_capacity(numbers.len());
    for number in numbers {
        let seal = seals::lock_by_number(&mut tx, number)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("seal {number} not found")))?;
        authorize(operation, &seal.holder(), &actor)?;
        let target = validate_transition(seal.status, operation)
            .map_err(|e| AppError::InvalidTransition(format!("seal {number}: {e}")))?;

        let updated =
            seals::apply_transition(&mut tx, seal.id, target, &holder, &seal.image_paths).await?;
        logs::append(&mut tx, number, actor.id(), &action_label(operation, number, &detail))
            .await?;
        assigned.push(updated);
    }
    tx.commit().await?;
    tracing::info!(
        count = assigned.len(),
        technician = %tech_code,
        actor = actor.id(),
        "seal batch assigned"
    );
    Ok(assigned)
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Audit label: canonical operation token, then the seal number, then
/// any detail. The replay tooling parses the leading token.
fn action_label(operation: SealOperation, number: &str, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("{} seal {} {}", operation.as_str(), number, detail),
        None => format!("{} seal {}", operation.as_str(), number),
    }
}

/// Postgres unique violation (SQLSTATE 23505).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
