//! # Lifecycle Transition Rules
//!
//! The seal transition table and the actor capability checks, as pure
//! predicates over `(current state, operation, actor)`. Both return
//! structured errors — never a bare boolean — so callers can report the
//! precise rejection cause.
//!
//! ## Transition table
//!
//! ```text
//! (none) ──Generate──────────▶ AVAILABLE
//! AVAILABLE ──AssignToTechnician──▶ ASSIGNED
//! ASSIGNED ──Issue───────────▶ ISSUED
//! ASSIGNED ──Install─────────▶ INSTALLED
//! ISSUED ──Use───────────────▶ USED
//! USED / INSTALLED ──Return──▶ RETURNED
//! RETURNED ──Reactivate──────▶ AVAILABLE
//! ASSIGNED / ISSUED / USED ──Cancel──▶ CANCELLED
//! ```
//!
//! Any `(state, operation)` pair not in the table is an
//! [`TransitionError::InvalidTransition`] and the record must be left
//! unchanged by the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::SealStatus;

// ── Operations ───────────────────────────────────────────────────────

/// An operation attempted against a seal.
///
/// `Generate` is the creation operation; it has no source state and is
/// therefore not accepted by [`validate_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SealOperation {
    /// Create seal records in `AVAILABLE` state (single or bulk).
    Generate,
    /// Hand a seal to a field technician.
    AssignToTechnician,
    /// Grant a seal to an end user (administrative).
    Issue,
    /// Owner consumes the seal.
    Use,
    /// Holder (or an admin) returns the seal.
    Return,
    /// Administrative re-activation of a returned seal.
    Reactivate,
    /// Administrative soft-delete.
    Cancel,
    /// Assigned technician installs the seal in the field.
    Install,
}

impl SealOperation {
    /// Canonical operation name. Audit-log action labels start with
    /// this token so the log can be replayed mechanically.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "GENERATE",
            Self::AssignToTechnician => "ASSIGN",
            Self::Issue => "ISSUE",
            Self::Use => "USE",
            Self::Return => "RETURN",
            Self::Reactivate => "REACTIVATE",
            Self::Cancel => "CANCEL",
            Self::Install => "INSTALL",
        }
    }

    /// Parse a canonical operation name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GENERATE" => Some(Self::Generate),
            "ASSIGN" => Some(Self::AssignToTechnician),
            "ISSUE" => Some(Self::Issue),
            "USE" => Some(Self::Use),
            "RETURN" => Some(Self::Return),
            "REACTIVATE" => Some(Self::Reactivate),
            "CANCEL" => Some(Self::Cancel),
            "INSTALL" => Some(Self::Install),
            _ => None,
        }
    }
}

impl std::fmt::Display for SealOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Transition validation ────────────────────────────────────────────

/// Rejection of a `(state, operation)` pair with no edge in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation {operation} is not permitted from state {from}")]
pub struct TransitionError {
    /// The seal's state at the time of the attempt.
    pub from: SealStatus,
    /// The attempted operation.
    pub operation: SealOperation,
}

/// Look up the target state for `operation` from `from`.
///
/// Pure function of the transition table. Capability checks
/// ([`authorize`]) are separate: a transition can be valid for the
/// state yet forbidden for the actor.
pub fn validate_transition(
    from: SealStatus,
    operation: SealOperation,
) -> Result<SealStatus, TransitionError> {
    use SealOperation as Op;
    use SealStatus as St;

    let to = match (from, operation) {
        (St::Available, Op::AssignToTechnician) => St::Assigned,
        (St::Assigned, Op::Issue) => St::Issued,
        (St::Assigned, Op::Install) => St::Installed,
        (St::Issued, Op::Use) => St::Used,
        (St::Used, Op::Return) => St::Returned,
        (St::Installed, Op::Return) => St::Returned,
        (St::Returned, Op::Reactivate) => St::Available,
        (St::Assigned | St::Issued | St::Used, Op::Cancel) => St::Cancelled,
        _ => return Err(TransitionError { from, operation }),
    };
    Ok(to)
}

/// The set of operations with an outgoing edge from `from`.
pub fn permitted_operations(from: SealStatus) -> Vec<SealOperation> {
    use SealOperation as Op;
    const ALL: [Op; 8] = [
        Op::Generate,
        Op::AssignToTechnician,
        Op::Issue,
        Op::Use,
        Op::Return,
        Op::Reactivate,
        Op::Cancel,
        Op::Install,
    ];
    ALL.into_iter()
        .filter(|op| validate_transition(from, *op).is_ok())
        .collect()
}

// ── Actor capability checks ──────────────────────────────────────────

/// The authenticated party attempting an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// An end user. Admins are users with the admin capability.
    User { id: i64, admin: bool },
    /// A field technician.
    Technician { id: i64 },
}

impl Actor {
    /// The actor's row id, for audit recording.
    pub fn id(&self) -> i64 {
        match self {
            Self::User { id, .. } | Self::Technician { id } => *id,
        }
    }

    fn is_admin(&self) -> bool {
        matches!(self, Self::User { admin: true, .. })
    }
}

/// The seal's current holder references, read from storage.
///
/// The holder invariant requires at most one of these populated; both
/// empty only in `AVAILABLE`/`CANCELLED`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Holder {
    pub owner_user_id: Option<i64>,
    pub technician_id: Option<i64>,
}

impl Holder {
    /// Whether this holder pair satisfies the invariant for `status`.
    pub fn satisfies(&self, status: SealStatus) -> bool {
        let populated = self.owner_user_id.is_some() as u8 + self.technician_id.is_some() as u8;
        if status.is_holderless() {
            populated == 0
        } else {
            populated == 1
        }
    }
}

/// Capability rejection, evaluated before any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The operation needs the admin capability.
    #[error("operation {operation} requires admin capability")]
    AdminRequired { operation: SealOperation },

    /// The operation is restricted to the seal's current owner.
    #[error("operation {operation} is restricted to the seal's current owner")]
    NotOwner { operation: SealOperation },

    /// The operation is restricted to the assigned technician.
    #[error("operation {operation} is restricted to the assigned technician")]
    NotAssignedTechnician { operation: SealOperation },
}

/// Check whether `actor` may perform `operation` on a seal currently
/// held as described by `holder`.
///
/// Capability rules:
///
/// - `Generate`, `AssignToTechnician`, `Issue`, `Reactivate`, `Cancel`
///   — admin only.
/// - `Use` — the current owner.
/// - `Return` — the current holder (owner or assigned technician) or
///   an admin.
/// - `Install` — the assigned technician.
pub fn authorize(
    operation: SealOperation,
    holder: &Holder,
    actor: &Actor,
) -> Result<(), AccessError> {
    use SealOperation as Op;

    match operation {
        Op::Generate | Op::AssignToTechnician | Op::Issue | Op::Reactivate | Op::Cancel => {
            if actor.is_admin() {
                Ok(())
            } else {
                Err(AccessError::AdminRequired { operation })
            }
        }
        Op::Use => match actor {
            Actor::User { id, .. } if holder.owner_user_id == Some(*id) => Ok(()),
            _ => Err(AccessError::NotOwner { operation }),
        },
        Op::Return => {
            if actor.is_admin() {
                return Ok(());
            }
            match actor {
                Actor::User { id, .. } if holder.owner_user_id == Some(*id) => Ok(()),
                Actor::Technician { id } if holder.technician_id == Some(*id) => Ok(()),
                Actor::User { .. } => Err(AccessError::NotOwner { operation }),
                Actor::Technician { .. } => {
                    Err(AccessError::NotAssignedTechnician { operation })
                }
            }
        }
        Op::Install => match actor {
            Actor::Technician { id } if holder.technician_id == Some(*id) => Ok(()),
            _ => Err(AccessError::NotAssignedTechnician { operation }),
        },
    }
}
