//! # Seal Status
//!
//! The closed set of seal lifecycle states. Serialized as
//! `SCREAMING_SNAKE_CASE` strings; any other string fails to
//! deserialize. The original system stored status as a free-form
//! string, which allowed undocumented states to leak into the table —
//! this enum makes that structurally impossible.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a physical seal.
///
/// Transitions between states are governed by the table in
/// [`crate::lifecycle::validate_transition`]; nothing outside that
/// function decides a next state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SealStatus {
    /// Created and in stock, not yet held by anyone.
    Available,
    /// Assigned to a field technician.
    Assigned,
    /// Issued to an end user by an administrator.
    Issued,
    /// Installed in the field by the assigned technician.
    Installed,
    /// Consumed by its owner.
    Used,
    /// Returned after use or installation.
    Returned,
    /// Soft-deleted. Terminal state.
    Cancelled,
}

impl SealStatus {
    /// The state a freshly generated seal starts in.
    pub fn initial() -> Self {
        Self::Available
    }

    /// The canonical string representation, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Assigned => "ASSIGNED",
            Self::Issued => "ISSUED",
            Self::Installed => "INSTALLED",
            Self::Used => "USED",
            Self::Returned => "RETURNED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse a canonical status name. Returns `None` for anything else,
    /// including lowercase variants and legacy free-form strings.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AVAILABLE" => Some(Self::Available),
            "ASSIGNED" => Some(Self::Assigned),
            "ISSUED" => Some(Self::Issued),
            "INSTALLED" => Some(Self::Installed),
            "USED" => Some(Self::Used),
            "RETURNED" => Some(Self::Returned),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether this state has no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether a seal in this state has no holder (neither owner nor
    /// technician). All other states require exactly one holder.
    pub fn is_holderless(&self) -> bool {
        matches!(self, Self::Available | Self::Cancelled)
    }
}

impl std::fmt::Display for SealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SealStatus; 7] = [
        SealStatus::Available,
        SealStatus::Assigned,
        SealStatus::Issued,
        SealStatus::Installed,
        SealStatus::Used,
        SealStatus::Returned,
        SealStatus::Cancelled,
    ];

    #[test]
    fn as_str_from_name_roundtrip() {
        for status in ALL {
            assert_eq!(SealStatus::from_name(status.as_str()), Some(status));
        }
    }

    #[test]
    fn serde_names_match_canonical_names() {
        for status in ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: SealStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn unknown_names_rejected() {
        for name in ["available", "Assigned", "IN_USE", "DELETED", ""] {
            assert_eq!(SealStatus::from_name(name), None, "{name:?}");
            let result: Result<SealStatus, _> = serde_json::from_str(&format!("\"{name}\""));
            assert!(result.is_err(), "{name:?} must not deserialize");
        }
    }

    #[test]
    fn initial_is_available() {
        assert_eq!(SealStatus::initial(), SealStatus::Available);
    }

    #[test]
    fn only_cancelled_is_terminal() {
        for status in ALL {
            assert_eq!(status.is_terminal(), status == SealStatus::Cancelled);
        }
    }

    #[test]
    fn holderless_states() {
        assert!(SealStatus::Available.is_holderless());
        assert!(SealStatus::Cancelled.is_holderless());
        assert!(!SealStatus::Assigned.is_holderless());
        assert!(!SealStatus::Issued.is_holderless());
        assert!(!SealStatus::Installed.is_holderless());
        assert!(!SealStatus::Used.is_holderless());
        assert!(!SealStatus::Returned.is_holderless());
    }
}
