//! # Audit-Log Replay
//!
//! Reconstructs a seal's final status from its audit-log action labels
//! alone. Every label written by the lifecycle engine starts with the
//! canonical operation name (`ISSUE seal SN-1001 to user 42`), so the
//! log doubles as a replayable event stream: fold the operations
//! through the transition table and the result must match the stored
//! status. Used for audit verification and crash-recovery checks.

use thiserror::Error;

use crate::lifecycle::{validate_transition, SealOperation, TransitionError};
use crate::status::SealStatus;

/// Failure to reconstruct a status from an action sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// The sequence was empty — a seal with no GENERATE entry does not exist.
    #[error("empty action sequence")]
    Empty,

    /// An action label did not start with a canonical operation name.
    #[error("unrecognized action label at entry {index}: {label:?}")]
    UnknownAction { index: usize, label: String },

    /// A GENERATE entry appeared after the seal already existed.
    #[error("GENERATE at entry {index} but the seal already exists")]
    DuplicateGenerate { index: usize },

    /// The first entry was not GENERATE.
    #[error("first entry must be GENERATE, found {operation}")]
    MissingGenerate { operation: SealOperation },

    /// An entry encoded a transition the table forbids — the log is
    /// inconsistent with the lifecycle rules.
    #[error("inconsistent log at entry {index}: {source}")]
    InvalidEntry {
        index: usize,
        source: TransitionError,
    },
}

/// Fold an ordered sequence of audit action labels into a final status.
///
/// Labels must be in insertion order (oldest first). The first token of
/// each label is parsed as the operation name; the remainder is
/// human-readable context and is ignored.
pub fn replay<'a, I>(actions: I) -> Result<SealStatus, ReplayError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut status: Option<SealStatus> = None;

    for (index, label) in actions.into_iter().enumerate() {
        let token = label.split_whitespace().next().unwrap_or("");
        let operation = SealOperation::from_name(token).ok_or_else(|| {
            ReplayError::UnknownAction {
                index,
                label: label.to_string(),
            }
        })?;

        status = match (status, operation) {
            (None, SealOperation::Generate) => Some(SealStatus::initial()),
            (Some(_), SealOperation::Generate) => {
                return Err(ReplayError::DuplicateGenerate { index })
            }
            (None, operation) => return Err(ReplayError::MissingGenerate { operation }),
            (Some(current), operation) => Some(
                validate_transition(current, operation)
                    .map_err(|source| ReplayError::InvalidEntry { index, source })?,
            ),
        };
    }

    status.ok_or(ReplayError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_user_path_replays_to_returned() {
        let actions = [
            "GENERATE seal SN-1001",
            "ASSIGN seal SN-1001 to technician 7",
            "ISSUE seal SN-1001 to user 42",
            "USE seal SN-1001 by user 42",
            "RETURN seal SN-1001 by user 42",
        ];
        assert_eq!(replay(actions), Ok(SealStatus::Returned));
    }

    #[test]
    fn technician_install_path_replays() {
        let actions = [
            "GENERATE seal SN-2",
            "ASSIGN seal SN-2 to technician 7",
            "INSTALL seal SN-2 by technician 7",
            "RETURN seal SN-2 by technician 7",
        ];
        assert_eq!(replay(actions), Ok(SealStatus::Returned));
    }

    #[test]
    fn generate_alone_is_available() {
        assert_eq!(replay(["GENERATE seal X"]), Ok(SealStatus::Available));
    }

    #[test]
    fn reactivation_cycles_back_to_available() {
        let actions = [
            "GENERATE seal X",
            "ASSIGN seal X to technician 1",
            "ISSUE seal X to user 2",
            "USE seal X by user 2",
            "RETURN seal X by user 2",
            "REACTIVATE seal X",
            "ASSIGN seal X to technician 3",
        ];
        assert_eq!(replay(actions), Ok(SealStatus::Assigned));
    }

    #[test]
    fn empty_sequence_rejected() {
        assert_eq!(replay([]), Err(ReplayError::Empty));
    }

    #[test]
    fn missing_generate_rejected() {
        assert_eq!(
            replay(["ASSIGN seal X to technician 1"]),
            Err(ReplayError::MissingGenerate {
                operation: SealOperation::AssignToTechnician
            })
        );
    }

    #[test]
    fn duplicate_generate_rejected() {
        assert_eq!(
            replay(["GENERATE seal X", "GENERATE seal X"]),
            Err(ReplayError::DuplicateGenerate { index: 1 })
        );
    }

    #[test]
    fn unknown_label_rejected_with_index() {
        let err = replay(["GENERATE seal X", "misplaced free-text entry"]).unwrap_err();
        assert_eq!(
            err,
            ReplayError::UnknownAction {
                index: 1,
                label: "misplaced free-text entry".to_string()
            }
        );
    }

    #[test]
    fn inconsistent_log_rejected() {
        // USE straight from AVAILABLE has no edge.
        let err = replay(["GENERATE seal X", "USE seal X by user 2"]).unwrap_err();
        match err {
            ReplayError::InvalidEntry { index: 1, source } => {
                assert_eq!(source.from, SealStatus::Available);
                assert_eq!(source.operation, SealOperation::Use);
            }
            other => panic!("expected InvalidEntry, got {other:?}"),
        }
    }

    #[test]
    fn cancel_is_a_dead_end() {
        let actions = [
            "GENERATE seal X",
            "ASSIGN seal X to technician 1",
            "CANCEL seal X",
        ];
        assert_eq!(replay(actions), Ok(SealStatus::Cancelled));

        let err = replay([
            "GENERATE seal X",
            "ASSIGN seal X to technician 1",
            "CANCEL seal X",
            "REACTIVATE seal X",
        ])
        .unwrap_err();
        assert!(matches!(err, ReplayError::InvalidEntry { index: 3, .. }));
    }
}
