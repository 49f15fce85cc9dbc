//! Membership lifecycle state machine
//!
//! ```text
//!   request          activate
//!  ─────────> PENDING ────────> ACTIVE <──────┐
//!                                 │           │ activate
//!                                 │ suspend   │
//!                                 └────> SUSPENDED
//! ```
//!
//! Evaluation is pure: given the current record (if any) and a command it
//! decides what to commit, without touching the store. `activate` on an
//! active membership is a no-op that returns the record unchanged.

use bnms_core::{
    LedgerRef, MembershipError, MembershipMetadata, MembershipOperation, MembershipRecord,
    MembershipResult, MembershipState, MembershipStatus, Party,
};

/// A state machine input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipCommand {
    /// Create a pending membership
    Request {
        /// Initial metadata
        metadata: MembershipMetadata,
    },
    /// Activate a pending or suspended membership
    Activate,
    /// Suspend an active membership
    Suspend,
    /// Replace the metadata of an active membership
    AmendMetadata {
        /// Replacement metadata
        metadata: MembershipMetadata,
    },
}

impl MembershipCommand {
    /// Operation this command performs
    pub fn operation(&self) -> MembershipOperation {
        match self {
            MembershipCommand::Request { .. } => MembershipOperation::Request,
            MembershipCommand::Activate => MembershipOperation::Activate,
            MembershipCommand::Suspend => MembershipOperation::Suspend,
            MembershipCommand::AmendMetadata { .. } => MembershipOperation::AmendMetadata,
        }
    }
}

/// Outcome of evaluating a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Write `state` over the record at `expected` (`None`: key must be new)
    Commit {
        /// State to commit
        state: MembershipState,
        /// Ledger reference the new state derives from
        expected: Option<LedgerRef>,
    },
    /// Nothing to write; the current record already satisfies the command
    Unchanged(MembershipRecord),
}

/// Whether a status change is a legal edge of the lifecycle.
pub fn is_legal_edge(from: MembershipStatus, to: MembershipStatus) -> bool {
    use MembershipStatus::*;
    matches!(
        (from, to),
        (Pending, Active) | (Active, Suspended) | (Suspended, Active)
    )
}

/// Evaluate `command` for `member` against its current record.
pub fn evaluate(
    authority: &Party,
    member: &Party,
    current: Option<&MembershipRecord>,
    command: MembershipCommand,
) -> MembershipResult<Transition> {
    let operation = command.operation();

    let record = match (current, &command) {
        (Some(_), MembershipCommand::Request { .. }) => {
            return Err(MembershipError::duplicate_request(member));
        }
        (None, MembershipCommand::Request { metadata }) => {
            return Ok(Transition::Commit {
                state: MembershipState::pending(
                    authority.clone(),
                    member.clone(),
                    metadata.clone(),
                ),
                expected: None,
            });
        }
        (None, _) => return Err(MembershipError::unknown_member(member)),
        (Some(record), _) => record,
    };

    let from = record.status();
    let expected = Some(record.ledger_ref);

    match (from, command) {
        (MembershipStatus::Active, MembershipCommand::Activate) => {
            Ok(Transition::Unchanged(record.clone()))
        }
        (MembershipStatus::Pending | MembershipStatus::Suspended, MembershipCommand::Activate) => {
            Ok(Transition::Commit {
                state: record.state.with_status(MembershipStatus::Active),
                expected,
            })
        }
        (MembershipStatus::Active, MembershipCommand::Suspend) => Ok(Transition::Commit {
            state: record.state.with_status(MembershipStatus::Suspended),
            expected,
        }),
        (MembershipStatus::Active, MembershipCommand::AmendMetadata { metadata }) => {
            Ok(Transition::Commit {
                state: record.state.with_metadata(metadata),
                expected,
            })
        }
        _ => Err(MembershipError::invalid_transition(member, from, operation)),
    }
}
