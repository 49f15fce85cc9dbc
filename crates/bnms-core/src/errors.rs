//! Error types for membership operations
//!
//! [`MembershipError`] is the single error surfaced to protocol initiators. It
//! is serializable so that the authority can reject a request and the member
//! sees the exact same error value. Errors raised by external collaborators
//! (the record store and the transport) have their own enums and are wrapped.

use crate::identifiers::Party;
use crate::record::{MembershipOperation, MembershipStatus};
use serde::{Deserialize, Serialize};

/// Result alias for membership operations
pub type MembershipResult<T> = std::result::Result<T, MembershipError>;

/// Result alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result alias for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

// =============================================================================
// Membership Errors
// =============================================================================

/// Errors from membership lifecycle, directory sync and verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MembershipError {
    /// A record already exists for this member.
    #[error("membership for {member} has already been requested")]
    DuplicateRequest {
        /// Member that requested twice
        member: Party,
    },

    /// The operation is not legal from the record's current status.
    #[error("cannot {operation} membership of {member} from status {from}")]
    InvalidTransition {
        /// Member the operation targeted
        member: Party,
        /// Status the record was in
        from: MembershipStatus,
        /// Rejected operation
        operation: MembershipOperation,
    },

    /// The authority holds no record for this member.
    #[error("no membership record exists for {member}")]
    UnknownMember {
        /// Member that was not found
        member: Party,
    },

    /// The party has no membership record at all.
    #[error("Counterparty {party} is not a member of this business network")]
    NotAMember {
        /// Party that is not a member
        party: Party,
    },

    /// The party has a record that is pending or suspended.
    #[error("Counterparty's {party} membership in this business network is not active")]
    MembershipNotActive {
        /// Party whose membership is not active
        party: Party,
    },

    /// The member refuses to deal with an authority outside its whitelist.
    #[error("authority {authority} is not whitelisted")]
    AuthorityNotWhitelisted {
        /// Offending authority
        authority: Party,
    },

    /// The peer answered with a message that does not fit the exchange.
    #[error("unexpected response, expected {expected}")]
    UnexpectedResponse {
        /// What the exchange expected
        expected: String,
    },

    /// The request body failed validation.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why it was rejected
        reason: String,
    },

    /// Record store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl MembershipError {
    /// Create a duplicate request error
    pub fn duplicate_request(member: &Party) -> Self {
        Self::DuplicateRequest {
            member: member.clone(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(
        member: &Party,
        from: MembershipStatus,
        operation: MembershipOperation,
    ) -> Self {
        Self::InvalidTransition {
            member: member.clone(),
            from,
            operation,
        }
    }

    /// Create an unknown member error
    pub fn unknown_member(member: &Party) -> Self {
        Self::UnknownMember {
            member: member.clone(),
        }
    }

    /// Create a not-a-member error
    pub fn not_a_member(party: &Party) -> Self {
        Self::NotAMember {
            party: party.clone(),
        }
    }

    /// Create a membership-not-active error
    pub fn membership_not_active(party: &Party) -> Self {
        Self::MembershipNotActive {
            party: party.clone(),
        }
    }

    /// Create an authority-not-whitelisted error
    pub fn authority_not_whitelisted(authority: &Party) -> Self {
        Self::AuthorityNotWhitelisted {
            authority: authority.clone(),
        }
    }

    /// Create an unexpected response error
    pub fn unexpected_response(expected: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            expected: expected.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Whether this error is an authorization failure of the directory or
    /// verification guard.
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::NotAMember { .. } | Self::MembershipNotActive { .. }
        )
    }
}

// =============================================================================
// Collaborator Errors
// =============================================================================

/// Errors from the authoritative record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum StoreError {
    /// The stored version differs from the one the writer read.
    #[error("version conflict for {member}: expected {expected:?}, found {found:?}")]
    VersionConflict {
        /// Member key being written
        member: Party,
        /// Version the writer expected
        expected: Option<u64>,
        /// Version actually stored
        found: Option<u64>,
    },

    /// Backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from message delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TransportError {
    /// The destination has no reachable endpoint.
    #[error("peer {peer} is unreachable")]
    Unreachable {
        /// Destination party
        peer: Party,
    },

    /// No reply arrived within the allowed time.
    #[error("no reply from {peer} within {timeout_ms}ms")]
    Timeout {
        /// Destination party
        peer: Party,
        /// Time waited
        timeout_ms: u64,
    },

    /// The local endpoint has shut down.
    #[error("transport channel closed")]
    ChannelClosed,

    /// A frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or malformed.
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// Offending key
        key: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
