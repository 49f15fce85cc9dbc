//! Membership protocol messages
//!
//! Three kinds of traffic cross the wire between a member and its authority:
//!
//! - requests from a member ([`MembershipRequest`]), each answered by exactly
//!   one [`MembershipResponse`] correlated by id;
//! - unsolicited [`MembershipDelta`] pushes from the authority;
//! - the responses themselves.
//!
//! Frames are [`Envelope`] values encoded by [`codec`].

use crate::errors::MembershipError;
use crate::identifiers::Party;
use crate::record::{MembershipMetadata, MembershipRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Payloads
// =============================================================================

/// Requests a member may send to its authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipRequest {
    /// Ask to join the network with the given metadata.
    RequestMembership {
        /// Initial metadata
        metadata: MembershipMetadata,
    },
    /// Pull the authority's directory.
    DirectorySync {
        /// Member bypassed its cache for this request
        force_full_refresh: bool,
        /// Member will drop unresolvable identities from the reply
        filter_out_unresolvable: bool,
    },
    /// Ask the authority to replace the requester's own metadata.
    AmendMetadata {
        /// Replacement metadata
        metadata: MembershipMetadata,
    },
    /// Report the version of a deployed application component.
    ReportVersion {
        /// Component group, e.g. `net.corda`
        group: String,
        /// Component name
        name: String,
        /// Reported version
        version: String,
    },
}

impl MembershipRequest {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            MembershipRequest::RequestMembership { .. } => "request_membership",
            MembershipRequest::DirectorySync { .. } => "directory_sync",
            MembershipRequest::AmendMetadata { .. } => "amend_metadata",
            MembershipRequest::ReportVersion { .. } => "report_version",
        }
    }
}

/// Authority replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipResponse {
    /// A single committed record
    Record(MembershipRecord),
    /// Full directory snapshot
    Directory {
        /// Every record issued by the authority, all statuses
        records: Vec<MembershipRecord>,
    },
    /// Request accepted, nothing to return
    Acknowledged,
    /// Request refused
    Rejected(MembershipError),
}

/// Single-record update pushed by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDelta {
    /// Record as committed
    pub record: MembershipRecord,
}

// =============================================================================
// Framing
// =============================================================================

/// Frame body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WirePayload {
    /// Member request
    Request(MembershipRequest),
    /// Reply to a request with the same correlation id
    Response(MembershipResponse),
    /// Unsolicited push
    Delta(MembershipDelta),
}

/// Addressed, correlated frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending party, stamped by the transport
    pub from: Party,
    /// Destination party
    pub to: Party,
    /// Pairs a response with its request
    pub correlation_id: Uuid,
    /// Frame body
    pub payload: WirePayload,
}

/// Inbound traffic handed from a transport endpoint to its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A request awaiting a reply through `TransportEffects::respond`
    Request {
        /// Authenticated sender
        from: Party,
        /// Id to echo in the reply
        correlation_id: Uuid,
        /// Request body
        request: MembershipRequest,
    },
    /// A pushed delta
    Delta {
        /// Authenticated sender
        from: Party,
        /// Delta body
        delta: MembershipDelta,
    },
}

/// JSON frame codec.
pub mod codec {
    use super::Envelope;
    use crate::errors::{TransportError, TransportResult};

    /// Encode an envelope into a frame.
    pub fn encode(envelope: &Envelope) -> TransportResult<Vec<u8>> {
        serde_json::to_vec(envelope).map_err(|e| TransportError::Codec(e.to_string()))
    }

    /// Decode a frame into an envelope.
    pub fn decode(frame: &[u8]) -> TransportResult<Envelope> {
        serde_json::from_slice(frame).map_err(|e| TransportError::Codec(e.to_string()))
    }
}
