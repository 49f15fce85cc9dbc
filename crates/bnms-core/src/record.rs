//! Membership records
//!
//! A [`MembershipRecord`] is the committed form of a [`MembershipState`]: the
//! state content plus the [`LedgerRef`] the store assigned when it was
//! written. State is what the authority's state machine reasons about; the
//! ledger reference is what the store uses for expected-version writes.

use crate::identifiers::Party;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Directory view: member identity to its last known record.
pub type Directory = BTreeMap<Party, MembershipRecord>;

// =============================================================================
// Status and Operations
// =============================================================================

/// Lifecycle status of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    /// Requested, awaiting on-boarding by the authority
    Pending,
    /// Full member of the network
    Active,
    /// Temporarily barred from transacting
    Suspended,
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MembershipStatus::Pending => "PENDING",
            MembershipStatus::Active => "ACTIVE",
            MembershipStatus::Suspended => "SUSPENDED",
        };
        f.write_str(s)
    }
}

/// Operations that drive the membership state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipOperation {
    /// Create a pending membership
    Request,
    /// Move to active
    Activate,
    /// Move from active to suspended
    Suspend,
    /// Replace the metadata of an active membership
    AmendMetadata,
}

impl fmt::Display for MembershipOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MembershipOperation::Request => "request",
            MembershipOperation::Activate => "activate",
            MembershipOperation::Suspend => "suspend",
            MembershipOperation::AmendMetadata => "amend_metadata",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Application-defined membership payload.
///
/// The service never interprets metadata; applications pick a concrete shape
/// and read it back through [`MembershipMetadata::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipMetadata(serde_json::Value);

impl MembershipMetadata {
    /// Wrap a raw JSON value
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Metadata with no content
    pub fn empty() -> Self {
        Self(serde_json::Value::Null)
    }

    /// Encode a typed metadata value.
    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self)
    }

    /// Decode into a typed view.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.0.clone())
    }

    /// Borrow the raw value
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl Default for MembershipMetadata {
    fn default() -> Self {
        Self::empty()
    }
}

/// Stock metadata shape: a role plus free-form attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimpleMembershipMetadata {
    /// Role of the member within the network
    pub role: String,
    /// Additional attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub other_fields: BTreeMap<String, String>,
}

impl SimpleMembershipMetadata {
    /// Metadata with the given role and no extra attributes
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            other_fields: BTreeMap::new(),
        }
    }
}

impl From<SimpleMembershipMetadata> for MembershipMetadata {
    fn from(metadata: SimpleMembershipMetadata) -> Self {
        // A struct of strings always serializes.
        Self::from_typed(&metadata).unwrap_or_default()
    }
}

// =============================================================================
// State and Record
// =============================================================================

/// Content of a membership, independent of where it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipState {
    /// Issuing authority
    pub authority: Party,
    /// Member described by this state
    pub member: Party,
    /// Application payload
    pub metadata: MembershipMetadata,
    /// Lifecycle status
    pub status: MembershipStatus,
}

impl MembershipState {
    /// Fresh pending state for a new request
    pub fn pending(authority: Party, member: Party, metadata: MembershipMetadata) -> Self {
        Self {
            authority,
            member,
            metadata,
            status: MembershipStatus::Pending,
        }
    }

    /// Copy of this state with a different status
    pub fn with_status(&self, status: MembershipStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Copy of this state with different metadata
    pub fn with_metadata(&self, metadata: MembershipMetadata) -> Self {
        Self {
            metadata,
            ..self.clone()
        }
    }

    /// Content digest of this state at a given ledger version.
    pub fn digest(&self, version: u64) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&version.to_le_bytes());
        // serde_json over these types cannot fail; an empty body still yields
        // a version-bound digest.
        let body = serde_json::to_vec(self).unwrap_or_default();
        hasher.update(&body);
        *hasher.finalize().as_bytes()
    }
}

/// Pointer to the versioned, authoritative copy of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerRef {
    /// Monotonic version under the record's key, starting at 1
    pub version: u64,
    /// Digest of the committed state at this version
    pub digest: [u8; 32],
}

impl LedgerRef {
    /// Reference for `state` committed at `version`
    pub fn for_state(state: &MembershipState, version: u64) -> Self {
        Self {
            version,
            digest: state.digest(version),
        }
    }
}

impl fmt::Display for LedgerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}@{}", self.version, hex::encode(&self.digest[..8]))
    }
}

/// Committed membership record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    /// Committed content
    pub state: MembershipState,
    /// Ledger pointer assigned at commit
    pub ledger_ref: LedgerRef,
}

impl MembershipRecord {
    /// Pair a state with the ledger reference it was committed under
    pub fn new(state: MembershipState, ledger_ref: LedgerRef) -> Self {
        Self { state, ledger_ref }
    }

    /// Issuing authority
    pub fn authority(&self) -> &Party {
        &self.state.authority
    }

    /// Described member
    pub fn member(&self) -> &Party {
        &self.state.member
    }

    /// Current status
    pub fn status(&self) -> MembershipStatus {
        self.state.status
    }

    /// Application payload
    pub fn metadata(&self) -> &MembershipMetadata {
        &self.state.metadata
    }

    /// Whether the membership is active
    pub fn is_active(&self) -> bool {
        self.state.status == MembershipStatus::Active
    }

    /// Whether the membership is pending
    pub fn is_pending(&self) -> bool {
        self.state.status == MembershipStatus::Pending
    }

    /// Whether the membership is suspended
    pub fn is_suspended(&self) -> bool {
        self.state.status == MembershipStatus::Suspended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{PartyId, PartyName};

    fn party(name: &str, seed: u8) -> Party {
        Party::new(
            PartyName::parse(name).unwrap(),
            PartyId::new_from_entropy([seed; 32]),
        )
    }

    fn state() -> MembershipState {
        MembershipState::pending(
            party("O=BNO,L=New York,C=US", 1),
            party("O=Member1,L=London,C=GB", 2),
            SimpleMembershipMetadata::with_role("roleA").into(),
        )
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&MembershipStatus::Suspended).unwrap();
        assert_eq!(json, "\"SUSPENDED\"");
        assert_eq!(MembershipStatus::Active.to_string(), "ACTIVE");
    }

    #[test]
    fn test_simple_metadata_roundtrip_through_opaque_value() {
        let mut typed = SimpleMembershipMetadata::with_role("roleA");
        typed
            .other_fields
            .insert("desk".to_string(), "fx".to_string());
        let opaque: MembershipMetadata = typed.clone().into();
        let decoded: SimpleMembershipMetadata = opaque.decode().unwrap();
        assert_eq!(decoded, typed);
    }

    #[test]
    fn test_simple_metadata_conversion_matches_serde_shape() {
        let plain = MembershipMetadata::from(SimpleMembershipMetadata::with_role("roleA"));
        assert_eq!(plain.as_value(), &serde_json::json!({ "role": "roleA" }));

        let mut typed = SimpleMembershipMetadata::with_role("roleB");
        typed
            .other_fields
            .insert("desk".to_string(), "fx".to_string());
        let expected = MembershipMetadata::from_typed(&typed).unwrap();
        assert_eq!(MembershipMetadata::from(typed), expected);
        assert_eq!(
            expected.as_value(),
            &serde_json::json!({ "role": "roleB", "other_fields": { "desk": "fx" } })
        );
    }

    #[test]
    fn test_decode_into_wrong_shape_fails() {
        let opaque = MembershipMetadata::new(serde_json::json!([1, 2, 3]));
        assert!(opaque.decode::<SimpleMembershipMetadata>().is_err());
    }

    #[test]
    fn test_digest_depends_on_version_and_content() {
        let s = state();
        assert_eq!(s.digest(1), s.digest(1));
        assert_ne!(s.digest(1), s.digest(2));
        assert_ne!(
            s.digest(1),
            s.with_status(MembershipStatus::Active).digest(1)
        );
    }

    #[test]
    fn test_state_copies_leave_original_untouched() {
        let s = state();
        let active = s.with_status(MembershipStatus::Active);
        let amended = active.with_metadata(SimpleMembershipMetadata::with_role("roleB").into());
        assert_eq!(s.status, MembershipStatus::Pending);
        assert_eq!(amended.status, MembershipStatus::Active);
        assert_ne!(amended.metadata, active.metadata);
    }

    #[test]
    fn test_record_accessors() {
        let s = state().with_status(MembershipStatus::Active);
        let record = MembershipRecord::new(s.clone(), LedgerRef::for_state(&s, 2));
        assert!(record.is_active());
        assert!(!record.is_pending());
        assert_eq!(record.member().name.organisation(), Some("Member1"));
        assert!(record.ledger_ref.to_string().starts_with("v2@"));
    }
}
