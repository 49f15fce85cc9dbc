//! Common fixtures: names, metadata and hand-built records.

use bnms_core::{
    LedgerRef, MembershipMetadata, MembershipRecord, MembershipState, MembershipStatus, Party,
    PartyId, PartyName, SimpleMembershipMetadata,
};

/// Name the harness gives its authority
pub const AUTHORITY_NAME: &str = "O=BNO,L=New York,C=US";

/// Parse a fixture name.
pub fn party_name(name: &str) -> PartyName {
    PartyName::parse(name).expect("fixture names are well-formed")
}

/// Name of the `index`-th participant, starting at 1
pub fn member_name(index: usize) -> PartyName {
    party_name(&format!("O=Participant {index},L=London,C=GB"))
}

/// Identity with a deterministic id, not registered anywhere.
pub fn unregistered_party(name: &str, seed: u8) -> Party {
    Party::new(party_name(name), PartyId::new_from_entropy([seed; 32]))
}

/// Metadata carrying only a role
pub fn role(role: &str) -> MembershipMetadata {
    SimpleMembershipMetadata::with_role(role).into()
}

/// Committed-looking record built without a store.
pub fn record(
    authority: &Party,
    member: &Party,
    status: MembershipStatus,
    version: u64,
) -> MembershipRecord {
    let state = MembershipState::pending(authority.clone(), member.clone(), role("DEFAULT"))
        .with_status(status);
    MembershipRecord::new(state.clone(), LedgerRef::for_state(&state, version))
}

/// Role stored in a record's metadata, if it has the stock shape.
pub fn role_of(record: &MembershipRecord) -> Option<String> {
    record
        .metadata()
        .decode::<SimpleMembershipMetadata>()
        .ok()
        .map(|metadata| metadata.role)
}
