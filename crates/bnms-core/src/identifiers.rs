//! Party identifiers
//!
//! A party is addressed on the network by an X.500-style [`PartyName`]
//! (`O=Member1,L=London,C=GB`) and pinned to one concrete identity by a
//! [`PartyId`]. A [`Party`] carries both; two parties are the same only when
//! name and id match, so a name that has been re-registered under a new id no
//! longer resolves to the old party.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Errors raised while parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The name was empty or whitespace only.
    #[error("party name is empty")]
    Empty,

    /// An attribute was not of the form `KEY=value`.
    #[error("malformed name attribute: {0}")]
    MalformedAttribute(String),

    /// The mandatory `O=` attribute is missing.
    #[error("party name {0} has no organisation (O=) attribute")]
    MissingOrganisation(String),

    /// The id was not a valid UUID.
    #[error("invalid party id: {0}")]
    InvalidId(String),
}

// =============================================================================
// Party Name
// =============================================================================

/// Logical, human-readable network name of a party.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyName(String);

impl PartyName {
    /// Parse and validate an X.500-style name.
    ///
    /// Attributes are comma separated `KEY=value` pairs and an `O=` attribute
    /// is mandatory. Whitespace around attributes is trimmed.
    pub fn parse(name: &str) -> Result<Self, IdentifierError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let mut attributes = Vec::new();
        for attribute in trimmed.split(',') {
            let attribute = attribute.trim();
            match attribute.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
                    attributes.push(format!("{}={}", key.trim(), value.trim()));
                }
                _ => return Err(IdentifierError::MalformedAttribute(attribute.to_string())),
            }
        }

        let normalized = attributes.join(",");
        if !attributes.iter().any(|a| a.starts_with("O=")) {
            return Err(IdentifierError::MissingOrganisation(normalized));
        }

        Ok(Self(normalized))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `O=` attribute.
    pub fn organisation(&self) -> Option<&str> {
        self.0
            .split(',')
            .find_map(|attribute| attribute.strip_prefix("O="))
    }
}

impl fmt::Display for PartyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartyName {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// Party Id
// =============================================================================

/// Opaque identity handle bound to a name at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyId(pub Uuid);

impl PartyId {
    /// Create a party ID from caller-provided entropy.
    pub fn new_from_entropy(entropy: [u8; 32]) -> Self {
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes.copy_from_slice(&entropy[..16]);
        Self(Uuid::from_bytes(uuid_bytes))
    }

    /// Create from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party-{}", self.0)
    }
}

impl FromStr for PartyId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid_str = s.strip_prefix("party-").unwrap_or(s);
        Uuid::parse_str(uuid_str)
            .map(Self)
            .map_err(|e| IdentifierError::InvalidId(e.to_string()))
    }
}

impl From<Uuid> for PartyId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// =============================================================================
// Party
// =============================================================================

/// A resolved network participant: authority or member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Party {
    /// Logical network name
    pub name: PartyName,
    /// Identity the name was bound to
    pub id: PartyId,
}

impl Party {
    /// Create a party from its name and id
    pub fn new(name: PartyName, id: PartyId) -> Self {
        Self { name, id }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
