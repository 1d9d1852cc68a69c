use std::fmt;
use std::str::FromStr;

use acp_common::Sha256Hash;
use base58::ToBase58;
use serde::{Deserialize, Deserializer, Serialize};

use crate::AgentIdError;

/// Shortest accepted AgentID, in characters.
pub const MIN_AGENT_ID_LENGTH: usize = 40;

/// Longest accepted AgentID, in characters.
pub const MAX_AGENT_ID_LENGTH: usize = 50;

/// Loose sanity check for an AgentID string.
///
/// Only the length and the absence of whitespace are checked; the alphabet
/// is not.
///
/// # Errors
///
/// [`AgentIdError::InvalidAgentIdLength`] outside 40..=50 characters, then
/// [`AgentIdError::InvalidAgentIdFormat`] if any whitespace is present.
pub fn validate_agent_id(candidate: &str) -> Result<(), AgentIdError> {
    let length = candidate.chars().count();
    if !(MIN_AGENT_ID_LENGTH..=MAX_AGENT_ID_LENGTH).contains(&length) {
        return Err(AgentIdError::InvalidAgentIdLength(length));
    }
    if candidate.chars().any(char::is_whitespace) {
        return Err(AgentIdError::InvalidAgentIdFormat);
    }
    Ok(())
}

/// An agent's stable identifier: `base58(SHA-256(public key))`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(String);

impl AgentId {
    /// Derives the AgentID for a raw 32-byte Ed25519 public key.
    pub fn derive(public_key: &[u8; 32]) -> Self {
        AgentId(Sha256Hash::hash(public_key).bytes().to_base58())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({})", self.0)
    }
}

impl FromStr for AgentId {
    type Err = AgentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_agent_id(s)?;
        Ok(AgentId(s.to_owned()))
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AgentId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serialize for AgentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AgentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AgentIdVisitor;

        impl serde::de::Visitor<'_> for AgentIdVisitor {
            type Value = AgentId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a base58 agent id of 40 to 50 characters")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(AgentIdVisitor)
    }
}
