use std::fmt;

use acp_common::{Sha256Hash, base64url_decode, base64url_encode};
use ed25519_dalek::{Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{AgentId, KeyError, Signature, SignatureError};

/// Length of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// The public half of an agent [`crate::Identity`].
///
/// Serializes as unpadded base64url of the 32 raw key bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AgentPublicKey(VerifyingKey);

impl AgentPublicKey {
    /// Parses 32 raw key bytes.
    ///
    /// # Errors
    ///
    /// [`KeyError::InvalidPublicKey`] if the slice is not 32 bytes or is not
    /// a point on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: &[u8; PUBLIC_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(bytes)
            .map(AgentPublicKey)
            .map_err(|_| KeyError::InvalidPublicKey)
    }

    /// Parses the unpadded base64url rendering of the key.
    ///
    /// # Errors
    ///
    /// [`KeyError::InvalidEncoding`] for malformed base64url, otherwise as
    /// [`AgentPublicKey::from_bytes`].
    pub fn from_base64url(encoded: &str) -> Result<Self, KeyError> {
        let bytes =
            base64url_decode(encoded).map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// The raw key bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.to_bytes()
    }

    /// The key as unpadded base64url.
    pub fn to_base64url(&self) -> String {
        base64url_encode(self.0.as_bytes())
    }

    /// The AgentID derived from this key.
    pub fn agent_id(&self) -> AgentId {
        AgentId::derive(self.0.as_bytes())
    }

    /// Checks `signature` against `SHA-256(message)`.
    ///
    /// # Errors
    ///
    /// [`SignatureError::InvalidSignature`] if the signature does not verify.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        let digest = Sha256Hash::hash(message);
        self.0
            .verify(digest.bytes(), &ed25519_dalek::Signature::from(*signature))
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Decodes a base64url signature and checks it against `SHA-256(message)`.
    ///
    /// # Errors
    ///
    /// Any error from [`Signature::from_base64url`] or
    /// [`AgentPublicKey::verify`].
    pub fn verify_base64url(&self, message: &[u8], signature: &str) -> Result<(), SignatureError> {
        self.verify(message, &Signature::from_base64url(signature)?)
    }
}

impl From<VerifyingKey> for AgentPublicKey {
    fn from(key: VerifyingKey) -> Self {
        AgentPublicKey(key)
    }
}

impl fmt::Display for AgentPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64url())
    }
}

impl fmt::Debug for AgentPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentPublicKey({})", self.to_base64url())
    }
}

impl Serialize for AgentPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base64url())
    }
}

impl<'de> Deserialize<'de> for AgentPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        AgentPublicKey::from_base64url(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Identity;

    #[test]
    fn it_rejects_keys_of_the_wrong_length() {
        assert_eq!(
            AgentPublicKey::from_bytes(&[1u8; 31]),
            Err(KeyError::InvalidPublicKey)
        );
    }

    #[test]
    fn it_round_trips_through_base64url() {
        let key = Identity::from_seed(&[3; 32]).unwrap().public_key();
        let parsed = AgentPublicKey::from_base64url(&key.to_base64url()).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.agent_id(), key.agent_id());
    }

    #[test]
    fn it_reports_malformed_base64url_as_an_encoding_error() {
        assert!(matches!(
            AgentPublicKey::from_base64url("%%%"),
            Err(KeyError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn it_verifies_over_the_digest_not_the_raw_message() {
        use ed25519_dalek::{Signer, SigningKey};

        let signing_key = SigningKey::from_bytes(&[5; 32]);
        let public_key = AgentPublicKey::from(signing_key.verifying_key());
        let message = b"payload";

        let raw = Signature::from(signing_key.sign(message));
        assert_eq!(
            public_key.verify(message, &raw),
            Err(SignatureError::InvalidSignature)
        );

        let hashed = Signature::from(signing_key.sign(Sha256Hash::hash(message).bytes()));
        public_key.verify(message, &hashed).unwrap();
    }
}
