//! Error types for identities, AgentIDs and signatures.

use thiserror::Error;

/// Errors from constructing an [`crate::Identity`] or an [`crate::AgentPublicKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The seed bytes have the wrong length (expected 32).
    #[error("expected 32 seed bytes, got {0}")]
    InvalidSeedLength(usize),

    /// The textual key encoding could not be decoded.
    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),

    /// The bytes are not a valid Ed25519 public key.
    #[error("invalid ed25519 public key")]
    InvalidPublicKey,

    /// Random number generation failed.
    #[error("RNG error: {0}")]
    Rng(getrandom::Error),
}

/// Errors from validating an AgentID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AgentIdError {
    /// AgentIDs are between 40 and 50 characters long.
    #[error("agent id must be 40-50 characters, got {0}")]
    InvalidAgentIdLength(usize),

    /// AgentIDs never contain whitespace.
    #[error("agent id must not contain whitespace")]
    InvalidAgentIdFormat,
}

/// Errors from checking a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// No signature was supplied.
    #[error("signature is missing")]
    MissingSignature,

    /// The signature is not 64 bytes of unpadded base64url.
    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    /// The signature does not verify under the given key.
    #[error("signature verification failed")]
    InvalidSignature,
}
