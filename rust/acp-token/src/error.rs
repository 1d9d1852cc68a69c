//! Token errors and the protocol's stable error codes.

use std::fmt;

use acp_canonical::CanonicalizationError;
use acp_credentials::{AgentId, SignatureError};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes relying parties report for rejected tokens.
///
/// Each code maps to an HTTP status code via [`ErrorCode::status_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    // 400 Bad Request
    /// The token is not well-formed JSON or lacks required fields.
    #[serde(rename = "CT-001")]
    MalformedToken,
    /// The token declares a protocol version this crate does not speak.
    #[serde(rename = "CT-002")]
    UnsupportedVersion,

    // 401 Unauthorized
    /// The token's expiry has passed.
    #[serde(rename = "CT-003")]
    Expired,
    /// The token's issued-at lies in the future, or its window is empty.
    #[serde(rename = "CT-004")]
    NotYetValid,
    /// Missing, malformed or non-verifying signature.
    #[serde(rename = "CT-006")]
    InvalidSignature,
    /// The issuer is unknown or does not match the expected key.
    #[serde(rename = "CT-007")]
    IssuerMismatch,
    /// The subject is not the calling agent.
    #[serde(rename = "CT-011")]
    SubjectMismatch,
    /// The token's nonce has been seen before.
    #[serde(rename = "CT-012")]
    NonceReplay,

    // 403 Forbidden
    /// The token has been revoked.
    #[serde(rename = "CT-005")]
    Revoked,
    /// The capability list is empty or lacks the requested capability.
    #[serde(rename = "CT-008")]
    CapabilityNotGranted,
    /// The requested resource is outside the token's scope.
    #[serde(rename = "CT-009")]
    ResourceNotCovered,
    /// The delegation policy rejected the token.
    #[serde(rename = "CT-010")]
    DelegationRejected,
    /// A domain-specific constraint is not satisfied.
    #[serde(rename = "CT-013")]
    ConstraintViolation,
}

impl ErrorCode {
    /// The wire form of the code, e.g. `"CT-006"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MalformedToken => "CT-001",
            ErrorCode::UnsupportedVersion => "CT-002",
            ErrorCode::Expired => "CT-003",
            ErrorCode::NotYetValid => "CT-004",
            ErrorCode::Revoked => "CT-005",
            ErrorCode::InvalidSignature => "CT-006",
            ErrorCode::IssuerMismatch => "CT-007",
            ErrorCode::CapabilityNotGranted => "CT-008",
            ErrorCode::ResourceNotCovered => "CT-009",
            ErrorCode::DelegationRejected => "CT-010",
            ErrorCode::SubjectMismatch => "CT-011",
            ErrorCode::NonceReplay => "CT-012",
            ErrorCode::ConstraintViolation => "CT-013",
        }
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorCode::MalformedToken | ErrorCode::UnsupportedVersion => 400,

            ErrorCode::Expired
            | ErrorCode::NotYetValid
            | ErrorCode::InvalidSignature
            | ErrorCode::IssuerMismatch
            | ErrorCode::SubjectMismatch
            | ErrorCode::NonceReplay => 401,

            ErrorCode::Revoked
            | ErrorCode::CapabilityNotGranted
            | ErrorCode::ResourceNotCovered
            | ErrorCode::DelegationRejected
            | ErrorCode::ConstraintViolation => 403,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from building, signing, parsing or checking a capability token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token could not be parsed.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token declares a protocol version other than the supported one.
    #[error("unsupported token version {0:?}")]
    UnsupportedVersion(String),

    /// A required field was not supplied to the builder.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The payload has no canonical form.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Signature missing, malformed, or not valid for the issuer's key.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// `cap` is empty.
    #[error("token grants no capabilities")]
    EmptyCapabilities,

    /// `iat` is not before `exp`.
    #[error("token validity window is empty (iat {issued_at} >= exp {expires_at})")]
    InvalidTimeWindow {
        /// The token's `iat`.
        issued_at: i64,
        /// The token's `exp`.
        expires_at: i64,
    },

    /// The token has expired.
    #[error("token expired at {expires_at}, now {now}")]
    Expired {
        /// The token's `exp`.
        expires_at: i64,
        /// The time the check ran.
        now: i64,
    },

    /// The token's issued-at lies beyond the allowed clock skew.
    #[error("token not valid until {issued_at}, now {now}")]
    NotYetValid {
        /// The token's `iat`.
        issued_at: i64,
        /// The time the check ran.
        now: i64,
    },

    /// No trusted key is registered for the token's issuer.
    #[error("issuer {0} is not trusted")]
    UntrustedIssuer(AgentId),

    /// The token's issuer is not the expected one.
    #[error("issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch {
        /// The AgentID the caller expected.
        expected: AgentId,
        /// The token's `iss`.
        actual: AgentId,
    },

    /// The token's subject is not the expected agent.
    #[error("subject mismatch: expected {expected}, got {actual}")]
    SubjectMismatch {
        /// The AgentID the caller expected.
        expected: AgentId,
        /// The token's `sub`.
        actual: AgentId,
    },

    /// The requested capability is not in `cap`.
    #[error("capability {0:?} not granted")]
    CapabilityNotGranted(String),

    /// The requested resource is not covered by `res`.
    #[error("resource {requested:?} not covered by {granted:?}")]
    ResourceNotCovered {
        /// The token's `res`.
        granted: String,
        /// The resource the caller asked for.
        requested: String,
    },

    /// The revocation hook reported the token as revoked.
    #[error("token revoked")]
    Revoked,

    /// The revocation hook could not reach a verdict.
    #[error("revocation check failed: {0}")]
    RevocationCheckFailed(String),

    /// The delegation policy hook rejected the token.
    #[error("delegation rejected: {0}")]
    DelegationRejected(String),

    /// The token's nonce was already used.
    #[error("nonce {0} already used")]
    NonceReplay(String),
}

impl TokenError {
    /// The protocol error code for this failure.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            TokenError::Malformed(_)
            | TokenError::MissingField(_)
            | TokenError::Canonicalization(_) => ErrorCode::MalformedToken,
            TokenError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            TokenError::Signature(_) => ErrorCode::InvalidSignature,
            TokenError::EmptyCapabilities | TokenError::CapabilityNotGranted(_) => {
                ErrorCode::CapabilityNotGranted
            }
            TokenError::InvalidTimeWindow { .. } | TokenError::NotYetValid { .. } => {
                ErrorCode::NotYetValid
            }
            TokenError::Expired { .. } => ErrorCode::Expired,
            TokenError::UntrustedIssuer(_) | TokenError::IssuerMismatch { .. } => {
                ErrorCode::IssuerMismatch
            }
            TokenError::SubjectMismatch { .. } => ErrorCode::SubjectMismatch,
            TokenError::ResourceNotCovered { .. } => ErrorCode::ResourceNotCovered,
            TokenError::Revoked | TokenError::RevocationCheckFailed(_) => ErrorCode::Revoked,
            TokenError::DelegationRejected(_) => ErrorCode::DelegationRejected,
            TokenError::NonceReplay(_) => ErrorCode::NonceReplay,
        }
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(error: serde_json::Error) -> Self {
        TokenError::Malformed(error.to_string())
    }
}
