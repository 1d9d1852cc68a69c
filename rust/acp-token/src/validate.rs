//! Relying-party checks on a token's claims.
//!
//! These are the individual steps [`crate::TokenVerifier`] runs after the
//! signature has been checked. They are exposed for callers that drive the
//! procedure themselves.

use acp_credentials::AgentId;

use crate::{CapabilityToken, TOKEN_VERSION, TokenError};

/// Clock skew tolerated on `iat`, in seconds.
pub const CLOCK_SKEW_LEEWAY: i64 = 300;

/// Rejects any declared version other than [`TOKEN_VERSION`].
///
/// # Errors
///
/// [`TokenError::UnsupportedVersion`].
pub fn check_version(token: &CapabilityToken) -> Result<(), TokenError> {
    match token.version.as_deref() {
        None | Some(TOKEN_VERSION) => Ok(()),
        Some(other) => Err(TokenError::UnsupportedVersion(other.to_owned())),
    }
}

/// Checks `now` against the token's validity window.
///
/// A token is expired once `now` passes `exp`, and is not yet valid while
/// `iat` is more than `leeway` seconds ahead of `now`.
///
/// # Errors
///
/// [`TokenError::InvalidTimeWindow`] if `iat >= exp`, otherwise
/// [`TokenError::Expired`] or [`TokenError::NotYetValid`].
pub fn check_time_window(
    token: &CapabilityToken,
    now: i64,
    leeway: i64,
) -> Result<(), TokenError> {
    if token.issued_at >= token.expires_at {
        return Err(TokenError::InvalidTimeWindow {
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        });
    }
    if now > token.expires_at {
        return Err(TokenError::Expired {
            expires_at: token.expires_at,
            now,
        });
    }
    if token.issued_at.saturating_sub(leeway) > now {
        return Err(TokenError::NotYetValid {
            issued_at: token.issued_at,
            now,
        });
    }
    Ok(())
}

/// Requires `capability` to be granted by exact string match.
///
/// # Errors
///
/// [`TokenError::EmptyCapabilities`] when `cap` is empty, otherwise
/// [`TokenError::CapabilityNotGranted`].
pub fn check_capability(token: &CapabilityToken, capability: &str) -> Result<(), TokenError> {
    if token.capabilities.is_empty() {
        return Err(TokenError::EmptyCapabilities);
    }
    if !token.grants(capability) {
        return Err(TokenError::CapabilityNotGranted(capability.to_owned()));
    }
    Ok(())
}

/// Whether a grant over `granted` covers `requested`.
///
/// Coverage is by path prefix on `/` boundaries: `org/accounts` covers
/// `org/accounts/ACC-001` but not `org/accountsX`.
pub fn resource_covers(granted: &str, requested: &str) -> bool {
    match requested.strip_prefix(granted) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// Requires the token's resource to cover `requested`.
///
/// # Errors
///
/// [`TokenError::ResourceNotCovered`].
pub fn check_resource(token: &CapabilityToken, requested: &str) -> Result<(), TokenError> {
    if resource_covers(&token.resource, requested) {
        Ok(())
    } else {
        Err(TokenError::ResourceNotCovered {
            granted: token.resource.clone(),
            requested: requested.to_owned(),
        })
    }
}

/// Requires the token to come from `expected`.
///
/// # Errors
///
/// [`TokenError::IssuerMismatch`].
pub fn check_issuer(token: &CapabilityToken, expected: &AgentId) -> Result<(), TokenError> {
    if &token.issuer == expected {
        Ok(())
    } else {
        Err(TokenError::IssuerMismatch {
            expected: expected.clone(),
            actual: token.issuer.clone(),
        })
    }
}

/// Requires the token to be held by `expected`.
///
/// # Errors
///
/// [`TokenError::SubjectMismatch`].
pub fn check_subject(token: &CapabilityToken, expected: &AgentId) -> Result<(), TokenError> {
    if &token.subject == expected {
        Ok(())
    } else {
        Err(TokenError::SubjectMismatch {
            expected: expected.clone(),
            actual: token.subject.clone(),
        })
    }
}
