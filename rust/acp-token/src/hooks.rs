use async_trait::async_trait;

use crate::SignedCapabilityToken;

/// Answers whether a token has been revoked.
///
/// Consulted only for tokens that carry a `rev` descriptor. An `Err` means
/// the status could not be determined and the token is rejected.
#[async_trait]
pub trait RevocationCheck: Send + Sync {
    /// Returns `true` if `token` is revoked.
    async fn is_revoked(&self, token: &SignedCapabilityToken) -> anyhow::Result<bool>;
}

/// Decides whether a delegated token's chain is acceptable.
#[async_trait]
pub trait DelegationPolicy: Send + Sync {
    /// Returns `Ok(())` to accept, or an error describing the rejection.
    async fn check(&self, token: &SignedCapabilityToken) -> anyhow::Result<()>;
}

/// Records nonces so a token cannot be presented twice.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Records `nonce`, returning `false` if it was already present.
    async fn check_and_store(&self, nonce: &str, expires_at: i64) -> anyhow::Result<bool>;
}
