use acp_common::unix_now;
use acp_credentials::AgentId;
use rand_core::{CryptoRng, RngCore};
use serde_json::{Map, Value};

use crate::{CapabilityToken, Delegation, Revocation, TokenError, TokenHash, TokenNonce};

/// Assembles a [`CapabilityToken`].
///
/// `iss`, `sub`, `res` and an expiry (absolute or relative) are required.
/// `iat` defaults to the current time and a nonce is generated when none is
/// supplied. The builder does not reject an empty `cap` or an inverted time
/// window; those are checked when the token is validated.
#[derive(Debug, Clone, Default)]
pub struct TokenBuilder {
    version: Option<String>,
    issuer: Option<AgentId>,
    subject: Option<AgentId>,
    capabilities: Vec<String>,
    resource: Option<String>,
    issued_at: Option<i64>,
    expires_at: Option<i64>,
    ttl: Option<i64>,
    nonce: Option<TokenNonce>,
    delegation: Delegation,
    parent_hash: Option<TokenHash>,
    constraints: Option<Map<String, Value>>,
    revocation: Option<Revocation>,
}

impl TokenBuilder {
    /// Declares the protocol version (`ver`).
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the issuing authority.
    pub fn issuer(mut self, issuer: AgentId) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Sets the agent receiving the grant.
    pub fn subject(mut self, subject: AgentId) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Appends one capability.
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Appends several capabilities, preserving their order.
    pub fn capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    /// Sets the resource scope.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Sets `iat` explicitly.
    pub fn issued_at(mut self, issued_at: i64) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    /// Sets `exp` explicitly. Takes precedence over [`TokenBuilder::ttl`].
    pub fn expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets `exp` to `iat + seconds`.
    pub fn ttl(mut self, seconds: i64) -> Self {
        self.ttl = Some(seconds);
        self
    }

    /// Uses a caller-supplied nonce instead of generating one.
    pub fn nonce(mut self, nonce: impl Into<TokenNonce>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the re-delegation rules. Defaults to [`Delegation::NONE`].
    pub fn delegation(mut self, delegation: Delegation) -> Self {
        self.delegation = delegation;
        self
    }

    /// Links the token to the parent it was derived from.
    pub fn parent_hash(mut self, parent_hash: TokenHash) -> Self {
        self.parent_hash = Some(parent_hash);
        self
    }

    /// Adds a single constraint.
    pub fn constraint(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replaces all constraints.
    pub fn constraints(mut self, constraints: Map<String, Value>) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Sets the revocation lookup descriptor.
    pub fn revocation(mut self, revocation: Revocation) -> Self {
        self.revocation = Some(revocation);
        self
    }

    /// Builds the token, drawing any missing nonce from the thread RNG.
    ///
    /// # Errors
    ///
    /// [`TokenError::MissingField`] naming the first absent required field.
    pub fn build(self) -> Result<CapabilityToken, TokenError> {
        self.build_with(&mut rand::thread_rng())
    }

    /// Builds the token, drawing any missing nonce from `rng`.
    ///
    /// # Errors
    ///
    /// As [`TokenBuilder::build`].
    pub fn build_with<R>(self, rng: &mut R) -> Result<CapabilityToken, TokenError>
    where
        R: CryptoRng + RngCore,
    {
        let issuer = self.issuer.ok_or(TokenError::MissingField("iss"))?;
        let subject = self.subject.ok_or(TokenError::MissingField("sub"))?;
        let resource = self.resource.ok_or(TokenError::MissingField("res"))?;
        let issued_at = self.issued_at.unwrap_or_else(unix_now);
        let expires_at = match (self.expires_at, self.ttl) {
            (Some(expires_at), _) => expires_at,
            (None, Some(ttl)) => issued_at.saturating_add(ttl),
            (None, None) => return Err(TokenError::MissingField("exp")),
        };
        let nonce = self
            .nonce
            .unwrap_or_else(|| TokenNonce::generate_with(rng));

        Ok(CapabilityToken {
            version: self.version,
            issuer,
            subject,
            capabilities: self.capabilities,
            resource,
            issued_at,
            expires_at,
            nonce,
            delegation: self.delegation,
            parent_hash: self.parent_hash,
            constraints: self.constraints,
            revocation: self.revocation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acp_credentials::Identity;
    use pretty_assertions::assert_eq;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;
    use serde_json::json;

    fn agent(seed: u8) -> AgentId {
        Identity::from_seed(&[seed; 32]).unwrap().agent_id()
    }

    fn base() -> TokenBuilder {
        CapabilityToken::builder()
            .issuer(agent(1))
            .subject(agent(2))
            .capability("acp:cap:financial.payment")
            .resource("acc-1")
    }

    #[test]
    fn it_requires_the_core_fields() {
        assert_eq!(
            TokenBuilder::default().build().unwrap_err(),
            TokenError::MissingField("iss")
        );
        assert_eq!(
            base().issued_at(0).build().unwrap_err(),
            TokenError::MissingField("exp")
        );
        assert_eq!(
            TokenBuilder::default()
                .issuer(agent(1))
                .subject(agent(2))
                .expires_at(10)
                .build()
                .unwrap_err(),
            TokenError::MissingField("res")
        );
    }

    #[test]
    fn it_derives_expiry_from_ttl() {
        let token = base().issued_at(1000).ttl(3600).build().unwrap();
        assert_eq!(token.expires_at, 4600);

        let token = base()
            .issued_at(1000)
            .ttl(3600)
            .expires_at(2000)
            .build()
            .unwrap();
        assert_eq!(token.expires_at, 2000);
    }

    #[test]
    fn it_defaults_issued_at_to_now() {
        let before = unix_now();
        let token = base().ttl(60).build().unwrap();
        assert!(token.issued_at >= before);
        assert_eq!(token.expires_at, token.issued_at + 60);
    }

    #[test]
    fn it_generates_a_nonce_from_the_injected_rng() {
        let first = base()
            .expires_at(10)
            .build_with(&mut ChaCha20Rng::seed_from_u64(7))
            .unwrap();
        let second = base()
            .expires_at(10)
            .build_with(&mut ChaCha20Rng::seed_from_u64(7))
            .unwrap();
        assert_eq!(first.nonce, second.nonce);
        assert_ne!(base().expires_at(10).build().unwrap().nonce, first.nonce);
    }

    #[test]
    fn it_keeps_capability_order_and_constraints() {
        let token = base()
            .capabilities(["acp:cap:data.read", "acp:cap:data.write"])
            .constraint("max_amount", 500)
            .nonce("fixed")
            .expires_at(10)
            .build()
            .unwrap();
        assert_eq!(
            token.capabilities,
            vec![
                "acp:cap:financial.payment",
                "acp:cap:data.read",
                "acp:cap:data.write"
            ]
        );
        assert_eq!(token.nonce.as_str(), "fixed");
        assert_eq!(
            Value::Object(token.constraints.unwrap()),
            json!({"max_amount": 500})
        );
    }
}
