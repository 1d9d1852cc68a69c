use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use acp_canonical::canonicalize;
use acp_common::unix_now;
use acp_credentials::{AgentId, AgentPublicKey};
use serde_json::{Map, Value};

use crate::sign::{parse_token_members, take_signature};
use crate::validate::{
    CLOCK_SKEW_LEEWAY, check_capability, check_resource, check_subject, check_time_window,
};
use crate::{
    DelegationPolicy, NonceStore, RevocationCheck, SIGNATURE_FIELD, SignedCapabilityToken,
    TOKEN_VERSION, TokenError,
};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// What a relying party is about to allow, checked against the token.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Capability the action requires.
    pub capability: &'a str,
    /// Resource the action touches.
    pub resource: &'a str,
    /// The agent presenting the token, when known.
    pub presenter: Option<&'a AgentId>,
}

impl<'a> AccessRequest<'a> {
    /// A request for `capability` on `resource` by an unidentified presenter.
    pub fn new(capability: &'a str, resource: &'a str) -> Self {
        AccessRequest {
            capability,
            resource,
            presenter: None,
        }
    }

    /// Also requires the token's subject to be `presenter`.
    pub fn presented_by(mut self, presenter: &'a AgentId) -> Self {
        self.presenter = Some(presenter);
        self
    }
}

/// Runs the full relying-party verification procedure over raw tokens.
///
/// Checks run in a fixed order and stop at the first failure: structure and
/// version, issuer trust and signature, time window, revocation, capability
/// and resource, delegation, then nonce replay. Revocation is only consulted
/// for tokens carrying a `rev` descriptor; hooks that are not configured are
/// skipped.
#[derive(Clone)]
pub struct TokenVerifier {
    trusted_issuers: HashMap<AgentId, AgentPublicKey>,
    leeway: i64,
    clock: Clock,
    revocation: Option<Arc<dyn RevocationCheck>>,
    delegation: Option<Arc<dyn DelegationPolicy>>,
    nonces: Option<Arc<dyn NonceStore>>,
}

impl Default for TokenVerifier {
    fn default() -> Self {
        TokenVerifier {
            trusted_issuers: HashMap::new(),
            leeway: CLOCK_SKEW_LEEWAY,
            clock: Arc::new(unix_now),
            revocation: None,
            delegation: None,
            nonces: None,
        }
    }
}

impl TokenVerifier {
    /// A verifier that trusts no one yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trusts tokens signed by `key`, under the AgentID it derives.
    pub fn add_trusted_issuer(mut self, key: AgentPublicKey) -> Self {
        self.trusted_issuers.insert(key.agent_id(), key);
        self
    }

    /// Overrides the `iat` clock-skew leeway, in seconds.
    pub fn with_leeway(mut self, seconds: i64) -> Self {
        self.leeway = seconds;
        self
    }

    /// Overrides the source of the current Unix time.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Consults `check` for tokens that carry a `rev` descriptor.
    pub fn with_revocation(mut self, check: Arc<dyn RevocationCheck>) -> Self {
        self.revocation = Some(check);
        self
    }

    /// Consults `policy` for every token.
    pub fn with_delegation_policy(mut self, policy: Arc<dyn DelegationPolicy>) -> Self {
        self.delegation = Some(policy);
        self
    }

    /// Records every accepted nonce in `store`, rejecting replays.
    pub fn with_nonce_store(mut self, store: Arc<dyn NonceStore>) -> Self {
        self.nonces = Some(store);
        self
    }

    /// Verifies a raw token without checking it against a particular action.
    ///
    /// # Errors
    ///
    /// The first [`TokenError`] encountered; its [`TokenError::code`] is the
    /// protocol error code to report.
    pub async fn verify(&self, raw: &str) -> Result<SignedCapabilityToken, TokenError> {
        self.run(raw, None).await
    }

    /// Verifies a raw token and checks it authorizes `request`.
    ///
    /// # Errors
    ///
    /// As [`TokenVerifier::verify`], plus the capability, resource and
    /// subject failures.
    pub async fn verify_for(
        &self,
        raw: &str,
        request: AccessRequest<'_>,
    ) -> Result<SignedCapabilityToken, TokenError> {
        self.run(raw, Some(request)).await
    }

    async fn run(
        &self,
        raw: &str,
        request: Option<AccessRequest<'_>>,
    ) -> Result<SignedCapabilityToken, TokenError> {
        match self.check(raw, request).await {
            Ok(token) => {
                tracing::debug!(iss = %token.issuer, sub = %token.subject, "accepted capability token");
                Ok(token)
            }
            Err(error) => {
                tracing::warn!(code = %error.code(), ?error, "rejected capability token");
                Err(error)
            }
        }
    }

    async fn check(
        &self,
        raw: &str,
        request: Option<AccessRequest<'_>>,
    ) -> Result<SignedCapabilityToken, TokenError> {
        let mut members: Map<String, Value> = serde_json::from_str(raw)?;

        match members.get("ver") {
            None => {}
            Some(Value::String(version)) if version == TOKEN_VERSION => {}
            Some(other) => {
                let declared = other.as_str().map_or_else(|| other.to_string(), str::to_owned);
                return Err(TokenError::UnsupportedVersion(declared));
            }
        }

        let sig = take_signature(&mut members)?;
        let issuer: AgentId = match members.get("iss") {
            Some(iss) => serde_json::from_value(iss.clone())?,
            None => return Err(TokenError::Malformed("missing field `iss`".into())),
        };
        let key = self
            .trusted_issuers
            .get(&issuer)
            .ok_or_else(|| TokenError::UntrustedIssuer(issuer.clone()))?;
        key.verify(&canonicalize(&Value::Object(members.clone()))?, &sig)?;

        members.insert(SIGNATURE_FIELD.into(), Value::String(sig.to_base64url()));
        let token = parse_token_members(members)?;

        check_time_window(&token, (self.clock)(), self.leeway)?;

        if token.revocation.is_some() {
            if let Some(revocation) = &self.revocation {
                match revocation.is_revoked(&token).await {
                    Ok(false) => {}
                    Ok(true) => return Err(TokenError::Revoked),
                    Err(error) => return Err(TokenError::RevocationCheckFailed(error.to_string())),
                }
            }
        }

        if let Some(request) = request {
            check_capability(&token, request.capability)?;
            check_resource(&token, request.resource)?;
            if let Some(presenter) = request.presenter {
                check_subject(&token, presenter)?;
            }
        } else if token.capabilities.is_empty() {
            return Err(TokenError::EmptyCapabilities);
        }

        if let Some(policy) = &self.delegation {
            policy
                .check(&token)
                .await
                .map_err(|error| TokenError::DelegationRejected(error.to_string()))?;
        }

        if let Some(store) = &self.nonces {
            let fresh = store
                .check_and_store(token.nonce.as_str(), token.expires_at)
                .await
                .map_err(|error| TokenError::NonceReplay(format!("{}: {error}", token.nonce)))?;
            if !fresh {
                return Err(TokenError::NonceReplay(token.nonce.to_string()));
            }
        }

        Ok(token)
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("trusted_issuers", &self.trusted_issuers.keys().collect::<Vec<_>>())
            .field("leeway", &self.leeway)
            .field("revocation", &self.revocation.is_some())
            .field("delegation", &self.delegation.is_some())
            .field("nonces", &self.nonces.is_some())
            .finish_non_exhaustive()
    }
}
