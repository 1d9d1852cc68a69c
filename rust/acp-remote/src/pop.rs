//! Proof-of-possession signatures and the headers that carry them.

use acp_common::Sha256Hash;
use acp_credentials::{AgentId, AgentPublicKey, Identity, Signature, SignatureError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::HandshakeError;

/// Header naming the calling agent.
pub const HEADER_AGENT_ID: &str = "X-ACP-Agent-ID";
/// Header echoing the challenge the proof is bound to.
pub const HEADER_CHALLENGE: &str = "X-ACP-Challenge";
/// Header carrying the proof-of-possession signature.
pub const HEADER_SIGNATURE: &str = "X-ACP-Signature";
/// Content type of every authorized call.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Upper-cases an HTTP method.
pub fn normalize_method(method: &str) -> String {
    method.to_ascii_uppercase()
}

/// Ensures a request path starts with `/`.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

/// `base64url(SHA-256(body))`; an empty body hashes zero bytes.
pub fn body_hash(body: &[u8]) -> String {
    Sha256Hash::hash(body).to_base64url()
}

/// Builds `METHOD|PATH|CHALLENGE|BODYHASH`, the string an agent signs.
pub fn pop_signing_string(method: &str, path: &str, challenge: &str, body: &[u8]) -> String {
    format!(
        "{}|{}|{}|{}",
        normalize_method(method),
        normalize_path(path),
        challenge,
        body_hash(body)
    )
}

/// A signature binding one request to one challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofOfPossession {
    signing_string: String,
    signature: Signature,
}

impl ProofOfPossession {
    /// Signs the request described by `method`, `path` and `body` against
    /// `challenge`.
    pub fn sign(
        identity: &Identity,
        method: &str,
        path: &str,
        challenge: &str,
        body: &[u8],
    ) -> Self {
        let signing_string = pop_signing_string(method, path, challenge, body);
        let signature = identity.sign(signing_string.as_bytes());
        ProofOfPossession {
            signing_string,
            signature,
        }
    }

    /// The exact string that was signed.
    pub fn signing_string(&self) -> &str {
        &self.signing_string
    }

    /// The signature over [`ProofOfPossession::signing_string`].
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Checks a proof-of-possession as a relying party would.
///
/// # Errors
///
/// A [`SignatureError`] if the encoded signature is missing, malformed or
/// was made over any other method, path, challenge or body.
pub fn verify_pop_signature(
    key: &AgentPublicKey,
    method: &str,
    path: &str,
    challenge: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), SignatureError> {
    let signing_string = pop_signing_string(method, path, challenge, body);
    key.verify_base64url(signing_string.as_bytes(), signature)
}

/// The five headers of an authorized call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcpHeaders {
    /// `Bearer <signed token JSON>`.
    pub authorization: String,
    /// The caller's AgentID.
    pub agent_id: String,
    /// The challenge the proof is bound to.
    pub challenge: String,
    /// base64url proof-of-possession signature.
    pub signature: String,
    /// Always `application/json`.
    pub content_type: String,
}

impl AcpHeaders {
    /// Assembles the headers for a token, an agent and its proof.
    pub fn new(
        token_json: &str,
        agent_id: &AgentId,
        challenge: &str,
        proof: &ProofOfPossession,
    ) -> Self {
        AcpHeaders {
            authorization: format!("Bearer {token_json}"),
            agent_id: agent_id.to_string(),
            challenge: challenge.to_owned(),
            signature: proof.signature().to_base64url(),
            content_type: CONTENT_TYPE_JSON.to_owned(),
        }
    }

    /// Header names paired with their values.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("Authorization", self.authorization.as_str()),
            (HEADER_AGENT_ID, self.agent_id.as_str()),
            (HEADER_CHALLENGE, self.challenge.as_str()),
            (HEADER_SIGNATURE, self.signature.as_str()),
            ("Content-Type", self.content_type.as_str()),
        ]
    }

    /// Converts the headers for use with `reqwest`.
    ///
    /// Values are taken as raw bytes, so a token whose constraints contain
    /// non-ASCII text is still accepted.
    ///
    /// # Errors
    ///
    /// [`HandshakeError::InvalidHeader`] if a value contains control
    /// characters.
    pub fn to_header_map(&self) -> Result<HeaderMap, HandshakeError> {
        let mut map = HeaderMap::with_capacity(5);
        for (name, value) in self.entries() {
            let invalid = |reason: String| HandshakeError::InvalidHeader {
                name: name.to_owned(),
                reason,
            };
            let header =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let value =
                HeaderValue::from_bytes(value.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            map.insert(header, value);
        }
        Ok(map)
    }
}
