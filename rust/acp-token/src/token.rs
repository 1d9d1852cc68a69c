//! The capability token data model and its JSON wire form.

use std::fmt;
use std::str::FromStr;

use acp_canonical::to_canonical_string;
use acp_common::{Base64UrlError, Sha256Hash, base64url_encode};
use acp_credentials::{AgentId, Signature};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::sign::parse_token_members;
use crate::{TokenBuilder, TokenError, compute_token_hash};

/// The only protocol version a `ver` field may carry.
pub const TOKEN_VERSION: &str = "1.0";

/// Number of random bytes in a freshly generated nonce.
pub const NONCE_LENGTH: usize = 16;

/// Every member name a token's JSON form may carry, `sig` included.
pub const TOKEN_FIELDS: [&str; 13] = [
    "ver",
    "iss",
    "sub",
    "cap",
    "res",
    "iat",
    "exp",
    "nonce",
    "deleg",
    "parent_hash",
    "constraints",
    "rev",
    "sig",
];

/// A token's replay-defense nonce.
///
/// Freshly generated nonces are 128 random bits as unpadded base64url, but
/// received nonces are treated as opaque strings.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenNonce(String);

impl TokenNonce {
    /// Draws a new nonce from `rng`.
    pub fn generate_with<R>(rng: &mut R) -> Self
    where
        R: CryptoRng + RngCore,
    {
        let mut bytes = [0u8; NONCE_LENGTH];
        rng.fill_bytes(&mut bytes);
        TokenNonce(base64url_encode(bytes))
    }

    /// The nonce as received or generated.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TokenNonce {
    fn from(value: String) -> Self {
        TokenNonce(value)
    }
}

impl From<&str> for TokenNonce {
    fn from(value: &str) -> Self {
        TokenNonce(value.to_owned())
    }
}

impl fmt::Display for TokenNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TokenNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenNonce({})", self.0)
    }
}

/// SHA-256 of a serialized token, linking a delegated token to its parent.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenHash(Sha256Hash);

impl TokenHash {
    /// The underlying digest.
    #[must_use]
    pub const fn digest(&self) -> &Sha256Hash {
        &self.0
    }
}

impl From<Sha256Hash> for TokenHash {
    fn from(digest: Sha256Hash) -> Self {
        TokenHash(digest)
    }
}

impl FromStr for TokenHash {
    type Err = Base64UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sha256Hash::from_base64url(s).map(TokenHash)
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenHash({})", self.0)
    }
}

impl Serialize for TokenHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_base64url())
    }
}

impl<'de> Deserialize<'de> for TokenHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether, and how deep, the subject may re-delegate the grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Whether the subject may issue derived tokens.
    pub allowed: bool,
    /// Remaining delegation depth; `0` means no further delegation.
    pub max_depth: u32,
}

impl Delegation {
    /// Delegation forbidden.
    pub const NONE: Delegation = Delegation {
        allowed: false,
        max_depth: 0,
    };

    /// Delegation allowed up to `max_depth` further hops.
    #[must_use]
    pub const fn allowed(max_depth: u32) -> Self {
        Delegation {
            allowed: true,
            max_depth,
        }
    }
}

/// How a relying party checks whether a token has been revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevocationKind {
    /// Query an online revocation endpoint.
    Endpoint,
    /// Consult a certificate revocation list.
    Crl,
}

/// Where revocation status for a token can be looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    /// Lookup mechanism.
    #[serde(rename = "type")]
    pub kind: RevocationKind,
    /// Location of the endpoint or list.
    pub uri: String,
}

/// An unsigned capability token.
///
/// `parent_hash` is always present on the wire, as `null` for root tokens.
/// `ver`, `constraints` and `rev` are omitted entirely when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityToken {
    /// Protocol version, when the issuer declares one.
    #[serde(rename = "ver", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// AgentID of the issuing authority.
    #[serde(rename = "iss")]
    pub issuer: AgentId,
    /// AgentID of the agent the grant is for.
    #[serde(rename = "sub")]
    pub subject: AgentId,
    /// Granted capability identifiers, in issuer order.
    #[serde(rename = "cap")]
    pub capabilities: Vec<String>,
    /// Resource scope.
    #[serde(rename = "res")]
    pub resource: String,
    /// Issued-at, Unix seconds.
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiry, Unix seconds.
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Replay-defense nonce.
    pub nonce: TokenNonce,
    /// Re-delegation rules.
    #[serde(rename = "deleg")]
    pub delegation: Delegation,
    /// Hash of the immediate parent token; `None` for root tokens.
    #[serde(default)]
    pub parent_hash: Option<TokenHash>,
    /// Domain-specific constraints, interpreted by higher layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Map<String, Value>>,
    /// Revocation lookup descriptor.
    #[serde(rename = "rev", default, skip_serializing_if = "Option::is_none")]
    pub revocation: Option<Revocation>,
}

impl CapabilityToken {
    /// Starts building a token.
    pub fn builder() -> TokenBuilder {
        TokenBuilder::default()
    }

    /// Whether `capability` is among the granted capabilities.
    pub fn grants(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|granted| granted == capability)
    }

    /// Whether this is a root token (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_hash.is_none()
    }
}

/// A capability token together with its issuer's signature.
///
/// Only [`crate::sign_token`] and parsing produce values of this type, so a
/// `SignedCapabilityToken` always carries a well-formed 64-byte `sig`.
/// Whether that signature verifies is a separate question answered by
/// [`crate::verify_token_signature`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedCapabilityToken {
    #[serde(flatten)]
    payload: CapabilityToken,
    sig: Signature,
}

impl SignedCapabilityToken {
    pub(crate) fn new(payload: CapabilityToken, sig: Signature) -> Self {
        SignedCapabilityToken { payload, sig }
    }

    /// The signed fields.
    #[must_use]
    pub const fn payload(&self) -> &CapabilityToken {
        &self.payload
    }

    /// The issuer's signature.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.sig
    }

    /// Splits the token into its payload and signature.
    pub fn into_parts(self) -> (CapabilityToken, Signature) {
        (self.payload, self.sig)
    }

    /// Reassembles a token from parts without checking the signature.
    pub fn from_parts(payload: CapabilityToken, sig: Signature) -> Self {
        SignedCapabilityToken { payload, sig }
    }

    /// Parses the JSON wire form without verifying anything.
    ///
    /// # Errors
    ///
    /// [`TokenError::Malformed`] if the input is not a token, including when
    /// `sig` is missing or not 64 bytes of base64url, or when it carries a
    /// member outside [`TOKEN_FIELDS`].
    pub fn from_json(raw: &str) -> Result<Self, TokenError> {
        parse_token_members(serde_json::from_str(raw)?)
    }

    /// Renders the canonical JSON wire form, `sig` included.
    ///
    /// # Errors
    ///
    /// Fails only if the constraints hold a value with no canonical form.
    pub fn to_json(&self) -> Result<String, TokenError> {
        Ok(to_canonical_string(self)?)
    }

    /// The hash a delegated child records as its `parent_hash`.
    ///
    /// # Errors
    ///
    /// As [`SignedCapabilityToken::to_json`].
    pub fn token_hash(&self) -> Result<TokenHash, TokenError> {
        Ok(compute_token_hash(self.to_json()?.as_bytes()))
    }
}

impl std::ops::Deref for SignedCapabilityToken {
    type Target = CapabilityToken;

    fn deref(&self) -> &Self::Target {
        &self.payload
    }
}
