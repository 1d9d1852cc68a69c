use acp_canonical::{canonicalize, to_canonical_vec};
use acp_common::Sha256Hash;
use acp_credentials::{AgentPublicKey, Identity, Signature, SignatureError};
use serde_json::{Map, Value};

use crate::{CapabilityToken, SignedCapabilityToken, TOKEN_FIELDS, TokenError, TokenHash};

/// Name of the signature member in a token's JSON form.
pub const SIGNATURE_FIELD: &str = "sig";

/// Signs `token` with the issuer's identity.
///
/// The signature covers the canonical JSON of every field except `sig`.
///
/// # Errors
///
/// [`TokenError::Canonicalization`] if the constraints contain a value with
/// no canonical form, such as a non-finite float.
pub fn sign_token(
    token: CapabilityToken,
    issuer: &Identity,
) -> Result<SignedCapabilityToken, TokenError> {
    let payload = to_canonical_vec(&token)?;
    let sig = issuer.sign(&payload);
    tracing::trace!(iss = %token.issuer, nonce = %token.nonce, "signed capability token");
    Ok(SignedCapabilityToken::new(token, sig))
}

/// Signs an arbitrary JSON object, returning it with `sig` attached.
///
/// Any existing `sig` member is replaced.
///
/// # Errors
///
/// [`TokenError::Malformed`] if `token` is not an object.
pub fn sign_token_json(token: Value, issuer: &Identity) -> Result<Value, TokenError> {
    let Value::Object(mut members) = token else {
        return Err(TokenError::Malformed("token must be a JSON object".into()));
    };
    members.remove(SIGNATURE_FIELD);
    let payload = canonicalize(&Value::Object(members.clone()))?;
    let sig = issuer.sign(&payload);
    members.insert(SIGNATURE_FIELD.into(), Value::String(sig.to_base64url()));
    Ok(Value::Object(members))
}

/// Checks a signed token's signature against `key`.
///
/// # Errors
///
/// [`TokenError::Signature`] if the signature does not verify.
pub fn verify_token_signature(
    token: &SignedCapabilityToken,
    key: &AgentPublicKey,
) -> Result<(), TokenError> {
    let payload = to_canonical_vec(token.payload())?;
    key.verify(&payload, token.signature())?;
    Ok(())
}

/// Parses and signature-checks a raw JSON token.
///
/// The signature is checked over the canonical form of the members that were
/// actually received. Members outside [`TOKEN_FIELDS`] are then rejected, so
/// the returned token holds everything the signature covered. Optional
/// members the issuer left out may still be rendered by
/// [`SignedCapabilityToken::to_json`], e.g. a `null` `parent_hash`.
///
/// # Errors
///
/// - [`TokenError::Malformed`] if `raw` is not a JSON object, or is not a
///   token once the signature checks out.
/// - [`TokenError::Signature`] with [`SignatureError::MissingSignature`] if
///   `sig` is absent, null or empty, or with another signature error if it
///   is not a string, fails to decode, or does not verify.
pub fn verify_token_json(
    raw: &str,
    key: &AgentPublicKey,
) -> Result<SignedCapabilityToken, TokenError> {
    let mut members: Map<String, Value> = serde_json::from_str(raw)?;
    let sig = take_signature(&mut members)?;
    let payload = canonicalize(&Value::Object(members.clone()))?;
    key.verify(&payload, &sig)?;

    members.insert(SIGNATURE_FIELD.into(), Value::String(sig.to_base64url()));
    parse_token_members(members)
}

/// Hashes a serialized token for use as a child's `parent_hash`.
pub fn compute_token_hash(serialized: &[u8]) -> TokenHash {
    TokenHash::from(Sha256Hash::hash(serialized))
}

/// Parses a token's members, rejecting any the token does not model.
pub(crate) fn parse_token_members(
    members: Map<String, Value>,
) -> Result<SignedCapabilityToken, TokenError> {
    if let Some(unknown) = members
        .keys()
        .find(|name| !TOKEN_FIELDS.contains(&name.as_str()))
    {
        return Err(TokenError::Malformed(format!("unknown field `{unknown}`")));
    }
    Ok(serde_json::from_value(Value::Object(members))?)
}

pub(crate) fn take_signature(members: &mut Map<String, Value>) -> Result<Signature, TokenError> {
    match members.remove(SIGNATURE_FIELD) {
        None | Some(Value::Null) => Err(SignatureError::MissingSignature.into()),
        Some(Value::String(encoded)) => Ok(Signature::from_base64url(&encoded)?),
        Some(other) => Err(SignatureError::InvalidSignatureEncoding(format!(
            "expected a string, got {other}"
        ))
        .into()),
    }
}
