use std::fmt;
use std::str::FromStr;

use acp_common::{Base64UrlError, base64url_decode_array, base64url_encode};
use serde::{Deserialize, Deserializer, Serialize};

use crate::SignatureError;

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// An Ed25519 signature over the SHA-256 digest of a message.
///
/// Serializes as unpadded base64url.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl Signature {
    /// Parses a signature from unpadded base64url.
    ///
    /// # Errors
    ///
    /// [`SignatureError::MissingSignature`] for an empty string, and
    /// [`SignatureError::InvalidSignatureEncoding`] for anything that does
    /// not decode to exactly 64 bytes.
    pub fn from_base64url(encoded: &str) -> Result<Self, SignatureError> {
        if encoded.is_empty() {
            return Err(SignatureError::MissingSignature);
        }
        base64url_decode_array(encoded)
            .map(Signature)
            .map_err(|error| match error {
                Base64UrlError::InvalidLength { actual, .. } => {
                    SignatureError::InvalidSignatureEncoding(format!(
                        "expected {SIGNATURE_LENGTH} bytes, got {actual}"
                    ))
                }
                other => SignatureError::InvalidSignatureEncoding(other.to_string()),
            })
    }

    /// Renders the signature as unpadded base64url.
    pub fn to_base64url(&self) -> String {
        base64url_encode(self.0)
    }

    /// The raw signature bytes.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.0
    }
}

impl From<[u8; SIGNATURE_LENGTH]> for Signature {
    fn from(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Signature(bytes)
    }
}

impl From<ed25519_dalek::Signature> for Signature {
    fn from(signature: ed25519_dalek::Signature) -> Self {
        Signature(signature.to_bytes())
    }
}

impl From<Signature> for ed25519_dalek::Signature {
    fn from(signature: Signature) -> Self {
        ed25519_dalek::Signature::from_bytes(&signature.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64url())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_base64url())
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64url(s)
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base64url())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        Signature::from_base64url(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_through_base64url() {
        let signature = Signature::from([9u8; 64]);
        let parsed: Signature = signature.to_string().parse().unwrap();
        assert_eq!(parsed, signature);
    }

    #[test]
    fn it_treats_an_empty_string_as_missing() {
        assert_eq!(
            Signature::from_base64url(""),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn it_rejects_wrong_lengths() {
        let short = base64url_encode([1u8; 63]);
        assert_eq!(
            Signature::from_base64url(&short),
            Err(SignatureError::InvalidSignatureEncoding(
                "expected 64 bytes, got 63".to_owned()
            ))
        );
    }

    #[test]
    fn it_rejects_non_base64url_input() {
        assert!(matches!(
            Signature::from_base64url("not a signature!"),
            Err(SignatureError::InvalidSignatureEncoding(_))
        ));
    }

    #[test]
    fn it_serializes_as_a_json_string() {
        let signature = Signature::from([0u8; 64]);
        let json = serde_json::to_string(&signature).unwrap();
        assert_eq!(json, format!("\"{}\"", "A".repeat(86)));
        let parsed: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, signature);
    }
}
