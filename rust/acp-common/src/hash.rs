use std::array::TryFromSliceError;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::{Base64UrlError, base64url_decode, base64url_encode};

/// The size of a SHA-256 digest in bytes.
pub const SHA256_HASH_SIZE: usize = 32;

/// A SHA-256 digest.
///
/// Every signature in the protocol is computed over one of these rather than
/// over the raw message, and token hashes in delegation chains are rendered
/// from one. Its textual form is unpadded base64url.
///
/// # Examples
///
/// ```rust
/// use acp_common::Sha256Hash;
///
/// let hash = Sha256Hash::hash(b"");
/// assert_eq!(
///     hash.to_string(),
///     "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU"
/// );
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Sha256Hash([u8; SHA256_HASH_SIZE]);

impl Sha256Hash {
    /// Computes the SHA-256 digest of the given bytes.
    pub fn hash(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// The raw digest bytes.
    pub fn bytes(&self) -> &[u8; SHA256_HASH_SIZE] {
        &self.0
    }

    /// Renders the digest as unpadded base64url.
    pub fn to_base64url(&self) -> String {
        base64url_encode(self.0)
    }

    /// Parses a digest from its unpadded base64url form.
    ///
    /// # Errors
    ///
    /// Fails if the input is not base64url or does not decode to 32 bytes.
    pub fn from_base64url(encoded: &str) -> Result<Self, Base64UrlError> {
        let bytes = base64url_decode(encoded)?;
        let len = bytes.len();
        Self::try_from(bytes.as_slice()).map_err(|_| Base64UrlError::InvalidLength {
            expected: SHA256_HASH_SIZE,
            actual: len,
        })
    }
}

impl From<[u8; SHA256_HASH_SIZE]> for Sha256Hash {
    fn from(value: [u8; SHA256_HASH_SIZE]) -> Self {
        Sha256Hash(value)
    }
}

impl TryFrom<&[u8]> for Sha256Hash {
    type Error = TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Sha256Hash(value.try_into()?))
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64url())
    }
}
