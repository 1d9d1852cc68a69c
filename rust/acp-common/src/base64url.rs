use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;

/// Errors raised while decoding unpadded base64url.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Base64UrlError {
    /// The input is not valid unpadded base64url.
    #[error("invalid base64url: {0}")]
    InvalidEncoding(String),

    /// The input decoded to an unexpected number of bytes.
    #[error("expected {expected} decoded bytes, got {actual}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Length actually decoded.
        actual: usize,
    },
}

/// Encodes bytes as base64url without padding.
pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes unpadded base64url.
///
/// # Errors
///
/// Fails on padding, characters outside the url-safe alphabet, or a
/// truncated final quantum.
pub fn base64url_decode(encoded: &str) -> Result<Vec<u8>, Base64UrlError> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| Base64UrlError::InvalidEncoding(e.to_string()))
}

/// Decodes unpadded base64url into a fixed-size array.
///
/// # Errors
///
/// Fails when the input is malformed or decodes to anything other than `N`
/// bytes.
pub fn base64url_decode_array<const N: usize>(encoded: &str) -> Result<[u8; N], Base64UrlError> {
    let bytes = base64url_decode(encoded)?;
    let actual = bytes.len();
    <[u8; N]>::try_from(bytes).map_err(|_| Base64UrlError::InvalidLength {
        expected: N,
        actual,
    })
}
