#![warn(missing_docs)]

//! Canonical JSON (RFC 8785, "JCS") for the bytes that ACP signs.
//!
//! Two parties that hold the same logical payload must derive the same bytes
//! before hashing, regardless of how their JSON library orders keys or
//! renders numbers. The rules applied here:
//!
//! - object members are sorted by the UTF-16 code units of their names, at
//!   every depth; array order is preserved
//! - no insignificant whitespace
//! - numbers are rendered the way ECMAScript's `Number::toString` renders
//!   them (shortest round-trip digits, `-0` as `0`, exponent form outside
//!   `[1e-6, 1e21)`); integers beyond [`MAX_SAFE_INTEGER`] are rendered as
//!   the nearest double
//! - strings escape only `"`, `\` and U+0000..U+001F; everything else is
//!   emitted as UTF-8
//!
//! Any [`serde::Serialize`] type can be canonicalized directly with
//! [`to_canonical_vec`]; untyped documents go through [`canonicalize`].
//!
//! ```rust
//! use serde_json::json;
//!
//! let bytes = acp_canonical::canonicalize(&json!({"b": 2, "a": [1.0, "x"]})).unwrap();
//! assert_eq!(bytes, br#"{"a":[1,"x"],"b":2}"#);
//! ```

mod error;
pub use error::*;

mod number;
mod ser;
mod string;

use serde::Serialize;

/// The largest integer magnitude below which every integer survives a round
/// trip through an IEEE-754 double. Larger integers are rendered as the
/// nearest double.
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Canonicalizes an untyped JSON document into UTF-8 bytes.
///
/// # Errors
///
/// Does not fail for a `Value` parsed from JSON text.
pub fn canonicalize(value: &serde_json::Value) -> Result<Vec<u8>, CanonicalizationError> {
    to_canonical_vec(value)
}

/// Canonicalizes any serializable value into a string.
///
/// # Errors
///
/// Fails for non-finite floats, map keys
/// that are not strings or integers, duplicate member names, and errors
/// raised by the value's own `Serialize` implementation.
pub fn to_canonical_string<T>(value: &T) -> Result<String, CanonicalizationError>
where
    T: ?Sized + Serialize,
{
    value.serialize(ser::Canonicalizer)
}

/// Canonicalizes any serializable value into UTF-8 bytes.
///
/// # Errors
///
/// See [`to_canonical_string`].
pub fn to_canonical_vec<T>(value: &T) -> Result<Vec<u8>, CanonicalizationError>
where
    T: ?Sized + Serialize,
{
    to_canonical_string(value).map(String::into_bytes)
}
