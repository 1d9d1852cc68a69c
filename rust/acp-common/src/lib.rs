#![warn(missing_docs)]

//! Light weight helpers shared by the ACP crates: the SHA-256 digest type
//! every signature and token hash is built on, the unpadded base64url
//! encoding used for every binary value that crosses the wire, and the
//! Unix-seconds clock tokens are checked against.

mod hash;
pub use hash::*;

mod base64url;
pub use base64url::*;

mod time;
pub use time::*;
