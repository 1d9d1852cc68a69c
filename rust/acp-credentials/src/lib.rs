//! Agent identities for ACP.
//!
//! An [`Identity`] is an Ed25519 keypair. Everything it signs is first
//! hashed with SHA-256, so a [`Signature`] is always
//! `Ed25519(seed, SHA-256(message))`, rendered as unpadded base64url.
//!
//! The public half, an [`AgentPublicKey`], is what relying parties hold. Its
//! [`AgentId`] is `base58(SHA-256(public key))` and is derived on demand,
//! never stored alongside the key.
//!
//! ```rust
//! use acp_credentials::Identity;
//!
//! let identity = Identity::from_seed(&[7; 32]).unwrap();
//! let signature = identity.sign(b"hello");
//! identity.public_key().verify(b"hello", &signature).unwrap();
//! ```

mod agent_id;
mod error;
mod identity;
mod public_key;
mod signature;

pub use agent_id::*;
pub use error::*;
pub use identity::*;
pub use public_key::*;
pub use signature::*;
