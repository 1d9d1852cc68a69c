//! ACP capability tokens.
//!
//! A [`CapabilityToken`] grants its subject a set of capabilities over a
//! resource for a bounded time. An issuer signs it with
//! [`sign_token`], producing a [`SignedCapabilityToken`] whose `sig` is the
//! issuer's hash-then-sign signature over the RFC 8785 canonical form of
//! every other field.
//!
//! Relying parties check the signature with [`verify_token_signature`] or
//! [`verify_token_json`], then apply the checks in [`validate`] (time
//! window, capability, resource, issuer and subject). [`TokenVerifier`]
//! bundles the whole procedure and calls out to the external
//! [`RevocationCheck`], [`DelegationPolicy`] and [`NonceStore`] hooks.
//!
//! ```rust
//! use acp_credentials::Identity;
//! use acp_token::{CapabilityToken, sign_token, verify_token_signature};
//!
//! let issuer = Identity::from_seed(&[1; 32]).unwrap();
//! let agent = Identity::from_seed(&[2; 32]).unwrap();
//!
//! let token = CapabilityToken::builder()
//!     .issuer(issuer.agent_id())
//!     .subject(agent.agent_id())
//!     .capability("acp:cap:financial.payment")
//!     .resource("org.bank/accounts/ACC-001")
//!     .issued_at(1_000)
//!     .expires_at(4_600)
//!     .build()
//!     .unwrap();
//!
//! let signed = sign_token(token, &issuer).unwrap();
//! verify_token_signature(&signed, &issuer.public_key()).unwrap();
//! ```

mod builder;
mod error;
mod hooks;
mod sign;
mod token;
pub mod validate;
mod verifier;

pub use builder::*;
pub use error::*;
pub use hooks::*;
pub use sign::*;
pub use token::*;
pub use verifier::*;
