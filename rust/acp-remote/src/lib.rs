//! Client side of the ACP handshake.
//!
//! An agent holding a signed capability token calls a relying party through
//! an [`AcpClient`]. Each call first fetches a single-use challenge, then
//! signs a [`ProofOfPossession`] binding the request's method, path and body
//! to that challenge, and finally sends the request with the five
//! [`AcpHeaders`] attached.
//!
//! Relying parties can check incoming proofs with [`verify_pop_signature`].

mod client;
mod config;
mod error;
mod pop;
mod request;

pub use client::*;
pub use config::*;
pub use error::*;
pub use pop::*;
pub use request::*;
