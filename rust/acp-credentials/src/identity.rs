use std::fmt;

use acp_common::Sha256Hash;
use ed25519_dalek::{SECRET_KEY_LENGTH, Signer, SigningKey};
use rand_core::{CryptoRng, RngCore};

use crate::{AgentId, AgentPublicKey, KeyError, Signature};

/// An agent's Ed25519 keypair.
///
/// The seed never changes after construction and is never printed by
/// `Debug`. Signing takes `&self` and touches no shared state, so one
/// identity can sign from any number of tasks at once.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generates a new identity from the operating system's CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Rng`] if the OS RNG fails.
    pub fn generate() -> Result<Self, KeyError> {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        getrandom::getrandom(&mut seed).map_err(KeyError::Rng)?;
        Ok(Self::from(seed))
    }

    /// Generates a new identity from the given RNG.
    pub fn generate_with<R>(rng: &mut R) -> Self
    where
        R: CryptoRng + RngCore,
    {
        Identity {
            signing_key: SigningKey::generate(rng),
        }
    }

    /// Reconstructs an identity from its 32-byte seed.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidSeedLength`] unless `seed` is exactly 32
    /// bytes.
    pub fn from_seed(seed: &[u8]) -> Result<Self, KeyError> {
        let seed: [u8; SECRET_KEY_LENGTH] = seed
            .try_into()
            .map_err(|_| KeyError::InvalidSeedLength(seed.len()))?;
        Ok(Self::from(seed))
    }

    /// Reconstructs an identity from a hex-encoded seed, with or without a
    /// `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidEncoding`] for malformed hex and
    /// [`KeyError::InvalidSeedLength`] if it does not decode to 32 bytes.
    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        let trimmed = encoded.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let seed = hex::decode(digits).map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
        Self::from_seed(&seed)
    }

    /// The 32-byte private seed.
    #[must_use]
    pub fn seed(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// The private seed as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The public half of this identity.
    #[must_use]
    pub fn public_key(&self) -> AgentPublicKey {
        AgentPublicKey::from(self.signing_key.verifying_key())
    }

    /// `base58(SHA-256(public key))`, recomputed on each call.
    #[must_use]
    pub fn agent_id(&self) -> AgentId {
        self.public_key().agent_id()
    }

    /// Signs `SHA-256(message)`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let digest = Sha256Hash::hash(message);
        Signature::from(self.signing_key.sign(digest.bytes()))
    }
}

impl From<[u8; SECRET_KEY_LENGTH]> for Identity {
    fn from(seed: [u8; SECRET_KEY_LENGTH]) -> Self {
        Identity {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("agent_id", &self.agent_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    /// Create a deterministic test identity from a seed byte.
    fn test_identity(seed: u8) -> Identity {
        Identity::from_seed(&[seed; 32]).unwrap()
    }

    #[test]
    fn equal_seeds_give_equal_identities() {
        let a = test_identity(1);
        let b = test_identity(1);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.agent_id(), b.agent_id());
    }

    #[test]
    fn different_seeds_give_different_agent_ids() {
        assert_ne!(test_identity(1).agent_id(), test_identity(2).agent_id());
    }

    #[test]
    fn agent_id_is_base58_of_the_public_key_digest() {
        use base58::ToBase58;

        let identity = test_identity(9);
        let expected = Sha256Hash::hash(&identity.public_key().to_bytes())
            .bytes()
            .to_base58();
        assert_eq!(identity.agent_id().as_str(), expected);
    }

    #[test]
    fn it_rejects_seeds_that_are_not_32_bytes() {
        assert_eq!(
            Identity::from_seed(&[0; 31]).unwrap_err(),
            KeyError::InvalidSeedLength(31)
        );
        assert_eq!(
            Identity::from_seed(&[0; 33]).unwrap_err(),
            KeyError::InvalidSeedLength(33)
        );
        assert_eq!(
            Identity::from_seed(&[]).unwrap_err(),
            KeyError::InvalidSeedLength(0)
        );
    }

    #[test]
    fn it_loads_hex_seeds_with_or_without_prefix() {
        let identity = test_identity(0xab);
        let hex = identity.to_hex();
        assert_eq!(hex, "ab".repeat(32));

        let plain = Identity::from_hex(&hex).unwrap();
        let prefixed = Identity::from_hex(&format!("0x{hex}")).unwrap();
        assert_eq!(plain.agent_id(), identity.agent_id());
        assert_eq!(prefixed.agent_id(), identity.agent_id());
    }

    #[test]
    fn it_rejects_malformed_hex() {
        assert!(matches!(
            Identity::from_hex("zz"),
            Err(KeyError::InvalidEncoding(_))
        ));
        assert_eq!(
            Identity::from_hex("abcd").unwrap_err(),
            KeyError::InvalidSeedLength(2)
        );
    }

    #[test]
    fn injected_rng_is_deterministic() {
        let a = Identity::generate_with(&mut ChaCha20Rng::seed_from_u64(7));
        let b = Identity::generate_with(&mut ChaCha20Rng::seed_from_u64(7));
        let c = Identity::generate_with(&mut ChaCha20Rng::seed_from_u64(8));
        assert_eq!(a.seed(), b.seed());
        assert_ne!(a.seed(), c.seed());
    }

    #[test]
    fn generated_identities_are_distinct() {
        let a = Identity::generate().unwrap();
        let b = Identity::generate().unwrap();
        assert_ne!(a.agent_id(), b.agent_id());
    }

    #[test]
    fn signatures_are_deterministic_and_verify() {
        let identity = test_identity(42);
        let first = identity.sign(b"message");
        let second = identity.sign(b"message");
        assert_eq!(first, second);
        identity.public_key().verify(b"message", &first).unwrap();
    }

    #[test]
    fn debug_output_hides_the_seed() {
        let identity = test_identity(0xcd);
        let rendered = format!("{identity:?}");
        assert!(rendered.contains(identity.agent_id().as_str()));
        assert!(!rendered.contains(&identity.to_hex()));
    }
}
