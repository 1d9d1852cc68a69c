//! Hash-then-sign behavior across the public API.

use acp_credentials::{AgentId, AgentPublicKey, Identity, Signature, SignatureError};
use proptest::prelude::*;
use testresult::TestResult;

#[test]
fn public_key_and_agent_id_survive_a_registration_round_trip() -> TestResult {
    let identity = Identity::from_seed(&[11; 32])?;

    let json = serde_json::json!({
        "agent_id": identity.agent_id(),
        "public_key": identity.public_key(),
    });

    let agent_id: AgentId = serde_json::from_value(json["agent_id"].clone())?;
    let public_key: AgentPublicKey = serde_json::from_value(json["public_key"].clone())?;

    assert_eq!(agent_id, identity.agent_id());
    assert_eq!(public_key.agent_id(), agent_id);
    Ok(())
}

#[test]
fn another_identity_cannot_verify() -> TestResult {
    let signer = Identity::from_seed(&[1; 32])?;
    let stranger = Identity::from_seed(&[2; 32])?;

    let signature = signer.sign(b"transfer 100");
    assert_eq!(
        stranger.public_key().verify(b"transfer 100", &signature),
        Err(SignatureError::InvalidSignature)
    );
    Ok(())
}

#[test]
fn base64url_verification_reports_encoding_problems_first() -> TestResult {
    let identity = Identity::from_seed(&[4; 32])?;
    let key = identity.public_key();

    assert_eq!(
        key.verify_base64url(b"m", ""),
        Err(SignatureError::MissingSignature)
    );
    assert!(matches!(
        key.verify_base64url(b"m", "AAAA"),
        Err(SignatureError::InvalidSignatureEncoding(_))
    ));
    key.verify_base64url(b"m", &identity.sign(b"m").to_base64url())?;
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_message_round_trips(seed in any::<[u8; 32]>(), message in prop::collection::vec(any::<u8>(), 0..256)) {
        let identity = Identity::from_seed(&seed).unwrap();
        let signature = identity.sign(&message);
        prop_assert!(identity.public_key().verify(&message, &signature).is_ok());
    }

    #[test]
    fn flipping_a_message_bit_breaks_verification(
        seed in any::<[u8; 32]>(),
        message in prop::collection::vec(any::<u8>(), 1..128),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let identity = Identity::from_seed(&seed).unwrap();
        let signature = identity.sign(&message);

        let mut tampered = message.clone();
        let position = index.index(tampered.len());
        tampered[position] ^= 1 << bit;

        prop_assert_eq!(
            identity.public_key().verify(&tampered, &signature),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn flipping_a_signature_bit_breaks_verification(
        seed in any::<[u8; 32]>(),
        index in 0usize..64,
        bit in 0u8..8,
    ) {
        let identity = Identity::from_seed(&seed).unwrap();
        let mut bytes = identity.sign(b"fixed").to_bytes();
        bytes[index] ^= 1 << bit;

        prop_assert!(identity.public_key().verify(b"fixed", &Signature::from(bytes)).is_err());
    }
}
