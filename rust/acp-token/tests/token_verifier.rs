use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use acp_credentials::{Identity, SignatureError};
use acp_token::{
    AccessRequest, CapabilityToken, DelegationPolicy, ErrorCode, NonceStore, Revocation,
    RevocationCheck, RevocationKind, SignedCapabilityToken, TokenBuilder, TokenError,
    TokenVerifier, sign_token, sign_token_json,
};
use async_trait::async_trait;
use serde_json::json;
use testresult::TestResult;

const PAYMENT: &str = "acp:cap:financial.payment";

fn identity(seed: u8) -> Identity {
    Identity::from_seed(&[seed; 32]).unwrap()
}

fn grant(issuer: &Identity) -> TokenBuilder {
    CapabilityToken::builder()
        .issuer(issuer.agent_id())
        .subject(identity(2).agent_id())
        .capability(PAYMENT)
        .resource("org.bank/accounts")
        .issued_at(1000)
        .expires_at(4600)
}

fn wire(builder: TokenBuilder, issuer: &Identity) -> String {
    sign_token(builder.build().unwrap(), issuer)
        .unwrap()
        .to_json()
        .unwrap()
}

fn verifier(issuer: &Identity) -> TokenVerifier {
    TokenVerifier::new()
        .add_trusted_issuer(issuer.public_key())
        .with_clock(|| 2000)
}

fn code(result: Result<SignedCapabilityToken, TokenError>) -> &'static str {
    result.unwrap_err().code().as_str()
}

struct Revoked(bool);

#[async_trait]
impl RevocationCheck for Revoked {
    async fn is_revoked(&self, _token: &SignedCapabilityToken) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

struct Unreachable;

#[async_trait]
impl RevocationCheck for Unreachable {
    async fn is_revoked(&self, _token: &SignedCapabilityToken) -> anyhow::Result<bool> {
        anyhow::bail!("revocation endpoint unreachable")
    }
}

struct RootOnly;

#[async_trait]
impl DelegationPolicy for RootOnly {
    async fn check(&self, token: &SignedCapabilityToken) -> anyhow::Result<()> {
        anyhow::ensure!(token.is_root(), "derived tokens are not accepted");
        Ok(())
    }
}

#[derive(Default)]
struct MemoryNonces(Mutex<HashSet<String>>);

#[async_trait]
impl NonceStore for MemoryNonces {
    async fn check_and_store(&self, nonce: &str, _expires_at: i64) -> anyhow::Result<bool> {
        let mut seen = self
            .0
            .lock()
            .map_err(|_| anyhow::anyhow!("nonce store poisoned"))?;
        Ok(seen.insert(nonce.to_owned()))
    }
}

#[tokio::test]
async fn it_accepts_a_valid_grant_for_a_covered_action() -> TestResult {
    let issuer = identity(1);
    let agent = identity(2);
    let raw = wire(grant(&issuer), &issuer);

    let presenter = agent.agent_id();
    let request = AccessRequest::new(PAYMENT, "org.bank/accounts/ACC-001").presented_by(&presenter);
    let token = verifier(&issuer).verify_for(&raw, request).await?;
    assert_eq!(token.resource, "org.bank/accounts");
    Ok(())
}

#[tokio::test]
async fn it_rejects_structural_problems_first() {
    let issuer = identity(1);
    let verifier = verifier(&issuer);

    assert_eq!(code(verifier.verify("[]").await), "CT-001");
    assert_eq!(code(verifier.verify("{\"iss\":").await), "CT-001");

    let unsupported = wire(grant(&issuer).version("2.0"), &issuer);
    assert_eq!(code(verifier.verify(&unsupported).await), "CT-002");

    let unsigned = serde_json::to_string(&grant(&issuer).build().unwrap()).unwrap();
    assert_eq!(
        verifier.verify(&unsigned).await.unwrap_err(),
        TokenError::Signature(SignatureError::MissingSignature)
    );
}

#[tokio::test]
async fn signed_but_incomplete_tokens_are_malformed() {
    let issuer = identity(1);
    let raw = sign_token_json(json!({"iss": issuer.agent_id(), "cap": [PAYMENT]}), &issuer)
        .unwrap()
        .to_string();
    assert_eq!(code(verifier(&issuer).verify(&raw).await), "CT-001");
}

#[tokio::test]
async fn signed_members_outside_the_token_are_malformed() {
    let issuer = identity(1);
    let mut value = serde_json::to_value(grant(&issuer).build().unwrap()).unwrap();
    value["scope"] = json!("everything");
    let raw = sign_token_json(value, &issuer).unwrap().to_string();
    assert_eq!(code(verifier(&issuer).verify(&raw).await), "CT-001");
}

#[tokio::test]
async fn it_only_trusts_registered_issuers() {
    let issuer = identity(1);
    let stranger = identity(9);

    let raw = wire(grant(&stranger), &stranger);
    assert!(matches!(
        verifier(&issuer).verify(&raw).await,
        Err(TokenError::UntrustedIssuer(_))
    ));

    let forged = sign_token_json(
        serde_json::from_str(&wire(grant(&issuer), &issuer)).unwrap(),
        &stranger,
    )
    .unwrap()
    .to_string();
    assert_eq!(code(verifier(&issuer).verify(&forged).await), "CT-006");
}

#[tokio::test]
async fn it_enforces_the_time_window() {
    let issuer = identity(1);
    let raw = wire(grant(&issuer), &issuer);

    let late = verifier(&issuer).with_clock(|| 4601);
    assert_eq!(code(late.verify(&raw).await), "CT-003");

    let early = verifier(&issuer).with_clock(|| 699);
    assert_eq!(code(early.verify(&raw).await), "CT-004");

    let skewed = verifier(&issuer).with_clock(|| 700);
    assert!(skewed.verify(&raw).await.is_ok());

    let strict = verifier(&issuer).with_clock(|| 999).with_leeway(0);
    assert_eq!(code(strict.verify(&raw).await), "CT-004");
}

#[tokio::test]
async fn it_checks_capability_and_resource_scope() {
    let issuer = identity(1);
    let raw = wire(grant(&issuer), &issuer);
    let verifier = verifier(&issuer);

    let wrong_capability = AccessRequest::new("acp:cap:admin", "org.bank/accounts");
    assert_eq!(code(verifier.verify_for(&raw, wrong_capability).await), "CT-008");

    let sibling = AccessRequest::new(PAYMENT, "org.bank/accountsX");
    assert_eq!(code(verifier.verify_for(&raw, sibling).await), "CT-009");

    let empty = wire(
        CapabilityToken::builder()
            .issuer(issuer.agent_id())
            .subject(identity(2).agent_id())
            .resource("org.bank/accounts")
            .issued_at(1000)
            .expires_at(4600),
        &issuer,
    );
    assert_eq!(
        verifier.verify(&empty).await.unwrap_err(),
        TokenError::EmptyCapabilities
    );
}

#[tokio::test]
async fn it_checks_the_presenter_is_the_subject() {
    let issuer = identity(1);
    let raw = wire(grant(&issuer), &issuer);
    let impostor = identity(3).agent_id();

    let request = AccessRequest::new(PAYMENT, "org.bank/accounts").presented_by(&impostor);
    let error = verifier(&issuer).verify_for(&raw, request).await.unwrap_err();
    assert_eq!(error.code(), ErrorCode::SubjectMismatch);
    assert_eq!(error.code().status_code(), 401);
}

#[tokio::test]
async fn revocation_is_consulted_only_for_tokens_that_declare_it() {
    let issuer = identity(1);
    let revocable = grant(&issuer).revocation(Revocation {
        kind: RevocationKind::Endpoint,
        uri: "https://issuer.example/rev".into(),
    });
    let with_rev = wire(revocable, &issuer);
    let without_rev = wire(grant(&issuer), &issuer);

    let revoking = verifier(&issuer).with_revocation(Arc::new(Revoked(true)));
    assert_eq!(revoking.verify(&with_rev).await.unwrap_err(), TokenError::Revoked);
    assert!(revoking.verify(&without_rev).await.is_ok());

    let failing = verifier(&issuer).with_revocation(Arc::new(Unreachable));
    let error = failing.verify(&with_rev).await.unwrap_err();
    assert!(matches!(error, TokenError::RevocationCheckFailed(_)));
    assert_eq!(error.code().as_str(), "CT-005");

    let clean = verifier(&issuer).with_revocation(Arc::new(Revoked(false)));
    assert!(clean.verify(&with_rev).await.is_ok());
}

#[tokio::test]
async fn delegation_policy_can_reject_derived_tokens() -> TestResult {
    let issuer = identity(1);
    let parent = sign_token(grant(&issuer).build()?, &issuer)?;
    let child = wire(grant(&issuer).parent_hash(parent.token_hash()?), &issuer);

    let verifier = verifier(&issuer).with_delegation_policy(Arc::new(RootOnly));
    assert!(verifier.verify(&parent.to_json()?).await.is_ok());
    assert_eq!(code(verifier.verify(&child).await), "CT-010");
    Ok(())
}

#[tokio::test]
async fn nonces_are_accepted_once() {
    let issuer = identity(1);
    let raw = wire(grant(&issuer), &issuer);
    let verifier = verifier(&issuer).with_nonce_store(Arc::new(MemoryNonces::default()));

    assert!(verifier.verify(&raw).await.is_ok());
    assert_eq!(code(verifier.verify(&raw).await), "CT-012");
    assert!(verifier.verify(&wire(grant(&issuer), &issuer)).await.is_ok());
}

#[tokio::test]
async fn rejected_tokens_do_not_consume_nonces() {
    let issuer = identity(1);
    let raw = wire(grant(&issuer), &issuer);
    let nonces = Arc::new(MemoryNonces::default());

    let late = verifier(&issuer)
        .with_clock(|| 5000)
        .with_nonce_store(nonces.clone());
    assert_eq!(code(late.verify(&raw).await), "CT-003");

    let on_time = verifier(&issuer).with_nonce_store(nonces);
    assert!(on_time.verify(&raw).await.is_ok());
}
