//! The handshake client.

use std::future::Future;
use std::sync::Arc;

use acp_credentials::{AgentId, Identity};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

use crate::error::status_reason;
use crate::pop::normalize_path;
use crate::{
    AcpHeaders, ActionRequest, ClientConfig, HandshakeError, HandshakeState, ProofOfPossession,
};

#[derive(Deserialize)]
struct ChallengeResponse {
    challenge: Option<String>,
}

/// Body of a registration request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// The agent's AgentID.
    pub agent_id: AgentId,
    /// The agent's public key, unpadded base64url.
    pub public_key: String,
}

/// Performs authorized calls against an ACP relying party.
///
/// Every call to [`AcpClient::execute`] runs a fresh handshake:
///
/// - `GET {endpoint}/acp/v1/challenge` to obtain a single-use challenge
/// - sign `METHOD|PATH|CHALLENGE|BODYHASH` with the agent's identity
/// - send the original request with the capability token and proof attached
///
/// The challenge round-trip and the authorized call are each bounded by the
/// configured timeout. Nothing is retried and nothing is cached between
/// calls, so a client can be cloned and shared freely.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use acp_credentials::Identity;
/// use acp_remote::{AcpClient, ActionRequest, ClientConfig};
///
/// # async fn example(token_json: String) -> Result<(), Box<dyn std::error::Error>> {
/// let identity = Arc::new(Identity::generate()?);
/// let client = AcpClient::new(ClientConfig::new("https://api.bank.example"), identity)?;
///
/// let request = ActionRequest::new("POST", "/api/v1/payments/transfer", token_json)?
///     .json(&serde_json::json!({"to_account": "ACC-999", "amount": 500}))?;
/// let response = client.execute(request).await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct AcpClient {
    config: ClientConfig,
    client: Client,
    identity: Arc<Identity>,
}

impl AcpClient {
    /// Create a client for the relying party described by `config`
    pub fn new(config: ClientConfig, identity: Arc<Identity>) -> Result<Self, HandshakeError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| HandshakeError::Config(format!("invalid endpoint: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(HandshakeError::Config(format!(
                "endpoint {} cannot be a base URL",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| HandshakeError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            identity,
        })
    }

    /// The identity requests are signed with.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs `request` behind a fresh challenge / proof-of-possession
    /// handshake and returns the relying party's raw response.
    ///
    /// Business-level status codes of the response are not interpreted.
    pub async fn execute(&self, request: ActionRequest) -> Result<Response, HandshakeError> {
        self.execute_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// As [`AcpClient::execute`], aborting the in-flight operation as soon as
    /// `cancel` fires.
    pub async fn execute_with_cancellation(
        &self,
        request: ActionRequest,
        cancel: CancellationToken,
    ) -> Result<Response, HandshakeError> {
        let span = tracing::debug_span!(
            "acp.execute",
            method = %request.method(),
            path = request.path(),
            agent_id = %self.identity.agent_id(),
        );
        let result = self.handshake(&request, &cancel).instrument(span).await;
        match &result {
            Ok(response) => tracing::debug!(
                state = %HandshakeState::Completed,
                status = response.status().as_u16(),
                "ACP handshake completed"
            ),
            Err(error) => tracing::warn!(
                state = %HandshakeState::Failed,
                from = %error.state(),
                ?error,
                method = %request.method(),
                path = request.path(),
                "ACP handshake failed"
            ),
        }
        result
    }

    /// Fetches a fresh challenge from the relying party.
    pub async fn request_challenge(
        &self,
        cancel: &CancellationToken,
    ) -> Result<String, HandshakeError> {
        self.bounded(HandshakeState::ChallengeRequested, cancel, self.fetch_challenge())
            .await
    }

    /// Registers the agent's public key with the relying party.
    pub async fn register(&self) -> Result<(), HandshakeError> {
        let url = self.url_for(&self.config.register_path)?;
        let body = RegistrationRequest {
            agent_id: self.identity.agent_id(),
            public_key: self.identity.public_key().to_base64url(),
        };
        let request = self.build_request(self.client.post(url)).json(&body);

        let response = self
            .bounded(HandshakeState::Idle, &CancellationToken::new(), async move {
                request
                    .send()
                    .await
                    .map_err(|source| HandshakeError::Transport {
                        state: HandshakeState::Idle,
                        source,
                    })
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HandshakeError::RegistrationFailed {
                status: status.as_u16(),
                reason: status_reason(status),
            });
        }

        tracing::debug!(agent_id = %body.agent_id, "registered agent");
        Ok(())
    }

    async fn handshake(
        &self,
        request: &ActionRequest,
        cancel: &CancellationToken,
    ) -> Result<Response, HandshakeError> {
        tracing::debug!(state = %HandshakeState::ChallengeRequested, "requesting challenge");
        let challenge = self.request_challenge(cancel).await?;
        tracing::debug!(state = %HandshakeState::ChallengeReceived, "challenge received");

        tracing::debug!(state = %HandshakeState::SigningPoP, "signing proof of possession");
        let proof = ProofOfPossession::sign(
            &self.identity,
            request.method().as_str(),
            request.path(),
            &challenge,
            request.body_bytes(),
        );
        let headers = AcpHeaders::new(
            request.token(),
            &self.identity.agent_id(),
            &challenge,
            &proof,
        )
        .to_header_map()?;

        let url = self.url_for(request.path())?;
        let mut builder = self
            .build_request(self.client.request(request.method().clone(), url))
            .headers(headers);
        if !request.body_bytes().is_empty() {
            builder = builder.body(request.body_bytes().to_vec());
        }

        tracing::debug!(state = %HandshakeState::Sending, "sending authorized request");
        self.bounded(HandshakeState::Sending, cancel, async move {
            builder
                .send()
                .await
                .map_err(|source| HandshakeError::Transport {
                    state: HandshakeState::Sending,
                    source,
                })
        })
        .await
    }

    async fn fetch_challenge(&self) -> Result<String, HandshakeError> {
        let state = HandshakeState::ChallengeRequested;
        let url = self.url_for(&self.config.challenge_path)?;

        let response = self
            .build_request(self.client.get(url))
            .send()
            .await
            .map_err(|source| HandshakeError::Transport { state, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HandshakeError::ChallengeRequestFailed {
                status: status.as_u16(),
                reason: status_reason(status),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| HandshakeError::Transport { state, source })?;
        parse_challenge(&body)
    }

    /// Runs `operation` until it finishes, the timeout elapses or `cancel`
    /// fires. Dropping the losing future aborts the in-flight request.
    async fn bounded<T, F>(
        &self,
        state: HandshakeState,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, HandshakeError>
    where
        F: Future<Output = Result<T, HandshakeError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HandshakeError::Cancelled { state }),
            outcome = tokio::time::timeout(self.config.timeout, operation) => match outcome {
                Ok(result) => result,
                Err(_) => Err(HandshakeError::Timeout { state }),
            },
        }
    }

    /// Resolve a path against the endpoint
    fn url_for(&self, path: &str) -> Result<Url, HandshakeError> {
        let target = format!("{}{}", self.config.endpoint, normalize_path(path));
        Url::parse(&target)
            .map_err(|e| HandshakeError::Config(format!("invalid URL {target}: {e}")))
    }

    /// Add the configured custom headers
    fn build_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = builder;
        for (key, value) in &self.config.headers {
            builder = builder.header(key, value);
        }
        builder
    }
}

fn parse_challenge(body: &[u8]) -> Result<String, HandshakeError> {
    serde_json::from_slice::<ChallengeResponse>(body)
        .ok()
        .and_then(|response| response.challenge)
        .filter(|challenge| !challenge.is_empty())
        .ok_or(HandshakeError::MissingChallenge)
}
