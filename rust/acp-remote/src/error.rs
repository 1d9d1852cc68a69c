use std::fmt;

use acp_canonical::CanonicalizationError;
use acp_token::TokenError;
use thiserror::Error;

/// Steps of the challenge / proof-of-possession handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    /// Nothing has been sent yet.
    Idle,
    /// Waiting for the relying party to issue a challenge.
    ChallengeRequested,
    /// A challenge is in hand.
    ChallengeReceived,
    /// Computing the proof-of-possession signature.
    SigningPoP,
    /// The authorized call is in flight.
    Sending,
    /// The relying party answered the authorized call.
    Completed,
    /// The handshake stopped with an error.
    Failed,
}

impl HandshakeState {
    /// A stable lowercase name, used in logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            HandshakeState::Idle => "idle",
            HandshakeState::ChallengeRequested => "challenge_requested",
            HandshakeState::ChallengeReceived => "challenge_received",
            HandshakeState::SigningPoP => "signing_pop",
            HandshakeState::Sending => "sending",
            HandshakeState::Completed => "completed",
            HandshakeState::Failed => "failed",
        }
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of the handshake layer.
///
/// These are distinct from business-level HTTP errors of the authorized
/// call, which are returned to the caller as an ordinary response.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The challenge endpoint answered with a non-success status.
    #[error("challenge request failed: HTTP {status} - {reason}")]
    ChallengeRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase.
        reason: String,
    },

    /// The challenge response carried no usable `challenge` field.
    #[error("challenge response has no challenge field")]
    MissingChallenge,

    /// A network operation exceeded the configured timeout.
    #[error("handshake timed out while {state}")]
    Timeout {
        /// The step that was in flight.
        state: HandshakeState,
    },

    /// The caller cancelled the handshake.
    #[error("handshake cancelled while {state}")]
    Cancelled {
        /// The step that was in flight.
        state: HandshakeState,
    },

    /// The HTTP client failed to complete a request.
    #[error("transport error while {state}: {source}")]
    Transport {
        /// The step that was in flight.
        state: HandshakeState,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The request method is not a valid HTTP method.
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    /// A header value cannot be sent over HTTP.
    #[error("invalid value for header {name}: {reason}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The request body has no canonical JSON form.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// The capability token could not be serialized.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The registration endpoint answered with a non-success status.
    #[error("registration failed: HTTP {status} - {reason}")]
    RegistrationFailed {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase.
        reason: String,
    },

    /// The client configuration is unusable.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl HandshakeError {
    /// The step the handshake was in when this error stopped it.
    pub fn state(&self) -> HandshakeState {
        match self {
            HandshakeError::ChallengeRequestFailed { .. } | HandshakeError::MissingChallenge => {
                HandshakeState::ChallengeRequested
            }
            HandshakeError::Timeout { state }
            | HandshakeError::Cancelled { state }
            | HandshakeError::Transport { state, .. } => *state,
            HandshakeError::InvalidHeader { .. } => HandshakeState::SigningPoP,
            HandshakeError::InvalidMethod(_)
            | HandshakeError::Canonicalization(_)
            | HandshakeError::Token(_)
            | HandshakeError::RegistrationFailed { .. }
            | HandshakeError::Config(_) => HandshakeState::Idle,
        }
    }

    /// Whether the error is a timeout or caller cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            HandshakeError::Timeout { .. } | HandshakeError::Cancelled { .. }
        )
    }
}

pub(crate) fn status_reason(status: reqwest::StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}
