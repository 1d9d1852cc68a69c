use std::time::Duration;

use crate::HandshakeError;

/// Default bound on each network operation of the handshake.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the challenge endpoint, relative to the relying party's base URL.
pub const DEFAULT_CHALLENGE_PATH: &str = "/acp/v1/challenge";

/// Path of the registration endpoint, relative to the base URL.
pub const DEFAULT_REGISTER_PATH: &str = "/acp/v1/register";

/// Environment variable holding the relying party's base URL.
pub const ENDPOINT_ENV: &str = "ACP_ENDPOINT";

/// Environment variable holding the timeout in whole seconds.
pub const TIMEOUT_ENV: &str = "ACP_TIMEOUT_SECONDS";

/// Configuration for an [`crate::AcpClient`]
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the relying party (e.g. "https://api.bank.example")
    pub endpoint: String,

    /// Timeout applied separately to the challenge and to the authorized call
    pub timeout: Duration,

    /// Challenge endpoint path
    pub challenge_path: String,

    /// Registration endpoint path
    pub register_path: String,

    /// Extra headers sent with every request
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            timeout: DEFAULT_TIMEOUT,
            challenge_path: DEFAULT_CHALLENGE_PATH.to_string(),
            register_path: DEFAULT_REGISTER_PATH.to_string(),
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the relying party at `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: trim_endpoint(endpoint.into()),
            ..Default::default()
        }
    }

    /// Read the configuration from `ACP_ENDPOINT` and `ACP_TIMEOUT_SECONDS`
    pub fn from_env() -> Result<Self, HandshakeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, HandshakeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENDPOINT_ENV)
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or_else(|| HandshakeError::Config(format!("{ENDPOINT_ENV} is not set")))?;
        let mut config = Self::new(endpoint.trim());

        if let Some(seconds) = lookup(TIMEOUT_ENV) {
            let seconds = seconds.trim().parse::<u64>().map_err(|e| {
                HandshakeError::Config(format!("{TIMEOUT_ENV} must be whole seconds: {e}"))
            })?;
            config.timeout = Duration::from_secs(seconds);
        }

        Ok(config)
    }

    /// Set the per-operation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the challenge endpoint path
    pub fn with_challenge_path(mut self, path: impl Into<String>) -> Self {
        self.challenge_path = path.into();
        self
    }

    /// Override the registration endpoint path
    pub fn with_register_path(mut self, path: impl Into<String>) -> Self {
        self.register_path = path.into();
        self
    }

    /// Add a custom header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

fn trim_endpoint(endpoint: String) -> String {
    match endpoint.strip_suffix('/') {
        Some(trimmed) => trim_endpoint(trimmed.to_string()),
        None => endpoint,
    }
}
