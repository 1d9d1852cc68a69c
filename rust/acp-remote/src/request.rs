use acp_canonical::to_canonical_vec;
use acp_token::SignedCapabilityToken;
use reqwest::Method;
use serde::Serialize;

use crate::HandshakeError;
use crate::pop::normalize_path;

/// An action an agent wants a relying party to perform.
///
/// The method is upper-cased and the path given a leading `/` on
/// construction, so the proof signs exactly what is sent.
#[derive(Clone, Debug)]
pub struct ActionRequest {
    method: Method,
    path: String,
    token: String,
    body: Vec<u8>,
}

impl ActionRequest {
    /// Creates a body-less request carrying a token in its JSON wire form.
    pub fn new(
        method: &str,
        path: &str,
        token_json: impl Into<String>,
    ) -> Result<Self, HandshakeError> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| HandshakeError::InvalidMethod(method.to_owned()))?;
        Ok(ActionRequest {
            method,
            path: normalize_path(path),
            token: token_json.into(),
            body: Vec::new(),
        })
    }

    /// Creates a body-less request carrying a signed token.
    pub fn with_token(
        method: &str,
        path: &str,
        token: &SignedCapabilityToken,
    ) -> Result<Self, HandshakeError> {
        Self::new(method, path, token.to_json()?)
    }

    /// Sets a JSON body, serialized canonically so its hash is stable.
    pub fn json<T>(mut self, body: &T) -> Result<Self, HandshakeError>
    where
        T: Serialize + ?Sized,
    {
        self.body = to_canonical_vec(body)?;
        Ok(self)
    }

    /// Sets raw body bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }
}
