use std::fmt::Display;

use thiserror::Error;

/// Reasons a value has no canonical JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalizationError {
    /// NaN and the infinities are not representable in JSON.
    #[error("non-finite numbers have no JSON representation")]
    NonFiniteNumber,

    /// A map key serialized as something other than a string or integer.
    #[error("object member names must be strings, got {0}")]
    InvalidKey(&'static str),

    /// The same member name appeared twice in one object.
    #[error("duplicate object member name {0:?}")]
    DuplicateKey(String),

    /// An error raised by a `Serialize` implementation.
    #[error("{0}")]
    Custom(String),
}

impl serde::ser::Error for CanonicalizationError {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        CanonicalizationError::Custom(msg.to_string())
    }
}
