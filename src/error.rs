use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the rtprops library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("required property not defined: {0}")]
    MissingProperty(String),

    #[error("property '{key}' has value '{value}', expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}
