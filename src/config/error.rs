use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write properties to '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to fetch '{url}': {source}")]
    HttpError {
        url: String,
        source: reqwest::Error,
    },

    #[error("'{url}' returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("invalid/blank include URL")]
    BlankInclude,

    #[error("URL does not name a local file: {0}")]
    NotAFilePath(String),

    #[error("unsupported URL scheme '{0}' (expected file, http or https)")]
    UnsupportedScheme(String),

    #[error("'{url}' cannot be included from '{parent}'")]
    CrossProtocolInclude { parent: String, url: String },

    #[error("excessive include recursion at depth {depth}: {url}")]
    RecursionLimit { depth: usize, url: String },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),
}

impl ConfigError {
    /// Returns true if the failure means the resource simply does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ConfigError::FileNotFound(_) => true,
            ConfigError::HttpStatus { status, .. } => *status == 404,
            _ => false,
        }
    }
}
