//! Error types for confluence-md

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by a markdown converter backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The HTML to markdown converter failed
#[derive(Debug, Error)]
#[error("Failed to convert HTML to markdown")]
pub struct ConversionError(#[source] BoxError);

impl ConversionError {
    /// Wrap the underlying converter failure
    pub fn new(cause: impl Into<BoxError>) -> Self {
        Self(cause.into())
    }
}

/// Errors that can occur while talking to the Confluence REST API
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed or has no `/pages/<id>` segment
    #[error("Invalid Confluence page URL: {0}")]
    InvalidPageUrl(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request did not complete within the client timeout
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Response body was not the expected JSON document
    #[error("Failed to decode response")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::ConnectError(err)
        } else {
            FetchError::RequestError(err.to_string())
        }
    }
}

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is empty after merging file and environment
    #[error("{key} not set (check config file or {env} env var)")]
    Missing {
        key: &'static str,
        env: &'static str,
    },

    /// Explicitly requested config file does not exist
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Config file exists but could not be read
    #[error("Failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML
    #[error("Failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Neither XDG_CONFIG_HOME nor a home directory is available
    #[error("Could not determine config directory")]
    NoHomeDir,
}

/// Any error surfaced by the library
#[derive(Debug, Error)]
pub enum Error {
    #[error("loading configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("fetching page: {0}")]
    Fetch(#[from] FetchError),

    #[error("converting to markdown: {0}")]
    Conversion(#[from] ConversionError),
}
