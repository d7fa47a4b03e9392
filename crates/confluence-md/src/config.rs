//! Site and credential configuration
//!
//! Settings come from `config.yaml` under the XDG config directory, then
//! environment variables override individual keys. All three keys are
//! required once both layers are applied.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name under the config root
const CONFIG_DIR_NAME: &str = "confluence-md";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.yaml";

pub const ENV_URL: &str = "CONFLUENCE_URL";
pub const ENV_EMAIL: &str = "CONFLUENCE_EMAIL";
pub const ENV_API_TOKEN: &str = "CONFLUENCE_API_TOKEN";

/// Connection settings for a Confluence site
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Site base URL, e.g. `https://acme.atlassian.net/wiki`
    #[serde(default)]
    pub confluence_url: String,

    /// Account email used for basic auth
    #[serde(default)]
    pub email: String,

    /// API token used for basic auth
    #[serde(default)]
    pub api_token: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("confluence_url", &self.confluence_url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load from the default file location plus environment, then validate
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_config_path()?;
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            debug!(?path, "Config file not found, using environment only");
            Self::default()
        };
        config.apply_env().validate()
    }

    /// Load from an explicit file plus environment, then validate.
    /// Unlike [`Config::load`], the file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::from_file(path)?.apply_env().validate()
    }

    /// Parse a YAML config file without validation
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse YAML config text without validation. Empty text yields defaults.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Override keys from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Override keys using the given lookup. Empty values are ignored.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_URL) {
            self.confluence_url = url;
        }
        if let Some(email) = get(ENV_EMAIL) {
            self.email = email;
        }
        if let Some(token) = get(ENV_API_TOKEN) {
            self.api_token = token;
        }
        self
    }

    /// Ensure every key is set
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.confluence_url.is_empty() {
            return Err(ConfigError::Missing {
                key: "confluence_url",
                env: ENV_URL,
            });
        }
        if self.email.is_empty() {
            return Err(ConfigError::Missing {
                key: "email",
                env: ENV_EMAIL,
            });
        }
        if self.api_token.is_empty() {
            return Err(ConfigError::Missing {
                key: "api_token",
                env: ENV_API_TOKEN,
            });
        }
        Ok(self)
    }
}

/// `$XDG_CONFIG_HOME/confluence-md/config.yaml`, or `~/.config/confluence-md/config.yaml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    config_path_with(|key| std::env::var(key).ok(), dirs::home_dir())
}

fn config_path_with<F>(lookup: F, home: Option<PathBuf>) -> Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let root = match lookup("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => home.ok_or(ConfigError::NoHomeDir)?.join(".config"),
    };
    Ok(root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
