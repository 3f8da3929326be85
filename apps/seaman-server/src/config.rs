//! Server configuration types and loading.
//!
//! Defines [`ServerConfig`] which is loaded from `$SEAMAN_CONFIG` or
//! `~/.seaman/config.yml`. Contains Slack API tokens, the production-control
//! endpoint, GitHub credentials and the release targets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use seaman_core::workflow::ReleaseState;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ServerError;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "SEAMAN_CONFIG";

/// Slack's limit on a `static_select` option value.
const MAX_SELECT_OPTION_VALUE_LEN: usize = 150;

/// Top-level server configuration.
///
/// # Examples
///
/// ```
/// use seaman_server::config::ServerConfig;
///
/// let yaml = r#"
/// slack:
///   app_token: "xapp-1-test"
///   bot_token: "xoxb-test"
/// control:
///   base_url: "http://localhost:8080"
/// "#;
///
/// let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(config.control.timeout_secs, 5);
/// assert!(config.release.targets.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Slack API token configuration.
    pub slack: SlackConfig,

    /// Production-control service endpoint.
    pub control: ControlConfig,

    /// GitHub credentials, required when release targets are configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubConfig>,

    /// Release workflow configuration.
    #[serde(default)]
    pub release: ReleaseConfig,

    /// Upper bound on a single handler invocation, in seconds.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
}

/// Slack API token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// App-level token for Socket Mode (`xapp-...`).
    pub app_token: String,

    /// Bot User OAuth Token for Web API calls (`xoxb-...`).
    pub bot_token: String,
}

/// Production-control service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Base URL, e.g. `http://control.internal:8080`.
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_control_timeout_secs")]
    pub timeout_secs: u64,
}

/// GitHub API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Token allowed to push branches and open pull requests.
    pub access_token: String,

    /// API base URL (GitHub Enterprise installs differ).
    #[serde(default = "default_github_api_base")]
    pub api_base: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_github_timeout_secs")]
    pub timeout_secs: u64,
}

/// Release workflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Repositories offered in the release select menu.
    #[serde(default)]
    pub targets: Vec<ReleaseTarget>,
}

/// A repository releases can be requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTarget {
    /// `owner/name`.
    pub repository: String,

    /// Branch the release pull request targets.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
}

fn default_handler_timeout_secs() -> u64 {
    10
}

fn default_control_timeout_secs() -> u64 {
    5
}

fn default_github_timeout_secs() -> u64 {
    5
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_base_branch() -> String {
    "main".to_string()
}

/// Returns the default configuration directory path (`~/.seaman/`).
///
/// # Errors
///
/// Returns `ServerError::Config` if the `HOME` environment variable is not set.
pub fn default_config_dir() -> Result<PathBuf, ServerError> {
    let home = std::env::var("HOME")
        .map_err(|_| ServerError::Config("HOME environment variable not set".into()))?;
    Ok(PathBuf::from(home).join(".seaman"))
}

/// Returns the config file path: `$SEAMAN_CONFIG` if set, otherwise
/// `~/.seaman/config.yml`.
///
/// # Errors
///
/// Returns `ServerError::Config` if neither `SEAMAN_CONFIG` nor `HOME` is set.
pub fn config_path() -> Result<PathBuf, ServerError> {
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    Ok(default_config_dir()?.join("config.yml"))
}

impl ServerConfig {
    /// Loads configuration from the given YAML file path.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the file cannot be read, contains
    /// invalid YAML, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        info!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("Cannot read config at {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            ServerError::Config(format!("Invalid YAML in config at {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Handler timeout as a [`Duration`].
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }

    /// Validates that required fields are present and well-formed.
    fn validate(&self) -> Result<(), ServerError> {
        if !self.slack.app_token.starts_with("xapp-") {
            return Err(ServerError::Config(
                "slack.app_token must start with 'xapp-'".into(),
            ));
        }
        if !self.slack.bot_token.starts_with("xoxb-") {
            return Err(ServerError::Config(
                "slack.bot_token must start with 'xoxb-'".into(),
            ));
        }
        if !(self.control.base_url.starts_with("http://")
            || self.control.base_url.starts_with("https://"))
        {
            return Err(ServerError::Config(
                "control.base_url must be an http(s) URL".into(),
            ));
        }
        let github_timeout = self.github.as_ref().map_or(1, |g| g.timeout_secs);
        if [self.control.timeout_secs, self.handler_timeout_secs, github_timeout].contains(&0) {
            return Err(ServerError::Config("timeouts must be positive".into()));
        }

        let mut seen = HashSet::new();
        for target in &self.release.targets {
            if target.repository.split('/').filter(|p| !p.is_empty()).count() != 2 {
                return Err(ServerError::Config(format!(
                    "release target '{}' must be 'owner/name'",
                    target.repository
                )));
            }
            let option_value = ReleaseState::select_repository(&target.repository)
                .encode()
                .map_err(|e| {
                    ServerError::Config(format!("release target '{}': {e}", target.repository))
                })?;
            if option_value.len() > MAX_SELECT_OPTION_VALUE_LEN {
                return Err(ServerError::Config(format!(
                    "release target '{}' is too long for a select option value \
                     ({} > {MAX_SELECT_OPTION_VALUE_LEN} characters)",
                    target.repository,
                    option_value.len()
                )));
            }
            if !seen.insert(target.repository.as_str()) {
                return Err(ServerError::Config(format!(
                    "release target '{}' is listed twice",
                    target.repository
                )));
            }
        }

        if !self.release.targets.is_empty() {
            match &self.github {
                Some(github) if !github.access_token.is_empty() => {}
                _ => {
                    return Err(ServerError::Config(
                        "github.access_token is required when release targets are set".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}
