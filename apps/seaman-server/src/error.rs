//! Error types for the seaman-server application.
//!
//! [`ServerError`] is the error type of all I/O-facing operations (config,
//! Slack, WebSocket, remote services). [`HandlerError`] is what a command or
//! action handler returns; the pipeline turns it into a user-facing reply
//! and decides how much detail is logged.

use seaman_core::{CoreError, DecodeError, TokenError};
use thiserror::Error;

/// Error type for seaman-server operations.
///
/// # Examples
///
/// ```
/// use seaman_server::error::ServerError;
///
/// let err = ServerError::Config("missing app_token".into());
/// assert!(err.to_string().contains("missing app_token"));
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// A configuration error (missing or invalid config file/values).
    #[error("Config error: {0}")]
    Config(String),

    /// An error from a Slack Web API call.
    #[error("Slack API error: {0}")]
    SlackApi(String),

    /// A WebSocket transport error (connection, read, write).
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An error while dispatching or routing an envelope.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// A call to the production-control or release service failed.
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// An I/O error from file system operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A routing table could not be built.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Failure of a single command or action handler.
///
/// Only `InvalidArguments` text is shown to the user; every other variant
/// is rendered as a generic failure.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// User input was malformed.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The workflow token attached to the element was malformed or stale.
    #[error("Invalid workflow token: {0}")]
    Decode(#[from] DecodeError),

    /// A remote service call failed or timed out.
    #[error(transparent)]
    Remote(#[from] ServerError),

    /// A workflow token for the reply could not be built.
    #[error("Cannot build workflow token: {0}")]
    Token(#[from] TokenError),
}
