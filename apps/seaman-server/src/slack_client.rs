//! Thin async client for the Slack Web API methods seaman needs.
//!
//! Wraps `reqwest::Client` with the bot token and implements
//! [`Transport`] on top of `chat.postMessage` and `chat.update`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ServerError;
use crate::transport::Transport;

/// Base URL for Slack Web API.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Notification text shown by clients that cannot render blocks.
const FALLBACK_TEXT: &str = "seaman";

/// Slack Web API client.
///
/// All methods authenticate with the bot token (`xoxb-...`) except
/// [`connections_open`](Self::connections_open), which takes the app-level
/// token (`xapp-...`).
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    bot_token: String,
}

/// Subset of the Slack response envelope seaman reads.
#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl SlackClient {
    /// Creates a client authenticating with `bot_token`.
    pub fn new(bot_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
        }
    }

    /// Opens a Socket Mode connection and returns the WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::SlackApi` if the call fails or Slack rejects it.
    pub async fn connections_open(&self, app_token: &str) -> Result<String, ServerError> {
        debug!("Opening Socket Mode connection");
        let resp = self
            .http
            .post(format!("{SLACK_API_BASE}/apps.connections.open"))
            .bearer_auth(app_token)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await
            .map_err(|e| {
                ServerError::SlackApi(format!("apps.connections.open request failed: {e}"))
            })?;

        let api_resp = check_response("apps.connections.open", resp).await?;
        api_resp.url.ok_or_else(|| {
            ServerError::SlackApi("apps.connections.open response missing 'url'".into())
        })
    }

    /// Sends a JSON POST to a Web API method with the bot token.
    async fn call_bot_api(&self, method: &str, body: &Value) -> Result<(), ServerError> {
        let resp = self
            .http
            .post(format!("{SLACK_API_BASE}/{method}"))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await
            .map_err(|e| ServerError::SlackApi(format!("{method} request failed: {e}")))?;

        check_response(method, resp).await.map(|_| ())
    }
}

async fn check_response(
    method: &str,
    resp: reqwest::Response,
) -> Result<SlackApiResponse, ServerError> {
    let api_resp: SlackApiResponse = resp
        .json()
        .await
        .map_err(|e| ServerError::SlackApi(format!("{method} response parse failed: {e}")))?;

    if !api_resp.ok {
        let error_msg = api_resp.error.as_deref().unwrap_or("unknown");
        warn!(method, error = error_msg, "Slack API error");
        return Err(ServerError::SlackApi(format!("{method} error: {error_msg}")));
    }
    Ok(api_resp)
}

/// Builds the `chat.postMessage` body; `thread_ts` nests the reply.
fn post_body(channel: &str, thread_ts: Option<&str>, blocks: Vec<Value>) -> Value {
    let mut body = serde_json::json!({
        "channel": channel,
        "text": FALLBACK_TEXT,
        "blocks": blocks,
    });
    if let Some(ts) = thread_ts {
        body["thread_ts"] = Value::String(ts.to_string());
    }
    body
}

#[async_trait]
impl Transport for SlackClient {
    async fn post_message(&self, channel: &str, blocks: Vec<Value>) -> Result<(), ServerError> {
        debug!(channel, "Posting message");
        self.call_bot_api("chat.postMessage", &post_body(channel, None, blocks))
            .await
    }

    async fn post_thread_reply(
        &self,
        channel: &str,
        thread_ts: &str,
        blocks: Vec<Value>,
    ) -> Result<(), ServerError> {
        debug!(channel, thread_ts, "Posting thread reply");
        self.call_bot_api(
            "chat.postMessage",
            &post_body(channel, Some(thread_ts), blocks),
        )
        .await
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        blocks: Vec<Value>,
    ) -> Result<(), ServerError> {
        let body = serde_json::json!({
            "channel": channel,
            "ts": ts,
            "text": FALLBACK_TEXT,
            "blocks": blocks,
        });
        debug!(channel, ts, "Updating message");
        self.call_bot_api("chat.update", &body).await
    }
}
