//! Outbound chat operations used to deliver handler replies.
//!
//! The pipeline only talks to the chat platform through [`Transport`], so
//! tests can record deliveries and inject failures.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ServerError;

/// Outbound message operations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts a new top-level message to a channel.
    async fn post_message(&self, channel: &str, blocks: Vec<Value>) -> Result<(), ServerError>;

    /// Posts a message into the thread rooted at `thread_ts`.
    async fn post_thread_reply(
        &self,
        channel: &str,
        thread_ts: &str,
        blocks: Vec<Value>,
    ) -> Result<(), ServerError>;

    /// Replaces the content of the message at `ts`.
    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        blocks: Vec<Value>,
    ) -> Result<(), ServerError>;
}
