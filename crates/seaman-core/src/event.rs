//! Inbound chat events.
//!
//! Both event types are transient: built per inbound envelope, handed to
//! exactly one handler and dropped afterwards.

/// A free-text message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Timestamp of the message itself.
    pub ts: String,
    /// Parent thread timestamp if the message was posted in a thread.
    pub thread_ts: Option<String>,
    /// User who sent the message.
    pub sender_id: String,
    /// Raw message text, including the mention.
    pub text: String,
}

impl ChatEvent {
    /// Thread that replies to this event go to.
    ///
    /// Replies continue an existing thread, or start one on the message.
    pub fn reply_thread(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    /// Correlation id used for all logging about this event.
    pub fn correlation_id(&self) -> &str {
        &self.ts
    }
}

/// Activation of an interactive element (button click, select option).
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEvent {
    /// Channel containing the message with the element.
    pub channel_id: String,
    /// Timestamp of the message carrying the element.
    pub message_ts: String,
    /// User who activated the element.
    pub sender_id: String,
    /// Action identifier of the element.
    pub action_id: String,
    /// Button value or selected option value; a workflow token for
    /// workflow elements.
    pub value: String,
    /// Blocks of the message the element belongs to.
    pub message: serde_json::Value,
}

impl InteractionEvent {
    /// Correlation id used for all logging about this event.
    pub fn correlation_id(&self) -> &str {
        &self.message_ts
    }
}
