//! Envelope parsing and routing for Socket Mode messages.
//!
//! Raw WebSocket text is parsed into [`ParsedMessage`]s. Business envelopes
//! are turned into [`ChatEvent`]s (bot mentions and direct messages) or
//! [`InteractionEvent`]s (block actions) and handed to the pipeline.

use std::sync::Arc;

use seaman_core::{ChatEvent, InteractionEvent};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::ServerError;
use crate::pipeline;
use crate::state::AppState;

/// A Socket Mode envelope received from Slack.
///
/// # Examples
///
/// ```
/// use seaman_server::dispatch::{parse_message, EnvelopeType, ParsedMessage};
///
/// let json = r#"{"envelope_id":"abc123","type":"events_api","payload":{}}"#;
/// let Some(ParsedMessage::Envelope(envelope)) = parse_message(json).unwrap() else {
///     panic!("not an envelope");
/// };
/// assert_eq!(envelope.envelope_type, EnvelopeType::EventsApi);
/// ```
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Identifier echoed back in the acknowledgement.
    pub envelope_id: String,
    pub envelope_type: EnvelopeType,
    pub payload: serde_json::Value,
}

/// Kind of envelope payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeType {
    /// Slash command invocation; acknowledged but not handled.
    SlashCommands,
    /// Events API event (mentions, messages).
    EventsApi,
    /// Interactive component action (button click, select).
    Interactive,
}

#[derive(Debug, Deserialize)]
struct RawSocketMessage {
    #[serde(rename = "type")]
    msg_type: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

/// Result of parsing a raw Socket Mode message.
#[derive(Debug)]
pub enum ParsedMessage {
    Hello,
    Disconnect,
    Envelope(Envelope),
}

/// Parses a raw JSON frame from the WebSocket.
///
/// Returns `None` for unknown message types and envelopes without an id.
///
/// # Errors
///
/// Returns `ServerError::Dispatch` if the frame is not JSON.
pub fn parse_message(text: &str) -> Result<Option<ParsedMessage>, ServerError> {
    let raw: RawSocketMessage =
        serde_json::from_str(text).map_err(|e| ServerError::Dispatch(format!("Bad JSON: {e}")))?;

    let envelope_type = match raw.msg_type.as_str() {
        "hello" => {
            info!("Received hello from Slack, connection established");
            return Ok(Some(ParsedMessage::Hello));
        }
        "disconnect" => {
            info!("Received disconnect from Slack, will reconnect");
            return Ok(Some(ParsedMessage::Disconnect));
        }
        "slash_commands" => EnvelopeType::SlashCommands,
        "events_api" => EnvelopeType::EventsApi,
        "interactive" => EnvelopeType::Interactive,
        other => {
            warn!(msg_type = other, "Unknown Socket Mode message type, ignoring");
            return Ok(None);
        }
    };

    let Some(envelope_id) = raw.envelope_id else {
        warn!(msg_type = raw.msg_type, "Envelope missing envelope_id, skipping");
        return Ok(None);
    };
    debug!(envelope_id, envelope_type = ?envelope_type, "Parsed envelope");

    Ok(Some(ParsedMessage::Envelope(Envelope {
        envelope_id,
        envelope_type,
        payload: raw.payload.unwrap_or(serde_json::Value::Null),
    })))
}

#[derive(Debug, Deserialize)]
struct EventsApiPayload {
    event: EventPayload,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum EventPayload {
    #[serde(rename = "app_mention")]
    AppMention(MessageEvent),
    #[serde(rename = "message")]
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageEvent {
    channel: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: String,
    ts: String,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    channel_type: Option<String>,
}

/// Extracts a chat event from an Events API payload.
///
/// Only bot mentions and direct messages from users count; messages in
/// channels arrive as mentions too, so they are not handled twice.
fn chat_event(payload: serde_json::Value) -> Option<ChatEvent> {
    let events: EventsApiPayload = match serde_json::from_value(payload) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Failed to parse events_api payload");
            return None;
        }
    };

    let msg = match events.event {
        EventPayload::AppMention(msg) => msg,
        EventPayload::Message(msg) if msg.channel_type.as_deref() == Some("im") => msg,
        EventPayload::Message(_) | EventPayload::Other => {
            debug!("Ignoring event");
            return None;
        }
    };

    if msg.bot_id.is_some() || msg.subtype.is_some() {
        debug!(channel = msg.channel, "Skipping bot or system message");
        return None;
    }
    let Some(sender_id) = msg.user else {
        debug!(channel = msg.channel, "Skipping message without user");
        return None;
    };

    Some(ChatEvent {
        channel_id: msg.channel,
        ts: msg.ts,
        thread_ts: msg.thread_ts,
        sender_id,
        text: msg.text,
    })
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SelectedOption {
    value: String,
}

#[derive(Debug, Deserialize)]
struct Action {
    action_id: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    selected_option: Option<SelectedOption>,
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    #[serde(rename = "type")]
    kind: String,
    user: IdRef,
    channel: IdRef,
    message: serde_json::Value,
    #[serde(default)]
    actions: Vec<Action>,
}

/// Extracts one interaction event per action of a `block_actions` payload.
fn interaction_events(payload: serde_json::Value) -> Vec<InteractionEvent> {
    let interaction: InteractionPayload = match serde_json::from_value(payload) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Failed to parse interaction payload");
            return Vec::new();
        }
    };
    if interaction.kind != "block_actions" {
        debug!(kind = interaction.kind, "Ignoring interaction type");
        return Vec::new();
    }
    let Some(message_ts) = interaction
        .message
        .get("ts")
        .and_then(|ts| ts.as_str())
        .map(str::to_string)
    else {
        warn!("Interaction payload has no message ts");
        return Vec::new();
    };

    interaction
        .actions
        .into_iter()
        .map(|action| InteractionEvent {
            channel_id: interaction.channel.id.clone(),
            message_ts: message_ts.clone(),
            sender_id: interaction.user.id.clone(),
            value: action
                .value
                .or(action.selected_option.map(|o| o.value))
                .unwrap_or_default(),
            action_id: action.action_id,
            message: interaction.message.clone(),
        })
        .collect()
}

/// Routes an acknowledged envelope to the pipeline.
#[instrument(
    skip(state, envelope),
    fields(
        envelope_id = %envelope.envelope_id,
        envelope_type = ?envelope.envelope_type,
    )
)]
pub async fn dispatch(state: Arc<AppState>, envelope: Envelope) {
    match envelope.envelope_type {
        EnvelopeType::SlashCommands => {
            debug!("Slash commands are not handled, mention the bot instead");
        }
        EnvelopeType::EventsApi => {
            if let Some(event) = chat_event(envelope.payload) {
                pipeline::handle_chat(state, event).await;
            }
        }
        EnvelopeType::Interactive => {
            for event in interaction_events(envelope.payload) {
                pipeline::handle_interaction(Arc::clone(&state), event).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_parse_hello_message() {
        let parsed = parse_message(r#"{"type":"hello","num_connections":1}"#)
            .expect("parse")
            .expect("some");
        assert!(matches!(parsed, ParsedMessage::Hello));
    }

    #[test]
    fn test_should_parse_disconnect_message() {
        let parsed = parse_message(r#"{"type":"disconnect","reason":"warning"}"#)
            .expect("parse")
            .expect("some");
        assert!(matches!(parsed, ParsedMessage::Disconnect));
    }

    #[test]
    fn test_should_parse_interactive_envelope() {
        let json = r#"{"envelope_id":"env-789","type":"interactive","payload":{"actions":[]}}"#;
        let Some(ParsedMessage::Envelope(env)) = parse_message(json).expect("parse") else {
            panic!("Expected Envelope");
        };
        assert_eq!(env.envelope_id, "env-789");
        assert_eq!(env.envelope_type, EnvelopeType::Interactive);
    }

    #[test]
    fn test_should_default_missing_payload_to_null() {
        let json = r#"{"envelope_id":"e1","type":"events_api"}"#;
        let Some(ParsedMessage::Envelope(env)) = parse_message(json).expect("parse") else {
            panic!("Expected Envelope");
        };
        assert!(env.payload.is_null());
    }

    #[test]
    fn test_should_skip_unknown_type_and_missing_id() {
        assert!(parse_message(r#"{"type":"unknown_type"}"#).expect("parse").is_none());
        assert!(parse_message(r#"{"type":"events_api","payload":{}}"#).expect("parse").is_none());
    }

    #[test]
    fn test_should_error_on_invalid_json() {
        let err = parse_message("not json").unwrap_err();
        assert!(err.to_string().contains("Bad JSON"));
    }

    #[test]
    fn test_should_build_chat_event_from_mention() {
        let payload = json!({
            "event": {
                "type": "app_mention",
                "channel": "C1",
                "user": "U1",
                "text": "<@B1> track list",
                "ts": "1700000000.000100",
                "thread_ts": "1699999999.000001"
            }
        });

        let event = chat_event(payload).expect("chat event");

        assert_eq!(event.channel_id, "C1");
        assert_eq!(event.sender_id, "U1");
        assert_eq!(event.text, "<@B1> track list");
        assert_eq!(event.reply_thread(), "1699999999.000001");
        assert_eq!(event.correlation_id(), "1700000000.000100");
    }

    #[test]
    fn test_should_accept_direct_message() {
        let payload = json!({
            "event": {
                "type": "message",
                "channel_type": "im",
                "channel": "D1",
                "user": "U1",
                "text": "help",
                "ts": "1.0"
            }
        });
        assert!(chat_event(payload).is_some());
    }

    #[test]
    fn test_should_ignore_channel_message_and_bot_message() {
        let channel = json!({
            "event": {"type": "message", "channel_type": "channel", "channel": "C1",
                      "user": "U1", "text": "help", "ts": "1.0"}
        });
        let bot = json!({
            "event": {"type": "app_mention", "channel": "C1", "bot_id": "B2",
                      "text": "<@B1> help", "ts": "1.0"}
        });
        let other = json!({ "event": {"type": "reaction_added"} });

        assert!(chat_event(channel).is_none());
        assert!(chat_event(bot).is_none());
        assert!(chat_event(other).is_none());
    }

    #[test]
    fn test_should_build_interaction_from_button() {
        let payload = json!({
            "type": "block_actions",
            "user": {"id": "U2", "name": "op"},
            "channel": {"id": "C1", "name": "live"},
            "message": {"ts": "1700000000.000200", "blocks": [{"type": "divider"}]},
            "actions": [{"action_id": "release_ok", "value": "token", "type": "button"}]
        });

        let events = interaction_events(payload);

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.action_id, "release_ok");
        assert_eq!(event.value, "token");
        assert_eq!(event.sender_id, "U2");
        assert_eq!(event.message_ts, "1700000000.000200");
        assert_eq!(event.message["blocks"][0]["type"], "divider");
    }

    #[test]
    fn test_should_take_value_from_selected_option() {
        let payload = json!({
            "type": "block_actions",
            "user": {"id": "U2"},
            "channel": {"id": "C1"},
            "message": {"ts": "1.0"},
            "actions": [{
                "action_id": "release_selected_repository",
                "selected_option": {"value": "picked", "text": {"type": "plain_text", "text": "x"}}
            }]
        });

        let events = interaction_events(payload);
        assert_eq!(events[0].value, "picked");
    }

    #[test]
    fn test_should_ignore_non_block_actions() {
        let payload = json!({
            "type": "view_submission",
            "user": {"id": "U2"},
            "channel": {"id": "C1"},
            "message": {"ts": "1.0"}
        });
        assert!(interaction_events(payload).is_empty());
        assert!(interaction_events(json!({"type": "block_actions"})).is_empty());
    }
}
