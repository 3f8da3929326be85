//! Per-event dispatch pipeline.
//!
//! Every inbound event runs through the same stages inside a span carrying
//! its `correlation_id`: resolve the handler, validate arguments (commands
//! only), run the handler behind a panic and timeout boundary, map failures
//! to replies, and deliver the reply. Envelopes are already acknowledged by
//! the socket layer before any of this runs.
//!
//! Failure rendering:
//!
//! | failure                         | logged at | user sees                      |
//! |---------------------------------|-----------|--------------------------------|
//! | argument error                  | info      | the problem and usage line     |
//! | undecodable workflow token      | warn      | generic notice in thread       |
//! | remote failure (command)        | error     | generic notice in thread       |
//! | remote failure (interaction)    | error     | message replaced, no elements  |
//! | panic or timeout (command)      | error     | generic notice in thread       |
//! | panic or timeout (interaction)  | error     | message replaced, no elements  |
//! | unknown action id               | error     | nothing                        |

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use seaman_core::{ChatEvent, InteractionEvent};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{HandlerError, ServerError};
use crate::formatter;
use crate::handlers::{ActionContext, CommandContext, Reply};
use crate::state::{AppState, InflightActions};
use crate::transport::Transport;

/// Why a handler produced no reply of its own.
enum Failure {
    Handler(HandlerError),
    Panicked(String),
    TimedOut(Duration),
}

/// Where replies for one event go.
struct Origin<'a> {
    channel: &'a str,
    thread_ts: &'a str,
    /// Message an `Update` replaces; `None` for chat commands.
    message_ts: Option<&'a str>,
}

/// Runs a text command event to completion.
#[instrument(
    skip_all,
    fields(
        correlation_id = %event.correlation_id(),
        channel = %event.channel_id,
        user = %event.sender_id,
    )
)]
pub async fn handle_chat(state: Arc<AppState>, event: ChatEvent) {
    let Some(matched) = state.commands().resolve(&event.text) else {
        debug!("Text does not start with a command, ignoring");
        return;
    };
    let spec = matched.command.spec();
    info!(command = spec.name(), "Received command");

    let origin = Origin {
        channel: &event.channel_id,
        thread_ts: event.reply_thread(),
        message_ts: None,
    };

    let args = match spec.parse_args(&matched.args) {
        Ok(args) => args,
        Err(e) => {
            info!(command = spec.name(), error = %e, "Rejected command arguments");
            let problem = format!("{e}\nUsage: `{}`", spec.usage());
            deliver(
                state.transport(),
                &origin,
                Reply::Message(formatter::invalid_arguments(&problem)),
            )
            .await;
            return;
        }
    };

    let ctx = CommandContext {
        event: &event,
        commands: state.commands(),
    };
    let outcome = guarded(
        state.handler_timeout(),
        matched.command.handler().handle(&ctx, &args),
    )
    .await;

    let reply = outcome.unwrap_or_else(|failure| failure_reply(failure, false));
    deliver(state.transport(), &origin, reply).await;
}

/// Runs an interactive element event to completion.
#[instrument(
    skip_all,
    fields(
        correlation_id = %event.correlation_id(),
        channel = %event.channel_id,
        action_id = %event.action_id,
        user = %event.sender_id,
    )
)]
pub async fn handle_interaction(state: Arc<AppState>, event: InteractionEvent) {
    let handler = match state.actions().resolve(&event.action_id) {
        Ok(handler) => handler,
        Err(e) => {
            error!(error = %e, "No handler registered for action");
            return;
        }
    };

    let key = InflightActions::key(&event.channel_id, &event.message_ts, &event.action_id);
    if let Err(holder) = state.inflight().try_lock(&key, &event.sender_id) {
        info!(holder = %holder, "Same click is already being handled, ignoring");
        return;
    }
    info!("Received action");

    let origin = Origin {
        channel: &event.channel_id,
        thread_ts: &event.message_ts,
        message_ts: Some(&event.message_ts),
    };
    let ctx = ActionContext { event: &event };
    let outcome = guarded(state.handler_timeout(), handler.handle(&ctx)).await;

    let reply = outcome.unwrap_or_else(|failure| failure_reply(failure, true));
    deliver(state.transport(), &origin, reply).await;
    state.inflight().unlock(&key);
}

/// Runs `fut` with a panic boundary and an upper time bound.
async fn guarded<F>(limit: Duration, fut: F) -> Result<Reply, Failure>
where
    F: Future<Output = Result<Reply, HandlerError>>,
{
    match tokio::time::timeout(limit, AssertUnwindSafe(fut).catch_unwind()).await {
        Err(_) => Err(Failure::TimedOut(limit)),
        Ok(Err(panic)) => Err(Failure::Panicked(panic_message(panic.as_ref()).to_string())),
        Ok(Ok(result)) => result.map_err(Failure::Handler),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
}

/// Logs `failure` and picks what the user sees.
fn failure_reply(failure: Failure, interaction: bool) -> Reply {
    match failure {
        Failure::Handler(HandlerError::InvalidArguments(problem)) => {
            info!(error = %problem, "Handler rejected arguments");
            Reply::Message(formatter::invalid_arguments(&problem))
        }
        Failure::Handler(HandlerError::Decode(e)) => {
            warn!(error = %e, "Rejected workflow token");
            Reply::Message(formatter::something_is_wrong())
        }
        Failure::Handler(e) => {
            error!(error = %e, "Handler failed");
            terminal_failure(interaction)
        }
        Failure::Panicked(message) => {
            error!(error = %message, "Handler panicked");
            terminal_failure(interaction)
        }
        Failure::TimedOut(limit) => {
            error!(
                timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                "Handler timed out"
            );
            terminal_failure(interaction)
        }
    }
}

/// Failure after the handler accepted its input. A clicked message is
/// replaced so its elements, and the token they carry, cannot be used again.
fn terminal_failure(interaction: bool) -> Reply {
    if interaction {
        Reply::Update(formatter::workflow_failed())
    } else {
        Reply::Message(formatter::something_is_wrong())
    }
}

/// Delivers `reply`; on failure posts the generic notice once.
async fn deliver(transport: &dyn Transport, origin: &Origin<'_>, reply: Reply) {
    let result = match reply {
        Reply::None => return,
        Reply::Message(blocks) => {
            transport
                .post_thread_reply(origin.channel, origin.thread_ts, blocks)
                .await
        }
        Reply::Update(blocks) => replace(transport, origin, blocks).await,
        Reply::UpdateWithNotice { blocks, notice } => {
            match replace(transport, origin, blocks).await {
                Ok(()) => {
                    transport
                        .post_thread_reply(origin.channel, origin.thread_ts, notice)
                        .await
                }
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Failed to deliver reply");
        if let Err(e) = transport
            .post_message(origin.channel, formatter::something_is_wrong())
            .await
        {
            error!(error = %e, "Failed to deliver failure notice, dropping");
        }
    }
}

async fn replace(
    transport: &dyn Transport,
    origin: &Origin<'_>,
    blocks: Vec<Value>,
) -> Result<(), ServerError> {
    match origin.message_ts {
        Some(ts) => transport.update_message(origin.channel, ts, blocks).await,
        None => {
            transport
                .post_thread_reply(origin.channel, origin.thread_ts, blocks)
                .await
        }
    }
}
