//! Socket Mode WebSocket connection management.
//!
//! [`SocketClient`] keeps the outbound WebSocket to Slack open, acknowledges
//! every envelope before its handler runs, and reconnects with exponential
//! backoff. On shutdown it stops reading, lets in-flight handlers finish
//! within [`SHUTDOWN_GRACE`], then aborts whatever is left.

use std::future::Future;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::dispatch::{self, Envelope, ParsedMessage};
use crate::error::ServerError;
use crate::slack_client::SlackClient;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How long in-flight handlers may keep running after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket Mode client.
///
/// # Examples
///
/// ```no_run
/// use seaman_server::slack_client::SlackClient;
/// use seaman_server::socket::SocketClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let slack = SlackClient::new("xoxb-token".into());
/// let socket = SocketClient::new("xapp-token".into(), slack);
/// let (_tx, rx) = tokio::sync::watch::channel(false);
/// socket.run(|_envelope| async {}, rx).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SocketClient {
    app_token: String,
    slack: SlackClient,
}

/// Why a single connection's read loop ended.
enum ConnectionExit {
    Shutdown,
    Disconnect,
}

impl SocketClient {
    /// Creates a client that opens connections with `app_token`.
    pub fn new(app_token: String, slack: SlackClient) -> Self {
        Self { app_token, slack }
    }

    /// Runs the connection loop until `shutdown` flips to `true`.
    ///
    /// Each envelope is acknowledged with `{"envelope_id": ...}` before
    /// `handler` is spawned, so slow handlers never delay the ack.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok`; connection failures are retried.
    pub async fn run<F, Fut>(
        &self,
        handler: F,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ServerError>
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut backoff = INITIAL_BACKOFF;
        let mut tasks = JoinSet::new();

        while !*shutdown.borrow() {
            match self
                .connect_and_run(&handler, &mut shutdown, &mut tasks)
                .await
            {
                Ok(ConnectionExit::Shutdown) => break,
                Ok(ConnectionExit::Disconnect) => {
                    info!("Disconnected, reconnecting");
                    backoff = INITIAL_BACKOFF;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        backoff_secs = backoff.as_secs(),
                        "Connection error, reconnecting after backoff"
                    );
                }
            }

            tokio::select! {
                () = tokio::time::sleep(backoff) => {}
                _ = shutdown.changed() => {}
            }
            backoff = next_backoff(backoff);
        }

        info!("Shutdown requested, leaving socket loop");
        drain(&mut tasks, SHUTDOWN_GRACE).await;
        Ok(())
    }

    async fn connect_and_run<F, Fut>(
        &self,
        handler: &F,
        shutdown: &mut watch::Receiver<bool>,
        tasks: &mut JoinSet<()>,
    ) -> Result<ConnectionExit, ServerError>
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let wss_url = self.slack.connections_open(&self.app_token).await?;
        let (ws_stream, _response): (WsStream, _) = connect_async(wss_url.as_str())
            .await
            .map_err(|e| ServerError::WebSocket(format!("WebSocket connect failed: {e}")))?;
        info!("WebSocket connected to Slack Socket Mode");

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    let Some(msg_result) = msg else {
                        info!("WebSocket stream ended");
                        return Ok(ConnectionExit::Disconnect);
                    };
                    let ws_msg = msg_result.map_err(|e| {
                        ServerError::WebSocket(format!("WebSocket read error: {e}"))
                    })?;

                    match ws_msg {
                        WsMessage::Text(text) => match dispatch::parse_message(&text) {
                            Ok(Some(ParsedMessage::Envelope(envelope))) => {
                                write
                                    .send(WsMessage::Text(ack_frame(&envelope.envelope_id)))
                                    .await
                                    .map_err(|e| {
                                        ServerError::WebSocket(format!("Ack send failed: {e}"))
                                    })?;

                                while tasks.try_join_next().is_some() {}
                                tasks.spawn(handler(envelope));
                            }
                            Ok(Some(ParsedMessage::Disconnect)) => {
                                return Ok(ConnectionExit::Disconnect);
                            }
                            Ok(Some(ParsedMessage::Hello) | None) => {}
                            Err(e) => warn!(error = %e, "Dropping unparsable frame"),
                        },
                        WsMessage::Ping(data) => {
                            write.send(WsMessage::Pong(data)).await.map_err(|e| {
                                ServerError::WebSocket(format!("Pong send failed: {e}"))
                            })?;
                        }
                        WsMessage::Close(_) => {
                            info!("Received WebSocket close frame");
                            return Ok(ConnectionExit::Disconnect);
                        }
                        _ => {}
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return Ok(ConnectionExit::Shutdown);
                    }
                }
            }
        }
    }
}

/// Acknowledgement frame for an envelope.
fn ack_frame(envelope_id: &str) -> String {
    serde_json::json!({ "envelope_id": envelope_id }).to_string()
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Waits up to `grace` for spawned handlers, then aborts the rest.
async fn drain(tasks: &mut JoinSet<()>, grace: Duration) {
    if tasks.is_empty() {
        return;
    }
    info!(task_count = tasks.len(), "Waiting for in-flight handlers");

    let finished = tokio::time::timeout(grace, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    if finished.is_err() {
        warn!(
            task_count = tasks.len(),
            grace_secs = grace.as_secs(),
            "Grace period elapsed, aborting handlers"
        );
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    } else {
        debug!("All handlers finished");
    }
}
