//! seaman: Slack Socket Mode bot for operating live-event production.
//!
//! Operators mention the bot with text commands or click buttons on its
//! messages; the bot drives the production-control service and opens
//! release pull requests on GitHub.

mod config;
mod control_client;
mod dispatch;
mod error;
mod formatter;
mod handlers;
mod pipeline;
mod release_client;
mod slack_client;
mod socket;
mod state;
mod transport;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::handlers::{ReleaseDeps, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("seaman_server=info".parse()?)
                .add_directive("seaman_core=info".parse()?),
        )
        .init();

    let config_path = config::config_path().context("Failed to determine config path")?;
    let server_config = config::ServerConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let control = control_client::HttpControlPlane::new(&server_config.control)
        .context("Failed to build production-control client")?;
    let release = match (&server_config.github, server_config.release.targets.is_empty()) {
        (Some(github), false) => Some(ReleaseDeps {
            service: Arc::new(
                release_client::GitHubReleaseClient::new(github)
                    .context("Failed to build GitHub client")?,
            ),
            targets: Arc::from(server_config.release.targets.clone()),
        }),
        _ => None,
    };
    let services = Services {
        control: Arc::new(control),
        release,
    };
    let (commands, actions) =
        handlers::routes(&services).context("Failed to build command routes")?;
    info!(
        commands = commands.len(),
        actions = actions.len(),
        "Routes registered"
    );

    let slack = slack_client::SlackClient::new(server_config.slack.bot_token.clone());
    let app_state = Arc::new(state::AppState::new(
        Arc::new(slack.clone()),
        commands,
        actions,
        server_config.handler_timeout(),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to register SIGTERM handler")?;

    tokio::spawn(async move {
        #[cfg(unix)]
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok();
            info!("Received SIGINT, shutting down");
        }

        let _ = shutdown_tx.send(true);
    });

    let socket = socket::SocketClient::new(server_config.slack.app_token.clone(), slack);
    let state_for_handler = Arc::clone(&app_state);

    info!("Starting Socket Mode connection");
    socket
        .run(
            move |envelope| {
                let state = Arc::clone(&state_for_handler);
                async move {
                    dispatch::dispatch(state, envelope).await;
                }
            },
            shutdown_rx,
        )
        .await
        .context("Socket Mode event loop failed")?;

    info!("Server shut down cleanly");
    Ok(())
}
