//! Command and action handlers.
//!
//! Handlers never talk to Slack directly: they return a [`Reply`] and the
//! pipeline delivers it. Each submodule owns one functional area:
//!
//! - [`common`]: `help`, `version` and the shared cancel button
//! - [`broadcast`]: track automation and scene switching
//! - [`release`]: the release pull request workflow

pub mod broadcast;
pub mod common;
pub mod release;

use std::sync::Arc;

use async_trait::async_trait;
use seaman_core::command::{ArgSpec, Arguments, CommandSpec};
use seaman_core::workflow::ReleaseLevel;
use seaman_core::{ChatEvent, CommandRegistry, CoreError, InteractionEvent, InteractionRouter};
use serde_json::Value;

use crate::config::ReleaseTarget;
use crate::control_client::ControlPlane;
use crate::error::HandlerError;
use crate::formatter;
use crate::release_client::ReleaseService;

pub type Commands = CommandRegistry<Arc<dyn CommandHandler>>;
pub type Actions = InteractionRouter<Arc<dyn ActionHandler>>;

/// What the pipeline should deliver after a handler ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing to deliver.
    None,
    /// A new message in the originating thread.
    Message(Vec<Value>),
    /// Replace the originating message.
    Update(Vec<Value>),
    /// Replace the originating message and post a notice in its thread.
    UpdateWithNotice {
        blocks: Vec<Value>,
        notice: Vec<Value>,
    },
}

/// Context of a matched text command.
pub struct CommandContext<'a> {
    pub event: &'a ChatEvent,
    /// Every registered command, for `help`.
    pub commands: &'a Commands,
}

/// Context of an activated interactive element.
pub struct ActionContext<'a> {
    pub event: &'a InteractionEvent,
}

/// Handler of a text command whose arguments already passed validation.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &CommandContext<'_>,
        args: &Arguments,
    ) -> Result<Reply, HandlerError>;
}

/// Handler of an interactive element.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<Reply, HandlerError>;
}

/// Release workflow dependencies; absent when no targets are configured.
#[derive(Clone)]
pub struct ReleaseDeps {
    pub service: Arc<dyn ReleaseService>,
    pub targets: Arc<[ReleaseTarget]>,
}

/// Remote dependencies handed to the handlers.
#[derive(Clone)]
pub struct Services {
    pub control: Arc<dyn ControlPlane>,
    pub release: Option<ReleaseDeps>,
}

/// Builds the command registry and interaction router.
///
/// Commands are registered in the order `help` lists them.
///
/// # Errors
///
/// Returns a [`CoreError`] on a duplicate name or action id; callers treat
/// that as fatal.
pub fn routes(services: &Services) -> Result<(Commands, Actions), CoreError> {
    let mut commands = Commands::new();
    let mut actions = Actions::new();
    let control = &services.control;

    commands.register(
        CommandSpec::new("help", "Show available commands"),
        Arc::new(common::Help),
    )?;
    commands.register(
        CommandSpec::new("version", "Show the bot version"),
        Arc::new(common::Version),
    )?;
    commands.register(
        CommandSpec::new("track list", "List tracks with scene buttons"),
        Arc::new(broadcast::ListTracks::new(Arc::clone(control))),
    )?;
    commands.register(
        CommandSpec::new("track automate enable", "Enable automation of a track")
            .arg(ArgSpec::integer("trackId")),
        Arc::new(broadcast::SwitchAutomation::new(Arc::clone(control), true)),
    )?;
    commands.register(
        CommandSpec::new("track automate disable", "Disable automation of a track")
            .arg(ArgSpec::integer("trackId")),
        Arc::new(broadcast::SwitchAutomation::new(Arc::clone(control), false)),
    )?;
    commands.register(
        CommandSpec::new("track scene next", "Move a track to its next scene")
            .arg(ArgSpec::integer("trackId")),
        Arc::new(broadcast::MoveSceneToNext::new(Arc::clone(control))),
    )?;
    actions.register(
        formatter::BROADCAST_SCENE_NEXT,
        Arc::new(broadcast::SceneNextButton::new(Arc::clone(control))),
    )?;

    if let Some(release) = &services.release {
        commands.register(
            CommandSpec::new("release", "Open a release pull request"),
            Arc::new(release::StartRelease::new(Arc::clone(&release.targets))),
        )?;
        actions.register(
            formatter::RELEASE_SELECTED_REPOSITORY,
            Arc::new(release::SelectRepository::new(Arc::clone(&release.targets))),
        )?;
        for level in ReleaseLevel::ALL {
            actions.register(
                formatter::level_action(level),
                Arc::new(release::SelectLevel::new(level)),
            )?;
        }
        actions.register(
            formatter::RELEASE_OK,
            Arc::new(release::Confirm::new(
                Arc::clone(&release.service),
                Arc::clone(&release.targets),
            )),
        )?;
    }

    actions.register(formatter::COMMON_CANCEL, Arc::new(common::Cancel))?;
    Ok((commands, actions))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_client::testing::MockControlPlane;
    use crate::release_client::testing::MockReleaseService;

    fn services(with_release: bool) -> Services {
        Services {
            control: Arc::new(MockControlPlane::default()),
            release: with_release.then(|| ReleaseDeps {
                service: Arc::new(MockReleaseService::default()),
                targets: Arc::from(vec![ReleaseTarget {
                    repository: "org/app".into(),
                    base_branch: "main".into(),
                }]),
            }),
        }
    }

    #[test]
    fn test_should_register_every_command_in_help_order() {
        let (commands, _) = routes(&services(true)).expect("routes");
        let names: Vec<&str> = commands.list().map(CommandSpec::name).collect();
        assert_eq!(
            names,
            vec![
                "help",
                "version",
                "track list",
                "track automate enable",
                "track automate disable",
                "track scene next",
                "release",
            ]
        );
    }

    #[test]
    fn test_should_register_every_action_id() {
        let (_, actions) = routes(&services(true)).expect("routes");
        for id in [
            formatter::RELEASE_SELECTED_REPOSITORY,
            formatter::RELEASE_SELECTED_LEVEL_MAJOR,
            formatter::RELEASE_SELECTED_LEVEL_MINOR,
            formatter::RELEASE_SELECTED_LEVEL_PATCH,
            formatter::RELEASE_OK,
            formatter::BROADCAST_SCENE_NEXT,
            formatter::COMMON_CANCEL,
        ] {
            assert!(actions.resolve(id).is_ok(), "{id} not registered");
        }
        assert_eq!(actions.len(), 7);
    }

    #[test]
    fn test_should_skip_release_without_targets() {
        let (commands, actions) = routes(&services(false)).expect("routes");
        assert!(commands.lookup("release").is_none());
        assert!(actions.resolve(formatter::RELEASE_OK).is_err());
        assert!(actions.resolve(formatter::COMMON_CANCEL).is_ok());
    }
}
