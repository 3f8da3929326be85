//! The release workflow.
//!
//! `release` posts a repository picker; each click replaces the message with
//! the next step until OK opens the pull request. All state travels in the
//! element values, so every click decodes and revalidates its token and
//! checks the repository against the configured targets again.

use std::sync::Arc;

use async_trait::async_trait;
use seaman_core::DecodeError;
use seaman_core::command::Arguments;
use seaman_core::workflow::{ReleaseLevel, ReleaseState, ReleaseStep};
use tracing::info;

use super::{ActionContext, ActionHandler, CommandContext, CommandHandler, Reply};
use crate::config::ReleaseTarget;
use crate::error::HandlerError;
use crate::formatter;
use crate::release_client::ReleaseService;

fn find_target<'a>(
    targets: &'a [ReleaseTarget],
    repository: &str,
) -> Result<&'a ReleaseTarget, DecodeError> {
    targets
        .iter()
        .find(|t| t.repository == repository)
        .ok_or_else(|| DecodeError::FieldValue {
            field: "repository",
            value: repository.to_string(),
        })
}

/// `release`
pub struct StartRelease {
    targets: Arc<[ReleaseTarget]>,
}

impl StartRelease {
    pub fn new(targets: Arc<[ReleaseTarget]>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl CommandHandler for StartRelease {
    async fn handle(
        &self,
        _ctx: &CommandContext<'_>,
        _args: &Arguments,
    ) -> Result<Reply, HandlerError> {
        let options = self
            .targets
            .iter()
            .map(|t| {
                ReleaseState::select_repository(&t.repository)
                    .encode()
                    .map(|value| (t.repository.clone(), value))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Reply::Message(formatter::release_repository_select(
            &options,
        )))
    }
}

/// `release_selected_repository`
pub struct SelectRepository {
    targets: Arc<[ReleaseTarget]>,
}

impl SelectRepository {
    pub fn new(targets: Arc<[ReleaseTarget]>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl ActionHandler for SelectRepository {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<Reply, HandlerError> {
        let state =
            ReleaseState::decode_at(ReleaseStep::AwaitingRepositorySelection, &ctx.event.value)?;
        find_target(&self.targets, state.repository())?;

        let options = ReleaseLevel::ALL
            .iter()
            .map(|&level| state.choose_level(level).encode().map(|v| (level, v)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Reply::Update(formatter::release_level_select(
            state.repository(),
            &options,
        )))
    }
}

/// `release_selected_level_{major,minor,patch}`
pub struct SelectLevel {
    level: ReleaseLevel,
}

impl SelectLevel {
    pub fn new(level: ReleaseLevel) -> Self {
        Self { level }
    }
}

#[async_trait]
impl ActionHandler for SelectLevel {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<Reply, HandlerError> {
        let state =
            ReleaseState::decode_at(ReleaseStep::AwaitingLevelSelection, &ctx.event.value)?;
        let level = state.level().ok_or(DecodeError::FieldValue {
            field: "level",
            value: String::new(),
        })?;
        // The button's action id and its token must agree.
        if level != self.level {
            return Err(DecodeError::FieldValue {
                field: "level",
                value: level.to_string(),
            }
            .into());
        }

        let confirming = state.confirm();
        Ok(Reply::Update(formatter::release_confirmation(
            confirming.repository(),
            level,
            &confirming.encode()?,
        )))
    }
}

/// `release_ok`: opens the pull request.
pub struct Confirm {
    service: Arc<dyn ReleaseService>,
    targets: Arc<[ReleaseTarget]>,
}

impl Confirm {
    pub fn new(service: Arc<dyn ReleaseService>, targets: Arc<[ReleaseTarget]>) -> Self {
        Self { service, targets }
    }
}

#[async_trait]
impl ActionHandler for Confirm {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<Reply, HandlerError> {
        let state =
            ReleaseState::decode_at(ReleaseStep::AwaitingConfirmation, &ctx.event.value)?;
        let target = find_target(&self.targets, state.repository())?;
        let level = state.level().ok_or(DecodeError::FieldValue {
            field: "level",
            value: String::new(),
        })?;

        info!(
            repository = %target.repository,
            %level,
            user = %ctx.event.sender_id,
            "Creating release pull request"
        );
        let pull = self.service.create_release_pr(target, level).await?;
        Ok(Reply::Update(formatter::release_completed(
            &target.repository,
            level,
            &pull,
        )))
    }
}

#[cfg(test)]
mod tests {
    use seaman_core::command::CommandSpec;

    use super::*;
    use crate::handlers::Commands;
    use crate::handlers::testing::{chat, click};
    use crate::release_client::testing::MockReleaseService;

    fn targets() -> Arc<[ReleaseTarget]> {
        Arc::from(vec![
            ReleaseTarget {
                repository: "org/app".into(),
                base_branch: "main".into(),
            },
            ReleaseTarget {
                repository: "org/site".into(),
                base_branch: "develop".into(),
            },
        ])
    }

    async fn act(
        handler: &dyn ActionHandler,
        action_id: &str,
        value: &str,
    ) -> Result<Reply, HandlerError> {
        let event = click(action_id, value);
        handler.handle(&ActionContext { event: &event }).await
    }

    fn blocks(reply: Reply) -> Vec<serde_json::Value> {
        match reply {
            Reply::Message(blocks) | Reply::Update(blocks) => blocks,
            other => panic!("Unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_offer_each_configured_repository() {
        let commands = Commands::new();
        let event = chat("<@B1> release");
        let ctx = CommandContext {
            event: &event,
            commands: &commands,
        };
        let args = CommandSpec::new("release", "").parse_args(&[]).expect("args");

        let reply = StartRelease::new(targets())
            .handle(&ctx, &args)
            .await
            .expect("reply");
        let blocks = blocks(reply);

        let options = blocks[1]["accessory"]["options"].as_array().expect("options");
        assert_eq!(options.len(), 2);
        let value = options[1]["value"].as_str().expect("value");
        let state = ReleaseState::decode_at(ReleaseStep::AwaitingRepositorySelection, value)
            .expect("decode");
        assert_eq!(state.repository(), "org/site");
    }

    #[tokio::test]
    async fn test_should_offer_levels_after_repository() {
        let value = ReleaseState::select_repository("org/app").encode().expect("encode");

        let reply = act(
            &SelectRepository::new(targets()),
            formatter::RELEASE_SELECTED_REPOSITORY,
            &value,
        )
        .await
        .expect("reply");

        let Reply::Update(blocks) = reply else {
            panic!("Expected Update");
        };
        let buttons = blocks[2]["elements"].as_array().expect("elements");
        assert_eq!(buttons[1]["action_id"], formatter::RELEASE_SELECTED_LEVEL_MINOR);
        let minor = buttons[1]["value"].as_str().expect("value");
        let state =
            ReleaseState::decode_at(ReleaseStep::AwaitingLevelSelection, minor).expect("decode");
        assert_eq!(state.level(), Some(ReleaseLevel::Minor));
    }

    #[tokio::test]
    async fn test_should_reject_unconfigured_repository() {
        let value = ReleaseState::select_repository("evil/repo").encode().expect("encode");

        let err = act(
            &SelectRepository::new(targets()),
            formatter::RELEASE_SELECTED_REPOSITORY,
            &value,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            HandlerError::Decode(DecodeError::FieldValue { field: "repository", .. })
        ));
    }

    #[tokio::test]
    async fn test_should_reject_level_not_matching_button() {
        let value = ReleaseState::select_repository("org/app")
            .choose_level(ReleaseLevel::Major)
            .encode()
            .expect("encode");

        let err = act(
            &SelectLevel::new(ReleaseLevel::Patch),
            formatter::RELEASE_SELECTED_LEVEL_PATCH,
            &value,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, HandlerError::Decode(_)));
    }

    #[tokio::test]
    async fn test_should_open_pull_request_on_ok() {
        let service = Arc::new(MockReleaseService::default());
        let value = ReleaseState::select_repository("org/site")
            .choose_level(ReleaseLevel::Patch)
            .confirm()
            .encode()
            .expect("encode");

        let reply = act(
            &Confirm::new(service.clone(), targets()),
            formatter::RELEASE_OK,
            &value,
        )
        .await
        .expect("reply");

        let blocks = blocks(reply);
        assert!(!formatter::has_interactive_element(&blocks));
        assert_eq!(
            service.requests(),
            vec![("org/site".to_string(), ReleaseLevel::Patch)]
        );
    }

    #[tokio::test]
    async fn test_should_not_call_service_for_stale_step() {
        let service = Arc::new(MockReleaseService::default());
        let value = ReleaseState::select_repository("org/app")
            .choose_level(ReleaseLevel::Patch)
            .encode()
            .expect("encode");

        let err = act(
            &Confirm::new(service.clone(), targets()),
            formatter::RELEASE_OK,
            &value,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            HandlerError::Decode(DecodeError::UnexpectedStep { .. })
        ));
        assert!(service.requests().is_empty());
    }
}
