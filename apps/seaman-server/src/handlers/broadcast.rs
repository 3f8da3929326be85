//! Broadcast track control: automation switches and scene changes.

use std::sync::Arc;

use async_trait::async_trait;
use seaman_core::command::Arguments;
use seaman_core::workflow::SceneTarget;
use tracing::info;

use super::{ActionContext, ActionHandler, CommandContext, CommandHandler, Reply};
use crate::control_client::ControlPlane;
use crate::error::HandlerError;
use crate::formatter;

fn track_id(args: &Arguments) -> Result<i32, HandlerError> {
    args.integer("trackId")
        .ok_or_else(|| HandlerError::InvalidArguments("trackId is required".into()))
}

/// `track list`
pub struct ListTracks {
    control: Arc<dyn ControlPlane>,
}

impl ListTracks {
    pub fn new(control: Arc<dyn ControlPlane>) -> Self {
        Self { control }
    }
}

#[async_trait]
impl CommandHandler for ListTracks {
    async fn handle(
        &self,
        _ctx: &CommandContext<'_>,
        _args: &Arguments,
    ) -> Result<Reply, HandlerError> {
        let tracks = self.control.list_tracks().await?;
        let values = tracks
            .iter()
            .map(|t| {
                SceneTarget {
                    track_id: t.id,
                    track_name: t.name.clone(),
                }
                .encode()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Reply::Message(formatter::track_list(&tracks, &values)))
    }
}

/// `track automate enable|disable <trackId>`
pub struct SwitchAutomation {
    control: Arc<dyn ControlPlane>,
    enabled: bool,
}

impl SwitchAutomation {
    pub fn new(control: Arc<dyn ControlPlane>, enabled: bool) -> Self {
        Self { control, enabled }
    }
}

#[async_trait]
impl CommandHandler for SwitchAutomation {
    async fn handle(
        &self,
        ctx: &CommandContext<'_>,
        args: &Arguments,
    ) -> Result<Reply, HandlerError> {
        let id = track_id(args)?;
        let name = if self.enabled {
            self.control.enable_automation(id).await?
        } else {
            self.control.disable_automation(id).await?
        };
        info!(
            track_id = id,
            enabled = self.enabled,
            user = %ctx.event.sender_id,
            "Switched track automation"
        );
        Ok(Reply::Message(formatter::automation_switched(
            &name,
            self.enabled,
        )))
    }
}

/// `track scene next <trackId>`
pub struct MoveSceneToNext {
    control: Arc<dyn ControlPlane>,
}

impl MoveSceneToNext {
    pub fn new(control: Arc<dyn ControlPlane>) -> Self {
        Self { control }
    }
}

#[async_trait]
impl CommandHandler for MoveSceneToNext {
    async fn handle(
        &self,
        ctx: &CommandContext<'_>,
        args: &Arguments,
    ) -> Result<Reply, HandlerError> {
        let id = track_id(args)?;
        self.control.move_scene_to_next(id).await?;
        info!(track_id = id, user = %ctx.event.sender_id, "Moved scene to next");
        Ok(Reply::Message(formatter::scene_moved(id)))
    }
}

/// "Next scene" button under `track list`.
///
/// The track list stays interactive after a switch; the thread records who
/// pushed it.
pub struct SceneNextButton {
    control: Arc<dyn ControlPlane>,
}

impl SceneNextButton {
    pub fn new(control: Arc<dyn ControlPlane>) -> Self {
        Self { control }
    }
}

#[async_trait]
impl ActionHandler for SceneNextButton {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<Reply, HandlerError> {
        let target = SceneTarget::decode(&ctx.event.value)?;
        self.control.move_scene_to_next(target.track_id).await?;
        info!(
            track_id = target.track_id,
            user = %ctx.event.sender_id,
            "Moved scene to next"
        );
        Ok(Reply::UpdateWithNotice {
            blocks: formatter::scene_switched(&ctx.event.message, &target),
            notice: formatter::switched_by(&ctx.event.sender_id),
        })
    }
}
