//! Typed workflows on top of [`WorkflowToken`].
//!
//! The release workflow runs
//! `Idle → AwaitingRepositorySelection → AwaitingLevelSelection →
//! AwaitingConfirmation → Executing → Completed | Failed`. Only the three
//! awaiting states are ever encoded; the terminal states render messages
//! without interactive elements, so a finished message cannot resume the
//! workflow.
//!
//! The broadcast workflow has a single step: a track's "next scene" button.

use std::fmt;

use crate::error::{DecodeError, TokenError};
use crate::token::{WorkflowKind, WorkflowToken};

/// Semantic version component bumped by a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseLevel {
    /// Breaking release.
    Major,
    /// Feature release.
    Minor,
    /// Fix release.
    Patch,
}

impl ReleaseLevel {
    /// All levels in display order.
    pub const ALL: [Self; 3] = [Self::Major, Self::Minor, Self::Patch];

    /// Lowercase name used in tokens, labels and branch names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }

    /// Parses a lowercase level name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for ReleaseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States of the release workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStep {
    /// No workflow started.
    Idle,
    /// A repository was picked from the select menu.
    AwaitingRepositorySelection,
    /// A level button was rendered for the picked repository.
    AwaitingLevelSelection,
    /// The OK/Cancel confirmation was rendered.
    AwaitingConfirmation,
    /// The pull request is being created.
    Executing,
    /// The pull request was created.
    Completed,
    /// The pull request could not be created.
    Failed,
}

impl ReleaseStep {
    /// Step number written into tokens, `None` for states never encoded.
    pub const fn encoded(self) -> Option<u8> {
        match self {
            Self::AwaitingRepositorySelection => Some(1),
            Self::AwaitingLevelSelection => Some(2),
            Self::AwaitingConfirmation => Some(3),
            Self::Idle | Self::Executing | Self::Completed | Self::Failed => None,
        }
    }

    /// Returns `true` for `Completed` and `Failed`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// State of the release workflow carried between clicks.
///
/// # Examples
///
/// ```
/// use seaman_core::workflow::{ReleaseLevel, ReleaseState, ReleaseStep};
///
/// let state = ReleaseState::select_repository("org/app")
///     .choose_level(ReleaseLevel::Minor)
///     .confirm();
/// let value = state.encode().unwrap();
///
/// let decoded = ReleaseState::decode_at(ReleaseStep::AwaitingConfirmation, &value).unwrap();
/// assert_eq!(decoded.repository(), "org/app");
/// assert_eq!(decoded.level(), Some(ReleaseLevel::Minor));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseState {
    step: ReleaseStep,
    repository: String,
    level: Option<ReleaseLevel>,
}

impl ReleaseState {
    /// State after a repository was picked.
    pub fn select_repository(repository: &str) -> Self {
        Self {
            step: ReleaseStep::AwaitingRepositorySelection,
            repository: repository.to_string(),
            level: None,
        }
    }

    /// State after a level was picked for the repository.
    pub fn choose_level(&self, level: ReleaseLevel) -> Self {
        Self {
            step: ReleaseStep::AwaitingLevelSelection,
            repository: self.repository.clone(),
            level: Some(level),
        }
    }

    /// State awaiting the final OK.
    pub fn confirm(&self) -> Self {
        Self {
            step: ReleaseStep::AwaitingConfirmation,
            repository: self.repository.clone(),
            level: self.level,
        }
    }

    /// Current step.
    pub fn step(&self) -> ReleaseStep {
        self.step
    }

    /// Repository the release is for.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Chosen level, once a level was picked.
    pub fn level(&self) -> Option<ReleaseLevel> {
        self.level
    }

    /// Converts the state into a token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Schema` for states that are never encoded or
    /// that lack a level where one is required.
    pub fn to_token(&self) -> Result<WorkflowToken, TokenError> {
        let step = self.step.encoded().ok_or(TokenError::Schema(
            DecodeError::UnknownStep {
                kind: WorkflowKind::Release.tag(),
                step: 0,
            },
        ))?;

        let mut token =
            WorkflowToken::new(WorkflowKind::Release, step).field("repository", &self.repository);
        if let Some(level) = self.level {
            token = token.field("level", level.as_str());
        }
        Ok(token)
    }

    /// Encodes the state for a UI element value.
    ///
    /// # Errors
    ///
    /// See [`to_token`](Self::to_token) and [`WorkflowToken::encode`].
    pub fn encode(&self) -> Result<String, TokenError> {
        self.to_token()?.encode()
    }

    /// Decodes a release token that must be at `step`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for malformed tokens, tokens of another
    /// workflow or step, empty repositories and unknown levels.
    pub fn decode_at(step: ReleaseStep, value: &str) -> Result<Self, DecodeError> {
        let expected = step.encoded().ok_or(DecodeError::UnknownStep {
            kind: WorkflowKind::Release.tag(),
            step: 0,
        })?;
        let token =
            WorkflowToken::decode_expecting(WorkflowKind::Release, value)?.expect_step(expected)?;

        let repository = token.get("repository").unwrap_or_default();
        if repository.is_empty() {
            return Err(DecodeError::FieldValue {
                field: "repository",
                value: String::new(),
            });
        }

        let level = match token.get("level") {
            Some(raw) => Some(ReleaseLevel::parse(raw).ok_or_else(|| DecodeError::FieldValue {
                field: "level",
                value: raw.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            step,
            repository: repository.to_string(),
            level,
        })
    }
}

/// Target of a broadcast "next scene" button.
///
/// # Examples
///
/// ```
/// use seaman_core::workflow::SceneTarget;
///
/// let target = SceneTarget { track_id: 7, track_name: "Stage A".into() };
/// let value = target.encode().unwrap();
/// assert_eq!(SceneTarget::decode(&value).unwrap(), target);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneTarget {
    /// Track whose scene is advanced.
    pub track_id: i32,
    /// Track name, for rendering only.
    pub track_name: String,
}

impl SceneTarget {
    const STEP: u8 = 1;

    /// Encodes the target for a button value.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the encoded value is too long.
    pub fn encode(&self) -> Result<String, TokenError> {
        WorkflowToken::new(WorkflowKind::Broadcast, Self::STEP)
            .field("trackId", &self.track_id.to_string())
            .field("trackName", &self.track_name)
            .encode()
    }

    /// Decodes a broadcast token.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for malformed tokens, tokens of another
    /// workflow, and non-numeric track ids.
    pub fn decode(value: &str) -> Result<Self, DecodeError> {
        let token = WorkflowToken::decode_expecting(WorkflowKind::Broadcast, value)?
            .expect_step(Self::STEP)?;

        let raw_id = token.get("trackId").unwrap_or_default();
        let track_id = raw_id.parse::<i32>().map_err(|_| DecodeError::FieldValue {
            field: "trackId",
            value: raw_id.to_string(),
        })?;

        Ok(Self {
            track_id,
            track_name: token.get("trackName").unwrap_or_default().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_walk_release_steps() {
        let picked = ReleaseState::select_repository("org/app");
        assert_eq!(picked.step(), ReleaseStep::AwaitingRepositorySelection);
        assert_eq!(picked.level(), None);

        let leveled = picked.choose_level(ReleaseLevel::Patch);
        assert_eq!(leveled.step(), ReleaseStep::AwaitingLevelSelection);

        let confirming = leveled.confirm();
        assert_eq!(confirming.step(), ReleaseStep::AwaitingConfirmation);
        assert_eq!(confirming.level(), Some(ReleaseLevel::Patch));
    }

    #[test]
    fn test_should_round_trip_each_release_step() {
        let picked = ReleaseState::select_repository("org/app");
        let leveled = picked.choose_level(ReleaseLevel::Major);
        let confirming = leveled.confirm();

        for state in [picked, leveled, confirming] {
            let value = state.encode().expect("encode");
            let decoded = ReleaseState::decode_at(state.step(), &value).expect("decode");
            assert_eq!(decoded, state);
        }
    }

    #[test]
    fn test_should_not_encode_terminal_or_idle_states() {
        for step in [
            ReleaseStep::Idle,
            ReleaseStep::Executing,
            ReleaseStep::Completed,
            ReleaseStep::Failed,
        ] {
            assert_eq!(step.encoded(), None);
        }
        assert!(ReleaseStep::Completed.is_terminal());
        assert!(ReleaseStep::Failed.is_terminal());
        assert!(!ReleaseStep::AwaitingConfirmation.is_terminal());
    }

    #[test]
    fn test_should_reject_token_from_previous_step() {
        let value = ReleaseState::select_repository("org/app")
            .encode()
            .expect("encode");
        let err = ReleaseState::decode_at(ReleaseStep::AwaitingConfirmation, &value).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedStep { .. }));
    }

    #[test]
    fn test_should_reject_unknown_level() {
        let value = r#"{"k":"release/v1","s":3,"f":[["repository","foo"],["level","huge"]]}"#;
        let err = ReleaseState::decode_at(ReleaseStep::AwaitingConfirmation, value).unwrap_err();
        assert_eq!(
            err,
            DecodeError::FieldValue {
                field: "level",
                value: "huge".into()
            }
        );
    }

    #[test]
    fn test_should_reject_empty_repository() {
        let value = r#"{"k":"release/v1","s":1,"f":[["repository",""]]}"#;
        let err =
            ReleaseState::decode_at(ReleaseStep::AwaitingRepositorySelection, value).unwrap_err();
        assert!(matches!(err, DecodeError::FieldValue { field: "repository", .. }));
    }

    #[test]
    fn test_should_reject_release_token_as_scene_target() {
        let value = ReleaseState::select_repository("foo")
            .choose_level(ReleaseLevel::Minor)
            .confirm()
            .encode()
            .expect("encode");
        assert!(matches!(
            SceneTarget::decode(&value),
            Err(DecodeError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_should_reject_non_numeric_track_id() {
        let value = r#"{"k":"broadcast/v1","s":1,"f":[["trackId","seven"],["trackName","A"]]}"#;
        assert!(matches!(
            SceneTarget::decode(value),
            Err(DecodeError::FieldValue { field: "trackId", .. })
        ));
    }

    #[test]
    fn test_should_parse_levels() {
        for level in ReleaseLevel::ALL {
            assert_eq!(ReleaseLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(ReleaseLevel::parse("MINOR"), None);
        assert_eq!(ReleaseLevel::Minor.to_string(), "minor");
    }
}
