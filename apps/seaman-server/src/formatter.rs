//! Block Kit message builders for Slack responses.
//!
//! Pure functions returning `serde_json::Value` block arrays suitable for
//! `chat.postMessage` or `chat.update`. Interactive elements carry the
//! action ids below; their values are workflow tokens built by the caller.

use seaman_core::command::CommandSpec;
use seaman_core::workflow::{ReleaseLevel, SceneTarget};
use serde_json::{Value, json};

use crate::control_client::Track;
use crate::release_client::PullRequest;

pub const RELEASE_SELECTED_REPOSITORY: &str = "release_selected_repository";
pub const RELEASE_SELECTED_LEVEL_MAJOR: &str = "release_selected_level_major";
pub const RELEASE_SELECTED_LEVEL_MINOR: &str = "release_selected_level_minor";
pub const RELEASE_SELECTED_LEVEL_PATCH: &str = "release_selected_level_patch";
pub const RELEASE_OK: &str = "release_ok";
pub const BROADCAST_SCENE_NEXT: &str = "broadcast_scene_next";
pub const COMMON_CANCEL: &str = "common_cancel";

/// `block_id` of the status line appended under a track list.
const SCENE_STATUS_BLOCK: &str = "scene_status";

/// Action id of the button selecting `level`.
pub const fn level_action(level: ReleaseLevel) -> &'static str {
    match level {
        ReleaseLevel::Major => RELEASE_SELECTED_LEVEL_MAJOR,
        ReleaseLevel::Minor => RELEASE_SELECTED_LEVEL_MINOR,
        ReleaseLevel::Patch => RELEASE_SELECTED_LEVEL_PATCH,
    }
}

/// Generic failure shown for every internal error.
pub fn something_is_wrong() -> Vec<Value> {
    error("Something went wrong. Please try again.")
}

/// Argument problem with the command's usage line.
pub fn invalid_arguments(problem: &str) -> Vec<Value> {
    error(&format!("Invalid arguments: {problem}"))
}

/// Builds a Block Kit error message with a warning icon.
pub fn error(message: &str) -> Vec<Value> {
    vec![section(&format!(":warning: {message}"))]
}

/// Help text listing `commands` in the given order.
///
/// # Examples
///
/// ```
/// use seaman_core::command::{ArgSpec, CommandSpec};
/// use seaman_server::formatter;
///
/// let specs = [CommandSpec::new("track scene next", "Advance").arg(ArgSpec::integer("trackId"))];
/// let blocks = formatter::command_list(specs.iter());
/// assert!(blocks[1]["text"]["text"].as_str().unwrap().contains("track scene next <trackId>"));
/// ```
pub fn command_list<'a>(commands: impl Iterator<Item = &'a CommandSpec>) -> Vec<Value> {
    let lines: Vec<String> = commands
        .map(|spec| format!("`{}` \u{2192} {}", spec.usage(), spec.description()))
        .collect();
    vec![header("Available commands"), section(&lines.join("\n"))]
}

pub fn version(version: &str) -> Vec<Value> {
    vec![section(&format!("seaman `v{version}`"))]
}

/// Track list with one "Next scene" button per track.
///
/// `values` holds the encoded [`SceneTarget`] for each track, in order.
pub fn track_list(tracks: &[Track], values: &[String]) -> Vec<Value> {
    if tracks.is_empty() {
        return vec![section("No tracks are configured.")];
    }

    let mut blocks = vec![header("Tracks")];
    for (track, value) in tracks.iter().zip(values) {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*{}* (`{}`)", track.name, track.id) },
            "accessory": button("Next scene", BROADCAST_SCENE_NEXT, value, None),
        }));
    }
    blocks
}

pub fn automation_switched(track_name: &str, enabled: bool) -> Vec<Value> {
    let (icon, state) = if enabled {
        (":large_green_circle:", "enabled")
    } else {
        (":black_circle:", "disabled")
    };
    vec![section(&format!(
        "{icon} Automation {state} for *{track_name}*"
    ))]
}

pub fn scene_moved(track_id: i32) -> Vec<Value> {
    vec![section(&format!(
        ":fast_forward: Moved track `{track_id}` to the next scene"
    ))]
}

/// Re-renders `original` with a status line for the switched track.
///
/// The buttons are kept so the operator can keep switching; any earlier
/// status line is replaced.
pub fn scene_switched(original: &Value, target: &SceneTarget) -> Vec<Value> {
    let mut blocks: Vec<Value> = original
        .get("blocks")
        .and_then(Value::as_array)
        .map(|b| {
            b.iter()
                .filter(|block| block.get("block_id") != Some(&json!(SCENE_STATUS_BLOCK)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    blocks.push(json!({
        "type": "context",
        "block_id": SCENE_STATUS_BLOCK,
        "elements": [{
            "type": "mrkdwn",
            "text": format!(":fast_forward: *{}* moved to the next scene", target.track_name),
        }]
    }));
    blocks
}

pub fn switched_by(user_id: &str) -> Vec<Value> {
    vec![section(&format!("Switching was pushed by <@{user_id}>"))]
}

/// Repository picker opening the release workflow.
///
/// `options` pairs each repository with its encoded token.
pub fn release_repository_select(options: &[(String, String)]) -> Vec<Value> {
    let options: Vec<Value> = options
        .iter()
        .map(|(repository, value)| {
            json!({
                "text": { "type": "plain_text", "text": repository },
                "value": value,
            })
        })
        .collect();

    vec![
        header("Release"),
        json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": "Which repository should be released?" },
            "accessory": {
                "type": "static_select",
                "action_id": RELEASE_SELECTED_REPOSITORY,
                "placeholder": { "type": "plain_text", "text": "Select a repository" },
                "options": options,
            }
        }),
        actions(vec![cancel_button()]),
    ]
}

/// Level buttons for `repository`; `options` pairs levels with tokens.
pub fn release_level_select(repository: &str, options: &[(ReleaseLevel, String)]) -> Vec<Value> {
    let mut elements: Vec<Value> = options
        .iter()
        .map(|(level, value)| button(level.as_str(), level_action(*level), value, None))
        .collect();
    elements.push(cancel_button());

    vec![
        header("Release"),
        section(&format!("Which level should `{repository}` be released at?")),
        actions(elements),
    ]
}

pub fn release_confirmation(repository: &str, level: ReleaseLevel, value: &str) -> Vec<Value> {
    vec![
        header("Release"),
        section(&format!(
            "Open a *{level}* release pull request for `{repository}`?"
        )),
        actions(vec![
            button("OK", RELEASE_OK, value, Some("primary")),
            cancel_button(),
        ]),
    ]
}

/// Terminal view after the pull request was opened.
pub fn release_completed(repository: &str, level: ReleaseLevel, pull: &PullRequest) -> Vec<Value> {
    vec![
        header("Release"),
        section(&format!(
            ":white_check_mark: Opened <{}|#{}> for a *{level}* release of `{repository}`",
            pull.url, pull.number
        )),
    ]
}

/// Terminal view for a workflow whose remote step failed.
pub fn workflow_failed() -> Vec<Value> {
    vec![section(
        ":x: The request failed. Run the command again to start over.",
    )]
}

pub fn cancelled(user_id: &str) -> Vec<Value> {
    vec![context(&format!("Cancelled by <@{user_id}>"))]
}

// ---------------------------------------------------------------------------
// Block Kit primitives
// ---------------------------------------------------------------------------

fn header(text: &str) -> Value {
    json!({
        "type": "header",
        "text": { "type": "plain_text", "text": text }
    })
}

fn section(text: &str) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text }
    })
}

fn context(text: &str) -> Value {
    json!({
        "type": "context",
        "elements": [{ "type": "mrkdwn", "text": text }]
    })
}

fn actions(elements: Vec<Value>) -> Value {
    json!({ "type": "actions", "elements": elements })
}

fn button(text: &str, action_id: &str, value: &str, style: Option<&str>) -> Value {
    let mut button = json!({
        "type": "button",
        "text": { "type": "plain_text", "text": text },
        "action_id": action_id,
        "value": value,
    });
    if let Some(style) = style {
        button["style"] = json!(style);
    }
    button
}

fn cancel_button() -> Value {
    button("Cancel", COMMON_CANCEL, "cancel", None)
}

/// Returns `true` if any block carries an interactive element.
#[cfg(test)]
pub(crate) fn has_interactive_element(blocks: &[Value]) -> bool {
    blocks
        .iter()
        .any(|b| b["type"] == "actions" || b.get("accessory").is_some())
}

#[cfg(test)]
mod tests {
    use seaman_core::command::ArgSpec;

    use super::*;

    fn texts(blocks: &[Value]) -> String {
        serde_json::to_string(blocks).expect("serialize")
    }

    #[test]
    fn test_should_map_levels_to_action_ids() {
        assert_eq!(level_action(ReleaseLevel::Major), "release_selected_level_major");
        assert_eq!(level_action(ReleaseLevel::Minor), "release_selected_level_minor");
        assert_eq!(level_action(ReleaseLevel::Patch), "release_selected_level_patch");
    }

    #[test]
    fn test_should_render_commands_in_given_order() {
        let specs = [
            CommandSpec::new("help", "Show commands"),
            CommandSpec::new("track automate enable", "Enable automation")
                .arg(ArgSpec::integer("trackId")),
        ];
        let blocks = command_list(specs.iter());
        let body = blocks[1]["text"]["text"].as_str().expect("text");
        let help = body.find("`help`").expect("help listed");
        let enable = body
            .find("`track automate enable <trackId>`")
            .expect("enable listed");
        assert!(help < enable);
    }

    #[test]
    fn test_should_render_track_buttons_with_values() {
        let tracks = vec![Track {
            id: 3,
            name: "Main stage".into(),
        }];
        let blocks = track_list(&tracks, &["token-3".to_string()]);
        assert_eq!(blocks[1]["accessory"]["action_id"], BROADCAST_SCENE_NEXT);
        assert_eq!(blocks[1]["accessory"]["value"], "token-3");
    }

    #[test]
    fn test_should_render_empty_track_list() {
        let blocks = track_list(&[], &[]);
        assert!(texts(&blocks).contains("No tracks"));
        assert!(!has_interactive_element(&blocks));
    }

    #[test]
    fn test_should_replace_previous_scene_status() {
        let target = SceneTarget {
            track_id: 1,
            track_name: "A".into(),
        };
        let original = json!({ "blocks": track_list(
            &[Track { id: 1, name: "A".into() }],
            &["v".to_string()],
        )});

        let once = scene_switched(&original, &target);
        let twice = scene_switched(&json!({ "blocks": once.clone() }), &target);

        assert_eq!(once.len(), twice.len());
        assert!(has_interactive_element(&twice));
        assert_eq!(twice.last().expect("status")["block_id"], SCENE_STATUS_BLOCK);
    }

    #[test]
    fn test_should_render_repository_options() {
        let blocks = release_repository_select(&[("org/app".into(), "tok".into())]);
        let select = &blocks[1]["accessory"];
        assert_eq!(select["action_id"], RELEASE_SELECTED_REPOSITORY);
        assert_eq!(select["options"][0]["value"], "tok");
    }

    #[test]
    fn test_should_render_confirmation_buttons() {
        let blocks = release_confirmation("org/app", ReleaseLevel::Minor, "tok");
        let elements = blocks[2]["elements"].as_array().expect("elements");
        assert_eq!(elements[0]["action_id"], RELEASE_OK);
        assert_eq!(elements[0]["value"], "tok");
        assert_eq!(elements[1]["action_id"], COMMON_CANCEL);
    }

    #[test]
    fn test_should_render_terminal_views_without_elements() {
        let pull = PullRequest {
            number: 9,
            url: "https://github.com/org/app/pull/9".into(),
        };
        assert!(!has_interactive_element(&release_completed(
            "org/app",
            ReleaseLevel::Patch,
            &pull
        )));
        assert!(!has_interactive_element(&workflow_failed()));
        assert!(!has_interactive_element(&cancelled("U1")));
    }

    #[test]
    fn test_should_prefix_errors_with_warning() {
        let blocks = invalid_arguments("args[0] (trackId) must be integer, got `x`");
        let text = blocks[0]["text"]["text"].as_str().expect("text");
        assert!(text.starts_with(":warning: Invalid arguments"));
        assert!(text.contains("trackId"));
    }
}
