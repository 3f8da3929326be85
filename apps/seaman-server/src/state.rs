//! Shared application state for the seaman server.
//!
//! [`AppState`] is built once in `main`, wrapped in an `Arc`, and shared by
//! every envelope task. Everything in it is read-only except the
//! [`InflightActions`] guard.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::handlers::{Actions, Commands};
use crate::transport::Transport;

/// Central application state shared across all handlers.
pub struct AppState {
    transport: Arc<dyn Transport>,
    commands: Commands,
    actions: Actions,
    inflight: InflightActions,
    handler_timeout: Duration,
}

impl AppState {
    /// Creates the state from fully built routing tables.
    pub fn new(
        transport: Arc<dyn Transport>,
        commands: Commands,
        actions: Actions,
        handler_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            commands,
            actions,
            inflight: InflightActions::new(),
            handler_timeout,
        }
    }

    /// Returns the outbound chat transport.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Returns the text command registry.
    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    /// Returns the interaction router.
    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Returns the in-flight click guard.
    pub fn inflight(&self) -> &InflightActions {
        &self.inflight
    }

    /// Upper bound on a single handler invocation.
    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("commands", &self.commands.len())
            .field("actions", &self.actions.len())
            .field("inflight", &self.inflight)
            .field("handler_timeout", &self.handler_timeout)
            .finish_non_exhaustive()
    }
}

/// Rejects a second click on the same element while the first is handled.
///
/// Keys are `channel:message_ts:action_id`; the value is the user whose
/// click holds the slot. Only guards this process.
///
/// # Examples
///
/// ```
/// use seaman_server::state::InflightActions;
///
/// let inflight = InflightActions::new();
/// let key = InflightActions::key("C1", "1700.1", "release_ok");
/// assert!(inflight.try_lock(&key, "U1").is_ok());
/// assert_eq!(inflight.try_lock(&key, "U2"), Err("U1".to_string()));
/// inflight.unlock(&key);
/// assert!(inflight.try_lock(&key, "U2").is_ok());
/// ```
#[derive(Debug, Default)]
pub struct InflightActions {
    slots: DashMap<String, String>,
}

impl InflightActions {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Builds the guard key for a click.
    pub fn key(channel_id: &str, message_ts: &str, action_id: &str) -> String {
        format!("{channel_id}:{message_ts}:{action_id}")
    }

    /// Claims `key` for `sender_id`.
    ///
    /// Returns `Err(holder)` with the user currently holding the slot.
    pub fn try_lock(&self, key: &str, sender_id: &str) -> Result<(), String> {
        use dashmap::mapref::entry::Entry;
        match self.slots.entry(key.to_string()) {
            Entry::Occupied(e) => Err(e.get().clone()),
            Entry::Vacant(e) => {
                e.insert(sender_id.to_string());
                Ok(())
            }
        }
    }

    /// Releases `key`.
    pub fn unlock(&self, key: &str) {
        self.slots.remove(key);
    }

    /// Number of clicks currently being handled.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no click is being handled.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_reject_second_lock_on_same_key() {
        let inflight = InflightActions::new();
        let key = InflightActions::key("C1", "1.0", "release_ok");
        inflight.try_lock(&key, "U1").expect("first lock");
        assert_eq!(inflight.try_lock(&key, "U2"), Err("U1".to_string()));
        assert_eq!(inflight.len(), 1);
    }

    #[test]
    fn test_should_allow_relock_after_unlock() {
        let inflight = InflightActions::new();
        let key = InflightActions::key("C1", "1.0", "release_ok");
        inflight.try_lock(&key, "U1").expect("first lock");
        inflight.unlock(&key);
        assert!(inflight.is_empty());
        assert!(inflight.try_lock(&key, "U1").is_ok());
    }

    #[test]
    fn test_should_keep_distinct_actions_independent() {
        let inflight = InflightActions::new();
        let ok = InflightActions::key("C1", "1.0", "release_ok");
        let cancel = InflightActions::key("C1", "1.0", "common_cancel");
        assert!(inflight.try_lock(&ok, "U1").is_ok());
        assert!(inflight.try_lock(&cancel, "U1").is_ok());
        assert_eq!(inflight.len(), 2);
    }

    #[test]
    fn test_should_build_key_from_parts() {
        assert_eq!(
            InflightActions::key("C9", "1700.000200", "broadcast_scene_next"),
            "C9:1700.000200:broadcast_scene_next"
        );
    }
}
