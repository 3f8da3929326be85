//! Routing of interactive element activations by action id.
//!
//! Interactive elements are always rendered by the bot, so unlike text
//! commands an unknown action id is an error: it points at a bug or at a
//! message rendered by an older deployment.

use std::collections::HashMap;

use tracing::debug;

use crate::error::CoreError;

/// Table of action id → handler.
///
/// # Examples
///
/// ```
/// use seaman_core::router::InteractionRouter;
///
/// let mut router = InteractionRouter::new();
/// router.register("release_ok", 1).unwrap();
/// assert_eq!(router.resolve("release_ok"), Ok(&1));
/// assert!(router.resolve("stale_action").is_err());
/// ```
#[derive(Debug)]
pub struct InteractionRouter<H> {
    routes: HashMap<String, H>,
}

impl<H> InteractionRouter<H> {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Binds a handler to an action id.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DuplicateAction` if the id is already bound.
    pub fn register(&mut self, action_id: &str, handler: H) -> Result<(), CoreError> {
        if self.routes.contains_key(action_id) {
            return Err(CoreError::DuplicateAction(action_id.to_string()));
        }
        debug!(action_id, "Registered action");
        self.routes.insert(action_id.to_string(), handler);
        Ok(())
    }

    /// Returns the handler bound to an action id.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownAction` if nothing is bound to the id.
    pub fn resolve(&self, action_id: &str) -> Result<&H, CoreError> {
        self.routes
            .get(action_id)
            .ok_or_else(|| CoreError::UnknownAction(action_id.to_string()))
    }

    /// Number of bound action ids.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no action id is bound.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H> Default for InteractionRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}
