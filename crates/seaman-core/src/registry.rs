//! Command registry and command matching.
//!
//! [`CommandRegistry`] is built once at startup, then shared read-only
//! (typically behind an `Arc`) by every event task. It is generic over the
//! handler type so routing can be tested without a transport.

use std::collections::HashMap;

use tracing::debug;

use crate::command::{CommandSpec, normalize_name};
use crate::error::CoreError;
use crate::matcher::tokenize;

/// A registered command: its descriptor and handler.
#[derive(Debug)]
pub struct Command<H> {
    spec: CommandSpec,
    handler: H,
}

impl<H> Command<H> {
    /// Descriptor of the command.
    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Handler bound to the command.
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// Result of matching chat text to a command.
#[derive(Debug)]
pub struct Matched<'a, H> {
    /// The matched command.
    pub command: &'a Command<H>,
    /// Tokens following the command name, in order.
    pub args: Vec<String>,
}

/// Table of text commands, kept in registration order.
///
/// # Examples
///
/// ```
/// use seaman_core::command::CommandSpec;
/// use seaman_core::registry::CommandRegistry;
///
/// let mut registry = CommandRegistry::new();
/// registry.register(CommandSpec::new("help", "List commands"), "help-handler").unwrap();
///
/// let matched = registry.resolve("<@U0BOT> HELP me").unwrap();
/// assert_eq!(*matched.command.handler(), "help-handler");
/// assert_eq!(matched.args, vec!["me"]);
/// assert!(registry.resolve("<@U0BOT> dance").is_none());
/// ```
#[derive(Debug)]
pub struct CommandRegistry<H> {
    commands: Vec<Command<H>>,
    index: HashMap<String, usize>,
    max_words: usize,
}

impl<H> CommandRegistry<H> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            index: HashMap::new(),
            max_words: 0,
        }
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DuplicateCommand` if the name is taken and
    /// `CoreError::InvalidCommandName` if it is empty.
    pub fn register(&mut self, spec: CommandSpec, handler: H) -> Result<(), CoreError> {
        if spec.name().is_empty() {
            return Err(CoreError::InvalidCommandName(spec.name().to_string()));
        }
        if self.index.contains_key(spec.name()) {
            return Err(CoreError::DuplicateCommand(spec.name().to_string()));
        }

        debug!(command = spec.name(), "Registered command");
        self.max_words = self.max_words.max(spec.word_count());
        self.index.insert(spec.name().to_string(), self.commands.len());
        self.commands.push(Command { spec, handler });
        Ok(())
    }

    /// Looks up a command by name (case and spacing insensitive).
    pub fn lookup(&self, name: &str) -> Option<&Command<H>> {
        self.index
            .get(&normalize_name(name))
            .map(|&i| &self.commands[i])
    }

    /// Descriptors of all commands in registration order.
    pub fn list(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter().map(|c| &c.spec)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Matches chat text to a command.
    ///
    /// Leading mentions are stripped, then the longest registered name that
    /// equals the leading words (case-insensitively) wins. Returns `None`
    /// when the text does not start with a registered command; that is a
    /// filter outcome, not an error.
    pub fn resolve(&self, text: &str) -> Option<Matched<'_, H>> {
        let tokens = tokenize(text);
        let longest = self.max_words.min(tokens.len());

        for words in (1..=longest).rev() {
            let candidate = tokens[..words]
                .iter()
                .map(|t| t.to_lowercase())
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(&i) = self.index.get(&candidate) {
                return Some(Matched {
                    command: &self.commands[i],
                    args: tokens[words..].to_vec(),
                });
            }
        }
        None
    }
}

impl<H> Default for CommandRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ArgSpec;

    fn registry() -> CommandRegistry<&'static str> {
        let mut r = CommandRegistry::new();
        r.register(CommandSpec::new("help", "List commands"), "help")
            .expect("help");
        r.register(CommandSpec::new("track list", "List tracks"), "list")
            .expect("list");
        r.register(
            CommandSpec::new("track automate enable", "Enable automation")
                .arg(ArgSpec::integer("trackId")),
            "enable",
        )
        .expect("enable");
        r.register(CommandSpec::new("track", "Track overview"), "track")
            .expect("track");
        r
    }

    #[test]
    fn test_should_lookup_registered_handler() {
        let r = registry();
        let cmd = r.lookup("track list").expect("found");
        assert_eq!(*cmd.handler(), "list");
        assert_eq!(cmd.spec().description(), "List tracks");
    }

    #[test]
    fn test_should_lookup_ignoring_case_and_spacing() {
        let r = registry();
        assert!(r.lookup("Track   LIST").is_some());
    }

    #[test]
    fn test_should_reject_duplicate_name() {
        let mut r = registry();
        let err = r
            .register(CommandSpec::new("HELP", "again"), "other")
            .unwrap_err();
        assert_eq!(err, CoreError::DuplicateCommand("help".into()));
        assert_eq!(*r.lookup("help").expect("kept").handler(), "help");
    }

    #[test]
    fn test_should_reject_empty_name() {
        let mut r: CommandRegistry<()> = CommandRegistry::new();
        let err = r.register(CommandSpec::new("  ", ""), ()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCommandName(_)));
    }

    #[test]
    fn test_should_list_in_registration_order() {
        let r = registry();
        let names: Vec<&str> = r.list().map(CommandSpec::name).collect();
        assert_eq!(
            names,
            vec!["help", "track list", "track automate enable", "track"]
        );
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn test_should_resolve_multi_word_command_with_args() {
        let r = registry();
        let m = r
            .resolve("<@U0BOT> track automate enable 7")
            .expect("match");
        assert_eq!(*m.command.handler(), "enable");
        assert_eq!(m.args, vec!["7"]);
    }

    #[test]
    fn test_should_prefer_longest_command() {
        let r = registry();
        let m = r.resolve("@bot track list now").expect("match");
        assert_eq!(*m.command.handler(), "list");
        assert_eq!(m.args, vec!["now"]);
    }

    #[test]
    fn test_should_fall_back_to_shorter_command() {
        let r = registry();
        let m = r.resolve("@bot track automate").expect("match");
        assert_eq!(*m.command.handler(), "track");
        assert_eq!(m.args, vec!["automate"]);
    }

    #[test]
    fn test_should_match_case_insensitively() {
        let r = registry();
        let m = r.resolve("<@U0BOT> HeLp").expect("match");
        assert_eq!(*m.command.handler(), "help");
    }

    #[test]
    fn test_should_not_match_unregistered_text() {
        let r = registry();
        assert!(r.resolve("<@U0BOT> deploy prod").is_none());
        assert!(r.resolve("<@U0BOT>").is_none());
        assert!(r.resolve("").is_none());
        assert!(r.resolve("hello there help").is_none());
    }

    #[test]
    fn test_should_resolve_on_empty_registry() {
        let r: CommandRegistry<()> = CommandRegistry::default();
        assert!(r.is_empty());
        assert!(r.resolve("help").is_none());
    }
}
