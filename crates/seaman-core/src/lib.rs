//! Seaman routing core.
//!
//! Transport-agnostic building blocks of the seaman chat bot:
//!
//! - [`registry`] and [`matcher`]: text command registration and matching
//! - [`command`]: command descriptors and argument validation
//! - [`router`]: interactive element routing by action id
//! - [`token`] and [`workflow`]: workflow state carried through the UI
//! - [`event`]: inbound chat and interaction events
//!
//! # Usage
//!
//! ```
//! use seaman_core::command::{ArgSpec, CommandSpec};
//! use seaman_core::registry::CommandRegistry;
//!
//! let mut registry = CommandRegistry::new();
//! registry
//!     .register(
//!         CommandSpec::new("track automate enable", "Enable automation")
//!             .arg(ArgSpec::integer("trackId")),
//!         (),
//!     )
//!     .unwrap();
//!
//! let matched = registry.resolve("<@U0BOT> track automate enable 7").unwrap();
//! let args = matched.command.spec().parse_args(&matched.args).unwrap();
//! assert_eq!(args.integer("trackId"), Some(7));
//! ```

pub mod command;
mod error;
pub mod event;
pub mod matcher;
pub mod registry;
pub mod router;
pub mod token;
pub mod workflow;

pub use error::{ArgumentError, CoreError, DecodeError, TokenError};
pub use event::{ChatEvent, InteractionEvent};
pub use registry::CommandRegistry;
pub use router::InteractionRouter;
pub use token::{WorkflowKind, WorkflowToken};
