//! Error types for the routing core.
//!
//! [`CoreError`] covers registry construction and lookup failures. The
//! per-event failures a handler can hit while validating input have their
//! own types: [`ArgumentError`] for positional command arguments,
//! [`DecodeError`] for workflow tokens arriving from the UI, and
//! [`TokenError`] for tokens that cannot be encoded.

use thiserror::Error;

use crate::command::ArgKind;

/// Error type for registry construction and routing.
///
/// `DuplicateCommand`, `DuplicateAction` and `InvalidCommandName` only occur
/// while the registries are being built and are fatal at startup.
///
/// # Examples
///
/// ```
/// use seaman_core::CoreError;
///
/// let err = CoreError::DuplicateCommand("help".into());
/// assert!(err.to_string().contains("help"));
/// ```
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    /// A command with this name was already registered.
    #[error("Command `{0}` is already registered")]
    DuplicateCommand(String),

    /// A handler for this action id was already registered.
    #[error("Action `{0}` is already registered")]
    DuplicateAction(String),

    /// The command name is empty or contains only whitespace.
    #[error("Invalid command name: {0:?}")]
    InvalidCommandName(String),

    /// No handler is registered for the action id.
    #[error("No handler registered for action `{0}`")]
    UnknownAction(String),
}

/// A positional argument failed validation.
///
/// Positions are zero-based and count only the arguments that follow the
/// command name, so `track automate enable x` reports `args[0]`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArgumentError {
    /// Fewer arguments were given than the command requires.
    #[error(
        "`{command}` requires at least {required} argument(s); missing args[{position}] ({name}: {kind})"
    )]
    Missing {
        /// Normalized command name.
        command: String,
        /// Minimum number of arguments.
        required: usize,
        /// Position of the first missing argument.
        position: usize,
        /// Name of the first missing argument.
        name: &'static str,
        /// Expected kind of the first missing argument.
        kind: ArgKind,
    },

    /// An argument declared as integer did not parse as one.
    #[error("args[{position}] ({name}) must be integer, got `{value}`")]
    NotInteger {
        /// Position of the offending argument.
        position: usize,
        /// Declared name of the argument.
        name: &'static str,
        /// The raw text that was given.
        value: String,
    },
}

/// A workflow token could not be decoded.
///
/// Every variant is recoverable: a token is user-controlled input (an old
/// button can be replayed, a value can be edited), so decoding never panics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The encoded value exceeds the maximum token length.
    #[error("token is {0} bytes, above the {max} byte limit", max = crate::token::MAX_TOKEN_LEN)]
    TooLong(usize),

    /// The value is not a well-formed token.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The kind tag is unknown, including tags of retired versions.
    #[error("unknown workflow kind tag `{0}`")]
    UnknownKind(String),

    /// The token belongs to another workflow than the one handling it.
    #[error("expected a `{expected}` token, got `{actual}`")]
    WrongKind {
        /// Kind tag the handler accepts.
        expected: &'static str,
        /// Kind tag found in the token.
        actual: &'static str,
    },

    /// The step is not a valid encoded step for the kind.
    #[error("step {step} is not valid for `{kind}`")]
    UnknownStep {
        /// Kind tag of the token.
        kind: &'static str,
        /// Raw step number.
        step: u8,
    },

    /// The token is for a different step than the one handling it.
    #[error("expected step {expected} of `{kind}`, got step {actual}")]
    UnexpectedStep {
        /// Kind tag of the token.
        kind: &'static str,
        /// Step the handler accepts.
        expected: u8,
        /// Step found in the token.
        actual: u8,
    },

    /// The number of fields differs from the step's arity.
    #[error("step {step} of `{kind}` carries {expected} field(s), got {actual}")]
    FieldCount {
        /// Kind tag of the token.
        kind: &'static str,
        /// Step number.
        step: u8,
        /// Arity of the step.
        expected: usize,
        /// Number of fields found.
        actual: usize,
    },

    /// A field name does not match the step's schema.
    #[error("field {index} must be `{expected}`, got `{actual}`")]
    FieldName {
        /// Position of the field.
        index: usize,
        /// Expected field name.
        expected: &'static str,
        /// Field name found.
        actual: String,
    },

    /// A field value is not acceptable for its field.
    #[error("invalid value for `{field}`: `{value}`")]
    FieldValue {
        /// Field name.
        field: &'static str,
        /// Raw value found.
        value: String,
    },
}

/// A workflow token could not be encoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The fields do not match the schema of the step.
    #[error("token does not match its step schema: {0}")]
    Schema(DecodeError),

    /// The encoded form would not fit in a UI element value.
    #[error("encoded token is {0} bytes, above the {max} byte limit", max = crate::token::MAX_TOKEN_LEN)]
    TooLong(usize),

    /// Serialization failed.
    #[error("token serialization failed: {0}")]
    Serialize(String),
}
