//! Command descriptors and the shared argument validation rule.
//!
//! A [`CommandSpec`] declares a command's name, its help text and the kinds
//! of its positional arguments. Handlers never split text themselves: the
//! pipeline calls [`CommandSpec::parse_args`] and passes the typed
//! [`Arguments`] on, so a missing or non-numeric argument is rejected the
//! same way for every command.

use std::fmt;

use crate::error::ArgumentError;

/// Kind of a positional command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// A base-10 `i32`, such as a track id.
    Integer,
    /// Any single whitespace-free token.
    Text,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::Text => f.write_str("text"),
        }
    }
}

/// Declaration of one positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    /// Name shown in usage and error messages.
    pub name: &'static str,
    /// Expected kind.
    pub kind: ArgKind,
    /// Whether the argument must be present.
    pub required: bool,
}

impl ArgSpec {
    /// A required integer argument.
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Integer,
            required: true,
        }
    }

    /// A required text argument.
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Text,
            required: true,
        }
    }

    /// Marks the argument as optional.
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Descriptor of a text command.
///
/// # Examples
///
/// ```
/// use seaman_core::command::{ArgSpec, CommandSpec};
///
/// let spec = CommandSpec::new("Track Automate  enable", "Enable automation")
///     .arg(ArgSpec::integer("trackId"));
/// assert_eq!(spec.name(), "track automate enable");
/// assert_eq!(spec.min_arity(), 1);
/// assert_eq!(spec.usage(), "track automate enable <trackId>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    name: String,
    description: String,
    args: Vec<ArgSpec>,
}

impl CommandSpec {
    /// Creates a descriptor. The name is lowercased and its words are
    /// joined by single spaces.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: normalize_name(name),
            description: description.to_string(),
            args: Vec::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    /// Normalized command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line description for `help`.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared positional arguments.
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Number of words in the name.
    pub fn word_count(&self) -> usize {
        self.name.split(' ').count()
    }

    /// Minimum number of positional arguments.
    pub fn min_arity(&self) -> usize {
        self.args.iter().filter(|a| a.required).count()
    }

    /// Usage line, e.g. `track automate enable <trackId>`.
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for arg in &self.args {
            if arg.required {
                usage.push_str(&format!(" <{}>", arg.name));
            } else {
                usage.push_str(&format!(" [{}]", arg.name));
            }
        }
        usage
    }

    /// Validates raw positional arguments against the declaration.
    ///
    /// Arguments beyond the declared ones are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Missing`] naming the first missing required
    /// argument, or [`ArgumentError::NotInteger`] naming the first integer
    /// argument that does not parse as a base-10 `i32`.
    ///
    /// # Examples
    ///
    /// ```
    /// use seaman_core::command::{ArgSpec, CommandSpec};
    ///
    /// let spec = CommandSpec::new("track scene next", "").arg(ArgSpec::integer("trackId"));
    /// let args = spec.parse_args(&["7".to_string()]).unwrap();
    /// assert_eq!(args.integer("trackId"), Some(7));
    /// assert!(spec.parse_args(&[]).is_err());
    /// ```
    pub fn parse_args(&self, raw: &[String]) -> Result<Arguments, ArgumentError> {
        let mut values = Vec::with_capacity(self.args.len());

        for (position, arg) in self.args.iter().enumerate() {
            let Some(text) = raw.get(position) else {
                if arg.required {
                    return Err(ArgumentError::Missing {
                        command: self.name.clone(),
                        required: self.min_arity(),
                        position,
                        name: arg.name,
                        kind: arg.kind,
                    });
                }
                continue;
            };

            let value = match arg.kind {
                ArgKind::Integer => {
                    let n = text
                        .parse::<i32>()
                        .map_err(|_| ArgumentError::NotInteger {
                            position,
                            name: arg.name,
                            value: text.clone(),
                        })?;
                    ArgValue::Integer(n)
                }
                ArgKind::Text => ArgValue::Text(text.clone()),
            };
            values.push((arg.name, value));
        }

        Ok(Arguments { values })
    }
}

/// A validated argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Parsed integer.
    Integer(i32),
    /// Raw text.
    Text(String),
}

/// Arguments that passed [`CommandSpec::parse_args`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    values: Vec<(&'static str, ArgValue)>,
}

impl Arguments {
    /// Returns the integer argument with the given name.
    pub fn integer(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(|v| match v {
            ArgValue::Integer(n) => Some(*n),
            ArgValue::Text(_) => None,
        })
    }

    /// Returns the text argument with the given name.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| match v {
            ArgValue::Text(s) => Some(s.as_str()),
            ArgValue::Integer(_) => None,
        })
    }

    /// Number of arguments present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no argument is present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

/// Lowercases and collapses whitespace in a command name.
pub(crate) fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
