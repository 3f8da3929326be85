//! Workflow token codec.
//!
//! Chat platforms deliver every button click as an independent event, so a
//! multi-step workflow carries its accumulated state through the UI: each
//! step renders elements whose value is the encoded [`WorkflowToken`] for
//! the next step, and the next handler decodes it.
//!
//! Wire form is compact JSON, for example
//! `{"k":"release/v1","s":3,"f":[["repository","foo"],["level","minor"]]}`.
//! The kind tag carries a version, so tokens rendered by a retired revision
//! of a workflow fail with [`DecodeError::UnknownKind`] instead of being
//! misread. Every decode re-validates the step schema; nothing in the
//! payload is trusted.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, TokenError};

/// Maximum encoded token length in bytes (UI element value ceiling).
pub const MAX_TOKEN_LEN: usize = 2000;

/// Workflows whose state travels in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    /// Release pull-request creation.
    Release,
    /// Scene switching on a broadcast track.
    Broadcast,
}

const RELEASE_REPOSITORY: &[&str] = &["repository"];
const RELEASE_REPOSITORY_LEVEL: &[&str] = &["repository", "level"];
const BROADCAST_TRACK: &[&str] = &["trackId", "trackName"];

impl WorkflowKind {
    /// Versioned tag written into tokens.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Release => "release/v1",
            Self::Broadcast => "broadcast/v1",
        }
    }

    /// Parses a versioned tag. Tags of other versions are not accepted.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "release/v1" => Some(Self::Release),
            "broadcast/v1" => Some(Self::Broadcast),
            _ => None,
        }
    }

    /// Ordered field names carried at `step`, or `None` if tokens are never
    /// encoded for that step.
    pub fn schema(self, step: u8) -> Option<&'static [&'static str]> {
        match (self, step) {
            (Self::Release, 1) => Some(RELEASE_REPOSITORY),
            (Self::Release, 2 | 3) => Some(RELEASE_REPOSITORY_LEVEL),
            (Self::Broadcast, 1) => Some(BROADCAST_TRACK),
            _ => None,
        }
    }
}

/// Snapshot of an in-progress workflow.
///
/// # Examples
///
/// ```
/// use seaman_core::token::{WorkflowKind, WorkflowToken};
///
/// let token = WorkflowToken::new(WorkflowKind::Release, 3)
///     .field("repository", "foo")
///     .field("level", "minor");
/// let encoded = token.encode().unwrap();
/// assert_eq!(WorkflowToken::decode(&encoded).unwrap(), token);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowToken {
    kind: WorkflowKind,
    step: u8,
    fields: Vec<(String, String)>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireToken {
    k: String,
    s: u8,
    f: Vec<(String, String)>,
}

impl WorkflowToken {
    /// Starts a token for `kind` at `step` with no fields.
    pub fn new(kind: WorkflowKind, step: u8) -> Self {
        Self {
            kind,
            step,
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    /// Workflow the token belongs to.
    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    /// Encoded step number.
    pub fn step(&self) -> u8 {
        self.step
    }

    /// Fields in order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Value of the first field with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Encodes the token for a UI element value.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Schema` if the fields do not match the step's
    /// schema and `TokenError::TooLong` if the result exceeds
    /// [`MAX_TOKEN_LEN`].
    pub fn encode(&self) -> Result<String, TokenError> {
        validate(self.kind, self.step, &self.fields).map_err(TokenError::Schema)?;

        let wire = WireToken {
            k: self.kind.tag().to_string(),
            s: self.step,
            f: self.fields.clone(),
        };
        let encoded =
            serde_json::to_string(&wire).map_err(|e| TokenError::Serialize(e.to_string()))?;
        if encoded.len() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong(encoded.len()));
        }
        Ok(encoded)
    }

    /// Decodes a token of any known kind.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for oversize or malformed input, unknown
    /// kind tags, steps that are never encoded, and fields that do not
    /// match the step's schema.
    pub fn decode(value: &str) -> Result<Self, DecodeError> {
        if value.len() > MAX_TOKEN_LEN {
            return Err(DecodeError::TooLong(value.len()));
        }

        let wire: WireToken =
            serde_json::from_str(value).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let kind = WorkflowKind::from_tag(&wire.k).ok_or(DecodeError::UnknownKind(wire.k))?;
        validate(kind, wire.s, &wire.f)?;

        Ok(Self {
            kind,
            step: wire.s,
            fields: wire.f,
        })
    }

    /// Decodes a token and checks that it belongs to `kind`.
    ///
    /// # Errors
    ///
    /// Everything [`decode`](Self::decode) rejects, plus
    /// `DecodeError::WrongKind` for a token of another workflow.
    pub fn decode_expecting(kind: WorkflowKind, value: &str) -> Result<Self, DecodeError> {
        let token = Self::decode(value)?;
        if token.kind != kind {
            return Err(DecodeError::WrongKind {
                expected: kind.tag(),
                actual: token.kind.tag(),
            });
        }
        Ok(token)
    }

    /// Checks that the token is at `step`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedStep` otherwise.
    pub fn expect_step(self, step: u8) -> Result<Self, DecodeError> {
        if self.step != step {
            return Err(DecodeError::UnexpectedStep {
                kind: self.kind.tag(),
                expected: step,
                actual: self.step,
            });
        }
        Ok(self)
    }
}

fn validate(kind: WorkflowKind, step: u8, fields: &[(String, String)]) -> Result<(), DecodeError> {
    let schema = kind.schema(step).ok_or(DecodeError::UnknownStep {
        kind: kind.tag(),
        step,
    })?;

    if fields.len() != schema.len() {
        return Err(DecodeError::FieldCount {
            kind: kind.tag(),
            step,
            expected: schema.len(),
            actual: fields.len(),
        });
    }

    for (index, ((name, _), &expected)) in fields.iter().zip(schema).enumerate() {
        if name != expected {
            return Err(DecodeError::FieldName {
                index,
                expected,
                actual: name.clone(),
            });
        }
    }
    Ok(())
}
