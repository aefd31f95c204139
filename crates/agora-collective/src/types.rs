//! Common types used across the collective engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique name of a registered worker.
pub type WorkerName = String;

/// Unique identifier for a task.
pub type TaskId = String;

/// Unique identifier for a vote.
pub type VoteId = String;

/// Unique identifier for a hub message.
pub type MessageId = String;

/// Unique identifier for a delegation record.
pub type DelegationId = String;

/// Unique identifier for a collaboration group.
pub type CollaborationId = String;

/// Kind of entity a lookup failed for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Worker,
    Task,
    Vote,
    Message,
    Delegation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Worker => "Worker",
            EntityKind::Task => "Task",
            EntityKind::Vote => "Vote",
            EntityKind::Message => "Message",
            EntityKind::Delegation => "Delegation",
        };
        f.write_str(name)
    }
}

/// Coarse error category, stable across message wording.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    StateConflict,
    Config,
}

/// Error types for collective engine operations.
#[derive(Debug, thiserror::Error)]
pub enum CollectiveError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Invalid configuration: {0:#}")]
    Config(#[from] anyhow::Error),
}

impl CollectiveError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollectiveError::NotFound { .. } => ErrorKind::NotFound,
            CollectiveError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CollectiveError::StateConflict(_) => ErrorKind::StateConflict,
            CollectiveError::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectiveError>;

/// Reject names that are empty or carry leading or trailing whitespace.
///
/// Names are matched exactly on every lookup, so they are never rewritten.
pub(crate) fn check_name(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CollectiveError::InvalidArgument(format!(
            "{} must not be empty",
            what
        )));
    }
    if value.trim() != value {
        return Err(CollectiveError::InvalidArgument(format!(
            "{} has leading or trailing whitespace: {:?}",
            what, value
        )));
    }
    Ok(())
}

/// Generate a fresh identifier.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
