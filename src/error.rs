//! Crate-wide error type for league operations.

use thiserror::Error;

/// Errors surfaced by league operations. Validation failures carry the field
/// they refer to so callers can point at the offending input.
#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("contestant {contestant_id} has been eliminated")]
    EliminatedContestant { contestant_id: String },

    #[error("episode {episode_id} is not open for picks")]
    EpisodeNotActive { episode_id: String },

    #[error("contestant {contestant_id} already used as Star Baker pick {cap} times")]
    StarBakerCapExceeded { contestant_id: String, cap: u32 },

    #[error("expected {expected} finalist picks, got {got}")]
    FinalistCount { expected: u32, got: u32 },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("inconsistent league state: {message}")]
    InconsistentState { message: String },

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl LeagueError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
