//! Error types for the game core

use thiserror::Error;

/// Errors surfaced by configuration, persistence and the state machine
#[derive(Error, Debug)]
pub enum BreakoutError {
    #[error("Malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    #[error("Nickname not eligible for ranking: {0:?}")]
    IneligibleNickname(String),

    #[error("Action {action} not allowed in phase {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    #[error("Score already submitted for this run")]
    AlreadySubmitted,
}

pub type Result<T> = std::result::Result<T, BreakoutError>;
