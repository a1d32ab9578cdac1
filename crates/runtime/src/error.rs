//! Error types surfaced by the session API.

use thiserror::Error;

use turnflow_core::{DecisionId, ErrorSeverity, KernelError, RuntimeError, SetupError};

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to set up the game")]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Kernel(#[from] RuntimeError),

    #[error("choice `{decision}` must be answered first")]
    ChoicePending { decision: DecisionId },

    #[error("no choice is pending")]
    NoPendingChoice,

    #[error("log was recorded for game `{found}`, not `{expected}`")]
    GameMismatch { expected: String, found: String },

    #[error("replay diverged at entry {index}: {reason}")]
    Diverged { index: usize, reason: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invalid session config: {0}")]
    Config(String),
}

impl KernelError for SessionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Setup(e) => e.severity(),
            Self::Kernel(e) => e.severity(),
            Self::ChoicePending { .. } | Self::NoPendingChoice => ErrorSeverity::Recoverable,
            Self::GameMismatch { .. } | Self::Config(_) => ErrorSeverity::Validation,
            Self::Diverged { .. } | Self::Repository(_) => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Setup(e) => e.error_code(),
            Self::Kernel(e) => e.error_code(),
            Self::ChoicePending { .. } => "SESSION_CHOICE_PENDING",
            Self::NoPendingChoice => "SESSION_NO_PENDING_CHOICE",
            Self::GameMismatch { .. } => "SESSION_GAME_MISMATCH",
            Self::Diverged { .. } => "SESSION_DIVERGED",
            Self::Repository(_) => "SESSION_REPOSITORY",
            Self::Config(_) => "SESSION_CONFIG",
        }
    }
}

/// Errors raised by log storage.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("log already exists: {0}")]
    LogAlreadyExists(String),

    #[error("log not found: {0}")]
    NotFound(String),
}
