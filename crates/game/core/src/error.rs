//! Runtime error taxonomy.
//!
//! Validate-time problems are reported as [`crate::validate::Diagnostic`]s and
//! never reach the kernel. Everything here is a runtime failure: the in-flight
//! move is aborted and the caller keeps the prior state untouched.
//!
//! [`RuntimeError`] is a closed set of four kinds. Setup failures are kept
//! apart in [`SetupError`] because they happen before any state exists.

use crate::def::MoveClass;
use crate::eval::EvalError;
use crate::state::{PlayerId, TokenId, Value, ValueKind};

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// The host may submit a different move or value.
    Recoverable,
    /// Malformed input; retrying unchanged fails again.
    Validation,
    /// The definition or state is inconsistent in a way validation missed.
    Internal,
    /// The session cannot continue.
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for kernel errors.
///
/// - Derive `thiserror::Error` for the Display/Error impl.
/// - Classify severity by recoverability, not impact.
pub trait KernelError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Stable identifier of the variant, for logs and tests.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Why a submitted move or choice value was refused.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IllegalMove {
    #[error("the game is over")]
    GameOver,

    #[error("no decision is pending")]
    NoDecisionPending,

    #[error("seat {got} submitted but {expected} is to act")]
    WrongSeat { expected: PlayerId, got: PlayerId },

    #[error("unknown action `{0}`")]
    UnknownAction(String),

    #[error("action `{action}` is not offered here")]
    NotOffered { action: String },

    #[error("declining is not allowed here")]
    DeclineNotAllowed,

    #[error("parameter `{param}` of `{action}` is missing")]
    MissingParam { action: String, param: String },

    #[error("`{action}` has no parameter `{param}`")]
    UnexpectedParam { action: String, param: String },

    #[error("{value} is not in the domain of `{param}`")]
    ParamOutOfDomain { param: String, value: Value },

    #[error("`{param}` takes {min}..={max} values, got {got}")]
    ParamCardinality {
        param: String,
        min: u32,
        max: u32,
        got: usize,
    },

    #[error("precondition of `{action}` does not hold")]
    PreconditionFailed { action: String },

    #[error("special activity `{special}` cannot accompany `{action}`")]
    SpecialNotAllowed { action: String, special: String },

    #[error("compound constraint between `{operation}` and `{special}` violated")]
    ConstraintViolated { operation: String, special: String },

    #[error("{class} is not allowed after a first {first}")]
    OptionMatrix { first: MoveClass, class: MoveClass },

    #[error("{value} is not an option of `{decision}`")]
    NotAnOption { decision: String, value: Value },

    #[error("option {value} of `{decision}` is illegal: {reason}")]
    IllegalOption {
        decision: String,
        value: Value,
        reason: String,
    },

    #[error("{value} selected twice in `{decision}`")]
    DuplicateSelection { decision: String, value: Value },
}

impl KernelError for IllegalMove {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::GameOver => ErrorSeverity::Fatal,
            Self::UnknownAction(_) | Self::UnexpectedParam { .. } | Self::MissingParam { .. } => {
                ErrorSeverity::Validation
            }
            _ => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::GameOver => "ILLEGAL_GAME_OVER",
            Self::NoDecisionPending => "ILLEGAL_NO_DECISION",
            Self::WrongSeat { .. } => "ILLEGAL_WRONG_SEAT",
            Self::UnknownAction(_) => "ILLEGAL_UNKNOWN_ACTION",
            Self::NotOffered { .. } => "ILLEGAL_NOT_OFFERED",
            Self::DeclineNotAllowed => "ILLEGAL_DECLINE",
            Self::MissingParam { .. } => "ILLEGAL_MISSING_PARAM",
            Self::UnexpectedParam { .. } => "ILLEGAL_UNEXPECTED_PARAM",
            Self::ParamOutOfDomain { .. } => "ILLEGAL_PARAM_DOMAIN",
            Self::ParamCardinality { .. } => "ILLEGAL_PARAM_CARDINALITY",
            Self::PreconditionFailed { .. } => "ILLEGAL_PRECONDITION",
            Self::SpecialNotAllowed { .. } => "ILLEGAL_SPECIAL",
            Self::ConstraintViolated { .. } => "ILLEGAL_COMPOUND_CONSTRAINT",
            Self::OptionMatrix { .. } => "ILLEGAL_OPTION_MATRIX",
            Self::NotAnOption { .. } => "ILLEGAL_NOT_AN_OPTION",
            Self::IllegalOption { .. } => "ILLEGAL_OPTION",
            Self::DuplicateSelection { .. } => "ILLEGAL_DUPLICATE_SELECTION",
        }
    }
}

/// Failure discovered only while executing effects.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecFailure {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("marker `{lattice}` cannot move from `{from}` to `{to}`")]
    LatticeTransition {
        lattice: String,
        from: String,
        to: String,
    },

    #[error("`{state}` is not a state of marker `{lattice}`")]
    UnknownMarkerState { lattice: String, state: String },

    #[error("marker `{lattice}` does not apply to zone `{zone}`")]
    MarkerNotApplicable { lattice: String, zone: String },

    #[error("zone `{zone}` holds {available} tokens, {wanted} needed")]
    InsufficientTokens {
        zone: String,
        wanted: i64,
        available: usize,
    },

    #[error("token {0} does not exist")]
    TokenMissing(TokenId),

    #[error("token ids exhausted")]
    TokenIdsExhausted,

    #[error("variable `{var}` is boolean and cannot take arithmetic")]
    BooleanArithmetic { var: String },

    #[error("variable `{var}` expects a {expected} value")]
    VarKind { var: String, expected: ValueKind },

    #[error("choice `{binder}` has an empty domain")]
    EmptyDomain { binder: String },

    #[error("choice `{binder}` has no legal option")]
    NoLegalOption { binder: String },

    #[error("trigger nesting exceeded {limit}")]
    TriggerDepth { limit: u32 },

    #[error("effect nesting exceeded {limit}")]
    FrameDepth { limit: usize },

    #[error("stacking constraint `{constraint}` violated in `{zone}`")]
    Stacking { constraint: String, zone: String },

    #[error("automatic transition requested decision `{decision}`")]
    SuspendedOutsideMove { decision: String },

    #[error("turn flow did not settle within {limit} automatic steps")]
    AutoStepLimit { limit: u32 },

    #[error("`{effect}` requires a card-driven turn order")]
    NotCardDriven { effect: String },

    #[error("unknown phase `{0}`")]
    UnknownPhase(String),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("effect failed at `{path}`: {failure}")]
pub struct EffectExecutionError {
    /// Effect path the failure was raised at.
    pub path: String,
    pub failure: ExecFailure,
}

impl EffectExecutionError {
    pub fn new(path: impl Into<String>, failure: impl Into<ExecFailure>) -> Self {
        Self {
            path: path.into(),
            failure: failure.into(),
        }
    }
}

/// Closed set of runtime failures. Every one aborts the in-flight move.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuntimeError {
    #[error("illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),

    #[error(transparent)]
    EffectExecution(#[from] EffectExecutionError),

    #[error("decision `{decision}` takes {min}..={max} selections, got {got}")]
    ChoiceCardinality {
        decision: String,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("no pending decision `{decision}`")]
    UnknownDecision {
        decision: String,
        pending: Option<String>,
    },
}

impl RuntimeError {
    pub(crate) fn exec(path: impl Into<String>, failure: impl Into<ExecFailure>) -> Self {
        Self::EffectExecution(EffectExecutionError::new(path, failure))
    }
}

impl KernelError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::IllegalMove(e) => e.severity(),
            Self::EffectExecution(e) => match e.failure {
                ExecFailure::AutoStepLimit { .. }
                | ExecFailure::SuspendedOutsideMove { .. }
                | ExecFailure::TokenIdsExhausted => ErrorSeverity::Internal,
                _ => ErrorSeverity::Recoverable,
            },
            Self::ChoiceCardinality { .. } => ErrorSeverity::Recoverable,
            Self::UnknownDecision { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::IllegalMove(_) => "ILLEGAL_MOVE",
            Self::EffectExecution(_) => "EFFECT_EXECUTION",
            Self::ChoiceCardinality { .. } => "CHOICE_CARDINALITY",
            Self::UnknownDecision { .. } => "UNKNOWN_DECISION",
        }
    }
}

/// Failure building the initial state.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("{count} players requested, definition allows {min}..={max}")]
    PlayerCount { count: u8, min: u8, max: u8 },

    #[error("placement owner `{0}` is not seated with this player count")]
    UnseatedOwner(String),

    #[error("stacking constraint `{constraint}` violated in `{zone}` at setup")]
    Stacking { constraint: String, zone: String },

    #[error("placements exhaust the token id space")]
    TokenIdsExhausted,

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("settling the opening turn failed: {0}")]
    Advance(#[from] RuntimeError),
}

impl KernelError for SetupError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PlayerCount { .. } | Self::UnseatedOwner(_) => ErrorSeverity::Validation,
            Self::Stacking { .. }
            | Self::TokenIdsExhausted
            | Self::Eval(_)
            | Self::Advance(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::PlayerCount { .. } => "SETUP_PLAYER_COUNT",
            Self::UnseatedOwner(_) => "SETUP_UNSEATED_OWNER",
            Self::Stacking { .. } => "SETUP_STACKING",
            Self::TokenIdsExhausted => "SETUP_TOKEN_IDS",
            Self::Eval(_) => "SETUP_EVAL",
            Self::Advance(_) => "SETUP_ADVANCE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_errors_carry_stable_codes() {
        let illegal = RuntimeError::from(IllegalMove::DeclineNotAllowed);
        assert_eq!(illegal.error_code(), "ILLEGAL_MOVE");
        assert!(illegal.severity().is_recoverable());

        let exec = RuntimeError::exec("op/0:add_var", EvalError::DivisionByZero);
        assert_eq!(exec.error_code(), "EFFECT_EXECUTION");
        assert_eq!(
            exec.to_string(),
            "effect failed at `op/0:add_var`: division by zero"
        );

        let stuck = RuntimeError::exec("turn", ExecFailure::AutoStepLimit { limit: 4 });
        assert!(stuck.severity().is_internal());
    }

    #[test]
    fn exhausted_token_ids_are_internal() {
        let exec = RuntimeError::exec("op/0:create_token", ExecFailure::TokenIdsExhausted);
        assert!(exec.severity().is_internal());
        assert_eq!(SetupError::TokenIdsExhausted.error_code(), "SETUP_TOKEN_IDS");
        assert!(SetupError::TokenIdsExhausted.severity().is_internal());
    }
}
