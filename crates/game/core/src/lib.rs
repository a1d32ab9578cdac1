//! Deterministic kernel for card-driven, multi-faction turn-based games.
//!
//! `turnflow-core` interprets a declarative [`GameDef`] once it has passed
//! [`validate`]. It owns the effect interpreter, the decision manager, the
//! action pipeline and the turn-flow machine, and exposes them through the
//! [`Kernel`] facade. Every transition is a pure function of the previous
//! state, the move and the answered choices, so sessions replay bit for bit.
pub mod config;
pub mod decision;
pub mod def;
pub mod effect;
pub mod env;
pub mod error;
pub mod eval;
pub mod kernel;
pub mod metrics;
pub mod moves;
pub(crate) mod pipeline;
pub mod rng;
pub mod stacking;
pub mod state;
pub(crate) mod turn_flow;
pub mod validate;

pub use config::KernelConfig;
pub use decision::{
    ChoiceKind, ChoiceOption, ChoiceResolver, ChoiceValue, DecisionId, DeferAll, FirstLegal,
    PendingChoiceRequest, ScriptedResolver,
};
pub use def::{GameDef, ValidatedDef};
pub use effect::{EffectPath, EventContext, LifecycleEvent, Provenance, TraceEntry, TraceKind};
pub use error::{
    EffectExecutionError, ErrorSeverity, ExecFailure, IllegalMove, KernelError, RuntimeError,
    SetupError,
};
pub use eval::EvalError;
pub use kernel::{Applied, Kernel, MoveOutcome, Suspended};
pub use moves::{ActionMove, Move, SpecialMove};
pub use state::{GameResult, GameState, PlayerId, TokenId, Value, ValueKind, ZoneId};
#[cfg(feature = "serde")]
pub use state::compute_state_root;
pub use turn_flow::{Peek, Slot};
pub use validate::{Diagnostic, DiagnosticCode, Severity, validate};
