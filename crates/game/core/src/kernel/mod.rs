//! Kernel facade.
//!
//! [`Kernel`] composes the turn-flow machine, the pipeline executor and the
//! effect interpreter behind a small API over immutable states. Every call
//! works on a clone of the state it is given; a failed call leaves the input
//! untouched, and a successful one returns a new state settled at the next
//! decision point.
pub(crate) mod enumerate;
mod setup;

use std::collections::VecDeque;

use crate::config::KernelConfig;
use crate::decision::{ChoiceResolver, ChoiceValue, DecisionId, PendingChoiceRequest};
use crate::def::ValidatedDef;
use crate::effect::TraceEntry;
use crate::env::Env;
use crate::error::{EffectExecutionError, ExecFailure, IllegalMove, RuntimeError, SetupError};
use crate::eval::EvalError;
use crate::metrics;
use crate::moves::Move;
use crate::pipeline::PipelineRun;
use crate::stacking;
use crate::state::{GameResult, GameState};
use crate::turn_flow::{self, Peek, Slot, TURN_FLOW_PATH};

/// A move that ran to completion.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Applied {
    /// Settled at the next decision point or terminal.
    pub state: GameState,
    /// Everything the move and the automatic transitions after it did, in
    /// execution order.
    pub trace: Vec<TraceEntry>,
}

/// Remaining work of a suspended move.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct MoveJob {
    slot: Slot,
    /// Pipelines still to run; the front one is the suspended one.
    runs: VecDeque<PipelineRun>,
    trace: Vec<TraceEntry>,
}

/// A move waiting on a choice. Plain data: it can be stored and resumed
/// later through [`Kernel::resolve_choice`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Suspended {
    /// Working copy with the move partially applied. Never publish it.
    state: GameState,
    job: MoveJob,
    request: PendingChoiceRequest,
}

impl Suspended {
    pub fn request(&self) -> &PendingChoiceRequest {
        &self.request
    }

    pub fn slot(&self) -> &Slot {
        &self.job.slot
    }

    /// Trace of the completed pipelines so far.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.job.trace
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MoveOutcome {
    Applied(Applied),
    Suspended(Box<Suspended>),
}

impl MoveOutcome {
    pub fn applied(self) -> Option<Applied> {
        match self {
            MoveOutcome::Applied(applied) => Some(applied),
            MoveOutcome::Suspended(_) => None,
        }
    }

    pub fn suspended(self) -> Option<Box<Suspended>> {
        match self {
            MoveOutcome::Suspended(suspended) => Some(suspended),
            MoveOutcome::Applied(_) => None,
        }
    }
}

/// Entry point over a validated definition.
///
/// Only a [`ValidatedDef`] is accepted; there is no way to run an unchecked
/// definition.
#[derive(Clone, Debug)]
pub struct Kernel<'d> {
    def: &'d ValidatedDef,
    config: KernelConfig,
}

impl<'d> Kernel<'d> {
    pub fn new(def: &'d ValidatedDef, config: KernelConfig) -> Self {
        Self { def, config }
    }

    pub fn def(&self) -> &'d ValidatedDef {
        self.def
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn env(&self) -> Env<'_> {
        Env::new(self.def, &self.config)
    }

    /// Builds the scenario and settles it at the first decision point.
    #[tracing::instrument(level = "debug", skip(self), fields(game = %self.def.def().id))]
    pub fn initial_state(&self, seed: u64, player_count: u8) -> Result<GameState, SetupError> {
        let state = setup::build(self.def, seed, player_count)?;
        self.settle(state, &mut Vec::new()).map_err(|e| match e {
            RuntimeError::EffectExecution(EffectExecutionError {
                failure: ExecFailure::Stacking { constraint, zone },
                ..
            }) => SetupError::Stacking { constraint, zone },
            other => SetupError::Advance(other),
        })
    }

    /// Applies automatic transitions until a decision or a terminal state.
    /// Returns an equal state when already there.
    pub fn advance_to_decision_point(&self, state: &GameState) -> Result<GameState, RuntimeError> {
        self.settle(state.clone(), &mut Vec::new())
    }

    fn settle(&self, mut state: GameState, trace: &mut Vec<TraceEntry>) -> Result<GameState, RuntimeError> {
        let env = self.env();
        for _ in 0..self.config.max_auto_steps {
            let peek = turn_flow::step(env, &mut state, trace)?;
            self.check_stacking(&state)?;
            if peek != Peek::Auto {
                return Ok(state);
            }
        }
        Err(RuntimeError::exec(
            TURN_FLOW_PATH,
            ExecFailure::AutoStepLimit {
                limit: self.config.max_auto_steps,
            },
        ))
    }

    /// Stacking holds after every move and every automatic transition.
    fn check_stacking(&self, state: &GameState) -> Result<(), RuntimeError> {
        match stacking::check(self.def, state) {
            Some(violation) => Err(RuntimeError::exec(
                "stacking",
                ExecFailure::Stacking {
                    constraint: violation.constraint,
                    zone: violation.zone,
                },
            )),
            None => Ok(()),
        }
    }

    /// Pending decision of a settled state, `None` when the game is over.
    pub fn current_decision(&self, state: &GameState) -> Result<Option<Slot>, RuntimeError> {
        Ok(match turn_flow::peek(self.env(), state)? {
            Peek::Decision(slot) => Some(slot),
            Peek::Auto | Peek::Terminal => None,
        })
    }

    /// Legal moves of the pending decision in stable order. Empty when the
    /// state is terminal or not settled.
    pub fn enumerate_legal_moves(&self, state: &GameState) -> Result<Vec<Move>, RuntimeError> {
        Ok(match self.current_decision(state)? {
            Some(slot) => enumerate::moves(self.env(), state, &slot),
            None => Vec::new(),
        })
    }

    /// Applies a move. Choices the resolver defers suspend the move; answer
    /// them with [`Kernel::resolve_choice`].
    #[tracing::instrument(level = "debug", skip(self, state, resolver), fields(mv = %mv))]
    pub fn apply_move(
        &self,
        state: &GameState,
        mv: &Move,
        resolver: &mut dyn ChoiceResolver,
    ) -> Result<MoveOutcome, RuntimeError> {
        let env = self.env();
        let mut trace = Vec::new();
        let mut working = self.settle(state.clone(), &mut trace)?;

        let slot = match turn_flow::peek(env, &working)? {
            Peek::Decision(slot) => slot,
            Peek::Terminal => return Err(IllegalMove::GameOver.into()),
            Peek::Auto => return Err(IllegalMove::NoDecisionPending.into()),
        };
        let mv = enumerate::check_move(env, &working, &slot, mv)?;
        let released = turn_flow::accept(env, &mut working, &slot, &mv, &mut trace)?;
        let runs = released
            .into_iter()
            .map(|m| PipelineRun::new(env, m))
            .collect::<Result<VecDeque<_>, _>>()?;

        self.drive(working, MoveJob { slot, runs, trace }, resolver)
    }

    /// Answers the pending choice of a suspended move and continues it. The
    /// continuation is left intact, so a refused value can be corrected.
    #[tracing::instrument(level = "debug", skip(self, suspended, value, resolver))]
    pub fn resolve_choice(
        &self,
        suspended: &Suspended,
        decision: &DecisionId,
        value: ChoiceValue,
        resolver: &mut dyn ChoiceResolver,
    ) -> Result<MoveOutcome, RuntimeError> {
        let state = suspended.state.clone();
        let mut job = suspended.job.clone();
        let run = job.runs.front_mut().ok_or_else(|| RuntimeError::UnknownDecision {
            decision: decision.0.clone(),
            pending: None,
        })?;
        run.resume(&state, decision, &value)?;
        self.drive(state, job, resolver)
    }

    fn drive(
        &self,
        mut state: GameState,
        mut job: MoveJob,
        resolver: &mut dyn ChoiceResolver,
    ) -> Result<MoveOutcome, RuntimeError> {
        let env = self.env();
        while let Some(run) = job.runs.front_mut() {
            if let Some(request) = run.run(env, &mut state, resolver)? {
                tracing::debug!(decision = %request.decision, "move suspended");
                return Ok(MoveOutcome::Suspended(Box::new(Suspended {
                    state,
                    job,
                    request,
                })));
            }
            let Some(mut done) = job.runs.pop_front() else {
                break;
            };
            job.trace.extend(done.take_trace());
            turn_flow::on_resolved(env, &mut state, &job.slot, done.mv(), &mut job.trace)?;
        }

        turn_flow::finish(env, &mut state, &job.slot, &mut job.trace)?;
        self.check_stacking(&state)?;
        state.progress.moves += 1;

        let mut trace = job.trace;
        let state = self.settle(state, &mut trace)?;
        Ok(MoveOutcome::Applied(Applied { state, trace }))
    }

    /// Value of a declared derived metric. Pure.
    pub fn compute_derived_metric(&self, state: &GameState, metric: &str) -> Result<i64, EvalError> {
        metrics::derived_metric(self.def, state, metric)
    }

    /// Raw victory marker of a seat. Pure.
    pub fn compute_victory_marker(&self, state: &GameState, seat: &str) -> Result<i64, EvalError> {
        metrics::victory_marker(self.def, state, seat)
    }

    pub fn is_terminal(&self, state: &GameState) -> bool {
        state.is_terminal()
    }

    pub fn result<'s>(&self, state: &'s GameState) -> Option<&'s GameResult> {
        state.result.as_ref()
    }
}
