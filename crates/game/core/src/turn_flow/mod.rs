//! Turn-flow state machine.
//!
//! The machine answers one question about a state: who decides next, or
//! which automatic transition comes first. [`peek`] classifies without
//! touching the state; [`step`] applies one automatic transition. The facade
//! drives `step` until a decision point or a terminal state.
//!
//! Submitted moves pass through [`accept`] (which may queue, stack or
//! release moves), are executed by the pipeline, then reported back through
//! [`on_resolved`] and [`finish`].
mod card_driven;
mod generic;

use crate::decision::DeferAll;
use crate::def::{MoveClass, TriggerEvent, TurnOrderDef, VarScope};
use crate::effect::{EffectPath, EventContext, LifecycleEvent, Machine, Step, TraceEntry, TraceKind};
use crate::env::Env;
use crate::error::{ExecFailure, RuntimeError};
use crate::eval::{EvalError, Scope};
use crate::metrics;
use crate::moves::{ActionMove, Move};
use crate::state::{GameResult, GameState, PlayerId, TurnOrderState, Value};

/// Kind of decision pending, and for whom.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Slot {
    /// Card-driven main phase: the next eligible seat on the card.
    Main { seat: PlayerId },
    /// Free operation owed by an effect.
    Grant { seat: PlayerId, actions: Vec<String> },
    /// Pivotal interrupt offer at the start of a card.
    Pivotal { seat: PlayerId },
    /// One seat's step in a coup phase.
    Coup { seat: PlayerId, phase: String },
    /// Round-robin or fixed-order turn.
    Generic { seat: PlayerId, phase: String },
    /// One seat's hidden submission.
    Simultaneous { seat: PlayerId, phase: String },
}

impl Slot {
    pub const fn seat(&self) -> PlayerId {
        match self {
            Slot::Main { seat }
            | Slot::Grant { seat, .. }
            | Slot::Pivotal { seat }
            | Slot::Coup { seat, .. }
            | Slot::Generic { seat, .. }
            | Slot::Simultaneous { seat, .. } => *seat,
        }
    }

    /// Optional decisions may be declined.
    pub const fn may_decline(&self) -> bool {
        matches!(self, Slot::Grant { .. } | Slot::Pivotal { .. } | Slot::Coup { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Peek {
    Decision(Slot),
    Auto,
    Terminal,
}

/// Automatic transition, decided purely from state.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Auto {
    EndGame(GameResult),
    Card(card_driven::CardStep),
    Generic(generic::GenericStep),
}

pub(crate) enum Next {
    Decision(Slot),
    Auto(Auto),
    Terminal,
}

pub(crate) fn classify(env: Env<'_>, state: &GameState) -> Result<Next, RuntimeError> {
    if state.is_terminal() {
        return Ok(Next::Terminal);
    }
    if let Some(result) = metrics::check_terminals(env.def, state).map_err(at_turn_flow)? {
        return Ok(Next::Auto(Auto::EndGame(result)));
    }
    match &state.turn_order {
        TurnOrderState::CardDriven(_) => card_driven::classify(env, state),
        _ => generic::classify(env, state),
    }
}

/// Classifies a state without changing it.
pub fn peek(env: Env<'_>, state: &GameState) -> Result<Peek, RuntimeError> {
    Ok(match classify(env, state)? {
        Next::Decision(slot) => Peek::Decision(slot),
        Next::Auto(_) => Peek::Auto,
        Next::Terminal => Peek::Terminal,
    })
}

/// Applies one automatic transition. Returns the decision or terminal state
/// reached instead when there is nothing automatic left.
pub fn step(
    env: Env<'_>,
    state: &mut GameState,
    trace: &mut Vec<TraceEntry>,
) -> Result<Peek, RuntimeError> {
    match classify(env, state)? {
        Next::Decision(slot) => Ok(Peek::Decision(slot)),
        Next::Terminal => Ok(Peek::Terminal),
        Next::Auto(Auto::EndGame(result)) => {
            tracing::info!(?result, "game over");
            state.result = Some(result);
            note(state, trace, LifecycleEvent::GameOver);
            Ok(Peek::Auto)
        }
        Next::Auto(Auto::Card(card_step)) => {
            card_driven::apply(env, state, card_step, trace)?;
            Ok(Peek::Auto)
        }
        Next::Auto(Auto::Generic(generic_step)) => {
            generic::apply(env, state, generic_step, trace)?;
            Ok(Peek::Auto)
        }
    }
}

/// Registers a submitted move with the turn order. Returns the action moves
/// to execute now, in order; empty when the submission only records
/// something (a decline, a stacked interrupt, a hidden submission).
pub fn accept(
    env: Env<'_>,
    state: &mut GameState,
    slot: &Slot,
    mv: &Move,
    trace: &mut Vec<TraceEntry>,
) -> Result<Vec<ActionMove>, RuntimeError> {
    match slot {
        Slot::Main { .. } | Slot::Generic { .. } => Ok(mv.as_action().cloned().into_iter().collect()),
        Slot::Grant { .. } | Slot::Pivotal { .. } | Slot::Coup { .. } => {
            card_driven::accept(env, state, slot, mv, trace)
        }
        Slot::Simultaneous { .. } => generic::accept_submission(env, state, mv),
    }
}

/// Bookkeeping after one action move resolved.
pub fn on_resolved(
    env: Env<'_>,
    state: &mut GameState,
    slot: &Slot,
    mv: &ActionMove,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    match slot {
        Slot::Generic { .. } => generic::on_resolved(env, state, trace),
        Slot::Simultaneous { .. } => Ok(()),
        _ => card_driven::on_resolved(env, state, slot, mv, trace),
    }
}

/// Bookkeeping once every move released by [`accept`] resolved.
pub fn finish(
    env: Env<'_>,
    state: &mut GameState,
    slot: &Slot,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    if let Slot::Simultaneous { .. } = slot {
        generic::finish_round(env, state, trace)?;
    }
    state.progress.phase_jumped = false;
    Ok(())
}

/// Jumps straight to a declared phase. The move's own phase advance is
/// skipped afterwards.
pub fn goto_phase(env: Env<'_>, state: &mut GameState, phase: &str) -> Result<(), ExecFailure> {
    let declared = env.def.def().turn.phases.iter().any(|p| p == phase);
    let in_coup = state
        .turn_order
        .card_driven()
        .and_then(|cd| cd.coup.as_ref())
        .and_then(|coup| coup.plan.iter().position(|p| p == phase));
    if !declared && in_coup.is_none() {
        return Err(ExecFailure::UnknownPhase(phase.to_owned()));
    }

    state.progress.phase = phase.to_owned();
    state.progress.phase_jumped = true;
    match &mut state.turn_order {
        TurnOrderState::RoundRobin(cursor) | TurnOrderState::FixedOrder(cursor) => {
            cursor.entered = false;
        }
        TurnOrderState::Simultaneous(sim) => {
            sim.cursor.entered = false;
            sim.submitted.clear();
        }
        TurnOrderState::CardDriven(cd) => {
            if let (Some(coup), Some(index)) = (cd.coup.as_mut(), in_coup) {
                coup.phase = index;
                coup.seat = 0;
                coup.entered = false;
            }
        }
    }
    Ok(())
}

/// Class recorded for a resolved move.
pub(crate) fn move_class(env: Env<'_>, mv: &ActionMove) -> MoveClass {
    let class = env
        .def
        .action(&mv.action)
        .map_or(MoveClass::Other, |a| a.class);
    match (class, &mv.special) {
        (MoveClass::Operation, Some(_)) => MoveClass::OperationPlusSpecial,
        (class, _) => class,
    }
}

/// Runs the triggers for a lifecycle event outside any move.
pub(crate) fn fire(
    env: Env<'_>,
    state: &mut GameState,
    event: TriggerEvent,
    seat: Option<PlayerId>,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    let mut machine = Machine::new(Scope::new(), seat);
    machine.fire(env, state, &event, 0)?;
    match machine.run(env, state, &mut DeferAll)? {
        Step::Done => {
            let (_, entries) = machine.finish();
            trace.extend(entries);
            Ok(())
        }
        Step::Suspended(request) => Err(RuntimeError::exec(
            request.decision.0.clone(),
            ExecFailure::SuspendedOutsideMove {
                decision: request.decision.0,
            },
        )),
    }
}

/// Credits a global integer variable, clamped to its bounds.
pub(crate) fn credit(
    env: Env<'_>,
    state: &mut GameState,
    var: &str,
    amount: i64,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    let def = env
        .def
        .var(VarScope::Global, var)
        .ok_or_else(|| at_turn_flow(EvalError::unknown("variable", var)))?;
    let before = state.globals.get(var).cloned().unwrap_or_else(|| def.init.clone());
    let base = before.as_int().ok_or_else(|| {
        RuntimeError::exec(
            TURN_FLOW_PATH,
            ExecFailure::BooleanArithmetic {
                var: var.to_owned(),
            },
        )
    })?;
    let after = Value::Int(def.clamp(base.saturating_add(amount)));
    state.globals.insert(var.to_owned(), after.clone());
    trace.push(TraceEntry::new(
        &state.progress.phase,
        EventContext::TriggerEffect,
        &EffectPath::root(TURN_FLOW_PATH),
        TraceKind::VarChange {
            var: var.to_owned(),
            before,
            after,
        },
    ));
    Ok(())
}

pub(crate) const TURN_FLOW_PATH: &str = "turn_flow";

pub(crate) fn at_turn_flow(e: EvalError) -> RuntimeError {
    RuntimeError::exec(TURN_FLOW_PATH, e)
}

pub(crate) fn note(state: &GameState, trace: &mut Vec<TraceEntry>, event: LifecycleEvent) {
    trace.push(TraceEntry::new(
        &state.progress.phase,
        EventContext::TriggerEffect,
        &EffectPath::root(TURN_FLOW_PATH),
        TraceKind::Lifecycle(event),
    ));
}

/// Seats in turn order for the generic disciplines.
pub(crate) fn generic_order(env: Env<'_>, state: &GameState) -> Vec<PlayerId> {
    match &env.def.def().turn.order {
        TurnOrderDef::FixedOrder(seats) => seats
            .iter()
            .filter_map(|s| env.def.seat_id(s))
            .filter(|p| p.0 < state.player_count)
            .collect(),
        _ => state.players().collect(),
    }
}
