//! Round-robin, fixed-order and simultaneous disciplines.
//!
//! A turn is one seat's pass through every declared phase. Simultaneous turns
//! collect one hidden submission per seat and resolve them together in seat
//! order.

use crate::def::TriggerEvent;
use crate::effect::{LifecycleEvent, TraceEntry};
use crate::env::Env;
use crate::error::RuntimeError;
use crate::eval::EvalError;
use crate::kernel::enumerate;
use crate::moves::{ActionMove, Move};
use crate::state::{GameState, PlayerId, SeatCursor, TurnOrderState};

use super::{Auto, Next, Slot, at_turn_flow, fire, generic_order, note};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum GenericStep {
    EnterPhase,
    /// The seat due has no legal move; its phase passes.
    SkipSeat,
    /// Simultaneous seat with no legal move submits nothing.
    MarkNone(PlayerId),
    /// Every simultaneous seat submitted nothing.
    CloseRound,
}

fn cursor(state: &GameState) -> Option<&SeatCursor> {
    match &state.turn_order {
        TurnOrderState::RoundRobin(c) | TurnOrderState::FixedOrder(c) => Some(c),
        TurnOrderState::Simultaneous(sim) => Some(&sim.cursor),
        TurnOrderState::CardDriven(_) => None,
    }
}

fn cursor_mut(state: &mut GameState) -> Option<&mut SeatCursor> {
    match &mut state.turn_order {
        TurnOrderState::RoundRobin(c) | TurnOrderState::FixedOrder(c) => Some(c),
        TurnOrderState::Simultaneous(sim) => Some(&mut sim.cursor),
        TurnOrderState::CardDriven(_) => None,
    }
}

/// Seat whose turn it is.
fn current_seat(env: Env<'_>, state: &GameState) -> Option<PlayerId> {
    let order = generic_order(env, state);
    let index = cursor(state)?.seat;
    order.get(index).copied()
}

pub(super) fn classify(env: Env<'_>, state: &GameState) -> Result<Next, RuntimeError> {
    let phase = state.progress.phase.clone();
    let Some(cursor) = cursor(state) else {
        return Err(at_turn_flow(EvalError::NoActiveSeat));
    };
    if !cursor.entered {
        return Ok(Next::Auto(Auto::Generic(GenericStep::EnterPhase)));
    }

    if let TurnOrderState::Simultaneous(sim) = &state.turn_order {
        if sim.submitted.len() >= usize::from(state.player_count) {
            return Ok(Next::Auto(Auto::Generic(GenericStep::CloseRound)));
        }
        let Some(seat) = state.players().find(|p| !sim.submitted.contains_key(p)) else {
            return Ok(Next::Auto(Auto::Generic(GenericStep::CloseRound)));
        };
        let slot = Slot::Simultaneous { seat, phase };
        return Ok(if enumerate::has_legal(env, state, &slot) {
            Next::Decision(slot)
        } else {
            Next::Auto(Auto::Generic(GenericStep::MarkNone(seat)))
        });
    }

    let seat = current_seat(env, state).ok_or_else(|| at_turn_flow(EvalError::NoActiveSeat))?;
    let slot = Slot::Generic { seat, phase };
    Ok(if enumerate::has_legal(env, state, &slot) {
        Next::Decision(slot)
    } else {
        Next::Auto(Auto::Generic(GenericStep::SkipSeat))
    })
}

pub(super) fn apply(
    env: Env<'_>,
    state: &mut GameState,
    step: GenericStep,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    match step {
        GenericStep::EnterPhase => {
            if let Some(c) = cursor_mut(state) {
                c.entered = true;
            }
            let phase = state.progress.phase.clone();
            tracing::debug!(%phase, turn = state.progress.turn, "phase entered");
            note(state, trace, LifecycleEvent::PhaseEntered(phase.clone()));
            let seat = trigger_seat(env, state);
            fire(env, state, TriggerEvent::PhaseEnter(phase), seat, trace)
        }
        GenericStep::SkipSeat => advance_phase(env, state, trace),
        GenericStep::MarkNone(seat) => {
            if let TurnOrderState::Simultaneous(sim) = &mut state.turn_order {
                sim.submitted.insert(seat, None);
            }
            Ok(())
        }
        GenericStep::CloseRound => finish_round(env, state, trace),
    }
}

pub(super) fn on_resolved(
    env: Env<'_>,
    state: &mut GameState,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    if state.progress.phase_jumped {
        return Ok(());
    }
    advance_phase(env, state, trace)
}

/// Records a hidden submission. Releases every submission, in seat order,
/// once no seat with a legal move is still missing.
pub(super) fn accept_submission(
    env: Env<'_>,
    state: &mut GameState,
    mv: &Move,
) -> Result<Vec<ActionMove>, RuntimeError> {
    let phase = state.progress.phase.clone();
    let pending: Vec<PlayerId> = match &state.turn_order {
        TurnOrderState::Simultaneous(sim) => state
            .players()
            .filter(|p| *p != mv.seat() && !sim.submitted.contains_key(p))
            .collect(),
        _ => Vec::new(),
    };
    let idle: Vec<PlayerId> = pending
        .iter()
        .copied()
        .filter(|&seat| {
            let slot = Slot::Simultaneous {
                seat,
                phase: phase.clone(),
            };
            !enumerate::has_legal(env, state, &slot)
        })
        .collect();

    let TurnOrderState::Simultaneous(sim) = &mut state.turn_order else {
        return Ok(mv.as_action().cloned().into_iter().collect());
    };
    sim.submitted.insert(mv.seat(), mv.as_action().cloned());
    for seat in idle {
        sim.submitted.insert(seat, None);
    }
    if sim.submitted.len() < usize::from(state.player_count) {
        tracing::debug!(seat = %mv.seat(), "submission recorded");
        return Ok(Vec::new());
    }
    Ok(sim.submitted.values().flatten().cloned().collect())
}

/// Closes a complete simultaneous round and moves to the next phase.
pub(super) fn finish_round(
    env: Env<'_>,
    state: &mut GameState,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    let complete = match &mut state.turn_order {
        TurnOrderState::Simultaneous(sim) if sim.submitted.len() >= usize::from(state.player_count) => {
            sim.submitted.clear();
            true
        }
        _ => false,
    };
    if complete && !state.progress.phase_jumped {
        advance_phase(env, state, trace)?;
    }
    Ok(())
}

fn trigger_seat(env: Env<'_>, state: &GameState) -> Option<PlayerId> {
    match state.turn_order {
        TurnOrderState::Simultaneous(_) => None,
        _ => current_seat(env, state),
    }
}

/// Leaves the current phase. Past the last phase the turn passes to the next
/// seat and starts over at the first phase.
fn advance_phase(
    env: Env<'_>,
    state: &mut GameState,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    let phases = &env.def.def().turn.phases;
    let current = state.progress.phase.clone();
    let seat = trigger_seat(env, state);

    note(state, trace, LifecycleEvent::PhaseExited(current.clone()));
    fire(env, state, TriggerEvent::PhaseExit(current.clone()), seat, trace)?;

    let next = phases
        .iter()
        .position(|p| *p == current)
        .and_then(|i| phases.get(i + 1));
    match next {
        Some(phase) => state.progress.phase = phase.clone(),
        None => {
            let order_len = generic_order(env, state).len().max(1);
            note(state, trace, LifecycleEvent::TurnEnded(state.progress.turn));
            state.progress.turn += 1;
            state.progress.phase = phases.first().cloned().unwrap_or_default();
            if let TurnOrderState::RoundRobin(c) | TurnOrderState::FixedOrder(c) =
                &mut state.turn_order
            {
                c.seat = (c.seat + 1) % order_len;
            }
        }
    }
    if let Some(c) = cursor_mut(state) {
        c.entered = false;
    }
    Ok(())
}
