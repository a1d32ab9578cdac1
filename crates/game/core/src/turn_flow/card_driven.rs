//! Card-driven discipline.
//!
//! Each played card names its seats in acting order. Up to `max_actors`
//! eligible seats act on it; seats that act sit out the next card. A card is
//! preceded by a pivotal interrupt window and followed by promotion of the
//! lookahead card. Coup-flagged cards replace all of this with the coup phase
//! plan, stepped by every seat in turn.

use crate::def::{CardDrivenDef, MoveClass, TriggerEvent};
use crate::effect::{LifecycleEvent, TraceEntry};
use crate::env::Env;
use crate::error::{ExecFailure, RuntimeError};
use crate::kernel::enumerate;
use crate::metrics;
use crate::moves::{ActionMove, Move};
use crate::state::{
    Acted, CardDrivenState, CoupState, GameState, PlayerId, StackedPivotal, TokenId, ZoneId,
};

use super::{Auto, Next, Slot, TURN_FLOW_PATH, at_turn_flow, credit, fire, move_class, note};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CardStep {
    /// Played card to discard, lookahead to played, draw to lookahead.
    Promote,
    /// Settle eligibility for the card just finished and promote.
    FinishCard,
    EnterCoupPhase,
    /// The coup seat due has nothing to do in this phase.
    CoupSkipSeat,
    ExitCoupPhase,
    EndCoup,
    /// The grantee cannot use its free operation.
    DropGrant,
    ClosePivotal,
    /// The candidate seat has no legal move and is passed over.
    SkipSeat(String),
}

fn config(env: Env<'_>) -> Result<&CardDrivenDef, RuntimeError> {
    env.def
        .def()
        .turn
        .order
        .card_driven()
        .ok_or_else(not_card_driven)
}

fn not_card_driven() -> RuntimeError {
    RuntimeError::exec(
        TURN_FLOW_PATH,
        ExecFailure::NotCardDriven {
            effect: "turn_flow".to_owned(),
        },
    )
}

fn runtime(state: &GameState) -> Result<&CardDrivenState, RuntimeError> {
    state.turn_order.card_driven().ok_or_else(not_card_driven)
}

fn runtime_mut(state: &mut GameState) -> Result<&mut CardDrivenState, RuntimeError> {
    state.turn_order.card_driven_mut().ok_or_else(not_card_driven)
}

fn zone(env: Env<'_>, name: &str) -> Result<ZoneId, RuntimeError> {
    env.def
        .zone_id(name)
        .ok_or_else(|| at_turn_flow(crate::eval::EvalError::unknown("zone", name)))
}

fn seated(env: Env<'_>, state: &GameState, seat: &str) -> Option<PlayerId> {
    env.def
        .seat_id(seat)
        .filter(|p| p.0 < state.player_count)
}

fn is_coup_card(cfg: &CardDrivenDef, state: &GameState, card: TokenId) -> bool {
    let Some(coup) = &cfg.coup else {
        return false;
    };
    state
        .token(card)
        .and_then(|t| t.props.get(&coup.flag_prop))
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Declared seat ids listed on a card, in acting order.
fn card_order(cfg: &CardDrivenDef, state: &GameState, card: TokenId) -> Vec<String> {
    let Some(list) = state
        .token(card)
        .and_then(|t| t.props.get(&cfg.seat_order_prop))
    else {
        return Vec::new();
    };
    list.members()
        .iter()
        .filter_map(|v| v.as_str())
        .map(|symbol| cfg.map_seat(symbol).to_owned())
        .collect()
}

/// Next seat due to act in the main phase of the current card.
fn candidate(env: Env<'_>, cfg: &CardDrivenDef, state: &GameState) -> Option<String> {
    let cd = state.turn_order.card_driven()?;
    let card = cd.current_card?;
    card_order(cfg, state, card).into_iter().find(|seat| {
        cd.is_eligible(seat)
            && !cd.has_acted(seat)
            && !cd.passed.contains(seat)
            && seated(env, state, seat).is_some()
    })
}

/// Highest-precedence seat still to be offered the pivotal window.
fn pivotal_offer(env: Env<'_>, cfg: &CardDrivenDef, state: &GameState) -> Option<PlayerId> {
    let pivotal = cfg.pivotal.as_ref()?;
    let cd = state.turn_order.card_driven()?;
    if cd.pivotal.closed || !cd.acted.is_empty() || !cd.passed.is_empty() {
        return None;
    }
    pivotal.precedence.iter().find_map(|seat| {
        if cd.pivotal.declined.contains(seat) || cd.pivotal.stack.iter().any(|s| s.seat == *seat) {
            return None;
        }
        let player = seated(env, state, seat)?;
        enumerate::has_legal(env, state, &Slot::Pivotal { seat: player }).then_some(player)
    })
}

pub(super) fn classify(env: Env<'_>, state: &GameState) -> Result<Next, RuntimeError> {
    let cfg = config(env)?;
    let cd = runtime(state)?;
    let played = zone(env, &cfg.cards.played)?;

    if state.top_of(played).is_none() {
        let lookahead = zone(env, &cfg.cards.lookahead)?;
        let draw = zone(env, &cfg.cards.draw)?;
        if state.zone_len(lookahead) == 0 && state.zone_len(draw) == 0 {
            let result = metrics::resolve_outcome(env.def, state, &cfg.exhausted, "deck_exhausted")
                .map_err(at_turn_flow)?;
            return Ok(Next::Auto(Auto::EndGame(result)));
        }
        return Ok(Next::Auto(Auto::Card(CardStep::Promote)));
    }

    if let Some(grant) = cd.grants.first() {
        let slot = Slot::Grant {
            seat: grant.seat,
            actions: grant.actions.clone(),
        };
        return Ok(if enumerate::has_legal(env, state, &slot) {
            Next::Decision(slot)
        } else {
            Next::Auto(Auto::Card(CardStep::DropGrant))
        });
    }

    if cd.card_done {
        return Ok(Next::Auto(Auto::Card(CardStep::FinishCard)));
    }

    if let Some(coup) = &cd.coup {
        let Some(phase) = coup.plan.get(coup.phase) else {
            return Ok(Next::Auto(Auto::Card(CardStep::EndCoup)));
        };
        if !coup.entered {
            return Ok(Next::Auto(Auto::Card(CardStep::EnterCoupPhase)));
        }
        if coup.seat >= usize::from(state.player_count) {
            return Ok(Next::Auto(Auto::Card(CardStep::ExitCoupPhase)));
        }
        let slot = Slot::Coup {
            seat: PlayerId(coup.seat as u8),
            phase: phase.clone(),
        };
        return Ok(if enumerate::has_legal(env, state, &slot) {
            Next::Decision(slot)
        } else {
            Next::Auto(Auto::Card(CardStep::CoupSkipSeat))
        });
    }

    if let Some(seat) = pivotal_offer(env, cfg, state) {
        return Ok(Next::Decision(Slot::Pivotal { seat }));
    }
    if cfg.pivotal.is_some() && !cd.pivotal.closed {
        return Ok(Next::Auto(Auto::Card(CardStep::ClosePivotal)));
    }

    if cd.acted.len() >= cfg.max_actors as usize {
        return Ok(Next::Auto(Auto::Card(CardStep::FinishCard)));
    }
    let Some(seat) = candidate(env, cfg, state) else {
        return Ok(Next::Auto(Auto::Card(CardStep::FinishCard)));
    };
    let player = seated(env, state, &seat).ok_or_else(|| {
        at_turn_flow(crate::eval::EvalError::unknown("seat", &seat))
    })?;
    let slot = Slot::Main { seat: player };
    Ok(if enumerate::has_legal(env, state, &slot) {
        Next::Decision(slot)
    } else {
        Next::Auto(Auto::Card(CardStep::SkipSeat(seat)))
    })
}

pub(super) fn apply(
    env: Env<'_>,
    state: &mut GameState,
    step: CardStep,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    tracing::trace!(?step, "card-driven step");
    match step {
        CardStep::Promote => promote(env, state, trace),
        CardStep::FinishCard => finish_card(env, state, trace),
        CardStep::EnterCoupPhase => {
            let phase = {
                let coup = runtime_mut(state)?
                    .coup
                    .as_mut()
                    .ok_or_else(not_card_driven)?;
                coup.entered = true;
                coup.plan.get(coup.phase).cloned().unwrap_or_default()
            };
            state.progress.phase = phase.clone();
            tracing::debug!(%phase, "coup phase entered");
            note(state, trace, LifecycleEvent::PhaseEntered(phase.clone()));
            fire(env, state, TriggerEvent::PhaseEnter(phase), None, trace)
        }
        CardStep::CoupSkipSeat => {
            if let Some(coup) = runtime_mut(state)?.coup.as_mut() {
                coup.seat += 1;
            }
            Ok(())
        }
        CardStep::ExitCoupPhase => {
            let cfg = config(env)?;
            let phase = state.progress.phase.clone();
            note(state, trace, LifecycleEvent::PhaseExited(phase.clone()));
            fire(env, state, TriggerEvent::PhaseExit(phase.clone()), None, trace)?;

            let reset = cfg.coup.as_ref().is_some_and(|c| c.reset_phase == phase);
            let cd = runtime_mut(state)?;
            if reset {
                for eligible in cd.eligibility.values_mut() {
                    *eligible = true;
                }
            }
            if let Some(coup) = cd.coup.as_mut() {
                coup.phase += 1;
                coup.seat = 0;
                coup.entered = false;
            }
            if reset {
                note(state, trace, LifecycleEvent::EligibilityReset);
            }
            Ok(())
        }
        CardStep::EndCoup => {
            let cd = runtime_mut(state)?;
            cd.consecutive_coups += 1;
            cd.coup = None;
            cd.card_done = true;
            tracing::debug!(consecutive = cd.consecutive_coups, "coup round ended");
            note(state, trace, LifecycleEvent::CoupRoundEnded);
            Ok(())
        }
        CardStep::DropGrant => {
            let cd = runtime_mut(state)?;
            if !cd.grants.is_empty() {
                let grant = cd.grants.remove(0);
                tracing::debug!(seat = %grant.seat, "free operation dropped");
            }
            Ok(())
        }
        CardStep::ClosePivotal => {
            let cd = runtime_mut(state)?;
            cd.pivotal.closed = true;
            cd.pivotal.stack.clear();
            Ok(())
        }
        CardStep::SkipSeat(seat) => {
            tracing::debug!(%seat, "seat has no legal move");
            runtime_mut(state)?.passed.insert(seat);
            Ok(())
        }
    }
}

/// Moves a card from the top of `from` onto `to`.
fn shift_card(env: Env<'_>, state: &mut GameState, from: ZoneId, to: ZoneId) -> Option<TokenId> {
    let card = state.top_of(from)?;
    state.detach_token(card);
    let kind = env.def.zone(to).map(|z| z.kind).unwrap_or_default();
    state.insert_token(to, kind, card);
    Some(card)
}

fn promote(
    env: Env<'_>,
    state: &mut GameState,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    let cfg = config(env)?;
    let draw = zone(env, &cfg.cards.draw)?;
    let lookahead = zone(env, &cfg.cards.lookahead)?;
    let played = zone(env, &cfg.cards.played)?;
    let discard = zone(env, &cfg.cards.discard)?;

    if let Some(card) = shift_card(env, state, played, discard) {
        note(state, trace, LifecycleEvent::CardDiscarded(card));
    }
    let next = shift_card(env, state, lookahead, played);
    if let Some(card) = shift_card(env, state, draw, lookahead) {
        note(state, trace, LifecycleEvent::CardRevealed(card));
    }
    let Some(card) = next else {
        return Ok(());
    };

    let final_round = state.zone_len(lookahead) == 0 && state.zone_len(draw) == 0;
    let coup_card = is_coup_card(cfg, state, card);
    {
        let cd = runtime_mut(state)?;
        cd.begin_card(card);
    }
    tracing::debug!(%card, coup = coup_card, "card played");
    note(state, trace, LifecycleEvent::CardPlayed(card));
    fire(env, state, TriggerEvent::CardPlayed, None, trace)?;

    match (&cfg.coup, coup_card) {
        (Some(coup), true) => {
            let cd = runtime_mut(state)?;
            if cd.consecutive_coups < coup.max_consecutive {
                let plan = coup
                    .phases
                    .iter()
                    .filter(|p| !final_round || !coup.final_round_omit.contains(p))
                    .cloned()
                    .collect();
                cd.coup = Some(CoupState {
                    plan,
                    phase: 0,
                    seat: 0,
                    entered: false,
                    final_round,
                });
                note(state, trace, LifecycleEvent::CoupRoundStarted { final_round });
            } else {
                cd.card_done = true;
                tracing::debug!(limit = coup.max_consecutive, "coup round skipped");
                note(state, trace, LifecycleEvent::CoupRoundSkipped);
            }
        }
        _ => {
            runtime_mut(state)?.consecutive_coups = 0;
            state.progress.phase = cfg.main_phase.clone();
            note(state, trace, LifecycleEvent::PhaseEntered(cfg.main_phase.clone()));
            fire(env, state, TriggerEvent::PhaseEnter(cfg.main_phase.clone()), None, trace)?;
        }
    }
    Ok(())
}

fn finish_card(
    env: Env<'_>,
    state: &mut GameState,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    let cfg = config(env)?;
    let coup_card = runtime(state)?
        .current_card
        .is_some_and(|card| is_coup_card(cfg, state, card));

    if !coup_card {
        let phase = state.progress.phase.clone();
        note(state, trace, LifecycleEvent::PhaseExited(phase.clone()));
        fire(env, state, TriggerEvent::PhaseExit(phase), None, trace)?;

        let cd = runtime_mut(state)?;
        let acted: Vec<String> = cd.acted.iter().map(|a| a.seat.clone()).collect();
        for (seat, eligible) in cd.eligibility.iter_mut() {
            *eligible = !acted.contains(seat);
        }
    }

    let overrides = std::mem::take(&mut runtime_mut(state)?.overrides);
    for (seat, eligible) in overrides {
        if let Some(slot) = runtime_mut(state)?.eligibility.get_mut(&seat) {
            *slot = eligible;
        }
        note(state, trace, LifecycleEvent::EligibilityOverride { seat, eligible });
    }

    note(state, trace, LifecycleEvent::TurnEnded(state.progress.turn));
    state.progress.turn += 1;
    runtime_mut(state)?.card_done = false;
    promote(env, state, trace)
}

/// Registers an optional-slot submission. Returns the moves to run now.
pub(super) fn accept(
    env: Env<'_>,
    state: &mut GameState,
    slot: &Slot,
    mv: &Move,
    trace: &mut Vec<TraceEntry>,
) -> Result<Vec<ActionMove>, RuntimeError> {
    match slot {
        Slot::Grant { .. } => {
            let cd = runtime_mut(state)?;
            if !cd.grants.is_empty() {
                cd.grants.remove(0);
            }
            Ok(mv
                .as_action()
                .map(|m| ActionMove {
                    free: true,
                    ..m.clone()
                })
                .into_iter()
                .collect())
        }
        Slot::Coup { .. } => match mv.as_action() {
            Some(m) => Ok(vec![m.clone()]),
            None => {
                if let Some(coup) = runtime_mut(state)?.coup.as_mut() {
                    coup.seat += 1;
                }
                Ok(Vec::new())
            }
        },
        Slot::Pivotal { seat } => {
            let name = env.def.seat_name(*seat).unwrap_or_default().to_owned();
            {
                let cd = runtime_mut(state)?;
                match mv.as_action() {
                    Some(m) => cd.pivotal.stack.push(StackedPivotal {
                        seat: name,
                        mv: m.clone(),
                    }),
                    None => {
                        cd.pivotal.declined.insert(name);
                    }
                }
            }
            let cfg = config(env)?;
            if pivotal_offer(env, cfg, state).is_some() {
                return Ok(Vec::new());
            }
            resolve_pivotal(cfg, state, trace)
        }
        Slot::Main { .. } | Slot::Generic { .. } | Slot::Simultaneous { .. } => {
            Ok(mv.as_action().cloned().into_iter().collect())
        }
    }
}

/// Closes the pivotal window and picks the surviving interrupt.
///
/// Cancellation rules apply when their winner selector matches a stacked
/// entry; the highest-precedence entry left runs.
fn resolve_pivotal(
    cfg: &CardDrivenDef,
    state: &mut GameState,
    trace: &mut Vec<TraceEntry>,
) -> Result<Vec<ActionMove>, RuntimeError> {
    let Some(pivotal) = &cfg.pivotal else {
        return Ok(Vec::new());
    };
    let cd = runtime_mut(state)?;
    cd.pivotal.closed = true;
    let mut stack = std::mem::take(&mut cd.pivotal.stack);
    if stack.is_empty() {
        return Ok(Vec::new());
    }

    let mut canceled = Vec::new();
    for rule in &pivotal.cancellation {
        let Some(winner) = stack
            .iter()
            .position(|e| rule.winner.matches(&e.seat, &e.mv.action))
        else {
            continue;
        };
        let winner_seat = stack[winner].seat.clone();
        stack.retain(|e| {
            let drop = e.seat != winner_seat && rule.canceled.matches(&e.seat, &e.mv.action);
            if drop {
                canceled.push(e.seat.clone());
            }
            !drop
        });
    }

    let rank = |seat: &str| {
        pivotal
            .precedence
            .iter()
            .position(|s| s == seat)
            .unwrap_or(usize::MAX)
    };
    let Some(winner) = stack.into_iter().min_by_key(|e| rank(&e.seat)) else {
        return Ok(Vec::new());
    };
    tracing::debug!(seat = %winner.seat, action = %winner.mv.action, ?canceled, "pivotal resolved");
    note(
        state,
        trace,
        LifecycleEvent::PivotalResolved {
            seat: winner.seat.clone(),
            action: winner.mv.action.clone(),
            canceled,
        },
    );
    Ok(vec![winner.mv])
}

/// Bookkeeping after a move resolved on a card-driven slot.
pub(super) fn on_resolved(
    env: Env<'_>,
    state: &mut GameState,
    slot: &Slot,
    mv: &ActionMove,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RuntimeError> {
    let seat = env.def.seat_name(mv.seat).unwrap_or_default().to_owned();
    match slot {
        Slot::Main { .. } => {
            let class = move_class(env, mv);
            if class == MoveClass::Pass {
                runtime_mut(state)?.passed.insert(seat.clone());
                let reward = config(env)?.pass_reward(&seat).cloned();
                if let Some(reward) = reward {
                    credit(env, state, &reward.var, reward.amount, trace)?;
                    note(
                        state,
                        trace,
                        LifecycleEvent::PassRewarded {
                            seat,
                            var: reward.var,
                            amount: reward.amount,
                        },
                    );
                }
            } else {
                runtime_mut(state)?.acted.push(Acted { seat, class });
            }
        }
        Slot::Pivotal { .. } => {
            runtime_mut(state)?.acted.push(Acted {
                seat,
                class: MoveClass::Pivotal,
            });
        }
        Slot::Coup { .. } => {
            if !state.progress.phase_jumped {
                if let Some(coup) = runtime_mut(state)?.coup.as_mut() {
                    coup.seat += 1;
                }
            }
        }
        Slot::Grant { .. } | Slot::Generic { .. } | Slot::Simultaneous { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{Cancellation, CardZones, PivotalDef, PivotalSel};

    fn stacked(seat: &str, action: &str) -> StackedPivotal {
        StackedPivotal {
            seat: seat.to_owned(),
            mv: ActionMove {
                seat: PlayerId(0),
                action: action.to_owned(),
                params: Vec::new(),
                special: None,
                free: false,
            },
        }
    }

    fn pivotal_config(cancellation: Vec<Cancellation>) -> CardDrivenDef {
        let mut cfg = CardDrivenDef::new(
            CardZones {
                draw: "deck".into(),
                lookahead: "lookahead".into(),
                played: "played".into(),
                discard: "discard".into(),
            },
            "order",
            "main",
        );
        cfg.pivotal = Some(PivotalDef {
            actions: vec!["pivUs".into(), "pivVc".into()],
            precedence: vec!["vc".into(), "us".into()],
            cancellation,
        });
        cfg
    }

    fn state_with(stack: Vec<StackedPivotal>) -> GameState {
        let mut cd = CardDrivenState::new(&["us".to_owned(), "vc".to_owned()]);
        cd.pivotal.stack = stack;
        GameState::new(
            2,
            0,
            crate::state::TurnOrderState::CardDriven(Box::new(cd)),
            crate::rng::RngState::new(1),
        )
    }

    #[test]
    fn pivotal_precedence_picks_the_earlier_seat() {
        let cfg = pivotal_config(Vec::new());
        let mut state = state_with(vec![stacked("us", "pivUs"), stacked("vc", "pivVc")]);
        let mut trace = Vec::new();

        let moves = resolve_pivotal(&cfg, &mut state, &mut trace).unwrap();

        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].action, "pivVc");
        let cd = state.turn_order.card_driven().unwrap();
        assert!(cd.pivotal.closed);
        assert!(cd.pivotal.stack.is_empty());
    }

    #[test]
    fn cancellation_drops_the_canceled_entry() {
        let cfg = pivotal_config(vec![Cancellation {
            winner: PivotalSel::seat("us"),
            canceled: PivotalSel::seat("vc"),
        }]);
        let mut state = state_with(vec![stacked("us", "pivUs"), stacked("vc", "pivVc")]);
        let mut trace = Vec::new();

        let moves = resolve_pivotal(&cfg, &mut state, &mut trace).unwrap();

        assert_eq!(moves[0].action, "pivUs");
        assert!(trace.iter().any(|e| matches!(
            &e.kind,
            crate::effect::TraceKind::Lifecycle(LifecycleEvent::PivotalResolved { canceled, .. })
                if canceled == &vec!["vc".to_owned()]
        )));
    }

    #[test]
    fn empty_stack_resolves_to_nothing() {
        let cfg = pivotal_config(Vec::new());
        let mut state = state_with(Vec::new());
        let moves = resolve_pivotal(&cfg, &mut state, &mut Vec::new()).unwrap();
        assert!(moves.is_empty());
        assert!(state.turn_order.card_driven().unwrap().pivotal.closed);
    }
}
