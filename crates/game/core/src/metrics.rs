//! Derived metrics, victory markers and terminal outcomes.
//!
//! All functions here are pure: they read state through a binding-free
//! evaluation context and never touch the random stream.

use crate::def::{Outcome, ValidatedDef};
use crate::eval::{EvalCtx, EvalError, cond, int};
use crate::state::{GameResult, GameState};

/// Value of a declared metric formula.
pub fn derived_metric(def: &ValidatedDef, state: &GameState, id: &str) -> Result<i64, EvalError> {
    let metric = def
        .metric(id)
        .ok_or_else(|| EvalError::unknown("metric", id))?;
    int(&EvalCtx::pure(def, state), &metric.formula)
}

/// Raw victory marker of a seat, before its threshold is applied.
pub fn victory_marker(def: &ValidatedDef, state: &GameState, seat: &str) -> Result<i64, EvalError> {
    let victory = def
        .victory(seat)
        .ok_or_else(|| EvalError::unknown("victory marker", seat))?;
    int(&EvalCtx::pure(def, state), &victory.formula)
}

/// Victory marker minus threshold.
pub fn victory_margin(def: &ValidatedDef, state: &GameState, seat: &str) -> Result<i64, EvalError> {
    let threshold = def
        .victory(seat)
        .ok_or_else(|| EvalError::unknown("victory marker", seat))?
        .threshold;
    victory_marker(def, state, seat)?
        .checked_sub(threshold)
        .ok_or(EvalError::Overflow)
}

/// First declared terminal condition that holds, resolved to a result.
pub fn check_terminals(def: &ValidatedDef, state: &GameState) -> Result<Option<GameResult>, EvalError> {
    let ctx = EvalCtx::pure(def, state);
    for terminal in &def.def().terminals {
        if cond(&ctx, &terminal.when)? {
            return resolve_outcome(def, state, &terminal.outcome, &terminal.id).map(Some);
        }
    }
    Ok(None)
}

/// Turns a declared outcome into a concrete result.
///
/// `HighestVictoryMargin` picks the seated seat with the largest margin; ties
/// go to the earlier declared seat. Without any victory markers it is a draw.
pub fn resolve_outcome(
    def: &ValidatedDef,
    state: &GameState,
    outcome: &Outcome,
    by: &str,
) -> Result<GameResult, EvalError> {
    let by = by.to_owned();
    match outcome {
        Outcome::Seat(seat) => Ok(GameResult::Winner {
            seat: seat.clone(),
            by,
        }),
        Outcome::Draw => Ok(GameResult::Draw { by }),
        Outcome::HighestVictoryMargin => {
            let mut best: Option<(i64, &str)> = None;
            for player in state.players() {
                let Some(seat) = def.seat_name(player) else {
                    continue;
                };
                if def.victory(seat).is_none() {
                    continue;
                }
                let margin = victory_margin(def, state, seat)?;
                if best.is_none_or(|(top, _)| margin > top) {
                    best = Some((margin, seat));
                }
            }
            Ok(match best {
                Some((_, seat)) => GameResult::Winner {
                    seat: seat.to_owned(),
                    by,
                },
                None => GameResult::Draw { by },
            })
        }
    }
}
