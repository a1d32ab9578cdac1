//! Legal move enumeration and submitted-move checks.
//!
//! Moves are produced in a stable order: actions by id, parameter values in
//! declared parameter order and domain order, the plain move before its
//! compound variants, and a decline last. [`check_move`] accepts exactly the
//! moves [`visit`] would produce.

use crate::def::{ActionDef, MoveClass, ParamDef};
use crate::env::Env;
use crate::error::{IllegalMove, RuntimeError};
use crate::eval::{EvalCtx, Scope, cond, domain};
use crate::moves::{ActionMove, Move, SpecialMove};
use crate::pipeline;
use crate::state::{GameState, PlayerId, Value};
use crate::turn_flow::{Slot, move_class};

type Params = Vec<(String, Value)>;

/// Whether `action` may be taken from `slot` at all, parameters aside.
fn offered(env: Env<'_>, state: &GameState, slot: &Slot, action: &ActionDef) -> bool {
    let Some(seat) = env.def.seat_name(slot.seat()) else {
        return false;
    };
    if !action.allows_seat(seat) || action.class == MoveClass::Special {
        return false;
    }
    let phase = &state.progress.phase;
    match slot {
        Slot::Grant { actions, .. } => actions.iter().any(|a| *a == action.id),
        Slot::Pivotal { .. } => {
            let listed = env
                .def
                .def()
                .turn
                .order
                .card_driven()
                .and_then(|cd| cd.pivotal.as_ref())
                .is_some_and(|p| p.actions.iter().any(|a| *a == action.id));
            action.class == MoveClass::Pivotal && listed && action.allows_phase(phase)
        }
        _ => action.class != MoveClass::Pivotal && action.allows_phase(phase),
    }
}

/// Second actor on a card is limited by what the first actor did.
fn option_matrix(env: Env<'_>, state: &GameState, slot: &Slot, class: MoveClass) -> Result<(), IllegalMove> {
    if !matches!(slot, Slot::Main { .. }) || class == MoveClass::Pass {
        return Ok(());
    }
    let (Some(cfg), Some(cd)) = (
        env.def.def().turn.order.card_driven(),
        state.turn_order.card_driven(),
    ) else {
        return Ok(());
    };
    let [first] = cd.acted.as_slice() else {
        return Ok(());
    };
    match cfg.second_options(first.class) {
        Some(allowed) if !allowed.contains(&class) => Err(IllegalMove::OptionMatrix {
            first: first.class,
            class,
        }),
        _ => Ok(()),
    }
}

fn pre_holds(env: Env<'_>, state: &GameState, seat: PlayerId, action: &ActionDef, params: &Params) -> bool {
    let Some(pre) = &action.pre else {
        return true;
    };
    let scope = Scope::from_bindings(params.iter().cloned());
    cond(&EvalCtx::new(env.def, state, &scope, Some(seat)), pre).unwrap_or(false)
}

fn param_domain(
    env: Env<'_>,
    state: &GameState,
    seat: PlayerId,
    param: &ParamDef,
    bound: &Params,
) -> Option<Vec<Value>> {
    let scope = Scope::from_bindings(bound.iter().cloned());
    let ctx = EvalCtx::new(env.def, state, &scope, Some(seat));
    match domain(&ctx, &param.domain) {
        Ok(values) => Some(values),
        Err(e) => {
            tracing::trace!(param = %param.name, error = %e, "parameter domain unavailable");
            None
        }
    }
}

/// Calls `f` with every `min..=max`-sized subset of `values`, smaller sizes
/// first, each size in lexicographic index order. Stops when `f` does.
fn subsets(values: &[Value], min: u32, max: u32, f: &mut dyn FnMut(Value) -> bool) -> bool {
    let n = values.len();
    let hi = (max as usize).min(n);
    for k in (min as usize)..=hi {
        let mut idx: Vec<usize> = (0..k).collect();
        loop {
            if !f(Value::List(idx.iter().map(|&i| values[i].clone()).collect())) {
                return false;
            }
            let Some(i) = (0..k).rev().find(|&i| idx[i] < n - k + i) else {
                break;
            };
            idx[i] += 1;
            for j in i + 1..k {
                idx[j] = idx[j - 1] + 1;
            }
        }
    }
    true
}

/// Walks every assignment of `params`, each domain resolved with the earlier
/// parameters bound.
fn assignments(
    env: Env<'_>,
    state: &GameState,
    seat: PlayerId,
    params: &[ParamDef],
    bound: &mut Params,
    emit: &mut dyn FnMut(&Params) -> bool,
) -> bool {
    let Some((param, rest)) = params.split_first() else {
        return emit(bound);
    };
    let Some(values) = param_domain(env, state, seat, param, bound) else {
        return true;
    };
    let mut each = |value: Value| {
        bound.push((param.name.clone(), value));
        let more = assignments(env, state, seat, rest, &mut *bound, &mut *emit);
        bound.pop();
        more
    };
    match param.cardinality {
        Some((min, max)) => subsets(&values, min, max, &mut each),
        None => values.into_iter().all(&mut each),
    }
}

fn visit_specials(
    env: Env<'_>,
    state: &GameState,
    slot: &Slot,
    action: &ActionDef,
    base: &ActionMove,
    found: &mut bool,
    f: &mut dyn FnMut(Move) -> bool,
) -> bool {
    let Some(compound) = &action.compound else {
        return true;
    };
    let Some(seat_name) = env.def.seat_name(base.seat) else {
        return true;
    };
    for special_id in &compound.specials {
        let Some(special) = env.def.action(special_id) else {
            continue;
        };
        if !special.allows_seat(seat_name) || !special.allows_phase(&state.progress.phase) {
            continue;
        }
        let mut bound = Vec::new();
        let more = assignments(env, state, base.seat, &special.params, &mut bound, &mut |params| {
            if !pre_holds(env, state, base.seat, special, params) {
                return true;
            }
            let mv = ActionMove {
                special: Some(SpecialMove {
                    action: special.id.clone(),
                    params: params.clone(),
                }),
                ..base.clone()
            };
            if pipeline::check_constraints(&compound.constraints, &mv).is_err()
                || option_matrix(env, state, slot, move_class(env, &mv)).is_err()
            {
                return true;
            }
            *found = true;
            f(Move::Act(mv))
        });
        if !more {
            return false;
        }
    }
    true
}

/// Feeds every legal move for `slot` to `f` in enumeration order until `f`
/// returns false.
pub(crate) fn visit(env: Env<'_>, state: &GameState, slot: &Slot, f: &mut dyn FnMut(Move) -> bool) {
    let seat = slot.seat();
    let free = matches!(slot, Slot::Grant { .. });
    let mut found = false;

    for action in env.def.actions_by_id() {
        if !offered(env, state, slot, action) {
            continue;
        }
        let mut bound = Vec::new();
        let more = assignments(env, state, seat, &action.params, &mut bound, &mut |params| {
            if !pre_holds(env, state, seat, action, params) {
                return true;
            }
            let mv = ActionMove {
                seat,
                action: action.id.clone(),
                params: params.clone(),
                special: None,
                free,
            };
            if option_matrix(env, state, slot, move_class(env, &mv)).is_ok() {
                found = true;
                if !f(Move::Act(mv.clone())) {
                    return false;
                }
            }
            visit_specials(env, state, slot, action, &mv, &mut found, &mut *f)
        });
        if !more {
            return;
        }
    }

    if found && slot.may_decline() {
        f(Move::decline(seat));
    }
}

/// Legal moves for `slot`, capped at the configured maximum.
pub(crate) fn moves(env: Env<'_>, state: &GameState, slot: &Slot) -> Vec<Move> {
    let cap = env.config.max_enumerated_moves;
    let mut out = Vec::new();
    visit(env, state, slot, &mut |mv| {
        if out.len() >= cap {
            return false;
        }
        out.push(mv);
        true
    });
    if out.len() >= cap {
        tracing::warn!(cap, "legal move enumeration truncated");
    }
    out
}

/// Whether `slot` has at least one legal action move.
pub(crate) fn has_legal(env: Env<'_>, state: &GameState, slot: &Slot) -> bool {
    let mut found = false;
    visit(env, state, slot, &mut |_| {
        found = true;
        false
    });
    found
}

fn check_params(
    env: Env<'_>,
    state: &GameState,
    seat: PlayerId,
    action: &ActionDef,
    given: &[(String, Value)],
) -> Result<Params, IllegalMove> {
    if let Some((name, _)) = given
        .iter()
        .find(|(name, _)| !action.params.iter().any(|p| p.name == *name))
    {
        return Err(IllegalMove::UnexpectedParam {
            action: action.id.clone(),
            param: name.clone(),
        });
    }

    let mut bound = Vec::new();
    for param in &action.params {
        let value = given
            .iter()
            .find(|(name, _)| *name == param.name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| IllegalMove::MissingParam {
                action: action.id.clone(),
                param: param.name.clone(),
            })?;
        let out_of_domain = |value: &Value| IllegalMove::ParamOutOfDomain {
            param: param.name.clone(),
            value: value.clone(),
        };
        let values = param_domain(env, state, seat, param, &bound).ok_or_else(|| out_of_domain(&value))?;

        match param.cardinality {
            None => {
                if !values.contains(&value) {
                    return Err(out_of_domain(&value));
                }
            }
            Some((min, max)) => {
                let Value::List(members) = &value else {
                    return Err(out_of_domain(&value));
                };
                if members.len() < min as usize || members.len() > max as usize {
                    return Err(IllegalMove::ParamCardinality {
                        param: param.name.clone(),
                        min,
                        max,
                        got: members.len(),
                    });
                }
                for (i, member) in members.iter().enumerate() {
                    if !values.contains(member) || members[..i].contains(member) {
                        return Err(out_of_domain(member));
                    }
                }
            }
        }
        bound.push((param.name.clone(), value));
    }
    Ok(bound)
}

/// Checks a submitted move against the pending slot. Returns the move
/// normalized to declared parameter order, with the free flag set by the
/// slot rather than the submitter.
pub(crate) fn check_move(env: Env<'_>, state: &GameState, slot: &Slot, mv: &Move) -> Result<Move, RuntimeError> {
    if mv.seat() != slot.seat() {
        return Err(IllegalMove::WrongSeat {
            expected: slot.seat(),
            got: mv.seat(),
        }
        .into());
    }
    let submitted = match mv {
        Move::Decline { .. } if slot.may_decline() => return Ok(mv.clone()),
        Move::Decline { .. } => return Err(IllegalMove::DeclineNotAllowed.into()),
        Move::Act(submitted) => submitted,
    };

    let seat = submitted.seat;
    let action = env
        .def
        .action(&submitted.action)
        .ok_or_else(|| IllegalMove::UnknownAction(submitted.action.clone()))?;
    if !offered(env, state, slot, action) {
        return Err(IllegalMove::NotOffered {
            action: action.id.clone(),
        }
        .into());
    }
    let params = check_params(env, state, seat, action, &submitted.params)?;
    if !pre_holds(env, state, seat, action, &params) {
        return Err(IllegalMove::PreconditionFailed {
            action: action.id.clone(),
        }
        .into());
    }

    let special = match &submitted.special {
        None => None,
        Some(sp) => {
            let not_allowed = || IllegalMove::SpecialNotAllowed {
                action: action.id.clone(),
                special: sp.action.clone(),
            };
            let compound = action
                .compound
                .as_ref()
                .filter(|c| c.specials.contains(&sp.action))
                .ok_or_else(not_allowed)?;
            let special = env
                .def
                .action(&sp.action)
                .ok_or_else(|| IllegalMove::UnknownAction(sp.action.clone()))?;
            let seat_name = env.def.seat_name(seat).unwrap_or_default();
            if !special.allows_seat(seat_name) || !special.allows_phase(&state.progress.phase) {
                return Err(not_allowed().into());
            }
            let special_params = check_params(env, state, seat, special, &sp.params)?;
            if !pre_holds(env, state, seat, special, &special_params) {
                return Err(IllegalMove::PreconditionFailed {
                    action: special.id.clone(),
                }
                .into());
            }
            Some((
                SpecialMove {
                    action: special.id.clone(),
                    params: special_params,
                },
                &compound.constraints,
            ))
        }
    };

    let (special, constraints) = match special {
        Some((special, constraints)) => (Some(special), constraints.as_slice()),
        None => (None, &[][..]),
    };
    let normalized = ActionMove {
        seat,
        action: action.id.clone(),
        params,
        special,
        free: matches!(slot, Slot::Grant { .. }),
    };
    pipeline::check_constraints(constraints, &normalized)?;
    option_matrix(env, state, slot, move_class(env, &normalized))?;
    Ok(Move::Act(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn subsets_come_smallest_first_in_index_order() {
        let mut seen = Vec::new();
        subsets(&ints(&[1, 2, 3]), 1, 2, &mut |v| {
            seen.push(v);
            true
        });
        let expected: Vec<Value> = [
            vec![1],
            vec![2],
            vec![3],
            vec![1, 2],
            vec![1, 3],
            vec![2, 3],
        ]
        .into_iter()
        .map(|s| Value::List(ints(&s)))
        .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn empty_subset_is_offered_when_min_is_zero() {
        let mut seen = Vec::new();
        subsets(&ints(&[7]), 0, 5, &mut |v| {
            seen.push(v);
            true
        });
        assert_eq!(seen, vec![Value::List(Vec::new()), Value::List(ints(&[7]))]);
    }

    #[test]
    fn subsets_stop_when_asked() {
        let mut calls = 0;
        let finished = subsets(&ints(&[1, 2, 3, 4]), 2, 2, &mut |_| {
            calls += 1;
            calls < 3
        });
        assert!(!finished);
        assert_eq!(calls, 3);
    }
}
