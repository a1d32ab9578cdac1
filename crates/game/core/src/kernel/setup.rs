//! Initial state construction from the scenario setup.

use std::collections::BTreeMap;

use crate::def::{TurnOrderDef, ValidatedDef, VarDef};
use crate::error::SetupError;
use crate::eval::EvalError;
use crate::rng::RngState;
use crate::stacking;
use crate::state::{
    CardDrivenState, GameState, SeatCursor, SimultaneousState, Token, TurnOrderState, Value,
};

fn turn_order(def: &ValidatedDef) -> TurnOrderState {
    match &def.def().turn.order {
        TurnOrderDef::RoundRobin => TurnOrderState::RoundRobin(SeatCursor::default()),
        TurnOrderDef::FixedOrder(_) => TurnOrderState::FixedOrder(SeatCursor::default()),
        TurnOrderDef::Simultaneous => TurnOrderState::Simultaneous(SimultaneousState::default()),
        TurnOrderDef::CardDriven(_) => {
            TurnOrderState::CardDriven(Box::new(CardDrivenState::new(&def.def().seats)))
        }
    }
}

fn initial_vars(decls: &[VarDef], overrides: Option<&BTreeMap<String, Value>>) -> BTreeMap<String, Value> {
    let mut vars: BTreeMap<String, Value> = decls
        .iter()
        .map(|v| (v.name.clone(), v.init.clone()))
        .collect();
    if let Some(overrides) = overrides {
        for (name, value) in overrides {
            let value = match (decls.iter().find(|v| v.name == *name), value) {
                (Some(decl), Value::Int(n)) => Value::Int(decl.clamp(*n)),
                (_, value) => value.clone(),
            };
            vars.insert(name.clone(), value);
        }
    }
    vars
}

/// Builds the state before any automatic turn-flow step runs.
pub(crate) fn build(def: &ValidatedDef, seed: u64, player_count: u8) -> Result<GameState, SetupError> {
    let game = def.def();
    if !game.players.contains(player_count) {
        return Err(SetupError::PlayerCount {
            count: player_count,
            min: game.players.min,
            max: game.players.max,
        });
    }

    let mut state = GameState::new(
        player_count,
        game.zones.len(),
        turn_order(def),
        RngState::new(seed),
    );
    state.progress.phase = match &game.turn.order {
        TurnOrderDef::CardDriven(cd) => cd.main_phase.clone(),
        _ => game.turn.phases.first().cloned().unwrap_or_default(),
    };

    let setup = &game.setup;
    state.globals = initial_vars(&game.globals, Some(&setup.globals));
    for player in state.players() {
        let seat = def.seat_name(player).unwrap_or_default();
        let vars = initial_vars(&game.player_vars, setup.player_vars.get(seat));
        if let Some(slot) = state.player_vars.get_mut(player.index()) {
            *slot = vars;
        }
    }
    for zone in def.zone_ids() {
        let name = def.zone_name(zone);
        let vars = initial_vars(&game.zone_vars, setup.zone_vars.get(name));
        if let Some(z) = state.zone_mut(zone) {
            z.vars = vars;
        }
    }

    for placement in &setup.tokens {
        let zone = def
            .zone_id(&placement.zone)
            .ok_or_else(|| EvalError::unknown("zone", &placement.zone))?;
        let token_type = def
            .token_type(&placement.kind)
            .ok_or_else(|| EvalError::unknown("token type", &placement.kind))?;
        let owner = match &placement.owner {
            None => None,
            Some(seat) => Some(
                def.seat_id(seat)
                    .filter(|p| p.0 < player_count)
                    .ok_or_else(|| SetupError::UnseatedOwner(seat.clone()))?,
            ),
        };
        let kind = def.zone(zone).map(|z| z.kind).unwrap_or_default();
        for _ in 0..placement.count {
            let mut props = token_type.props.clone();
            props.extend(placement.props.clone());
            let id = state
                .allocate_token_id()
                .ok_or(SetupError::TokenIdsExhausted)?;
            state.tokens.insert(
                id,
                Token {
                    id,
                    kind: placement.kind.clone(),
                    owner,
                    zone,
                    props,
                },
            );
            state.insert_token(zone, kind, id);
        }
    }

    for init in &setup.markers {
        let zone = def
            .zone_id(&init.zone)
            .ok_or_else(|| EvalError::unknown("zone", &init.zone))?;
        if let Some(z) = state.zone_mut(zone) {
            z.markers.insert(init.lattice.clone(), init.state.clone());
        }
    }
    state.global_markers = setup.global_markers.clone();

    for name in &setup.shuffle {
        let zone = def
            .zone_id(name)
            .ok_or_else(|| EvalError::unknown("zone", name))?;
        let mut order = state.zone(zone).map(|z| z.tokens.clone()).unwrap_or_default();
        state.rng.shuffle(&mut order);
        if let Some(z) = state.zone_mut(zone) {
            z.tokens = order;
        }
    }

    if let Some(violation) = stacking::check(def, &state) {
        return Err(SetupError::Stacking {
            constraint: violation.constraint,
            zone: violation.zone,
        });
    }
    tracing::debug!(
        seed,
        player_count,
        tokens = state.tokens.len(),
        "initial state built"
    );
    Ok(state)
}
