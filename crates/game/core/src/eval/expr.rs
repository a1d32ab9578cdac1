use crate::def::{AggOp, Expr, PlayerSel, TokenFilter, VarRef, VarScope, ZoneRef};
use crate::state::{PlayerId, Token, Value, ValueKind, VarSlot, ZoneId};

use super::{EvalCtx, EvalError, arith, cond, domain};

pub fn expr(ctx: &EvalCtx<'_>, e: &Expr) -> Result<Value, EvalError> {
    match e {
        Expr::Lit(v) => Ok(v.clone()),
        Expr::Bound(name) => ctx.lookup(name).cloned(),
        Expr::Var(var) => {
            let slot = var_slot(ctx, var)?;
            ctx.state
                .read_var(&slot)
                .cloned()
                .ok_or_else(|| EvalError::unknown("variable", slot.to_string()))
        }
        Expr::ZoneAttr { zone: z, attr } => {
            let id = zone(ctx, z)?;
            let def = ctx
                .def
                .zone(id)
                .ok_or_else(|| EvalError::unknown("zone", id.to_string()))?;
            def.attrs
                .get(attr)
                .cloned()
                .ok_or_else(|| EvalError::MissingAttr {
                    zone: def.id.clone(),
                    attr: attr.clone(),
                })
        }
        Expr::TokenProp { token, prop } => {
            let token = token_of(ctx, token)?;
            token
                .props
                .get(prop)
                .cloned()
                .ok_or_else(|| EvalError::MissingProp {
                    token: token.id,
                    prop: prop.clone(),
                })
        }
        Expr::Marker { zone: z, lattice } => {
            let id = zone(ctx, z)?;
            marker_state(ctx, id, lattice).map(Value::str)
        }
        Expr::MarkerValue { zone: z, lattice } => {
            let id = zone(ctx, z)?;
            let state = marker_state(ctx, id, lattice)?;
            lattice_value(ctx, lattice, &state)
        }
        Expr::GlobalMarker(marker) => global_marker_state(ctx, marker).map(Value::str),
        Expr::GlobalMarkerValue(marker) => {
            let state = global_marker_state(ctx, marker)?;
            lattice_value(ctx, marker, &state)
        }
        Expr::TokenCount { zone: z, filter } => {
            let id = zone(ctx, z)?;
            let owner = filter_owner(ctx, filter)?;
            let count = ctx
                .state
                .tokens_in(id)
                .filter(|t| token_matches(t, filter, owner))
                .count();
            Ok(Value::Int(count as i64))
        }
        Expr::Aggregate {
            op,
            over,
            bind,
            value,
        } => aggregate(ctx, *op, over, bind, value.as_deref()),
        Expr::Arith { op, lhs, rhs } => {
            let a = int(ctx, lhs)?;
            let b = int(ctx, rhs)?;
            arith(*op, a, b).map(Value::Int)
        }
        Expr::If {
            when,
            then,
            otherwise,
        } => {
            if cond(ctx, when)? {
                expr(ctx, then)
            } else {
                expr(ctx, otherwise)
            }
        }
        Expr::TableCell { table, row, column } => {
            let def = ctx
                .def
                .table(table)
                .ok_or_else(|| EvalError::unknown("table", table.clone()))?;
            let index = int(ctx, row)?;
            let row_map = usize::try_from(index)
                .ok()
                .and_then(|i| def.rows.get(i))
                .ok_or_else(|| EvalError::RowOutOfRange {
                    table: table.clone(),
                    row: index,
                })?;
            row_map
                .get(column)
                .cloned()
                .ok_or_else(|| EvalError::unknown("column", format!("{table}.{column}")))
        }
        Expr::Collect(d) => domain(ctx, d).map(Value::List),
        Expr::ActiveSeat => ctx.active().map(Value::Player),
        Expr::CurrentCard(prop) => {
            let card = ctx
                .state
                .turn_order
                .card_driven()
                .and_then(|cd| cd.current_card)
                .ok_or(EvalError::NoCurrentCard)?;
            let token = ctx
                .state
                .token(card)
                .ok_or(EvalError::TokenMissing(card))?;
            token
                .props
                .get(prop)
                .cloned()
                .ok_or_else(|| EvalError::MissingProp {
                    token: card,
                    prop: prop.clone(),
                })
        }
        Expr::Metric(id) => {
            let metric = ctx
                .def
                .metric(id)
                .ok_or_else(|| EvalError::unknown("metric", id.clone()))?;
            let nested = ctx.nested_metric(id)?;
            expr(&nested, &metric.formula)
        }
        Expr::VictoryMargin(seat) => {
            let victory = ctx
                .def
                .victory(seat)
                .ok_or_else(|| EvalError::unknown("victory marker", seat.clone()))?;
            let nested = ctx.nested_metric(seat)?;
            let marker = int(&nested, &victory.formula)?;
            marker
                .checked_sub(victory.threshold)
                .map(Value::Int)
                .ok_or(EvalError::Overflow)
        }
        Expr::NextInOrder {
            source,
            anchor,
            bind,
            when,
            wrap,
        } => {
            let items = domain(ctx, source)?;
            let anchor = expr(ctx, anchor)?;
            let at = items
                .iter()
                .position(|item| *item == anchor)
                .ok_or_else(|| EvalError::AnchorNotInSource(anchor.clone()))?;
            let after = items.iter().skip(at + 1);
            let before = items.iter().take(if *wrap { at } else { 0 });
            for item in after.chain(before) {
                if cond(&ctx.bind(bind, item), when)? {
                    return Ok(item.clone());
                }
            }
            // No qualifying successor.
            Ok(Value::List(Vec::new()))
        }
    }
}

pub fn int(ctx: &EvalCtx<'_>, e: &Expr) -> Result<i64, EvalError> {
    let value = expr(ctx, e)?;
    value
        .as_int()
        .ok_or_else(|| EvalError::kind(ValueKind::Int, &value))
}

pub fn zone(ctx: &EvalCtx<'_>, z: &ZoneRef) -> Result<ZoneId, EvalError> {
    match z {
        ZoneRef::Named(name) => ctx
            .def
            .zone_id(name)
            .ok_or_else(|| EvalError::unknown("zone", name.clone())),
        ZoneRef::Bound(name) => {
            let value = ctx.lookup(name)?;
            value
                .as_zone()
                .ok_or_else(|| EvalError::kind(ValueKind::Zone, value))
        }
    }
}

pub fn player(ctx: &EvalCtx<'_>, sel: &PlayerSel) -> Result<PlayerId, EvalError> {
    match sel {
        PlayerSel::Active => ctx.active(),
        PlayerSel::Seat(seat) => {
            let id = ctx
                .def
                .seat_id(seat)
                .ok_or_else(|| EvalError::unknown("seat", seat.clone()))?;
            if id.0 < ctx.state.player_count {
                Ok(id)
            } else {
                Err(EvalError::Unseated(seat.clone()))
            }
        }
        PlayerSel::Bound(name) => {
            let value = ctx.lookup(name)?;
            value
                .as_player()
                .ok_or_else(|| EvalError::kind(ValueKind::Player, value))
        }
    }
}

pub fn var_slot(ctx: &EvalCtx<'_>, var: &VarRef) -> Result<VarSlot, EvalError> {
    Ok(match var {
        VarRef::Global(name) => VarSlot::Global(name.clone()),
        VarRef::Player { player: p, var } => VarSlot::Player(player(ctx, p)?, var.clone()),
        VarRef::Zone { zone: z, var } => VarSlot::Zone(zone(ctx, z)?, var.clone()),
    })
}

pub(crate) fn slot_scope(slot: &VarSlot) -> VarScope {
    match slot {
        VarSlot::Global(_) => VarScope::Global,
        VarSlot::Player(..) => VarScope::Player,
        VarSlot::Zone(..) => VarScope::Zone,
    }
}

pub(crate) fn token_of<'a>(ctx: &EvalCtx<'a>, e: &Expr) -> Result<&'a Token, EvalError> {
    let value = expr(ctx, e)?;
    let id = value
        .as_token()
        .ok_or_else(|| EvalError::kind(ValueKind::Token, &value))?;
    ctx.state.token(id).ok_or(EvalError::TokenMissing(id))
}

pub(crate) fn filter_owner(
    ctx: &EvalCtx<'_>,
    filter: &TokenFilter,
) -> Result<Option<PlayerId>, EvalError> {
    filter.owner.as_ref().map(|sel| player(ctx, sel)).transpose()
}

pub(crate) fn token_matches(token: &Token, filter: &TokenFilter, owner: Option<PlayerId>) -> bool {
    filter.kind.as_deref().is_none_or(|k| token.kind == k)
        && owner.is_none_or(|o| token.owner == Some(o))
}

/// Current state of a space marker, falling back to the lattice default on
/// zones it applies to.
pub(crate) fn marker_state(
    ctx: &EvalCtx<'_>,
    zone: ZoneId,
    lattice: &str,
) -> Result<String, EvalError> {
    if let Some(state) = ctx.state.marker(zone, lattice) {
        return Ok(state.to_owned());
    }
    let def = ctx
        .def
        .lattice(lattice)
        .ok_or_else(|| EvalError::unknown("marker lattice", lattice))?;
    Ok(def.default.clone())
}

pub(crate) fn global_marker_state(ctx: &EvalCtx<'_>, marker: &str) -> Result<String, EvalError> {
    if let Some(state) = ctx.state.global_marker(marker) {
        return Ok(state.to_owned());
    }
    let def = ctx
        .def
        .lattice(marker)
        .ok_or_else(|| EvalError::unknown("marker lattice", marker))?;
    Ok(def.default.clone())
}

fn lattice_value(ctx: &EvalCtx<'_>, lattice: &str, state: &str) -> Result<Value, EvalError> {
    ctx.def
        .lattice(lattice)
        .and_then(|l| l.value_of(state))
        .map(Value::Int)
        .ok_or_else(|| EvalError::unknown("marker state", format!("{lattice}.{state}")))
}

fn aggregate(
    ctx: &EvalCtx<'_>,
    op: AggOp,
    over: &crate::def::Domain,
    bind: &str,
    value: Option<&Expr>,
) -> Result<Value, EvalError> {
    let items = domain(ctx, over)?;
    if op == AggOp::Count {
        return Ok(Value::Int(items.len() as i64));
    }

    let mut values = Vec::with_capacity(items.len());
    for item in &items {
        let v = match value {
            Some(e) => int(&ctx.bind(bind, item), e)?,
            None => item
                .as_int()
                .ok_or_else(|| EvalError::kind(ValueKind::Int, item))?,
        };
        values.push(v);
    }

    let result = match op {
        AggOp::Count => Some(values.len() as i64),
        AggOp::Sum => {
            let mut total: i64 = 0;
            for v in values {
                total = total.checked_add(v).ok_or(EvalError::Overflow)?;
            }
            Some(total)
        }
        AggOp::Min => values.into_iter().min(),
        AggOp::Max => values.into_iter().max(),
    };
    result
        .map(Value::Int)
        .ok_or_else(|| EvalError::EmptyAggregate { op: op.to_string() })
}
