use crate::def::Domain;
use crate::state::Value;

use super::expr::{filter_owner, token_matches};
use super::{EvalCtx, EvalError, MAX_RANGE_SPAN, cond, int, zone};

/// Resolves a domain into its members, in a deterministic order.
pub fn domain(ctx: &EvalCtx<'_>, d: &Domain) -> Result<Vec<Value>, EvalError> {
    match d {
        Domain::Players => Ok(ctx.state.players().map(Value::Player).collect()),
        Domain::Zones => Ok(ctx.def.zone_ids().map(Value::Zone).collect()),
        Domain::TokensIn { zone: z, filter } => {
            let id = zone(ctx, z)?;
            let owner = filter_owner(ctx, filter)?;
            Ok(ctx
                .state
                .tokens_in(id)
                .filter(|t| token_matches(t, filter, owner))
                .map(|t| Value::Token(t.id))
                .collect())
        }
        Domain::Adjacent(z) => {
            let id = zone(ctx, z)?;
            Ok(ctx
                .def
                .neighbours(id)
                .iter()
                .copied()
                .map(Value::Zone)
                .collect())
        }
        Domain::IntRange { min, max } => {
            let lo = int(ctx, min)?;
            let hi = int(ctx, max)?;
            if lo > hi {
                return Ok(Vec::new());
            }
            if hi.saturating_sub(lo) >= MAX_RANGE_SPAN {
                return Err(EvalError::RangeTooLarge { min: lo, max: hi });
            }
            Ok((lo..=hi).map(Value::Int).collect())
        }
        Domain::TableRows(table) => {
            let def = ctx
                .def
                .table(table)
                .ok_or_else(|| EvalError::unknown("table", table.clone()))?;
            Ok((0..def.rows.len() as i64).map(Value::Int).collect())
        }
        Domain::Enum(values) => Ok(values.clone()),
        Domain::Concat(parts) => {
            let mut out = Vec::new();
            for part in parts {
                out.extend(domain(ctx, part)?);
            }
            Ok(out)
        }
        Domain::Filter { source, bind, when } => {
            let mut out = Vec::new();
            for item in domain(ctx, source)? {
                if cond(&ctx.bind(bind, &item), when)? {
                    out.push(item);
                }
            }
            Ok(out)
        }
        Domain::Bound(name) => Ok(ctx.lookup(name)?.members()),
    }
}
