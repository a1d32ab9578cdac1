use crate::def::{CmpOp, Cond};
use crate::state::{Value, ValueKind};

use super::{EvalCtx, EvalError, domain, expr, zone};

pub fn cond(ctx: &EvalCtx<'_>, c: &Cond) -> Result<bool, EvalError> {
    match c {
        Cond::Const(b) => Ok(*b),
        Cond::Cmp { op, lhs, rhs } => {
            let a = expr(ctx, lhs)?;
            let b = expr(ctx, rhs)?;
            compare(*op, &a, &b)
        }
        Cond::And(parts) => {
            for part in parts {
                if !cond(ctx, part)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Cond::Or(parts) => {
            for part in parts {
                if cond(ctx, part)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Cond::Not(inner) => cond(ctx, inner).map(|b| !b),
        Cond::In { item, set } => {
            let item = expr(ctx, item)?;
            let members = domain(ctx, set)?;
            // A list item is a subset test.
            Ok(item.members().iter().all(|m| members.contains(m)))
        }
        Cond::Adjacent { a, b } => {
            let a = zone(ctx, a)?;
            let b = zone(ctx, b)?;
            Ok(ctx.def.adjacent(a, b))
        }
        Cond::Truthy(e) => {
            let value = expr(ctx, e)?;
            value
                .as_bool()
                .ok_or_else(|| EvalError::kind(ValueKind::Bool, &value))
        }
    }
}

/// Scalar equality with kind checking. Lists never compare.
pub fn values_equal(a: &Value, b: &Value) -> Result<bool, EvalError> {
    compare(CmpOp::Eq, a, b)
}

fn compare(op: CmpOp, a: &Value, b: &Value) -> Result<bool, EvalError> {
    if matches!(a, Value::List(_)) || matches!(b, Value::List(_)) {
        return Err(EvalError::ListComparison);
    }
    if a.kind() != b.kind() {
        return Err(EvalError::kind(a.kind(), b));
    }
    match op {
        CmpOp::Eq => Ok(a == b),
        CmpOp::Ne => Ok(a != b),
        _ => {
            let (Some(x), Some(y)) = (a.as_int(), b.as_int()) else {
                return Err(EvalError::kind(ValueKind::Int, a));
            };
            let ord = x.cmp(&y);
            Ok(match op {
                CmpOp::Lt => ord.is_lt(),
                CmpOp::Le => ord.is_le(),
                CmpOp::Gt => ord.is_gt(),
                CmpOp::Ge => ord.is_ge(),
                CmpOp::Eq => ord.is_eq(),
                CmpOp::Ne => ord.is_ne(),
            })
        }
    }
}
