//! Expression evaluator and domain resolver.
//!
//! Evaluation is a pure function of `(definition, state, bindings)`. The
//! effect interpreter owns the mutable [`Scope`]; evaluation borrows it and
//! layers short-lived local bindings on top (aggregate items, filter items)
//! through [`Bindings`], without cloning the scope.
mod cond;
mod domain;
pub(crate) mod expr;
mod scope;

pub use cond::{cond, values_equal};
pub use domain::domain;
pub use expr::{expr, int, player, var_slot, zone};
pub use scope::Scope;

use crate::def::{ArithOp, ValidatedDef};
use crate::state::{GameState, PlayerId, TokenId, Value, ValueKind};

/// Largest integer range a domain may enumerate.
pub const MAX_RANGE_SPAN: i64 = 1 << 16;

/// Nesting limit for metric formulas referencing other metrics.
const MAX_METRIC_DEPTH: u8 = 16;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("`{0}` is not bound")]
    Unbound(String),

    #[error("expected {expected}, found {found}")]
    Kind { expected: ValueKind, found: ValueKind },

    #[error("list values cannot be compared as scalars")]
    ListComparison,

    #[error("unknown {what} `{name}`")]
    Unknown { what: String, name: String },

    #[error("seat `{0}` is not seated")]
    Unseated(String),

    #[error("no active seat")]
    NoActiveSeat,

    #[error("no card in play")]
    NoCurrentCard,

    #[error("token {0} does not exist")]
    TokenMissing(TokenId),

    #[error("token {token} has no property `{prop}`")]
    MissingProp { token: TokenId, prop: String },

    #[error("zone `{zone}` has no attribute `{attr}`")]
    MissingAttr { zone: String, attr: String },

    #[error("row {row} is out of range for table `{table}`")]
    RowOutOfRange { table: String, row: i64 },

    #[error("{op} over an empty domain")]
    EmptyAggregate { op: String },

    #[error("anchor {0} is not in the source order")]
    AnchorNotInSource(Value),

    #[error("range {min}..={max} is too large to enumerate")]
    RangeTooLarge { min: i64, max: i64 },

    #[error("metric `{0}` nests too deeply")]
    MetricDepth(String),
}

impl EvalError {
    pub(crate) fn unknown(what: &str, name: impl Into<String>) -> Self {
        Self::Unknown {
            what: what.to_owned(),
            name: name.into(),
        }
    }

    pub(crate) fn kind(expected: ValueKind, found: &Value) -> Self {
        Self::Kind {
            expected,
            found: found.kind(),
        }
    }
}

/// Name lookup chain: the interpreter scope at the root, local bindings above.
#[derive(Clone, Copy, Debug)]
pub enum Bindings<'a> {
    Root(&'a Scope),
    Local {
        name: &'a str,
        value: &'a Value,
        parent: &'a Bindings<'a>,
    },
}

impl<'a> Bindings<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        match *self {
            Bindings::Root(scope) => scope.get(name),
            Bindings::Local {
                name: bound,
                value,
                parent,
            } => {
                if bound == name {
                    Some(value)
                } else {
                    parent.get(name)
                }
            }
        }
    }
}

static EMPTY_SCOPE: Scope = Scope::new();

/// Everything an expression can observe.
#[derive(Clone, Copy, Debug)]
pub struct EvalCtx<'a> {
    pub def: &'a ValidatedDef,
    pub state: &'a GameState,
    pub bindings: Bindings<'a>,
    /// Seat resolving `PlayerSel::Active` and `Expr::ActiveSeat`.
    pub active: Option<PlayerId>,
    metric_depth: u8,
}

impl<'a> EvalCtx<'a> {
    pub fn new(
        def: &'a ValidatedDef,
        state: &'a GameState,
        scope: &'a Scope,
        active: Option<PlayerId>,
    ) -> Self {
        Self {
            def,
            state,
            bindings: Bindings::Root(scope),
            active,
            metric_depth: 0,
        }
    }

    /// Context with no bindings, for metrics and terminal checks.
    pub fn pure(def: &'a ValidatedDef, state: &'a GameState) -> Self {
        Self::new(def, state, &EMPTY_SCOPE, None)
    }

    /// Child context with one extra local binding.
    pub fn bind<'b>(&'b self, name: &'b str, value: &'b Value) -> EvalCtx<'b>
    where
        'a: 'b,
    {
        EvalCtx {
            def: self.def,
            state: self.state,
            bindings: Bindings::Local {
                name,
                value,
                parent: &self.bindings,
            },
            active: self.active,
            metric_depth: self.metric_depth,
        }
    }

    pub fn lookup(&self, name: &str) -> Result<&'a Value, EvalError> {
        self.bindings
            .get(name)
            .ok_or_else(|| EvalError::Unbound(name.to_owned()))
    }

    pub fn active(&self) -> Result<PlayerId, EvalError> {
        self.active.ok_or(EvalError::NoActiveSeat)
    }

    /// Pure context one metric level deeper.
    pub(crate) fn nested_metric(&self, id: &str) -> Result<EvalCtx<'a>, EvalError> {
        if self.metric_depth >= MAX_METRIC_DEPTH {
            return Err(EvalError::MetricDepth(id.to_owned()));
        }
        let mut ctx = EvalCtx::pure(self.def, self.state);
        ctx.metric_depth = self.metric_depth + 1;
        Ok(ctx)
    }
}

/// Integer arithmetic with explicit failure on zero divisors and overflow.
pub fn arith(op: ArithOp, a: i64, b: i64) -> Result<i64, EvalError> {
    if op.is_division() && b == 0 {
        return Err(EvalError::DivisionByZero);
    }
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => a.checked_div(b),
        ArithOp::FloorDiv => a.checked_div(b).map(|q| {
            let r = a - q * b;
            if r != 0 && ((r > 0) != (b > 0)) { q - 1 } else { q }
        }),
        ArithOp::CeilDiv => a.checked_div(b).map(|q| {
            let r = a - q * b;
            if r != 0 && ((r > 0) == (b > 0)) { q + 1 } else { q }
        }),
        ArithOp::Mod => a.checked_rem_euclid(b),
        ArithOp::Min => Some(a.min(b)),
        ArithOp::Max => Some(a.max(b)),
    };
    result.ok_or(EvalError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_variants_round_as_named() {
        assert_eq!(arith(ArithOp::Div, -7, 2), Ok(-3));
        assert_eq!(arith(ArithOp::FloorDiv, -7, 2), Ok(-4));
        assert_eq!(arith(ArithOp::FloorDiv, 7, -2), Ok(-4));
        assert_eq!(arith(ArithOp::FloorDiv, -7, -2), Ok(3));
        assert_eq!(arith(ArithOp::CeilDiv, 7, 2), Ok(4));
        assert_eq!(arith(ArithOp::CeilDiv, -7, 2), Ok(-3));
        assert_eq!(arith(ArithOp::CeilDiv, 7, -2), Ok(-3));
        assert_eq!(arith(ArithOp::Mod, -7, 3), Ok(2));
    }

    #[test]
    fn zero_divisor_fails_for_every_division() {
        for op in [ArithOp::Div, ArithOp::FloorDiv, ArithOp::CeilDiv, ArithOp::Mod] {
            assert_eq!(arith(op, 5, 0), Err(EvalError::DivisionByZero));
        }
        assert_eq!(arith(ArithOp::Mul, 5, 0), Ok(0));
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(arith(ArithOp::Add, i64::MAX, 1), Err(EvalError::Overflow));
    }
}
