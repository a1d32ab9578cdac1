//! Value expressions, conditions and domains.
//!
//! These are closed trees: adding a node kind means extending the enum and
//! every exhaustive match over it (evaluator, resolver, validator).

use crate::state::Value;

use super::refs::{PlayerSel, VarRef, ZoneRef};

/// Integer arithmetic operators. All division variants fail on a zero divisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    /// Truncating division.
    Div,
    FloorDiv,
    CeilDiv,
    /// Euclidean remainder.
    Mod,
    Min,
    Max,
}

impl ArithOp {
    pub const fn is_division(self) -> bool {
        matches!(self, Self::Div | Self::FloorDiv | Self::CeilDiv | Self::Mod)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum AggOp {
    Count,
    Sum,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Filter applied to tokens of a zone.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenFilter {
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub owner: Option<PlayerSel>,
}

impl TokenFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            owner: None,
        }
    }

    pub fn owned_by(mut self, owner: PlayerSel) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Value expression.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    Lit(Value),
    /// Local binding introduced by a parameter, choice, loop or reduction.
    Bound(String),
    Var(VarRef),
    /// Static attribute declared on a zone.
    ZoneAttr { zone: ZoneRef, attr: String },
    TokenProp { token: Box<Expr>, prop: String },
    /// Marker state name of a space marker.
    Marker { zone: ZoneRef, lattice: String },
    /// Numeric value of the space marker's current state.
    MarkerValue { zone: ZoneRef, lattice: String },
    GlobalMarker(String),
    GlobalMarkerValue(String),
    TokenCount { zone: ZoneRef, filter: TokenFilter },
    Aggregate {
        op: AggOp,
        over: Domain,
        bind: String,
        #[cfg_attr(feature = "serde", serde(default))]
        value: Option<Box<Expr>>,
    },
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    If {
        when: Box<Cond>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    TableCell {
        table: String,
        row: Box<Expr>,
        column: String,
    },
    /// Collects a resolved domain into a list value.
    Collect(Domain),
    /// The seat currently acting.
    ActiveSeat,
    /// Property of the card currently in play (card-driven turn order only).
    CurrentCard(String),
    Metric(String),
    /// Victory marker minus threshold for the named seat.
    VictoryMargin(String),
    /// First item after `anchor` in `source` order for which `when` holds.
    NextInOrder {
        source: Domain,
        anchor: Box<Expr>,
        bind: String,
        when: Box<Cond>,
        #[cfg_attr(feature = "serde", serde(default))]
        wrap: bool,
    },
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Self::Lit(Value::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::Lit(Value::Bool(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::Lit(Value::Str(value.into()))
    }

    pub fn bound(name: impl Into<String>) -> Self {
        Self::Bound(name.into())
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::Var(VarRef::Global(name.into()))
    }

    pub fn arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Arith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Folds literal-only integer arithmetic. Returns `None` for anything
    /// that depends on state or bindings.
    pub fn const_int(&self) -> Option<i64> {
        match self {
            Expr::Lit(Value::Int(v)) => Some(*v),
            Expr::Arith { op, lhs, rhs } => {
                let a = lhs.const_int()?;
                let b = rhs.const_int()?;
                crate::eval::arith(*op, a, b).ok()
            }
            _ => None,
        }
    }
}

/// Boolean condition.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cond {
    Const(bool),
    Cmp { op: CmpOp, lhs: Expr, rhs: Expr },
    And(Vec<Cond>),
    Or(Vec<Cond>),
    Not(Box<Cond>),
    /// Membership of `item` in a resolved domain.
    In { item: Expr, set: Domain },
    Adjacent { a: ZoneRef, b: ZoneRef },
    /// Truthiness of a boolean expression.
    Truthy(Expr),
}

impl Cond {
    pub fn cmp(op: CmpOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Cmp { op, lhs, rhs }
    }

    pub fn equals(lhs: Expr, rhs: Expr) -> Self {
        Self::cmp(CmpOp::Eq, lhs, rhs)
    }
}

/// Source of candidate values for parameters, choices, loops and aggregates.
///
/// Resolution order is deterministic for every variant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Domain {
    /// Players in ascending seat order.
    Players,
    /// Zones in declaration order.
    Zones,
    /// Tokens in zone order.
    TokensIn { zone: ZoneRef, filter: TokenFilter },
    /// Neighbours in adjacency-arena order.
    Adjacent(ZoneRef),
    /// Inclusive integer range; empty when `min > max`.
    IntRange { min: Box<Expr>, max: Box<Expr> },
    /// Row indices of a declared table.
    TableRows(String),
    Enum(Vec<Value>),
    Concat(Vec<Domain>),
    Filter {
        source: Box<Domain>,
        bind: String,
        when: Box<Cond>,
    },
    /// A list value already bound in scope.
    Bound(String),
}

impl Domain {
    pub fn filter(source: Domain, bind: impl Into<String>, when: Cond) -> Self {
        Self::Filter {
            source: Box::new(source),
            bind: bind.into(),
            when: Box::new(when),
        }
    }

    pub fn range(min: i64, max: i64) -> Self {
        Self::IntRange {
            min: Box::new(Expr::int(min)),
            max: Box::new(Expr::int(max)),
        }
    }
}
