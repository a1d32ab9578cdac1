//! Declarative game definition.
//!
//! [`GameDef`] is plain data: it can be built in code or deserialized (with
//! the `serde` feature) and is never interpreted directly. The kernel only
//! accepts a [`ValidatedDef`], which [`crate::validate`] produces after the
//! structural checks pass.
pub mod action;
pub mod effect;
pub mod expr;
pub mod markers;
pub mod refs;
pub mod setup;
pub mod turn;
pub mod validated;
pub mod vars;
pub mod victory;
pub mod zones;

use std::collections::BTreeMap;

pub use action::{
    ActionDef, CompoundConstraint, CompoundDef, MoveClass, ParamDef, SpecialTiming, StageDef,
    TriggerDef, TriggerEvent,
};
pub use effect::{ChoiceSpec, Effect, TokenProbe};
pub use expr::{AggOp, ArithOp, CmpOp, Cond, Domain, Expr, TokenFilter};
pub use markers::{LatticeDef, MarkerScope, MarkerState};
pub use refs::{PlayerSel, VarRef, ZoneRef};
pub use setup::{MarkerInit, Placement, SetupDef};
pub use turn::{
    Cancellation, CardDrivenDef, CardZones, CoupDef, Discipline, OptionRow, PassReward,
    PivotalDef, PivotalSel, TurnDef, TurnOrderDef,
};
pub use validated::ValidatedDef;
pub use vars::{VarDef, VarKind, VarScope};
pub use victory::{
    MetricDef, Outcome, PieceMatch, StackingDef, StackingRule, TerminalDef, VictoryDef,
};
pub use zones::{TokenTypeDef, Visibility, ZoneDef, ZoneKind, ZoneMatch};

use crate::state::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerRange {
    pub min: u8,
    pub max: u8,
}

impl PlayerRange {
    pub const fn contains(&self, count: u8) -> bool {
        count >= self.min && count <= self.max
    }
}

/// Lookup table with named columns. Rows are addressed by index.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableDef {
    pub id: String,
    pub rows: Vec<BTreeMap<String, Value>>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameDef {
    pub id: String,
    /// Seats in declaration order. Player `n` occupies seat `n`.
    pub seats: Vec<String>,
    pub players: PlayerRange,
    #[cfg_attr(feature = "serde", serde(default))]
    pub zones: Vec<ZoneDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub token_types: Vec<TokenTypeDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub globals: Vec<VarDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub player_vars: Vec<VarDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub zone_vars: Vec<VarDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lattices: Vec<LatticeDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tables: Vec<TableDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub actions: Vec<ActionDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub triggers: Vec<TriggerDef>,
    pub turn: TurnDef,
    #[cfg_attr(feature = "serde", serde(default))]
    pub terminals: Vec<TerminalDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub metrics: Vec<MetricDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub victory: Vec<VictoryDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stacking: Vec<StackingDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub setup: SetupDef,
}

impl GameDef {
    /// Empty definition with the given seats and a round-robin turn over one
    /// phase. Builders fill in the rest.
    pub fn new<I, S>(id: impl Into<String>, seats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let seats: Vec<String> = seats.into_iter().map(Into::into).collect();
        let count = u8::try_from(seats.len()).unwrap_or(u8::MAX);
        Self {
            id: id.into(),
            seats,
            players: PlayerRange {
                min: count,
                max: count,
            },
            zones: Vec::new(),
            token_types: Vec::new(),
            globals: Vec::new(),
            player_vars: Vec::new(),
            zone_vars: Vec::new(),
            lattices: Vec::new(),
            tables: Vec::new(),
            actions: Vec::new(),
            triggers: Vec::new(),
            turn: TurnDef {
                phases: vec!["main".to_owned()],
                order: TurnOrderDef::RoundRobin,
            },
            terminals: Vec::new(),
            metrics: Vec::new(),
            victory: Vec::new(),
            stacking: Vec::new(),
            setup: SetupDef::default(),
        }
    }

    pub fn vars(&self, scope: VarScope) -> &[VarDef] {
        match scope {
            VarScope::Global => &self.globals,
            VarScope::Player => &self.player_vars,
            VarScope::Zone => &self.zone_vars,
        }
    }
}
