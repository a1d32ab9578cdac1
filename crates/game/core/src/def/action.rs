//! Action, pipeline and trigger declarations.

use super::effect::Effect;
use super::expr::{Cond, Domain};

/// Class of a move, as seen by card-driven option matrices.
///
/// `OperationPlusSpecial` is never declared on an action: it is the class of
/// an `Operation` move submitted together with a special activity.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum MoveClass {
    Operation,
    OperationPlusSpecial,
    LimitedOperation,
    /// Only runs as the compound half of an operation.
    Special,
    Event,
    Pass,
    /// Only offered through the pivotal interrupt window.
    Pivotal,
    Other,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamDef {
    pub name: String,
    pub domain: Domain,
    /// When set, the parameter holds a list of `min..=max` distinct members
    /// of the domain instead of a single member.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cardinality: Option<(u32, u32)>,
}

impl ParamDef {
    pub fn one(name: impl Into<String>, domain: Domain) -> Self {
        Self {
            name: name.into(),
            domain,
            cardinality: None,
        }
    }

    pub fn many(name: impl Into<String>, domain: Domain, min: u32, max: u32) -> Self {
        Self {
            name: name.into(),
            domain,
            cardinality: Some((min, max)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StageDef {
    pub id: String,
    pub effects: Vec<Effect>,
}

impl StageDef {
    pub fn new(id: impl Into<String>, effects: Vec<Effect>) -> Self {
        Self {
            id: id.into(),
            effects,
        }
    }
}

/// When a special activity runs relative to the operation's stages.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpecialTiming {
    Before,
    After,
    /// Runs right after `after_stage`. With `replace_remaining` the
    /// operation's later stages are dropped.
    During {
        after_stage: String,
        #[cfg_attr(feature = "serde", serde(default))]
        replace_remaining: bool,
    },
}

/// Relation between an operation parameter and a special-activity parameter,
/// both read as sets of members.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompoundConstraint {
    Disjoint { operation: String, special: String },
    /// Every special target is also an operation target.
    Subset { special: String, operation: String },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompoundDef {
    /// Special-class actions that may accompany the operation.
    pub specials: Vec<String>,
    pub timing: SpecialTiming,
    #[cfg_attr(feature = "serde", serde(default))]
    pub constraints: Vec<CompoundConstraint>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionDef {
    pub id: String,
    pub class: MoveClass,
    /// Seats allowed to take the action. Empty means every seat.
    #[cfg_attr(feature = "serde", serde(default))]
    pub actors: Vec<String>,
    /// Phases the action is offered in. Empty means every phase.
    #[cfg_attr(feature = "serde", serde(default))]
    pub phases: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: Vec<ParamDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pre: Option<Cond>,
    /// Paid before the first stage unless the move is a free operation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cost: Vec<Effect>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stages: Vec<StageDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub compound: Option<CompoundDef>,
}

impl ActionDef {
    pub fn new(id: impl Into<String>, class: MoveClass) -> Self {
        Self {
            id: id.into(),
            class,
            actors: Vec::new(),
            phases: Vec::new(),
            params: Vec::new(),
            pre: None,
            cost: Vec::new(),
            stages: Vec::new(),
            compound: None,
        }
    }

    pub fn actors<I, S>(mut self, seats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actors = seats.into_iter().map(Into::into).collect();
        self
    }

    pub fn phases<I, S>(mut self, phases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phases = phases.into_iter().map(Into::into).collect();
        self
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    pub fn pre(mut self, cond: Cond) -> Self {
        self.pre = Some(cond);
        self
    }

    pub fn cost(mut self, effects: Vec<Effect>) -> Self {
        self.cost = effects;
        self
    }

    pub fn stage(mut self, id: impl Into<String>, effects: Vec<Effect>) -> Self {
        self.stages.push(StageDef::new(id, effects));
        self
    }

    pub fn compound(mut self, compound: CompoundDef) -> Self {
        self.compound = Some(compound);
        self
    }

    pub fn allows_seat(&self, seat: &str) -> bool {
        self.actors.is_empty() || self.actors.iter().any(|s| s == seat)
    }

    pub fn allows_phase(&self, phase: &str) -> bool {
        self.phases.is_empty() || self.phases.iter().any(|p| p == phase)
    }
}

/// Lifecycle event a trigger listens for.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerEvent {
    PhaseEnter(String),
    PhaseExit(String),
    ActionResolved(String),
    /// A new card became the played card.
    CardPlayed,
    /// Raised by `Effect::FireEvent`.
    Custom(String),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerDef {
    pub id: String,
    pub on: TriggerEvent,
    #[cfg_attr(feature = "serde", serde(default))]
    pub when: Option<Cond>,
    pub effects: Vec<Effect>,
}
