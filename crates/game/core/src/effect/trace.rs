//! Effect trace: the audit record of a transition.
//!
//! Entries are totally ordered by execution. The rendering layer consumes
//! nothing else.

use std::fmt;

use crate::state::{PlayerId, TokenId, Value, ZoneId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum EventContext {
    ActionEffect,
    TriggerEffect,
}

/// Location of an effect node inside its stage or trigger body.
///
/// Rendered as `root/index:kind`, with `[i]` appended for loop iterations,
/// e.g. `train.place/1:for_each[2]/0:choose_one`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectPath(String);

impl EffectPath {
    pub fn root(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    pub fn stage(action: &str, stage: &str) -> Self {
        Self(format!("{action}.{stage}"))
    }

    pub fn trigger(id: &str) -> Self {
        Self(format!("trigger:{id}"))
    }

    pub fn child(&self, index: usize, kind: &str) -> Self {
        Self(format!("{}/{index}:{kind}", self.0))
    }

    pub fn iteration(&self, i: usize) -> Self {
        Self(format!("{}[{i}]", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EffectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Provenance {
    pub phase: String,
    pub context: EventContext,
    pub path: EffectPath,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LifecycleEvent {
    PhaseEntered(String),
    PhaseExited(String),
    PhaseJumped(String),
    TriggerFired(String),
    CardPlayed(TokenId),
    CardRevealed(TokenId),
    CardDiscarded(TokenId),
    CoupRoundStarted { final_round: bool },
    CoupRoundSkipped,
    CoupRoundEnded,
    EligibilityReset,
    EligibilityOverride { seat: String, eligible: bool },
    PassRewarded { seat: String, var: String, amount: i64 },
    FreeOperationGranted { seat: PlayerId, actions: Vec<String> },
    PivotalResolved { seat: String, action: String, canceled: Vec<String> },
    TurnEnded(u32),
    GameOver,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TraceKind {
    MoveToken {
        token: TokenId,
        from: ZoneId,
        to: ZoneId,
    },
    CreateToken {
        token: TokenId,
        kind: String,
        zone: ZoneId,
    },
    DestroyToken {
        token: TokenId,
        zone: ZoneId,
    },
    SetTokenProp {
        token: TokenId,
        prop: String,
        before: Option<Value>,
        after: Value,
    },
    VarChange {
        var: String,
        before: Value,
        after: Value,
    },
    ResourceTransfer {
        from: String,
        to: String,
        requested: i64,
        actual: i64,
    },
    MarkerChange {
        /// `None` for global markers.
        zone: Option<ZoneId>,
        lattice: String,
        before: String,
        after: String,
    },
    Visibility {
        zone: ZoneId,
        concealed: bool,
        to: Option<PlayerId>,
    },
    Shuffle {
        zone: ZoneId,
    },
    Choice {
        decision: String,
        value: Value,
    },
    Roll {
        binder: String,
        value: i64,
    },
    Lifecycle(LifecycleEvent),
    ForEach {
        binder: String,
        iterations: usize,
    },
    Reduce {
        result: String,
        value: Value,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    pub provenance: Provenance,
    pub kind: TraceKind,
}

impl TraceEntry {
    pub fn new(phase: &str, context: EventContext, path: &EffectPath, kind: TraceKind) -> Self {
        Self {
            provenance: Provenance {
                phase: phase.to_owned(),
                context,
                path: path.clone(),
            },
            kind,
        }
    }
}
