//! Derived metrics, victory markers, terminal conditions and stacking limits.

use super::expr::{Cond, Expr};
use super::zones::ZoneMatch;

/// Named formula evaluated against state alone.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricDef {
    pub id: String,
    pub formula: Expr,
}

/// Per-seat victory marker and the threshold it is measured against.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VictoryDef {
    pub seat: String,
    pub formula: Expr,
    pub threshold: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    Seat(String),
    Draw,
    /// Seat whose victory marker exceeds its threshold by the most; ties go to
    /// the earlier declared seat.
    #[default]
    HighestVictoryMargin,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerminalDef {
    pub id: String,
    pub when: Cond,
    pub outcome: Outcome,
}

/// Pieces counted by a stacking constraint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PieceMatch {
    /// Token types; empty matches every type.
    #[cfg_attr(feature = "serde", serde(default))]
    pub kinds: Vec<String>,
    /// Owning seat.
    #[cfg_attr(feature = "serde", serde(default))]
    pub owner: Option<String>,
}

impl PieceMatch {
    pub fn kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
            owner: None,
        }
    }

    pub fn matches(&self, kind: &str, owner: Option<&str>) -> bool {
        (self.kinds.is_empty() || self.kinds.iter().any(|k| k == kind))
            && self.owner.as_deref().is_none_or(|o| owner == Some(o))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StackingRule {
    MaxCount(u32),
    Prohibit,
}

impl StackingRule {
    pub const fn limit(self) -> u32 {
        match self {
            StackingRule::MaxCount(k) => k,
            StackingRule::Prohibit => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackingDef {
    pub id: String,
    /// Zones the constraint applies to. `None` means every space.
    #[cfg_attr(feature = "serde", serde(default))]
    pub zones: Option<ZoneMatch>,
    pub pieces: PieceMatch,
    pub rule: StackingRule,
}
