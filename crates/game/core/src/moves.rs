//! Moves submitted by seats.

use std::fmt;

use crate::state::{PlayerId, Value};

/// Special activity attached to an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpecialMove {
    pub action: String,
    /// Parameter values in declared order.
    pub params: Vec<(String, Value)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionMove {
    pub seat: PlayerId,
    pub action: String,
    /// Parameter values in declared order.
    pub params: Vec<(String, Value)>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub special: Option<SpecialMove>,
    /// Free operations skip the action's cost.
    #[cfg_attr(feature = "serde", serde(default))]
    pub free: bool,
}

impl ActionMove {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Move {
    Act(ActionMove),
    /// Declines an optional decision: a pivotal offer, a free-operation
    /// grant or a coup-phase step.
    Decline { seat: PlayerId },
}

impl Move {
    pub fn act(seat: PlayerId, action: impl Into<String>) -> Self {
        Move::Act(ActionMove {
            seat,
            action: action.into(),
            params: Vec::new(),
            special: None,
            free: false,
        })
    }

    pub const fn decline(seat: PlayerId) -> Self {
        Move::Decline { seat }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Move::Act(mv) = &mut self {
            mv.params.push((name.into(), value.into()));
        }
        self
    }

    pub fn with_special(mut self, action: impl Into<String>, params: Vec<(String, Value)>) -> Self {
        if let Move::Act(mv) = &mut self {
            mv.special = Some(SpecialMove {
                action: action.into(),
                params,
            });
        }
        self
    }

    pub fn free(mut self) -> Self {
        if let Move::Act(mv) = &mut self {
            mv.free = true;
        }
        self
    }

    pub const fn seat(&self) -> PlayerId {
        match self {
            Move::Act(mv) => mv.seat,
            Move::Decline { seat } => *seat,
        }
    }

    pub fn action(&self) -> Option<&str> {
        match self {
            Move::Act(mv) => Some(&mv.action),
            Move::Decline { .. } => None,
        }
    }

    pub fn as_action(&self) -> Option<&ActionMove> {
        match self {
            Move::Act(mv) => Some(mv),
            Move::Decline { .. } => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Decline { seat } => write!(f, "{seat}:decline"),
            Move::Act(mv) => {
                write!(f, "{}:{}", mv.seat, mv.action)?;
                for (name, value) in &mv.params {
                    write!(f, " {name}={value}")?;
                }
                if let Some(special) = &mv.special {
                    write!(f, " +{}", special.action)?;
                    for (name, value) in &special.params {
                        write!(f, " {name}={value}")?;
                    }
                }
                if mv.free {
                    f.write_str(" (free)")?;
                }
                Ok(())
            }
        }
    }
}
