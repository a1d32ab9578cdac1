//! References from expressions and effects into definition entities.

/// Selects a zone either by declared id or through a binding holding a zone.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZoneRef {
    Named(String),
    Bound(String),
}

impl ZoneRef {
    pub fn named(id: impl Into<String>) -> Self {
        Self::Named(id.into())
    }

    pub fn bound(name: impl Into<String>) -> Self {
        Self::Bound(name.into())
    }
}

/// Selects a player.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlayerSel {
    /// The seat performing the current move or phase step.
    Active,
    /// The player occupying a declared seat.
    Seat(String),
    /// A binding holding a player value.
    Bound(String),
}

impl PlayerSel {
    pub fn seat(id: impl Into<String>) -> Self {
        Self::Seat(id.into())
    }
}

/// Address of a variable.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarRef {
    Global(String),
    Player { player: PlayerSel, var: String },
    Zone { zone: ZoneRef, var: String },
}

impl VarRef {
    pub fn global(name: impl Into<String>) -> Self {
        Self::Global(name.into())
    }

    pub fn player(player: PlayerSel, var: impl Into<String>) -> Self {
        Self::Player {
            player,
            var: var.into(),
        }
    }

    pub fn zone(zone: ZoneRef, var: impl Into<String>) -> Self {
        Self::Zone {
            zone,
            var: var.into(),
        }
    }

    /// Declared variable name, regardless of scope.
    pub fn name(&self) -> &str {
        match self {
            VarRef::Global(var) | VarRef::Player { var, .. } | VarRef::Zone { var, .. } => var,
        }
    }
}
