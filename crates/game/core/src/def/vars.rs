use crate::state::Value;

/// Where a variable lives.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum VarScope {
    Global,
    Player,
    Zone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarKind {
    /// Integer clamped to `[min, max]` on every write.
    Int { min: i64, max: i64 },
    Bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
    pub init: Value,
}

impl VarDef {
    pub fn int(name: impl Into<String>, min: i64, max: i64, init: i64) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Int { min, max },
            init: Value::Int(init),
        }
    }

    pub fn bool(name: impl Into<String>, init: bool) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Bool,
            init: Value::Bool(init),
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self.kind, VarKind::Bool)
    }

    /// Clamps an integer to the declared bounds. Booleans pass through.
    pub fn clamp(&self, value: i64) -> i64 {
        match self.kind {
            VarKind::Int { min, max } => value.clamp(min, max),
            VarKind::Bool => value,
        }
    }

    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self.kind {
            VarKind::Int { min, max } => Some((min, max)),
            VarKind::Bool => None,
        }
    }
}
