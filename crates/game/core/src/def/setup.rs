use std::collections::BTreeMap;

use crate::state::Value;

/// Tokens placed by the scenario before the first decision.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    pub kind: String,
    pub zone: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub owner: Option<String>,
    #[cfg_attr(feature = "serde", serde(default = "one"))]
    pub count: u32,
    /// Overrides of the token type's property defaults.
    #[cfg_attr(feature = "serde", serde(default))]
    pub props: BTreeMap<String, Value>,
}

#[cfg(feature = "serde")]
fn one() -> u32 {
    1
}

impl Placement {
    pub fn new(kind: impl Into<String>, zone: impl Into<String>, count: u32) -> Self {
        Self {
            kind: kind.into(),
            zone: zone.into(),
            owner: None,
            count,
            props: BTreeMap::new(),
        }
    }

    pub fn owned_by(mut self, seat: impl Into<String>) -> Self {
        self.owner = Some(seat.into());
        self
    }

    pub fn with_prop(mut self, prop: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(prop.into(), value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkerInit {
    pub zone: String,
    pub lattice: String,
    pub state: String,
}

/// Scenario overrides applied on top of declared initial values.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SetupDef {
    pub tokens: Vec<Placement>,
    pub globals: BTreeMap<String, Value>,
    /// Seat id to per-player variable overrides.
    pub player_vars: BTreeMap<String, BTreeMap<String, Value>>,
    pub zone_vars: BTreeMap<String, BTreeMap<String, Value>>,
    pub markers: Vec<MarkerInit>,
    pub global_markers: BTreeMap<String, String>,
    /// Zones shuffled with the seeded stream once every token is placed.
    pub shuffle: Vec<String>,
}
