//! Marker lattices: ordered, enumerated states a space or global marker may
//! occupy.

use super::zones::ZoneMatch;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum MarkerScope {
    #[default]
    Space,
    Global,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkerState {
    pub id: String,
    /// Numeric weight used by formulas (e.g. support = +1, opposition = -1).
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: i64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatticeDef {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scope: MarkerScope,
    /// States in lattice order. Shifting moves along this order.
    pub states: Vec<MarkerState>,
    pub default: String,
    /// Explicit `(from, to)` moves. When absent, any state may follow any
    /// other.
    #[cfg_attr(feature = "serde", serde(default))]
    pub transitions: Option<Vec<(String, String)>>,
    /// Restricts a space lattice to matching zones. Other spaces never carry
    /// it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub applies_to: Option<ZoneMatch>,
}

impl LatticeDef {
    pub fn new<I, S>(id: impl Into<String>, states: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            scope: MarkerScope::Space,
            states: states
                .into_iter()
                .map(|(id, value)| MarkerState {
                    id: id.into(),
                    value,
                })
                .collect(),
            default: default.into(),
            transitions: None,
            applies_to: None,
        }
    }

    pub fn global(mut self) -> Self {
        self.scope = MarkerScope::Global;
        self
    }

    pub fn applies_to(mut self, matcher: ZoneMatch) -> Self {
        self.applies_to = Some(matcher);
        self
    }

    pub fn position(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s.id == state)
    }

    pub fn value_of(&self, state: &str) -> Option<i64> {
        self.states.iter().find(|s| s.id == state).map(|s| s.value)
    }

    /// State reached by moving `delta` steps along the lattice, saturating at
    /// either end.
    pub fn shifted(&self, from: &str, delta: i64) -> Option<&str> {
        let at = self.position(from)? as i64;
        let last = self.states.len() as i64 - 1;
        let to = at.saturating_add(delta).clamp(0, last.max(0));
        self.states.get(to as usize).map(|s| s.id.as_str())
    }

    pub fn allows(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        match &self.transitions {
            None => self.position(to).is_some(),
            Some(edges) => edges.iter().any(|(a, b)| a == from && b == to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn support() -> LatticeDef {
        LatticeDef::new(
            "support",
            [
                ("activeOpposition", -2),
                ("passiveOpposition", -1),
                ("neutral", 0),
                ("passiveSupport", 1),
                ("activeSupport", 2),
            ],
            "neutral",
        )
    }

    #[test]
    fn shift_saturates_at_both_ends() {
        let lattice = support();
        assert_eq!(lattice.shifted("passiveSupport", -1), Some("neutral"));
        assert_eq!(lattice.shifted("activeSupport", 3), Some("activeSupport"));
        assert_eq!(lattice.shifted("passiveOpposition", -5), Some("activeOpposition"));
        assert_eq!(lattice.shifted("unknown", 1), None);
        assert_eq!(lattice.shifted("neutral", i64::MAX), Some("activeSupport"));
        assert_eq!(lattice.shifted("neutral", i64::MIN), Some("activeOpposition"));
    }

    #[test]
    fn explicit_transitions_restrict_moves() {
        let mut lattice = support();
        assert!(lattice.allows("neutral", "activeSupport"));

        lattice.transitions = Some(vec![
            ("neutral".into(), "passiveSupport".into()),
            ("passiveSupport".into(), "activeSupport".into()),
        ]);
        assert!(lattice.allows("neutral", "passiveSupport"));
        assert!(!lattice.allows("neutral", "activeSupport"));
        assert!(lattice.allows("neutral", "neutral"));
    }
}
