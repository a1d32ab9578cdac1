use std::collections::BTreeMap;

use crate::state::Value;

/// Ordering discipline of a zone.
///
/// Every zone keeps its tokens in a stable order. The kind only decides where
/// an incoming token lands: on top for stacks, at the back otherwise. Tokens
/// always leave from the top (front).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ZoneKind {
    #[default]
    Set,
    Stack,
    Queue,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    /// Visible to the owning seat only.
    Owner,
    Hidden,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneDef {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: ZoneKind,
    /// Owning seat, for per-player zones such as hands.
    #[cfg_attr(feature = "serde", serde(default))]
    pub owner: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub visibility: Visibility,
    /// Map spaces carry space markers; off-map zones (decks, boxes) do not.
    #[cfg_attr(feature = "serde", serde(default))]
    pub space: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attrs: BTreeMap<String, Value>,
    /// Neighbour zone ids. Adjacency is symmetric once validated.
    #[cfg_attr(feature = "serde", serde(default))]
    pub adjacent: Vec<String>,
}

impl ZoneDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ZoneKind::Set,
            owner: None,
            visibility: Visibility::Public,
            space: false,
            attrs: BTreeMap::new(),
            adjacent: Vec::new(),
        }
    }

    pub fn space(id: impl Into<String>) -> Self {
        Self {
            space: true,
            ..Self::new(id)
        }
    }

    pub fn with_kind(mut self, kind: ZoneKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attr(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(attr.into(), value.into());
        self
    }

    pub fn adjacent_to<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.adjacent.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visibility = Visibility::Hidden;
        self
    }
}

/// Declared token type with property defaults.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenTypeDef {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub props: BTreeMap<String, Value>,
}

impl TokenTypeDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            props: BTreeMap::new(),
        }
    }

    pub fn with_prop(mut self, prop: impl Into<String>, default: impl Into<Value>) -> Self {
        self.props.insert(prop.into(), default.into());
        self
    }
}

/// Matches zones by a static attribute value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneMatch {
    pub attr: String,
    pub value: Value,
}

impl ZoneMatch {
    pub fn new(attr: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            attr: attr.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, zone: &ZoneDef) -> bool {
        zone.attrs.get(&self.attr) == Some(&self.value)
    }
}
