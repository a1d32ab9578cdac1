//! Runtime values produced by the evaluator and stored in variables,
//! token properties and bindings.

use std::fmt;

use super::{PlayerId, TokenId, ZoneId};

/// A dynamically-kinded value.
///
/// Variables only ever hold `Int` or `Bool`. Token properties may hold any
/// kind, including lists; lists are rejected from scalar comparisons.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    Token(TokenId),
    Zone(ZoneId),
    Player(PlayerId),
    List(Vec<Value>),
}

/// Coarse kind of a [`Value`], used for kind checks and diagnostics.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
    Int,
    Bool,
    Str,
    Token,
    Zone,
    Player,
    List,
}

impl Value {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
            Value::Str(_) => ValueKind::Str,
            Value::Token(_) => ValueKind::Token,
            Value::Zone(_) => ValueKind::Zone,
            Value::Player(_) => ValueKind::Player,
            Value::List(_) => ValueKind::List,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<TokenId> {
        match self {
            Value::Token(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_zone(&self) -> Option<ZoneId> {
        match self {
            Value::Zone(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_player(&self) -> Option<PlayerId> {
        match self {
            Value::Player(v) => Some(*v),
            _ => None,
        }
    }

    /// Flattens a value into the set of members it denotes: a list yields its
    /// items, any scalar yields itself.
    pub fn members(&self) -> Vec<Value> {
        match self {
            Value::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Token(v) => write!(f, "{v}"),
            Value::Zone(v) => write!(f, "{v}"),
            Value::Player(v) => write!(f, "{v}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}
