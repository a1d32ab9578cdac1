//! Choice requests and the resolvers that answer them.
//!
//! A choice effect never blocks. It builds a [`PendingChoiceRequest`] and asks
//! the [`ChoiceResolver`] passed to the kernel; a resolver that returns `None`
//! suspends the move, and the host answers later through
//! `Kernel::resolve_choice`.
mod resolver;

pub use resolver::{ChoiceResolver, DeferAll, FirstLegal, ScriptedResolver};

use std::fmt;

use crate::error::{IllegalMove, RuntimeError};
use crate::state::{PlayerId, Value};

/// Identifies a decision by the effect path that raised it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecisionId(pub String);

impl DecisionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChoiceKind {
    One,
    Many,
    /// Externally supplied random integer in `[min, max]`.
    Random { min: i64, max: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChoiceOption {
    pub value: Value,
    pub legal: bool,
    /// Why an illegal option is illegal.
    pub reason: Option<String>,
}

impl ChoiceOption {
    pub fn legal(value: Value) -> Self {
        Self {
            value,
            legal: true,
            reason: None,
        }
    }

    pub fn illegal(value: Value, reason: impl Into<String>) -> Self {
        Self {
            value,
            legal: false,
            reason: Some(reason.into()),
        }
    }
}

/// An in-flight choice. Exists only while a move is suspended on it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingChoiceRequest {
    pub decision: DecisionId,
    pub seat: PlayerId,
    pub binder: String,
    pub kind: ChoiceKind,
    /// Every member of the resolved domain, each flagged legal or illegal.
    /// Empty for external random draws.
    pub options: Vec<ChoiceOption>,
    pub min: usize,
    pub max: usize,
}

impl PendingChoiceRequest {
    pub fn legal_values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.options.iter().filter(|o| o.legal).map(|o| &o.value)
    }

    /// Checks a submitted value and converts it into the binding value.
    pub fn accept(&self, value: &ChoiceValue) -> Result<Value, RuntimeError> {
        let picked: Vec<&Value> = match value {
            ChoiceValue::One(v) => vec![v],
            ChoiceValue::Many(vs) => vs.iter().collect(),
        };

        if picked.len() < self.min || picked.len() > self.max {
            return Err(RuntimeError::ChoiceCardinality {
                decision: self.decision.0.clone(),
                min: self.min,
                max: self.max,
                got: picked.len(),
            });
        }

        if let ChoiceKind::Random { min, max } = self.kind {
            let drawn = picked[0];
            return match drawn.as_int() {
                Some(n) if (min..=max).contains(&n) => Ok(drawn.clone()),
                _ => Err(IllegalMove::NotAnOption {
                    decision: self.decision.0.clone(),
                    value: drawn.clone(),
                }
                .into()),
            };
        }

        for (i, v) in picked.iter().enumerate() {
            if picked[..i].contains(v) {
                return Err(IllegalMove::DuplicateSelection {
                    decision: self.decision.0.clone(),
                    value: (*v).clone(),
                }
                .into());
            }
            let option = self
                .options
                .iter()
                .find(|o| o.value == **v)
                .ok_or_else(|| IllegalMove::NotAnOption {
                    decision: self.decision.0.clone(),
                    value: (*v).clone(),
                })?;
            if !option.legal {
                return Err(IllegalMove::IllegalOption {
                    decision: self.decision.0.clone(),
                    value: (*v).clone(),
                    reason: option.reason.clone().unwrap_or_default(),
                }
                .into());
            }
        }

        Ok(match self.kind {
            ChoiceKind::Many => Value::List(picked.into_iter().cloned().collect()),
            ChoiceKind::One | ChoiceKind::Random { .. } => picked[0].clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChoiceValue {
    One(Value),
    Many(Vec<Value>),
}

impl From<Value> for ChoiceValue {
    fn from(value: Value) -> Self {
        ChoiceValue::One(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: ChoiceKind, min: usize, max: usize) -> PendingChoiceRequest {
        PendingChoiceRequest {
            decision: DecisionId("op/0:choose_n".into()),
            seat: PlayerId(0),
            binder: "spaces".into(),
            kind,
            options: vec![
                ChoiceOption::legal(Value::str("hue")),
                ChoiceOption::illegal(Value::str("saigon"), "stacking limit"),
                ChoiceOption::legal(Value::str("danang")),
            ],
            min,
            max,
        }
    }

    #[test]
    fn many_enforces_cardinality_before_membership() {
        let req = request(ChoiceKind::Many, 1, 2);
        let err = req
            .accept(&ChoiceValue::Many(vec![
                Value::str("hue"),
                Value::str("danang"),
                Value::str("nowhere"),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ChoiceCardinality { got: 3, .. }
        ));

        let ok = req
            .accept(&ChoiceValue::Many(vec![Value::str("danang")]))
            .unwrap();
        assert_eq!(ok, Value::List(vec![Value::str("danang")]));
    }

    #[test]
    fn illegal_options_explain_themselves() {
        let req = request(ChoiceKind::One, 1, 1);
        let err = req.accept(&Value::str("saigon").into()).unwrap_err();
        match err {
            RuntimeError::IllegalMove(IllegalMove::IllegalOption { reason, .. }) => {
                assert_eq!(reason, "stacking limit");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn duplicates_are_rejected() {
        let req = request(ChoiceKind::Many, 0, 3);
        let err = req
            .accept(&ChoiceValue::Many(vec![Value::str("hue"), Value::str("hue")]))
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::IllegalMove(IllegalMove::DuplicateSelection { .. })
        ));
    }

    #[test]
    fn random_draw_must_fall_in_range() {
        let mut req = request(ChoiceKind::Random { min: 1, max: 6 }, 1, 1);
        req.options.clear();
        assert_eq!(req.accept(&Value::Int(4).into()).unwrap(), Value::Int(4));
        assert!(req.accept(&Value::Int(7).into()).is_err());
    }
}
