use std::collections::VecDeque;

use super::{ChoiceKind, ChoiceValue, PendingChoiceRequest};
use crate::state::Value;

/// Answers choice requests as the interpreter raises them.
///
/// Returning `None` defers: the move suspends and the request is handed to
/// the host.
pub trait ChoiceResolver {
    fn resolve(&mut self, request: &PendingChoiceRequest) -> Option<ChoiceValue>;
}

/// Defers every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeferAll;

impl ChoiceResolver for DeferAll {
    fn resolve(&mut self, _request: &PendingChoiceRequest) -> Option<ChoiceValue> {
        None
    }
}

/// Answers from a queue of prepared values, then defers.
#[derive(Clone, Debug, Default)]
pub struct ScriptedResolver {
    answers: VecDeque<ChoiceValue>,
}

impl ScriptedResolver {
    pub fn new(answers: impl IntoIterator<Item = ChoiceValue>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
        }
    }

    pub fn push(&mut self, answer: impl Into<ChoiceValue>) {
        self.answers.push_back(answer.into());
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl ChoiceResolver for ScriptedResolver {
    fn resolve(&mut self, _request: &PendingChoiceRequest) -> Option<ChoiceValue> {
        self.answers.pop_front()
    }
}

/// Picks the first legal options, as few as allowed. External random draws
/// take the low end of the range.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstLegal;

impl ChoiceResolver for FirstLegal {
    fn resolve(&mut self, request: &PendingChoiceRequest) -> Option<ChoiceValue> {
        match request.kind {
            ChoiceKind::One => request.legal_values().next().cloned().map(ChoiceValue::One),
            ChoiceKind::Many => {
                let picked: Vec<Value> = request.legal_values().take(request.min).cloned().collect();
                (picked.len() == request.min).then_some(ChoiceValue::Many(picked))
            }
            ChoiceKind::Random { min, .. } => Some(ChoiceValue::One(Value::Int(min))),
        }
    }
}

impl<R: ChoiceResolver + ?Sized> ChoiceResolver for &mut R {
    fn resolve(&mut self, request: &PendingChoiceRequest) -> Option<ChoiceValue> {
        (**self).resolve(request)
    }
}
