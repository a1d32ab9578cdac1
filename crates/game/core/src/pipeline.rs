//! Action pipeline executor.
//!
//! A move runs as an ordered list of segments: the cost, the operation's
//! stages, the compound special activity spliced in according to its timing,
//! and finally the `ActionResolved` triggers. Each segment executes in its own
//! [`Machine`]; between segments only move parameters and the binders the
//! previous segments guarantee on every path survive.

use std::collections::BTreeMap;

use crate::decision::{ChoiceResolver, ChoiceValue, DecisionId, PendingChoiceRequest};
use crate::def::{ActionDef, CompoundConstraint, CompoundDef, Effect, SpecialTiming, TriggerEvent};
use crate::effect::{EffectPath, Machine, Step, TraceEntry, guaranteed_binders};
use crate::env::Env;
use crate::error::{IllegalMove, RuntimeError};
use crate::eval::Scope;
use crate::moves::ActionMove;
use crate::state::{GameState, Value};

/// One unit of a move's pipeline, run in its own machine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) enum Segment {
    Effects {
        action: String,
        stage: String,
        effects: Vec<Effect>,
        /// Runs with the special activity's parameters.
        special: bool,
    },
    Resolved {
        action: String,
    },
}

/// Segment order of an operation, optionally compounded with a special
/// activity.
pub(crate) fn layout(
    primary: &ActionDef,
    special: Option<(&ActionDef, &CompoundDef)>,
    free: bool,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    if !free && !primary.cost.is_empty() {
        segments.push(cost_segment(primary, false));
    }
    let stages: Vec<Segment> = primary
        .stages
        .iter()
        .map(|s| Segment::Effects {
            action: primary.id.clone(),
            stage: s.id.clone(),
            effects: s.effects.clone(),
            special: false,
        })
        .collect();

    match special {
        None => segments.extend(stages),
        Some((special, compound)) => {
            let mut inserted = Vec::new();
            if !free && !special.cost.is_empty() {
                inserted.push(cost_segment(special, true));
            }
            inserted.extend(special.stages.iter().map(|s| Segment::Effects {
                action: special.id.clone(),
                stage: s.id.clone(),
                effects: s.effects.clone(),
                special: true,
            }));

            match &compound.timing {
                SpecialTiming::Before => {
                    segments.extend(inserted);
                    segments.extend(stages);
                }
                SpecialTiming::After => {
                    segments.extend(stages);
                    segments.extend(inserted);
                }
                SpecialTiming::During {
                    after_stage,
                    replace_remaining,
                } => {
                    let split = primary
                        .stages
                        .iter()
                        .position(|s| s.id == *after_stage)
                        .map_or(stages.len(), |i| i + 1);
                    let mut stages = stages;
                    let remaining = stages.split_off(split);
                    segments.extend(stages);
                    segments.extend(inserted);
                    if !*replace_remaining {
                        segments.extend(remaining);
                    }
                }
            }
        }
    }

    segments.push(Segment::Resolved {
        action: primary.id.clone(),
    });
    if let Some((special, _)) = special {
        segments.push(Segment::Resolved {
            action: special.id.clone(),
        });
    }
    segments
}

/// One move's pipeline, resumable across choice suspensions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineRun {
    mv: ActionMove,
    segments: Vec<Segment>,
    cursor: usize,
    /// Binders exported by completed segments.
    carried: BTreeMap<String, Value>,
    machine: Option<Machine>,
    trace: Vec<TraceEntry>,
}

impl PipelineRun {
    /// Lays out the segments and checks compound constraints. No effect runs
    /// here.
    pub fn new(env: Env<'_>, mv: ActionMove) -> Result<Self, RuntimeError> {
        let primary = env
            .def
            .action(&mv.action)
            .ok_or_else(|| IllegalMove::UnknownAction(mv.action.clone()))?;

        let special = match &mv.special {
            None => None,
            Some(special_move) => {
                let compound = primary.compound.as_ref().ok_or_else(|| {
                    IllegalMove::SpecialNotAllowed {
                        action: primary.id.clone(),
                        special: special_move.action.clone(),
                    }
                })?;
                let special = env
                    .def
                    .action(&special_move.action)
                    .ok_or_else(|| IllegalMove::UnknownAction(special_move.action.clone()))?;
                check_constraints(&compound.constraints, &mv)?;
                Some((special, compound))
            }
        };
        let segments = layout(primary, special, mv.free);

        Ok(Self {
            mv,
            segments,
            cursor: 0,
            carried: BTreeMap::new(),
            machine: None,
            trace: Vec::new(),
        })
    }

    pub fn mv(&self) -> &ActionMove {
        &self.mv
    }

    pub fn take_trace(&mut self) -> Vec<TraceEntry> {
        std::mem::take(&mut self.trace)
    }

    /// Runs segments until the pipeline completes or a choice is deferred.
    pub fn run(
        &mut self,
        env: Env<'_>,
        state: &mut GameState,
        resolver: &mut dyn ChoiceResolver,
    ) -> Result<Option<PendingChoiceRequest>, RuntimeError> {
        loop {
            let mut machine = match self.machine.take() {
                Some(machine) => machine,
                None => match self.segments.get(self.cursor) {
                    Some(segment) => self.start(env, state, segment)?,
                    None => return Ok(None),
                },
            };

            match machine.run(env, state, resolver)? {
                Step::Suspended(request) => {
                    self.machine = Some(machine);
                    return Ok(Some(request));
                }
                Step::Done => {
                    let (scope, trace) = machine.finish();
                    self.trace.extend(trace);
                    if let Some(Segment::Effects { effects, .. }) = self.segments.get(self.cursor) {
                        for name in guaranteed_binders(effects) {
                            if let Some(value) = scope.get(&name) {
                                self.carried.insert(name, value.clone());
                            }
                        }
                    }
                    self.cursor += 1;
                }
            }
        }
    }

    /// Binds an answer to the pending choice. Call [`PipelineRun::run`] to
    /// continue.
    pub fn resume(
        &mut self,
        state: &GameState,
        decision: &DecisionId,
        answer: &ChoiceValue,
    ) -> Result<(), RuntimeError> {
        match self.machine.as_mut() {
            Some(machine) => machine.resume(state, decision, answer),
            None => Err(RuntimeError::UnknownDecision {
                decision: decision.0.clone(),
                pending: None,
            }),
        }
    }

    fn start(
        &self,
        env: Env<'_>,
        state: &GameState,
        segment: &Segment,
    ) -> Result<Machine, RuntimeError> {
        let seat = Some(self.mv.seat);
        match segment {
            Segment::Effects {
                action,
                stage,
                effects,
                special,
            } => {
                let params = match (&self.mv.special, *special) {
                    (Some(sp), true) => &sp.params,
                    _ => &self.mv.params,
                };
                let scope = Scope::from_bindings(
                    params
                        .iter()
                        .cloned()
                        .chain(self.carried.iter().map(|(k, v)| (k.clone(), v.clone()))),
                );
                tracing::trace!(%action, %stage, "stage started");
                let mut machine = Machine::new(scope, seat);
                machine.push_block(effects.clone(), EffectPath::stage(action, stage))?;
                Ok(machine)
            }
            Segment::Resolved { action } => {
                let mut machine = Machine::new(Scope::new(), seat);
                machine.fire(env, state, &TriggerEvent::ActionResolved(action.clone()), 0)?;
                Ok(machine)
            }
        }
    }
}

fn cost_segment(action: &ActionDef, special: bool) -> Segment {
    Segment::Effects {
        action: action.id.clone(),
        stage: "cost".to_owned(),
        effects: action.cost.clone(),
        special,
    }
}

/// Checks disjoint and subset relations between operation and special
/// parameters, read as member sets.
pub(crate) fn check_constraints(
    constraints: &[CompoundConstraint],
    mv: &ActionMove,
) -> Result<(), RuntimeError> {
    let Some(special) = &mv.special else {
        return Ok(());
    };
    let members = |params: &[(String, Value)], action: &str, name: &str| {
        params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.members())
            .ok_or_else(|| IllegalMove::MissingParam {
                action: action.to_owned(),
                param: name.to_owned(),
            })
    };

    for constraint in constraints {
        let (op_param, sp_param) = match constraint {
            CompoundConstraint::Disjoint { operation, special } => (operation, special),
            CompoundConstraint::Subset { special, operation } => (operation, special),
        };
        let op = members(&mv.params, &mv.action, op_param)?;
        let sp = members(&special.params, &special.action, sp_param)?;
        let holds = match constraint {
            CompoundConstraint::Disjoint { .. } => sp.iter().all(|v| !op.contains(v)),
            CompoundConstraint::Subset { .. } => sp.iter().all(|v| op.contains(v)),
        };
        if !holds {
            return Err(IllegalMove::ConstraintViolated {
                operation: op_param.clone(),
                special: sp_param.clone(),
            }
            .into());
        }
    }
    Ok(())
}
