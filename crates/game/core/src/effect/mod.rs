//! Effect interpreter.
//!
//! A [`Machine`] executes effect sequences against a mutable [`GameState`]
//! using an explicit frame stack instead of native recursion. Every frame is
//! plain data, so a machine blocked on a choice can be stored inside a
//! suspended move and resumed later from exactly the same point.
//!
//! Frames:
//! - `Block` walks a sequence of effects. On exit it keeps, truncates or (for
//!   trigger bodies) truncates and restores the scope barrier.
//! - `Loop` drives a `ForEach`, binding one item per iteration and pushing a
//!   fresh block for the body.
mod binders;
mod exec;
mod trace;

pub use binders::guaranteed_binders;
pub use trace::{EffectPath, EventContext, LifecycleEvent, Provenance, TraceEntry, TraceKind};

use crate::config::KernelConfig;
use crate::decision::{ChoiceKind, ChoiceResolver, ChoiceValue, DecisionId, PendingChoiceRequest};
use crate::def::{Effect, TriggerEvent};
use crate::env::Env;
use crate::error::{ExecFailure, RuntimeError};
use crate::eval::{EvalCtx, Scope, cond};
use crate::state::{GameState, PlayerId, Value};

/// Outcome of [`Machine::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Every frame completed.
    Done,
    /// Blocked on a choice the resolver deferred.
    Suspended(PendingChoiceRequest),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum BlockExit {
    Keep,
    Truncate(usize),
    Trigger { mark: usize, barrier: usize },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum Frame {
    Block {
        body: Vec<Effect>,
        pc: usize,
        path: EffectPath,
        exit: BlockExit,
        context: EventContext,
        /// Trigger nesting level of this body.
        depth: u32,
    },
    Loop {
        bind: String,
        items: Vec<Value>,
        next: usize,
        body: Vec<Effect>,
        path: EffectPath,
        mark: usize,
        context: EventContext,
        depth: u32,
    },
}

/// What the run loop does next.
enum Advance {
    Exec {
        effect: Effect,
        path: EffectPath,
        context: EventContext,
        depth: u32,
    },
    Push(Frame),
    Pop,
}

/// Result of executing one effect.
pub(crate) enum Flow {
    Next,
    Suspend(PendingChoiceRequest),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Pending {
    request: PendingChoiceRequest,
    context: EventContext,
}

/// Resumable effect interpreter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Machine {
    frames: Vec<Frame>,
    scope: Scope,
    trace: Vec<TraceEntry>,
    pending: Option<Pending>,
    /// Seat resolving `Active` references.
    seat: Option<PlayerId>,
}

impl Machine {
    pub fn new(scope: Scope, seat: Option<PlayerId>) -> Self {
        Self {
            frames: Vec::new(),
            scope,
            trace: Vec::new(),
            pending: None,
            seat,
        }
    }

    /// Consumes the machine, returning its final scope and trace.
    pub fn finish(self) -> (Scope, Vec<TraceEntry>) {
        (self.scope, self.trace)
    }

    /// Schedules an action-effect sequence.
    pub fn push_block(&mut self, body: Vec<Effect>, path: EffectPath) -> Result<(), RuntimeError> {
        self.push(Frame::Block {
            body,
            pc: 0,
            path,
            exit: BlockExit::Keep,
            context: EventContext::ActionEffect,
            depth: 0,
        })
    }

    /// Schedules every trigger listening for `event` whose condition holds.
    ///
    /// Triggers run in declaration order, each behind a scope barrier so the
    /// bindings of whatever raised the event stay invisible to it.
    pub fn fire(
        &mut self,
        env: Env<'_>,
        state: &GameState,
        event: &TriggerEvent,
        depth: u32,
    ) -> Result<(), RuntimeError> {
        let outer = Scope::new();
        let ctx = EvalCtx::new(env.def, state, &outer, self.seat);
        let mut matched = Vec::new();
        for trigger in env.def.triggers().iter().filter(|t| t.on == *event) {
            let path = EffectPath::trigger(&trigger.id);
            let holds = match &trigger.when {
                Some(when) => {
                    cond(&ctx, when).map_err(|e| RuntimeError::exec(path.as_str(), e))?
                }
                None => true,
            };
            if holds {
                matched.push((trigger, path));
            }
        }
        if matched.is_empty() {
            return Ok(());
        }

        let depth = depth + 1;
        let limit = env.config.max_trigger_depth;
        if depth > limit {
            let (_, path) = &matched[0];
            return Err(RuntimeError::exec(
                path.as_str(),
                ExecFailure::TriggerDepth { limit },
            ));
        }

        for (trigger, path) in &matched {
            tracing::trace!(trigger = %trigger.id, depth, "trigger scheduled");
            self.record(
                state,
                path,
                EventContext::TriggerEffect,
                TraceKind::Lifecycle(LifecycleEvent::TriggerFired(trigger.id.clone())),
            );
        }
        for (trigger, path) in matched.into_iter().rev() {
            let mark = self.scope.mark();
            let barrier = self.scope.raise_barrier();
            self.push(Frame::Block {
                body: trigger.effects.clone(),
                pc: 0,
                path,
                exit: BlockExit::Trigger { mark, barrier },
                context: EventContext::TriggerEffect,
                depth,
            })?;
        }
        Ok(())
    }

    /// Runs until every frame completes or a choice is deferred.
    pub fn run(
        &mut self,
        env: Env<'_>,
        state: &mut GameState,
        resolver: &mut dyn ChoiceResolver,
    ) -> Result<Step, RuntimeError> {
        if let Some(pending) = &self.pending {
            return Ok(Step::Suspended(pending.request.clone()));
        }

        loop {
            let advance = match self.frames.last_mut() {
                None => return Ok(Step::Done),
                Some(Frame::Block {
                    body,
                    pc,
                    path,
                    context,
                    depth,
                    ..
                }) => match body.get(*pc) {
                    Some(effect) => {
                        let child = path.child(*pc, effect.as_snake_case());
                        *pc += 1;
                        Advance::Exec {
                            effect: effect.clone(),
                            path: child,
                            context: *context,
                            depth: *depth,
                        }
                    }
                    None => Advance::Pop,
                },
                Some(Frame::Loop {
                    bind,
                    items,
                    next,
                    body,
                    path,
                    mark,
                    context,
                    depth,
                }) => match items.get(*next) {
                    Some(item) => {
                        self.scope.truncate(*mark);
                        self.scope.bind(bind.clone(), item.clone());
                        let iteration = path.iteration(*next);
                        *next += 1;
                        Advance::Push(Frame::Block {
                            body: body.clone(),
                            pc: 0,
                            path: iteration,
                            exit: BlockExit::Keep,
                            context: *context,
                            depth: *depth,
                        })
                    }
                    None => Advance::Pop,
                },
            };

            match advance {
                Advance::Exec {
                    effect,
                    path,
                    context,
                    depth,
                } => match self.exec(env, state, resolver, &effect, &path, context, depth)? {
                    Flow::Next => {}
                    Flow::Suspend(request) => return Ok(Step::Suspended(request)),
                },
                Advance::Push(frame) => self.push(frame)?,
                Advance::Pop => self.pop(state),
            }
        }
    }

    /// Binds the host's answer to the pending choice. Call [`Machine::run`]
    /// afterwards to continue.
    pub fn resume(
        &mut self,
        state: &GameState,
        decision: &DecisionId,
        answer: &ChoiceValue,
    ) -> Result<(), RuntimeError> {
        let pending = match &self.pending {
            Some(p) if p.request.decision == *decision => p.clone(),
            other => {
                return Err(RuntimeError::UnknownDecision {
                    decision: decision.0.clone(),
                    pending: other.as_ref().map(|p| p.request.decision.0.clone()),
                });
            }
        };
        self.bind_answer(state, &pending.request, answer, pending.context)?;
        self.pending = None;
        Ok(())
    }

    fn push(&mut self, frame: Frame) -> Result<(), RuntimeError> {
        if self.frames.len() >= KernelConfig::MAX_FRAME_DEPTH {
            let path = match &frame {
                Frame::Block { path, .. } | Frame::Loop { path, .. } => path.clone(),
            };
            return Err(RuntimeError::exec(
                path.as_str(),
                ExecFailure::FrameDepth {
                    limit: KernelConfig::MAX_FRAME_DEPTH,
                },
            ));
        }
        self.frames.push(frame);
        Ok(())
    }

    fn pop(&mut self, state: &GameState) {
        match self.frames.pop() {
            Some(Frame::Block { exit, .. }) => match exit {
                BlockExit::Keep => {}
                BlockExit::Truncate(mark) => self.scope.truncate(mark),
                BlockExit::Trigger { mark, barrier } => {
                    self.scope.truncate(mark);
                    self.scope.restore_barrier(barrier);
                }
            },
            Some(Frame::Loop {
                bind,
                items,
                path,
                mark,
                context,
                ..
            }) => {
                self.scope.truncate(mark);
                self.record(
                    state,
                    &path,
                    context,
                    TraceKind::ForEach {
                        binder: bind,
                        iterations: items.len(),
                    },
                );
            }
            None => {}
        }
    }

    /// Offers a request to the resolver; defers by storing it.
    fn ask(
        &mut self,
        state: &GameState,
        request: PendingChoiceRequest,
        resolver: &mut dyn ChoiceResolver,
        context: EventContext,
    ) -> Result<Flow, RuntimeError> {
        match resolver.resolve(&request) {
            Some(answer) => {
                self.bind_answer(state, &request, &answer, context)?;
                Ok(Flow::Next)
            }
            None => {
                tracing::debug!(decision = %request.decision, seat = %request.seat, "choice deferred");
                self.pending = Some(Pending {
                    request: request.clone(),
                    context,
                });
                Ok(Flow::Suspend(request))
            }
        }
    }

    fn bind_answer(
        &mut self,
        state: &GameState,
        request: &PendingChoiceRequest,
        answer: &ChoiceValue,
        context: EventContext,
    ) -> Result<(), RuntimeError> {
        let value = request.accept(answer)?;
        let path = EffectPath::root(request.decision.0.clone());
        let kind = match (request.kind, value.as_int()) {
            (ChoiceKind::Random { .. }, Some(rolled)) => TraceKind::Roll {
                binder: request.binder.clone(),
                value: rolled,
            },
            _ => TraceKind::Choice {
                decision: request.decision.0.clone(),
                value: value.clone(),
            },
        };
        self.record(state, &path, context, kind);
        self.scope.bind(request.binder.clone(), value);
        Ok(())
    }

    pub(crate) fn record(
        &mut self,
        state: &GameState,
        path: &EffectPath,
        context: EventContext,
        kind: TraceKind,
    ) {
        self.trace
            .push(TraceEntry::new(&state.progress.phase, context, path, kind));
    }
}
