//! Execution of individual effect nodes.

use std::collections::BTreeMap;

use crate::decision::{ChoiceKind, ChoiceOption, ChoiceResolver, DecisionId, PendingChoiceRequest};
use crate::def::{ChoiceSpec, Effect, LatticeDef, MarkerScope, TriggerEvent, VarDef, ZoneKind};
use crate::env::Env;
use crate::error::{ExecFailure, RuntimeError};
use crate::eval::{
    EvalCtx, EvalError, cond, domain, expr, int, player, var_slot, zone as zone_id,
};
use crate::eval::expr::{filter_owner, slot_scope, token_matches};
use crate::stacking;
use crate::state::{GameState, PlayerId, Token, TokenId, Value, ValueKind, VarSlot, ZoneId};
use crate::turn_flow;

use super::{BlockExit, EffectPath, EventContext, Flow, Frame, LifecycleEvent, Machine, TraceKind};

fn fail<E: Into<ExecFailure>>(path: &EffectPath) -> impl Fn(E) -> RuntimeError + '_ {
    move |e| RuntimeError::exec(path.as_str(), e)
}

fn zone_kind(env: Env<'_>, zone: ZoneId) -> ZoneKind {
    env.def.zone(zone).map(|z| z.kind).unwrap_or_default()
}

/// Marker target of a set or shift.
enum MarkerSite {
    Space(ZoneId),
    Global,
}

impl Machine {
    fn ctx<'a>(&'a self, env: Env<'a>, state: &'a GameState) -> EvalCtx<'a> {
        EvalCtx::new(env.def, state, &self.scope, self.seat)
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn exec(
        &mut self,
        env: Env<'_>,
        state: &mut GameState,
        resolver: &mut dyn ChoiceResolver,
        effect: &Effect,
        path: &EffectPath,
        context: EventContext,
        depth: u32,
    ) -> Result<Flow, RuntimeError> {
        match effect {
            // ===== variables =====
            Effect::SetVar { var, value } => {
                let (slot, value) = {
                    let ctx = self.ctx(env, state);
                    (
                        var_slot(&ctx, var).map_err(fail(path))?,
                        expr(&ctx, value).map_err(fail(path))?,
                    )
                };
                let def = var_def(env, &slot, path)?;
                let after = match (def.bounds(), &value) {
                    (Some(_), Value::Int(v)) => Value::Int(def.clamp(*v)),
                    (None, Value::Bool(_)) => value,
                    (Some(_), _) => return Err(var_kind(path, &slot, ValueKind::Int)),
                    (None, _) => return Err(var_kind(path, &slot, ValueKind::Bool)),
                };
                let before = current(state, &slot, def);
                self.store(state, slot, before, after, path, context)?;
            }
            Effect::AddVar { var, delta } => {
                let (slot, delta) = {
                    let ctx = self.ctx(env, state);
                    (
                        var_slot(&ctx, var).map_err(fail(path))?,
                        int(&ctx, delta).map_err(fail(path))?,
                    )
                };
                let def = var_def(env, &slot, path)?;
                if def.is_bool() {
                    return Err(RuntimeError::exec(
                        path.as_str(),
                        ExecFailure::BooleanArithmetic {
                            var: slot.to_string(),
                        },
                    ));
                }
                let before = current(state, &slot, def);
                let base = before
                    .as_int()
                    .ok_or_else(|| var_kind(path, &slot, ValueKind::Int))?;
                let sum = base
                    .checked_add(delta)
                    .ok_or_else(|| RuntimeError::exec(path.as_str(), EvalError::Overflow))?;
                let after = Value::Int(def.clamp(sum));
                self.store(state, slot, before, after, path, context)?;
            }
            Effect::TransferVar { from, to, amount } => {
                let (source, target, requested) = {
                    let ctx = self.ctx(env, state);
                    (
                        var_slot(&ctx, from).map_err(fail(path))?,
                        var_slot(&ctx, to).map_err(fail(path))?,
                        int(&ctx, amount).map_err(fail(path))?,
                    )
                };
                let source_def = var_def(env, &source, path)?;
                let target_def = var_def(env, &target, path)?;
                let (Some((floor, _)), Some((_, ceiling))) =
                    (source_def.bounds(), target_def.bounds())
                else {
                    let var = if source_def.is_bool() { &source } else { &target };
                    return Err(RuntimeError::exec(
                        path.as_str(),
                        ExecFailure::BooleanArithmetic {
                            var: var.to_string(),
                        },
                    ));
                };
                let have = current(state, &source, source_def)
                    .as_int()
                    .ok_or_else(|| var_kind(path, &source, ValueKind::Int))?;
                let held = current(state, &target, target_def)
                    .as_int()
                    .ok_or_else(|| var_kind(path, &target, ValueKind::Int))?;

                // A transfer onto itself moves nothing.
                let actual = if source == target {
                    0
                } else {
                    requested
                        .max(0)
                        .min(have.saturating_sub(floor).max(0))
                        .min(ceiling.saturating_sub(held).max(0))
                };
                if actual != 0 {
                    state.write_var(&source, Value::Int(have - actual));
                    state.write_var(&target, Value::Int(held + actual));
                }
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::ResourceTransfer {
                        from: source.to_string(),
                        to: target.to_string(),
                        requested,
                        actual,
                    },
                );
            }

            // ===== tokens =====
            Effect::CreateToken {
                kind,
                zone,
                owner,
                props,
                bind,
            } => {
                let token_type = env.def.token_type(kind).ok_or_else(|| {
                    RuntimeError::exec(path.as_str(), EvalError::unknown("token type", kind.clone()))
                })?;
                let (zone, owner, overrides) = {
                    let ctx = self.ctx(env, state);
                    let zone = zone_id(&ctx, zone).map_err(fail(path))?;
                    let owner = owner
                        .as_ref()
                        .map(|sel| player(&ctx, sel))
                        .transpose()
                        .map_err(fail(path))?;
                    let mut overrides = BTreeMap::new();
                    for (prop, e) in props {
                        overrides.insert(prop.clone(), expr(&ctx, e).map_err(fail(path))?);
                    }
                    (zone, owner, overrides)
                };
                let mut props = token_type.props.clone();
                props.extend(overrides);

                let id = state.allocate_token_id().ok_or_else(|| {
                    RuntimeError::exec(path.as_str(), ExecFailure::TokenIdsExhausted)
                })?;
                state.tokens.insert(
                    id,
                    Token {
                        id,
                        kind: kind.clone(),
                        owner,
                        zone,
                        props,
                    },
                );
                state.insert_token(zone, zone_kind(env, zone), id);
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::CreateToken {
                        token: id,
                        kind: kind.clone(),
                        zone,
                    },
                );
                if let Some(bind) = bind {
                    self.scope.bind(bind.clone(), Value::Token(id));
                }
            }
            Effect::DestroyToken { token } => {
                let id = self.token_id(env, state, token, path)?;
                let zone = state
                    .detach_token(id)
                    .ok_or_else(|| RuntimeError::exec(path.as_str(), ExecFailure::TokenMissing(id)))?;
                state.tokens.remove(&id);
                self.record(state, path, context, TraceKind::DestroyToken { token: id, zone });
            }
            Effect::MoveToken { token, to } => {
                let id = self.token_id(env, state, token, path)?;
                let to = {
                    let ctx = self.ctx(env, state);
                    zone_id(&ctx, to).map_err(fail(path))?
                };
                self.relocate(env, state, id, to, path, context)?;
            }
            Effect::MoveAll { from, to, filter } => {
                let (from, to, ids) = {
                    let ctx = self.ctx(env, state);
                    let from = zone_id(&ctx, from).map_err(fail(path))?;
                    let to = zone_id(&ctx, to).map_err(fail(path))?;
                    let owner = filter_owner(&ctx, filter).map_err(fail(path))?;
                    let ids: Vec<TokenId> = state
                        .tokens_in(from)
                        .filter(|t| token_matches(t, filter, owner))
                        .map(|t| t.id)
                        .collect();
                    (from, to, ids)
                };
                if from != to {
                    for id in ids {
                        self.relocate(env, state, id, to, path, context)?;
                    }
                }
            }
            Effect::SetTokenProp { token, prop, value } => {
                let (id, value) = {
                    let ctx = self.ctx(env, state);
                    let value = expr(&ctx, value).map_err(fail(path))?;
                    (token_value(&ctx, token, path)?, value)
                };
                let entry = state
                    .tokens
                    .get_mut(&id)
                    .ok_or_else(|| RuntimeError::exec(path.as_str(), ExecFailure::TokenMissing(id)))?;
                let before = entry.props.insert(prop.clone(), value.clone());
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::SetTokenProp {
                        token: id,
                        prop: prop.clone(),
                        before,
                        after: value,
                    },
                );
            }

            // ===== markers =====
            Effect::SetMarker {
                zone,
                lattice,
                state: target,
            } => {
                let (zone, target) = {
                    let ctx = self.ctx(env, state);
                    (
                        zone_id(&ctx, zone).map_err(fail(path))?,
                        expr(&ctx, target).map_err(fail(path))?,
                    )
                };
                let def = space_lattice(env, zone, lattice, path)?;
                let to = state_name(def, &target, path)?;
                self.change_marker(env, state, MarkerSite::Space(zone), def, to, path, context)?;
            }
            Effect::ShiftMarker {
                zone,
                lattice,
                delta,
            } => {
                let (zone, delta) = {
                    let ctx = self.ctx(env, state);
                    (
                        zone_id(&ctx, zone).map_err(fail(path))?,
                        int(&ctx, delta).map_err(fail(path))?,
                    )
                };
                let def = space_lattice(env, zone, lattice, path)?;
                let from = state
                    .marker(zone, lattice)
                    .unwrap_or(def.default.as_str())
                    .to_owned();
                let to = shifted(def, &from, delta, path)?;
                self.change_marker(env, state, MarkerSite::Space(zone), def, to, path, context)?;
            }
            Effect::SetGlobalMarker {
                marker,
                state: target,
            } => {
                let target = {
                    let ctx = self.ctx(env, state);
                    expr(&ctx, target).map_err(fail(path))?
                };
                let def = global_lattice(env, marker, path)?;
                let to = state_name(def, &target, path)?;
                self.change_marker(env, state, MarkerSite::Global, def, to, path, context)?;
            }
            Effect::ShiftGlobalMarker { marker, delta } => {
                let delta = {
                    let ctx = self.ctx(env, state);
                    int(&ctx, delta).map_err(fail(path))?
                };
                let def = global_lattice(env, marker, path)?;
                let from = state
                    .global_marker(marker)
                    .unwrap_or(def.default.as_str())
                    .to_owned();
                let to = shifted(def, &from, delta, path)?;
                self.change_marker(env, state, MarkerSite::Global, def, to, path, context)?;
            }

            // ===== zones =====
            Effect::Conceal { zone } => {
                let zone = {
                    let ctx = self.ctx(env, state);
                    zone_id(&ctx, zone).map_err(fail(path))?
                };
                if let Some(z) = state.zone_mut(zone) {
                    z.concealed = true;
                    z.revealed_to.clear();
                }
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::Visibility {
                        zone,
                        concealed: true,
                        to: None,
                    },
                );
            }
            Effect::Reveal { zone, to } => {
                let (zone, to) = {
                    let ctx = self.ctx(env, state);
                    let zone = zone_id(&ctx, zone).map_err(fail(path))?;
                    let to = to
                        .as_ref()
                        .map(|sel| player(&ctx, sel))
                        .transpose()
                        .map_err(fail(path))?;
                    (zone, to)
                };
                let mut concealed = false;
                if let Some(z) = state.zone_mut(zone) {
                    match to {
                        Some(p) => {
                            z.revealed_to.insert(p);
                        }
                        None => {
                            z.concealed = false;
                            z.revealed_to.clear();
                        }
                    }
                    concealed = z.concealed;
                }
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::Visibility { zone, concealed, to },
                );
            }
            Effect::Draw { from, to, count } => {
                let (from, to, wanted) = {
                    let ctx = self.ctx(env, state);
                    (
                        zone_id(&ctx, from).map_err(fail(path))?,
                        zone_id(&ctx, to).map_err(fail(path))?,
                        int(&ctx, count).map_err(fail(path))?,
                    )
                };
                let wanted = wanted.max(0);
                let available = state.zone_len(from);
                if (available as i64) < wanted {
                    return Err(RuntimeError::exec(
                        path.as_str(),
                        ExecFailure::InsufficientTokens {
                            zone: env.def.zone_name(from).to_owned(),
                            wanted,
                            available,
                        },
                    ));
                }
                for _ in 0..wanted {
                    if let Some(top) = state.top_of(from) {
                        self.relocate(env, state, top, to, path, context)?;
                    }
                }
            }
            Effect::Shuffle { zone } => {
                let zone = {
                    let ctx = self.ctx(env, state);
                    zone_id(&ctx, zone).map_err(fail(path))?
                };
                let mut order = state.zone(zone).map(|z| z.tokens.clone()).unwrap_or_default();
                state.rng.shuffle(&mut order);
                if let Some(z) = state.zone_mut(zone) {
                    z.tokens = order;
                }
                self.record(state, path, context, TraceKind::Shuffle { zone });
            }

            // ===== choices =====
            Effect::ChooseOne(choice) => {
                let request = self.request(env, state, choice, ChoiceKind::One, None, path)?;
                return self.ask(state, request, resolver, context);
            }
            Effect::ChooseN { choice, min, max } => {
                let bounds = {
                    let ctx = self.ctx(env, state);
                    (
                        int(&ctx, min).map_err(fail(path))?,
                        int(&ctx, max).map_err(fail(path))?,
                    )
                };
                let request =
                    self.request(env, state, choice, ChoiceKind::Many, Some(bounds), path)?;
                if request.max == 0 {
                    self.scope.bind(choice.bind.clone(), Value::List(Vec::new()));
                    return Ok(Flow::Next);
                }
                return self.ask(state, request, resolver, context);
            }
            Effect::RollRandom {
                bind,
                min,
                max,
                external,
            } => {
                let (lo, hi) = {
                    let ctx = self.ctx(env, state);
                    (
                        int(&ctx, min).map_err(fail(path))?,
                        int(&ctx, max).map_err(fail(path))?,
                    )
                };
                if *external && lo < hi {
                    let seat = self
                        .seat
                        .ok_or_else(|| RuntimeError::exec(path.as_str(), EvalError::NoActiveSeat))?;
                    let request = PendingChoiceRequest {
                        decision: DecisionId(path.as_str().to_owned()),
                        seat,
                        binder: bind.clone(),
                        kind: ChoiceKind::Random { min: lo, max: hi },
                        options: Vec::new(),
                        min: 1,
                        max: 1,
                    };
                    return self.ask(state, request, resolver, context);
                }
                let rolled = state.rng.range(lo, hi);
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::Roll {
                        binder: bind.clone(),
                        value: rolled,
                    },
                );
                self.scope.bind(bind.clone(), Value::Int(rolled));
            }

            // ===== control =====
            Effect::ForEach {
                bind,
                over,
                limit,
                body,
            } => {
                let items = {
                    let ctx = self.ctx(env, state);
                    let mut items = domain(&ctx, over).map_err(fail(path))?;
                    if let Some(limit) = limit {
                        let n = int(&ctx, limit).map_err(fail(path))?.max(0);
                        items.truncate(usize::try_from(n).unwrap_or(usize::MAX));
                    }
                    items
                };
                let mark = self.scope.mark();
                self.push(Frame::Loop {
                    bind: bind.clone(),
                    items,
                    next: 0,
                    body: body.clone(),
                    path: path.clone(),
                    mark,
                    context,
                    depth,
                })?;
            }
            Effect::Reduce {
                over,
                item,
                acc,
                init,
                next,
                result,
            } => {
                let value = {
                    let ctx = self.ctx(env, state);
                    let items = domain(&ctx, over).map_err(fail(path))?;
                    let mut value = expr(&ctx, init).map_err(fail(path))?;
                    for it in &items {
                        let with_item = ctx.bind(item, it);
                        let stepped = expr(&with_item.bind(acc, &value), next).map_err(fail(path))?;
                        value = stepped;
                    }
                    value
                };
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::Reduce {
                        result: result.clone(),
                        value: value.clone(),
                    },
                );
                self.scope.bind(result.clone(), value);
            }
            Effect::If {
                when,
                then,
                otherwise,
            } => {
                let holds = {
                    let ctx = self.ctx(env, state);
                    cond(&ctx, when).map_err(fail(path))?
                };
                let branch = if holds { then } else { otherwise };
                if !branch.is_empty() {
                    self.push(Frame::Block {
                        body: branch.clone(),
                        pc: 0,
                        path: path.clone(),
                        exit: BlockExit::Keep,
                        context,
                        depth,
                    })?;
                }
            }
            Effect::Let { bind, value, body } => {
                let value = {
                    let ctx = self.ctx(env, state);
                    expr(&ctx, value).map_err(fail(path))?
                };
                let mark = self.scope.mark();
                self.scope.bind(bind.clone(), value);
                self.push(Frame::Block {
                    body: body.clone(),
                    pc: 0,
                    path: path.clone(),
                    exit: BlockExit::Truncate(mark),
                    context,
                    depth,
                })?;
            }

            // ===== turn flow =====
            Effect::GotoPhaseExact { phase } => {
                turn_flow::goto_phase(env, state, phase).map_err(fail(path))?;
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::Lifecycle(LifecycleEvent::PhaseJumped(phase.clone())),
                );
            }
            Effect::FireEvent { event } => {
                self.fire(env, state, &TriggerEvent::Custom(event.clone()), depth)?;
            }
            Effect::GrantFreeOperation { seat, actions } => {
                let seat = {
                    let ctx = self.ctx(env, state);
                    player(&ctx, seat).map_err(fail(path))?
                };
                let card_driven = state.turn_order.card_driven_mut().ok_or_else(|| {
                    not_card_driven(path, effect)
                })?;
                card_driven.grants.push(crate::state::FreeGrant {
                    seat,
                    actions: actions.clone(),
                });
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::Lifecycle(LifecycleEvent::FreeOperationGranted {
                        seat,
                        actions: actions.clone(),
                    }),
                );
            }
            Effect::SetEligibility { seat, eligible } => {
                let seat = {
                    let ctx = self.ctx(env, state);
                    player(&ctx, seat).map_err(fail(path))?
                };
                let name = seat_name(env, seat, path)?;
                let card_driven = state.turn_order.card_driven_mut().ok_or_else(|| {
                    not_card_driven(path, effect)
                })?;
                card_driven.overrides.insert(name.clone(), *eligible);
                self.record(
                    state,
                    path,
                    context,
                    TraceKind::Lifecycle(LifecycleEvent::EligibilityOverride {
                        seat: name,
                        eligible: *eligible,
                    }),
                );
            }
        }
        Ok(Flow::Next)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn store(
        &mut self,
        state: &mut GameState,
        slot: VarSlot,
        before: Value,
        after: Value,
        path: &EffectPath,
        context: EventContext,
    ) -> Result<(), RuntimeError> {
        if !state.write_var(&slot, after.clone()) {
            return Err(RuntimeError::exec(
                path.as_str(),
                EvalError::unknown("variable", slot.to_string()),
            ));
        }
        self.record(
            state,
            path,
            context,
            TraceKind::VarChange {
                var: slot.to_string(),
                before,
                after,
            },
        );
        Ok(())
    }

    fn token_id(
        &self,
        env: Env<'_>,
        state: &GameState,
        token: &crate::def::Expr,
        path: &EffectPath,
    ) -> Result<TokenId, RuntimeError> {
        let ctx = self.ctx(env, state);
        token_value(&ctx, token, path)
    }

    fn relocate(
        &mut self,
        env: Env<'_>,
        state: &mut GameState,
        token: TokenId,
        to: ZoneId,
        path: &EffectPath,
        context: EventContext,
    ) -> Result<(), RuntimeError> {
        let from = state
            .detach_token(token)
            .ok_or_else(|| RuntimeError::exec(path.as_str(), ExecFailure::TokenMissing(token)))?;
        state.insert_token(to, zone_kind(env, to), token);
        self.record(state, path, context, TraceKind::MoveToken { token, from, to });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn change_marker(
        &mut self,
        env: Env<'_>,
        state: &mut GameState,
        site: MarkerSite,
        lattice: &LatticeDef,
        to: String,
        path: &EffectPath,
        context: EventContext,
    ) -> Result<(), RuntimeError> {
        let (from, zone) = match site {
            MarkerSite::Space(zone) => (state.marker(zone, &lattice.id), Some(zone)),
            MarkerSite::Global => (state.global_marker(&lattice.id), None),
        };
        let from = from.unwrap_or(lattice.default.as_str()).to_owned();
        if !lattice.allows(&from, &to) {
            return Err(RuntimeError::exec(
                path.as_str(),
                ExecFailure::LatticeTransition {
                    lattice: lattice.id.clone(),
                    from,
                    to,
                },
            ));
        }

        match zone {
            Some(zone) => {
                if let Some(z) = state.zone_mut(zone) {
                    z.markers.insert(lattice.id.clone(), to.clone());
                }
            }
            None => {
                state.global_markers.insert(lattice.id.clone(), to.clone());
            }
        }
        tracing::trace!(lattice = %lattice.id, zone = ?zone.map(|z| env.def.zone_name(z)), %from, %to, "marker changed");
        self.record(
            state,
            path,
            context,
            TraceKind::MarkerChange {
                zone,
                lattice: lattice.id.clone(),
                before: from,
                after: to,
            },
        );
        Ok(())
    }

    /// Builds a choice request, flagging each option legal or illegal.
    fn request(
        &self,
        env: Env<'_>,
        state: &GameState,
        spec: &ChoiceSpec,
        kind: ChoiceKind,
        bounds: Option<(i64, i64)>,
        path: &EffectPath,
    ) -> Result<PendingChoiceRequest, RuntimeError> {
        let ctx = self.ctx(env, state);
        let seat = match &spec.chooser {
            Some(sel) => player(&ctx, sel),
            None => ctx.active(),
        }
        .map_err(fail(path))?;
        let probe_owner = match &spec.probe {
            Some(probe) => probe
                .owner
                .as_ref()
                .map(|sel| player(&ctx, sel))
                .transpose()
                .map_err(fail(path))?,
            None => None,
        };

        let mut options = Vec::new();
        for value in domain(&ctx, &spec.options).map_err(fail(path))? {
            let passes = match &spec.legal_if {
                Some(when) => cond(&ctx.bind(&spec.bind, &value), when).map_err(fail(path))?,
                None => true,
            };
            if !passes {
                options.push(ChoiceOption::illegal(value, "condition does not hold"));
                continue;
            }
            let blocked = match (&spec.probe, value.as_zone()) {
                (Some(probe), Some(zone)) => {
                    stacking::would_violate(env.def, state, zone, &probe.kind, probe_owner)
                }
                _ => None,
            };
            match blocked {
                Some(rule) => options.push(ChoiceOption::illegal(
                    value,
                    format!("stacking constraint `{}`", rule.id),
                )),
                None => options.push(ChoiceOption::legal(value)),
            }
        }

        let legal = options.iter().filter(|o| o.legal).count();
        let (min, max) = match bounds {
            None => (1, 1),
            Some((lo, hi)) => {
                let lo = usize::try_from(lo.max(0)).unwrap_or(usize::MAX);
                let hi = usize::try_from(hi.max(0))
                    .unwrap_or(usize::MAX)
                    .min(options.len());
                (lo, hi)
            }
        };
        if options.is_empty() && min > 0 {
            return Err(RuntimeError::exec(
                path.as_str(),
                ExecFailure::EmptyDomain {
                    binder: spec.bind.clone(),
                },
            ));
        }
        if legal < min || max < min {
            return Err(RuntimeError::exec(
                path.as_str(),
                ExecFailure::NoLegalOption {
                    binder: spec.bind.clone(),
                },
            ));
        }

        Ok(PendingChoiceRequest {
            decision: DecisionId(path.as_str().to_owned()),
            seat,
            binder: spec.bind.clone(),
            kind,
            options,
            min,
            max,
        })
    }
}

fn token_value(
    ctx: &EvalCtx<'_>,
    token: &crate::def::Expr,
    path: &EffectPath,
) -> Result<TokenId, RuntimeError> {
    let value = expr(ctx, token).map_err(fail(path))?;
    value.as_token().ok_or_else(|| {
        RuntimeError::exec(path.as_str(), EvalError::kind(ValueKind::Token, &value))
    })
}

fn var_def<'d>(env: Env<'d>, slot: &VarSlot, path: &EffectPath) -> Result<&'d VarDef, RuntimeError> {
    env.def.var(slot_scope(slot), slot.name()).ok_or_else(|| {
        RuntimeError::exec(path.as_str(), EvalError::unknown("variable", slot.name()))
    })
}

fn current(state: &GameState, slot: &VarSlot, def: &VarDef) -> Value {
    state
        .read_var(slot)
        .cloned()
        .unwrap_or_else(|| def.init.clone())
}

fn var_kind(path: &EffectPath, slot: &VarSlot, expected: ValueKind) -> RuntimeError {
    RuntimeError::exec(
        path.as_str(),
        ExecFailure::VarKind {
            var: slot.to_string(),
            expected,
        },
    )
}

fn seat_name(env: Env<'_>, seat: PlayerId, path: &EffectPath) -> Result<String, RuntimeError> {
    env.def
        .seat_name(seat)
        .map(str::to_owned)
        .ok_or_else(|| RuntimeError::exec(path.as_str(), EvalError::unknown("seat", seat.to_string())))
}

fn not_card_driven(path: &EffectPath, effect: &Effect) -> RuntimeError {
    RuntimeError::exec(
        path.as_str(),
        ExecFailure::NotCardDriven {
            effect: effect.as_snake_case().to_owned(),
        },
    )
}

fn space_lattice<'d>(
    env: Env<'d>,
    zone: ZoneId,
    lattice: &str,
    path: &EffectPath,
) -> Result<&'d LatticeDef, RuntimeError> {
    let def = env.def.lattice(lattice).ok_or_else(|| {
        RuntimeError::exec(path.as_str(), EvalError::unknown("marker lattice", lattice))
    })?;
    let applies = def.scope == MarkerScope::Space
        && env.def.zone(zone).is_some_and(|z| {
            z.space && def.applies_to.as_ref().is_none_or(|m| m.matches(z))
        });
    if !applies {
        return Err(RuntimeError::exec(
            path.as_str(),
            ExecFailure::MarkerNotApplicable {
                lattice: lattice.to_owned(),
                zone: env.def.zone_name(zone).to_owned(),
            },
        ));
    }
    Ok(def)
}

fn global_lattice<'d>(
    env: Env<'d>,
    marker: &str,
    path: &EffectPath,
) -> Result<&'d LatticeDef, RuntimeError> {
    match env.def.lattice(marker) {
        Some(def) if def.scope == MarkerScope::Global => Ok(def),
        Some(_) => Err(RuntimeError::exec(
            path.as_str(),
            ExecFailure::MarkerNotApplicable {
                lattice: marker.to_owned(),
                zone: "global".to_owned(),
            },
        )),
        None => Err(RuntimeError::exec(
            path.as_str(),
            EvalError::unknown("marker lattice", marker),
        )),
    }
}

fn state_name(lattice: &LatticeDef, value: &Value, path: &EffectPath) -> Result<String, RuntimeError> {
    let name = value.as_str().ok_or_else(|| {
        RuntimeError::exec(path.as_str(), EvalError::kind(ValueKind::Str, value))
    })?;
    if lattice.position(name).is_none() {
        return Err(RuntimeError::exec(
            path.as_str(),
            ExecFailure::UnknownMarkerState {
                lattice: lattice.id.clone(),
                state: name.to_owned(),
            },
        ));
    }
    Ok(name.to_owned())
}

fn shifted(
    lattice: &LatticeDef,
    from: &str,
    delta: i64,
    path: &EffectPath,
) -> Result<String, RuntimeError> {
    lattice
        .shifted(from, delta)
        .map(str::to_owned)
        .ok_or_else(|| {
            RuntimeError::exec(
                path.as_str(),
                ExecFailure::UnknownMarkerState {
                    lattice: lattice.id.clone(),
                    state: from.to_owned(),
                },
            )
        })
}
