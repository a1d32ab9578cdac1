//! Reference and binder-scope checks over expressions and effect trees.
//!
//! Action stages are walked in the order the pipeline runs them, once for the
//! plain operation and once per declared special activity, so binders carried
//! across stages are checked against the same rule the executor applies.

use std::collections::BTreeSet;

use crate::def::{
    ActionDef, ChoiceSpec, Cond, Domain, Effect, Expr, GameDef, MarkerScope, MoveClass, PlayerSel,
    TokenFilter, TriggerDef, TriggerEvent, VarDef, VarRef, ZoneRef,
};
use crate::effect::guaranteed_binders;
use crate::pipeline::{Segment, layout};
use crate::state::{Value, ValueKind};

use super::{Diagnostic, DiagnosticCode, closest};

pub(super) fn check(def: &GameDef) -> Vec<Diagnostic> {
    let mut walker = Walker {
        def,
        scope: Vec::new(),
        out: Vec::new(),
    };
    for action in &def.actions {
        walker.action(action);
    }
    for trigger in &def.triggers {
        walker.trigger(trigger);
    }
    for metric in &def.metrics {
        walker.reset(Vec::new());
        walker.expr(&metric.formula, &format!("metrics[{}].formula", metric.id));
    }
    for victory in &def.victory {
        walker.reset(Vec::new());
        walker.expr(&victory.formula, &format!("victory[{}].formula", victory.seat));
    }
    for terminal in &def.terminals {
        walker.reset(Vec::new());
        walker.cond(&terminal.when, &format!("terminals[{}].when", terminal.id));
    }
    walker.out
}

struct Walker<'a> {
    def: &'a GameDef,
    /// Binders visible at the current node, innermost last.
    scope: Vec<String>,
    out: Vec<Diagnostic>,
}

impl<'a> Walker<'a> {
    fn reset(&mut self, names: Vec<String>) {
        self.scope = names;
    }

    fn error(&mut self, code: DiagnosticCode, path: &str, message: String) {
        self.out.push(Diagnostic::error(code, path, message));
    }

    fn unknown<'k>(&mut self, what: &str, name: &str, known: impl IntoIterator<Item = &'k str>, path: &str) {
        self.out.push(
            Diagnostic::error(
                DiagnosticCode::UnknownReference,
                path,
                format!("unknown {what} `{name}`"),
            )
            .with_suggestion(closest(name, known)),
        );
    }

    // ===== actions and triggers =====

    fn action(&mut self, action: &'a ActionDef) {
        let path = format!("actions[{}]", action.id);
        let names = self.params(action, &path);
        if let Some(pre) = &action.pre {
            self.reset(names);
            self.cond(pre, &format!("{path}.pre"));
        }

        let mut layouts = vec![layout(action, None, false)];
        if action.class != MoveClass::Special {
            if let Some(compound) = &action.compound {
                for special in &compound.specials {
                    let found = self.def.actions.iter().find(|a| a.id == *special);
                    if let Some(special) = found.filter(|a| a.class == MoveClass::Special) {
                        layouts.push(layout(action, Some((special, compound)), false));
                    }
                }
            }
        }
        for segments in layouts {
            self.segments(action, &segments);
        }
    }

    /// Walks parameter domains, each seeing the parameters declared before
    /// it. Returns every parameter name.
    fn params(&mut self, action: &ActionDef, path: &str) -> Vec<String> {
        let mut names = Vec::new();
        for param in &action.params {
            self.reset(names.clone());
            let at = format!("{path}.params[{}]", param.name);
            self.domain(&param.domain, &at);
            if statically_empty(self.def, &param.domain) {
                self.out.push(Diagnostic::warning(
                    DiagnosticCode::EmptyDomain,
                    at,
                    format!("parameter `{}` can never be bound", param.name),
                ));
            }
            names.push(param.name.clone());
        }
        names
    }

    fn segments(&mut self, primary: &ActionDef, segments: &[Segment]) {
        let mut carried: BTreeSet<String> = BTreeSet::new();
        for segment in segments {
            let Segment::Effects {
                action,
                stage,
                effects,
                special,
            } = segment
            else {
                continue;
            };
            let owner = if *special {
                self.def.actions.iter().find(|a| a.id == *action)
            } else {
                Some(primary)
            };
            let mut names: Vec<String> = owner
                .map(|a| a.params.iter().map(|p| p.name.clone()).collect())
                .unwrap_or_default();
            names.extend(carried.iter().cloned());
            self.reset(names);

            let path = if stage == "cost" {
                format!("actions[{action}].cost")
            } else {
                format!("actions[{action}].stages[{stage}]")
            };
            self.effects(effects, &path);
            carried.extend(guaranteed_binders(effects));
        }
    }

    fn trigger(&mut self, trigger: &TriggerDef) {
        let path = format!("triggers[{}]", trigger.id);
        let def = self.def;
        match &trigger.on {
            TriggerEvent::PhaseEnter(phase) | TriggerEvent::PhaseExit(phase) => {
                if !def.turn.phases.contains(phase) {
                    let phases = def.turn.phases.iter().map(String::as_str);
                    self.unknown("phase", phase, phases, &format!("{path}.on"));
                }
            }
            TriggerEvent::ActionResolved(action) => {
                if !def.actions.iter().any(|a| a.id == *action) {
                    let actions = def.actions.iter().map(|a| a.id.as_str());
                    self.unknown("action", action, actions, &format!("{path}.on"));
                }
            }
            TriggerEvent::CardPlayed => {
                if def.turn.order.card_driven().is_none() {
                    self.error(
                        DiagnosticCode::TurnOrder,
                        &format!("{path}.on"),
                        "card_played triggers need a card-driven turn order".to_owned(),
                    );
                }
            }
            TriggerEvent::Custom(_) => {}
        }
        self.reset(Vec::new());
        if let Some(when) = &trigger.when {
            self.cond(when, &format!("{path}.when"));
        }
        self.effects(&trigger.effects, &format!("{path}.effects"));
    }

    // ===== effects =====

    /// Walks a sequence; binders an effect exports stay visible for the rest
    /// of it. The caller restores the scope.
    fn effects(&mut self, effects: &[Effect], path: &str) {
        for (i, effect) in effects.iter().enumerate() {
            let at = format!("{path}[{i}].{}", effect.as_snake_case());
            self.effect(effect, &at);
            self.scope
                .extend(guaranteed_binders(std::slice::from_ref(effect)));
        }
    }

    /// Walks a nested body and drops whatever it bound.
    fn block(&mut self, bind: &[&str], body: &[Effect], path: &str) {
        let mark = self.scope.len();
        self.scope.extend(bind.iter().map(|b| (*b).to_owned()));
        self.effects(body, path);
        self.scope.truncate(mark);
    }

    fn effect(&mut self, effect: &Effect, path: &str) {
        match effect {
            Effect::SetVar { var, value } => {
                self.var(var, path);
                self.expr(value, path);
            }
            Effect::AddVar { var, delta } => {
                self.arithmetic_target(var, path);
                self.expr(delta, path);
            }
            Effect::TransferVar { from, to, amount } => {
                self.arithmetic_target(from, path);
                self.arithmetic_target(to, path);
                self.expr(amount, path);
            }
            Effect::CreateToken {
                kind,
                zone,
                owner,
                props,
                bind: _,
            } => {
                self.token_type(kind, path);
                self.zone(zone, path);
                if let Some(owner) = owner {
                    self.player(owner, path);
                }
                for value in props.values() {
                    self.expr(value, path);
                }
            }
            Effect::DestroyToken { token } => self.expr(token, path),
            Effect::MoveToken { token, to } => {
                self.expr(token, path);
                self.zone(to, path);
            }
            Effect::MoveAll { from, to, filter } => {
                self.zone(from, path);
                self.zone(to, path);
                self.filter(filter, path);
            }
            Effect::SetTokenProp { token, value, .. } => {
                self.expr(token, path);
                self.expr(value, path);
            }
            Effect::SetMarker {
                zone,
                lattice,
                state,
            } => {
                self.zone(zone, path);
                self.lattice(lattice, MarkerScope::Space, Some(state), path);
                self.expr(state, path);
            }
            Effect::ShiftMarker {
                zone,
                lattice,
                delta,
            } => {
                self.zone(zone, path);
                self.lattice(lattice, MarkerScope::Space, None, path);
                self.expr(delta, path);
            }
            Effect::SetGlobalMarker { marker, state } => {
                self.lattice(marker, MarkerScope::Global, Some(state), path);
                self.expr(state, path);
            }
            Effect::ShiftGlobalMarker { marker, delta } => {
                self.lattice(marker, MarkerScope::Global, None, path);
                self.expr(delta, path);
            }
            Effect::Conceal { zone } | Effect::Shuffle { zone } => self.zone(zone, path),
            Effect::Reveal { zone, to } => {
                self.zone(zone, path);
                if let Some(to) = to {
                    self.player(to, path);
                }
            }
            Effect::Draw { from, to, count } => {
                self.zone(from, path);
                self.zone(to, path);
                self.expr(count, path);
            }
            Effect::ChooseOne(choice) => self.choice(choice, path),
            Effect::ChooseN { choice, min, max } => {
                self.choice(choice, path);
                self.expr(min, path);
                self.expr(max, path);
                self.static_range(min, max, path);
            }
            Effect::RollRandom { min, max, .. } => {
                self.expr(min, path);
                self.expr(max, path);
                self.static_range(min, max, path);
            }
            Effect::ForEach {
                bind,
                over,
                limit,
                body,
            } => {
                self.domain(over, path);
                if let Some(limit) = limit {
                    self.expr(limit, path);
                }
                self.block(&[bind.as_str()], body, &format!("{path}.body"));
            }
            Effect::Reduce {
                over,
                item,
                acc,
                init,
                next,
                ..
            } => {
                self.domain(over, path);
                self.expr(init, path);
                let mark = self.scope.len();
                self.scope.push(item.clone());
                self.scope.push(acc.clone());
                self.expr(next, path);
                self.scope.truncate(mark);
            }
            Effect::If {
                when,
                then,
                otherwise,
            } => {
                self.cond(when, path);
                self.block(&[], then, &format!("{path}.then"));
                self.block(&[], otherwise, &format!("{path}.otherwise"));
            }
            Effect::Let { bind, value, body } => {
                self.expr(value, path);
                self.block(&[bind.as_str()], body, &format!("{path}.body"));
            }
            Effect::GotoPhaseExact { phase } => {
                let def = self.def;
                if !def.turn.phases.contains(phase) {
                    let phases = def.turn.phases.iter().map(String::as_str);
                    self.unknown("phase", phase, phases, path);
                }
            }
            Effect::FireEvent { event } => {
                let listened = self
                    .def
                    .triggers
                    .iter()
                    .any(|t| matches!(&t.on, TriggerEvent::Custom(e) if e == event));
                if !listened {
                    self.out.push(Diagnostic::warning(
                        DiagnosticCode::UnknownReference,
                        path,
                        format!("no trigger listens for event `{event}`"),
                    ));
                }
            }
            Effect::GrantFreeOperation { seat, actions } => {
                self.player(seat, path);
                let def = self.def;
                for action in actions {
                    if !def.actions.iter().any(|a| a.id == *action) {
                        let known = def.actions.iter().map(|a| a.id.as_str());
                        self.unknown("action", action, known, path);
                    }
                }
            }
            Effect::SetEligibility { seat, .. } => self.player(seat, path),
        }
    }

    fn choice(&mut self, choice: &ChoiceSpec, path: &str) {
        self.domain(&choice.options, path);
        if statically_empty(self.def, &choice.options) {
            self.error(
                DiagnosticCode::EmptyDomain,
                path,
                format!("choice `{}` has no option in any state", choice.bind),
            );
        }
        if let Some(chooser) = &choice.chooser {
            self.player(chooser, path);
        }
        if let Some(legal_if) = &choice.legal_if {
            let mark = self.scope.len();
            self.scope.push(choice.bind.clone());
            self.cond(legal_if, &format!("{path}.legal_if"));
            self.scope.truncate(mark);
        }
        if let Some(probe) = &choice.probe {
            self.token_type(&probe.kind, path);
            if let Some(owner) = &probe.owner {
                self.player(owner, path);
            }
        }
    }

    fn static_range(&mut self, min: &Expr, max: &Expr, path: &str) {
        if let (Some(lo), Some(hi)) = (min.const_int(), max.const_int()) {
            if lo > hi {
                self.error(
                    DiagnosticCode::EmptyDomain,
                    path,
                    format!("range {lo}..={hi} is empty"),
                );
            }
        }
    }

    // ===== references =====

    fn bound(&mut self, name: &str, path: &str) {
        if self.scope.iter().any(|b| b == name) {
            return;
        }
        let visible: BTreeSet<&str> = self.scope.iter().map(String::as_str).collect();
        let diagnostic = Diagnostic::error(
            DiagnosticCode::UnboundBinder,
            path,
            format!("binder `{name}` is not bound on every path reaching this point"),
        )
        .with_suggestion(closest(name, visible.iter().copied()))
        .with_alternatives(visible.iter().map(|s| (*s).to_owned()).collect());
        self.out.push(diagnostic);
    }

    fn zone(&mut self, zone: &ZoneRef, path: &str) {
        match zone {
            ZoneRef::Named(name) => {
                let def = self.def;
                if !def.zones.iter().any(|z| z.id == *name) {
                    let zones = def.zones.iter().map(|z| z.id.as_str());
                    self.unknown("zone", name, zones, path);
                }
            }
            ZoneRef::Bound(name) => self.bound(name, path),
        }
    }

    fn player(&mut self, sel: &PlayerSel, path: &str) {
        match sel {
            PlayerSel::Active => {}
            PlayerSel::Seat(seat) => {
                let def = self.def;
                if !def.seats.contains(seat) {
                    let seats = def.seats.iter().map(String::as_str);
                    self.unknown("seat", seat, seats, path);
                }
            }
            PlayerSel::Bound(name) => self.bound(name, path),
        }
    }

    fn token_type(&mut self, kind: &str, path: &str) {
        let def = self.def;
        if !def.token_types.iter().any(|t| t.id == kind) {
            let kinds = def.token_types.iter().map(|t| t.id.as_str());
            self.unknown("token type", kind, kinds, path);
        }
    }

    fn filter(&mut self, filter: &TokenFilter, path: &str) {
        if let Some(kind) = &filter.kind {
            self.token_type(kind, path);
        }
        if let Some(owner) = &filter.owner {
            self.player(owner, path);
        }
    }

    /// Checks a lattice reference and, for a literal state, that the state
    /// belongs to it.
    fn lattice(&mut self, id: &str, scope: MarkerScope, state: Option<&Expr>, path: &str) {
        let def = self.def;
        let Some(lattice) = def.lattices.iter().find(|l| l.id == id && l.scope == scope) else {
            let known = def
                .lattices
                .iter()
                .filter(|l| l.scope == scope)
                .map(|l| l.id.as_str());
            self.unknown(&format!("{scope} lattice"), id, known, path);
            return;
        };
        if let Some(Expr::Lit(Value::Str(state))) = state {
            if lattice.position(state).is_none() {
                let states = lattice.states.iter().map(|s| s.id.as_str());
                self.out.push(
                    Diagnostic::error(
                        DiagnosticCode::Lattice,
                        path,
                        format!("`{state}` is not a state of lattice `{id}`"),
                    )
                    .with_suggestion(closest(state, states)),
                );
            }
        }
    }

    fn var(&mut self, var: &VarRef, path: &str) -> Option<&'a VarDef> {
        let def = self.def;
        let (decls, what) = match var {
            VarRef::Global(_) => (&def.globals, "global variable"),
            VarRef::Player { player, .. } => {
                self.player(player, path);
                (&def.player_vars, "player variable")
            }
            VarRef::Zone { zone, .. } => {
                self.zone(zone, path);
                (&def.zone_vars, "zone variable")
            }
        };
        let name = var.name();
        let found = decls.iter().find(|v| v.name == name);
        if found.is_none() {
            let known = decls.iter().map(|v| v.name.as_str());
            self.unknown(what, name, known, path);
        }
        found
    }

    fn arithmetic_target(&mut self, var: &VarRef, path: &str) {
        if let Some(decl) = self.var(var, path) {
            if decl.is_bool() {
                self.error(
                    DiagnosticCode::BooleanArithmetic,
                    path,
                    format!("`{}` is boolean and cannot take arithmetic updates", decl.name),
                );
            }
        }
    }

    // ===== expressions =====

    fn expr(&mut self, e: &Expr, path: &str) {
        match e {
            Expr::Lit(_) | Expr::ActiveSeat => {}
            Expr::Bound(name) => self.bound(name, path),
            Expr::Var(var) => {
                self.var(var, path);
            }
            Expr::ZoneAttr { zone, .. } => self.zone(zone, path),
            Expr::TokenProp { token, .. } => self.expr(token, path),
            Expr::Marker { zone, lattice } | Expr::MarkerValue { zone, lattice } => {
                self.zone(zone, path);
                self.lattice(lattice, MarkerScope::Space, None, path);
            }
            Expr::GlobalMarker(marker) | Expr::GlobalMarkerValue(marker) => {
                self.lattice(marker, MarkerScope::Global, None, path);
            }
            Expr::TokenCount { zone, filter } => {
                self.zone(zone, path);
                self.filter(filter, path);
            }
            Expr::Aggregate {
                over, bind, value, ..
            } => {
                self.domain(over, path);
                if let Some(value) = value {
                    let mark = self.scope.len();
                    self.scope.push(bind.clone());
                    self.expr(value, path);
                    self.scope.truncate(mark);
                }
            }
            Expr::Arith { op, lhs, rhs } => {
                self.expr(lhs, path);
                self.expr(rhs, path);
                if op.is_division() && rhs.const_int() == Some(0) {
                    self.error(
                        DiagnosticCode::DivisionByZero,
                        path,
                        format!("{op} by a divisor that is always zero"),
                    );
                }
            }
            Expr::If {
                when,
                then,
                otherwise,
            } => {
                self.cond(when, path);
                self.expr(then, path);
                self.expr(otherwise, path);
            }
            Expr::TableCell { table, row, column } => {
                self.expr(row, path);
                let def = self.def;
                match def.tables.iter().find(|t| t.id == *table) {
                    None => {
                        let tables = def.tables.iter().map(|t| t.id.as_str());
                        self.unknown("table", table, tables, path);
                    }
                    Some(found) => {
                        if !found.rows.is_empty() && !found.rows.iter().any(|r| r.contains_key(column)) {
                            let columns: BTreeSet<&str> = found
                                .rows
                                .iter()
                                .flat_map(|r| r.keys().map(String::as_str))
                                .collect();
                            self.unknown("table column", column, columns, path);
                        }
                    }
                }
            }
            Expr::Collect(domain) => self.domain(domain, path),
            Expr::CurrentCard(_) => {
                if self.def.turn.order.card_driven().is_none() {
                    self.error(
                        DiagnosticCode::TurnOrder,
                        path,
                        "the current card only exists under a card-driven turn order".to_owned(),
                    );
                }
            }
            Expr::Metric(metric) => {
                let def = self.def;
                if !def.metrics.iter().any(|m| m.id == *metric) {
                    let metrics = def.metrics.iter().map(|m| m.id.as_str());
                    self.unknown("metric", metric, metrics, path);
                }
            }
            Expr::VictoryMargin(seat) => {
                let def = self.def;
                if !def.victory.iter().any(|v| v.seat == *seat) {
                    let seats = def.victory.iter().map(|v| v.seat.as_str());
                    self.unknown("victory marker", seat, seats, path);
                }
            }
            Expr::NextInOrder {
                source,
                anchor,
                bind,
                when,
                ..
            } => {
                self.domain(source, path);
                self.expr(anchor, path);
                let mark = self.scope.len();
                self.scope.push(bind.clone());
                self.cond(when, path);
                self.scope.truncate(mark);

                if let (Some(source_kind), Some(anchor_kind)) =
                    (static_kind(source), anchor_kind(anchor))
                {
                    if source_kind != anchor_kind {
                        self.error(
                            DiagnosticCode::ShapeMismatch,
                            path,
                            format!(
                                "anchor is a {anchor_kind} but the source yields {source_kind} values"
                            ),
                        );
                    }
                }
            }
        }
    }

    fn cond(&mut self, c: &Cond, path: &str) {
        match c {
            Cond::Const(_) => {}
            Cond::Cmp { lhs, rhs, .. } => {
                self.expr(lhs, path);
                self.expr(rhs, path);
            }
            Cond::And(items) | Cond::Or(items) => {
                for item in items {
                    self.cond(item, path);
                }
            }
            Cond::Not(inner) => self.cond(inner, path),
            Cond::In { item, set } => {
                self.expr(item, path);
                self.domain(set, path);
            }
            Cond::Adjacent { a, b } => {
                self.zone(a, path);
                self.zone(b, path);
            }
            Cond::Truthy(e) => self.expr(e, path),
        }
    }

    fn domain(&mut self, d: &Domain, path: &str) {
        match d {
            Domain::Players | Domain::Zones | Domain::Enum(_) => {}
            Domain::TokensIn { zone, filter } => {
                self.zone(zone, path);
                self.filter(filter, path);
            }
            Domain::Adjacent(zone) => self.zone(zone, path),
            Domain::IntRange { min, max } => {
                self.expr(min, path);
                self.expr(max, path);
            }
            Domain::TableRows(table) => {
                let def = self.def;
                if !def.tables.iter().any(|t| t.id == *table) {
                    let tables = def.tables.iter().map(|t| t.id.as_str());
                    self.unknown("table", table, tables, path);
                }
            }
            Domain::Concat(parts) => {
                for part in parts {
                    self.domain(part, path);
                }
            }
            Domain::Filter { source, bind, when } => {
                self.domain(source, path);
                let mark = self.scope.len();
                self.scope.push(bind.clone());
                self.cond(when, path);
                self.scope.truncate(mark);
            }
            Domain::Bound(name) => self.bound(name, path),
        }
    }
}

/// True when the domain resolves to nothing whatever the state.
fn statically_empty(def: &GameDef, d: &Domain) -> bool {
    match d {
        Domain::Enum(values) => values.is_empty(),
        Domain::IntRange { min, max } => match (min.const_int(), max.const_int()) {
            (Some(lo), Some(hi)) => lo > hi,
            _ => false,
        },
        Domain::TableRows(table) => def
            .tables
            .iter()
            .find(|t| t.id == *table)
            .is_some_and(|t| t.rows.is_empty()),
        Domain::Zones => def.zones.is_empty(),
        Domain::Concat(parts) => parts.iter().all(|p| statically_empty(def, p)),
        Domain::Filter { source, when, .. } => {
            matches!(**when, Cond::Const(false)) || statically_empty(def, source)
        }
        Domain::Players
        | Domain::TokensIn { .. }
        | Domain::Adjacent(_)
        | Domain::Bound(_) => false,
    }
}

/// Kind of every member of a domain, when it is known without running it.
/// Bound and mixed sources have no static kind.
fn static_kind(d: &Domain) -> Option<ValueKind> {
    match d {
        Domain::Players => Some(ValueKind::Player),
        Domain::Zones | Domain::Adjacent(_) => Some(ValueKind::Zone),
        Domain::TokensIn { .. } => Some(ValueKind::Token),
        Domain::IntRange { .. } | Domain::TableRows(_) => Some(ValueKind::Int),
        Domain::Enum(values) => uniform(values.iter().map(Value::kind)),
        Domain::Concat(parts) => {
            let kinds: Option<Vec<ValueKind>> = parts.iter().map(static_kind).collect();
            uniform(kinds?.into_iter())
        }
        Domain::Filter { source, .. } => static_kind(source),
        Domain::Bound(_) => None,
    }
}

fn uniform(mut kinds: impl Iterator<Item = ValueKind>) -> Option<ValueKind> {
    let first = kinds.next()?;
    kinds.all(|k| k == first).then_some(first)
}

fn anchor_kind(e: &Expr) -> Option<ValueKind> {
    match e {
        Expr::Lit(value) => Some(value.kind()),
        Expr::ActiveSeat => Some(ValueKind::Player),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{ArithOp, CmpOp, ParamDef, VarDef, ZoneDef};

    fn base() -> GameDef {
        let mut def = GameDef::new("walk", ["us", "vc"]);
        def.zones = vec![ZoneDef::space("hue"), ZoneDef::space("saigon")];
        def.globals = vec![VarDef::int("aid", 0, 75, 15), VarDef::bool("monsoon", false)];
        def
    }

    fn codes(def: &GameDef) -> Vec<DiagnosticCode> {
        check(def).into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn branch_binder_is_not_visible_in_next_stage() {
        let mut def = base();
        def.actions = vec![
            ActionDef::new("sweep", MoveClass::Operation)
                .stage(
                    "select",
                    vec![Effect::when(
                        Cond::Const(true),
                        vec![Effect::choose_one(ChoiceSpec::new("space", Domain::Zones))],
                        vec![],
                    )],
                )
                .stage(
                    "resolve",
                    vec![Effect::MoveAll {
                        from: ZoneRef::bound("spcae"),
                        to: ZoneRef::named("saigon"),
                        filter: TokenFilter::any(),
                    }],
                ),
        ];
        let diagnostics = check(&def);
        let unbound = diagnostics
            .iter()
            .find(|d| d.code == DiagnosticCode::UnboundBinder)
            .expect("binder reported");
        assert!(unbound.path.starts_with("actions[sweep].stages[resolve]"));
        assert!(unbound.alternatives.is_empty());
    }

    #[test]
    fn binder_from_both_branches_carries_over() {
        let mut def = base();
        let choose = || Effect::choose_one(ChoiceSpec::new("space", Domain::Zones));
        def.actions = vec![
            ActionDef::new("sweep", MoveClass::Operation)
                .stage("select", vec![Effect::when(Cond::Const(true), vec![choose()], vec![choose()])])
                .stage("resolve", vec![Effect::Shuffle { zone: ZoneRef::bound("space") }]),
        ];
        assert!(!codes(&def).contains(&DiagnosticCode::UnboundBinder));
    }

    #[test]
    fn misspelt_binder_gets_a_suggestion() {
        let mut def = base();
        def.actions = vec![
            ActionDef::new("train", MoveClass::Operation)
                .param(ParamDef::one("target", Domain::Zones))
                .stage("place", vec![Effect::Shuffle { zone: ZoneRef::bound("targte") }]),
        ];
        let diagnostics = check(&def);
        let unbound = diagnostics
            .iter()
            .find(|d| d.code == DiagnosticCode::UnboundBinder)
            .expect("binder reported");
        assert_eq!(unbound.suggestion.as_deref(), Some("target"));
        assert_eq!(unbound.alternatives, vec!["target".to_owned()]);
    }

    #[test]
    fn boolean_arithmetic_and_zero_divisor_are_rejected() {
        let mut def = base();
        def.actions = vec![
            ActionDef::new("bad", MoveClass::Event).stage(
                "main",
                vec![
                    Effect::add_var(VarRef::global("monsoon"), 1),
                    Effect::set_var(
                        VarRef::global("aid"),
                        Expr::arith(
                            ArithOp::Div,
                            Expr::global("aid"),
                            Expr::arith(ArithOp::Sub, Expr::int(2), Expr::int(2)),
                        ),
                    ),
                ],
            ),
        ];
        let found = codes(&def);
        assert!(found.contains(&DiagnosticCode::BooleanArithmetic));
        assert!(found.contains(&DiagnosticCode::DivisionByZero));
    }

    #[test]
    fn empty_choice_domain_is_rejected() {
        let mut def = base();
        def.actions = vec![ActionDef::new("roll", MoveClass::Event).stage(
            "main",
            vec![Effect::choose_one(ChoiceSpec::new("n", Domain::range(3, 1)))],
        )];
        assert!(codes(&def).contains(&DiagnosticCode::EmptyDomain));
    }

    #[test]
    fn next_in_order_shape_is_checked_for_static_sources_only() {
        let next = |source: Domain| Expr::NextInOrder {
            source,
            anchor: Box::new(Expr::int(3)),
            bind: "z".into(),
            when: Box::new(Cond::cmp(CmpOp::Eq, Expr::bound("z"), Expr::bound("z"))),
            wrap: false,
        };
        let mut def = base();
        def.metrics = vec![crate::def::MetricDef {
            id: "m".into(),
            formula: next(Domain::Zones),
        }];
        assert!(codes(&def).contains(&DiagnosticCode::ShapeMismatch));

        def.actions = vec![ActionDef::new("probe", MoveClass::Event)
            .param(ParamDef::one("list", Domain::Enum(vec![Value::List(Vec::new())])))
            .pre(Cond::Truthy(next(Domain::Bound("list".into()))))];
        def.metrics.clear();
        assert!(!codes(&def).contains(&DiagnosticCode::ShapeMismatch));
    }
}
