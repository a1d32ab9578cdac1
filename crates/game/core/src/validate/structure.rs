//! Declaration-level checks: ids, player range, turn order, compounds and
//! scenario setup.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::KernelConfig;
use crate::def::{
    CardDrivenDef, CompoundConstraint, GameDef, LatticeDef, MarkerScope, MoveClass, Outcome,
    PivotalSel, SpecialTiming, TurnOrderDef, VarDef, VarKind, VarScope,
};
use crate::state::Value;

use super::{Diagnostic, DiagnosticCode, closest};

pub(super) fn check(def: &GameDef) -> Vec<Diagnostic> {
    let mut checker = Checker {
        def,
        out: Vec::new(),
    };
    checker.duplicates();
    checker.players();
    checker.zones();
    checker.vars();
    checker.lattices();
    checker.actions();
    checker.turn_order();
    checker.setup();
    checker.outcomes();
    checker.out
}

struct Checker<'a> {
    def: &'a GameDef,
    out: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    fn error(&mut self, code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) {
        self.out.push(Diagnostic::error(code, path, message));
    }

    /// Reports `name` as unknown when it is not among `known`, suggesting the
    /// closest known name.
    fn expect<'k>(
        &mut self,
        what: &str,
        name: &str,
        known: impl IntoIterator<Item = &'k str> + Clone,
        path: impl Into<String>,
    ) -> bool {
        if known.clone().into_iter().any(|k| k == name) {
            return true;
        }
        self.out.push(
            Diagnostic::error(
                DiagnosticCode::UnknownReference,
                path,
                format!("unknown {what} `{name}`"),
            )
            .with_suggestion(closest(name, known)),
        );
        false
    }

    fn seat(&mut self, seat: &str, path: impl Into<String>) -> bool {
        let def = self.def;
        let seats = def.seats.iter().map(String::as_str);
        self.expect("seat", seat, seats, path)
    }

    fn zone(&mut self, zone: &str, path: impl Into<String>) -> bool {
        let def = self.def;
        let zones = def.zones.iter().map(|z| z.id.as_str());
        self.expect("zone", zone, zones, path)
    }

    fn phase(&mut self, phase: &str, path: impl Into<String>) -> bool {
        let def = self.def;
        let phases = def.turn.phases.iter().map(String::as_str);
        self.expect("phase", phase, phases, path)
    }

    fn action(&mut self, action: &str, path: impl Into<String>) -> bool {
        let def = self.def;
        let actions = def.actions.iter().map(|a| a.id.as_str());
        self.expect("action", action, actions, path)
    }

    fn lattice(&self, id: &str) -> Option<&'a LatticeDef> {
        let def = self.def;
        def.lattices.iter().find(|l| l.id == id)
    }

    fn lattice_state(&mut self, lattice: &str, scope: MarkerScope, state: &str, path: &str) {
        let def = self.def;
        let known = def
            .lattices
            .iter()
            .filter(|l| l.scope == scope)
            .map(|l| l.id.as_str());
        if !self.expect("lattice", lattice, known, path) {
            return;
        }
        if let Some(found) = self.lattice(lattice) {
            let states = found.states.iter().map(|s| s.id.as_str());
            self.expect("marker state", state, states, path);
        }
    }

    // ===== ids =====

    fn duplicates(&mut self) {
        let def = self.def;
        self.unique("seats", def.seats.iter().map(String::as_str));
        self.unique("zones", def.zones.iter().map(|z| z.id.as_str()));
        self.unique("token_types", def.token_types.iter().map(|t| t.id.as_str()));
        self.unique("globals", def.globals.iter().map(|v| v.name.as_str()));
        self.unique("player_vars", def.player_vars.iter().map(|v| v.name.as_str()));
        self.unique("zone_vars", def.zone_vars.iter().map(|v| v.name.as_str()));
        self.unique("lattices", def.lattices.iter().map(|l| l.id.as_str()));
        self.unique("tables", def.tables.iter().map(|t| t.id.as_str()));
        self.unique("actions", def.actions.iter().map(|a| a.id.as_str()));
        self.unique("triggers", def.triggers.iter().map(|t| t.id.as_str()));
        self.unique("terminals", def.terminals.iter().map(|t| t.id.as_str()));
        self.unique("metrics", def.metrics.iter().map(|m| m.id.as_str()));
        self.unique("victory", def.victory.iter().map(|v| v.seat.as_str()));
        self.unique("stacking", def.stacking.iter().map(|s| s.id.as_str()));
        self.unique("turn.phases", def.turn.phases.iter().map(String::as_str));
        for lattice in &def.lattices {
            let path = format!("lattices[{}].states", lattice.id);
            self.unique(&path, lattice.states.iter().map(|s| s.id.as_str()));
        }
        for action in &def.actions {
            let path = format!("actions[{}].params", action.id);
            self.unique(&path, action.params.iter().map(|p| p.name.as_str()));
            let path = format!("actions[{}].stages", action.id);
            self.unique(&path, action.stages.iter().map(|s| s.id.as_str()));
        }
    }

    fn unique<'i>(&mut self, path: &str, ids: impl Iterator<Item = &'i str>) {
        let mut seen = BTreeSet::new();
        for id in ids {
            if !seen.insert(id) {
                self.error(
                    DiagnosticCode::DuplicateId,
                    format!("{path}[{id}]"),
                    format!("`{id}` is declared more than once"),
                );
            }
        }
    }

    // ===== players and zones =====

    fn players(&mut self) {
        let def = self.def;
        let seats = def.seats.len();
        let range = def.players;
        if seats == 0 {
            self.error(DiagnosticCode::PlayerRange, "seats", "no seat is declared");
        }
        if seats > KernelConfig::MAX_SEATS {
            self.error(
                DiagnosticCode::PlayerRange,
                "seats",
                format!("{seats} seats exceed the limit of {}", KernelConfig::MAX_SEATS),
            );
        }
        if range.min == 0 || range.min > range.max || usize::from(range.max) > seats {
            self.error(
                DiagnosticCode::PlayerRange,
                "players",
                format!(
                    "player range {}..={} does not fit {seats} seats",
                    range.min, range.max
                ),
            );
        }
    }

    fn zones(&mut self) {
        let def = self.def;
        for zone in &def.zones {
            if let Some(owner) = &zone.owner {
                self.seat(owner, format!("zones[{}].owner", zone.id));
            }
            for neighbour in &zone.adjacent {
                let path = format!("zones[{}].adjacent", zone.id);
                if *neighbour == zone.id {
                    self.error(
                        DiagnosticCode::UnknownReference,
                        path,
                        format!("zone `{}` lists itself as adjacent", zone.id),
                    );
                    continue;
                }
                self.zone(neighbour, path);
            }
        }
    }

    fn vars(&mut self) {
        let def = self.def;
        for (scope, decls) in [
            (VarScope::Global, &def.globals),
            (VarScope::Player, &def.player_vars),
            (VarScope::Zone, &def.zone_vars),
        ] {
            for var in decls {
                let path = format!("{scope}_vars[{}]", var.name);
                if let Some(message) = init_problem(var, &var.init) {
                    self.error(DiagnosticCode::UnknownReference, path, message);
                }
            }
        }
    }

    fn lattices(&mut self) {
        let def = self.def;
        for lattice in &def.lattices {
            let path = format!("lattices[{}]", lattice.id);
            if lattice.states.is_empty() {
                self.error(DiagnosticCode::Lattice, &path, "lattice declares no state");
                continue;
            }
            let states = lattice.states.iter().map(|s| s.id.as_str());
            self.expect("marker state", &lattice.default, states.clone(), format!("{path}.default"));
            for (from, to) in lattice.transitions.iter().flatten() {
                let at = format!("{path}.transitions");
                self.expect("marker state", from, states.clone(), at.clone());
                self.expect("marker state", to, states.clone(), at);
            }
            if lattice.scope == MarkerScope::Global && lattice.applies_to.is_some() {
                self.error(
                    DiagnosticCode::Lattice,
                    format!("{path}.applies_to"),
                    "a global lattice cannot be restricted to zones",
                );
            }
        }
    }

    // ===== actions =====

    fn actions(&mut self) {
        let def = self.def;
        let pivotal: BTreeSet<&str> = def
            .turn
            .order
            .card_driven()
            .and_then(|cd| cd.pivotal.as_ref())
            .map(|p| p.actions.iter().map(String::as_str).collect())
            .unwrap_or_default();

        for action in &def.actions {
            let path = format!("actions[{}]", action.id);
            for seat in &action.actors {
                self.seat(seat, format!("{path}.actors"));
            }
            for phase in &action.phases {
                self.phase(phase, format!("{path}.phases"));
            }
            if action.class == MoveClass::OperationPlusSpecial {
                self.error(
                    DiagnosticCode::CompoundParam,
                    format!("{path}.class"),
                    "operation_plus_special is the class of a compound move, not of an action",
                );
            }
            if action.class == MoveClass::Pivotal && !pivotal.contains(action.id.as_str()) {
                self.out.push(Diagnostic::warning(
                    DiagnosticCode::Unreachable,
                    format!("{path}.class"),
                    "pivotal action is not listed in the pivotal window and is never offered",
                ));
            }
            let Some(compound) = &action.compound else {
                continue;
            };
            let path = format!("{path}.compound");
            if action.class == MoveClass::Special {
                self.error(
                    DiagnosticCode::CompoundParam,
                    &path,
                    "a special activity cannot carry its own compound",
                );
            }
            if let SpecialTiming::During { after_stage, .. } = &compound.timing {
                let stages = action.stages.iter().map(|s| s.id.as_str());
                self.expect("stage", after_stage, stages, format!("{path}.timing"));
            }
            let mut specials = Vec::new();
            for special in &compound.specials {
                if !self.action(special, format!("{path}.specials")) {
                    continue;
                }
                match def.actions.iter().find(|a| a.id == *special) {
                    Some(found) if found.class == MoveClass::Special => specials.push(found),
                    Some(found) => self.error(
                        DiagnosticCode::CompoundParam,
                        format!("{path}.specials"),
                        format!("`{special}` has class {} instead of special", found.class),
                    ),
                    None => {}
                }
            }
            for (i, constraint) in compound.constraints.iter().enumerate() {
                let (op, sp) = match constraint {
                    CompoundConstraint::Disjoint { operation, special } => (operation, special),
                    CompoundConstraint::Subset { special, operation } => (operation, special),
                };
                let at = format!("{path}.constraints[{i}]");
                if !action.params.iter().any(|p| p.name == *op) {
                    self.error(
                        DiagnosticCode::CompoundParam,
                        &at,
                        format!("operation `{}` has no parameter `{op}`", action.id),
                    );
                }
                for special in &specials {
                    if !special.params.iter().any(|p| p.name == *sp) {
                        self.error(
                            DiagnosticCode::CompoundParam,
                            &at,
                            format!("special activity `{}` has no parameter `{sp}`", special.id),
                        );
                    }
                }
            }
        }
    }

    // ===== turn order =====

    fn turn_order(&mut self) {
        let def = self.def;
        if def.turn.phases.is_empty() {
            self.error(DiagnosticCode::TurnOrder, "turn.phases", "no phase is declared");
        }
        match &def.turn.order {
            TurnOrderDef::RoundRobin | TurnOrderDef::Simultaneous => {}
            TurnOrderDef::FixedOrder(seats) => {
                if seats.is_empty() {
                    self.error(DiagnosticCode::TurnOrder, "turn.order", "fixed order lists no seat");
                }
                for seat in seats {
                    self.seat(seat, "turn.order");
                }
            }
            TurnOrderDef::CardDriven(cd) => self.card_driven(cd),
        }
    }

    fn card_driven(&mut self, cd: &CardDrivenDef) {
        let def = self.def;
        let path = "turn.order.card_driven";
        let cards = &cd.cards;
        for (slot, zone) in [
            ("draw", &cards.draw),
            ("lookahead", &cards.lookahead),
            ("played", &cards.played),
            ("discard", &cards.discard),
        ] {
            self.zone(zone, format!("{path}.cards.{slot}"));
        }
        self.phase(&cd.main_phase, format!("{path}.main_phase"));
        if cd.max_actors == 0 {
            self.error(
                DiagnosticCode::TurnOrder,
                format!("{path}.max_actors"),
                "at least one seat must be able to act per card",
            );
        }
        for (symbol, seat) in &cd.seat_mapping {
            self.seat(seat, format!("{path}.seat_mapping[{symbol}]"));
        }

        for (i, reward) in cd.pass_rewards.iter().enumerate() {
            let at = format!("{path}.pass_rewards[{i}]");
            for seat in &reward.seats {
                self.seat(seat, at.clone());
            }
            match def.globals.iter().find(|v| v.name == reward.var) {
                Some(var) if var.is_bool() => self.error(
                    DiagnosticCode::BooleanArithmetic,
                    at,
                    format!("pass reward credits boolean variable `{}`", reward.var),
                ),
                Some(_) => {}
                None => {
                    let globals = def.globals.iter().map(|v| v.name.as_str());
                    self.expect("global variable", &reward.var, globals, at);
                }
            }
        }

        if let Some(pivotal) = &cd.pivotal {
            let at = format!("{path}.pivotal");
            for action in &pivotal.actions {
                if !self.action(action, format!("{at}.actions")) {
                    continue;
                }
                let class = def
                    .actions
                    .iter()
                    .find(|a| a.id == *action)
                    .map(|a| a.class);
                if class != Some(MoveClass::Pivotal) {
                    self.error(
                        DiagnosticCode::TurnOrder,
                        format!("{at}.actions"),
                        format!("`{action}` is offered in the pivotal window but is not pivotal"),
                    );
                }
            }
            for seat in &pivotal.precedence {
                self.seat(seat, format!("{at}.precedence"));
            }
            for (i, rule) in pivotal.cancellation.iter().enumerate() {
                let rule_path = format!("{at}.cancellation[{i}]");
                self.pivotal_sel(&rule.winner, &rule_path);
                self.pivotal_sel(&rule.canceled, &rule_path);
            }
        }

        if let Some(coup) = &cd.coup {
            let at = format!("{path}.coup");
            if coup.phases.is_empty() {
                self.error(DiagnosticCode::TurnOrder, format!("{at}.phases"), "coup plan is empty");
            }
            for phase in &coup.phases {
                self.phase(phase, format!("{at}.phases"));
            }
            let plan = coup.phases.iter().map(String::as_str);
            self.expect("coup phase", &coup.reset_phase, plan.clone(), format!("{at}.reset_phase"));
            for phase in &coup.final_round_omit {
                self.expect("coup phase", phase, plan.clone(), format!("{at}.final_round_omit"));
            }
        }
    }

    fn pivotal_sel(&mut self, sel: &PivotalSel, path: &str) {
        if let Some(seat) = &sel.seat {
            self.seat(seat, path);
        }
        if let Some(action) = &sel.action {
            self.action(action, path);
        }
    }

    // ===== setup and outcomes =====

    fn setup(&mut self) {
        let def = self.def;
        let setup = &def.setup;
        for (i, placement) in setup.tokens.iter().enumerate() {
            let path = format!("setup.tokens[{i}]");
            let kinds = def.token_types.iter().map(|t| t.id.as_str());
            self.expect("token type", &placement.kind, kinds, path.clone());
            self.zone(&placement.zone, path.clone());
            if let Some(owner) = &placement.owner {
                self.seat(owner, path);
            }
        }
        self.overrides(VarScope::Global, &def.globals, &setup.globals, "setup.globals");
        for (seat, vars) in &setup.player_vars {
            let path = format!("setup.player_vars[{seat}]");
            self.seat(seat, path.clone());
            self.overrides(VarScope::Player, &def.player_vars, vars, &path);
        }
        for (zone, vars) in &setup.zone_vars {
            let path = format!("setup.zone_vars[{zone}]");
            self.zone(zone, path.clone());
            self.overrides(VarScope::Zone, &def.zone_vars, vars, &path);
        }
        for (i, init) in setup.markers.iter().enumerate() {
            let path = format!("setup.markers[{i}]");
            self.zone(&init.zone, path.clone());
            self.lattice_state(&init.lattice, MarkerScope::Space, &init.state, &path);
        }
        for (lattice, state) in &setup.global_markers {
            let path = format!("setup.global_markers[{lattice}]");
            self.lattice_state(lattice, MarkerScope::Global, state, &path);
        }
        for zone in &setup.shuffle {
            self.zone(zone, "setup.shuffle");
        }
    }

    fn overrides(
        &mut self,
        scope: VarScope,
        decls: &[VarDef],
        values: &BTreeMap<String, Value>,
        path: &str,
    ) {
        for (name, value) in values {
            let at = format!("{path}[{name}]");
            match decls.iter().find(|v| v.name == *name) {
                Some(var) => {
                    if let Some(message) = init_problem(var, value) {
                        self.error(DiagnosticCode::UnknownReference, at, message);
                    }
                }
                None => {
                    let known = decls.iter().map(|v| v.name.as_str());
                    self.expect(&format!("{scope} variable"), name, known, at);
                }
            }
        }
    }

    fn outcomes(&mut self) {
        let def = self.def;
        for terminal in &def.terminals {
            if let Outcome::Seat(seat) = &terminal.outcome {
                self.seat(seat, format!("terminals[{}].outcome", terminal.id));
            }
        }
        if let Some(Outcome::Seat(seat)) = def.turn.order.card_driven().map(|cd| &cd.exhausted) {
            self.seat(seat, "turn.order.card_driven.exhausted");
        }
        for victory in &def.victory {
            self.seat(&victory.seat, format!("victory[{}]", victory.seat));
        }
        for constraint in &def.stacking {
            let path = format!("stacking[{}]", constraint.id);
            for kind in &constraint.pieces.kinds {
                let kinds = def.token_types.iter().map(|t| t.id.as_str());
                self.expect("token type", kind, kinds, path.clone());
            }
            if let Some(owner) = &constraint.pieces.owner {
                self.seat(owner, path);
            }
        }
    }
}

/// Why `value` cannot initialise `var`, if it cannot.
fn init_problem(var: &VarDef, value: &Value) -> Option<String> {
    match (var.kind, value) {
        (VarKind::Int { min, max }, _) if min > max => {
            Some(format!("bounds {min}..={max} of `{}` are empty", var.name))
        }
        (VarKind::Int { min, max }, Value::Int(v)) if *v < min || *v > max => Some(format!(
            "initial value {v} of `{}` is outside {min}..={max}",
            var.name
        )),
        (VarKind::Int { .. }, Value::Int(_)) | (VarKind::Bool, Value::Bool(_)) => None,
        (_, other) => Some(format!(
            "`{}` cannot hold a {} value",
            var.name,
            other.kind()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{ActionDef, CardZones, ZoneDef};

    fn codes(def: &GameDef) -> Vec<DiagnosticCode> {
        check(def).into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn duplicate_zone_ids_are_reported() {
        let mut def = GameDef::new("dup", ["us"]);
        def.zones = vec![ZoneDef::space("hue"), ZoneDef::space("hue")];
        let diagnostics = check(&def);
        assert!(
            diagnostics
                .iter()
                .any(|d| d.code == DiagnosticCode::DuplicateId && d.path == "zones[hue]")
        );
    }

    #[test]
    fn player_range_must_fit_seats() {
        let mut def = GameDef::new("range", ["us", "vc"]);
        def.players.max = 3;
        assert!(codes(&def).contains(&DiagnosticCode::PlayerRange));

        def.players.min = 0;
        def.players.max = 2;
        assert!(codes(&def).contains(&DiagnosticCode::PlayerRange));
    }

    #[test]
    fn card_zones_and_pivotal_class_are_checked() {
        let mut def = GameDef::new("cd", ["us", "vc"]);
        def.zones = vec![ZoneDef::new("deck"), ZoneDef::new("lookahead"), ZoneDef::new("played")];
        def.actions = vec![ActionDef::new("tet", MoveClass::Event)];
        let mut cd = CardDrivenDef::new(
            CardZones {
                draw: "deck".into(),
                lookahead: "lookahead".into(),
                played: "played".into(),
                discard: "discrad".into(),
            },
            "order",
            "main",
        );
        cd.pivotal = Some(crate::def::PivotalDef {
            actions: vec!["tet".into()],
            precedence: vec!["vc".into()],
            cancellation: Vec::new(),
        });
        def.turn.order = TurnOrderDef::CardDriven(Box::new(cd));

        let diagnostics = check(&def);
        let missing = diagnostics
            .iter()
            .find(|d| d.path == "turn.order.card_driven.cards.discard")
            .expect("discard zone reported");
        assert_eq!(missing.code, DiagnosticCode::UnknownReference);
        assert!(
            diagnostics
                .iter()
                .any(|d| d.code == DiagnosticCode::TurnOrder && d.message.contains("tet"))
        );
    }

    #[test]
    fn init_outside_bounds_is_rejected() {
        let var = VarDef::int("aid", 0, 75, 80);
        assert!(init_problem(&var, &var.init).is_some());
        assert!(init_problem(&var, &Value::Int(15)).is_none());
        assert!(init_problem(&VarDef::bool("flag", false), &Value::Int(1)).is_some());
    }
}
