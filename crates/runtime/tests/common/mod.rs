//! Two seats take turns planting flags in one of two fields.
#![allow(dead_code)]

use std::collections::BTreeMap;

use turnflow_core::def::{
    ActionDef, ChoiceSpec, CmpOp, Cond, Domain, Effect, Expr, MoveClass, Outcome, PlayerSel,
    TerminalDef, TokenTypeDef, VarDef, VarRef, ZoneDef, ZoneRef,
};
use turnflow_core::{GameDef, ValidatedDef, Value, validate};

pub fn definition() -> GameDef {
    let mut def = GameDef::new("flags", ["red", "blue"]);
    def.zones = vec![ZoneDef::new("north"), ZoneDef::new("south")];
    def.token_types = vec![TokenTypeDef::new("flag")];
    def.globals = vec![VarDef::int("planted", 0, 10, 0)];
    def.actions = vec![
        ActionDef::new("pass", MoveClass::Pass),
        ActionDef::new("plant", MoveClass::Other)
            .stage(
                "pick",
                vec![Effect::choose_one(ChoiceSpec::new("field", Domain::Zones))],
            )
            .stage(
                "place",
                vec![
                    Effect::CreateToken {
                        kind: "flag".into(),
                        zone: ZoneRef::bound("field"),
                        owner: Some(PlayerSel::Active),
                        props: BTreeMap::new(),
                        bind: None,
                    },
                    Effect::add_var(VarRef::global("planted"), 1),
                ],
            ),
    ];
    def.terminals = vec![TerminalDef {
        id: "fieldsFull".into(),
        when: Cond::cmp(CmpOp::Ge, Expr::global("planted"), Expr::int(3)),
        outcome: Outcome::Draw,
    }];
    def
}

pub fn validated() -> ValidatedDef {
    let (validated, diagnostics) = validate(definition());
    assert!(diagnostics.iter().all(|d| !d.is_error()), "{diagnostics:#?}");
    validated.expect("valid fixture")
}

pub fn field(def: &ValidatedDef, name: &str) -> Value {
    Value::Zone(def.zone_id(name).expect("declared field"))
}
