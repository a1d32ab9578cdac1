//! Shared fixture: a four-seat, card-driven counterinsurgency in miniature.
//!
//! Deck (top first): two event cards, a coup card, one more event card.
//! Three map spaces carry a support marker; saigon starts with two arvn
//! troops, which is the stacking cap for troops and guerrillas together.
#![allow(dead_code)]

use std::collections::BTreeMap;

use turnflow_core::def::{
    ActionDef, AggOp, CardDrivenDef, CardZones, ChoiceSpec, CmpOp, CompoundConstraint, CompoundDef,
    Cond, CoupDef, Domain, Effect, Expr, LatticeDef, MarkerInit, MetricDef, MoveClass, OptionRow,
    Outcome, ParamDef, PassReward, PieceMatch, PivotalDef, Placement, PlayerSel, SpecialTiming,
    StackingDef, StackingRule, TerminalDef, TokenProbe, TokenTypeDef, TriggerDef, TriggerEvent,
    TurnOrderDef, VarDef, VarRef, VictoryDef, ZoneDef, ZoneKind, ZoneRef,
};
use turnflow_core::{
    FirstLegal, GameDef, GameState, Kernel, KernelConfig, Move, MoveOutcome, PlayerId,
    ValidatedDef, Value, ZoneId, validate,
};

pub const SEATS: [&str; 4] = ["us", "arvn", "nva", "vc"];

fn names<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.into_iter().map(str::to_owned).collect()
}

fn off_map(id: &str) -> ZoneDef {
    ZoneDef::new(id).with_attr("pop", 0_i64)
}

/// Map spaces: every zone with a positive population.
pub fn spaces() -> Domain {
    Domain::filter(
        Domain::Zones,
        "z",
        Cond::cmp(
            CmpOp::Gt,
            Expr::ZoneAttr {
                zone: ZoneRef::bound("z"),
                attr: "pop".into(),
            },
            Expr::int(0),
        ),
    )
}

fn pivotals_open() -> Cond {
    Cond::Truthy(Expr::global("pivotalsOpen"))
}

fn place(kind: &str, zone: ZoneRef) -> Effect {
    Effect::CreateToken {
        kind: kind.into(),
        zone,
        owner: Some(PlayerSel::Active),
        props: BTreeMap::new(),
        bind: None,
    }
}

pub fn card(order: [&str; 4]) -> Placement {
    let order = order.into_iter().map(Value::from).collect();
    Placement::new("card", "deck", 1).with_prop("order", Value::List(order))
}

pub fn coup_card() -> Placement {
    Placement::new("card", "deck", 1).with_prop("coup", true)
}

fn actions() -> Vec<ActionDef> {
    vec![
        ActionDef::new("aidCut", MoveClass::Event)
            .phases(["main"])
            .stage(
                "effects",
                vec![
                    Effect::add_var(VarRef::global("aid"), -12),
                    Effect::when(
                        Cond::cmp(CmpOp::Lt, Expr::global("aid"), Expr::int(5)),
                        vec![Effect::shift_marker(ZoneRef::named("hue"), "support", -1)],
                        Vec::new(),
                    ),
                ],
            ),
        ActionDef::new("pass", MoveClass::Pass).phases(["main"]),
        ActionDef::new("train", MoveClass::Operation)
            .actors(["us", "arvn"])
            .phases(["main"])
            .param(ParamDef::one("space", spaces()))
            .pre(Cond::cmp(
                CmpOp::Ge,
                Expr::global("arvnResources"),
                Expr::int(3),
            ))
            .cost(vec![Effect::add_var(VarRef::global("arvnResources"), -3)])
            .stage("place", vec![place("troops", ZoneRef::bound("space"))])
            .stage(
                "pacify",
                vec![Effect::shift_marker(ZoneRef::bound("space"), "support", 1)],
            )
            .compound(CompoundDef {
                specials: names(["advise"]),
                timing: SpecialTiming::During {
                    after_stage: "place".into(),
                    replace_remaining: false,
                },
                constraints: vec![CompoundConstraint::Disjoint {
                    operation: "space".into(),
                    special: "target".into(),
                }],
            }),
        ActionDef::new("advise", MoveClass::Special)
            .actors(["us"])
            .phases(["main"])
            .param(ParamDef::one("target", spaces()))
            .stage(
                "sweep",
                vec![
                    Effect::add_var(VarRef::global("aid"), 1),
                    Effect::shift_marker(ZoneRef::bound("target"), "support", 1),
                ],
            ),
        ActionDef::new("rally", MoveClass::Operation)
            .actors(["nva", "vc"])
            .phases(["main"])
            .stage(
                "choose",
                vec![Effect::choose_one(
                    ChoiceSpec::new("where", spaces()).probe(TokenProbe {
                        kind: "guerrilla".into(),
                        owner: Some(PlayerSel::Active),
                    }),
                )],
            )
            .stage("place", vec![place("guerrilla", ZoneRef::bound("where"))]),
        ActionDef::new("redeploy", MoveClass::Other)
            .actors(["arvn"])
            .phases(["redeploy"])
            .stage(
                "effects",
                vec![Effect::add_var(VarRef::global("patronage"), 2)],
            ),
        ActionDef::new("pivUs", MoveClass::Pivotal)
            .actors(["us"])
            .pre(pivotals_open())
            .stage("effects", vec![Effect::add_var(VarRef::global("aid"), 10)]),
        ActionDef::new("pivVc", MoveClass::Pivotal)
            .actors(["vc"])
            .pre(pivotals_open())
            .stage(
                "effects",
                vec![Effect::add_var(VarRef::global("vcResources"), 5)],
            ),
    ]
}

fn card_driven() -> CardDrivenDef {
    let mut cd = CardDrivenDef::new(
        CardZones {
            draw: "deck".into(),
            lookahead: "lookahead".into(),
            played: "played".into(),
            discard: "discard".into(),
        },
        "order",
        "main",
    );
    cd.seat_mapping.insert("NVA".into(), "nva".into());
    cd.pass_rewards = vec![
        PassReward {
            seats: names(["us", "arvn"]),
            var: "arvnResources".into(),
            amount: 3,
        },
        PassReward {
            seats: names(["nva"]),
            var: "nvaResources".into(),
            amount: 1,
        },
        PassReward {
            seats: names(["vc"]),
            var: "vcResources".into(),
            amount: 1,
        },
    ];
    cd.option_matrix = vec![
        OptionRow {
            first: MoveClass::Event,
            second: vec![MoveClass::Operation, MoveClass::OperationPlusSpecial],
        },
        OptionRow {
            first: MoveClass::Operation,
            second: vec![MoveClass::LimitedOperation, MoveClass::Event],
        },
        OptionRow {
            first: MoveClass::OperationPlusSpecial,
            second: vec![MoveClass::LimitedOperation, MoveClass::Event],
        },
    ];
    cd.pivotal = Some(PivotalDef {
        actions: names(["pivUs", "pivVc"]),
        precedence: names(["vc", "us"]),
        cancellation: Vec::new(),
    });
    cd.coup = Some(CoupDef {
        flag_prop: "coup".into(),
        phases: names(["support", "redeploy", "reset"]),
        final_round_omit: names(["redeploy"]),
        reset_phase: "reset".into(),
        max_consecutive: 1,
    });
    cd.exhausted = Outcome::Draw;
    cd
}

/// Unvalidated definition, for tests that tweak it first.
pub fn definition() -> GameDef {
    let mut def = GameDef::new("mini-coin", SEATS);
    def.turn.phases = names(["main", "support", "redeploy", "reset"]);
    def.turn.order = TurnOrderDef::CardDriven(Box::new(card_driven()));

    def.zones = vec![
        off_map("deck").with_kind(ZoneKind::Queue).hidden(),
        off_map("lookahead").with_kind(ZoneKind::Queue),
        off_map("played").with_kind(ZoneKind::Queue),
        off_map("discard").with_kind(ZoneKind::Stack),
        ZoneDef::space("hue")
            .with_attr("pop", 2_i64)
            .adjacent_to(["danang"]),
        ZoneDef::space("danang")
            .with_attr("pop", 1_i64)
            .adjacent_to(["saigon"]),
        ZoneDef::space("saigon").with_attr("pop", 3_i64),
    ];
    def.token_types = vec![
        TokenTypeDef::new("card")
            .with_prop("order", Value::List(Vec::new()))
            .with_prop("coup", false),
        TokenTypeDef::new("troops"),
        TokenTypeDef::new("guerrilla"),
    ];
    def.globals = vec![
        VarDef::int("aid", 0, 75, 15),
        VarDef::int("arvnResources", 0, 75, 30),
        VarDef::int("nvaResources", 0, 75, 10),
        VarDef::int("vcResources", 0, 75, 5),
        VarDef::int("patronage", 0, 75, 15),
        VarDef::bool("pivotalsOpen", false),
    ];
    def.lattices = vec![LatticeDef::new(
        "support",
        [
            ("activeOpposition", -2),
            ("passiveOpposition", -1),
            ("neutral", 0),
            ("passiveSupport", 1),
            ("activeSupport", 2),
        ],
        "neutral",
    )];
    def.actions = actions();
    def.triggers = vec![TriggerDef {
        id: "supportPhaseAid".into(),
        on: TriggerEvent::PhaseEnter("support".into()),
        when: None,
        effects: vec![Effect::add_var(VarRef::global("aid"), 5)],
    }];

    def.metrics = vec![MetricDef {
        id: "totalSupport".into(),
        formula: Expr::Aggregate {
            op: AggOp::Sum,
            over: spaces(),
            bind: "s".into(),
            value: Some(Box::new(Expr::MarkerValue {
                zone: ZoneRef::bound("s"),
                lattice: "support".into(),
            })),
        },
    }];
    def.victory = vec![
        VictoryDef {
            seat: "us".into(),
            formula: Expr::Metric("totalSupport".into()),
            threshold: 2,
        },
        VictoryDef {
            seat: "vc".into(),
            formula: Expr::global("vcResources"),
            threshold: 10,
        },
    ];
    def.terminals = vec![TerminalDef {
        id: "aidCollapse".into(),
        when: Cond::cmp(CmpOp::Le, Expr::global("aid"), Expr::int(0)),
        outcome: Outcome::HighestVictoryMargin,
    }];
    def.stacking = vec![StackingDef {
        id: "crowding".into(),
        zones: None,
        pieces: PieceMatch::kinds(["troops", "guerrilla"]),
        rule: StackingRule::MaxCount(2),
    }];

    def.setup.tokens = vec![
        card(["us", "nva", "arvn", "vc"]),
        card(["vc", "arvn", "nva", "us"]),
        coup_card(),
        card(["NVA", "vc", "us", "arvn"]),
        Placement::new("troops", "saigon", 2).owned_by("arvn"),
    ];
    def.setup.markers = vec![MarkerInit {
        zone: "hue".into(),
        lattice: "support".into(),
        state: "passiveSupport".into(),
    }];
    def
}

pub fn validated_from(def: GameDef) -> ValidatedDef {
    let (validated, diagnostics) = validate(def);
    let errors: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(ToString::to_string)
        .collect();
    assert!(errors.is_empty(), "fixture rejected: {errors:#?}");
    validated.expect("validated definition")
}

pub fn validated() -> ValidatedDef {
    validated_from(definition())
}

pub fn kernel(def: &ValidatedDef) -> Kernel<'_> {
    Kernel::new(def, KernelConfig::default())
}

pub fn start(kernel: &Kernel<'_>) -> GameState {
    kernel.initial_state(42, 4).expect("initial state")
}

pub fn seat(def: &ValidatedDef, name: &str) -> PlayerId {
    def.seat_id(name).expect("declared seat")
}

pub fn zone(def: &ValidatedDef, name: &str) -> ZoneId {
    def.zone_id(name).expect("declared zone")
}

pub fn space(def: &ValidatedDef, name: &str) -> Value {
    Value::Zone(zone(def, name))
}

pub fn global(state: &GameState, name: &str) -> i64 {
    state
        .globals
        .get(name)
        .and_then(Value::as_int)
        .expect("integer global")
}

pub fn support<'s>(def: &ValidatedDef, state: &'s GameState, name: &str) -> &'s str {
    state.marker(zone(def, name), "support").unwrap_or("neutral")
}

pub fn eligible(state: &GameState, seat: &str) -> bool {
    state
        .turn_order
        .card_driven()
        .expect("card-driven state")
        .is_eligible(seat)
}

/// Applies a move that must complete, answering choices with the first legal
/// option.
pub fn play(kernel: &Kernel<'_>, state: &GameState, mv: Move) -> GameState {
    match kernel.apply_move(state, &mv, &mut FirstLegal) {
        Ok(MoveOutcome::Applied(applied)) => applied.state,
        Ok(MoveOutcome::Suspended(s)) => panic!("{mv} suspended on {}", s.request().decision),
        Err(e) => panic!("{mv} rejected: {e}"),
    }
}

/// Action names of the legal moves, declines rendered as `decline`.
pub fn legal_actions(kernel: &Kernel<'_>, state: &GameState) -> Vec<String> {
    kernel
        .enumerate_legal_moves(state)
        .expect("enumeration")
        .iter()
        .map(|mv| mv.action().unwrap_or("decline").to_owned())
        .collect()
}
