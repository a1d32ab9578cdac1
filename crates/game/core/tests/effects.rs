mod common;

use common::*;
use turnflow_core::def::{
    ArithOp, ChoiceSpec, Domain, Effect, Expr, GameDef, PlayerSel, TokenFilter, TriggerDef,
    TriggerEvent, VarRef, ZoneRef,
};
use turnflow_core::{
    Applied, ChoiceKind, ChoiceValue, DeferAll, DiagnosticCode, EvalError, EventContext,
    ExecFailure, FirstLegal, IllegalMove, Kernel, LifecycleEvent, Move, RuntimeError, TraceEntry,
    TraceKind, Value, validate,
};

/// The fixture with the event's effects replaced.
fn with_event(effects: Vec<Effect>) -> GameDef {
    let mut game = definition();
    let event = game
        .actions
        .iter_mut()
        .find(|a| a.id == "aidCut")
        .expect("event action");
    event.stages[0].effects = effects;
    game
}

/// us opens card 1 with the event.
fn event(kernel: &Kernel<'_>) -> Result<Applied, RuntimeError> {
    let def = kernel.def();
    let state = start(kernel);
    kernel
        .apply_move(&state, &Move::act(seat(def, "us"), "aidCut"), &mut FirstLegal)
        .map(|outcome| outcome.applied().expect("event completes"))
}

fn exec_failure(err: RuntimeError) -> (String, ExecFailure) {
    match err {
        RuntimeError::EffectExecution(e) => (e.path, e.failure),
        other => panic!("unexpected error: {other}"),
    }
}

fn from_event(trace: &[TraceEntry]) -> impl Iterator<Item = &TraceEntry> {
    trace
        .iter()
        .filter(|e| e.provenance.path.as_str().starts_with("aidCut."))
}

fn pop(zone: &str) -> Expr {
    Expr::ZoneAttr {
        zone: ZoneRef::bound(zone),
        attr: "pop".into(),
    }
}

// ===== variables =====

#[test]
fn transfer_between_vars_respects_both_bounds() {
    let def = validated_from(with_event(vec![Effect::TransferVar {
        from: VarRef::global("patronage"),
        to: VarRef::global("aid"),
        amount: Expr::int(70),
    }]));
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();

    // patronage holds 15 and aid has room for 60, so all of patronage moves.
    assert_eq!(global(&applied.state, "patronage"), 0);
    assert_eq!(global(&applied.state, "aid"), 30);
    assert!(from_event(&applied.trace).any(|e| e.kind
        == TraceKind::ResourceTransfer {
            from: "patronage".into(),
            to: "aid".into(),
            requested: 70,
            actual: 15,
        }));
}

#[test]
fn transfer_onto_the_same_var_moves_nothing() {
    let def = validated_from(with_event(vec![Effect::TransferVar {
        from: VarRef::global("aid"),
        to: VarRef::global("aid"),
        amount: Expr::int(5),
    }]));
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();

    assert_eq!(global(&applied.state, "aid"), 15);
    let transfers: Vec<&TraceKind> = from_event(&applied.trace).map(|e| &e.kind).collect();
    assert_eq!(
        transfers,
        [&TraceKind::ResourceTransfer {
            from: "aid".into(),
            to: "aid".into(),
            requested: 5,
            actual: 0,
        }]
    );
}

#[test]
fn runtime_division_by_zero_aborts_the_move() {
    // The divisor is only zero once aid reaches 16.
    let def = validated_from(with_event(vec![
        Effect::add_var(VarRef::global("aid"), 1),
        Effect::set_var(
            VarRef::global("patronage"),
            Expr::arith(
                ArithOp::Div,
                Expr::int(10),
                Expr::arith(ArithOp::Sub, Expr::global("aid"), Expr::int(16)),
            ),
        ),
    ]));
    let kernel = kernel(&def);
    let state = start(&kernel);
    let before = state.clone();

    let err = kernel
        .apply_move(&state, &Move::act(seat(&def, "us"), "aidCut"), &mut FirstLegal)
        .unwrap_err();
    let (path, failure) = exec_failure(err);
    assert_eq!(path, "aidCut.effects/1:set_var");
    assert_eq!(failure, ExecFailure::Eval(EvalError::DivisionByZero));
    assert_eq!(state, before);
    assert_eq!(global(&state, "aid"), 15);
}

// ===== control =====

#[test]
fn for_each_runs_its_body_once_per_item() {
    let def = validated_from(with_event(vec![Effect::for_each(
        "z",
        spaces(),
        vec![Effect::AddVar {
            var: VarRef::global("aid"),
            delta: pop("z"),
        }],
    )]));
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();

    assert_eq!(global(&applied.state, "aid"), 21);
    let paths: Vec<&str> = from_event(&applied.trace)
        .filter(|e| matches!(e.kind, TraceKind::VarChange { .. }))
        .map(|e| e.provenance.path.as_str())
        .collect();
    assert_eq!(
        paths,
        [
            "aidCut.effects/0:for_each[0]/0:add_var",
            "aidCut.effects/0:for_each[1]/0:add_var",
            "aidCut.effects/0:for_each[2]/0:add_var",
        ]
    );
    assert!(from_event(&applied.trace).any(|e| e.kind
        == TraceKind::ForEach {
            binder: "z".into(),
            iterations: 3,
        }));
}

#[test]
fn loop_binder_is_not_visible_after_the_loop() {
    let game = with_event(vec![
        Effect::for_each("z", spaces(), Vec::new()),
        Effect::shift_marker(ZoneRef::bound("z"), "support", 1),
    ]);
    let (validated, diagnostics) = validate(game);
    assert!(validated.is_none());
    let unbound = diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::UnboundBinder)
        .expect("unbound binder reported");
    assert!(
        unbound.path.starts_with("actions[aidCut].stages[effects][1]"),
        "{}",
        unbound.path
    );
}

#[test]
fn reduce_folds_a_domain_and_exports_its_result() {
    let def = validated_from(with_event(vec![
        Effect::Reduce {
            over: spaces(),
            item: "s".into(),
            acc: "total".into(),
            init: Expr::int(0),
            next: Expr::arith(ArithOp::Add, Expr::bound("total"), pop("s")),
            result: "population".into(),
        },
        Effect::set_var(VarRef::global("patronage"), Expr::bound("population")),
    ]));
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();

    assert_eq!(global(&applied.state, "patronage"), 6);
    assert!(from_event(&applied.trace).any(|e| e.kind
        == TraceKind::Reduce {
            result: "population".into(),
            value: Value::Int(6),
        }));
}

#[test]
fn jumping_to_a_phase_is_traced() {
    let def = validated_from(with_event(vec![Effect::GotoPhaseExact {
        phase: "main".into(),
    }]));
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();

    assert!(from_event(&applied.trace).any(|e| e.kind
        == TraceKind::Lifecycle(LifecycleEvent::PhaseJumped("main".into()))));
    assert_eq!(applied.state.progress.phase, "main");
}

#[test]
fn fired_event_runs_its_listening_trigger() {
    let mut game = with_event(vec![Effect::FireEvent {
        event: "ambush".into(),
    }]);
    game.triggers.push(TriggerDef {
        id: "ambushLoot".into(),
        on: TriggerEvent::Custom("ambush".into()),
        when: None,
        effects: vec![Effect::add_var(VarRef::global("vcResources"), 2)],
    });
    let def = validated_from(game);
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();

    assert_eq!(global(&applied.state, "vcResources"), 7);
    assert!(applied.trace.iter().any(|e| e.kind
        == TraceKind::Lifecycle(LifecycleEvent::TriggerFired("ambushLoot".into()))));
    let change = applied
        .trace
        .iter()
        .find(|e| matches!(&e.kind, TraceKind::VarChange { var, .. } if var == "vcResources"))
        .expect("trigger changed vcResources");
    assert_eq!(change.provenance.context, EventContext::TriggerEffect);
}

// ===== randomness and choices =====

#[test]
fn internal_roll_is_reproducible_from_the_seed() {
    let def = validated_from(with_event(vec![
        Effect::RollRandom {
            bind: "die".into(),
            min: Expr::int(1),
            max: Expr::int(6),
            external: false,
        },
        Effect::set_var(VarRef::global("patronage"), Expr::bound("die")),
    ]));
    let kernel = kernel(&def);
    let first = event(&kernel).unwrap();
    let second = event(&kernel).unwrap();
    assert_eq!(first, second);

    let rolled = from_event(&first.trace)
        .find_map(|e| match &e.kind {
            TraceKind::Roll { binder, value } if binder == "die" => Some(*value),
            _ => None,
        })
        .expect("roll traced");
    assert!((1..=6).contains(&rolled));
    assert_eq!(global(&first.state, "patronage"), rolled);
}

#[test]
fn external_roll_waits_for_a_value_in_range() {
    let def = validated_from(with_event(vec![
        Effect::RollRandom {
            bind: "die".into(),
            min: Expr::int(1),
            max: Expr::int(6),
            external: true,
        },
        Effect::set_var(VarRef::global("patronage"), Expr::bound("die")),
    ]));
    let kernel = kernel(&def);
    let state = start(&kernel);

    let suspended = kernel
        .apply_move(&state, &Move::act(seat(&def, "us"), "aidCut"), &mut DeferAll)
        .unwrap()
        .suspended()
        .expect("roll is supplied from outside");
    let request = suspended.request().clone();
    assert_eq!(request.kind, ChoiceKind::Random { min: 1, max: 6 });
    assert_eq!(request.decision.0, "aidCut.effects/0:roll_random");
    assert!(request.options.is_empty());

    let err = kernel
        .resolve_choice(
            &suspended,
            &request.decision,
            ChoiceValue::One(Value::Int(7)),
            &mut DeferAll,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::IllegalMove(IllegalMove::NotAnOption { .. })
    ));

    let applied = kernel
        .resolve_choice(
            &suspended,
            &request.decision,
            ChoiceValue::One(Value::Int(4)),
            &mut DeferAll,
        )
        .unwrap()
        .applied()
        .expect("nothing else to ask");
    assert_eq!(global(&applied.state, "patronage"), 4);
    assert!(applied.trace.iter().any(|e| e.kind
        == TraceKind::Roll {
            binder: "die".into(),
            value: 4,
        }));
}

#[test]
fn choose_n_caps_its_maximum_at_the_option_count() {
    let def = validated_from(with_event(vec![
        Effect::ChooseN {
            choice: ChoiceSpec::new("picked", spaces()),
            min: Expr::int(1),
            max: Expr::global("aid"),
        },
        Effect::for_each(
            "s",
            Domain::Bound("picked".into()),
            vec![Effect::shift_marker(ZoneRef::bound("s"), "support", 1)],
        ),
    ]));
    let kernel = kernel(&def);
    let state = start(&kernel);

    let suspended = kernel
        .apply_move(&state, &Move::act(seat(&def, "us"), "aidCut"), &mut DeferAll)
        .unwrap()
        .suspended()
        .expect("asks which spaces");
    let request = suspended.request().clone();
    assert_eq!(request.kind, ChoiceKind::Many);
    assert_eq!((request.min, request.max), (1, 3));

    let err = kernel
        .resolve_choice(
            &suspended,
            &request.decision,
            ChoiceValue::Many(Vec::new()),
            &mut DeferAll,
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::ChoiceCardinality { got: 0, .. }));

    let state = kernel
        .resolve_choice(
            &suspended,
            &request.decision,
            ChoiceValue::Many(vec![space(&def, "hue"), space(&def, "saigon")]),
            &mut DeferAll,
        )
        .unwrap()
        .applied()
        .expect("nothing else to ask")
        .state;
    assert_eq!(support(&def, &state, "hue"), "activeSupport");
    assert_eq!(support(&def, &state, "danang"), "neutral");
    assert_eq!(support(&def, &state, "saigon"), "passiveSupport");
}

// ===== tokens and zones =====

#[test]
fn draw_respects_stack_order_in_the_destination() {
    let def = validated_from(with_event(vec![Effect::Draw {
        from: ZoneRef::named("deck"),
        to: ZoneRef::named("discard"),
        count: Expr::int(2),
    }]));
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();

    let deck = zone(&def, "deck");
    let discard = zone(&def, "discard");
    assert_eq!(applied.state.zone_len(deck), 0);
    // Card 3 went first, so card 4 lies on top of it.
    let order: Vec<u32> = applied.state.tokens_in(discard).map(|t| t.id.0).collect();
    assert_eq!(order, [4, 3]);
    let moved: Vec<u32> = from_event(&applied.trace)
        .filter_map(|e| match e.kind {
            TraceKind::MoveToken { token, from, to } if from == deck && to == discard => {
                Some(token.0)
            }
            _ => None,
        })
        .collect();
    assert_eq!(moved, [3, 4]);
}

#[test]
fn short_draw_leaves_the_state_untouched() {
    let def = validated_from(with_event(vec![
        Effect::add_var(VarRef::global("aid"), -5),
        Effect::Draw {
            from: ZoneRef::named("deck"),
            to: ZoneRef::named("discard"),
            count: Expr::int(3),
        },
    ]));
    let kernel = kernel(&def);
    let state = start(&kernel);
    let before = state.clone();

    let err = kernel
        .apply_move(&state, &Move::act(seat(&def, "us"), "aidCut"), &mut FirstLegal)
        .unwrap_err();
    let (path, failure) = exec_failure(err);
    assert_eq!(path, "aidCut.effects/1:draw");
    assert_eq!(
        failure,
        ExecFailure::InsufficientTokens {
            zone: "deck".into(),
            wanted: 3,
            available: 2,
        }
    );
    assert_eq!(state, before);
}

#[test]
fn token_moves_and_props_are_traced() {
    let def = validated_from(with_event(vec![
        Effect::MoveAll {
            from: ZoneRef::named("saigon"),
            to: ZoneRef::named("danang"),
            filter: TokenFilter::kind("troops").owned_by(PlayerSel::seat("arvn")),
        },
        Effect::CreateToken {
            kind: "troops".into(),
            zone: ZoneRef::named("hue"),
            owner: Some(PlayerSel::Active),
            props: Default::default(),
            bind: Some("fresh".into()),
        },
        Effect::MoveToken {
            token: Expr::bound("fresh"),
            to: ZoneRef::named("saigon"),
        },
        Effect::SetTokenProp {
            token: Expr::bound("fresh"),
            prop: "strength".into(),
            value: Expr::int(3),
        },
    ]));
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();
    let state = &applied.state;

    assert_eq!(state.zone_len(zone(&def, "danang")), 2);
    assert_eq!(state.zone_len(zone(&def, "hue")), 0);
    let fresh: Vec<_> = state.tokens_in(zone(&def, "saigon")).collect();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].owner, Some(seat(&def, "us")));
    assert_eq!(fresh[0].props.get("strength"), Some(&Value::Int(3)));

    let kinds: Vec<&str> = from_event(&applied.trace)
        .map(|e| match e.kind {
            TraceKind::MoveToken { .. } => "move",
            TraceKind::CreateToken { .. } => "create",
            TraceKind::SetTokenProp { .. } => "prop",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, ["move", "move", "create", "move", "prop"]);
    assert!(from_event(&applied.trace).any(|e| matches!(
        &e.kind,
        TraceKind::SetTokenProp { before: None, after: Value::Int(3), .. }
    )));
}

#[test]
fn concealed_zone_is_visible_only_to_revealed_seats() {
    let def = validated_from(with_event(vec![
        Effect::Conceal {
            zone: ZoneRef::named("hue"),
        },
        Effect::Reveal {
            zone: ZoneRef::named("hue"),
            to: Some(PlayerSel::seat("vc")),
        },
    ]));
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();
    let hue = zone(&def, "hue");

    assert!(applied.state.visible_to(hue, seat(&def, "vc")));
    assert!(!applied.state.visible_to(hue, seat(&def, "us")));
    assert!(!applied.state.visible_to(hue, seat(&def, "nva")));
}

#[test]
fn public_reveal_lifts_concealment() {
    let def = validated_from(with_event(vec![
        Effect::Conceal {
            zone: ZoneRef::named("hue"),
        },
        Effect::Reveal {
            zone: ZoneRef::named("hue"),
            to: None,
        },
    ]));
    let kernel = kernel(&def);
    let applied = event(&kernel).unwrap();
    let hue = zone(&def, "hue");

    for name in SEATS {
        assert!(applied.state.visible_to(hue, seat(&def, name)), "{name}");
    }
    assert!(from_event(&applied.trace).any(|e| e.kind
        == TraceKind::Visibility {
            zone: hue,
            concealed: false,
            to: None,
        }));
}

// ===== markers =====

#[test]
fn lattice_without_the_transition_rejects_the_change() {
    let mut game = with_event(vec![Effect::SetMarker {
        zone: ZoneRef::named("hue"),
        lattice: "support".into(),
        state: Expr::str("activeOpposition"),
    }]);
    game.lattices[0].transitions = Some(vec![
        ("passiveSupport".into(), "neutral".into()),
        ("neutral".into(), "passiveSupport".into()),
    ]);
    let def = validated_from(game);
    let kernel = kernel(&def);
    let state = start(&kernel);
    let before = state.clone();

    let err = kernel
        .apply_move(&state, &Move::act(seat(&def, "us"), "aidCut"), &mut FirstLegal)
        .unwrap_err();
    let (_, failure) = exec_failure(err);
    assert_eq!(
        failure,
        ExecFailure::LatticeTransition {
            lattice: "support".into(),
            from: "passiveSupport".into(),
            to: "activeOpposition".into(),
        }
    );
    assert_eq!(state, before);
    assert_eq!(support(&def, &state, "hue"), "passiveSupport");
}
