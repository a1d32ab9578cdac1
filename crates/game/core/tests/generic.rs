use turnflow_core::def::{
    ArithOp, Domain, Effect, Expr, MoveClass, ParamDef, PlayerSel, TurnOrderDef, VarDef, VarRef,
};
use turnflow_core::def::ActionDef;
use turnflow_core::{
    FirstLegal, GameDef, GameState, Kernel, KernelConfig, Move, MoveOutcome, Slot, TraceKind,
    ValidatedDef, Value, validate,
};

fn check(def: GameDef) -> ValidatedDef {
    let (validated, diagnostics) = validate(def);
    assert!(
        diagnostics.iter().all(|d| !d.is_error()),
        "{diagnostics:#?}"
    );
    validated.expect("valid definition")
}

fn play(kernel: &Kernel<'_>, state: &GameState, mv: Move) -> GameState {
    match kernel.apply_move(state, &mv, &mut FirstLegal) {
        Ok(MoveOutcome::Applied(applied)) => applied.state,
        other => panic!("{mv} did not complete: {other:?}"),
    }
}

fn score(state: &GameState, seat: usize) -> Option<i64> {
    state.player_vars[seat].get("score").and_then(Value::as_int)
}

// ===== round robin =====

fn relay(order: TurnOrderDef) -> ValidatedDef {
    let mut def = GameDef::new("relay", ["red", "blue"]);
    def.turn.phases = vec!["plan".into(), "act".into()];
    def.turn.order = order;
    def.player_vars = vec![VarDef::int("score", 0, 10, 0)];
    def.actions = vec![
        ActionDef::new("wait", MoveClass::Other)
            .actors(["red"])
            .phases(["plan"]),
        ActionDef::new("score", MoveClass::Other).phases(["act"]).stage(
            "effects",
            vec![Effect::add_var(
                VarRef::player(PlayerSel::Active, "score"),
                1,
            )],
        ),
    ];
    check(def)
}

#[test]
fn round_robin_walks_each_seat_through_every_phase() {
    let def = relay(TurnOrderDef::RoundRobin);
    let kernel = Kernel::new(&def, KernelConfig::default());
    let state = kernel.initial_state(1, 2).unwrap();
    let red = def.seat_id("red").unwrap();
    let blue = def.seat_id("blue").unwrap();

    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Generic {
            seat: red,
            phase: "plan".into()
        })
    );
    let state = play(&kernel, &state, Move::act(red, "wait"));
    assert_eq!(state.progress.phase, "act");

    let state = play(&kernel, &state, Move::act(red, "score"));
    assert_eq!(score(&state, 0), Some(1));
    assert_eq!(state.progress.turn, 1);

    // blue has nothing to do while planning, so its turn opens on `act`.
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Generic {
            seat: blue,
            phase: "act".into()
        })
    );
    let state = play(&kernel, &state, Move::act(blue, "score"));
    assert_eq!(score(&state, 1), Some(1));
    assert_eq!(state.progress.turn, 2);
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Generic {
            seat: red,
            phase: "plan".into()
        })
    );
}

#[test]
fn fixed_order_starts_with_the_listed_seat() {
    let def = relay(TurnOrderDef::FixedOrder(vec!["blue".into(), "red".into()]));
    let kernel = Kernel::new(&def, KernelConfig::default());
    let state = kernel.initial_state(1, 2).unwrap();

    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Generic {
            seat: def.seat_id("blue").unwrap(),
            phase: "act".into()
        })
    );
}

// ===== simultaneous =====

fn auction() -> ValidatedDef {
    let mut def = GameDef::new("auction", ["north", "south"]);
    def.turn.phases = vec!["bid".into()];
    def.turn.order = TurnOrderDef::Simultaneous;
    def.globals = vec![VarDef::int("pot", 0, 100, 0), VarDef::int("last", 0, 10, 0)];
    def.actions = vec![
        ActionDef::new("bid", MoveClass::Other)
            .param(ParamDef::one("amount", Domain::range(1, 3)))
            .stage(
                "effects",
                vec![
                    Effect::set_var(
                        VarRef::global("pot"),
                        Expr::arith(ArithOp::Add, Expr::global("pot"), Expr::bound("amount")),
                    ),
                    Effect::set_var(VarRef::global("last"), Expr::bound("amount")),
                ],
            ),
    ];
    check(def)
}

fn global(state: &GameState, name: &str) -> i64 {
    state.globals[name].as_int().unwrap()
}

#[test]
fn simultaneous_bids_stay_hidden_until_everyone_submitted() {
    let def = auction();
    let kernel = Kernel::new(&def, KernelConfig::default());
    let state = kernel.initial_state(5, 2).unwrap();
    let north = def.seat_id("north").unwrap();
    let south = def.seat_id("south").unwrap();

    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Simultaneous {
            seat: north,
            phase: "bid".into()
        })
    );
    assert_eq!(kernel.enumerate_legal_moves(&state).unwrap().len(), 3);

    let state = play(&kernel, &state, Move::act(north, "bid").with_param("amount", 3_i64));
    assert_eq!(global(&state, "pot"), 0);
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Simultaneous {
            seat: south,
            phase: "bid".into()
        })
    );

    let applied = kernel
        .apply_move(
            &state,
            &Move::act(south, "bid").with_param("amount", 1_i64),
            &mut FirstLegal,
        )
        .unwrap()
        .applied()
        .unwrap();
    let state = applied.state;

    // Both resolve in seat order, so south's bid is the last one written.
    assert_eq!(global(&state, "pot"), 4);
    assert_eq!(global(&state, "last"), 1);
    let written: Vec<&str> = applied
        .trace
        .iter()
        .filter(|e| matches!(e.kind, TraceKind::VarChange { .. }))
        .filter_map(|e| e.provenance.path.as_str().split('.').next())
        .collect();
    assert_eq!(written, ["bid", "bid", "bid", "bid"]);

    assert_eq!(state.progress.turn, 1);
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Simultaneous {
            seat: north,
            phase: "bid".into()
        })
    );
}

#[test]
fn out_of_range_bid_is_refused() {
    let def = auction();
    let kernel = Kernel::new(&def, KernelConfig::default());
    let state = kernel.initial_state(5, 2).unwrap();
    let north = def.seat_id("north").unwrap();

    assert!(
        kernel
            .apply_move(
                &state,
                &Move::act(north, "bid").with_param("amount", 4_i64),
                &mut FirstLegal,
            )
            .is_err()
    );
}
