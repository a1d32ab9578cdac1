mod common;

use common::*;
use turnflow_core::def::Placement;
use turnflow_core::{
    FirstLegal, GameResult, GameState, IllegalMove, Kernel, KernelError, Move, RuntimeError,
    SetupError, Value,
};

fn scripted_game(kernel: &Kernel<'_>, seed: u64) -> Vec<GameState> {
    let def = kernel.def();
    let mut state = kernel.initial_state(seed, 4).unwrap();
    let mut history = vec![state.clone()];
    let script = [
        Move::act(seat(def, "us"), "aidCut"),
        Move::act(seat(def, "nva"), "rally"),
        Move::act(seat(def, "vc"), "rally"),
        Move::act(seat(def, "arvn"), "pass"),
    ];
    for mv in script {
        state = play(kernel, &state, mv);
        history.push(state.clone());
    }
    history
}

#[test]
fn same_seed_and_moves_give_identical_states() {
    let def = validated();
    let kernel = kernel(&def);
    assert_eq!(scripted_game(&kernel, 7), scripted_game(&kernel, 7));
}

#[cfg(feature = "serde")]
#[test]
fn state_root_commits_to_the_whole_state() {
    use turnflow_core::compute_state_root;

    let def = validated();
    let kernel = kernel(&def);
    let a = scripted_game(&kernel, 7);
    let b = scripted_game(&kernel, 7);
    let roots: Vec<[u8; 32]> = a.iter().map(compute_state_root).collect();
    assert_eq!(roots, b.iter().map(compute_state_root).collect::<Vec<_>>());

    // Every move changed something, so no two consecutive roots agree.
    for pair in roots.windows(2) {
        assert_ne!(hex::encode(pair[0]), hex::encode(pair[1]));
    }
}

#[test]
fn shuffled_decks_follow_the_seed() {
    let mut game = definition();
    game.setup.shuffle = vec!["deck".into()];
    let def = validated_from(game);
    let kernel = kernel(&def);

    let a = kernel.initial_state(99, 4).unwrap();
    let b = kernel.initial_state(99, 4).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.zone_len(zone(&def, "deck")), 2);
}

#[test]
fn advancing_a_settled_state_is_a_no_op() {
    let def = validated();
    let kernel = kernel(&def);
    for state in scripted_game(&kernel, 3) {
        assert_eq!(kernel.advance_to_decision_point(&state).unwrap(), state);
    }
}

#[test]
fn rejected_moves_leave_the_state_untouched() {
    let def = validated();
    let kernel = kernel(&def);
    let state = start(&kernel);
    let before = state.clone();
    let us = seat(&def, "us");

    let cases: Vec<(Move, fn(&IllegalMove) -> bool)> = vec![
        (Move::act(seat(&def, "vc"), "pass"), |e| {
            matches!(e, IllegalMove::WrongSeat { .. })
        }),
        (Move::act(us, "nuke"), |e| matches!(e, IllegalMove::UnknownAction(_))),
        (Move::act(us, "rally"), |e| matches!(e, IllegalMove::NotOffered { .. })),
        (Move::act(us, "pivUs"), |e| matches!(e, IllegalMove::NotOffered { .. })),
        (Move::act(us, "train"), |e| matches!(e, IllegalMove::MissingParam { .. })),
        (
            Move::act(us, "train").with_param("space", space(&def, "deck")),
            |e| matches!(e, IllegalMove::ParamOutOfDomain { .. }),
        ),
        (
            Move::act(us, "pass").with_param("space", Value::Int(1)),
            |e| matches!(e, IllegalMove::UnexpectedParam { .. }),
        ),
        (Move::decline(us), |e| matches!(e, IllegalMove::DeclineNotAllowed)),
    ];

    for (mv, expected) in cases {
        match kernel.apply_move(&state, &mv, &mut FirstLegal) {
            Err(RuntimeError::IllegalMove(e)) => assert!(expected(&e), "{mv}: got {e}"),
            Err(other) => panic!("{mv}: unexpected error {other}"),
            Ok(_) => panic!("{mv} was accepted"),
        }
        assert_eq!(state, before);
    }
}

#[test]
fn failed_preconditions_are_not_offered() {
    let mut game = definition();
    game.setup
        .globals
        .insert("arvnResources".into(), Value::Int(2));
    let def = validated_from(game);
    let kernel = kernel(&def);
    let state = start(&kernel);

    assert_eq!(legal_actions(&kernel, &state), ["aidCut", "pass"]);
    let err = kernel
        .apply_move(
            &state,
            &Move::act(seat(&def, "us"), "train").with_param("space", space(&def, "hue")),
            &mut FirstLegal,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::IllegalMove(IllegalMove::PreconditionFailed { .. })
    ));
}

#[test]
fn setup_rejects_overstacked_spaces_and_bad_player_counts() {
    let mut game = definition();
    game.setup
        .tokens
        .push(Placement::new("troops", "saigon", 1).owned_by("arvn"));
    let def = validated_from(game);
    let kernel = kernel(&def);

    let err = kernel.initial_state(1, 4).unwrap_err();
    assert_eq!(
        err,
        SetupError::Stacking {
            constraint: "crowding".into(),
            zone: "saigon".into()
        }
    );
    assert_eq!(err.error_code(), "SETUP_STACKING");

    let def = validated();
    let kernel = common::kernel(&def);
    assert!(matches!(
        kernel.initial_state(1, 3),
        Err(SetupError::PlayerCount { count: 3, .. })
    ));
}

#[test]
fn terminal_condition_picks_the_highest_victory_margin() {
    let mut game = definition();
    game.setup.globals.insert("aid".into(), Value::Int(12));
    let def = validated_from(game);
    let kernel = kernel(&def);
    let state = start(&kernel);

    assert_eq!(kernel.compute_derived_metric(&state, "totalSupport").unwrap(), 1);
    assert_eq!(kernel.compute_victory_marker(&state, "us").unwrap(), 1);
    assert_eq!(kernel.compute_victory_marker(&state, "vc").unwrap(), 5);

    let state = play(&kernel, &state, Move::act(seat(&def, "us"), "aidCut"));
    assert!(kernel.is_terminal(&state));
    // us: 0 - 2, vc: 5 - 10.
    assert_eq!(
        kernel.result(&state),
        Some(&GameResult::Winner {
            seat: "us".into(),
            by: "aidCollapse".into()
        })
    );
    assert!(kernel.enumerate_legal_moves(&state).unwrap().is_empty());
}

#[test]
fn metric_queries_do_not_change_the_state() {
    let def = validated();
    let kernel = kernel(&def);
    let state = start(&kernel);
    let before = state.clone();

    let _ = kernel.compute_derived_metric(&state, "totalSupport");
    let _ = kernel.compute_victory_marker(&state, "vc");
    assert!(kernel.compute_derived_metric(&state, "missing").is_err());
    assert!(kernel.compute_victory_marker(&state, "nva").is_err());
    assert_eq!(state, before);
}
