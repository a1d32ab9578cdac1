mod common;

use common::*;
use turnflow_core::{
    ChoiceKind, ChoiceValue, DeferAll, GameState, IllegalMove, Kernel, Move, MoveOutcome,
    RuntimeError, ScriptedResolver, Slot, TraceKind, Value,
};

/// Plays card 1 with everyone passing, so vc opens card 2.
fn at_card_two(kernel: &Kernel<'_>) -> GameState {
    let def = kernel.def();
    let mut state = start(kernel);
    for name in ["us", "nva", "arvn", "vc"] {
        state = play(kernel, &state, Move::act(seat(def, name), "pass"));
    }
    state
}

#[test]
fn deferred_choice_suspends_and_resumes() {
    let def = validated();
    let kernel = kernel(&def);
    let state = at_card_two(&kernel);
    let vc = seat(&def, "vc");
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Main { seat: vc })
    );

    let suspended = kernel
        .apply_move(&state, &Move::act(vc, "rally"), &mut DeferAll)
        .unwrap()
        .suspended()
        .expect("rally asks where to place");
    let request = suspended.request().clone();
    assert_eq!(request.binder, "where");
    assert_eq!(request.kind, ChoiceKind::One);
    assert_eq!(request.seat, vc);
    assert_eq!(suspended.slot(), &Slot::Main { seat: vc });

    let options: Vec<(Value, bool)> = request
        .options
        .iter()
        .map(|o| (o.value.clone(), o.legal))
        .collect();
    assert_eq!(
        options,
        vec![
            (space(&def, "hue"), true),
            (space(&def, "danang"), true),
            (space(&def, "saigon"), false),
        ]
    );

    let state = kernel
        .resolve_choice(
            &suspended,
            &request.decision,
            ChoiceValue::One(space(&def, "danang")),
            &mut DeferAll,
        )
        .unwrap()
        .applied()
        .expect("nothing else to ask")
        .state;

    // The binder chosen in one stage drives the next one.
    let placed: Vec<_> = state
        .tokens_in(zone(&def, "danang"))
        .filter(|t| t.kind == "guerrilla")
        .collect();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].owner, Some(vc));
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Main {
            seat: seat(&def, "arvn")
        })
    );
}

#[test]
fn refused_answer_leaves_the_suspension_usable() {
    let def = validated();
    let kernel = kernel(&def);
    let state = at_card_two(&kernel);
    let vc = seat(&def, "vc");

    let suspended = kernel
        .apply_move(&state, &Move::act(vc, "rally"), &mut DeferAll)
        .unwrap()
        .suspended()
        .unwrap();
    let decision = suspended.request().decision.clone();

    let err = kernel
        .resolve_choice(
            &suspended,
            &decision,
            ChoiceValue::One(space(&def, "saigon")),
            &mut DeferAll,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::IllegalMove(IllegalMove::IllegalOption { .. })
    ));

    let err = kernel
        .resolve_choice(
            &suspended,
            &decision,
            ChoiceValue::One(space(&def, "deck")),
            &mut DeferAll,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::IllegalMove(IllegalMove::NotAnOption { .. })
    ));

    let outcome = kernel
        .resolve_choice(
            &suspended,
            &decision,
            ChoiceValue::One(space(&def, "hue")),
            &mut DeferAll,
        )
        .unwrap();
    assert!(matches!(outcome, MoveOutcome::Applied(_)));
}

#[test]
fn answering_an_unknown_decision_is_rejected() {
    let def = validated();
    let kernel = kernel(&def);
    let state = at_card_two(&kernel);
    let vc = seat(&def, "vc");

    let suspended = kernel
        .apply_move(&state, &Move::act(vc, "rally"), &mut DeferAll)
        .unwrap()
        .suspended()
        .unwrap();
    let err = kernel
        .resolve_choice(
            &suspended,
            &turnflow_core::DecisionId("rally.place/0:create_token".into()),
            ChoiceValue::One(space(&def, "hue")),
            &mut DeferAll,
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownDecision { .. }));
}

#[test]
fn scripted_answers_complete_the_move_in_one_call() {
    let def = validated();
    let kernel = kernel(&def);
    let state = at_card_two(&kernel);
    let vc = seat(&def, "vc");

    let mut resolver = ScriptedResolver::new([ChoiceValue::One(space(&def, "danang"))]);
    let applied = kernel
        .apply_move(&state, &Move::act(vc, "rally"), &mut resolver)
        .unwrap()
        .applied()
        .unwrap();
    assert_eq!(resolver.remaining(), 0);

    let choice = applied
        .trace
        .iter()
        .find_map(|e| match &e.kind {
            TraceKind::Choice { value, .. } => Some(value.clone()),
            _ => None,
        })
        .expect("choice recorded");
    assert_eq!(choice, space(&def, "danang"));
}

#[test]
fn suspended_moves_do_not_touch_the_published_state() {
    let def = validated();
    let kernel = kernel(&def);
    let state = at_card_two(&kernel);
    let before = state.clone();

    let _suspended = kernel
        .apply_move(&state, &Move::act(seat(&def, "vc"), "rally"), &mut DeferAll)
        .unwrap()
        .suspended()
        .unwrap();
    assert_eq!(state, before);
    assert_eq!(
        kernel.advance_to_decision_point(&state).unwrap(),
        before
    );
}
