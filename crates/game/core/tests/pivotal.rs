mod common;

use common::*;
use turnflow_core::def::{Cancellation, PivotalSel, TurnOrderDef};
use turnflow_core::{GameDef, LifecycleEvent, Move, Slot, TraceKind, Value};

fn open_window(mut game: GameDef) -> GameDef {
    game.setup
        .globals
        .insert("pivotalsOpen".into(), Value::Bool(true));
    game
}

fn with_cancellation(mut game: GameDef, winner: &str, canceled: &str) -> GameDef {
    if let TurnOrderDef::CardDriven(cd) = &mut game.turn.order {
        if let Some(pivotal) = cd.pivotal.as_mut() {
            pivotal.cancellation.push(Cancellation {
                winner: PivotalSel::seat(winner),
                canceled: PivotalSel::seat(canceled),
            });
        }
    }
    game
}

#[test]
fn window_stays_shut_while_no_interrupt_is_playable() {
    let def = validated();
    let kernel = kernel(&def);
    let state = start(&kernel);

    assert!(state.turn_order.card_driven().unwrap().pivotal.closed);
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Main {
            seat: seat(&def, "us")
        })
    );
}

#[test]
fn offers_follow_precedence_and_the_highest_wins() {
    let def = validated_from(open_window(definition()));
    let kernel = kernel(&def);
    let state = start(&kernel);
    let (us, vc) = (seat(&def, "us"), seat(&def, "vc"));

    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Pivotal { seat: vc })
    );
    assert_eq!(legal_actions(&kernel, &state), ["pivVc", "decline"]);

    let state = play(&kernel, &state, Move::act(vc, "pivVc"));
    // Stacked, not yet run.
    assert_eq!(global(&state, "vcResources"), 5);
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Pivotal { seat: us })
    );

    let applied = kernel
        .apply_move(&state, &Move::act(us, "pivUs"), &mut turnflow_core::FirstLegal)
        .unwrap()
        .applied()
        .unwrap();
    assert!(applied.trace.iter().any(|e| matches!(
        &e.kind,
        TraceKind::Lifecycle(LifecycleEvent::PivotalResolved { seat, canceled, .. })
            if seat == "vc" && canceled.is_empty()
    )));

    let state = applied.state;
    assert_eq!(global(&state, "vcResources"), 10);
    assert_eq!(global(&state, "aid"), 15);
    let cd = state.turn_order.card_driven().unwrap();
    assert!(cd.pivotal.closed);
    assert!(cd.has_acted("vc"));
    assert!(!cd.has_acted("us"));
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Main { seat: us })
    );
}

#[test]
fn cancellation_hands_the_window_to_the_canceller() {
    let def = validated_from(with_cancellation(open_window(definition()), "us", "vc"));
    let kernel = kernel(&def);
    let state = start(&kernel);
    let (us, vc) = (seat(&def, "us"), seat(&def, "vc"));

    let state = play(&kernel, &state, Move::act(vc, "pivVc"));
    let state = play(&kernel, &state, Move::act(us, "pivUs"));

    assert_eq!(global(&state, "aid"), 25);
    assert_eq!(global(&state, "vcResources"), 5);
    // us used its action on the interrupt, so the card moves on to nva.
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Main {
            seat: seat(&def, "nva")
        })
    );
}

#[test]
fn declining_every_offer_closes_the_window_untouched() {
    let def = validated_from(open_window(definition()));
    let kernel = kernel(&def);
    let state = start(&kernel);
    let (us, vc) = (seat(&def, "us"), seat(&def, "vc"));

    let state = play(&kernel, &state, Move::decline(vc));
    let state = play(&kernel, &state, Move::decline(us));

    assert_eq!(global(&state, "aid"), 15);
    assert_eq!(global(&state, "vcResources"), 5);
    let cd = state.turn_order.card_driven().unwrap();
    assert!(cd.pivotal.closed);
    assert!(cd.acted.is_empty());
    assert_eq!(
        kernel.current_decision(&state).unwrap(),
        Some(Slot::Main { seat: us })
    );
}
