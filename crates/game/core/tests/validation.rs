mod common;

use common::*;
use turnflow_core::def::{Effect, PassReward, TurnOrderDef, VarRef};
use turnflow_core::{DiagnosticCode, validate};

#[test]
fn fixture_has_no_errors() {
    let (validated, diagnostics) = validate(definition());
    assert!(validated.is_some());
    assert!(diagnostics.iter().all(|d| !d.is_error()), "{diagnostics:#?}");
}

#[test]
fn every_problem_is_reported_at_once() {
    let mut game = definition();
    let train = game
        .actions
        .iter_mut()
        .find(|a| a.id == "train")
        .expect("train declared");
    train.cost = vec![Effect::add_var(VarRef::global("arvnResource"), -3)];
    if let TurnOrderDef::CardDriven(cd) = &mut game.turn.order {
        cd.pass_rewards.push(PassReward {
            seats: vec!["vietcong".into()],
            var: "vcResources".into(),
            amount: 1,
        });
    }

    let (validated, diagnostics) = validate(game);
    assert!(validated.is_none());

    let var = diagnostics
        .iter()
        .find(|d| d.message.contains("arvnResource`"))
        .expect("misspelt variable reported");
    assert_eq!(var.code, DiagnosticCode::UnknownReference);
    assert!(var.path.starts_with("actions[train].cost[0]"), "{}", var.path);
    assert_eq!(var.suggestion.as_deref(), Some("arvnResources"));
    assert!(var.to_string().contains("did you mean `arvnResources`?"));

    let seat = diagnostics
        .iter()
        .find(|d| d.message.contains("vietcong"))
        .expect("unknown seat reported");
    assert!(seat.path.ends_with("pass_rewards[3]"), "{}", seat.path);
    assert!(seat.is_error());
}

#[test]
fn unknown_trigger_phase_is_an_error() {
    let mut game = definition();
    game.triggers[0].on = turnflow_core::def::TriggerEvent::PhaseEnter("suport".into());

    let (validated, diagnostics) = validate(game);
    assert!(validated.is_none());
    let phase = diagnostics
        .iter()
        .find(|d| d.path == "triggers[supportPhaseAid].on")
        .expect("phase reported");
    assert_eq!(phase.suggestion.as_deref(), Some("support"));
}
