//! Static binder analysis shared by the pipeline executor and the validator.

use std::collections::BTreeSet;

use crate::def::Effect;

/// Names an effect sequence is guaranteed to bind on every execution path.
///
/// Choice, roll, token-creation and reduction binders are exported. `If`
/// exports only what both branches export. `ForEach` and `Let` bodies are
/// lexical and export nothing.
pub fn guaranteed_binders(effects: &[Effect]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect(effects, &mut out);
    out
}

fn collect(effects: &[Effect], out: &mut BTreeSet<String>) {
    for effect in effects {
        match effect {
            Effect::ChooseOne(choice) | Effect::ChooseN { choice, .. } => {
                out.insert(choice.bind.clone());
            }
            Effect::RollRandom { bind, .. } => {
                out.insert(bind.clone());
            }
            Effect::CreateToken { bind: Some(bind), .. } => {
                out.insert(bind.clone());
            }
            Effect::Reduce { result, .. } => {
                out.insert(result.clone());
            }
            Effect::If {
                then, otherwise, ..
            } => {
                let a = guaranteed_binders(then);
                let b = guaranteed_binders(otherwise);
                out.extend(a.intersection(&b).cloned());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{ChoiceSpec, Cond, Domain, Expr};

    fn choose(bind: &str) -> Effect {
        Effect::choose_one(ChoiceSpec::new(bind, Domain::Zones))
    }

    #[test]
    fn branch_binders_need_both_sides() {
        let effects = vec![
            choose("space"),
            Effect::when(
                Cond::Const(true),
                vec![choose("target"), choose("only_then")],
                vec![choose("target")],
            ),
        ];
        let names = guaranteed_binders(&effects);
        assert!(names.contains("space"));
        assert!(names.contains("target"));
        assert!(!names.contains("only_then"));
    }

    #[test]
    fn loop_and_let_bodies_stay_local() {
        let effects = vec![
            Effect::for_each("z", Domain::Zones, vec![choose("inner")]),
            Effect::Let {
                bind: "n".into(),
                value: Expr::int(1),
                body: vec![choose("also_inner")],
            },
        ];
        assert!(guaranteed_binders(&effects).is_empty());
    }
}
