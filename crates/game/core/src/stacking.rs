//! Stacking constraints: per-zone caps on matching pieces.

use crate::def::{StackingDef, ValidatedDef, ZoneDef};
use crate::state::{GameState, PlayerId, ZoneId};

/// First constraint found violated, in declaration then zone order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub constraint: String,
    pub zone: String,
}

fn applies(rule: &StackingDef, zone: &ZoneDef) -> bool {
    match &rule.zones {
        Some(matcher) => matcher.matches(zone),
        None => zone.space,
    }
}

fn count(def: &ValidatedDef, state: &GameState, rule: &StackingDef, zone: ZoneId) -> usize {
    state
        .tokens_in(zone)
        .filter(|t| {
            let owner = t.owner.and_then(|p| def.seat_name(p));
            rule.pieces.matches(&t.kind, owner)
        })
        .count()
}

pub fn check(def: &ValidatedDef, state: &GameState) -> Option<Violation> {
    for rule in &def.def().stacking {
        for zone in def.zone_ids() {
            let Some(zone_def) = def.zone(zone) else {
                continue;
            };
            if !applies(rule, zone_def) {
                continue;
            }
            if count(def, state, rule, zone) > rule.rule.limit() as usize {
                return Some(Violation {
                    constraint: rule.id.clone(),
                    zone: zone_def.id.clone(),
                });
            }
        }
    }
    None
}

/// Constraint that one more `kind` token owned by `owner` in `zone` would
/// break.
pub fn would_violate<'d>(
    def: &'d ValidatedDef,
    state: &GameState,
    zone: ZoneId,
    kind: &str,
    owner: Option<PlayerId>,
) -> Option<&'d StackingDef> {
    let zone_def = def.zone(zone)?;
    let owner = owner.and_then(|p| def.seat_name(p));
    def.def().stacking.iter().find(|rule| {
        applies(rule, zone_def)
            && rule.pieces.matches(kind, owner)
            && count(def, state, rule, zone) + 1 > rule.rule.limit() as usize
    })
}
