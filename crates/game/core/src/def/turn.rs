//! Turn structure and turn-order configuration.

use std::collections::BTreeMap;

use super::action::MoveClass;
use super::victory::Outcome;

/// Turn-order discipline. The runtime turn-order state always carries the same
/// tag as the configured discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Discipline {
    RoundRobin,
    FixedOrder,
    CardDriven,
    Simultaneous,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnDef {
    /// Phases in turn order. Card-driven games list the main phase and every
    /// coup phase here.
    pub phases: Vec<String>,
    pub order: TurnOrderDef,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnOrderDef {
    /// Players in seat order, one full pass through the phases each.
    RoundRobin,
    /// Like round robin, over an explicit seat list.
    FixedOrder(Vec<String>),
    CardDriven(Box<CardDrivenDef>),
    /// Every seat submits, then submissions resolve in seat order.
    Simultaneous,
}

impl TurnOrderDef {
    pub const fn discipline(&self) -> Discipline {
        match self {
            TurnOrderDef::RoundRobin => Discipline::RoundRobin,
            TurnOrderDef::FixedOrder(_) => Discipline::FixedOrder,
            TurnOrderDef::CardDriven(_) => Discipline::CardDriven,
            TurnOrderDef::Simultaneous => Discipline::Simultaneous,
        }
    }

    pub fn card_driven(&self) -> Option<&CardDrivenDef> {
        match self {
            TurnOrderDef::CardDriven(cd) => Some(cd),
            _ => None,
        }
    }
}

/// Zones making up the card stream.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardZones {
    pub draw: String,
    pub lookahead: String,
    pub played: String,
    pub discard: String,
}

/// Reward granted to a passing seat.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassReward {
    pub seats: Vec<String>,
    /// Global integer variable credited.
    pub var: String,
    pub amount: i64,
}

/// Second-actor classes allowed once the first actor took `first`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptionRow {
    pub first: MoveClass,
    pub second: Vec<MoveClass>,
}

/// Selects entries of the pivotal interrupt stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PivotalSel {
    #[cfg_attr(feature = "serde", serde(default))]
    pub seat: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub action: Option<String>,
}

impl PivotalSel {
    pub fn seat(seat: impl Into<String>) -> Self {
        Self {
            seat: Some(seat.into()),
            action: None,
        }
    }

    pub fn matches(&self, seat: &str, action: &str) -> bool {
        self.seat.as_deref().is_none_or(|s| s == seat)
            && self.action.as_deref().is_none_or(|a| a == action)
    }
}

/// When both selectors match stacked entries, the `canceled` ones are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cancellation {
    pub winner: PivotalSel,
    pub canceled: PivotalSel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PivotalDef {
    pub actions: Vec<String>,
    /// Seats from highest to lowest precedence; also the offer order.
    pub precedence: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cancellation: Vec<Cancellation>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoupDef {
    /// Boolean card property marking coup cards.
    pub flag_prop: String,
    /// Ordered coup phase plan.
    pub phases: Vec<String>,
    /// Phases skipped when the coup card is the last card of the deck.
    #[cfg_attr(feature = "serde", serde(default))]
    pub final_round_omit: Vec<String>,
    /// On leaving this phase every seat becomes eligible again.
    pub reset_phase: String,
    /// Coup cards played back to back beyond this count are skipped.
    pub max_consecutive: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardDrivenDef {
    pub cards: CardZones,
    /// Card property holding the list of seat symbols in acting order.
    pub seat_order_prop: String,
    /// Card seat symbol to declared seat id. Unmapped symbols are seat ids.
    #[cfg_attr(feature = "serde", serde(default))]
    pub seat_mapping: BTreeMap<String, String>,
    pub main_phase: String,
    #[cfg_attr(feature = "serde", serde(default = "default_max_actors"))]
    pub max_actors: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pass_rewards: Vec<PassReward>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub option_matrix: Vec<OptionRow>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pivotal: Option<PivotalDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub coup: Option<CoupDef>,
    /// Outcome applied when the card stream runs dry without a terminal.
    #[cfg_attr(feature = "serde", serde(default))]
    pub exhausted: Outcome,
}

#[cfg(feature = "serde")]
fn default_max_actors() -> u32 {
    CardDrivenDef::DEFAULT_MAX_ACTORS
}

impl CardDrivenDef {
    pub const DEFAULT_MAX_ACTORS: u32 = 2;

    pub fn new(cards: CardZones, seat_order_prop: impl Into<String>, main_phase: impl Into<String>) -> Self {
        Self {
            cards,
            seat_order_prop: seat_order_prop.into(),
            seat_mapping: BTreeMap::new(),
            main_phase: main_phase.into(),
            max_actors: Self::DEFAULT_MAX_ACTORS,
            pass_rewards: Vec::new(),
            option_matrix: Vec::new(),
            pivotal: None,
            coup: None,
            exhausted: Outcome::default(),
        }
    }

    /// Maps a card seat symbol onto a declared seat id.
    pub fn map_seat<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.seat_mapping
            .get(symbol)
            .map(String::as_str)
            .unwrap_or(symbol)
    }

    pub fn second_options(&self, first: MoveClass) -> Option<&[MoveClass]> {
        self.option_matrix
            .iter()
            .find(|row| row.first == first)
            .map(|row| row.second.as_slice())
    }

    pub fn pass_reward(&self, seat: &str) -> Option<&PassReward> {
        self.pass_rewards
            .iter()
            .find(|reward| reward.seats.iter().any(|s| s == seat))
    }
}
