//! Runtime turn-order state, one variant per discipline.

use std::collections::{BTreeMap, BTreeSet};

use crate::def::{Discipline, MoveClass};
use crate::moves::ActionMove;

use super::{PlayerId, TokenId};

/// Position of a generic turn: which seat in the turn order acts, and whether
/// the current phase's entry triggers already ran.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeatCursor {
    pub seat: usize,
    pub entered: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimultaneousState {
    pub cursor: SeatCursor,
    /// Submissions for the current phase. `None` marks a seat that had no
    /// legal move.
    pub submitted: BTreeMap<PlayerId, Option<ActionMove>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Acted {
    pub seat: String,
    pub class: MoveClass,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FreeGrant {
    pub seat: PlayerId,
    pub actions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackedPivotal {
    pub seat: String,
    pub mv: ActionMove,
}

/// Pivotal interrupts collected at the start of a card.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PivotalWindow {
    pub stack: Vec<StackedPivotal>,
    pub declined: BTreeSet<String>,
    pub closed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoupState {
    /// Phases of this coup round, final-round omissions already removed.
    pub plan: Vec<String>,
    pub phase: usize,
    /// Index into the declared seats of the seat due in the current phase.
    pub seat: usize,
    pub entered: bool,
    pub final_round: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardDrivenState {
    /// Keyed by every declared seat, nothing else.
    pub eligibility: BTreeMap<String, bool>,
    pub current_card: Option<TokenId>,
    /// Non-pass actors on the current card, in acting order.
    pub acted: Vec<Acted>,
    /// Seats that passed or were skipped on the current card.
    pub passed: BTreeSet<String>,
    /// Free operations owed, served before the next eligible seat.
    pub grants: Vec<FreeGrant>,
    /// Eligibility forced for the next card by effects.
    pub overrides: BTreeMap<String, bool>,
    pub pivotal: PivotalWindow,
    pub coup: Option<CoupState>,
    pub consecutive_coups: u32,
    pub card_done: bool,
}

impl CardDrivenState {
    pub fn new<'a>(seats: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            eligibility: seats.into_iter().map(|s| (s.clone(), true)).collect(),
            ..Self::default()
        }
    }

    pub fn is_eligible(&self, seat: &str) -> bool {
        self.eligibility.get(seat).copied().unwrap_or(false)
    }

    pub fn has_acted(&self, seat: &str) -> bool {
        self.acted.iter().any(|a| a.seat == seat)
    }

    /// Clears per-card bookkeeping when a new card comes into play.
    pub fn begin_card(&mut self, card: TokenId) {
        self.current_card = Some(card);
        self.acted.clear();
        self.passed.clear();
        self.pivotal = PivotalWindow::default();
        self.card_done = false;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnOrderState {
    RoundRobin(SeatCursor),
    FixedOrder(SeatCursor),
    CardDriven(Box<CardDrivenState>),
    Simultaneous(SimultaneousState),
}

impl TurnOrderState {
    pub const fn discipline(&self) -> Discipline {
        match self {
            TurnOrderState::RoundRobin(_) => Discipline::RoundRobin,
            TurnOrderState::FixedOrder(_) => Discipline::FixedOrder,
            TurnOrderState::CardDriven(_) => Discipline::CardDriven,
            TurnOrderState::Simultaneous(_) => Discipline::Simultaneous,
        }
    }

    pub fn card_driven(&self) -> Option<&CardDrivenState> {
        match self {
            TurnOrderState::CardDriven(cd) => Some(cd),
            _ => None,
        }
    }

    pub fn card_driven_mut(&mut self) -> Option<&mut CardDrivenState> {
        match self {
            TurnOrderState::CardDriven(cd) => Some(cd),
            _ => None,
        }
    }
}
