//! Effect tree nodes.
//!
//! An action stage, a trigger body and a loop body are all plain
//! `Vec<Effect>` sequences executed in order.
//!
//! # Binders
//!
//! | node | binder | visibility |
//! |------|--------|------------|
//! | `ChooseOne`, `ChooseN`, `RollRandom` | `bind` | rest of the sequence, and later stages when guaranteed |
//! | `CreateToken` | `bind` (optional) | same as above |
//! | `Reduce` | `result` | same as above; `item`/`acc` are lexical to `next` |
//! | `ForEach`, `Let` | `bind` | lexical: body only |
//!
//! A binder produced inside `If` is exported only when both branches
//! produce it.

use std::collections::BTreeMap;

use super::expr::{Cond, Domain, Expr, TokenFilter};
use super::refs::{PlayerSel, VarRef, ZoneRef};

/// Shared shape of `ChooseOne` and `ChooseN`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChoiceSpec {
    pub bind: String,
    pub options: Domain,
    /// Seat asked to decide. Defaults to the active seat.
    #[cfg_attr(feature = "serde", serde(default))]
    pub chooser: Option<PlayerSel>,
    /// Evaluated per option with `bind` set to the option; failing options
    /// stay in the domain but are flagged illegal.
    #[cfg_attr(feature = "serde", serde(default))]
    pub legal_if: Option<Cond>,
    /// Flags zone options where placing such a token would break stacking.
    #[cfg_attr(feature = "serde", serde(default))]
    pub probe: Option<TokenProbe>,
}

impl ChoiceSpec {
    pub fn new(bind: impl Into<String>, options: Domain) -> Self {
        Self {
            bind: bind.into(),
            options,
            chooser: None,
            legal_if: None,
            probe: None,
        }
    }

    pub fn legal_if(mut self, cond: Cond) -> Self {
        self.legal_if = Some(cond);
        self
    }

    pub fn probe(mut self, probe: TokenProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn chooser(mut self, chooser: PlayerSel) -> Self {
        self.chooser = Some(chooser);
        self
    }
}

/// Hypothetical token used to flag stacking-illegal zone options.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenProbe {
    pub kind: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub owner: Option<PlayerSel>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Effect {
    SetVar {
        var: VarRef,
        value: Expr,
    },
    /// Integer-only; clamped to the variable's declared bounds.
    AddVar {
        var: VarRef,
        delta: Expr,
    },
    /// Moves up to `amount` from `from` to `to`, limited by the source's
    /// floor and the destination's ceiling.
    TransferVar {
        from: VarRef,
        to: VarRef,
        amount: Expr,
    },
    CreateToken {
        kind: String,
        zone: ZoneRef,
        #[cfg_attr(feature = "serde", serde(default))]
        owner: Option<PlayerSel>,
        #[cfg_attr(feature = "serde", serde(default))]
        props: BTreeMap<String, Expr>,
        #[cfg_attr(feature = "serde", serde(default))]
        bind: Option<String>,
    },
    DestroyToken {
        token: Expr,
    },
    MoveToken {
        token: Expr,
        to: ZoneRef,
    },
    MoveAll {
        from: ZoneRef,
        to: ZoneRef,
        #[cfg_attr(feature = "serde", serde(default))]
        filter: TokenFilter,
    },
    SetTokenProp {
        token: Expr,
        prop: String,
        value: Expr,
    },
    SetMarker {
        zone: ZoneRef,
        lattice: String,
        state: Expr,
    },
    ShiftMarker {
        zone: ZoneRef,
        lattice: String,
        delta: Expr,
    },
    SetGlobalMarker {
        marker: String,
        state: Expr,
    },
    ShiftGlobalMarker {
        marker: String,
        delta: Expr,
    },
    Conceal {
        zone: ZoneRef,
    },
    /// Reveals a zone to one player, or to everyone when `to` is `None`.
    Reveal {
        zone: ZoneRef,
        #[cfg_attr(feature = "serde", serde(default))]
        to: Option<PlayerSel>,
    },
    /// Moves `count` tokens from the top of `from` to `to`. Fails when the
    /// source holds fewer.
    Draw {
        from: ZoneRef,
        to: ZoneRef,
        count: Expr,
    },
    Shuffle {
        zone: ZoneRef,
    },
    ChooseOne(ChoiceSpec),
    ChooseN {
        choice: ChoiceSpec,
        min: Expr,
        max: Expr,
    },
    /// Uniform integer in `[min, max]`. Drawn from the seeded stream unless
    /// `external`, in which case the host supplies it as a decision.
    RollRandom {
        bind: String,
        min: Expr,
        max: Expr,
        #[cfg_attr(feature = "serde", serde(default))]
        external: bool,
    },
    ForEach {
        bind: String,
        over: Domain,
        #[cfg_attr(feature = "serde", serde(default))]
        limit: Option<Expr>,
        body: Vec<Effect>,
    },
    Reduce {
        over: Domain,
        item: String,
        acc: String,
        init: Expr,
        next: Expr,
        result: String,
    },
    If {
        when: Cond,
        then: Vec<Effect>,
        #[cfg_attr(feature = "serde", serde(default))]
        otherwise: Vec<Effect>,
    },
    Let {
        bind: String,
        value: Expr,
        body: Vec<Effect>,
    },
    GotoPhaseExact {
        phase: String,
    },
    /// Fires every trigger listening for the named event.
    FireEvent {
        event: String,
    },
    /// Card-driven only: lets `seat` take one free move among `actions`.
    GrantFreeOperation {
        seat: PlayerSel,
        actions: Vec<String>,
    },
    /// Card-driven only: overrides `seat`'s eligibility for the next card.
    SetEligibility {
        seat: PlayerSel,
        eligible: bool,
    },
}

impl Effect {
    pub fn add_var(var: VarRef, delta: i64) -> Self {
        Self::AddVar {
            var,
            delta: Expr::int(delta),
        }
    }

    pub fn set_var(var: VarRef, value: Expr) -> Self {
        Self::SetVar { var, value }
    }

    pub fn shift_marker(zone: ZoneRef, lattice: impl Into<String>, delta: i64) -> Self {
        Self::ShiftMarker {
            zone,
            lattice: lattice.into(),
            delta: Expr::int(delta),
        }
    }

    pub fn choose_one(choice: ChoiceSpec) -> Self {
        Self::ChooseOne(choice)
    }

    pub fn for_each(bind: impl Into<String>, over: Domain, body: Vec<Effect>) -> Self {
        Self::ForEach {
            bind: bind.into(),
            over,
            limit: None,
            body,
        }
    }

    pub fn when(when: Cond, then: Vec<Effect>, otherwise: Vec<Effect>) -> Self {
        Self::If {
            when,
            then,
            otherwise,
        }
    }

    /// Short snake_case name, used in effect paths and logs.
    pub fn as_snake_case(&self) -> &'static str {
        match self {
            Effect::SetVar { .. } => "set_var",
            Effect::AddVar { .. } => "add_var",
            Effect::TransferVar { .. } => "transfer_var",
            Effect::CreateToken { .. } => "create_token",
            Effect::DestroyToken { .. } => "destroy_token",
            Effect::MoveToken { .. } => "move_token",
            Effect::MoveAll { .. } => "move_all",
            Effect::SetTokenProp { .. } => "set_token_prop",
            Effect::SetMarker { .. } => "set_marker",
            Effect::ShiftMarker { .. } => "shift_marker",
            Effect::SetGlobalMarker { .. } => "set_global_marker",
            Effect::ShiftGlobalMarker { .. } => "shift_global_marker",
            Effect::Conceal { .. } => "conceal",
            Effect::Reveal { .. } => "reveal",
            Effect::Draw { .. } => "draw",
            Effect::Shuffle { .. } => "shuffle",
            Effect::ChooseOne(_) => "choose_one",
            Effect::ChooseN { .. } => "choose_n",
            Effect::RollRandom { .. } => "roll_random",
            Effect::ForEach { .. } => "for_each",
            Effect::Reduce { .. } => "reduce",
            Effect::If { .. } => "if",
            Effect::Let { .. } => "let",
            Effect::GotoPhaseExact { .. } => "goto_phase_exact",
            Effect::FireEvent { .. } => "fire_event",
            Effect::GrantFreeOperation { .. } => "grant_free_operation",
            Effect::SetEligibility { .. } => "set_eligibility",
        }
    }
}
