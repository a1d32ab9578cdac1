//! Authoritative game state.
//!
//! [`GameState`] is plain structural data. The kernel never mutates a
//! published state: every transition works on a clone and returns it.
mod ids;
mod turn;
mod value;

use std::collections::{BTreeMap, BTreeSet};

pub use ids::{PlayerId, TokenId, ZoneId};
pub use turn::{
    Acted, CardDrivenState, CoupState, FreeGrant, PivotalWindow, SeatCursor, SimultaneousState,
    StackedPivotal, TurnOrderState,
};
pub use value::{Value, ValueKind};

use crate::def::ZoneKind;
use crate::rng::RngState;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub id: TokenId,
    pub kind: String,
    pub owner: Option<PlayerId>,
    pub zone: ZoneId,
    pub props: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneState {
    /// Tokens in zone order; index 0 is the top.
    pub tokens: Vec<TokenId>,
    pub vars: BTreeMap<String, Value>,
    /// Lattice id to current state id.
    pub markers: BTreeMap<String, String>,
    pub concealed: bool,
    /// Players a concealed zone has been revealed to.
    pub revealed_to: BTreeSet<PlayerId>,
}

/// Turn counter, current phase and applied-move counter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Progress {
    pub turn: u32,
    pub phase: String,
    pub moves: u32,
    /// Set by `gotoPhaseExact` so the move's own phase advance is skipped.
    pub phase_jumped: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GameResult {
    Winner { seat: String, by: String },
    Draw { by: String },
}

/// Address of a concrete variable slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VarSlot {
    Global(String),
    Player(PlayerId, String),
    Zone(ZoneId, String),
}

impl VarSlot {
    pub fn name(&self) -> &str {
        match self {
            VarSlot::Global(name) | VarSlot::Player(_, name) | VarSlot::Zone(_, name) => name,
        }
    }
}

impl std::fmt::Display for VarSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarSlot::Global(name) => f.write_str(name),
            VarSlot::Player(player, name) => write!(f, "{player}.{name}"),
            VarSlot::Zone(zone, name) => write!(f, "{zone}.{name}"),
        }
    }
}

/// Canonical snapshot of the deterministic game state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameState {
    pub player_count: u8,
    /// Indexed by `ZoneId`, in declaration order.
    pub zones: Vec<ZoneState>,
    pub tokens: BTreeMap<TokenId, Token>,
    pub globals: BTreeMap<String, Value>,
    /// Indexed by `PlayerId`.
    pub player_vars: Vec<BTreeMap<String, Value>>,
    pub global_markers: BTreeMap<String, String>,
    pub turn_order: TurnOrderState,
    pub progress: Progress,
    pub rng: RngState,
    pub result: Option<GameResult>,

    /// Monotonic token id source. Ids are never reused.
    next_token_id: u32,
}

impl GameState {
    pub fn new(
        player_count: u8,
        zone_count: usize,
        turn_order: TurnOrderState,
        rng: RngState,
    ) -> Self {
        Self {
            player_count,
            zones: vec![ZoneState::default(); zone_count],
            tokens: BTreeMap::new(),
            globals: BTreeMap::new(),
            player_vars: vec![BTreeMap::new(); player_count as usize],
            global_markers: BTreeMap::new(),
            turn_order,
            progress: Progress::default(),
            rng,
            result: None,
            next_token_id: 1,
        }
    }

    /// Hands out the next token id, or `None` once the id space is used up.
    pub fn allocate_token_id(&mut self) -> Option<TokenId> {
        let id = TokenId(self.next_token_id);
        self.next_token_id = self.next_token_id.checked_add(1)?;
        Some(id)
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + use<> {
        (0..self.player_count).map(PlayerId)
    }

    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    pub fn zone(&self, id: ZoneId) -> Option<&ZoneState> {
        self.zones.get(id.index())
    }

    pub fn zone_mut(&mut self, id: ZoneId) -> Option<&mut ZoneState> {
        self.zones.get_mut(id.index())
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    /// Tokens of a zone in zone order.
    pub fn tokens_in(&self, zone: ZoneId) -> impl Iterator<Item = &Token> + '_ {
        self.zone(zone)
            .into_iter()
            .flat_map(|z| z.tokens.iter())
            .filter_map(|id| self.tokens.get(id))
    }

    pub fn top_of(&self, zone: ZoneId) -> Option<TokenId> {
        self.zone(zone).and_then(|z| z.tokens.first().copied())
    }

    pub fn zone_len(&self, zone: ZoneId) -> usize {
        self.zone(zone).map_or(0, |z| z.tokens.len())
    }

    /// Places a token into a zone according to the zone's kind and records
    /// the new location on the token.
    pub fn insert_token(&mut self, zone: ZoneId, kind: ZoneKind, token: TokenId) {
        if let Some(z) = self.zones.get_mut(zone.index()) {
            match kind {
                ZoneKind::Stack => z.tokens.insert(0, token),
                ZoneKind::Set | ZoneKind::Queue => z.tokens.push(token),
            }
        }
        if let Some(t) = self.tokens.get_mut(&token) {
            t.zone = zone;
        }
    }

    /// Detaches a token from whichever zone holds it. Returns that zone.
    pub fn detach_token(&mut self, token: TokenId) -> Option<ZoneId> {
        let zone = self.tokens.get(&token)?.zone;
        let z = self.zones.get_mut(zone.index())?;
        let at = z.tokens.iter().position(|&t| t == token)?;
        z.tokens.remove(at);
        Some(zone)
    }

    pub fn read_var(&self, slot: &VarSlot) -> Option<&Value> {
        match slot {
            VarSlot::Global(name) => self.globals.get(name),
            VarSlot::Player(player, name) => self.player_vars.get(player.index())?.get(name),
            VarSlot::Zone(zone, name) => self.zone(*zone)?.vars.get(name),
        }
    }

    /// Writes a variable slot. Returns false when the owner does not exist.
    pub fn write_var(&mut self, slot: &VarSlot, value: Value) -> bool {
        let map = match slot {
            VarSlot::Global(_) => Some(&mut self.globals),
            VarSlot::Player(player, _) => self.player_vars.get_mut(player.index()),
            VarSlot::Zone(zone, _) => self.zones.get_mut(zone.index()).map(|z| &mut z.vars),
        };
        match map {
            Some(map) => {
                map.insert(slot.name().to_owned(), value);
                true
            }
            None => false,
        }
    }

    pub fn marker(&self, zone: ZoneId, lattice: &str) -> Option<&str> {
        self.zone(zone)?.markers.get(lattice).map(String::as_str)
    }

    pub fn global_marker(&self, marker: &str) -> Option<&str> {
        self.global_markers.get(marker).map(String::as_str)
    }

    pub fn visible_to(&self, zone: ZoneId, player: PlayerId) -> bool {
        self.zone(zone)
            .is_some_and(|z| !z.concealed || z.revealed_to.contains(&player))
    }
}

/// Computes a 32-byte commitment to a state.
///
/// bincode over `BTreeMap`-only state is canonical, so equal states always
/// hash equal. Encoding cannot fail: every field derives `Serialize`, every
/// collection has a known length and `bincode::serialize` sets no size limit.
#[cfg(feature = "serde")]
pub fn compute_state_root(state: &GameState) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let encoded = bincode::serialize(state);
    debug_assert!(encoded.is_ok(), "game state failed to encode");
    let mut hasher = Sha256::new();
    if let Ok(bytes) = encoded {
        hasher.update(&bytes);
    }
    hasher.finalize().into()
}
