/// Kernel limits and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KernelConfig {
    /// Maximum nesting of trigger firings inside one transition.
    pub max_trigger_depth: u32,
    /// Maximum automatic turn-flow steps per `advance_to_decision_point`.
    pub max_auto_steps: u32,
    /// Cap on the number of moves `enumerate_legal_moves` returns.
    pub max_enumerated_moves: usize,
}

impl KernelConfig {
    // ===== compile-time constants =====
    /// Maximum number of seats a definition may declare.
    pub const MAX_SEATS: usize = 16;
    /// Maximum depth of nested effect frames.
    pub const MAX_FRAME_DEPTH: usize = 256;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_TRIGGER_DEPTH: u32 = 8;
    pub const DEFAULT_MAX_AUTO_STEPS: u32 = 256;
    pub const DEFAULT_MAX_ENUMERATED_MOVES: usize = 4096;

    pub fn new() -> Self {
        Self {
            max_trigger_depth: Self::DEFAULT_MAX_TRIGGER_DEPTH,
            max_auto_steps: Self::DEFAULT_MAX_AUTO_STEPS,
            max_enumerated_moves: Self::DEFAULT_MAX_ENUMERATED_MOVES,
        }
    }

    pub fn with_max_trigger_depth(mut self, depth: u32) -> Self {
        self.max_trigger_depth = depth;
        self
    }

    pub fn with_max_enumerated_moves(mut self, cap: usize) -> Self {
        self.max_enumerated_moves = cap;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
