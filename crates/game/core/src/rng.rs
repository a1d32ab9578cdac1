//! Seeded random stream for `rollRandom` and shuffles.
//!
//! The stream is a pure function of `(seed, position)`: each draw hashes the
//! two into a PCG state and advances `position` by one. Replaying the same
//! moves and resolutions from the same seed therefore reproduces every draw.

/// Position in the deterministic random stream. Stored in the game state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RngState {
    pub seed: u64,
    pub position: u64,
}

impl RngState {
    pub const fn new(seed: u64) -> Self {
        Self { seed, position: 0 }
    }

    /// Draws 64 bits and advances the stream once.
    pub fn next_u64(&mut self) -> u64 {
        let state = PcgRng::step(compute_seed(self.seed, self.position));
        self.position += 1;
        let hi = PcgRng::output(state) as u64;
        let lo = PcgRng::output(PcgRng::step(state)) as u64;
        (hi << 32) | lo
    }

    /// Uniform-ish integer in `[min, max]`. Returns `min` for empty or
    /// single-value ranges without consuming a draw.
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        let span = (max as i128 - min as i128 + 1) as u128;
        let offset = (self.next_u64() as u128) % span;
        (min as i128 + offset as i128) as i64
    }

    /// Fisher-Yates shuffle, one draw per swap.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range(0, i as i64) as usize;
            items.swap(i, j);
        }
    }
}

/// PCG-XSH-RR: 64-bit LCG state, 32-bit permuted output.
struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

/// Mixes the game seed with the stream position (SplitMix64 finalizer).
fn compute_seed(seed: u64, position: u64) -> u64 {
    let mut hash = seed ^ position.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash
}
