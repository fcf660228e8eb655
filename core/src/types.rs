//! Shared primitive types used across the entire simulation.

/// Deterministic simulation index. Seeds the simulation's RNG stream
/// and, plus one, becomes the book id.
pub type SimIndex = u64;

/// Stable identifier of an accepted simulation's book.
pub type BookId = u64;

/// Number of reels on the board. The game is strictly two-reel.
pub const NUM_REELS: usize = 2;

/// Which half of the game a spin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
         serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Base,
    Free,
}

impl GameType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Free => "free",
        }
    }
}
