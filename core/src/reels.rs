//! Reel sets and the outcome generator.
//!
//! RULE: Reel configuration is read-only once a batch starts and is
//! shared by every worker without locking. All draws go through an
//! OutcomeSource so the orchestrator can be driven by a scripted
//! sequence in tests.

use crate::{
    error::{SimError, SimResult},
    rng::SimRng,
    symbol::Symbol,
    types::NUM_REELS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Board = [Symbol; NUM_REELS];

/// An ordered pair of independent symbol populations, one per reel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelSet {
    pub reels: [Vec<Symbol>; NUM_REELS],
}

impl ReelSet {
    pub fn new(reel_a: Vec<Symbol>, reel_b: Vec<Symbol>) -> Self {
        Self { reels: [reel_a, reel_b] }
    }

    /// Both reels use the same strip.
    pub fn mirrored(strip: Vec<Symbol>) -> Self {
        Self { reels: [strip.clone(), strip] }
    }

    pub fn from_tokens(reel_a: &[&str], reel_b: &[&str]) -> Self {
        Self::new(
            reel_a.iter().map(|t| Symbol::new(*t)).collect(),
            reel_b.iter().map(|t| Symbol::new(*t)).collect(),
        )
    }
}

/// Leaf lookup: reel-set id -> populations.
pub trait ReelSource: Sync {
    fn reel_set(&self, id: &str) -> Option<&ReelSet>;
}

/// What to draw for one spin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawSpec<'a> {
    /// Both reels from one reel set.
    Standard { reel_set: &'a str },
    /// `sticky_reel` draws from the numeric-only `stick` set while the
    /// other reel draws from the `run` set.
    Sticky { stick: &'a str, run: &'a str, sticky_reel: usize },
}

impl DrawSpec<'_> {
    /// Name reported in events for this draw.
    pub fn label(&self) -> String {
        match self {
            Self::Standard { reel_set } => reel_set.to_string(),
            Self::Sticky { stick, run, sticky_reel } => {
                if *sticky_reel == 0 {
                    format!("{stick}+{run}")
                } else {
                    format!("{run}+{stick}")
                }
            }
        }
    }
}

/// Anything that can produce a board for a draw spec.
pub trait OutcomeSource {
    /// Choose a reel set from a weighting, e.g. a distribution's base weights.
    fn pick_reel_set<'w>(&mut self, weights: &'w BTreeMap<String, u64>) -> Option<&'w str>;

    fn draw(&mut self, spec: &DrawSpec<'_>) -> SimResult<Board>;
}

/// Uniform independent draws from configured reel sets.
pub struct OutcomeGenerator<'a, R: ReelSource + ?Sized> {
    source: &'a R,
    rng: SimRng,
}

impl<'a, R: ReelSource + ?Sized> OutcomeGenerator<'a, R> {
    pub fn new(source: &'a R, rng: SimRng) -> Self {
        Self { source, rng }
    }

    fn population(&self, id: &str, reel: usize) -> SimResult<&'a [Symbol]> {
        let source: &'a R = self.source;
        let set = source
            .reel_set(id)
            .ok_or_else(|| SimError::UnknownReelSet { id: id.to_string() })?;
        let strip = &set.reels[reel];
        if strip.is_empty() {
            return Err(SimError::EmptyReel { id: id.to_string(), reel });
        }
        Ok(strip)
    }

    fn pick(&mut self, id: &str, reel: usize) -> SimResult<Symbol> {
        let strip = self.population(id, reel)?;
        let idx = self.rng.index(strip.len());
        Ok(strip[idx].clone())
    }
}

impl<R: ReelSource + ?Sized> OutcomeSource for OutcomeGenerator<'_, R> {
    fn pick_reel_set<'w>(&mut self, weights: &'w BTreeMap<String, u64>) -> Option<&'w str> {
        self.rng.weighted_pick(weights)
    }

    fn draw(&mut self, spec: &DrawSpec<'_>) -> SimResult<Board> {
        match *spec {
            DrawSpec::Standard { reel_set } => {
                let a = self.pick(reel_set, 0)?;
                let b = self.pick(reel_set, 1)?;
                Ok([a, b])
            }
            DrawSpec::Sticky { stick, run, sticky_reel } => {
                let set_for = |reel: usize| if reel == sticky_reel { stick } else { run };
                let a = self.pick(set_for(0), 0)?;
                let b = self.pick(set_for(1), 1)?;
                Ok([a, b])
            }
        }
    }
}
